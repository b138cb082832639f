//! Per-handler configuration.

use crate::cache::Cache;
use crate::error::{AppError, ConfigError};
use crate::model::Where;
use crate::user::RequestUser;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

pub const DEFAULT_ID_COLUMN: &str = "id";

/// Options shared by every handler factory. Deserializable so route tables can live in config files;
/// the cache is attached in code.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrudOptions {
    /// Path parameter (and column) holding the record id.
    pub id_column_name: String,
    /// Column that ties a row to its owner. Requires `req_user_property`.
    pub user_column_name: Option<String>,
    /// Property of the request's [`RequestUser`] stored in `user_column_name`.
    pub req_user_property: Option<String>,
    pub verbose: bool,
    #[serde(skip)]
    pub cache: Option<Arc<dyn Cache>>,
}

impl Default for CrudOptions {
    fn default() -> Self {
        CrudOptions {
            id_column_name: DEFAULT_ID_COLUMN.to_string(),
            user_column_name: None,
            req_user_property: None,
            verbose: false,
            cache: None,
        }
    }
}

impl fmt::Debug for CrudOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrudOptions")
            .field("id_column_name", &self.id_column_name)
            .field("user_column_name", &self.user_column_name)
            .field("req_user_property", &self.req_user_property)
            .field("verbose", &self.verbose)
            .field("cache", &self.cache.is_some())
            .finish()
    }
}

impl CrudOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id_column(mut self, column: impl Into<String>) -> Self {
        self.id_column_name = column.into();
        self
    }

    /// Restrict every query to rows whose `column` equals the caller's `property`.
    pub fn scoped_to_user(mut self, column: impl Into<String>, property: impl Into<String>) -> Self {
        self.user_column_name = Some(column.into());
        self.req_user_property = Some(property.into());
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Validate once when a handler is built.
    pub fn check(&self) -> Result<(), ConfigError> {
        match (&self.user_column_name, &self.req_user_property) {
            (Some(_), None) | (None, Some(_)) => return Err(ConfigError::IncompleteUserScope),
            _ => {}
        }
        if self.id_column_name.is_empty() {
            return Err(ConfigError::EmptyIdColumn);
        }
        if self.verbose {
            tracing::info!(options = ?self, "options for crud handler");
        }
        Ok(())
    }

    pub fn is_user_scoped(&self) -> bool {
        self.user_column_name.is_some()
    }

    /// Owner column and the caller's value for it. `None` when not user-scoped;
    /// `Unauthorized` when scoped and the caller or property is missing.
    pub fn user_binding(&self, user: Option<&RequestUser>) -> Result<Option<(&str, Value)>, AppError> {
        let (Some(column), Some(property)) = (&self.user_column_name, &self.req_user_property) else {
            return Ok(None);
        };
        let value = user
            .and_then(|u| u.get(property))
            .cloned()
            .ok_or(AppError::Unauthorized)?;
        Ok(Some((column.as_str(), value)))
    }

    /// Conditions restricting a query to the caller's rows.
    pub fn user_scope(&self, user: Option<&RequestUser>) -> Result<Where, AppError> {
        Ok(match self.user_binding(user)? {
            Some((column, value)) => Where::new().eq(column, value),
            None => Where::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use serde_json::json;

    #[test]
    fn defaults() {
        let o = CrudOptions::default();
        assert_eq!(o.id_column_name, "id");
        assert!(!o.is_user_scoped());
        assert!(o.check().is_ok());
    }

    #[test]
    fn half_configured_user_scope_is_rejected() {
        let mut o = CrudOptions::default();
        o.user_column_name = Some("owner_id".into());
        assert!(matches!(o.check(), Err(ConfigError::IncompleteUserScope)));

        let mut o = CrudOptions::default();
        o.req_user_property = Some("uid".into());
        assert!(matches!(o.check(), Err(ConfigError::IncompleteUserScope)));
    }

    #[test]
    fn empty_id_column_is_rejected() {
        let o = CrudOptions::default().with_id_column("");
        assert!(matches!(o.check(), Err(ConfigError::EmptyIdColumn)));
    }

    #[test]
    fn deserializes_with_defaults() {
        let o: CrudOptions =
            serde_json::from_value(json!({"user_column_name": "owner_id", "req_user_property": "uid"})).unwrap();
        assert_eq!(o.id_column_name, "id");
        assert!(o.check().is_ok());
        assert!(o.cache.is_none());
    }

    #[test]
    fn user_scope_requires_caller_property() {
        let o = CrudOptions::default().scoped_to_user("owner_id", "uid");
        assert!(matches!(o.user_scope(None), Err(AppError::Unauthorized)));

        let anon = RequestUser::new().with("email", json!("a@b.c"));
        assert!(matches!(o.user_scope(Some(&anon)), Err(AppError::Unauthorized)));

        let user = RequestUser::new().with("uid", json!(7));
        let scope = o.user_scope(Some(&user)).unwrap();
        assert_eq!(scope.get("owner_id"), Some(&json!(7)));
    }

    #[test]
    fn unscoped_ignores_caller() {
        let o = CrudOptions::default();
        assert!(o.user_scope(None).unwrap().is_empty());
    }

    #[test]
    fn debug_hides_cache() {
        let o = CrudOptions::default().with_cache(Arc::new(MemoryCache::new(1)));
        assert!(format!("{:?}", o).contains("cache: true"));
    }
}
