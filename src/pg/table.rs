//! Table definition the PostgreSQL model queries against.

use crate::error::{ConfigError, ModelError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    /// PostgreSQL type used to cast bound values (e.g. "int8", "timestamptz", "uuid").
    /// Needed for every non-text column that appears in a filter.
    #[serde(default)]
    pub pg_type: Option<String>,
    /// Whether the column has a DB default (e.g. gen_random_uuid(), NOW()).
    #[serde(default)]
    pub has_default: bool,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, pg_type: Option<&str>) -> Self {
        ColumnDef {
            name: name.into(),
            pg_type: pg_type.map(str::to_string),
            has_default: false,
        }
    }

    pub fn with_default(mut self) -> Self {
        self.has_default = true;
        self
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TableDef {
    #[serde(default = "default_schema")]
    pub schema: String,
    pub table: String,
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
    pub columns: Vec<ColumnDef>,
}

fn default_schema() -> String {
    "public".to_string()
}

fn default_primary_key() -> String {
    "id".to_string()
}

static IDENTIFIER_RE: OnceLock<Option<Regex>> = OnceLock::new();
static TYPE_RE: OnceLock<Option<Regex>> = OnceLock::new();

/// A pattern that fails to compile matches nothing, so validation rejects instead of passing.
fn is_match(cell: &'static OnceLock<Option<Regex>>, pattern: &str, s: &str) -> bool {
    cell.get_or_init(|| Regex::new(pattern).ok())
        .as_ref()
        .is_some_and(|re| re.is_match(s))
}

fn is_identifier(s: &str) -> bool {
    is_match(&IDENTIFIER_RE, r"^[A-Za-z_][A-Za-z0-9_]*$", s)
}

fn is_type_name(s: &str) -> bool {
    is_match(&TYPE_RE, r"^[A-Za-z_][A-Za-z0-9_ .,()\[\]]*$", s)
}

impl TableDef {
    pub fn new(table: impl Into<String>, columns: Vec<ColumnDef>) -> Self {
        TableDef {
            schema: default_schema(),
            table: table.into(),
            primary_key: default_primary_key(),
            columns,
        }
    }

    /// Identifiers are interpolated into SQL, so only plain names are accepted.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let names = [self.schema.as_str(), self.table.as_str(), self.primary_key.as_str()];
        for name in names.into_iter().chain(self.columns.iter().map(|c| c.name.as_str())) {
            if !is_identifier(name) {
                return Err(ConfigError::InvalidIdentifier(name.to_string()));
            }
        }
        for t in self.columns.iter().filter_map(|c| c.pg_type.as_deref()) {
            if !is_type_name(t) {
                return Err(ConfigError::InvalidIdentifier(t.to_string()));
            }
        }
        if self.column(&self.primary_key).is_none() {
            return Err(ConfigError::InvalidPrimaryKey {
                table: self.table.clone(),
                column: self.primary_key.clone(),
            });
        }
        Ok(())
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub(crate) fn require_column(&self, name: &str) -> Result<&ColumnDef, ModelError> {
        self.column(name)
            .ok_or_else(|| ModelError::UnknownColumn(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn notes() -> TableDef {
        TableDef::new(
            "notes",
            vec![
                ColumnDef::new("id", Some("int8")).with_default(),
                ColumnDef::new("title", None),
            ],
        )
    }

    #[test]
    fn valid_definition() {
        assert!(notes().validate().is_ok());
    }

    #[test]
    fn rejects_injected_identifier() {
        let mut t = notes();
        t.columns.push(ColumnDef::new("x\"; DROP TABLE notes; --", None));
        assert!(matches!(t.validate(), Err(ConfigError::InvalidIdentifier(_))));

        let mut t = notes();
        t.columns[1].pg_type = Some("text; --".into());
        assert!(matches!(t.validate(), Err(ConfigError::InvalidIdentifier(_))));
    }

    #[test]
    fn identifier_and_type_patterns() {
        assert!(is_identifier("owner_id"));
        assert!(!is_identifier("1st"));
        assert!(!is_identifier("a b"));
        assert!(is_type_name("numeric(10,2)"));
        assert!(is_type_name("int8[]"));
        assert!(is_type_name("app.status"));
        assert!(!is_type_name("text'"));
    }

    #[test]
    fn rejects_missing_primary_key() {
        let mut t = notes();
        t.primary_key = "uuid".into();
        assert!(matches!(t.validate(), Err(ConfigError::InvalidPrimaryKey { .. })));
    }

    #[test]
    fn deserializes_with_defaults() {
        let t: TableDef = serde_json::from_value(json!({
            "table": "notes",
            "columns": [{"name": "id", "pg_type": "int8", "has_default": true}, {"name": "body"}]
        }))
        .unwrap();
        assert_eq!(t.schema, "public");
        assert_eq!(t.primary_key, "id");
        assert!(t.validate().is_ok());
        assert!(t.column("body").unwrap().pg_type.is_none());
    }
}
