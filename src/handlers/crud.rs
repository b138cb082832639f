//! CRUD handler factories: get, find, list, create, update, create-or-update, destroy.

use crate::error::{AppError, ConfigError, ModelError};
use crate::model::{Model, Record, Where};
use crate::options::CrudOptions;
use crate::response::{deleted, success};
use crate::user::RequestUser;
use axum::{
    extract::{FromRequest, FromRequestParts, Path, Request},
    handler::Handler,
    http::request::Parts,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Get,
    Find,
    List,
    Create,
    Update,
    CreateOrUpdate,
    Destroy,
}

/// Request handler bound to one model and one set of options. Mount it with
/// `axum::routing::{get, post, put, patch, delete}`.
pub struct CrudHandler<M> {
    model: Arc<M>,
    options: Arc<CrudOptions>,
    op: Operation,
}

impl<M> Clone for CrudHandler<M> {
    fn clone(&self) -> Self {
        CrudHandler {
            model: Arc::clone(&self.model),
            options: Arc::clone(&self.options),
            op: self.op,
        }
    }
}

impl<M: Model> CrudHandler<M> {
    fn new(model: Arc<M>, options: CrudOptions, op: Operation) -> Result<Self, ConfigError> {
        options.check()?;
        Ok(CrudHandler {
            model,
            options: Arc::new(options),
            op,
        })
    }

    pub fn operation(&self) -> Operation {
        self.op
    }

    pub fn options(&self) -> &CrudOptions {
        &self.options
    }
}

/// Get one entry by the path parameter named `id_column_name`.
pub fn get<M: Model>(model: Arc<M>, options: CrudOptions) -> Result<CrudHandler<M>, ConfigError> {
    CrudHandler::new(model, options, Operation::Get)
}

/// Find one entry by the `column` and `value` path parameters.
pub fn find<M: Model>(model: Arc<M>, options: CrudOptions) -> Result<CrudHandler<M>, ConfigError> {
    CrudHandler::new(model, options, Operation::Find)
}

/// List all entries, through the options' cache when one is set.
pub fn list<M: Model>(model: Arc<M>, options: CrudOptions) -> Result<CrudHandler<M>, ConfigError> {
    CrudHandler::new(model, options, Operation::List)
}

/// Create an entry from the JSON body.
pub fn create<M: Model>(model: Arc<M>, options: CrudOptions) -> Result<CrudHandler<M>, ConfigError> {
    CrudHandler::new(model, options, Operation::Create)
}

/// Update the entry named by the id path parameter with the JSON body.
pub fn update<M: Model>(model: Arc<M>, options: CrudOptions) -> Result<CrudHandler<M>, ConfigError> {
    CrudHandler::new(model, options, Operation::Update)
}

/// Update the first entry matching `conditions`, or create one, from `{"conditions": {...}, "body": {...}}`.
pub fn create_or_update<M: Model>(
    model: Arc<M>,
    options: CrudOptions,
) -> Result<CrudHandler<M>, ConfigError> {
    CrudHandler::new(model, options, Operation::CreateOrUpdate)
}

/// Delete the entry named by the id path parameter.
pub fn destroy<M: Model>(model: Arc<M>, options: CrudOptions) -> Result<CrudHandler<M>, ConfigError> {
    CrudHandler::new(model, options, Operation::Destroy)
}

/// Marker selecting the [`Handler`] impl of [`CrudHandler`].
#[doc(hidden)]
pub struct ViaCrud;

impl<M, S> Handler<ViaCrud, S> for CrudHandler<M>
where
    M: Model,
    S: Clone + Send + Sync + 'static,
{
    type Future = Pin<Box<dyn Future<Output = Response> + Send>>;

    fn call(self, req: Request, state: S) -> Self::Future {
        Box::pin(async move {
            match self.handle(req, &state).await {
                Ok(response) => response,
                Err(e) => e.into_response(),
            }
        })
    }
}

#[derive(Deserialize)]
struct UpsertBody {
    #[serde(default)]
    conditions: Where,
    body: Record,
}

impl<M: Model> CrudHandler<M> {
    async fn handle<S>(&self, req: Request, state: &S) -> Result<Response, AppError>
    where
        S: Send + Sync,
    {
        let (mut parts, body) = req.into_parts();
        let user = RequestUser::from_parts(&parts).cloned();
        let user = user.as_ref();
        tracing::debug!(model = self.model.name(), op = ?self.op, uri = %parts.uri, "crud request");

        match self.op {
            Operation::Get => {
                let params = path_params(&mut parts, state).await?;
                let id = param(&params, &self.options.id_column_name)?;
                let scope = self.options.user_scope(user)?;
                let entry = self
                    .model
                    .find_by_pk(&Value::String(id), &scope)
                    .await?
                    .ok_or(AppError::NotFound)?;
                Ok(success(entry).into_response())
            }
            Operation::Find => {
                let params = path_params(&mut parts, state).await?;
                let column = param(&params, "column")?;
                let value = param(&params, "value")?;
                let filter = Where::new()
                    .eq(column, Value::String(value))
                    .and(&self.options.user_scope(user)?);
                let entry = self.model.find_one(&filter).await?.ok_or(AppError::NotFound)?;
                Ok(success(entry).into_response())
            }
            Operation::List => {
                let scope = self.options.user_scope(user)?;
                let load = async {
                    let rows = self.model.find_all(&scope).await?;
                    Ok::<_, ModelError>(Value::Array(rows.into_iter().map(Value::Object).collect()))
                };
                let entries = match &self.options.cache {
                    Some(cache) => {
                        let key = self.cache_key(user)?;
                        cache.get_or_load(&key, Box::pin(load)).await?
                    }
                    None => load.await?,
                };
                Ok(success(entries).into_response())
            }
            Operation::Create => {
                let mut body = json_object(Request::from_parts(parts, body), state).await?;
                self.bind_user(&mut body, user)?;
                let entry = self.model.create(body).await?;
                Ok(success(entry).into_response())
            }
            Operation::Update => {
                let params = path_params(&mut parts, state).await?;
                let id = param(&params, &self.options.id_column_name)?;
                let mut body = json_object(Request::from_parts(parts, body), state).await?;
                self.bind_user(&mut body, user)?;
                let filter = Where::new()
                    .eq(self.options.id_column_name.as_str(), Value::String(id))
                    .and(&self.options.user_scope(user)?);
                let affected = self.model.update(&body, &filter).await?;
                Ok(success(json!([affected])).into_response())
            }
            Operation::CreateOrUpdate => {
                let raw = json_object(Request::from_parts(parts, body), state).await?;
                let UpsertBody { mut conditions, mut body } = serde_json::from_value(Value::Object(raw))
                    .map_err(|e| AppError::BadRequest(format!("expected {{conditions, body}}: {}", e)))?;
                if conditions.is_empty() {
                    return Err(AppError::BadRequest("conditions must not be empty".into()));
                }
                if let Some((column, value)) = self.options.user_binding(user)? {
                    conditions.push(column, value.clone());
                    body.insert(column.to_string(), value);
                }
                let entry = match self.model.find_one(&conditions).await? {
                    Some(existing) => self.model.update_record(&existing, &body).await?,
                    None => self.model.create(body).await?,
                };
                Ok(success(entry).into_response())
            }
            Operation::Destroy => {
                let params = path_params(&mut parts, state).await?;
                let id = param(&params, &self.options.id_column_name)?;
                let filter = Where::new()
                    .eq(self.options.id_column_name.as_str(), Value::String(id))
                    .and(&self.options.user_scope(user)?);
                let removed = self.model.destroy(&filter).await?;
                tracing::debug!(model = self.model.name(), removed, "destroyed");
                Ok(deleted().into_response())
            }
        }
    }

    /// Overwrite the owner column with the caller's value so a body cannot claim another owner.
    fn bind_user(&self, body: &mut Record, user: Option<&RequestUser>) -> Result<(), AppError> {
        if let Some((column, value)) = self.options.user_binding(user)? {
            body.insert(column.to_string(), value);
        }
        Ok(())
    }

    fn cache_key(&self, user: Option<&RequestUser>) -> Result<String, AppError> {
        let owner = match self.options.user_binding(user)? {
            Some((_, Value::String(s))) => s,
            Some((_, v)) => v.to_string(),
            None => "*".to_string(),
        };
        Ok(format!("{}:{}_all", self.model.name(), owner))
    }
}

async fn path_params<S>(parts: &mut Parts, state: &S) -> Result<HashMap<String, String>, AppError>
where
    S: Send + Sync,
{
    let Path(params) = Path::<HashMap<String, String>>::from_request_parts(parts, state)
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?;
    Ok(params)
}

fn param(params: &HashMap<String, String>, name: &str) -> Result<String, AppError> {
    params
        .get(name)
        .cloned()
        .ok_or_else(|| AppError::BadRequest(format!("missing path parameter '{}'", name)))
}

async fn json_object<S>(req: Request, state: &S) -> Result<Record, AppError>
where
    S: Send + Sync,
{
    let Json(value) = Json::<Value>::from_request(req, state)
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?;
    match value {
        Value::Object(m) => Ok(m),
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryModel;

    #[test]
    fn factories_check_options() {
        let model = Arc::new(MemoryModel::new("notes"));
        let mut bad = CrudOptions::default();
        bad.user_column_name = Some("owner_id".into());
        assert!(get(model.clone(), bad.clone()).is_err());
        assert!(destroy(model.clone(), bad).is_err());

        let h = create_or_update(model, CrudOptions::default()).unwrap();
        assert_eq!(h.operation(), Operation::CreateOrUpdate);
        assert_eq!(h.options().id_column_name, "id");
    }

    #[test]
    fn cache_key_names_model_and_owner() {
        let model = Arc::new(MemoryModel::new("notes"));
        let h = list(model.clone(), CrudOptions::default()).unwrap();
        assert_eq!(h.cache_key(None).unwrap(), "notes:*_all");

        let h = list(model, CrudOptions::default().scoped_to_user("owner_id", "uid")).unwrap();
        let user = RequestUser::new().with("uid", Value::String("u1".into()));
        assert_eq!(h.cache_key(Some(&user)).unwrap(), "notes:u1_all");
        let user = RequestUser::new().with("uid", json!(5));
        assert_eq!(h.cache_key(Some(&user)).unwrap(), "notes:5_all");
    }
}
