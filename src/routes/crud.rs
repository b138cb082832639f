//! Conventional CRUD routes for one model.
//! The id segment is named after `id_column_name` so the get/update/destroy handlers find it.

use crate::error::ConfigError;
use crate::handlers::crud;
use crate::model::Model;
use crate::options::CrudOptions;
use axum::{routing::get, routing::post, Router};
use std::sync::Arc;

/// `GET /` list, `POST /` create, `POST /upsert` create-or-update, `GET /find/:column/:value` find,
/// `GET /:id` get, `PUT|PATCH /:id` update, `DELETE /:id` destroy.
pub fn crud_routes<M, S>(model: Arc<M>, options: CrudOptions) -> Result<Router<S>, ConfigError>
where
    M: Model,
    S: Clone + Send + Sync + 'static,
{
    let by_id = format!("/:{}", options.id_column_name);
    let update = crud::update(model.clone(), options.clone())?;
    Ok(Router::new()
        .route(
            "/",
            get(crud::list(model.clone(), options.clone())?).post(crud::create(model.clone(), options.clone())?),
        )
        .route("/upsert", post(crud::create_or_update(model.clone(), options.clone())?))
        .route("/find/:column/:value", get(crud::find(model.clone(), options.clone())?))
        .route(
            &by_id,
            get(crud::get(model.clone(), options.clone())?)
                .put(update.clone())
                .patch(update)
                .delete(crud::destroy(model, options)?),
        ))
}
