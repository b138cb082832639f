//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::response::Failure;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("You have to specify both user_column_name and req_user_property")]
    IncompleteUserScope,
    #[error("id column name must not be empty")]
    EmptyIdColumn,
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
    #[error("primary key {column} is not a column of {table}")]
    InvalidPrimaryKey { table: String, column: String },
}

/// Failure raised by a [`Model`](crate::model::Model) implementation.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("unknown column: {0}")]
    UnknownColumn(String),
    #[error("invalid values: {0}")]
    InvalidValues(String),
    #[error("{0}")]
    Other(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("No records found")]
    NotFound,
    #[error("{0}")]
    BadRequest(String),
    #[error("No token given")]
    Unauthorized,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Model(ModelError::UnknownColumn(_) | ModelError::InvalidValues(_)) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Config(_) | AppError::Model(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(error = %self, "request failed");
        }
        let body = Failure {
            success: false,
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
