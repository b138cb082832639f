//! Standard response envelope helpers.

use axum::{http::StatusCode, Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct Success<T> {
    pub success: bool,
    pub data: T,
}

#[derive(Serialize)]
pub struct Failure {
    pub success: bool,
    pub message: String,
}

#[derive(Serialize)]
pub struct Message {
    pub success: bool,
    pub message: &'static str,
}

pub fn success<T: Serialize>(data: T) -> (StatusCode, Json<Success<T>>) {
    (StatusCode::OK, Json(Success { success: true, data }))
}

pub fn deleted() -> (StatusCode, Json<Message>) {
    (
        StatusCode::OK,
        Json(Message {
            success: true,
            message: "Deleted successfully",
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelopes() {
        let (status, Json(body)) = success(json!({"id": 1}));
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            serde_json::to_value(body).unwrap(),
            json!({"success": true, "data": {"id": 1}})
        );

        let (_, Json(body)) = deleted();
        assert_eq!(
            serde_json::to_value(body).unwrap(),
            json!({"success": true, "message": "Deleted successfully"})
        );
    }
}
