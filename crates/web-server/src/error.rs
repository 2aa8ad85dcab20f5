use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use core_types::CoreError;
use database::DbError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    /// The request was rejected before touching the store.
    #[error("Validation error: {0}")]
    Validation(String),
    /// Something the client asked for does not exist.
    #[error("Not found: {0}")]
    NotFound(String),
    /// The store answered, but not with the expected result.
    #[error("Operation failed: {0}")]
    OperationFailed(String),
    /// The store failed. `message` is what the client sees; `source` is only logged.
    #[error("{message}: {source}")]
    Database {
        message: &'static str,
        #[source]
        source: DbError,
    },
}

impl AppError {
    pub fn database(message: &'static str, source: DbError) -> Self {
        AppError::Database { message, source }
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(format!("El id debe ser numérico: {}", rejection.body_text()))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(format!(
            "El cuerpo de la petición no es un JSON válido: {}",
            rejection.body_text()
        ))
    }
}

/// Converts our custom `AppError` into an HTTP response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Validation(message) => (StatusCode::BAD_REQUEST, message),
            AppError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            AppError::OperationFailed(message) => {
                tracing::error!(%message, "Operation did not produce the expected result.");
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
            AppError::Database { message, source } => {
                if source.is_pool_exhausted() {
                    tracing::warn!(error = %source, "No database connection available.");
                } else {
                    tracing::error!(error = %source, context = message, "Database error.");
                }
                (StatusCode::INTERNAL_SERVER_ERROR, message.to_string())
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn render(err: AppError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn maps_each_kind_to_its_status() {
        let (status, body) = render(AppError::Validation("bad id".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "bad id");

        let (status, _) = render(AppError::NotFound("missing".into())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = render(AppError::OperationFailed("no row".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "no row");
    }

    #[tokio::test]
    async fn database_errors_do_not_leak_the_underlying_text() {
        let err = AppError::database(
            "Ha habido un error al devolver los datos de los usuarios",
            DbError::InvalidDatabaseName("internal detail".into()),
        );
        let (status, body) = render(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({ "error": "Ha habido un error al devolver los datos de los usuarios" })
        );
        assert!(!body.to_string().contains("internal detail"));
    }

    #[test]
    fn core_errors_become_validation_errors() {
        let err: AppError = CoreError::InvalidInput("name".into(), "must not be blank".into()).into();
        assert!(matches!(err, AppError::Validation(message) if message.contains("blank")));
    }
}
