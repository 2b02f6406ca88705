use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Request-path failures. Every variant maps to a structured JSON error
/// body; internal detail stays in the server log.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("El carrito está vacío.")]
    EmptyCart,

    #[error("Falta el campo requerido: {0}.")]
    MissingField(&'static str),

    #[error("El producto {0} no existe.")]
    UnknownProduct(i32),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("Credenciales inválidas.")]
    InvalidCredentials,

    #[error("No autenticado.")]
    Unauthorized,

    #[error("Operación reservada al personal.")]
    Forbidden,

    #[error("{0}")]
    Validation(String),

    #[error("Servicio de medios no disponible.")]
    Upstream(#[source] anyhow::Error),

    #[error("Error interno.")]
    Database(#[from] sqlx::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::EmptyCart | Self::MissingField(_) | Self::UnknownProduct(_) | Self::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Unauthorized | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        match &self {
            Self::Database(e) => error!("database error: {e}"),
            Self::Upstream(e) => error!("upstream error: {e:#}"),
            _ => {}
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
