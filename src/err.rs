use std::fmt;

use axum::http::{StatusCode, Uri};
use axum::response::{Html, IntoResponse, Redirect, Response};

use crate::store::StoreError;
use crate::views;

pub async fn handler404(path: Uri) -> Response {
    Error::NotFound {
        message: format!("Halaman {} tidak ditemukan", path.path()),
    }
    .into_response()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// No live session carries an authenticated user.
    Unauthenticated,
    InvalidCredentials,
    NotFound { message: String },
    StoreUnavailable { message: String },
    InternalError { kind: &'static str, message: String },
}

impl Error {
    pub fn not_found<S: Into<String>>(msg: S) -> Error {
        Error::NotFound {
            message: msg.into(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Error::Unauthenticated | Error::InvalidCredentials => StatusCode::SEE_OTHER,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::StoreUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Error::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Unauthenticated => f.write_str("not authenticated"),
            Error::InvalidCredentials => f.write_str("invalid credentials"),
            Error::NotFound { message } => write!(f, "not found: {}", message),
            Error::StoreUnavailable { message } => write!(f, "store unavailable: {}", message),
            Error::InternalError { kind, message } => write!(f, "{}: {}", kind, message),
        }
    }
}

impl std::error::Error for Error {}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            Error::Unauthenticated | Error::InvalidCredentials => {
                Redirect::to("/login").into_response()
            }
            Error::NotFound { message } => {
                (status, Html(views::error_page("Tidak Ditemukan", &message))).into_response()
            }
            Error::StoreUnavailable { message } => {
                log::error!("Store unavailable: {}", message);
                let body = views::error_page("Database Tidak Tersedia", "Silakan coba lagi nanti.");
                (status, Html(body)).into_response()
            }
            Error::InternalError { kind, message } => {
                log::error!("{}: {}", kind, message);
                let body = views::error_page("Terjadi Kesalahan", "Silakan coba lagi nanti.");
                (status, Html(body)).into_response()
            }
        }
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(message) => Self::StoreUnavailable { message },
            conflict @ (StoreError::Conflict(_) | StoreError::DuplicateUser) => Self::InternalError {
                kind: "ConflictError",
                message: conflict.to_string(),
            },
        }
    }
}

impl From<pbkdf2::password_hash::Error> for Error {
    fn from(err: pbkdf2::password_hash::Error) -> Self {
        Self::InternalError {
            kind: "HashError",
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::header::LOCATION;

    use super::*;

    #[test]
    fn unauthenticated_redirects_to_login() {
        let res = Error::Unauthenticated.into_response();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(res.headers()[LOCATION], "/login");
    }

    #[test]
    fn store_errors_map_to_service_unavailable() {
        let err = Error::from(StoreError::Unavailable("connection refused".to_string()));
        assert_eq!(err.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn not_found_renders_404() {
        let res = Error::not_found("Data siswa tidak ditemukan").into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
