use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::error;
use santa_core::{AssignmentError, AuthError, ParticipantServiceError, RepoError};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("group_code is required")]
    MissingGroupCode,
    #[error("{0}")]
    Unauthorized(&'static str),
    #[error("{0}")]
    Forbidden(&'static str),
    #[error(transparent)]
    Assignment(#[from] AssignmentError),
    #[error(transparent)]
    Participant(#[from] ParticipantServiceError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Store(#[from] RepoError),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::MissingGroupCode => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Assignment(err) => match err {
                AssignmentError::InsufficientParticipants { .. } | AssignmentError::NotReady => {
                    StatusCode::BAD_REQUEST
                }
                AssignmentError::NotFound(_) => StatusCode::NOT_FOUND,
                AssignmentError::ParticipantsChanged => StatusCode::CONFLICT,
                AssignmentError::DerangementFailed { .. } => StatusCode::SERVICE_UNAVAILABLE,
                AssignmentError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Participant(err) => match err {
                ParticipantServiceError::InvalidName(_)
                | ParticipantServiceError::InvalidPassword(_) => StatusCode::BAD_REQUEST,
                ParticipantServiceError::DuplicateParticipant(_) => StatusCode::CONFLICT,
                ParticipantServiceError::ParticipantNotFound(_) => StatusCode::NOT_FOUND,
                ParticipantServiceError::Hashing(_) | ParticipantServiceError::Repo(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::InvalidToken | AuthError::Expired => {
                    StatusCode::UNAUTHORIZED
                }
                AuthError::Hashing(_) | AuthError::Repo(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            error!("event=http_error module=server status=error error={}", self);
            "internal server error".to_owned()
        } else {
            self.to_string()
        };

        let body = Json(ErrorResponse { error: message });
        if status == StatusCode::UNAUTHORIZED {
            return (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response();
        }
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_status_codes() {
        let cases = [
            (
                ApiError::from(AssignmentError::InsufficientParticipants { found: 1 }),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::from(AssignmentError::NotReady),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::from(AssignmentError::NotFound("bob".to_owned())),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::from(AssignmentError::DerangementFailed { attempts: 100 }),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ApiError::from(ParticipantServiceError::DuplicateParticipant(
                    "bob".to_owned(),
                )),
                StatusCode::CONFLICT,
            ),
            (
                ApiError::from(AuthError::Expired),
                StatusCode::UNAUTHORIZED,
            ),
            (ApiError::MissingGroupCode, StatusCode::BAD_REQUEST),
            (
                ApiError::Internal("boom".to_owned()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.status(), expected, "{error}");
        }
    }
}
