use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use betrank_core::csv::CsvError;
use betrank_core::generation::GenerationError;
use betrank_core::voting::VoteRejection;
use betrank_types::api::ErrorBody;
use thiserror::Error;
use tracing::error;

/// Every handler error. Rendered as `{"message": ...}` with a matching status.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Admin privileges required")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    TooManyRequests(String),

    #[error("Internal server error")]
    Internal(anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        if betrank_db::is_unique_violation(&err) {
            return Self::Conflict("A record with that name already exists".into());
        }
        Self::Internal(err)
    }
}

impl From<GenerationError> for ApiError {
    fn from(err: GenerationError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<CsvError> for ApiError {
    fn from(err: CsvError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<VoteRejection> for ApiError {
    fn from(rejection: VoteRejection) -> Self {
        match rejection {
            VoteRejection::RankingNotFound => Self::NotFound("Ranking"),
            VoteRejection::SiteNotInRanking => Self::NotFound("Site in ranking"),
            VoteRejection::AlreadyVotedToday => Self::Conflict(rejection.to_string()),
            VoteRejection::LimitReached => Self::TooManyRequests(rejection.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(err) = &self {
            error!("Internal error: {:#}", err);
        }

        let status = self.status();
        (status, Json(ErrorBody { message: self.to_string() })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vote_rejections_map_to_statuses() {
        assert_eq!(ApiError::from(VoteRejection::LimitReached).status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(ApiError::from(VoteRejection::AlreadyVotedToday).status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::from(VoteRejection::RankingNotFound).status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn internal_errors_hide_details() {
        let err = ApiError::from(anyhow::anyhow!("disk on fire"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Internal server error");
    }
}
