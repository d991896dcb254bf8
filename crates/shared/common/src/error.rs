//! Error taxonomy shared by every layer of the directory.
//!
//! Every failure is an [`AppError`]: a closed [`ErrorKind`] plus a fresh
//! correlation id (`debug_id`), a human-readable message and optional links.
//! Errors are logged once, when they are constructed, and converted to an
//! Axum response at the boundary.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::DomainError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Closed set of failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UserNotFound,
    BadRequestQuery,
    BadRequestBody,
    WrongMethod,
    AcceptTypeError,
    ContentTypeError,
    ExternalResource,
    InternalServerError,
}

impl ErrorKind {
    /// Stable machine-readable name
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::UserNotFound => "ERR_USER_NOT_FOUND",
            ErrorKind::BadRequestQuery => "ERR_IN_QUERY",
            ErrorKind::BadRequestBody => "ERR_IN_BODY",
            ErrorKind::WrongMethod => "ERR_HTTP_METHOD",
            ErrorKind::AcceptTypeError => "ERR_TYPE_NOT_SUPPORTED",
            ErrorKind::ContentTypeError => "ERR_UNSUPPORTED_MEDIA_TYPE",
            ErrorKind::ExternalResource => "ERR_EXTERNAL_RESOURCE",
            ErrorKind::InternalServerError => "ERR_SERVER_INTERNAL",
        }
    }

    /// HTTP status code
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::UserNotFound => StatusCode::NOT_FOUND,
            ErrorKind::BadRequestQuery | ErrorKind::BadRequestBody => StatusCode::BAD_REQUEST,
            ErrorKind::WrongMethod => StatusCode::METHOD_NOT_ALLOWED,
            ErrorKind::AcceptTypeError => StatusCode::NOT_ACCEPTABLE,
            ErrorKind::ContentTypeError => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ErrorKind::ExternalResource => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message used when the raiser supplies none
    pub fn default_message(self) -> &'static str {
        match self {
            ErrorKind::UserNotFound => {
                "The User you are requesting is not found or does not exist."
            }
            ErrorKind::BadRequestQuery => {
                "You are requesting user with a wrong request parameters."
            }
            ErrorKind::BadRequestBody => "You are requesting user with a wrong body scheme.",
            ErrorKind::WrongMethod => "You are requesting user with a wrong method.",
            ErrorKind::AcceptTypeError => {
                "Accept header is provided but application/json is not requested. \
                 Make a request with Accept: application/json header or with no Accept header at all."
            }
            ErrorKind::ContentTypeError => {
                "Content-Type header is provided but application/json is not requested. \
                 Make a request with Content-Type: application/json header or with no Content-Type header at all."
            }
            ErrorKind::ExternalResource => "The requested action cannot be performed.",
            ErrorKind::InternalServerError => {
                "Internal server error. No additional info will be provided."
            }
        }
    }

    fn is_server_side(self) -> bool {
        self.status().is_server_error()
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Application error carried from any layer back to the boundary.
#[derive(Error, Debug, Clone)]
#[error("{kind}: {message}")]
pub struct AppError {
    kind: ErrorKind,
    debug_id: Uuid,
    message: String,
    information_link: Option<String>,
    links: Vec<String>,
}

/// Error response body for HTTP
#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    name: &'static str,
    debug_id: String,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    information_link: Option<&'a str>,
    #[serde(skip_serializing_if = "no_links")]
    links: &'a [String],
}

fn no_links(links: &&[String]) -> bool {
    links.is_empty()
}

impl AppError {
    /// Raise an error of the given kind with a specific message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let err = Self::build(kind, message.into());
        err.trace(None);
        err
    }

    /// Raise an error of the given kind with its default message.
    pub fn of(kind: ErrorKind) -> Self {
        Self::new(kind, kind.default_message())
    }

    /// Wrap an unclassified fault.
    ///
    /// The cause is logged with the correlation id and then dropped; the
    /// client only ever sees the default message.
    pub fn internal(cause: impl fmt::Display) -> Self {
        let kind = ErrorKind::InternalServerError;
        let err = Self::build(kind, kind.default_message().to_string());
        err.trace(Some(&cause));
        err
    }

    fn build(kind: ErrorKind, message: String) -> Self {
        Self {
            kind,
            debug_id: Uuid::new_v4(),
            message,
            information_link: None,
            links: Vec::new(),
        }
    }

    fn trace(&self, cause: Option<&dyn fmt::Display>) {
        let cause = cause.map(|c| c.to_string());
        if self.kind.is_server_side() {
            tracing::error!(
                kind = %self.kind,
                debug_id = %self.debug_id,
                cause = cause.as_deref().unwrap_or(""),
                "{}",
                self.message
            );
        } else {
            tracing::warn!(
                kind = %self.kind,
                debug_id = %self.debug_id,
                "{}",
                self.message
            );
        }
    }

    /// Attach a link to further information.
    pub fn with_information_link(mut self, link: impl Into<String>) -> Self {
        self.information_link = Some(link.into());
        self
    }

    /// Attach a related link.
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.links.push(link.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn debug_id(&self) -> Uuid {
        self.debug_id
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn information_link(&self) -> Option<&str> {
        self.information_link.as_deref()
    }

    pub fn links(&self) -> &[String] {
        &self.links
    }

    /// Get HTTP status code
    pub fn status(&self) -> StatusCode {
        self.kind.status()
    }
}

/// Convenience constructors
impl AppError {
    pub fn user_not_found(message: impl Into<String>) -> Self {
        AppError::new(ErrorKind::UserNotFound, message)
    }

    pub fn bad_request_query(message: impl Into<String>) -> Self {
        AppError::new(ErrorKind::BadRequestQuery, message)
    }

    pub fn bad_request_body(message: impl Into<String>) -> Self {
        AppError::new(ErrorKind::BadRequestBody, message)
    }

    pub fn wrong_method(message: impl Into<String>) -> Self {
        AppError::new(ErrorKind::WrongMethod, message)
    }

    pub fn accept_type() -> Self {
        AppError::of(ErrorKind::AcceptTypeError)
    }

    pub fn content_type() -> Self {
        AppError::of(ErrorKind::ContentTypeError)
    }

    pub fn external_resource(message: impl Into<String>) -> Self {
        AppError::new(ErrorKind::ExternalResource, message)
    }
}

// =============================================================================
// HTTP Response (Axum)
// =============================================================================

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            name: self.kind.name(),
            debug_id: self.debug_id.to_string(),
            message: &self.message,
            information_link: self.information_link.as_deref(),
            links: &self.links,
        };

        (self.status(), Json(body)).into_response()
    }
}

// =============================================================================
// Domain Error Conversion
// =============================================================================

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InvalidUuid(_) | DomainError::InvalidEmail(_) => {
                AppError::bad_request_query(err.to_string())
            }
            DomainError::Schema(_) => AppError::bad_request_body(err.to_string()),
            DomainError::Definition(_) => AppError::internal(err),
        }
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

/// Extension trait for Option -> AppError conversion
pub trait OptionExt<T> {
    fn ok_or_not_found(self, message: impl Into<String>) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, message: impl Into<String>) -> AppResult<T> {
        self.ok_or_else(|| AppError::user_not_found(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [ErrorKind; 8] = [
        ErrorKind::UserNotFound,
        ErrorKind::BadRequestQuery,
        ErrorKind::BadRequestBody,
        ErrorKind::WrongMethod,
        ErrorKind::AcceptTypeError,
        ErrorKind::ContentTypeError,
        ErrorKind::ExternalResource,
        ErrorKind::InternalServerError,
    ];

    #[test]
    fn status_codes() {
        let codes: Vec<u16> = ALL.iter().map(|k| k.status().as_u16()).collect();
        assert_eq!(codes, vec![404, 400, 400, 405, 406, 415, 422, 500]);
    }

    #[test]
    fn names_are_unique() {
        let names: std::collections::HashSet<_> = ALL.iter().map(|k| k.name()).collect();
        assert_eq!(names.len(), ALL.len());
    }

    #[test]
    fn every_error_gets_a_fresh_debug_id() {
        let a = AppError::of(ErrorKind::UserNotFound);
        let b = AppError::of(ErrorKind::UserNotFound);
        assert_ne!(a.debug_id(), b.debug_id());
    }

    #[test]
    fn internal_hides_its_cause() {
        let err = AppError::internal("connection refused on 10.0.0.3:5432");
        assert_eq!(err.kind(), ErrorKind::InternalServerError);
        assert!(!err.message().contains("10.0.0.3"));
        assert!(!err.to_string().contains("10.0.0.3"));
    }

    #[test]
    fn domain_errors_map_to_request_kinds() {
        let uuid: AppError = DomainError::InvalidUuid("x".into()).into();
        assert_eq!(uuid.kind(), ErrorKind::BadRequestQuery);
        assert_eq!(uuid.message(), "Wrong user UUID: x");
        let schema: AppError = DomainError::schema("bad").into();
        assert_eq!(schema.kind(), ErrorKind::BadRequestBody);
        let definition: AppError = DomainError::definition("bad").into();
        assert_eq!(definition.kind(), ErrorKind::InternalServerError);
    }

    #[test]
    fn links_are_kept() {
        let err = AppError::external_resource("drop failed")
            .with_information_link("https://example.com/errors/drop")
            .with_link("https://example.com/status");
        assert_eq!(err.information_link(), Some("https://example.com/errors/drop"));
        assert_eq!(err.links(), ["https://example.com/status".to_string()]);
    }

    #[test]
    fn into_response_uses_kind_status() {
        let response = AppError::user_not_found("nope").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let response = AppError::content_type().into_response();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[test]
    fn option_ext() {
        let found: AppResult<i32> = Some(1).ok_or_not_found("missing");
        assert_eq!(found.unwrap(), 1);
        let missing: AppResult<i32> = None.ok_or_not_found("missing");
        assert_eq!(missing.unwrap_err().kind(), ErrorKind::UserNotFound);
    }
}
