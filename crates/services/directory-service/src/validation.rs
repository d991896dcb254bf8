//! Request validation.
//!
//! Every check is synchronous and side-effect free. Handlers call them in a
//! fixed order: method, then headers, then path parameter, then body. The
//! first failure wins.

use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, PathRejection},
        Path,
    },
    http::{header, HeaderMap, HeaderValue, Method},
};
use serde_json::Value;

use common::{AppError, AppResult};
use domain::{
    check_email, check_user_uuid, constants::FIELD_EMAIL, Fields, UserSchema,
    SUPPORTED_MEDIA_TYPE,
};

// =============================================================================
// Method and Headers
// =============================================================================

/// Reject a method outside the allowed set.
pub fn validate_method(method: &Method, allowed: &[Method]) -> AppResult<()> {
    if allowed.contains(method) {
        return Ok(());
    }
    let allowed = allowed
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    Err(AppError::wrong_method(format!(
        "You are requesting user with a wrong method: {}. Supported: {}.",
        method, allowed
    )))
}

/// Absent or empty headers are accepted; otherwise the value must mention
/// the supported media type, ignoring case.
fn header_admits(value: Option<&HeaderValue>, supported: &str) -> bool {
    match value {
        None => true,
        Some(v) if v.is_empty() => true,
        Some(v) => v
            .to_str()
            .map(|text| text.to_ascii_lowercase().contains(supported))
            .unwrap_or(false),
    }
}

pub fn validate_accept(value: Option<&HeaderValue>, supported: &str) -> AppResult<()> {
    if header_admits(value, supported) {
        Ok(())
    } else {
        Err(AppError::accept_type())
    }
}

pub fn validate_content_type(value: Option<&HeaderValue>, supported: &str) -> AppResult<()> {
    if header_admits(value, supported) {
        Ok(())
    } else {
        Err(AppError::content_type())
    }
}

/// Method, then Accept, then Content-Type.
pub fn validate_request(method: &Method, headers: &HeaderMap, allowed: &[Method]) -> AppResult<()> {
    validate_method(method, allowed)?;
    validate_accept(headers.get(header::ACCEPT), SUPPORTED_MEDIA_TYPE)?;
    validate_content_type(headers.get(header::CONTENT_TYPE), SUPPORTED_MEDIA_TYPE)
}

// =============================================================================
// Path Parameters
// =============================================================================

/// Unwrap an extracted path parameter; a malformed one is a query error.
pub fn path_param(path: Result<Path<String>, PathRejection>) -> AppResult<String> {
    path.map(|Path(value)| value)
        .map_err(|rejection| AppError::bad_request_query(rejection.body_text()))
}

pub fn validate_uuid_format(candidate: &str) -> AppResult<()> {
    Ok(check_user_uuid(candidate)?)
}

pub fn validate_email_format(candidate: &str) -> AppResult<()> {
    Ok(check_email(candidate)?)
}

// =============================================================================
// Body
// =============================================================================

pub fn validate_against_schema(payload: &Value, schema: &UserSchema) -> AppResult<()> {
    Ok(schema.validate(payload)?)
}

/// Email carried in a body; a bad one is a body error, not a query error.
fn validate_body_email(fields: &Fields) -> AppResult<()> {
    match fields.get(FIELD_EMAIL) {
        Some(Value::String(email)) => {
            check_email(email).map_err(|e| AppError::bad_request_body(e.to_string()))
        }
        Some(_) => Err(AppError::bad_request_body("'email' is not of type 'string'")),
        None => Err(AppError::bad_request_body("'email' is a required property")),
    }
}

/// Unwrap a buffered body; an unreadable or oversized one is a body error.
pub fn body_bytes(body: Result<Bytes, BytesRejection>) -> AppResult<Bytes> {
    body.map_err(|rejection| AppError::bad_request_body(rejection.body_text()))
}

fn parse_json(body: &[u8]) -> AppResult<Value> {
    serde_json::from_slice(body)
        .map_err(|e| AppError::bad_request_body(format!("Body is not valid JSON: {}", e)))
}

fn into_user(payload: Value, schema: &UserSchema) -> AppResult<Fields> {
    validate_against_schema(&payload, schema)?;
    let Value::Object(fields) = payload else {
        return Err(AppError::bad_request_body("Body is not a JSON object"));
    };
    validate_body_email(&fields)?;
    Ok(fields)
}

/// Parse and validate a single user object.
pub fn parse_user(body: &[u8], schema: &UserSchema) -> AppResult<Fields> {
    into_user(parse_json(body)?, schema)
}

/// Parse and validate an array of user objects.
pub fn parse_users(body: &[u8], schema: &UserSchema) -> AppResult<Vec<Fields>> {
    let Value::Array(items) = parse_json(body)? else {
        return Err(AppError::bad_request_body("Body is not a JSON array"));
    };
    items
        .into_iter()
        .map(|item| into_user(item, schema))
        .collect()
}
