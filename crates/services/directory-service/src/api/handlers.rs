//! User handlers.
//!
//! Routes are registered for every method, so each handler runs the
//! validators itself in order: method, headers, path parameter, body.

use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, PathRejection},
        Path, State,
    },
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Json, Response},
};

use common::AppResult;
use domain::{UserListing, UserRecord};

use crate::api::AppState;
use crate::service::BulkOutcome;
use crate::validation::{
    body_bytes, parse_user, parse_users, path_param, validate_email_format, validate_request,
    validate_uuid_format,
};

/// Get a single user by uuid
pub async fn get_user_by_uuid(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    uuid: Result<Path<String>, PathRejection>,
) -> AppResult<Json<UserRecord>> {
    validate_request(&method, &headers, &[Method::GET])?;
    let uuid = path_param(uuid)?;
    validate_uuid_format(&uuid)?;

    let user = state.user_service.get_user_by_uuid(&uuid).await?;
    Ok(Json(user))
}

/// Get a single user by email
pub async fn get_user_by_email(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    email: Result<Path<String>, PathRejection>,
) -> AppResult<Json<UserRecord>> {
    validate_request(&method, &headers, &[Method::GET])?;
    let email = path_param(email)?;
    validate_email_format(&email)?;

    let user = state.user_service.get_user_by_email(&email).await?;
    Ok(Json(user))
}

/// Count and list every user
pub async fn get_total_users(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
) -> AppResult<Json<UserListing>> {
    validate_request(&method, &headers, &[Method::GET])?;

    let listing = state.user_service.list_users().await?;
    Ok(Json(listing))
}

pub async fn count_users(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
) -> AppResult<Json<u64>> {
    validate_request(&method, &headers, &[Method::GET])?;

    let count = state.user_service.count_users().await?;
    Ok(Json(count))
}

/// Create a user; 201 when new, 200 with the existing record otherwise
pub async fn post_user(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> AppResult<(StatusCode, Json<UserRecord>)> {
    validate_request(&method, &headers, &[Method::POST])?;
    let fields = parse_user(&body_bytes(body)?, &state.schema)?;

    let outcome = state.user_service.create_user(fields).await?;
    let status = if outcome.is_new {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(outcome.user)))
}

/// Create users in bulk; 201 with the new ids, or 200 when nothing was new
pub async fn post_users(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> AppResult<Response> {
    validate_request(&method, &headers, &[Method::POST])?;
    let users = parse_users(&body_bytes(body)?, &state.schema)?;

    let response = match state.user_service.create_users(users).await? {
        BulkOutcome::Inserted(ids) => (StatusCode::CREATED, Json(ids)).into_response(),
        BulkOutcome::NoNewUsers => {
            (StatusCode::OK, Json(BulkOutcome::NO_NEW_USERS_MESSAGE)).into_response()
        }
    };
    Ok(response)
}

pub async fn update_user(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    uuid: Result<Path<String>, PathRejection>,
    body: Result<Bytes, BytesRejection>,
) -> AppResult<Json<UserRecord>> {
    validate_request(&method, &headers, &[Method::PUT])?;
    let uuid = path_param(uuid)?;
    validate_uuid_format(&uuid)?;
    let fields = parse_user(&body_bytes(body)?, &state.schema)?;

    let user = state.user_service.update_user(&uuid, fields).await?;
    Ok(Json(user))
}

pub async fn delete_user(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    uuid: Result<Path<String>, PathRejection>,
) -> AppResult<StatusCode> {
    validate_request(&method, &headers, &[Method::DELETE])?;
    let uuid = path_param(uuid)?;
    validate_uuid_format(&uuid)?;

    state.user_service.delete_user(&uuid).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Remove every user; 202 with the collections that still hold data
pub async fn drop_collection(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
) -> AppResult<(StatusCode, Json<Vec<String>>)> {
    validate_request(&method, &headers, &[Method::POST])?;

    let remaining = state.user_service.drop_users().await?;
    Ok((StatusCode::ACCEPTED, Json(remaining)))
}
