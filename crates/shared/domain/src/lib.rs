//! Domain layer - User records and the pure rules around them.
//!
//! This crate contains pure domain logic with no infrastructure dependencies:
//! record types, the content digest, the user object schema and the shape
//! checks for identifiers and emails.

pub mod constants;
pub mod digest;
pub mod error;
pub mod format;
pub mod schema;
pub mod user;

pub use constants::*;
pub use digest::{compute_digest, digest_projection, project};
pub use error::{DomainError, DomainResult};
pub use format::{check_email, check_user_uuid, generate_user_uuid, normalize_email};
pub use schema::{Property, PropertyType, UserSchema};
pub use user::{
    DeleteAck, FieldUpdate, Fields, NewUser, RecordId, UserFilter, UserListing, UserRecord,
};
