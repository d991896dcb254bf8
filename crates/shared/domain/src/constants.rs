//! Domain-level constants.
//!
//! These constants define the record identity format and the validation
//! patterns shared by every service.

// =============================================================================
// Record Identity
// =============================================================================

/// Prefix of every generated user uuid
pub const USER_UUID_PREFIX: &str = "USER-";

/// Anchored pattern a user uuid must match
pub const USER_UUID_PATTERN: &str = r"^USER-[0-9A-F]{32}$";

// =============================================================================
// Validation
// =============================================================================

/// Anchored local-part@domain.tld shape accepted for emails
pub const EMAIL_PATTERN: &str = r"^\w+([.-]?\w+)*@\w+([.-]?\w+)*(\.\w{2,3})+$";

/// The only media type the directory produces and consumes
pub const SUPPORTED_MEDIA_TYPE: &str = "application/json";

// =============================================================================
// Record Fields
// =============================================================================

/// Core field holding the generated identifier
pub const FIELD_UUID: &str = "uuid";

/// Core field holding the dedup key
pub const FIELD_EMAIL: &str = "email";

/// Core field holding the content digest
pub const FIELD_DIGEST: &str = "digest";

/// Name of the single logical collection of user records
pub const USER_COLLECTION: &str = "users";

/// Required fields used when no schema definition is supplied
pub const DEFAULT_REQUIRED_FIELDS: &[&str] = &["email", "firstname", "lastname", "company"];

/// Check if a field name is one of the record's core fields
pub fn is_core_field(name: &str) -> bool {
    matches!(name, FIELD_UUID | FIELD_EMAIL | FIELD_DIGEST)
}
