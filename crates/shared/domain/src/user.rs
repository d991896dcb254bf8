//! User record and the value types flowing between service and store.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::{is_core_field, FIELD_EMAIL};

/// Submitted or stored fields of a record, in insertion order.
pub type Fields = Map<String, Value>;

/// Store-assigned record identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub i64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// User record as held by the directory.
///
/// Serializes flat: the core fields sit next to the extension fields,
/// and the store-assigned `id` is never exposed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(skip)]
    pub id: Option<RecordId>,
    pub uuid: String,
    pub email: String,
    pub digest: String,
    #[serde(flatten)]
    pub fields: Fields,
}

/// Record ready for insertion: identity and digest already assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub uuid: String,
    pub email: String,
    pub digest: String,
    pub fields: Fields,
}

impl NewUser {
    /// Build from a required-field projection, splitting out the email.
    ///
    /// Core fields other than email are dropped from the extension map.
    pub fn from_projection(uuid: String, digest: String, projection: Fields) -> Self {
        let mut email = String::new();
        let mut fields = Fields::new();
        for (key, value) in projection {
            if key == FIELD_EMAIL {
                if let Value::String(s) = value {
                    email = s;
                }
            } else if !is_core_field(&key) {
                fields.insert(key, value);
            }
        }
        Self {
            uuid,
            email,
            digest,
            fields,
        }
    }
}

/// Field changes applied by the atomic find-and-modify.
///
/// `fields` are merged into the stored extension map; absent keys keep
/// their stored values.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldUpdate {
    pub uuid: String,
    pub digest: String,
    pub fields: Fields,
}

impl FieldUpdate {
    /// Build from a required-field projection; core fields are not merged.
    pub fn from_projection(uuid: String, digest: String, projection: Fields) -> Self {
        let fields = projection
            .into_iter()
            .filter(|(key, _)| !is_core_field(key))
            .collect();
        Self {
            uuid,
            digest,
            fields,
        }
    }

    /// Apply the update to a stored record in place.
    pub fn apply(&self, record: &mut UserRecord) {
        record.uuid = self.uuid.clone();
        record.digest = self.digest.clone();
        for (key, value) in &self.fields {
            record.fields.insert(key.clone(), value.clone());
        }
    }
}

/// Conjunction of lookup conditions; unset conditions match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    pub id: Option<RecordId>,
    pub uuid: Option<String>,
    pub email: Option<String>,
}

impl UserFilter {
    pub fn by_id(id: RecordId) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    pub fn by_uuid(uuid: impl Into<String>) -> Self {
        Self {
            uuid: Some(uuid.into()),
            ..Self::default()
        }
    }

    pub fn by_email(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            ..Self::default()
        }
    }

    /// Narrow the filter to a specific email as well.
    pub fn and_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Check whether a record satisfies every set condition.
    pub fn matches(&self, record: &UserRecord) -> bool {
        self.id.map_or(true, |id| record.id == Some(id))
            && self.uuid.as_deref().map_or(true, |u| record.uuid == u)
            && self.email.as_deref().map_or(true, |e| record.email == e)
    }
}

/// Acknowledgement returned by a delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeleteAck {
    pub acknowledged: bool,
    pub deleted_count: u64,
}

/// Count and full listing of the collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserListing {
    #[serde(rename = "usersCount")]
    pub count: u64,
    #[serde(rename = "totalUsers")]
    pub users: Vec<UserRecord>,
}
