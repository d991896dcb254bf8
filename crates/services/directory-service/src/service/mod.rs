//! Service layer - business workflows over the repository.

mod user_service;

pub use user_service::{
    BulkOutcome, CreateOutcome, UserManager, UserService, DEFAULT_STORE_TIMEOUT,
};
