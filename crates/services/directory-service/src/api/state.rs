//! Application state shared by every handler.

use std::sync::Arc;
use std::time::Duration;

use domain::UserSchema;

use crate::repository::UserRepository;
use crate::service::{UserService, DEFAULT_STORE_TIMEOUT};

/// Application state (DI container).
#[derive(Clone)]
pub struct AppState {
    /// User workflows
    pub user_service: Arc<dyn UserService>,
    /// Schema submitted bodies are validated against
    pub schema: Arc<UserSchema>,
    /// Store handle, used by the health probe
    pub repository: Arc<dyn UserRepository>,
    /// Bound on the health probe's store round trip
    pub store_timeout: Duration,
}

impl AppState {
    pub fn new(
        user_service: Arc<dyn UserService>,
        schema: Arc<UserSchema>,
        repository: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            user_service,
            schema,
            repository,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }
}
