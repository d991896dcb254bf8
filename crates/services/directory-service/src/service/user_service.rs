//! User service - create/read/update/delete/list/drop workflows.
//!
//! The service owns no mutable state. Store-level email uniqueness is the
//! race-safety mechanism; the lookup before an insert is only an early
//! return.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::try_join_all;
use serde_json::Value;

use common::{AppError, AppResult, OptionExt};
use domain::{
    constants::{FIELD_EMAIL, USER_COLLECTION},
    digest_projection, generate_user_uuid, normalize_email, project, DeleteAck, FieldUpdate,
    Fields, NewUser, RecordId, UserFilter, UserListing, UserRecord,
};

use crate::repository::{StoreError, StoreResult, UserRepository};

/// Default upper bound on a single store call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Result of a single create.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateOutcome {
    /// `false` when a record with the same email already existed
    pub is_new: bool,
    pub user: UserRecord,
}

/// Result of a bulk create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BulkOutcome {
    Inserted(Vec<RecordId>),
    /// Every submitted email was already known
    NoNewUsers,
}

impl BulkOutcome {
    pub const NO_NEW_USERS_MESSAGE: &'static str = "No new users, nothing to add.";

    pub fn is_new(&self) -> bool {
        matches!(self, BulkOutcome::Inserted(_))
    }
}

/// User service trait for dependency injection.
#[async_trait]
pub trait UserService: Send + Sync {
    /// Create a record unless one with the same email exists
    async fn create_user(&self, submitted: Fields) -> AppResult<CreateOutcome>;

    /// Create every record whose email is unknown, in one insert
    async fn create_users(&self, submitted: Vec<Fields>) -> AppResult<BulkOutcome>;

    /// Replace the required fields of an existing record
    async fn update_user(&self, uuid: &str, submitted: Fields) -> AppResult<UserRecord>;

    async fn delete_user(&self, uuid: &str) -> AppResult<DeleteAck>;

    async fn get_user_by_uuid(&self, uuid: &str) -> AppResult<UserRecord>;

    async fn get_user_by_email(&self, email: &str) -> AppResult<UserRecord>;

    /// Count and full listing, fetched concurrently
    async fn list_users(&self) -> AppResult<UserListing>;

    async fn count_users(&self) -> AppResult<u64>;

    /// Administrative reset; returns the collections still holding data
    async fn drop_users(&self) -> AppResult<Vec<String>>;
}

/// Concrete implementation of UserService using repository.
pub struct UserManager {
    repo: Arc<dyn UserRepository>,
    required: Vec<String>,
    timeout: Duration,
}

impl UserManager {
    /// Create new user service over a repository and the required field names
    pub fn new(repo: Arc<dyn UserRepository>, required: Vec<String>) -> Self {
        Self {
            repo,
            required,
            timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    /// Bound every store call by `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn store<T>(&self, call: impl Future<Output = StoreResult<T>>) -> StoreResult<T> {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| StoreError::Timeout)?
    }

    /// Project, digest and stamp a fresh uuid on a submitted record.
    fn prepare(&self, email: String, submitted: &Fields) -> NewUser {
        let projection = project(submitted, &self.required);
        let digest = digest_projection(&projection);
        let mut user = NewUser::from_projection(generate_user_uuid(), digest, projection);
        user.email = email;
        user
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserRecord>> {
        Ok(self.store(self.repo.find_one(UserFilter::by_email(email))).await?)
    }
}

/// Lowercase the submitted email in place and return it.
fn normalize_submitted(submitted: &mut Fields) -> AppResult<String> {
    let email = submitted
        .get(FIELD_EMAIL)
        .and_then(Value::as_str)
        .map(normalize_email)
        .ok_or_else(|| AppError::bad_request_body("'email' is a required property"))?;
    submitted.insert(FIELD_EMAIL.to_string(), Value::String(email.clone()));
    Ok(email)
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::internal(err)
    }
}

#[async_trait]
impl UserService for UserManager {
    async fn create_user(&self, mut submitted: Fields) -> AppResult<CreateOutcome> {
        let email = normalize_submitted(&mut submitted)?;

        if let Some(existing) = self.find_by_email(&email).await? {
            tracing::debug!(uuid = %existing.uuid, "User already exists");
            return Ok(CreateOutcome {
                is_new: false,
                user: existing,
            });
        }

        let new_user = self.prepare(email.clone(), &submitted);
        match self.store(self.repo.insert_one(new_user)).await {
            Ok(id) => {
                let user = self
                    .store(self.repo.find_one(UserFilter::by_id(id)))
                    .await?
                    .ok_or_else(|| AppError::internal(format!("record {} vanished after insert", id)))?;
                tracing::info!(uuid = %user.uuid, "User created");
                Ok(CreateOutcome { is_new: true, user })
            }
            Err(StoreError::DuplicateEmail(_)) => {
                // A concurrent creator won the race
                let user = self
                    .find_by_email(&email)
                    .await?
                    .ok_or_else(|| AppError::internal("duplicate email reported for a missing record"))?;
                Ok(CreateOutcome {
                    is_new: false,
                    user,
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn create_users(&self, submitted: Vec<Fields>) -> AppResult<BulkOutcome> {
        // First occurrence of each email wins
        let mut seen = HashSet::new();
        let mut batch = Vec::with_capacity(submitted.len());
        for mut fields in submitted {
            let email = normalize_submitted(&mut fields)?;
            if seen.insert(email.clone()) {
                batch.push((email, fields));
            }
        }

        let known = try_join_all(batch.iter().map(|(email, _)| self.find_by_email(email))).await?;

        let new_users: Vec<NewUser> = batch
            .iter()
            .zip(known)
            .filter(|(_, existing)| existing.is_none())
            .map(|((email, fields), _)| self.prepare(email.clone(), fields))
            .collect();

        if new_users.is_empty() {
            tracing::debug!("No new users in batch");
            return Ok(BulkOutcome::NoNewUsers);
        }

        let ids = self.store(self.repo.insert_many(new_users)).await?;
        tracing::info!(inserted = ids.len(), "Users created");
        Ok(BulkOutcome::Inserted(ids))
    }

    async fn update_user(&self, uuid: &str, mut submitted: Fields) -> AppResult<UserRecord> {
        let email = normalize_submitted(&mut submitted)?;
        let projection = project(&submitted, &self.required);
        let digest = digest_projection(&projection);
        let update = FieldUpdate::from_projection(uuid.to_string(), digest, projection);

        let filter = UserFilter::by_uuid(uuid).and_email(email);
        if let Some(updated) = self.store(self.repo.update_fields(filter, update)).await? {
            tracing::info!(uuid, "User updated");
            return Ok(updated);
        }

        match self.store(self.repo.find_one(UserFilter::by_uuid(uuid))).await? {
            Some(_) => Err(AppError::bad_request_body(format!(
                "User {} email cannot be changed.",
                uuid
            ))),
            None => Err(AppError::user_not_found(format!(
                "User with this {} was not found.",
                uuid
            ))),
        }
    }

    async fn delete_user(&self, uuid: &str) -> AppResult<DeleteAck> {
        self.get_user_by_uuid(uuid).await?;
        let ack = self
            .store(self.repo.delete_one(UserFilter::by_uuid(uuid)))
            .await?;
        tracing::info!(uuid, deleted = ack.deleted_count, "User deleted");
        Ok(ack)
    }

    async fn get_user_by_uuid(&self, uuid: &str) -> AppResult<UserRecord> {
        self.store(self.repo.find_one(UserFilter::by_uuid(uuid)))
            .await?
            .ok_or_not_found(format!("User with this {} was not found.", uuid))
    }

    async fn get_user_by_email(&self, email: &str) -> AppResult<UserRecord> {
        self.find_by_email(&normalize_email(email))
            .await?
            .ok_or_not_found(format!("User with this {} was not found.", email))
    }

    async fn list_users(&self) -> AppResult<UserListing> {
        let (count, users) = tokio::try_join!(
            self.store(self.repo.count()),
            self.store(self.repo.find_all())
        )?;
        Ok(UserListing { count, users })
    }

    async fn count_users(&self) -> AppResult<u64> {
        Ok(self.store(self.repo.count()).await?)
    }

    async fn drop_users(&self) -> AppResult<Vec<String>> {
        let remaining = self.store(self.repo.drop_all()).await?;
        if remaining.iter().any(|name| name == USER_COLLECTION) {
            return Err(AppError::external_resource(format!(
                "Collection '{}' still holds records after drop.",
                USER_COLLECTION
            )));
        }
        tracing::warn!("User collection dropped");
        Ok(remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MockUserRepository;
    use common::ErrorKind;
    use mockall::predicate::eq;
    use serde_json::json;

    fn required() -> Vec<String> {
        ["email", "firstname", "lastname", "company"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn submitted(email: &str) -> Fields {
        match json!({"email": email, "firstname": "Manuel", "lastname": "Neuer", "company": "Yandex"}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn stored(id: i64, email: &str) -> UserRecord {
        UserRecord {
            id: Some(RecordId(id)),
            uuid: format!("USER-{:032X}", id),
            email: email.to_string(),
            digest: "d".to_string(),
            fields: Fields::new(),
        }
    }

    fn manager(repo: MockUserRepository) -> UserManager {
        UserManager::new(Arc::new(repo), required())
    }

    #[tokio::test]
    async fn test_create_user_existing_email_skips_insert() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_one()
            .with(eq(UserFilter::by_email("a@x.com")))
            .returning(|_| Ok(Some(stored(1, "a@x.com"))));
        repo.expect_insert_one().never();

        let outcome = manager(repo).create_user(submitted("A@X.com")).await.unwrap();

        assert!(!outcome.is_new);
        assert_eq!(outcome.user.id, Some(RecordId(1)));
    }

    #[tokio::test]
    async fn test_create_user_inserts_projection_with_digest() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_one()
            .with(eq(UserFilter::by_email("a@x.com")))
            .returning(|_| Ok(None));
        repo.expect_insert_one()
            .withf(|user| {
                user.email == "a@x.com"
                    && user.digest.len() == 40
                    && user.uuid.starts_with("USER-")
                    && !user.fields.contains_key("status")
            })
            .returning(|_| Ok(RecordId(9)));
        repo.expect_find_one()
            .with(eq(UserFilter::by_id(RecordId(9))))
            .returning(|_| Ok(Some(stored(9, "a@x.com"))));

        let mut fields = submitted("a@x.com");
        fields.insert("status".into(), json!("confirmed"));
        let outcome = manager(repo).create_user(fields).await.unwrap();

        assert!(outcome.is_new);
        assert_eq!(outcome.user.id, Some(RecordId(9)));
    }

    #[tokio::test]
    async fn test_create_user_lost_race_returns_winner() {
        let mut repo = MockUserRepository::new();
        let mut lookups = 0;
        repo.expect_find_one().times(2).returning(move |_| {
            lookups += 1;
            Ok((lookups == 2).then(|| stored(3, "a@x.com")))
        });
        repo.expect_insert_one()
            .returning(|user| Err(StoreError::DuplicateEmail(user.email)));

        let outcome = manager(repo).create_user(submitted("a@x.com")).await.unwrap();

        assert!(!outcome.is_new);
        assert_eq!(outcome.user.id, Some(RecordId(3)));
    }

    #[tokio::test]
    async fn test_backend_fault_is_internal() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_one()
            .returning(|_| Err(StoreError::Backend("connection reset".into())));

        let err = manager(repo).get_user_by_uuid("USER-X").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InternalServerError);
        assert!(!err.message().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_bulk_dedupes_and_inserts_unknown_only() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_one()
            .with(eq(UserFilter::by_email("a@x.com")))
            .times(1)
            .returning(|_| Ok(Some(stored(1, "a@x.com"))));
        repo.expect_find_one()
            .with(eq(UserFilter::by_email("c@x.com")))
            .times(1)
            .returning(|_| Ok(None));
        repo.expect_insert_many()
            .withf(|users| users.len() == 1 && users[0].email == "c@x.com")
            .returning(|_| Ok(vec![RecordId(2)]));

        let batch = vec![submitted("a@x.com"), submitted("c@x.com"), submitted("C@x.com")];
        let outcome = manager(repo).create_users(batch).await.unwrap();

        assert_eq!(outcome, BulkOutcome::Inserted(vec![RecordId(2)]));
    }

    #[tokio::test]
    async fn test_bulk_all_known() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_one()
            .returning(|filter| Ok(Some(stored(1, filter.email.as_deref().unwrap_or("")))));
        repo.expect_insert_many().never();

        let outcome = manager(repo)
            .create_users(vec![submitted("a@x.com"), submitted("b@x.com")])
            .await
            .unwrap();

        assert_eq!(outcome, BulkOutcome::NoNewUsers);
        assert!(!outcome.is_new());
    }

    #[tokio::test]
    async fn test_bulk_race_is_internal() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_one().returning(|_| Ok(None));
        repo.expect_insert_many()
            .returning(|_| Err(StoreError::DuplicateEmail("a@x.com".into())));

        let err = manager(repo)
            .create_users(vec![submitted("a@x.com")])
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InternalServerError);
    }

    #[tokio::test]
    async fn test_update_missing_uuid_is_not_found() {
        let mut repo = MockUserRepository::new();
        repo.expect_update_fields().returning(|_, _| Ok(None));
        repo.expect_find_one().returning(|_| Ok(None));

        let err = manager(repo)
            .update_user("USER-X", submitted("a@x.com"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::UserNotFound);
    }

    #[tokio::test]
    async fn test_update_with_other_email_is_rejected() {
        let mut repo = MockUserRepository::new();
        repo.expect_update_fields()
            .withf(|filter, update| {
                filter.email.as_deref() == Some("b@x.com")
                    && filter.uuid.as_deref() == Some("USER-X")
                    && update.uuid == "USER-X"
            })
            .returning(|_, _| Ok(None));
        repo.expect_find_one()
            .with(eq(UserFilter::by_uuid("USER-X")))
            .returning(|_| Ok(Some(stored(1, "a@x.com"))));

        let err = manager(repo)
            .update_user("USER-X", submitted("b@x.com"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::BadRequestBody);
    }

    #[tokio::test]
    async fn test_delete_missing_user() {
        let mut repo = MockUserRepository::new();
        repo.expect_find_one().returning(|_| Ok(None));
        repo.expect_delete_one().never();

        let err = manager(repo).delete_user("USER-X").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::UserNotFound);
    }

    #[tokio::test]
    async fn test_drop_leaving_users_is_external_resource() {
        let mut repo = MockUserRepository::new();
        repo.expect_drop_all()
            .returning(|| Ok(vec![USER_COLLECTION.to_string()]));

        let err = manager(repo).drop_users().await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ExternalResource);
    }

    #[tokio::test]
    async fn test_drop_success() {
        let mut repo = MockUserRepository::new();
        repo.expect_drop_all().returning(|| Ok(Vec::new()));

        assert!(manager(repo).drop_users().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_users_counts_and_lists() {
        let mut repo = MockUserRepository::new();
        repo.expect_count().returning(|| Ok(2));
        repo.expect_find_all()
            .returning(|| Ok(vec![stored(1, "a@x.com"), stored(2, "b@x.com")]));

        let listing = manager(repo).list_users().await.unwrap();

        assert_eq!(listing.count, 2);
        assert_eq!(listing.users.len(), 2);
    }

    /// Store whose calls never complete.
    struct Stalled;

    #[async_trait]
    impl UserRepository for Stalled {
        async fn insert_one(&self, _: NewUser) -> StoreResult<RecordId> {
            std::future::pending().await
        }
        async fn insert_many(&self, _: Vec<NewUser>) -> StoreResult<Vec<RecordId>> {
            std::future::pending().await
        }
        async fn find_one(&self, _: UserFilter) -> StoreResult<Option<UserRecord>> {
            std::future::pending().await
        }
        async fn find_all(&self) -> StoreResult<Vec<UserRecord>> {
            std::future::pending().await
        }
        async fn count(&self) -> StoreResult<u64> {
            std::future::pending().await
        }
        async fn update_fields(
            &self,
            _: UserFilter,
            _: FieldUpdate,
        ) -> StoreResult<Option<UserRecord>> {
            std::future::pending().await
        }
        async fn delete_one(&self, _: UserFilter) -> StoreResult<DeleteAck> {
            std::future::pending().await
        }
        async fn drop_all(&self) -> StoreResult<Vec<String>> {
            std::future::pending().await
        }
        async fn ping(&self) -> StoreResult<()> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_store_timeout_is_internal() {
        let service = UserManager::new(Arc::new(Stalled), required())
            .with_timeout(Duration::from_millis(20));

        let err = service.count_users().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InternalServerError);

        let err = service.create_user(submitted("a@x.com")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InternalServerError);
    }
}
