//! User repository: the persistence boundary over the `users` collection.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, NotSet, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set,
    SqlErr, Statement, TransactionTrait,
};
use serde_json::Value;
use thiserror::Error;

use super::entities::user::{self, ActiveModel, Entity as UserEntity};
use domain::{
    constants::USER_COLLECTION, DeleteAck, FieldUpdate, NewUser, RecordId, UserFilter, UserRecord,
};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Failure raised by a store. Absence is never an error.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store-level uniqueness constraint on email fired
    #[error("Duplicate email: {0}")]
    DuplicateEmail(String),

    #[error("Store operation timed out")]
    Timeout,

    #[error("Store backend error: {0}")]
    Backend(String),
}

impl From<DbErr> for StoreError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => StoreError::DuplicateEmail(detail),
            _ => StoreError::Backend(err.to_string()),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// User repository trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert one record and return its store id
    async fn insert_one(&self, user: NewUser) -> StoreResult<RecordId>;

    /// Insert a batch; either every record is stored or none is
    async fn insert_many(&self, users: Vec<NewUser>) -> StoreResult<Vec<RecordId>>;

    /// Find the first record matching the filter
    async fn find_one(&self, filter: UserFilter) -> StoreResult<Option<UserRecord>>;

    /// All records in insertion order
    async fn find_all(&self) -> StoreResult<Vec<UserRecord>>;

    async fn count(&self) -> StoreResult<u64>;

    /// Atomic find-and-modify; returns the post-update record
    async fn update_fields(
        &self,
        filter: UserFilter,
        update: FieldUpdate,
    ) -> StoreResult<Option<UserRecord>>;

    async fn delete_one(&self, filter: UserFilter) -> StoreResult<DeleteAck>;

    /// Remove every record; returns the collections still holding records
    async fn drop_all(&self) -> StoreResult<Vec<String>>;

    /// Check store connectivity
    async fn ping(&self) -> StoreResult<()>;
}

/// Postgres-backed implementation of UserRepository
pub struct UserStore {
    db: DatabaseConnection,
}

impl UserStore {
    /// Create new repository instance
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn filtered(filter: &UserFilter) -> Select<UserEntity> {
        UserEntity::find().filter(condition(filter))
    }
}

fn condition(filter: &UserFilter) -> Condition {
    Condition::all()
        .add_option(filter.id.map(|id| user::Column::Id.eq(id.0)))
        .add_option(filter.uuid.as_deref().map(|uuid| user::Column::Uuid.eq(uuid)))
        .add_option(filter.email.as_deref().map(|email| user::Column::Email.eq(email)))
}

fn active_model(user: NewUser) -> ActiveModel {
    ActiveModel {
        id: NotSet,
        uuid: Set(user.uuid),
        email: Set(user.email),
        digest: Set(user.digest),
        fields: Set(Value::Object(user.fields)),
    }
}

#[async_trait]
impl UserRepository for UserStore {
    async fn insert_one(&self, user: NewUser) -> StoreResult<RecordId> {
        let model = active_model(user).insert(&self.db).await?;
        Ok(RecordId(model.id))
    }

    async fn insert_many(&self, users: Vec<NewUser>) -> StoreResult<Vec<RecordId>> {
        let txn = self.db.begin().await?;
        let mut ids = Vec::with_capacity(users.len());
        for user in users {
            let model = active_model(user).insert(&txn).await?;
            ids.push(RecordId(model.id));
        }
        txn.commit().await?;
        Ok(ids)
    }

    async fn find_one(&self, filter: UserFilter) -> StoreResult<Option<UserRecord>> {
        let result = Self::filtered(&filter)
            .order_by_asc(user::Column::Id)
            .one(&self.db)
            .await?;

        Ok(result.map(UserRecord::from))
    }

    async fn find_all(&self) -> StoreResult<Vec<UserRecord>> {
        let models = UserEntity::find()
            .order_by_asc(user::Column::Id)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(UserRecord::from).collect())
    }

    async fn count(&self) -> StoreResult<u64> {
        Ok(UserEntity::find().count(&self.db).await?)
    }

    async fn update_fields(
        &self,
        filter: UserFilter,
        update: FieldUpdate,
    ) -> StoreResult<Option<UserRecord>> {
        let txn = self.db.begin().await?;

        // Row stays locked until commit
        let Some(model) = Self::filtered(&filter)
            .order_by_asc(user::Column::Id)
            .lock_exclusive()
            .one(&txn)
            .await?
        else {
            txn.rollback().await?;
            return Ok(None);
        };

        let mut record = UserRecord::from(model.clone());
        update.apply(&mut record);

        let mut active: ActiveModel = model.into();
        active.uuid = Set(record.uuid);
        active.digest = Set(record.digest);
        active.fields = Set(Value::Object(record.fields));

        let updated = active.update(&txn).await?;
        txn.commit().await?;
        Ok(Some(UserRecord::from(updated)))
    }

    async fn delete_one(&self, filter: UserFilter) -> StoreResult<DeleteAck> {
        let Some(model) = Self::filtered(&filter)
            .order_by_asc(user::Column::Id)
            .one(&self.db)
            .await?
        else {
            return Ok(DeleteAck {
                acknowledged: true,
                deleted_count: 0,
            });
        };

        let result = UserEntity::delete_by_id(model.id).exec(&self.db).await?;
        Ok(DeleteAck {
            acknowledged: true,
            deleted_count: result.rows_affected,
        })
    }

    async fn drop_all(&self) -> StoreResult<Vec<String>> {
        UserEntity::delete_many().exec(&self.db).await?;

        let remaining = UserEntity::find().count(&self.db).await?;
        if remaining > 0 {
            tracing::warn!(remaining, "Records survived the drop");
            return Ok(vec![USER_COLLECTION.to_string()]);
        }
        Ok(Vec::new())
    }

    async fn ping(&self) -> StoreResult<()> {
        self.db
            .execute(Statement::from_string(
                self.db.get_database_backend(),
                "SELECT 1".to_string(),
            ))
            .await?;
        Ok(())
    }
}
