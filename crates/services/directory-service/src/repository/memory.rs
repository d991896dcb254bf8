//! In-process user repository for development and tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::user_repository::{StoreError, StoreResult, UserRepository};
use domain::{DeleteAck, FieldUpdate, NewUser, RecordId, UserFilter, UserRecord};

/// Ordered map of records guarded by a single lock.
///
/// Email and uuid uniqueness are enforced on insert, the same guarantees
/// the unique indexes give `UserStore`.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    last_id: i64,
    records: BTreeMap<RecordId, UserRecord>,
}

impl MemoryState {
    fn conflict(&self, user: &NewUser) -> Option<StoreError> {
        self.records
            .values()
            .find(|r| r.email == user.email || r.uuid == user.uuid)
            .map(|_| StoreError::DuplicateEmail(user.email.clone()))
    }

    fn push(&mut self, user: NewUser) -> RecordId {
        self.last_id += 1;
        let id = RecordId(self.last_id);
        self.records.insert(
            id,
            UserRecord {
                id: Some(id),
                uuid: user.uuid,
                email: user.email,
                digest: user.digest,
                fields: user.fields,
            },
        );
        id
    }

    fn first_match(&self, filter: &UserFilter) -> Option<RecordId> {
        self.records
            .iter()
            .find(|(_, record)| filter.matches(record))
            .map(|(id, _)| *id)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn insert_one(&self, user: NewUser) -> StoreResult<RecordId> {
        let mut state = self.state.write().await;
        if let Some(err) = state.conflict(&user) {
            return Err(err);
        }
        Ok(state.push(user))
    }

    async fn insert_many(&self, users: Vec<NewUser>) -> StoreResult<Vec<RecordId>> {
        let mut state = self.state.write().await;

        // Check the whole batch first so a conflict leaves nothing behind
        for (i, user) in users.iter().enumerate() {
            if let Some(err) = state.conflict(user) {
                return Err(err);
            }
            if users[..i].iter().any(|u| u.email == user.email) {
                return Err(StoreError::DuplicateEmail(user.email.clone()));
            }
        }

        Ok(users.into_iter().map(|user| state.push(user)).collect())
    }

    async fn find_one(&self, filter: UserFilter) -> StoreResult<Option<UserRecord>> {
        let state = self.state.read().await;
        Ok(state
            .first_match(&filter)
            .and_then(|id| state.records.get(&id).cloned()))
    }

    async fn find_all(&self) -> StoreResult<Vec<UserRecord>> {
        let state = self.state.read().await;
        Ok(state.records.values().cloned().collect())
    }

    async fn count(&self) -> StoreResult<u64> {
        let state = self.state.read().await;
        Ok(state.records.len() as u64)
    }

    async fn update_fields(
        &self,
        filter: UserFilter,
        update: FieldUpdate,
    ) -> StoreResult<Option<UserRecord>> {
        let mut state = self.state.write().await;
        let Some(id) = state.first_match(&filter) else {
            return Ok(None);
        };
        Ok(state.records.get_mut(&id).map(|record| {
            update.apply(record);
            record.clone()
        }))
    }

    async fn delete_one(&self, filter: UserFilter) -> StoreResult<DeleteAck> {
        let mut state = self.state.write().await;
        let deleted = state
            .first_match(&filter)
            .and_then(|id| state.records.remove(&id));
        Ok(DeleteAck {
            acknowledged: true,
            deleted_count: u64::from(deleted.is_some()),
        })
    }

    async fn drop_all(&self) -> StoreResult<Vec<String>> {
        let mut state = self.state.write().await;
        state.records.clear();
        Ok(Vec::new())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn new_user(uuid: &str, email: &str) -> NewUser {
        let mut fields = domain::Fields::new();
        fields.insert("firstname".into(), json!("Manuel"));
        NewUser {
            uuid: uuid.to_string(),
            email: email.to_string(),
            digest: "d".to_string(),
            fields,
        }
    }

    #[tokio::test]
    async fn insert_assigns_increasing_ids() {
        let store = MemoryStore::new();
        let a = store.insert_one(new_user("USER-A", "a@x.com")).await.unwrap();
        let b = store.insert_one(new_user("USER-B", "b@x.com")).await.unwrap();
        assert!(a < b);
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = MemoryStore::new();
        store.insert_one(new_user("USER-A", "a@x.com")).await.unwrap();
        let err = store.insert_one(new_user("USER-B", "a@x.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail(email) if email == "a@x.com"));
    }

    #[tokio::test]
    async fn insert_many_is_all_or_nothing() {
        let store = MemoryStore::new();
        store.insert_one(new_user("USER-A", "a@x.com")).await.unwrap();
        let batch = vec![new_user("USER-B", "b@x.com"), new_user("USER-C", "a@x.com")];
        assert!(store.insert_many(batch).await.is_err());
        assert_eq!(store.count().await.unwrap(), 1);

        let batch = vec![new_user("USER-B", "b@x.com"), new_user("USER-C", "b@x.com")];
        assert!(store.insert_many(batch).await.is_err());
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn update_only_touches_matching_record() {
        let store = MemoryStore::new();
        store.insert_one(new_user("USER-A", "a@x.com")).await.unwrap();

        let mut fields = domain::Fields::new();
        fields.insert("firstname".into(), json!("Marc"));
        let update = FieldUpdate {
            uuid: "USER-A".into(),
            digest: "e".into(),
            fields,
        };

        let miss = store
            .update_fields(UserFilter::by_uuid("USER-A").and_email("b@x.com"), update.clone())
            .await
            .unwrap();
        assert!(miss.is_none());

        let hit = store
            .update_fields(UserFilter::by_uuid("USER-A").and_email("a@x.com"), update)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.digest, "e");
        assert_eq!(hit.fields["firstname"], "Marc");
    }

    #[test]
    fn find_on_empty_store_is_absent() {
        let store = MemoryStore::new();
        let found = tokio_test::block_on(store.find_one(UserFilter::by_email("a@x.com")));
        assert!(tokio_test::assert_ok!(found).is_none());
        tokio_test::assert_ok!(tokio_test::block_on(store.ping()));
    }

    #[tokio::test]
    async fn delete_and_drop() {
        let store = MemoryStore::new();
        store.insert_one(new_user("USER-A", "a@x.com")).await.unwrap();
        store.insert_one(new_user("USER-B", "b@x.com")).await.unwrap();

        let ack = store.delete_one(UserFilter::by_uuid("USER-A")).await.unwrap();
        assert_eq!(ack.deleted_count, 1);
        let ack = store.delete_one(UserFilter::by_uuid("USER-A")).await.unwrap();
        assert_eq!(ack.deleted_count, 0);

        assert!(store.drop_all().await.unwrap().is_empty());
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
