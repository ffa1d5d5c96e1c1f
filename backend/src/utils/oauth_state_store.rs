use std::sync::Arc;
use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};
use time::OffsetDateTime;
use tower_sessions::{
    session::{Id, Record},
    session_store::{self, ExpiredDeletion, SessionStore},
};

/// Records for oauth popups that have not come back yet. Expired records
/// are never loaded, and `delete_expired` drops the ones nobody finished.
#[derive(Clone, Debug, Default)]
pub struct OAuthStateStore {
    records: Arc<DashMap<Id, Record>>,
}

impl OAuthStateStore {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl SessionStore for OAuthStateStore {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        loop {
            match self.records.entry(record.id) {
                Entry::Occupied(_) => record.id = Id::default(),
                Entry::Vacant(slot) => {
                    slot.insert(record.clone());
                    return Ok(());
                }
            }
        }
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        self.records.insert(record.id, record.clone());
        Ok(())
    }

    async fn load(&self, id: &Id) -> session_store::Result<Option<Record>> {
        let now = OffsetDateTime::now_utc();
        Ok(self
            .records
            .get(id)
            .filter(|record| record.expiry_date > now)
            .map(|record| record.value().clone()))
    }

    async fn delete(&self, id: &Id) -> session_store::Result<()> {
        self.records.remove(id);
        Ok(())
    }
}

#[async_trait]
impl ExpiredDeletion for OAuthStateStore {
    async fn delete_expired(&self) -> session_store::Result<()> {
        let now = OffsetDateTime::now_utc();
        self.records.retain(|_, record| record.expiry_date > now);
        Ok(())
    }
}
