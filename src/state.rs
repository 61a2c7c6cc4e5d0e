use crate::storage::{CacheStore, Collection};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
pub struct WriteSequencer {
    next: u64,
    committed: HashMap<Collection, u64>,
}

impl WriteSequencer {
    pub fn issue(&mut self) -> u64 {
        self.next += 1;
        self.next
    }

    pub fn commit_merge(&mut self, collection: Collection, ticket: u64) {
        let mark = self.committed.entry(collection).or_default();
        *mark = (*mark).max(ticket);
    }

    /// A full replacement lands only if nothing newer has written since.
    pub fn try_commit_replace(&mut self, collection: Collection, ticket: u64) -> bool {
        let mark = self.committed.entry(collection).or_default();
        if ticket < *mark {
            return false;
        }
        *mark = ticket;
        true
    }
}

pub struct CacheState {
    pub store: CacheStore,
    pub sequencer: WriteSequencer,
}

#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<Mutex<CacheState>>,
}

impl AppState {
    pub fn new(store: CacheStore) -> Self {
        Self {
            cache: Arc::new(Mutex::new(CacheState {
                store,
                sequencer: WriteSequencer::default(),
            })),
        }
    }

    pub async fn issue_ticket(&self) -> u64 {
        self.cache.lock().await.sequencer.issue()
    }
}
