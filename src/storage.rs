use crate::errors::CacheError;
use crate::models::{Customer, Order};
use serde::{Serialize, de::DeserializeOwned};
use std::{
    collections::HashMap,
    fs,
    io::ErrorKind,
    path::PathBuf,
};
use tracing::error;

/// Most recent records kept per collection; older ones are dropped on write.
pub const CACHE_LIMIT: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Customers,
    Orders,
}

impl Collection {
    pub fn key(self) -> &'static str {
        match self {
            Self::Customers => "trackingSystem_customers",
            Self::Orders => "trackingSystem_orders",
        }
    }
}

pub trait KeyValueStore: Send {
    fn get_item(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;
    fn set_item(&mut self, key: &str, value: &[u8]) -> Result<(), CacheError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    items: HashMap<String, Vec<u8>>,
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &[u8]) -> Result<(), CacheError> {
        self.items.insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get_item(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    // Readers see either the old snapshot or the new one, never a torn file.
    fn set_item(&mut self, key: &str, value: &[u8]) -> Result<(), CacheError> {
        let target = self.path_for(key);
        let staging = self.dir.join(format!("{key}.json.tmp"));
        fs::write(&staging, value)?;
        fs::rename(&staging, &target)?;
        Ok(())
    }
}

pub struct CacheStore {
    backend: Box<dyn KeyValueStore>,
}

impl CacheStore {
    pub fn new(backend: impl KeyValueStore + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryStore::default())
    }

    /// Never fails: a missing, unreadable or malformed snapshot reads as empty.
    pub fn read<T: DeserializeOwned>(&self, collection: Collection) -> Vec<T> {
        match self.backend.get_item(collection.key()) {
            Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
                Ok(records) => records,
                Err(err) => {
                    error!(key = collection.key(), "failed to parse cache snapshot: {err}");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(err) => {
                error!(key = collection.key(), "failed to read cache snapshot: {err}");
                Vec::new()
            }
        }
    }

    pub fn write<T: Serialize>(
        &mut self,
        collection: Collection,
        records: &[T],
    ) -> Result<(), CacheError> {
        let payload = serde_json::to_vec(records)?;
        self.backend.set_item(collection.key(), &payload)
    }

    pub fn customers(&self) -> Vec<Customer> {
        self.read(Collection::Customers)
    }

    pub fn orders(&self) -> Vec<Order> {
        self.read(Collection::Orders)
    }

    pub fn customer(&self, id: &str) -> Option<Customer> {
        self.customers().into_iter().find(|customer| customer.id == id)
    }

    pub fn order(&self, id: &str) -> Option<Order> {
        self.orders().into_iter().find(|order| order.id == id)
    }

    pub fn orders_for_customer(&self, customer_id: &str) -> Vec<Order> {
        self.orders()
            .into_iter()
            .filter(|order| order.customer_id == customer_id)
            .collect()
    }
}

pub fn prepend_new<T>(records: &mut Vec<T>, record: T, key: impl Fn(&T) -> &str) -> bool {
    if records.iter().any(|existing| key(existing) == key(&record)) {
        return false;
    }
    records.insert(0, record);
    records.truncate(CACHE_LIMIT);
    true
}

pub fn upsert<T>(records: &mut Vec<T>, record: T, key: impl Fn(&T) -> &str) {
    match records
        .iter()
        .position(|existing| key(existing) == key(&record))
    {
        Some(idx) => records[idx] = record,
        None => records.insert(0, record),
    }
    records.truncate(CACHE_LIMIT);
}
