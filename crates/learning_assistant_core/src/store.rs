//! Typed access to the three named documents of the record store.
//!
//! Reads never fail: a missing, unreadable or corrupt document degrades to an
//! empty collection and is logged. Writes that fail are logged by `persist`.

use crate::ports::{PortError, PortResult, RecordStore};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{error, warn};

/// The named documents kept by the record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Users,
    Progress,
    Memories,
}

impl Collection {
    pub const ALL: [Collection; 3] = [Collection::Users, Collection::Progress, Collection::Memories];

    pub fn name(self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Progress => "progress",
            Collection::Memories => "memories",
        }
    }
}

/// Loads a whole collection, falling back to an empty one on any store error.
pub async fn load_collection<T: DeserializeOwned>(
    store: &dyn RecordStore,
    collection: Collection,
) -> BTreeMap<String, T> {
    let document = match store.load(collection.name()).await {
        Ok(document) => document,
        Err(e) => {
            warn!(collection = collection.name(), error = %e, "Falling back to an empty collection");
            return BTreeMap::new();
        }
    };

    match serde_json::from_value(Value::Object(document)) {
        Ok(records) => records,
        Err(e) => {
            let corrupt = PortError::CorruptStore {
                name: collection.name().to_string(),
                reason: e.to_string(),
            };
            warn!(error = %corrupt, "Falling back to an empty collection");
            BTreeMap::new()
        }
    }
}

/// Serializes and saves a whole collection.
pub async fn save_collection<T: Serialize>(
    store: &dyn RecordStore,
    collection: Collection,
    records: &BTreeMap<String, T>,
) -> PortResult<()> {
    let value = serde_json::to_value(records).map_err(|e| PortError::Unexpected(e.to_string()))?;
    let Value::Object(document) = value else {
        return Err(PortError::Unexpected(format!(
            "collection '{}' did not serialize to a JSON object",
            collection.name()
        )));
    };
    store.save(collection.name(), &document).await
}

/// Saves a collection and logs, rather than returns, any failure.
pub(crate) async fn persist<T: Serialize>(
    store: &dyn RecordStore,
    collection: Collection,
    records: &BTreeMap<String, T>,
) {
    if let Err(e) = save_collection(store, collection, records).await {
        error!(collection = collection.name(), error = %e, "Failed to persist collection");
    }
}
