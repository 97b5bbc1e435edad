//! crates/learning_assistant_core/src/users.rs
//!
//! The user directory: maps platform identities to display names and roles and
//! registers unseen identities on first contact.

use crate::domain::{Role, Sender, UserRecord};
use crate::ports::RecordStore;
use crate::store::{load_collection, persist, Collection};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

//=========================================================================================
// Known Users Table
//=========================================================================================

/// A preconfigured member of the learning group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownUser {
    /// Platform handle, with or without the leading `@`.
    pub handle: String,
    pub name: String,
    pub role: Role,
    /// Optional platform id, for members without a public handle.
    #[serde(default)]
    pub identity: Option<String>,
}

/// The immutable table of known users, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct KnownUsers {
    entries: Vec<KnownUser>,
}

fn normalize_handle(handle: &str) -> String {
    handle.trim().trim_start_matches('@').to_lowercase()
}

impl KnownUsers {
    pub fn new(entries: Vec<KnownUser>) -> Self {
        Self { entries }
    }

    /// Parses a JSON array of known users.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_str(text)?))
    }

    pub fn entries(&self) -> &[KnownUser] {
        &self.entries
    }

    /// Finds the entry matching a platform id or, failing that, a handle.
    /// Handles compare case-insensitively and ignore a leading `@`.
    pub fn lookup(&self, identity: &str, username: Option<&str>) -> Option<&KnownUser> {
        if let Some(entry) = self
            .entries
            .iter()
            .find(|e| e.identity.as_deref() == Some(identity))
        {
            return Some(entry);
        }
        let wanted = normalize_handle(username?);
        if wanted.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .find(|e| normalize_handle(&e.handle) == wanted)
    }
}

//=========================================================================================
// User Directory
//=========================================================================================

pub struct UserDirectory {
    store: Arc<dyn RecordStore>,
    known: Arc<KnownUsers>,
}

impl UserDirectory {
    pub fn new(store: Arc<dyn RecordStore>, known: Arc<KnownUsers>) -> Self {
        Self { store, known }
    }

    pub fn known_users(&self) -> &KnownUsers {
        &self.known
    }

    /// Returns the record for `sender`, creating it on first contact.
    pub async fn resolve(&self, sender: &Sender) -> UserRecord {
        self.resolve_at(sender, Utc::now()).await
    }

    /// Resolving an existing identity never changes its role. The display name
    /// is refreshed from the platform unless it came from the known-users table.
    pub async fn resolve_at(&self, sender: &Sender, now: DateTime<Utc>) -> UserRecord {
        let mut users: BTreeMap<String, UserRecord> =
            load_collection(self.store.as_ref(), Collection::Users).await;

        let record = match users.get_mut(&sender.identity) {
            Some(existing) => {
                if !existing.known && existing.display_name != sender.display_name {
                    info!(
                        identity = %sender.identity,
                        from = %existing.display_name,
                        to = %sender.display_name,
                        "Refreshing display name"
                    );
                    existing.display_name = sender.display_name.clone();
                }
                existing.username = sender.username.clone();
                existing.last_seen = now;
                existing.clone()
            }
            None => {
                let known = self
                    .known
                    .lookup(&sender.identity, sender.username.as_deref());
                let record = UserRecord {
                    identity: sender.identity.clone(),
                    display_name: known
                        .map(|k| k.name.clone())
                        .unwrap_or_else(|| sender.display_name.clone()),
                    username: sender.username.clone(),
                    role: known.map(|k| k.role).unwrap_or(Role::Regular),
                    known: known.is_some(),
                    registered_at: now,
                    last_seen: now,
                };
                info!(
                    identity = %record.identity,
                    name = %record.display_name,
                    role = record.role.as_str(),
                    "Registered new user"
                );
                users.insert(record.identity.clone(), record.clone());
                record
            }
        };

        persist(self.store.as_ref(), Collection::Users, &users).await;
        record
    }

    pub async fn get(&self, identity: &str) -> Option<UserRecord> {
        self.all().await.remove(identity)
    }

    pub async fn all(&self) -> BTreeMap<String, UserRecord> {
        load_collection(self.store.as_ref(), Collection::Users).await
    }

    pub async fn is_admin(&self, identity: &str) -> bool {
        self.get(identity)
            .await
            .is_some_and(|user| user.role == Role::Admin)
    }

    /// Case-insensitive substring search over handles and display names.
    pub async fn search(&self, query: &str) -> Vec<UserRecord> {
        let query = query.trim().to_lowercase();
        self.all()
            .await
            .into_values()
            .filter(|user| {
                user.display_name.to_lowercase().contains(&query)
                    || user
                        .username
                        .as_deref()
                        .is_some_and(|u| u.to_lowercase().contains(&query))
            })
            .collect()
    }
}
