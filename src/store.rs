use crate::error::AppError;
use crate::model::LinkEntry;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Persistence seam for short links.
///
/// `SqliteLinkStore` is the production implementation; [`MemoryLinkStore`]
/// is the non-persistent variant used by tests and throwaway deployments.
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Persists a new mapping. Fails with [`AppError::DuplicateCode`] when
    /// the code is already taken.
    async fn save(&self, code: &str, url: &str) -> Result<LinkEntry, AppError>;

    async fn lookup(&self, code: &str) -> Result<Option<LinkEntry>, AppError>;

    /// Adds one click. Atomic at the storage layer; concurrent increments
    /// never lose updates.
    async fn increment_clicks(&self, code: &str) -> Result<(), AppError>;

    /// Every link, newest first.
    async fn list_all(&self) -> Result<Vec<LinkEntry>, AppError>;

    /// Removes a link, reporting how many rows went away.
    async fn delete(&self, code: &str) -> Result<u64, AppError>;

    async fn count(&self) -> Result<i64, AppError>;

    async fn total_clicks(&self) -> Result<i64, AppError>;

    /// Most-clicked links, ties broken by newest `created_at` first.
    async fn top_by_clicks(&self, limit: i64) -> Result<Vec<LinkEntry>, AppError>;
}

/// In-memory variant. One lock guards all reads and writes.
#[derive(Default)]
pub struct MemoryLinkStore {
    links: Mutex<HashMap<String, LinkEntry>>,
}

impl MemoryLinkStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn locked(&self) -> MutexGuard<'_, HashMap<String, LinkEntry>> {
        self.links.lock().expect("link store lock poisoned")
    }
}

#[async_trait]
impl LinkStore for MemoryLinkStore {
    async fn save(&self, code: &str, url: &str) -> Result<LinkEntry, AppError> {
        let mut links = self.locked();
        if links.contains_key(code) {
            return Err(AppError::DuplicateCode);
        }
        let entry = LinkEntry {
            short_code: code.to_string(),
            original_url: url.to_string(),
            created_at: Utc::now(),
            clicks: 0,
        };
        links.insert(code.to_string(), entry.clone());
        Ok(entry)
    }

    async fn lookup(&self, code: &str) -> Result<Option<LinkEntry>, AppError> {
        Ok(self.locked().get(code).cloned())
    }

    async fn increment_clicks(&self, code: &str) -> Result<(), AppError> {
        if let Some(entry) = self.locked().get_mut(code) {
            entry.clicks += 1;
        }
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<LinkEntry>, AppError> {
        let mut entries: Vec<LinkEntry> = self.locked().values().cloned().collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }

    async fn delete(&self, code: &str) -> Result<u64, AppError> {
        Ok(self.locked().remove(code).map(|_| 1).unwrap_or(0))
    }

    async fn count(&self) -> Result<i64, AppError> {
        Ok(self.locked().len() as i64)
    }

    async fn total_clicks(&self) -> Result<i64, AppError> {
        Ok(self.locked().values().map(|entry| entry.clicks).sum())
    }

    async fn top_by_clicks(&self, limit: i64) -> Result<Vec<LinkEntry>, AppError> {
        let mut entries: Vec<LinkEntry> = self.locked().values().cloned().collect();
        entries.sort_by(|a, b| {
            b.clicks
                .cmp(&a.clicks)
                .then(b.created_at.cmp(&a.created_at))
        });
        entries.truncate(limit.max(0) as usize);
        Ok(entries)
    }
}
