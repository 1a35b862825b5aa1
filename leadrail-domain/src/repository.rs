//! Repository seams to the persistence layer.
//!
//! Job handlers read and write entities only through these traits. The
//! production implementations live with the application's database layer;
//! the in-memory implementations here back tests and local wiring.

use crate::lead::{Lead, LeadEnrichment};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;
use uuid::Uuid;

/// Repository errors. Storage failures must propagate to the caller so a
/// failed job attempt is retried.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Read/write access to leads.
#[async_trait]
pub trait LeadRepository: Send + Sync {
    async fn get(&self, lead_id: &str) -> RepositoryResult<Lead>;

    async fn update_score(&self, lead_id: &str, score: u32) -> RepositoryResult<()>;

    async fn apply_enrichment(
        &self,
        lead_id: &str,
        enrichment: LeadEnrichment,
    ) -> RepositoryResult<()>;
}

/// An in-app notification row.
#[derive(Debug, Clone)]
pub struct NotificationRecord {
    pub id: Uuid,
    pub organization_id: String,
    pub title: String,
    pub body: String,
    pub link: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NotificationRecord {
    pub fn new(
        organization_id: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
        link: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            organization_id: organization_id.into(),
            title: title.into(),
            body: body.into(),
            link,
            created_at: Utc::now(),
        }
    }
}

/// Write access to in-app notifications.
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn insert(&self, record: NotificationRecord) -> RepositoryResult<()>;
}

/// In-memory lead store for tests and local wiring.
#[derive(Default)]
pub struct InMemoryLeadRepository {
    leads: RwLock<HashMap<String, Lead>>,
}

impl InMemoryLeadRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a lead.
    pub fn insert(&self, lead: Lead) {
        self.leads.write().unwrap().insert(lead.id.clone(), lead);
    }
}

#[async_trait]
impl LeadRepository for InMemoryLeadRepository {
    async fn get(&self, lead_id: &str) -> RepositoryResult<Lead> {
        self.leads
            .read()
            .unwrap()
            .get(lead_id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(format!("lead {lead_id}")))
    }

    async fn update_score(&self, lead_id: &str, score: u32) -> RepositoryResult<()> {
        let mut leads = self.leads.write().unwrap();
        let lead = leads
            .get_mut(lead_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("lead {lead_id}")))?;
        lead.score = Some(score);
        lead.updated_at = Utc::now();
        Ok(())
    }

    async fn apply_enrichment(
        &self,
        lead_id: &str,
        enrichment: LeadEnrichment,
    ) -> RepositoryResult<()> {
        let mut leads = self.leads.write().unwrap();
        let lead = leads
            .get_mut(lead_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("lead {lead_id}")))?;
        lead.enrichment = Some(enrichment);
        lead.updated_at = Utc::now();
        Ok(())
    }
}

/// In-memory notification store for tests and local wiring.
#[derive(Default)]
pub struct InMemoryNotificationRepository {
    records: RwLock<Vec<NotificationRecord>>,
}

impl InMemoryNotificationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of stored notifications.
    pub fn all(&self) -> Vec<NotificationRecord> {
        self.records.read().unwrap().clone()
    }
}

#[async_trait]
impl NotificationRepository for InMemoryNotificationRepository {
    async fn insert(&self, record: NotificationRecord) -> RepositoryResult<()> {
        self.records.write().unwrap().push(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lead::LeadSource;

    #[tokio::test]
    async fn test_in_memory_lead_repository() {
        let repo = InMemoryLeadRepository::new();
        repo.insert(Lead::new("l1", "o1", "Jane", "jane@x.com", LeadSource::Api));

        let lead = repo.get("l1").await.unwrap();
        assert_eq!(lead.email, "jane@x.com");
        assert!(lead.score.is_none());

        repo.update_score("l1", 65).await.unwrap();
        assert_eq!(repo.get("l1").await.unwrap().score, Some(65));
    }

    #[tokio::test]
    async fn test_missing_lead_is_not_found() {
        let repo = InMemoryLeadRepository::new();
        let err = repo.get("ghost").await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));

        let err = repo.update_score("ghost", 1).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_in_memory_notification_repository() {
        let repo = InMemoryNotificationRepository::new();
        repo.insert(NotificationRecord::new("o1", "New lead", "Jane", None))
            .await
            .unwrap();

        let all = repo.all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].organization_id, "o1");
    }
}
