//! Lead processing job handlers: enrichment, scoring, CRM sync.

use super::{parse_payload, repo_error};
use crate::types::{CrmSyncPayload, EnrichLeadPayload, ScoreLeadPayload};
use async_trait::async_trait;
use chrono::Utc;
use leadrail_domain::{Lead, LeadEnrichment, LeadRepository, LeadSource, LeadStatus};
use leadrail_queue::{Job, QueueError, QueueResult};
use thiserror::Error;
use tracing::info;

const FREE_MAIL_DOMAINS: [&str; 4] = ["gmail.com", "yahoo.com", "outlook.com", "hotmail.com"];

/// CRM provider errors.
#[derive(Debug, Error)]
pub enum CrmError {
    #[error("CRM provider error: {0}")]
    Provider(String),
}

/// Seam to the CRM. The production implementation calls the vendor API;
/// failures must propagate so the job is retried.
#[async_trait]
pub trait CrmClient: Send + Sync {
    async fn upsert_lead(&self, lead: &Lead) -> Result<(), CrmError>;
}

/// Stub client that logs instead of calling a CRM.
pub struct LogCrmClient;

#[async_trait]
impl CrmClient for LogCrmClient {
    async fn upsert_lead(&self, lead: &Lead) -> Result<(), CrmError> {
        info!(lead_id = %lead.id, organization_id = %lead.organization_id, "syncing lead to CRM");
        Ok(())
    }
}

pub async fn handle_enrich_lead(repo: &dyn LeadRepository, job: &Job) -> QueueResult<()> {
    let payload: EnrichLeadPayload = parse_payload(job)?;

    let lead = repo.get(&payload.lead_id).await.map_err(repo_error)?;
    let enrichment = derive_enrichment(&lead);
    repo.apply_enrichment(&payload.lead_id, enrichment)
        .await
        .map_err(repo_error)
}

pub async fn handle_calculate_score(repo: &dyn LeadRepository, job: &Job) -> QueueResult<()> {
    let payload: ScoreLeadPayload = parse_payload(job)?;

    let lead = repo.get(&payload.lead_id).await.map_err(repo_error)?;
    let score = calculate_score(&lead);
    repo.update_score(&payload.lead_id, score)
        .await
        .map_err(repo_error)
}

pub async fn handle_sync_to_crm(
    repo: &dyn LeadRepository,
    crm: &dyn CrmClient,
    job: &Job,
) -> QueueResult<()> {
    let payload: CrmSyncPayload = parse_payload(job)?;

    let lead = repo.get(&payload.lead_id).await.map_err(repo_error)?;
    crm.upsert_lead(&lead)
        .await
        .map_err(|e| QueueError::ExecutionFailed(e.to_string()))
}

/// Stubbed enrichment derived from the lead's email domain. Deterministic,
/// so re-running on retry converges to the same result.
fn derive_enrichment(lead: &Lead) -> LeadEnrichment {
    let domain = lead.email.split('@').nth(1).unwrap_or_default();
    let company = (!domain.is_empty() && !FREE_MAIL_DOMAINS.contains(&domain))
        .then(|| domain.split('.').next().unwrap_or(domain).to_string());

    LeadEnrichment {
        company,
        title: None,
        location: None,
        linkedin_url: None,
        enriched_at: Utc::now(),
    }
}

/// Deterministic lead score over source, funnel status and enrichment,
/// clamped to 0-100.
pub fn calculate_score(lead: &Lead) -> u32 {
    let source = match lead.source {
        LeadSource::Website => 30,
        LeadSource::Api => 25,
        LeadSource::Manual => 20,
        LeadSource::Import => 10,
    };

    let status = match lead.status {
        LeadStatus::New => 0,
        LeadStatus::Contacted => 10,
        LeadStatus::Qualified => 30,
        LeadStatus::Converted => 50,
        LeadStatus::Lost => 0,
    };

    let enrichment = match &lead.enrichment {
        Some(e) if e.company.is_some() => 20,
        Some(_) => 15,
        None => 0,
    };

    (source + status + enrichment).min(100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LEAD_QUEUE;
    use leadrail_domain::InMemoryLeadRepository;

    fn seeded_repo(email: &str) -> InMemoryLeadRepository {
        let repo = InMemoryLeadRepository::new();
        repo.insert(Lead::new("l1", "o1", "Jane", email, LeadSource::Website));
        repo
    }

    fn enrich_job() -> Job {
        let payload = EnrichLeadPayload {
            lead_id: "l1".to_string(),
            organization_id: "o1".to_string(),
        };
        Job::new(
            LEAD_QUEUE,
            "enrich_lead_data",
            serde_json::to_value(payload).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_enrichment_extracts_company_from_corporate_domain() {
        let repo = seeded_repo("jane@acme.io");

        handle_enrich_lead(&repo, &enrich_job()).await.unwrap();

        let lead = repo.get("l1").await.unwrap();
        let enrichment = lead.enrichment.expect("enrichment applied");
        assert_eq!(enrichment.company.as_deref(), Some("acme"));
    }

    #[tokio::test]
    async fn test_enrichment_skips_company_for_free_mail() {
        let repo = seeded_repo("jane@gmail.com");

        handle_enrich_lead(&repo, &enrich_job()).await.unwrap();

        let lead = repo.get("l1").await.unwrap();
        assert!(lead.enrichment.expect("enrichment applied").company.is_none());
    }

    #[tokio::test]
    async fn test_enrichment_of_missing_lead_fails_for_retry() {
        let repo = InMemoryLeadRepository::new();

        let err = handle_enrich_lead(&repo, &enrich_job()).await.unwrap_err();
        assert!(matches!(err, QueueError::ExecutionFailed(_)));
    }

    #[tokio::test]
    async fn test_score_is_written_back() {
        let repo = seeded_repo("jane@acme.io");
        let payload = ScoreLeadPayload {
            lead_id: "l1".to_string(),
            organization_id: "o1".to_string(),
        };
        let job = Job::new(
            LEAD_QUEUE,
            "calculate_lead_score",
            serde_json::to_value(payload).unwrap(),
        );

        handle_calculate_score(&repo, &job).await.unwrap();

        // Website source, status New, no enrichment yet
        assert_eq!(repo.get("l1").await.unwrap().score, Some(30));
    }

    #[test]
    fn test_score_heuristic() {
        let mut lead = Lead::new("l1", "o1", "Jane", "jane@acme.io", LeadSource::Website);
        assert_eq!(calculate_score(&lead), 30);

        lead.status = LeadStatus::Qualified;
        assert_eq!(calculate_score(&lead), 60);

        lead.enrichment = Some(LeadEnrichment {
            company: Some("acme".to_string()),
            title: None,
            location: None,
            linkedin_url: None,
            enriched_at: Utc::now(),
        });
        assert_eq!(calculate_score(&lead), 80);

        lead.status = LeadStatus::Converted;
        assert_eq!(calculate_score(&lead), 100); // clamped

        lead.source = LeadSource::Import;
        assert_eq!(calculate_score(&lead), 80);
    }

    #[tokio::test]
    async fn test_crm_sync_reads_the_current_lead() {
        struct AssertingCrm;

        #[async_trait]
        impl CrmClient for AssertingCrm {
            async fn upsert_lead(&self, lead: &Lead) -> Result<(), CrmError> {
                assert_eq!(lead.id, "l1");
                Ok(())
            }
        }

        let repo = seeded_repo("jane@acme.io");
        let payload = CrmSyncPayload {
            lead_id: "l1".to_string(),
            organization_id: "o1".to_string(),
        };
        let job = Job::new(
            LEAD_QUEUE,
            "sync_to_crm",
            serde_json::to_value(payload).unwrap(),
        );

        handle_sync_to_crm(&repo, &AssertingCrm, &job).await.unwrap();
    }
}
