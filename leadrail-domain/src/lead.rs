//! Lead model shared by events, handlers and repositories.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Funnel status of a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeadStatus {
    New,
    Contacted,
    Qualified,
    Converted,
    Lost,
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::New => "NEW",
            Self::Contacted => "CONTACTED",
            Self::Qualified => "QUALIFIED",
            Self::Converted => "CONVERTED",
            Self::Lost => "LOST",
        };
        f.write_str(s)
    }
}

/// Where a lead entered the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeadSource {
    Website,
    Api,
    Import,
    Manual,
}

impl fmt::Display for LeadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Website => "WEBSITE",
            Self::Api => "API",
            Self::Import => "IMPORT",
            Self::Manual => "MANUAL",
        };
        f.write_str(s)
    }
}

/// Third-party data attached to a lead by the enrichment job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadEnrichment {
    pub company: Option<String>,
    pub title: Option<String>,
    pub location: Option<String>,
    pub linkedin_url: Option<String>,
    pub enriched_at: DateTime<Utc>,
}

/// A lead belonging to one organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub email: String,
    pub status: LeadStatus,
    pub source: LeadSource,
    pub score: Option<u32>,
    pub enrichment: Option<LeadEnrichment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    /// Create a fresh lead in status `New`.
    pub fn new(
        id: impl Into<String>,
        organization_id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        source: LeadSource,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            organization_id: organization_id.into(),
            name: name.into(),
            email: email.into(),
            status: LeadStatus::New,
            source,
            score: None,
            enrichment: None,
            created_at: now,
            updated_at: now,
        }
    }
}
