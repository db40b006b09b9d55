use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A contest grouping owned by the vote store. Immutable for the duration
/// of an election cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// Display-only nominee attributes. Never consulted during aggregation;
/// absent values are dropped from serialized payloads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NomineeAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub church: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub county: Option<String>,
}

/// One row of the vote store's tally query: a (category, nominee) pair with
/// the nominee's vote total. The store pre-sums quantities, but itemized
/// input (several rows per nominee) is also accepted and summed downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteRow {
    pub category_id: i64,
    pub category_name: String,
    pub nominee_id: i64,
    pub nominee_name: String,
    pub attributes: NomineeAttributes,
    pub vote_total: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NomineeSummary {
    pub nominee_id: i64,
    pub nominee_name: String,
    #[serde(flatten)]
    pub attributes: NomineeAttributes,
    pub votes: i64,
    pub percentage: f64,
    pub is_leader: bool,
}

/// Derived per-category tally. Built fresh on every cache miss and
/// discarded once serialized; it has no lifecycle beyond its cache
/// entry's TTL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category_id: i64,
    pub category_name: String,
    pub total_votes: i64,
    pub nominees: Vec<NomineeSummary>,
    pub computed_at: DateTime<Utc>,
}
