// 📋 Fund verification entities
// FundRecord (input) → LookupResult / SecondaryIdResult (providers) → ValidationOutcome (output)
//
// All of these are transient: created and consumed while one row is processed.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// INPUT
// ============================================================================

/// One fund row from the input table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundRecord {
    /// Opaque key from the `ID` column, passed through untouched
    pub secondary_id: Option<String>,

    /// Registry identifier (CNPJ), arbitrary formatting
    pub primary_id: Option<String>,

    /// Free-form status from the `STATUS` column, passed through untouched
    pub status: Option<String>,
}

impl FundRecord {
    pub fn new(primary_id: &str) -> Self {
        FundRecord {
            secondary_id: None,
            primary_id: non_blank(primary_id),
            status: None,
        }
    }

    pub fn primary_id(&self) -> Option<&str> {
        self.primary_id.as_deref()
    }
}

// ============================================================================
// PROVIDER RESULTS
// ============================================================================

/// Provider A (FundsNet) answer for a primary id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupResult {
    pub description: Option<String>,
    pub last_filing_date: Option<NaiveDate>,
    /// Id of the most recent filing document
    pub document_id: Option<String>,
}

impl LookupResult {
    /// No match, or the call failed
    pub fn absent() -> Self {
        LookupResult::default()
    }

    pub fn is_absent(&self) -> bool {
        self.description.is_none() && self.last_filing_date.is_none() && self.document_id.is_none()
    }
}

/// Provider B (MZiQ) answer for a fund description
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryIdResult {
    pub secondary_id_found: Option<String>,
}

impl SecondaryIdResult {
    pub fn absent() -> Self {
        SecondaryIdResult::default()
    }

    pub fn found(id: &str) -> Self {
        SecondaryIdResult {
            secondary_id_found: non_blank(id),
        }
    }
}

// ============================================================================
// OUTPUT
// ============================================================================

/// Why a record ended up validated or not
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Both lookups succeeded and the identifiers reconcile
    Matched,
    /// Both lookups succeeded but the identifiers differ (or are blank)
    Mismatch,
    /// Provider A had no description for the primary id
    FilingNotFound,
    /// Provider B had no identifier for the description
    SecondaryIdNotFound,
}

impl OutcomeStatus {
    pub fn code(&self) -> &str {
        match self {
            OutcomeStatus::Matched => "matched",
            OutcomeStatus::Mismatch => "mismatch",
            OutcomeStatus::FilingNotFound => "filing_not_found",
            OutcomeStatus::SecondaryIdNotFound => "secondary_id_not_found",
        }
    }

    /// Lookup failed before a comparison could be made
    pub fn is_lookup_failure(&self) -> bool {
        matches!(
            self,
            OutcomeStatus::FilingNotFound | OutcomeStatus::SecondaryIdNotFound
        )
    }
}

/// Result of reconciling one FundRecord
///
/// Invariant: `validated == (status == OutcomeStatus::Matched)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub validated: bool,
    pub last_filing_date: Option<NaiveDate>,
    pub resolved_secondary_id: Option<String>,
    pub external_id: Option<String>,
    pub status: OutcomeStatus,
}

impl ValidationOutcome {
    /// Fail-closed outcome carrying whatever Provider A returned
    pub fn not_validated(lookup: &LookupResult, status: OutcomeStatus) -> Self {
        ValidationOutcome {
            validated: false,
            last_filing_date: lookup.last_filing_date,
            resolved_secondary_id: None,
            external_id: lookup.document_id.clone(),
            status,
        }
    }

    /// Outcome after both lookups produced a value
    pub fn compared(lookup: &LookupResult, resolved_secondary_id: String, matched: bool) -> Self {
        ValidationOutcome {
            validated: matched,
            last_filing_date: lookup.last_filing_date,
            resolved_secondary_id: Some(resolved_secondary_id),
            external_id: lookup.document_id.clone(),
            status: if matched {
                OutcomeStatus::Matched
            } else {
                OutcomeStatus::Mismatch
            },
        }
    }

    /// `YYYY-MM-DD` or empty, as written to the output table
    pub fn filing_date_cell(&self) -> String {
        self.last_filing_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    }
}

/// Trim and drop empty strings
pub(crate) fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
