// ⚖️ Reconciliation Engine - Cross-check a fund against both registries
//
// Following the recipe:
//   CNPJ ──FundsNet──▶ description ──MZiQ──▶ secondary id
//   validated = normalize(CNPJ) == normalize(secondary id)  (and non-empty)
//
// Fail-closed: whenever a step yields nothing, the fund is reported as NOT
// validated, with whatever partial data was obtained.

use tracing::{debug, info};

use crate::model::{FundRecord, OutcomeStatus, ValidationOutcome};
use crate::normalizer::{identifiers_match, normalize_opt};
use crate::providers::{FilingRegistry, IdentifierRegistry};

// ============================================================================
// RECONCILIATION ENGINE
// ============================================================================

pub struct ReconciliationEngine<A, B> {
    filings: A,
    identifiers: B,
}

impl<A: FilingRegistry, B: IdentifierRegistry> ReconciliationEngine<A, B> {
    pub fn new(filings: A, identifiers: B) -> Self {
        ReconciliationEngine {
            filings,
            identifiers,
        }
    }

    /// Reconcile one fund record. Never fails.
    ///
    /// Example:
    /// ```no_run
    /// use fund_verifier::{FundRecord, FundsNetClient, MziqClient, ReconciliationEngine};
    /// use fund_verifier::config::{FundsNetConfig, MziqConfig};
    /// use std::time::Duration;
    ///
    /// let fundsnet = FundsNetClient::new(&FundsNetConfig::default()).unwrap();
    /// let mziq = MziqClient::new(&MziqConfig {
    ///     base_url: "https://mziq.example.com/funds-data".to_string(),
    ///     api_key: None,
    ///     timeout: Duration::from_secs(10),
    /// })
    /// .unwrap();
    ///
    /// let engine = ReconciliationEngine::new(fundsnet, mziq);
    /// let outcome = engine.reconcile(&FundRecord::new("11.222.333/0001-44"));
    /// println!("validated: {}", outcome.validated);
    /// ```
    pub fn reconcile(&self, record: &FundRecord) -> ValidationOutcome {
        let primary_id = record.primary_id().unwrap_or_default();

        // 1. FundsNet: description + last filing date
        let lookup = self.filings.lookup_by_primary_id(primary_id);

        // 2. No description → nothing to drive MZiQ with
        let description = match lookup.description.as_deref() {
            Some(d) => d,
            None => {
                info!(cnpj = primary_id, "no FundsNet filing found");
                return ValidationOutcome::not_validated(&lookup, OutcomeStatus::FilingNotFound);
            }
        };

        // 3. MZiQ: secondary id for that description
        let resolved = self.identifiers.lookup_secondary_id(description);

        // 4. No secondary id → cannot compare
        let secondary_id = match resolved.secondary_id_found {
            Some(id) => id,
            None => {
                info!(cnpj = primary_id, description, "no MZiQ id for fund");
                return ValidationOutcome::not_validated(
                    &lookup,
                    OutcomeStatus::SecondaryIdNotFound,
                );
            }
        };

        // 5. Compare canonical forms
        let matched = identifiers_match(record.primary_id(), Some(&secondary_id));
        debug!(
            normalized_cnpj = %normalize_opt(record.primary_id()),
            normalized_secondary = %normalize_opt(Some(&secondary_id)),
            matched,
            "compared identifiers"
        );

        ValidationOutcome::compared(&lookup, secondary_id, matched)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LookupResult, SecondaryIdResult};
    use chrono::NaiveDate;
    use std::cell::{Cell, RefCell};

    /// FundsNet stand-in: fixed answer, records queries
    struct FakeFilings {
        result: LookupResult,
        queries: RefCell<Vec<String>>,
    }

    impl FakeFilings {
        fn returning(description: Option<&str>, date: Option<NaiveDate>) -> Self {
            FakeFilings {
                result: LookupResult {
                    description: description.map(String::from),
                    last_filing_date: date,
                    document_id: description.map(|_| "812345".to_string()),
                },
                queries: RefCell::new(Vec::new()),
            }
        }
    }

    impl FilingRegistry for FakeFilings {
        fn lookup_by_primary_id(&self, primary_id: &str) -> LookupResult {
            self.queries.borrow_mut().push(primary_id.to_string());
            self.result.clone()
        }
    }

    /// MZiQ stand-in: fixed answer, counts calls
    struct FakeIdentifiers {
        id: Option<String>,
        calls: Cell<usize>,
        last_description: RefCell<Option<String>>,
    }

    impl FakeIdentifiers {
        fn returning(id: Option<&str>) -> Self {
            FakeIdentifiers {
                id: id.map(String::from),
                calls: Cell::new(0),
                last_description: RefCell::new(None),
            }
        }
    }

    impl IdentifierRegistry for FakeIdentifiers {
        fn lookup_secondary_id(&self, description: &str) -> SecondaryIdResult {
            self.calls.set(self.calls.get() + 1);
            *self.last_description.borrow_mut() = Some(description.to_string());
            match &self.id {
                Some(id) => SecondaryIdResult::found(id),
                None => SecondaryIdResult::absent(),
            }
        }
    }

    fn filing_date() -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2024, 1, 15)
    }

    #[test]
    fn test_matching_identifiers_validate() {
        let filings = FakeFilings::returning(Some("Fund Alpha"), filing_date());
        let identifiers = FakeIdentifiers::returning(Some("11222333000144"));
        let engine = ReconciliationEngine::new(&filings, &identifiers);

        let outcome = engine.reconcile(&FundRecord::new("11.222.333/0001-44"));

        assert!(outcome.validated);
        assert_eq!(outcome.status, OutcomeStatus::Matched);
        assert_eq!(outcome.last_filing_date, filing_date());
        assert_eq!(outcome.resolved_secondary_id.as_deref(), Some("11222333000144"));
        assert_eq!(outcome.external_id.as_deref(), Some("812345"));
        assert_eq!(*filings.queries.borrow(), vec!["11.222.333/0001-44".to_string()]);
        assert_eq!(identifiers.last_description.borrow().as_deref(), Some("Fund Alpha"));

        println!("✅ Test passed: {:?}", outcome.status);
    }

    #[test]
    fn test_missing_description_skips_second_lookup() {
        let filings = FakeFilings::returning(None, None);
        let identifiers = FakeIdentifiers::returning(Some("11222333000144"));
        let engine = ReconciliationEngine::new(&filings, &identifiers);

        let outcome = engine.reconcile(&FundRecord::new("11.222.333/0001-44"));

        assert!(!outcome.validated);
        assert_eq!(outcome.status, OutcomeStatus::FilingNotFound);
        assert_eq!(outcome.resolved_secondary_id, None);
        assert_eq!(identifiers.calls.get(), 0);
    }

    #[test]
    fn test_missing_description_keeps_filing_date() {
        let filings = FakeFilings::returning(None, filing_date());
        let identifiers = FakeIdentifiers::returning(None);
        let engine = ReconciliationEngine::new(&filings, &identifiers);

        let outcome = engine.reconcile(&FundRecord::new("11222333000144"));

        assert!(!outcome.validated);
        assert_eq!(outcome.last_filing_date, filing_date());
        assert_eq!(identifiers.calls.get(), 0);
    }

    #[test]
    fn test_missing_secondary_id_is_not_validated() {
        let filings = FakeFilings::returning(Some("Fund Alpha"), filing_date());
        let identifiers = FakeIdentifiers::returning(None);
        let engine = ReconciliationEngine::new(&filings, &identifiers);

        let outcome = engine.reconcile(&FundRecord::new("11.222.333/0001-44"));

        assert!(!outcome.validated);
        assert_eq!(outcome.status, OutcomeStatus::SecondaryIdNotFound);
        assert_eq!(outcome.last_filing_date, filing_date());
        assert_eq!(outcome.resolved_secondary_id, None);
        assert_eq!(identifiers.calls.get(), 1);
    }

    #[test]
    fn test_different_identifier_is_mismatch() {
        let filings = FakeFilings::returning(Some("Fund Alpha"), filing_date());
        let identifiers = FakeIdentifiers::returning(Some("99999999999999"));
        let engine = ReconciliationEngine::new(&filings, &identifiers);

        let outcome = engine.reconcile(&FundRecord::new("11.222.333/0001-44"));

        assert!(!outcome.validated);
        assert_eq!(outcome.status, OutcomeStatus::Mismatch);
        assert_eq!(outcome.last_filing_date, filing_date());
        assert_eq!(outcome.resolved_secondary_id.as_deref(), Some("99999999999999"));
    }

    #[test]
    fn test_blank_identifiers_never_match() {
        // Punctuation-only on both sides normalizes to "" on both sides
        let filings = FakeFilings::returning(Some("Fund Alpha"), filing_date());
        let identifiers = FakeIdentifiers::returning(Some("--"));
        let engine = ReconciliationEngine::new(&filings, &identifiers);

        let record = FundRecord {
            secondary_id: None,
            primary_id: Some("./-".to_string()),
            status: None,
        };
        let outcome = engine.reconcile(&record);

        assert!(!outcome.validated);
        assert_eq!(outcome.status, OutcomeStatus::Mismatch);
    }

    #[test]
    fn test_absent_primary_id_queries_with_empty_string() {
        let filings = FakeFilings::returning(None, None);
        let identifiers = FakeIdentifiers::returning(None);
        let engine = ReconciliationEngine::new(&filings, &identifiers);

        let record = FundRecord {
            secondary_id: Some("abc".to_string()),
            primary_id: None,
            status: Some("ATIVO".to_string()),
        };
        let outcome = engine.reconcile(&record);

        assert!(!outcome.validated);
        assert_eq!(*filings.queries.borrow(), vec![String::new()]);
    }

    #[test]
    fn test_case_insensitive_alphanumeric_ids() {
        let filings = FakeFilings::returning(Some("Fund Gamma"), None);
        let identifiers = FakeIdentifiers::returning(Some("ab12cd"));
        let engine = ReconciliationEngine::new(&filings, &identifiers);

        let outcome = engine.reconcile(&FundRecord::new("AB.12/CD"));

        assert!(outcome.validated);
        assert_eq!(outcome.last_filing_date, None);
    }
}
