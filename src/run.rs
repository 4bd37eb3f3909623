// 🏃 Verification run - one pass over the fund spreadsheet
//
// load → reconcile each row (sequentially, in order) → annotate → save
//
// Per-row failures cannot stop the run: the engine always yields an outcome.
// Only I/O on the dataset itself is fatal.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::VerifierConfig;
use crate::dataset::{load_dataset, save_dataset, Dataset};
use crate::model::{FundRecord, OutcomeStatus, ValidationOutcome};
use crate::providers::{FilingRegistry, FundsNetClient, IdentifierRegistry, MziqClient};
use crate::reconciliation::ReconciliationEngine;

// ============================================================================
// RUN SUMMARY
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub input_path: PathBuf,
    /// SHA-256 of the input file bytes
    pub input_sha256: String,
    pub output_path: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total: usize,
    pub validated: usize,
    pub not_validated: usize,
    /// Count per OutcomeStatus code
    pub by_status: BTreeMap<String, usize>,
}

impl RunSummary {
    fn new(input_path: &Path, input_sha256: String, output_path: &Path) -> Self {
        RunSummary {
            run_id: uuid::Uuid::new_v4().to_string(),
            input_path: input_path.to_path_buf(),
            input_sha256,
            output_path: output_path.to_path_buf(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            total: 0,
            validated: 0,
            not_validated: 0,
            by_status: BTreeMap::new(),
        }
    }

    fn record(&mut self, outcome: &ValidationOutcome) {
        self.total += 1;
        if outcome.validated {
            self.validated += 1;
        } else {
            self.not_validated += 1;
        }
        *self
            .by_status
            .entry(outcome.status.code().to_string())
            .or_insert(0) += 1;
    }

    pub fn count(&self, status: OutcomeStatus) -> usize {
        self.by_status.get(status.code()).copied().unwrap_or(0)
    }

    pub fn lookup_failures(&self) -> usize {
        self.count(OutcomeStatus::FilingNotFound) + self.count(OutcomeStatus::SecondaryIdNotFound)
    }

    pub fn summary(&self) -> String {
        format!(
            "Run {}: {} funds, {} validated, {} not validated ({} mismatched, {} lookups failed)",
            self.run_id,
            self.total,
            self.validated,
            self.not_validated,
            self.count(OutcomeStatus::Mismatch),
            self.lookup_failures()
        )
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write run summary {}", path.display()))?;
        Ok(())
    }
}

pub fn sha256_file(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

// ============================================================================
// RUNNING
// ============================================================================

/// Reconcile every record in order, one outcome per record
pub fn reconcile_all<A, B>(
    engine: &ReconciliationEngine<A, B>,
    records: &[FundRecord],
) -> Vec<ValidationOutcome>
where
    A: FilingRegistry,
    B: IdentifierRegistry,
{
    let total = records.len();
    records
        .iter()
        .enumerate()
        .map(|(idx, record)| {
            info!(
                row = idx + 1,
                total,
                cnpj = record.primary_id().unwrap_or(""),
                "processing fund"
            );
            let outcome = engine.reconcile(record);
            info!(
                row = idx + 1,
                validated = outcome.validated,
                status = outcome.status.code(),
                "fund processed"
            );
            outcome
        })
        .collect()
}

/// Load, reconcile, annotate and save using the given providers
pub fn verify_with<A, B>(
    engine: &ReconciliationEngine<A, B>,
    input: &Path,
    output: &Path,
) -> Result<(Dataset, RunSummary)>
where
    A: FilingRegistry,
    B: IdentifierRegistry,
{
    let digest = sha256_file(input)?;
    let mut summary = RunSummary::new(input, digest, output);

    let mut dataset = load_dataset(input)?;
    let records = dataset.records()?;
    info!(
        run_id = %summary.run_id,
        rows = records.len(),
        input = %input.display(),
        "loaded fund dataset"
    );

    let outcomes = reconcile_all(engine, &records);
    for outcome in &outcomes {
        summary.record(outcome);
    }

    dataset.annotate(&outcomes)?;
    save_dataset(&dataset, output)?;
    summary.finished_at = Utc::now();

    info!(output = %output.display(), "{}", summary.summary());
    Ok((dataset, summary))
}

/// Full run from configuration: build the real HTTP clients and verify
pub fn run(config: &VerifierConfig) -> Result<RunSummary> {
    config.validate()?;

    let engine = ReconciliationEngine::new(
        FundsNetClient::new(&config.fundsnet)?,
        MziqClient::new(&config.mziq)?,
    );

    let (_, summary) = verify_with(&engine, &config.input, &config.output)?;

    if let Some(path) = &config.summary {
        summary.write_json(path)?;
    }

    Ok(summary)
}

// ============================================================================
// TESTS
// ============================================================================
