// Fund Verifier - Core Library
// Cross-checks each fund's CNPJ against FundsNet and MZiQ and annotates the spreadsheet

pub mod config;
pub mod dataset;
pub mod model;
pub mod normalizer;
pub mod providers;
pub mod reconciliation;
pub mod run;

// Re-export commonly used types
pub use config::{FundsNetConfig, MziqConfig, VerifierConfig};
pub use dataset::{load_dataset, save_dataset, Dataset, FileFormat};
pub use model::{
    FundRecord, LookupResult, OutcomeStatus, SecondaryIdResult, ValidationOutcome,
};
pub use normalizer::{identifiers_match, normalize, normalize_opt};
pub use providers::{
    FilingRegistry, FundsNetClient, IdentifierRegistry, MziqClient, ProviderError,
};
pub use reconciliation::ReconciliationEngine;
pub use run::{reconcile_all, run, verify_with, RunSummary};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
