// 🌐 Provider clients
// Two fixed external registries, each behind a one-method trait:
//
//   FilingRegistry     (FundsNet) : primary id  → description + last filing date
//   IdentifierRegistry (MZiQ)     : description → secondary id
//
// Failures never leave this module: every error is logged and turned into an
// absent result, so the reconciliation loop needs no error handling.

pub mod fundsnet;
pub mod mziq;

use std::time::Duration;

use anyhow::{Context, Result};
use thiserror::Error;

use crate::model::{LookupResult, SecondaryIdResult};

pub use fundsnet::FundsNetClient;
pub use mziq::MziqClient;

// ============================================================================
// CAPABILITIES
// ============================================================================

/// Provider A: registry queried by primary identifier
pub trait FilingRegistry {
    fn lookup_by_primary_id(&self, primary_id: &str) -> LookupResult;
}

/// Provider B: registry queried by the description from Provider A
pub trait IdentifierRegistry {
    fn lookup_secondary_id(&self, description: &str) -> SecondaryIdResult;
}

impl<T: FilingRegistry + ?Sized> FilingRegistry for &T {
    fn lookup_by_primary_id(&self, primary_id: &str) -> LookupResult {
        (**self).lookup_by_primary_id(primary_id)
    }
}

impl<T: IdentifierRegistry + ?Sized> IdentifierRegistry for &T {
    fn lookup_secondary_id(&self, description: &str) -> SecondaryIdResult {
        (**self).lookup_secondary_id(description)
    }
}

// ============================================================================
// ERRORS (internal to the clients)
// ============================================================================

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed payload: {0}")]
    Payload(String),

    #[error("no match in response")]
    NotFound,
}

// ============================================================================
// SHARED HTTP PLUMBING
// ============================================================================

/// Blocking client shared by both providers
pub(crate) fn build_http_client(timeout: Duration) -> Result<reqwest::blocking::Client> {
    reqwest::blocking::Client::builder()
        .user_agent(format!("fund-verifier/{}", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
        .context("Failed to create HTTP client")
}

/// Send a prepared GET and decode the JSON body, mapping every failure mode
pub(crate) fn fetch_json(
    request: reqwest::blocking::RequestBuilder,
) -> Result<serde_json::Value, ProviderError> {
    let response = request.send()?;
    let status = response.status();

    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(ProviderError::Status {
            status: status.as_u16(),
            body: truncate(&body, 200),
        });
    }

    let text = response.text()?;
    serde_json::from_str(&text).map_err(|e| ProviderError::Payload(e.to_string()))
}

/// Read a JSON field that may be a string or a number
pub(crate) fn json_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => crate::model::non_blank(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}…", head)
    }
}
