// MZiQ funds data: resolves a fund name to the id stored on the MZiQ side

use tracing::{debug, warn};

use super::{build_http_client, fetch_json, json_text, IdentifierRegistry, ProviderError};
use crate::config::MziqConfig;
use crate::model::SecondaryIdResult;

/// Header carrying the internal application key
pub const API_KEY_HEADER: &str = "mz-internal-app";

pub struct MziqClient {
    http: reqwest::blocking::Client,
    hash_url: String,
    api_key: Option<String>,
}

impl MziqClient {
    pub fn new(config: &MziqConfig) -> anyhow::Result<Self> {
        Ok(MziqClient {
            http: build_http_client(config.timeout)?,
            hash_url: format!("{}/hash", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
        })
    }

    fn fetch(&self, fund_name: &str) -> Result<SecondaryIdResult, ProviderError> {
        let mut request = self.http.get(&self.hash_url).query(&[("fundName", fund_name)]);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let body = fetch_json(request)?;
        let id = body.get("id").and_then(json_text).ok_or(ProviderError::NotFound)?;

        Ok(SecondaryIdResult::found(&id))
    }
}

impl IdentifierRegistry for MziqClient {
    fn lookup_secondary_id(&self, description: &str) -> SecondaryIdResult {
        if description.trim().is_empty() {
            debug!("MZiQ: empty fund name, skipping lookup");
            return SecondaryIdResult::absent();
        }

        // Sent exactly as FundsNet spelled it
        match self.fetch(description) {
            Ok(result) => result,
            Err(e) => {
                warn!(fund_name = description, error = %e, "MZiQ lookup failed");
                SecondaryIdResult::absent()
            }
        }
    }
}
