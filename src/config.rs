// ⚙️ Verifier configuration
// Explicit values handed to the provider clients and the run; nothing global.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};

pub const DEFAULT_FUNDSNET_URL: &str =
    "http://fnet.bmfbovespa.com.br/fnet/publico/pesquisarGerenciadorDocumentosDados";
pub const DEFAULT_INPUT_PATH: &str = "application/documents/entrada.xlsx";
pub const DEFAULT_OUTPUT_PATH: &str = "application/documents/planilha-validada.xlsx";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundsNetConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for FundsNetConfig {
    fn default() -> Self {
        FundsNetConfig {
            base_url: DEFAULT_FUNDSNET_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MziqConfig {
    /// Service root; the client appends `/hash`
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

/// Everything a verification run needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Where to write the JSON run summary, if anywhere
    pub summary: Option<PathBuf>,
    pub fundsnet: FundsNetConfig,
    pub mziq: MziqConfig,
}

impl VerifierConfig {
    /// Check values that would otherwise only fail on the first request
    pub fn validate(&self) -> Result<()> {
        for (name, url) in [
            ("FundsNet URL", &self.fundsnet.base_url),
            ("MZiQ URL", &self.mziq.base_url),
        ] {
            if url.trim().is_empty() {
                bail!("{} is not configured", name);
            }
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                bail!("{} must start with http:// or https:// (got {:?})", name, url);
            }
        }

        if self.fundsnet.timeout.is_zero() || self.mziq.timeout.is_zero() {
            bail!("request timeout must be greater than zero");
        }

        if self.input == self.output {
            bail!("output path must differ from input path ({})", self.input.display());
        }

        Ok(())
    }
}
