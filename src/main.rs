use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use fund_verifier::config::{
    DEFAULT_FUNDSNET_URL, DEFAULT_INPUT_PATH, DEFAULT_OUTPUT_PATH, DEFAULT_TIMEOUT_SECS,
};
use fund_verifier::{
    FundRecord, FundsNetClient, FundsNetConfig, MziqClient, MziqConfig, ReconciliationEngine,
    VerifierConfig,
};

#[derive(Parser)]
#[command(name = "fund-verifier", version, about = "Validate fund CNPJs against FundsNet and MZiQ")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Verify every fund in a spreadsheet and write the annotated copy
    Verify {
        /// Input spreadsheet (.xlsx or .csv) with a CNPJ column
        #[arg(short, long, env = "FUND_VERIFIER_INPUT", default_value = DEFAULT_INPUT_PATH)]
        input: PathBuf,

        /// Output spreadsheet (.xlsx or .csv)
        #[arg(short, long, env = "FUND_VERIFIER_OUTPUT", default_value = DEFAULT_OUTPUT_PATH)]
        output: PathBuf,

        /// Also write a JSON run summary here
        #[arg(long)]
        summary: Option<PathBuf>,

        #[command(flatten)]
        providers: ProviderArgs,
    },

    /// Reconcile a single CNPJ and print the outcome as JSON
    Check {
        /// Fund CNPJ, any formatting
        cnpj: String,

        #[command(flatten)]
        providers: ProviderArgs,
    },
}

#[derive(Args)]
struct ProviderArgs {
    /// FundsNet document search endpoint
    #[arg(long, env = "FUNDSNET_URL", default_value = DEFAULT_FUNDSNET_URL)]
    fundsnet_url: String,

    /// MZiQ funds data service root (the client calls <url>/hash)
    #[arg(long, env = "MZ_IQ_FUNDS_DATA_URL")]
    mziq_url: String,

    /// Value for the mz-internal-app header
    #[arg(long, env = "MZ_IQ_API_KEY", hide_env_values = true)]
    mziq_api_key: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, env = "FUND_VERIFIER_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,
}

impl ProviderArgs {
    fn fundsnet(&self) -> FundsNetConfig {
        FundsNetConfig {
            base_url: self.fundsnet_url.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }

    fn mziq(&self) -> MziqConfig {
        MziqConfig {
            base_url: self.mziq_url.clone(),
            api_key: self.mziq_api_key.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

fn init_logging() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Verify {
            input,
            output,
            summary,
            providers,
        } => run_verify(VerifierConfig {
            input,
            output,
            summary,
            fundsnet: providers.fundsnet(),
            mziq: providers.mziq(),
        }),
        Command::Check { cnpj, providers } => run_check(&cnpj, &providers),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ Fund data verification failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_verify(config: VerifierConfig) -> Result<()> {
    println!("🔎 Fund data verification");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("📂 Input:  {}", config.input.display());
    println!("💾 Output: {}", config.output.display());

    let summary = fund_verifier::run(&config)?;

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✓ Processed {} funds", summary.total);
    println!("✅ Validated:     {}", summary.validated);
    println!("⚠️  Not validated: {}", summary.not_validated);
    for (status, count) in &summary.by_status {
        println!("   {:<24} {}", status, count);
    }
    if let Some(path) = &config.summary {
        println!("📝 Summary written to {}", path.display());
    }
    println!("🎉 Fund data verification completed successfully.");

    Ok(())
}

fn run_check(cnpj: &str, providers: &ProviderArgs) -> Result<()> {
    let engine = ReconciliationEngine::new(
        FundsNetClient::new(&providers.fundsnet())?,
        MziqClient::new(&providers.mziq())?,
    );

    let outcome = engine.reconcile(&FundRecord::new(cnpj));
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    Ok(())
}
