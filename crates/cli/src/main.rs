// paymatch CLI — one reconciliation run over CSV snapshots, result as JSON.
// The engine never fetches data; whatever exported these files is the caller.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;

use paymatch_engine::load;
use paymatch_engine::model::RunInput;
use paymatch_engine::semantic::Disambiguator;
use paymatch_engine::{run, EngineConfig, RunResult};
use paymatch_semantic::SemanticClient;

const EXIT_ERROR: u8 = 1;

#[derive(Parser)]
#[command(name = "paymatch")]
#[command(about = "Reconcile bank transactions against open invoices")]
#[command(version)]
#[command(after_help = "\
Examples:
  paymatch --transactions txns.csv --invoices invoices.csv
  paymatch --config month-end.toml --transactions txns.csv --invoices invoices.csv --out result.json")]
struct Cli {
    /// Engine config TOML; built-in defaults when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Bank transaction snapshot (CSV)
    #[arg(long)]
    transactions: PathBuf,

    /// Open invoice snapshot (CSV)
    #[arg(long)]
    invoices: PathBuf,

    /// Learned counterparty-to-company associations (CSV)
    #[arg(long)]
    associations: Option<PathBuf>,

    /// Previously denied transaction-invoice pairs (CSV)
    #[arg(long)]
    denied: Option<PathBuf>,

    /// Write the full result JSON here instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,

    /// Print the summary only, skip the JSON result
    #[arg(long)]
    summary_only: bool,

    /// Bearer token for the semantic service
    #[arg(long, env = "PAYMATCH_SEMANTIC_TOKEN", hide_env_values = true)]
    semantic_token: Option<String>,
}

fn main() -> ExitCode {
    match real_main(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("error: {msg}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn real_main(cli: Cli) -> Result<(), String> {
    let config = match &cli.config {
        Some(path) => EngineConfig::from_toml(&read(path)?).map_err(|e| e.to_string())?,
        None => EngineConfig::default(),
    };

    let transactions = load::load_transactions_csv(&read(&cli.transactions)?)
        .map_err(|e| e.to_string())?;
    let invoices = load::load_invoices_csv(&read(&cli.invoices)?).map_err(|e| e.to_string())?;
    let associations = match &cli.associations {
        Some(path) => load::load_associations_csv(&read(path)?).map_err(|e| e.to_string())?,
        None => load::Loaded { records: Vec::new(), skipped: 0 },
    };
    let denied = match &cli.denied {
        Some(path) => load::load_denied_pairs_csv(&read(path)?).map_err(|e| e.to_string())?,
        None => load::Loaded { records: Vec::new(), skipped: 0 },
    };

    let unparsed_rows = transactions.skipped + invoices.skipped + associations.skipped;
    if unparsed_rows > 0 {
        eprintln!("warning: {unparsed_rows} snapshot row(s) failed to parse and were skipped");
    }

    let input = RunInput {
        transactions: transactions.records,
        invoices: invoices.records,
        associations: associations.records,
        denied_pairs: denied.records,
    };

    // The client must outlive the run; build it up front when enabled.
    let client: Option<SemanticClient> = if config.semantic.enabled {
        let api_base = config
            .semantic
            .api_base
            .as_deref()
            .ok_or("semantic.enabled is set but semantic.api_base is missing")?;
        Some(SemanticClient::new(
            api_base,
            cli.semantic_token.clone(),
            Duration::from_secs(config.semantic.timeout_secs),
            config.semantic.retries,
        ))
    } else {
        None
    };
    let disambiguator = client.as_ref().map(|c| c as &dyn Disambiguator);

    let result = run(&config, &input, disambiguator).map_err(|e| e.to_string())?;
    print_summary(&config, &result);

    if !cli.summary_only {
        let json = serde_json::to_string_pretty(&result).map_err(|e| e.to_string())?;
        match &cli.out {
            Some(path) => fs::write(path, json.as_bytes())
                .map_err(|e| format!("{}: {e}", path.display()))?,
            None => println!("{json}"),
        }
    }

    Ok(())
}

fn print_summary(config: &EngineConfig, result: &RunResult) {
    let stats = &result.stats;
    eprintln!(
        "{}: {} match(es) — {} auto-approved, {} needs review",
        config.name,
        result.matches.len(),
        stats.auto_approved,
        stats.needs_review,
    );
    eprintln!(
        "  unmatched: {} transaction(s), {} invoice(s); {} candidate(s) below review threshold",
        result.unmatched_transactions.len(),
        result.unmatched_invoices.len(),
        stats.below_review,
    );
    eprintln!(
        "  matched amount: {}.{:02} ({} rule-based, {} AI-confirmed)",
        stats.total_matched_cents / 100,
        (stats.total_matched_cents % 100).abs(),
        stats.rule_based,
        stats.ai_confirmed,
    );
    if stats.skipped_transactions + stats.skipped_invoices > 0 {
        eprintln!(
            "  skipped malformed input: {} transaction(s), {} invoice(s)",
            stats.skipped_transactions, stats.skipped_invoices,
        );
    }
    if config.semantic.enabled {
        eprintln!(
            "  semantic: {} call(s), {} failure(s)",
            stats.semantic_calls, stats.semantic_failures,
        );
    }
}

fn read(path: &Path) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))
}
