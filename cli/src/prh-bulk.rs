use clap::Parser;
use lib_prh::configs::SyncSettings;
use lib_prh::connections::{Database, PgCandidateSource, PgStore};
use lib_prh::ingestors::{BatchError, Orchestrator, RunSummary, SyncEngine};
use lib_prh::loggers::setup_logging;
use serde_json::json;
use tracing::{info, warn};

mod fetcher;

/// Re-syncs every candidate company from the input database into the output database.
#[derive(Parser, Debug)]
#[command(
    version,
    about,
    long_about = "Reads candidate companies from the input database, fetches each one from the PRH open-data API and upserts it into the output database. Prints one JSON result per company."
)]
struct Args {
    /// Custom candidate query. Must select `company_number` and `pk` columns.
    #[arg(long)]
    query: Option<String>,

    /// Pretty-print the JSON output.
    #[arg(long)]
    pretty: bool,

    #[command(flatten)]
    settings: SyncSettings,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    let config = SyncSettings::layered(args.settings).resolve()?;
    let _guard = setup_logging(&config.log_dir, &config.log_level)?;

    let input = Database::new(config.input_db()?, config.db_max_connections).await?;
    let output = Database::new_lazy(config.output_db()?, config.db_max_connections)?;

    let orchestrator = Orchestrator::new(
        fetcher::prh_client(&config)?,
        SyncEngine::new(PgStore::from(output)),
    );
    let source = PgCandidateSource::from(input);

    let report = match orchestrator.run_batch(&source, args.query.as_deref()).await {
        Ok(results) => {
            let summary = RunSummary::from_results(&results);
            info!(?summary, "Bulk run finished");
            json!({ "summary": summary, "results": results })
        }
        Err(BatchError::NoCandidates) => {
            warn!("No candidate companies, nothing to do");
            json!({ "summary": RunSummary::default(), "results": null })
        }
        Err(e) => return Err(e.into()),
    };

    let out = if args.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{out}");
    Ok(())
}
