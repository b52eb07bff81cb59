use clap::Parser;
use lib_prh::configs::SyncSettings;
use lib_prh::connections::{Database, PgStore};
use lib_prh::ingestors::{Orchestrator, SyncEngine};
use lib_prh::loggers::setup_logging;
use lib_prh::store::memory::MemoryStore;
use serde_json::json;

mod fetcher;

/// Fetches one company and writes it to the output database for the first time.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Business id, e.g. 1234567-8.
    company_number: String,

    /// Existing aggregate key to reuse instead of generating one.
    #[arg(long)]
    company_uid: Option<String>,

    /// Write to an in-memory store and print the decomposed rows instead.
    #[arg(long)]
    dry_run: bool,

    #[command(flatten)]
    settings: SyncSettings,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    let config = SyncSettings::layered(args.settings).resolve()?;
    let _guard = setup_logging(&config.log_dir, &config.log_level)?;
    let fetcher = fetcher::prh_client(&config)?;

    let report = if args.dry_run {
        let orchestrator = Orchestrator::new(fetcher, SyncEngine::new(MemoryStore::new()));
        let run = orchestrator
            .sync_single_with_aggregate(&args.company_number, args.company_uid.as_deref())
            .await;
        json!({ "result": run.result, "aggregate": run.aggregate })
    } else {
        let output = Database::new_lazy(config.output_db()?, config.db_max_connections)?;
        let orchestrator = Orchestrator::new(fetcher, SyncEngine::new(PgStore::from(output)));
        let result = orchestrator
            .sync_single(&args.company_number, args.company_uid.as_deref())
            .await;
        json!(result)
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
