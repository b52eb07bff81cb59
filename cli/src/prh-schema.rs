use clap::Parser;
use lib_prh::configs::SyncSettings;
use lib_prh::connections::db_postgres::SCHEMA_SQL;
use lib_prh::connections::Database;
use lib_prh::loggers::setup_logging;

/// Creates the company tables in the output database. Safe to run more than once.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Print the DDL instead of running it.
    #[arg(long)]
    print: bool,

    #[command(flatten)]
    settings: SyncSettings,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    if args.print {
        print!("{SCHEMA_SQL}");
        return Ok(());
    }

    let config = SyncSettings::layered(args.settings).resolve()?;
    let _guard = setup_logging(&config.log_dir, &config.log_level)?;

    let db = Database::new(config.output_db()?, config.db_max_connections).await?;
    db.ping().await?;
    db.create_schema().await?;
    println!("Schema created.");
    Ok(())
}
