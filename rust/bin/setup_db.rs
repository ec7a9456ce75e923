//! Creates and seeds the demonstration database the gateway queries.

use clap::Parser;
use nlq_gateway::schema::setup_database;
use nlq_gateway::GatewayConfig;
use std::path::Path;

#[derive(Parser)]
#[command(about = "Create and seed the gateway's SQLite database")]
struct Args {
    /// Path to the SQLite database (overrides NLQ_DATABASE)
    #[arg(short, long)]
    database: Option<String>,

    /// Delete any existing database file first
    #[arg(long)]
    reset: bool,
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let database = args
        .database
        .unwrap_or_else(|| GatewayConfig::from_env().database);

    if args.reset && Path::new(&database).exists() {
        std::fs::remove_file(&database)?;
        println!("[INFO] Removed existing '{}'", database);
    }

    setup_database(&database)?;
    println!("[OK] Database '{}' created and seeded", database);

    Ok(())
}
