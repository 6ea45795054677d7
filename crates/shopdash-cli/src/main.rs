use clap::{Parser, Subcommand};

use shopdash_sync::RunOutcome;

#[derive(Debug, Parser)]
#[command(name = "shopdash")]
#[command(about = "Shopdash back-office command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one catalog reconciliation pass to completion
    Sync,
    /// Show the latest sync job and dashboard stats
    Status,
    /// Abort the currently running sync pass, if any
    Abort {
        /// Recorded as the failed job's error detail
        #[arg(long, default_value = "aborted by operator")]
        reason: String,
    },
    /// Apply pending database migrations
    Migrate,
    /// Insert demo products for local development
    Seed,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = shopdash_core::load_app_config()?;
    let pool_config = shopdash_db::PoolConfig::from_app_config(&config);
    let pool = shopdash_db::connect_pool(&config.database_url, pool_config).await?;

    match cli.command {
        Commands::Sync => {
            shopdash_db::run_migrations(&pool).await?;
            let sync = shopdash_sync::SyncService::from_app_config(pool.clone(), &config)?;
            match sync.run_blocking("cli").await? {
                RunOutcome::Finished(job) => {
                    println!(
                        "sync {}: {} ({} of ~{} products)",
                        job.public_id, job.status, job.processed_count, job.total_count
                    );
                    if job.status == "failed" {
                        anyhow::bail!(
                            "sync failed: {}",
                            job.error_detail.as_deref().unwrap_or("unknown error")
                        );
                    }
                }
                RunOutcome::AlreadyRunning(job) => {
                    println!("sync already in flight: {} ({})", job.public_id, job.status);
                }
            }
        }
        Commands::Status => {
            let stats = shopdash_sync::dashboard_stats(&pool).await?;
            let status = shopdash_sync::current_status(&pool).await?;
            let latest = shopdash_db::latest_sync_job(&pool).await?;

            println!("{}", serde_json::to_string_pretty(&stats)?);
            println!("{}", serde_json::to_string_pretty(&status)?);
            match latest {
                Some(job) => println!(
                    "latest job {}: {} (trigger: {})",
                    job.public_id, job.status, job.trigger_source
                ),
                None => println!("no sync jobs on record"),
            }
        }
        Commands::Abort { reason } => {
            let sync = shopdash_sync::SyncService::from_app_config(pool.clone(), &config)?;
            match sync.abort(&reason).await? {
                Some(job) => println!("aborted sync job {}", job.public_id),
                None => println!("no sync job is running"),
            }
        }
        Commands::Migrate => {
            shopdash_db::run_migrations(&pool).await?;
            println!("migrations applied");
        }
        Commands::Seed => {
            shopdash_db::run_migrations(&pool).await?;
            let count = shopdash_db::seed::seed_demo_products(&pool).await?;
            println!("seeded {count} demo products");
        }
    }

    Ok(())
}
