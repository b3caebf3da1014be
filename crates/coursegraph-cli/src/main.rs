use anyhow::Result;
use clap::{Parser, Subcommand};
use coursegraph_pipeline::{build_tables, mine_once, BuildConfig, MineConfig};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "coursegraph")]
#[command(about = "UofT course graph builder")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch every campus catalogue and persist the datasets.
    Mine,
    /// Build the node/edge tables from persisted datasets.
    Build,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    match cli.command.unwrap_or(Commands::Build) {
        Commands::Mine => {
            let summary = mine_once(&MineConfig::from_env()).await?;
            for campus in &summary.campuses {
                match &campus.error {
                    None => println!(
                        "{}: {} courses -> {}",
                        campus.campus,
                        campus.courses,
                        campus.dataset.as_deref().unwrap_or("-")
                    ),
                    Some(error) => println!("{}: failed ({error})", campus.campus),
                }
            }
            println!("mine complete: run_id={}", summary.run_id);
        }
        Commands::Build => {
            let summary = build_tables(&BuildConfig::from_env())?;
            for campus in &summary.campuses {
                match &campus.error {
                    None => println!("{}: merged", campus.campus),
                    Some(error) => println!("{}: skipped ({error})", campus.campus),
                }
            }
            println!(
                "build complete: nodes={} placeholders={} edges={} tables={}",
                summary.nodes, summary.placeholders, summary.edges, summary.manifest_path
            );
        }
    }

    Ok(())
}
