use anyhow::Result;
use clap::{Parser, Subcommand};
use giftguide_common::{logger, AppConfig};
use giftguide_server::Catalog;
use giftguide_vector::{RankedResult, Retriever, RetrievalOutcome};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// Find project root by looking for .git directory
fn find_project_root() -> Option<PathBuf> {
    let mut current_dir = std::env::current_dir().ok()?;

    loop {
        if current_dir.join(".git").exists() {
            return Some(current_dir);
        }

        if !current_dir.pop() {
            break;
        }
    }

    None
}

/// Load .env file from project root
fn load_dotenv_from_project_root() {
    if let Some(root) = find_project_root() {
        let env_path = root.join(".env");
        if env_path.exists() {
            dotenv::from_path(&env_path).ok();
        }
    } else {
        dotenv::dotenv().ok();
    }
}

#[derive(Parser)]
#[command(name = "giftguide")]
#[command(about = "GiftGuide - semantic product search for gift ideas", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(long)]
        port: Option<u16>,
    },

    /// Run a single query and print the ranked products
    Search {
        /// Free-text query
        query: String,

        /// Number of results (configured default when omitted)
        #[arg(long)]
        top_k: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    load_dotenv_from_project_root();

    match cli.command {
        Some(Commands::Serve { host, port }) => {
            // CLI arguments win over .env
            if let Some(host) = &host {
                std::env::set_var("SERVER_HOST", host);
            }
            if let Some(port) = port {
                std::env::set_var("SERVER_PORT", port.to_string());
            }
            serve(AppConfig::from_env()?).await?;
        }
        Some(Commands::Search { query, top_k }) => {
            let config = AppConfig::from_env()?;
            logger::setup_console_logging(&config.log_level)?;
            search(config, &query, top_k).await?;
        }
        None => {
            serve(AppConfig::from_env()?).await?;
        }
    }

    Ok(())
}

async fn serve(config: AppConfig) -> Result<()> {
    logger::setup_logging(&config.log_dir, &config.log_level)?;

    tracing::info!("GiftGuide starting...");
    tracing::info!("  Collection: {}", config.collection_name);
    tracing::info!("  Embedding model: {} ({} dims)", config.embedding_model, config.embedding_dim);
    tracing::info!("  Catalog: {}", config.products_csv_path.display());

    println!("Server listening on http://{}", config.server_bind_address());

    giftguide_server::start_server(config).await?;
    Ok(())
}

async fn search(config: AppConfig, query: &str, top_k: Option<usize>) -> Result<()> {
    let retriever = Retriever::initialize(&config).await?;
    let top_k = top_k.unwrap_or(retriever.settings().default_top_k);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    match retriever.retrieve_with_cancel(query, top_k, &cancel).await? {
        RetrievalOutcome::NoSearch(reason) => {
            println!("Nothing to search: {}", reason);
        }
        RetrievalOutcome::Ranked(result) => {
            let catalog = match Catalog::load(&config.products_csv_path) {
                Ok(catalog) => catalog,
                Err(e) => {
                    tracing::warn!("Catalog unavailable: {}", e);
                    Catalog::default()
                }
            };
            print_results(&result, &catalog);
        }
    }

    Ok(())
}

fn print_results(result: &RankedResult, catalog: &Catalog) {
    if result.hits.is_empty() {
        println!("No products found.");
        return;
    }

    println!("{:>4}  {:<12}  {:<20}  {:>8}  {}", "#", "ID", "CATEGORY", "DISTANCE", "NAME");
    for (rank, hit) in result.hits.iter().enumerate() {
        let product = catalog.get(&hit.product_id);
        let name = product.and_then(|p| p.name.as_deref()).unwrap_or("-");
        println!(
            "{:>4}  {:<12}  {:<20}  {:>8.4}  {}",
            rank + 1,
            hit.product_id.to_string(),
            hit.category,
            hit.distance,
            name
        );
    }

    println!(
        "\n{} products in {:.2}s",
        result.hits.len(),
        result.elapsed.as_secs_f64()
    );
}
