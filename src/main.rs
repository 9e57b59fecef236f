//! Product Embeddings - Entry Point
//!
//! Modes:
//! - Default: backfill every product in the flat catalogue view
//! - --product-id <ID>: embed a single product

use anyhow::Context;
use product_embeddings::{
    init_clients, Backfill, BackfillOptions, Config, Embedder, HttpClientFactory,
};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

fn flag_value<'a>(args: &'a [String], names: &[&str]) -> Option<&'a str> {
    args.iter()
        .position(|a| names.contains(&a.as_str()))
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn parse_count(args: &[String], names: &[&str]) -> anyhow::Result<Option<usize>> {
    flag_value(args, names)
        .map(|v| {
            v.parse::<usize>()
                .with_context(|| format!("{} expects a positive number, got '{}'", names[0], v))
        })
        .transpose()
}

fn print_help() {
    println!("Product Embeddings v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Usage: product-embeddings [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --product-id, -p <ID>   Embed a single product");
    println!("  --batch-size, -b <N>    Rows fetched per page (default: BACKFILL_BATCH_SIZE or 50)");
    println!("  --limit, -l <N>         Stop after scanning N rows");
    println!("  --missing-only, -m      Only embed products without an embedding");
    println!("  --dry-run, -n           Embed but do not write");
    println!("  --json                  Print the result as JSON");
    println!("  --log-json              Log as JSON to stderr");
    println!("  --help, -h              Show this help");
    println!();
    println!("Environment variables (.env.local and .env are loaded if present):");
    println!("  SUPABASE_URL            Supabase project URL");
    println!("  SUPABASE_SERVICE_KEY    Supabase service-role key");
    println!("  OPENAI_API_KEY          OpenAI API key");
    println!("  OPENAI_BASE_URL         OpenAI API root (default: https://api.openai.com/v1)");
    println!("  EMBEDDING_MODEL         Embedding model (default: text-embedding-ada-002)");
    println!("  EMBEDDING_DIMENSIONS    Expected vector length (default: 1536)");
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Load environment
    Config::load_dotenv();

    // Parse args
    let args: Vec<String> = std::env::args().collect();
    let has = |names: &[&str]| args.iter().any(|a| names.contains(&a.as_str()));

    if has(&["--help", "-h"]) {
        print_help();
        return Ok(());
    }

    let json_output = has(&["--json"]);
    let log_json = has(&["--log-json"]);

    let log_level = std::env::var("RUST_LOG")
        .map(|s| match s.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        })
        .unwrap_or(Level::INFO);

    if log_json {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    info!("Product Embeddings v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env();
    let factory = HttpClientFactory::new(&config);
    let clients = init_clients(&config, &factory)
        .ok_or_else(|| anyhow::anyhow!("Client initialisation failed, check environment"))?;

    let embedder = Embedder::from_config(clients.embeddings, &config);
    let backfill = Backfill::new(clients.store, embedder);

    if let Some(product_id) = flag_value(&args, &["--product-id", "-p"]) {
        let outcome = backfill.embed_product(product_id).await.map_err(|e| {
            error!("{}", e);
            e
        })?;

        if json_output {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        } else {
            println!(
                "Embedded product {}: {} dims from {} chars",
                outcome.product_id, outcome.embedding_length, outcome.text_length
            );
        }
        return Ok(());
    }

    let mut options = BackfillOptions::from_config(&config);
    if let Some(batch_size) = parse_count(&args, &["--batch-size", "-b"])? {
        options.batch_size = batch_size.max(1);
    }
    options.limit = parse_count(&args, &["--limit", "-l"])?;
    options.dry_run = has(&["--dry-run", "-n"]);
    options.missing_only = has(&["--missing-only", "-m"]);

    let report = backfill.run(&options).await?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report);
        if !report.failed_ids.is_empty() {
            println!("Failed products: {}", report.failed_ids.join(", "));
        }
    }

    Ok(())
}
