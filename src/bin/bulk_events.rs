//! bulk-events: 批量事件创建的命令行工具
//!
//! Usage:
//!   bulk-events create [--events N] [--batch-size B] [--concurrent C] [--retries R]
//!                      [--url U] [--config FILE] [--json]
//!   bulk-events list [--days-ahead N] [--url U] [--config FILE]
//!   bulk-events status [--url U] [--config FILE]

use anyhow::Context;
use bulk_events::{CancellationToken, ClientConfig, EventClient, EventClientBuilder};
use serde_json::json;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

const EVENT_KINDS: [&str; 5] = ["Meeting", "Review", "Demo", "Planning", "Training"];
const DURATIONS_MIN: [u32; 4] = [30, 60, 90, 120];

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let result = match args[1].as_str() {
        "create" => cmd_create(&args[2..]).await,
        "list" => cmd_list(&args[2..]).await,
        "status" => cmd_status(&args[2..]).await,
        "version" | "--version" | "-V" => {
            cmd_version();
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn print_usage() {
    println!(
        r#"bulk-events: 批量事件创建工具

USAGE:
    bulk-events <COMMAND> [OPTIONS]

COMMANDS:
    create      Create synthetic events in bulk and print a performance report
    list        List upcoming events
    status      Show backend status
    version     Show version information
    help        Show this help message

OPTIONS:
    --events <N>          Number of events to create (default: 100)
    --batch-size <B>      Events per batch (default: 20)
    --concurrent <C>      Max concurrent requests (default: 50)
    --retries <R>         Max retries per event (default: 3)
    --url <URL>           Backend base URL
    --config <FILE>       YAML configuration file
    --days-ahead <N>      Window for `list` (default: 7)
    --json                Print the run report as JSON

ENVIRONMENT:
    BULK_EVENTS_BASE_URL, BULK_EVENTS_MAX_CONCURRENT, BULK_EVENTS_BATCH_SIZE,
    BULK_EVENTS_MAX_RETRIES, BULK_EVENTS_TIMEOUT_MS, BULK_EVENTS_CONNECT_TIMEOUT_MS,
    BULK_EVENTS_BASE_BACKOFF_MS, BULK_EVENTS_MAX_JITTER_MS,
    BULK_EVENTS_INTER_BATCH_PAUSE_MS, BULK_EVENTS_POOL_MAX_IDLE_PER_HOST,
    BULK_EVENTS_API_TOKEN
    RUST_LOG                Log filter (default: info)"#
    );
}

fn cmd_version() {
    println!("bulk-events {}", env!("CARGO_PKG_VERSION"));
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn parse_flag<T>(args: &[String], flag: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    flag_value(args, flag)
        .map(|v| {
            v.parse::<T>()
                .with_context(|| format!("invalid value for {flag}: {v}"))
        })
        .transpose()
}

/// defaults → `--config` file → env → command-line flags.
fn load_config(args: &[String]) -> anyhow::Result<ClientConfig> {
    let config = match flag_value(args, "--config") {
        Some(path) => ClientConfig::from_yaml_file(path)
            .with_context(|| format!("failed to load config from {path}"))?,
        None => ClientConfig::default(),
    };
    let mut config = config.with_env_overrides();

    if let Some(url) = flag_value(args, "--url") {
        config = config.with_base_url(url);
    }
    if let Some(n) = parse_flag(args, "--batch-size")? {
        config = config.with_batch_size(n);
    }
    if let Some(n) = parse_flag(args, "--concurrent")? {
        config = config.with_max_concurrent(n);
    }
    if let Some(n) = parse_flag(args, "--retries")? {
        config = config.with_max_retries(n);
    }
    Ok(config)
}

fn build_client(args: &[String]) -> anyhow::Result<EventClient> {
    let config = load_config(args)?;
    Ok(EventClientBuilder::new().with_config(config).build()?)
}

/// Synthetic events spread over business hours, 20 per day, starting in 30 days.
fn synthetic_events(count: usize) -> Vec<serde_json::Value> {
    (0..count)
        .map(|i| {
            let offset_minutes = (30 + i / 20) * 24 * 60 + (9 + i % 8) * 60 + (i % 4) * 15;
            json!({
                "title": format!("Perf Test {} #{:04}", EVENT_KINDS[i % EVENT_KINDS.len()], i + 1),
                "description": format!("Performance test event {} of {}", i + 1, count),
                "start_offset_minutes": offset_minutes,
                "duration_minutes": DURATIONS_MIN[i % DURATIONS_MIN.len()],
                "timezone": "UTC",
            })
        })
        .collect()
}

async fn cmd_create(args: &[String]) -> anyhow::Result<()> {
    let client = build_client(args)?;
    let count: usize = parse_flag(args, "--events")?.unwrap_or(100);
    let as_json = args.iter().any(|a| a == "--json");

    let cfg = client.config();
    if !as_json {
        println!(
            "Creating {count} events at {} (batch size {}, max concurrent {}, max retries {})",
            client.base_url(),
            cfg.batch_size,
            cfg.max_concurrent,
            cfg.max_retries
        );
    }

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("Interrupted; finishing in-flight requests...");
                cancel.cancel();
            }
        });
    }

    let items = bulk_events::WorkItem::enumerate(synthetic_events(count));
    let outcome = client.create_items_with_cancel(items, &cancel).await?;

    if as_json {
        let report = json!({
            "batches": outcome.batches,
            "metrics": outcome.metrics,
            "failures": outcome.failures().collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", outcome.metrics);
        let failures: Vec<_> = outcome.failures().collect();
        if !failures.is_empty() {
            println!("Failed events:");
            for report in failures.iter().take(10) {
                let kind = report.outcome.as_ref().map_or("cancelled", |o| o.kind());
                println!("  #{} after {} attempt(s): {kind}", report.id, report.attempts);
            }
            if failures.len() > 10 {
                println!("  ... and {} more", failures.len() - 10);
            }
        }
    }

    if cancel.is_cancelled() {
        std::process::exit(130);
    }
    Ok(())
}

async fn cmd_list(args: &[String]) -> anyhow::Result<()> {
    let client = build_client(args)?;
    let days_ahead: u32 = parse_flag(args, "--days-ahead")?.unwrap_or(7);
    let events = client.list_events(days_ahead).await?;
    println!("{}", serde_json::to_string_pretty(&events)?);
    Ok(())
}

async fn cmd_status(args: &[String]) -> anyhow::Result<()> {
    let client = build_client(args)?;
    let status = client.status().await?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}
