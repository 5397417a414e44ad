// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Shield CLI
//!
//! Hashes a static build output and prints CSP headers from a hashes artifact.

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use shield::{
    synthesize, CspOptions, DistFetcher, FetcherConfig, HashesCollection, HostConfig,
    IntegrationState, PolicyContext, ShieldOptions, StaticHashBuilder,
};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("shield=info".parse().unwrap()),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return ExitCode::from(1);
    }

    match args[1].as_str() {
        "scan" => {
            if args.len() < 3 {
                eprintln!("Usage: shield scan <dist-dir> [--out <file>] [--config <file>]");
                return ExitCode::from(1);
            }
            report(scan(&args[2], &args[3..]).await)
        }
        "csp" => {
            if args.len() < 3 {
                eprintln!("Usage: shield csp <hashes.json> [page] [--config <file>]");
                return ExitCode::from(1);
            }
            report(print_csp(&args[2], &args[3..]).await)
        }
        "--help" | "-h" | "help" => {
            print_usage();
            ExitCode::SUCCESS
        }
        "--version" | "-V" | "version" => {
            println!("shield {}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        cmd => {
            eprintln!("Unknown command: {}", cmd);
            print_usage();
            ExitCode::from(1)
        }
    }
}

fn print_usage() {
    println!(
        r#"Shield - SRI hashes and CSP headers for generated sites

USAGE:
    shield <COMMAND> [ARGS]

COMMANDS:
    scan <dist-dir>       Hash every HTML page and add integrity attributes
        --out <file>      Where to write the hashes artifact
        --config <file>   Options file (JSON)
    csp <hashes.json>     Print the CSP header for all pages
        [page]            Print the header of a single page instead
        --config <file>   Options file (JSON)
    help                  Show this help message
    version               Show version information

ENVIRONMENT:
    RUST_LOG              Log filter (e.g. shield=debug)
"#
    );
}

/// `--flag value` pairs and positional arguments
struct Args {
    positional: Vec<String>,
    out: Option<PathBuf>,
    config: Option<PathBuf>,
}

fn parse_args(args: &[String]) -> Result<Args> {
    let mut parsed = Args {
        positional: Vec::new(),
        out: None,
        config: None,
    };
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--out" => {
                let value = iter.next().context("--out needs a value")?;
                parsed.out = Some(PathBuf::from(value));
            }
            "--config" => {
                let value = iter.next().context("--config needs a value")?;
                parsed.config = Some(PathBuf::from(value));
            }
            flag if flag.starts_with("--") => anyhow::bail!("unknown option: {}", flag),
            value => parsed.positional.push(value.to_string()),
        }
    }
    Ok(parsed)
}

fn load_options(config: Option<&PathBuf>) -> Result<ShieldOptions> {
    match config {
        Some(path) => ShieldOptions::from_file(path)
            .with_context(|| format!("invalid options file {}", path.display())),
        None => Ok(ShieldOptions::default()),
    }
}

/// Print a command error and map it to an exit code
fn report(result: Result<ExitCode>) -> ExitCode {
    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

async fn scan(dist_dir: &str, rest: &[String]) -> Result<ExitCode> {
    let args = parse_args(rest)?;
    let mut options = load_options(args.config.as_ref())?;
    if let Some(out) = args.out {
        options.sri.hashes_module = Some(out);
    }

    let root = env::current_dir().context("failed to read current directory")?;
    let state = IntegrationState::new(options, HostConfig::new(root, dist_dir))
        .context("invalid options")?;
    let fetcher = DistFetcher::with_config(FetcherConfig::new().dist_dir(dist_dir))
        .context("failed to create fetcher")?;

    println!("Scanning: {}", dist_dir);
    let builder = StaticHashBuilder::new(&state, Arc::new(fetcher));
    let report = builder
        .process_dist_dir(dist_dir.as_ref())
        .await
        .with_context(|| format!("failed to scan {}", dist_dir))?;

    println!("\n=== Scan Results ===");
    println!("Pages hashed: {}", report.pages_processed);
    println!("Pages rewritten: {}", report.pages_rewritten);
    println!("Time: {}ms", report.elapsed_ms);

    let collection = state.hashes().to_collection();
    println!("Inline scripts: {}", collection.inline_script_hashes.len());
    println!("Inline styles: {}", collection.inline_style_hashes.len());
    println!("External scripts: {}", collection.ext_script_hashes.len());
    println!("External styles: {}", collection.ext_style_hashes.len());

    if state.hashes_module_path().is_some() {
        let path = state.persist_hashes().await.context("failed to write hashes")?;
        println!("Hashes written to {}", path.display());
    }

    if report.is_success() {
        return Ok(ExitCode::SUCCESS);
    }
    println!("\n[!] Failed pages ({}):", report.failures.len());
    for failure in &report.failures {
        println!("  - {}: {}", failure.page, failure.error);
    }
    Ok(ExitCode::from(2))
}

async fn print_csp(hashes_path: &str, rest: &[String]) -> Result<ExitCode> {
    let args = parse_args(rest)?;
    let options = load_options(args.config.as_ref())?;
    let collection = HashesCollection::load_json(hashes_path)
        .await
        .with_context(|| format!("failed to read hashes from {}", hashes_path))?;

    let (slice, context) = match args.positional.first() {
        Some(page) => {
            if !collection.pages().any(|p| p == page) {
                anyhow::bail!("unknown page: {}", page);
            }
            let context = if collection.is_dynamic(page) {
                PolicyContext::for_dynamic(&options.sri)
            } else {
                PolicyContext::for_static(&options.sri)
            };
            (collection.slice_for_page(page), context)
        }
        None => (collection.slice_static_global(), PolicyContext::for_static(&options.sri)),
    };

    let default_csp = CspOptions::default();
    let csp = options.csp().unwrap_or(&default_csp);
    let policy = synthesize(&slice, Some(csp), &options.sri, &context);
    println!("content-security-policy: {}", policy.to_header_value());
    Ok(ExitCode::SUCCESS)
}
