use std::process::ExitCode;

use anyhow::Context as _;

use clipshare_desktop::cli::{self, Command};
use clipshare_desktop::config::Configuration;

/// Aggregates every fallible step of process startup under `anyhow::Result`
/// (SPEC_FULL §10.2), returning the process exit code for `main` to convert.
fn run() -> anyhow::Result<i32> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let prog_name = std::env::args()
        .next()
        .context("argv[0] missing")
        .unwrap_or_else(|_| "clipshare".into());

    if args.is_empty() {
        tracing::info!("no flags given; background web front-end is out of scope for this binary");
        return Ok(0);
    }

    let command = match cli::parse_args(&args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e}\n");
            cli::print_usage(&prog_name);
            return Ok(1);
        }
    };

    let config = Configuration::default().with_defaults();

    let code = match command {
        Command::Help => {
            cli::print_usage(&prog_name);
            0
        }
        Command::Version => {
            println!("clipshare {}", env!("CARGO_PKG_VERSION"));
            0
        }
        Command::Stop => 0,
        Command::Scan => cli::run_scan(&config),
        Command::Invoke {
            method,
            server,
            display,
        } => cli::run_invoke(&config, method, server, display),
    };

    Ok(code)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    match run() {
        Ok(0) => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("clipshare: {e:#}");
            ExitCode::FAILURE
        }
    }
}
