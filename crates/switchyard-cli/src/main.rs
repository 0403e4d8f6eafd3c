// SPDX-License-Identifier: Apache-2.0
//! Switchyard frontend: read commands from stdin, answer on stdout.
//!
//! The protocol is line-oriented: `[T] verb -f value ...` in, one response
//! block per command out, `-1` for every recoverable failure. Diagnostics
//! go to stderr through `tracing` and never mix with responses.
#![allow(clippy::print_stdout)]

mod parse;
mod render;

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use switchyard_core::{Command, System};
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

/// Train-ticket reservation backend.
#[derive(Debug, Parser)]
#[command(name = "switchyard", version, about)]
struct Args {
    /// Directory holding the backing files (created when absent).
    #[arg(long, default_value = ".")]
    data_dir: PathBuf,

    /// Log filter for diagnostics on stderr (overridden by SWITCHYARD_LOG).
    #[arg(long, default_value = "warn")]
    log_filter: String,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let filter = EnvFilter::try_from_env("SWITCHYARD_LOG")
        .unwrap_or_else(|_| EnvFilter::new(&args.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(&args) {
        Ok(code) => code,
        Err(err) => {
            error!("fatal: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> anyhow::Result<ExitCode> {
    std::fs::create_dir_all(&args.data_dir)
        .with_context(|| format!("creating data directory {}", args.data_dir.display()))?;
    let mut system = System::open(&args.data_dir).context("opening system files")?;

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    for line in stdin.lock().lines() {
        let line = line.context("reading stdin")?;
        if line.trim().is_empty() {
            continue;
        }
        let (timestamp, body) = match parse::parse_timestamp(&line) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!("dropping line without timestamp: {err}");
                continue;
            }
        };
        let command = match parse::parse_command(body) {
            Ok(command) => command,
            Err(err) => {
                warn!("[{timestamp}] parse error: {err}");
                out.write_all(render::render_failure(timestamp).as_bytes())
                    .context("writing response")?;
                continue;
            }
        };

        match system.execute(timestamp, &command) {
            Ok(response) => {
                out.write_all(render::render(timestamp, &response).as_bytes())
                    .context("writing response")?;
                if matches!(command, Command::Exit) {
                    out.flush().context("flushing stdout")?;
                    return Ok(ExitCode::SUCCESS);
                }
            }
            Err(err) if err.is_fatal() => {
                return Err(err).context("storage failure");
            }
            Err(err) => {
                warn!("[{timestamp}] rejected: {err}");
                out.write_all(render::render_failure(timestamp).as_bytes())
                    .context("writing response")?;
            }
        }
    }
    out.flush().context("flushing stdout")?;
    Ok(ExitCode::SUCCESS)
}
