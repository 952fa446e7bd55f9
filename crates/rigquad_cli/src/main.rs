//! `integrals`: computes a catalogue of hard integrals with rigorous error
//! bounds.

mod catalogue;
mod cli;
mod integrands;

use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use tracing::{debug, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::catalogue::ENTRIES;
use crate::cli::{normalize_args, usage, Cli, RunSettings};

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run_entry(index: usize, settings: &RunSettings, twice: bool) -> anyhow::Result<()> {
    let entry = &ENTRIES[index];
    println!("I{index} = {} ...", entry.description);
    let mut last = None;
    for _ in 0..if twice { 2 } else { 1 } {
        let start = Instant::now();
        let result = entry.compute(settings)?;
        println!("wall(s): {:.3}", start.elapsed().as_secs_f64());
        last = Some(result);
    }
    if let Some(result) = last {
        if !result.is_complete() {
            warn!(integral = index, status = ?result.status, "enclosure may be wider than requested");
        }
        debug!(integral = index, stats = ?result.stats, "run statistics");
        let digits = (3.333 * f64::from(settings.prec)) as usize;
        println!("I{index} = {}", result.value.to_decimal(digits));
        println!();
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = normalize_args(std::env::args_os().map(|a| a.to_string_lossy().into_owned()));
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) => {
            eprintln!("{err}");
            print!("{}", usage());
            return ExitCode::from(1);
        }
    };
    let Some(selection) = cli.integral.filter(|_| !cli.help) else {
        print!("{}", usage());
        println!();
        return ExitCode::from(1);
    };
    let settings = match cli.settings() {
        Ok(settings) => settings,
        Err(err) => {
            println!("{err:#}");
            return ExitCode::from(1);
        }
    };
    init_tracing(settings.options.verbose);
    debug!(prec = settings.prec, goal = settings.goal, tol = settings.tol.to_f64(), "settings");

    for index in selection.indices() {
        if let Err(err) = run_entry(index, &settings, cli.twice) {
            eprintln!("I{index}: {err:#}");
            return ExitCode::from(1);
        }
    }
    ExitCode::SUCCESS
}
