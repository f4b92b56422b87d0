//! Run a Vlasov-Maxwell deck to completion.
//!
//! Usage: `vlasov-run <deck.toml> [--output DIR] [--t-end T] [--frames N]`
//!        `vlasov-run --dump-default`

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use vlasov::{init_logging, DeckConfig};

#[derive(Parser, Debug)]
#[command(name = "vlasov-run")]
#[command(about = "Run a Vlasov-Maxwell input deck with the adaptive SSP-RK3 driver")]
struct Args {
    /// Path to the TOML input deck
    #[arg(required_unless_present = "dump_default")]
    deck: Option<PathBuf>,

    /// Output directory, overriding `[output] dir`
    #[arg(long = "output")]
    output: Option<PathBuf>,

    /// End time, overriding `[run] t_end`
    #[arg(long = "t-end")]
    t_end: Option<f64>,

    /// Output frame count, overriding `[run] frames`
    #[arg(long = "frames")]
    frames: Option<u32>,

    /// Print the default deck as TOML and exit
    #[arg(long = "dump-default")]
    dump_default: bool,
}

fn main() -> ExitCode {
    init_logging();

    let args = Args::parse();

    if args.dump_default {
        return match DeckConfig::default().to_toml_string() {
            Ok(text) => {
                print!("{text}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("{e}");
                ExitCode::FAILURE
            }
        };
    }

    let Some(path) = args.deck else {
        error!("no deck given");
        return ExitCode::FAILURE;
    };
    let mut deck = match DeckConfig::load(&path) {
        Ok(deck) => deck,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(dir) = args.output {
        deck.output.dir = dir;
    }
    if let Some(t_end) = args.t_end {
        deck.run.t_end = t_end;
    }
    if let Some(frames) = args.frames {
        deck.run.frames = frames;
    }

    let mut sim = match deck.build() {
        Ok(sim) => sim,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match sim.run() {
        Ok(summary) => {
            info!(
                steps = summary.accepted_steps,
                rejected = summary.rejected_attempts,
                frames = summary.frames_written,
                t = summary.final_time,
                "run complete"
            );
            for (name, elapsed) in &summary.operator_time {
                info!(operator = %name, seconds = elapsed.as_secs_f64(), "operator time");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
