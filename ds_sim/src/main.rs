//! Multi-table domino scheduling simulator.
//!
//! Deals the tables, runs them to completion and prints the final report.
//! While the tables run, operator commands are read from stdin.

use anyhow::{Context, Result, bail};
use ctrlc::set_handler;
use domino_sched::{Simulation, SimulationReport};
use pico_args::Arguments;

mod commands;
mod config;
mod console;
mod logging;

use config::{Overrides, SimConfig};

const HELP: &str = "\
Run a multi-table domino scheduling simulation

USAGE:
  ds_sim [OPTIONS]

OPTIONS:
  --tables N            Number of tables                  [env: DS_TABLES] [default: 3]
  --actors N            Actors per table, 2 to 4          [env: DS_ACTORS] [default: random]
  --policy NAME         fcfs, rr, sjf-units or sjf-cost   [env: DS_POLICY] [default: sjf-cost]
  --quantum MS          Initial quantum                   [env: DS_QUANTUM_MS]
  --cooldown MS         Initial turn cooldown             [env: DS_COOLDOWN_MS] [default: 0]
  --max-steps N         Step ceiling per table            [env: DS_MAX_STEPS] [default: 800]
  --seed N              Seed for dealing                  [env: DS_SEED]
  --tune-interval MS    Pause between auto-tuner passes   [env: DS_TUNE_INTERVAL_MS] [default: 100]

FLAGS:
  --no-tune             Disable the auto-tuner            [env: DS_AUTO_TUNE=false]
  --no-console          Do not read operator commands from stdin
  --json                Print the final report as JSON
  -h, --help            Print help information

Type 'help' while running to list operator commands.
";

fn main() -> Result<()> {
    let mut pargs = Arguments::from_env();

    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        return Ok(());
    }

    let json = pargs.contains("--json");
    let no_console = pargs.contains("--no-console");
    let overrides = Overrides {
        tables: pargs.opt_value_from_str("--tables")?,
        actors: pargs.opt_value_from_str("--actors")?,
        policy: pargs.opt_value_from_str("--policy")?,
        quantum_ms: pargs.opt_value_from_str("--quantum")?,
        cooldown_ms: pargs.opt_value_from_str("--cooldown")?,
        max_steps: pargs.opt_value_from_str("--max-steps")?,
        seed: pargs.opt_value_from_str("--seed")?,
        no_tune: pargs.contains("--no-tune"),
        tune_interval_ms: pargs.opt_value_from_str("--tune-interval")?,
    };

    let remaining = pargs.finish();
    if !remaining.is_empty() {
        bail!("unexpected arguments: {remaining:?}");
    }

    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    logging::init();

    set_handler(|| {
        log::warn!("interrupted");
        std::process::exit(130);
    })?;

    let config = SimConfig::from_env(overrides)?;
    config.validate()?;

    let handle = Simulation::new(config.simulation_config())
        .context("failed to deal tables")?
        .start()
        .context("failed to start simulation")?;

    if !no_console {
        console::spawn(handle.control()).context("failed to start console")?;
        println!("type 'help' for operator commands");
    }

    let report = handle.wait()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn print_report(report: &SimulationReport) {
    println!("finished in {}ms", report.elapsed_ms);
    for table in &report.tables {
        match table.outcome {
            Some(outcome) => println!(
                "table {} ({}, {} actors): {}",
                table.table,
                table.snapshot.policy,
                table.snapshot.actor_count(),
                outcome
            ),
            None => println!("table {}: no outcome", table.table),
        }
    }
    println!(
        "authority: {} applied, {} downgraded, {} stale",
        report.authority.applied, report.authority.downgraded, report.authority.stale
    );
    println!(
        "supervisor: {} applied, {} ignored",
        report.supervisor.applied, report.supervisor.ignored
    );
    if let Some(tuner) = &report.tuner {
        println!(
            "auto-tuner: {} passes, {} policy requests, {} cooldown changes",
            tuner.passes, tuner.policy_requests, tuner.cooldown_changes
        );
    }
}
