//! Operator console: reads commands from stdin while the tables run.

use crate::commands::{COMMAND_HELP, Command, parse_command};
use domino_sched::{ControlError, SimulationControl, TableId, TableSnapshot};
use std::{
    io::{self, BufRead},
    thread,
};

/// Spawns the detached console thread. It stops at end of input; otherwise
/// it lives until the process exits.
pub fn spawn(control: SimulationControl) -> io::Result<()> {
    thread::Builder::new()
        .name("console".to_string())
        .spawn(move || run(&control, io::stdin().lock()))
        .map(drop)
}

fn run<R: BufRead>(control: &SimulationControl, input: R) {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                log::warn!("console input failed: {e}");
                return;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match parse_command(&line) {
            Ok(command) => println!("{}", execute(control, command)),
            Err(e) => println!("{e}"),
        }
    }
    log::debug!("console input closed");
}

/// Executes one command and returns what to print.
pub fn execute(control: &SimulationControl, command: Command) -> String {
    match command {
        Command::Policy { policy, target } => match control.request_policy(target, policy) {
            Ok(n) => format!("queued policy {policy} for {n} table(s)"),
            Err(e) => e.to_string(),
        },
        Command::Quantum { ms, target } => match control.request_quantum(target, ms) {
            Ok(n) => format!("queued quantum {ms}ms for {n} table(s)"),
            Err(e) => e.to_string(),
        },
        Command::Cooldown { ms, target } => match control.set_cooldown(target, ms) {
            Ok(n) => format!("cooldown {ms}ms set on {n} table(s)"),
            Err(e) => e.to_string(),
        },
        Command::State(table) => match selected(control, table) {
            Ok(snapshots) => snapshots
                .iter()
                .map(render_state)
                .collect::<Vec<_>>()
                .join("\n"),
            Err(e) => e.to_string(),
        },
        Command::Json(table) => match selected(control, table) {
            Ok(snapshots) => match serde_json::to_string_pretty(&snapshots) {
                Ok(json) => json,
                Err(e) => format!("failed to render JSON: {e}"),
            },
            Err(e) => e.to_string(),
        },
        Command::Help => COMMAND_HELP.to_string(),
    }
}

fn selected(
    control: &SimulationControl,
    table: Option<TableId>,
) -> Result<Vec<TableSnapshot>, ControlError> {
    match table {
        Some(id) => control.snapshot(id).map(|snapshot| vec![snapshot]),
        None => Ok(control.snapshots()),
    }
}

fn render_state(snapshot: &TableSnapshot) -> String {
    let loads = snapshot
        .loads
        .iter()
        .enumerate()
        .map(|(actor, load)| format!("{actor}:{}/{}", load.units, load.cost))
        .collect::<Vec<_>>()
        .join(" ");
    match snapshot.outcome {
        Some(outcome) => format!("{snapshot} hands {loads} => {outcome}"),
        None => format!("{snapshot} hands {loads}"),
    }
}
