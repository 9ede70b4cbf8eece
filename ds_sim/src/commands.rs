//! Operator command parsing.

use domino_sched::{Policy, TableId, Target};
use thiserror::Error;

/// A parsed operator command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Enqueue a policy change.
    Policy { policy: Policy, target: Target },
    /// Enqueue a quantum change.
    Quantum { ms: u64, target: Target },
    /// Write the cooldown directly.
    Cooldown { ms: u64, target: Target },
    /// Print one snapshot, or all of them.
    State(Option<TableId>),
    /// Same as `State`, rendered as JSON.
    Json(Option<TableId>),
    Help,
}

/// Errors that can occur during command parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Command given without its required argument.
    #[error("Missing argument. Usage: {0}")]
    MissingArgument(&'static str),
    /// Unknown policy name.
    #[error("Unknown policy '{0}'. Use fcfs, rr, sjf-units or sjf-cost")]
    InvalidPolicy(String),
    /// Duration that is not a non-negative number of milliseconds.
    #[error("Invalid duration '{0}'. Must be a whole number of milliseconds")]
    InvalidMillis(String),
    /// Table selector that is neither a number nor `all`.
    #[error("Invalid table '{0}'. Use a table number or 'all'")]
    InvalidTable(String),
    /// Extra words after a complete command.
    #[error("Unexpected input '{0}'")]
    TrailingInput(String),
    /// Unrecognized command.
    #[error("Unrecognized command '{0}'. Type 'help' to see available commands")]
    UnrecognizedCommand(String),
}

pub const COMMAND_HELP: &str = "\
Commands:
  policy <name> [<table>|all]   enqueue a policy change (fcfs, rr, sjf-units, sjf-cost)
  quantum <ms> [<table>|all]    enqueue a quantum change
  cooldown <ms> [<table>|all]   set the turn cooldown
  state [<table>]               print table state
  json [<table>]                print table state as JSON
  help                          print this list";

/// Parse one line of operator input. A missing table selector means every
/// table.
pub fn parse_command(input: &str) -> Result<Command, ParseError> {
    let parts: Vec<&str> = input.split_ascii_whitespace().collect();
    let Some((&name, args)) = parts.split_first() else {
        return Err(ParseError::UnrecognizedCommand(String::new()));
    };

    match name.to_ascii_lowercase().as_str() {
        "policy" => {
            let value = args
                .first()
                .ok_or(ParseError::MissingArgument("policy <name> [<table>|all]"))?;
            let policy = value
                .parse()
                .map_err(|_| ParseError::InvalidPolicy(value.to_string()))?;
            let target = parse_target(&args[1..])?;
            Ok(Command::Policy { policy, target })
        }
        "quantum" => {
            let ms = parse_millis(args.first(), "quantum <ms> [<table>|all]")?;
            let target = parse_target(&args[1..])?;
            Ok(Command::Quantum { ms, target })
        }
        "cooldown" => {
            let ms = parse_millis(args.first(), "cooldown <ms> [<table>|all]")?;
            let target = parse_target(&args[1..])?;
            Ok(Command::Cooldown { ms, target })
        }
        "state" => parse_table(args).map(Command::State),
        "json" => parse_table(args).map(Command::Json),
        "help" | "?" => no_more(args).map(|()| Command::Help),
        _ => Err(ParseError::UnrecognizedCommand(input.trim().to_string())),
    }
}

fn parse_millis(value: Option<&&str>, usage: &'static str) -> Result<u64, ParseError> {
    let value = value.ok_or(ParseError::MissingArgument(usage))?;
    value
        .parse()
        .map_err(|_| ParseError::InvalidMillis(value.to_string()))
}

/// Optional trailing target, defaulting to every table.
fn parse_target(args: &[&str]) -> Result<Target, ParseError> {
    match args.split_first() {
        None => Ok(Target::All),
        Some((value, rest)) => {
            no_more(rest)?;
            value
                .parse()
                .map_err(|_| ParseError::InvalidTable(value.to_string()))
        }
    }
}

fn parse_table(args: &[&str]) -> Result<Option<TableId>, ParseError> {
    match parse_target(args)? {
        Target::All => Ok(None),
        Target::Table(id) => Ok(Some(id)),
    }
}

fn no_more(args: &[&str]) -> Result<(), ParseError> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(ParseError::TrailingInput(args.join(" ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domino_sched::policy::{Fcfs, RoundRobin, SjfCost, SjfUnits};

    // === Policy ===

    #[test]
    fn test_parse_policy_defaults_to_all_tables() {
        assert_eq!(
            parse_command("policy fcfs"),
            Ok(Command::Policy {
                policy: Fcfs.into(),
                target: Target::All
            })
        );
    }

    #[test]
    fn test_parse_policy_aliases() {
        for (name, policy) in [
            ("rr", Policy::from(RoundRobin)),
            ("ROUND-ROBIN", RoundRobin.into()),
            ("sjf_players", SjfUnits.into()),
            ("sjf-units", SjfUnits.into()),
            ("sjf_points", SjfCost.into()),
            ("Sjf-Cost", SjfCost.into()),
        ] {
            let parsed = parse_command(&format!("policy {name} 1"));
            assert_eq!(
                parsed,
                Ok(Command::Policy {
                    policy,
                    target: Target::Table(1)
                }),
                "{name}"
            );
        }
    }

    #[test]
    fn test_parse_policy_errors() {
        assert!(matches!(
            parse_command("policy"),
            Err(ParseError::MissingArgument(_))
        ));
        assert_eq!(
            parse_command("policy lottery"),
            Err(ParseError::InvalidPolicy("lottery".to_string()))
        );
        assert_eq!(
            parse_command("policy rr two"),
            Err(ParseError::InvalidTable("two".to_string()))
        );
        assert_eq!(
            parse_command("policy rr 1 2"),
            Err(ParseError::TrailingInput("2".to_string()))
        );
    }

    // === Quantum and cooldown ===

    #[test]
    fn test_parse_quantum() {
        assert_eq!(
            parse_command("quantum 150 all"),
            Ok(Command::Quantum {
                ms: 150,
                target: Target::All
            })
        );
        assert_eq!(
            parse_command("quantum -5"),
            Err(ParseError::InvalidMillis("-5".to_string()))
        );
    }

    #[test]
    fn test_parse_cooldown() {
        assert_eq!(
            parse_command("cooldown 0 2"),
            Ok(Command::Cooldown {
                ms: 0,
                target: Target::Table(2)
            })
        );
        assert!(matches!(
            parse_command("cooldown"),
            Err(ParseError::MissingArgument(_))
        ));
        assert_eq!(
            parse_command("cooldown 1.5"),
            Err(ParseError::InvalidMillis("1.5".to_string()))
        );
    }

    // === Inspection ===

    #[test]
    fn test_parse_state_and_json() {
        assert_eq!(parse_command("state"), Ok(Command::State(None)));
        assert_eq!(parse_command("state all"), Ok(Command::State(None)));
        assert_eq!(parse_command("state 3"), Ok(Command::State(Some(3))));
        assert_eq!(parse_command("json"), Ok(Command::Json(None)));
        assert_eq!(parse_command("json 0"), Ok(Command::Json(Some(0))));
        assert_eq!(
            parse_command("json x"),
            Err(ParseError::InvalidTable("x".to_string()))
        );
    }

    #[test]
    fn test_parse_help() {
        assert_eq!(parse_command("help"), Ok(Command::Help));
        assert_eq!(parse_command("?"), Ok(Command::Help));
        assert!(matches!(
            parse_command("help me"),
            Err(ParseError::TrailingInput(_))
        ));
    }

    // === Whitespace and unknown input ===

    #[test]
    fn test_parse_with_surrounding_whitespace() {
        assert_eq!(
            parse_command("  cooldown   10\t1  "),
            Ok(Command::Cooldown {
                ms: 10,
                target: Target::Table(1)
            })
        );
    }

    #[test]
    fn test_parse_unrecognized() {
        assert_eq!(
            parse_command(" deal "),
            Err(ParseError::UnrecognizedCommand("deal".to_string()))
        );
        assert!(matches!(
            parse_command(""),
            Err(ParseError::UnrecognizedCommand(_))
        ));
    }

    #[test]
    fn test_error_messages_are_helpful() {
        let msg = ParseError::UnrecognizedCommand("foo".to_string()).to_string();
        assert!(msg.contains("foo"));
        assert!(msg.contains("help"));

        let msg = ParseError::MissingArgument("quantum <ms> [<table>|all]").to_string();
        assert!(msg.contains("quantum <ms>"));
    }

    #[test]
    fn test_parse_error_is_a_std_error() {
        let err: Box<dyn std::error::Error> =
            Box::new(ParseError::InvalidPolicy("lottery".to_string()));
        assert_eq!(
            err.to_string(),
            "Unknown policy 'lottery'. Use fcfs, rr, sjf-units or sjf-cost"
        );
        assert!(err.source().is_none());

        let err = anyhow::Error::from(ParseError::TrailingInput("2".to_string()));
        assert_eq!(err.to_string(), "Unexpected input '2'");
    }
}
