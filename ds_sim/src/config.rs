//! Simulation configuration management.
//!
//! Consolidates all environment variable reads, applies command line
//! overrides and validates the result.

use domino_sched::{
    HeuristicConfig, ParsePolicyError, Policy, SimulationConfig, TurnParams,
    game::constants::{DEFAULT_COOLDOWN_MS, DEFAULT_MAX_STEPS, MAX_ACTORS, MIN_ACTORS},
    policy::SjfCost,
};

/// Complete simulation configuration loaded from environment variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimConfig {
    /// Number of tables to deal
    pub tables: usize,
    /// Fixed actor count; random per table when unset
    pub actors: Option<usize>,
    /// Initial policy of every table
    pub policy: Policy,
    /// Initial quantum; the policy default when unset
    pub quantum_ms: Option<u64>,
    /// Initial turn cooldown
    pub cooldown_ms: u64,
    /// Step ceiling of every table
    pub max_steps: u64,
    /// Seed for dealing; random when unset
    pub seed: Option<u64>,
    /// Whether the auto-tuner runs
    pub auto_tune: bool,
    /// Pause between auto-tuner passes
    pub tune_interval_ms: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tables: 3,
            actors: None,
            policy: SjfCost.into(),
            quantum_ms: None,
            cooldown_ms: DEFAULT_COOLDOWN_MS,
            max_steps: DEFAULT_MAX_STEPS,
            seed: None,
            auto_tune: true,
            tune_interval_ms: 100,
        }
    }
}

/// Command line values that take precedence over the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub tables: Option<usize>,
    pub actors: Option<usize>,
    pub policy: Option<Policy>,
    pub quantum_ms: Option<u64>,
    pub cooldown_ms: Option<u64>,
    pub max_steps: Option<u64>,
    pub seed: Option<u64>,
    pub no_tune: bool,
    pub tune_interval_ms: Option<u64>,
}

impl SimConfig {
    /// Load configuration from `DS_*` environment variables
    ///
    /// # Errors
    ///
    /// Returns error if `DS_POLICY` names no known policy
    pub fn from_env(overrides: Overrides) -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok(), overrides)
    }

    /// Load configuration through an arbitrary variable lookup
    fn from_vars<F>(lookup: F, overrides: Overrides) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let policy = match overrides.policy {
            Some(policy) => policy,
            None => match lookup("DS_POLICY") {
                Some(name) => name.parse().map_err(|err: ParsePolicyError| ConfigError::Invalid {
                    var: "DS_POLICY".to_string(),
                    reason: err.to_string(),
                })?,
                None => defaults.policy,
            },
        };

        let auto_tune = !overrides.no_tune && parse_or(&lookup, "DS_AUTO_TUNE", defaults.auto_tune);

        Ok(Self {
            tables: overrides
                .tables
                .unwrap_or_else(|| parse_or(&lookup, "DS_TABLES", defaults.tables)),
            actors: overrides
                .actors
                .or_else(|| parse_opt(&lookup, "DS_ACTORS")),
            policy,
            quantum_ms: overrides
                .quantum_ms
                .or_else(|| parse_opt(&lookup, "DS_QUANTUM_MS")),
            cooldown_ms: overrides
                .cooldown_ms
                .unwrap_or_else(|| parse_or(&lookup, "DS_COOLDOWN_MS", defaults.cooldown_ms)),
            max_steps: overrides
                .max_steps
                .unwrap_or_else(|| parse_or(&lookup, "DS_MAX_STEPS", defaults.max_steps)),
            seed: overrides.seed.or_else(|| parse_opt(&lookup, "DS_SEED")),
            auto_tune,
            tune_interval_ms: overrides.tune_interval_ms.unwrap_or_else(|| {
                parse_or(&lookup, "DS_TUNE_INTERVAL_MS", defaults.tune_interval_ms)
            }),
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tables == 0 {
            return Err(ConfigError::Invalid {
                var: "DS_TABLES".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if let Some(actors) = self
            .actors
            .filter(|actors| !(MIN_ACTORS..=MAX_ACTORS).contains(actors))
        {
            return Err(ConfigError::Invalid {
                var: "DS_ACTORS".to_string(),
                reason: format!("Must be between {MIN_ACTORS} and {MAX_ACTORS}, got {actors}"),
            });
        }

        if self.max_steps == 0 {
            return Err(ConfigError::Invalid {
                var: "DS_MAX_STEPS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.auto_tune && self.tune_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                var: "DS_TUNE_INTERVAL_MS".to_string(),
                reason: "Must be greater than 0 while auto-tuning".to_string(),
            });
        }

        Ok(())
    }

    /// Library configuration for this run
    #[must_use]
    pub fn simulation_config(&self) -> SimulationConfig {
        let params = TurnParams::default()
            .with_policy(self.policy)
            .with_quantum_ms(
                self.quantum_ms
                    .unwrap_or_else(|| self.policy.default_quantum_ms()),
            )
            .with_cooldown_ms(self.cooldown_ms);

        SimulationConfig {
            tables: self.tables,
            actors: self.actors,
            seed: self.seed,
            params,
            max_steps: self.max_steps,
            auto_tune: self.auto_tune,
            heuristic: HeuristicConfig::default(),
            tune_interval_ms: self.tune_interval_ms,
        }
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse a variable with default fallback
fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    parse_opt(lookup, key).unwrap_or(default)
}

fn parse_opt<F, T>(lookup: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key).and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use domino_sched::policy::{Fcfs, RoundRobin};
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)], overrides: Overrides) -> Result<SimConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SimConfig::from_vars(|key| vars.get(key).cloned(), overrides)
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = load(&[], Overrides::default()).unwrap();
        assert_eq!(config, SimConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_environment_values() {
        let config = load(
            &[
                ("DS_TABLES", "5"),
                ("DS_ACTORS", "4"),
                ("DS_POLICY", "Round_Robin"),
                ("DS_COOLDOWN_MS", "20"),
                ("DS_MAX_STEPS", "300"),
                ("DS_SEED", "9"),
                ("DS_AUTO_TUNE", "false"),
                ("DS_TUNE_INTERVAL_MS", "50"),
            ],
            Overrides::default(),
        )
        .unwrap();

        assert_eq!(config.tables, 5);
        assert_eq!(config.actors, Some(4));
        assert_eq!(config.policy, Policy::from(RoundRobin));
        assert_eq!(config.cooldown_ms, 20);
        assert_eq!(config.max_steps, 300);
        assert_eq!(config.seed, Some(9));
        assert!(!config.auto_tune);
        assert_eq!(config.tune_interval_ms, 50);
    }

    #[test]
    fn test_overrides_win_over_environment() {
        let overrides = Overrides {
            tables: Some(1),
            policy: Some(Fcfs.into()),
            no_tune: true,
            ..Overrides::default()
        };
        let config = load(
            &[("DS_TABLES", "8"), ("DS_POLICY", "sjf-units"), ("DS_AUTO_TUNE", "true")],
            overrides,
        )
        .unwrap();

        assert_eq!(config.tables, 1);
        assert_eq!(config.policy, Policy::from(Fcfs));
        assert!(!config.auto_tune);
    }

    #[test]
    fn test_unparsable_numbers_fall_back() {
        let config = load(&[("DS_TABLES", "many"), ("DS_SEED", "-")], Overrides::default()).unwrap();
        assert_eq!(config.tables, 3);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn test_unknown_policy_is_rejected() {
        let err = load(&[("DS_POLICY", "lottery")], Overrides::default()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("DS_POLICY"));
        assert!(msg.contains("lottery"));
    }

    #[test]
    fn test_validation() {
        let invalid = [
            SimConfig {
                tables: 0,
                ..SimConfig::default()
            },
            SimConfig {
                actors: Some(5),
                ..SimConfig::default()
            },
            SimConfig {
                max_steps: 0,
                ..SimConfig::default()
            },
            SimConfig {
                tune_interval_ms: 0,
                ..SimConfig::default()
            },
        ];
        for config in invalid {
            assert!(matches!(
                config.validate(),
                Err(ConfigError::Invalid { .. })
            ));
        }

        let untuned = SimConfig {
            auto_tune: false,
            tune_interval_ms: 0,
            ..SimConfig::default()
        };
        assert!(untuned.validate().is_ok());
    }

    #[test]
    fn test_quantum_follows_policy_unless_set() {
        let rr = SimConfig {
            policy: RoundRobin.into(),
            ..SimConfig::default()
        };
        let params = rr.simulation_config().params;
        assert_eq!(params.quantum_ms, Policy::from(RoundRobin).default_quantum_ms());

        let fixed = SimConfig {
            quantum_ms: Some(42),
            ..rr
        };
        assert_eq!(fixed.simulation_config().params.quantum_ms, 42);
    }

    #[test]
    fn test_simulation_config_is_valid() {
        let config = SimConfig {
            actors: Some(2),
            seed: Some(1),
            ..SimConfig::default()
        };
        let sim = config.simulation_config();
        assert!(sim.validate().is_ok());
        assert_eq!(sim.actors, Some(2));
        assert_eq!(sim.seed, Some(1));
    }
}
