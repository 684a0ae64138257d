//! Simulation scenarios.

use std::path::Path;

use anyhow::Context;
use pesopro_fx::{RateSource, Side};
use serde::{Deserialize, Serialize};

use crate::market::FaultType;

/// A simulation scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Steps in the scenario.
    pub steps: Vec<ScenarioStep>,
}

/// A step in a scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum ScenarioStep {
    /// Move the simulated clock forward.
    AdvanceHours { hours: i64 },
    /// Drop both cached records.
    ClearCache,
    /// Show the best rate at hand, then resolve and apply the result.
    LoadRate,
    /// Resolve the history series and rebuild the chart.
    LoadHistory,
    /// Feed keypad keys (`0-9`, `.`, `<` delete, `c` clear).
    Keys { keys: String },
    /// Make a field the edited one.
    Switch { side: Side },
    /// Move the pointer over the chart; `None` leaves it.
    Hover { client_x: Option<f64> },
    /// Inject a market fault.
    InjectFault { fault: FaultType },
    /// Clear all market faults.
    ClearFault,
    /// Check a condition.
    Assert { condition: AssertCondition },
}

/// Conditions that can be asserted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum AssertCondition {
    /// Last resolved rate came from `source`.
    RateSource { source: RateSource },
    /// Last resolved rate equals `value`.
    RateEquals { value: f64 },
    /// Edited field shows `text`.
    InputDisplay { text: String },
    /// `side` is the edited field.
    ActiveSide { side: Side },
    /// History holds exactly `points` samples.
    HistoryLen { points: usize },
    /// History holds at least `points` samples.
    HistoryAtLeast { points: usize },
    /// Chart plots exactly `points` samples.
    ChartPoints { points: usize },
    /// Tooltip label reads `label`.
    TooltipLabel { label: String },
    /// Rate provider was asked `count` times in total.
    RateRequests { count: usize },
    /// History provider was asked `count` times in total.
    HistoryRequests { count: usize },
}

impl Scenario {
    /// Built-in scenario names.
    pub const BUILT_IN: [&'static str; 6] = [
        "cold-start",
        "warm-cache",
        "stale-offline",
        "offline-first-run",
        "history-outage",
        "typing-session",
    ];

    /// Load a built-in scenario by name, or a JSON scenario from a path.
    pub fn load(name: &str) -> anyhow::Result<Self> {
        match name {
            "cold-start" => Ok(Self::cold_start()),
            "warm-cache" => Ok(Self::warm_cache()),
            "stale-offline" => Ok(Self::stale_offline()),
            "offline-first-run" => Ok(Self::offline_first_run()),
            "history-outage" => Ok(Self::history_outage()),
            "typing-session" => Ok(Self::typing_session()),
            path if path.ends_with(".json") => Self::from_file(path),
            _ => Err(anyhow::anyhow!("Unknown scenario: {}", name)),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing scenario {}", path.display()))
    }

    fn new(name: &str, description: &str, steps: Vec<ScenarioStep>) -> Self {
        // Every built-in run starts from an empty cache.
        let mut all = vec![ScenarioStep::ClearCache];
        all.extend(steps);
        Self {
            name: name.to_string(),
            description: description.to_string(),
            steps: all,
        }
    }

    /// First launch with a healthy market.
    fn cold_start() -> Self {
        Self::new(
            "cold-start",
            "First launch fetches the rate and the history",
            vec![
                ScenarioStep::LoadRate,
                assert(AssertCondition::RateSource {
                    source: RateSource::Fresh,
                }),
                ScenarioStep::LoadHistory,
                assert(AssertCondition::HistoryAtLeast { points: 5 }),
                assert(AssertCondition::TooltipLabel {
                    label: "Live Rate".to_string(),
                }),
                assert(AssertCondition::RateRequests { count: 1 }),
                assert(AssertCondition::HistoryRequests { count: 1 }),
            ],
        )
    }

    /// Reloads inside the freshness window stay off the network.
    fn warm_cache() -> Self {
        Self::new(
            "warm-cache",
            "Cached rate is served until it goes stale",
            vec![
                ScenarioStep::LoadRate,
                ScenarioStep::LoadHistory,
                ScenarioStep::AdvanceHours { hours: 2 },
                ScenarioStep::LoadRate,
                ScenarioStep::LoadHistory,
                assert(AssertCondition::RateSource {
                    source: RateSource::Cache,
                }),
                assert(AssertCondition::RateRequests { count: 1 }),
                assert(AssertCondition::HistoryRequests { count: 1 }),
                ScenarioStep::AdvanceHours { hours: 3 },
                ScenarioStep::LoadRate,
                assert(AssertCondition::RateSource {
                    source: RateSource::Fresh,
                }),
                assert(AssertCondition::RateRequests { count: 2 }),
            ],
        )
    }

    /// A stale rate keeps being served while the market is down.
    fn stale_offline() -> Self {
        Self::new(
            "stale-offline",
            "Stale cached rate survives an outage",
            vec![
                ScenarioStep::LoadRate,
                ScenarioStep::AdvanceHours { hours: 6 },
                ScenarioStep::InjectFault {
                    fault: FaultType::RateOffline,
                },
                ScenarioStep::LoadRate,
                assert(AssertCondition::RateSource {
                    source: RateSource::Cache,
                }),
                ScenarioStep::ClearFault,
                ScenarioStep::LoadRate,
                assert(AssertCondition::RateSource {
                    source: RateSource::Fresh,
                }),
                assert(AssertCondition::RateRequests { count: 3 }),
            ],
        )
    }

    /// Nothing cached and nothing reachable.
    fn offline_first_run() -> Self {
        Self::new(
            "offline-first-run",
            "Fallback rate and a single live chart point",
            vec![
                ScenarioStep::InjectFault {
                    fault: FaultType::RateOffline,
                },
                ScenarioStep::InjectFault {
                    fault: FaultType::HistoryOffline,
                },
                ScenarioStep::LoadRate,
                ScenarioStep::LoadHistory,
                assert(AssertCondition::RateSource {
                    source: RateSource::Fallback,
                }),
                assert(AssertCondition::RateEquals { value: 19.50 }),
                assert(AssertCondition::HistoryLen { points: 0 }),
                assert(AssertCondition::ChartPoints { points: 1 }),
            ],
        )
    }

    /// A failed history refresh leaves only the live point on the chart.
    fn history_outage() -> Self {
        Self::new(
            "history-outage",
            "History outage and malformed responses collapse the chart to the live rate",
            vec![
                ScenarioStep::LoadRate,
                ScenarioStep::LoadHistory,
                assert(AssertCondition::HistoryAtLeast { points: 5 }),
                ScenarioStep::AdvanceHours { hours: 25 },
                ScenarioStep::InjectFault {
                    fault: FaultType::HistoryOffline,
                },
                ScenarioStep::LoadHistory,
                assert(AssertCondition::HistoryLen { points: 0 }),
                assert(AssertCondition::ChartPoints { points: 1 }),
                ScenarioStep::ClearFault,
                ScenarioStep::InjectFault {
                    fault: FaultType::MalformedHistory,
                },
                ScenarioStep::LoadHistory,
                assert(AssertCondition::HistoryLen { points: 0 }),
                ScenarioStep::ClearFault,
                ScenarioStep::LoadHistory,
                assert(AssertCondition::HistoryAtLeast { points: 5 }),
                assert(AssertCondition::HistoryRequests { count: 4 }),
            ],
        )
    }

    /// Keypad editing and side switching.
    fn typing_session() -> Self {
        Self::new(
            "typing-session",
            "Keypad input, length limit and side switch",
            vec![
                ScenarioStep::LoadRate,
                assert(AssertCondition::InputDisplay {
                    text: "10".to_string(),
                }),
                assert(AssertCondition::ActiveSide { side: Side::Quote }),
                ScenarioStep::Keys {
                    keys: "<<5.25".to_string(),
                },
                assert(AssertCondition::InputDisplay {
                    text: "5.25".to_string(),
                }),
                ScenarioStep::Keys {
                    keys: "c1234567.8912".to_string(),
                },
                assert(AssertCondition::InputDisplay {
                    text: "1,234,567.891".to_string(),
                }),
                ScenarioStep::Switch { side: Side::Base },
                assert(AssertCondition::ActiveSide { side: Side::Base }),
                ScenarioStep::Keys {
                    keys: "c".to_string(),
                },
                assert(AssertCondition::InputDisplay {
                    text: "0".to_string(),
                }),
                ScenarioStep::LoadHistory,
                ScenarioStep::Hover {
                    client_x: Some(0.0),
                },
                ScenarioStep::Hover { client_x: None },
                assert(AssertCondition::TooltipLabel {
                    label: "Live Rate".to_string(),
                }),
            ],
        )
    }
}

fn assert(condition: AssertCondition) -> ScenarioStep {
    ScenarioStep::Assert { condition }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_built_in_scenarios_load() {
        for name in Scenario::BUILT_IN {
            let scenario = Scenario::load(name).unwrap();
            assert_eq!(scenario.name, name);
            assert!(matches!(scenario.steps[0], ScenarioStep::ClearCache));
        }
        assert!(Scenario::load("nope").is_err());
    }

    #[test]
    fn test_scenario_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.json");
        let json = r#"{
            "name": "custom",
            "description": "hand written",
            "steps": [
                {"step": "load_rate"},
                {"step": "inject_fault", "fault": {"latency": {"delay_ms": 5}}},
                {"step": "keys", "keys": "12"},
                {"step": "assert", "condition": {"check": "rate_source", "source": "fresh"}}
            ]
        }"#;
        std::fs::write(&path, json).unwrap();

        let scenario = Scenario::load(path.to_str().unwrap()).unwrap();
        assert_eq!(scenario.name, "custom");
        assert_eq!(scenario.steps.len(), 4);
        assert!(matches!(
            scenario.steps[1],
            ScenarioStep::InjectFault {
                fault: FaultType::Latency { delay_ms: 5 }
            }
        ));
    }
}
