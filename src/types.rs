use std::str::FromStr;

use serde::Deserialize;

/// What happens to a trigger that arrives while a run is already active.
///
/// Runs never overlap; this only decides what gets remembered for the
/// *next* run.
///
/// - `Queue`: merge the trigger into the queued batches (default).
/// - `Replace`: drop everything queued so far and keep only this trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OverlapPolicy {
    #[default]
    Queue,
    Replace,
}

impl FromStr for OverlapPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "queue" => Ok(OverlapPolicy::Queue),
            "replace" => Ok(OverlapPolicy::Replace),
            other => Err(format!(
                "invalid on_overlap: {other} (expected \"queue\" or \"replace\")"
            )),
        }
    }
}
