use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use fg_core::ExecutionMode;
use serde::Serialize;
use serde_json::Value;

pub const STRUCTURED_LOG_SCHEMA_VERSION: &str = "fg-conformance-log-v1";

/// One JSON line of forensic output per executed case.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructuredCaseLog {
    pub schema_version: &'static str,
    pub ts_unix_ms: u128,
    pub suite_id: &'static str,
    pub scenario_id: String,
    pub fixture_id: &'static str,
    pub mode: &'static str,
    pub seed: u64,
    pub artifact_refs: Vec<String>,
    pub replay_command: String,
    pub outcome: &'static str,
    pub reason_code: String,
    #[serde(flatten)]
    pub extra_fields: BTreeMap<String, Value>,
}

impl StructuredCaseLog {
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        suite_id: &'static str,
        fixture_id: &'static str,
        case_name: &str,
        mode: ExecutionMode,
        artifact_refs: Vec<String>,
        replay_command: String,
        outcome: &'static str,
        reason_code: impl Into<String>,
    ) -> Self {
        let scenario_id = format!("{suite_id}/{}:{case_name}", mode_label(mode));
        Self {
            schema_version: STRUCTURED_LOG_SCHEMA_VERSION,
            ts_unix_ms: now_unix_ms(),
            seed: det_seed(scenario_id.as_bytes()),
            suite_id,
            scenario_id,
            fixture_id,
            mode: mode_label(mode),
            artifact_refs,
            replay_command,
            outcome,
            reason_code: reason_code.into(),
            extra_fields: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_extra_fields(mut self, extra_fields: BTreeMap<String, Value>) -> Self {
        self.extra_fields.extend(extra_fields);
        self
    }

    pub fn to_json_line(&self) -> Result<String, String> {
        serde_json::to_string(self)
            .map_err(|error| format!("failed to encode log for {}: {error}", self.scenario_id))
    }
}

#[must_use]
pub fn mode_label(mode: ExecutionMode) -> &'static str {
    match mode {
        ExecutionMode::Strict => "strict",
        ExecutionMode::Hardened => "hardened",
    }
}

/// FNV-1a over the scenario id, so replays of one scenario share a seed.
fn det_seed(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325_u64, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

fn now_unix_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_millis())
}
