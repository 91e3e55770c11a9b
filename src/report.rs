use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::debugger::{Breakpoint, TranscriptEntry};
use crate::error::Result;

/// What the inspection block produced once the target stopped for the second time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum InspectionOutcome {
    Reached(Inspection),
    /// The frame text did not name the target function.
    NotReached { frame: String },
    /// The frame query or a command of the inspection block failed.
    InspectionError { detail: String },
}

impl InspectionOutcome {
    pub fn reached(&self) -> bool {
        matches!(self, InspectionOutcome::Reached(_))
    }
}

/// Output captured while inspecting the target function.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Inspection {
    pub frame: String,
    pub registers: String,
    pub stack: String,
    pub expressions: Vec<String>,
    pub steps: Vec<String>,
    pub registers_after_steps: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct WalkthroughReport {
    pub entry_symbol: String,
    pub target_symbol: String,
    pub breakpoints: Vec<Breakpoint>,
    pub entry_registers: String,
    pub outcome: InspectionOutcome,
    pub transcript: Vec<TranscriptEntry>,
}

impl WalkthroughReport {
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        log::info!("report written to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn outcome_is_tagged_by_status() {
        let not_reached = InspectionOutcome::NotReached {
            frame: "#0  _start ()".into(),
        };
        assert_eq!(
            serde_json::to_value(&not_reached).unwrap(),
            json!({ "status": "not-reached", "frame": "#0  _start ()" })
        );

        let error = InspectionOutcome::InspectionError {
            detail: "boom".into(),
        };
        assert_eq!(
            serde_json::to_value(&error).unwrap()["status"],
            json!("inspection-error")
        );

        let reached = InspectionOutcome::Reached(Inspection::default());
        assert!(reached.reached());
        assert_eq!(serde_json::to_value(&reached).unwrap()["status"], json!("reached"));
    }
}
