use serde::{Deserialize, Serialize};

/// How the walkthrough advances once the target function is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepKind {
    /// Source line, stepping over calls.
    #[serde(rename = "next")]
    Next,
    /// Source line, stepping into calls.
    #[serde(rename = "step")]
    Step,
    #[serde(rename = "nexti")]
    NextInstruction,
    #[serde(rename = "stepi")]
    StepInstruction,
}

impl StepKind {
    pub fn command(self) -> &'static str {
        match self {
            StepKind::Next => "next",
            StepKind::Step => "step",
            StepKind::NextInstruction => "nexti",
            StepKind::StepInstruction => "stepi",
        }
    }
}
