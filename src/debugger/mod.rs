mod breakpoints;
mod context;
mod fake;
pub mod mi;
mod session;
mod stepping;

pub use breakpoints::Breakpoint;
pub use context::{DebugContext, TranscriptEntry};
pub use fake::FakeDebugger;
pub use session::{GdbSession, MiChannel};
pub use stepping::StepKind;

use crate::error::Result;

/// A debugger that runs console commands one at a time.
///
/// `execute` blocks until the command has finished, including a `continue`
/// that only returns once the target stops again.
pub trait Debugger {
    fn execute(&mut self, command: &str) -> Result<String>;
}
