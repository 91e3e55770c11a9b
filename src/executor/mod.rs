mod handoff;
mod runner;

pub use handoff::hand_off;
pub use runner::{run_walkthrough, READY_MESSAGE};
