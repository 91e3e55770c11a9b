//! Scripted GDB walkthrough of a kernel image running under an emulator.
//!
//! The walkthrough loads symbols, attaches to a remote gdbstub, breaks at the
//! entry point and at the kernel's main function, and inspects the machine
//! state once the main function is reached. The debugger is reached through
//! the [`debugger::Debugger`] trait so the same sequence runs against a live
//! GDB process or an in-memory fake.

pub mod config;
pub mod debugger;
pub mod error;
pub mod executor;
pub mod report;

pub use error::{Error, Result};
