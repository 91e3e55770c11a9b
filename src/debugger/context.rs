use std::borrow::Cow;
use std::path::Path;

use serde::Serialize;

use super::breakpoints::{Breakpoint, Breakpoints};
use super::{Debugger, StepKind};
use crate::error::Result;

/// One issued command and how it ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptEntry {
    pub command: String,
    pub ok: bool,
}

/// The walkthrough's handle on a debugger session.
pub struct DebugContext<D> {
    session: D,
    breakpoints: Breakpoints,
    transcript: Vec<TranscriptEntry>,
}

impl<D: Debugger> DebugContext<D> {
    pub fn new(session: D) -> Self {
        Self {
            session,
            breakpoints: Breakpoints::new(),
            transcript: Vec::new(),
        }
    }

    pub fn session(&self) -> &D {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut D {
        &mut self.session
    }

    pub fn breakpoints(&self) -> impl Iterator<Item = &Breakpoint> {
        self.breakpoints.iter()
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    pub fn run_command(&mut self, cmd: &str) -> Result<String> {
        log::debug!("-> {}", cmd);
        let result = self.session.execute(cmd);
        self.transcript.push(TranscriptEntry {
            command: cmd.to_string(),
            ok: result.is_ok(),
        });
        result
    }

    pub fn load_symbols(&mut self, binary: &Path) -> Result<String> {
        let path = binary.to_string_lossy();
        let quoted = shlex::try_quote(&path).unwrap_or(Cow::Borrowed(&path));
        self.run_command(&format!("file {}", quoted))
    }

    pub fn attach(&mut self, endpoint: &str) -> Result<String> {
        self.run_command(&format!("target remote {}", endpoint))
    }

    /// Sets a breakpoint on `symbol` and returns gdb's reply.
    pub fn add_breakpoint(&mut self, symbol: &str) -> Result<String> {
        let reply = self.run_command(&format!("break {}", symbol))?;
        self.breakpoints.add(symbol, &reply);
        Ok(reply)
    }

    pub fn resume(&mut self) -> Result<String> {
        self.run_command("continue")
    }

    pub fn step(&mut self, kind: StepKind) -> Result<String> {
        self.run_command(kind.command())
    }

    pub fn registers(&mut self) -> Result<String> {
        self.run_command("info registers")
    }

    /// Text of the selected frame, as printed by `frame`.
    pub fn frame(&mut self) -> Result<String> {
        self.run_command("frame")
    }

    pub fn examine_stack(&mut self, words: u32) -> Result<String> {
        self.run_command(&format!("x/{}x $sp", words))
    }

    pub fn evaluate(&mut self, print_command: &str) -> Result<String> {
        self.run_command(print_command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debugger::FakeDebugger;

    #[test]
    fn commands_are_spelled_like_the_gdb_cli() {
        let mut ctx = DebugContext::new(FakeDebugger::new());
        ctx.load_symbols(Path::new("build/kernel.elf")).unwrap();
        ctx.attach("localhost:1234").unwrap();
        ctx.examine_stack(16).unwrap();
        ctx.step(StepKind::StepInstruction).unwrap();
        assert_eq!(
            ctx.session().commands(),
            [
                "file build/kernel.elf",
                "target remote localhost:1234",
                "x/16x $sp",
                "stepi",
            ]
        );
    }

    #[test]
    fn binary_paths_with_spaces_are_quoted() {
        let mut ctx = DebugContext::new(FakeDebugger::new());
        ctx.load_symbols(Path::new("my build/kernel.elf")).unwrap();
        let cmd = &ctx.session().commands()[0];
        assert_ne!(cmd, "file my build/kernel.elf");
        assert!(cmd.starts_with("file "));
        assert!(cmd.contains("my build/kernel.elf"));
    }

    #[test]
    fn failed_breakpoint_is_not_registered() {
        let mut ctx = DebugContext::new(
            FakeDebugger::new()
                .respond("break _start", "Breakpoint 1 at 0x40080000\n")
                .fail("break nope", "Function \"nope\" not defined."),
        );
        ctx.add_breakpoint("_start").unwrap();
        assert!(ctx.add_breakpoint("nope").is_err());
        let registered: Vec<_> = ctx.breakpoints().collect();
        assert_eq!(registered.len(), 1);
        assert_eq!(registered[0].number, Some(1));
        assert_eq!(
            ctx.transcript(),
            [
                TranscriptEntry {
                    command: "break _start".into(),
                    ok: true
                },
                TranscriptEntry {
                    command: "break nope".into(),
                    ok: false
                },
            ]
        );
    }
}
