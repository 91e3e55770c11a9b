// tests/handoff_tests.rs
// Interactive prompt after the walkthrough, fed from an in-memory stdin.

use std::io::Cursor;

use gdb_walkthrough::debugger::{DebugContext, FakeDebugger};
use gdb_walkthrough::executor::hand_off;

#[cfg(test)]
mod handoff_tests {
    use super::*;

    #[test]
    fn lines_are_forwarded_until_quit() {
        let fake = FakeDebugger::new()
            .respond("c", "Continuing.\n")
            .respond("bt", "#0  kernel_main ()");
        let mut ctx = DebugContext::new(fake);
        let mut out = Vec::new();

        hand_off(&mut ctx, Cursor::new("c\n\nbt\nq\ninfo registers\n"), &mut out).unwrap();

        assert_eq!(ctx.session().commands(), ["c", "bt"]);
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("Continuing.\n"));
        assert!(out.contains("#0  kernel_main ()\n"));
    }

    #[test]
    fn rejected_command_keeps_the_prompt_open() {
        let fake = FakeDebugger::new().fail("x/4x 0", "Cannot access memory at address 0x0");
        let mut ctx = DebugContext::new(fake);
        let mut out = Vec::new();

        hand_off(&mut ctx, Cursor::new("x/4x 0\ninfo frame\n"), &mut out).unwrap();

        assert_eq!(ctx.session().commands(), ["x/4x 0", "info frame"]);
        assert!(String::from_utf8(out)
            .unwrap()
            .contains("Cannot access memory at address 0x0\n"));
    }

    #[test]
    fn end_of_input_ends_the_prompt() {
        let mut ctx = DebugContext::new(FakeDebugger::new());
        let mut out = Vec::new();
        hand_off(&mut ctx, Cursor::new(""), &mut out).unwrap();
        assert!(ctx.session().commands().is_empty());
        assert_eq!(String::from_utf8(out).unwrap(), "(gdb) \n");
    }
}
