use std::io::{BufRead, Write};

use crate::debugger::{DebugContext, Debugger};
use crate::error::{Error, Result};

const PROMPT: &str = "(gdb) ";

/// Forwards lines from `input` to the session until `q`/`quit` or end of input.
///
/// Commands gdb rejects are printed and the prompt continues; losing the
/// session ends the hand-off with an error.
pub fn hand_off<D, R, W>(ctx: &mut DebugContext<D>, mut input: R, out: &mut W) -> Result<()>
where
    D: Debugger,
    R: BufRead,
    W: Write + ?Sized,
{
    loop {
        write!(out, "{}", PROMPT)?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            writeln!(out)?;
            return Ok(());
        }

        let cmd = line.trim();
        match cmd {
            "" => continue,
            "q" | "quit" => return Ok(()),
            _ => {}
        }

        match ctx.run_command(cmd) {
            Ok(output) => {
                out.write_all(output.as_bytes())?;
                if !output.is_empty() && !output.ends_with('\n') {
                    writeln!(out)?;
                }
            }
            Err(Error::Command { message, .. }) => writeln!(out, "{}", message)?,
            Err(e) => return Err(e),
        }
    }
}
