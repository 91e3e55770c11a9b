use std::io::{self, Write};

use crate::config::WalkthroughConfig;
use crate::debugger::{DebugContext, Debugger};
use crate::error::Result;
use crate::report::{Inspection, InspectionOutcome, WalkthroughReport};

pub const READY_MESSAGE: &str =
    "Debugger session ready. Type 'c' to continue execution or use other GDB commands.";

/// Writes command output as gdb would print it at its own prompt.
fn emit<W: Write + ?Sized>(out: &mut W, text: &str) -> io::Result<()> {
    if text.trim().is_empty() {
        return Ok(());
    }
    out.write_all(text.as_bytes())?;
    if !text.ends_with('\n') {
        out.write_all(b"\n")?;
    }
    Ok(())
}

/// Runs the breakpoint walkthrough against `ctx`, narrating to `out`.
///
/// Loading, attaching, setting breakpoints and both continues are not
/// guarded: the first failure is returned and nothing after it is printed.
/// The frame check and the inspection that follows are guarded and always
/// end in exactly one of the reached/failed markers.
pub fn run_walkthrough<D, W>(
    ctx: &mut DebugContext<D>,
    cfg: &WalkthroughConfig,
    out: &mut W,
) -> Result<WalkthroughReport>
where
    D: Debugger,
    W: Write + ?Sized,
{
    let entry = &cfg.target.entry_symbol;
    let target = &cfg.target.target_symbol;

    emit(out, &ctx.load_symbols(&cfg.target.binary)?)?;
    emit(out, &ctx.attach(&cfg.connection.endpoint())?)?;

    for symbol in [entry, target] {
        emit(out, &ctx.add_breakpoint(symbol)?)?;
        writeln!(out, "Breakpoint set at {}", symbol)?;
    }

    emit(out, &ctx.resume()?)?;
    writeln!(out, "\n===== Reached {} =====", entry)?;

    let entry_registers = ctx.registers()?;
    emit(out, &entry_registers)?;

    writeln!(out, "\nContinuing to {}...", target)?;
    emit(out, &ctx.resume()?)?;

    // held back until the whole block succeeds so a late failure cannot
    // leave a "Reached" marker behind
    let mut staged = Vec::new();
    let outcome = check_target(ctx, cfg, &mut staged);

    match &outcome {
        InspectionOutcome::Reached(_) => {
            writeln!(out, "\n===== Reached {} =====", target)?;
            out.write_all(&staged)?;
        }
        InspectionOutcome::NotReached { frame } => {
            log::info!("stopped outside {}: {}", target, frame.trim());
            writeln!(out, "\n===== Failed to reach {} =====", target)?;
        }
        InspectionOutcome::InspectionError { detail } => {
            log::warn!("inspection of {} failed: {}", target, detail);
            writeln!(out, "\n===== Failed to reach {} =====", target)?;
        }
    }

    writeln!(out, "\n{}", READY_MESSAGE)?;
    out.flush()?;

    Ok(WalkthroughReport {
        entry_symbol: entry.clone(),
        target_symbol: target.clone(),
        breakpoints: ctx.breakpoints().cloned().collect(),
        entry_registers,
        outcome,
        transcript: ctx.transcript().to_vec(),
    })
}

fn check_target<D: Debugger>(
    ctx: &mut DebugContext<D>,
    cfg: &WalkthroughConfig,
    staged: &mut Vec<u8>,
) -> InspectionOutcome {
    let frame = match ctx.frame() {
        Ok(frame) => frame,
        Err(e) => {
            return InspectionOutcome::InspectionError {
                detail: e.to_string(),
            }
        }
    };

    if !frame.contains(cfg.target.target_symbol.as_str()) {
        return InspectionOutcome::NotReached { frame };
    }

    match inspect(ctx, cfg, frame, staged) {
        Ok(inspection) => InspectionOutcome::Reached(inspection),
        Err(e) => InspectionOutcome::InspectionError {
            detail: e.to_string(),
        },
    }
}

fn inspect<D: Debugger>(
    ctx: &mut DebugContext<D>,
    cfg: &WalkthroughConfig,
    frame: String,
    staged: &mut Vec<u8>,
) -> Result<Inspection> {
    let inspection_cfg = &cfg.inspection;

    let registers = ctx.registers()?;
    emit(staged, &registers)?;

    let stack = ctx.examine_stack(inspection_cfg.stack_words)?;
    emit(staged, &stack)?;

    let mut expressions = Vec::with_capacity(inspection_cfg.expressions.len());
    for expr in &inspection_cfg.expressions {
        let value = ctx.evaluate(expr)?;
        emit(staged, &value)?;
        expressions.push(value);
    }

    let mut steps = Vec::with_capacity(inspection_cfg.step_count as usize);
    for _ in 0..inspection_cfg.step_count {
        let stepped = ctx.step(inspection_cfg.step)?;
        emit(staged, &stepped)?;
        steps.push(stepped);
    }

    let registers_after_steps = ctx.registers()?;
    emit(staged, &registers_after_steps)?;

    Ok(Inspection {
        frame,
        registers,
        stack,
        expressions,
        steps,
        registers_after_steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_skips_blank_output_and_terminates_lines() {
        let mut out = Vec::new();
        emit(&mut out, "   \n").unwrap();
        emit(&mut out, "$1 = 0x9000000").unwrap();
        emit(&mut out, "Continuing.\n").unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "$1 = 0x9000000\nContinuing.\n"
        );
    }
}
