use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use gdb_walkthrough::config::{parse_remote, GdbInvocation, Remote, WalkthroughConfig};
use gdb_walkthrough::debugger::{DebugContext, Debugger, FakeDebugger, GdbSession};
use gdb_walkthrough::executor;
use gdb_walkthrough::Result;

/// Attaches gdb to a running gdbstub, breaks at the kernel entry point and
/// main function, and prints the machine state once main is reached.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Read configuration from PATH (default: walkthrough.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Kernel ELF to load symbols from
    #[arg(long, value_name = "PATH")]
    binary: Option<PathBuf>,

    /// gdbstub endpoint
    #[arg(long, value_name = "HOST:PORT", value_parser = parse_remote)]
    remote: Option<Remote>,

    /// Write a JSON report of the run to PATH
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,

    /// Exit after the walkthrough instead of opening a prompt
    #[arg(long)]
    batch: bool,

    /// Print the command sequence without starting gdb
    #[arg(long)]
    dry_run: bool,

    /// Log progress to stderr (RUST_LOG overrides)
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    // usage errors exit with status 2 from here
    let args = Args::parse();

    let default_level = if args.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let mut cfg = WalkthroughConfig::load(args.config.as_deref())?;
    cfg.apply_env()?;
    if let Some(binary) = &args.binary {
        cfg.target.binary = binary.clone();
    }
    if let Some(remote) = &args.remote {
        cfg.apply_remote(remote.clone());
    }
    cfg.validate()?;
    log::debug!("configuration: {:?}", cfg);

    if args.dry_run {
        let fake = FakeDebugger::new().respond(
            "frame",
            &format!("#0  {} () at <dry-run>\n", cfg.target.target_symbol),
        );
        let mut ctx = DebugContext::new(fake);
        walkthrough(&mut ctx, &cfg, args.report.as_deref())?;

        println!("\nCommands issued:");
        for cmd in ctx.session().commands() {
            println!("  {}", cmd);
        }
        return Ok(());
    }

    let invocation = GdbInvocation::parse(&cfg.connection.invocation)?;
    let mut ctx = DebugContext::new(GdbSession::start(&invocation)?);
    walkthrough(&mut ctx, &cfg, args.report.as_deref())?;

    if !args.batch {
        executor::hand_off(&mut ctx, io::stdin().lock(), &mut io::stdout())?;
    }

    ctx.session_mut().close()
}

fn walkthrough<D: Debugger>(
    ctx: &mut DebugContext<D>,
    cfg: &WalkthroughConfig,
    report: Option<&Path>,
) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let summary = executor::run_walkthrough(ctx, cfg, &mut out)?;

    if let Some(path) = report {
        summary.write_json(path)?;
    }
    Ok(())
}
