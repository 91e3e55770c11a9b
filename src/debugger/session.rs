use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use super::mi::{self, Record, ResultClass};
use super::Debugger;
use crate::config::GdbInvocation;
use crate::error::{Error, Result};

/// Run once after startup so console commands never block on a pager or a
/// y/n query, and so a missing breakpoint symbol is reported as an error.
const SETUP_COMMANDS: &[&str] = &[
    "set pagination off",
    "set width 0",
    "set confirm off",
    "set breakpoint pending off",
];

/// Request/reply loop over an MI connection.
///
/// Every command is sent as `-interpreter-exec console`, so it behaves
/// exactly as if typed at the gdb prompt while the reply stays machine
/// readable.
pub struct MiChannel<R, W> {
    reader: R,
    writer: W,
    seq: u32,
}

impl<R: BufRead, W: Write> MiChannel<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            seq: 1,
        }
    }

    fn read_record(&mut self) -> Result<Record> {
        let mut line = String::new();
        let n = self.reader.read_line(&mut line)?;
        if n == 0 {
            return Err(Error::SessionClosed);
        }
        Ok(mi::parse_record(&line))
    }

    pub fn wait_for_prompt(&mut self) -> Result<()> {
        loop {
            match self.read_record()? {
                Record::Prompt => return Ok(()),
                Record::Log(text) => log::debug!("gdb: {}", text.trim_end()),
                _ => {}
            }
        }
    }

    pub fn send_exit(&mut self) -> Result<()> {
        writeln!(self.writer, "-gdb-exit")?;
        self.writer.flush()?;
        Ok(())
    }
}

impl<R: BufRead, W: Write> Debugger for MiChannel<R, W> {
    fn execute(&mut self, command: &str) -> Result<String> {
        let token = self.seq;
        self.seq += 1;

        writeln!(
            self.writer,
            "{}-interpreter-exec console {}",
            token,
            mi::quote(command)
        )?;
        self.writer.flush()?;

        let mut output = String::new();
        let mut completed = false;
        let mut awaiting_stop = false;

        loop {
            match self.read_record()? {
                Record::Console(text) | Record::Target(text) => output.push_str(&text),
                Record::Log(text) => log::debug!("gdb: {}", text.trim_end()),
                Record::Result {
                    token: Some(t),
                    class,
                    fields,
                } if t == token => match class {
                    ResultClass::Error => {
                        let message = mi::extract_str(&fields, "msg")
                            .unwrap_or_else(|| "unknown gdb error".to_string());
                        // consume the prompt that follows so the next command starts clean
                        self.wait_for_prompt()?;
                        return Err(Error::Command {
                            command: command.to_string(),
                            message,
                        });
                    }
                    ResultClass::Exit => return Err(Error::SessionClosed),
                    ResultClass::Running => {
                        completed = true;
                        awaiting_stop = true;
                    }
                    ResultClass::Done | ResultClass::Connected => completed = true,
                },
                Record::Exec { class, fields, .. } if class == "stopped" => {
                    log::debug!(
                        "target stopped: {}",
                        mi::extract_str(&fields, "reason").unwrap_or_default()
                    );
                    if awaiting_stop {
                        break;
                    }
                }
                Record::Prompt if completed && !awaiting_stop => break,
                Record::Other(text) => {
                    output.push_str(&text);
                    output.push('\n');
                }
                _ => {}
            }
        }

        Ok(output)
    }
}

/// A persistent gdb process driven through the MI interpreter.
pub struct GdbSession {
    child: Child,
    channel: MiChannel<BufReader<ChildStdout>, ChildStdin>,
}

impl GdbSession {
    pub fn start(invocation: &GdbInvocation) -> Result<Self> {
        log::info!("starting {}", invocation.program.display());
        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .args(["--interpreter=mi2", "--quiet", "--nx"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(Error::Spawn)?;

        let stdin = child.stdin.take().ok_or(Error::SessionClosed)?;
        let stdout = child.stdout.take().ok_or(Error::SessionClosed)?;

        let mut session = Self {
            child,
            channel: MiChannel::new(BufReader::new(stdout), stdin),
        };

        session.channel.wait_for_prompt()?;
        for cmd in SETUP_COMMANDS {
            session.channel.execute(cmd)?;
        }

        Ok(session)
    }

    /// Asks gdb to exit and reaps the process.
    pub fn close(&mut self) -> Result<()> {
        self.channel.send_exit()?;
        let status = self.child.wait()?;
        log::debug!("gdb exited with {}", status);
        Ok(())
    }
}

impl Debugger for GdbSession {
    fn execute(&mut self, command: &str) -> Result<String> {
        self.channel.execute(command)
    }
}

impl Drop for GdbSession {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}
