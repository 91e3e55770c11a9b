use std::env::VarError;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::debugger::StepKind;
use crate::error::{Error, Result};

/// Config file picked up from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "walkthrough.toml";

/// Full gdb invocation, e.g. `gdb-multiarch -q`. The MI flags are appended.
pub const GDB_INVOCATION_ENV: &str = "GDB_INVOCATION";
pub const GDB_HOST_ENV: &str = "GDB_HOST";
pub const GDB_PORT_ENV: &str = "GDB_PORT";
/// Path to the kernel ELF to load symbols from.
pub const KERNEL_ELF_ENV: &str = "KERNEL_ELF";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub invocation: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 1234,
            invocation: "gdb".to_string(),
        }
    }
}

impl ConnectionConfig {
    /// The `host:port` string handed to `target remote`.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TargetConfig {
    pub binary: PathBuf,
    /// First breakpoint, hit right after attaching.
    pub entry_symbol: String,
    /// Function the walkthrough inspects once it is reached.
    pub target_symbol: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("build/kernel.elf"),
            entry_symbol: "_start".to_string(),
            target_symbol: "kernel_main".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InspectionConfig {
    /// Number of words dumped from `$sp`.
    pub stack_words: u32,
    pub step_count: u32,
    pub step: StepKind,
    /// Printed in order after the stack dump.
    pub expressions: Vec<String>,
}

impl Default for InspectionConfig {
    fn default() -> Self {
        Self {
            stack_words: 16,
            step_count: 3,
            step: StepKind::Next,
            expressions: vec![
                // first argument (UART base)
                "p/x $x0".to_string(),
                // exception level
                "p/d (unsigned long)($CurrentEL >> 2) & 0x3".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WalkthroughConfig {
    pub connection: ConnectionConfig,
    pub target: TargetConfig,
    pub inspection: InspectionConfig,
}

impl WalkthroughConfig {
    /// Loads `path`, or [`DEFAULT_CONFIG_FILE`] if no path is given.
    ///
    /// A missing default file falls back to the built-in defaults. A missing
    /// file that was asked for explicitly is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p, true),
            None => (Path::new(DEFAULT_CONFIG_FILE), false),
        };

        match fs::read_to_string(path) {
            Ok(text) => {
                log::info!("using configuration from {}", path.display());
                Self::from_toml_str(&text)
            }
            Err(e) if e.kind() == ErrorKind::NotFound && !explicit => {
                log::info!("{} not found, using default configuration", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(Error::Config(format!(
                "cannot read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Applies overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_vars(read_env)
    }

    /// Applies overrides from `lookup`, keyed by the `*_ENV` variable names.
    pub fn apply_vars<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Result<Option<String>>,
    {
        if let Some(invocation) = lookup(GDB_INVOCATION_ENV)? {
            self.connection.invocation = invocation;
        }
        if let Some(host) = lookup(GDB_HOST_ENV)? {
            self.connection.host = host;
        }
        if let Some(port) = lookup(GDB_PORT_ENV)? {
            self.connection.port = parse_port(&port)?;
        }
        if let Some(binary) = lookup(KERNEL_ELF_ENV)? {
            self.target.binary = PathBuf::from(binary);
        }
        self.validate()
    }

    /// Overrides host and port with an endpoint from the command line.
    pub fn apply_remote(&mut self, remote: Remote) {
        self.connection.host = remote.host;
        self.connection.port = remote.port;
    }

    pub fn validate(&self) -> Result<()> {
        if self.connection.invocation.trim().is_empty() {
            return Err(Error::Config("gdb invocation is empty".to_string()));
        }
        if self.target.entry_symbol.is_empty() || self.target.target_symbol.is_empty() {
            return Err(Error::Config("breakpoint symbols must not be empty".to_string()));
        }
        if self.inspection.stack_words == 0 {
            return Err(Error::Config("stack_words must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// A gdbstub endpoint given as `host:port`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remote {
    pub host: String,
    pub port: u16,
}

/// Splits `host:port` on the last colon.
pub fn parse_remote(remote: &str) -> Result<Remote> {
    let (host, port) = remote
        .rsplit_once(':')
        .ok_or_else(|| Error::Config(format!("expected HOST:PORT, got `{}`", remote)))?;
    if host.is_empty() {
        return Err(Error::Config(format!("missing host in `{}`", remote)));
    }
    Ok(Remote {
        host: host.to_string(),
        port: parse_port(port)?,
    })
}

fn parse_port(value: &str) -> Result<u16> {
    value
        .trim()
        .parse::<u16>()
        .map_err(|_| Error::Config(format!("invalid port `{}`", value)))
}

fn read_env(key: &str) -> Result<Option<String>> {
    match std::env::var(key) {
        Ok(val) => Ok(Some(val)),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(_)) => Err(Error::Config(format!(
            "environment variable {} is not valid unicode",
            key
        ))),
    }
}

/// A gdb command line split into the program and its leading arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GdbInvocation {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl GdbInvocation {
    /// Splits `invocation` with shell quoting rules and resolves the program on `PATH`.
    pub fn parse(invocation: &str) -> Result<Self> {
        let mut words = shlex::split(invocation)
            .ok_or_else(|| Error::Config(format!("unbalanced quotes in `{}`", invocation)))?
            .into_iter();
        let program = words
            .next()
            .ok_or_else(|| Error::Config("gdb invocation is empty".to_string()))?;
        let program = which::which(program)?;

        Ok(Self {
            program,
            args: words.collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Result<Option<String>> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k: &str| Ok(map.get(k).cloned())
    }

    #[test]
    fn defaults_match_the_qemu_aarch64_setup() {
        let cfg = WalkthroughConfig::default();
        assert_eq!(cfg.connection.endpoint(), "localhost:1234");
        assert_eq!(cfg.target.binary, PathBuf::from("build/kernel.elf"));
        assert_eq!(cfg.target.entry_symbol, "_start");
        assert_eq!(cfg.target.target_symbol, "kernel_main");
        assert_eq!(cfg.inspection.stack_words, 16);
        assert_eq!(cfg.inspection.step_count, 3);
        assert_eq!(cfg.inspection.step, StepKind::Next);
        assert_eq!(cfg.inspection.expressions.len(), 2);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let cfg = WalkthroughConfig::from_toml_str(
            r#"
[connection]
port = 4321

[target]
binary = "out/kernel8.elf"
"#,
        )
        .unwrap();
        assert_eq!(cfg.connection.host, "localhost");
        assert_eq!(cfg.connection.port, 4321);
        assert_eq!(cfg.target.binary, PathBuf::from("out/kernel8.elf"));
        assert_eq!(cfg.target.target_symbol, "kernel_main");
    }

    #[test]
    fn step_kind_is_read_by_name() {
        let cfg = WalkthroughConfig::from_toml_str(
            r#"
[inspection]
step = "stepi"
step_count = 5
expressions = []
"#,
        )
        .unwrap();
        assert_eq!(cfg.inspection.step, StepKind::StepInstruction);
        assert_eq!(cfg.inspection.step_count, 5);
        assert!(cfg.inspection.expressions.is_empty());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = WalkthroughConfig::from_toml_str("[connection]\nprot = 1\n").unwrap_err();
        assert!(matches!(err, Error::Toml(_)));
    }

    #[test]
    fn zero_stack_words_is_rejected() {
        let err = WalkthroughConfig::from_toml_str("[inspection]\nstack_words = 0\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn env_overrides_file_values() {
        let mut cfg = WalkthroughConfig::default();
        cfg.apply_vars(vars(&[
            (GDB_HOST_ENV, "10.0.0.2"),
            (GDB_PORT_ENV, "3333"),
            (KERNEL_ELF_ENV, "kernel.elf"),
            (GDB_INVOCATION_ENV, "gdb-multiarch -q"),
        ]))
        .unwrap();
        assert_eq!(cfg.connection.endpoint(), "10.0.0.2:3333");
        assert_eq!(cfg.target.binary, PathBuf::from("kernel.elf"));
        assert_eq!(cfg.connection.invocation, "gdb-multiarch -q");
    }

    #[test]
    #[serial_test::serial]
    fn process_environment_is_applied() {
        std::env::set_var(GDB_PORT_ENV, "1240");
        std::env::set_var(KERNEL_ELF_ENV, "target/kernel.elf");
        let mut cfg = WalkthroughConfig::default();
        let result = cfg.apply_env();
        std::env::remove_var(GDB_PORT_ENV);
        std::env::remove_var(KERNEL_ELF_ENV);

        result.unwrap();
        assert_eq!(cfg.connection.port, 1240);
        assert_eq!(cfg.target.binary, PathBuf::from("target/kernel.elf"));
    }

    #[test]
    fn bad_env_port_is_a_config_error() {
        let mut cfg = WalkthroughConfig::default();
        let err = cfg.apply_vars(vars(&[(GDB_PORT_ENV, "99999")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn remote_splits_on_last_colon() {
        let mut cfg = WalkthroughConfig::default();
        cfg.apply_remote(parse_remote("127.0.0.1:1235").unwrap());
        assert_eq!(cfg.connection.host, "127.0.0.1");
        assert_eq!(cfg.connection.port, 1235);
        assert_eq!(cfg.connection.endpoint(), "127.0.0.1:1235");

        let ipv6 = parse_remote("::1:1234").unwrap();
        assert_eq!(ipv6.host, "::1");
        assert_eq!(ipv6.port, 1234);
    }

    #[test]
    fn malformed_remote_is_a_config_error() {
        for remote in ["1235", ":1235", "localhost:port", "localhost:", "localhost:70000"] {
            assert!(
                matches!(parse_remote(remote), Err(Error::Config(_))),
                "{}",
                remote
            );
        }
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let path = std::env::temp_dir().join("gdb-walkthrough-does-not-exist.toml");
        let err = WalkthroughConfig::load(Some(&path)).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn explicit_file_is_loaded() {
        let path = std::env::temp_dir().join("gdb-walkthrough-explicit.toml");
        fs::write(&path, "[target]\ntarget_symbol = \"kmain\"\n").unwrap();
        let cfg = WalkthroughConfig::load(Some(&path)).unwrap();
        assert_eq!(cfg.target.target_symbol, "kmain");
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn invocation_with_unbalanced_quotes_is_rejected() {
        let err = GdbInvocation::parse("gdb \"-q").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
