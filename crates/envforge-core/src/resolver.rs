//! Reference resolution
//!
//! The inside of a `${...}` span is one of three things:
//!
//! - `` `command` `` - output of a shell command (only with `allow_shell`)
//! - `envs.NAME` - a process environment variable
//! - `path.to.value` - a value elsewhere in the document tree
//!
//! [`resolve_variable`] classifies the reference and produces the raw value;
//! coercion to text happens in the interpolation engine.

use std::io::Read;
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use wait_timeout::ChildExt;

use crate::error::{Error, Result};
use crate::value::Value;

/// Program used to run shell references
pub const DEFAULT_SHELL: &str = "bash";

/// First path segment that selects an environment variable
pub const ENV_PREFIX: &str = "envs";

/// Options that govern how references are resolved and sections projected
///
/// Immutable once built; passed by reference into every resolution call.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Execute `` ${`command`} `` references (substituted with "" otherwise)
    pub allow_shell: bool,
    /// Keep nested tables of the selected section instead of dropping them
    pub include_child_sections: bool,
    /// Keep unresolvable `${...}` spans literally instead of failing
    pub ignore_missing: bool,
    /// Copy scalar values of ancestor sections into a shallow export
    pub inherit_parent_values: bool,
    /// Shell program invoked as `<shell> -c <command>`
    pub shell: String,
    /// Kill shell commands that run longer than this
    pub shell_timeout: Option<Duration>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            allow_shell: false,
            include_child_sections: false,
            ignore_missing: false,
            inherit_parent_values: false,
            shell: DEFAULT_SHELL.to_string(),
            shell_timeout: None,
        }
    }
}

impl ResolveOptions {
    /// Create options with every feature disabled
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether shell references are executed
    pub fn with_allow_shell(mut self, allow: bool) -> Self {
        self.allow_shell = allow;
        self
    }

    /// Set whether nested tables are kept in the export
    pub fn with_include_child_sections(mut self, include: bool) -> Self {
        self.include_child_sections = include;
        self
    }

    /// Set whether unresolvable references are tolerated
    pub fn with_ignore_missing(mut self, ignore: bool) -> Self {
        self.ignore_missing = ignore;
        self
    }

    /// Set whether ancestor sections contribute their scalar values
    pub fn with_inherit_parent_values(mut self, inherit: bool) -> Self {
        self.inherit_parent_values = inherit;
        self
    }

    /// Set the shell program
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    /// Set a timeout for shell commands
    pub fn with_shell_timeout(mut self, timeout: Duration) -> Self {
        self.shell_timeout = Some(timeout);
        self
    }
}

/// A classified reference expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// Shell command line
    Shell(String),
    /// Environment variable name
    Env(String),
    /// Dotted path from the document root
    Path(String),
}

impl Reference {
    /// Classify the inner text of a `${...}` span
    ///
    /// Backticks inside a shell reference are dropped, and the segments of
    /// an `envs.` reference are joined without a separator.
    pub fn parse(inner: &str) -> Self {
        if inner.starts_with('`') && inner.ends_with('`') {
            let parts: Vec<&str> = inner.split('`').collect();
            let command = parts[1..parts.len() - 1].concat();
            return Reference::Shell(command);
        }

        let mut segments = inner.split('.');
        if segments.next() == Some(ENV_PREFIX) {
            return Reference::Env(segments.collect());
        }

        Reference::Path(inner.to_string())
    }
}

/// Resolve a reference expression against the document root
///
/// Shell references are a soft failure when shell execution is disabled:
/// they resolve to an empty string and only log a warning.
pub fn resolve_variable(root: &Value, inner: &str, options: &ResolveOptions) -> Result<Value> {
    resolve_reference(root, &Reference::parse(inner), options)
}

/// Resolve an already classified reference
pub fn resolve_reference(
    root: &Value,
    reference: &Reference,
    options: &ResolveOptions,
) -> Result<Value> {
    match reference {
        Reference::Shell(command) => {
            if !options.allow_shell {
                log::warn!(
                    "For command: {}\nShell command execution not allowed, use --allow-shell to enable it",
                    command
                );
                return Ok(Value::String(String::new()));
            }
            run_shell(command, options).map(Value::String)
        }
        Reference::Env(name) => Ok(Value::String(env_value(name))),
        Reference::Path(path) => root.get_path(path).cloned(),
    }
}

/// Value of an environment variable, "" when unset or not addressable
fn env_value(name: &str) -> String {
    if name.is_empty() || name.contains(['=', '\0']) {
        return String::new();
    }
    std::env::var_os(name)
        .map(|v| v.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Run a shell command and return its trimmed output (stdout, then stderr)
fn run_shell(command: &str, options: &ResolveOptions) -> Result<String> {
    log::debug!("Running shell command: {}", command);

    let mut cmd = Command::new(&options.shell);
    cmd.arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let (status, mut output, errors) = match options.shell_timeout {
        None => {
            let out = cmd
                .output()
                .map_err(|e| Error::shell_failed(command, e.to_string()))?;
            (out.status, out.stdout, out.stderr)
        }
        Some(timeout) => {
            let deadline = Instant::now() + timeout;
            let mut child = cmd
                .spawn()
                .map_err(|e| Error::shell_failed(command, e.to_string()))?;

            // Drain both pipes while waiting so a chatty command cannot block
            let (tx, rx) = mpsc::channel();
            spawn_reader(Pipe::Stdout, child.stdout.take(), tx.clone());
            spawn_reader(Pipe::Stderr, child.stderr.take(), tx);

            let status = match child.wait_timeout(timeout) {
                Ok(Some(status)) => status,
                Ok(None) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(timed_out(command, timeout));
                }
                Err(e) => return Err(Error::shell_failed(command, e.to_string())),
            };

            // Background processes started by the command may still hold the pipes
            let (stdout, stderr) =
                collect_pipes(&rx, deadline).ok_or_else(|| timed_out(command, timeout))?;
            (status, stdout, stderr)
        }
    };

    output.extend_from_slice(&errors);
    let text = String::from_utf8_lossy(&output).trim().to_string();

    if !status.success() {
        return Err(Error::shell_failed(
            command,
            if text.is_empty() {
                status.to_string()
            } else {
                format!("{}: {}", status, text)
            },
        ));
    }

    Ok(text)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pipe {
    Stdout,
    Stderr,
}

fn spawn_reader<R>(pipe: Pipe, source: Option<R>, tx: mpsc::Sender<(Pipe, Vec<u8>)>)
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut source) = source {
            let _ = source.read_to_end(&mut buf);
        }
        let _ = tx.send((pipe, buf));
    });
}

/// Wait for both pipes to reach EOF, giving up at `deadline`
fn collect_pipes(
    rx: &mpsc::Receiver<(Pipe, Vec<u8>)>,
    deadline: Instant,
) -> Option<(Vec<u8>, Vec<u8>)> {
    let mut stdout = None;
    let mut stderr = None;

    while stdout.is_none() || stderr.is_none() {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok((Pipe::Stdout, buf)) => stdout = Some(buf),
            Ok((Pipe::Stderr, buf)) => stderr = Some(buf),
            Err(_) => return None,
        }
    }

    Some((stdout.unwrap_or_default(), stderr.unwrap_or_default()))
}

fn timed_out(command: &str, timeout: Duration) -> Error {
    Error::shell_failed(command, format!("timed out after {:?}", timeout))
}
