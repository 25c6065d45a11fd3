//! scm::runner
//!
//! Command execution against a project directory.
//!
//! # Design
//!
//! Commands are plain shell strings (`git commit -m '...'`), run through
//! the platform shell with the working directory passed to the child
//! process. The calling process never changes its own current directory,
//! so concurrent commands cannot run against the wrong directory and
//! nothing has to be restored afterwards.
//!
//! Output is fully buffered. stdout and stderr are drained on their own
//! threads while the child runs, so a command that prints more than a
//! pipe buffer (a large diff) cannot stall.
//!
//! # Timeouts
//!
//! [`ShellRunner`] polls the child until it exits or the timeout expires.
//! On Unix the shell is started in its own process group, and an expired
//! command has the whole group killed: the shell, subshells, pipelines and
//! any helpers the tool started (ssh, credential helpers). The shell is
//! then reaped and [`ScmError::Timeout`] is returned.
//!
//! # Example
//!
//! ```no_run
//! use scmkit::scm::runner::{CommandRunner, ShellRunner};
//! use std::path::Path;
//! use std::time::Duration;
//!
//! let runner = ShellRunner::with_timeout(Some(Duration::from_secs(30)));
//! let output = runner.run("git status --porcelain", Path::new("/repo")).unwrap();
//! assert_eq!(output.exit_code, 0);
//! ```

use std::io::{self, Read};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use super::traits::ScmError;

/// How often a running child is polled when a timeout is set.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Result of running one command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    /// Exit code (`-1` if terminated by a signal)
    pub exit_code: i32,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

impl CommandOutput {
    /// An output with only an exit code.
    pub fn exit(exit_code: i32) -> Self {
        Self {
            exit_code,
            ..Default::default()
        }
    }

    /// A successful output with the given stdout.
    pub fn stdout(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Whether the command exited with 0.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs shell commands in a given directory.
///
/// Implementations must be thread-safe; one runner is shared by the
/// interactive thread and the background dispatcher.
pub trait CommandRunner: Send + Sync + std::fmt::Debug {
    /// Run `command` with `cwd` as the child's working directory and wait
    /// for it to finish.
    fn run(&self, command: &str, cwd: &Path) -> Result<CommandOutput, ScmError>;
}

/// Runs commands through `sh -c` (or `cmd /C` on Windows).
#[derive(Debug, Clone, Default)]
pub struct ShellRunner {
    timeout: Option<Duration>,
}

impl ShellRunner {
    /// A runner without a timeout.
    pub fn new() -> Self {
        Self::default()
    }

    /// A runner that kills commands running longer than `timeout`.
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    /// The configured timeout.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl CommandRunner for ShellRunner {
    fn run(&self, command: &str, cwd: &Path) -> Result<CommandOutput, ScmError> {
        let started = Instant::now();

        let mut cmd = shell(command);
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let mut child = cmd
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ScmError::Spawn {
                command: command.to_string(),
                source,
            })?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = match wait(&mut child, self.timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                let timeout = self.timeout.unwrap_or_default();
                reap(&mut child);
                warn!(command, cwd = %cwd.display(), ?timeout, "command timed out and was killed");
                // The readers are left detached: a grandchild may still hold
                // the pipes open.
                return Err(ScmError::Timeout {
                    command: command.to_string(),
                    timeout,
                });
            }
            Err(source) => {
                reap(&mut child);
                return Err(ScmError::Io {
                    command: command.to_string(),
                    source,
                });
            }
        };

        let io_err = |source| ScmError::Io {
            command: command.to_string(),
            source,
        };
        let stdout = collect(stdout).map_err(io_err)?;
        let stderr = collect(stderr).map_err(io_err)?;
        let exit_code = status.code().unwrap_or(-1);

        debug!(
            command,
            cwd = %cwd.display(),
            exit_code,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "command finished"
        );
        trace!(stdout_len = stdout.len(), stderr_len = stderr.len());

        Ok(CommandOutput {
            exit_code,
            stdout,
            stderr,
        })
    }
}

/// Emit a value as a single shell word.
///
/// Values made only of `[A-Za-z0-9._/@:+=-]` (and not starting with `-`)
/// are emitted bare, so `shell_word("origin")` is `origin`. Anything else
/// goes through [`shell_quote`].
pub fn shell_word(value: &str) -> String {
    let bare = !value.is_empty()
        && !value.starts_with('-')
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "._/@:+=-".contains(c));
    if bare {
        value.to_string()
    } else {
        shell_quote(value)
    }
}

/// Quote a value for a POSIX shell command line.
///
/// The value is wrapped in single quotes; embedded single quotes become
/// `'\''`. Values without single quotes are simply wrapped, so
/// `shell_quote("a b.txt")` is `'a b.txt'`.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[cfg(not(windows))]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

/// Wait for `child`; `Ok(None)` means the timeout expired first.
fn wait(child: &mut Child, timeout: Option<Duration>) -> io::Result<Option<ExitStatus>> {
    let Some(timeout) = timeout else {
        return child.wait().map(Some);
    };

    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if started.elapsed() >= timeout {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Kill the child's process group and reap the child.
///
/// Failures are ignored: the processes may already have exited.
fn reap(child: &mut Child) {
    if let Err(err) = kill_process_group(child.id()) {
        debug!(pid = child.id(), error = %err, "failed to kill process group");
    }
    let _ = child.kill();
    let _ = child.wait();
}

/// Send SIGKILL to the process group led by `pgid`.
#[cfg(unix)]
fn kill_process_group(pgid: u32) -> io::Result<()> {
    let pgid = libc::pid_t::try_from(pgid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
    // SAFETY: killpg only sends a signal; an invalid group yields ESRCH.
    if unsafe { libc::killpg(pgid, libc::SIGKILL) } == -1 {
        let err = io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            return Err(err);
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn kill_process_group(_pgid: u32) -> io::Result<()> {
    Ok(())
}

type Reader = Option<JoinHandle<io::Result<Vec<u8>>>>;

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Reader {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            pipe.read_to_end(&mut buf)?;
            Ok(buf)
        })
    })
}

fn collect(reader: Reader) -> io::Result<String> {
    let Some(handle) = reader else {
        return Ok(String::new());
    };
    let bytes = handle
        .join()
        .map_err(|_| io::Error::other("output reader thread panicked"))??;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn returns_exit_code() {
        let temp = TempDir::new().unwrap();
        let output = ShellRunner::new().run("exit 3", temp.path()).unwrap();
        assert_eq!(output.exit_code, 3);
        assert!(!output.success());
    }

    #[test]
    fn captures_stdout_and_stderr() {
        let temp = TempDir::new().unwrap();
        let output = ShellRunner::new()
            .run("printf 'hello'; printf 'oops' >&2", temp.path())
            .unwrap();
        assert!(output.success());
        assert_eq!(output.stdout, "hello");
        assert_eq!(output.stderr, "oops");
    }

    #[test]
    fn runs_in_given_directory() {
        let temp = TempDir::new().unwrap();
        let output = ShellRunner::new().run("pwd -P", temp.path()).unwrap();
        let expected = std::fs::canonicalize(temp.path()).unwrap();
        assert_eq!(output.stdout.trim_end(), expected.to_str().unwrap());
    }

    #[test]
    fn process_directory_untouched_on_failure() {
        let before = std::env::current_dir().unwrap();
        let temp = TempDir::new().unwrap();

        let output = ShellRunner::new().run("exit 1", temp.path()).unwrap();

        assert_eq!(output.exit_code, 1);
        assert_eq!(std::env::current_dir().unwrap(), before);
    }

    #[test]
    fn missing_directory_is_spawn_error() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("gone");
        let err = ShellRunner::new().run("true", &missing).unwrap_err();
        assert!(matches!(err, ScmError::Spawn { .. }));
    }

    #[test]
    fn timeout_kills_command() {
        let temp = TempDir::new().unwrap();
        let runner = ShellRunner::with_timeout(Some(Duration::from_millis(100)));

        let started = Instant::now();
        let err = runner.run("exec sleep 5", temp.path()).unwrap_err();

        assert!(err.is_timeout());
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn timeout_kills_whole_process_group() {
        let temp = TempDir::new().unwrap();
        let runner = ShellRunner::with_timeout(Some(Duration::from_millis(200)));

        let err = runner
            .run("(sleep 1; touch finished); true", temp.path())
            .unwrap_err();
        assert!(err.is_timeout());

        thread::sleep(Duration::from_millis(1500));
        assert!(!temp.path().join("finished").exists());
    }

    #[test]
    fn fast_command_beats_timeout() {
        let temp = TempDir::new().unwrap();
        let runner = ShellRunner::with_timeout(Some(Duration::from_secs(10)));
        let output = runner.run("echo ok", temp.path()).unwrap();
        assert_eq!(output.stdout, "ok\n");
    }

    #[test]
    fn large_output_does_not_stall() {
        let temp = TempDir::new().unwrap();
        let runner = ShellRunner::with_timeout(Some(Duration::from_secs(30)));
        let output = runner
            .run("head -c 200000 /dev/zero | tr '\\0' 'a'", temp.path())
            .unwrap();
        assert_eq!(output.stdout.len(), 200_000);
    }

    #[test]
    fn quote_plain_value() {
        assert_eq!(shell_quote("foo.txt"), "'foo.txt'");
        assert_eq!(shell_quote("a b"), "'a b'");
    }

    #[test]
    fn word_plain_values_stay_bare() {
        assert_eq!(shell_word("origin"), "origin");
        assert_eq!(shell_word("feature/x-1.2"), "feature/x-1.2");
        assert_eq!(shell_word("/usr/bin/git"), "/usr/bin/git");
    }

    #[test]
    fn word_quotes_shell_syntax() {
        assert_eq!(
            shell_word("origin;touch${IFS}x;true"),
            "'origin;touch${IFS}x;true'"
        );
        assert_eq!(shell_word("$(id)"), "'$(id)'");
        assert_eq!(shell_word("-x"), "'-x'");
        assert_eq!(shell_word(""), "''");
    }

    #[test]
    fn quote_embedded_single_quote() {
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }

    #[test]
    fn quoted_value_survives_shell() {
        let temp = TempDir::new().unwrap();
        let value = "it's $HOME `x` \"y\"";
        let command = format!("printf '%s' {}", shell_quote(value));
        let output = ShellRunner::new().run(&command, temp.path()).unwrap();
        assert_eq!(output.stdout, value);
    }
}
