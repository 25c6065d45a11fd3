//! scm::git
//!
//! Engine implementation for the git command-line tool.
//!
//! # Commands
//!
//! Every operation is one shell command run at the project root. The
//! command strings are the contract with git and are kept stable:
//!
//! | operation | command |
//! |-----------|---------|
//! | add | `git add '<path>'` |
//! | del | `git rm '<path>'` |
//! | move | `git mv '<src>' '<dest>'` |
//! | status | `git status` |
//! | status_get | `git status --porcelain` |
//! | file_status | `git status --porcelain '<path>'` |
//! | diff | `git diff` |
//! | commit | `git commit -m '<message>'` |
//! | push / pull / stash | `git push` / `git pull` / `git stash` |
//! | remote_add | `git remote add origin '<url>'` then `git push --set-upstream origin master` |
//! | credentials_set | `git config user.name '<name>'`, `git config user.email '<email>'` |
//! | remote_name_get | `git config --get user.name` |
//! | remote_email_get | `git config --get user.email` |
//! | remote_url_get | `git remote get-url origin` |
//!
//! User-supplied values go through [`shell_quote`]. The binary, remote
//! name and upstream branch go through [`shell_word`]: plain names stay
//! bare and anything with shell syntax in it is quoted.
//!
//! # Cached reads
//!
//! The user name, user email and remote URL are read once per engine and
//! never re-read, even if the git configuration changes afterwards. Open a
//! new session to pick up changes.

use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing::{debug, info};

use super::factory::EngineKind;
use super::porcelain::{parse_file_status, parse_status};
use super::runner::{shell_quote, shell_word, CommandRunner, ShellRunner};
use super::traits::{Engine, ScmError};
use crate::core::config::Config;
use crate::core::types::{ChangeKind, Status};

/// Settings that shape the git command lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitSettings {
    /// Binary placed at the start of every command
    pub binary: String,
    /// Remote created by `remote_add`
    pub remote: String,
    /// Branch pushed with `--set-upstream` after `remote_add`
    pub upstream_branch: String,
}

impl Default for GitSettings {
    fn default() -> Self {
        Self {
            binary: "git".to_string(),
            remote: "origin".to_string(),
            upstream_branch: "master".to_string(),
        }
    }
}

impl GitSettings {
    /// Settings with precedence already applied by `config`.
    pub fn from_config(config: &Config) -> Self {
        Self {
            binary: config
                .binary()
                .unwrap_or(EngineKind::Git.name())
                .to_string(),
            remote: config.remote().to_string(),
            upstream_branch: config.upstream_branch().to_string(),
        }
    }
}

/// The git engine.
///
/// Generic over the runner so tests can record command lines instead of
/// spawning processes.
#[derive(Debug)]
pub struct GitEngine<R: CommandRunner = ShellRunner> {
    root: PathBuf,
    runner: R,
    settings: GitSettings,
    user_name: OnceCell<String>,
    user_email: OnceCell<String>,
    remote_url: OnceCell<String>,
}

impl GitEngine<ShellRunner> {
    /// Create a git engine for `root` using the shell runner and the
    /// configured timeout.
    pub fn from_config(root: impl Into<PathBuf>, config: &Config) -> Self {
        Self::new(
            root,
            ShellRunner::with_timeout(config.command_timeout()),
            GitSettings::from_config(config),
        )
    }
}

impl<R: CommandRunner> GitEngine<R> {
    /// Create a git engine with an explicit runner.
    pub fn new(root: impl Into<PathBuf>, runner: R, settings: GitSettings) -> Self {
        Self {
            root: root.into(),
            runner,
            settings,
            user_name: OnceCell::new(),
            user_email: OnceCell::new(),
            remote_url: OnceCell::new(),
        }
    }

    /// The command-line settings.
    pub fn settings(&self) -> &GitSettings {
        &self.settings
    }

    /// The runner executing commands.
    pub fn runner(&self) -> &R {
        &self.runner
    }

    fn git(&self, args: &str) -> String {
        format!("{} {}", shell_word(&self.settings.binary), args)
    }

    /// Read a value once; later calls return the first result.
    ///
    /// Failures to run the command are not cached.
    fn cached_read(&self, cell: &OnceCell<String>, args: &str) -> Result<String, ScmError> {
        cell.get_or_try_init(|| -> Result<String, ScmError> {
            let value = self.exec_response(&self.git(args))?;
            Ok(value.trim_end().to_string())
        })
        .cloned()
    }
}

impl<R: CommandRunner> Engine for GitEngine<R> {
    fn kind(&self) -> EngineKind {
        EngineKind::Git
    }

    fn root(&self) -> &Path {
        &self.root
    }

    fn exec(&self, command: &str) -> Result<i32, ScmError> {
        Ok(self.runner.run(command, &self.root)?.exit_code)
    }

    fn exec_response(&self, command: &str) -> Result<String, ScmError> {
        Ok(self.runner.run(command, &self.root)?.stdout)
    }

    fn file_add(&self, path: &str) -> Result<i32, ScmError> {
        self.exec(&self.git(&format!("add {}", shell_quote(path))))
    }

    fn file_del(&self, path: &str) -> Result<i32, ScmError> {
        self.exec(&self.git(&format!("rm {}", shell_quote(path))))
    }

    fn file_move(&self, source: &str, dest: &str) -> Result<i32, ScmError> {
        self.exec(&self.git(&format!(
            "mv {} {}",
            shell_quote(source),
            shell_quote(dest)
        )))
    }

    fn status(&self) -> Result<i32, ScmError> {
        self.exec(&self.git("status"))
    }

    fn status_get(&self) -> Result<Vec<Status>, ScmError> {
        let output = self.exec_response(&self.git("status --porcelain"))?;
        let statuses = parse_status(&output);
        debug!(count = statuses.len(), "parsed repository status");
        Ok(statuses)
    }

    fn file_status(&self, path: &str) -> Result<ChangeKind, ScmError> {
        let output =
            self.exec_response(&self.git(&format!("status --porcelain {}", shell_quote(path))))?;
        Ok(parse_file_status(&output))
    }

    fn diff(&self) -> Result<String, ScmError> {
        self.exec_response(&self.git("diff"))
    }

    fn commit(&self, message: &str) -> Result<i32, ScmError> {
        self.exec(&self.git(&format!("commit -m {}", shell_quote(message))))
    }

    fn push(&self) -> Result<i32, ScmError> {
        self.exec(&self.git("push"))
    }

    fn pull(&self) -> Result<i32, ScmError> {
        self.exec(&self.git("pull"))
    }

    fn stash(&self) -> Result<i32, ScmError> {
        self.exec(&self.git("stash"))
    }

    fn remote_add(&self, url: &str) -> Result<i32, ScmError> {
        let remote = &self.settings.remote;
        let code = self.exec(&self.git(&format!(
            "remote add {} {}",
            shell_word(remote),
            shell_quote(url)
        )))?;

        if code != 0 {
            info!(remote = %remote, code, "remote add failed, skipping upstream push");
            return Ok(code);
        }

        self.exec(&self.git(&format!(
            "push --set-upstream {} {}",
            shell_word(remote),
            shell_word(&self.settings.upstream_branch)
        )))
    }

    fn credentials_set(&self, name: &str, email: &str) -> Result<i32, ScmError> {
        self.exec(&self.git(&format!("config user.name {}", shell_quote(name))))?;
        self.exec(&self.git(&format!("config user.email {}", shell_quote(email))))
    }

    fn remote_name_get(&self) -> Result<String, ScmError> {
        self.cached_read(&self.user_name, "config --get user.name")
    }

    fn remote_email_get(&self) -> Result<String, ScmError> {
        self.cached_read(&self.user_email, "config --get user.email")
    }

    fn remote_url_get(&self) -> Result<String, ScmError> {
        let args = format!("remote get-url {}", shell_word(&self.settings.remote));
        self.cached_read(&self.remote_url, &args)
    }
}

/// Create a new repository in `dir` (`git init .`).
pub fn init_repository(
    runner: &dyn CommandRunner,
    settings: &GitSettings,
    dir: &Path,
) -> Result<i32, ScmError> {
    let command = format!("{} init .", shell_word(&settings.binary));
    Ok(runner.run(&command, dir)?.exit_code)
}

/// Clone `url` into `dest`, running from `cwd`
/// (`git clone '<url>' '<dest>'`).
pub fn clone_repository(
    runner: &dyn CommandRunner,
    settings: &GitSettings,
    url: &str,
    dest: &str,
    cwd: &Path,
) -> Result<i32, ScmError> {
    let command = format!(
        "{} clone {} {}",
        shell_word(&settings.binary),
        shell_quote(url),
        shell_quote(dest)
    );
    Ok(runner.run(&command, cwd)?.exit_code)
}
