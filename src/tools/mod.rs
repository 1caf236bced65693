//! Typed invocation of external programs
//!
//! Editors, converters, the package manager, git and the TeX toolchain are
//! all driven through [`ToolCommand`] values handed to a [`ToolRunner`].
//! Each command carries the [`Stage`] it belongs to so a failure says which
//! step of a pipeline broke.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::debug;

use crate::error::{Result, SnakeError};

/// Pipeline stage an external command belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Editor,
    Viewer,
    Convert,
    Merge,
    VenvCreate,
    PackageInstall,
    PackageFreeze,
    VcsInit,
    VcsRemote,
    VcsAdd,
    VcsCommit,
    VcsClone,
    Typeset,
    Bibliography,
    CodeExec,
    Script,
    Notify,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Editor => "editor",
            Stage::Viewer => "viewer",
            Stage::Convert => "convert",
            Stage::Merge => "merge",
            Stage::VenvCreate => "venv-create",
            Stage::PackageInstall => "package-install",
            Stage::PackageFreeze => "package-freeze",
            Stage::VcsInit => "vcs-init",
            Stage::VcsRemote => "vcs-remote",
            Stage::VcsAdd => "vcs-add",
            Stage::VcsCommit => "vcs-commit",
            Stage::VcsClone => "vcs-clone",
            Stage::Typeset => "typeset",
            Stage::Bibliography => "bibliography",
            Stage::CodeExec => "code-exec",
            Stage::Script => "script",
            Stage::Notify => "notify",
        };
        write!(f, "{}", name)
    }
}

/// One external program invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub stage: Stage,
    pub program: OsString,
    pub args: Vec<OsString>,
    pub cwd: Option<PathBuf>,
    /// Capture stdout/stderr instead of inheriting the terminal
    pub capture: bool,
}

impl ToolCommand {
    pub fn new(stage: Stage, program: impl Into<OsString>) -> Self {
        Self {
            stage,
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            capture: false,
        }
    }

    /// Build from a configured argv (program followed by fixed arguments)
    pub fn from_argv(stage: Stage, argv: &[String]) -> Result<Self> {
        let (program, rest) = argv
            .split_first()
            .ok_or_else(|| SnakeError::Config(format!("No command configured for stage {}", stage)))?;
        Ok(Self::new(stage, program).args(rest))
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn capture(mut self) -> Self {
        self.capture = true;
        self
    }

    pub fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }

    /// Failure of this command, for runners to report
    pub fn failure(&self, detail: impl Into<String>) -> SnakeError {
        SnakeError::ExternalTool {
            stage: self.stage,
            program: self.program_name(),
            detail: detail.into(),
        }
    }
}

impl std::fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Output of a completed command (empty unless captured)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Executes external commands on behalf of the core
pub trait ToolRunner {
    /// Run to completion; non-zero exit is an `ExternalTool` error
    fn run(&self, cmd: &ToolCommand) -> Result<ToolOutput>;

    /// Start without waiting for the program to finish
    fn spawn(&self, cmd: &ToolCommand) -> Result<()>;
}

/// Runner backed by real processes
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    fn command(&self, cmd: &ToolCommand) -> Result<Command> {
        let program = which::which(&cmd.program)
            .map_err(|e| cmd.failure(format!("program not found: {}", e)))?;
        let mut command = Command::new(program);
        command.args(&cmd.args);
        if let Some(dir) = &cmd.cwd {
            command.current_dir(dir);
        }
        Ok(command)
    }
}

impl ToolRunner for SystemRunner {
    fn run(&self, cmd: &ToolCommand) -> Result<ToolOutput> {
        debug!(stage = %cmd.stage, command = %cmd, "running");
        let mut command = self.command(cmd)?;

        if cmd.capture {
            let output = command
                .output()
                .map_err(|e| cmd.failure(e.to_string()))?;
            let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            if !output.status.success() {
                return Err(cmd.failure(format!("{}: {}", output.status, stderr.trim())));
            }
            return Ok(ToolOutput { stdout, stderr });
        }

        let status = command.status().map_err(|e| cmd.failure(e.to_string()))?;
        if !status.success() {
            return Err(cmd.failure(status.to_string()));
        }
        Ok(ToolOutput::default())
    }

    fn spawn(&self, cmd: &ToolCommand) -> Result<()> {
        debug!(stage = %cmd.stage, command = %cmd, "spawning");
        self.command(cmd)?
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| cmd.failure(e.to_string()))?;
        Ok(())
    }
}

/// Relative form of `path` under `base`, for commands run inside `base`
pub fn relative_to(path: &Path, base: &Path) -> PathBuf {
    path.strip_prefix(base)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_argv_splits_program() {
        let argv = vec!["emacs".to_string(), "--no-splash".to_string()];
        let cmd = ToolCommand::from_argv(Stage::Editor, &argv)
            .unwrap()
            .arg("README.md");
        assert_eq!(cmd.program, OsString::from("emacs"));
        assert_eq!(cmd.args, vec![OsString::from("--no-splash"), OsString::from("README.md")]);
        assert_eq!(cmd.to_string(), "emacs --no-splash README.md");
    }

    #[test]
    fn test_empty_argv_is_config_error() {
        let err = ToolCommand::from_argv(Stage::Merge, &[]).unwrap_err();
        assert!(err.to_string().contains("merge"));
    }

    #[test]
    fn test_missing_program_names_stage() {
        let cmd = ToolCommand::new(Stage::Convert, "psnake-no-such-program-xyz");
        let err = SystemRunner.run(&cmd).unwrap_err();
        assert_eq!(err.failed_stage(), Some(Stage::Convert));
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_is_failure() {
        let cmd = ToolCommand::new(Stage::Script, "false");
        let err = SystemRunner.run(&cmd).unwrap_err();
        assert!(matches!(err, SnakeError::ExternalTool { stage: Stage::Script, .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_capture_stdout() {
        let cmd = ToolCommand::new(Stage::Script, "echo").arg("hello").capture();
        let out = SystemRunner.run(&cmd).unwrap();
        assert_eq!(out.stdout.trim(), "hello");
    }

    #[test]
    fn test_relative_to() {
        let rel = relative_to(Path::new("/w/p/src/a.py"), Path::new("/w/p"));
        assert_eq!(rel, PathBuf::from("src/a.py"));
    }
}
