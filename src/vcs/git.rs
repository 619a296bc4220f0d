//! Git command line backend.

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::config::VcsConfig;
use crate::error::{ExecError, VcsError};
use crate::exec::{Invocation, LineExecutor};

use super::VersionControl;

/// Version control through the `git` executable.
#[derive(Debug, Clone)]
pub struct GitCli {
    /// Program to run.
    program: String,
    /// Remote holding base branches.
    remote: String,
    /// Whether `clean` removes anything.
    clean: bool,
    /// Repository directory; the process working directory when unset.
    work_dir: Option<PathBuf>,
    /// Executor used for every command.
    executor: LineExecutor,
}

impl GitCli {
    /// Creates a backend from configuration.
    #[must_use]
    pub fn new(config: &VcsConfig) -> Self {
        Self {
            program: config.program.clone(),
            remote: config.remote.clone(),
            clean: config.clean,
            work_dir: None,
            executor: LineExecutor::new(),
        }
    }

    /// Runs commands inside `dir`.
    #[must_use]
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    /// Runs commands through `executor`.
    #[must_use]
    pub fn with_executor(mut self, executor: LineExecutor) -> Self {
        self.executor = executor;
        self
    }

    /// Returns the remote-tracking reference for a base branch.
    #[must_use]
    pub fn base_reference(&self, branch: &str) -> String {
        format!("{}/{}", self.remote, branch)
    }

    fn invocation<I, S>(&self, args: I) -> Invocation
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let invocation = Invocation::new(self.program.clone()).args(args);
        match &self.work_dir {
            Some(dir) => invocation.current_dir(dir.clone()),
            None => invocation,
        }
    }

    fn clean_invocation(&self) -> Invocation {
        self.invocation(["clean", "-xdf"])
    }

    fn restore_invocation(&self, revision: &str) -> Invocation {
        self.invocation(["restore", "-SW", "--source", revision, "."])
    }

    fn resolve_invocation(&self, reference: &str) -> Invocation {
        self.invocation([
            String::from("rev-parse"),
            String::from("--verify"),
            String::from("--quiet"),
            format!("{reference}^{{commit}}"),
        ])
    }

    async fn run_logged(&self, operation: &str, invocation: &Invocation) -> Result<(), VcsError> {
        debug!("Running {operation}: {invocation}");
        self.executor
            .run(invocation, |line| debug!("{operation}: {line}"))
            .await
            .map_err(|source| VcsError::CommandFailed {
                operation: operation.to_string(),
                source,
            })
    }
}

#[async_trait]
impl VersionControl for GitCli {
    async fn resolve(&self, reference: &str) -> Result<String, VcsError> {
        let invocation = self.resolve_invocation(reference);
        debug!("Resolving {reference}: {invocation}");

        let output = match self.executor.run_collect(&invocation).await {
            Ok(output) => output,
            Err(ExecError::Execution { .. }) => {
                return Err(VcsError::UnresolvedReference {
                    reference: reference.to_string(),
                });
            }
            Err(source) => {
                return Err(VcsError::CommandFailed {
                    operation: String::from("resolve"),
                    source,
                });
            }
        };

        // stderr is merged in, so warnings may surround the object id
        let revision = output
            .lines()
            .map(str::trim)
            .rfind(|line| is_object_id(line))
            .ok_or_else(|| VcsError::UnresolvedReference {
                reference: reference.to_string(),
            })?;

        info!("Resolved {reference} to {revision}");
        Ok(revision.to_string())
    }

    async fn clean(&self) -> Result<(), VcsError> {
        if !self.clean {
            debug!("Skipping clean, disabled in configuration");
            return Ok(());
        }
        self.run_logged("clean", &self.clean_invocation()).await
    }

    async fn restore(&self, revision: &str) -> Result<(), VcsError> {
        info!("Restoring working tree to {revision}");
        self.run_logged("restore", &self.restore_invocation(revision))
            .await
    }

    fn backend_name(&self) -> &'static str {
        "git"
    }
}

/// Returns true for a full SHA-1 or SHA-256 hex object name.
fn is_object_id(line: &str) -> bool {
    matches!(line.len(), 40 | 64) && line.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn git() -> GitCli {
        GitCli::new(&VcsConfig::default())
    }

    /// Runs `sh <subcommand> ...` so a script named after the subcommand
    /// stands in for git.
    fn fake_git(dir: &std::path::Path, subcommand: &str, script: &str) -> GitCli {
        std::fs::write(dir.join(subcommand), script).unwrap();
        let config = VcsConfig {
            program: String::from("sh"),
            ..VcsConfig::default()
        };
        GitCli::new(&config).with_work_dir(dir)
    }

    #[test]
    fn test_invocations() {
        let git = git().with_work_dir("/repo");

        assert_eq!(git.clean_invocation().to_string(), "git clean -xdf");
        assert_eq!(
            git.restore_invocation("abc123").to_string(),
            "git restore -SW --source abc123 ."
        );
        assert_eq!(
            git.resolve_invocation("origin/main").arguments(),
            ["rev-parse", "--verify", "--quiet", "origin/main^{commit}"]
        );
    }

    #[test]
    fn test_base_reference() {
        let config = VcsConfig {
            remote: String::from("upstream"),
            ..VcsConfig::default()
        };
        assert_eq!(GitCli::new(&config).base_reference("main"), "upstream/main");
        assert_eq!(git().backend_name(), "git");
    }

    #[tokio::test]
    async fn test_clean_disabled_runs_nothing() {
        let config = VcsConfig {
            program: String::from("/nonexistent/git"),
            clean: false,
            ..VcsConfig::default()
        };
        assert!(GitCli::new(&config).clean().await.is_ok());
    }

    #[tokio::test]
    async fn test_launch_failure_is_command_failure() {
        let config = VcsConfig {
            program: String::from("/nonexistent/git"),
            ..VcsConfig::default()
        };
        let err = GitCli::new(&config).restore("abc123").await.unwrap_err();
        assert!(matches!(
            err,
            VcsError::CommandFailed {
                ref operation,
                source: ExecError::Launch { .. },
            } if operation == "restore"
        ));
    }

    const REVISION: &str = "0123456789abcdef0123456789abcdef01234567";

    #[tokio::test]
    async fn test_resolve_reads_revision() {
        let dir = tempfile::tempdir().unwrap();
        let git = fake_git(dir.path(), "rev-parse", &format!("echo {REVISION}"));

        assert_eq!(git.resolve("HEAD").await.unwrap(), REVISION);
    }

    #[tokio::test]
    async fn test_resolve_ignores_stderr_warnings() {
        let dir = tempfile::tempdir().unwrap();
        let script = format!(
            "echo 'warning: refname is ambiguous.' >&2\necho {REVISION}\n\
             sleep 0.1\necho 'warning: refname is ambiguous.' >&2\n"
        );
        let git = fake_git(dir.path(), "rev-parse", &script);

        assert_eq!(git.resolve("main").await.unwrap(), REVISION);
    }

    #[tokio::test]
    async fn test_resolve_without_object_id() {
        let dir = tempfile::tempdir().unwrap();
        let git = fake_git(dir.path(), "rev-parse", "echo 'warning: nothing useful'");

        let err = git.resolve("main").await.unwrap_err();
        assert!(matches!(err, VcsError::UnresolvedReference { .. }));
    }

    #[test]
    fn test_object_id_shapes() {
        assert!(is_object_id(REVISION));
        assert!(is_object_id(&"a".repeat(64)));
        assert!(!is_object_id("0123456"));
        assert!(!is_object_id("warning: refname 'main' is ambiguous."));
        assert!(!is_object_id(&"g".repeat(40)));
    }

    #[tokio::test]
    async fn test_resolve_unknown_reference() {
        let dir = tempfile::tempdir().unwrap();
        let git = fake_git(dir.path(), "rev-parse", "exit 1");

        let err = git.resolve("origin/missing").await.unwrap_err();
        assert!(matches!(
            err,
            VcsError::UnresolvedReference { ref reference } if reference == "origin/missing"
        ));
    }

    #[tokio::test]
    async fn test_restore_passes_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let git = fake_git(dir.path(), "restore", "echo \"$@\" > args.log");

        git.restore("abc123").await.unwrap();
        let recorded = std::fs::read_to_string(dir.path().join("args.log")).unwrap();
        assert_eq!(recorded.trim(), "-SW --source abc123 .");
    }

    #[tokio::test]
    async fn test_clean_failure() {
        let dir = tempfile::tempdir().unwrap();
        let git = fake_git(dir.path(), "clean", "echo 'fatal: not a repository' >&2; exit 128");

        let err = git.clean().await.unwrap_err();
        assert!(matches!(
            err,
            VcsError::CommandFailed { source: ExecError::Execution { code: Some(128), .. }, .. }
        ));
    }
}
