//! Workflow rendering two revisions and diffing their resources.
//!
//! This module sequences the pieces of a run: resolve both revisions, then
//! for base and head clean and restore the working tree, render it and parse
//! the output, and finally diff the two collections. The tree is left at the
//! head revision.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::config::ToolConfig;
use crate::diff::{DiffEngine, Summary};
use crate::error::{ManifestDiffError, Result, Side, Stage, WorkflowError};
use crate::exec::{CancellationToken, CommandTemplate, LineExecutor};
use crate::manifest::{ManifestParser, ResourceCollection};
use crate::vcs::VersionControl;

/// Reference resolved for the head snapshot.
pub const HEAD_REFERENCE: &str = "HEAD";

/// Orchestrates a base/head diff run.
pub struct Workflow<'a, V: VersionControl> {
    /// Version control backend.
    vcs: &'a V,
    /// Remote holding the base branch.
    remote: String,
    /// Render command.
    render: CommandTemplate,
    /// Directory the render command runs in.
    render_dir: Option<PathBuf>,
    /// Executor for render commands.
    executor: LineExecutor,
    /// Manifest parser.
    parser: ManifestParser,
    /// Diff engine.
    engine: DiffEngine,
}

/// What was diffed and what came out of it.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowReport {
    /// The base snapshot.
    pub base: SnapshotReport,
    /// The head snapshot.
    pub head: SnapshotReport,
    /// Classification of the two snapshots.
    pub summary: Summary,
    /// When the diff completed.
    pub generated_at: DateTime<Utc>,
}

/// Provenance of one snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotReport {
    /// Which snapshot this is.
    pub side: Side,
    /// Branch name the snapshot was requested for.
    pub reference: String,
    /// Resolved revision.
    pub revision: String,
    /// Documents seen in the rendered output.
    pub documents: usize,
    /// Documents skipped because they did not decode.
    pub skipped: usize,
}

/// A resolved snapshot waiting to be rendered.
struct Target {
    side: Side,
    reference: String,
    revision: String,
}

impl<'a, V: VersionControl> Workflow<'a, V> {
    /// Creates a workflow from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured kind registry cannot be built.
    pub fn new(vcs: &'a V, config: &ToolConfig) -> Result<Self> {
        Ok(Self {
            vcs,
            remote: config.vcs.remote.clone(),
            render: config.render.template(),
            render_dir: None,
            executor: config.render.executor(),
            parser: config.registry.parser()?,
            engine: config.diff.engine(),
        })
    }

    /// Runs the render command inside `dir`.
    #[must_use]
    pub fn with_render_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.render_dir = Some(dir.into());
        self
    }

    /// Aborts render commands when `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.executor = self.executor.with_cancellation(token);
        self
    }

    /// Diffs the resources rendered at `base_ref` against those rendered at `head_ref`.
    ///
    /// The base branch is looked up on the configured remote; the head
    /// snapshot is the checked-out `HEAD`.
    ///
    /// # Errors
    ///
    /// Returns a [`WorkflowError`] naming the stage and snapshot that failed.
    pub async fn run(&self, base_ref: &str, head_ref: &str) -> Result<WorkflowReport> {
        info!(
            "Diffing {}/{base_ref} against {HEAD_REFERENCE} ({head_ref}) using {}",
            self.remote,
            self.vcs.backend_name()
        );

        let base = self
            .resolve(Side::Base, base_ref, &format!("{}/{base_ref}", self.remote))
            .await?;
        let head = self.resolve(Side::Head, head_ref, HEAD_REFERENCE).await?;

        let (base_resources, base_report) = self.snapshot(base).await?;
        let (head_resources, head_report) = self.snapshot(head).await?;

        let summary = self
            .engine
            .compute(&base_resources, &head_resources)
            .map_err(|e| WorkflowError::new(Stage::Diff, None, e))?;

        info!("Diff complete: {summary}");
        Ok(WorkflowReport {
            base: base_report,
            head: head_report,
            summary,
            generated_at: Utc::now(),
        })
    }

    async fn resolve(&self, side: Side, name: &str, reference: &str) -> Result<Target> {
        let revision = self
            .vcs
            .resolve(reference)
            .await
            .map_err(|e| WorkflowError::new(Stage::Resolve, Some(side), e))?;

        Ok(Target {
            side,
            reference: name.to_string(),
            revision,
        })
    }

    /// Checks out, renders and parses one snapshot.
    async fn snapshot(&self, target: Target) -> Result<(ResourceCollection, SnapshotReport)> {
        let side = target.side;
        info!("Rendering {side} at {}", target.revision);

        self.checkout(&target.revision)
            .await
            .map_err(|e| WorkflowError::new(Stage::Checkout, Some(side), e))?;

        let output = self
            .render_output(side)
            .await
            .map_err(|e| WorkflowError::new(Stage::Render, Some(side), e))?;

        let report = self
            .parser
            .parse_report(&output)
            .map_err(|e| WorkflowError::new(Stage::Parse, Some(side), e))?;

        Ok((
            report.resources,
            SnapshotReport {
                side,
                reference: target.reference,
                revision: target.revision,
                documents: report.documents,
                skipped: report.skipped,
            },
        ))
    }

    async fn checkout(&self, revision: &str) -> std::result::Result<(), ManifestDiffError> {
        self.vcs.clean().await?;
        self.vcs.restore(revision).await?;
        Ok(())
    }

    async fn render_output(&self, side: Side) -> std::result::Result<String, ManifestDiffError> {
        let mut invocation = self.render.invocation();
        if let Some(dir) = &self.render_dir {
            invocation = invocation.current_dir(dir.clone());
        }

        let mut output = String::new();
        self.executor
            .run(&invocation, |line| {
                debug!("render {side}: {line}");
                output.push_str(line);
                output.push('\n');
            })
            .await?;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ExecError, VcsError};
    use crate::vcs::MockVersionControl;
    use mockall::Sequence;
    use mockall::predicate::eq;

    const RENDER_SCRIPT: &str = r#"
if [ -f rev ] && [ "$(cat rev)" = "base" ]; then
  cat <<'EOF'
apiVersion: v1
kind: ConfigMap
metadata: {name: settings, namespace: shop}
data: {mode: slow}
---
apiVersion: v1
kind: Service
metadata: {name: legacy, namespace: shop}
EOF
else
  cat <<'EOF'
apiVersion: v1
kind: ConfigMap
metadata: {name: settings, namespace: shop}
data: {mode: fast}
---
apiVersion: apps/v1
kind: Deployment
metadata: {name: web, namespace: shop}
---
this is not a resource
EOF
fi
"#;

    /// Config whose render command is `sh render.sh` inside `dir`.
    fn config(dir: &std::path::Path) -> ToolConfig {
        std::fs::write(dir.join("render.sh"), RENDER_SCRIPT).unwrap();
        let mut config = ToolConfig::default();
        config.render.program = String::from("sh");
        config.render.args = vec![String::from("render.sh")];
        config
    }

    /// Mock that records the restored revision in `dir/rev`.
    fn checkout_mock(dir: &std::path::Path) -> MockVersionControl {
        let mut vcs = MockVersionControl::new();
        vcs.expect_backend_name().return_const("mock");
        vcs.expect_resolve()
            .with(eq("origin/main"))
            .returning(|_| Ok(String::from("base")));
        vcs.expect_resolve()
            .with(eq("HEAD"))
            .returning(|_| Ok(String::from("head")));
        vcs.expect_clean().times(2).returning(|| Ok(()));

        let rev = dir.join("rev");
        vcs.expect_restore().times(2).returning(move |revision| {
            std::fs::write(&rev, revision).unwrap();
            Ok(())
        });
        vcs
    }

    #[tokio::test]
    async fn test_full_run() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let vcs = checkout_mock(dir.path());

        let workflow = Workflow::new(&vcs, &config).unwrap().with_render_dir(dir.path());
        let report = workflow.run("main", "feature").await.unwrap();

        let summary = &report.summary;
        assert_eq!(summary.added.len(), 1);
        assert_eq!(summary.added[0].name(), "web");
        assert_eq!(summary.removed.len(), 1);
        assert_eq!(summary.removed[0].name(), "legacy");
        assert_eq!(summary.modified.len(), 1);
        assert_eq!(summary.modified[0].before.name(), "settings");

        assert_eq!(report.base.revision, "base");
        assert_eq!(report.base.reference, "main");
        assert_eq!(report.head.revision, "head");
        assert_eq!(report.head.reference, "feature");
        assert_eq!(report.head.documents, 3);
        assert_eq!(report.head.skipped, 1);

        // Tree is left at head
        assert_eq!(std::fs::read_to_string(dir.path().join("rev")).unwrap(), "head");
    }

    #[tokio::test]
    async fn test_base_checked_out_before_head() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());

        let mut seq = Sequence::new();
        let mut vcs = MockVersionControl::new();
        vcs.expect_backend_name().return_const("mock");
        vcs.expect_resolve()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(String::from("base")));
        vcs.expect_resolve()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(String::from("head")));
        vcs.expect_clean().times(1).in_sequence(&mut seq).returning(|| Ok(()));
        vcs.expect_restore()
            .with(eq("base"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        vcs.expect_clean().times(1).in_sequence(&mut seq).returning(|| Ok(()));
        vcs.expect_restore()
            .with(eq("head"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let workflow = Workflow::new(&vcs, &config).unwrap().with_render_dir(dir.path());
        assert!(workflow.run("main", "feature").await.is_ok());
    }

    #[tokio::test]
    async fn test_resolve_failure_is_tagged() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());

        let mut vcs = MockVersionControl::new();
        vcs.expect_backend_name().return_const("mock");
        vcs.expect_resolve().returning(|reference| {
            Err(VcsError::UnresolvedReference {
                reference: reference.to_string(),
            })
        });
        vcs.expect_clean().never();
        vcs.expect_restore().never();

        let workflow = Workflow::new(&vcs, &config).unwrap();
        let err = workflow.run("gone", "feature").await.unwrap_err();

        match err {
            ManifestDiffError::Workflow(WorkflowError { stage, side, .. }) => {
                assert_eq!(stage, Stage::Resolve);
                assert_eq!(side, Some(Side::Base));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_render_failure_is_tagged() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.render.args = vec![String::from("-c"), String::from("echo partial; exit 3")];
        let vcs = {
            let mut vcs = MockVersionControl::new();
            vcs.expect_backend_name().return_const("mock");
            vcs.expect_resolve().returning(|_| Ok(String::from("rev")));
            vcs.expect_clean().times(1).returning(|| Ok(()));
            vcs.expect_restore().times(1).returning(|_| Ok(()));
            vcs
        };

        let workflow = Workflow::new(&vcs, &config).unwrap().with_render_dir(dir.path());
        let err = workflow.run("main", "feature").await.unwrap_err();

        match err {
            ManifestDiffError::Workflow(WorkflowError { stage, side, source }) => {
                assert_eq!(stage, Stage::Render);
                assert_eq!(side, Some(Side::Base));
                assert!(matches!(
                    *source,
                    ManifestDiffError::Exec(ExecError::Execution { code: Some(3), .. })
                ));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_parse_failure_is_tagged() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.render.args = vec![String::from("-c"), String::from("printf 'a: [\\n'")];
        let mut vcs = MockVersionControl::new();
        vcs.expect_backend_name().return_const("mock");
        vcs.expect_resolve().returning(|_| Ok(String::from("rev")));
        vcs.expect_clean().times(1).returning(|| Ok(()));
        vcs.expect_restore().times(1).returning(|_| Ok(()));

        let workflow = Workflow::new(&vcs, &config).unwrap().with_render_dir(dir.path());
        let err = workflow.run("main", "feature").await.unwrap_err();

        assert!(matches!(
            err,
            ManifestDiffError::Workflow(WorkflowError {
                stage: Stage::Parse,
                side: Some(Side::Base),
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_checkout_failure_is_tagged() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());

        let mut vcs = MockVersionControl::new();
        vcs.expect_backend_name().return_const("mock");
        vcs.expect_resolve().returning(|_| Ok(String::from("rev")));
        vcs.expect_clean().returning(|| Ok(()));
        vcs.expect_restore().returning(|_| {
            Err(VcsError::CommandFailed {
                operation: String::from("restore"),
                source: ExecError::Execution {
                    command: String::from("git restore"),
                    code: Some(1),
                },
            })
        });

        let workflow = Workflow::new(&vcs, &config).unwrap();
        let err = workflow.run("main", "feature").await.unwrap_err();

        assert!(err.to_string().starts_with("checkout stage failed for base"));
    }
}
