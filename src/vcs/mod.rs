//! Version control collaborator.
//!
//! The workflow only needs three operations from a version control system:
//! resolving a reference to a revision, removing untracked files, and
//! restoring the working tree to a revision.

mod git;

use async_trait::async_trait;

use crate::error::VcsError;

pub use git::GitCli;

/// Operations the workflow performs on the working tree.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Resolves a reference to a revision identifier.
    async fn resolve(&self, reference: &str) -> Result<String, VcsError>;

    /// Removes untracked and ignored files from the working tree.
    async fn clean(&self) -> Result<(), VcsError>;

    /// Restores index and working tree to `revision`.
    async fn restore(&self, revision: &str) -> Result<(), VcsError>;

    /// Gets the backend name.
    fn backend_name(&self) -> &'static str;
}

#[async_trait]
impl VersionControl for Box<dyn VersionControl> {
    async fn resolve(&self, reference: &str) -> Result<String, VcsError> {
        (**self).resolve(reference).await
    }

    async fn clean(&self) -> Result<(), VcsError> {
        (**self).clean().await
    }

    async fn restore(&self, revision: &str) -> Result<(), VcsError> {
        (**self).restore(revision).await
    }

    fn backend_name(&self) -> &'static str {
        (**self).backend_name()
    }
}
