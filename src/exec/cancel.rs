//! Cancellation primitives for external command runs.
//!
//! A [`CancellationSource`] is held by whoever may abort a run; the
//! [`CancellationToken`]s it hands out are cheap to clone and can be awaited
//! by the executor alongside the running process.

use tokio::sync::watch;

/// Reason a run was cancelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancellationReason {
    /// User-initiated cancellation (e.g. Ctrl-C).
    UserCancel,
}

/// Controller that can trigger cancellation of every token it issued.
#[derive(Debug)]
pub struct CancellationSource {
    sender: watch::Sender<Option<CancellationReason>>,
}

/// Cloneable handle observed by cancellable operations.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    receiver: Option<watch::Receiver<Option<CancellationReason>>>,
}

impl CancellationSource {
    /// Creates a new, not yet cancelled, source.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self { sender }
    }

    /// Issues a token bound to this source.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        CancellationToken {
            receiver: Some(self.sender.subscribe()),
        }
    }

    /// Cancels all tokens issued by this source.
    ///
    /// Cancelling twice keeps the most recent reason.
    pub fn cancel(&self, reason: CancellationReason) {
        self.sender.send_replace(Some(reason));
    }

    /// Returns true once [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.sender.borrow().is_some()
    }
}

impl Default for CancellationSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationToken {
    /// Creates a token that is never cancelled.
    #[must_use]
    pub const fn none() -> Self {
        Self { receiver: None }
    }

    /// Checks if cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.receiver
            .as_ref()
            .is_some_and(|receiver| receiver.borrow().is_some())
    }

    /// Completes once cancellation is requested.
    ///
    /// Never completes for [`CancellationToken::none`] or when the source is
    /// dropped without cancelling.
    pub async fn cancelled(&self) -> CancellationReason {
        let Some(receiver) = &self.receiver else {
            return std::future::pending().await;
        };

        let mut receiver = receiver.clone();
        loop {
            if let Some(reason) = receiver.borrow_and_update().clone() {
                return reason;
            }
            if receiver.changed().await.is_err() {
                return std::future::pending().await;
            }
        }
    }
}
