//! Call context handed to every transformation function.

use tokio_util::sync::CancellationToken;

/// Cancellation-capable context threaded through a transform call.
///
/// The engine never checks it between steps. Long-running functions may poll
/// [`Context::is_cancelled`] and bail out with their own error.
#[derive(Debug, Clone, Default)]
pub struct Context {
    token: CancellationToken,
}

impl Context {
    /// A context that is never cancelled unless [`Context::cancel`] is called.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_cancellation(token: CancellationToken) -> Self {
        Self { token }
    }

    /// A child context, cancelled whenever this one is.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.token
    }
}
