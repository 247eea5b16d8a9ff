// src/stream/cancel.rs

//! Cancellation tokens, token groups and delayed values.

use crate::core::ChshError;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// A clonable, one-way cancellation flag.
///
/// All clones observe the same flag. Once cancelled a token stays cancelled.
#[derive(Debug, Clone)]
pub struct CancelToken {
    flag: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (flag, _) = watch::channel(false);
        Self { flag: Arc::new(flag) }
    }

    /// Sets the flag and wakes every task waiting in [`CancelToken::cancelled`].
    pub fn cancel(&self) {
        self.flag.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.flag.borrow()
    }

    /// Resolves once the token is cancelled. Returns immediately if it already is.
    pub async fn cancelled(&self) {
        let mut rx = self.flag.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Collects tokens so they can all be cancelled at once.
#[derive(Debug, Default)]
pub struct CancelGroup {
    tokens: Mutex<Vec<CancelToken>>,
}

impl CancelGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, token: CancelToken) {
        self.tokens.lock().push(token);
    }

    /// Creates a fresh token that belongs to this group.
    pub fn token(&self) -> CancelToken {
        let token = CancelToken::new();
        self.add(token.clone());
        token
    }

    /// Cancels every collected token and forgets them. Returns how many there were.
    pub fn cancel_all(&self) -> usize {
        let tokens = std::mem::take(&mut *self.tokens.lock());
        for token in &tokens {
            token.cancel();
        }
        tokens.len()
    }

    pub fn len(&self) -> usize {
        self.tokens.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Yields `value` after `delay`.
pub async fn delayed<T>(value: T, delay: Duration) -> T {
    tokio::time::sleep(delay).await;
    value
}

/// Fails with `error` after `delay`.
pub async fn delayed_err<T>(error: ChshError, delay: Duration) -> Result<T, ChshError> {
    tokio::time::sleep(delay).await;
    Err(error)
}
