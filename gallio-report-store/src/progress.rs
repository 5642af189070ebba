// Copyright (c) The gallio-rs Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cooperative progress reporting and cancellation.
//!
//! Report I/O is synchronous; cancellation is checked at file boundaries
//! only, never mid-file.

use crate::errors::OperationCanceled;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Receives progress notifications from long-running report operations and
/// supplies cooperative cancellation.
pub trait ProgressMonitor {
    /// Called once when the operation begins, with a description and the
    /// total units of work.
    fn begin_task(&mut self, description: &str, total_work: u64);

    /// Updates the status message, typically the path being processed.
    fn set_status(&mut self, status: &str);

    /// Reports that the given number of work units completed.
    fn worked(&mut self, amount: u64);

    /// Returns true if the operation should stop.
    fn is_canceled(&self) -> bool;

    /// Returns an error if the operation should stop.
    fn check_canceled(&self) -> Result<(), OperationCanceled> {
        if self.is_canceled() {
            Err(OperationCanceled)
        } else {
            Ok(())
        }
    }
}

/// A progress monitor that discards notifications and never cancels.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullProgressMonitor;

impl ProgressMonitor for NullProgressMonitor {
    fn begin_task(&mut self, _description: &str, _total_work: u64) {}

    fn set_status(&mut self, _status: &str) {}

    fn worked(&mut self, _amount: u64) {}

    fn is_canceled(&self) -> bool {
        false
    }
}

/// A shared flag used to request cancellation from another thread.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    canceled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates a token in the not-canceled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::Relaxed);
    }

    /// Returns true if cancellation has been requested.
    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::Relaxed)
    }
}

/// A progress monitor driven by a [`CancellationToken`], discarding
/// progress notifications.
#[derive(Clone, Debug)]
pub struct CancelableProgressMonitor {
    token: CancellationToken,
}

impl CancelableProgressMonitor {
    /// Creates a monitor observing the given token.
    pub fn new(token: CancellationToken) -> Self {
        Self { token }
    }
}

impl ProgressMonitor for CancelableProgressMonitor {
    fn begin_task(&mut self, _description: &str, _total_work: u64) {}

    fn set_status(&mut self, _status: &str) {}

    fn worked(&mut self, _amount: u64) {}

    fn is_canceled(&self) -> bool {
        self.token.is_canceled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canceled_token_propagates_through_check() {
        let token = CancellationToken::new();
        let monitor = CancelableProgressMonitor::new(token.clone());

        assert!(monitor.check_canceled().is_ok());
        token.cancel();
        assert!(monitor.check_canceled().is_err());
    }
}
