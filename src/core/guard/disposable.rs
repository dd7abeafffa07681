/*!
 * Disposable Wrapper
 *
 * Attach a cleanup action to a value that has no Drop of its own
 */

use super::traits::Guard;
use super::{GuardError, GuardMetadata, GuardResult};
use crate::core::sync::Trigger;
use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::trace;

type DisposeAction<T> = Box<dyn Fn(&T) + Send + Sync>;

/// Wraps a value and runs a cleanup action on it exactly once
///
/// The action runs on the first [`dispose`](Self::dispose) from any thread,
/// or on drop if nobody disposed explicitly.
pub struct DisposableWrapper<T> {
    instance: T,
    action: DisposeAction<T>,
    armed: Trigger,
    disposed: AtomicBool,
    metadata: GuardMetadata,
}

impl<T> DisposableWrapper<T> {
    pub fn new<F>(instance: T, action: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        Self {
            instance,
            action: Box::new(action),
            armed: Trigger::new(true),
            disposed: AtomicBool::new(false),
            metadata: GuardMetadata::new("disposable"),
        }
    }

    /// Run the cleanup action if it has not run yet
    ///
    /// Returns true for the one caller that ran it.
    pub fn dispose(&self) -> bool {
        if !self.armed.try_fire() {
            return false;
        }

        (self.action)(&self.instance);
        self.disposed.store(true, Ordering::Release);
        trace!(
            lifetime_us = self.metadata.lifetime_micros(),
            "disposable wrapper disposed"
        );
        true
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

impl<T> Deref for DisposableWrapper<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.instance
    }
}

impl<T: Send> Guard for DisposableWrapper<T> {
    fn resource_type(&self) -> &'static str {
        "disposable"
    }

    fn metadata(&self) -> &GuardMetadata {
        &self.metadata
    }

    fn is_active(&self) -> bool {
        !self.is_disposed()
    }

    fn release(&mut self) -> GuardResult<()> {
        if self.dispose() {
            Ok(())
        } else {
            Err(GuardError::AlreadyReleased)
        }
    }
}

impl<T> Drop for DisposableWrapper<T> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<T: fmt::Debug> fmt::Debug for DisposableWrapper<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisposableWrapper")
            .field("instance", &self.instance)
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}
