//! Connection sources with injected failures.

use digireg_storage::{ConnectionSource, StorageError, StorageResult};
use parking_lot::Mutex;
use rusqlite::Connection;
use std::sync::Arc;

/// Wraps a source and fails a configured number of connection attempts.
#[derive(Debug)]
pub struct FlakySource<S> {
    inner: S,
    state: Mutex<FlakyState>,
}

#[derive(Debug, Default)]
struct FlakyState {
    remaining_failures: u32,
    permanent: bool,
    attempts: u32,
}

impl<S: ConnectionSource> FlakySource<S> {
    /// Fails the first `failures` attempts with a retryable error.
    pub fn new(inner: S, failures: u32) -> Self {
        Self {
            inner,
            state: Mutex::new(FlakyState {
                remaining_failures: failures,
                ..FlakyState::default()
            }),
        }
    }

    /// Fails every attempt with a non-retryable error.
    pub fn broken(inner: S) -> Self {
        Self {
            inner,
            state: Mutex::new(FlakyState {
                permanent: true,
                ..FlakyState::default()
            }),
        }
    }

    /// Number of connection attempts seen so far.
    pub fn attempts(&self) -> u32 {
        self.state.lock().attempts
    }

    /// Wraps the source for sharing.
    pub fn shared(self) -> Arc<Self>
    where
        S: 'static,
    {
        Arc::new(self)
    }
}

impl<S: ConnectionSource> ConnectionSource for FlakySource<S> {
    fn connect(&self) -> StorageResult<Connection> {
        {
            let mut state = self.state.lock();
            state.attempts += 1;
            if state.permanent {
                return Err(StorageError::InvalidPath("injected permanent failure".into()));
            }
            if state.remaining_failures > 0 {
                state.remaining_failures -= 1;
                return Err(StorageError::Unavailable("injected failure".into()));
            }
        }
        self.inner.connect()
    }

    fn describe(&self) -> String {
        format!("flaky({})", self.inner.describe())
    }
}
