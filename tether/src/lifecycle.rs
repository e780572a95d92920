//! Ordered release of everything the client acquires.
//!
//! ```rust
//! use tether::ResourceStack;
//!
//! # async fn run() {
//! let mut resources = ResourceStack::new();
//! resources.push("scratch dir", || Box::pin(async { Ok::<(), tether::ClientError>(()) }));
//! let report = resources.release_all().await;
//! assert_eq!(report.released, vec!["scratch dir".to_string()]);
//! # }
//! ```

use std::future::Future;
use std::panic::{AssertUnwindSafe, resume_unwind};

use futures_util::FutureExt;
use tcommon::BoxFuture;

use crate::ClientError;

type Cleanup = Box<dyn FnOnce() -> BoxFuture<'static, Result<(), ClientError>> + Send>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseReport {
    pub released: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl ReleaseReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Resources released last-in first-out. Release failures and panics are logged, never raised.
#[derive(Default)]
pub struct ResourceStack {
    entries: Vec<(String, Cleanup)>,
}

impl std::fmt::Debug for ResourceStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceStack")
            .field(
                "entries",
                &self.entries.iter().map(|(name, _)| name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl ResourceStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<F>(&mut self, name: impl Into<String>, cleanup: F)
    where
        F: FnOnce() -> BoxFuture<'static, Result<(), ClientError>> + Send + 'static,
    {
        let name = name.into();
        tracing::debug!(resource = %name, "resource acquired");
        self.entries.push((name, Box::new(cleanup)));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub async fn release_all(&mut self) -> ReleaseReport {
        let mut report = ReleaseReport::default();

        while let Some((name, cleanup)) = self.entries.pop() {
            let released = AssertUnwindSafe(async move { cleanup().await })
                .catch_unwind()
                .await;

            match released {
                Ok(Ok(())) => {
                    tracing::debug!(resource = %name, "resource released");
                    report.released.push(name);
                }
                Ok(Err(error)) => {
                    tracing::warn!(resource = %name, error = %error, "resource release failed");
                    report.failed.push((name, error.to_string()));
                }
                Err(_) => {
                    tracing::warn!(resource = %name, "resource release panicked");
                    report.failed.push((name, "release panicked".to_string()));
                }
            }
        }

        report
    }

    /// Runs `body`, then releases every resource whether `body` returned or panicked.
    /// A panic from `body` resumes once cleanup has finished.
    pub async fn scoped<T, F>(&mut self, body: F) -> T
    where
        F: Future<Output = T>,
    {
        let outcome = AssertUnwindSafe(body).catch_unwind().await;
        self.finish(outcome).await
    }

    /// Releases every resource, then yields `outcome` or resumes its panic.
    pub async fn finish<T>(&mut self, outcome: std::thread::Result<T>) -> T {
        let report = self.release_all().await;
        if !report.is_clean() {
            tracing::warn!(failed = report.failed.len(), "shutdown finished with release failures");
        }

        match outcome {
            Ok(value) => value,
            Err(panic) => resume_unwind(panic),
        }
    }
}

impl Drop for ResourceStack {
    fn drop(&mut self) {
        if !self.entries.is_empty() {
            tracing::warn!(
                remaining = self.entries.len(),
                "resource stack dropped without release"
            );
        }
    }
}
