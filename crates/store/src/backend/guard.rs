//! Deadline, retry and rate-limit decorator.
//!
//! Remote stores hang, throttle and drop connections. This module wraps any
//! store so that every call has a deadline, idempotent reads are retried with
//! exponential back-off, and the number of in-flight requests is bounded.

use crate::error::{ErrorKind, Result};
use crate::{Page, RawEntry, RemoteStore, StoreHandle};
use async_trait::async_trait;
use exn::ResultExt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Generous default for concurrent remote requests.
const DEFAULT_CONCURRENT_REQUESTS: usize = 8;

/// How long and how often to try a remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Deadline for a single attempt.
    pub timeout: Duration,
    /// Additional attempts for idempotent reads. Creations and moves are
    /// never retried.
    pub retries: u32,
    /// Delay before the first retry; doubled for each following one.
    pub backoff: Duration,
}
impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            retries: 3,
            backoff: Duration::from_millis(250),
        }
    }
}
impl RetryPolicy {
    fn delay(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Store decorator adding deadlines, retries and a request limit.
///
/// Only [`list_children`](RemoteStore::list_children),
/// [`get_entry`](RemoteStore::get_entry) and
/// [`find_folders_by_name`](RemoteStore::find_folders_by_name) are retried,
/// and only for [retryable](ErrorKind::is_retryable) failures. A deadline
/// that elapses is reported as
/// [`RemoteUnavailable`](ErrorKind::RemoteUnavailable).
#[derive(Clone)]
pub struct GuardedStore {
    inner: StoreHandle,
    policy: RetryPolicy,
    rate_limiter: Arc<Semaphore>,
}
impl GuardedStore {
    pub fn new(inner: StoreHandle, policy: RetryPolicy) -> Self {
        Self {
            inner,
            policy,
            rate_limiter: Arc::new(Semaphore::new(DEFAULT_CONCURRENT_REQUESTS)),
        }
    }

    /// Change the maximum number of concurrent requests (minimum of one).
    pub fn with_concurrency(mut self, limit: usize) -> Self {
        self.rate_limiter = Arc::new(Semaphore::new(limit.max(1)));
        self
    }

    async fn attempt<T, Fut>(&self, operation: &'static str, call: Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        let _permit = self
            .rate_limiter
            .acquire()
            .await
            .or_raise(|| ErrorKind::BackendError("request limiter closed".to_string()))?;
        match tokio::time::timeout(self.policy.timeout, call).await {
            Ok(result) => result,
            Err(elapsed) => Err(elapsed).or_raise(|| {
                ErrorKind::RemoteUnavailable(format!("{operation} timed out after {:?}", self.policy.timeout))
            }),
        }
    }

    async fn retrying<T, F, Fut>(&self, operation: &'static str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match self.attempt(operation, call()).await {
                Err(e) if e.is_retryable() && attempt < self.policy.retries => {
                    let delay = self.policy.delay(attempt);
                    tracing::debug!(store = self.inner.name(), operation, attempt, ?delay, error = ?e, "Retrying remote call");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                },
                result => return result,
            }
        }
    }
}

#[async_trait]
impl RemoteStore for GuardedStore {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn list_children(&self, folder_id: &str, page_token: Option<&str>) -> Result<Page> {
        self.retrying("list_children", || self.inner.list_children(folder_id, page_token)).await
    }

    async fn get_entry(&self, entry_id: &str) -> Result<RawEntry> {
        self.retrying("get_entry", || self.inner.get_entry(entry_id)).await
    }

    async fn find_folders_by_name(&self, name: &str) -> Result<Vec<RawEntry>> {
        self.retrying("find_folders_by_name", || self.inner.find_folders_by_name(name)).await
    }

    async fn create_folder(&self, name: &str, parent_id: &str) -> Result<String> {
        self.attempt("create_folder", self.inner.create_folder(name, parent_id)).await
    }

    async fn move_entry(&self, entry_id: &str, from_parent_id: &str, to_parent_id: &str) -> Result<()> {
        self.attempt("move_entry", self.inner.move_entry(entry_id, from_parent_id, to_parent_id)).await
    }
}
