use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;
use tracing::{error, info};

use crate::cf::snapshot::Snapshot;
use crate::errors::RecommendError;
use crate::store::PurchaseHistoryStore;

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(3600);

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Holds the current snapshot and rebuilds it lazily once it is older than the
/// refresh interval.
///
/// At most one refresh runs at a time. Callers that find the snapshot stale
/// while another refresh is running wait for it and then use its result. When
/// that refresh failed they get the previous snapshot, or the same error if
/// there is none, without fetching again.
/// Published snapshots are shared as `Arc`s, so scoring against an older
/// snapshot continues undisturbed while a new one is swapped in.
pub struct MatrixCache {
    store: Arc<dyn PurchaseHistoryStore>,
    clock: Arc<dyn Clock>,
    refresh_interval: Duration,
    current: RwLock<Option<Arc<Snapshot>>>,
    qty_refresh_attempts: AtomicU64,
    // held while refreshing, remembers how the last attempt failed
    last_failure: Mutex<Option<RecommendError>>,
}

impl MatrixCache {
    pub fn new(store: Arc<dyn PurchaseHistoryStore>, refresh_interval: Duration) -> Self {
        Self::with_clock(store, refresh_interval, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<dyn PurchaseHistoryStore>,
        refresh_interval: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        MatrixCache {
            store,
            clock,
            refresh_interval,
            current: RwLock::new(None),
            qty_refresh_attempts: AtomicU64::new(0),
            last_failure: Mutex::new(None),
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    /// The published snapshot, without checking its age.
    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn ensure_fresh(&self) -> Result<Arc<Snapshot>, RecommendError> {
        if let Some(snapshot) = self.fresh_snapshot() {
            return Ok(snapshot);
        }

        let attempts_seen = self.qty_refresh_attempts.load(Ordering::SeqCst);
        let mut last_failure = self
            .last_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // a refresh may have completed while we were waiting for the guard
        if let Some(snapshot) = self.fresh_snapshot() {
            return Ok(snapshot);
        }
        if self.qty_refresh_attempts.load(Ordering::SeqCst) != attempts_seen {
            if let Some(snapshot) = self.current() {
                return Ok(snapshot);
            }
            if let Some(failure) = last_failure.as_ref() {
                return Err(failure.duplicate());
            }
        }

        let refreshed = self.refresh();
        self.qty_refresh_attempts.fetch_add(1, Ordering::SeqCst);
        *last_failure = refreshed.as_ref().err().map(RecommendError::duplicate);
        refreshed
    }

    fn fresh_snapshot(&self) -> Option<Arc<Snapshot>> {
        let snapshot = self.current()?;
        let age = self.clock.now().signed_duration_since(snapshot.built_at);
        match age.to_std() {
            Ok(age) if age > self.refresh_interval => None,
            // negative ages happen when the clock moves backwards
            _ => Some(snapshot),
        }
    }

    fn refresh(&self) -> Result<Arc<Snapshot>, RecommendError> {
        info!(
            refresh_interval_secs = self.refresh_interval.as_secs(),
            "refreshing purchase matrices"
        );
        let facts = self.store.fetch_purchase_facts().map_err(|err| {
            error!(error = %err, "fetching purchase history failed, keeping previous matrices");
            err
        })?;
        let snapshot = match Snapshot::build(&facts, self.clock.now()) {
            Ok(snapshot) => Arc::new(snapshot),
            Err(err) => {
                error!(error = %err, "invalid purchase history, keeping previous matrices");
                return Err(err);
            }
        };

        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(snapshot.clone());
        info!(built_at = %snapshot.built_at, "matrices updated successfully");
        Ok(snapshot)
    }
}

#[cfg(test)]
pub(crate) struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

#[cfg(test)]
impl ManualClock {
    pub(crate) fn new() -> Self {
        ManualClock {
            now: Mutex::new(Utc::now()),
        }
    }

    pub(crate) fn advance_secs(&self, secs: i64) {
        let mut now = self.now.lock().unwrap();
        *now = *now + chrono::Duration::seconds(secs);
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}
