//! Month cache for events-only month views
//!
//! Keyed by `owner|YYYY-MM|visibility`. Entries live for a fixed TTL and are
//! dropped explicitly whenever an event in that month changes.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::time::interval;
use tracing::debug;
use uuid::Uuid;

use crate::models::{CalendarEvent, Visibility};

pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct CacheEntry {
    events: Vec<CalendarEvent>,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Hit/miss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Process-wide cache of month views
pub struct MonthCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MonthCache {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn key(owner: Uuid, year: i32, month: u32, visibility: Visibility) -> String {
        format!("{}|{:04}-{:02}|{}", owner, year, month, visibility)
    }

    /// Cached events for one visibility, `None` on a miss
    ///
    /// An expired entry counts as a miss and is removed.
    pub fn get(&self, owner: Uuid, year: i32, month: u32, visibility: Visibility) -> Option<Vec<CalendarEvent>> {
        let key = Self::key(owner, year, month, visibility);
        let now = Instant::now();

        if let Some(entry) = self.entries.get(&key) {
            if !entry.is_expired(now) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("Month cache hit: {}", key);
                return Some(entry.events.clone());
            }
        }

        self.entries.remove_if(&key, |_, entry| entry.is_expired(now));
        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!("Month cache miss: {}", key);
        None
    }

    pub fn put(&self, owner: Uuid, year: i32, month: u32, visibility: Visibility, events: Vec<CalendarEvent>) {
        let entry = CacheEntry {
            events,
            expires_at: Instant::now() + self.ttl,
        };
        self.entries.insert(Self::key(owner, year, month, visibility), entry);
    }

    pub fn invalidate(&self, owner: Uuid, year: i32, month: u32, visibility: Visibility) {
        self.entries.remove(&Self::key(owner, year, month, visibility));
    }

    /// Drop every visibility of one owner's month
    pub fn invalidate_month(&self, owner: Uuid, year: i32, month: u32) {
        for visibility in Visibility::ALL {
            self.invalidate(owner, year, month, visibility);
        }
        debug!("Invalidated month cache for {} {:04}-{:02}", owner, year, month);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove expired entries; returns how many were dropped
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    /// Start a background task that purges expired entries once per TTL
    pub fn start_purge_task(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = interval(self.ttl.max(Duration::from_secs(1)));
            loop {
                interval.tick().await;
                let purged = self.purge_expired();
                if purged > 0 {
                    debug!("Purged {} expired month cache entries", purged);
                }
            }
        })
    }
}

impl Default for MonthCache {
    fn default() -> Self {
        Self::new()
    }
}
