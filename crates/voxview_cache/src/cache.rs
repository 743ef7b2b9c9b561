//! Deduplicating, insertion-ordered slice cache.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::{Rc, Weak};

use futures::future::{FutureExt, LocalBoxFuture, Shared};
use web_time::Instant;

use crate::decode::decode_slice;
use crate::error::{CacheError, Result};
use crate::handle::SliceHandle;
use crate::image::ImageHandle;
use crate::source::SliceSource;

/// Default number of retained entries.
pub const DEFAULT_MAX_SIZE: usize = 50;

type SharedFetch = Shared<LocalBoxFuture<'static, Result<SliceHandle>>>;

struct Entry {
    handle: SliceHandle,
    /// Number of consumers that acquired this entry and have not released it
    leases: usize,
}

struct InFlight {
    fetch: SharedFetch,
    /// Leases to hand over to the entry once the fetch succeeds
    leases: usize,
}

/// Counters for cache activity, mostly useful for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered by a ready entry
    pub hits: u64,
    /// Lookups that started a new fetch
    pub misses: u64,
    /// Lookups that joined a fetch already in flight
    pub joined: u64,
    /// Entries dropped to make room for newer ones
    pub evictions: u64,
    /// Fetches that settled with an error
    pub failures: u64,
}

struct CacheState {
    max_size: usize,
    entries: HashMap<String, Entry>,
    /// Insertion order, front = oldest
    order: VecDeque<String>,
    in_flight: HashMap<String, InFlight>,
    stats: CacheStats,
}

impl CacheState {
    fn new(max_size: usize) -> Self {
        Self {
            max_size: max_size.max(1),
            entries: HashMap::new(),
            order: VecDeque::new(),
            in_flight: HashMap::new(),
            stats: CacheStats::default(),
        }
    }

    /// Evict oldest entries until there is room for one more.
    fn make_room(&mut self) {
        self.shrink_to(self.max_size - 1);
    }

    fn shrink_to(&mut self, len: usize) {
        while self.entries.len() > len {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            if let Some(entry) = self.entries.remove(&oldest) {
                entry.handle.invalidate();
                self.stats.evictions += 1;
                log::debug!(
                    "Evicted {} (leases: {}, remaining: {})",
                    oldest,
                    entry.leases,
                    self.entries.len()
                );
            }
        }
    }

    fn insert(&mut self, key: &str, handle: SliceHandle, leases: usize) {
        if self.remove(key) {
            log::warn!("Replaced existing cache entry for {}", key);
        }
        self.make_room();
        self.entries.insert(key.to_string(), Entry { handle, leases });
        self.order.push_back(key.to_string());
    }

    /// Remove an entry and invalidate its handle.
    fn remove(&mut self, key: &str) -> bool {
        match self.entries.remove(key) {
            Some(entry) => {
                entry.handle.invalidate();
                self.order.retain(|k| k != key);
                true
            }
            None => false,
        }
    }
}

struct Inner<S> {
    source: Rc<S>,
    state: RefCell<CacheState>,
}

impl<S> Inner<S> {
    /// Store the outcome of a fetch and retire its in-flight record.
    ///
    /// Runs synchronously, so eviction and insertion happen in one step that
    /// no other lookup can observe half-done.
    fn settle(&self, key: &str, result: Result<ImageHandle>, started: Instant) -> Result<SliceHandle> {
        let mut state = self.state.borrow_mut();
        let leases = state.in_flight.remove(key).map_or(0, |flight| flight.leases);

        match result {
            Ok(image) => {
                let handle = SliceHandle::new(key.to_string(), image);
                state.insert(key, handle.clone(), leases);
                log::debug!(
                    "Cached {} in {:.1}ms (cache size: {})",
                    key,
                    started.elapsed().as_secs_f64() * 1000.0,
                    state.entries.len()
                );
                Ok(handle)
            }
            Err(err) => {
                state.stats.failures += 1;
                log::error!("Error fetching image: {}", err);
                Err(err)
            }
        }
    }
}

enum Lookup {
    Ready(SliceHandle),
    Pending(SharedFetch),
}

impl Lookup {
    async fn resolve(self) -> Result<SliceHandle> {
        match self {
            Lookup::Ready(handle) => Ok(handle),
            Lookup::Pending(fetch) => fetch.await,
        }
    }
}

/// Bounded cache of decoded slice images keyed by request URL.
///
/// - A ready entry is returned immediately.
/// - Concurrent lookups of a key that is being fetched share that fetch.
/// - Failed fetches are reported to every waiter and never cached.
/// - When full, the oldest *inserted* entry is evicted. Hits do not refresh
///   an entry's position.
///
/// Cloning is cheap and yields another reference to the same cache.
pub struct SliceCache<S> {
    inner: Rc<Inner<S>>,
}

impl<S> Clone for SliceCache<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<S: SliceSource> SliceCache<S> {
    /// Create a cache retaining at most `max_size` entries (at least one).
    pub fn new(source: S, max_size: usize) -> Self {
        Self {
            inner: Rc::new(Inner {
                source: Rc::new(source),
                state: RefCell::new(CacheState::new(max_size)),
            }),
        }
    }

    /// Get the handle for `key`, fetching it if needed, and take a lease on it.
    ///
    /// Every successful `acquire` must be paired with a [`SliceCache::release`].
    pub async fn acquire(&self, key: &str) -> Result<SliceHandle> {
        self.lookup(key, true).resolve().await
    }

    /// Like [`SliceCache::acquire`] but without taking a lease.
    ///
    /// Used for speculative loads that nobody displays yet.
    pub async fn materialize(&self, key: &str) -> Result<SliceHandle> {
        self.lookup(key, false).resolve().await
    }

    fn lookup(&self, key: &str, lease: bool) -> Lookup {
        let mut state = self.inner.state.borrow_mut();

        if let Some(entry) = state.entries.get_mut(key) {
            if lease {
                entry.leases += 1;
            }
            let handle = entry.handle.clone();
            state.stats.hits += 1;
            return Lookup::Ready(handle);
        }

        if let Some(flight) = state.in_flight.get_mut(key) {
            if lease {
                flight.leases += 1;
            }
            let fetch = flight.fetch.clone();
            state.stats.joined += 1;
            log::trace!("Joined in-flight fetch for {}", key);
            return Lookup::Pending(fetch);
        }

        state.stats.misses += 1;
        let fetch = self.start_fetch(key.to_string());
        state.in_flight.insert(
            key.to_string(),
            InFlight {
                fetch: fetch.clone(),
                leases: usize::from(lease),
            },
        );
        Lookup::Pending(fetch)
    }

    fn start_fetch(&self, key: String) -> SharedFetch {
        let cache: Weak<Inner<S>> = Rc::downgrade(&self.inner);
        let source = Rc::clone(&self.inner.source);

        async move {
            let started = Instant::now();
            let result = match source.fetch(&key).await {
                Ok(bytes) => decode_slice(&bytes).map_err(|source| CacheError::Decode {
                    key: key.clone(),
                    source,
                }),
                Err(source) => Err(CacheError::Fetch {
                    key: key.clone(),
                    source,
                }),
            };

            match cache.upgrade() {
                Some(inner) => inner.settle(&key, result, started),
                // Cache torn down while fetching; hand the pixels out uncached.
                None => result.map(|image| SliceHandle::new(key, image)),
            }
        }
        .boxed_local()
        .shared()
    }

    /// Drop one lease on `key`. The entry is removed and its handle invalidated
    /// once no lease remains.
    pub fn release(&self, key: &str) {
        let mut state = self.inner.state.borrow_mut();
        let Some(entry) = state.entries.get_mut(key) else {
            log::debug!("Release of uncached key {}", key);
            return;
        };

        entry.leases = entry.leases.saturating_sub(1);
        if entry.leases == 0 {
            state.remove(key);
            log::debug!("Released {} (cache size: {})", key, state.entries.len());
        }
    }

    /// Invalidate every retained handle and empty the cache.
    ///
    /// Fetches still in flight are left alone; they insert when they settle.
    pub fn clear(&self) {
        let mut state = self.inner.state.borrow_mut();
        let count = state.entries.len();
        for (_, entry) in state.entries.drain() {
            entry.handle.invalidate();
        }
        state.order.clear();
        if count > 0 {
            log::info!("Cleared slice cache ({} entries)", count);
        }
    }

    /// Change the budget, evicting the oldest entries if it shrank.
    pub fn set_max_size(&self, max_size: usize) {
        let mut state = self.inner.state.borrow_mut();
        state.max_size = max_size.max(1);
        let max = state.max_size;
        state.shrink_to(max);
    }

    pub fn max_size(&self) -> usize {
        self.inner.state.borrow().max_size
    }

    /// Number of ready entries.
    pub fn len(&self) -> usize {
        self.inner.state.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.state.borrow().entries.is_empty()
    }

    /// Whether a ready entry exists for `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.inner.state.borrow().entries.contains_key(key)
    }

    /// Whether a fetch for `key` is currently pending.
    pub fn is_in_flight(&self, key: &str) -> bool {
        self.inner.state.borrow().in_flight.contains_key(key)
    }

    /// Outstanding leases on a ready entry.
    pub fn leases(&self, key: &str) -> Option<usize> {
        self.inner.state.borrow().entries.get(key).map(|entry| entry.leases)
    }

    /// Ready handle for `key` without touching leases or stats.
    pub fn peek(&self, key: &str) -> Option<SliceHandle> {
        self.inner
            .state
            .borrow()
            .entries
            .get(key)
            .map(|entry| entry.handle.clone())
    }

    /// Keys of ready entries, oldest first.
    pub fn keys(&self) -> Vec<String> {
        self.inner.state.borrow().order.iter().cloned().collect()
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.state.borrow().stats
    }
}
