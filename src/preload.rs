//! Sliding-window slice preloader.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};

use voxview_cache::{CacheError, SliceCache, SliceHandle, SliceSource};

use crate::request::SliceRequest;

/// Outcome of [`SlicePreloader::load`].
#[derive(Debug, Clone)]
pub enum SliceLoad {
    /// The requested slice is ready to display
    Ready(SliceHandle),
    /// A newer load started while this one was waiting; nothing to display
    Superseded,
}

impl SliceLoad {
    pub fn handle(&self) -> Option<&SliceHandle> {
        match self {
            SliceLoad::Ready(handle) => Some(handle),
            SliceLoad::Superseded => None,
        }
    }
}

/// Neighbor indices to preload around `index`: up to `count` ahead, then up
/// to `count` behind, clipped to `[0, max_index]`.
pub fn preload_window(index: usize, max_index: usize, count: usize) -> Vec<usize> {
    let ahead = (1..=count)
        .map_while(|offset| index.checked_add(offset))
        .filter(|&i| i <= max_index);
    let behind = (1..=count).filter_map(|offset| index.checked_sub(offset));
    ahead.chain(behind).collect()
}

#[derive(Debug, Default)]
struct PreloadState {
    generation: u64,
    loading: bool,
    last_error: Option<CacheError>,
    /// Most recently resolved current slice
    current: Option<(usize, SliceHandle)>,
    /// Neighbor indices already handed to the cache
    requested: BTreeSet<usize>,
    /// Handles of the entries this preloader holds a lease on. A handle that
    /// is no longer live means the entry was evicted along with the lease.
    leased: HashMap<String, SliceHandle>,
}

/// Loads the displayed slice and warms the cache around it.
///
/// A preloader is bound to one [`SliceRequest`] for its whole life; changing
/// plane, window or overlay means creating a new one. Neighbor loads are
/// spawned as local tasks, so [`SlicePreloader::load`] must run inside a
/// `tokio::task::LocalSet`.
pub struct SlicePreloader<S: SliceSource> {
    cache: SliceCache<S>,
    request: SliceRequest,
    preload_count: usize,
    state: RefCell<PreloadState>,
}

impl<S: SliceSource> SlicePreloader<S> {
    pub fn new(cache: SliceCache<S>, request: SliceRequest, preload_count: usize) -> Self {
        log::debug!(
            "New preloader for {} (preload count: {})",
            request.base_key(),
            preload_count
        );
        Self {
            cache,
            request,
            preload_count,
            state: RefCell::new(PreloadState::default()),
        }
    }

    pub fn request(&self) -> &SliceRequest {
        &self.request
    }

    pub fn preload_count(&self) -> usize {
        self.preload_count
    }

    /// Whether the latest [`SlicePreloader::load`] is still waiting.
    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    /// Error of the latest load, for a "failed to load" placeholder.
    pub fn last_error(&self) -> Option<CacheError> {
        self.state.borrow().last_error.clone()
    }

    /// Index and handle of the most recently resolved slice.
    pub fn current(&self) -> Option<(usize, SliceHandle)> {
        self.state.borrow().current.clone()
    }

    /// Neighbor indices requested so far, ascending.
    pub fn requested_indices(&self) -> Vec<usize> {
        self.state.borrow().requested.iter().copied().collect()
    }

    /// Load slice `index` (clamped to `max_index`) and preload its neighbors.
    ///
    /// Neighbor failures are only logged. A failure of the slice itself is
    /// returned and kept as [`SlicePreloader::last_error`].
    pub async fn load(&self, index: usize, max_index: usize) -> Result<SliceLoad, CacheError> {
        let index = index.min(max_index);
        let key = self.request.key_for(index);

        let (generation, leased) = {
            let mut state = self.state.borrow_mut();
            state.generation += 1;
            state.loading = true;
            let leased = state.leased.get(&key).is_some_and(SliceHandle::is_live);
            (state.generation, leased)
        };

        self.preload_neighbors(index, max_index);

        let result = if leased {
            self.cache.materialize(&key).await
        } else {
            self.cache.acquire(&key).await
        };

        let mut state = self.state.borrow_mut();
        if let (false, Ok(handle)) = (leased, &result) {
            let duplicate = state
                .leased
                .get(&key)
                .is_some_and(|held| held.is_live() && held.same_entry(handle));
            if duplicate {
                // A concurrent load of the same key already recorded a lease.
                self.cache.release(&key);
            } else {
                state.leased.insert(key.clone(), handle.clone());
            }
        }
        if generation != state.generation {
            log::trace!("Load of slice {} superseded", index);
            return Ok(SliceLoad::Superseded);
        }

        state.loading = false;
        match result {
            Ok(handle) => {
                state.last_error = None;
                state.current = Some((index, handle.clone()));
                Ok(SliceLoad::Ready(handle))
            }
            Err(err) => {
                state.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    fn preload_neighbors(&self, index: usize, max_index: usize) {
        let pending: Vec<usize> = {
            let mut state = self.state.borrow_mut();
            preload_window(index, max_index, self.preload_count)
                .into_iter()
                .filter(|&i| state.requested.insert(i))
                .collect()
        };

        for neighbor in pending {
            let cache = self.cache.clone();
            let key = self.request.key_for(neighbor);
            tokio::task::spawn_local(async move {
                if let Err(err) = cache.materialize(&key).await {
                    log::warn!("Failed to preload slice {}: {}", neighbor, err);
                }
            });
        }
    }
}

impl<S: SliceSource> Drop for SlicePreloader<S> {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        let Some((_, current)) = state.current.take() else {
            return;
        };
        match state.leased.remove(current.key()) {
            Some(held) if held.is_live() => self.cache.release(held.key()),
            _ => log::debug!("No live lease on {} to release", current.key()),
        }
    }
}
