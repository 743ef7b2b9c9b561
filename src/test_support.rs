//! In-memory slice source for unit tests.

use std::cell::RefCell;
use std::collections::HashSet;
use std::io::Cursor;
use std::rc::Rc;
use std::time::Duration;

use tokio::sync::Semaphore;
use voxview_cache::{FetchError, SliceCache, SliceSource};

pub fn png_bytes() -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(4, 4, image::Rgba([90, 90, 90, 255]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

/// Records fetches and lets tests fail or hold them.
#[derive(Default)]
pub struct FetchLog {
    calls: RefCell<Vec<String>>,
    failing: RefCell<HashSet<String>>,
    gate: Option<Semaphore>,
}

impl FetchLog {
    pub fn calls(&self) -> usize {
        self.calls.borrow().len()
    }

    pub fn calls_for(&self, key: &str) -> usize {
        self.calls.borrow().iter().filter(|k| *k == key).count()
    }

    pub fn fail(&self, key: &str) {
        self.failing.borrow_mut().insert(key.to_string());
    }

    /// Let `permits` held fetches complete.
    pub fn open(&self, permits: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(permits);
        }
    }
}

pub struct MockSource {
    fetches: Rc<FetchLog>,
}

impl SliceSource for MockSource {
    async fn fetch(&self, key: &str) -> Result<Vec<u8>, FetchError> {
        self.fetches.calls.borrow_mut().push(key.to_string());
        if let Some(gate) = &self.fetches.gate {
            gate.acquire().await.unwrap().forget();
        }
        if self.fetches.failing.borrow().contains(key) {
            return Err(FetchError::Status { status: 404 });
        }
        Ok(png_bytes())
    }
}

fn build(max_size: usize, gate: Option<Semaphore>) -> (SliceCache<MockSource>, Rc<FetchLog>) {
    let fetches = Rc::new(FetchLog {
        gate,
        ..FetchLog::default()
    });
    let source = MockSource {
        fetches: Rc::clone(&fetches),
    };
    (SliceCache::new(source, max_size), fetches)
}

/// Cache whose fetches complete immediately.
pub fn mock_cache(max_size: usize) -> (SliceCache<MockSource>, Rc<FetchLog>) {
    build(max_size, None)
}

/// Cache whose fetches wait for [`FetchLog::open`].
pub fn gated_cache(max_size: usize) -> (SliceCache<MockSource>, Rc<FetchLog>) {
    build(max_size, Some(Semaphore::new(0)))
}

/// Let spawned local tasks run. Needs paused time.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
