use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::image::ImageHandle;

struct Slot {
    key: String,
    image: RefCell<Option<ImageHandle>>,
}

/// Opaque reference to a cached slice image.
///
/// The cache invalidates the handle when its entry is released, evicted or
/// cleared. After that [`SliceHandle::image`] returns `None` for every clone,
/// so holders must not rely on the pixels staying around on their own.
#[derive(Clone)]
pub struct SliceHandle {
    slot: Rc<Slot>,
}

impl SliceHandle {
    pub(crate) fn new(key: String, image: ImageHandle) -> Self {
        Self {
            slot: Rc::new(Slot {
                key,
                image: RefCell::new(Some(image)),
            }),
        }
    }

    /// Request key this handle was created for.
    pub fn key(&self) -> &str {
        &self.slot.key
    }

    /// The decoded image, or `None` once the handle was invalidated.
    pub fn image(&self) -> Option<ImageHandle> {
        self.slot.image.borrow().clone()
    }

    /// Whether the handle still refers to live pixels.
    pub fn is_live(&self) -> bool {
        self.slot.image.borrow().is_some()
    }

    /// Whether both handles refer to the same cache entry.
    pub fn same_entry(&self, other: &SliceHandle) -> bool {
        Rc::ptr_eq(&self.slot, &other.slot)
    }

    /// Drops the pixel buffer for every clone of this handle.
    pub(crate) fn invalidate(&self) {
        self.slot.image.borrow_mut().take();
    }
}

impl fmt::Debug for SliceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SliceHandle")
            .field("key", &self.slot.key)
            .field("live", &self.is_live())
            .finish()
    }
}
