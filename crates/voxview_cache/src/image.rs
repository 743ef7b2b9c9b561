use std::sync::Arc;

/// Decoded RGBA8 pixels of one slice.
///
/// Cloning is cheap; all clones share the same pixel buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageHandle {
    /// The raw RGBA8 image data
    data: Arc<Vec<u8>>,
    /// Width in pixels
    width: u32,
    /// Height in pixels
    height: u32,
}

impl ImageHandle {
    /// Create a new image handle from RGBA8 data.
    ///
    /// Returns `None` if `data.len() != width * height * 4`.
    pub fn from_rgba8(data: Vec<u8>, width: u32, height: u32) -> Option<Self> {
        if data.len() != (width as usize) * (height as usize) * 4 {
            return None;
        }

        Some(Self {
            data: Arc::new(data),
            width,
            height,
        })
    }

    /// Get the image data.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get the image width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Get the image height.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Size of the pixel buffer in bytes.
    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    /// Get the aspect ratio (width / height).
    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            return 1.0;
        }
        self.width as f32 / self.height as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rgba8_checks_size() {
        assert!(ImageHandle::from_rgba8(vec![0; 16], 2, 2).is_some());
        assert!(ImageHandle::from_rgba8(vec![0; 15], 2, 2).is_none());
    }

    #[test]
    fn test_aspect_ratio() {
        let image = ImageHandle::from_rgba8(vec![0; 4 * 8], 4, 2).unwrap();
        assert_eq!(image.aspect_ratio(), 2.0);
        assert_eq!(image.byte_len(), 32);
    }
}
