use crate::error::DecodeError;
use crate::image::ImageHandle;

/// Decode an encoded slice payload (PNG/JPEG) into RGBA8 pixels.
pub fn decode_slice(bytes: &[u8]) -> Result<ImageHandle, DecodeError> {
    let img = image::load_from_memory(bytes).map_err(|e| DecodeError {
        message: e.to_string(),
    })?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    log::trace!("Decoded {}x{} slice ({} bytes)", width, height, bytes.len());

    ImageHandle::from_rgba8(rgba.into_raw(), width, height).ok_or_else(|| DecodeError {
        message: format!("pixel buffer does not match {}x{}", width, height),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_decode_png() {
        let handle = decode_slice(&png_bytes(3, 2)).unwrap();
        assert_eq!(handle.width(), 3);
        assert_eq!(handle.height(), 2);
        assert_eq!(&handle.data()[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let err = decode_slice(b"definitely not an image").unwrap_err();
        assert!(!err.message.is_empty());
    }
}
