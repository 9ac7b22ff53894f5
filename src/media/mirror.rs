//! Horizontal flip of captured stills, so a stored photo matches the
//! mirrored preview the user framed their face in.

use image::codecs::jpeg::JpegEncoder;
use image::ImageFormat;

use crate::error::{MediaDevice, MediaError};

const JPEG_QUALITY: u8 = 90;

/// Decode a JPEG, flip it left to right and re-encode it.
pub fn mirror_jpeg(jpeg: &[u8]) -> Result<Vec<u8>, MediaError> {
    let frame = image::load_from_memory_with_format(jpeg, ImageFormat::Jpeg).map_err(|e| {
        MediaError::Unavailable {
            device: MediaDevice::Camera,
            reason: format!("unreadable frame: {e}"),
        }
    })?;
    let mirrored = frame.fliph().to_rgb8();

    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY)
        .encode_image(&mirrored)
        .map_err(|e| MediaError::Unavailable {
            device: MediaDevice::Camera,
            reason: format!("could not encode frame: {e}"),
        })?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use image::{DynamicImage, Rgb, RgbImage};

    use super::*;

    /// Black on the left half, white on the right.
    fn half_and_half() -> Vec<u8> {
        let frame = RgbImage::from_fn(16, 8, |x, _| {
            if x < 8 { Rgb([0, 0, 0]) } else { Rgb([255, 255, 255]) }
        });
        let mut bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut bytes, 95)
            .encode_image(&DynamicImage::ImageRgb8(frame))
            .unwrap();
        bytes
    }

    #[test]
    fn flips_left_and_right() {
        let mirrored = mirror_jpeg(&half_and_half()).unwrap();
        let decoded = image::load_from_memory(&mirrored).unwrap().to_rgb8();

        assert_eq!(decoded.dimensions(), (16, 8));
        assert!(decoded.get_pixel(2, 4)[0] > 200, "left half should now be white");
        assert!(decoded.get_pixel(13, 4)[0] < 50, "right half should now be black");
    }

    #[test]
    fn garbage_is_a_camera_error() {
        let err = mirror_jpeg(&[0xff, 0xd8, 0xff, 0xe0]).unwrap_err();
        assert!(matches!(
            err,
            MediaError::Unavailable {
                device: MediaDevice::Camera,
                ..
            }
        ));
    }
}
