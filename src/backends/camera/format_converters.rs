// SPDX-License-Identifier: GPL-3.0-only
//! Pixel format conversion utilities
//!
//! Every supported [`PixelFormat`] is converted to packed RGB24, which is what
//! the JPEG encoder and the terminal preview consume. Converters honour the
//! frame stride, so drivers that pad rows are handled.

use super::types::{CameraFrame, PixelFormat};
use crate::errors::PhotoError;
use image::{ImageFormat, RgbImage};

/// Convert a single YUV sample to RGB (BT.601)
pub fn yuv_to_rgb(y: u8, u: u8, v: u8) -> (u8, u8, u8) {
    let y = y as f32;
    let u = u as f32 - 128.0;
    let v = v as f32 - 128.0;

    let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
    let g = (y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8;
    let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;
    (r, g, b)
}

/// Row stride to use for a frame, falling back to the packed stride
fn effective_stride(stride: u32, width: u32, bytes_per_pixel: u32) -> usize {
    let packed = width * bytes_per_pixel;
    if stride >= packed { stride as usize } else { packed as usize }
}

/// Convert packed 4:2:2 YUV to RGB24
///
/// `y0`, `u`, `y1` and `v` are byte offsets of each component within a
/// 4-byte macropixel (YUYV is 0,1,2,3 and UYVY is 1,0,3,2).
fn packed_422_to_rgb(
    data: &[u8],
    width: u32,
    height: u32,
    stride: u32,
    [y0, u, y1, v]: [usize; 4],
) -> Vec<u8> {
    let w = width as usize;
    let h = height as usize;
    let stride = effective_stride(stride, width, 2);
    let mut rgb = vec![0u8; w * h * 3];

    for row in 0..h {
        let Some(line) = data.get(row * stride..row * stride + w * 2) else {
            break;
        };
        for (pair, chunk) in line.chunks_exact(4).enumerate() {
            let x = pair * 2;
            let first = yuv_to_rgb(chunk[y0], chunk[u], chunk[v]);
            let second = yuv_to_rgb(chunk[y1], chunk[u], chunk[v]);

            let idx = (row * w + x) * 3;
            rgb[idx..idx + 3].copy_from_slice(&[first.0, first.1, first.2]);
            if x + 1 < w {
                rgb[idx + 3..idx + 6].copy_from_slice(&[second.0, second.1, second.2]);
            }
        }
    }

    rgb
}

/// Convert YUYV (Y0 U Y1 V) to RGB24
pub fn yuyv_to_rgb(data: &[u8], width: u32, height: u32, stride: u32) -> Vec<u8> {
    packed_422_to_rgb(data, width, height, stride, [0, 1, 2, 3])
}

/// Convert UYVY (U Y0 V Y1) to RGB24
pub fn uyvy_to_rgb(data: &[u8], width: u32, height: u32, stride: u32) -> Vec<u8> {
    packed_422_to_rgb(data, width, height, stride, [1, 0, 3, 2])
}

/// Copy RGB-family pixels into packed RGB24, dropping padding and alpha
fn repack_to_rgb(data: &[u8], width: u32, height: u32, stride: u32, bpp: u32) -> Vec<u8> {
    let w = width as usize;
    let h = height as usize;
    let bpp_usize = bpp as usize;
    let stride = effective_stride(stride, width, bpp);
    let mut rgb = Vec::with_capacity(w * h * 3);

    for row in 0..h {
        let start = row * stride;
        let Some(line) = data.get(start..start + w * bpp_usize) else {
            break;
        };
        for px in line.chunks_exact(bpp_usize) {
            match bpp {
                1 => rgb.extend_from_slice(&[px[0], px[0], px[0]]),
                _ => rgb.extend_from_slice(&px[..3]),
            }
        }
    }

    rgb
}

/// Convert RGBA to RGB24
pub fn rgba_to_rgb(data: &[u8], width: u32, height: u32, stride: u32) -> Vec<u8> {
    repack_to_rgb(data, width, height, stride, 4)
}

/// Expand 8-bit grayscale to RGB24
pub fn gray_to_rgb(data: &[u8], width: u32, height: u32, stride: u32) -> Vec<u8> {
    repack_to_rgb(data, width, height, stride, 1)
}

/// Bytes an uncompressed frame needs: every row but the last at full stride
fn required_len(width: u32, height: u32, stride: u32, bytes_per_pixel: u32) -> usize {
    if height == 0 {
        return 0;
    }
    let stride = effective_stride(stride, width, bytes_per_pixel);
    (height as usize - 1) * stride + (width * bytes_per_pixel) as usize
}

/// Convert any supported frame to an RGB image at its native dimensions
///
/// A truncated buffer is an error rather than a partly black image.
pub fn frame_to_rgb(frame: &CameraFrame) -> Result<RgbImage, PhotoError> {
    if !frame.is_decodable() {
        return Err(PhotoError::NoFrameAvailable);
    }

    let (w, h, s) = (frame.width, frame.height, frame.stride);
    let data = frame.data.as_ref();

    if let Some(bpp) = frame.format.bytes_per_pixel() {
        let needed = required_len(w, h, s, bpp);
        if data.len() < needed {
            return Err(PhotoError::ConversionFailed(format!(
                "{} frame truncated: {} of {} bytes for {}x{}",
                frame.format,
                data.len(),
                needed,
                w,
                h
            )));
        }
    }

    let pixels = match frame.format {
        PixelFormat::MJPEG => {
            let decoded = image::load_from_memory_with_format(data, ImageFormat::Jpeg)
                .map_err(|e| PhotoError::ConversionFailed(format!("MJPEG decode: {}", e)))?;
            return Ok(decoded.to_rgb8());
        }
        PixelFormat::YUYV => yuyv_to_rgb(data, w, h, s),
        PixelFormat::UYVY => uyvy_to_rgb(data, w, h, s),
        PixelFormat::RGB24 => repack_to_rgb(data, w, h, s, 3),
        PixelFormat::RGBA => rgba_to_rgb(data, w, h, s),
        PixelFormat::Gray8 => gray_to_rgb(data, w, h, s),
    };

    RgbImage::from_raw(w, h, pixels).ok_or_else(|| {
        PhotoError::ConversionFailed(format!(
            "{} buffer too small for {}x{}",
            frame.format, w, h
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    fn frame(
        format: PixelFormat,
        width: u32,
        height: u32,
        stride: u32,
        data: Vec<u8>,
    ) -> CameraFrame {
        CameraFrame {
            width,
            height,
            data: Arc::from(data),
            format,
            stride,
            captured_at: Instant::now(),
        }
    }

    #[test]
    fn test_yuyv_white() {
        // Pure white in YUV (Y=255, U=128, V=128)
        let rgb = yuyv_to_rgb(&[255, 128, 255, 128], 2, 1, 4);
        assert_eq!(rgb.len(), 6);
        assert!(rgb.iter().all(|&c| c > 250));
    }

    #[test]
    fn test_uyvy_component_order() {
        // Y0 black, Y1 white, neutral chroma
        let rgb = uyvy_to_rgb(&[128, 0, 128, 255], 2, 1, 4);
        assert_eq!(&rgb[0..3], &[0, 0, 0]);
        assert!(rgb[3..6].iter().all(|&c| c > 250));
    }

    #[test]
    fn test_rgba_stride_padding_is_skipped() {
        // 1x2 image with 4 bytes of padding per row
        let data = vec![
            10, 20, 30, 255, 0, 0, 0, 0, //
            40, 50, 60, 255, 0, 0, 0, 0,
        ];
        let rgb = rgba_to_rgb(&data, 1, 2, 8);
        assert_eq!(rgb, vec![10, 20, 30, 40, 50, 60]);
    }

    #[test]
    fn test_gray_expands() {
        assert_eq!(gray_to_rgb(&[7, 9], 2, 1, 0), vec![7, 7, 7, 9, 9, 9]);
    }

    #[test]
    fn test_frame_to_rgb_rejects_empty_frame() {
        let empty = frame(PixelFormat::RGB24, 0, 0, 0, vec![]);
        assert!(matches!(
            frame_to_rgb(&empty),
            Err(PhotoError::NoFrameAvailable)
        ));
    }

    #[test]
    fn test_frame_to_rgb_rejects_corrupt_mjpeg() {
        let corrupt = frame(PixelFormat::MJPEG, 4, 4, 0, vec![0xFF, 0xD8, 0x00]);
        assert!(matches!(
            frame_to_rgb(&corrupt),
            Err(PhotoError::ConversionFailed(_))
        ));
    }

    #[test]
    fn test_frame_to_rgb_rejects_truncated_frame() {
        let short = frame(PixelFormat::RGB24, 4, 4, 12, vec![1, 2, 3]);
        assert!(matches!(
            frame_to_rgb(&short),
            Err(PhotoError::ConversionFailed(_))
        ));

        // Missing only the padding after the last row is fine
        let unpadded_tail = frame(PixelFormat::YUYV, 2, 2, 8, vec![128; 8 + 4]);
        assert!(frame_to_rgb(&unpadded_tail).is_ok());
    }

    #[test]
    fn test_frame_to_rgb_keeps_dimensions() {
        let f = frame(PixelFormat::Gray8, 3, 2, 3, vec![0; 6]);
        let img = frame_to_rgb(&f).unwrap();
        assert_eq!(img.dimensions(), (3, 2));
    }
}
