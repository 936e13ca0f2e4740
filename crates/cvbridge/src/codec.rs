//! Image decoding and encoding
//!
//! Decoded images are always 3-channel BGR. Encoding picks the codec from
//! an extension hint (".png", "jpg", ...) or from the output path.

use std::io::{BufRead, Cursor, Seek};
use std::path::Path;

use image::error::ImageError;
use image::{DynamicImage, ImageFormat, ImageReader, Limits};

use crate::config::{self, BridgeConfig};
use crate::error::{CvError, Result};
use crate::imgproc::color::swap_red_blue;
use crate::mat::Mat;

/// Decode an image file into a BGR buffer.
pub fn decode_file(path: impl AsRef<Path>) -> Result<Mat> {
    decode_file_with(path.as_ref(), &config::current())
}

fn decode_file_with(path: &Path, config: &BridgeConfig) -> Result<Mat> {
    let len = std::fs::metadata(path)?.len();
    check_encoded_len(len, config)?;
    let reader = ImageReader::open(path)?.with_guessed_format()?;
    decode_with(reader, config)
}

/// Decode an in-memory encoded image into a BGR buffer.
pub fn decode_memory(bytes: &[u8]) -> Result<Mat> {
    decode_memory_with(bytes, &config::current())
}

fn decode_memory_with(bytes: &[u8], config: &BridgeConfig) -> Result<Mat> {
    check_encoded_len(bytes.len() as u64, config)?;
    if bytes.is_empty() {
        return Err(CvError::EmptyImage);
    }
    let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    decode_with(reader, config)
}

fn check_encoded_len(len: u64, config: &BridgeConfig) -> Result<()> {
    if len > config.max_decode_bytes as u64 {
        return Err(CvError::LimitExceeded(format!(
            "encoded input of {} bytes exceeds {}",
            len, config.max_decode_bytes
        )));
    }
    Ok(())
}

/// Decoder limits derived from `max_image_pixels`. The allocation budget
/// covers the widest sample layout (16-bit RGBA) at the pixel limit, so
/// the decoder rejects oversized headers before allocating pixel storage.
fn decode_limits(config: &BridgeConfig) -> Limits {
    let side = u32::try_from(config.max_image_pixels).unwrap_or(u32::MAX);
    let mut limits = Limits::no_limits();
    limits.max_image_width = Some(side);
    limits.max_image_height = Some(side);
    limits.max_alloc = Some(config.max_image_pixels.saturating_mul(8));
    limits
}

fn decode_with<R>(mut reader: ImageReader<R>, config: &BridgeConfig) -> Result<Mat>
where
    R: BufRead + Seek,
{
    reader.limits(decode_limits(config));
    let img = reader.decode().map_err(|e| match e {
        ImageError::Limits(limit) => CvError::LimitExceeded(limit.to_string()),
        other => CvError::Codec(other),
    })?;
    config.check_pixels(img.width(), img.height())?;
    let rgb = img.to_rgb8();
    let (w, h) = rgb.dimensions();
    let mat = Mat::from_raw(w, h, 3, rgb.into_raw())?;
    Ok(swap_red_blue(&mat))
}

/// Resolve an extension hint such as ".png" or "JPG" to a codec.
pub fn format_from_hint(hint: &str) -> Result<ImageFormat> {
    let ext = hint.trim().trim_start_matches('.');
    ImageFormat::from_extension(ext).ok_or_else(|| CvError::UnknownFormat(hint.to_string()))
}

/// Encode a buffer into a byte vector sized exactly to the payload.
pub fn encode_memory(hint: &str, mat: &Mat) -> Result<Vec<u8>> {
    let format = format_from_hint(hint)?;
    let img = to_encodable(mat)?;
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, format)?;
    let mut bytes = out.into_inner();
    bytes.shrink_to_fit();
    Ok(bytes)
}

/// Encode a buffer to a file; the codec follows the path's extension.
pub fn encode_file(path: impl AsRef<Path>, mat: &Mat) -> Result<()> {
    let path = path.as_ref();
    let format = ImageFormat::from_path(path)?;
    let img = to_encodable(mat)?;
    img.save_with_format(path, format)?;
    Ok(())
}

/// BGR(A) channel order to the RGB(A) order the codecs expect.
fn to_encodable(mat: &Mat) -> Result<DynamicImage> {
    mat.ensure_not_empty()?;
    match mat.channels() {
        3 | 4 => swap_red_blue(mat).to_dynamic(),
        _ => mat.to_dynamic(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Mat {
        let data: Vec<u8> = (0..(6 * 5 * 3)).map(|v| (v * 7 % 256) as u8).collect();
        Mat::from_raw(6, 5, 3, data).unwrap()
    }

    #[test]
    fn test_png_memory_roundtrip() {
        let mat = sample();
        let bytes = encode_memory(".png", &mat).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
        assert_eq!(decode_memory(&bytes).unwrap(), mat);
    }

    #[test]
    fn test_gray_png_decodes_to_three_channels() {
        let gray = Mat::from_raw(2, 2, 1, vec![0, 50, 100, 150]).unwrap();
        let bytes = encode_memory("png", &gray).unwrap();
        let back = decode_memory(&bytes).unwrap();
        assert_eq!(back.channels(), 3);
        assert_eq!(back.pixel(1, 0), &[50, 50, 50]);
    }

    #[test]
    fn test_unknown_hint() {
        assert!(matches!(
            encode_memory(".nope", &sample()),
            Err(CvError::UnknownFormat(_))
        ));
    }

    #[test]
    fn test_garbage_and_empty_input_fail() {
        assert!(decode_memory(b"definitely not an image").is_err());
        assert!(decode_memory(&[]).is_err());
        assert!(encode_memory(".png", &Mat::empty()).is_err());
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        let mat = sample();
        encode_file(&path, &mat).unwrap();
        assert_eq!(decode_file(&path).unwrap(), mat);
        assert!(decode_file(dir.path().join("missing.png")).is_err());
    }

    /// CRC-32 (IEEE) as used by PNG chunks.
    fn crc32(bytes: &[u8]) -> u32 {
        let mut crc = !0u32;
        for &b in bytes {
            crc ^= b as u32;
            for _ in 0..8 {
                crc = if crc & 1 == 1 { (crc >> 1) ^ 0xEDB8_8320 } else { crc >> 1 };
            }
        }
        !crc
    }

    /// A valid PNG whose IHDR is rewritten to claim `width` x `height`.
    fn png_claiming(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = encode_memory(".png", &sample()).unwrap();
        // Signature (8), chunk length (4), then "IHDR" and its 13 data bytes.
        bytes[16..20].copy_from_slice(&width.to_be_bytes());
        bytes[20..24].copy_from_slice(&height.to_be_bytes());
        let crc = crc32(&bytes[12..29]);
        bytes[29..33].copy_from_slice(&crc.to_be_bytes());
        bytes
    }

    #[test]
    fn test_oversized_header_rejected_before_decoding() {
        let bomb = png_claiming(60_000, 60_000);
        assert!(bomb.len() < 1024);
        assert!(matches!(
            decode_memory_with(&bomb, &BridgeConfig::default()),
            Err(CvError::LimitExceeded(_))
        ));

        let small = BridgeConfig {
            max_image_pixels: 10,
            ..Default::default()
        };
        let bytes = encode_memory(".png", &sample()).unwrap();
        assert!(matches!(
            decode_memory_with(&bytes, &small),
            Err(CvError::LimitExceeded(_))
        ));
    }

    #[test]
    fn test_file_size_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        encode_file(&path, &sample()).unwrap();
        let tight = BridgeConfig {
            max_decode_bytes: 16,
            ..Default::default()
        };
        assert!(matches!(
            decode_file_with(&path, &tight),
            Err(CvError::LimitExceeded(_))
        ));
        assert_eq!(decode_file_with(&path, &BridgeConfig::default()).unwrap(), sample());
    }
}
