//! Vision operations over [`Mat`](crate::mat::Mat)
//!
//! Every enum-like parameter uses the OpenCV numbering, so host code
//! written against that API passes its constants through unchanged.
//! Values outside the supported set are reported as
//! [`CvError::InvalidParameter`](crate::error::CvError::InvalidParameter).
//!
//! Operations never mutate their input, except the drawing primitives in
//! [`draw`], which paint into the buffer they are given.

pub mod color;
pub mod contours;
pub mod denoise;
pub mod draw;
pub mod filter;
pub mod geometry;
pub mod histogram;
pub mod morph;
pub mod threshold;

use crate::error::{CvError, Result};
use crate::mat::Mat;

/// Kernel sizes that must be odd are promoted to the next odd value:
/// an even `n` becomes `n + 1`.
#[inline]
pub fn odd_kernel(n: i32) -> i32 {
    if n % 2 == 0 {
        n + 1
    } else {
        n
    }
}

/// Pixel extrapolation outside the image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Border {
    /// `gfedcb|abcdefgh|gfedcba`
    Reflect101,
    /// `aaaaaa|abcdefgh|hhhhhhh`
    Replicate,
}

impl Border {
    #[inline]
    pub(crate) fn index(self, i: isize, n: usize) -> usize {
        let n = n as isize;
        if (0..n).contains(&i) {
            return i as usize;
        }
        match self {
            Border::Replicate => i.clamp(0, n - 1) as usize,
            Border::Reflect101 => {
                if n == 1 {
                    return 0;
                }
                let period = 2 * (n - 1);
                let mut j = i.rem_euclid(period);
                if j >= n {
                    j = period - j;
                }
                j as usize
            }
        }
    }
}

/// Round and clamp to the 8-bit range.
#[inline]
pub(crate) fn saturate_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// Float planes of a buffer, one per channel, row-major.
pub(crate) fn float_planes(mat: &Mat) -> Vec<Vec<f32>> {
    let c = mat.channels() as usize;
    (0..c)
        .map(|ch| {
            mat.data()[ch..]
                .iter()
                .step_by(c)
                .map(|&v| v as f32)
                .collect()
        })
        .collect()
}

/// Interleave float planes back into an 8-bit buffer.
pub(crate) fn from_float_planes(
    width: u32,
    height: u32,
    planes: &[Vec<f32>],
    quantize: impl Fn(f32) -> u8,
) -> Result<Mat> {
    let c = planes.len();
    let n = width as usize * height as usize;
    let mut data = vec![0u8; n * c];
    for (ch, plane) in planes.iter().enumerate() {
        for (i, &v) in plane.iter().enumerate() {
            data[i * c + ch] = quantize(v);
        }
    }
    Mat::from_raw(width, height, c as u8, data)
}

/// Separable correlation of one float plane: `kx` along rows, then `ky`
/// along columns, each kernel anchored at its center.
pub(crate) fn correlate_separable(
    plane: &[f32],
    width: usize,
    height: usize,
    kx: &[f32],
    ky: &[f32],
    border: Border,
) -> Vec<f32> {
    let rx = (kx.len() / 2) as isize;
    let ry = (ky.len() / 2) as isize;
    let mut tmp = vec![0f32; plane.len()];
    for y in 0..height {
        let row = &plane[y * width..(y + 1) * width];
        for x in 0..width {
            let mut acc = 0f32;
            for (k, &w) in kx.iter().enumerate() {
                let sx = border.index(x as isize + k as isize - rx, width);
                acc += w * row[sx];
            }
            tmp[y * width + x] = acc;
        }
    }
    let mut out = vec![0f32; plane.len()];
    for y in 0..height {
        for x in 0..width {
            let mut acc = 0f32;
            for (k, &w) in ky.iter().enumerate() {
                let sy = border.index(y as isize + k as isize - ry, height);
                acc += w * tmp[sy * width + x];
            }
            out[y * width + x] = acc;
        }
    }
    out
}

/// Dense 2D correlation of one float plane with a square `size`×`size`
/// kernel anchored at its center.
pub(crate) fn correlate_2d(
    plane: &[f32],
    width: usize,
    height: usize,
    kernel: &[f32],
    size: usize,
    border: Border,
) -> Vec<f32> {
    let r = (size / 2) as isize;
    let mut out = vec![0f32; plane.len()];
    for y in 0..height {
        for x in 0..width {
            let mut acc = 0f32;
            for ky in 0..size {
                let sy = border.index(y as isize + ky as isize - r, height);
                for kx in 0..size {
                    let w = kernel[ky * size + kx];
                    if w != 0.0 {
                        let sx = border.index(x as isize + kx as isize - r, width);
                        acc += w * plane[sy * width + sx];
                    }
                }
            }
            out[y * width + x] = acc;
        }
    }
    out
}

/// Map a positive `i32` dimension parameter to `u32`.
pub(crate) fn positive(name: &str, v: i32) -> Result<u32> {
    if v <= 0 {
        return Err(CvError::invalid(format!("{} must be positive, got {}", name, v)));
    }
    Ok(v as u32)
}
