//! Fixed and adaptive thresholding

use imageproc::contrast;

use crate::error::{CvError, Result};
use crate::imgproc::filter::{gaussian_kernel, smooth_separable};
use crate::imgproc::{odd_kernel, saturate_u8, Border};
use crate::mat::Mat;

/// `THRESH_OTSU` flag, combined with one of the base types.
pub const THRESH_OTSU: i32 = 8;
const THRESH_TYPE_MASK: i32 = 7;

/// OpenCV `ThresholdTypes` (base part)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdType {
    Binary = 0,
    BinaryInv = 1,
    Trunc = 2,
    ToZero = 3,
    ToZeroInv = 4,
}

impl ThresholdType {
    pub fn from_code(code: i32) -> Result<Self> {
        Ok(match code {
            0 => Self::Binary,
            1 => Self::BinaryInv,
            2 => Self::Trunc,
            3 => Self::ToZero,
            4 => Self::ToZeroInv,
            _ => return Err(CvError::invalid(format!("threshold type {}", code))),
        })
    }

    #[inline]
    fn apply(self, v: u8, thresh: i32, maxval: u8) -> u8 {
        let above = v as i32 > thresh;
        match self {
            Self::Binary => {
                if above {
                    maxval
                } else {
                    0
                }
            }
            Self::BinaryInv => {
                if above {
                    0
                } else {
                    maxval
                }
            }
            Self::Trunc => {
                if above {
                    thresh.clamp(0, 255) as u8
                } else {
                    v
                }
            }
            Self::ToZero => {
                if above {
                    v
                } else {
                    0
                }
            }
            Self::ToZeroInv => {
                if above {
                    0
                } else {
                    v
                }
            }
        }
    }
}

/// Otsu's threshold of a single-channel buffer.
pub fn otsu_threshold(mat: &Mat) -> Result<u8> {
    Ok(contrast::otsu_level(&mat.to_gray_image()?))
}

/// Apply a fixed threshold to every channel. `thresh` is floored and
/// `maxval` rounded to the 8-bit range. With the `THRESH_OTSU` flag the
/// threshold is computed from the image (single channel only).
pub fn threshold(mat: &Mat, thresh: f64, maxval: f64, kind: i32) -> Result<Mat> {
    mat.ensure_not_empty()?;
    if kind & !(THRESH_TYPE_MASK | THRESH_OTSU) != 0 {
        return Err(CvError::invalid(format!("threshold flags {}", kind)));
    }
    let ty = ThresholdType::from_code(kind & THRESH_TYPE_MASK)?;
    let t = if kind & THRESH_OTSU != 0 {
        otsu_threshold(mat)? as i32
    } else {
        thresh.floor().clamp(-1.0, 255.0) as i32
    };
    let maxval = saturate_u8(maxval as f32);
    let mut out = mat.clone();
    for v in out.data_mut() {
        *v = ty.apply(*v, t, maxval);
    }
    Ok(out)
}

/// Local-mean thresholding of a single-channel buffer.
///
/// `method` 0 compares against the box mean, 1 against the Gaussian
/// weighted mean of the `block_size` neighborhood (replicated border).
/// Only the binary types are accepted. An even block size is promoted to
/// the next odd value; it must end up above 1.
pub fn adaptive_threshold(
    mat: &Mat,
    maxval: f64,
    method: i32,
    kind: i32,
    block_size: i32,
    c: f64,
) -> Result<Mat> {
    mat.require_channels("adaptive_threshold", &[1])?;
    let block = odd_kernel(block_size);
    if block <= 1 {
        return Err(CvError::invalid(format!("block size {}", block_size)));
    }
    let ty = match ThresholdType::from_code(kind)? {
        t @ (ThresholdType::Binary | ThresholdType::BinaryInv) => t,
        other => return Err(CvError::invalid(format!("adaptive type {:?}", other))),
    };
    let block = block as usize;
    let kernel = match method {
        0 => vec![1.0 / block as f32; block],
        1 => gaussian_kernel(block, 0.0),
        _ => return Err(CvError::invalid(format!("adaptive method {}", method))),
    };
    let mean = smooth_separable(mat, &kernel, &kernel, Border::Replicate)?;
    let maxval = saturate_u8(maxval as f32);

    let mut out = mat.clone();
    for (v, &m) in out.data_mut().iter_mut().zip(mean.data()) {
        let diff = *v as i32 - m as i32;
        let set = match ty {
            ThresholdType::Binary => diff > -(c.ceil() as i32),
            _ => diff <= -(c.floor() as i32),
        };
        *v = if set { maxval } else { 0 };
    }
    Ok(out)
}
