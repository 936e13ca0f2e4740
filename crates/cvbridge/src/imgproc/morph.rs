//! Morphology with a square structuring element
//!
//! The element is rebuilt from the requested size on every call and is
//! anchored at `size / 2`. Pixels outside the image never win the min/max,
//! so borders behave as if padded with the neutral value.

use crate::error::{CvError, Result};
use crate::imgproc::positive;
use crate::mat::Mat;

/// OpenCV `MorphTypes`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MorphOp {
    Erode = 0,
    Dilate = 1,
    Open = 2,
    Close = 3,
    Gradient = 4,
    TopHat = 5,
    BlackHat = 6,
}

impl MorphOp {
    pub fn from_code(code: i32) -> Result<Self> {
        Ok(match code {
            0 => Self::Erode,
            1 => Self::Dilate,
            2 => Self::Open,
            3 => Self::Close,
            4 => Self::Gradient,
            5 => Self::TopHat,
            6 => Self::BlackHat,
            _ => return Err(CvError::invalid(format!("morphology op {}", code))),
        })
    }
}

/// Square structuring element
#[derive(Debug, Clone, Copy)]
struct SquareElement {
    size: usize,
    anchor: usize,
}

impl SquareElement {
    fn new(ksize: i32) -> Result<Self> {
        let size = positive("kernel size", ksize)? as usize;
        Ok(Self {
            size,
            anchor: size / 2,
        })
    }

    /// Source range `[lo, hi]` covered when the element is centered on `i`.
    #[inline]
    fn window(&self, i: usize, n: usize) -> (usize, usize) {
        let lo = i.saturating_sub(self.anchor);
        let hi = (i + self.size - 1 - self.anchor).min(n - 1);
        (lo, hi)
    }
}

#[derive(Clone, Copy)]
enum Extremum {
    Min,
    Max,
}

impl Extremum {
    #[inline]
    fn pick(self, a: u8, b: u8) -> u8 {
        match self {
            Extremum::Min => a.min(b),
            Extremum::Max => a.max(b),
        }
    }

    fn neutral(self) -> u8 {
        match self {
            Extremum::Min => u8::MAX,
            Extremum::Max => u8::MIN,
        }
    }
}

/// Separable rectangular min/max filter over every channel.
fn rank_pass(mat: &Mat, element: SquareElement, which: Extremum) -> Mat {
    let (w, h, c) = (
        mat.width() as usize,
        mat.height() as usize,
        mat.channels() as usize,
    );
    let src = mat.data();
    let mut tmp = vec![0u8; src.len()];
    for y in 0..h {
        for x in 0..w {
            let (lo, hi) = element.window(x, w);
            for ch in 0..c {
                let mut v = which.neutral();
                for sx in lo..=hi {
                    v = which.pick(v, src[(y * w + sx) * c + ch]);
                }
                tmp[(y * w + x) * c + ch] = v;
            }
        }
    }
    let mut out = mat.clone();
    let dst = out.data_mut();
    for y in 0..h {
        let (lo, hi) = element.window(y, h);
        for x in 0..w {
            for ch in 0..c {
                let mut v = which.neutral();
                for sy in lo..=hi {
                    v = which.pick(v, tmp[(sy * w + x) * c + ch]);
                }
                dst[(y * w + x) * c + ch] = v;
            }
        }
    }
    out
}

fn iterate(mat: &Mat, ksize: i32, iterations: i32, which: Extremum) -> Result<Mat> {
    mat.ensure_not_empty()?;
    let element = SquareElement::new(ksize)?;
    if iterations <= 0 || element.size == 1 {
        return Ok(mat.clone());
    }
    let mut out = rank_pass(mat, element, which);
    for _ in 1..iterations {
        out = rank_pass(&out, element, which);
    }
    Ok(out)
}

pub fn erode(mat: &Mat, ksize: i32, iterations: i32) -> Result<Mat> {
    iterate(mat, ksize, iterations, Extremum::Min)
}

pub fn dilate(mat: &Mat, ksize: i32, iterations: i32) -> Result<Mat> {
    iterate(mat, ksize, iterations, Extremum::Max)
}

fn difference(a: &Mat, b: &Mat) -> Mat {
    let mut out = a.clone();
    for (o, &v) in out.data_mut().iter_mut().zip(b.data()) {
        *o = o.saturating_sub(v);
    }
    out
}

/// Compound morphology with a single iteration.
pub fn morphology_ex(mat: &Mat, op: i32, ksize: i32) -> Result<Mat> {
    let op = MorphOp::from_code(op)?;
    Ok(match op {
        MorphOp::Erode => erode(mat, ksize, 1)?,
        MorphOp::Dilate => dilate(mat, ksize, 1)?,
        MorphOp::Open => dilate(&erode(mat, ksize, 1)?, ksize, 1)?,
        MorphOp::Close => erode(&dilate(mat, ksize, 1)?, ksize, 1)?,
        MorphOp::Gradient => difference(&dilate(mat, ksize, 1)?, &erode(mat, ksize, 1)?),
        MorphOp::TopHat => {
            let opened = morphology_ex(mat, MorphOp::Open as i32, ksize)?;
            difference(mat, &opened)
        }
        MorphOp::BlackHat => {
            let closed = morphology_ex(mat, MorphOp::Close as i32, ksize)?;
            difference(&closed, mat)
        }
    })
}
