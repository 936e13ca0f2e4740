//! Contour extraction from binary images
//!
//! Any non-zero pixel is foreground. Border following itself is done by
//! `imageproc`; this module applies the retrieval mode and chain
//! approximation on top.

use imageproc::contours::{find_contours as trace_contours, BorderType, Contour};

use crate::error::{CvError, Result};
use crate::mat::Mat;

/// A contour as `(x, y)` points in tracing order
pub type Points = Vec<(i32, i32)>;

/// OpenCV `RetrievalModes`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrievalMode {
    /// Outermost borders only
    External = 0,
    /// Every border, no hierarchy
    List = 1,
    /// Every border, two-level hierarchy
    CComp = 2,
    /// Every border, full hierarchy
    Tree = 3,
}

impl RetrievalMode {
    pub fn from_code(code: i32) -> Result<Self> {
        Ok(match code {
            0 => Self::External,
            1 => Self::List,
            2 => Self::CComp,
            3 => Self::Tree,
            _ => return Err(CvError::invalid(format!("retrieval mode {}", code))),
        })
    }
}

/// OpenCV `ContourApproximationModes`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainApprox {
    /// Every border pixel
    None = 1,
    /// Straight horizontal, vertical and diagonal runs reduced to their end
    /// points. The Teh-Chin flags (3, 4) map here as well.
    Simple = 2,
}

impl ChainApprox {
    pub fn from_code(code: i32) -> Result<Self> {
        Ok(match code {
            1 => Self::None,
            2..=4 => Self::Simple,
            _ => return Err(CvError::invalid(format!("approximation method {}", code))),
        })
    }
}

/// Trace the borders of a single-channel binary image.
pub fn find_contours(mat: &Mat, mode: i32, method: i32) -> Result<Vec<Points>> {
    mat.require_channels("find_contours", &[1])?;
    let mode = RetrievalMode::from_code(mode)?;
    let approx = ChainApprox::from_code(method)?;
    let gray = mat.to_gray_image()?;

    let traced: Vec<Contour<i32>> = trace_contours::<i32>(&gray);
    Ok(traced
        .into_iter()
        .filter(|c| {
            mode != RetrievalMode::External
                || (c.border_type == BorderType::Outer && c.parent.is_none())
        })
        .map(|c| {
            let points: Points = c.points.iter().map(|p| (p.x, p.y)).collect();
            match approx {
                ChainApprox::None => points,
                ChainApprox::Simple => compress_runs(&points),
            }
        })
        .filter(|points| !points.is_empty())
        .collect())
}

/// Keep only the points where the chain changes direction.
pub fn compress_runs(points: &[(i32, i32)]) -> Points {
    let n = points.len();
    if n <= 2 {
        return points.to_vec();
    }
    let step = |a: (i32, i32), b: (i32, i32)| ((b.0 - a.0).signum(), (b.1 - a.1).signum());
    (0..n)
        .filter(|&i| {
            let prev = points[(i + n - 1) % n];
            let next = points[(i + 1) % n];
            step(prev, points[i]) != step(points[i], next)
        })
        .map(|i| points[i])
        .collect()
}
