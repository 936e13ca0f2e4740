//! Geometric transforms: resize, flip, rotate

use image::imageops::FilterType;

use crate::config;
use crate::error::{CvError, Result};
use crate::imgproc::positive;
use crate::mat::Mat;

/// Map an OpenCV interpolation flag to a resampling filter.
///
/// `INTER_AREA` (3) has no direct counterpart and resamples with the
/// triangle filter, like `INTER_LINEAR`.
pub fn interpolation_filter(interpolation: i32) -> Result<FilterType> {
    Ok(match interpolation {
        0 | 6 => FilterType::Nearest,
        1 | 3 | 5 => FilterType::Triangle,
        2 => FilterType::CatmullRom,
        4 => FilterType::Lanczos3,
        _ => {
            return Err(CvError::invalid(format!(
                "interpolation flag {}",
                interpolation
            )))
        }
    })
}

pub fn resize(mat: &Mat, width: i32, height: i32, interpolation: i32) -> Result<Mat> {
    mat.ensure_not_empty()?;
    let w = positive("width", width)?;
    let h = positive("height", height)?;
    config::current().check_pixels(w, h)?;
    let filter = interpolation_filter(interpolation)?;
    let resized = mat.to_dynamic()?.resize_exact(w, h, filter);
    Mat::from_dynamic(resized)
}

/// `mode == 0` flips around the x axis (upside down), `mode > 0` around
/// the y axis (mirror), `mode < 0` around both.
pub fn flip(mat: &Mat, mode: i32) -> Result<Mat> {
    let img = mat.to_dynamic()?;
    let flipped = match mode {
        0 => img.flipv(),
        m if m > 0 => img.fliph(),
        _ => img.flipv().fliph(),
    };
    Mat::from_dynamic(flipped)
}

/// `ROTATE_90_CLOCKWISE` (0), `ROTATE_180` (1), `ROTATE_90_COUNTERCLOCKWISE` (2).
pub fn rotate(mat: &Mat, code: i32) -> Result<Mat> {
    let img = mat.to_dynamic()?;
    let rotated = match code {
        0 => img.rotate90(),
        1 => img.rotate180(),
        2 => img.rotate270(),
        _ => return Err(CvError::invalid(format!("rotate code {}", code))),
    };
    Mat::from_dynamic(rotated)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 3x2 single-channel image:
    /// ```text
    /// 1 2 3
    /// 4 5 6
    /// ```
    fn grid() -> Mat {
        Mat::from_raw(3, 2, 1, vec![1, 2, 3, 4, 5, 6]).unwrap()
    }

    #[test]
    fn test_flip_modes() {
        assert_eq!(flip(&grid(), 0).unwrap().data(), &[4, 5, 6, 1, 2, 3]);
        assert_eq!(flip(&grid(), 1).unwrap().data(), &[3, 2, 1, 6, 5, 4]);
        assert_eq!(flip(&grid(), -1).unwrap().data(), &[6, 5, 4, 3, 2, 1]);
    }

    #[test]
    fn test_rotate_codes() {
        let cw = rotate(&grid(), 0).unwrap();
        assert_eq!((cw.width(), cw.height()), (2, 3));
        assert_eq!(cw.data(), &[4, 1, 5, 2, 6, 3]);

        let ccw = rotate(&grid(), 2).unwrap();
        assert_eq!(ccw.data(), &[3, 6, 2, 5, 1, 4]);

        assert_eq!(rotate(&grid(), 1).unwrap().data(), &[6, 5, 4, 3, 2, 1]);
        assert!(rotate(&grid(), 3).is_err());
    }

    #[test]
    fn test_resize_nearest_keeps_channels() {
        let m = Mat::from_raw(2, 1, 3, vec![10, 20, 30, 40, 50, 60]).unwrap();
        let r = resize(&m, 4, 2, 0).unwrap();
        assert_eq!((r.width(), r.height(), r.channels()), (4, 2, 3));
        assert_eq!(r.pixel(0, 0), &[10, 20, 30]);
        assert_eq!(r.pixel(3, 1), &[40, 50, 60]);
    }

    #[test]
    fn test_resize_rejects_bad_arguments() {
        assert!(resize(&grid(), 0, 4, 1).is_err());
        assert!(resize(&grid(), 4, 4, 42).is_err());
        assert!(resize(&Mat::empty(), 4, 4, 1).is_err());
    }
}
