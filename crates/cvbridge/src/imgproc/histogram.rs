//! Histogram equalization

use imageproc::contrast::equalize_histogram;

use crate::error::{CvError, Result};
use crate::imgproc::color::{bgr_to_ycrcb, ycrcb_to_bgr};
use crate::mat::Mat;

/// Equalize brightness.
///
/// Single-channel buffers are equalized directly. Color buffers are taken
/// to YCrCb, only Y is equalized, and the result is converted back to BGR;
/// equalizing B, G and R independently would shift hues.
pub fn equalize_hist(mat: &Mat) -> Result<Mat> {
    mat.ensure_not_empty()?;
    match mat.channels() {
        1 => Ok(Mat::from_gray(equalize_histogram(&mat.to_gray_image()?))),
        3 | 4 => {
            let ycrcb = bgr_to_ycrcb(mat)?;
            let mut planes = ycrcb.split();
            planes[0] = equalize_histogram(&planes[0]);
            ycrcb_to_bgr(&Mat::from_planes(planes)?)
        }
        c => Err(CvError::UnsupportedChannels {
            op: "equalize_hist",
            channels: c,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gray_stretches_range() {
        let data = (0..64u32).map(|i| 100 + (i % 16) as u8).collect();
        let m = Mat::from_raw(8, 8, 1, data).unwrap();
        let out = equalize_hist(&m).unwrap();
        let max = *out.data().iter().max().unwrap();
        let min = *out.data().iter().min().unwrap();
        assert_eq!(max, 255);
        assert!(max - min > 200);
    }

    #[test]
    fn test_gray_color_keeps_gray_axis() {
        // Neutral pixels have Cr = Cb = 128, so only brightness may change.
        let data: Vec<u8> = (0..16u32)
            .flat_map(|i| {
                let v = 100 + i as u8 * 2;
                [v, v, v]
            })
            .collect();
        let m = Mat::from_raw(4, 4, 3, data).unwrap();
        let out = equalize_hist(&m).unwrap();
        assert_eq!(out.channels(), 3);
        for px in out.data().chunks_exact(3) {
            assert!((px[0] as i32 - px[2] as i32).abs() <= 1, "{:?}", px);
            assert!((px[1] as i32 - px[2] as i32).abs() <= 1, "{:?}", px);
        }
        assert!(out.data().iter().any(|&v| v > 240));
    }
}
