//! Smoothing, edge and derivative filters
//!
//! Kernel sizes that must be odd go through [`odd_kernel`] at the entry of
//! each operation: an even size `n` is used as `n + 1`.

use imageproc::{edges, filter as ip_filter};

use crate::error::{CvError, Result};
use crate::imgproc::color::bgr_to_gray;
use crate::imgproc::{
    correlate_2d, correlate_separable, float_planes, from_float_planes, odd_kernel, saturate_u8,
    Border,
};
use crate::mat::Mat;

/// Sampled, normalized Gaussian. A non-positive `sigma` is derived from
/// the kernel size as `0.3 * ((size - 1) * 0.5 - 1) + 0.8`.
pub fn gaussian_kernel(size: usize, sigma: f64) -> Vec<f32> {
    let sigma = if sigma > 0.0 {
        sigma
    } else {
        0.3 * ((size as f64 - 1.0) * 0.5 - 1.0) + 0.8
    };
    let center = (size as f64 - 1.0) / 2.0;
    let raw: Vec<f64> = (0..size)
        .map(|i| {
            let x = i as f64 - center;
            (-(x * x) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f64 = raw.iter().sum();
    raw.into_iter().map(|v| (v / sum) as f32).collect()
}

pub fn gaussian_blur(mat: &Mat, ksize: i32, sigma: f64) -> Result<Mat> {
    mat.ensure_not_empty()?;
    let k = odd_kernel(ksize);
    if k < 1 {
        return Err(CvError::invalid(format!("gaussian kernel size {}", ksize)));
    }
    let kernel = gaussian_kernel(k as usize, sigma);
    smooth_separable(mat, &kernel, &kernel, Border::Reflect101)
}

/// Separable smoothing of every channel, rounded back to 8 bits.
pub(crate) fn smooth_separable(mat: &Mat, kx: &[f32], ky: &[f32], border: Border) -> Result<Mat> {
    let (w, h) = (mat.width() as usize, mat.height() as usize);
    let planes: Vec<Vec<f32>> = float_planes(mat)
        .iter()
        .map(|p| correlate_separable(p, w, h, kx, ky, border))
        .collect();
    from_float_planes(mat.width(), mat.height(), &planes, saturate_u8)
}

pub fn median_blur(mat: &Mat, ksize: i32) -> Result<Mat> {
    mat.ensure_not_empty()?;
    let k = odd_kernel(ksize);
    if k < 1 {
        return Err(CvError::invalid(format!("median kernel size {}", ksize)));
    }
    let radius = (k / 2) as u32;
    mat.map_planes(|plane| ip_filter::median_filter(plane, radius, radius))
}

/// Edge-preserving smoothing. `d <= 0` derives the neighborhood radius from
/// `sigma_space`; the color distance is the sum of absolute channel
/// differences.
pub fn bilateral_filter(mat: &Mat, d: i32, sigma_color: f64, sigma_space: f64) -> Result<Mat> {
    mat.require_channels("bilateral_filter", &[1, 3])?;
    let sigma_color = if sigma_color <= 0.0 { 1.0 } else { sigma_color };
    let sigma_space = if sigma_space <= 0.0 { 1.0 } else { sigma_space };
    let radius: i64 = if d <= 0 {
        (sigma_space * 1.5).round() as i64
    } else {
        (d / 2) as i64
    };
    let radius = radius.max(1);

    let color_coeff = -0.5 / (sigma_color * sigma_color);
    let space_coeff = -0.5 / (sigma_space * sigma_space);
    let mut offsets = Vec::new();
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let r2 = (dx * dx + dy * dy) as f64;
            if r2.sqrt() <= radius as f64 {
                offsets.push((dx as isize, dy as isize, (r2 * space_coeff).exp()));
            }
        }
    }
    // Color weights indexed by summed absolute difference.
    let c = mat.channels() as usize;
    let color_lut: Vec<f64> = (0..=(255 * c))
        .map(|i| ((i * i) as f64 * color_coeff).exp())
        .collect();

    let (w, h) = (mat.width() as usize, mat.height() as usize);
    let src = mat.data();
    let mut out = vec![0u8; src.len()];
    for y in 0..h {
        for x in 0..w {
            let center = &src[(y * w + x) * c..(y * w + x) * c + c];
            let mut sum = [0f64; 3];
            let mut wsum = 0f64;
            for &(dx, dy, ws) in &offsets {
                let sx = Border::Reflect101.index(x as isize + dx, w);
                let sy = Border::Reflect101.index(y as isize + dy, h);
                let p = &src[(sy * w + sx) * c..(sy * w + sx) * c + c];
                let diff: usize = p
                    .iter()
                    .zip(center)
                    .map(|(&a, &b)| (a as i32 - b as i32).unsigned_abs() as usize)
                    .sum();
                let weight = ws * color_lut[diff];
                for ch in 0..c {
                    sum[ch] += weight * p[ch] as f64;
                }
                wsum += weight;
            }
            for ch in 0..c {
                out[(y * w + x) * c + ch] = saturate_u8((sum[ch] / wsum) as f32);
            }
        }
    }
    Mat::from_raw(mat.width(), mat.height(), mat.channels(), out)
}

/// Canny edge map (single channel, 0 or 255). Color input is converted to
/// gray first; thresholds are ordered so the smaller one is the low one.
pub fn canny(mat: &Mat, threshold1: f64, threshold2: f64) -> Result<Mat> {
    mat.ensure_not_empty()?;
    let gray = match mat.channels() {
        1 => mat.to_gray_image()?,
        _ => bgr_to_gray(mat)?.to_gray_image()?,
    };
    let (low, high) = if threshold1 <= threshold2 {
        (threshold1, threshold2)
    } else {
        (threshold2, threshold1)
    };
    Ok(Mat::from_gray(edges::canny(&gray, low as f32, high as f32)))
}

/// Derivative (`order > 0`) or smoothing (`order == 0`) Sobel kernel.
/// An aperture of 1 means no smoothing: the derivative kernels are the
/// 3-tap differences and the smoothing kernel is `[1]`.
pub fn sobel_kernel(ksize: usize, order: usize) -> Result<Vec<f32>> {
    let size = if ksize == 1 && order > 0 { 3 } else { ksize };
    if order >= size {
        return Err(CvError::invalid(format!(
            "derivative order {} needs an aperture above {}",
            order, ksize
        )));
    }
    let mut k: Vec<i32> = vec![1];
    for _ in 0..(size - order - 1) {
        k = convolve_taps(&k, &[1, 1]);
    }
    for _ in 0..order {
        k = convolve_taps(&k, &[-1, 1]);
    }
    Ok(k.into_iter().map(|v| v as f32).collect())
}

fn convolve_taps(a: &[i32], b: &[i32]) -> Vec<i32> {
    let mut out = vec![0; a.len() + b.len() - 1];
    for (i, &x) in a.iter().enumerate() {
        for (j, &y) in b.iter().enumerate() {
            out[i + j] += x * y;
        }
    }
    out
}

fn check_aperture(ksize: i32) -> Result<usize> {
    let k = odd_kernel(ksize);
    if !(1..=31).contains(&k) {
        return Err(CvError::invalid(format!("aperture size {}", ksize)));
    }
    Ok(k as usize)
}

/// Sobel derivative, saturated to 8 bits (negative responses become 0).
pub fn sobel(mat: &Mat, dx: i32, dy: i32, ksize: i32) -> Result<Mat> {
    mat.ensure_not_empty()?;
    if dx < 0 || dy < 0 || dx + dy == 0 {
        return Err(CvError::invalid(format!("derivative orders ({}, {})", dx, dy)));
    }
    let k = check_aperture(ksize)?;
    let kx = sobel_kernel(k, dx as usize)?;
    let ky = sobel_kernel(k, dy as usize)?;
    smooth_separable(mat, &kx, &ky, Border::Reflect101)
}

/// Laplacian, saturated to 8 bits. Aperture 1 uses the 4-neighbor kernel;
/// larger apertures sum the second Sobel derivatives.
pub fn laplacian(mat: &Mat, ksize: i32) -> Result<Mat> {
    mat.ensure_not_empty()?;
    let k = check_aperture(ksize)?;
    let (w, h) = (mat.width() as usize, mat.height() as usize);
    let planes: Vec<Vec<f32>> = if k == 1 {
        let kernel = [0.0, 1.0, 0.0, 1.0, -4.0, 1.0, 0.0, 1.0, 0.0];
        float_planes(mat)
            .iter()
            .map(|p| correlate_2d(p, w, h, &kernel, 3, Border::Reflect101))
            .collect()
    } else {
        let d2 = sobel_kernel(k, 2)?;
        let s = sobel_kernel(k, 0)?;
        float_planes(mat)
            .iter()
            .map(|p| {
                let xx = correlate_separable(p, w, h, &d2, &s, Border::Reflect101);
                let yy = correlate_separable(p, w, h, &s, &d2, Border::Reflect101);
                xx.iter().zip(&yy).map(|(a, b)| a + b).collect()
            })
            .collect()
    };
    from_float_planes(mat.width(), mat.height(), &planes, saturate_u8)
}

/// 3×3 sharpening with `[0,-1,0; -1,5,-1; 0,-1,0]` on each channel;
/// edge pixels are replicated past the border.
pub fn sharpen(mat: &Mat) -> Result<Mat> {
    mat.ensure_not_empty()?;
    mat.map_planes(ip_filter::sharpen3x3)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noisy(width: u32, height: u32, channels: u8) -> Mat {
        let n = (width * height) as usize * channels as usize;
        let data = (0..n).map(|i| ((i * 37 + i / 7 * 11) % 256) as u8).collect();
        Mat::from_raw(width, height, channels, data).unwrap()
    }

    /// Left half 0, right half 200.
    fn step_edge() -> Mat {
        let mut m = Mat::zeros(8, 8, 1).unwrap();
        for y in 0..8 {
            for x in 4..8 {
                m.pixel_mut(x, y)[0] = 200;
            }
        }
        m
    }

    #[test]
    fn test_gaussian_kernel_normalized_and_symmetric() {
        let k = gaussian_kernel(5, 0.0);
        assert_eq!(k.len(), 5);
        assert!((k.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        assert!((k[0] - k[4]).abs() < 1e-6);
        assert!(k[2] > k[1]);
    }

    #[test]
    fn test_gaussian_even_kernel_matches_next_odd() {
        let m = noisy(12, 9, 3);
        assert_eq!(
            gaussian_blur(&m, 4, 1.2).unwrap(),
            gaussian_blur(&m, 5, 1.2).unwrap()
        );
    }

    #[test]
    fn test_gaussian_keeps_flat_image() {
        let mut m = Mat::zeros(6, 6, 1).unwrap();
        m.data_mut().fill(90);
        assert!(gaussian_blur(&m, 3, 0.0).unwrap().data().iter().all(|&v| v == 90));
    }

    #[test]
    fn test_median_removes_impulse() {
        let mut m = Mat::zeros(5, 5, 1).unwrap();
        m.pixel_mut(2, 2)[0] = 255;
        let out = median_blur(&m, 2).unwrap();
        assert!(out.data().iter().all(|&v| v == 0));
        assert_eq!(median_blur(&m, 2).unwrap(), median_blur(&m, 3).unwrap());
    }

    #[test]
    fn test_bilateral_preserves_edge() {
        let out = bilateral_filter(&step_edge(), 5, 10.0, 5.0).unwrap();
        assert_eq!(out.pixel(0, 4)[0], 0);
        assert_eq!(out.pixel(7, 4)[0], 200);
        assert!(bilateral_filter(&Mat::zeros(2, 2, 4).unwrap(), 3, 1.0, 1.0).is_err());
    }

    #[test]
    fn test_sobel_kernels() {
        assert_eq!(sobel_kernel(3, 0).unwrap(), vec![1.0, 2.0, 1.0]);
        assert_eq!(sobel_kernel(3, 1).unwrap(), vec![-1.0, 0.0, 1.0]);
        assert_eq!(sobel_kernel(3, 2).unwrap(), vec![1.0, -2.0, 1.0]);
        assert_eq!(sobel_kernel(1, 0).unwrap(), vec![1.0]);
        assert_eq!(sobel_kernel(5, 0).unwrap(), vec![1.0, 4.0, 6.0, 4.0, 1.0]);
        assert!(sobel_kernel(3, 3).is_err());
    }

    #[test]
    fn test_sobel_responds_to_vertical_edge() {
        let gx = sobel(&step_edge(), 1, 0, 3).unwrap();
        assert_eq!(gx.pixel(1, 4)[0], 0);
        assert_eq!(gx.pixel(4, 4)[0], 255);
        let gy = sobel(&step_edge(), 0, 1, 3).unwrap();
        assert!(gy.data().iter().all(|&v| v == 0));
        assert!(sobel(&step_edge(), 0, 0, 3).is_err());
        assert_eq!(sobel(&step_edge(), 1, 0, 2).unwrap(), gx);
    }

    #[test]
    fn test_laplacian_flat_is_zero() {
        let mut m = Mat::zeros(5, 5, 1).unwrap();
        m.data_mut().fill(33);
        assert!(laplacian(&m, 1).unwrap().data().iter().all(|&v| v == 0));
        assert!(laplacian(&m, 3).unwrap().data().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_laplacian_point_response() {
        let mut m = Mat::zeros(5, 5, 1).unwrap();
        m.pixel_mut(2, 2)[0] = 10;
        let out = laplacian(&m, 1).unwrap();
        assert_eq!(out.pixel(2, 1)[0], 10);
        assert_eq!(out.pixel(2, 2)[0], 0);
    }

    #[test]
    fn test_sharpen_flat_identity() {
        let mut m = Mat::zeros(4, 4, 3).unwrap();
        m.data_mut().fill(120);
        assert_eq!(sharpen(&m).unwrap(), m);
    }

    #[test]
    fn test_sharpen_per_channel() {
        let mut m = Mat::zeros(3, 3, 3).unwrap();
        for px in m.data_mut().chunks_exact_mut(3) {
            px.copy_from_slice(&[50, 80, 0]);
        }
        m.pixel_mut(1, 1)[0] = 60;
        let out = sharpen(&m).unwrap();
        assert_eq!(out.pixel(1, 1), &[100, 80, 0]);
        assert_eq!(out.pixel(1, 0), &[40, 80, 0]);
        assert_eq!(out.pixel(0, 0), &[50, 80, 0]);
    }

    #[test]
    fn test_canny_finds_step() {
        let mut m = Mat::zeros(16, 16, 1).unwrap();
        for y in 0..16 {
            for x in 8..16 {
                m.pixel_mut(x, y)[0] = 255;
            }
        }
        let edges = canny(&m, 50.0, 150.0).unwrap();
        assert_eq!(edges.channels(), 1);
        assert!(edges.data().iter().any(|&v| v == 255));
        assert!(edges.data().iter().all(|&v| v == 0 || v == 255));
        assert_eq!(edges.pixel(1, 8)[0], 0);
    }
}
