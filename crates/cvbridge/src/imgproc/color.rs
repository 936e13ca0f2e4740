//! Color space conversions (8-bit)
//!
//! Hue is stored halved (0..180) so it fits a byte; Lab is scaled to
//! `L * 255 / 100`, `a + 128`, `b + 128`. BGR sources may carry a fourth
//! (alpha) channel, which is dropped.

use crate::error::{CvError, Result};
use crate::imgproc::saturate_u8;
use crate::mat::Mat;

const BGR_SOURCES: &[u8] = &[3, 4];

/// Conversions reachable through [`cvt_color`], keyed by OpenCV code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorConversion {
    /// `COLOR_BGR2RGB` / `COLOR_RGB2BGR` (4)
    BgrToRgb,
    /// `COLOR_BGR2GRAY` (6)
    BgrToGray,
    /// `COLOR_GRAY2BGR` (8)
    GrayToBgr,
    /// `COLOR_BGR2YCrCb` (36)
    BgrToYCrCb,
    /// `COLOR_YCrCb2BGR` (38)
    YCrCbToBgr,
    /// `COLOR_BGR2HSV` (40)
    BgrToHsv,
    /// `COLOR_BGR2Lab` (44)
    BgrToLab,
    /// `COLOR_HSV2BGR` (54)
    HsvToBgr,
    /// `COLOR_Lab2BGR` (56)
    LabToBgr,
}

impl ColorConversion {
    pub fn from_code(code: i32) -> Result<Self> {
        Ok(match code {
            4 => Self::BgrToRgb,
            6 => Self::BgrToGray,
            8 => Self::GrayToBgr,
            36 => Self::BgrToYCrCb,
            38 => Self::YCrCbToBgr,
            40 => Self::BgrToHsv,
            44 => Self::BgrToLab,
            54 => Self::HsvToBgr,
            56 => Self::LabToBgr,
            _ => return Err(CvError::invalid(format!("color conversion code {}", code))),
        })
    }

    pub fn apply(self, mat: &Mat) -> Result<Mat> {
        match self {
            Self::BgrToRgb => bgr_to_rgb(mat),
            Self::BgrToGray => bgr_to_gray(mat),
            Self::GrayToBgr => gray_to_bgr(mat),
            Self::BgrToYCrCb => bgr_to_ycrcb(mat),
            Self::YCrCbToBgr => ycrcb_to_bgr(mat),
            Self::BgrToHsv => bgr_to_hsv(mat),
            Self::BgrToLab => bgr_to_lab(mat),
            Self::HsvToBgr => hsv_to_bgr(mat),
            Self::LabToBgr => lab_to_bgr(mat),
        }
    }
}

/// Convert with an OpenCV color conversion code.
pub fn cvt_color(mat: &Mat, code: i32) -> Result<Mat> {
    ColorConversion::from_code(code)?.apply(mat)
}

/// Swap channels 0 and 2, keeping any alpha channel. Buffers with fewer
/// than three channels are copied unchanged.
pub fn swap_red_blue(mat: &Mat) -> Mat {
    match mat.channels() {
        3 => mat.select_channels(&[2, 1, 0]),
        4 => mat.select_channels(&[2, 1, 0, 3]),
        _ => mat.clone(),
    }
}

#[inline]
fn luma(b: u8, g: u8, r: u8) -> f32 {
    0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32
}

pub fn bgr_to_gray(mat: &Mat) -> Result<Mat> {
    mat.require_channels("bgr_to_gray", BGR_SOURCES)?;
    Ok(mat.map_pixels(1, |s, d| d[0] = saturate_u8(luma(s[0], s[1], s[2]))))
}

pub fn gray_to_bgr(mat: &Mat) -> Result<Mat> {
    mat.require_channels("gray_to_bgr", &[1])?;
    Ok(mat.map_pixels(3, |s, d| d.fill(s[0])))
}

pub fn bgr_to_rgb(mat: &Mat) -> Result<Mat> {
    mat.require_channels("bgr_to_rgb", BGR_SOURCES)?;
    Ok(mat.select_channels(&[2, 1, 0]))
}

pub fn bgr_to_ycrcb(mat: &Mat) -> Result<Mat> {
    mat.require_channels("bgr_to_ycrcb", BGR_SOURCES)?;
    Ok(mat.map_pixels(3, |s, d| {
        let y = luma(s[0], s[1], s[2]);
        d[0] = saturate_u8(y);
        d[1] = saturate_u8((s[2] as f32 - y) * 0.713 + 128.0);
        d[2] = saturate_u8((s[0] as f32 - y) * 0.564 + 128.0);
    }))
}

pub fn ycrcb_to_bgr(mat: &Mat) -> Result<Mat> {
    mat.require_channels("ycrcb_to_bgr", &[3])?;
    Ok(mat.map_pixels(3, |s, d| {
        let y = s[0] as f32;
        let cr = s[1] as f32 - 128.0;
        let cb = s[2] as f32 - 128.0;
        d[0] = saturate_u8(y + 1.773 * cb);
        d[1] = saturate_u8(y - 0.714 * cr - 0.344 * cb);
        d[2] = saturate_u8(y + 1.403 * cr);
    }))
}

pub fn bgr_to_hsv(mat: &Mat) -> Result<Mat> {
    mat.require_channels("bgr_to_hsv", BGR_SOURCES)?;
    Ok(mat.map_pixels(3, |s, d| {
        let (b, g, r) = (s[0] as f32, s[1] as f32, s[2] as f32);
        let v = r.max(g).max(b);
        let diff = v - r.min(g).min(b);
        let sat = if v > 0.0 { 255.0 * diff / v } else { 0.0 };
        let mut h = if diff == 0.0 {
            0.0
        } else if v == r {
            60.0 * (g - b) / diff
        } else if v == g {
            120.0 + 60.0 * (b - r) / diff
        } else {
            240.0 + 60.0 * (r - g) / diff
        };
        if h < 0.0 {
            h += 360.0;
        }
        let h = (h / 2.0).round() as u32 % 180;
        d[0] = h as u8;
        d[1] = saturate_u8(sat);
        d[2] = saturate_u8(v);
    }))
}

pub fn hsv_to_bgr(mat: &Mat) -> Result<Mat> {
    mat.require_channels("hsv_to_bgr", &[3])?;
    Ok(mat.map_pixels(3, |s, d| {
        let h = (s[0] as f32 * 2.0) % 360.0;
        let sat = s[1] as f32 / 255.0;
        let v = s[2] as f32 / 255.0;
        let (r, g, b) = if sat == 0.0 {
            (v, v, v)
        } else {
            let hh = h / 60.0;
            let sector = hh.floor() as i32 % 6;
            let f = hh - hh.floor();
            let p = v * (1.0 - sat);
            let q = v * (1.0 - sat * f);
            let t = v * (1.0 - sat * (1.0 - f));
            match sector {
                0 => (v, t, p),
                1 => (q, v, p),
                2 => (p, v, t),
                3 => (p, q, v),
                4 => (t, p, v),
                _ => (v, p, q),
            }
        };
        d[0] = saturate_u8(b * 255.0);
        d[1] = saturate_u8(g * 255.0);
        d[2] = saturate_u8(r * 255.0);
    }))
}

const LAB_EPS: f32 = 0.008856;
const LAB_KAPPA: f32 = 903.3;
const WHITE_X: f32 = 0.950456;
const WHITE_Z: f32 = 1.088754;

#[inline]
fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

#[inline]
fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.0031308 {
        12.92 * c
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

#[inline]
fn lab_f(t: f32) -> f32 {
    if t > LAB_EPS {
        t.cbrt()
    } else {
        7.787 * t + 16.0 / 116.0
    }
}

#[inline]
fn lab_f_inv(f: f32) -> f32 {
    let t = f * f * f;
    if t > LAB_EPS {
        t
    } else {
        (f - 16.0 / 116.0) / 7.787
    }
}

pub fn bgr_to_lab(mat: &Mat) -> Result<Mat> {
    mat.require_channels("bgr_to_lab", BGR_SOURCES)?;
    Ok(mat.map_pixels(3, |s, d| {
        let b = srgb_to_linear(s[0] as f32 / 255.0);
        let g = srgb_to_linear(s[1] as f32 / 255.0);
        let r = srgb_to_linear(s[2] as f32 / 255.0);
        let x = (0.412453 * r + 0.357580 * g + 0.180423 * b) / WHITE_X;
        let y = 0.212671 * r + 0.715160 * g + 0.072169 * b;
        let z = (0.019334 * r + 0.119193 * g + 0.950227 * b) / WHITE_Z;
        let l = if y > LAB_EPS {
            116.0 * y.cbrt() - 16.0
        } else {
            LAB_KAPPA * y
        };
        let (fx, fy, fz) = (lab_f(x), lab_f(y), lab_f(z));
        d[0] = saturate_u8(l * 255.0 / 100.0);
        d[1] = saturate_u8(500.0 * (fx - fy) + 128.0);
        d[2] = saturate_u8(200.0 * (fy - fz) + 128.0);
    }))
}

pub fn lab_to_bgr(mat: &Mat) -> Result<Mat> {
    mat.require_channels("lab_to_bgr", &[3])?;
    Ok(mat.map_pixels(3, |s, d| {
        let l = s[0] as f32 * 100.0 / 255.0;
        let a = s[1] as f32 - 128.0;
        let bb = s[2] as f32 - 128.0;
        let fy = (l + 16.0) / 116.0;
        let y = if l > LAB_KAPPA * LAB_EPS {
            fy * fy * fy
        } else {
            l / LAB_KAPPA
        };
        let x = lab_f_inv(fy + a / 500.0) * WHITE_X;
        let z = lab_f_inv(fy - bb / 200.0) * WHITE_Z;
        let r = 3.240479 * x - 1.537150 * y - 0.498535 * z;
        let g = -0.969256 * x + 1.875991 * y + 0.041556 * z;
        let b = 0.055648 * x - 0.204043 * y + 1.057311 * z;
        d[0] = saturate_u8(linear_to_srgb(b.clamp(0.0, 1.0)) * 255.0);
        d[1] = saturate_u8(linear_to_srgb(g.clamp(0.0, 1.0)) * 255.0);
        d[2] = saturate_u8(linear_to_srgb(r.clamp(0.0, 1.0)) * 255.0);
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn px(b: u8, g: u8, r: u8) -> Mat {
        Mat::from_raw(1, 1, 3, vec![b, g, r]).unwrap()
    }

    fn close(a: &[u8], b: &[u8], tol: i32) -> bool {
        a.iter()
            .zip(b)
            .all(|(&x, &y)| (x as i32 - y as i32).abs() <= tol)
    }

    #[test]
    fn test_gray_weights() {
        assert_eq!(bgr_to_gray(&px(0, 0, 255)).unwrap().data(), &[76]);
        assert_eq!(bgr_to_gray(&px(255, 0, 0)).unwrap().data(), &[29]);
        assert_eq!(bgr_to_gray(&px(255, 255, 255)).unwrap().data(), &[255]);
    }

    #[test]
    fn test_gray_requires_color_input() {
        let gray = Mat::zeros(2, 2, 1).unwrap();
        assert!(matches!(
            bgr_to_gray(&gray),
            Err(CvError::UnsupportedChannels { channels: 1, .. })
        ));
        assert!(bgr_to_gray(&Mat::empty()).is_err());
    }

    #[test]
    fn test_rgb_swaps_outer_channels() {
        assert_eq!(bgr_to_rgb(&px(1, 2, 3)).unwrap().data(), &[3, 2, 1]);
    }

    #[test]
    fn test_hsv_primaries() {
        assert_eq!(bgr_to_hsv(&px(0, 0, 255)).unwrap().data(), &[0, 255, 255]);
        assert_eq!(bgr_to_hsv(&px(0, 255, 0)).unwrap().data(), &[60, 255, 255]);
        assert_eq!(bgr_to_hsv(&px(255, 0, 0)).unwrap().data(), &[120, 255, 255]);
        assert_eq!(bgr_to_hsv(&px(0, 0, 0)).unwrap().data(), &[0, 0, 0]);
    }

    #[test]
    fn test_hsv_roundtrip() {
        for bgr in [[10u8, 200, 30], [250, 120, 5], [90, 90, 90], [0, 128, 255]] {
            let m = px(bgr[0], bgr[1], bgr[2]);
            let back = hsv_to_bgr(&bgr_to_hsv(&m).unwrap()).unwrap();
            assert!(close(back.data(), &bgr, 4), "{:?} -> {:?}", bgr, back.data());
        }
    }

    #[test]
    fn test_lab_white_and_black() {
        assert!(close(bgr_to_lab(&px(255, 255, 255)).unwrap().data(), &[255, 128, 128], 1));
        assert!(close(bgr_to_lab(&px(0, 0, 0)).unwrap().data(), &[0, 128, 128], 1));
    }

    #[test]
    fn test_lab_roundtrip() {
        for bgr in [[10u8, 200, 30], [250, 120, 5], [90, 90, 90]] {
            let m = px(bgr[0], bgr[1], bgr[2]);
            let back = lab_to_bgr(&bgr_to_lab(&m).unwrap()).unwrap();
            assert!(close(back.data(), &bgr, 4), "{:?} -> {:?}", bgr, back.data());
        }
    }

    #[test]
    fn test_ycrcb_roundtrip() {
        let m = px(40, 160, 220);
        let back = ycrcb_to_bgr(&bgr_to_ycrcb(&m).unwrap()).unwrap();
        assert!(close(back.data(), &[40, 160, 220], 2));
    }

    #[test]
    fn test_cvt_color_codes() {
        let m = px(1, 2, 3);
        assert_eq!(cvt_color(&m, 4).unwrap().data(), &[3, 2, 1]);
        assert_eq!(cvt_color(&m, 6).unwrap().channels(), 1);
        assert!(cvt_color(&m, 999).is_err());
        let gray = Mat::from_raw(1, 1, 1, vec![7]).unwrap();
        assert_eq!(cvt_color(&gray, 8).unwrap().data(), &[7, 7, 7]);
    }
}
