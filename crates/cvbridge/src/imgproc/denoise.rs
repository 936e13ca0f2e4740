//! Non-local means denoising
//!
//! Patch distances are taken from summed-area tables: for every search
//! offset the squared difference between the image and its shifted copy
//! is integrated once, after which each patch sum costs four lookups.

use image::GrayImage;
use imageproc::integral_image::{integral_squared_image, sum_image_pixels};

use crate::error::{CvError, Result};
use crate::imgproc::color::{bgr_to_lab, lab_to_bgr};
use crate::imgproc::{positive, saturate_u8, Border};
use crate::mat::Mat;

/// Channel planes extended by `pad` pixels on every side (reflect-101).
fn padded_planes(mat: &Mat, pad: usize) -> Vec<Vec<u8>> {
    let (w, h, c) = (
        mat.width() as usize,
        mat.height() as usize,
        mat.channels() as usize,
    );
    let (pw, ph) = (w + 2 * pad, h + 2 * pad);
    let src = mat.data();
    (0..c)
        .map(|ch| {
            let mut plane = Vec::with_capacity(pw * ph);
            for py in 0..ph {
                let sy = Border::Reflect101.index(py as isize - pad as isize, h);
                for px in 0..pw {
                    let sx = Border::Reflect101.index(px as isize - pad as isize, w);
                    plane.push(src[(sy * w + sx) * c + ch]);
                }
            }
            plane
        })
        .collect()
}

/// Non-local means over all channels of `mat` jointly.
///
/// Each output pixel averages the pixels of a `search`×`search` window,
/// weighted by `exp(-d / h²)` where `d` is the mean squared difference of
/// the `template`×`template` patches around both pixels.
fn nl_means(mat: &Mat, h: f32, template: i32, search: i32) -> Result<Mat> {
    mat.ensure_not_empty()?;
    let tr = (positive("template window", template)? / 2) as usize;
    let sr = (positive("search window", search)? / 2) as usize;
    if h <= 0.0 {
        return Ok(mat.clone());
    }

    let (w, ht, c) = (
        mat.width() as usize,
        mat.height() as usize,
        mat.channels() as usize,
    );
    let pad = sr + tr;
    let pw = w + 2 * pad;
    let planes = padded_planes(mat, pad);
    // Patches of every output pixel, as a window into the padded planes
    // starting at (sr, sr).
    let (rw, rh) = (w + 2 * tr, ht + 2 * tr);
    let patch_norm = ((2 * tr + 1) * (2 * tr + 1) * c) as f32;
    let inv_h2 = 1.0 / (h * h);

    let mut acc = vec![0f32; w * ht * c];
    let mut wsum = vec![0f32; w * ht];
    let mut dist = vec![0u64; w * ht];
    let mut diff = GrayImage::new(rw as u32, rh as u32);
    for qy in 0..=2 * sr {
        for qx in 0..=2 * sr {
            dist.fill(0);
            for plane in &planes {
                let buf: &mut [u8] = &mut diff;
                for y in 0..rh {
                    let a = &plane[(y + sr) * pw + sr..][..rw];
                    let b = &plane[(y + qy) * pw + qx..][..rw];
                    let row = &mut buf[y * rw..(y + 1) * rw];
                    for (d, (&p, &q)) in row.iter_mut().zip(a.iter().zip(b)) {
                        *d = p.abs_diff(q);
                    }
                }
                let integral = integral_squared_image::<_, u64>(&diff);
                for y in 0..ht {
                    for x in 0..w {
                        let (l, t) = (x as u32, y as u32);
                        let r = l + 2 * tr as u32;
                        let bt = t + 2 * tr as u32;
                        dist[y * w + x] += sum_image_pixels(&integral, l, t, r, bt)[0];
                    }
                }
            }
            for y in 0..ht {
                let row = (y + tr + qy) * pw + tr + qx;
                for x in 0..w {
                    let i = y * w + x;
                    let weight = (-(dist[i] as f32 / patch_norm) * inv_h2).exp();
                    for (ch, plane) in planes.iter().enumerate() {
                        acc[i * c + ch] += weight * plane[row + x] as f32;
                    }
                    wsum[i] += weight;
                }
            }
        }
    }

    let out = acc
        .iter()
        .enumerate()
        .map(|(i, a)| saturate_u8(a / wsum[i / c]))
        .collect();
    Mat::from_raw(mat.width(), mat.height(), mat.channels(), out)
}

/// Denoise a buffer of any channel count with filter strength `h`.
pub fn denoise(mat: &Mat, h: f32, template_window: i32, search_window: i32) -> Result<Mat> {
    nl_means(mat, h, template_window, search_window)
}

/// Denoise a BGR buffer in Lab space: lightness with `h`, the two color
/// components together with `h_color`.
pub fn denoise_colored(
    mat: &Mat,
    h: f32,
    h_color: f32,
    template_window: i32,
    search_window: i32,
) -> Result<Mat> {
    if !matches!(mat.channels(), 3 | 4) {
        return Err(CvError::UnsupportedChannels {
            op: "denoise_colored",
            channels: mat.channels(),
        });
    }
    let lab = bgr_to_lab(mat)?;
    let l = nl_means(&lab.select_channels(&[0]), h, template_window, search_window)?;
    let ab = nl_means(
        &lab.select_channels(&[1, 2]),
        h_color,
        template_window,
        search_window,
    )?;
    lab_to_bgr(&Mat::merge(&[l, ab])?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn speckled() -> Mat {
        let mut m = Mat::zeros(9, 9, 1).unwrap();
        m.data_mut().fill(100);
        m.pixel_mut(4, 4)[0] = 130;
        m
    }

    #[test]
    fn test_flat_image_unchanged() {
        let mut m = Mat::zeros(6, 6, 1).unwrap();
        m.data_mut().fill(77);
        assert_eq!(denoise(&m, 10.0, 3, 5).unwrap(), m);
    }

    #[test]
    fn test_outlier_pulled_towards_background() {
        let out = denoise(&speckled(), 30.0, 3, 7).unwrap();
        let v = out.pixel(4, 4)[0];
        assert!(v < 130 && v >= 100, "got {}", v);
    }

    #[test]
    fn test_zero_strength_copies() {
        assert_eq!(denoise(&speckled(), 0.0, 3, 7).unwrap(), speckled());
    }

    #[test]
    fn test_invalid_windows() {
        assert!(denoise(&speckled(), 10.0, 0, 7).is_err());
        assert!(denoise(&speckled(), 10.0, 3, -1).is_err());
    }

    #[test]
    fn test_colored_requires_color_and_keeps_flat() {
        assert!(denoise_colored(&speckled(), 3.0, 3.0, 3, 5).is_err());
        let mut m = Mat::zeros(5, 5, 3).unwrap();
        for px in m.data_mut().chunks_exact_mut(3) {
            px.copy_from_slice(&[30, 140, 200]);
        }
        let out = denoise_colored(&m, 5.0, 5.0, 3, 5).unwrap();
        let expected = lab_to_bgr(&bgr_to_lab(&m).unwrap()).unwrap();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_matches_direct_patch_sum() {
        let data: Vec<u8> = (0..7 * 6 * 2).map(|v| ((v * 37) % 251) as u8).collect();
        let m = Mat::from_raw(7, 6, 2, data).unwrap();
        let (tr, sr) = (1isize, 2isize);
        let (x, y) = (0isize, 3isize);
        let at = |x: isize, y: isize, ch: usize| {
            let sx = Border::Reflect101.index(x, 7);
            let sy = Border::Reflect101.index(y, 6);
            m.data()[(sy * 7 + sx) * 2 + ch] as f32
        };
        let mut acc = [0f32; 2];
        let mut wsum = 0f32;
        for qy in y - sr..=y + sr {
            for qx in x - sr..=x + sr {
                let mut d = 0f32;
                for oy in -tr..=tr {
                    for ox in -tr..=tr {
                        for ch in 0..2 {
                            let e = at(x + ox, y + oy, ch) - at(qx + ox, qy + oy, ch);
                            d += e * e;
                        }
                    }
                }
                let weight = (-(d / 18.0) / (40.0 * 40.0)).exp();
                for (ch, a) in acc.iter_mut().enumerate() {
                    *a += weight * at(qx, qy, ch);
                }
                wsum += weight;
            }
        }
        let out = denoise(&m, 40.0, 3, 5).unwrap();
        let expected = [saturate_u8(acc[0] / wsum), saturate_u8(acc[1] / wsum)];
        for (got, want) in out.pixel(0, 3).iter().zip(expected) {
            assert!(got.abs_diff(want) <= 1, "got {} want {}", got, want);
        }
    }

    #[test]
    fn test_vga_frame_within_budget() {
        let data: Vec<u8> = (0usize..640 * 480).map(|v| ((v * 7919) % 256) as u8).collect();
        let m = Mat::from_raw(640, 480, 1, data).unwrap();
        let start = Instant::now();
        let out = denoise(&m, 10.0, 7, 21).unwrap();
        assert_eq!((out.width(), out.height()), (640, 480));
        assert!(start.elapsed() < Duration::from_secs(60), "took {:?}", start.elapsed());
    }
}
