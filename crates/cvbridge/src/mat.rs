//! Native image buffer
//!
//! A `Mat` is a rectangular, contiguous, interleaved 8-bit pixel array.
//! Three-channel buffers hold BGR, four-channel buffers BGRA. Row stride
//! is always `width * channels`, there is no padding.

use image::{DynamicImage, GrayImage, ImageBuffer, Luma, LumaA, Rgb, Rgba};

use crate::config;
use crate::error::{CvError, Result};

/// Image buffer behind an image handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mat {
    width: u32,
    height: u32,
    channels: u8,
    data: Vec<u8>,
}

impl Default for Mat {
    fn default() -> Self {
        Self::empty()
    }
}

impl Mat {
    /// A buffer with no pixels. Reports one channel, like a freshly
    /// constructed single-channel matrix.
    pub fn empty() -> Self {
        Self {
            width: 0,
            height: 0,
            channels: 1,
            data: Vec::new(),
        }
    }

    /// Zero-filled buffer.
    pub fn zeros(width: u32, height: u32, channels: u8) -> Result<Self> {
        Self::check_shape(width, height, channels)?;
        let len = width as usize * height as usize * channels as usize;
        Ok(Self {
            width,
            height,
            channels,
            data: vec![0; len],
        })
    }

    /// Wrap existing interleaved pixel data. `data.len()` must equal
    /// `width * height * channels`.
    pub fn from_raw(width: u32, height: u32, channels: u8, data: Vec<u8>) -> Result<Self> {
        Self::check_shape(width, height, channels)?;
        let expected = width as usize * height as usize * channels as usize;
        if data.len() != expected {
            return Err(CvError::invalid(format!(
                "pixel data is {} bytes, expected {}",
                data.len(),
                expected
            )));
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    fn check_shape(width: u32, height: u32, channels: u8) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(CvError::invalid(format!(
                "dimensions {}x{} must be positive",
                width, height
            )));
        }
        // Hosts read dimensions back as C `int`.
        if width > i32::MAX as u32 || height > i32::MAX as u32 {
            return Err(CvError::invalid(format!(
                "dimensions {}x{} exceed the C int range",
                width, height
            )));
        }
        if !(1..=4).contains(&channels) {
            return Err(CvError::invalid(format!("channel count {}", channels)));
        }
        config::current().check_pixels(width, height)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Channel values of the pixel at `(x, y)`.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let c = self.channels as usize;
        let i = (y as usize * self.width as usize + x as usize) * c;
        &self.data[i..i + c]
    }

    #[inline]
    pub fn pixel_mut(&mut self, x: u32, y: u32) -> &mut [u8] {
        let c = self.channels as usize;
        let i = (y as usize * self.width as usize + x as usize) * c;
        &mut self.data[i..i + c]
    }

    /// Replace this buffer's contents in place; the handle address is kept.
    pub fn assign(&mut self, other: Mat) {
        *self = other;
    }

    pub(crate) fn ensure_not_empty(&self) -> Result<()> {
        if self.is_empty() {
            return Err(CvError::EmptyImage);
        }
        Ok(())
    }

    pub(crate) fn require_channels(&self, op: &'static str, accepted: &[u8]) -> Result<()> {
        self.ensure_not_empty()?;
        if !accepted.contains(&self.channels) {
            return Err(CvError::UnsupportedChannels {
                op,
                channels: self.channels,
            });
        }
        Ok(())
    }

    /// Per-pixel conversion into a buffer with `out_channels` channels.
    pub(crate) fn map_pixels<F>(&self, out_channels: u8, f: F) -> Mat
    where
        F: Fn(&[u8], &mut [u8]),
    {
        let n = self.width as usize * self.height as usize;
        let mut data = vec![0u8; n * out_channels as usize];
        for (src, dst) in self
            .data
            .chunks_exact(self.channels as usize)
            .zip(data.chunks_exact_mut(out_channels as usize))
        {
            f(src, dst);
        }
        Mat {
            width: self.width,
            height: self.height,
            channels: out_channels,
            data,
        }
    }

    /// Copy the listed channels, in order, into a new buffer.
    pub(crate) fn select_channels(&self, indices: &[usize]) -> Mat {
        self.map_pixels(indices.len() as u8, |src, dst| {
            for (d, &i) in dst.iter_mut().zip(indices) {
                *d = src[i];
            }
        })
    }

    /// Interleave the channels of several same-sized buffers.
    pub(crate) fn merge(parts: &[Mat]) -> Result<Mat> {
        let first = parts.first().ok_or(CvError::EmptyImage)?;
        let (w, h) = (first.width, first.height);
        if parts.iter().any(|p| p.width != w || p.height != h) {
            return Err(CvError::invalid("merge: size mismatch"));
        }
        let channels: u8 = parts.iter().map(|p| p.channels).sum();
        let mut data = Vec::with_capacity(w as usize * h as usize * channels as usize);
        for i in 0..(w as usize * h as usize) {
            for part in parts {
                let c = part.channels as usize;
                data.extend_from_slice(&part.data[i * c..i * c + c]);
            }
        }
        Mat::from_raw(w, h, channels, data)
    }

    /// One single-channel plane per channel.
    pub(crate) fn split(&self) -> Vec<GrayImage> {
        (0..self.channels as usize)
            .map(|c| {
                let plane = self.data[c..]
                    .iter()
                    .step_by(self.channels as usize)
                    .copied()
                    .collect();
                GrayImage::from_raw(self.width, self.height, plane)
                    .unwrap_or_else(|| GrayImage::new(self.width, self.height))
            })
            .collect()
    }

    /// Inverse of [`Mat::split`].
    pub(crate) fn from_planes(planes: Vec<GrayImage>) -> Result<Mat> {
        let parts: Vec<Mat> = planes.into_iter().map(Mat::from_gray).collect();
        Mat::merge(&parts)
    }

    /// Apply `f` to every channel plane independently.
    pub(crate) fn map_planes<F>(&self, f: F) -> Result<Mat>
    where
        F: Fn(&GrayImage) -> GrayImage,
    {
        let planes = self.split().iter().map(f).collect();
        Mat::from_planes(planes)
    }

    pub(crate) fn from_gray(img: GrayImage) -> Mat {
        let (width, height) = img.dimensions();
        Mat {
            width,
            height,
            channels: 1,
            data: img.into_raw(),
        }
    }

    /// View of a single-channel buffer as a `GrayImage`.
    pub(crate) fn to_gray_image(&self) -> Result<GrayImage> {
        self.require_channels("gray view", &[1])?;
        GrayImage::from_raw(self.width, self.height, self.data.clone())
            .ok_or_else(|| CvError::invalid("gray view: buffer too small"))
    }

    /// Wrap the raw channel bytes, without reordering, in a `DynamicImage`
    /// of matching layout.
    pub(crate) fn to_dynamic(&self) -> Result<DynamicImage> {
        self.ensure_not_empty()?;
        let (w, h, data) = (self.width, self.height, self.data.clone());
        let img = match self.channels {
            1 => ImageBuffer::<Luma<u8>, _>::from_raw(w, h, data).map(DynamicImage::ImageLuma8),
            2 => ImageBuffer::<LumaA<u8>, _>::from_raw(w, h, data).map(DynamicImage::ImageLumaA8),
            3 => ImageBuffer::<Rgb<u8>, _>::from_raw(w, h, data).map(DynamicImage::ImageRgb8),
            4 => ImageBuffer::<Rgba<u8>, _>::from_raw(w, h, data).map(DynamicImage::ImageRgba8),
            c => {
                return Err(CvError::UnsupportedChannels {
                    op: "to_dynamic",
                    channels: c,
                })
            }
        };
        img.ok_or_else(|| CvError::invalid("buffer too small for dimensions"))
    }

    /// Inverse of [`Mat::to_dynamic`]; channel bytes are kept as they are.
    pub(crate) fn from_dynamic(img: DynamicImage) -> Result<Mat> {
        let (width, height) = (img.width(), img.height());
        let (channels, data) = match img {
            DynamicImage::ImageLuma8(b) => (1, b.into_raw()),
            DynamicImage::ImageLumaA8(b) => (2, b.into_raw()),
            DynamicImage::ImageRgb8(b) => (3, b.into_raw()),
            DynamicImage::ImageRgba8(b) => (4, b.into_raw()),
            other => (3, other.to_rgb8().into_raw()),
        };
        Mat::from_raw(width, height, channels, data)
    }
}
