//! In-place drawing primitives
//!
//! Colors arrive as red, green, blue and are written in the buffer's
//! blue, green, red order. A single-channel buffer receives the first
//! written component (blue); a four-channel buffer gets alpha 0.
//! Negative thickness fills the shape.
//!
//! Painting goes straight into the buffer's pixel slice. Geometry is
//! carried in `i64` and clipped to the canvas before any rasterizer sees
//! it, so arbitrary host coordinates cannot overflow.

use image::{ImageBuffer, Luma, Pixel, Rgb, Rgba};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_hollow_circle_mut, draw_line_segment_mut, Canvas,
};

use crate::error::{CvError, Result};
use crate::imgproc::contours::Points;
use crate::mat::Mat;

type Pt = (i64, i64);

/// Drawing color in red, green, blue order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    /// Clamp integer components to the 8-bit range.
    pub fn from_rgb(r: i32, g: i32, b: i32) -> Self {
        let c = |v: i32| v.clamp(0, 255) as u8;
        Self {
            r: c(r),
            g: c(g),
            b: c(b),
        }
    }

    /// Components in buffer order.
    pub fn to_bgr(self) -> [u8; 3] {
        [self.b, self.g, self.r]
    }
}

/// Geometry understood by [`draw`]
#[derive(Debug, Clone, Copy)]
pub enum Shape<'a> {
    /// Axis-aligned rectangle with `x, y` as its top-left corner
    Rectangle {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    },
    Circle {
        center: (i32, i32),
        radius: i32,
    },
    Line {
        from: (i32, i32),
        to: (i32, i32),
    },
    /// Closed polyline through the points
    Polygon(&'a [(i32, i32)]),
}

/// Paint `shape` into `mat`.
pub fn draw(mat: &mut Mat, shape: Shape<'_>, color: Color, thickness: i32) -> Result<()> {
    mat.require_channels("draw", &[1, 3, 4])?;
    let [b, g, r] = color.to_bgr();
    let (w, h, c) = (mat.width(), mat.height(), mat.channels());
    let data = mat.data_mut();
    match c {
        1 => paint_into(w, h, data, Luma([b]), shape, thickness),
        3 => paint_into(w, h, data, Rgb([b, g, r]), shape, thickness),
        _ => paint_into(w, h, data, Rgba([b, g, r, 0]), shape, thickness),
    }
}

pub fn rectangle(
    mat: &mut Mat,
    (x, y, width, height): (i32, i32, i32, i32),
    color: Color,
    thickness: i32,
) -> Result<()> {
    if width <= 0 || height <= 0 {
        return Err(CvError::invalid(format!(
            "rectangle size {}x{}",
            width, height
        )));
    }
    let shape = Shape::Rectangle {
        x,
        y,
        width,
        height,
    };
    draw(mat, shape, color, thickness)
}

pub fn circle(
    mat: &mut Mat,
    center: (i32, i32),
    radius: i32,
    color: Color,
    thickness: i32,
) -> Result<()> {
    if radius < 0 {
        return Err(CvError::invalid(format!("circle radius {}", radius)));
    }
    draw(mat, Shape::Circle { center, radius }, color, thickness)
}

pub fn line(
    mat: &mut Mat,
    from: (i32, i32),
    to: (i32, i32),
    color: Color,
    thickness: i32,
) -> Result<()> {
    draw(mat, Shape::Line { from, to }, color, thickness.max(1))
}

/// Outline (or fill, for negative thickness) one contour, or all of them
/// when `index` is -1. An index outside the set draws nothing.
pub fn draw_contours(
    mat: &mut Mat,
    contours: &[Points],
    index: i32,
    color: Color,
    thickness: i32,
) -> Result<()> {
    mat.require_channels("draw_contours", &[1, 3, 4])?;
    let selected: &[Points] = match index {
        -1 => contours,
        i if i >= 0 && (i as usize) < contours.len() => {
            &contours[i as usize..i as usize + 1]
        }
        _ => return Ok(()),
    };
    for points in selected {
        draw(mat, Shape::Polygon(points), color, thickness)?;
    }
    Ok(())
}

fn paint_into<P>(
    w: u32,
    h: u32,
    data: &mut [u8],
    color: P,
    shape: Shape<'_>,
    thickness: i32,
) -> Result<()>
where
    P: Pixel<Subpixel = u8> + 'static,
{
    let mut canvas = ImageBuffer::<P, &mut [u8]>::from_raw(w, h, data)
        .ok_or_else(|| CvError::invalid("buffer too small for dimensions"))?;
    paint(&mut canvas, shape, color, thickness);
    Ok(())
}

fn paint<C>(canvas: &mut C, shape: Shape<'_>, color: C::Pixel, thickness: i32)
where
    C: Canvas,
    C::Pixel: 'static,
{
    match shape {
        Shape::Rectangle {
            x,
            y,
            width,
            height,
        } => {
            let (x0, y0) = (x as i64, y as i64);
            let (x1, y1) = (x0 + width as i64 - 1, y0 + height as i64 - 1);
            let (left, right) = (x0.min(x1), x0.max(x1));
            let (top, bottom) = (y0.min(y1), y0.max(y1));
            if thickness < 0 {
                for_each_in_box(canvas, (left, top), (right, bottom), |canvas, x, y| {
                    canvas.draw_pixel(x, y, color)
                });
            } else {
                let corners = [(left, top), (right, top), (right, bottom), (left, bottom)];
                stroke_closed(canvas, &corners, color, thickness);
            }
        }
        Shape::Circle { center, radius } => {
            let c = (center.0 as i64, center.1 as i64);
            let r = radius.max(0) as i64;
            match (thickness, rasterizable(canvas, c, r)) {
                (t, Some(c)) if t < 0 => draw_filled_circle_mut(canvas, c, r as i32, color),
                (t, None) if t < 0 => disc(canvas, c, r, color),
                (0 | 1, Some(c)) => draw_hollow_circle_mut(canvas, c, r as i32, color),
                (t, _) => thick_ring(canvas, c, r, t.max(1), color),
            }
        }
        Shape::Line { from, to } => {
            let (a, b) = ((from.0 as i64, from.1 as i64), (to.0 as i64, to.1 as i64));
            segment(canvas, a, b, color, thickness)
        }
        Shape::Polygon(points) => {
            let points: Vec<Pt> = points.iter().map(|&(x, y)| (x as i64, y as i64)).collect();
            if thickness < 0 {
                fill_polygon(canvas, &points, color);
            } else {
                stroke_closed(canvas, &points, color, thickness);
            }
        }
    }
}

/// Center as `i32` when the circle is small and near enough to the canvas
/// for imageproc's midpoint rasterizers. Anything else is scanned over the
/// visible box instead.
fn rasterizable<C: Canvas>(canvas: &C, c: Pt, r: i64) -> Option<(i32, i32)> {
    let (w, h) = canvas.dimensions();
    let span = w as i64 + h as i64;
    if 4 * span > i32::MAX as i64 || r > span {
        return None;
    }
    let near = |v: i64| (-2 * span..=3 * span).contains(&v);
    (near(c.0) && near(c.1)).then_some((c.0 as i32, c.1 as i32))
}

fn segment<C>(canvas: &mut C, from: Pt, to: Pt, color: C::Pixel, thickness: i32)
where
    C: Canvas,
    C::Pixel: 'static,
{
    if thickness > 1 {
        thick_segment(canvas, from, to, thickness, color);
        return;
    }
    let (w, h) = canvas.dimensions();
    let bounds = ((-1.0, -1.0), (w as f64, h as f64));
    if let Some((a, b)) = clip_segment(from, to, bounds) {
        draw_line_segment_mut(canvas, a, b, color);
    }
}

/// Liang-Barsky clip of `a`-`b` to the box `lo..=hi`, rounded to whole
/// pixels. `None` when the segment misses the box.
fn clip_segment(
    a: Pt,
    b: Pt,
    (lo, hi): ((f64, f64), (f64, f64)),
) -> Option<((f32, f32), (f32, f32))> {
    let (ax, ay) = (a.0 as f64, a.1 as f64);
    let (dx, dy) = ((b.0 - a.0) as f64, (b.1 - a.1) as f64);
    let (mut t0, mut t1) = (0.0f64, 1.0f64);
    for (p, q) in [
        (-dx, ax - lo.0),
        (dx, hi.0 - ax),
        (-dy, ay - lo.1),
        (dy, hi.1 - ay),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
        } else {
            let t = q / p;
            if p < 0.0 {
                t0 = t0.max(t);
            } else {
                t1 = t1.min(t);
            }
        }
    }
    if t0 > t1 {
        return None;
    }
    let at = |t: f64| ((ax + t * dx).round() as f32, (ay + t * dy).round() as f32);
    Some((at(t0), at(t1)))
}

fn stroke_closed<C>(canvas: &mut C, points: &[Pt], color: C::Pixel, thickness: i32)
where
    C: Canvas,
    C::Pixel: 'static,
{
    match points {
        [] => {}
        [p] => segment(canvas, *p, *p, color, thickness),
        _ => {
            for (i, &p) in points.iter().enumerate() {
                let q = points[(i + 1) % points.len()];
                segment(canvas, p, q, color, thickness);
            }
        }
    }
}

/// Even-odd scanline fill; rows are half-open at each edge's lower end,
/// the outline stroke then covers the boundary pixels.
fn fill_polygon<C>(canvas: &mut C, points: &[Pt], color: C::Pixel)
where
    C: Canvas,
    C::Pixel: 'static,
{
    let mut poly = points.to_vec();
    poly.dedup();
    while poly.len() > 1 && poly.first() == poly.last() {
        poly.pop();
    }
    if poly.len() >= 3 {
        let (w, h) = canvas.dimensions();
        let (w, h) = (w as i64, h as i64);
        let top = poly.iter().map(|p| p.1).min().unwrap_or(0).max(0);
        let bottom = poly.iter().map(|p| p.1).max().unwrap_or(-1).min(h - 1);
        let mut xs: Vec<f64> = Vec::new();
        for y in top..=bottom {
            xs.clear();
            for (i, &p) in poly.iter().enumerate() {
                let q = poly[(i + 1) % poly.len()];
                let (lo, hi) = if p.1 <= q.1 { (p, q) } else { (q, p) };
                if lo.1 <= y && y < hi.1 {
                    let t = (y - lo.1) as f64 / (hi.1 - lo.1) as f64;
                    xs.push(lo.0 as f64 + t * (hi.0 - lo.0) as f64);
                }
            }
            xs.sort_by(f64::total_cmp);
            for span in xs.chunks_exact(2) {
                let from = (span[0].round() as i64).max(0);
                let to = (span[1].round() as i64).min(w - 1);
                for x in from..=to {
                    canvas.draw_pixel(x as u32, y as u32, color);
                }
            }
        }
    }
    stroke_closed(canvas, &poly, color, 1);
}

/// Visit every in-bounds pixel of the box `[x0, x1] × [y0, y1]`.
fn for_each_in_box<C: Canvas>(
    canvas: &mut C,
    (x0, y0): Pt,
    (x1, y1): Pt,
    mut f: impl FnMut(&mut C, u32, u32),
) {
    let (w, h) = canvas.dimensions();
    let xs = x0.max(0)..=x1.min(w as i64 - 1);
    for y in y0.max(0)..=y1.min(h as i64 - 1) {
        for x in xs.clone() {
            f(canvas, x as u32, y as u32);
        }
    }
}

/// Segment with round caps: every pixel within `thickness / 2` of it.
fn thick_segment<C: Canvas>(canvas: &mut C, a: Pt, b: Pt, thickness: i32, color: C::Pixel) {
    let half = thickness as f64 / 2.0;
    let reach = half.ceil() as i64;
    let (ax, ay) = (a.0 as f64, a.1 as f64);
    let (dx, dy) = ((b.0 - a.0) as f64, (b.1 - a.1) as f64);
    let len2 = dx * dx + dy * dy;
    for_each_in_box(
        canvas,
        (a.0.min(b.0) - reach, a.1.min(b.1) - reach),
        (a.0.max(b.0) + reach, a.1.max(b.1) + reach),
        |canvas, x, y| {
            let (px, py) = (x as f64 - ax, y as f64 - ay);
            let t = if len2 > 0.0 {
                ((px * dx + py * dy) / len2).clamp(0.0, 1.0)
            } else {
                0.0
            };
            if (px - t * dx).hypot(py - t * dy) <= half {
                canvas.draw_pixel(x, y, color);
            }
        },
    );
}

/// Filled circle by distance test over its visible bounding box.
fn disc<C: Canvas>(canvas: &mut C, c: Pt, r: i64, color: C::Pixel) {
    let (cx, cy, rf) = (c.0 as f64, c.1 as f64, r as f64);
    for_each_in_box(canvas, (c.0 - r, c.1 - r), (c.0 + r, c.1 + r), |canvas, x, y| {
        if (x as f64 - cx).hypot(y as f64 - cy) <= rf {
            canvas.draw_pixel(x, y, color);
        }
    });
}

/// Annulus of width `thickness` centered on the circle of `radius`.
fn thick_ring<C: Canvas>(canvas: &mut C, c: Pt, r: i64, thickness: i32, color: C::Pixel) {
    let half = thickness as f64 / 2.0;
    let reach = r + half.ceil() as i64;
    let (cx, cy, rf) = (c.0 as f64, c.1 as f64, r as f64);
    for_each_in_box(
        canvas,
        (c.0 - reach, c.1 - reach),
        (c.0 + reach, c.1 + reach),
        |canvas, x, y| {
            if ((x as f64 - cx).hypot(y as f64 - cy) - rf).abs() <= half {
                canvas.draw_pixel(x, y, color);
            }
        },
    );
}
