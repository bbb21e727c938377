//! Rotation with an expanding canvas.
//!
//! Quarter turns are exact pixel permutations. Other angles use inverse
//! mapping with bilinear sampling; canvas area not covered by the source
//! stays zeroed (black, or transparent for RGBA).

use image::{DynamicImage, ImageBuffer, Pixel};

/// Bounding box of a `width x height` rectangle rotated by `angle_degrees`.
pub fn compute_rotated_bounds(width: u32, height: u32, angle_degrees: f64) -> (u32, u32) {
    let normalized = angle_degrees.rem_euclid(360.0);
    if normalized.abs() < 1e-9 || (normalized - 180.0).abs() < 1e-9 {
        return (width, height);
    }
    if (normalized - 90.0).abs() < 1e-9 || (normalized - 270.0).abs() < 1e-9 {
        return (height, width);
    }

    let (sin, cos) = normalized.to_radians().sin_cos();
    let (sin, cos) = (sin.abs(), cos.abs());
    let w = f64::from(width);
    let h = f64::from(height);
    // float noise must not push an exact extent up a whole pixel
    let new_w = (w * cos + h * sin - 1e-9).ceil() as u32;
    let new_h = (w * sin + h * cos - 1e-9).ceil() as u32;
    (new_w.max(1), new_h.max(1))
}

/// Rotates counter-clockwise by `degrees`, growing the canvas so no corner is
/// clipped.
pub fn rotate_expanded(image: DynamicImage, degrees: u16) -> DynamicImage {
    match degrees % 360 {
        0 => image,
        90 => image.rotate270(),
        180 => image.rotate180(),
        270 => image.rotate90(),
        other => {
            let angle = f64::from(other);
            match image {
                DynamicImage::ImageRgba8(buffer) => {
                    DynamicImage::ImageRgba8(rotate_buffer(&buffer, angle))
                }
                DynamicImage::ImageRgb8(buffer) => {
                    DynamicImage::ImageRgb8(rotate_buffer(&buffer, angle))
                }
                DynamicImage::ImageLuma8(buffer) => {
                    DynamicImage::ImageLuma8(rotate_buffer(&buffer, angle))
                }
                rest => DynamicImage::ImageRgba8(rotate_buffer(&rest.to_rgba8(), angle)),
            }
        }
    }
}

fn rotate_buffer<P>(
    source: &ImageBuffer<P, Vec<u8>>,
    angle_degrees: f64,
) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8>,
{
    let (src_w, src_h) = source.dimensions();
    let (dst_w, dst_h) = compute_rotated_bounds(src_w, src_h, angle_degrees);
    let mut out: ImageBuffer<P, Vec<u8>> = ImageBuffer::new(dst_w, dst_h);
    if src_w == 0 || src_h == 0 {
        return out;
    }

    let (sin, cos) = angle_degrees.to_radians().sin_cos();
    let src_cx = f64::from(src_w) / 2.0;
    let src_cy = f64::from(src_h) / 2.0;
    let dst_cx = f64::from(dst_w) / 2.0;
    let dst_cy = f64::from(dst_h) / 2.0;
    let channels = usize::from(P::CHANNEL_COUNT);

    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let dx = f64::from(x) + 0.5 - dst_cx;
        let dy = f64::from(y) + 0.5 - dst_cy;
        // inverse of a counter-clockwise turn with y pointing down
        let sx = cos * dx - sin * dy + src_cx;
        let sy = sin * dx + cos * dy + src_cy;
        if let Some(sample) = sample_bilinear(source, sx, sy) {
            pixel.channels_mut().copy_from_slice(&sample[..channels]);
        }
    }
    out
}

fn sample_bilinear<P>(source: &ImageBuffer<P, Vec<u8>>, x: f64, y: f64) -> Option<[u8; 4]>
where
    P: Pixel<Subpixel = u8>,
{
    let (w, h) = source.dimensions();
    if x < 0.0 || y < 0.0 || x > f64::from(w) || y > f64::from(h) {
        return None;
    }

    let fx = (x - 0.5).clamp(0.0, f64::from(w - 1));
    let fy = (y - 0.5).clamp(0.0, f64::from(h - 1));
    let x0 = fx.floor() as u32;
    let y0 = fy.floor() as u32;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let tx = fx - f64::from(x0);
    let ty = fy - f64::from(y0);

    let p00 = source.get_pixel(x0, y0).channels();
    let p10 = source.get_pixel(x1, y0).channels();
    let p01 = source.get_pixel(x0, y1).channels();
    let p11 = source.get_pixel(x1, y1).channels();

    let mut out = [0u8; 4];
    for (c, slot) in out.iter_mut().enumerate().take(usize::from(P::CHANNEL_COUNT)) {
        let top = f64::from(p00[c]) * (1.0 - tx) + f64::from(p10[c]) * tx;
        let bottom = f64::from(p01[c]) * (1.0 - tx) + f64::from(p11[c]) * tx;
        *slot = (top * (1.0 - ty) + bottom * ty).round().clamp(0.0, 255.0) as u8;
    }
    Some(out)
}
