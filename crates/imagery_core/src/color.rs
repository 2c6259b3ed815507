//! Average color sampling.

use crate::Rgb;
use image::{DynamicImage, GenericImageView};

/// Samples per axis the stride is chosen for.
const SAMPLES_PER_AXIS: u32 = 100;

/// Approximate average color of `img`, from at most about 10^4 pixels.
///
/// Pixels are visited on a grid whose stride along each axis is
/// `max(1, dimension / 100)`, columns outer and rows inner. Each channel keeps
/// a running value that is blended 50/50 with every new sample, so later
/// samples weigh more than earlier ones; this is not an arithmetic mean, and
/// stored colors depend on it staying that way. The three running values are
/// finally scaled so that they sum to 255. An image whose samples are all
/// black (or fully transparent) yields `rgb(0,0,0)`.
///
/// Samples are alpha-premultiplied 16-bit channel values.
#[tracing::instrument(skip(img), fields(width = img.width(), height = img.height()))]
pub fn average_color(img: &DynamicImage) -> Rgb {
    let (width, height) = img.dimensions();
    let x_step = (width / SAMPLES_PER_AXIS).max(1);
    let y_step = (height / SAMPLES_PER_AXIS).max(1);

    let (mut r, mut g, mut b) = (0.0f64, 0.0f64, 0.0f64);
    for x in (0..width).step_by(x_step as usize) {
        for y in (0..height).step_by(y_step as usize) {
            let (r2, g2, b2) = premultiplied(img.get_pixel(x, y).0);
            r = (r + r2) / 2.0;
            g = (g + g2) / 2.0;
            b = (b + b2) / 2.0;
        }
    }

    let total = r + g + b;
    if total <= 0.0 {
        return Rgb::default();
    }
    Rgb::new(
        (r / total * 255.0) as u32,
        (g / total * 255.0) as u32,
        (b / total * 255.0) as u32,
    )
}

fn premultiplied([r, g, b, a]: [u8; 4]) -> (f64, f64, f64) {
    let widen = |c: u8| u32::from(c) * 257;
    let alpha = widen(a);
    let channel = |c: u8| f64::from(widen(c) * alpha / 0xffff);
    (channel(r), channel(g), channel(b))
}
