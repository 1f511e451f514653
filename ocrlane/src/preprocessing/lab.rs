//! 8-bit CIE L*a*b* (D65 white point).
//!
//! L* is scaled from 0..=100 to 0..=255; a* and b* are offset by 128. The
//! three planes are stored in an `RgbImage` as (L, a, b).

use image::{Rgb, RgbImage};

const WHITE_X: f32 = 0.950_456;
const WHITE_Z: f32 = 1.088_754;

const EPSILON: f32 = 0.008_856;
const KAPPA_SLOPE: f32 = 7.787;
const F_OFFSET: f32 = 16.0 / 116.0;

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.040_45 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

fn lab_f(t: f32) -> f32 {
    if t > EPSILON {
        t.cbrt()
    } else {
        KAPPA_SLOPE * t + F_OFFSET
    }
}

fn lab_f_inv(ft: f32) -> f32 {
    let cubed = ft * ft * ft;
    if cubed > EPSILON {
        cubed
    } else {
        (ft - F_OFFSET) / KAPPA_SLOPE
    }
}

fn to_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

pub fn rgb_to_lab(rgb: [u8; 3]) -> [u8; 3] {
    let [r, g, b] = rgb.map(|c| srgb_to_linear(f32::from(c) / 255.0));

    let x = (0.412_453 * r + 0.357_580 * g + 0.180_423 * b) / WHITE_X;
    let y = 0.212_671 * r + 0.715_160 * g + 0.072_169 * b;
    let z = (0.019_334 * r + 0.119_193 * g + 0.950_227 * b) / WHITE_Z;

    let (fx, fy, fz) = (lab_f(x), lab_f(y), lab_f(z));

    let l = 116.0 * fy - 16.0;
    let a = 500.0 * (fx - fy);
    let bb = 200.0 * (fy - fz);

    [to_u8(l * 255.0 / 100.0), to_u8(a + 128.0), to_u8(bb + 128.0)]
}

pub fn lab_to_rgb(lab: [u8; 3]) -> [u8; 3] {
    let l = f32::from(lab[0]) * 100.0 / 255.0;
    let a = f32::from(lab[1]) - 128.0;
    let bb = f32::from(lab[2]) - 128.0;

    let fy = (l + 16.0) / 116.0;
    let fx = fy + a / 500.0;
    let fz = fy - bb / 200.0;

    let x = WHITE_X * lab_f_inv(fx);
    let y = lab_f_inv(fy);
    let z = WHITE_Z * lab_f_inv(fz);

    let r = 3.240_479 * x - 1.537_150 * y - 0.498_535 * z;
    let g = -0.969_256 * x + 1.875_991 * y + 0.041_556 * z;
    let b = 0.055_648 * x - 0.204_043 * y + 1.057_311 * z;

    [r, g, b].map(|c| to_u8(linear_to_srgb(c.clamp(0.0, 1.0)) * 255.0))
}

pub fn to_lab(img: &RgbImage) -> RgbImage {
    RgbImage::from_fn(img.width(), img.height(), |x, y| {
        Rgb(rgb_to_lab(img.get_pixel(x, y).0))
    })
}

pub fn from_lab(lab: &RgbImage) -> RgbImage {
    RgbImage::from_fn(lab.width(), lab.height(), |x, y| {
        Rgb(lab_to_rgb(lab.get_pixel(x, y).0))
    })
}
