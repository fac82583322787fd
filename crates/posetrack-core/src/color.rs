//! Hue/saturation/value segmentation primitives.
//!
//! Frames are converted once into an [`HsvImage`], thresholded per colour
//! into a binary mask, and reduced to a centroid through image moments.
//! Hue is measured in degrees `[0, 360)`, saturation and value in `[0, 255]`.

use image::{GrayImage, Luma, RgbImage};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Number of hue steps in a full turn.
pub const HUE_RANGE: u16 = 360;

/// Mask value written for pixels inside a threshold window.
pub const MASK_ON: u8 = 255;

/// One pixel in hue/saturation/value form.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Hsv {
    /// Hue in degrees, `0..360`.
    pub h: u16,
    pub s: u8,
    pub v: u8,
}

impl Hsv {
    /// Convert an 8-bit RGB triple.
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = (max - min) as f32;

        let s = if max == 0 {
            0
        } else {
            (255.0 * delta / max as f32).round() as u8
        };

        let h = if delta == 0.0 {
            0.0
        } else if max == r {
            60.0 * (g as f32 - b as f32) / delta
        } else if max == g {
            120.0 + 60.0 * (b as f32 - r as f32) / delta
        } else {
            240.0 + 60.0 * (r as f32 - g as f32) / delta
        };
        let h = h.round().rem_euclid(HUE_RANGE as f32) as u16 % HUE_RANGE;

        Self { h, s, v: max }
    }
}

/// A frame converted to hue/saturation/value, row-major.
#[derive(Clone, Debug)]
pub struct HsvImage {
    pub width: u32,
    pub height: u32,
    pub data: Vec<Hsv>,
}

impl HsvImage {
    pub fn from_rgb(img: &RgbImage) -> Self {
        let data = img
            .pixels()
            .map(|p| Hsv::from_rgb(p[0], p[1], p[2]))
            .collect();
        Self {
            width: img.width(),
            height: img.height(),
            data,
        }
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> Hsv {
        self.data[y as usize * self.width as usize + x as usize]
    }
}

/// Shortest angular distance between two hues, in degrees.
#[inline]
pub fn hue_distance(a: u16, b: u16) -> u16 {
    let d = (a as i32 - b as i32).rem_euclid(HUE_RANGE as i32) as u16;
    d.min(HUE_RANGE - d)
}

/// Colour window used to segment one marker.
///
/// A pixel matches when its hue lies within `hue_delta` of `hue` (wrapping
/// around red) and both saturation and value lie in
/// `[satval_low, satval_high]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorThreshold {
    pub hue: u16,
    pub hue_delta: u16,
    pub satval_low: u8,
    pub satval_high: u8,
}

impl ColorThreshold {
    pub fn new(hue: u16, hue_delta: u16, satval_low: u8, satval_high: u8) -> Self {
        Self {
            hue,
            hue_delta,
            satval_low,
            satval_high,
        }
    }

    #[inline]
    pub fn contains(&self, px: Hsv) -> bool {
        let satval = self.satval_low..=self.satval_high;
        hue_distance(px.h, self.hue % HUE_RANGE) <= self.hue_delta
            && satval.contains(&px.s)
            && satval.contains(&px.v)
    }
}

/// Binary mask of the pixels inside `threshold`: [`MASK_ON`] or 0.
pub fn in_range(hsv: &HsvImage, threshold: &ColorThreshold) -> GrayImage {
    GrayImage::from_fn(hsv.width, hsv.height, |x, y| {
        if threshold.contains(hsv.get(x, y)) {
            Luma([MASK_ON])
        } else {
            Luma([0])
        }
    })
}

/// Zeroth and first order moments of a binary mask.
///
/// Every non-zero pixel counts with weight 1; coordinates are pixel indices.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Moments {
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
}

impl Moments {
    pub fn from_mask(mask: &GrayImage) -> Self {
        let mut m00 = 0u64;
        let mut m10 = 0u64;
        let mut m01 = 0u64;
        for (x, y, px) in mask.enumerate_pixels() {
            if px[0] != 0 {
                m00 += 1;
                m10 += x as u64;
                m01 += y as u64;
            }
        }
        Self {
            m00: m00 as f64,
            m10: m10 as f64,
            m01: m01 as f64,
        }
    }

    /// Mask centroid `(m10 / m00, m01 / m00)`.
    ///
    /// `None` for an empty mask, and for a centroid with a negative
    /// component.
    pub fn centroid(&self) -> Option<Point2<f64>> {
        if self.m00 <= 0.0 {
            return None;
        }
        let x = self.m10 / self.m00;
        let y = self.m01 / self.m00;
        if x < 0.0 || y < 0.0 {
            return None;
        }
        Some(Point2::new(x, y))
    }
}

/// Threshold `hsv` and return the centroid of the matching pixels.
pub fn locate_color(hsv: &HsvImage, threshold: &ColorThreshold) -> Option<Point2<f64>> {
    Moments::from_mask(&in_range(hsv, threshold)).centroid()
}
