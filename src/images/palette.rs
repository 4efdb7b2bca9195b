use std::collections::HashMap;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

// Swatch extraction works on a small thumbnail; the tint does not need more
// resolution than this.
const SAMPLE_EDGE: u32 = 64;
const MUTED_SATURATION_MAX: f32 = 0.65;
const DARK_LUMA_MAX: f32 = 0.5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color {
        r: 255,
        g: 255,
        b: 255,
    };

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Tint pair derived from the displayed image: a dark muted swatch for the
/// viewer background and a light muted swatch for the progress fill.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImagePalette {
    pub background: Color,
    pub progress_fill: Color,
}

impl Default for ImagePalette {
    fn default() -> Self {
        Self {
            background: Color::WHITE,
            progress_fill: Color::WHITE,
        }
    }
}

pub fn extract_palette(image: &DynamicImage) -> ImagePalette {
    let sample = image.thumbnail(SAMPLE_EDGE, SAMPLE_EDGE).to_rgb8();

    let mut dark = SwatchAccumulator::new();
    let mut light = SwatchAccumulator::new();

    for pixel in sample.pixels() {
        let [r, g, b] = pixel.0;
        let (saturation, luma) = saturation_and_luma(r, g, b);
        if saturation > MUTED_SATURATION_MAX {
            continue;
        }
        if luma < DARK_LUMA_MAX {
            dark.add(r, g, b);
        } else {
            light.add(r, g, b);
        }
    }

    ImagePalette {
        background: dark.dominant().unwrap_or(Color::WHITE),
        progress_fill: light.dominant().unwrap_or(Color::WHITE),
    }
}

/// Bins candidate pixels by quantized color and averages the most populated
/// bin into one representative swatch.
struct SwatchAccumulator {
    bins: HashMap<u16, Bin>,
}

#[derive(Default)]
struct Bin {
    count: u64,
    r_sum: u64,
    g_sum: u64,
    b_sum: u64,
}

impl SwatchAccumulator {
    fn new() -> Self {
        Self {
            bins: HashMap::new(),
        }
    }

    fn add(&mut self, r: u8, g: u8, b: u8) {
        let key = ((r as u16 >> 4) << 8) | ((g as u16 >> 4) << 4) | (b as u16 >> 4);
        let bin = self.bins.entry(key).or_default();
        bin.count += 1;
        bin.r_sum += r as u64;
        bin.g_sum += g as u64;
        bin.b_sum += b as u64;
    }

    fn dominant(&self) -> Option<Color> {
        let bin = self.bins.values().max_by_key(|bin| bin.count)?;
        Some(Color {
            r: (bin.r_sum / bin.count) as u8,
            g: (bin.g_sum / bin.count) as u8,
            b: (bin.b_sum / bin.count) as u8,
        })
    }
}

fn saturation_and_luma(r: u8, g: u8, b: u8) -> (f32, f32) {
    let r = r as f32 / 255.0;
    let g = g as f32 / 255.0;
    let b = b as f32 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let saturation = if max == 0.0 { 0.0 } else { (max - min) / max };
    let luma = 0.2126 * r + 0.7152 * g + 0.0722 * b;

    (saturation, luma)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn solid(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)))
    }

    #[test]
    fn solid_dark_image_tints_the_background() {
        let palette = extract_palette(&solid(64, 64, [40, 60, 80]));
        assert_eq!(palette.background, Color { r: 40, g: 60, b: 80 });
        // Nothing light in the image: the fill falls back to white.
        assert_eq!(palette.progress_fill, Color::WHITE);
    }

    #[test]
    fn two_tone_image_yields_both_swatches() {
        let mut pixels = RgbImage::new(64, 64);
        for (_, y, pixel) in pixels.enumerate_pixels_mut() {
            *pixel = if y < 32 {
                Rgb([40, 60, 80])
            } else {
                Rgb([200, 200, 200])
            };
        }
        let palette = extract_palette(&DynamicImage::ImageRgb8(pixels));

        assert_eq!(palette.background, Color { r: 40, g: 60, b: 80 });
        assert_eq!(
            palette.progress_fill,
            Color {
                r: 200,
                g: 200,
                b: 200
            }
        );
    }

    #[test]
    fn vivid_pixels_are_not_swatch_candidates() {
        let palette = extract_palette(&solid(64, 64, [255, 0, 0]));
        assert_eq!(palette.background, Color::WHITE);
        assert_eq!(palette.progress_fill, Color::WHITE);
    }

    #[test]
    fn hex_rendering() {
        let color = Color { r: 40, g: 60, b: 80 };
        assert_eq!(color.to_hex(), "#283c50");
    }
}
