//! Power-of-two image pyramid and the coordinate maps between its levels.

use crate::GrayImage;

/// Halve both dimensions with a 2x2 box filter (rounded).
///
/// Odd trailing rows/columns are dropped.
pub fn downsample_2x(src: &GrayImage) -> GrayImage {
    let w2 = src.width / 2;
    let h2 = src.height / 2;
    let mut data = Vec::with_capacity(w2 * h2);

    for y in 0..h2 {
        let r0 = 2 * y * src.width;
        let r1 = r0 + src.width;
        for x in 0..w2 {
            let sx = 2 * x;
            let sum = src.data[r0 + sx] as u16
                + src.data[r0 + sx + 1] as u16
                + src.data[r1 + sx] as u16
                + src.data[r1 + sx + 1] as u16;
            data.push(((sum + 2) / 4) as u8);
        }
    }

    GrayImage {
        width: w2,
        height: h2,
        data,
    }
}

/// `levels[0]` is the full-resolution image, `levels[l]` is downsampled by `2^l`.
#[derive(Clone, Debug)]
pub struct Pyramid {
    pub levels: Vec<GrayImage>,
}

impl Pyramid {
    /// Build levels `0..=max_level`, stopping early once an image would be
    /// smaller than 2 pixels on a side.
    pub fn build(base: &GrayImage, max_level: u32) -> Self {
        let mut levels = vec![base.clone()];
        for _ in 0..max_level {
            let Some(last) = levels.last() else { break };
            if last.width < 4 || last.height < 4 {
                break;
            }
            let next = downsample_2x(last);
            levels.push(next);
        }
        Self { levels }
    }

    pub fn level(&self, l: u32) -> Option<&GrayImage> {
        self.levels.get(l as usize)
    }
}

/// Map a pixel coordinate at pyramid `level` to full resolution.
#[inline]
pub fn level_to_full(v: f64, level: u32) -> f64 {
    (v + 0.5) * (1u64 << level) as f64 - 0.5
}

/// Map a full-resolution pixel coordinate to pyramid `level`.
#[inline]
pub fn full_to_level(v: f64, level: u32) -> f64 {
    (v + 0.5) / (1u64 << level) as f64 - 0.5
}
