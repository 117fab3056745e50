use crate::GrayImage;

/// Largest radius [`box_blur`] works with; larger radii are clamped. At this
/// size the window already spans many reflection periods of any image, so the
/// mean no longer changes visibly, and `(2r+1)^2 * 255` fits in a `u64`.
pub const MAX_BLUR_RADIUS: usize = 1 << 24;

/// Mirror an out-of-range index back into `0..n` without repeating the edge
/// sample (`gfedcb|abcdefgh|gfedcba`).
#[inline]
fn reflect101(i: i64, n: usize) -> usize {
    if n == 1 {
        return 0;
    }
    let period = 2 * (n as i64 - 1);
    let i = i.rem_euclid(period);
    if i < n as i64 {
        i as usize
    } else {
        (period - i) as usize
    }
}

/// Sum of `sample(reflect101(i))` over `i` in `start..start + len`, in
/// `O(n)` whatever the length.
fn window_sum(n: usize, start: i64, len: u64, sample: impl Fn(usize) -> u64) -> u64 {
    let period = if n == 1 { 1 } else { 2 * (n as u64 - 1) };
    let whole = len / period;
    let rest = len % period;
    let period_sum: u64 = (0..period as i64).map(|i| sample(reflect101(i, n))).sum();
    let partial: u64 = (0..rest as i64).map(|i| sample(reflect101(start + i, n))).sum();
    whole * period_sum + partial
}

/// Normalized box filter with a `(2r+1) x (2r+1)` kernel, in place.
///
/// Borders are mirrored without repeating the edge pixel, also for windows
/// wider than the image. A radius of zero leaves the image untouched; radii
/// above [`MAX_BLUR_RADIUS`] are clamped.
pub fn box_blur(img: &mut GrayImage, radius: usize) {
    if radius == 0 || img.data.is_empty() {
        return;
    }
    let radius = radius.min(MAX_BLUR_RADIUS);
    let w = img.width;
    let h = img.height;
    let r = radius as i64;
    let k = 2 * radius as u64 + 1;

    // Horizontal pass into row sums, then vertical pass.
    let mut rows = vec![0u64; w * h];
    for y in 0..h {
        let src = &img.data[y * w..(y + 1) * w];
        let dst = &mut rows[y * w..(y + 1) * w];
        let mut acc = window_sum(w, -r, k, |i| src[i] as u64);
        for x in 0..w {
            dst[x] = acc;
            let leaving = src[reflect101(x as i64 - r, w)] as u64;
            let entering = src[reflect101(x as i64 + r + 1, w)] as u64;
            acc = acc + entering - leaving;
        }
    }

    let area = k * k;
    for x in 0..w {
        let mut acc = window_sum(h, -r, k, |i| rows[i * w + x]);
        for y in 0..h {
            img.data[y * w + x] = ((acc + area / 2) / area) as u8;
            let leaving = rows[reflect101(y as i64 - r, h) * w + x];
            let entering = rows[reflect101(y as i64 + r + 1, h) * w + x];
            acc = acc + entering - leaving;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reflect_mirrors_without_edge_repeat() {
        assert_eq!(reflect101(-1, 5), 1);
        assert_eq!(reflect101(-2, 5), 2);
        assert_eq!(reflect101(5, 5), 3);
        assert_eq!(reflect101(6, 5), 2);
        assert_eq!(reflect101(3, 1), 0);
        assert_eq!(reflect101(-9, 5), 1);
        assert_eq!(reflect101(i64::MAX, 5), reflect101(i64::MAX % 8, 5));
    }

    #[test]
    fn window_sum_counts_whole_periods() {
        let data = [1u64, 2, 3];
        // Indices -2..5 reflect to 2 1 0 1 2 1 0.
        assert_eq!(window_sum(3, -2, 7, |i| data[i]), 3 + 2 + 1 + 2 + 3 + 2 + 1);
        let slow: u64 = (-40..61).map(|i| data[reflect101(i, 3)]).sum();
        assert_eq!(window_sum(3, -40, 101, |i| data[i]), slow);
    }

    #[test]
    fn constant_image_is_preserved() {
        let mut img = GrayImage::filled(9, 7, 123);
        box_blur(&mut img, 2);
        assert!(img.data.iter().all(|&v| v == 123));
    }

    #[test]
    fn impulse_spreads_over_kernel() {
        let mut img = GrayImage::filled(7, 7, 0);
        img.set(3, 3, 90);
        box_blur(&mut img, 1);
        assert_eq!(img.at(3, 3), 10);
        assert_eq!(img.at(2, 2), 10);
        assert_eq!(img.at(4, 4), 10);
        assert_eq!(img.at(1, 3), 0);
    }

    #[test]
    fn zero_radius_is_identity() {
        let data: Vec<u8> = (0..16).map(|v| v * 10).collect();
        let mut img = GrayImage::new(4, 4, data.clone()).unwrap();
        box_blur(&mut img, 0);
        assert_eq!(img.data, data);
    }

    #[test]
    fn huge_radius_keeps_a_constant_image() {
        let mut img = GrayImage::filled(40, 30, 230);
        box_blur(&mut img, 3000);
        assert!(img.data.iter().all(|&v| v == 230));

        let mut img = GrayImage::filled(7, 5, 255);
        box_blur(&mut img, i32::MAX as usize);
        assert!(img.data.iter().all(|&v| v == 255));
    }

    #[test]
    fn huge_radius_converges_to_the_reflected_mean() {
        // Left half 0, right half 200: one reflection period holds seven of
        // each, so a very wide window averages to 100.
        let mut img = GrayImage::filled(8, 6, 0);
        for y in 0..6 {
            for x in 4..8 {
                img.set(x, y, 200);
            }
        }
        box_blur(&mut img, 3000);
        assert!(img.data.iter().all(|&v| v == 100), "{:?}", img.data);
    }

    #[test]
    fn radius_larger_than_image_stays_in_bounds() {
        let mut img = GrayImage::new(3, 2, vec![0, 50, 100, 150, 200, 250]).unwrap();
        box_blur(&mut img, 4);
        assert_eq!(img.data.len(), 6);
    }
}
