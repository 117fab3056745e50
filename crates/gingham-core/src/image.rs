/// Errors raised when wrapping raw grayscale buffers.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    #[error("invalid grayscale image buffer length (expected {expected} bytes, got {got})")]
    InvalidBuffer { expected: usize, got: usize },

    #[error("invalid grayscale image dimensions (width={width}, height={height})")]
    InvalidDimensions { width: usize, height: usize },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl GrayImage {
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Result<Self, ImageError> {
        let expected = checked_area(width, height)?;
        if data.len() != expected {
            return Err(ImageError::InvalidBuffer {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    #[inline]
    pub fn at(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: u8) {
        self.data[y * self.width + x] = v;
    }

    /// Copy the rectangle `[x0, x0+w) x [y0, y0+h)`, clipped to the image.
    ///
    /// Returns the clipped crop and its actual top-left corner.
    pub fn crop(&self, x0: i64, y0: i64, w: usize, h: usize) -> (GrayImage, [usize; 2]) {
        let cx0 = x0.clamp(0, self.width as i64) as usize;
        let cy0 = y0.clamp(0, self.height as i64) as usize;
        let cx1 = (x0 + w as i64).clamp(0, self.width as i64) as usize;
        let cy1 = (y0 + h as i64).clamp(0, self.height as i64) as usize;
        let cw = cx1.saturating_sub(cx0);
        let ch = cy1.saturating_sub(cy0);

        let mut data = Vec::with_capacity(cw * ch);
        for y in cy0..cy1 {
            let row = y * self.width;
            data.extend_from_slice(&self.data[row + cx0..row + cx1]);
        }
        (
            GrayImage {
                width: cw,
                height: ch,
                data,
            },
            [cx0, cy0],
        )
    }
}

fn checked_area(width: usize, height: usize) -> Result<usize, ImageError> {
    if width == 0 || height == 0 {
        return Err(ImageError::InvalidDimensions { width, height });
    }
    width
        .checked_mul(height)
        .ok_or(ImageError::InvalidDimensions { width, height })
}
