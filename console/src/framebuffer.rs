use crate::constants::{INTERNAL_HEIGHT, INTERNAL_WIDTH};
use crate::palette::{color, Rgb};

/// Palette-index surface the guest draws on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Framebuffer {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self::new(INTERNAL_WIDTH, INTERNAL_HEIGHT)
    }
}

impl Framebuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn clear(&mut self, index: u8) {
        self.pixels.fill(index);
    }

    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        if x < self.width && y < self.height {
            Some(self.pixels[y * self.width + x])
        } else {
            None
        }
    }

    /// Write one pixel; coordinates outside the surface are clipped.
    /// Returns whether anything was written.
    pub fn set(&mut self, x: i64, y: i64, index: u8) -> bool {
        let (Ok(x), Ok(y)) = (usize::try_from(x), usize::try_from(y)) else {
            return false;
        };
        if x >= self.width || y >= self.height {
            return false;
        }
        self.pixels[y * self.width + x] = index;
        true
    }

    pub fn rgb_at(&self, x: usize, y: usize) -> Option<Rgb> {
        self.get(x, y).and_then(color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_cleared_and_clips_writes() {
        let mut fb = Framebuffer::default();
        assert_eq!(fb.width(), 128);
        assert!(fb.pixels().iter().all(|&p| p == 0));

        assert!(fb.set(5, 6, 3));
        assert_eq!(fb.get(5, 6), Some(3));
        assert!(!fb.set(-1, 0, 3));
        assert!(!fb.set(0, 128, 3));
        assert!(!fb.set(i64::MAX, i64::MIN, 3));
        assert_eq!(fb.get(128, 0), None);

        fb.clear(0);
        assert_eq!(fb.get(5, 6), Some(0));
        assert_eq!(fb.rgb_at(5, 6), Some([0, 0, 0]));
    }
}
