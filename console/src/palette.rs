use crate::constants::PALETTE_SIZE;

pub type Rgb = [u8; 3];

/// The 16 console colours, addressed by palette index.
pub const PALETTE: [Rgb; PALETTE_SIZE] = [
    [0, 0, 0],
    [255, 255, 255],
    [255, 0, 0],
    [0, 255, 0],
    [0, 0, 255],
    [255, 255, 0],
    [255, 0, 255],
    [0, 255, 255],
    [128, 128, 128],
    [128, 0, 0],
    [0, 128, 0],
    [0, 0, 128],
    [128, 128, 0],
    [128, 0, 128],
    [0, 128, 128],
    [192, 192, 192],
];

/// Colour of palette index `index`, if it exists.
pub fn color(index: u8) -> Option<Rgb> {
    PALETTE.get(index as usize).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_endpoints() {
        assert_eq!(color(0), Some([0, 0, 0]));
        assert_eq!(color(1), Some([255, 255, 255]));
        assert_eq!(color(15), Some([192, 192, 192]));
        assert_eq!(color(16), None);
    }
}
