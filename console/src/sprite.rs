use crate::constants::{MAX_SPRITE_SIZE, PALETTE_SIZE};

/// The built-in 8x8 smiley drawn by `draw_sprite`.
pub const BUILTIN_SPRITE: [[u8; 8]; 8] = [
    [0, 0, 1, 1, 1, 1, 0, 0],
    [0, 1, 2, 2, 2, 2, 1, 0],
    [1, 2, 3, 2, 2, 3, 2, 1],
    [1, 2, 2, 2, 2, 2, 2, 1],
    [1, 2, 4, 2, 2, 4, 2, 1],
    [1, 2, 2, 2, 2, 2, 2, 1],
    [0, 1, 2, 2, 2, 2, 1, 0],
    [0, 0, 1, 1, 1, 1, 0, 0],
];

/// A validated grid of palette indices. Rows may differ in length; `None`
/// cells are skipped when drawing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sprite {
    rows: Vec<Vec<Option<u8>>>,
}

impl Sprite {
    /// Build a sprite from raw cells. Returns `None` when the grid is larger
    /// than [`MAX_SPRITE_SIZE`] in either direction. Cells outside the
    /// palette become transparent.
    pub fn from_cells(rows: Vec<Vec<Option<i64>>>) -> Option<Self> {
        if rows.len() > MAX_SPRITE_SIZE || rows.iter().any(|r| r.len() > MAX_SPRITE_SIZE) {
            return None;
        }
        let rows = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|cell| {
                        cell.filter(|c| (0..PALETTE_SIZE as i64).contains(c))
                            .map(|c| c as u8)
                    })
                    .collect()
            })
            .collect();
        Some(Self { rows })
    }

    pub fn builtin() -> Self {
        Self {
            rows: BUILTIN_SPRITE
                .iter()
                .map(|row| row.iter().map(|&c| Some(c)).collect())
                .collect(),
        }
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// `(col, row, index)` for every drawable cell.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, u8)> + '_ {
        self.rows.iter().enumerate().flat_map(|(r, row)| {
            row.iter()
                .enumerate()
                .filter_map(move |(c, cell)| cell.map(|index| (c, r, index)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_is_the_smiley() {
        let s = Sprite::builtin();
        assert_eq!((s.width(), s.height()), (8, 8));
        assert_eq!(s.cells().count(), 64);
        assert!(s.cells().any(|(c, r, i)| (c, r, i) == (2, 2, 3)));
    }

    #[test]
    fn oversized_grids_are_rejected() {
        assert!(Sprite::from_cells(vec![vec![Some(1)]; 17]).is_none());
        assert!(Sprite::from_cells(vec![vec![Some(1); 17]]).is_none());
        assert!(Sprite::from_cells(vec![vec![Some(1); 16]; 16]).is_some());
    }

    #[test]
    fn out_of_palette_cells_become_transparent() {
        let s = Sprite::from_cells(vec![vec![Some(-1), Some(16), None, Some(15)]]).unwrap();
        assert_eq!(s.cells().collect::<Vec<_>>(), vec![(3, 0, 15)]);
        assert_eq!(s.width(), 4);
    }
}
