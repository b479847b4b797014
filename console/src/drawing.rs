//! Drawing API: every guest write to the framebuffer goes through here.
//!
//! Oversized sprites are a silent no-op and out-of-palette cells are
//! skipped one by one; only malformed arguments are errors.

use vm::{RuntimeError, Value};

use crate::framebuffer::Framebuffer;
use crate::sprite::Sprite;

/// Draw `sprite` with its top-left corner at `(x, y)`, clipping at the
/// framebuffer edges.
pub fn blit(fb: &mut Framebuffer, sprite: &Sprite, x: i64, y: i64) {
    for (col, row, index) in sprite.cells() {
        let px = x.saturating_add(col as i64);
        let py = y.saturating_add(row as i64);
        fb.set(px, py, index);
    }
}

pub fn draw_builtin_sprite(fb: &mut Framebuffer, x: i64, y: i64) {
    blit(fb, &Sprite::builtin(), x, y);
}

/// Validate a guest grid and draw it. Returns `Ok(false)` when the grid was
/// too large and nothing was drawn.
pub fn draw_custom_sprite(
    fb: &mut Framebuffer,
    grid: &Value,
    x: i64,
    y: i64,
) -> Result<bool, RuntimeError> {
    match sprite_from_grid(grid)? {
        Some(sprite) => {
            blit(fb, &sprite, x, y);
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Convert a guest list of lists into a [`Sprite`].
///
/// `Ok(None)` means the grid is oversized. A grid that is not a list of
/// lists is a type error. Takes snapshots so no list lock is held while the
/// next one is taken.
pub fn sprite_from_grid(grid: &Value) -> Result<Option<Sprite>, RuntimeError> {
    let rows = grid.list_snapshot().ok_or_else(|| {
        RuntimeError::TypeMismatch(format!(
            "draw_custom_sprite() expects a list of lists, got {}",
            grid.type_name()
        ))
    })?;
    if rows.len() > crate::constants::MAX_SPRITE_SIZE {
        return Ok(None);
    }

    let mut cells = Vec::with_capacity(rows.len());
    for row in &rows {
        let items = row.list_snapshot().ok_or_else(|| {
            RuntimeError::TypeMismatch(format!(
                "draw_custom_sprite() rows must be lists, got {}",
                row.type_name()
            ))
        })?;
        cells.push(
            items
                .iter()
                .map(|cell| match cell {
                    Value::Int(n) => Some(*n),
                    _ => None,
                })
                .collect(),
        );
    }
    Ok(Sprite::from_cells(cells))
}

/// Guest coordinate: ints as-is, floats truncated toward zero.
pub fn coordinate(func: &str, v: &Value) -> Result<i64, RuntimeError> {
    match v {
        Value::Int(n) => Ok(*n),
        Value::Float(f) if f.is_finite() => Ok(f.trunc() as i64),
        other => Err(RuntimeError::TypeMismatch(format!(
            "{func}() coordinates must be numbers, got {}",
            other.type_name()
        ))),
    }
}
