//! Fixed console specification.

/// Virtual framebuffer size in pixels.
pub const INTERNAL_WIDTH: usize = 128;
pub const INTERNAL_HEIGHT: usize = 128;

/// Size of the presented image.
pub const DISPLAY_WIDTH: usize = 640;
pub const DISPLAY_HEIGHT: usize = 480;

pub const FPS: u32 = 30;

/// Largest width or height a sprite may have.
pub const MAX_SPRITE_SIZE: usize = 16;

pub const PALETTE_SIZE: usize = 16;

pub const WINDOW_CAPTION: &str = "CallumConsole";

/// How many guest errors the scheduler keeps for inspection.
pub const RECENT_GUEST_ERRORS: usize = 32;

/// Prefix of the per-tick guest output log line.
pub const OUTPUT_PREFIX: &str = "[CART OUTPUT]";

/// Extension appended to cartridge paths that have none.
pub const CARTRIDGE_EXTENSION: &str = "cart";

/// Older extension, tried when no `.cart` file exists.
pub const LEGACY_CARTRIDGE_EXTENSION: &str = "callumcart";
