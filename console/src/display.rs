//! Presentation backends.
//!
//! The scheduler only talks to [`Display`]. [`HeadlessDisplay`] is the
//! backend the CLI and the tests use: it scales each frame to the display
//! resolution and keeps the last one around for screenshots.

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::constants::{DISPLAY_HEIGHT, DISPLAY_WIDTH, WINDOW_CAPTION};
use crate::error::HostError;
use crate::framebuffer::Framebuffer;
use crate::palette::Rgb;

pub trait Display {
    /// Window title, also stamped into screenshots.
    fn caption(&self) -> &str {
        WINDOW_CAPTION
    }

    /// Whether the user asked to close the window since the last poll.
    fn poll_quit(&mut self) -> bool;
    fn present(&mut self, frame: &Framebuffer) -> Result<(), HostError>;
    fn shutdown(&mut self);
}

/// Nearest-neighbour scale of `frame` to `width × height` RGB pixels.
/// Every output pixel is an exact palette colour.
pub fn scale_nearest(frame: &Framebuffer, width: usize, height: usize) -> Vec<Rgb> {
    let mut out = Vec::with_capacity(width * height);
    for y in 0..height {
        let sy = y * frame.height() / height;
        for x in 0..width {
            let sx = x * frame.width() / width;
            out.push(frame.rgb_at(sx, sy).unwrap_or([0, 0, 0]));
        }
    }
    out
}

#[derive(Debug)]
pub struct HeadlessDisplay {
    width: usize,
    height: usize,
    last_frame: Vec<Rgb>,
    frames_presented: u64,
    quit_after: Option<u64>,
    closed: bool,
}

impl Default for HeadlessDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessDisplay {
    pub fn new() -> Self {
        Self {
            width: DISPLAY_WIDTH,
            height: DISPLAY_HEIGHT,
            last_frame: vec![[0, 0, 0]; DISPLAY_WIDTH * DISPLAY_HEIGHT],
            frames_presented: 0,
            quit_after: None,
            closed: false,
        }
    }

    /// Simulate the window being closed once `frames` have been presented.
    pub fn quit_after(mut self, frames: u64) -> Self {
        self.quit_after = Some(frames);
        self
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn last_frame(&self) -> &[Rgb] {
        &self.last_frame
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<Rgb> {
        if x < self.width && y < self.height {
            Some(self.last_frame[y * self.width + x])
        } else {
            None
        }
    }

    /// Write the last presented frame as a binary PPM, with the caption as
    /// a header comment.
    pub fn write_ppm(&self, path: &Path) -> Result<(), HostError> {
        let io = |source| HostError::Io {
            path: path.to_path_buf(),
            source,
        };
        let mut bytes = Vec::with_capacity(self.last_frame.len() * 3 + 32);
        write!(
            bytes,
            "P6\n# {}\n{} {}\n255\n",
            self.caption(),
            self.width,
            self.height
        )
        .map_err(io)?;
        for rgb in &self.last_frame {
            bytes.extend_from_slice(rgb);
        }
        fs::write(path, bytes).map_err(io)
    }
}

impl Display for HeadlessDisplay {
    fn poll_quit(&mut self) -> bool {
        matches!(self.quit_after, Some(n) if self.frames_presented >= n)
    }

    fn present(&mut self, frame: &Framebuffer) -> Result<(), HostError> {
        if self.closed {
            return Err(HostError::Display("present after shutdown".into()));
        }
        self.last_frame = scale_nearest(frame, self.width, self.height);
        self.frames_presented += 1;
        Ok(())
    }

    fn shutdown(&mut self) {
        self.closed = true;
    }
}
