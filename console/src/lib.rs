//! Fantasy-console runtime.
//!
//! A cartridge is compiled under the restricted grammar, run once against
//! the [`capabilities`] table, and then driven by the [`Scheduler`] at a
//! fixed tick rate. Guest code only ever reaches the host through the
//! capability table; everything it draws lands in a 128×128 palette
//! framebuffer that a [`Display`] scales for presentation.

pub mod capabilities;
pub mod config;
pub mod constants;
pub mod context;
pub mod display;
pub mod drawing;
pub mod error;
pub mod framebuffer;
pub mod input;
pub mod loader;
pub mod palette;
pub mod scheduler;
pub mod sprite;
pub mod thread;

pub use config::ConsoleConfig;
pub use context::ConsoleContext;
pub use display::{Display, HeadlessDisplay};
pub use error::{GuestError, HostError, Location};
pub use framebuffer::Framebuffer;
pub use input::{IdleInput, InputSource, InputState, ScriptedInput};
pub use loader::{load_cartridge, resolve_cartridge_path, Cartridge, EntryPoints, SandboxLoader};
pub use scheduler::{RunSummary, Scheduler, SchedulerState, TickReport};
