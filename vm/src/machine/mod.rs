//! Machine module - VM implementation
//!
//! This module contains the Virtual Machine implementation segmented into
//! focused submodules, one trait per instruction family.

mod arithmetic;
mod control;
mod data;
mod frame;
mod globals;
mod stack;
mod vm;

// Public API
pub use arithmetic::{binary_op, compare_values};
pub use frame::CallFrame;
pub use vm::{FRAMES_MAX, STACK_MAX, VM};
