//! Streaming primitives for the rewrite engine
//!
//! This module provides the pieces the engine loop is built from:
//! - Fixed-capacity read window (no growth)
//! - Carry-over of context across chunk boundaries
//! - Trigger matching with delimiter and escape rules

pub mod carry;
pub mod switch;
pub mod window;

pub use carry::{Boundary, Carry, ESCAPE_BYTE};
pub use switch::{Delimiters, Switch};
pub use window::{Window, DEFAULT_CAPACITY};
