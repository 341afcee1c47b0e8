//! winfetch: a system information splash for the terminal.
//!
//! Facts are gathered per key through a platform probe and cached on disk;
//! the left column is either an ASCII template or a raster image rendered
//! with block, half-block or braille glyphs.

pub mod app;
pub mod ascii;
pub mod cache;
pub mod config;
pub mod error;
pub mod picture;
pub mod platform;
pub mod render;
pub mod system;
pub mod theme;
pub mod ui;

pub use error::{Error, Result};
