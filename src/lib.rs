//! # Kilo
//!
//! Kilo is a minimalist text editor for character-cell terminals. It drives
//! the terminal directly with ANSI escape sequences, without a curses-style
//! library.

pub use crate::{config::Config, editor::Editor, error::Error};

pub mod ansi_escape;
mod config;
mod document;
mod editor;
mod error;
mod row;
mod syntax;
mod terminal;

#[cfg(unix)] mod xdg;
#[cfg(unix)] mod unix;
#[cfg(unix)] use unix as sys;
