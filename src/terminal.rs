//! # Terminal
//!
//! Escape-sequence fallback for measuring the window. Used when the
//! `TIOCGWINSZ` ioctl fails or reports a zero-sized window.

use std::io::{self, Read, Write};

use crate::ansi_escape::{DEVICE_STATUS_REPORT, REPOSITION_CURSOR_END};
use crate::{Error, sys};

/// Measure the window by parking the cursor in the bottom-right corner and
/// asking the terminal where it ended up.
///
/// The cursor is pushed 999 columns right and 999 rows down (the terminal
/// clamps both moves at the screen edge), then a Device Status Report is
/// issued. The terminal answers on stdin with `<ESC>[{row};{col}R`, which
/// bounds the window size. A missing, truncated or malformed reply is
/// reported as `Error::CursorPosition`.
pub fn get_window_size_using_cursor() -> Result<(usize, usize), Error> {
    let mut stdout = io::stdout();
    stdout.write_all(REPOSITION_CURSOR_END.as_bytes())?;
    stdout.write_all(DEVICE_STATUS_REPORT.as_bytes())?;
    stdout.flush()?;

    // Collect the reply up to the final 'R'. The read timeout makes sure this
    // terminates even if the terminal never answers.
    let mut reply = Vec::new();
    for byte in sys::stdin()?.bytes() {
        match byte? {
            b'R' => break,
            b => reply.push(b),
        }
        if reply.len() > 16 {
            return Err(Error::CursorPosition);
        }
    }

    let (rows, cols) = reply
        .strip_prefix(b"\x1b[")
        .and_then(|u| std::str::from_utf8(u).ok())
        .and_then(|u| u.split_once(';'))
        .ok_or(Error::CursorPosition)?;
    match (rows.parse(), cols.parse()) {
        (Ok(rows), Ok(cols)) => Ok((rows, cols)),
        _ => Err(Error::CursorPosition),
    }
}
