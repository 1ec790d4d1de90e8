//! # Row
//!
//! Utilities for rows. A `Row` owns the underlying bytes, the rendered form
//! (tabs expanded into spaces) and the syntax highlighting information.

use std::io::{self, Write};
use std::iter::repeat;

use crate::ansi_escape::{RESET_FMT, REVERSE_VIDEO};
use crate::syntax::{HlType, Syntax};

/// Represents a row of bytes and how it is rendered and highlighted.
#[derive(Default)]
pub struct Row {
    /// The position of the row within the document.
    pub index: usize,
    /// The bytes of the row, without a line terminator.
    pub chars: Vec<u8>,
    /// How the bytes are rendered: tabs are converted into one or more spaces,
    /// up to the next multiple of the tab stop.
    pub render: Vec<u8>,
    /// The highlight class for each rendered byte. Always the same length as
    /// `render`.
    pub hl: Vec<HlType>,
    /// Whether a multi-line comment started on or before this row is still
    /// open at its end.
    pub hl_open_comment: bool,
}

impl Row {
    /// Create a new row at position `index`, containing bytes `chars`.
    pub fn new(index: usize, chars: Vec<u8>) -> Self { Self { index, chars, ..Self::default() } }

    /// Update the row: expand tabs into spaces and recompute the highlighting.
    /// The `prev_open_comment` argument tells whether the previous row ends
    /// inside a multi-line comment. Returns the row's own open-comment state.
    pub fn update(&mut self, syntax: Option<&Syntax>, prev_open_comment: bool, tab: usize) -> bool {
        self.render.clear();
        for &c in &self.chars {
            if c == b'\t' {
                self.render.push(b' ');
                while self.render.len() % tab != 0 {
                    self.render.push(b' ');
                }
            } else {
                self.render.push(c);
            }
        }
        self.update_syntax(syntax, prev_open_comment)
    }

    /// Translate a position in `chars` to the corresponding column in
    /// `render`, charging each tab byte up to the next tab stop.
    pub fn cx_to_rx(&self, cx: usize, tab: usize) -> usize {
        let mut rx = 0;
        for &c in self.chars.iter().take(cx) {
            if c == b'\t' {
                rx += (tab - 1) - (rx % tab);
            }
            rx += 1;
        }
        rx
    }

    /// Translate a column in `render` back to the position in `chars` whose
    /// rendering covers it. Columns past the end of the row map to
    /// `chars.len()`.
    pub fn rx_to_cx(&self, rx: usize, tab: usize) -> usize {
        let mut cur_rx = 0;
        for (cx, &c) in self.chars.iter().enumerate() {
            if c == b'\t' {
                cur_rx += (tab - 1) - (cur_rx % tab);
            }
            cur_rx += 1;
            if cur_rx > rx {
                return cx;
            }
        }
        self.chars.len()
    }

    /// Recompute the highlight class of every rendered byte. Returns (and
    /// stores) whether the row ends inside a multi-line comment.
    fn update_syntax(&mut self, syntax: Option<&Syntax>, prev_open_comment: bool) -> bool {
        self.hl.clear();
        let line = &self.render;
        let Some(syntax) = syntax else {
            self.hl.resize(line.len(), HlType::Normal);
            self.hl_open_comment = false;
            return false;
        };

        let mut in_comment = prev_open_comment && syntax.ml_comment_delims.is_some();
        let mut in_string = 0_u8;
        let mut prev_sep = true;

        while self.hl.len() < line.len() {
            let i = self.hl.len();
            let c = line[i];
            let find_str = |s: &str| line[i..].starts_with(s.as_bytes());

            if in_string == 0 && !in_comment {
                if let Some(scs) = syntax.sl_comment_start {
                    if find_str(scs) {
                        self.hl.resize(line.len(), HlType::Comment);
                        break;
                    }
                }
            }

            if in_string == 0 {
                if let Some((mcs, mce)) = syntax.ml_comment_delims {
                    if in_comment {
                        if find_str(mce) {
                            self.hl.extend(repeat(HlType::MlComment).take(mce.len()));
                            (in_comment, prev_sep) = (false, true);
                        } else {
                            self.hl.push(HlType::MlComment);
                        }
                        continue;
                    } else if find_str(mcs) {
                        self.hl.extend(repeat(HlType::MlComment).take(mcs.len()));
                        in_comment = true;
                        continue;
                    }
                }
            }

            if syntax.highlight_strings {
                if in_string != 0 {
                    self.hl.push(HlType::String);
                    if c == b'\\' && i + 1 < line.len() {
                        // The escaped byte is part of the string, and cannot
                        // close it.
                        self.hl.push(HlType::String);
                    } else if c == in_string {
                        in_string = 0;
                    }
                    prev_sep = true;
                    continue;
                } else if c == b'"' || c == b'\'' {
                    in_string = c;
                    self.hl.push(HlType::String);
                    continue;
                }
            }

            let prev_hl = if i > 0 { self.hl[i - 1] } else { HlType::Normal };
            if syntax.highlight_numbers
                && ((c.is_ascii_digit() && (prev_sep || prev_hl == HlType::Number))
                    || (c == b'.' && prev_hl == HlType::Number))
            {
                self.hl.push(HlType::Number);
                prev_sep = false;
                continue;
            }

            if prev_sep {
                // A keyword only matches when followed by a separator (or the
                // end of the row), so that e.g. "interface" is not partially
                // highlighted.
                let keyword = syntax.keywords.iter().find_map(|kw| {
                    let (kw, hl_type) = kw
                        .strip_suffix('|')
                        .map_or((*kw, HlType::Keyword1), |kw| (kw, HlType::Keyword2));
                    (find_str(kw) && line.get(i + kw.len()).is_none_or(|&b| is_separator(b)))
                        .then_some((kw.len(), hl_type))
                });
                if let Some((len, hl_type)) = keyword {
                    self.hl.extend(repeat(hl_type).take(len));
                    prev_sep = false;
                    continue;
                }
            }

            self.hl.push(HlType::Normal);
            prev_sep = is_separator(c);
        }

        self.hl_open_comment = in_comment;
        in_comment
    }

    /// Draw the row and append the result to the frame buffer. An `offset`
    /// into `render` can be given, as well as a limit on the number of bytes
    /// to draw (`max_len`). Color escape sequences are only emitted when the
    /// highlight class changes from one byte to the next.
    pub fn draw(&self, offset: usize, max_len: usize, buffer: &mut Vec<u8>) -> io::Result<()> {
        let start = offset.min(self.render.len());
        let end = self.render.len().min(start + max_len);
        let mut current_color = None;
        for (&c, &hl) in self.render[start..end].iter().zip(&self.hl[start..end]) {
            if c.is_ascii_control() {
                let sym = if c <= 26 { b'@' + c } else { b'?' };
                buffer.extend_from_slice(REVERSE_VIDEO.as_bytes());
                buffer.push(sym);
                buffer.extend_from_slice(RESET_FMT.as_bytes());
                // Restore the color that was interrupted by the reset
                if let Some(color) = current_color {
                    write!(buffer, "\x1b[{color}m")?;
                }
            } else if hl == HlType::Normal {
                if current_color.is_some() {
                    current_color = None;
                    write!(buffer, "\x1b[{}m", HlType::Normal.color())?;
                }
                buffer.push(c);
            } else {
                let color = hl.color();
                if current_color != Some(color) {
                    current_color = Some(color);
                    write!(buffer, "\x1b[{color}m")?;
                }
                buffer.push(c);
            }
        }
        write!(buffer, "\x1b[{}m", HlType::Normal.color())?;
        Ok(())
    }
}

/// Return whether `c` is a separator, for the purpose of delimiting keywords
/// and numbers.
pub(crate) const fn is_separator(c: u8) -> bool {
    c.is_ascii_whitespace()
        || c == b'\0'
        || matches!(
            c,
            b',' | b'.'
                | b'('
                | b')'
                | b'+'
                | b'-'
                | b'/'
                | b'*'
                | b'='
                | b'~'
                | b'%'
                | b'<'
                | b'>'
                | b'['
                | b']'
                | b';'
        )
}
