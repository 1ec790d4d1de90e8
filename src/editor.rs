#![allow(clippy::wildcard_imports)]

use std::io::{self, Read, Write};
use std::iter::repeat;
use std::path::Path;
use std::time::{Duration, Instant};

use unicode_width::UnicodeWidthStr;

use crate::document::Document;
use crate::row::Row;
use crate::syntax::HlType;
use crate::{Config, Error, ansi_escape::*, sys, terminal};

const fn ctrl_key(key: u8) -> u8 { key & 0x1f }
const EXIT: u8 = ctrl_key(b'Q');
const DELETE_BIS: u8 = ctrl_key(b'H');
const REFRESH_SCREEN: u8 = ctrl_key(b'L');
const SAVE: u8 = ctrl_key(b'S');
const FIND: u8 = ctrl_key(b'F');
const BACKSPACE: u8 = 127;

const HELP_MESSAGE: &str = "HELP: Ctrl-S = save | Ctrl-Q = quit | Ctrl-F = find";

/// How long a status message stays visible.
const MESSAGE_DURATION: Duration = Duration::from_secs(5);

/// `set_status!` sets a formatted status message for the editor.
/// Example usage: `set_status!(editor, "{} written to {}", file_size, file_name)`
macro_rules! set_status { ($editor:expr, $($arg:expr),*) => ($editor.status_msg = Some(StatusMessage::new(format!($($arg),*)))) }

/// The display width of a message, plus one for the cursor.
fn dsp_width(msg: &str) -> usize { UnicodeWidthStr::width(msg) + 1 }

/// Enum of input keys
enum Key {
    Arrow(AKey),
    AltArrow(AKey),
    Page(PageKey),
    Home,
    End,
    Delete,
    Escape,
    Char(u8),
}

/// Enum of arrow keys
enum AKey {
    Left,
    Right,
    Up,
    Down,
}

/// Enum of page keys
enum PageKey {
    Up,
    Down,
}

/// The scroll state of the window and the cursor position, both in logical
/// coordinates (`cx` indexes the row bytes) and in rendered coordinates (`rx`
/// is the tab-expanded column).
#[derive(Clone, Copy, Default)]
struct Viewport {
    /// x position (indexing the bytes of the row)
    cx: usize,
    /// y position (row number, 0-indexed; may be one past the last row)
    cy: usize,
    /// Render column of the cursor, recomputed from `cx` before each frame
    rx: usize,
    /// Row offset of the top-left corner of the window
    row_off: usize,
    /// Render-column offset of the top-left corner of the window
    col_off: usize,
    /// The number of rows that can be used for the text, excluding the status
    /// bar and the message bar
    screen_rows: usize,
    /// The number of columns of the window
    screen_cols: usize,
}

impl Viewport {
    /// Adjust the offsets so that the cursor is inside the visible window, and
    /// compute the rendered cursor column.
    fn scroll(&mut self, rows: &[Row], tab: usize) {
        self.rx = rows.get(self.cy).map_or(0, |row| row.cx_to_rx(self.cx, tab));
        if self.cy < self.row_off {
            self.row_off = self.cy;
        }
        if self.cy >= self.row_off + self.screen_rows {
            self.row_off = self.cy + 1 - self.screen_rows;
        }
        if self.rx < self.col_off {
            self.col_off = self.rx;
        }
        if self.rx >= self.col_off + self.screen_cols {
            self.col_off = self.rx + 1 - self.screen_cols;
        }
    }
}

/// Describes a status message, shown at the bottom of the screen.
struct StatusMessage {
    /// The message to display.
    msg: String,
    /// The `Instant` the status message was first displayed.
    time: Instant,
}

impl StatusMessage {
    /// Create a new status message and set time to the current date/time.
    fn new(msg: String) -> Self { Self { msg, time: Instant::now() } }
}

/// The state of an incremental search, kept alive for the duration of the
/// search prompt.
#[derive(Default)]
struct SearchSession {
    /// The row of the last match, if any.
    last_match: Option<usize>,
    /// Whether the search advances forward or backward through the rows.
    forward: bool,
    /// The highlighting of the matched row before the match was marked, so it
    /// can be restored on the next step.
    saved_hl: Option<(usize, Vec<HlType>)>,
}

/// `slice_find` returns the index of `needle` in slice `s` if `needle` is a
/// subslice of `s`, otherwise returns `None`.
fn slice_find<T: PartialEq>(s: &[T], needle: &[T]) -> Option<usize> {
    (0..(s.len() + 1).saturating_sub(needle.len())).find(|&i| s[i..].starts_with(needle))
}

/// The closing byte to pair with an opening bracket or quote, if any.
const fn matching_closer(c: u8) -> Option<u8> {
    match c {
        b'(' => Some(b')'),
        b'[' => Some(b']'),
        b'{' => Some(b'}'),
        b'"' | b'\'' => Some(c),
        _ => None,
    }
}

/// The `Editor` struct, contains the state and configuration of the text
/// editor.
pub struct Editor {
    /// The document being edited.
    doc: Document,
    /// The cursor position and scroll state.
    viewport: Viewport,
    /// The configuration for the editor.
    config: Config,
    /// The number of warnings remaining before we can quit without saving.
    /// Defaults to `config.quit_times`, then decreases to 0.
    quit_times: usize,
    /// The current status message being shown.
    status_msg: Option<StatusMessage>,
    /// Whether a prompt is being shown on the message bar. This moves the
    /// terminal cursor to the end of the prompt.
    prompt_active: bool,
    /// The original terminal mode. It will be restored when the `Editor`
    /// instance is dropped.
    orig_term_mode: Option<sys::TermMode>,
}

impl Default for Editor {
    fn default() -> Self {
        let config = Config::default();
        Self {
            doc: Document::new(config.tab_stop),
            viewport: Viewport::default(),
            quit_times: config.quit_times,
            config,
            status_msg: None,
            prompt_active: false,
            orig_term_mode: None,
        }
    }
}

impl Editor {
    /// Initialize the text editor.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an error occurs when enabling raw mode, installing
    /// the signal hook or when obtaining the terminal window size.
    pub fn new(config: Config) -> Result<Self, Error> {
        sys::register_winsize_change_signal_handler()?;
        let mut editor = Self::default();
        (editor.quit_times, editor.doc.tab_stop) = (config.quit_times, config.tab_stop);
        editor.config = config;

        // Enable raw mode and store the original (non-raw) terminal mode.
        editor.orig_term_mode = Some(sys::enable_raw_mode()?);
        editor.update_window_size()?;

        set_status!(editor, "{}", HELP_MESSAGE);

        Ok(editor)
    }

    /// If `file_name` is not `None`, load the file. Then run the editor loop:
    /// draw a frame, wait for a key, dispatch it.
    ///
    /// # Errors
    ///
    /// Will return `Err` if any error occurs, including a failure to open the
    /// given file.
    pub fn run(&mut self, file_name: Option<&str>) -> Result<(), Error> {
        if let Some(name) = file_name {
            self.doc.filename = Some(name.to_string());
            self.doc.select_syntax();
            self.doc.load(Path::new(name))?;
        }
        loop {
            self.refresh_screen()?;
            let key = self.read_key()?;
            if self.process_keypress(&key)? {
                return Ok(());
            }
        }
    }

    /// Update the `screen_rows` and `screen_cols` attributes. The last two
    /// terminal lines are reserved for the status bar and the message bar.
    fn update_window_size(&mut self) -> Result<(), Error> {
        let wsize = sys::get_window_size().or_else(|_| terminal::get_window_size_using_cursor())?;
        (self.viewport.screen_rows, self.viewport.screen_cols) = (wsize.0.saturating_sub(2), wsize.1);
        Ok(())
    }

    /// Run a loop to obtain the key that was pressed. At each iteration of the
    /// loop (until a key is pressed), we check whether a window size change
    /// signal has been received. When bytes are received, we match them to a
    /// corresponding `Key`; in particular, escape sequences are decoded into
    /// `Key::Delete`, `Key::Home` etc. A read timeout after a lone `<ESC>`
    /// byte, or an unrecognized sequence, yields `Key::Escape`.
    fn read_key(&mut self) -> Result<Key, Error> {
        loop {
            // Handle window size if a signal has been received
            if sys::has_window_size_changed() {
                self.update_window_size()?;
                self.refresh_screen()?;
            }
            let mut bytes = sys::stdin()?.bytes();
            match bytes.next().transpose()? {
                Some(b'\x1b') => {
                    return Ok(match bytes.next().transpose()? {
                        Some(b @ (b'[' | b'O')) => match (b, bytes.next().transpose()?) {
                            (b'[', Some(b'A')) => Key::Arrow(AKey::Up),
                            (b'[', Some(b'B')) => Key::Arrow(AKey::Down),
                            (b'[', Some(b'C')) => Key::Arrow(AKey::Right),
                            (b'[', Some(b'D')) => Key::Arrow(AKey::Left),
                            (b'[' | b'O', Some(b'H')) => Key::Home,
                            (b'[' | b'O', Some(b'F')) => Key::End,
                            (b'[', Some(c @ b'0'..=b'9')) => match (c, bytes.next().transpose()?) {
                                (b'1' | b'7', Some(b'~')) => Key::Home,
                                (b'3', Some(b'~')) => Key::Delete,
                                (b'4' | b'8', Some(b'~')) => Key::End,
                                (b'5', Some(b'~')) => Key::Page(PageKey::Up),
                                (b'6', Some(b'~')) => Key::Page(PageKey::Down),
                                (b'1', Some(b';')) =>
                                    match (bytes.next().transpose()?, bytes.next().transpose()?) {
                                        (Some(b'3'), Some(b'A')) => Key::AltArrow(AKey::Up),
                                        (Some(b'3'), Some(b'B')) => Key::AltArrow(AKey::Down),
                                        _ => Key::Escape,
                                    },
                                _ => Key::Escape,
                            },
                            _ => Key::Escape,
                        },
                        _ => Key::Escape,
                    });
                }
                Some(c) => return Ok(Key::Char(c)),
                None => continue,
            }
        }
    }

    /// The length in bytes of the row under the cursor, or 0 when the cursor
    /// is one past the last row.
    fn current_row_len(&self) -> usize {
        self.doc.rows.get(self.viewport.cy).map_or(0, |row| row.chars.len())
    }

    /// Move the cursor following an arrow key (← → ↑ ↓). Going left at the
    /// start of a line jumps to the end of the previous one; going right at
    /// the end of a line jumps to the start of the next one. After the move,
    /// the x position is clamped to the length of the new row.
    fn move_cursor(&mut self, key: &AKey) {
        let Viewport { cx, cy, .. } = self.viewport;
        let row_len = |y: usize| self.doc.rows.get(y).map_or(0, |row| row.chars.len());
        let (new_cx, new_cy) = match key {
            AKey::Left if cx > 0 => (cx - 1, cy),
            AKey::Left if cy > 0 => (row_len(cy - 1), cy - 1),
            AKey::Left => (cx, cy),
            AKey::Right if cy < self.doc.rows.len() && cx < row_len(cy) => (cx + 1, cy),
            AKey::Right if cy < self.doc.rows.len() => (0, cy + 1),
            AKey::Right => (cx, cy),
            AKey::Up if cy > 0 => (cx, cy - 1),
            AKey::Up => (cx, cy),
            AKey::Down if cy < self.doc.rows.len() => (cx, cy + 1),
            AKey::Down => (cx, cy),
        };
        self.viewport.cy = new_cy;
        self.viewport.cx = new_cx.min(row_len(new_cy));
    }

    /// Move the cursor a page up or down: first to the edge of the current
    /// window, then one window further.
    fn move_page(&mut self, page: &PageKey) {
        let Viewport { row_off, screen_rows, .. } = self.viewport;
        let arrow = match page {
            PageKey::Up => {
                self.viewport.cy = row_off;
                AKey::Up
            }
            PageKey::Down => {
                self.viewport.cy =
                    (row_off + screen_rows.saturating_sub(1)).min(self.doc.rows.len());
                AKey::Down
            }
        };
        for _ in 0..screen_rows {
            self.move_cursor(&arrow);
        }
    }

    /// Insert a byte at the cursor and advance it.
    fn insert_char(&mut self, c: u8) {
        self.doc.insert_char(self.viewport.cx, self.viewport.cy, c);
        self.viewport.cx += 1;
    }

    /// Insert a line break at the cursor and move to the start of the new
    /// line.
    fn insert_new_line(&mut self) {
        self.doc.insert_newline(self.viewport.cx, self.viewport.cy);
        (self.viewport.cx, self.viewport.cy) = (0, self.viewport.cy + 1);
    }

    /// Delete the byte before the cursor, joining the current line with the
    /// previous one when the cursor is at the start of the line.
    fn delete_char(&mut self) {
        let Viewport { cx, cy, .. } = self.viewport;
        if cy == self.doc.rows.len() || (cx == 0 && cy == 0) {
            return;
        }
        if cx > 0 {
            self.doc.delete_char(cx, cy);
            self.viewport.cx -= 1;
        } else {
            self.viewport.cx = self.doc.rows[cy - 1].chars.len();
            self.doc.delete_char(cx, cy);
            self.viewport.cy -= 1;
        }
    }

    /// Process a key that has been pressed. Returns whether the editor should
    /// exit.
    fn process_keypress(&mut self, key: &Key) -> Result<bool, Error> {
        // This won't be mutated, unless key is Key::Char(EXIT)
        let mut quit_times = self.config.quit_times;

        match key {
            Key::Arrow(arrow) => self.move_cursor(arrow),
            // Alt-arrows are decoded but not bound to an action
            Key::AltArrow(_) => (),
            Key::Page(page) => self.move_page(page),
            Key::Home => self.viewport.cx = 0,
            Key::End => self.viewport.cx = self.current_row_len(),
            Key::Char(b'\r' | b'\n') => self.insert_new_line(),
            Key::Char(BACKSPACE | DELETE_BIS) => self.delete_char(),
            Key::Delete => {
                self.move_cursor(&AKey::Right);
                self.delete_char();
            }
            Key::Escape | Key::Char(REFRESH_SCREEN) => (),
            Key::Char(EXIT) => {
                quit_times = self.quit_times.saturating_sub(1);
                if self.doc.dirty == 0 || quit_times == 0 {
                    return Ok(true);
                }
                set_status!(
                    self,
                    "File has unsaved changes. Press Ctrl-Q {} more times to quit.",
                    quit_times
                );
            }
            Key::Char(SAVE) => self.save()?,
            Key::Char(FIND) => self.find()?,
            Key::Char(c) => {
                self.insert_char(*c);
                if let Some(closer) = matching_closer(*c) {
                    // Autopair: add the closer, keep the cursor between the two
                    self.doc.insert_char(self.viewport.cx, self.viewport.cy, closer);
                }
            }
        }
        self.quit_times = quit_times;
        Ok(false)
    }

    /// Save the document, prompting for a file name if it does not have one
    /// yet. The outcome is reported on the message bar; a failed save leaves
    /// the dirty counter untouched.
    fn save(&mut self) -> Result<(), Error> {
        let file_name = match self.doc.filename.clone() {
            Some(name) => Some(name),
            None => self.prompt("Save as: ", |_, _, _| ())?,
        };
        let Some(name) = file_name else {
            set_status!(self, "Save aborted");
            return Ok(());
        };
        if self.doc.filename.is_none() {
            self.doc.filename = Some(name.clone());
            self.doc.select_syntax();
        }
        match self.doc.save(&name) {
            Ok(written) => set_status!(self, "{} bytes written to disk", written),
            Err(err) => set_status!(self, "Can't save! I/O error: {}", err),
        }
        Ok(())
    }

    /// Run an incremental search driven by the prompt. Every keypress searches
    /// again with the updated query; arrow keys repeat the search forward or
    /// backward. Cancelling restores the cursor and scroll position saved when
    /// the search started.
    fn find(&mut self) -> Result<(), Error> {
        let saved = self.viewport;
        let mut session = SearchSession::default();
        let query = self.prompt("Search (ESC/Arrows/Enter): ", |editor, buffer, key| {
            editor.search_step(&mut session, buffer, key);
        })?;
        if query.is_none() {
            (self.viewport.cx, self.viewport.cy) = (saved.cx, saved.cy);
            (self.viewport.row_off, self.viewport.col_off) = (saved.row_off, saved.col_off);
        }
        Ok(())
    }

    /// One step of the incremental search: restore the previously matched
    /// row's highlighting, then look for `query`, starting from the last match
    /// and wrapping around, and mark the new match.
    fn search_step(&mut self, session: &mut SearchSession, query: &str, key: &Key) {
        if let Some((y, hl)) = session.saved_hl.take() {
            self.doc.rows[y].hl = hl;
        }
        match key {
            Key::Char(b'\r') | Key::Escape => {
                (session.last_match, session.forward) = (None, true);
                return;
            }
            Key::Arrow(AKey::Right | AKey::Down) => session.forward = true,
            Key::Arrow(AKey::Left | AKey::Up) => session.forward = false,
            _ => (session.last_match, session.forward) = (None, true),
        }
        if session.last_match.is_none() {
            session.forward = true;
        }

        let num_rows = self.doc.rows.len();
        if num_rows == 0 {
            return;
        }
        let mut current = session.last_match.unwrap_or(num_rows - 1);
        for _ in 0..num_rows {
            current = (current + if session.forward { 1 } else { num_rows - 1 }) % num_rows;
            let tab = self.doc.tab_stop;
            let row = &mut self.doc.rows[current];
            let Some(rx) = slice_find(&row.render, query.as_bytes()) else {
                continue;
            };
            session.last_match = Some(current);
            session.saved_hl = Some((current, row.hl.clone()));
            let cx = row.rx_to_cx(rx, tab);
            for hl in &mut row.hl[rx..rx + query.len()] {
                *hl = HlType::Match;
            }
            (self.viewport.cx, self.viewport.cy) = (cx, current);
            // Scrolling will put the matched row at the top of the window
            self.viewport.row_off = num_rows;
            break;
        }
    }

    /// Show a prompt on the message bar and collect a line of input. `CR`
    /// accepts the (non-empty) input, `ESC` cancels. If given, `callback` is
    /// invoked after every keypress with the current buffer and the key.
    fn prompt(
        &mut self,
        label: &str,
        mut callback: impl FnMut(&mut Self, &str, &Key),
    ) -> Result<Option<String>, Error> {
        self.prompt_active = true;
        let result = self.prompt_loop(label, &mut callback);
        self.prompt_active = false;
        result
    }

    fn prompt_loop(
        &mut self,
        label: &str,
        callback: &mut impl FnMut(&mut Self, &str, &Key),
    ) -> Result<Option<String>, Error> {
        let mut buffer = String::new();
        loop {
            set_status!(self, "{label}{buffer}");
            self.refresh_screen()?;
            let key = self.read_key()?;
            match key {
                Key::Char(b'\r') if !buffer.is_empty() => {
                    self.status_msg = None;
                    callback(self, &buffer, &key);
                    return Ok(Some(buffer));
                }
                Key::Escape => {
                    self.status_msg = None;
                    callback(self, &buffer, &key);
                    return Ok(None);
                }
                Key::Char(BACKSPACE | DELETE_BIS) | Key::Delete => {
                    buffer.pop();
                }
                Key::Char(c @ 0..=127) if !c.is_ascii_control() => buffer.push(c as char),
                _ => (),
            }
            callback(self, &buffer, &key);
        }
    }

    /// Refresh the screen: update the offsets, draw the rows, the status bar
    /// and the message bar, then position the cursor. The whole frame is
    /// composed into one buffer and written out in a single call, with the
    /// cursor hidden while drawing.
    fn refresh_screen(&mut self) -> Result<(), Error> {
        self.viewport.scroll(&self.doc.rows, self.doc.tab_stop);
        let mut buffer = Vec::new();
        buffer.extend_from_slice(HIDE_CURSOR.as_bytes());
        buffer.extend_from_slice(MOVE_CURSOR_TO_START.as_bytes());
        self.draw_rows(&mut buffer)?;
        self.draw_status_bar(&mut buffer)?;
        self.draw_message_bar(&mut buffer);
        let (cursor_y, cursor_x) = if self.prompt_active {
            // Position the cursor at the end of the prompt, on the message bar
            (
                self.viewport.screen_rows + 2,
                self.status_msg.as_ref().map_or(1, |sm| dsp_width(&sm.msg)),
            )
        } else {
            (
                self.viewport.cy - self.viewport.row_off + 1,
                self.viewport.rx - self.viewport.col_off + 1,
            )
        };
        write!(buffer, "\x1b[{cursor_y};{cursor_x}H")?;
        buffer.extend_from_slice(SHOW_CURSOR.as_bytes());
        let mut stdout = io::stdout();
        stdout.write_all(&buffer)?;
        stdout.flush().map_err(Error::from)
    }

    /// Draw the visible rows into the frame buffer. Rows past the end of the
    /// document show a tilde; an empty document shows the welcome banner a
    /// third of the way down.
    fn draw_rows(&self, buffer: &mut Vec<u8>) -> io::Result<()> {
        for y in 0..self.viewport.screen_rows {
            if let Some(row) = self.doc.rows.get(y + self.viewport.row_off) {
                row.draw(self.viewport.col_off, self.viewport.screen_cols, buffer)?;
            } else if self.doc.rows.is_empty() && y == self.viewport.screen_rows / 3 {
                self.draw_welcome(buffer);
            } else {
                buffer.push(b'~');
            }
            buffer.extend_from_slice(CLEAR_LINE_RIGHT_OF_CURSOR.as_bytes());
            buffer.extend_from_slice(b"\r\n");
        }
        Ok(())
    }

    /// Draw the centered welcome banner, preceded by a tilde like the other
    /// empty rows.
    fn draw_welcome(&self, buffer: &mut Vec<u8>) {
        let welcome = concat!("Kilo editor -- version ", env!("CARGO_PKG_VERSION"));
        let len = welcome.len().min(self.viewport.screen_cols);
        let mut padding = (self.viewport.screen_cols - len) / 2;
        if padding > 0 {
            buffer.push(b'~');
            padding -= 1;
        }
        buffer.extend(repeat(b' ').take(padding));
        buffer.extend_from_slice(&welcome.as_bytes()[..len]);
    }

    /// Draw the inverted status bar: file name, line count and modified marker
    /// on the left; syntax name and cursor position on the right.
    fn draw_status_bar(&self, buffer: &mut Vec<u8>) -> io::Result<()> {
        let modified = if self.doc.dirty > 0 { " (modified)" } else { "" };
        let file_name = self.doc.filename.as_deref().unwrap_or("[No Name]");
        let mut left = format!("{file_name:.20} - {} lines{modified}", self.doc.rows.len());
        left.truncate(self.viewport.screen_cols);
        let right = format!(
            "{} | {}/{}",
            self.doc.syntax.map_or("no ft", |syntax| syntax.name),
            self.viewport.cy + 1,
            self.doc.rows.len()
        );
        let rw = self.viewport.screen_cols - left.len();
        write!(buffer, "{REVERSE_VIDEO}{left}{right:>rw$.rw$}{RESET_FMT}\r\n")?;
        Ok(())
    }

    /// Draw the message bar: the status message, if it is recent enough.
    fn draw_message_bar(&self, buffer: &mut Vec<u8>) {
        buffer.extend_from_slice(CLEAR_LINE_RIGHT_OF_CURSOR.as_bytes());
        let recent = |sm: &&StatusMessage| sm.time.elapsed() < MESSAGE_DURATION;
        if let Some(sm) = self.status_msg.as_ref().filter(recent) {
            let len = sm.msg.len().min(self.viewport.screen_cols);
            buffer.extend_from_slice(&sm.msg.as_bytes()[..len]);
        }
    }
}

impl Drop for Editor {
    /// When the editor is dropped, restore the original terminal mode and
    /// clear the screen.
    fn drop(&mut self) {
        if let Some(orig_term_mode) = self.orig_term_mode.take() {
            sys::set_term_mode(&orig_term_mode).expect("Could not restore original terminal mode.");
        }
        if !std::thread::panicking() {
            print!("{CLEAR_SCREEN}{MOVE_CURSOR_TO_START}");
            io::stdout().flush().expect("Could not flush stdout");
        }
    }
}
