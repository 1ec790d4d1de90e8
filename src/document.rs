//! # Document
//!
//! The ordered collection of rows being edited, together with the dirty
//! counter, the file name and the active syntax. All row mutations go through
//! the document so that rendering and highlighting stay consistent, including
//! the multi-line comment state that cascades from one row to the next.

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use crate::error::Error;
use crate::row::Row;
use crate::syntax::Syntax;

pub struct Document {
    /// The rows of the document. `rows[i].index == i` at all times.
    pub(crate) rows: Vec<Row>,
    /// The number of mutations since the document was loaded or last saved.
    pub(crate) dirty: usize,
    /// The file name. If `None`, the user will be prompted for one the first
    /// time they save.
    pub(crate) filename: Option<String>,
    /// The syntax descriptor matching the current file name, if any.
    pub(crate) syntax: Option<&'static Syntax>,
    /// The number of columns a tab character occupies.
    pub(crate) tab_stop: usize,
}

impl Document {
    pub fn new(tab_stop: usize) -> Self {
        Self { rows: Vec::new(), dirty: 0, filename: None, syntax: None, tab_stop }
    }

    /// Rehighlight the row at `y`. If the row's open-comment state changes and
    /// `ignore_following_rows` is `false`, keep rehighlighting the rows below
    /// until the state stabilizes or the end of the document is reached.
    pub(crate) fn update_row(&mut self, y: usize, ignore_following_rows: bool) {
        let mut open_comment = y.checked_sub(1).is_some_and(|p| self.rows[p].hl_open_comment);
        let (syntax, tab) = (self.syntax, self.tab_stop);
        for row in self.rows.iter_mut().skip(y) {
            let was_open = row.hl_open_comment;
            open_comment = row.update(syntax, open_comment, tab);
            if ignore_following_rows || open_comment == was_open {
                return;
            }
            // The open-comment state changed (for instance, a multi-line
            // comment started in this row): keep updating the following rows
        }
    }

    /// Rehighlight every row, threading the open-comment state from top to
    /// bottom.
    pub(crate) fn update_all_rows(&mut self) {
        let (syntax, tab) = (self.syntax, self.tab_stop);
        let mut open_comment = false;
        for row in &mut self.rows {
            open_comment = row.update(syntax, open_comment, tab);
        }
    }

    /// Insert a new row at position `at` (`0 <= at <= rows.len()`), shifting
    /// the following rows down.
    pub fn insert_row(&mut self, at: usize, chars: Vec<u8>) {
        self.rows.insert(at, Row::new(at, chars));
        for (index, row) in self.rows.iter_mut().enumerate().skip(at + 1) {
            row.index = index;
        }
        self.dirty += 1;
        self.update_row(at, false);
    }

    /// Delete the row at position `at` (`0 <= at < rows.len()`), shifting the
    /// following rows up.
    pub fn delete_row(&mut self, at: usize) {
        self.rows.remove(at);
        for (index, row) in self.rows.iter_mut().enumerate().skip(at) {
            row.index = index;
        }
        self.dirty += 1;
        if at < self.rows.len() {
            self.update_row(at, false);
        }
    }

    /// Split the row at `cy` in two: the bytes before `cx` stay, the bytes
    /// from `cx` onwards become a new row below.
    pub fn split_row(&mut self, cy: usize, cx: usize) {
        let rest = self.rows[cy].chars.split_off(cx);
        self.dirty += 1;
        self.update_row(cy, false);
        self.insert_row(cy + 1, rest);
    }

    /// Append the row at `cy` (`cy > 0`) onto the row above it, then delete
    /// it.
    pub fn join_row(&mut self, cy: usize) {
        let row = self.rows.remove(cy);
        for (index, row) in self.rows.iter_mut().enumerate().skip(cy) {
            row.index = index;
        }
        self.rows[cy - 1].chars.extend(row.chars);
        self.dirty += 1;
        self.update_row(cy - 1, true);
        if cy < self.rows.len() {
            self.update_row(cy, false);
        }
    }

    /// Insert a byte at logical position (`cx`, `cy`). If the cursor is on the
    /// tilde line one past the last row, add a new row first.
    pub fn insert_char(&mut self, cx: usize, cy: usize, c: u8) {
        if cy == self.rows.len() {
            self.insert_row(cy, Vec::new());
        }
        self.rows[cy].chars.insert(cx, c);
        self.dirty += 1;
        self.update_row(cy, false);
    }

    /// Break the row at (`cx`, `cy`) in two, or insert an empty row above when
    /// the cursor is at the start of the line.
    pub fn insert_newline(&mut self, cx: usize, cy: usize) {
        if cx == 0 {
            self.insert_row(cy, Vec::new());
        } else {
            self.split_row(cy, cx);
        }
    }

    /// Delete the byte before logical position (`cx`, `cy`), joining the row
    /// with the one above when the cursor is at the start of the line. No-op
    /// at the very start of the document and on the line past the last row.
    pub fn delete_char(&mut self, cx: usize, cy: usize) {
        if cy == self.rows.len() || (cx == 0 && cy == 0) {
            return;
        }
        if cx > 0 {
            self.rows[cy].chars.remove(cx - 1);
            self.dirty += 1;
            self.update_row(cy, false);
        } else {
            self.join_row(cy);
        }
    }

    /// Look up the syntax descriptor for the current file name and rehighlight
    /// every row.
    pub fn select_syntax(&mut self) {
        self.syntax = self.filename.as_deref().and_then(Syntax::for_filename);
        self.update_all_rows();
    }

    /// Load the rows from a file, stripping the line terminators. Any I/O
    /// error, including the file not existing, is fatal at load time.
    pub fn load(&mut self, path: &Path) -> Result<(), Error> {
        for line in BufReader::new(File::open(path)?).split(b'\n') {
            let mut line = line?;
            while line.last().is_some_and(|&b| b == b'\n' || b == b'\r') {
                line.pop();
            }
            let at = self.rows.len();
            self.rows.push(Row::new(at, line));
        }
        self.update_all_rows();
        self.dirty = 0;
        Ok(())
    }

    /// Save the rows to `file_name`, each row followed by a newline. The file
    /// is created if needed and truncated to the new length. On success the
    /// dirty counter is reset and the number of bytes written is returned.
    pub fn save(&mut self, file_name: &str) -> io::Result<usize> {
        let mut buffer = Vec::new();
        for row in &self.rows {
            buffer.extend_from_slice(&row.chars);
            buffer.push(b'\n');
        }
        let mut file = OpenOptions::new().read(true).write(true).create(true).open(file_name)?;
        file.set_len(buffer.len() as u64)?;
        file.write_all(&buffer)?;
        self.dirty = 0;
        Ok(buffer.len())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::syntax::HlType;

    const TEST_SYNTAX: Syntax = Syntax {
        name: "test",
        filematch: &[".tst"],
        keywords: &["if", "int|"],
        sl_comment_start: Some("//"),
        ml_comment_delims: Some(("/*", "*/")),
        highlight_numbers: true,
        highlight_strings: true,
    };

    fn doc_with_lines(lines: &[&str]) -> Document {
        let mut doc = Document::new(8);
        doc.syntax = Some(&TEST_SYNTAX);
        for (i, line) in lines.iter().enumerate() {
            doc.insert_row(i, line.as_bytes().to_vec());
        }
        doc.dirty = 0;
        doc
    }

    fn assert_indices(doc: &Document) {
        for (i, row) in doc.rows.iter().enumerate() {
            assert_eq!(row.index, i, "row {i} has a stale index");
        }
    }

    fn chars(doc: &Document) -> Vec<&[u8]> {
        doc.rows.iter().map(|row| row.chars.as_slice()).collect()
    }

    #[test]
    fn insert_and_delete_rows_keep_indices() {
        let mut doc = doc_with_lines(&["a", "b", "c"]);
        doc.insert_row(1, b"x".to_vec());
        assert_eq!(chars(&doc), [b"a", b"x", b"b", b"c"]);
        assert_indices(&doc);

        doc.delete_row(0);
        assert_eq!(chars(&doc), [b"x", b"b", b"c"]);
        assert_indices(&doc);
        assert!(doc.dirty > 0);
    }

    #[test]
    fn split_and_join_roundtrip() {
        let mut doc = doc_with_lines(&["hello"]);
        doc.split_row(0, 2);
        assert_eq!(chars(&doc), [b"he".as_slice(), b"llo".as_slice()]);
        assert_indices(&doc);

        doc.join_row(1);
        assert_eq!(chars(&doc), [b"hello"]);
        assert_indices(&doc);
    }

    #[test]
    fn insert_char_past_last_row_adds_a_row() {
        let mut doc = Document::new(8);
        doc.insert_char(0, 0, b'a');
        assert_eq!(chars(&doc), [b"a"]);
        assert!(doc.dirty > 0);
    }

    #[test]
    fn insert_newline_at_line_start_and_middle() {
        let mut doc = doc_with_lines(&["ab"]);
        doc.insert_newline(0, 0);
        assert_eq!(chars(&doc), [b"".as_slice(), b"ab".as_slice()]);

        doc.insert_newline(1, 1);
        assert_eq!(chars(&doc), [b"".as_slice(), b"a".as_slice(), b"b".as_slice()]);
        assert_indices(&doc);
    }

    #[test]
    fn delete_char_edges_are_no_ops() {
        let mut doc = doc_with_lines(&["ab"]);
        doc.delete_char(0, 0);
        assert_eq!(chars(&doc), [b"ab"]);
        assert_eq!(doc.dirty, 0);

        // One past the last row
        doc.delete_char(0, 1);
        assert_eq!(chars(&doc), [b"ab"]);
        assert_eq!(doc.dirty, 0);
    }

    #[test]
    fn delete_char_removes_byte_or_joins_rows() {
        let mut doc = doc_with_lines(&["ab", "cd"]);
        doc.delete_char(2, 0);
        assert_eq!(chars(&doc), [b"a".as_slice(), b"cd".as_slice()]);

        doc.delete_char(0, 1);
        assert_eq!(chars(&doc), [b"acd"]);
        assert_indices(&doc);
    }

    #[test]
    fn highlight_state_spans_multi_line_comments() {
        let doc = doc_with_lines(&["int a;", "b", "/*", "one", "two", "three", "*/", "end"]);
        for y in 2..=6 {
            assert_eq!(
                doc.rows[y].hl,
                vec![HlType::MlComment; doc.rows[y].render.len()],
                "row {y} should be entirely inside the comment"
            );
        }
        for y in [2, 3, 4, 5] {
            assert!(doc.rows[y].hl_open_comment, "row {y} should end inside the comment");
        }
        assert!(!doc.rows[6].hl_open_comment);
        assert_eq!(doc.rows[7].hl, vec![HlType::Normal; 3]);
    }

    #[test]
    fn deleting_comment_opener_cascades_downward() {
        let mut doc = doc_with_lines(&["int a;", "b", "/*", "one", "two", "three", "*/", "end"]);
        doc.delete_row(2);

        for row in &doc.rows {
            assert!(!row.hl_open_comment, "row {} still ends inside a comment", row.index);
        }
        // The rows that used to sit inside the comment are plain again, and
        // the dangling "*/" is classified as ordinary punctuation.
        assert_eq!(doc.rows[2].hl, vec![HlType::Normal; 3]);
        assert_eq!(doc.rows[5].chars, b"*/");
        assert_eq!(doc.rows[5].hl, vec![HlType::Normal; 2]);
        assert_indices(&doc);
    }

    #[test]
    fn incremental_cascade_matches_full_rehighlight() {
        let mut doc = doc_with_lines(&["x /* y", "z", "*/ int 7", "\"s\"", "4.5 // c"]);
        doc.delete_row(0);
        doc.insert_row(1, b"/* fresh".to_vec());
        doc.insert_char(0, 0, b'w');
        doc.split_row(2, 1);
        doc.join_row(1);

        let incremental: Vec<_> =
            doc.rows.iter().map(|row| (row.hl.clone(), row.hl_open_comment)).collect();
        doc.update_all_rows();
        let full: Vec<_> =
            doc.rows.iter().map(|row| (row.hl.clone(), row.hl_open_comment)).collect();
        assert_eq!(incremental, full);
    }

    #[test]
    fn hl_length_always_matches_render() {
        let mut doc = doc_with_lines(&["a\tb", "/* c", "d */"]);
        doc.insert_char(1, 0, b'\t');
        doc.delete_char(1, 2);
        for row in &doc.rows {
            assert_eq!(row.hl.len(), row.render.len());
        }
    }

    #[test]
    fn load_strips_line_terminators() {
        let tmp_dir = TempDir::new().expect("Could not create temporary directory");
        let path = tmp_dir.path().join("in.txt");
        std::fs::write(&path, b"alpha\nbeta\r\ngamma").expect("Could not write test file");

        let mut doc = Document::new(8);
        doc.load(&path).expect("Could not load test file");
        assert_eq!(chars(&doc), [b"alpha".as_slice(), b"beta".as_slice(), b"gamma".as_slice()]);
        assert_eq!(doc.dirty, 0);
        assert_indices(&doc);
    }

    #[test]
    fn load_of_missing_file_is_an_error() {
        let tmp_dir = TempDir::new().expect("Could not create temporary directory");
        let mut doc = Document::new(8);
        assert!(doc.load(&tmp_dir.path().join("missing.txt")).is_err());
    }

    #[test]
    fn save_appends_trailing_newline_and_resets_dirty() {
        let tmp_dir = TempDir::new().expect("Could not create temporary directory");
        let path = tmp_dir.path().join("out.txt");
        let mut doc = doc_with_lines(&["a"]);
        doc.insert_char(1, 0, b'b');
        assert!(doc.dirty > 0);

        let written = doc.save(path.to_str().unwrap()).expect("Could not save");
        assert_eq!(written, 3);
        assert_eq!(std::fs::read(&path).unwrap(), b"ab\n");
        assert_eq!(doc.dirty, 0);
    }

    #[test]
    fn save_then_load_roundtrips() {
        let tmp_dir = TempDir::new().expect("Could not create temporary directory");
        let path = tmp_dir.path().join("roundtrip.txt");
        let mut doc = doc_with_lines(&["one", "", "three"]);
        doc.save(path.to_str().unwrap()).expect("Could not save");

        let mut reloaded = Document::new(8);
        reloaded.load(&path).expect("Could not reload");
        assert_eq!(chars(&reloaded), chars(&doc));
        assert_eq!(reloaded.dirty, 0);
    }

    #[test]
    fn save_truncates_previous_contents() {
        let tmp_dir = TempDir::new().expect("Could not create temporary directory");
        let path = tmp_dir.path().join("out.txt");
        std::fs::write(&path, b"something much longer than the document")
            .expect("Could not write test file");

        let mut doc = doc_with_lines(&["hi"]);
        doc.save(path.to_str().unwrap()).expect("Could not save");
        assert_eq!(std::fs::read(&path).unwrap(), b"hi\n");
    }
}
