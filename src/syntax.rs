//! # Syntax
//!
//! The highlight classes and the built-in syntax database. The database is a
//! static table; the first entry with a filename pattern matching the current
//! file name becomes the document's syntax.

/// Type of syntax highlighting for a single rendered byte.
///
/// Each `HlType` is associated with an ANSI color, via its discriminant. The
/// color is equal to the discriminant, modulo 100 (so that `Comment` and
/// `MlComment` can share a color). The colors are described here:
/// <https://en.wikipedia.org/wiki/ANSI_escape_code#Colors>
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum HlType {
    /// Default foreground color
    #[default]
    Normal = 39,
    /// Red
    Number = 31,
    /// Magenta
    String = 35,
    /// Cyan
    Comment = 36,
    /// Cyan
    MlComment = 136,
    /// Yellow
    Keyword1 = 33,
    /// Green
    Keyword2 = 32,
    /// Blue
    Match = 34,
}

impl HlType {
    /// The ANSI SGR color code for the highlight class.
    pub(crate) const fn color(self) -> u32 { self as u32 % 100 }
}

/// A syntax descriptor: how to highlight files whose name matches one of the
/// `filematch` patterns.
#[derive(Debug)]
pub struct Syntax {
    /// The name of the language, shown in the status bar.
    pub name: &'static str,
    /// Filename patterns. A pattern starting with `.` matches a file name
    /// suffix; any other pattern matches anywhere in the file name.
    pub filematch: &'static [&'static str],
    /// Keywords to highlight. A trailing `|` marks a secondary keyword; the
    /// `|` itself is not part of the match.
    pub keywords: &'static [&'static str],
    /// The token that starts a single-line comment, e.g. `//`.
    pub sl_comment_start: Option<&'static str>,
    /// The tokens that start and end a multi-line comment, e.g. `("/*", "*/")`.
    pub ml_comment_delims: Option<(&'static str, &'static str)>,
    /// Whether to highlight numbers.
    pub highlight_numbers: bool,
    /// Whether to highlight single-line strings.
    pub highlight_strings: bool,
}

impl Syntax {
    /// Return the first entry of the database whose patterns match `name`, if
    /// any.
    pub fn for_filename(name: &str) -> Option<&'static Self> {
        HLDB.iter().find(|syntax| {
            syntax.filematch.iter().any(|pat| {
                if pat.starts_with('.') { name.ends_with(pat) } else { name.contains(pat) }
            })
        })
    }
}

/// The built-in syntax database.
static HLDB: &[Syntax] = &[
    Syntax {
        name: "c",
        filematch: &[".c", ".h", ".cpp"],
        keywords: &[
            "switch", "if", "while", "for", "break", "continue", "return", "else", "struct",
            "union", "typedef", "static", "enum", "class", "case", "int|", "long|", "double|",
            "float|", "char|", "unsigned|", "signed|", "void|",
        ],
        sl_comment_start: Some("//"),
        ml_comment_delims: Some(("/*", "*/")),
        highlight_numbers: true,
        highlight_strings: true,
    },
    Syntax {
        name: "rust",
        filematch: &[".rs"],
        keywords: &[
            "as", "break", "const", "continue", "crate", "dyn", "else", "enum", "extern", "fn",
            "for", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref",
            "return", "self", "static", "struct", "super", "trait", "type", "unsafe", "use",
            "where", "while", "bool|", "char|", "f32|", "f64|", "i8|", "i16|", "i32|", "i64|",
            "isize|", "str|", "u8|", "u16|", "u32|", "u64|", "usize|", "String|", "Vec|",
            "Option|", "Result|",
        ],
        sl_comment_start: Some("//"),
        ml_comment_delims: Some(("/*", "*/")),
        highlight_numbers: true,
        highlight_strings: true,
    },
];

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("main.c", Some("c"))]
    #[case("main.h", Some("c"))]
    #[case("vector.cpp", Some("c"))]
    #[case("lib.rs", Some("rust"))]
    #[case("notes.txt", None)]
    #[case("c", None)]
    fn filename_matching(#[case] name: &str, #[case] expected: Option<&str>) {
        assert_eq!(Syntax::for_filename(name).map(|s| s.name), expected);
    }

    #[test]
    fn color_codes() {
        assert_eq!(HlType::Normal.color(), 39);
        assert_eq!(HlType::Number.color(), 31);
        assert_eq!(HlType::String.color(), 35);
        assert_eq!(HlType::Comment.color(), 36);
        assert_eq!(HlType::MlComment.color(), 36);
        assert_eq!(HlType::Keyword1.color(), 33);
        assert_eq!(HlType::Keyword2.color(), 32);
        assert_eq!(HlType::Match.color(), 34);
    }
}
