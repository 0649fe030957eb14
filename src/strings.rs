// Mal only defines the escapes \n, \" and \\ in a string literal, so
// implement exactly that rather than inheriting rust's string literal rules.

use bimap::BiMap;
use std::fmt;
use std::str::Chars;

lazy_static! {
    /// Escape letter on the left, the character it stands for on the right.
    static ref ESCAPES: BiMap<char, char> = {
        let mut m = BiMap::new();
        m.insert('\\', '\\');
        m.insert('"', '"');
        m.insert('n', '\n');
        m
    };
}

#[derive(Debug)]
pub enum BuildError {
    UnknownEscape(char),
    UnexpectedSingleBackslash,
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::UnknownEscape(c) => write!(f, "unknown escape sequence \\{}", c),
            BuildError::UnexpectedSingleBackslash => write!(f, "string ends with a lone backslash"),
        }
    }
}

struct Unescaper<'a> {
    chars: Chars<'a>,
}

impl Iterator for Unescaper<'_> {
    type Item = Result<char, BuildError>;

    fn next(&mut self) -> Option<Self::Item> {
        let result = match self.chars.next()? {
            '\\' => match self.chars.next() {
                None => Err(BuildError::UnexpectedSingleBackslash),
                Some(c) => ESCAPES
                    .get_by_left(&c)
                    .copied()
                    .ok_or(BuildError::UnknownEscape(c)),
            },
            c => Ok(c),
        };
        Some(result)
    }
}

/// The string a literal's contents (without the surrounding quotes) denote.
pub(crate) fn unescape(src: &str) -> Result<String, BuildError> {
    Unescaper { chars: src.chars() }.collect()
}

/// The literal which reads back as `src`, quotes included.
pub(crate) fn string_repr(src: &str) -> String {
    let mut output = String::with_capacity(src.len() + 2);
    output.push('"');
    for c in src.chars() {
        match ESCAPES.get_by_right(&c) {
            Some(&escape) => {
                output.push('\\');
                output.push(escape);
            }
            None => output.push(c),
        }
    }
    output.push('"');
    output
}
