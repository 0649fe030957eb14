use crate::strings;
use crate::tokens::{tokenize, SpecialChar, Token, TokenizerError};
use crate::types::{self, MalInt, MalObject, MapError};
use regex::Regex;
use std::fmt;
use std::iter::Peekable;
use std::slice;

type Reader<'a> = Peekable<slice::Iter<'a, Token<'a>>>;

#[derive(Debug)]
pub enum Error {
    NothingToRead,
    UnbalancedInput(&'static str),
    UnexpectedToken(char),
    MalformedLiteral(String),
    BadMap(MapError),
    Tokenizer(TokenizerError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NothingToRead => write!(f, "nothing to read"),
            Error::UnbalancedInput(what) => write!(f, "unbalanced {}: reached EOF", what),
            Error::UnexpectedToken(c) => write!(f, "unexpected '{}'", c),
            Error::MalformedLiteral(s) => write!(f, "malformed literal {}", s),
            Error::BadMap(MapError::MissingValue) => write!(f, "map literal is missing a value"),
            Error::BadMap(MapError::UnhashableKey) => {
                write!(f, "map keys must be strings or keywords")
            }
            Error::Tokenizer(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<TokenizerError> for Error {
    fn from(e: TokenizerError) -> Self {
        match e {
            TokenizerError::UnbalancedString => Error::UnbalancedInput("string"),
            TokenizerError::UnexpectedCharacter(c) => Error::MalformedLiteral(c.to_string()),
            e => Error::Tokenizer(e),
        }
    }
}

pub type Result<T = MalObject> = std::result::Result<T, Error>;

/// Read the first form in `input`. Anything after it is ignored.
pub fn read_str(input: &str) -> Result {
    let tokens: Vec<Token> = tokenize(input)?
        .into_iter()
        .filter(|token| !matches!(token, Token::Comment(_)))
        .collect();
    let mut reader = tokens.iter().peekable();
    match reader.peek() {
        None => Err(Error::NothingToRead),
        Some(_) => read_form(&mut reader),
    }
}

fn read_form(reader: &mut Reader) -> Result {
    use SpecialChar::*;
    let token = reader.next().ok_or(Error::UnbalancedInput("form"))?;
    match token {
        Token::SpecialChar(OpenRoundBracket) => {
            read_sequence(reader, CloseRoundBracket, "list").map(MalObject::wrap_list)
        }
        Token::SpecialChar(OpenSquareBracket) => {
            read_sequence(reader, CloseSquareBracket, "vector").map(MalObject::wrap_vector)
        }
        Token::SpecialChar(OpenBraceBracket) => {
            let entries = read_sequence(reader, CloseBraceBracket, "map")?;
            types::build_map(entries).map_err(Error::BadMap)
        }
        Token::SpecialChar(Quote) => read_wrapped("quote", reader),
        Token::SpecialChar(Backtick) => read_wrapped("quasiquote", reader),
        Token::SpecialChar(Tilde) => read_wrapped("unquote", reader),
        Token::SpliceUnquote => read_wrapped("splice-unquote", reader),
        Token::SpecialChar(AtSign) => read_wrapped("deref", reader),
        Token::SpecialChar(c) => Err(Error::UnexpectedToken(c.as_char())),
        Token::StringLiteral(s) => strings::unescape(s)
            .map(MalObject::String)
            .map_err(|e| Error::MalformedLiteral(format!("\"{}\" ({})", s, e))),
        Token::PlainChars(chars) => read_atom(chars),
        Token::Comment(_) => Err(Error::NothingToRead),
    }
}

fn read_sequence(
    reader: &mut Reader,
    closer: SpecialChar,
    what: &'static str,
) -> Result<Vec<MalObject>> {
    let mut elements = Vec::new();
    loop {
        match reader.peek() {
            Some(Token::SpecialChar(c)) if *c == closer => {
                reader.next();
                return Ok(elements);
            }
            Some(_) => elements.push(read_form(reader)?),
            None => return Err(Error::UnbalancedInput(what)),
        }
    }
}

// 'x => (quote x) and friends
fn read_wrapped(name: &str, reader: &mut Reader) -> Result {
    let form = read_form(reader)?;
    Ok(MalObject::wrap_list(vec![MalObject::new_symbol(name), form]))
}

fn read_atom(chars: &str) -> Result {
    lazy_static! {
        static ref INT_RE: Regex = Regex::new(r"^[+-]?\d+$").expect("int regex is valid");
        static ref FLOAT_RE: Regex =
            Regex::new(r"^[+-]?(\d+\.\d*|\.\d+|\d+(\.\d*)?[eE][+-]?\d+)$")
                .expect("float regex is valid");
        static ref NUMBERISH_RE: Regex =
            Regex::new(r"^[+-]?\.?\d").expect("number prefix regex is valid");
    }
    let malformed = || Error::MalformedLiteral(String::from(chars));
    if INT_RE.is_match(chars) {
        return chars.parse::<MalInt>().map(MalObject::Integer).map_err(|_| malformed());
    }
    if FLOAT_RE.is_match(chars) {
        return chars.parse::<f64>().map(MalObject::Float).map_err(|_| malformed());
    }
    if NUMBERISH_RE.is_match(chars) {
        return Err(malformed());
    }
    Ok(match chars {
        "nil" => MalObject::Nil,
        "true" => MalObject::Bool(true),
        "false" => MalObject::Bool(false),
        _ => match chars.strip_prefix(':') {
            Some(keyword) => MalObject::new_keyword(keyword),
            None => MalObject::new_symbol(chars),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(src: &str) -> MalObject {
        read_str(src).unwrap()
    }

    #[test]
    fn reads_scalars() {
        assert_eq!(read("42"), MalObject::Integer(42));
        assert_eq!(read("-7"), MalObject::Integer(-7));
        assert!(matches!(read("2.5"), MalObject::Float(x) if x == 2.5));
        assert!(matches!(read("1e3"), MalObject::Float(x) if x == 1000.0));
        assert_eq!(read("nil"), MalObject::Nil);
        assert_eq!(read("true"), MalObject::Bool(true));
        assert_eq!(read(":kw"), MalObject::new_keyword("kw"));
        assert_eq!(read("-"), MalObject::new_symbol("-"));
        assert_eq!(read("abc"), MalObject::new_symbol("abc"));
        assert_eq!(read(r#""a\nb""#), MalObject::String("a\nb".into()));
    }

    #[test]
    fn reads_nested_collections() {
        let form = read("(1 [2 3] {:a 4})");
        assert_eq!(form.to_string(), "(1 [2 3] {:a 4})");
        assert!(read("[1]").is_vector());
    }

    #[test]
    fn expands_reader_macros() {
        assert_eq!(read("'a").to_string(), "(quote a)");
        assert_eq!(read("`(a ~b ~@c)").to_string(), "(quasiquote (a (unquote b) (splice-unquote c)))");
        assert_eq!(read("@a").to_string(), "(deref a)");
    }

    #[test]
    fn reads_only_the_first_form() {
        assert_eq!(read("1 2 3"), MalObject::Integer(1));
    }

    #[test]
    fn comments_and_blank_input_read_nothing() {
        assert!(matches!(read_str("   "), Err(Error::NothingToRead)));
        assert!(matches!(read_str("; just a comment"), Err(Error::NothingToRead)));
        assert_eq!(read("; leading\n5"), MalObject::Integer(5));
    }

    #[test]
    fn unbalanced_input_is_reported() {
        for src in &["(1 2", "[1", "{:a 1", "\"abc", "'"] {
            assert!(
                matches!(read_str(src), Err(Error::UnbalancedInput(_))),
                "{:?} should be unbalanced",
                src
            );
        }
    }

    #[test]
    fn malformed_literals_are_reported() {
        assert!(matches!(read_str("12abc"), Err(Error::MalformedLiteral(_))));
        assert!(matches!(read_str(r#""\q""#), Err(Error::MalformedLiteral(_))));
        assert!(matches!(read_str(")"), Err(Error::UnexpectedToken(')'))));
        assert!(matches!(read_str("{1 2}"), Err(Error::BadMap(_))));
    }
}
