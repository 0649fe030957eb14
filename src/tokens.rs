use regex::Regex;
use std::fmt;

#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum SpecialChar {
    OpenSquareBracket,
    CloseSquareBracket,
    OpenBraceBracket,
    CloseBraceBracket,
    OpenRoundBracket,
    CloseRoundBracket,
    Quote,
    Backtick,
    Tilde,
    Caret,
    AtSign,
}

impl SpecialChar {
    pub fn as_char(self) -> char {
        use SpecialChar::*;
        match self {
            OpenSquareBracket => '[',
            CloseSquareBracket => ']',
            OpenBraceBracket => '{',
            CloseBraceBracket => '}',
            OpenRoundBracket => '(',
            CloseRoundBracket => ')',
            Quote => '\'',
            Backtick => '`',
            Tilde => '~',
            Caret => '^',
            AtSign => '@',
        }
    }
}

#[derive(Debug, Eq, PartialEq)]
pub enum Token<'a> {
    SpliceUnquote,
    SpecialChar(SpecialChar),
    /// The contents between the quotes, escapes not yet processed.
    StringLiteral(&'a str),
    Comment(&'a str),
    PlainChars(&'a str),
}

#[derive(Debug)]
pub enum TokenizerError {
    UnexpectedCharacter(char),
    UnbalancedString,
    NoCapture(String),
}

impl fmt::Display for TokenizerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenizerError::UnexpectedCharacter(c) => write!(f, "unexpected character {:?}", c),
            TokenizerError::UnbalancedString => write!(f, "unbalanced string literal"),
            TokenizerError::NoCapture(rest) => {
                write!(f, "token regex did not capture a token from {:?}", rest)
            }
        }
    }
}

fn create_token(captured: &str) -> Result<Token, TokenizerError> {
    use SpecialChar::*;
    let bytes = captured.as_bytes();
    match bytes[0] {
        b'~' if captured == "~@" => Ok(Token::SpliceUnquote),
        b'~' => Ok(Token::SpecialChar(Tilde)),
        b'[' => Ok(Token::SpecialChar(OpenSquareBracket)),
        b'{' => Ok(Token::SpecialChar(OpenBraceBracket)),
        b'(' => Ok(Token::SpecialChar(OpenRoundBracket)),
        b']' => Ok(Token::SpecialChar(CloseSquareBracket)),
        b'}' => Ok(Token::SpecialChar(CloseBraceBracket)),
        b')' => Ok(Token::SpecialChar(CloseRoundBracket)),
        b'\'' => Ok(Token::SpecialChar(Quote)),
        b'`' => Ok(Token::SpecialChar(Backtick)),
        b'^' => Ok(Token::SpecialChar(Caret)),
        b'@' => Ok(Token::SpecialChar(AtSign)),
        b'"' => tokenize_string_literal(captured),
        // ; is ASCII so it is safe to slice after it even if the rest of the comment isn't.
        b';' => Ok(Token::Comment(&captured[1..])),
        _ => Ok(Token::PlainChars(captured)),
    }
}

fn tokenize_string_literal(captured: &str) -> Result<Token, TokenizerError> {
    let bytes = captured.as_bytes();
    if bytes.len() == 1 || bytes[bytes.len() - 1] != b'"' {
        return Err(TokenizerError::UnbalancedString);
    }

    // A closing quote preceded by an odd number of backslashes is escaped.
    let trailing_backslashes = bytes
        .iter()
        .rev()
        .skip(1)
        .take_while(|&&byte| byte == b'\\')
        .count();
    if trailing_backslashes % 2 == 1 {
        return Err(TokenizerError::UnbalancedString);
    }

    Ok(Token::StringLiteral(&captured[1..captured.len() - 1]))
}

pub fn tokenize(input: &str) -> Result<Vec<Token>, TokenizerError> {
    lazy_static! {
        static ref TOKEN_RE: Regex = Regex::new(
            r#"(?x)                          # ignore whitespace in this pattern & allow comments
                ^[\s,]*                      # whitespace or commas, ignored
                (                            # token capture group
                    ~@                       # literal splice-unquote
                    |[\[\]{}()'`~^@]         # single special characters
                    |"(?:                    # string literal. its contents, not captured, include:
                        \\.                  #    escapes
                        |[^\\"]              #    anything which isn't a backslash or a quote
                      )*
                      "?                     #    possibly missing a closing quote
                    |;.*                     # comments
                    |[^\s\[\]{}('"`,;)]*     # zero or more plain characters
                )
            "#
        )
        .expect("token regex is valid");
    }
    let mut input = input;
    let mut tokens = Vec::new();
    while !input.is_empty() {
        let caps = TOKEN_RE
            .captures(input)
            .ok_or_else(|| TokenizerError::NoCapture(String::from(input)))?;
        let whole = caps.get(0).map_or(0, |m| m.end());
        let token = caps.get(1).map_or("", |m| m.as_str());
        if token.is_empty() {
            match input[whole..].chars().next() {
                // Only trailing whitespace was left.
                None => break,
                Some(c) => return Err(TokenizerError::UnexpectedCharacter(c)),
            }
        }
        tokens.push(create_token(token)?);
        input = &input[whole..];
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::SpecialChar::*;
    use super::*;

    #[test]
    fn splits_on_whitespace_and_commas() {
        let tokens = tokenize("(+ 1,2)").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::SpecialChar(OpenRoundBracket),
                Token::PlainChars("+"),
                Token::PlainChars("1"),
                Token::PlainChars("2"),
                Token::SpecialChar(CloseRoundBracket),
            ]
        );
    }

    #[test]
    fn recognises_reader_macros() {
        let tokens = tokenize("'a `b ~c ~@d @e").unwrap();
        assert_eq!(tokens[0], Token::SpecialChar(Quote));
        assert_eq!(tokens[2], Token::SpecialChar(Backtick));
        assert_eq!(tokens[4], Token::SpecialChar(Tilde));
        assert_eq!(tokens[6], Token::SpliceUnquote);
        assert_eq!(tokens[8], Token::SpecialChar(AtSign));
    }

    #[test]
    fn strings_and_comments() {
        let tokens = tokenize(r#""a \"b\"" ; trailing"#).unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::StringLiteral(r#"a \"b\""#),
                Token::Comment(" trailing")
            ]
        );
    }

    #[test]
    fn trailing_whitespace_is_ignored() {
        assert_eq!(tokenize("a   \n").unwrap(), vec![Token::PlainChars("a")]);
        assert!(tokenize("   ").unwrap().is_empty());
    }

    #[test]
    fn unterminated_strings_are_rejected() {
        assert!(matches!(
            tokenize(r#""abc"#),
            Err(TokenizerError::UnbalancedString)
        ));
        assert!(matches!(
            tokenize(r#""abc\""#),
            Err(TokenizerError::UnbalancedString)
        ));
    }
}
