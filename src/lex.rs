/// Tokenizer for legacy SQL WHERE fragments.
///
/// #Notes
/// The lexer is total over its input apart from unterminated string literals:
///  any byte it has no rule for becomes an `Other` token spanning one
///  character, so rewriting passes can copy it through untouched.
/// `-` is always a Minus token; negative numbers are Minus followed by Number.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum TokenType {
    ParenLeft,
    ParenRight,
    Comma,
    Dot,
    Minus,
    Equals,       // =
    NotEquals,    // <>
    BangEquals,   // !=
    DoubleEquals, // ==
    LT,           // <
    GT,           // >
    LTE,          // <=
    GTE,          // >=
    Number,
    Identifier,
    StringSingleQuote,
    StringDoubleQuote, // quoted identifier in SQL
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub ty: TokenType,

    // Byte indexes into the source, always on char boundaries
    pub(crate) start: usize,
    pub(crate) end: usize,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Unterminated string literal starting at {0}")]
    UnterminatedStringLiteral(usize),
}

/// This type simply holds a reference to the source and an index, so it's
///  cheap to copy.
#[derive(Clone)]
pub struct Lexer<'input> {
    source: &'input str,
    current: usize,
}

impl<'input> Lexer<'input> {
    pub fn new(source: &'input str) -> Self {
        Self { source, current: 0 }
    }

    #[inline]
    fn bytes(&self) -> &'input [u8] {
        self.source.as_bytes()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.current >= self.source.len()
    }

    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.bytes().get(self.current).copied()
    }

    #[inline]
    fn pop_unchecked(&mut self) -> u8 {
        let res = self.bytes()[self.current];
        self.current += 1;
        res
    }

    /// If current starts with [prefix], consume it and return true.
    pub fn consume1(&mut self, prefix: u8) -> bool {
        if let Some(c) = self.peek()
            && c == prefix
        {
            self.current += 1;
            true
        } else {
            false
        }
    }

    #[inline]
    fn consume_while(&mut self, predicate: impl Fn(u8) -> bool) {
        while let Some(c) = self.peek()
            && predicate(c)
        {
            self.current += 1;
        }
    }

    #[inline]
    fn consume_whitespace(&mut self) {
        self.consume_while(|b| b.is_ascii_whitespace());
    }

    fn consume_number(&mut self) {
        self.consume_while(|b| b.is_ascii_digit());

        // Optional fraction, only when a digit follows the dot
        if self.peek() == Some(b'.')
            && self
                .bytes()
                .get(self.current + 1)
                .is_some_and(|b| b.is_ascii_digit())
        {
            self.current += 1;
            self.consume_while(|b| b.is_ascii_digit());
        }
    }

    /// Returns the slice of the source that this token was lexed from.
    #[inline]
    pub fn source_of(&self, token: &Token) -> &'input str {
        &self.source[token.start..token.end]
    }

    /// Like [source_of] but omits the opening and closing quotes of string
    ///  literal tokens. Doubled quotes are left as they appear in the source.
    #[inline]
    pub fn contents(&self, token: &Token) -> &'input str {
        let s = self.source_of(token);
        match token.ty {
            TokenType::StringSingleQuote | TokenType::StringDoubleQuote => &s[1..s.len() - 1],
            _ => s,
        }
    }

    /// True if [token] is an identifier spelled [word], ignoring ASCII case.
    pub fn is_word(&self, token: &Token, word: &str) -> bool {
        token.ty == TokenType::Identifier && self.source_of(token).eq_ignore_ascii_case(word)
    }

    pub fn next_token(&mut self) -> Result<Option<Token>, Error> {
        self.consume_whitespace();

        if self.is_empty() {
            return Ok(None);
        }
        let start = self.current;

        // Convenience macro for returning a token from `start` to `self.current`
        macro_rules! tok {
            ($name:ident) => {{
                Token {
                    ty: TokenType::$name,
                    start,
                    end: self.current,
                }
            }};
        }

        Ok(Some(match self.pop_unchecked() {
            b'(' => tok!(ParenLeft),
            b')' => tok!(ParenRight),
            b',' => tok!(Comma),
            b'.' => tok!(Dot),
            b'-' => tok!(Minus),
            b'=' => {
                if self.consume1(b'=') {
                    tok!(DoubleEquals)
                } else {
                    tok!(Equals)
                }
            }
            b'!' => {
                if self.consume1(b'=') {
                    tok!(BangEquals)
                } else {
                    tok!(Other)
                }
            }
            b'<' => {
                if self.consume1(b'>') {
                    tok!(NotEquals)
                } else if self.consume1(b'=') {
                    tok!(LTE)
                } else {
                    tok!(LT)
                }
            }
            b'>' => {
                if self.consume1(b'=') {
                    tok!(GTE)
                } else {
                    tok!(GT)
                }
            }

            // SQL escapes a quote inside a literal by doubling it: 'It''s'
            term if term == b'\'' || term == b'"' => {
                loop {
                    self.consume_while(|b| b != term);
                    if self.is_empty() {
                        return Err(Error::UnterminatedStringLiteral(start));
                    }
                    // consume closing term
                    self.current += 1;
                    if !self.consume1(term) {
                        break;
                    }
                }
                if term == b'"' {
                    tok!(StringDoubleQuote)
                } else {
                    tok!(StringSingleQuote)
                }
            }

            // Identifiers start with a-Z or underscore
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                self.consume_while(|b| matches!(b, b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_'));
                tok!(Identifier)
            }

            b'0'..=b'9' => {
                self.consume_number();
                tok!(Number)
            }

            // Anything else passes through as a single character
            _ => {
                self.consume_while(|b| b & 0b1100_0000 == 0b1000_0000);
                tok!(Other)
            }
        }))
    }
}

/// Lexes all of [source].
pub fn tokenize(source: &str) -> Result<Vec<Token>, Error> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::with_capacity(source.len() / 4);
    while let Some(tok) = lexer.next_token()? {
        tokens.push(tok);
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_all() {
        let tokens = tokenize("A <> 'x'").unwrap();
        let types: Vec<_> = tokens.iter().map(|t| t.ty).collect();
        assert_eq!(
            types,
            vec![
                TokenType::Identifier,
                TokenType::NotEquals,
                TokenType::StringSingleQuote
            ]
        );
        assert_eq!((tokens[2].start, tokens[2].end), (5, 8));
        assert!(tokenize("'x").is_err());
    }

    #[test]
    fn lex_basic() {
        //NOTE this test doesn't use the handy assert_toks macro because we're
        //  checking that the token boundaries are correct as well.
        //              0         1         2
        //              0123456789012345678901234
        let source = r#"'single' "Quoted" (,) T.c"#;
        let mut lexer = Lexer::new(source);

        let tok = lexer.next_token();
        assert_eq!(
            tok,
            Ok(Some(Token {
                ty: TokenType::StringSingleQuote,
                start: 0,
                end: 8
            }))
        );
        assert_eq!(lexer.contents(&tok.unwrap().unwrap()), "single");

        let tok = lexer.next_token();
        assert_eq!(
            tok,
            Ok(Some(Token {
                ty: TokenType::StringDoubleQuote,
                start: 9,
                end: 17
            }))
        );
        assert_eq!(lexer.contents(&tok.unwrap().unwrap()), "Quoted");

        assert_eq!(
            lexer.next_token(),
            Ok(Some(Token {
                ty: TokenType::ParenLeft,
                start: 18,
                end: 19
            }))
        );
        assert_eq!(
            lexer.next_token(),
            Ok(Some(Token {
                ty: TokenType::Comma,
                start: 19,
                end: 20
            }))
        );
        assert_eq!(
            lexer.next_token(),
            Ok(Some(Token {
                ty: TokenType::ParenRight,
                start: 20,
                end: 21
            }))
        );
        assert_eq!(
            lexer.next_token(),
            Ok(Some(Token {
                ty: TokenType::Identifier,
                start: 22,
                end: 23
            }))
        );
        assert_eq!(
            lexer.next_token(),
            Ok(Some(Token {
                ty: TokenType::Dot,
                start: 23,
                end: 24
            }))
        );
        assert_eq!(
            lexer.next_token(),
            Ok(Some(Token {
                ty: TokenType::Identifier,
                start: 24,
                end: 25
            }))
        );
        assert_eq!(lexer.next_token(), Ok(None));
    }

    #[test]
    fn lex_numbers() {
        //             0         1
        //             0123456789012
        let source = "12.3 -4 5.x";
        let mut lexer = Lexer::new(source);
        assert_eq!(
            lexer.next_token(),
            Ok(Some(Token {
                ty: TokenType::Number,
                start: 0,
                end: 4,
            }))
        );
        assert_eq!(
            lexer.next_token(),
            Ok(Some(Token {
                ty: TokenType::Minus,
                start: 5,
                end: 6,
            }))
        );
        assert_eq!(
            lexer.next_token(),
            Ok(Some(Token {
                ty: TokenType::Number,
                start: 6,
                end: 7,
            }))
        );
        // A dot without digits after it is not part of the number
        assert_eq!(
            lexer.next_token(),
            Ok(Some(Token {
                ty: TokenType::Number,
                start: 8,
                end: 9,
            }))
        );
    }

    macro_rules! assert_tok {
        ($lex:ident, $tok_ty:ident) => {{
            let tok = $lex.next_token();
            assert!(
                matches!(
                    tok,
                    Ok(Some(Token {
                        ty: TokenType::$tok_ty,
                        ..
                    }))
                ),
                "Expected {}, got {tok:?}",
                stringify!($tok_ty)
            );
        }};
    }
    macro_rules! assert_toks {
        ($lex:ident, $tok_ty:ident) => {{
            assert_tok!($lex, $tok_ty)
        }};
        ($lex:ident, $tok_ty:ident, $($rest:tt)*) => {
            assert_tok!($lex, $tok_ty);
            assert_toks!($lex, $($rest)*)
        };
    }

    #[test]
    fn lex_comparisons() {
        let mut lexer = Lexer::new("= <> < > <= >= != ==");
        assert_toks!(lexer, Equals, NotEquals, LT, GT, LTE, GTE, BangEquals, DoubleEquals);
    }

    #[test]
    fn lex_in_list() {
        let mut lexer = Lexer::new("DocBaseType IN ('SOO',\n'POO')");
        assert_toks!(
            lexer,
            Identifier,
            Identifier,
            ParenLeft,
            StringSingleQuote,
            Comma,
            StringSingleQuote,
            ParenRight
        );
    }

    #[test]
    fn doubled_quotes() {
        let mut lexer = Lexer::new("'It''s' x");
        let tok = lexer.next_token().unwrap().unwrap();
        assert_eq!(tok.ty, TokenType::StringSingleQuote);
        assert_eq!(lexer.contents(&tok), "It''s");
        assert_toks!(lexer, Identifier);
    }

    #[test]
    fn unterminated_string() {
        let mut lexer = Lexer::new("Name = 'abc");
        assert_toks!(lexer, Identifier, Equals);
        assert_eq!(lexer.next_token(), Err(Error::UnterminatedStringLiteral(7)));
    }

    #[test]
    fn other_chars_keep_char_boundaries() {
        let source = "a ≠ @b";
        let mut lexer = Lexer::new(source);
        assert_toks!(lexer, Identifier);
        let tok = lexer.next_token().unwrap().unwrap();
        assert_eq!(tok.ty, TokenType::Other);
        assert_eq!(lexer.source_of(&tok), "≠");
        assert_toks!(lexer, Other, Identifier);
    }

    #[test]
    fn words_ignore_case() {
        let mut lexer = Lexer::new("In");
        let tok = lexer.next_token().unwrap().unwrap();
        assert!(lexer.is_word(&tok, "IN"));
        assert!(!lexer.is_word(&tok, "INTO"));
    }
}
