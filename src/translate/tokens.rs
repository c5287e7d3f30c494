//! Pipeline passes that work on the token stream rather than the raw text,
//!  so that operators and keywords inside string literals are left alone.
use crate::{
    context::ContextBindings,
    lex::{Lexer, Token, TokenType, tokenize},
    translate::Untranslatable,
};

/// Copies [text], replacing each token for which [replace] returns Some.
///  Text between tokens (whitespace) is kept as is.
fn rewrite_tokens(
    text: &str,
    replace: impl Fn(&Lexer, &Token) -> Option<&'static str>,
) -> Result<String, Untranslatable> {
    let mut lexer = Lexer::new(text);
    let mut out = String::with_capacity(text.len() + 16);
    let mut copied = 0;
    while let Some(tok) = lexer.next_token()? {
        if let Some(replacement) = replace(&lexer, &tok) {
            out.push_str(&text[copied..tok.start]);
            out.push_str(replacement);
            copied = tok.end;
        }
    }
    out.push_str(&text[copied..]);
    Ok(out)
}

/// `Col IN (a, b)` → `(Col eq a or Col eq b)` and
///  `Col NOT IN (a, b)` → `(Col neq a and Col neq b)`.
///
/// Values keep their literal form. Lists that are empty, contain an empty
///  item, or nest parentheses are left untouched.
pub(crate) fn expand_in_lists(text: &str, _: &ContextBindings) -> Result<String, Untranslatable> {
    let lexer = Lexer::new(text);
    let tokens = tokenize(text)?;
    let mut out = String::with_capacity(text.len() * 2);
    let mut copied = 0;
    let mut i = 0;

    while i < tokens.len() {
        let col = &tokens[i];
        if col.ty != TokenType::Identifier || lexer.is_word(col, "NOT") {
            i += 1;
            continue;
        }
        let negated = tokens
            .get(i + 1)
            .is_some_and(|t| lexer.is_word(t, "NOT"));
        let in_at = if negated { i + 2 } else { i + 1 };
        let is_list = tokens.get(in_at).is_some_and(|t| lexer.is_word(t, "IN"))
            && tokens
                .get(in_at + 1)
                .is_some_and(|t| t.ty == TokenType::ParenLeft);
        let Some((values, close)) = is_list
            .then(|| list_values(text, &tokens, in_at + 2))
            .flatten()
        else {
            i += 1;
            continue;
        };

        let col = lexer.source_of(col);
        let (op, joiner) = if negated { ("neq", " and ") } else { ("eq", " or ") };
        out.push_str(&text[copied..tokens[i].start]);
        out.push('(');
        for (n, value) in values.iter().enumerate() {
            if n > 0 {
                out.push_str(joiner);
            }
            out.push_str(&format!("{col} {op} {value}"));
        }
        out.push(')');
        copied = tokens[close].end;
        i = close + 1;
    }

    out.push_str(&text[copied..]);
    Ok(out)
}

/// Reads comma separated values starting at [start] (just past the opening
///  paren). Returns the value texts and the index of the closing paren.
fn list_values<'a>(
    text: &'a str,
    tokens: &[Token],
    start: usize,
) -> Option<(Vec<&'a str>, usize)> {
    let mut values = Vec::new();
    let mut value_start: Option<usize> = None;
    let mut value_end = 0;

    for (idx, tok) in tokens.iter().enumerate().skip(start) {
        match tok.ty {
            TokenType::ParenLeft => return None,
            TokenType::Comma | TokenType::ParenRight => {
                values.push(text[value_start?..value_end].trim());
                value_start = None;
                if tok.ty == TokenType::ParenRight {
                    return Some((values, idx));
                }
            }
            _ => {
                value_start.get_or_insert(tok.start);
                value_end = tok.end;
            }
        }
    }
    None
}

/// `<>` and `!=` → `neq`. The target grammar has no `ne`.
pub(crate) fn not_equals(text: &str, _: &ContextBindings) -> Result<String, Untranslatable> {
    rewrite_tokens(text, |_, tok| {
        matches!(tok.ty, TokenType::NotEquals | TokenType::BangEquals).then_some(" neq ")
    })
}

/// `=` and `==` → `eq`. `<=` and `>=` are separate tokens and never match,
///  nor do `eq`/`neq` emitted earlier.
pub(crate) fn equals(text: &str, _: &ContextBindings) -> Result<String, Untranslatable> {
    rewrite_tokens(text, |_, tok| {
        matches!(tok.ty, TokenType::Equals | TokenType::DoubleEquals).then_some(" eq ")
    })
}

pub(crate) fn lowercase_connectives(
    text: &str,
    _: &ContextBindings,
) -> Result<String, Untranslatable> {
    rewrite_tokens(text, |lexer, tok| {
        if lexer.is_word(tok, "AND") {
            Some("and")
        } else if lexer.is_word(tok, "OR") {
            Some("or")
        } else {
            None
        }
    })
}

/// What an and/or expression amounts to once the `1 eq 1` / `1 eq 0` markers
///  left by context substitution are folded away.
#[derive(Debug, PartialEq)]
enum Truth {
    Always,
    Never,
    /// The filter text and whether it has a top-level connective.
    Filter(String, bool),
}

impl Truth {
    fn chain(mut kept: Vec<(String, bool)>, joiner: &str, empty: Truth) -> Truth {
        match kept.len() {
            0 => empty,
            1 => {
                let (f, compound) = kept.remove(0);
                Truth::Filter(f, compound)
            }
            _ => Truth::Filter(
                kept.into_iter()
                    .map(|(f, _)| f)
                    .collect::<Vec<_>>()
                    .join(joiner),
                true,
            ),
        }
    }
}

struct Simplifier<'a> {
    lexer: Lexer<'a>,
    tokens: Vec<Token>,
}

impl<'a> Simplifier<'a> {
    fn text_of(&self, range: &[Token]) -> &'a str {
        match (range.first(), range.last()) {
            (Some(first), Some(last)) => {
                let full = Token {
                    ty: TokenType::Other,
                    start: first.start,
                    end: last.end,
                };
                self.lexer.source_of(&full)
            }
            _ => "",
        }
    }

    /// Splits [range] on the connective [word] outside of parentheses.
    fn split<'t>(&self, range: &'t [Token], word: &str) -> Vec<&'t [Token]> {
        let mut parts = Vec::new();
        let mut depth = 0usize;
        let mut part_start = 0;
        for (idx, tok) in range.iter().enumerate() {
            match tok.ty {
                TokenType::ParenLeft => depth += 1,
                TokenType::ParenRight => depth = depth.saturating_sub(1),
                _ if depth == 0 && self.lexer.is_word(tok, word) => {
                    parts.push(&range[part_start..idx]);
                    part_start = idx + 1;
                }
                _ => {}
            }
        }
        parts.push(&range[part_start..]);
        parts
    }

    fn eval_or(&self, range: &[Token]) -> Truth {
        let mut kept = Vec::new();
        for part in self.split(range, "or") {
            match self.eval_and(part) {
                Truth::Always => return Truth::Always,
                Truth::Never => {}
                Truth::Filter(f, compound) => kept.push((f, compound)),
            }
        }
        Truth::chain(kept, " or ", Truth::Never)
    }

    fn eval_and(&self, range: &[Token]) -> Truth {
        let mut kept = Vec::new();
        for part in self.split(range, "and") {
            match self.eval_atom(part) {
                Truth::Always => {}
                Truth::Never => return Truth::Never,
                Truth::Filter(f, compound) => kept.push((f, compound)),
            }
        }
        Truth::chain(kept, " and ", Truth::Always)
    }

    fn eval_atom(&self, range: &[Token]) -> Truth {
        if let Some(inner) = self.group_inner(range) {
            return match self.eval_or(inner) {
                Truth::Filter(f, true) => Truth::Filter(format!("({f})"), false),
                other => other,
            };
        }
        match marker(&self.lexer, range) {
            Some(true) => Truth::Always,
            Some(false) => Truth::Never,
            None => Truth::Filter(self.text_of(range).to_string(), false),
        }
    }

    /// If [range] is entirely one parenthesized group, the tokens inside it.
    fn group_inner<'t>(&self, range: &'t [Token]) -> Option<&'t [Token]> {
        let (first, rest) = range.split_first()?;
        if first.ty != TokenType::ParenLeft {
            return None;
        }
        let mut depth = 1usize;
        for (idx, tok) in rest.iter().enumerate() {
            match tok.ty {
                TokenType::ParenLeft => depth += 1,
                TokenType::ParenRight => {
                    depth -= 1;
                    if depth == 0 {
                        return (idx == rest.len() - 1).then(|| &rest[..idx]);
                    }
                }
                _ => {}
            }
        }
        None
    }
}

/// `1 eq 1` is Some(true), `1 eq 0` is Some(false).
fn marker(lexer: &Lexer, range: &[Token]) -> Option<bool> {
    let [one, eq, rhs] = range else {
        return None;
    };
    if one.ty != TokenType::Number
        || lexer.source_of(one) != "1"
        || !lexer.is_word(eq, "eq")
        || rhs.ty != TokenType::Number
    {
        return None;
    }
    match lexer.source_of(rhs) {
        "1" => Some(true),
        "0" => Some(false),
        _ => None,
    }
}

/// Folds tautology and contradiction markers.
///
/// A contradiction removes its or-branch, and an expression left with no
///  branch at all cannot be expressed as a filter. A tautology removes its
///  and-clause; when every clause goes, the marker itself is kept so the
///  result is never an empty string.
pub(crate) fn fold_markers(text: &str, _: &ContextBindings) -> Result<String, Untranslatable> {
    let simplifier = Simplifier {
        lexer: Lexer::new(text),
        tokens: tokenize(text)?,
    };
    let has_marker = simplifier
        .tokens
        .windows(3)
        .any(|w| marker(&simplifier.lexer, w).is_some());
    if !has_marker {
        return Ok(text.to_string());
    }

    match simplifier.eval_or(&simplifier.tokens) {
        Truth::Filter(f, _) => Ok(f),
        Truth::Never => Err(Untranslatable::VacuousResult),
        Truth::Always => Ok("1 eq 1".to_string()),
    }
}
