use std::{borrow::Cow, sync::LazyLock};

use regex::{Captures, Regex};

use crate::{
    context::{ContextBindings, ContextValue},
    lex::{Lexer, TokenType, tokenize},
    translate::Untranslatable,
};

static COALESCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)COALESCE\s*\(\s*(\w+)\s*,\s*'[^']*'\s*\)").unwrap()
});
pub(crate) static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@#?(\w+)@").unwrap());
static YES_NO_COMPARISON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'([YN])'\s*=\s*'([YN])'").unwrap());
static YES_NO_OPERAND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(n?eq)\s+'([YN])'").unwrap());
static WRAPPED_CLAUSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\s*(\w+\s+eq\s+\S+)\s*\)").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// `C_DocType.DocBaseType` → `DocBaseType`. A qualifier is an identifier
///  directly followed by a dot and another identifier, so `1.5` and the
///  contents of string literals are never touched. One qualifier per match.
pub(crate) fn strip_qualifiers(text: &str, _: &ContextBindings) -> Result<String, Untranslatable> {
    let tokens = tokenize(text)?;
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    let mut i = 0;
    while i + 2 < tokens.len() {
        if let [table, dot, column] = &tokens[i..i + 3]
            && table.ty == TokenType::Identifier
            && dot.ty == TokenType::Dot
            && column.ty == TokenType::Identifier
            && table.end == dot.start
            && dot.end == column.start
        {
            out.push_str(&text[copied..table.start]);
            copied = column.start;
            i += 3;
        } else {
            i += 1;
        }
    }
    out.push_str(&text[copied..]);
    Ok(out)
}

/// `COALESCE(Col, 'x')` → `Col`. Only the two argument form with a quoted
///  literal fallback is recognized.
pub(crate) fn strip_coalesce(text: &str, _: &ContextBindings) -> Result<String, Untranslatable> {
    Ok(COALESCE.replace_all(text, "${1}").into_owned())
}

/// A value spliced into a string literal: no quotes of its own.
fn literal_value(value: &ContextValue) -> String {
    match value {
        ContextValue::Bool(b) => String::from(if *b { "Y" } else { "N" }),
        ContextValue::Number(n) => n.to_string(),
        ContextValue::Str(s) => s.replace('\'', "''"),
    }
}

fn bare_value(value: &ContextValue) -> String {
    match value {
        ContextValue::Number(n) => n.to_string(),
        _ => format!("'{}'", literal_value(value)),
    }
}

fn substitute<'t>(
    text: &'t str,
    ctx: &ContextBindings,
    render: fn(&ContextValue) -> String,
) -> Cow<'t, str> {
    PLACEHOLDER.replace_all(text, |caps: &Captures| match ctx.get(&caps[1]) {
        Some(value) => render(value),
        None => caps[0].to_string(),
    })
}

/// Replaces `@Name@` placeholders with their bound values.
///
/// Booleans always become the yes/no letters `Y`/`N`; later passes turn
///  them into `true`/`false` or fold them away. Inside a string literal the
///  value is spliced in as is (`'@IsSOTrx@'` → `'Y'`, `'%@Name@%'` →
///  `'%abc%'`). Outside one, numbers stay bare and everything else is quoted.
pub(crate) fn substitute_context(
    text: &str,
    ctx: &ContextBindings,
) -> Result<String, Untranslatable> {
    let mut lexer = Lexer::new(text);
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    while let Some(tok) = lexer.next_token()? {
        if tok.ty != TokenType::StringSingleQuote {
            continue;
        }
        out.push_str(&substitute(&text[copied..tok.start], ctx, bare_value));
        out.push('\'');
        out.push_str(&substitute(lexer.contents(&tok), ctx, literal_value));
        out.push('\'');
        copied = tok.end;
    }
    out.push_str(&substitute(&text[copied..], ctx, bare_value));
    Ok(out)
}

/// `'Y'='Y'` → `1=1`, `'N'='Y'` → `1=0`. These come from a placeholder
///  compared against a fixed yes/no literal, e.g. `'@IsSOTrx@'='Y'`.
pub(crate) fn fold_yes_no_comparisons(
    text: &str,
    _: &ContextBindings,
) -> Result<String, Untranslatable> {
    Ok(YES_NO_COMPARISON
        .replace_all(text, |caps: &Captures| {
            if caps[1] == caps[2] { "1=1" } else { "1=0" }
        })
        .into_owned())
}

/// `eq 'Y'` → `eq true`, `neq 'N'` → `neq false` and so on. Yes/no columns
///  are booleans in the target grammar.
pub(crate) fn yes_no_to_bool(text: &str, _: &ContextBindings) -> Result<String, Untranslatable> {
    Ok(YES_NO_OPERAND
        .replace_all(text, |caps: &Captures| {
            let value = if &caps[2] == "Y" { "true" } else { "false" };
            format!("{} {value}", &caps[1])
        })
        .into_owned())
}

/// `(Col eq value)` → `Col eq value`.
pub(crate) fn unwrap_single_clauses(
    text: &str,
    _: &ContextBindings,
) -> Result<String, Untranslatable> {
    Ok(WRAPPED_CLAUSE.replace_all(text, "${1}").into_owned())
}

pub(crate) fn normalize_whitespace(
    text: &str,
    _: &ContextBindings,
) -> Result<String, Untranslatable> {
    Ok(WHITESPACE.replace_all(text, " ").trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(
        pass: fn(&str, &ContextBindings) -> Result<String, Untranslatable>,
        text: &str,
    ) -> String {
        pass(text, &ContextBindings::new()).unwrap()
    }

    #[test]
    fn qualifiers() {
        assert_eq!(run(strip_qualifiers, "C_DocType.DocBaseType='SOO'"), "DocBaseType='SOO'");
        assert_eq!(run(strip_qualifiers, "A.B"), "B");
        assert_eq!(run(strip_qualifiers, "A.B.C"), "B.C");
        assert_eq!(run(strip_qualifiers, "Qty>1.5"), "Qty>1.5");
        assert_eq!(run(strip_qualifiers, "Version='V1.2'"), "Version='V1.2'");
        assert_eq!(
            run(strip_qualifiers, "EMail='info@example.com' AND T.Name=\"T.x\""),
            "EMail='info@example.com' AND Name=\"T.x\""
        );
        assert_eq!(run(strip_qualifiers, "T. Name"), "T. Name");
        assert_eq!(
            run(strip_qualifiers, "o.IsActive='Y' AND l.M_Product_ID=5"),
            "IsActive='Y' AND M_Product_ID=5"
        );
    }

    #[test]
    fn coalesce() {
        assert_eq!(
            run(strip_coalesce, "COALESCE(DocSubTypeSO,' ')<>'RM'"),
            "DocSubTypeSO<>'RM'"
        );
        assert_eq!(run(strip_coalesce, "coalesce( X , 'N' )='Y'"), "X='Y'");
        // Only a quoted literal fallback is recognized
        assert_eq!(run(strip_coalesce, "COALESCE(X,0)=1"), "COALESCE(X,0)=1");
        assert_eq!(run(strip_coalesce, "COALESCE(X,Y,'N')"), "COALESCE(X,Y,'N')");
    }

    #[test]
    fn substitution() {
        let ctx = ContextBindings::new()
            .with("IsSOTrx", true)
            .with("IsActive", false)
            .with("AD_Org_ID", 11)
            .with("Rate", 1.5)
            .with("DocType", "SOO");
        let sub = |text: &str| substitute_context(text, &ctx).unwrap();

        assert_eq!(sub("IsSOTrx='@IsSOTrx@'"), "IsSOTrx='Y'");
        assert_eq!(sub("IsSOTrx=@#IsSOTrx@"), "IsSOTrx='Y'");
        assert_eq!(sub("X='@IsActive@'"), "X='N'");
        assert_eq!(sub("AD_Org_ID=@#AD_Org_ID@"), "AD_Org_ID=11");
        assert_eq!(sub("AD_Org_ID='@AD_Org_ID@'"), "AD_Org_ID='11'");
        assert_eq!(sub("Rate=@Rate@"), "Rate=1.5");
        assert_eq!(sub("DocBaseType=@DocType@"), "DocBaseType='SOO'");
        assert_eq!(sub("DocBaseType='@DocType@'"), "DocBaseType='SOO'");
    }

    #[test]
    fn substitution_escapes_quotes() {
        let ctx = ContextBindings::new().with("Name", "O'Neil");
        assert_eq!(
            substitute_context("Name=@Name@", &ctx).unwrap(),
            "Name='O''Neil'"
        );
        assert_eq!(
            substitute_context("Name='@Name@'", &ctx).unwrap(),
            "Name='O''Neil'"
        );
    }

    #[test]
    fn substitution_inside_literals() {
        let ctx = ContextBindings::new()
            .with("Name", "abc")
            .with("AD_Org_ID", 11)
            .with("IsSOTrx", false);
        let sub = |text: &str| substitute_context(text, &ctx).unwrap();

        assert_eq!(sub("Description LIKE '%@Name@%'"), "Description LIKE '%abc%'");
        assert_eq!(sub("Value='ORG-@#AD_Org_ID@'"), "Value='ORG-11'");
        assert_eq!(
            sub("Help='@IsSOTrx@ @Name@' AND Name=@Name@"),
            "Help='N abc' AND Name='abc'"
        );
        assert_eq!(sub("EMail='info@example.com'"), "EMail='info@example.com'");
    }

    #[test]
    fn yes_no_comparisons() {
        assert_eq!(run(fold_yes_no_comparisons, "'Y'='Y'"), "1=1");
        assert_eq!(run(fold_yes_no_comparisons, "'N' = 'N'"), "1=1");
        assert_eq!(run(fold_yes_no_comparisons, "'N'='Y' OR A=1"), "1=0 OR A=1");
        assert_eq!(run(fold_yes_no_comparisons, "IsSOTrx='Y'"), "IsSOTrx='Y'");
    }

    #[test]
    fn yes_no_operands() {
        assert_eq!(run(yes_no_to_bool, "A eq 'Y'"), "A eq true");
        assert_eq!(run(yes_no_to_bool, "A eq  'N'"), "A eq false");
        assert_eq!(run(yes_no_to_bool, "A neq 'Y'"), "A neq true");
        assert_eq!(run(yes_no_to_bool, "A neq 'N'"), "A neq false");
        assert_eq!(run(yes_no_to_bool, "A eq 'Yes'"), "A eq 'Yes'");
    }

    #[test]
    fn single_clause_parentheses() {
        assert_eq!(run(unwrap_single_clauses, "( A eq 'x' )"), "A eq 'x'");
        assert_eq!(
            run(unwrap_single_clauses, "(A eq 1) and (B eq 2)"),
            "A eq 1 and B eq 2"
        );
        assert_eq!(
            run(unwrap_single_clauses, "(A eq 1 or B eq 2)"),
            "(A eq 1 or B eq 2)"
        );
    }

    #[test]
    fn whitespace() {
        assert_eq!(run(normalize_whitespace, "  A  eq\n 1 \t"), "A eq 1");
    }
}
