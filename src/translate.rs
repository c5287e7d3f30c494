//! Translation of legacy SQL WHERE fragments (validation and display rules)
//!  into OData `$filter` expressions.
//!
//! Translation is a fixed sequence of rewriting passes. Fragments the target
//!  grammar cannot express are refused up front rather than translated into a
//!  filter that selects different rows:
//!
//! ```rust
//! # use valrule_filter::{context::ContextBindings, translate::translate};
//! let ctx = ContextBindings::new().with("IsSOTrx", true);
//! assert_eq!(
//!     translate("IsSOTrx='@IsSOTrx@' AND DocBaseType IN ('SOO','POO')", &ctx).as_deref(),
//!     Some("IsSOTrx eq true and (DocBaseType eq 'SOO' or DocBaseType eq 'POO')")
//! );
//! assert_eq!(translate("C_BPartner_ID IS NULL", &ctx), None);
//! ```
use std::sync::LazyLock;

use regex::Regex;

use crate::{context::ContextBindings, lex};

mod passes;
mod tokens;

/// Why a fragment has no filter equivalent. Callers should fall back to an
///  unfiltered query (or server side evaluation); none of these are errors
///  to show a user.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Untranslatable {
    /// Subqueries, grouping, ordering and null tests.
    #[error("unsupported construct: {0}")]
    UnsupportedConstruct(String),
    #[error("no binding for context variable @{0}@")]
    MissingContextVariable(String),
    /// Every branch simplified away.
    #[error("no filter left after simplification")]
    VacuousResult,
    #[error("malformed fragment: {0}")]
    Malformed(#[from] lex::Error),
}

// IS NULL / IS NOT NULL: the REST OData parser has no IS operator
static UNSUPPORTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(SELECT|EXISTS|FROM|JOIN|UNION|GROUP\s+BY|HAVING|ORDER\s+BY|IS\s+NULL|IS\s+NOT\s+NULL)\b",
    )
    .unwrap()
});

pub type Pass = fn(&str, &ContextBindings) -> Result<String, Untranslatable>;

/// The rewriting passes in the order they run. Later passes rely on the
///  output of earlier ones: `=` becomes `eq` only after IN lists and `<>`
///  are gone, and markers are folded only once they read `1 eq 1`.
pub const PIPELINE: [(&str, Pass); 12] = [
    ("strip_qualifiers", passes::strip_qualifiers),
    ("strip_coalesce", passes::strip_coalesce),
    ("substitute_context", passes::substitute_context),
    ("fold_yes_no_comparisons", passes::fold_yes_no_comparisons),
    ("expand_in_lists", tokens::expand_in_lists),
    ("not_equals", tokens::not_equals),
    ("equals", tokens::equals),
    ("lowercase_connectives", tokens::lowercase_connectives),
    ("yes_no_to_bool", passes::yes_no_to_bool),
    ("fold_markers", tokens::fold_markers),
    ("unwrap_single_clauses", passes::unwrap_single_clauses),
    ("normalize_whitespace", passes::normalize_whitespace),
];

fn check_supported(sql: &str) -> Result<(), Untranslatable> {
    match UNSUPPORTED.find(sql) {
        Some(m) => Err(Untranslatable::UnsupportedConstruct(m.as_str().to_string())),
        None => Ok(()),
    }
}

/// Every placeholder must have a binding; nothing is ever guessed.
fn check_bound(sql: &str, ctx: &ContextBindings) -> Result<(), Untranslatable> {
    for caps in passes::PLACEHOLDER.captures_iter(sql) {
        let name = &caps[1];
        if !ctx.contains(name) {
            return Err(Untranslatable::MissingContextVariable(name.to_string()));
        }
    }
    Ok(())
}

fn run_pipeline(sql: &str, ctx: &ContextBindings) -> Result<String, Untranslatable> {
    check_supported(sql)?;
    check_bound(sql, ctx)?;

    let mut text = sql.to_string();
    for (name, pass) in PIPELINE {
        text = pass(&text, ctx)?;
        tracing::trace!(pass = name, %text, "rewrite pass");
    }

    if text.is_empty() {
        Err(Untranslatable::VacuousResult)
    } else {
        Ok(text)
    }
}

/// Translates [sql], or says why it can't be.
pub fn try_translate(sql: &str, ctx: &ContextBindings) -> Result<String, Untranslatable> {
    let result = run_pipeline(sql, ctx);
    if let Err(reason) = &result {
        tracing::debug!(%reason, sql, "validation rule not translated");
    }
    result
}

/// Translates [sql]; None means no faithful filter exists.
pub fn translate(sql: &str, ctx: &ContextBindings) -> Option<String> {
    try_translate(sql, ctx).ok()
}
