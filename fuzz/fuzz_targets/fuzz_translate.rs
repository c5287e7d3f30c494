#![no_main]
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use valrule_filter::{ContextBindings, Untranslatable, try_translate};

#[derive(Debug, Arbitrary)]
pub struct RuleInput {
    pub rule: String,
    pub is_sales: bool,
    pub org_id: i32,
}

const MAX_RULE_LENGTH: usize = 10000;

fuzz_target!(|input: RuleInput| {
    let rule: String = input.rule.chars().take(MAX_RULE_LENGTH).collect();
    let ctx = ContextBindings::new()
        .with("IsSOTrx", input.is_sales)
        .with("AD_Org_ID", input.org_id);
    match try_translate(&rule, &ctx) {
        Ok(filter) => assert!(!filter.is_empty()),
        Err(Untranslatable::VacuousResult)
        | Err(Untranslatable::UnsupportedConstruct(_))
        | Err(Untranslatable::MissingContextVariable(_))
        | Err(Untranslatable::Malformed(_)) => {}
    }
});
