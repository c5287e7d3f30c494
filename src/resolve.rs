//! Resolution of column default expressions (`AD_Column.DefaultValue`) into
//!  typed values.
//!
//! A default is one of:
//!  - a context placeholder: `@#AD_Client_ID@`, `@AD_Org_ID@`, `@#Date@`
//!  - a yes/no literal: `Y`, `N`
//!  - a date keyword: `SYSDATE`, `CURRENT_TIMESTAMP`, `CURRENT_DATE`
//!  - a plain literal: `0`, `1.5`, `DR`
//!  - a server-side SQL default (`@SQL=...`), which is never resolved here.
use std::{fmt, sync::LazyLock};

use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use regex::Regex;

use crate::{
    context::{ContextSlot, ContextTable, Session},
    metadata::ReferenceType,
};

pub const SQL_DEFAULT_PREFIX: &str = "@SQL=";

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@(#?[A-Za-z_][A-Za-z0-9_]*)@$").unwrap());
static INTEGER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-?\d+$").unwrap());
static DECIMAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-?\d+\.\d+$").unwrap());

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum DefaultValue {
    Bool(bool),
    Integer(i64),
    Decimal(f64),
    Text(String),
    Date(NaiveDate),
    /// Always whole seconds, UTC.
    #[cfg_attr(
        feature = "serde",
        serde(serialize_with = "serialize_timestamp")
    )]
    Timestamp(DateTime<Utc>),
}

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[cfg(feature = "serde")]
fn serialize_timestamp<S: serde::Serializer>(
    ts: &DateTime<Utc>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&ts.format(TIMESTAMP_FORMAT))
}

impl fmt::Display for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Decimal(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Self::Timestamp(ts) => write!(f, "{}", ts.format(TIMESTAMP_FORMAT)),
        }
    }
}

/// Resolves defaults against a context table. The [Default] resolver uses
///  the built-in table; build one with [Resolver::new] to add site-specific
///  context names.
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    table: ContextTable,
}

impl Resolver {
    pub fn new(table: ContextTable) -> Self {
        Self { table }
    }

    pub fn resolve(
        &self,
        expr: &str,
        session: &Session,
        reference: Option<ReferenceType>,
    ) -> Option<DefaultValue> {
        self.resolve_at(expr, session, reference, Utc::now())
    }

    /// Like [resolve] with an explicit clock for the date keywords.
    pub fn resolve_at(
        &self,
        expr: &str,
        session: &Session,
        reference: Option<ReferenceType>,
        now: DateTime<Utc>,
    ) -> Option<DefaultValue> {
        if expr.is_empty() || expr.starts_with(SQL_DEFAULT_PREFIX) {
            return None;
        }

        if let Some(caps) = PLACEHOLDER.captures(expr) {
            let name = &caps[1];
            let Some(slot) = self.table.lookup(name) else {
                tracing::debug!(name, "unrecognized context variable in default");
                return None;
            };
            return Some(match slot {
                ContextSlot::Today => DefaultValue::Date(now.date_naive()),
                ContextSlot::OrganizationId => DefaultValue::Integer(session.organization_id),
                ContextSlot::WarehouseId => DefaultValue::Integer(session.warehouse_id),
                ContextSlot::ClientId => DefaultValue::Integer(session.client_id),
                ContextSlot::SalesTransaction => DefaultValue::Bool(session.is_sales_transaction),
            });
        }

        match expr {
            "Y" => return Some(DefaultValue::Bool(true)),
            "N" => return Some(DefaultValue::Bool(false)),
            "SYSDATE" | "CURRENT_TIMESTAMP" => {
                return Some(DefaultValue::Timestamp(now.trunc_subsecs(0)));
            }
            "CURRENT_DATE" => return Some(DefaultValue::Date(now.date_naive())),
            _ => {}
        }

        // PriorityUser (a List) defaults to '5', which must stay the code '5'
        if !reference.is_some_and(ReferenceType::is_string_like) {
            if INTEGER.is_match(expr) {
                return Some(match expr.parse::<i64>() {
                    Ok(n) => DefaultValue::Integer(n),
                    Err(_) => DefaultValue::Decimal(expr.parse().ok()?),
                });
            }
            if DECIMAL.is_match(expr)
                && let Ok(n) = expr.parse::<f64>()
            {
                return Some(DefaultValue::Decimal(n));
            }
        }

        Some(DefaultValue::Text(expr.to_string()))
    }
}

/// Resolves [expr] with the built-in context table.
pub fn resolve_default(
    expr: &str,
    session: &Session,
    reference: Option<ReferenceType>,
) -> Option<DefaultValue> {
    Resolver::default().resolve(expr, session, reference)
}

pub fn resolve_default_at(
    expr: &str,
    session: &Session,
    reference: Option<ReferenceType>,
    now: DateTime<Utc>,
) -> Option<DefaultValue> {
    Resolver::default().resolve_at(expr, session, reference, now)
}
