//! Pure helpers over already-fetched dictionary records. Fetching belongs to
//!  the caller; nothing here performs I/O.
use std::collections::BTreeMap;

use crate::{
    context::Session,
    resolve::{DefaultValue, Resolver},
};

/// `AD_Reference_ID` of a column: the logical type of the field.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "i32", into = "i32"))]
#[repr(i32)]
pub enum ReferenceType {
    String = 10,
    Integer = 11,
    Amount = 12,
    Id = 13,
    Text = 14,
    Date = 15,
    DateTime = 16,
    List = 17,
    Table = 18,
    TableDirect = 19,
    YesNo = 20,
    Number = 22,
    Time = 24,
    Quantity = 29,
    Search = 30,
    Memo = 38,
}

impl ReferenceType {
    const ALL: [ReferenceType; 16] = [
        Self::String,
        Self::Integer,
        Self::Amount,
        Self::Id,
        Self::Text,
        Self::Date,
        Self::DateTime,
        Self::List,
        Self::Table,
        Self::TableDirect,
        Self::YesNo,
        Self::Number,
        Self::Time,
        Self::Quantity,
        Self::Search,
        Self::Memo,
    ];

    pub fn from_id(id: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|ty| ty.id() == id)
    }

    pub fn id(self) -> i32 {
        self as i32
    }

    /// Types whose stored value is always a string, even when it looks
    ///  numeric.
    pub fn is_string_like(self) -> bool {
        matches!(self, Self::List | Self::String | Self::Text | Self::Memo)
    }

    pub fn is_foreign_key(self) -> bool {
        matches!(self, Self::Table | Self::TableDirect | Self::Search)
    }
}

impl TryFrom<i32> for ReferenceType {
    type Error = String;
    fn try_from(id: i32) -> Result<Self, Self::Error> {
        Self::from_id(id).ok_or_else(|| format!("Unknown reference id {id}"))
    }
}

impl From<ReferenceType> for i32 {
    fn from(ty: ReferenceType) -> Self {
        ty.id()
    }
}

/// The subset of `AD_Column` the form layer works with.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColumnMeta {
    pub id: i64,
    pub column_name: String,
    /// Raw id; not every id has a [ReferenceType] variant.
    pub reference_id: i32,
    pub reference_value_id: Option<i64>,
    pub field_length: u32,
    pub is_mandatory: bool,
    pub default_value: String,
    pub is_updateable: bool,
    pub validation_rule_id: Option<i64>,
}

impl ColumnMeta {
    pub fn reference(&self) -> Option<ReferenceType> {
        ReferenceType::from_id(self.reference_id)
    }
}

/// Table a foreign-key column points at.
///
/// TableDirect columns name their table (`C_BPartner_ID` → `C_BPartner`).
///  Table and Search columns point through `AD_Ref_Table`; pass the name the
///  caller resolved from there as [resolved], otherwise the column name is
///  used as for TableDirect. Only `_ID` columns can be derived that way.
pub fn reference_table_name(column: &ColumnMeta, resolved: Option<&str>) -> Option<String> {
    let name = column.column_name.as_str();
    match column.reference().filter(|ty| ty.is_foreign_key())? {
        ReferenceType::TableDirect => {
            Some(name.strip_suffix("_ID").unwrap_or(name).to_string())
        }
        ReferenceType::Table | ReferenceType::Search => match resolved {
            Some(table) if !table.is_empty() => Some(table.to_string()),
            _ => name.strip_suffix("_ID").map(str::to_string),
        },
        _ => None,
    }
}

/// Filter selecting several columns by id in a single request.
pub fn column_batch_filter(ids: &[i64]) -> Option<String> {
    if ids.is_empty() {
        return None;
    }
    Some(
        ids.iter()
            .map(|id| format!("AD_Column_ID eq {id}"))
            .collect::<Vec<_>>()
            .join(" or "),
    )
}

/// Filled in by the server on every insert.
pub const AUTO_FILLED_COLUMNS: [&str; 7] = [
    "AD_Client_ID",
    "AD_Org_ID",
    "IsActive",
    "Created",
    "CreatedBy",
    "Updated",
    "UpdatedBy",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuickCreate {
    pub eligible: bool,
    /// Resolved defaults for the mandatory columns, to send with the record.
    pub mandatory_defaults: BTreeMap<String, DefaultValue>,
}

/// Decides whether a record of [table] can be created inline from just a
///  name or search key.
///
/// Every mandatory column other than the system columns, the table's own key,
///  `Name` and `Value` needs a default that resolves here. Defaults are
///  resolved with [Session::system] since no particular login applies.
pub fn quick_create_defaults(
    resolver: &Resolver,
    table: &str,
    columns: &[ColumnMeta],
) -> QuickCreate {
    let key_column = format!("{table}_ID");
    let session = Session::system();
    let mut mandatory_defaults = BTreeMap::new();

    for col in columns.iter().filter(|c| c.is_mandatory) {
        let name = col.column_name.as_str();
        if AUTO_FILLED_COLUMNS.contains(&name)
            || name == key_column
            || name == "Name"
            || name == "Value"
        {
            continue;
        }

        match resolver.resolve(&col.default_value, &session, col.reference()) {
            Some(value) => {
                mandatory_defaults.insert(name.to_string(), value);
            }
            None => {
                tracing::debug!(table, column = name, "mandatory column has no usable default");
                return QuickCreate {
                    eligible: false,
                    mandatory_defaults: BTreeMap::new(),
                };
            }
        }
    }

    QuickCreate {
        eligible: true,
        mandatory_defaults,
    }
}
