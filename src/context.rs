use std::collections::HashMap;

/// A value bound to a context variable such as `IsSOTrx` or `AD_Org_ID`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum ContextValue {
    Bool(bool),
    Number(f64),
    Str(String),
}

impl From<bool> for ContextValue {
    fn from(b: bool) -> Self {
        ContextValue::Bool(b)
    }
}
impl From<i64> for ContextValue {
    fn from(n: i64) -> Self {
        ContextValue::Number(n as f64)
    }
}
impl From<i32> for ContextValue {
    fn from(n: i32) -> Self {
        ContextValue::Number(n.into())
    }
}
impl From<f64> for ContextValue {
    fn from(n: f64) -> Self {
        ContextValue::Number(n)
    }
}
impl From<&str> for ContextValue {
    fn from(s: &str) -> Self {
        ContextValue::Str(s.to_string())
    }
}
impl From<String> for ContextValue {
    fn from(s: String) -> Self {
        ContextValue::Str(s)
    }
}

/// Session-derived variables a validation rule may reference.
///
/// Names are case-sensitive. Placeholders are written `@Name@` or `@#Name@`;
///  both look up `Name`. A binding stored under `#Name` is found as a
///  fallback so maps built from the ERP's global context work unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ContextBindings {
    values: HashMap<String, ContextValue>,
}

impl ContextBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<ContextValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ContextValue>) {
        self.values.insert(name.into(), value.into());
    }

    /// Look up a placeholder name, with or without its leading `#`.
    pub fn get(&self, name: &str) -> Option<&ContextValue> {
        let bare = name.strip_prefix('#').unwrap_or(name);
        self.values
            .get(bare)
            .or_else(|| self.values.get(&format!("#{bare}")))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for ContextBindings
where
    K: Into<String>,
    V: Into<ContextValue>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// The logged-in user's environment, as far as default values care.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Session {
    pub organization_id: i64,
    pub warehouse_id: i64,
    pub client_id: i64,
    pub is_sales_transaction: bool,
}

impl Session {
    pub fn new(organization_id: i64, warehouse_id: i64, client_id: i64) -> Self {
        Self {
            organization_id,
            warehouse_id,
            client_id,
            is_sales_transaction: true,
        }
    }

    /// Ids that are all zero, used when resolving defaults outside any
    ///  particular login (e.g. checking whether a table supports quick create).
    pub fn system() -> Self {
        Self::new(0, 0, 0)
    }
}

/// What a built-in context name resolves to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display, strum_macros::EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ContextSlot {
    Today,
    OrganizationId,
    WarehouseId,
    ClientId,
    SalesTransaction,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OverrideError {
    #[error("line {line}: expected Name=slot")]
    MissingSlot { line: usize },
    #[error("line {line}: unknown slot '{slot}'")]
    UnknownSlot { line: usize, slot: String },
}

/// Maps context names (without the `#`) to session slots.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ContextTable {
    entries: Vec<(String, ContextSlot)>,
}

const BUILT_IN: [(&str, ContextSlot); 5] = [
    ("Date", ContextSlot::Today),
    ("AD_Org_ID", ContextSlot::OrganizationId),
    ("M_Warehouse_ID", ContextSlot::WarehouseId),
    ("AD_Client_ID", ContextSlot::ClientId),
    ("IsSOTrx", ContextSlot::SalesTransaction),
];

impl Default for ContextTable {
    fn default() -> Self {
        Self {
            entries: BUILT_IN
                .iter()
                .map(|(name, slot)| (name.to_string(), *slot))
                .collect(),
        }
    }
}

impl ContextTable {
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Adds [name], replacing any existing entry of the same name.
    pub fn with_entry(mut self, name: impl Into<String>, slot: ContextSlot) -> Self {
        let name = name.into();
        let name = name.strip_prefix('#').map(str::to_string).unwrap_or(name);
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = slot,
            None => self.entries.push((name, slot)),
        }
        self
    }

    /// `name` may carry the leading `#`; both spellings share a slot.
    pub fn lookup(&self, name: &str) -> Option<ContextSlot> {
        let bare = name.strip_prefix('#').unwrap_or(name);
        self.entries
            .iter()
            .find(|(n, _)| n == bare)
            .map(|(_, slot)| *slot)
    }

    /// Parses `Name=slot` lines, e.g. `C_Currency_ID=client_id`. Blank lines
    ///  and lines starting with `;` are skipped. Entries extend the built-in
    ///  table.
    pub fn parse_overrides(text: &str) -> Result<Self, OverrideError> {
        let mut table = Self::default();
        for (idx, line) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with(';') {
                continue;
            }
            let Some((name, slot)) = line.split_once('=') else {
                return Err(OverrideError::MissingSlot { line: line_no });
            };
            let slot = slot.trim();
            let slot: ContextSlot = slot.parse().map_err(|_| OverrideError::UnknownSlot {
                line: line_no,
                slot: slot.to_string(),
            })?;
            table = table.with_entry(name.trim(), slot);
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_prefix_shares_the_binding() {
        let ctx = ContextBindings::new().with("AD_Client_ID", 11);
        assert_eq!(ctx.get("#AD_Client_ID"), Some(&ContextValue::Number(11.0)));
        assert_eq!(ctx.get("AD_Client_ID"), Some(&ContextValue::Number(11.0)));
    }

    #[test]
    fn hashed_keys_are_found_by_bare_name() {
        let ctx: ContextBindings = [("#AD_Org_ID", 7)].into_iter().collect();
        assert!(ctx.contains("AD_Org_ID"));
        assert!(!ctx.contains("M_Warehouse_ID"));
        assert_eq!(ctx.len(), 1);
        assert!(!ctx.is_empty());
        assert!(ContextBindings::new().is_empty());
    }

    #[test]
    fn names_are_case_sensitive() {
        let ctx = ContextBindings::new().with("IsSOTrx", true);
        assert!(!ctx.contains("issotrx"));
    }

    #[test]
    fn built_in_table() {
        let table = ContextTable::default();
        assert_eq!(table.lookup("#Date"), Some(ContextSlot::Today));
        assert_eq!(table.lookup("Date"), Some(ContextSlot::Today));
        assert_eq!(table.lookup("#AD_Org_ID"), Some(ContextSlot::OrganizationId));
        assert_eq!(table.lookup("M_Warehouse_ID"), Some(ContextSlot::WarehouseId));
        assert_eq!(table.lookup("AD_User_ID"), None);
    }

    #[test]
    fn overrides_extend_the_table() {
        let table = ContextTable::parse_overrides(
            "; site specific\nM_PriceList_Org_ID = organization_id\n\n#Date=today\n",
        )
        .unwrap();
        assert_eq!(
            table.lookup("M_PriceList_Org_ID"),
            Some(ContextSlot::OrganizationId)
        );
        assert_eq!(table.lookup("#IsSOTrx"), Some(ContextSlot::SalesTransaction));
        assert_eq!(ContextTable::default().entries.len(), table.entries.len() - 1);
    }

    #[test]
    fn overrides_reject_unknown_slots() {
        let err = ContextTable::parse_overrides("\nX= nope").unwrap_err();
        assert_eq!(
            err,
            OverrideError::UnknownSlot {
                line: 2,
                slot: "nope".into()
            }
        );
        assert_eq!(err.to_string(), "line 2: unknown slot 'nope'");
        assert_eq!(
            ContextTable::parse_overrides("just words"),
            Err(OverrideError::MissingSlot { line: 1 })
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn bindings_from_json() {
        let ctx: ContextBindings =
            serde_json::from_str(r#"{"IsSOTrx": true, "AD_Org_ID": 11, "Name": "x"}"#).unwrap();
        assert_eq!(ctx.get("IsSOTrx"), Some(&ContextValue::Bool(true)));
        assert_eq!(ctx.get("#AD_Org_ID"), Some(&ContextValue::Number(11.0)));
        assert_eq!(ctx.get("Name"), Some(&ContextValue::Str("x".into())));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn table_from_json() {
        let table: ContextTable =
            serde_json::from_str(r#"[["AD_Org_ID", "organization_id"]]"#).unwrap();
        assert_eq!(table.lookup("#AD_Org_ID"), Some(ContextSlot::OrganizationId));
        assert_eq!(table.lookup("Date"), None);
    }
}
