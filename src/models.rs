use std::collections::BTreeMap;

use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    ser::{SerializeMap, SerializeSeq},
};
use serde_json::Value as JsonValue;
use serde_with::{DisplayFromStr, PickFirst, serde_as};
use utoipa::ToSchema;

use crate::{errors::GridError, plan::SortDirection};

/// How a client column is identified in `columns[i][data]`.
///
/// Numeric identifiers address a column by position; anything else is a
/// normalized (trimmed, lower-cased) alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnIdentifier {
    ByAlias(String),
    ByIndex(usize),
}

impl ColumnIdentifier {
    #[must_use]
    pub fn parse(data: &str) -> Self {
        let data = data.trim();
        data.parse::<usize>()
            .map_or_else(|_| Self::ByAlias(data.to_lowercase()), Self::ByIndex)
    }
}

impl Default for ColumnIdentifier {
    fn default() -> Self {
        Self::ByAlias(String::new())
    }
}

impl<'de> Deserialize<'de> for ColumnIdentifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Index(usize),
            Text(String),
            Other(JsonValue),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Index(index) => Self::ByIndex(index),
            Raw::Text(text) => Self::parse(&text),
            // Object or null `data` (client-side renderers) carries no identifier
            Raw::Other(_) => Self::default(),
        })
    }
}

impl Serialize for ColumnIdentifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::ByAlias(alias) => serializer.serialize_str(alias),
            Self::ByIndex(index) => serializer.serialize_u64(*index as u64),
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(default)]
pub struct SearchRequest {
    /// Free-text search term
    pub value: String,
    /// Client regex flag. Accepted for compatibility; searches are always LIKE.
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub regex: bool,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(default)]
pub struct ColumnRequest {
    #[schema(value_type = String)]
    pub data: ColumnIdentifier,
    pub name: String,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub searchable: bool,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub orderable: bool,
    pub search: SearchRequest,
}

impl Default for ColumnRequest {
    fn default() -> Self {
        Self {
            data: ColumnIdentifier::default(),
            name: String::new(),
            searchable: true,
            orderable: true,
            search: SearchRequest::default(),
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(default)]
pub struct OrderRequest {
    /// Index into the client's declared column order
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub column: usize,
    /// `asc` or `desc`; anything else sorts ascending
    pub dir: String,
}

impl OrderRequest {
    #[must_use]
    pub fn direction(&self) -> SortDirection {
        SortDirection::parse(&self.dir)
    }
}

/// One draw request from a grid widget.
///
/// Accepted as a JSON body or as the bracketed form/query pairs grid widgets
/// send by default (see [`DrawRequest::from_pairs`]). Numbers and booleans may
/// arrive as strings.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(default)]
pub struct DrawRequest {
    /// Sequence token echoed back unchanged
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub draw: u64,
    /// Row offset; negative values are treated as 0
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub start: i64,
    /// Page size; `-1` or absent means no limit
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    pub length: Option<i64>,
    pub search: SearchRequest,
    pub columns: Vec<ColumnRequest>,
    pub order: Vec<OrderRequest>,
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, GridError> {
    value
        .trim()
        .parse()
        .map_err(|_| GridError::bad_request(format!("Invalid value for `{key}`")))
}

/// Only an explicit `true` sets a flag; empty or unknown values clear it.
fn parse_flag(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

/// `columns[0][search][value]` -> `["columns", "0", "search", "value"]`
fn key_path(key: &str) -> Vec<&str> {
    key.split('[')
        .map(|segment| segment.trim_end_matches(']'))
        .collect()
}

impl DrawRequest {
    /// Build a request from bracketed `key=value` pairs such as
    /// `columns[1][searchable]=true` or `order[0][dir]=desc`.
    ///
    /// Unknown keys are ignored. Column and order entries may arrive in any
    /// order and are sorted by their index.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::BadRequest`] when a numeric parameter cannot be parsed.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, GridError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut request = Self::default();
        let mut columns: BTreeMap<usize, ColumnRequest> = BTreeMap::new();
        let mut order: BTreeMap<usize, OrderRequest> = BTreeMap::new();

        for (key, value) in pairs {
            let (key, value) = (key.as_ref(), value.as_ref());
            match key_path(key).as_slice() {
                ["draw"] => request.draw = parse_number(key, value)?,
                ["start"] => request.start = parse_number(key, value)?,
                ["length"] => {
                    request.length = if value.trim().is_empty() {
                        None
                    } else {
                        Some(parse_number(key, value)?)
                    };
                }
                ["search", "value"] => request.search.value = value.to_string(),
                ["search", "regex"] => request.search.regex = parse_flag(value),
                ["columns", index, field @ ..] => {
                    let column = columns.entry(parse_number(key, index)?).or_default();
                    match field {
                        ["data"] => column.data = ColumnIdentifier::parse(value),
                        ["name"] => column.name = value.to_string(),
                        ["searchable"] => column.searchable = parse_flag(value),
                        ["orderable"] => column.orderable = parse_flag(value),
                        ["search", "value"] => column.search.value = value.to_string(),
                        ["search", "regex"] => column.search.regex = parse_flag(value),
                        _ => {}
                    }
                }
                ["order", index, field] => {
                    let entry = order.entry(parse_number(key, index)?).or_default();
                    match *field {
                        "column" => entry.column = parse_number(key, value)?,
                        "dir" => entry.dir = value.to_string(),
                        _ => {}
                    }
                }
                _ => {}
            }
        }

        request.columns = columns.into_values().collect();
        request.order = order.into_values().collect();
        Ok(request)
    }
}

/// One result row: column alias to value, in select order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowRecord {
    entries: Vec<(String, JsonValue)>,
}

impl RowRecord {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arrange a backend JSON row by `aliases`.
    ///
    /// Missing aliases become `null`; fields not named by any alias (wildcard
    /// selects) are appended after them.
    #[must_use]
    pub fn from_json(row: JsonValue, aliases: &[&str]) -> Self {
        let JsonValue::Object(mut fields) = row else {
            return Self::new();
        };
        let mut record = Self::new();
        for alias in aliases {
            let value = fields.remove(*alias).unwrap_or(JsonValue::Null);
            record.insert(*alias, value);
        }
        for (name, value) in fields {
            record.insert(name, value);
        }
        record
    }

    #[must_use]
    pub fn get(&self, alias: &str) -> Option<&JsonValue> {
        self.entries
            .iter()
            .find(|(key, _)| key == alias)
            .map(|(_, value)| value)
    }

    #[must_use]
    pub fn get_index(&self, index: usize) -> Option<&JsonValue> {
        self.entries.get(index).map(|(_, value)| value)
    }

    /// Replace the value stored under `alias` in place, or append it.
    pub fn insert(&mut self, alias: impl Into<String>, value: JsonValue) {
        let alias = alias.into();
        if let Some(slot) = self.entries.iter_mut().find(|(key, _)| *key == alias) {
            slot.1 = value;
        } else {
            self.entries.push((alias, value));
        }
    }

    pub fn remove(&mut self, alias: &str) -> Option<JsonValue> {
        let index = self.entries.iter().position(|(key, _)| key == alias)?;
        Some(self.entries.remove(index).1)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &JsonValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    #[must_use]
    pub fn into_values(self) -> Vec<JsonValue> {
        self.entries.into_iter().map(|(_, value)| value).collect()
    }
}

impl<K: Into<String>> FromIterator<(K, JsonValue)> for RowRecord {
    fn from_iter<T: IntoIterator<Item = (K, JsonValue)>>(iter: T) -> Self {
        let mut record = Self::new();
        for (alias, value) in iter {
            record.insert(alias, value);
        }
        record
    }
}

impl Serialize for RowRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// A row as sent to the client: an object keyed by alias, or a positional array.
#[derive(Debug, Clone, PartialEq)]
pub enum RowData {
    Object(RowRecord),
    Array(Vec<JsonValue>),
}

impl Serialize for RowData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Object(record) => record.serialize(serializer),
            Self::Array(values) => {
                let mut seq = serializer.serialize_seq(Some(values.len()))?;
                for value in values {
                    seq.serialize_element(value)?;
                }
                seq.end()
            }
        }
    }
}

/// The response to one draw request.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResultPage {
    pub draw: u64,
    /// Rows matched by the base query, before any search or declared filter
    pub records_total: u64,
    /// Rows matched after search and filters, before paging
    pub records_filtered: u64,
    #[schema(value_type = Vec<Object>)]
    pub data: Vec<RowData>,
    /// Last executed statement, only present when query debugging is enabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}
