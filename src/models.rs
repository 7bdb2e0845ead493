use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Name of the trailing observation column in every [`ResultTable`].
pub const VALUE_COLUMN: &str = "value";

/// Top-level JSON-RPC response as sent by the server.
///
/// Every member is optional so that decoding never fails on shape alone; the
/// success/failure decision is made in [`RawEnvelope::into_envelope`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawEnvelope {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
}

/// `error` member of a failed call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    #[serde(deserialize_with = "de_i64_from_string_or_number")]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A decoded response: either the JSON-stat payload or the server's error.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Success(Value),
    Failure(ErrorPayload),
}

impl RawEnvelope {
    /// Decide success or failure. `error` wins when both members are present.
    pub fn into_envelope(self) -> Result<Envelope> {
        if let Some(err) = self.error {
            let payload: ErrorPayload = serde_json::from_value(err)
                .map_err(|e| Error::malformed(format!("invalid error member: {e}")))?;
            return Ok(Envelope::Failure(payload));
        }
        match self.data {
            Some(data) => Ok(Envelope::Success(data)),
            None => Err(Error::malformed(
                "envelope has neither `data` nor `error` member",
            )),
        }
    }
}

impl Envelope {
    /// Decode an envelope from a raw response body.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        let raw: RawEnvelope = serde_json::from_slice(body)
            .map_err(|e| Error::malformed(format!("body is not a JSON-RPC envelope: {e}")))?;
        raw.into_envelope()
    }

    /// Unwrap the payload, turning a server-side failure into [`Error::Api`].
    pub fn into_data(self) -> Result<Value> {
        match self {
            Envelope::Success(data) => Ok(data),
            Envelope::Failure(p) => Err(Error::Api {
                code: p.code,
                message: p.message,
            }),
        }
    }
}

/// Serde helper: parse `i64` from either a JSON number or a string.
fn de_i64_from_string_or_number<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, Visitor};
    struct I64Visitor;

    impl<'de> Visitor<'de> for I64Visitor {
        type Value = i64;

        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            write!(f, "a string or integer error code")
        }

        fn visit_i64<E>(self, v: i64) -> std::result::Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(v)
        }

        fn visit_u64<E>(self, v: u64) -> std::result::Result<Self::Value, E>
        where
            E: de::Error,
        {
            i64::try_from(v).map_err(E::custom)
        }

        fn visit_str<E>(self, s: &str) -> std::result::Result<Self::Value, E>
        where
            E: de::Error,
        {
            s.trim().parse::<i64>().map_err(E::custom)
        }
    }

    deserializer.deserialize_any(I64Visitor)
}

/// One observation: a category per dimension plus its value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Category labels, in dimension declaration order.
    pub labels: Vec<String>,
    /// Category ids, parallel to `labels`.
    pub codes: Vec<String>,
    pub value: Option<f64>,
}

/// Flat projection of a JSON-stat dataset (one row per observation).
///
/// Column names are unique: a dimension label that repeats an earlier column or
/// equals [`VALUE_COLUMN`] is replaced by the dimension id, or by a numbered variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultTable {
    pub label: Option<String>,
    pub source: Option<String>,
    pub updated: Option<String>,
    pub dimension_ids: Vec<String>,
    pub(crate) columns: Vec<String>,
    pub(crate) rows: Vec<Row>,
}

impl ResultTable {
    pub(crate) fn new(
        dimension_ids: Vec<String>,
        dimension_labels: Vec<String>,
        rows: Vec<Row>,
    ) -> Self {
        let mut columns = unique_columns(&dimension_ids, dimension_labels);
        columns.push(VALUE_COLUMN.to_string());
        Self {
            label: None,
            source: None,
            updated: None,
            dimension_ids,
            columns,
            rows,
        }
    }

    /// Dimension labels in declaration order, then `"value"`.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Text of a cell, addressed by row index and column name.
    ///
    /// Dimension columns yield the category label; the value column yields the number
    /// (or `None` for a missing observation).
    pub fn cell(&self, row: usize, column: &str) -> Option<String> {
        let r = self.rows.get(row)?;
        if column == VALUE_COLUMN {
            return r.value.map(|v| v.to_string());
        }
        let (_, dims) = self.columns.split_last()?;
        let idx = dims.iter().position(|c| c == column)?;
        r.labels.get(idx).cloned()
    }

    /// The value column.
    pub fn values(&self) -> impl Iterator<Item = Option<f64>> + '_ {
        self.rows.iter().map(|r| r.value)
    }
}

fn unique_columns(ids: &[String], labels: Vec<String>) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::from([VALUE_COLUMN.to_string()]);
    let mut out = Vec::with_capacity(labels.len());
    for (id, label) in ids.iter().zip(labels) {
        let name = if !taken.contains(&label) {
            label
        } else if !taken.contains(id) {
            id.clone()
        } else {
            let mut n = 2;
            while taken.contains(&format!("{label}_{n}")) {
                n += 1;
            }
            format!("{label}_{n}")
        };
        taken.insert(name.clone());
        out.push(name);
    }
    out
}
