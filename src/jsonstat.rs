//! JSON-stat dataset → [`ResultTable`] conversion.
//!
//! Accepts the shapes PxStat and other JSON-stat producers emit:
//! - 2.0 `dataset` (`id` and `size` at the top level)
//! - 1.x dataset (`dimension.id` / `dimension.size`)
//! - 2.0 `collection` with embedded datasets under `link.item`
//! - 1.x bundle (an object of named datasets)
//!
//! Observations are laid out row-major: the last dimension varies fastest.

use crate::error::{Error, Result};
use crate::models::{ResultTable, Row};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
struct WireDataset {
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    updated: Option<String>,
    #[serde(default)]
    id: Option<Vec<String>>,
    #[serde(default)]
    size: Option<Vec<usize>>,
    dimension: Map<String, Value>,
    value: Option<WireValues>,
}

#[derive(Debug, Deserialize)]
struct WireDimension {
    #[serde(default)]
    label: Option<String>,
    category: WireCategory,
}

#[derive(Debug, Deserialize)]
struct WireCategory {
    #[serde(default)]
    index: Option<WireIndex>,
    #[serde(default)]
    label: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireIndex {
    List(Vec<String>),
    Map(HashMap<String, usize>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireValues {
    Dense(Vec<Obs>),
    Sparse(HashMap<String, Obs>),
}

/// A single observation. Numbers and numeric strings are values; `null` and
/// status symbols such as `".."` are missing.
#[derive(Debug, Clone, Copy)]
struct Obs(Option<f64>);

impl<'de> Deserialize<'de> for Obs {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{self, Visitor};
        struct ObsVisitor;

        impl<'de> Visitor<'de> for ObsVisitor {
            type Value = Obs;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "a number, a string or null")
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Obs, E> {
                Ok(Obs(Some(v)))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Obs, E> {
                Ok(Obs(Some(v as f64)))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Obs, E> {
                Ok(Obs(Some(v as f64)))
            }

            fn visit_str<E: de::Error>(self, s: &str) -> std::result::Result<Obs, E> {
                Ok(Obs(s.trim().parse::<f64>().ok()))
            }

            fn visit_unit<E: de::Error>(self) -> std::result::Result<Obs, E> {
                Ok(Obs(None))
            }

            fn visit_none<E: de::Error>(self) -> std::result::Result<Obs, E> {
                Ok(Obs(None))
            }
        }

        deserializer.deserialize_any(ObsVisitor)
    }
}

/// Parse one JSON-stat dataset.
pub fn parse_dataset(doc: &Value) -> Result<ResultTable> {
    let wire: WireDataset = serde_json::from_value(doc.clone())
        .map_err(|e| Error::malformed(format!("not a JSON-stat dataset: {e}")))?;
    build_table(wire)
}

/// Parse every dataset in `doc`, which may be a dataset, a collection or a bundle.
pub fn parse_all(doc: &Value) -> Result<Vec<ResultTable>> {
    datasets(doc)?.into_iter().map(parse_dataset).collect()
}

/// Parse the `index`-th dataset of `doc`.
pub fn parse_nth(doc: &Value, index: usize) -> Result<ResultTable> {
    let found = datasets(doc)?;
    let count = found.len();
    let ds = found.into_iter().nth(index).ok_or_else(|| {
        Error::malformed(format!(
            "dataset {index} requested but response holds {count}"
        ))
    })?;
    parse_dataset(ds)
}

/// Parse a standalone JSON-stat document from text.
pub fn from_str(s: &str) -> Result<ResultTable> {
    let doc: Value = serde_json::from_str(s)
        .map_err(|e| Error::malformed(format!("invalid JSON-stat text: {e}")))?;
    parse_nth(&doc, 0)
}

/// The dataset objects contained in `doc`, in document order.
fn datasets(doc: &Value) -> Result<Vec<&Value>> {
    let obj = doc
        .as_object()
        .ok_or_else(|| Error::malformed("JSON-stat document is not an object"))?;

    match obj.get("class").and_then(Value::as_str) {
        Some("collection") => {
            let items = obj
                .get("link")
                .and_then(|l| l.get("item"))
                .and_then(Value::as_array)
                .ok_or_else(|| Error::malformed("collection without link.item"))?;
            items
                .iter()
                .map(|item| {
                    if item.get("dimension").is_some() {
                        Ok(item)
                    } else {
                        Err(Error::malformed("collection item is not an embedded dataset"))
                    }
                })
                .collect()
        }
        Some("dataset") => Ok(vec![doc]),
        Some(other) => Err(Error::malformed(format!(
            "unsupported JSON-stat class `{other}`"
        ))),
        None if obj.contains_key("dimension") => Ok(vec![doc]),
        None => {
            // 1.x bundle: every member is a dataset
            let found: Vec<&Value> = obj
                .values()
                .filter(|v| v.get("dimension").is_some())
                .collect();
            if found.is_empty() || found.len() != obj.len() {
                return Err(Error::malformed("no JSON-stat dataset found"));
            }
            Ok(found)
        }
    }
}

fn build_table(mut wire: WireDataset) -> Result<ResultTable> {
    // 1.x keeps id/size inside `dimension`
    let ids: Vec<String> = match wire.id.take() {
        Some(ids) => ids,
        None => take_member(&mut wire.dimension, "id")?,
    };
    let sizes: Vec<usize> = match wire.size.take() {
        Some(sizes) => sizes,
        None => take_member(&mut wire.dimension, "size")?,
    };
    if ids.len() != sizes.len() {
        return Err(Error::malformed(format!(
            "{} dimension ids but {} sizes",
            ids.len(),
            sizes.len()
        )));
    }

    let mut labels = Vec::with_capacity(ids.len());
    let mut categories: Vec<Vec<(String, String)>> = Vec::with_capacity(ids.len());
    for (id, &size) in ids.iter().zip(&sizes) {
        let raw = wire
            .dimension
            .remove(id)
            .ok_or_else(|| Error::malformed(format!("dimension `{id}` is declared but missing")))?;
        let dim: WireDimension = serde_json::from_value(raw)
            .map_err(|e| Error::malformed(format!("dimension `{id}`: {e}")))?;
        let cats = ordered_categories(id, dim.category)?;
        if cats.len() != size {
            return Err(Error::malformed(format!(
                "dimension `{id}` has {} categories but size {size}",
                cats.len()
            )));
        }
        labels.push(dim.label.unwrap_or_else(|| id.clone()));
        categories.push(cats);
    }

    let total = sizes
        .iter()
        .try_fold(1usize, |acc, &s| acc.checked_mul(s))
        .ok_or_else(|| Error::malformed("cube size overflows"))?;

    let values = match wire.value {
        None => return Err(Error::malformed("dataset has no `value` member")),
        Some(WireValues::Dense(v)) => {
            if v.len() != total {
                return Err(Error::malformed(format!(
                    "value array has {} entries but dimensions multiply to {total}",
                    v.len()
                )));
            }
            v.into_iter().map(|o| o.0).collect::<Vec<_>>()
        }
        Some(WireValues::Sparse(m)) => {
            let mut dense = vec![None; total];
            for (k, obs) in m {
                let pos: usize = k
                    .parse()
                    .map_err(|_| Error::malformed(format!("invalid value key `{k}`")))?;
                let slot = dense.get_mut(pos).ok_or_else(|| {
                    Error::malformed(format!("value key {pos} is outside a cube of {total}"))
                })?;
                *slot = obs.0;
            }
            dense
        }
    };

    let mut rows = Vec::with_capacity(total);
    let mut coord = vec![0usize; sizes.len()];
    for (flat, value) in values.into_iter().enumerate() {
        let mut rem = flat;
        for d in (0..sizes.len()).rev() {
            coord[d] = rem % sizes[d];
            rem /= sizes[d];
        }
        let (codes, row_labels): (Vec<String>, Vec<String>) = coord
            .iter()
            .zip(&categories)
            .map(|(&i, cats)| cats[i].clone())
            .unzip();
        rows.push(Row {
            labels: row_labels,
            codes,
            value,
        });
    }

    log::debug!(
        "flattened JSON-stat dataset: {} dimensions, {} observations",
        ids.len(),
        rows.len()
    );

    let mut table = ResultTable::new(ids, labels, rows);
    table.label = wire.label;
    table.source = wire.source;
    table.updated = wire.updated;
    Ok(table)
}

fn take_member<T: serde::de::DeserializeOwned>(
    dimension: &mut Map<String, Value>,
    key: &str,
) -> Result<T> {
    let raw = dimension
        .remove(key)
        .ok_or_else(|| Error::malformed(format!("dataset declares no dimension `{key}`")))?;
    serde_json::from_value(raw).map_err(|e| Error::malformed(format!("dimension `{key}`: {e}")))
}

/// `(category id, category label)` pairs in index order.
fn ordered_categories(dim: &str, cat: WireCategory) -> Result<Vec<(String, String)>> {
    let label_map = cat.label.unwrap_or_default();
    let codes: Vec<String> = match cat.index {
        Some(WireIndex::List(codes)) => codes,
        Some(WireIndex::Map(map)) => {
            let mut slots: Vec<Option<String>> = vec![None; map.len()];
            for (code, pos) in map {
                match slots.get_mut(pos) {
                    Some(slot) if slot.is_none() => *slot = Some(code),
                    _ => {
                        return Err(Error::malformed(format!(
                            "dimension `{dim}` has an invalid category position {pos}"
                        )));
                    }
                }
            }
            slots.into_iter().flatten().collect()
        }
        None => {
            if label_map.len() != 1 {
                return Err(Error::malformed(format!(
                    "dimension `{dim}` has no category index"
                )));
            }
            label_map.keys().cloned().collect()
        }
    };

    Ok(codes
        .into_iter()
        .map(|code| {
            let label = label_map.get(&code).cloned().unwrap_or_else(|| code.clone());
            (code, label)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn two_by_two() -> Value {
        json!({
            "version": "2.0",
            "class": "dataset",
            "label": "Test",
            "id": ["A", "B"],
            "size": [2, 2],
            "dimension": {
                "A": {
                    "label": "Alpha",
                    "category": {"index": ["a1", "a2"], "label": {"a1": "A one", "a2": "A two"}}
                },
                "B": {"category": {"index": {"b2": 1, "b1": 0}}}
            },
            "value": [1, 2, null, "4"]
        })
    }

    #[test]
    fn last_dimension_varies_fastest() {
        let t = parse_dataset(&two_by_two()).unwrap();
        assert_eq!(t.columns(), &["Alpha", "B", "value"]);
        assert_eq!(t.len(), 4);
        let cells: Vec<_> = t
            .rows()
            .iter()
            .map(|r| (r.labels[0].as_str(), r.labels[1].as_str(), r.value))
            .collect();
        assert_eq!(
            cells,
            vec![
                ("A one", "b1", Some(1.0)),
                ("A one", "b2", Some(2.0)),
                ("A two", "b1", None),
                ("A two", "b2", Some(4.0)),
            ]
        );
        assert_eq!(t.label.as_deref(), Some("Test"));
    }

    #[test]
    fn size_mismatch_is_rejected() {
        let mut doc = two_by_two();
        doc["value"] = json!([1, 2, 3]);
        assert!(matches!(parse_dataset(&doc), Err(Error::MalformedResponse(_))));

        let mut doc = two_by_two();
        doc["size"] = json!([2, 3]);
        assert!(matches!(parse_dataset(&doc), Err(Error::MalformedResponse(_))));
    }

    #[test]
    fn sparse_values_fill_missing() {
        let mut doc = two_by_two();
        doc["value"] = json!({"0": 10, "3": 40});
        let t = parse_dataset(&doc).unwrap();
        let vals: Vec<_> = t.values().collect();
        assert_eq!(vals, vec![Some(10.0), None, None, Some(40.0)]);

        doc["value"] = json!({"4": 1});
        assert!(parse_dataset(&doc).is_err());
    }

    #[test]
    fn single_category_without_index() {
        let doc = json!({
            "class": "dataset",
            "id": ["S"],
            "size": [1],
            "dimension": {"S": {"label": "Statistic", "category": {"label": {"X1": "Count"}}}},
            "value": [7]
        });
        let t = parse_dataset(&doc).unwrap();
        assert_eq!(t.rows()[0].labels, vec!["Count"]);
        assert_eq!(t.rows()[0].codes, vec!["X1"]);
    }

    #[test]
    fn version_one_dataset_and_bundle() {
        let ds = json!({
            "label": "Old",
            "dimension": {
                "id": ["Y"],
                "size": [2],
                "Y": {"label": "Year", "category": {"index": {"2020": 0, "2021": 1}}}
            },
            "value": [5, 6]
        });
        let t = parse_dataset(&ds).unwrap();
        assert_eq!(t.columns(), &["Year", "value"]);
        assert_eq!(t.rows()[1].labels, vec!["2021"]);

        let bundle = json!({"first": ds.clone(), "second": ds});
        assert_eq!(parse_all(&bundle).unwrap().len(), 2);
    }

    #[test]
    fn collection_selects_by_position() {
        let mut second = two_by_two();
        second["label"] = json!("Second");
        let doc = json!({
            "version": "2.0",
            "class": "collection",
            "link": {"item": [two_by_two(), second]}
        });
        assert_eq!(parse_all(&doc).unwrap().len(), 2);
        assert_eq!(parse_nth(&doc, 1).unwrap().label.as_deref(), Some("Second"));
        assert!(parse_nth(&doc, 2).is_err());
    }

    #[test]
    fn undeclared_dimension_is_rejected() {
        let mut doc = two_by_two();
        doc["id"] = json!(["A", "C"]);
        let err = parse_dataset(&doc).unwrap_err();
        assert!(err.to_string().contains("`C`"));
    }

    #[test]
    fn bad_object_index_is_rejected() {
        for index in [json!({"b1": 0, "b2": 0}), json!({"b1": 5, "b2": 1})] {
            let mut doc = two_by_two();
            doc["dimension"]["B"]["category"]["index"] = index.clone();
            let err = parse_dataset(&doc).unwrap_err();
            assert!(
                matches!(err, Error::MalformedResponse(ref m) if m.contains("category position")),
                "index {index} gave {err:?}"
            );
        }
    }

    #[test]
    fn several_labels_without_index_are_rejected() {
        let doc = json!({
            "class": "dataset",
            "id": ["S"],
            "size": [2],
            "dimension": {"S": {"category": {"label": {"M": "Male", "F": "Female"}}}},
            "value": [1, 2]
        });
        let err = parse_dataset(&doc).unwrap_err();
        assert!(
            matches!(err, Error::MalformedResponse(ref m) if m.contains("no category index")),
            "got {err:?}"
        );
    }
}
