use crate::models::ResultTable;
use anyhow::Result;
use csv::WriterBuilder;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Prefix cells that a spreadsheet would evaluate as a formula.
fn sanitize(cell: &str) -> String {
    let risky = cell.starts_with(['=', '+', '-', '@']);
    if risky && cell.parse::<f64>().is_err() {
        format!("'{cell}")
    } else {
        cell.to_string()
    }
}

/// Write the table as CSV with a header row to any writer.
pub fn write_csv<W: Write>(table: &ResultTable, out: W) -> Result<()> {
    let mut wtr = WriterBuilder::new().from_writer(out);
    wtr.write_record(table.columns().iter().map(|c| sanitize(c)))?;
    for row in table.rows() {
        let mut record: Vec<String> = row.labels.iter().map(|l| sanitize(l)).collect();
        record.push(row.value.map(|v| v.to_string()).unwrap_or_default());
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Save the table as CSV with header.
pub fn save_csv<P: AsRef<Path>>(table: &ResultTable, path: P) -> Result<()> {
    let f = File::create(path)?;
    write_csv(table, f)
}

/// One JSON object per row, keyed by column name.
pub fn to_json_rows(table: &ResultTable) -> Vec<Value> {
    let dims = table.columns().split_last().map_or(&[][..], |(_, dims)| dims);
    table
        .rows()
        .iter()
        .map(|row| {
            let mut obj = Map::new();
            for (col, label) in dims.iter().zip(&row.labels) {
                obj.insert(col.clone(), Value::String(label.clone()));
            }
            obj.insert(crate::models::VALUE_COLUMN.into(), row.value.into());
            Value::Object(obj)
        })
        .collect()
}

/// Save the table as a pretty JSON array of row objects.
pub fn save_json<P: AsRef<Path>>(table: &ResultTable, path: P) -> Result<()> {
    let mut f = File::create(path)?;
    let s = serde_json::to_string_pretty(&to_json_rows(table))?;
    f.write_all(s.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_csv_and_json() {
        let dir = tempdir().unwrap();
        let csvp = dir.path().join("x.csv");
        let jsonp = dir.path().join("x.json");
        let table = crate::jsonstat::from_str(
            r#"{"class":"dataset","id":["S"],"size":[2],
                "dimension":{"S":{"label":"Sex",
                  "category":{"index":["1","2"],"label":{"1":"Male","2":"Female"}}}},
                "value":[1.5,null]}"#,
        )
        .unwrap();
        save_csv(&table, &csvp).unwrap();
        save_json(&table, &jsonp).unwrap();
        let csv_txt = std::fs::read_to_string(&csvp).unwrap();
        assert_eq!(csv_txt, "Sex,value\nMale,1.5\nFemale,\n");
        assert!(jsonp.exists());
    }

    #[test]
    fn sanitize_keeps_negative_numbers() {
        assert_eq!(sanitize("-01"), "-01");
        assert_eq!(sanitize("=1+1"), "'=1+1");
        assert_eq!(sanitize("All ages"), "All ages");
    }

    #[test]
    fn json_rows_of_dimensionless_table() {
        let table = crate::jsonstat::from_str(
            r#"{"class":"dataset","id":[],"size":[],"dimension":{},"value":[5]}"#,
        )
        .unwrap();
        assert_eq!(table.columns(), &["value"]);
        let rows = to_json_rows(&table);
        assert_eq!(rows, vec![serde_json::json!({"value": 5.0})]);
    }
}
