use crate::models::ResultTable;
use serde::{Deserialize, Serialize};

/// Summary statistics over the value column of a table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub missing: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub median: Option<f64>,
}

/// Compute count/missing/min/max/mean/median of `table`'s observations.
pub fn summary(table: &ResultTable) -> Summary {
    let mut vals: Vec<f64> = table.values().flatten().filter(|v| v.is_finite()).collect();
    let missing = table.len() - vals.len();
    vals.sort_by(|a, b| a.total_cmp(b));

    let count = vals.len();
    let min = vals.first().cloned();
    let max = vals.last().cloned();
    let mean = if count > 0 {
        Some(vals.iter().copied().sum::<f64>() / count as f64)
    } else {
        None
    };
    let median = if count == 0 {
        None
    } else if count % 2 == 1 {
        Some(vals[count / 2])
    } else {
        Some((vals[count / 2 - 1] + vals[count / 2]) / 2.0)
    };
    Summary {
        count,
        missing,
        min,
        max,
        mean,
        median,
    }
}
