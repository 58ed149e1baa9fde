use crate::extract::{self, SkipReason};
use crate::reader::TableData;
use log::debug;
use std::collections::HashMap;

/// Composite cell key over the observed (x, y) pair. Keyed on the bit pattern
/// so the map has well-defined equality and hashing; -0.0 is folded into 0.0
/// and non-finite values never reach this point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CellKey(u64, u64);

impl CellKey {
    fn new(x: f64, y: f64) -> Self {
        // adding 0.0 collapses -0.0 to +0.0
        CellKey((x + 0.0).to_bits(), (y + 0.0).to_bits())
    }
}

/// Aggregated heatmap grid. Axes are the sorted sets of distinct observed
/// values: x ascending, y descending so the largest y lands at the top-left.
/// Rows of `z`/`text` follow the y axis order.
#[derive(Debug, Clone)]
pub struct HeatmapGrid {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
    pub z: Vec<Vec<f64>>,
    pub text: Vec<Vec<String>>,
    pub max_z: f64,
    pub included: usize,
    pub total: usize,
}

impl HeatmapGrid {
    pub fn is_empty(&self) -> bool {
        self.included == 0
    }
}

/// Single pass over the table: parse the x, y and z columns of each record,
/// skip rows that fail, and keep the last z value written to each (x, y) cell.
pub fn aggregate(
    table: &TableData,
    x_col: &str,
    y_col: &str,
    z_col: &str,
    log_z: bool,
) -> HeatmapGrid {
    let mut cells: HashMap<CellKey, f64> = HashMap::new();
    let mut xs: Vec<f64> = Vec::new();
    let mut ys: Vec<f64> = Vec::new();
    let mut max_z: f64 = 0.0;
    let mut included = 0usize;
    let mut total = 0usize;

    for record in table.records() {
        total += 1;
        let parsed = (|| -> Result<(f64, f64, f64), SkipReason> {
            let x = extract::numeric(&record, x_col)?;
            let y = extract::numeric(&record, y_col)?;
            let z = extract::numeric(&record, z_col)?;
            Ok((x, y, z))
        })();
        let (x, y, z) = match parsed {
            Ok(values) => values,
            Err(reason) => {
                debug!("skipping record {}: {}", total, reason);
                continue;
            }
        };
        let z = if log_z { extract::log1p(z) } else { z };

        if !xs.contains(&x) {
            xs.push(x);
        }
        if !ys.contains(&y) {
            ys.push(y);
        }
        cells.insert(CellKey::new(x, y), z);
        max_z = max_z.max(z);
        included += 1;
    }

    xs.sort_by(f64::total_cmp);
    ys.sort_by(f64::total_cmp);
    ys.reverse();

    let mut z_rows = Vec::with_capacity(ys.len());
    let mut text_rows = Vec::with_capacity(ys.len());
    for &y in &ys {
        let mut z_row = Vec::with_capacity(xs.len());
        let mut text_row = Vec::with_capacity(xs.len());
        for &x in &xs {
            match cells.get(&CellKey::new(x, y)) {
                Some(&z) => {
                    z_row.push(z);
                    text_row.push(format!("{:.2}", z));
                }
                None => {
                    z_row.push(0.0);
                    text_row.push(String::new());
                }
            }
        }
        z_rows.push(z_row);
        text_rows.push(text_row);
    }

    HeatmapGrid {
        xs,
        ys,
        z: z_rows,
        text: text_rows,
        max_z,
        included,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::read_table;

    fn table(body: &str) -> TableData {
        read_table(format!("x\ty\tz\n{}", body).as_bytes(), b'\t').unwrap()
    }

    #[test]
    fn test_axes_sorted() {
        let t = table("2\t1\t10\n1\t2\t20\n3\t3\t30\n");
        let grid = aggregate(&t, "x", "y", "z", false);
        assert_eq!(grid.xs, vec![1.0, 2.0, 3.0]);
        assert_eq!(grid.ys, vec![3.0, 2.0, 1.0]);
    }

    #[test]
    fn test_counts_and_skips() {
        let t = table("1\t1\t5\nbad\t1\t5\n2\t2\t6\n");
        let grid = aggregate(&t, "x", "y", "z", false);
        assert_eq!(grid.total, 3);
        assert_eq!(grid.included, 2);
    }

    #[test]
    fn test_empty_cell_defaults() {
        // (1,1) and (2,2) observed; (1,2) and (2,1) are not
        let t = table("1\t1\t5\n2\t2\t6\n");
        let grid = aggregate(&t, "x", "y", "z", false);
        // ys descending: row 0 is y=2
        assert_eq!(grid.z[0], vec![0.0, 6.0]);
        assert_eq!(grid.text[0], vec!["", "6.00"]);
        assert_eq!(grid.z[1], vec![5.0, 0.0]);
        assert_eq!(grid.text[1], vec!["5.00", ""]);
    }

    #[test]
    fn test_duplicate_key_last_write_wins() {
        let t = table("1\t2\t3\n1\t2\t5\n");
        let grid = aggregate(&t, "x", "y", "z", false);
        assert_eq!(grid.xs, vec![1.0]);
        assert_eq!(grid.ys, vec![2.0]);
        assert_eq!(grid.z[0][0], 5.0);
        assert_eq!(grid.included, 2);
    }

    #[test]
    fn test_max_z_tracked() {
        let t = table("1\t1\t5\n2\t2\t9\n3\t3\t2\n");
        let grid = aggregate(&t, "x", "y", "z", false);
        assert_eq!(grid.max_z, 9.0);
    }

    #[test]
    fn test_log_transform() {
        let t = table("1\t1\t0\n");
        let grid = aggregate(&t, "x", "y", "z", true);
        assert_eq!(grid.z[0][0], 0.0);
        assert_eq!(grid.text[0][0], "0.00");
    }

    #[test]
    fn test_zero_included_is_empty() {
        let t = table("a\tb\tc\n");
        let grid = aggregate(&t, "x", "y", "z", false);
        assert!(grid.is_empty());
        assert_eq!(grid.total, 1);
    }

    #[test]
    fn test_negative_zero_folds_into_zero() {
        let t = table("-0\t1\t3\n0\t1\t5\n");
        let grid = aggregate(&t, "x", "y", "z", false);
        assert_eq!(grid.z[0][0], 5.0);
    }
}
