use anyhow::{Context, Result};
use std::io::Read;

/// Tabular data read from a delimited stream: a header row naming the columns,
/// followed by raw string rows.
#[derive(Debug, Clone)]
pub struct TableData {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TableData {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Iterate rows as name -> value records.
    pub fn records(&self) -> impl Iterator<Item = Record<'_>> {
        self.rows.iter().map(move |row| Record {
            headers: &self.headers,
            fields: row,
        })
    }
}

/// One row viewed as a mapping from column name to raw string value.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    headers: &'a [String],
    fields: &'a [String],
}

impl<'a> Record<'a> {
    /// Look up a field by column name. Returns None when the column is not in
    /// the header or the row is too short to have a value for it.
    pub fn get(&self, name: &str) -> Option<&'a str> {
        let idx = self.headers.iter().position(|h| h == name)?;
        self.fields.get(idx).map(|s| s.as_str())
    }
}

/// Read delimited text with a header row. Rows with the wrong field count are
/// kept as-is; missing fields surface as lookup misses during extraction, so a
/// malformed row never aborts the stream.
pub fn read_table(input: impl Read, delimiter: u8) -> Result<TableData> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(input);

    let headers: Vec<String> = reader
        .headers()
        .context("Failed to read header row")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.context("Failed to read input row")?;
        rows.push(record.iter().map(|f| f.to_string()).collect());
    }

    Ok(TableData::new(headers, rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_table_tab_delimited() {
        let input = "x\ty\tz\n1\t2\t3\n4\t5\t6\n";
        let table = read_table(input.as_bytes(), b'\t').unwrap();
        assert_eq!(table.headers, vec!["x", "y", "z"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0], vec!["1", "2", "3"]);
    }

    #[test]
    fn test_read_table_custom_delimiter() {
        let input = "a,b\n1,2\n";
        let table = read_table(input.as_bytes(), b',').unwrap();
        assert_eq!(table.headers, vec!["a", "b"]);
        assert_eq!(table.rows, vec![vec!["1", "2"]]);
    }

    #[test]
    fn test_read_table_short_row_kept() {
        let input = "x\ty\n1\t2\n3\n4\t5\n";
        let table = read_table(input.as_bytes(), b'\t').unwrap();
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[1], vec!["3"]);
    }

    #[test]
    fn test_read_table_empty_body() {
        let input = "x\ty\n";
        let table = read_table(input.as_bytes(), b'\t').unwrap();
        assert_eq!(table.headers, vec!["x", "y"]);
        assert!(table.rows.is_empty());
    }

    #[test]
    fn test_record_get() {
        let input = "x\ty\n1\t2\n";
        let table = read_table(input.as_bytes(), b'\t').unwrap();
        let record = table.records().next().unwrap();
        assert_eq!(record.get("x"), Some("1"));
        assert_eq!(record.get("y"), Some("2"));
        assert_eq!(record.get("missing"), None);
    }

    #[test]
    fn test_record_get_short_row() {
        let input = "x\ty\n1\n";
        let table = read_table(input.as_bytes(), b'\t').unwrap();
        let record = table.records().next().unwrap();
        assert_eq!(record.get("x"), Some("1"));
        assert_eq!(record.get("y"), None);
    }
}
