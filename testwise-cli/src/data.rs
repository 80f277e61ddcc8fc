//! CSV Loading

use anyhow::Context;
use std::io::Read;
use std::path::Path;
use testwise_stats::Table;

/// Load a CSV file with a header row into a [`Table`]
pub fn load_csv(path: impl AsRef<Path>) -> anyhow::Result<Table> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open CSV: {}", path.display()))?;
    let table = read_csv(file).with_context(|| format!("Failed to read CSV: {}", path.display()))?;
    tracing::info!(
        path = %path.display(),
        rows = table.row_count(),
        columns = table.column_count(),
        "Loaded data"
    );
    Ok(table)
}

/// Read CSV data with a header row from any reader
pub fn read_csv(reader: impl Read) -> anyhow::Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .context("Failed to read headers")?
        .iter()
        .map(str::to_string)
        .collect();
    if headers.is_empty() {
        anyhow::bail!("CSV has no header row");
    }

    let mut records = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Malformed record at data row {}", line + 1))?;
        records.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }

    Ok(Table::from_records(&headers, &records)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use testwise_stats::Column;

    #[test]
    fn test_read_csv_infers_column_types() {
        let data = "RT,Group,SubjectID\n301.5,Control,1\n,Treatment,2\n290,Control,NA\n";
        let table = read_csv(data.as_bytes()).unwrap();

        assert_eq!(table.row_count(), 3);
        assert_eq!(table.column_count(), 3);
        let rt = table.require_numeric("RT").unwrap();
        assert_eq!(rt[0], 301.5);
        assert!(rt[1].is_nan());
        assert!(matches!(table.column("Group"), Some(Column::Text(_))));
        // numeric ids with a missing token stay numeric
        assert!(matches!(table.column("SubjectID"), Some(Column::Numeric(_))));
    }

    #[test]
    fn test_short_rows_are_missing_cells() {
        let table = read_csv("a,b\n1,x\n2\n".as_bytes()).unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column("b").unwrap().label(1), None);
    }

    #[test]
    fn test_load_csv_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Value,Condition").unwrap();
        writeln!(file, "1.0,A").unwrap();
        writeln!(file, "2.0,B").unwrap();

        let table = load_csv(file.path()).unwrap();
        assert_eq!(table.require_numeric("Value").unwrap(), &[1.0, 2.0]);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(load_csv("/nonexistent/testwise.csv").is_err());
    }
}
