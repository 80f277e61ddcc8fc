//! Samples, Tables and Grouped Samples
//!
//! A [`Sample`] is a named one-dimensional numeric series. Its clean form
//! (missing entries removed) is derived exactly once, in the constructor, and
//! every analytic routine reads only that clean view.
//!
//! A [`Table`] is the column-oriented collaborator grouped analyses are built
//! from; [`GroupedSample`] splits one numeric column of a table by a group
//! column and records the structural metadata (subject identifiers, pairing)
//! the method selector needs.

use crate::error::{DiagnosisError, Result};
use fxhash::FxHashMap;

/// Cell spellings treated as missing when parsing text (case-insensitive)
const MISSING_TOKENS: &[&str] = &["", "na", "nan", "null", "none"];

/// Whether a text cell denotes a missing value
pub fn is_missing_token(cell: &str) -> bool {
    let trimmed = cell.trim();
    MISSING_TOKENS
        .iter()
        .any(|token| trimmed.eq_ignore_ascii_case(token))
}

/// Named numeric sample with an immutable clean view
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    name: String,
    /// Values as supplied; NaN marks a missing entry
    raw: Vec<f64>,
    /// `raw` with missing entries removed
    clean: Vec<f64>,
}

impl Sample {
    /// Build a sample from numeric values. NaN entries are treated as missing.
    ///
    /// Fails with [`DiagnosisError::InvalidInput`] on infinite values.
    pub fn new(name: impl Into<String>, values: impl IntoIterator<Item = f64>) -> Result<Self> {
        let name = name.into();
        let raw: Vec<f64> = values.into_iter().collect();

        if let Some(position) = raw.iter().position(|v| v.is_infinite()) {
            return Err(DiagnosisError::InvalidInput(format!(
                "sample '{}' has an infinite value at position {}",
                name, position
            )));
        }

        let clean = raw.iter().copied().filter(|v| !v.is_nan()).collect();
        Ok(Self { name, raw, clean })
    }

    /// Build a sample from row-major two-dimensional input.
    ///
    /// Accepts a single row or a column vector (every row of width one).
    /// Anything else is not one-dimensional and is rejected.
    pub fn from_rows(name: impl Into<String>, rows: &[Vec<f64>]) -> Result<Self> {
        match rows {
            [] => Self::new(name, Vec::new()),
            [row] => Self::new(name, row.iter().copied()),
            _ if rows.iter().all(|row| row.len() == 1) => {
                Self::new(name, rows.iter().map(|row| row[0]))
            }
            _ => {
                let widest = rows.iter().map(Vec::len).max().unwrap_or(0);
                Err(DiagnosisError::InvalidInput(format!(
                    "expected one-dimensional data, got {} rows up to {} wide",
                    rows.len(),
                    widest
                )))
            }
        }
    }

    /// Parse a sample from text cells.
    ///
    /// Empty, `NA`, `NaN`, `null` and `none` cells are missing; any other
    /// cell that does not parse as a number is rejected.
    pub fn parse<S: AsRef<str>>(name: impl Into<String>, cells: &[S]) -> Result<Self> {
        let name = name.into();
        let mut values = Vec::with_capacity(cells.len());

        for (row, cell) in cells.iter().enumerate() {
            let cell = cell.as_ref();
            if is_missing_token(cell) {
                values.push(f64::NAN);
                continue;
            }
            let value = cell.trim().parse::<f64>().map_err(|_| {
                DiagnosisError::InvalidInput(format!(
                    "sample '{}' has non-numeric value '{}' at row {}",
                    name, cell, row
                ))
            })?;
            values.push(value);
        }

        Self::new(name, values)
    }

    /// Take a numeric column of a table as a sample
    pub fn from_column(table: &Table, column: &str) -> Result<Self> {
        let values = table.require_numeric(column)?;
        Self::new(column, values.iter().copied())
    }

    /// Sample label
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Values as supplied, including missing (NaN) entries
    pub fn raw(&self) -> &[f64] {
        &self.raw
    }

    /// Clean values (missing entries removed)
    pub fn values(&self) -> &[f64] {
        &self.clean
    }

    /// Number of clean values
    pub fn len(&self) -> usize {
        self.clean.len()
    }

    /// Whether the clean view is empty
    pub fn is_empty(&self) -> bool {
        self.clean.is_empty()
    }

    /// Number of missing entries dropped from the raw input
    pub fn missing_count(&self) -> usize {
        self.raw.len() - self.clean.len()
    }

    /// Smallest clean value
    pub fn min(&self) -> Option<f64> {
        self.clean.iter().copied().reduce(f64::min)
    }

    /// Largest clean value
    pub fn max(&self) -> Option<f64> {
        self.clean.iter().copied().reduce(f64::max)
    }
}

/// A single table column
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// Numbers; NaN marks a missing cell
    Numeric(Vec<f64>),
    /// Labels; an empty string marks a missing cell
    Text(Vec<String>),
}

impl Column {
    /// Number of cells
    pub fn len(&self) -> usize {
        match self {
            Column::Numeric(values) => values.len(),
            Column::Text(values) => values.len(),
        }
    }

    /// Whether the column has no cells
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Numeric cells, if this is a numeric column
    pub fn as_numeric(&self) -> Option<&[f64]> {
        match self {
            Column::Numeric(values) => Some(values),
            Column::Text(_) => None,
        }
    }

    /// Categorical view of one cell; `None` when missing
    pub fn label(&self, row: usize) -> Option<String> {
        match self {
            Column::Numeric(values) => values
                .get(row)
                .filter(|v| !v.is_nan())
                .map(|&v| format_label(v)),
            Column::Text(values) => values
                .get(row)
                .filter(|s| !s.trim().is_empty())
                .map(|s| s.trim().to_string()),
        }
    }
}

/// Render a numeric group key without a spurious fractional part
fn format_label(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Column-oriented table with uniquely named, equally long columns
#[derive(Debug, Clone, Default)]
pub struct Table {
    names: Vec<String>,
    columns: Vec<Column>,
    index: FxHashMap<String, usize>,
}

impl Table {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column, enforcing unique names and equal lengths
    pub fn push_column(&mut self, name: impl Into<String>, column: Column) -> Result<()> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(DiagnosisError::InvalidInput(format!(
                "duplicate column '{}'",
                name
            )));
        }
        if let Some(first) = self.columns.first() {
            if first.len() != column.len() {
                return Err(DiagnosisError::InvalidInput(format!(
                    "column '{}' has {} rows, table has {}",
                    name,
                    column.len(),
                    first.len()
                )));
            }
        }

        self.index.insert(name.clone(), self.columns.len());
        self.names.push(name);
        self.columns.push(column);
        Ok(())
    }

    /// Builder form of [`Table::push_column`] for a numeric column
    pub fn with_numeric(mut self, name: impl Into<String>, values: Vec<f64>) -> Result<Self> {
        self.push_column(name, Column::Numeric(values))?;
        Ok(self)
    }

    /// Builder form of [`Table::push_column`] for a text column
    pub fn with_text<S: Into<String>>(
        mut self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = S>,
    ) -> Result<Self> {
        let values = values.into_iter().map(Into::into).collect();
        self.push_column(name, Column::Text(values))?;
        Ok(self)
    }

    /// Build a table from text records, inferring column types.
    ///
    /// A column is numeric when every non-missing cell parses as `f64`;
    /// otherwise it is kept as text.
    pub fn from_records(headers: &[String], records: &[Vec<String>]) -> Result<Self> {
        let mut table = Self::new();

        for (col, header) in headers.iter().enumerate() {
            let cells: Vec<&str> = records
                .iter()
                .map(|record| record.get(col).map(String::as_str).unwrap_or(""))
                .collect();

            let numeric: Option<Vec<f64>> = cells
                .iter()
                .map(|cell| {
                    if is_missing_token(cell) {
                        Some(f64::NAN)
                    } else {
                        cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
                    }
                })
                .collect();

            let column = match numeric {
                Some(values) => Column::Numeric(values),
                None => Column::Text(
                    cells
                        .iter()
                        .map(|cell| {
                            if is_missing_token(cell) {
                                String::new()
                            } else {
                                cell.trim().to_string()
                            }
                        })
                        .collect(),
                ),
            };
            table.push_column(header.trim(), column)?;
        }

        Ok(table)
    }

    /// Look up a column by name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.index.get(name).map(|&i| &self.columns[i])
    }

    /// Look up a column, failing with the list of available names
    pub fn require(&self, name: &str) -> Result<&Column> {
        self.column(name).ok_or_else(|| {
            DiagnosisError::InvalidInput(format!(
                "unknown column '{}' (available: {})",
                name,
                self.names.join(", ")
            ))
        })
    }

    /// Look up a column that must be numeric
    pub fn require_numeric(&self, name: &str) -> Result<&[f64]> {
        self.require(name)?.as_numeric().ok_or_else(|| {
            DiagnosisError::InvalidInput(format!("column '{}' is not numeric", name))
        })
    }

    /// Column names in insertion order
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }

    /// Number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}

/// A numeric column split by an optional group column
///
/// Group keys are unique and kept in order of first appearance. Rows with a
/// missing group label belong to no group but still count toward the pooled
/// sample. Presence of a subject identifier column marks the data as
/// hierarchical, whatever the group count.
#[derive(Debug, Clone)]
pub struct GroupedSample {
    value_column: String,
    group_column: Option<String>,
    id_column: Option<String>,
    paired: bool,
    pooled: Sample,
    groups: Vec<(String, Sample)>,
    subject_count: Option<usize>,
    table: Table,
}

impl GroupedSample {
    /// Split `value_column` of `table` by `group_column`.
    ///
    /// Fails with [`DiagnosisError::InvalidInput`] when a referenced column is
    /// missing or the value column is not numeric.
    pub fn new(
        table: &Table,
        value_column: &str,
        group_column: Option<&str>,
        id_column: Option<&str>,
    ) -> Result<Self> {
        let values = table.require_numeric(value_column)?;
        let pooled = Sample::new(value_column, values.iter().copied())?;

        let groups = match group_column {
            Some(name) => split_by_label(values, table.require(name)?, value_column, name)?,
            None => Vec::new(),
        };

        let subject_count = match id_column {
            Some(name) => {
                let ids = table.require(name)?;
                let mut seen = fxhash::FxHashSet::default();
                for row in 0..ids.len() {
                    if let Some(label) = ids.label(row) {
                        seen.insert(label);
                    }
                }
                Some(seen.len())
            }
            None => None,
        };

        Ok(Self {
            value_column: value_column.to_string(),
            group_column: group_column.map(str::to_string),
            id_column: id_column.map(str::to_string),
            paired: false,
            pooled,
            groups,
            subject_count,
            table: table.clone(),
        })
    }

    /// Mark the design as paired (row order within each group defines pairs)
    pub fn with_pairing(mut self, paired: bool) -> Self {
        self.paired = paired;
        self
    }

    /// Name of the value column
    pub fn value_column(&self) -> &str {
        &self.value_column
    }

    /// Name of the group column, if one was configured
    pub fn group_column(&self) -> Option<&str> {
        self.group_column.as_deref()
    }

    /// Name of the subject identifier column, if one was configured
    pub fn id_column(&self) -> Option<&str> {
        self.id_column.as_deref()
    }

    /// Whether the design is paired
    pub fn is_paired(&self) -> bool {
        self.paired
    }

    /// Whether a subject identifier column is present
    pub fn is_hierarchical(&self) -> bool {
        self.id_column.is_some()
    }

    /// All values of the value column
    pub fn pooled(&self) -> &Sample {
        &self.pooled
    }

    /// Groups in order of first appearance
    pub fn groups(&self) -> &[(String, Sample)] {
        &self.groups
    }

    /// Look up one group by key
    pub fn group(&self, key: &str) -> Option<&Sample> {
        self.groups
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, sample)| sample)
    }

    /// Number of groups; `None` when no group column was configured
    pub fn group_count(&self) -> Option<usize> {
        self.group_column.as_ref().map(|_| self.groups.len())
    }

    /// Number of distinct subjects; `None` without an identifier column
    pub fn subject_count(&self) -> Option<usize> {
        self.subject_count
    }

    /// Source table (read-only)
    pub fn table(&self) -> &Table {
        &self.table
    }
}

/// Split values into per-label samples, keeping first-appearance order
fn split_by_label(
    values: &[f64],
    labels: &Column,
    value_column: &str,
    group_column: &str,
) -> Result<Vec<(String, Sample)>> {
    let mut order: Vec<String> = Vec::new();
    let mut index: FxHashMap<String, usize> = FxHashMap::default();
    let mut buckets: Vec<Vec<f64>> = Vec::new();

    for (row, &value) in values.iter().enumerate() {
        let Some(label) = labels.label(row) else {
            continue;
        };
        let slot = *index.entry(label.clone()).or_insert_with(|| {
            order.push(label);
            buckets.push(Vec::new());
            buckets.len() - 1
        });
        buckets[slot].push(value);
    }

    order
        .into_iter()
        .zip(buckets)
        .map(|(key, bucket)| {
            let name = format!("{} [{}={}]", value_column, group_column, key);
            Sample::new(name, bucket).map(|sample| (key, sample))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_table() -> Table {
        Table::new()
            .with_numeric("rt", vec![1.0, 2.0, f64::NAN, 4.0, 5.0, 6.0])
            .unwrap()
            .with_text("group", ["b", "a", "b", "a", "", "b"])
            .unwrap()
            .with_text("subject", ["s1", "s1", "s2", "s2", "s3", "s3"])
            .unwrap()
    }

    #[test]
    fn test_clean_view_drops_nan() {
        let sample = Sample::new("x", vec![1.0, f64::NAN, 3.0]).unwrap();
        assert_eq!(sample.values(), &[1.0, 3.0]);
        assert_eq!(sample.raw().len(), 3);
        assert_eq!(sample.missing_count(), 1);
    }

    #[test]
    fn test_infinite_rejected() {
        let err = Sample::new("x", vec![1.0, f64::INFINITY]).unwrap_err();
        assert!(matches!(err, DiagnosisError::InvalidInput(_)));
    }

    #[test]
    fn test_from_rows_shapes() {
        let column = vec![vec![1.0], vec![2.0], vec![3.0]];
        assert_eq!(Sample::from_rows("c", &column).unwrap().len(), 3);

        let row = vec![vec![1.0, 2.0, 3.0]];
        assert_eq!(Sample::from_rows("r", &row).unwrap().len(), 3);

        let matrix = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        assert!(matches!(
            Sample::from_rows("m", &matrix),
            Err(DiagnosisError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_parse_cells() {
        let sample = Sample::parse("x", &["1.5", "NA", "", " 2 "]).unwrap();
        assert_eq!(sample.values(), &[1.5, 2.0]);

        assert!(matches!(
            Sample::parse("x", &["1", "abc"]),
            Err(DiagnosisError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_table_rejects_ragged_and_duplicate_columns() {
        let table = Table::new().with_numeric("a", vec![1.0, 2.0]).unwrap();
        assert!(table.clone().with_numeric("b", vec![1.0]).is_err());
        assert!(table.with_numeric("a", vec![3.0, 4.0]).is_err());
    }

    #[test]
    fn test_table_from_records_infers_types() {
        let headers = vec!["value".to_string(), "label".to_string()];
        let records = vec![
            vec!["1.0".to_string(), "x".to_string()],
            vec!["NA".to_string(), "2".to_string()],
        ];
        let table = Table::from_records(&headers, &records).unwrap();
        assert!(table.column("value").unwrap().as_numeric().is_some());
        assert!(table.column("label").unwrap().as_numeric().is_none());
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn test_grouped_sample_split_order_and_missing_labels() {
        let grouped = GroupedSample::new(&demo_table(), "rt", Some("group"), None).unwrap();

        let keys: Vec<&str> = grouped.groups().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(grouped.group("b").unwrap().values(), &[1.0, 6.0]);
        assert_eq!(grouped.group("a").unwrap().values(), &[2.0, 4.0]);
        assert_eq!(grouped.group_count(), Some(2));
        assert_eq!(grouped.pooled().len(), 5);
        assert!(!grouped.is_hierarchical());
    }

    #[test]
    fn test_grouped_sample_hierarchy_from_id_column() {
        let grouped =
            GroupedSample::new(&demo_table(), "rt", Some("group"), Some("subject")).unwrap();
        assert!(grouped.is_hierarchical());
        assert_eq!(grouped.subject_count(), Some(3));
    }

    #[test]
    fn test_grouped_sample_bad_columns() {
        let table = demo_table();
        assert!(GroupedSample::new(&table, "missing", None, None).is_err());
        assert!(GroupedSample::new(&table, "group", None, None).is_err());
        assert!(GroupedSample::new(&table, "rt", Some("nope"), None).is_err());
        assert!(GroupedSample::new(&table, "rt", None, Some("nope")).is_err());
    }

    #[test]
    fn test_numeric_group_labels() {
        let table = Table::new()
            .with_numeric("v", vec![1.0, 2.0, 3.0])
            .unwrap()
            .with_numeric("g", vec![1.0, 2.0, 1.0])
            .unwrap();
        let grouped = GroupedSample::new(&table, "v", Some("g"), None).unwrap();
        assert!(grouped.group("1").is_some());
        assert!(grouped.group("2").is_some());
    }
}
