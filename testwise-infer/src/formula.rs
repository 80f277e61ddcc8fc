//! Model Formulas
//!
//! Minimal Wilkinson-style formulas for random-intercept models:
//!
//! ```text
//! Value ~ Condition + C(Dose) + Age + (1|SubjectID)
//! ```
//!
//! An intercept is always included. Text columns and `C(...)` terms are
//! treatment-coded against their first sorted level. Column references are
//! resolved against the table; nothing else about the model is validated.

use crate::error::{InferenceError, Result};
use fxhash::FxHashMap;
use nalgebra::{DMatrix, DVector};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use testwise_stats::{Column, GroupedSample, Table};

/// One fixed-effect term
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    /// Referenced column
    pub column: String,
    /// Forced categorical via `C(...)`
    pub forced_categorical: bool,
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.forced_categorical {
            write!(f, "C({})", self.column)
        } else {
            f.write_str(&self.column)
        }
    }
}

/// Parsed model formula
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Formula {
    /// Response column
    pub response: String,
    /// Fixed-effect terms in formula order
    pub terms: Vec<Term>,
    /// Random-intercept grouping column
    pub group: Option<String>,
}

fn random_term_regex() -> &'static Regex {
    static RANDOM_RE: OnceLock<Regex> = OnceLock::new();
    // Safety: this regex literal is guaranteed to compile
    RANDOM_RE.get_or_init(|| Regex::new(r"\(\s*1\s*\|\s*([^()|]+?)\s*\)").unwrap())
}

fn categorical_regex() -> &'static Regex {
    static CATEGORICAL_RE: OnceLock<Regex> = OnceLock::new();
    // Safety: this regex literal is guaranteed to compile
    CATEGORICAL_RE.get_or_init(|| Regex::new(r"^C\(\s*([^()]+?)\s*\)$").unwrap())
}

impl Formula {
    /// Parse `response ~ term + term + (1|group)`
    pub fn parse(text: &str) -> Result<Self> {
        let (lhs, rhs) = text.split_once('~').ok_or_else(|| {
            InferenceError::InvalidArgument(format!("formula '{}' has no '~'", text))
        })?;

        let response = lhs.trim();
        if response.is_empty() {
            return Err(InferenceError::InvalidArgument(format!(
                "formula '{}' has no response",
                text
            )));
        }

        let random = random_term_regex();
        let mut groups = random
            .captures_iter(rhs)
            .map(|c| c[1].trim().to_string());
        let group = groups.next();
        if groups.next().is_some() {
            return Err(InferenceError::InvalidArgument(
                "only one random intercept term is supported".to_string(),
            ));
        }

        let fixed = random.replace_all(rhs, "");
        let mut terms = Vec::new();
        for raw in fixed.split('+') {
            let raw = raw.trim();
            if raw.is_empty() || raw == "1" {
                continue;
            }
            let term = match categorical_regex().captures(raw) {
                Some(c) => Term {
                    column: c[1].to_string(),
                    forced_categorical: true,
                },
                None => Term {
                    column: raw.to_string(),
                    forced_categorical: false,
                },
            };
            if !terms.contains(&term) {
                terms.push(term);
            }
        }

        Ok(Self {
            response: response.to_string(),
            terms,
            group,
        })
    }

    /// Default formula for a grouped design: `value ~ C(group) + (1|id)`
    pub fn for_design(grouped: &GroupedSample) -> Self {
        Self {
            response: grouped.value_column().to_string(),
            terms: grouped
                .group_column()
                .map(|column| Term {
                    column: column.to_string(),
                    forced_categorical: true,
                })
                .into_iter()
                .collect(),
            group: grouped.id_column().map(str::to_string),
        }
    }

    /// Fill in the grouping column when the formula has none
    pub fn or_group(mut self, group: Option<&str>) -> Self {
        if self.group.is_none() {
            self.group = group.map(str::to_string);
        }
        self
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ~ ", self.response)?;
        if self.terms.is_empty() {
            write!(f, "1")?;
        }
        for (i, term) in self.terms.iter().enumerate() {
            if i > 0 {
                write!(f, " + ")?;
            }
            write!(f, "{}", term)?;
        }
        if let Some(group) = &self.group {
            write!(f, " + (1|{})", group)?;
        }
        Ok(())
    }
}

/// Numeric model inputs built from a formula and a table
#[derive(Debug, Clone)]
pub struct Design {
    /// Response vector
    pub response: DVector<f64>,
    /// Fixed-effects matrix, intercept first
    pub fixed: DMatrix<f64>,
    /// Column names of `fixed`
    pub names: Vec<String>,
    /// Group index of every row
    pub groups: Vec<usize>,
    /// Group labels, indexed by group index
    pub group_labels: Vec<String>,
    /// Rows dropped for missing cells
    pub dropped_rows: usize,
}

enum Encoded<'a> {
    Continuous(&'a [f64]),
    Categorical(&'a Column),
}

fn sort_levels(levels: &mut [String]) {
    let numeric: Option<Vec<f64>> = levels.iter().map(|l| l.parse::<f64>().ok()).collect();
    if numeric.is_some() {
        levels.sort_by(|a, b| {
            let (x, y) = (a.parse::<f64>(), b.parse::<f64>());
            match (x, y) {
                (Ok(x), Ok(y)) => x.total_cmp(&y),
                _ => a.cmp(b),
            }
        });
    } else {
        levels.sort();
    }
}

/// Build the design matrices for a random-intercept model
///
/// Rows with a missing response, term or group cell are dropped.
pub fn build_design(formula: &Formula, table: &Table) -> Result<Design> {
    let group_column = formula.group.as_deref().ok_or_else(|| {
        InferenceError::InvalidArgument(
            "mixed model needs a random intercept term or an identifier column".to_string(),
        )
    })?;

    let response = table.require_numeric(&formula.response)?;
    let group_labels_column = table.require(group_column)?;

    let mut encoded = Vec::with_capacity(formula.terms.len());
    for term in &formula.terms {
        let column = table.require(&term.column)?;
        encoded.push(match (term.forced_categorical, column.as_numeric()) {
            (false, Some(values)) => Encoded::Continuous(values),
            _ => Encoded::Categorical(column),
        });
    }

    let kept: Vec<usize> = (0..table.row_count())
        .filter(|&row| {
            !response[row].is_nan()
                && group_labels_column.label(row).is_some()
                && encoded.iter().all(|e| match e {
                    Encoded::Continuous(values) => !values[row].is_nan(),
                    Encoded::Categorical(column) => column.label(row).is_some(),
                })
        })
        .collect();

    // Intercept plus one column per continuous term or non-reference level
    let mut names = vec!["Intercept".to_string()];
    let mut columns: Vec<Vec<f64>> = vec![vec![1.0; kept.len()]];
    for (term, e) in formula.terms.iter().zip(&encoded) {
        match e {
            Encoded::Continuous(values) => {
                names.push(term.to_string());
                columns.push(kept.iter().map(|&row| values[row]).collect());
            }
            Encoded::Categorical(column) => {
                let labels: Vec<String> = kept
                    .iter()
                    .filter_map(|&row| column.label(row))
                    .collect();
                let mut levels = labels.clone();
                sort_levels(&mut levels);
                levels.dedup();
                for level in levels.iter().skip(1) {
                    names.push(format!("{}[T.{}]", term, level));
                    columns.push(
                        labels
                            .iter()
                            .map(|l| if l == level { 1.0 } else { 0.0 })
                            .collect(),
                    );
                }
            }
        }
    }

    let mut index: FxHashMap<String, usize> = FxHashMap::default();
    let mut group_labels = Vec::new();
    let mut groups = Vec::with_capacity(kept.len());
    for &row in &kept {
        let label = group_labels_column.label(row).unwrap_or_default();
        let next = group_labels.len();
        let idx = *index.entry(label.clone()).or_insert_with(|| {
            group_labels.push(label);
            next
        });
        groups.push(idx);
    }

    let n = kept.len();
    let p = columns.len();
    let fixed = DMatrix::from_fn(n, p, |i, j| columns[j][i]);
    let response = DVector::from_iterator(n, kept.iter().map(|&row| response[row]));

    Ok(Design {
        response,
        fixed,
        names,
        groups,
        group_labels,
        dropped_rows: table.row_count() - n,
    })
}
