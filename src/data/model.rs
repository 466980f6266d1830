use std::collections::BTreeSet;
use std::fmt;

use anyhow::{bail, Context, Result};
use ndarray::Array2;

// ---------------------------------------------------------------------------
// Value – a single cell of a table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell mirroring the common Pandas dtypes.
/// Used as a `BTreeSet` key downstream, so `Value` must be `Ord`.
#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Null,
}

// -- Manual Eq/Ord so we can put Value in BTreeSet --

// Equality agrees with `Ord` and `Hash`: floats compare by `total_cmp`, so
// `-0.0 != 0.0` and a NaN equals itself.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use Value::*;
        fn rank(v: &Value) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Int(_) => 2,
                Float(_) => 3,
                Str(_) => 4,
            }
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Int(a), Int(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Str(a), Str(b)) => a.cmp(b),
            _ => rank(self).cmp(&rank(other)),
        }
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Str(s) => s.hash(state),
            Value::Int(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Bool(b) => b.hash(state),
            Value::Null => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{s}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Null => write!(f, "<null>"),
        }
    }
}

impl Value {
    /// Interpret the value as an `f64`. Booleans count as 0/1 so that
    /// indicator columns can be used as features.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(i) => Some(*i as f64),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

// ---------------------------------------------------------------------------
// Column
// ---------------------------------------------------------------------------

/// Inferred storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Int,
    Float,
    Bool,
    Str,
}

impl ColumnType {
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnType::Int | ColumnType::Float | ColumnType::Bool)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Int => "int64",
            ColumnType::Float => "float64",
            ColumnType::Bool => "bool",
            ColumnType::Str => "object",
        };
        f.write_str(name)
    }
}

/// A named column. Every value is either `Null` or matches `dtype`.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub dtype: ColumnType,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, dtype: ColumnType, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            dtype,
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn null_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_null()).count()
    }
}

// ---------------------------------------------------------------------------
// DataFrame – the complete loaded table
// ---------------------------------------------------------------------------

/// An in-memory table of equally long, named, typed columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataFrame {
    columns: Vec<Column>,
    n_rows: usize,
}

impl DataFrame {
    /// Build a table, checking that all columns have the same length.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let n_rows = columns.first().map_or(0, Column::len);
        for col in &columns {
            if col.len() != n_rows {
                bail!(
                    "column '{}' has {} rows, expected {n_rows}",
                    col.name,
                    col.len()
                );
            }
        }
        Ok(Self { columns, n_rows })
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// `(rows, columns)`, like `DataFrame.shape`.
    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows, self.columns.len())
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Names of the columns usable as features.
    pub fn numeric_column_names(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.dtype.is_numeric())
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Sorted set of distinct values in a column.
    pub fn unique_values(&self, name: &str) -> Option<BTreeSet<Value>> {
        self.column(name)
            .map(|c| c.values.iter().cloned().collect())
    }

    /// Cells of row `i`, in column order.
    pub fn row(&self, i: usize) -> Option<Vec<&Value>> {
        if i >= self.n_rows {
            return None;
        }
        Some(self.columns.iter().map(|c| &c.values[i]).collect())
    }

    /// First `n` rows.
    pub fn head(&self, n: usize) -> DataFrame {
        let n = n.min(self.n_rows);
        let columns = self
            .columns
            .iter()
            .map(|c| Column::new(c.name.clone(), c.dtype, c.values[..n].to_vec()))
            .collect();
        DataFrame { columns, n_rows: n }
    }

    /// Stack the named numeric columns into a `[rows, names.len()]` feature
    /// matrix. Nulls become NaN.
    pub fn to_matrix(&self, names: &[&str]) -> Result<Array2<f64>> {
        let mut selected = Vec::with_capacity(names.len());
        for name in names {
            let col = self
                .column(name)
                .with_context(|| format!("no column named '{name}'"))?;
            if !col.dtype.is_numeric() {
                bail!("column '{name}' has non-numeric type {}", col.dtype);
            }
            selected.push(col);
        }

        Ok(Array2::from_shape_fn((self.n_rows, selected.len()), |(i, j)| {
            selected[j].values[i].as_f64().unwrap_or(f64::NAN)
        }))
    }
}

impl fmt::Display for DataFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.column_names().join(","))?;
        for i in 0..self.n_rows {
            let cells: Vec<String> = self.columns.iter().map(|c| c.values[i].to_string()).collect();
            writeln!(f, "{}", cells.join(","))?;
        }
        Ok(())
    }
}
