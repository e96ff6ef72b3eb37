//! In-memory tabular data for a single sample group.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use super::value::Value;

static MISSING: Value = Value::Missing;

/// Ordered, named columns over rows of dynamically typed values.
///
/// Every row holds exactly one value per column; operations that add or
/// remove columns keep that invariant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    /// Column names, in output order.
    pub columns: Vec<String>,
    /// Row data (row-major order).
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    /// Create a table, padding or truncating rows to the column count.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Value::Missing);
                row
            })
            .collect();
        Self { columns, rows }
    }

    /// Build a table from string headers and typed rows.
    pub fn from_rows<S: Into<String>>(
        columns: impl IntoIterator<Item = S>,
        rows: Vec<Vec<Value>>,
    ) -> Self {
        Self::new(columns.into_iter().map(Into::into).collect(), rows)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Schema capability query used by steps to decide whether to act.
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Get a specific cell value.
    pub fn get(&self, row: usize, col: usize) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// Value of a named column in a row, `Missing` when the column is absent.
    pub fn value(&self, row: usize, column: &str) -> &Value {
        self.column_index(column)
            .and_then(|idx| self.get(row, idx))
            .unwrap_or(&MISSING)
    }

    /// Set a specific cell value. Out-of-range positions are ignored.
    pub fn set(&mut self, row: usize, col: usize, value: Value) {
        if let Some(cell) = self.rows.get_mut(row).and_then(|r| r.get_mut(col)) {
            *cell = value;
        }
    }

    /// Iterate over the values of a column by index.
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &Value> {
        self.rows
            .iter()
            .map(move |row| row.get(index).unwrap_or(&MISSING))
    }

    /// Get a column by name.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let index = self.column_index(name)?;
        Some(self.column_values(index).collect())
    }

    /// Add a column filled with `fill`, or overwrite it if it exists.
    pub fn add_column(&mut self, name: impl Into<String>, fill: Value) {
        let name = name.into();
        match self.column_index(&name) {
            Some(idx) => self.rows.iter_mut().for_each(|r| r[idx] = fill.clone()),
            None => {
                self.columns.push(name);
                self.rows.iter_mut().for_each(|r| r.push(fill.clone()));
            }
        }
    }

    /// Replace (or append) a whole column. `values` must have one entry per
    /// row; shorter inputs are padded with `Missing`.
    pub fn set_column(&mut self, name: impl Into<String>, values: Vec<Value>) {
        let name = name.into();
        let idx = match self.column_index(&name) {
            Some(idx) => idx,
            None => {
                self.columns.push(name);
                self.rows.iter_mut().for_each(|r| r.push(Value::Missing));
                self.columns.len() - 1
            }
        };
        let mut values = values.into_iter();
        for row in &mut self.rows {
            row[idx] = values.next().unwrap_or_default();
        }
    }

    /// Insert a new column at `index` (clamped to the column count).
    pub fn insert_column(&mut self, index: usize, name: impl Into<String>, values: Vec<Value>) {
        let index = index.min(self.columns.len());
        self.columns.insert(index, name.into());
        let mut values = values.into_iter();
        for row in &mut self.rows {
            row.insert(index, values.next().unwrap_or_default());
        }
    }

    /// Derive `dest` from `source` row by row.
    ///
    /// Returns `false` without touching the table when `source` is absent.
    pub fn map_column<F>(&mut self, source: &str, dest: &str, mut f: F) -> bool
    where
        F: FnMut(&Value) -> Value,
    {
        let Some(src_idx) = self.column_index(source) else {
            return false;
        };
        let derived: Vec<Value> = self.column_values(src_idx).map(&mut f).collect();
        self.set_column(dest, derived);
        true
    }

    /// Derive `dest` from whole rows.
    pub fn derive_column<F>(&mut self, dest: &str, mut f: F)
    where
        F: FnMut(&Table, usize) -> Value,
    {
        let derived: Vec<Value> = (0..self.row_count()).map(|i| f(self, i)).collect();
        self.set_column(dest, derived);
    }

    /// Rename columns according to `mapping`. Unknown keys are ignored.
    pub fn rename_columns(&mut self, mapping: &IndexMap<String, String>) {
        for column in &mut self.columns {
            if let Some(new_name) = mapping.get(column.as_str()) {
                *column = new_name.clone();
            }
        }
    }

    /// Drop the named columns that exist.
    pub fn drop_columns(&mut self, names: &[&str]) {
        let keep: Vec<String> = self
            .columns
            .iter()
            .filter(|c| !names.contains(&c.as_str()))
            .cloned()
            .collect();
        self.select_columns(&keep);
    }

    /// Keep only `names`, in the given order. Names not present are skipped
    /// and duplicates collapse to their first occurrence.
    pub fn select_columns(&mut self, names: &[String]) {
        let mut seen = HashSet::new();
        let indices: Vec<usize> = names
            .iter()
            .filter(|n| seen.insert(n.as_str()))
            .filter_map(|n| self.column_index(n))
            .collect();

        self.columns = indices.iter().map(|&i| self.columns[i].clone()).collect();
        self.rows = self
            .rows
            .drain(..)
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();
    }

    /// Keep the rows for which `keep` returns true. Returns the number of
    /// rows removed.
    pub fn retain_rows<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&Table, usize) -> bool,
    {
        let before = self.rows.len();
        let mask: Vec<bool> = (0..before).map(|i| keep(self, i)).collect();
        let mut mask = mask.into_iter();
        self.rows.retain(|_| mask.next().unwrap_or(false));
        before - self.rows.len()
    }

    /// Distinct non-missing values of a column, in first-appearance order.
    pub fn unique_values(&self, name: &str) -> Vec<Value> {
        let Some(idx) = self.column_index(name) else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        self.column_values(idx)
            .filter(|v| !v.is_missing())
            .filter(|v| seen.insert(v.key()))
            .cloned()
            .collect()
    }

    /// Left join `other` on `key`: every row of `self` is kept once per
    /// matching row of `other` (or once with `Missing` fill when none
    /// matches). Columns of `other` that already exist in `self` are
    /// suffixed with `_y`.
    pub fn merge_left(&self, other: &Table, key: &str) -> Table {
        let Some(left_key) = self.column_index(key) else {
            return self.clone();
        };
        let Some(right_key) = other.column_index(key) else {
            return self.clone();
        };

        let mut index: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, row) in other.rows.iter().enumerate() {
            index.entry(row[right_key].key()).or_default().push(i);
        }

        let right_cols: Vec<usize> = (0..other.column_count())
            .filter(|&i| i != right_key)
            .collect();
        let mut columns = self.columns.clone();
        for &i in &right_cols {
            let name = &other.columns[i];
            if self.has_column(name) {
                columns.push(format!("{}_y", name));
            } else {
                columns.push(name.clone());
            }
        }

        let mut rows = Vec::with_capacity(self.row_count());
        for row in &self.rows {
            match index.get(&row[left_key].key()) {
                Some(matches) if !row[left_key].is_missing() => {
                    for &m in matches {
                        let mut merged = row.clone();
                        merged.extend(right_cols.iter().map(|&i| other.rows[m][i].clone()));
                        rows.push(merged);
                    }
                }
                _ => {
                    let mut merged = row.clone();
                    merged.extend(right_cols.iter().map(|_| Value::Missing));
                    rows.push(merged);
                }
            }
        }

        Table::new(columns, rows)
    }
}
