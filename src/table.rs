use std::collections::HashSet;
use std::fmt;

use allocative::Allocative;
use bitvec::prelude::*;

use crate::column::Column;
use crate::error::{Error, Result};

/// A named table of integer columns.
///
/// The column-oriented storage is the only representation kept in memory; the
/// row-oriented view is computed from it on demand ([Table::rows],
/// [Table::get_row]), so the two views can never disagree. Every constructor
/// checks that column names are unique and that all columns have the same
/// length.
#[derive(Debug, Clone, PartialEq, Eq, Allocative)]
pub struct Table {
    pub name: String,
    columns: Vec<Column>,
}

impl Table {
    /// Creates an empty table with no columns.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Builds a table from already materialised columns.
    ///
    /// # Errors
    /// Returns [Error::Precondition] if two columns share a name or if the columns
    /// have different lengths.
    pub fn from_columns(name: impl Into<String>, columns: Vec<Column>) -> Result<Self> {
        let mut table = Self::new(name);
        for column in columns {
            table.add_column(column)?;
        }
        Ok(table)
    }

    /// Builds a table from a header and a list of rows, transposing the rows into
    /// columns.
    ///
    /// # Errors
    /// Returns [Error::Precondition] if a row's width differs from the header's or
    /// if the header contains a duplicate name.
    ///
    /// # Example
    /// ```
    /// # use relq::Table;
    /// let table = Table::from_rows("t", vec!["a".into(), "b".into()], vec![vec![1, 2], vec![3, 4]]).unwrap();
    /// assert_eq!(table.get_col("b").unwrap().values(), &[2, 4]);
    /// assert_eq!(table.rows(), vec![vec![1, 2], vec![3, 4]]);
    /// ```
    pub fn from_rows(
        name: impl Into<String>,
        column_names: Vec<String>,
        rows: Vec<Vec<i64>>,
    ) -> Result<Self> {
        let width = column_names.len();
        let mut data: Vec<Vec<i64>> = (0..width).map(|_| Vec::with_capacity(rows.len())).collect();

        for (row_idx, row) in rows.into_iter().enumerate() {
            if row.len() != width {
                return Err(Error::Precondition(format!(
                    "row {row_idx} has {} value(s) while the table has {width} column(s)",
                    row.len()
                )));
            }
            for (column, value) in data.iter_mut().zip(row) {
                column.push(value);
            }
        }

        let columns = column_names
            .into_iter()
            .zip(data)
            .map(|(name, values)| Column::from_values(name, values))
            .collect();
        Self::from_columns(name, columns)
    }

    /// Appends a column at the end of the table.
    ///
    /// # Errors
    /// Returns an error if the name is already used in this table or if the column
    /// length differs from the current row count.
    pub fn add_column(&mut self, column: Column) -> Result<()> {
        if self.get_col(&column.name).is_some() {
            return Err(Error::Precondition(format!(
                "duplicate column {:?} in table {:?}",
                column.name, self.name
            )));
        }
        if !self.columns.is_empty() && column.len() != self.row_count() {
            return Err(Error::Precondition(format!(
                "column {:?} has {} row(s) while table {:?} has {}",
                column.name,
                column.len(),
                self.name,
                self.row_count()
            )));
        }
        self.columns.push(column);
        Ok(())
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column names in display/export order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|col| col.name.as_str()).collect()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    pub fn get_col(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|col| col.name == name)
    }

    /// Looks a column up by name, reporting a reference error when it is missing.
    pub fn column(&self, name: &str) -> Result<&Column> {
        self.get_col(name)
            .ok_or_else(|| Error::column_not_found(&self.name, name))
    }

    pub fn get_row(&self, row_idx: usize) -> Option<Vec<i64>> {
        if self.row_count() <= row_idx {
            return None;
        }
        self.columns.iter().map(|col| col.get(row_idx)).collect()
    }

    /// The row-oriented view: `rows()[i][j]` is the `i`-th value of the `j`-th column.
    pub fn rows(&self) -> Vec<Vec<i64>> {
        (0..self.row_count())
            .map(|i| self.columns.iter().map(|col| col.values()[i]).collect())
            .collect()
    }

    /// Returns a copy of the table under another name.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: self.columns.clone(),
        }
    }

    /// Keeps the rows whose bit is set in `mask`, preserving row order.
    pub fn filter(&self, name: impl Into<String>, mask: &BitSlice) -> Self {
        Self {
            name: name.into(),
            columns: self.columns.iter().map(|col| col.filter(mask)).collect(),
        }
    }

    /// Reorders (or repeats) rows following `indices`.
    pub fn take(&self, name: impl Into<String>, indices: &[usize]) -> Self {
        Self {
            name: name.into(),
            columns: self.columns.iter().map(|col| col.take(indices)).collect(),
        }
    }

    /// Returns true if every column has the same length and names are unique.
    pub fn is_consistent(&self) -> bool {
        let rows = self.row_count();
        let mut names = HashSet::new();
        self.columns
            .iter()
            .all(|col| col.len() == rows && names.insert(col.name.as_str()))
    }
}

/// Renders the header then one line per row, fields joined by `|`.
impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.column_names().join("|"))?;
        for row in self.rows() {
            let line: Vec<String> = row.iter().map(i64::to_string).collect();
            writeln!(f, "{}", line.join("|"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people() -> Table {
        Table::from_rows(
            "people",
            vec!["id".into(), "age".into()],
            vec![vec![1, 30], vec![2, 17], vec![3, 25]],
        )
        .unwrap()
    }

    #[test]
    fn test_table_creation() {
        let table = Table::new("users");
        assert_eq!(table.column_count(), 0);
        assert_eq!(table.row_count(), 0);
        assert!(table.is_empty());
    }

    #[test]
    fn test_from_rows_and_views_agree() {
        let table = people();

        assert_eq!(table.row_count(), 3);
        assert_eq!(table.column_names(), vec!["id", "age"]);
        assert_eq!(table.get_col("age").unwrap().values(), &[30, 17, 25]);

        let rows = table.rows();
        for (i, row) in rows.iter().enumerate() {
            for (j, col) in table.columns().iter().enumerate() {
                assert_eq!(row[j], col.values()[i]);
            }
        }
        assert!(table.is_consistent());
    }

    #[test]
    fn test_get_row() {
        let table = people();

        assert_eq!(table.get_row(0), Some(vec![1, 30]));
        assert_eq!(table.get_row(2), Some(vec![3, 25]));
        assert_eq!(table.get_row(3), None);
    }

    #[test]
    fn test_row_width_mismatch() {
        let result = Table::from_rows(
            "bad",
            vec!["a".into(), "b".into()],
            vec![vec![1, 2], vec![3]],
        );
        assert!(matches!(result, Err(Error::Precondition(_))));
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let result = Table::from_columns(
            "dup",
            vec![
                Column::from_values("a", vec![1]),
                Column::from_values("a", vec![2]),
            ],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_column_length_mismatch() {
        let mut table = Table::new("t");
        table.add_column(Column::from_values("a", vec![1, 2])).unwrap();

        let result = table.add_column(Column::from_values("b", vec![1]));
        assert!(result.is_err());
        assert_eq!(table.column_count(), 1);
    }

    #[test]
    fn test_column_lookup_error() {
        let table = people();

        assert!(table.get_col("id").is_some());
        assert!(table.get_col("name").is_none());
        assert!(matches!(
            table.column("name"),
            Err(Error::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn test_filter_and_take() {
        let table = people();

        let adults = table.filter("adults", bits![1, 0, 1]);
        assert_eq!(adults.name, "adults");
        assert_eq!(adults.rows(), vec![vec![1, 30], vec![3, 25]]);

        let reordered = table.take("r", &[2, 0]);
        assert_eq!(reordered.rows(), vec![vec![3, 25], vec![1, 30]]);
    }

    #[test]
    fn test_display() {
        let table = Table::from_rows(
            "t",
            vec!["a".into(), "b".into()],
            vec![vec![1, 2], vec![3, 4]],
        )
        .unwrap();

        assert_eq!(table.to_string(), "a|b\n1|2\n3|4\n");
    }
}
