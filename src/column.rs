use allocative::Allocative;
use bitvec::prelude::*;

/// A named, ordered sequence of integers: one entry per table row.
///
/// Columns are the single source of truth for table data. Rows are only ever
/// derived from them.
#[derive(Debug, Clone, PartialEq, Eq, Allocative)]
pub struct Column {
    /// The name of the column. Unique within its table.
    pub name: String,
    /// The values, in row order.
    data: Vec<i64>,
}

impl Column {
    /// Creates a new, empty column with the specified name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: Vec::new(),
        }
    }

    /// Creates a column holding `data`.
    ///
    /// # Example
    /// ```
    /// # use relq::Column;
    /// let col = Column::from_values("age", vec![30, 25]);
    /// assert_eq!(col.len(), 2);
    /// assert_eq!(col.get(1), Some(25));
    /// ```
    pub fn from_values(name: impl Into<String>, data: Vec<i64>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// Appends a value at the end of the column.
    pub fn push(&mut self, value: i64) {
        self.data.push(value);
    }

    /// Returns the number of rows currently stored in the column.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if there is no row in the column, else false.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Retrieves the value at the specified row index, or `None` if it is out of bounds.
    pub fn get(&self, row_idx: usize) -> Option<i64> {
        self.data.get(row_idx).copied()
    }

    pub fn values(&self) -> &[i64] {
        &self.data
    }

    pub fn into_values(self) -> Vec<i64> {
        self.data
    }

    /// Keeps the rows whose bit is set in `mask`, preserving their relative order.
    ///
    /// `mask` must be exactly as long as the column.
    pub fn filter(&self, mask: &BitSlice) -> Self {
        debug_assert_eq!(mask.len(), self.len());
        let data = mask.iter_ones().map(|idx| self.data[idx]).collect();
        Self {
            name: self.name.clone(),
            data,
        }
    }

    /// Builds a new column by gathering rows in the order given by `indices`.
    ///
    /// Every index must be in bounds.
    pub fn take(&self, indices: &[usize]) -> Self {
        Self {
            name: self.name.clone(),
            data: indices.iter().map(|&idx| self.data[idx]).collect(),
        }
    }
}
