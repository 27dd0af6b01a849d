//! Relational and aggregate operators.
//!
//! Every operator reads one or two source tables and builds a brand new
//! [Table]; sources are never mutated. All validation happens before the result
//! is assembled, so a failing operator produces no table at all.

use std::collections::HashMap;

use bitvec::prelude::*;
use tracing::debug;

use crate::ast::{AggregateMode, Condition, Operand};
use crate::column::Column;
use crate::error::{Error, Result};
use crate::table::Table;

fn overflow(what: &str) -> Error {
    Error::Precondition(format!("integer overflow while computing {what}"))
}

/// Sums in `i128` so only a total outside the `i64` range is an overflow.
fn checked_sum(values: impl IntoIterator<Item = i64>, what: &str) -> Result<i64> {
    let total: i128 = values.into_iter().map(i128::from).sum();
    i64::try_from(total).map_err(|_| overflow(what))
}

/// Reduces `sum` over `count` values according to `mode`; averages truncate toward zero.
fn reduce(mode: AggregateMode, sum: i64, count: usize, what: &str) -> Result<i64> {
    match mode {
        AggregateMode::Sum => Ok(sum),
        AggregateMode::Avg => {
            if count == 0 {
                return Err(Error::DivisionByZero(format!("{what} over zero rows")));
            }
            let count = i64::try_from(count).map_err(|_| overflow(what))?;
            sum.checked_div(count).ok_or_else(|| overflow(what))
        }
    }
}

/// Keeps only `columns`, in the order given, with every row of the source.
///
/// # Errors
/// Fails on the first unknown column name; no partial table is returned.
pub fn project(source: &Table, target: &str, columns: &[String]) -> Result<Table> {
    let picked = columns
        .iter()
        .map(|name| source.column(name).cloned())
        .collect::<Result<Vec<_>>>()?;
    Table::from_columns(target, picked)
}

/// An operand bound to a table: either a constant or a column's values.
enum Bound<'a> {
    Literal(i64),
    Values(&'a [i64]),
}

impl Bound<'_> {
    fn at(&self, row: usize) -> i64 {
        match self {
            Self::Literal(value) => *value,
            Self::Values(values) => values[row],
        }
    }
}

fn bind<'a>(source: &'a Table, operand: &Operand) -> Result<Bound<'a>> {
    match operand {
        Operand::Literal(value) => Ok(Bound::Literal(*value)),
        Operand::Column(column) => match &column.table {
            Some(qualifier) if *qualifier != source.name => {
                Err(Error::column_not_found(&source.name, &column.to_string()))
            }
            _ => Ok(Bound::Values(source.column(&column.column)?.values())),
        },
    }
}

/// Keeps the rows for which `condition` holds, in their original order.
///
/// Each operand is either an integer literal or a column of `source` (optionally
/// qualified by the source's own name).
pub fn select(source: &Table, target: &str, condition: &Condition) -> Result<Table> {
    let left = bind(source, &condition.left)?;
    let right = bind(source, &condition.right)?;

    let rows = source.row_count();
    let mut mask = BitVec::<usize, Lsb0>::with_capacity(rows);
    for row in 0..rows {
        mask.push(condition.op.apply(left.at(row), right.at(row)));
    }

    debug!(
        table = %source.name,
        %condition,
        kept = mask.count_ones(),
        of = rows,
        "select"
    );
    Ok(source.filter(target, &mask))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

impl Side {
    fn flip(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

enum JoinOperand<'a> {
    Literal(i64),
    Left(&'a [i64]),
    Right(&'a [i64]),
}

impl JoinOperand<'_> {
    fn at(&self, i: usize, j: usize) -> i64 {
        match self {
            Self::Literal(value) => *value,
            Self::Left(values) => values[i],
            Self::Right(values) => values[j],
        }
    }
}

/// Resolves a join operand to one of the two tables.
///
/// A qualifier naming exactly one of the tables picks it. An unqualified operand,
/// or a qualifier naming both tables (a self-join), uses `default` when the column
/// exists there and the other table otherwise.
fn bind_join<'a>(
    operand: &Operand,
    left: &'a Table,
    right: &'a Table,
    default: Side,
) -> Result<JoinOperand<'a>> {
    let column = match operand {
        Operand::Literal(value) => return Ok(JoinOperand::Literal(*value)),
        Operand::Column(column) => column,
    };

    let side = match column.table.as_deref() {
        Some(q) if q == left.name && q != right.name => Side::Left,
        Some(q) if q == right.name && q != left.name => Side::Right,
        Some(q) if q != left.name => return Err(Error::TableNotFound(q.to_string())),
        _ => {
            let (preferred, other) = match default {
                Side::Left => (left, right),
                Side::Right => (right, left),
            };
            if preferred.get_col(&column.column).is_none()
                && other.get_col(&column.column).is_some()
            {
                default.flip()
            } else {
                default
            }
        }
    };

    Ok(match side {
        Side::Left => JoinOperand::Left(left.column(&column.column)?.values()),
        Side::Right => JoinOperand::Right(right.column(&column.column)?.values()),
    })
}

/// Nested-loop join.
///
/// Every row `i` of `left` is compared with every row `j` of `right`; matching pairs
/// are emitted in `(i, j)` order with `left`'s columns first. Output columns are
/// named `<table>_<column>`. This is O(n·m) and meant for small tables.
///
/// # Errors
/// Fails if a referenced column is missing, or if the prefixed names collide
/// (e.g. joining a table with itself).
pub fn join(left: &Table, right: &Table, target: &str, condition: &Condition) -> Result<Table> {
    let lhs = bind_join(&condition.left, left, right, Side::Left)?;
    let rhs = bind_join(&condition.right, left, right, Side::Right)?;

    let mut left_rows = Vec::new();
    let mut right_rows = Vec::new();
    for i in 0..left.row_count() {
        for j in 0..right.row_count() {
            if condition.op.apply(lhs.at(i, j), rhs.at(i, j)) {
                left_rows.push(i);
                right_rows.push(j);
            }
        }
    }

    debug!(
        left = %left.name,
        right = %right.name,
        %condition,
        matches = left_rows.len(),
        "join"
    );

    let prefixed = |table: &Table, col: &Column, rows: &[usize]| {
        Column::from_values(
            format!("{}_{}", table.name, col.name),
            col.take(rows).into_values(),
        )
    };
    let columns = left
        .columns()
        .iter()
        .map(|col| prefixed(left, col, &left_rows))
        .chain(
            right
                .columns()
                .iter()
                .map(|col| prefixed(right, col, &right_rows)),
        )
        .collect();
    Table::from_columns(target, columns)
}

/// Sorts rows by `column` in ascending order.
///
/// Uses extraction of the minimum: the earliest remaining row holding the smallest
/// key is moved to the output each round, which makes the sort stable. O(n²).
pub fn sort(source: &Table, target: &str, column: &str) -> Result<Table> {
    let keys = source.column(column)?.values();

    let mut remaining: Vec<usize> = (0..keys.len()).collect();
    let mut order = Vec::with_capacity(keys.len());
    while !remaining.is_empty() {
        let mut min = 0;
        for (pos, &row) in remaining.iter().enumerate() {
            if keys[row] < keys[remaining[min]] {
                min = pos;
            }
        }
        order.push(remaining.remove(min));
    }

    Ok(source.take(target, &order))
}

/// Appends the rows of `right` after those of `left`.
///
/// # Errors
/// Both tables must have the same column names in the same order.
pub fn concat(left: &Table, right: &Table, target: &str) -> Result<Table> {
    if left.column_names() != right.column_names() {
        return Err(Error::Precondition(format!(
            "cannot concat {:?} ({}) with {:?} ({}): columns differ",
            left.name,
            left.column_names().join(","),
            right.name,
            right.column_names().join(","),
        )));
    }

    let columns = left
        .columns()
        .iter()
        .zip(right.columns())
        .map(|(top, bottom)| {
            let mut values = top.values().to_vec();
            values.extend_from_slice(bottom.values());
            Column::from_values(top.name.clone(), values)
        })
        .collect();
    Table::from_columns(target, columns)
}

/// Reduces a column to a single value in a one-row table whose only column is
/// named `<mode>(<column>)`.
///
/// # Errors
/// Averaging an empty column is a division by zero.
pub fn aggregate(
    source: &Table,
    target: &str,
    column: &str,
    mode: AggregateMode,
) -> Result<Table> {
    let values = source.column(column)?.values();
    let name = mode.column_name(column);

    let sum = checked_sum(values.iter().copied(), &name)?;
    let value = reduce(mode, sum, values.len(), &name)?;

    Table::from_columns(target, vec![Column::from_values(name, vec![value])])
}

/// Groups rows by the tuple of `group_by` values and reduces `column` per group.
///
/// Groups appear in the order their key is first seen. The output holds the
/// group-by columns followed by `<mode>(<column>)`.
pub fn group_aggregate(
    source: &Table,
    target: &str,
    column: &str,
    group_by: &[String],
    mode: AggregateMode,
) -> Result<Table> {
    let values = source.column(column)?.values();
    let keys = group_by
        .iter()
        .map(|name| source.column(name).map(Column::values))
        .collect::<Result<Vec<_>>>()?;

    let mut index: HashMap<Vec<i64>, usize> = HashMap::new();
    let mut groups: Vec<(Vec<i64>, Vec<usize>)> = Vec::new();
    for row in 0..source.row_count() {
        let key: Vec<i64> = keys.iter().map(|col| col[row]).collect();
        match index.get(&key) {
            Some(&group) => groups[group].1.push(row),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push((key, vec![row]));
            }
        }
    }

    let name = mode.column_name(column);
    let mut key_columns: Vec<Column> = group_by.iter().map(Column::new).collect();
    let mut result = Column::new(name.clone());
    for (key, rows) in &groups {
        for (col, value) in key_columns.iter_mut().zip(key) {
            col.push(*value);
        }
        let sum = checked_sum(rows.iter().map(|&row| values[row]), &name)?;
        result.push(reduce(mode, sum, rows.len(), &name)?);
    }

    debug!(table = %source.name, groups = groups.len(), "{name}");

    key_columns.push(result);
    Table::from_columns(target, key_columns)
}

/// Trailing moving sum or average over at most `window` rows.
///
/// For row `i` the window covers rows `max(0, i - window + 1)..=i`; near the top
/// of the table the window is shorter and the average divides by its actual
/// length. The result is a copy of `source` where `column` holds the moving
/// values under its original name.
pub fn moving_aggregate(
    source: &Table,
    target: &str,
    column: &str,
    window: usize,
    mode: AggregateMode,
) -> Result<Table> {
    if window == 0 {
        return Err(Error::Argument("window length must be at least 1".into()));
    }
    let values = source.column(column)?.values();
    let what = format!("mov{}({column})", mode.name());

    let mut moving = Vec::with_capacity(values.len());
    // i128 keeps the intermediate add/subtract from overflowing on valid windows
    let mut running = 0i128;
    for (i, &value) in values.iter().enumerate() {
        if i >= window {
            running -= i128::from(values[i - window]);
        }
        running += i128::from(value);
        let sum = i64::try_from(running).map_err(|_| overflow(&what))?;
        let len = (i + 1).min(window);
        moving.push(reduce(mode, sum, len, &what)?);
    }

    let columns = source
        .columns()
        .iter()
        .map(|col| {
            if col.name == column {
                Column::from_values(col.name.clone(), moving.clone())
            } else {
                col.clone()
            }
        })
        .collect();
    Table::from_columns(target, columns)
}
