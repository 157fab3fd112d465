use std::{cmp::Ordering, collections::HashSet};

use crate::{
    error::{Error, Result},
    sql::{
        engine::Transaction,
        executor::{Executor, ResultSet},
        parser::ast::{Expression, OrderDirection, resolve_column},
        types::{Label, Row, Value},
    },
};

/// Table scan executor (SELECT)
pub struct Scan {
    table_name: String,
    filter: Option<Expression>,
}

impl Scan {
    pub fn new(table_name: String, filter: Option<Expression>) -> Box<Self> {
        Box::new(Self { table_name, filter })
    }
}

impl<T: Transaction> Executor<T> for Scan {
    fn execute(self: Box<Self>, txn: &mut T) -> Result<ResultSet> {
        let table = txn.must_get_table(&self.table_name)?;
        let rows = txn.scan_table(&self.table_name, self.filter.as_ref())?;
        Ok(ResultSet::Scan {
            columns: table.labels(),
            rows,
        })
    }
}

/// WHERE executor for sources that cannot filter themselves (joins)
pub struct Filter<T: Transaction> {
    source: Box<dyn Executor<T>>,
    predicate: Expression,
}

impl<T: Transaction> Filter<T> {
    pub fn new(source: Box<dyn Executor<T>>, predicate: Expression) -> Box<Self> {
        Box::new(Self { source, predicate })
    }
}

impl<T: Transaction> Executor<T> for Filter<T> {
    fn execute(self: Box<Self>, txn: &mut T) -> Result<ResultSet> {
        let (columns, rows) = scan_result(self.source.execute(txn)?)?;
        let mut kept = Vec::with_capacity(rows.len());
        for row in rows {
            if matches_predicate(&self.predicate, &columns, &row)? {
                kept.push(row);
            }
        }
        Ok(ResultSet::Scan {
            columns,
            rows: kept,
        })
    }
}

/// Evaluates a predicate; NULL counts as not matching
pub(crate) fn matches_predicate(predicate: &Expression, columns: &[Label], row: &Row) -> Result<bool> {
    match predicate.evaluate(columns, row)? {
        Value::Boolean(b) => Ok(b),
        Value::Null => Ok(false),
        v => Err(Error::Validation(format!(
            "predicate must be boolean, got {}",
            v.type_name()
        ))),
    }
}

/// Column selection executor
pub struct Projection<T: Transaction> {
    source: Box<dyn Executor<T>>,
    exprs: Vec<(Expression, Option<String>)>,
}

impl<T: Transaction> Projection<T> {
    pub fn new(source: Box<dyn Executor<T>>, exprs: Vec<(Expression, Option<String>)>) -> Box<Self> {
        Box::new(Self { source, exprs })
    }
}

impl<T: Transaction> Executor<T> for Projection<T> {
    fn execute(self: Box<Self>, txn: &mut T) -> Result<ResultSet> {
        let (columns, rows) = scan_result(self.source.execute(txn)?)?;

        let mut labels = Vec::with_capacity(self.exprs.len());
        for (i, (expr, alias)) in self.exprs.iter().enumerate() {
            labels.push(match (alias, expr) {
                (Some(alias), _) => Label::new(None, alias),
                (None, Expression::Field(table, name)) => {
                    columns[resolve_column(&columns, table.as_deref(), name)?].clone()
                }
                (None, _) => Label::new(None, &format!("column{}", i + 1)),
            });
        }

        let rows = rows
            .iter()
            .map(|row| {
                self.exprs
                    .iter()
                    .map(|(expr, _)| expr.evaluate(&columns, row))
                    .collect::<Result<Row>>()
            })
            .collect::<Result<Vec<Row>>>()?;
        Ok(ResultSet::Scan {
            columns: labels,
            rows,
        })
    }
}

/// DISTINCT executor - keeps the first occurrence of each row
pub struct Distinct<T: Transaction> {
    source: Box<dyn Executor<T>>,
}

impl<T: Transaction> Distinct<T> {
    pub fn new(source: Box<dyn Executor<T>>) -> Box<Self> {
        Box::new(Self { source })
    }
}

impl<T: Transaction> Executor<T> for Distinct<T> {
    fn execute(self: Box<Self>, txn: &mut T) -> Result<ResultSet> {
        let (columns, rows) = scan_result(self.source.execute(txn)?)?;
        // Value has no Hash (floats), so rows are keyed by their encoding.
        let mut seen = HashSet::new();
        let mut unique = Vec::new();
        for row in rows {
            if seen.insert(bincode::serialize(&row)?) {
                unique.push(row);
            }
        }
        Ok(ResultSet::Scan {
            columns,
            rows: unique,
        })
    }
}

/// ORDER BY executor - sorts rows by the given expressions
pub struct Order<T: Transaction> {
    source: Box<dyn Executor<T>>,
    order_by: Vec<(Expression, OrderDirection)>,
}

impl<T: Transaction> Order<T> {
    pub fn new(
        source: Box<dyn Executor<T>>,
        order_by: Vec<(Expression, OrderDirection)>,
    ) -> Box<Self> {
        Box::new(Self { source, order_by })
    }
}

impl<T: Transaction> Executor<T> for Order<T> {
    fn execute(self: Box<Self>, txn: &mut T) -> Result<ResultSet> {
        let (columns, rows) = scan_result(self.source.execute(txn)?)?;

        // Evaluate sort keys up front so errors surface before sorting.
        let mut keyed = rows
            .into_iter()
            .map(|row| {
                let keys = self
                    .order_by
                    .iter()
                    .map(|(expr, _)| expr.evaluate(&columns, &row))
                    .collect::<Result<Vec<_>>>()?;
                Ok::<_, Error>((keys, row))
            })
            .collect::<Result<Vec<_>>>()?;

        keyed.sort_by(|(a, _), (b, _)| {
            for ((x, y), (_, direction)) in a.iter().zip(b).zip(&self.order_by) {
                match x.sort_cmp(y) {
                    Ordering::Equal => {}
                    o if *direction == OrderDirection::Asc => return o,
                    o => return o.reverse(),
                }
            }
            Ordering::Equal
        });

        Ok(ResultSet::Scan {
            columns,
            rows: keyed.into_iter().map(|(_, row)| row).collect(),
        })
    }
}

/// LIMIT executor - restricts the number of rows returned
pub struct Limit<T: Transaction> {
    source: Box<dyn Executor<T>>,
    limit: usize,
}

impl<T: Transaction> Limit<T> {
    pub fn new(source: Box<dyn Executor<T>>, limit: usize) -> Box<Self> {
        Box::new(Self { source, limit })
    }
}

impl<T: Transaction> Executor<T> for Limit<T> {
    fn execute(self: Box<Self>, txn: &mut T) -> Result<ResultSet> {
        let (columns, rows) = scan_result(self.source.execute(txn)?)?;
        Ok(ResultSet::Scan {
            columns,
            rows: rows.into_iter().take(self.limit).collect(),
        })
    }
}

/// OFFSET executor - skips the first N rows
pub struct Offset<T: Transaction> {
    source: Box<dyn Executor<T>>,
    offset: usize,
}

impl<T: Transaction> Offset<T> {
    pub fn new(source: Box<dyn Executor<T>>, offset: usize) -> Box<Self> {
        Box::new(Self { source, offset })
    }
}

impl<T: Transaction> Executor<T> for Offset<T> {
    fn execute(self: Box<Self>, txn: &mut T) -> Result<ResultSet> {
        let (columns, rows) = scan_result(self.source.execute(txn)?)?;
        Ok(ResultSet::Scan {
            columns,
            rows: rows.into_iter().skip(self.offset).collect(),
        })
    }
}

pub(super) fn scan_result(result: ResultSet) -> Result<(Vec<Label>, Vec<Row>)> {
    result
        .into_rows()
        .ok_or(Error::Internal("Unexpected result set".into()))
}
