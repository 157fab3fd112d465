use crate::{
    error::Result,
    sql::{
        engine::Transaction,
        executor::{Executor, ResultSet, query::scan_result},
        parser::ast::Expression,
        types::Value,
    },
};

use super::matches_predicate;

/// Nested Loop Join executor
///
/// Without a predicate this is the Cartesian product of both sides. With
/// `outer` set, left rows matching nothing are kept and padded with NULLs.
pub struct NestedLoopJoin<T: Transaction> {
    left: Box<dyn Executor<T>>,
    right: Box<dyn Executor<T>>,
    predicate: Option<Expression>,
    outer: bool,
}

impl<T: Transaction> NestedLoopJoin<T> {
    pub fn new(
        left: Box<dyn Executor<T>>,
        right: Box<dyn Executor<T>>,
        predicate: Option<Expression>,
        outer: bool,
    ) -> Box<Self> {
        Box::new(Self {
            left,
            right,
            predicate,
            outer,
        })
    }
}

impl<T: Transaction> Executor<T> for NestedLoopJoin<T> {
    fn execute(self: Box<Self>, txn: &mut T) -> Result<ResultSet> {
        let (lcols, lrows) = scan_result(self.left.execute(txn)?)?;
        let (rcols, rrows) = scan_result(self.right.execute(txn)?)?;

        // Labels stay qualified by table, so `book.owner` and `person.name`
        // resolve against the combined row.
        let mut columns = lcols;
        let rwidth = rcols.len();
        columns.extend(rcols);

        let mut rows = Vec::new();
        for lrow in &lrows {
            let mut matched = false;
            for rrow in &rrows {
                let mut row = lrow.clone();
                row.extend(rrow.iter().cloned());
                let keep = match &self.predicate {
                    Some(predicate) => matches_predicate(predicate, &columns, &row)?,
                    None => true,
                };
                if keep {
                    rows.push(row);
                    matched = true;
                }
            }

            if self.outer && !matched {
                let mut row = lrow.clone();
                row.extend(std::iter::repeat_n(Value::Null, rwidth));
                rows.push(row);
            }
        }

        Ok(ResultSet::Scan { columns, rows })
    }
}
