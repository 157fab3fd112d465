use std::collections::HashMap;

use tracing::trace;

use crate::{
    error::{Error, Result},
    sql::{
        engine::Transaction,
        executor::{Executor, ResultSet},
        parser::ast::Expression,
        schema::Table,
        types::{Row, Value},
    },
};

/// INSERT executor
pub struct Insert {
    table_name: String,
    columns: Vec<String>,
    values: Vec<Vec<Expression>>,
}

impl Insert {
    pub fn new(table_name: String, columns: Vec<String>, values: Vec<Vec<Expression>>) -> Box<Self> {
        Box::new(Self {
            table_name,
            columns,
            values,
        })
    }
}

/// Fills the trailing columns a positional insert left out with their defaults
///
/// ```text
/// insert into tbl values (1, 2, 3);
///   a   b   c   d
///   1   2   3   <default>
/// ```
fn pad_row(table: &Table, row: Row) -> Result<Row> {
    let mut results = row;
    for column in table.columns.iter().skip(results.len()) {
        match &column.default {
            Some(default) => results.push(default.clone()),
            None => {
                return Err(Error::Validation(format!(
                    "no value given for column {}",
                    column.name
                )));
            }
        }
    }
    Ok(results)
}

/// Arranges values given for named columns into table order
///
/// ```text
/// insert into tbl (d, c) values (1, 2);
///   a           b           c   d
///   <default>   <default>   2   1
/// ```
fn make_row(table: &Table, columns: &[String], values: Row) -> Result<Row> {
    if columns.len() != values.len() {
        return Err(Error::Validation(format!(
            "{} columns given but {} values",
            columns.len(),
            values.len()
        )));
    }

    let mut inputs = HashMap::new();
    for (col_name, value) in columns.iter().zip(values) {
        table.get_col_index(col_name)?;
        inputs.insert(col_name.as_str(), value);
    }

    table
        .columns
        .iter()
        .map(|col| match inputs.remove(col.name.as_str()) {
            Some(value) => Ok(value),
            None => col.default.clone().ok_or(Error::Validation(format!(
                "no value given for column {}",
                col.name
            ))),
        })
        .collect()
}

impl<T: Transaction> Executor<T> for Insert {
    fn execute(self: Box<Self>, txn: &mut T) -> Result<ResultSet> {
        let table = txn.must_get_table(&self.table_name)?;
        let mut count = 0;
        for exprs in self.values {
            let row = exprs
                .iter()
                .map(|e| e.evaluate(&[], &Vec::new()))
                .collect::<Result<Vec<Value>>>()?;

            let insert_row = if self.columns.is_empty() {
                pad_row(&table, row)?
            } else {
                make_row(&table, &self.columns, row)?
            };

            trace!(table = %self.table_name, row = ?insert_row, "insert row");
            txn.create_row(&self.table_name, insert_row)?;
            count += 1;
        }
        Ok(ResultSet::Insert { count })
    }
}
