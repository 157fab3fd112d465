use crate::{
    error::Result,
    sql::{
        engine::Transaction,
        executor::{Executor, ResultSet},
        parser::ast::{self, Expression, OrderDirection},
        schema::Table,
        types::Params,
    },
};

mod planner;

use planner::Planner;

/// Execution plan node
#[derive(Debug, PartialEq)]
pub enum Node {
    CreateTable {
        schema: Table,
    },
    Insert {
        table_name: String,
        /// Target columns; empty means all columns in table order
        columns: Vec<String>,
        values: Vec<Vec<Expression>>,
    },
    Scan {
        table_name: String,
        filter: Option<Expression>,
    },
    NestedLoopJoin {
        left: Box<Node>,
        right: Box<Node>,
        predicate: Option<Expression>,
        /// Keeps unmatched left rows, padded with NULLs
        outer: bool,
    },
    Filter {
        source: Box<Node>,
        predicate: Expression,
    },
    Projection {
        source: Box<Node>,
        exprs: Vec<(Expression, Option<String>)>,
    },
    Distinct {
        source: Box<Node>,
    },
    Order {
        source: Box<Node>,
        order_by: Vec<(Expression, OrderDirection)>,
    },
    Limit {
        source: Box<Node>,
        limit: usize,
    },
    Offset {
        source: Box<Node>,
        offset: usize,
    },
}

/// Execution plan
#[derive(Debug, PartialEq)]
pub struct Plan(pub Node);

impl Plan {
    /// Builds a plan from a statement, substituting bound parameters
    pub fn build(stmt: ast::Statement, params: &Params) -> Result<Self> {
        Planner::new(params).build(stmt)
    }

    pub fn execute<T: Transaction + 'static>(self, txn: &mut T) -> Result<ResultSet> {
        <dyn Executor<T>>::build(self.0).execute(txn)
    }
}
