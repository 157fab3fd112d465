use crate::{
    error::Result,
    sql::{
        engine::Transaction,
        executor::{
            join::NestedLoopJoin,
            mutation::Insert,
            query::{Distinct, Filter, Limit, Offset, Order, Projection, Scan},
            schema::CreateTable,
        },
        plan::Node,
        types::{Label, Row},
    },
};

mod join;
mod mutation;
mod query;
mod schema;

pub(crate) use query::matches_predicate;

/// SQL executor trait
pub trait Executor<T: Transaction> {
    fn execute(self: Box<Self>, txn: &mut T) -> Result<ResultSet>;
}

/// Builds an executor from a plan node
///
/// The `'static` bound is required for trait object usage in recursive executor building.
impl<T: Transaction + 'static> dyn Executor<T> {
    pub fn build(node: Node) -> Box<dyn Executor<T>> {
        match node {
            Node::CreateTable { schema } => CreateTable::new(schema),
            Node::Insert {
                table_name,
                columns,
                values,
            } => Insert::new(table_name, columns, values),
            Node::Scan { table_name, filter } => Scan::new(table_name, filter),
            Node::NestedLoopJoin {
                left,
                right,
                predicate,
                outer,
            } => NestedLoopJoin::new(Self::build(*left), Self::build(*right), predicate, outer),
            Node::Filter { source, predicate } => Filter::new(Self::build(*source), predicate),
            Node::Projection { source, exprs } => Projection::new(Self::build(*source), exprs),
            Node::Distinct { source } => Distinct::new(Self::build(*source)),
            Node::Order { source, order_by } => Order::new(Self::build(*source), order_by),
            Node::Limit { source, limit } => Limit::new(Self::build(*source), limit),
            Node::Offset { source, offset } => Offset::new(Self::build(*source), offset),
        }
    }
}

/// Execution result set
#[derive(Debug, PartialEq)]
pub enum ResultSet {
    CreateTable { table_name: String },
    Insert { count: usize },
    Scan { columns: Vec<Label>, rows: Vec<Row> },
}

impl ResultSet {
    /// Column labels and rows of a query result
    pub fn into_rows(self) -> Option<(Vec<Label>, Vec<Row>)> {
        match self {
            ResultSet::Scan { columns, rows } => Some((columns, rows)),
            _ => None,
        }
    }
}
