use crate::{
    error::{Error, Result},
    sql::{
        parser::ast::{self, Expression},
        plan::{Node, Plan},
        schema::{self, Table},
        types::{Params, Value},
    },
};

/// Query planner - converts AST into execution plan nodes
///
/// Parameters are substituted here, so the executors only ever see
/// constant expressions.
pub struct Planner<'a> {
    params: &'a Params,
}

impl<'a> Planner<'a> {
    pub fn new(params: &'a Params) -> Self {
        Self { params }
    }

    /// Builds an execution plan from an AST statement
    pub fn build(&mut self, stmt: ast::Statement) -> Result<Plan> {
        Ok(Plan(self.build_statement(stmt)?))
    }

    fn build_statement(&self, stmt: ast::Statement) -> Result<Node> {
        Ok(match stmt {
            ast::Statement::CreateTable { name, columns } => Node::CreateTable {
                schema: Table {
                    name,
                    columns: columns
                        .into_iter()
                        .map(|c| {
                            let nullable = c.nullable.unwrap_or(true);
                            let default = match c.default {
                                Some(expr) => Some(self.constant(expr)?),
                                None if nullable => Some(Value::Null),
                                None => None,
                            };
                            Ok::<_, Error>(schema::Column {
                                name: c.name,
                                datatype: c.datatype,
                                nullable,
                                default,
                            })
                        })
                        .collect::<Result<_>>()?,
                },
            },
            ast::Statement::Insert {
                table_name,
                columns,
                values,
            } => Node::Insert {
                table_name,
                columns: columns.unwrap_or_default(),
                values: values
                    .into_iter()
                    .map(|row| row.into_iter().map(|e| e.bind(self.params)).collect::<Result<Vec<_>>>())
                    .collect::<Result<_>>()?,
            },
            ast::Statement::Select {
                distinct,
                select,
                from,
                where_clause,
                order_by,
                limit,
                offset,
            } => {
                let where_clause = self.bind_opt(where_clause)?;

                // A single table scan evaluates the predicate itself; joins
                // get a Filter node above them.
                let mut node = match (from, where_clause) {
                    (ast::FromItem::Table { name }, filter) => Node::Scan {
                        table_name: name,
                        filter,
                    },
                    (from, None) => self.build_from_item(from)?,
                    (from, Some(predicate)) => Node::Filter {
                        source: Box::new(self.build_from_item(from)?),
                        predicate,
                    },
                };

                if !order_by.is_empty() {
                    node = Node::Order {
                        source: Box::new(node),
                        order_by: order_by
                            .into_iter()
                            .map(|(e, dir)| Ok::<_, Error>((e.bind(self.params)?, dir)))
                            .collect::<Result<_>>()?,
                    }
                }

                if !select.is_empty() {
                    node = Node::Projection {
                        source: Box::new(node),
                        exprs: select
                            .into_iter()
                            .map(|(e, alias)| Ok::<_, Error>((e.bind(self.params)?, alias)))
                            .collect::<Result<_>>()?,
                    }
                }

                if distinct {
                    node = Node::Distinct {
                        source: Box::new(node),
                    }
                }

                // OFFSET - must be processed before LIMIT when both are present
                if let Some(expr) = offset {
                    node = Node::Offset {
                        source: Box::new(node),
                        offset: self.count(expr, "OFFSET")?,
                    }
                }

                if let Some(expr) = limit {
                    node = Node::Limit {
                        source: Box::new(node),
                        limit: self.count(expr, "LIMIT")?,
                    }
                }

                node
            }
        })
    }

    fn build_from_item(&self, item: ast::FromItem) -> Result<Node> {
        Ok(match item {
            ast::FromItem::Table { name } => Node::Scan {
                table_name: name,
                filter: None,
            },
            ast::FromItem::Join {
                left,
                right,
                join_type,
                predicate,
            } => Node::NestedLoopJoin {
                // Recursively build join nodes (base case: single table)
                left: Box::new(self.build_from_item(*left)?),
                right: Box::new(self.build_from_item(*right)?),
                predicate: self.bind_opt(predicate)?,
                outer: join_type == ast::JoinType::Left,
            },
        })
    }

    fn bind_opt(&self, expr: Option<Expression>) -> Result<Option<Expression>> {
        expr.map(|e| e.bind(self.params)).transpose()
    }

    /// Evaluates a row-independent expression, e.g. a column default
    fn constant(&self, expr: Expression) -> Result<Value> {
        expr.bind(self.params)?.evaluate(&[], &Vec::new())
    }

    fn count(&self, expr: Expression, clause: &str) -> Result<usize> {
        match self.constant(expr)? {
            Value::Integer(i) if i >= 0 => Ok(i as usize),
            v => Err(Error::Validation(format!(
                "{} expects a non-negative integer, got {}",
                clause, v
            ))),
        }
    }
}
