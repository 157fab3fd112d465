use std::cmp::Ordering;

use crate::{
    error::{Error, Result},
    sql::types::{DataType, Label, Params, Row, Value},
};

/// Abstract Syntax Tree (AST) node definitions for SQL statements
#[derive(Debug, PartialEq)]
pub enum Statement {
    CreateTable {
        name: String,
        columns: Vec<Column>,
    },
    Insert {
        table_name: String,
        columns: Option<Vec<String>>,
        values: Vec<Vec<Expression>>,
    },
    Select {
        distinct: bool,
        /// Column expressions with optional aliases; empty means `*`
        select: Vec<(Expression, Option<String>)>,
        from: FromItem,
        where_clause: Option<Expression>,
        order_by: Vec<(Expression, OrderDirection)>,
        limit: Option<Expression>,
        offset: Option<Expression>,
    },
}

/// FROM clause item - a table or a join of two items
#[derive(Debug, PartialEq)]
pub enum FromItem {
    Table {
        name: String,
    },
    Join {
        left: Box<FromItem>,
        right: Box<FromItem>,
        join_type: JoinType,
        /// ON condition (None for CROSS JOIN)
        predicate: Option<Expression>,
    },
}

#[derive(Debug, PartialEq)]
pub enum JoinType {
    Cross,
    Inner,
    Left,
}

#[derive(Debug, PartialEq)]
pub enum OrderDirection {
    Asc,
    Desc,
}

/// Column definition for CREATE TABLE statements
#[derive(Debug, PartialEq)]
pub struct Column {
    pub name: String,
    pub datatype: DataType,
    pub nullable: Option<bool>,
    pub default: Option<Expression>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Expression {
    /// Column reference, optionally qualified by table name
    Field(Option<String>, String),
    Consts(Consts),
    /// Named placeholder, e.g. `:cutoff`
    Param(String),
    Operation(Operation),
}

impl From<Consts> for Expression {
    fn from(value: Consts) -> Self {
        Self::Consts(value)
    }
}

impl From<Operation> for Expression {
    fn from(value: Operation) -> Self {
        Self::Operation(value)
    }
}

impl From<Value> for Expression {
    fn from(value: Value) -> Self {
        Self::Consts(match value {
            Value::Null => Consts::Null,
            Value::Boolean(b) => Consts::Boolean(b),
            Value::Integer(i) => Consts::Integer(i),
            Value::Float(f) => Consts::Float(f),
            Value::String(s) => Consts::String(s),
        })
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum Consts {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

#[derive(Debug, PartialEq, Clone)]
pub enum Operation {
    And(Box<Expression>, Box<Expression>),
    Or(Box<Expression>, Box<Expression>),
    Not(Box<Expression>),
    Negate(Box<Expression>),
    Equal(Box<Expression>, Box<Expression>),
    NotEqual(Box<Expression>, Box<Expression>),
    GreaterThan(Box<Expression>, Box<Expression>),
    GreaterThanOrEqual(Box<Expression>, Box<Expression>),
    LessThan(Box<Expression>, Box<Expression>),
    LessThanOrEqual(Box<Expression>, Box<Expression>),
}

impl Expression {
    /// Replaces every `:param` with its bound value
    pub fn bind(self, params: &Params) -> Result<Expression> {
        use Operation::*;
        let bind = |e: Box<Expression>| (*e).bind(params).map(Box::new);
        Ok(match self {
            Expression::Param(name) => match params.get(&name) {
                Some(value) => value.clone().into(),
                None => {
                    return Err(Error::Parse(format!(
                        "[Binder] No value bound for parameter :{}",
                        name
                    )));
                }
            },
            Expression::Operation(op) => Expression::Operation(match op {
                And(l, r) => And(bind(l)?, bind(r)?),
                Or(l, r) => Or(bind(l)?, bind(r)?),
                Not(e) => Not(bind(e)?),
                Negate(e) => Negate(bind(e)?),
                Equal(l, r) => Equal(bind(l)?, bind(r)?),
                NotEqual(l, r) => NotEqual(bind(l)?, bind(r)?),
                GreaterThan(l, r) => GreaterThan(bind(l)?, bind(r)?),
                GreaterThanOrEqual(l, r) => GreaterThanOrEqual(bind(l)?, bind(r)?),
                LessThan(l, r) => LessThan(bind(l)?, bind(r)?),
                LessThanOrEqual(l, r) => LessThanOrEqual(bind(l)?, bind(r)?),
            }),
            expr => expr,
        })
    }

    /// Evaluates the expression against a row described by `columns`
    pub fn evaluate(&self, columns: &[Label], row: &Row) -> Result<Value> {
        use Operation::*;
        Ok(match self {
            Expression::Consts(_) => Value::from_expression(self.clone())?,
            Expression::Field(table, name) => {
                row[resolve_column(columns, table.as_deref(), name)?].clone()
            }
            Expression::Param(name) => {
                return Err(Error::Internal(format!("unbound parameter :{}", name)));
            }
            Expression::Operation(op) => match op {
                And(l, r) => match (l.evaluate(columns, row)?, r.evaluate(columns, row)?) {
                    (Value::Boolean(false), _) | (_, Value::Boolean(false)) => Value::Boolean(false),
                    (Value::Boolean(true), Value::Boolean(true)) => Value::Boolean(true),
                    (Value::Boolean(_) | Value::Null, Value::Boolean(_) | Value::Null) => Value::Null,
                    (l, r) => return Err(not_boolean("AND", &l, &r)),
                },
                Or(l, r) => match (l.evaluate(columns, row)?, r.evaluate(columns, row)?) {
                    (Value::Boolean(true), _) | (_, Value::Boolean(true)) => Value::Boolean(true),
                    (Value::Boolean(false), Value::Boolean(false)) => Value::Boolean(false),
                    (Value::Boolean(_) | Value::Null, Value::Boolean(_) | Value::Null) => Value::Null,
                    (l, r) => return Err(not_boolean("OR", &l, &r)),
                },
                Not(e) => match e.evaluate(columns, row)? {
                    Value::Boolean(b) => Value::Boolean(!b),
                    Value::Null => Value::Null,
                    v => return Err(not_boolean("NOT", &v, &Value::Null)),
                },
                Negate(e) => match e.evaluate(columns, row)? {
                    Value::Integer(i) => Value::Integer(
                        i.checked_neg()
                            .ok_or(Error::Validation("integer overflow".into()))?,
                    ),
                    Value::Float(f) => Value::Float(-f),
                    Value::Null => Value::Null,
                    v => {
                        return Err(Error::Validation(format!("cannot negate {}", v.type_name())));
                    }
                },
                Equal(l, r) => compare(columns, row, l, r, |o| o == Ordering::Equal)?,
                NotEqual(l, r) => compare(columns, row, l, r, |o| o != Ordering::Equal)?,
                GreaterThan(l, r) => compare(columns, row, l, r, |o| o == Ordering::Greater)?,
                GreaterThanOrEqual(l, r) => compare(columns, row, l, r, |o| o != Ordering::Less)?,
                LessThan(l, r) => compare(columns, row, l, r, |o| o == Ordering::Less)?,
                LessThanOrEqual(l, r) => compare(columns, row, l, r, |o| o != Ordering::Greater)?,
            },
        })
    }
}

/// Finds the position of a column. Unqualified names must be unambiguous.
pub fn resolve_column(columns: &[Label], table: Option<&str>, name: &str) -> Result<usize> {
    let mut matches = columns.iter().enumerate().filter(|(_, label)| {
        label.name == name && table.is_none_or(|t| label.table.as_deref() == Some(t))
    });
    let display = match table {
        Some(t) => format!("{}.{}", t, name),
        None => name.to_string(),
    };
    match (matches.next(), matches.next()) {
        (Some((i, _)), None) => Ok(i),
        (Some(_), Some(_)) => Err(Error::Schema(format!("column {} is ambiguous", display))),
        (None, _) => Err(Error::Schema(format!("column {} not found", display))),
    }
}

/// Comparison with NULL propagation
fn compare(
    columns: &[Label],
    row: &Row,
    lhs: &Expression,
    rhs: &Expression,
    test: impl Fn(Ordering) -> bool,
) -> Result<Value> {
    let (l, r) = (lhs.evaluate(columns, row)?, rhs.evaluate(columns, row)?);
    if l == Value::Null || r == Value::Null {
        return Ok(Value::Null);
    }
    match l.partial_cmp(&r) {
        Some(ordering) => Ok(Value::Boolean(test(ordering))),
        None => Err(Error::Validation(format!(
            "cannot compare {} with {}",
            l.type_name(),
            r.type_name()
        ))),
    }
}

fn not_boolean(op: &str, l: &Value, r: &Value) -> Error {
    Error::Validation(format!(
        "{} expects boolean operands, got {} and {}",
        op,
        l.type_name(),
        r.type_name()
    ))
}

#[cfg(test)]
mod tests {
    use super::{Expression, Operation};
    use crate::{
        error::{Error, Result},
        sql::types::{Label, Params, Value},
    };

    fn field(name: &str) -> Box<Expression> {
        Box::new(Expression::Field(None, name.into()))
    }

    #[test]
    fn test_evaluate_comparisons() -> Result<()> {
        let columns = vec![Label::new(Some("person"), "name"), Label::new(Some("person"), "age")];
        let row = vec![Value::from("Bob"), Value::from(25)];

        let older = Expression::from(Operation::GreaterThan(
            field("age"),
            Box::new(Value::from(24).into()),
        ));
        assert_eq!(older.evaluate(&columns, &row)?, Value::Boolean(true));

        let named = Expression::from(Operation::Equal(
            Box::new(Expression::Field(Some("person".into()), "name".into())),
            Box::new(Value::from("Alice").into()),
        ));
        assert_eq!(named.evaluate(&columns, &row)?, Value::Boolean(false));

        let null = Expression::from(Operation::LessThan(field("age"), Box::new(Value::Null.into())));
        assert_eq!(null.evaluate(&columns, &row)?, Value::Null);

        let both = Expression::from(Operation::And(Box::new(null), Box::new(named)));
        assert_eq!(both.evaluate(&columns, &row)?, Value::Boolean(false));
        Ok(())
    }

    #[test]
    fn test_evaluate_large_integer_against_float() -> Result<()> {
        let equal = Expression::from(Operation::Equal(
            Box::new(Value::from(9_007_199_254_740_993i64).into()),
            Box::new(Value::from(9_007_199_254_740_992.0).into()),
        ));
        assert_eq!(equal.evaluate(&[], &Vec::new())?, Value::Boolean(false));
        Ok(())
    }

    #[test]
    fn test_evaluate_ambiguous_column() {
        let columns = vec![Label::new(Some("person"), "name"), Label::new(Some("book"), "name")];
        let row = vec![Value::from("Alice"), Value::from("Book 1")];
        assert!(matches!(
            Expression::Field(None, "name".into()).evaluate(&columns, &row),
            Err(Error::Schema(_))
        ));
        assert_eq!(
            Expression::Field(Some("book".into()), "name".into())
                .evaluate(&columns, &row)
                .ok(),
            Some(Value::from("Book 1"))
        );
    }

    #[test]
    fn test_bind() -> Result<()> {
        let mut params = Params::new();
        params.insert("cutoff".into(), Value::from(24));

        let expr = Expression::from(Operation::LessThan(
            field("age"),
            Box::new(Expression::Param("cutoff".into())),
        ));
        assert_eq!(
            expr.clone().bind(&params)?,
            Expression::from(Operation::LessThan(field("age"), Box::new(Value::from(24).into())))
        );
        assert!(matches!(expr.bind(&Params::new()), Err(Error::Parse(_))));
        Ok(())
    }
}
