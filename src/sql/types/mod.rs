use std::{cmp::Ordering, collections::BTreeMap, fmt::Display};

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    sql::parser::ast::{Consts, Expression},
};

/// Supported SQL data types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Boolean,
    Integer,
    Float,
    String,
}

impl Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            DataType::Boolean => "BOOLEAN",
            DataType::Integer => "INTEGER",
            DataType::Float => "FLOAT",
            DataType::String => "STRING",
        })
    }
}

/// Runtime value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl Value {
    /// Creates a Value from a constant expression
    pub fn from_expression(expr: Expression) -> Result<Self> {
        match expr {
            Expression::Consts(Consts::Null) => Ok(Self::Null),
            Expression::Consts(Consts::Boolean(b)) => Ok(Self::Boolean(b)),
            Expression::Consts(Consts::Integer(i)) => Ok(Self::Integer(i)),
            Expression::Consts(Consts::Float(f)) => Ok(Self::Float(f)),
            Expression::Consts(Consts::String(s)) => Ok(Self::String(s)),
            expr => Err(Error::Parse(format!(
                "[Planner] Expected a constant, got {:?}",
                expr
            ))),
        }
    }

    /// Returns the data type of the value, or None if it's Null
    pub fn datatype(&self) -> Option<DataType> {
        match self {
            Self::Null => None,
            Self::Boolean(_) => Some(DataType::Boolean),
            Self::Integer(_) => Some(DataType::Integer),
            Self::Float(_) => Some(DataType::Float),
            Self::String(_) => Some(DataType::String),
        }
    }

    /// Name of the value's type, for error messages
    pub fn type_name(&self) -> String {
        match self.datatype() {
            Some(dt) => dt.to_string(),
            None => "NULL".to_string(),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Boolean(true) => f.write_str("TRUE"),
            Value::Boolean(false) => f.write_str("FALSE"),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{}", v),
        }
    }
}

/// Ordering used by comparisons. NULL sorts first; values of unrelated types
/// and NaN do not compare. ORDER BY uses [`Value::sort_cmp`] instead.
impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Null, _) => Some(Ordering::Less),
            (_, Value::Null) => Some(Ordering::Greater),
            (Value::Boolean(a), Value::Boolean(b)) => a.partial_cmp(b),
            (Value::Integer(a), Value::Integer(b)) => a.partial_cmp(b),
            (Value::Integer(a), Value::Float(b)) => cmp_int_float(*a, *b),
            (Value::Float(a), Value::Integer(b)) => cmp_int_float(*b, *a).map(Ordering::reverse),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::String(a), Value::String(b)) => a.partial_cmp(b),
            (_, _) => None,
        }
    }
}

impl Value {
    /// Total order for sorting: NULL, booleans, numbers, then strings.
    /// Floats follow `f64::total_cmp`, except that `-0.0` equals `0.0`.
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Float(a), Value::Float(b)) if a == b => Ordering::Equal,
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::Integer(a), Value::Float(b)) => int_float_total(*a, *b),
            (Value::Float(a), Value::Integer(b)) => int_float_total(*b, *a).reverse(),
            (a, b) => match a.partial_cmp(b) {
                Some(ordering) => ordering,
                None => a.rank().cmp(&b.rank()),
            },
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Boolean(_) => 1,
            Value::Integer(_) | Value::Float(_) => 2,
            Value::String(_) => 3,
        }
    }
}

/// Compares an integer with a float without rounding the integer.
fn cmp_int_float(i: i64, f: f64) -> Option<Ordering> {
    // 2^63, the first float above i64::MAX
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if f.is_nan() {
        None
    } else if f >= LIMIT {
        Some(Ordering::Less)
    } else if f < -LIMIT {
        Some(Ordering::Greater)
    } else {
        let whole = f.trunc();
        Some(i.cmp(&(whole as i64)).then_with(|| {
            if f > whole {
                Ordering::Less
            } else if f < whole {
                Ordering::Greater
            } else {
                Ordering::Equal
            }
        }))
    }
}

/// Like `cmp_int_float`, placing NaN where `f64::total_cmp` does.
fn int_float_total(i: i64, f: f64) -> Ordering {
    match cmp_int_float(i, f) {
        Some(ordering) => ordering,
        None if f.is_sign_negative() => Ordering::Greater,
        None => Ordering::Less,
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// A row is a vector of values
pub type Row = Vec<Value>;

/// Named parameter values, keyed without the leading `:`
pub type Params = BTreeMap<String, Value>;

/// Name of a column in a result set, qualified by its source table when known
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub table: Option<String>,
    pub name: String,
}

impl Label {
    pub fn new(table: Option<&str>, name: &str) -> Self {
        Self {
            table: table.map(str::to_string),
            name: name.to_string(),
        }
    }
}

impl Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.table {
            Some(table) => write!(f, "{}.{}", table, self.name),
            None => f.write_str(&self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cmp::Ordering;

    use super::{DataType, Value};

    #[test]
    fn test_value_ordering() {
        assert!(Value::Integer(23) < Value::Integer(25));
        assert!(Value::Integer(2) < Value::Float(2.5));
        assert!(Value::Null < Value::Boolean(false));
        assert!(Value::String("Alice".into()) < Value::String("Bob".into()));
        assert_eq!(Value::Integer(1).partial_cmp(&Value::String("1".into())), None);
    }

    #[test]
    fn test_integer_float_comparison_is_exact() {
        let big = Value::Integer(9_007_199_254_740_993);
        assert!(big > Value::Float(9_007_199_254_740_992.0));
        assert_ne!(big.partial_cmp(&Value::Float(9_007_199_254_740_992.0)), Some(Ordering::Equal));
        assert_eq!(Value::Integer(3).partial_cmp(&Value::Float(3.0)), Some(Ordering::Equal));
        assert!(Value::Integer(-3) > Value::Float(-3.5));
        assert!(Value::Float(2.5) > Value::Integer(2));
        assert!(Value::Integer(i64::MAX) < Value::Float(f64::INFINITY));
        assert!(Value::Integer(i64::MIN) > Value::Float(-1e19));
        assert_eq!(Value::Integer(1).partial_cmp(&Value::Float(f64::NAN)), None);
    }

    #[test]
    fn test_sort_order_is_total() {
        let mut values = vec![
            Value::Float(f64::NAN),
            Value::String("a".into()),
            Value::Integer(2),
            Value::Float(-0.0),
            Value::Null,
            Value::Float(f64::NEG_INFINITY),
            Value::Boolean(true),
            Value::Float(1.5),
        ];
        values.sort_by(Value::sort_cmp);
        assert_eq!(values[0], Value::Null);
        assert_eq!(values[1], Value::Boolean(true));
        assert_eq!(values[2], Value::Float(f64::NEG_INFINITY));
        assert_eq!(values[3], Value::Float(-0.0));
        assert_eq!(values[4], Value::Float(1.5));
        assert_eq!(values[5], Value::Integer(2));
        assert!(matches!(values[6], Value::Float(f) if f.is_nan()));
        assert_eq!(values[7], Value::String("a".into()));
        assert_eq!(Value::Float(0.0).sort_cmp(&Value::Float(-0.0)), Ordering::Equal);
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(Value::from(23), Value::Integer(23));
        assert_eq!(Value::from("Alice"), Value::String("Alice".into()));
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some(1.5)).datatype(), Some(DataType::Float));
        assert_eq!(Value::Null.type_name(), "NULL");
    }
}
