use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    sql::types::{DataType, Label, Row, Value},
};

/// Table schema definition
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
}

impl Table {
    /// Validates table schema
    pub fn validate(&self) -> Result<()> {
        if self.columns.is_empty() {
            return Err(Error::Schema(format!("table {} has no columns", self.name)));
        }
        for (i, column) in self.columns.iter().enumerate() {
            if self.columns[..i].iter().any(|c| c.name == column.name) {
                return Err(Error::Schema(format!(
                    "duplicate column {} in table {}",
                    column.name, self.name
                )));
            }
            if let Some(default) = &column.default {
                column.check(default)?;
            }
        }
        Ok(())
    }

    /// Returns the column index for a given column name
    pub fn get_col_index(&self, col_name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c.name == col_name)
            .ok_or(Error::Schema(format!(
                "column {} not found in table {}",
                col_name, self.name
            )))
    }

    /// Result set labels for the table's columns
    pub fn labels(&self) -> Vec<Label> {
        self.columns
            .iter()
            .map(|c| Label::new(Some(&self.name), &c.name))
            .collect()
    }

    /// Checks a full row against the column types, coercing where allowed
    pub fn check_row(&self, row: Row) -> Result<Row> {
        if row.len() != self.columns.len() {
            return Err(Error::Validation(format!(
                "table {} has {} columns, got {} values",
                self.name,
                self.columns.len(),
                row.len()
            )));
        }
        self.columns
            .iter()
            .zip(row)
            .map(|(col, value)| col.check(&value).map(|_| col.coerce(value)))
            .collect()
    }
}

/// Column schema definition
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub datatype: DataType,
    pub nullable: bool,
    pub default: Option<Value>,
}

impl Column {
    fn check(&self, value: &Value) -> Result<()> {
        match value.datatype() {
            None if self.nullable => Ok(()),
            None => Err(Error::Validation(format!(
                "column {} cannot be null",
                self.name
            ))),
            Some(DataType::Float) if matches!(value, Value::Float(f) if f.is_nan()) => Err(
                Error::Validation(format!("column {} cannot store NaN", self.name)),
            ),
            Some(DataType::Integer) if self.datatype == DataType::Float => Ok(()),
            Some(dt) if dt != self.datatype => Err(Error::Validation(format!(
                "column {} expects {}, got {}",
                self.name, self.datatype, dt
            ))),
            Some(_) => Ok(()),
        }
    }

    fn coerce(&self, value: Value) -> Value {
        match (self.datatype, value) {
            (DataType::Float, Value::Integer(i)) => Value::Float(i as f64),
            (_, value) => value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Column, Table};
    use crate::{
        error::{Error, Result},
        sql::types::{DataType, Value},
    };

    fn person() -> Table {
        Table {
            name: "person".into(),
            columns: vec![
                Column {
                    name: "name".into(),
                    datatype: DataType::String,
                    nullable: false,
                    default: None,
                },
                Column {
                    name: "weight".into(),
                    datatype: DataType::Float,
                    nullable: true,
                    default: Some(Value::Null),
                },
            ],
        }
    }

    #[test]
    fn test_check_row() -> Result<()> {
        let table = person();
        table.validate()?;
        assert_eq!(
            table.check_row(vec!["Alice".into(), 60.into()])?,
            vec![Value::from("Alice"), Value::Float(60.0)]
        );
        assert!(matches!(
            table.check_row(vec![Value::Null, Value::Null]),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            table.check_row(vec![23.into(), Value::Null]),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            table.check_row(vec!["Alice".into()]),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            table.check_row(vec!["Alice".into(), f64::NAN.into()]),
            Err(Error::Validation(_))
        ));
        Ok(())
    }

    #[test]
    fn test_validate_duplicate_columns() {
        let mut table = person();
        table.columns[1].name = "name".into();
        assert!(matches!(table.validate(), Err(Error::Schema(_))));
    }
}
