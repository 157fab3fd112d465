use crate::{
    error::{Error, Result},
    sql::types::{DataType, Params, Row, Value},
};

/// One declared field of a record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Field {
    pub name: &'static str,
    pub datatype: DataType,
    pub nullable: bool,
}

/// A Rust type that can be stored in a column
pub trait SqlType: Sized {
    const DATATYPE: DataType;
    const NULLABLE: bool = false;

    /// Converts a stored value, naming `field` in errors
    fn from_value(field: &str, value: Value) -> Result<Self>;

    fn to_value(&self) -> Value;

    /// Value used when a field is not given at all
    fn from_missing(field: &str) -> Result<Self> {
        Err(Error::Validation(format!("missing field {}", field)))
    }
}

fn mismatch(field: &str, expected: DataType, value: &Value) -> Error {
    Error::Validation(format!(
        "field {} expects {}, got {}",
        field,
        expected,
        value.type_name()
    ))
}

impl SqlType for String {
    const DATATYPE: DataType = DataType::String;

    fn from_value(field: &str, value: Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(s),
            v => Err(mismatch(field, Self::DATATYPE, &v)),
        }
    }

    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }
}

impl SqlType for i64 {
    const DATATYPE: DataType = DataType::Integer;

    fn from_value(field: &str, value: Value) -> Result<Self> {
        match value {
            Value::Integer(i) => Ok(i),
            v => Err(mismatch(field, Self::DATATYPE, &v)),
        }
    }

    fn to_value(&self) -> Value {
        Value::Integer(*self)
    }
}

impl SqlType for f64 {
    const DATATYPE: DataType = DataType::Float;

    fn from_value(field: &str, value: Value) -> Result<Self> {
        match value {
            Value::Float(f) => Ok(f),
            Value::Integer(i) => Ok(i as f64),
            v => Err(mismatch(field, Self::DATATYPE, &v)),
        }
    }

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }
}

impl SqlType for bool {
    const DATATYPE: DataType = DataType::Boolean;

    fn from_value(field: &str, value: Value) -> Result<Self> {
        match value {
            Value::Boolean(b) => Ok(b),
            v => Err(mismatch(field, Self::DATATYPE, &v)),
        }
    }

    fn to_value(&self) -> Value {
        Value::Boolean(*self)
    }
}

impl<T: SqlType> SqlType for Option<T> {
    const DATATYPE: DataType = T::DATATYPE;
    const NULLABLE: bool = true;

    fn from_value(field: &str, value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            v => T::from_value(field, v).map(Some),
        }
    }

    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, T::to_value)
    }

    fn from_missing(_field: &str) -> Result<Self> {
        Ok(None)
    }
}

/// A fixed-shape record stored as one table row
///
/// Implemented by [`crate::record!`], which derives `FIELDS` from the
/// declaration order.
pub trait Record: Sized {
    /// Table name
    const NAME: &'static str;
    /// Declared fields, in column order
    const FIELDS: &'static [Field];

    /// Maps a row positionally onto the declared fields
    fn from_row(row: Row) -> Result<Self>;

    /// Values in declared field order
    fn to_row(&self) -> Row;

    /// Builds a record from named values, rejecting unknown fields
    fn from_params(params: &Params) -> Result<Self>;
}

/// Checks that a row has one value per declared field
pub fn check_arity<R: Record>(row: &Row) -> Result<()> {
    if row.len() != R::FIELDS.len() {
        return Err(Error::Validation(format!(
            "{} has {} fields, row has {} columns",
            R::NAME,
            R::FIELDS.len(),
            row.len()
        )));
    }
    Ok(())
}

/// Rejects names that are not declared fields of `R`
pub fn check_known_fields<R: Record>(params: &Params) -> Result<()> {
    match params
        .keys()
        .find(|name| !R::FIELDS.iter().any(|f| f.name == name.as_str()))
    {
        Some(name) => Err(Error::Validation(format!(
            "{} has no field {}",
            R::NAME,
            name
        ))),
        None => Ok(()),
    }
}

/// Reads one field out of named values
pub fn field_from_params<T: SqlType>(params: &Params, field: &str) -> Result<T> {
    match params.get(field) {
        Some(value) => T::from_value(field, value.clone()),
        None => T::from_missing(field),
    }
}

/// Declares a record type and implements [`Record`] for it.
///
/// ```
/// tinyorm::record! {
///     pub struct Person {
///         name: String,
///         age: i64,
///     }
/// }
/// ```
#[macro_export]
macro_rules! record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $($field:ident : $ty:ty),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        $vis struct $name {
            $(pub $field: $ty,)+
        }

        impl $crate::orm::Record for $name {
            const NAME: &'static str = stringify!($name);
            const FIELDS: &'static [$crate::orm::Field] = &[
                $($crate::orm::Field {
                    name: stringify!($field),
                    datatype: <$ty as $crate::orm::SqlType>::DATATYPE,
                    nullable: <$ty as $crate::orm::SqlType>::NULLABLE,
                },)+
            ];

            fn from_row(row: $crate::sql::types::Row) -> $crate::error::Result<Self> {
                $crate::orm::record::check_arity::<Self>(&row)?;
                let mut values = row.into_iter();
                Ok(Self {
                    $($field: <$ty as $crate::orm::SqlType>::from_value(
                        stringify!($field),
                        values.next().unwrap_or($crate::sql::types::Value::Null),
                    )?,)+
                })
            }

            fn to_row(&self) -> $crate::sql::types::Row {
                vec![$($crate::orm::SqlType::to_value(&self.$field),)+]
            }

            fn from_params(params: &$crate::sql::types::Params) -> $crate::error::Result<Self> {
                $crate::orm::record::check_known_fields::<Self>(params)?;
                Ok(Self {
                    $($field: $crate::orm::record::field_from_params::<$ty>(
                        params,
                        stringify!($field),
                    )?,)+
                })
            }
        }
    };
}

/// Builds [`Params`] from `name = value` pairs.
///
/// ```
/// let params = tinyorm::params! { name = "Alice", age = 23 };
/// assert_eq!(params.len(), 2);
/// ```
#[macro_export]
macro_rules! params {
    () => {
        $crate::sql::types::Params::new()
    };
    ($($name:ident = $value:expr),+ $(,)?) => {{
        let mut params = $crate::sql::types::Params::new();
        $(params.insert(
            stringify!($name).to_string(),
            $crate::sql::types::Value::from($value),
        );)+
        params
    }};
}

#[cfg(test)]
mod tests {
    use super::Record;
    use crate::{
        error::{Error, Result},
        sql::types::{DataType, Value},
    };

    crate::record! {
        struct Pet {
            name: String,
            weight: f64,
            owner: Option<String>,
        }
    }

    #[test]
    fn test_fields_follow_declaration() {
        let fields: Vec<_> = Pet::FIELDS.iter().map(|f| (f.name, f.datatype, f.nullable)).collect();
        assert_eq!(
            fields,
            vec![
                ("name", DataType::String, false),
                ("weight", DataType::Float, false),
                ("owner", DataType::String, true),
            ]
        );
        assert_eq!(Pet::NAME, "Pet");
    }

    #[test]
    fn test_from_params() -> Result<()> {
        let pet = Pet::from_params(&crate::params! { name = "Rex", weight = 30 })?;
        assert_eq!(
            pet,
            Pet {
                name: "Rex".into(),
                weight: 30.0,
                owner: None,
            }
        );
        assert_eq!(pet.to_row(), vec![Value::from("Rex"), Value::Float(30.0), Value::Null]);

        let unknown = Pet::from_params(&crate::params! { name = "Rex", weight = 1.5, age = 3 });
        assert!(matches!(unknown, Err(Error::Validation(_))));

        let missing = Pet::from_params(&crate::params! { weight = 1.5 });
        assert!(matches!(missing, Err(Error::Validation(_))));

        let wrong = Pet::from_params(&crate::params! { name = 7, weight = 1.5 });
        assert!(matches!(wrong, Err(Error::Validation(_))));
        Ok(())
    }

    #[test]
    fn test_from_row() -> Result<()> {
        let pet = Pet::from_row(vec!["Rex".into(), 2.5.into(), "Alice".into()])?;
        assert_eq!(pet.owner.as_deref(), Some("Alice"));

        assert!(matches!(
            Pet::from_row(vec!["Rex".into(), 2.5.into()]),
            Err(Error::Validation(_))
        ));
        // Same column count in the wrong order is only caught by type.
        assert!(matches!(
            Pet::from_row(vec![2.5.into(), "Rex".into(), Value::Null]),
            Err(Error::Validation(_))
        ));
        Ok(())
    }
}
