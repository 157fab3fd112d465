//! A thin record/table/query layer over [`Database`].
//!
//! Every operation turns into exactly one [`Database::execute`] call with all
//! values passed as bound `:name` parameters.

use tracing::debug;

use crate::{
    db::Database,
    error::{Error, Result},
    sql::{
        executor::ResultSet,
        types::{Params, Row},
    },
};

pub mod query;
pub mod record;

pub use query::{Bound, Query, QueryIter};
pub use record::{Field, Record, SqlType};

/// Table operations available to every [`Record`]
pub trait Table: Record {
    /// `CREATE TABLE "<Name>" ("<field>" <TYPE>, ...)` in declared field order
    fn create_sql() -> String {
        let columns = Self::FIELDS
            .iter()
            .map(|f| format!("{} {}", quote(f.name), f.datatype))
            .collect::<Vec<_>>()
            .join(", ");
        format!("CREATE TABLE {} ({})", quote(Self::NAME), columns)
    }

    /// `INSERT INTO "<Name>" VALUES (:f1, :f2, ...)`
    fn insert_sql() -> String {
        let placeholders = Self::FIELDS
            .iter()
            .map(|f| format!(":{}", f.name))
            .collect::<Vec<_>>()
            .join(", ");
        format!("INSERT INTO {} VALUES ({})", quote(Self::NAME), placeholders)
    }

    /// `SELECT * FROM "<Name>" [WHERE (c1) AND (c2) ...]`
    fn select_sql(clauses: &[&str]) -> String {
        let mut sql = format!("SELECT * FROM {}", quote(Self::NAME));
        if !clauses.is_empty() {
            let filter = clauses
                .iter()
                .map(|c| format!("({})", c))
                .collect::<Vec<_>>()
                .join(" AND ");
            sql.push_str(" WHERE ");
            sql.push_str(&filter);
        }
        sql
    }

    /// Creates the table; fails with [`Error::Schema`] if it exists
    fn create(db: &Database) -> Result<()> {
        debug!(table = Self::NAME, "create table");
        db.execute(&Self::create_sql(), &Params::new())?;
        Ok(())
    }

    /// Validates named values against the declared fields, then stores them
    /// as one new row. Returns the typed record.
    fn insert(db: &Database, params: Params) -> Result<Self> {
        let record = Self::from_params(&params)?;
        Self::insert_record(db, &record)?;
        Ok(record)
    }

    fn insert_record(db: &Database, record: &Self) -> Result<()> {
        let params: Params = Self::FIELDS
            .iter()
            .map(|f| f.name.to_string())
            .zip(record.to_row())
            .collect();
        debug!(table = Self::NAME, "insert");
        db.execute(&Self::insert_sql(), &params)?;
        Ok(())
    }

    /// Raw rows matching every clause, in store order
    fn select(db: &Database, clauses: &[&str]) -> Result<Vec<Row>> {
        Self::select_with(db, clauses, &Params::new())
    }

    /// Like [`Table::select`], with `:name` placeholders in the clauses bound
    /// from `params`
    fn select_with(db: &Database, clauses: &[&str], params: &Params) -> Result<Vec<Row>> {
        rows(db.execute(&Self::select_sql(clauses), params)?)
    }

    fn select_records(db: &Database, clauses: &[&str]) -> Result<Vec<Self>> {
        Self::select(db, clauses)?
            .into_iter()
            .map(Self::from_row)
            .collect()
    }
}

impl<R: Record> Table for R {}

/// Quotes a table or field name so keywords can be used as names
fn quote(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub(crate) fn rows(result: ResultSet) -> Result<Vec<Row>> {
    match result.into_rows() {
        Some((_, rows)) => Ok(rows),
        None => Err(Error::Internal("statement returned no rows".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::Table;
    use crate::{
        db::Database,
        error::{Error, Result},
        sql::types::Value,
    };

    crate::record! {
        struct Gadget {
            label: String,
            price: f64,
            in_stock: bool,
        }
    }

    #[test]
    fn test_statement_text() {
        assert_eq!(
            Gadget::create_sql(),
            r#"CREATE TABLE "Gadget" ("label" STRING, "price" FLOAT, "in_stock" BOOLEAN)"#
        );
        assert_eq!(
            Gadget::insert_sql(),
            r#"INSERT INTO "Gadget" VALUES (:label, :price, :in_stock)"#
        );
        assert_eq!(Gadget::select_sql(&[]), r#"SELECT * FROM "Gadget""#);
        assert_eq!(
            Gadget::select_sql(&["price > 2", "in_stock OR label = 'x'"]),
            r#"SELECT * FROM "Gadget" WHERE (price > 2) AND (in_stock OR label = 'x')"#
        );
    }

    #[test]
    fn test_values_are_bound_not_inlined() -> Result<()> {
        let db = Database::memory();
        Gadget::create(&db)?;
        let label = "it's'); CREATE TABLE evil (a int) --";
        Gadget::insert(&db, crate::params! { label = label, price = 9.5, in_stock = true })?;

        let got = Gadget::select_records(&db, &["in_stock"])?;
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].label, label);
        assert!(matches!(
            db.execute("select * from evil", &crate::params! {}),
            Err(Error::Schema(_))
        ));
        Ok(())
    }

    #[test]
    fn test_select_with_params() -> Result<()> {
        let db = Database::memory();
        Gadget::create(&db)?;
        for (label, price) in [("a", 1.0), ("b", 2.0), ("c", 3.0)] {
            Gadget::insert(&db, crate::params! { label = label, price = price, in_stock = false })?;
        }
        let rows = Gadget::select_with(&db, &["price >= :min"], &crate::params! { min = 2 })?;
        assert_eq!(
            rows.iter().map(|r| r[0].clone()).collect::<Vec<_>>(),
            vec![Value::from("b"), Value::from("c")]
        );
        Ok(())
    }

    crate::record! {
        struct Note {
            text: String,
            limit: i64,
        }
    }

    #[test]
    fn test_keyword_field_names() -> Result<()> {
        let db = Database::memory();
        Note::create(&db)?;
        Note::insert(&db, crate::params! { text = "hello", limit = 3 })?;
        Note::insert(&db, crate::params! { text = "bye", limit = 1 })?;

        let got = Note::select_records(&db, &["text = 'hello'", "\"limit\" > 2"])?;
        assert_eq!(
            got,
            vec![Note {
                text: "hello".into(),
                limit: 3
            }]
        );
        Ok(())
    }

    #[test]
    fn test_insert_rejects_bad_values() -> Result<()> {
        let db = Database::memory();
        Gadget::create(&db)?;
        assert!(matches!(
            Gadget::insert(&db, crate::params! { label = "a", price = "cheap", in_stock = true }),
            Err(Error::Validation(_))
        ));
        assert!(Gadget::select(&db, &[])?.is_empty());
        Ok(())
    }
}
