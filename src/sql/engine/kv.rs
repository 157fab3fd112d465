use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    sql::{
        executor::matches_predicate,
        parser::ast::Expression,
        schema::Table,
        types::Row,
    },
    storage::{self, engine::Engine as StorageEngine, keycode::serialize_key},
};

use super::{Engine, Transaction};

/// Key-value store backed SQL engine
pub struct KVEngine<E: StorageEngine> {
    pub kv: storage::mvcc::Mvcc<E>,
}

impl<E: StorageEngine> Clone for KVEngine<E> {
    fn clone(&self) -> Self {
        Self {
            kv: self.kv.clone(),
        }
    }
}

impl<E: StorageEngine> KVEngine<E> {
    pub fn new(engine: E) -> Self {
        Self {
            kv: storage::mvcc::Mvcc::new(engine),
        }
    }
}

impl<E: StorageEngine + 'static> Engine for KVEngine<E> {
    type Transaction = KVTransaction<E>;

    fn begin(&self) -> Result<Self::Transaction> {
        Ok(Self::Transaction::new(self.kv.begin()?))
    }
}

/// Key-value transaction (wrapper around MVCC transaction)
pub struct KVTransaction<E: StorageEngine> {
    txn: storage::mvcc::MvccTransaction<E>,
}

impl<E: StorageEngine> KVTransaction<E> {
    pub fn new(txn: storage::mvcc::MvccTransaction<E>) -> Self {
        Self { txn }
    }

    /// Allocates the next row id of a table
    fn next_row_id(&self, table_name: &str) -> Result<u64> {
        let key = Key::RowSeq(table_name.to_string()).encode()?;
        let id = match self.txn.get(key.clone())? {
            Some(value) => bincode::deserialize(&value)?,
            None => 1,
        };
        self.txn.set(key, bincode::serialize(&(id + 1))?)?;
        Ok(id)
    }
}

impl<E: StorageEngine> Transaction for KVTransaction<E> {
    fn commit(&self) -> Result<()> {
        self.txn.commit()
    }

    fn rollback(&self) -> Result<()> {
        self.txn.rollback()
    }

    fn create_row(&mut self, table_name: &str, row: Row) -> Result<()> {
        let table = self.must_get_table(table_name)?;
        let row = table.check_row(row)?;

        // Rows are keyed by a per-table sequence number, so scans return
        // them in insertion order and equal values never collide.
        let id = self.next_row_id(table_name)?;
        let key = Key::Row(table_name.to_string(), id).encode()?;
        self.txn.set(key, bincode::serialize(&row)?)
    }

    fn scan_table(&self, table_name: &str, filter: Option<&Expression>) -> Result<Vec<Row>> {
        let table = self.must_get_table(table_name)?;
        let labels = table.labels();

        let prefix = KeyPrefix::Row(table_name.to_string()).encode()?;
        let mut rows = Vec::new();
        for result in self.txn.scan_prefix(prefix)? {
            let row: Row = bincode::deserialize(&result.value)?;
            let keep = match filter {
                Some(predicate) => matches_predicate(predicate, &labels, &row)?,
                None => true,
            };
            if keep {
                rows.push(row);
            }
        }
        Ok(rows)
    }

    fn create_table(&mut self, table: Table) -> Result<()> {
        if self.get_table(&table.name)?.is_some() {
            return Err(Error::Schema(format!("table {} already exists", table.name)));
        }
        table.validate()?;

        let key = Key::Table(table.name.clone()).encode()?;
        self.txn.set(key, bincode::serialize(&table)?)
    }

    fn get_table(&self, table_name: &str) -> Result<Option<Table>> {
        let key = Key::Table(table_name.to_string()).encode()?;
        self.txn
            .get(key)?
            .map(|v| bincode::deserialize(&v))
            .transpose()
            .map_err(Error::from)
    }
}

/// Key types for KV storage operations
#[derive(Debug, Serialize, Deserialize)]
enum Key {
    Table(String),
    Row(String, u64),
    RowSeq(String),
}

impl Key {
    fn encode(&self) -> Result<Vec<u8>> {
        serialize_key(self)
    }
}

/// Key prefix types for prefix scanning
///
/// Keys are encoded as [variant_index][variant_data...], so variants must
/// stay in the same order as [`Key`].
#[derive(Debug, Serialize, Deserialize)]
enum KeyPrefix {
    #[allow(dead_code)]
    Table,
    Row(String),
}

impl KeyPrefix {
    fn encode(&self) -> Result<Vec<u8>> {
        serialize_key(self)
    }
}

#[cfg(test)]
mod tests {
    use super::KVEngine;
    use crate::{
        error::{Error, Result},
        sql::{
            engine::Engine,
            executor::ResultSet,
            types::{Label, Params, Value},
        },
        storage::memory::MemoryEngine,
    };

    fn rows(result: ResultSet) -> Vec<Vec<Value>> {
        result.into_rows().map(|(_, rows)| rows).unwrap_or_default()
    }

    #[test]
    fn test_create_table() -> Result<()> {
        let kvengine = KVEngine::new(MemoryEngine::new());
        let mut s = kvengine.session()?;
        let params = Params::new();

        s.execute(
            "create table t1 (a int, b text default 'vv', c integer default 100);",
            &params,
        )?;
        s.execute("insert into t1 values(1, 'a', 1);", &params)?;
        s.execute("insert into t1 values(2, 'b');", &params)?;
        s.execute("insert into t1(c, a) values(200, 3);", &params)?;

        let (columns, got) = s
            .execute("select * from t1;", &params)?
            .into_rows()
            .unwrap_or_default();
        assert_eq!(
            columns,
            vec![
                Label::new(Some("t1"), "a"),
                Label::new(Some("t1"), "b"),
                Label::new(Some("t1"), "c"),
            ]
        );
        assert_eq!(
            got,
            vec![
                vec![Value::from(1), Value::from("a"), Value::from(1)],
                vec![Value::from(2), Value::from("b"), Value::from(100)],
                vec![Value::from(3), Value::from("vv"), Value::from(200)],
            ]
        );

        assert!(matches!(
            s.execute("create table t1 (a int)", &params),
            Err(Error::Schema(_))
        ));
        Ok(())
    }

    #[test]
    fn test_duplicate_values_are_kept() -> Result<()> {
        let mut s = KVEngine::new(MemoryEngine::new()).session()?;
        let params = Params::new();
        s.execute("create table book (owner string, title string)", &params)?;
        s.execute(
            "insert into book values ('Alice', 'Book 1'), ('Alice', 'Book 2'), ('Bob', 'Book 3')",
            &params,
        )?;

        let got = rows(s.execute("select title from book where owner = 'Alice'", &params)?);
        assert_eq!(got, vec![vec![Value::from("Book 1")], vec![Value::from("Book 2")]]);
        Ok(())
    }

    #[test]
    fn test_failed_statement_rolls_back() -> Result<()> {
        let mut s = KVEngine::new(MemoryEngine::new()).session()?;
        let params = Params::new();
        s.execute("create table person (name string not null, age int)", &params)?;

        // The second row is invalid, so neither row is stored.
        assert!(matches!(
            s.execute("insert into person values ('Alice', 23), (NULL, 25)", &params),
            Err(Error::Validation(_))
        ));
        assert!(rows(s.execute("select * from person", &params)?).is_empty());

        assert!(matches!(
            s.execute("insert into person values ('Alice', 'old')", &params),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            s.execute("select * from nobody", &params),
            Err(Error::Schema(_))
        ));
        Ok(())
    }

    #[test]
    fn test_query_clauses() -> Result<()> {
        let mut s = KVEngine::new(MemoryEngine::new()).session()?;
        let params = Params::new();
        s.execute("create table person (name string, age int)", &params)?;
        s.execute("create table book (owner string, title string)", &params)?;
        s.execute(
            "insert into person values ('Alice', 23), ('Bob', 25), ('Charlie', 12)",
            &params,
        )?;
        s.execute(
            "insert into book values ('Alice', 'Book 1'), ('Alice', 'Book 2'), ('Bob', 'Book 3')",
            &params,
        )?;

        let got = rows(s.execute(
            "select name from person order by age desc limit 2 offset 1",
            &params,
        )?);
        assert_eq!(got, vec![vec![Value::from("Alice")], vec![Value::from("Charlie")]]);

        let got = rows(s.execute(
            "select distinct person.name from person join book on book.owner = person.name",
            &params,
        )?);
        assert_eq!(got, vec![vec![Value::from("Alice")], vec![Value::from("Bob")]]);

        let got = rows(s.execute(
            "select name, title from person left join book on owner = name where age < 20",
            &params,
        )?);
        assert_eq!(got, vec![vec![Value::from("Charlie"), Value::Null]]);

        let got = rows(s.execute("select * from person cross join book", &params)?);
        assert_eq!(got.len(), 9);
        Ok(())
    }
}
