use tracing::{debug, warn};

use crate::{
    error::{Error, Result},
    sql::{
        executor::ResultSet,
        parser::{Parser, ast::Expression},
        plan::Plan,
        schema::Table,
        types::{Params, Row},
    },
};

pub mod kv;

/// SQL engine trait
pub trait Engine: Clone {
    type Transaction: Transaction + 'static;

    fn begin(&self) -> Result<Self::Transaction>;

    fn session(&self) -> Result<Session<Self>> {
        Ok(Session {
            engine: self.clone(),
        })
    }
}

/// SQL transaction trait (DDL and DML operations)
pub trait Transaction {
    fn commit(&self) -> Result<()>;
    fn rollback(&self) -> Result<()>;

    /// Appends a row; rows scan back in insertion order
    fn create_row(&mut self, table_name: &str, row: Row) -> Result<()>;
    /// Scans table with optional filter
    fn scan_table(&self, table_name: &str, filter: Option<&Expression>) -> Result<Vec<Row>>;

    // DDL operations
    fn create_table(&mut self, table: Table) -> Result<()>;
    fn get_table(&self, table_name: &str) -> Result<Option<Table>>;
    /// Returns table info, returns error if table doesn't exist
    fn must_get_table(&self, table_name: &str) -> Result<Table> {
        self.get_table(table_name)?
            .ok_or(Error::Schema(format!("table {} does not exist", table_name)))
    }
}

/// SQL session for executing statements
pub struct Session<E: Engine> {
    engine: E,
}

impl<E: Engine> Session<E> {
    /// Executes one statement in its own transaction
    ///
    /// The transaction commits if the statement succeeds and rolls back
    /// otherwise, so a failed statement leaves no partial writes.
    pub fn execute(&mut self, sql: &str, params: &Params) -> Result<ResultSet> {
        let stmt = Parser::new(sql).parse()?;
        let plan = Plan::build(stmt, params)?;

        let mut txn = self.engine.begin()?;
        match plan.execute(&mut txn) {
            Ok(result) => {
                txn.commit()?;
                debug!(?result, "statement committed");
                Ok(result)
            }
            Err(err) => {
                warn!(%err, "statement failed, rolling back");
                txn.rollback()?;
                Err(err)
            }
        }
    }
}
