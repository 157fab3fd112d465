use std::{marker::PhantomData, vec};

use tracing::trace;

use crate::{
    db::Database,
    error::Result,
    orm::{Record, rows},
    sql::types::{Params, Row},
};

/// A fixed, parameterized statement whose rows map onto `Output`
///
/// The columns `SQL` returns must line up positionally with
/// `Output::FIELDS`.
pub trait Query: Sized {
    const SQL: &'static str;
    type Output: Record;

    /// Binds parameter values; nothing runs until the result is iterated
    fn bind(db: &Database, params: Params) -> Bound<Self> {
        Bound {
            db: db.clone(),
            params,
            query: PhantomData,
        }
    }
}

/// A query bound to a store and parameters
///
/// Iterating consumes it; bind again to run the query again.
pub struct Bound<Q: Query> {
    db: Database,
    params: Params,
    query: PhantomData<Q>,
}

impl<Q: Query> IntoIterator for Bound<Q> {
    type Item = Result<Q::Output>;
    type IntoIter = QueryIter<Q>;

    fn into_iter(self) -> Self::IntoIter {
        QueryIter {
            state: State::Pending(self.db, self.params),
            query: PhantomData,
        }
    }
}

enum State {
    Pending(Database, Params),
    Rows(vec::IntoIter<Row>),
    Done,
}

/// Lazy iterator over a bound query's results
///
/// The statement executes on the first call to `next`. A failure is yielded
/// once, after which the iterator is exhausted.
pub struct QueryIter<Q: Query> {
    state: State,
    query: PhantomData<Q>,
}

impl<Q: Query> Iterator for QueryIter<Q> {
    type Item = Result<Q::Output>;

    fn next(&mut self) -> Option<Self::Item> {
        if matches!(self.state, State::Pending(..)) {
            let State::Pending(db, params) = std::mem::replace(&mut self.state, State::Done) else {
                return None;
            };
            trace!(output = <Q::Output as Record>::NAME, "running bound query");
            match db.execute(Q::SQL, &params).and_then(rows) {
                Ok(rows) => self.state = State::Rows(rows.into_iter()),
                Err(err) => return Some(Err(err)),
            }
        }
        match &mut self.state {
            State::Rows(rows) => rows.next().map(Q::Output::from_row),
            _ => None,
        }
    }
}
