//! tinyorm - a toy record/table/query layer over a small embedded SQL engine
//!
//! This crate provides:
//! - `orm`: record definitions, table operations and declarative queries
//! - `db`: the shared store handle and its single execution entry point
//! - `sql`: SQL parsing, planning and execution
//! - `storage`: key-value engines and MVCC transactions
//! - `seq`: lazy sequence helpers and a rewindable class roster
//! - `config`: environment configuration and logging setup

pub mod config;
pub mod db;
pub mod error;
pub mod orm;
pub mod seq;
pub mod sql;
pub mod storage;

pub use db::Database;
pub use error::{Error, Result};
