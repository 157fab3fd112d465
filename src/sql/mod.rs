//! SQL processing module
//!
//! This module provides:
//! - `parser`: SQL lexer and parser
//! - `types`: SQL data types and values
//! - `schema`: Table and column schema definitions
//! - `plan`: Execution plan generation and parameter binding
//! - `executor`: Query and mutation execution
//! - `engine`: Transactional SQL engine over a key-value store

pub mod engine;
pub mod executor;
pub mod parser;
pub mod plan;
pub mod schema;
pub mod types;
