//! Byte-level storage: key/value engines, key encoding and MVCC transactions

pub mod disk;
pub mod engine;
pub mod keycode;
pub mod memory;
pub mod mvcc;
