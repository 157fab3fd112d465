use std::{
    collections::{BTreeMap, HashSet},
    sync::{Arc, Mutex, MutexGuard},
};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{
    error::{Error, Result},
    storage::{
        engine::Engine,
        keycode::{deserialize_key, serialize_key},
    },
};

/// Transaction version number
pub type Version = u64;

/// Multi-version layer over a storage engine
///
/// Every write is stored under `(key, version)`. A transaction sees the
/// newest version not newer than its own and not written by a transaction
/// that was still active when it began. Clones share the same engine.
pub struct Mvcc<E: Engine> {
    engine: Arc<Mutex<E>>,
}

impl<E: Engine> Clone for Mvcc<E> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
        }
    }
}

impl<E: Engine> Mvcc<E> {
    pub fn new(eng: E) -> Self {
        Self {
            engine: Arc::new(Mutex::new(eng)),
        }
    }

    pub fn begin(&self) -> Result<MvccTransaction<E>> {
        MvccTransaction::begin(self.engine.clone())
    }
}

/// Snapshot a transaction reads from
pub struct TransactionState {
    pub version: Version,
    pub active_versions: HashSet<Version>,
}

impl TransactionState {
    fn is_visible(&self, version: Version) -> bool {
        !self.active_versions.contains(&version) && version <= self.version
    }
}

/// Storage keys owned by the MVCC layer
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub enum MvccKey {
    NextVersion,
    TxnActive(Version),
    /// Marks a key written by a transaction, used to undo it on rollback
    TxnWrite(Version, #[serde(with = "serde_bytes")] Vec<u8>),
    Version(#[serde(with = "serde_bytes")] Vec<u8>, Version),
}

impl MvccKey {
    pub fn encode(&self) -> Result<Vec<u8>> {
        serialize_key(self)
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        deserialize_key(data)
    }
}

/// Prefixes of [`MvccKey`]; variant order must stay aligned with it.
#[derive(Debug, Serialize, Deserialize)]
pub enum MvccKeyPrefix {
    NextVersion,
    TxnActive,
    TxnWrite(Version),
    Version(#[serde(with = "serde_bytes")] Vec<u8>),
}

impl MvccKeyPrefix {
    pub fn encode(&self) -> Result<Vec<u8>> {
        serialize_key(self)
    }
}

/// Key/value pair returned by [`MvccTransaction::scan_prefix`]
#[derive(Debug, PartialEq)]
pub struct ScanResult {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

pub struct MvccTransaction<E: Engine> {
    engine: Arc<Mutex<E>>,
    state: TransactionState,
}

impl<E: Engine> MvccTransaction<E> {
    pub fn begin(eng: Arc<Mutex<E>>) -> Result<Self> {
        let mut engine = eng.lock()?;

        let version = match engine.get(MvccKey::NextVersion.encode()?)? {
            Some(value) => bincode::deserialize(&value)?,
            None => 1,
        };
        engine.set(
            MvccKey::NextVersion.encode()?,
            bincode::serialize(&(version + 1))?,
        )?;

        let active_versions = Self::scan_active(&mut engine)?;
        engine.set(MvccKey::TxnActive(version).encode()?, vec![])?;
        trace!(version, active = active_versions.len(), "begin transaction");
        drop(engine);

        Ok(Self {
            engine: eng,
            state: TransactionState {
                version,
                active_versions,
            },
        })
    }

    /// Makes the writes permanent by dropping the undo log
    pub fn commit(&self) -> Result<()> {
        let mut engine = self.engine.lock()?;
        let written = Self::scan_written(&mut engine, self.state.version)?;
        for (marker, _) in written {
            engine.delete(marker)?;
        }
        trace!(version = self.state.version, "commit transaction");
        engine.delete(MvccKey::TxnActive(self.state.version).encode()?)
    }

    /// Deletes every version this transaction wrote, then the undo log
    pub fn rollback(&self) -> Result<()> {
        let mut engine = self.engine.lock()?;
        let written = Self::scan_written(&mut engine, self.state.version)?;
        for (marker, key) in written {
            engine.delete(MvccKey::Version(key, self.state.version).encode()?)?;
            engine.delete(marker)?;
        }
        trace!(version = self.state.version, "rollback transaction");
        engine.delete(MvccKey::TxnActive(self.state.version).encode()?)
    }

    pub fn set(&self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        self.write(key, Some(value))
    }

    /// Writes a tombstone; only the storage tests remove keys
    #[cfg(test)]
    pub fn delete(&self, key: Vec<u8>) -> Result<()> {
        self.write(key, None)
    }

    pub fn get(&self, key: Vec<u8>) -> Result<Option<Vec<u8>>> {
        let mut engine = self.engine.lock()?;
        let from = MvccKey::Version(key.clone(), 0).encode()?;
        let to = MvccKey::Version(key, self.state.version).encode()?;

        let mut iter = engine.scan(from..=to).rev();
        while let Some((k, value)) = iter.next().transpose()? {
            match MvccKey::decode(&k)? {
                MvccKey::Version(_, version) if self.state.is_visible(version) => {
                    return Ok(bincode::deserialize(&value)?);
                }
                MvccKey::Version(..) => {}
                other => return Err(Error::Internal(format!("unexpected key {:?}", other))),
            }
        }
        Ok(None)
    }

    /// Returns the latest visible value of every key starting with `prefix`
    pub fn scan_prefix(&self, prefix: Vec<u8>) -> Result<Vec<ScanResult>> {
        let mut engine = self.engine.lock()?;
        // Drop the 0x00 0x00 terminator so the encoded prefix matches longer keys.
        let mut enc_prefix = MvccKeyPrefix::Version(prefix).encode()?;
        enc_prefix.truncate(enc_prefix.len() - 2);

        let mut results = BTreeMap::new();
        let mut iter = engine.scan_prefix(enc_prefix);
        while let Some((k, value)) = iter.next().transpose()? {
            match MvccKey::decode(&k)? {
                MvccKey::Version(raw_key, version) if self.state.is_visible(version) => {
                    match bincode::deserialize::<Option<Vec<u8>>>(&value)? {
                        Some(raw_value) => results.insert(raw_key, raw_value),
                        None => results.remove(&raw_key),
                    };
                }
                MvccKey::Version(..) => {}
                other => return Err(Error::Internal(format!("unexpected key {:?}", other))),
            }
        }

        Ok(results
            .into_iter()
            .map(|(key, value)| ScanResult { key, value })
            .collect())
    }

    fn write(&self, key: Vec<u8>, value: Option<Vec<u8>>) -> Result<()> {
        let mut engine = self.engine.lock()?;

        // Any version of the key written by a transaction invisible to us,
        // from the oldest active one onwards, is a conflict.
        let oldest = self
            .state
            .active_versions
            .iter()
            .min()
            .copied()
            .unwrap_or(self.state.version + 1);
        let from = MvccKey::Version(key.clone(), oldest).encode()?;
        let to = MvccKey::Version(key.clone(), Version::MAX).encode()?;
        if let Some((k, _)) = engine.scan(from..=to).last().transpose()? {
            match MvccKey::decode(&k)? {
                MvccKey::Version(_, version) if !self.state.is_visible(version) => {
                    return Err(Error::WriteConflict);
                }
                MvccKey::Version(..) => {}
                other => return Err(Error::Internal(format!("unexpected key {:?}", other))),
            }
        }

        engine.set(
            MvccKey::TxnWrite(self.state.version, key.clone()).encode()?,
            vec![],
        )?;
        engine.set(
            MvccKey::Version(key, self.state.version).encode()?,
            bincode::serialize(&value)?,
        )
    }

    fn scan_active(engine: &mut MutexGuard<E>) -> Result<HashSet<Version>> {
        let mut active = HashSet::new();
        let mut iter = engine.scan_prefix(MvccKeyPrefix::TxnActive.encode()?);
        while let Some((k, _)) = iter.next().transpose()? {
            match MvccKey::decode(&k)? {
                MvccKey::TxnActive(version) => active.insert(version),
                other => return Err(Error::Internal(format!("unexpected key {:?}", other))),
            };
        }
        Ok(active)
    }

    /// Returns (write marker, raw key) for every key the version wrote
    fn scan_written(
        engine: &mut MutexGuard<E>,
        version: Version,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut written = Vec::new();
        let mut iter = engine.scan_prefix(MvccKeyPrefix::TxnWrite(version).encode()?);
        while let Some((marker, _)) = iter.next().transpose()? {
            match MvccKey::decode(&marker)? {
                MvccKey::TxnWrite(_, key) => written.push((marker, key)),
                other => return Err(Error::Internal(format!("unexpected key {:?}", other))),
            }
        }
        Ok(written)
    }
}
