use std::{
    collections::{BTreeMap, btree_map},
    fs::{File, OpenOptions},
    io::{BufReader, BufWriter, ErrorKind, Read, Seek, SeekFrom, Write},
    ops::RangeBounds,
    path::PathBuf,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    error::{Error, Result},
    storage::engine::{Engine, EngineIterator},
};

/// One record in the log file
#[derive(Debug, Serialize, Deserialize)]
enum LogEntry {
    Put {
        #[serde(with = "serde_bytes")]
        key: Vec<u8>,
        #[serde(with = "serde_bytes")]
        value: Vec<u8>,
    },
    /// Tombstone
    Delete {
        #[serde(with = "serde_bytes")]
        key: Vec<u8>,
    },
}

/// Key directory: key -> (entry offset, entry length) of its latest `Put`
type KeyDir = BTreeMap<Vec<u8>, (u64, u32)>;

/// Append-only log storage engine, the backend behind `file://` stores
///
/// Every write appends a bincode-encoded [`LogEntry`] behind a little-endian
/// `u32` length prefix. The in-memory key directory points at the latest
/// entry of each live key and is rebuilt from the log on open.
pub struct DiskEngine {
    keydir: KeyDir,
    log: Log,
}

impl DiskEngine {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let mut log = Log::open(path.into())?;
        let keydir = log.build_keydir()?;
        debug!(path = %log.path.display(), keys = keydir.len(), "opened disk engine");
        Ok(Self { keydir, log })
    }
}

impl Engine for DiskEngine {
    type EngineIterator<'a> = DiskEngineIterator<'a>;

    fn set(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        let entry = LogEntry::Put { key, value };
        let location = self.log.write_entry(&entry)?;
        if let LogEntry::Put { key, .. } = entry {
            self.keydir.insert(key, location);
        }
        Ok(())
    }

    fn get(&mut self, key: Vec<u8>) -> Result<Option<Vec<u8>>> {
        match self.keydir.get(&key) {
            Some((offset, len)) => Ok(Some(self.log.read_value(*offset, *len)?)),
            None => Ok(None),
        }
    }

    fn delete(&mut self, key: Vec<u8>) -> Result<()> {
        if self.keydir.remove(&key).is_some() {
            self.log.write_entry(&LogEntry::Delete { key })?;
        }
        Ok(())
    }

    fn scan(&mut self, range: impl RangeBounds<Vec<u8>>) -> Self::EngineIterator<'_> {
        DiskEngineIterator {
            inner: self.keydir.range(range),
            log: &mut self.log,
        }
    }
}

pub struct DiskEngineIterator<'a> {
    inner: btree_map::Range<'a, Vec<u8>, (u64, u32)>,
    log: &'a mut Log,
}

impl DiskEngineIterator<'_> {
    fn load(&mut self, key: &[u8], offset: u64, len: u32) -> Result<(Vec<u8>, Vec<u8>)> {
        Ok((key.to_vec(), self.log.read_value(offset, len)?))
    }
}

impl EngineIterator for DiskEngineIterator<'_> {}

impl Iterator for DiskEngineIterator<'_> {
    type Item = Result<(Vec<u8>, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        let (key, (offset, len)) = self.inner.next()?;
        Some(self.load(key, *offset, *len))
    }
}

impl DoubleEndedIterator for DiskEngineIterator<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let (key, (offset, len)) = self.inner.next_back()?;
        Some(self.load(key, *offset, *len))
    }
}

struct Log {
    path: PathBuf,
    file: File,
}

impl Log {
    fn open(path: PathBuf) -> Result<Self> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        Ok(Self { path, file })
    }

    /// Replays the log into a key directory. A torn entry at the tail is
    /// truncated away.
    fn build_keydir(&mut self) -> Result<KeyDir> {
        let mut keydir = KeyDir::new();
        let mut reader = BufReader::new(&mut self.file);
        let mut pos = reader.seek(SeekFrom::Start(0))?;

        loop {
            let mut length_bytes = [0u8; 4];
            let data = reader.read_exact(&mut length_bytes).and_then(|_| {
                let mut data = vec![0u8; u32::from_le_bytes(length_bytes) as usize];
                reader.read_exact(&mut data)?;
                Ok(data)
            });
            let data = match data {
                Ok(data) => data,
                Err(err) if err.kind() == ErrorKind::UnexpectedEof => break,
                Err(err) => return Err(err.into()),
            };

            let len = data.len() as u32;
            match bincode::deserialize::<LogEntry>(&data)? {
                LogEntry::Put { key, .. } => keydir.insert(key, (pos, len)),
                LogEntry::Delete { key } => keydir.remove(&key),
            };
            pos += 4 + len as u64;
        }

        drop(reader);
        if self.file.metadata()?.len() > pos {
            warn!(path = %self.path.display(), offset = pos, "truncating incomplete log entry");
            self.file.set_len(pos)?;
        }
        Ok(keydir)
    }

    /// Reads back the value of the `Put` entry at `offset`
    fn read_value(&mut self, offset: u64, len: u32) -> Result<Vec<u8>> {
        let mut data = vec![0; len as usize];
        self.file.seek(SeekFrom::Start(offset + 4))?;
        self.file.read_exact(&mut data)?;
        match bincode::deserialize::<LogEntry>(&data)? {
            LogEntry::Put { value, .. } => Ok(value),
            LogEntry::Delete { .. } => Err(Error::Internal(format!(
                "log entry at offset {} is a tombstone",
                offset
            ))),
        }
    }

    /// Appends an entry, returning its offset and length
    fn write_entry(&mut self, entry: &LogEntry) -> Result<(u64, u32)> {
        let data = bincode::serialize(entry)?;
        let len = u32::try_from(data.len())
            .map_err(|_| Error::Internal(format!("log entry of {} bytes is too large", data.len())))?;
        let pos = self.file.seek(SeekFrom::End(0))?;

        let mut writer = BufWriter::new(&mut self.file);
        writer.write_all(&len.to_le_bytes())?;
        writer.write_all(&data)?;
        writer.flush()?;
        Ok((pos, len))
    }
}
