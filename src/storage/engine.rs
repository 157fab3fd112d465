use std::ops::RangeBounds;

use crate::{error::Result, storage::keycode};

/// Byte-level key/value storage
///
/// Different from sql::engine::Engine which operates on tables.
pub trait Engine {
    type EngineIterator<'a>: EngineIterator
    where
        Self: 'a;

    fn set(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<()>;
    fn get(&mut self, key: Vec<u8>) -> Result<Option<Vec<u8>>>;
    fn delete(&mut self, key: Vec<u8>) -> Result<()>;
    fn scan(&mut self, range: impl RangeBounds<Vec<u8>>) -> Self::EngineIterator<'_>;

    /// Scans every key starting with `prefix`, in key order
    fn scan_prefix(&mut self, prefix: Vec<u8>) -> Self::EngineIterator<'_> {
        self.scan(keycode::prefix_range(&prefix))
    }
}

/// Storage engine iterator, traversable from both ends
pub trait EngineIterator: DoubleEndedIterator<Item = Result<(Vec<u8>, Vec<u8>)>> {}

#[cfg(test)]
mod tests {
    use super::Engine;
    use crate::{
        error::Result,
        storage::{disk::DiskEngine, memory::MemoryEngine},
    };
    use std::ops::Bound;

    fn test_point_opt(mut eng: impl Engine) -> Result<()> {
        assert_eq!(eng.get(b"missing".to_vec())?, None);

        eng.set(b"alice".to_vec(), vec![23])?;
        assert_eq!(eng.get(b"alice".to_vec())?, Some(vec![23]));

        eng.set(b"alice".to_vec(), vec![24])?;
        assert_eq!(eng.get(b"alice".to_vec())?, Some(vec![24]));

        eng.delete(b"alice".to_vec())?;
        assert_eq!(eng.get(b"alice".to_vec())?, None);

        eng.set(b"".to_vec(), vec![])?;
        assert_eq!(eng.get(b"".to_vec())?, Some(vec![]));
        Ok(())
    }

    fn test_scan(mut eng: impl Engine) -> Result<()> {
        eng.set(b"bob".to_vec(), b"25".to_vec())?;
        eng.set(b"alice".to_vec(), b"23".to_vec())?;
        eng.set(b"charlie".to_vec(), b"12".to_vec())?;
        eng.set(b"dave".to_vec(), b"40".to_vec())?;

        let range = (Bound::Included(b"b".to_vec()), Bound::Excluded(b"d".to_vec()));
        let keys = eng
            .scan(range)
            .map(|r| r.map(|(k, _)| k))
            .collect::<Result<Vec<_>>>()?;
        assert_eq!(keys, vec![b"bob".to_vec(), b"charlie".to_vec()]);

        let mut iter = eng.scan(..);
        let (last, value) = iter.next_back().transpose()?.expect("no last key");
        assert_eq!(last, b"dave".to_vec());
        assert_eq!(value, b"40".to_vec());
        Ok(())
    }

    fn test_scan_prefix(mut eng: impl Engine) -> Result<()> {
        eng.set(b"book/1".to_vec(), b"Book 1".to_vec())?;
        eng.set(b"book/2".to_vec(), b"Book 2".to_vec())?;
        eng.set(b"bookmark".to_vec(), b"x".to_vec())?;
        eng.set(b"person/1".to_vec(), b"Alice".to_vec())?;

        let keys = eng
            .scan_prefix(b"book/".to_vec())
            .map(|r| r.map(|(k, _)| k))
            .collect::<Result<Vec<_>>>()?;
        assert_eq!(keys, vec![b"book/1".to_vec(), b"book/2".to_vec()]);
        Ok(())
    }

    #[test]
    fn test_memory() -> Result<()> {
        test_point_opt(MemoryEngine::new())?;
        test_scan(MemoryEngine::new())?;
        test_scan_prefix(MemoryEngine::new())?;
        Ok(())
    }

    #[test]
    fn test_disk() -> Result<()> {
        let dir = tempfile::tempdir()?;
        test_point_opt(DiskEngine::open(dir.path().join("point.log"))?)?;
        test_scan(DiskEngine::open(dir.path().join("scan.log"))?)?;
        test_scan_prefix(DiskEngine::open(dir.path().join("prefix.log"))?)?;
        Ok(())
    }
}
