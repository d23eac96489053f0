//! Image storage for uploaded firmware and dumps

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

/// Name of the uploaded firmware image
pub const FIRMWARE_IMAGE: &str = "firmware.bin";
/// Name of the image a dump job produces
pub const DUMP_IMAGE: &str = "dump.bin";

/// Named byte images
///
/// Jobs only ever use [`FIRMWARE_IMAGE`] and [`DUMP_IMAGE`].
pub trait ImageStore: Send + Sync {
    /// Whether an image exists
    fn exists(&self, name: &str) -> bool;

    /// Read a whole image
    fn read(&self, name: &str) -> io::Result<Vec<u8>>;

    /// Create (or truncate) an image for incremental writing
    fn create(&self, name: &str) -> io::Result<Box<dyn Write + Send>>;

    /// Remove an image
    fn remove(&self, name: &str) -> io::Result<()>;

    /// Replace an image with `data`
    fn store(&self, name: &str, data: &[u8]) -> io::Result<()> {
        let mut writer = self.create(name)?;
        writer.write_all(data)?;
        writer.flush()
    }
}

/// Images kept as files in one directory
#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    /// Use `root`, creating it if needed
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Directory the images live in
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of an image
    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl ImageStore for DirStore {
    fn exists(&self, name: &str) -> bool {
        self.path(name).is_file()
    }

    fn read(&self, name: &str) -> io::Result<Vec<u8>> {
        fs::read(self.path(name))
    }

    fn create(&self, name: &str) -> io::Result<Box<dyn Write + Send>> {
        let file = File::create(self.path(name))?;
        Ok(Box::new(BufWriter::new(file)))
    }

    fn remove(&self, name: &str) -> io::Result<()> {
        fs::remove_file(self.path(name))
    }
}

type ImageMap = Arc<Mutex<HashMap<String, Vec<u8>>>>;

/// Images kept in memory; clones share the same images
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    images: ImageMap,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of an image, if present
    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.images.lock().get(name).cloned()
    }
}

struct MemoryWriter {
    images: ImageMap,
    name: String,
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.images
            .lock()
            .entry(self.name.clone())
            .or_default()
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ImageStore for MemoryStore {
    fn exists(&self, name: &str) -> bool {
        self.images.lock().contains_key(name)
    }

    fn read(&self, name: &str) -> io::Result<Vec<u8>> {
        self.get(name)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, name.to_string()))
    }

    fn create(&self, name: &str) -> io::Result<Box<dyn Write + Send>> {
        self.images.lock().insert(name.to_string(), Vec::new());
        Ok(Box::new(MemoryWriter {
            images: self.images.clone(),
            name: name.to_string(),
        }))
    }

    fn remove(&self, name: &str) -> io::Result<()> {
        match self.images.lock().remove(name) {
            Some(_) => Ok(()),
            None => Err(io::Error::new(io::ErrorKind::NotFound, name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_incremental_write() {
        let store = MemoryStore::new();
        let mut writer = store.create(DUMP_IMAGE).unwrap();
        writer.write_all(&[1, 2]).unwrap();
        assert_eq!(store.get(DUMP_IMAGE), Some(vec![1, 2]));
        writer.write_all(&[3]).unwrap();
        drop(writer);
        assert_eq!(store.read(DUMP_IMAGE).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_memory_store_create_truncates_and_remove() {
        let store = MemoryStore::new();
        store.store(FIRMWARE_IMAGE, &[0xAA; 4]).unwrap();
        store.store(FIRMWARE_IMAGE, &[0xBB]).unwrap();
        assert_eq!(store.get(FIRMWARE_IMAGE), Some(vec![0xBB]));

        store.remove(FIRMWARE_IMAGE).unwrap();
        assert!(!store.exists(FIRMWARE_IMAGE));
        assert_eq!(
            store.remove(FIRMWARE_IMAGE).unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
    }

    #[test]
    fn test_dir_store_roundtrip() {
        let root = std::env::temp_dir().join(format!("ccflasher-store-{}", std::process::id()));
        let store = DirStore::new(&root).unwrap();
        assert!(!store.exists(FIRMWARE_IMAGE));

        store.store(FIRMWARE_IMAGE, &[1, 2, 3]).unwrap();
        assert!(store.exists(FIRMWARE_IMAGE));
        assert_eq!(store.read(FIRMWARE_IMAGE).unwrap(), vec![1, 2, 3]);

        store.remove(FIRMWARE_IMAGE).unwrap();
        assert!(!store.exists(FIRMWARE_IMAGE));
        fs::remove_dir_all(&root).unwrap();
    }
}
