use std::fs::{File, OpenOptions};
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::{EmuError, Result};

/// Backing storage for a disk pack: a flat, seekable run of sectors.
pub trait DiskImage: Read + Write + Seek + Send {}

impl<T: Read + Write + Seek + Send> DiskImage for T {}

/// Open an existing image for reading and writing. A missing image is fatal,
/// never silently created.
pub fn open_image(path: impl AsRef<Path>) -> Result<File> {
    let path = path.as_ref();
    OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|source| EmuError::Open{path: path.to_path_buf(), source})
}

////////////////////////////////////////////////////////////////////////////////

/// A shared in-memory image. Clones see the same bytes, so a test can keep
/// one handle while the controller owns another.
#[derive(Clone, Default)]
pub struct MemImage {
    inner: Arc<Mutex<Cursor<Vec<u8>>>>,
}

impl MemImage {
    pub fn new(data: Vec<u8>) -> Self {
        MemImage {
            inner: Arc::new(Mutex::new(Cursor::new(data))),
        }
    }

    pub fn zeroed(len: usize) -> Self {
        Self::new(vec![0; len])
    }

    fn lock(&self) -> MutexGuard<'_, Cursor<Vec<u8>>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn contents(&self) -> Vec<u8> {
        self.lock().get_ref().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().get_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn read_bytes(&self, offset: usize, len: usize) -> Vec<u8> {
        let cursor = self.lock();
        let data = cursor.get_ref();
        let end = (offset + len).min(data.len());
        data.get(offset..end).map(<[u8]>::to_vec).unwrap_or_default()
    }

    pub fn write_bytes(&self, offset: usize, bytes: &[u8]) {
        let mut cursor = self.lock();
        let data = cursor.get_mut();
        if data.len() < offset + bytes.len() {
            data.resize(offset + bytes.len(), 0);
        }
        data[offset..offset + bytes.len()].copy_from_slice(bytes);
    }
}

impl Read for MemImage {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.lock().read(buf)
    }
}

impl Write for MemImage {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for MemImage {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.lock().seek(pos)
    }
}
