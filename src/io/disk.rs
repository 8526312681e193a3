use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

pub const BLOCK_SIZE: usize = 64;
pub const TOTAL_BLOCKS: usize = 16;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DiskError {
    #[error("file {0} already exists")]
    AlreadyExists(String),

    #[error("not enough contiguous space for {name} ({blocks} blocks)")]
    NoSpace { name: String, blocks: usize },

    #[error("file {0} not found")]
    NotFound(String),

    #[error("file {0} is not open")]
    NotOpen(String),

    #[error("{len} bytes do not fit in {name} ({capacity} bytes reserved)")]
    TooLarge { name: String, len: usize, capacity: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDescriptor {
    pub name: String,
    pub size: usize,
    pub start_block: usize,
    pub block_count: usize,
    pub is_open: bool,
}

impl FileDescriptor {
    pub fn capacity(&self) -> usize {
        self.block_count * BLOCK_SIZE
    }
}

/// A small simulated disk: fixed-size blocks, each file stored in one
/// contiguous run of them.
pub struct Disk {
    blocks: Vec<[u8; BLOCK_SIZE]>,
    used: Vec<bool>,
    file_table: HashMap<String, FileDescriptor>,
}

impl Disk {
    pub fn new() -> Disk {
        Disk::with_blocks(TOTAL_BLOCKS)
    }

    pub fn with_blocks(total_blocks: usize) -> Disk {
        Disk {
            blocks: vec![[0; BLOCK_SIZE]; total_blocks],
            used: vec![false; total_blocks],
            file_table: HashMap::new(),
        }
    }

    pub fn free_blocks(&self) -> usize {
        self.used.iter().filter(|used| !**used).count()
    }

    pub fn create_file(&mut self, name: &str, size: usize) -> Result<&FileDescriptor, DiskError> {
        if self.file_table.contains_key(name) {
            return Err(DiskError::AlreadyExists(name.to_string()));
        }

        let block_count = size.div_ceil(BLOCK_SIZE);
        let start_block = self.find_contiguous(block_count).ok_or_else(|| DiskError::NoSpace {
            name: name.to_string(),
            blocks: block_count,
        })?;

        self.used[start_block..start_block + block_count].fill(true);
        debug!(name, size, start_block, block_count, "file created");

        let descriptor = FileDescriptor {
            name: name.to_string(),
            size,
            start_block,
            block_count,
            is_open: false,
        };
        Ok(self.file_table.entry(name.to_string()).or_insert(descriptor))
    }

    /// First run of `count` free blocks.
    fn find_contiguous(&self, count: usize) -> Option<usize> {
        if count == 0 {
            return Some(0);
        }
        if count > self.used.len() {
            return None;
        }
        (0..=self.used.len() - count)
            .find(|&start| self.used[start..start + count].iter().all(|used| !used))
    }

    pub fn open_file(&mut self, name: &str) -> Result<(), DiskError> {
        self.descriptor_mut(name)?.is_open = true;
        Ok(())
    }

    pub fn close_file(&mut self, name: &str) -> Result<(), DiskError> {
        self.descriptor_mut(name)?.is_open = false;
        Ok(())
    }

    pub fn write_file(&mut self, name: &str, data: &[u8]) -> Result<(), DiskError> {
        let descriptor = self.open_descriptor(name)?;
        if data.len() > descriptor.capacity() {
            return Err(DiskError::TooLarge {
                name: name.to_string(),
                len: data.len(),
                capacity: descriptor.capacity(),
            });
        }

        let start_block = descriptor.start_block;
        for (offset, chunk) in data.chunks(BLOCK_SIZE).enumerate() {
            self.blocks[start_block + offset][..chunk.len()].copy_from_slice(chunk);
        }

        debug!(name, len = data.len(), "file written");
        Ok(())
    }

    /// Reads back the file's declared size.
    pub fn read_file(&self, name: &str) -> Result<Vec<u8>, DiskError> {
        let descriptor = self.open_descriptor(name)?;

        let mut data = Vec::with_capacity(descriptor.size);
        let end = descriptor.start_block + descriptor.block_count;
        for block in &self.blocks[descriptor.start_block..end] {
            let take = (descriptor.size - data.len()).min(BLOCK_SIZE);
            data.extend_from_slice(&block[..take]);
        }
        Ok(data)
    }

    pub fn delete_file(&mut self, name: &str) -> Result<FileDescriptor, DiskError> {
        let descriptor = self
            .file_table
            .remove(name)
            .ok_or_else(|| DiskError::NotFound(name.to_string()))?;

        let range = descriptor.start_block..descriptor.start_block + descriptor.block_count;
        self.used[range.clone()].fill(false);
        for block in &mut self.blocks[range] {
            block.fill(0);
        }
        Ok(descriptor)
    }

    /// Descriptors sorted by name.
    pub fn list_files(&self) -> Vec<&FileDescriptor> {
        let mut files: Vec<&FileDescriptor> = self.file_table.values().collect();
        files.sort_by(|a, b| a.name.cmp(&b.name));
        files
    }

    fn descriptor_mut(&mut self, name: &str) -> Result<&mut FileDescriptor, DiskError> {
        self.file_table
            .get_mut(name)
            .ok_or_else(|| DiskError::NotFound(name.to_string()))
    }

    fn open_descriptor(&self, name: &str) -> Result<&FileDescriptor, DiskError> {
        let descriptor = self
            .file_table
            .get(name)
            .ok_or_else(|| DiskError::NotFound(name.to_string()))?;
        if !descriptor.is_open {
            return Err(DiskError::NotOpen(name.to_string()));
        }
        Ok(descriptor)
    }
}

impl Default for Disk {
    fn default() -> Self {
        Disk::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disk_create_reserves_contiguous_blocks() {
        let mut disk = Disk::new();
        let first = disk.create_file("a.txt", 100).unwrap().clone();
        assert_eq!((first.start_block, first.block_count), (0, 2));

        let second = disk.create_file("b.txt", 64).unwrap().clone();
        assert_eq!((second.start_block, second.block_count), (2, 1));
        assert_eq!(disk.free_blocks(), TOTAL_BLOCKS - 3);
    }

    #[test]
    fn test_disk_duplicate_name() {
        let mut disk = Disk::new();
        disk.create_file("a.txt", 10).unwrap();
        assert_eq!(
            disk.create_file("a.txt", 10).unwrap_err(),
            DiskError::AlreadyExists("a.txt".to_string())
        );
    }

    #[test]
    fn test_disk_out_of_space() {
        let mut disk = Disk::new();
        disk.create_file("big", BLOCK_SIZE * (TOTAL_BLOCKS - 1)).unwrap();
        assert!(matches!(
            disk.create_file("two", BLOCK_SIZE * 2),
            Err(DiskError::NoSpace { blocks: 2, .. })
        ));
        disk.create_file("one", BLOCK_SIZE).unwrap();
    }

    #[test]
    fn test_disk_write_then_read() {
        let mut disk = Disk::new();
        disk.create_file("log", 100).unwrap();
        disk.open_file("log").unwrap();

        let data: Vec<u8> = (0..100).collect();
        disk.write_file("log", &data).unwrap();
        assert_eq!(disk.read_file("log").unwrap(), data);
    }

    #[test]
    fn test_disk_requires_open_file() {
        let mut disk = Disk::new();
        disk.create_file("log", 10).unwrap();

        assert_eq!(
            disk.write_file("log", b"hi").unwrap_err(),
            DiskError::NotOpen("log".to_string())
        );
        disk.open_file("log").unwrap();
        disk.write_file("log", b"hi").unwrap();
        disk.close_file("log").unwrap();
        assert_eq!(
            disk.read_file("log").unwrap_err(),
            DiskError::NotOpen("log".to_string())
        );
    }

    #[test]
    fn test_disk_rejects_oversized_write() {
        let mut disk = Disk::new();
        disk.create_file("small", 10).unwrap();
        disk.open_file("small").unwrap();

        let err = disk.write_file("small", &[1; BLOCK_SIZE + 1]).unwrap_err();
        assert_eq!(
            err,
            DiskError::TooLarge {
                name: "small".to_string(),
                len: BLOCK_SIZE + 1,
                capacity: BLOCK_SIZE,
            }
        );
    }

    #[test]
    fn test_disk_missing_file() {
        let mut disk = Disk::new();
        assert_eq!(disk.open_file("nope").unwrap_err(), DiskError::NotFound("nope".to_string()));
        assert!(disk.read_file("nope").is_err());
    }

    #[test]
    fn test_disk_delete_frees_blocks_for_reuse() {
        let mut disk = Disk::with_blocks(4);
        disk.create_file("a", BLOCK_SIZE * 2).unwrap();
        disk.create_file("b", BLOCK_SIZE * 2).unwrap();
        assert!(disk.create_file("c", 1).is_err());

        disk.delete_file("a").unwrap();
        let c = disk.create_file("c", BLOCK_SIZE).unwrap();
        assert_eq!(c.start_block, 0);
    }

    #[test]
    fn test_disk_list_files_sorted() {
        let mut disk = Disk::new();
        disk.create_file("zeta", 1).unwrap();
        disk.create_file("alpha", 1).unwrap();
        disk.open_file("zeta").unwrap();

        let names: Vec<(&str, bool)> = disk
            .list_files()
            .into_iter()
            .map(|fd| (fd.name.as_str(), fd.is_open))
            .collect();
        assert_eq!(names, vec![("alpha", false), ("zeta", true)]);
    }
}
