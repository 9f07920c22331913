use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::FileExt;
use std::path::Path;

use crate::driver::DeviceDriver;

/// Disk emulated on top of a regular file, one sector per file chunk.
pub struct FileDrive {
    file: File,
    sector_count: u64,
    sector_size: usize,
}

impl FileDrive {
    /// Creates (or truncates) an image holding `sector_count` zeroed sectors.
    pub fn create<P: AsRef<Path>>(
        path: P,
        sector_count: u64,
        sector_size: usize,
    ) -> io::Result<FileDrive> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.set_len(sector_count * sector_size as u64)?;
        Ok(FileDrive { file, sector_count, sector_size })
    }

    /// Opens an existing image; the sector count is derived from its length.
    pub fn open<P: AsRef<Path>>(path: P, sector_size: usize) -> io::Result<FileDrive> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let bytes = file.metadata()?.len();
        Ok(FileDrive { file, sector_count: bytes / sector_size as u64, sector_size })
    }
}

impl DeviceDriver for FileDrive {
    fn get_sector_count(&self) -> u64 {
        self.sector_count
    }

    fn get_sector_size(&self) -> usize {
        self.sector_size
    }

    fn read_sector(&self, index: u64, buf: &mut [u8]) -> io::Result<()> {
        if buf.len() != self.sector_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("sector size mismatch - expected {}, got {}", self.sector_size, buf.len()),
            ));
        }
        self.file.read_exact_at(buf, index * self.sector_size as u64)
    }

    fn write_sector(&mut self, index: u64, buf: &[u8]) -> io::Result<()> {
        if buf.len() != self.sector_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("sector size mismatch - expected {}, got {}", self.sector_size, buf.len()),
            ));
        }
        self.file.write_all_at(buf, index * self.sector_size as u64)
    }
}
