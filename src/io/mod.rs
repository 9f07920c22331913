use log::trace;

use raw::{raw_read_block, raw_write_block};

use crate::consts::BlockPointer;
use crate::driver::DeviceDriver;
use crate::util::error::FsError;

mod raw;

/// Block-granular view of the device: read/write of whole `block_size`
/// chunks, addressed by block id in `0..block_count`.
pub(crate) struct IO<D: DeviceDriver> {
    device: D,
    block_size: usize,
    block_count: u32,
}

impl<D: DeviceDriver> IO<D> {
    pub fn new(device: D, block_size: usize) -> IO<D> {
        if block_size < device.get_sector_size() {
            panic!("Block size must be greater than or equal to sector size");
        }
        if block_size % device.get_sector_size() != 0 {
            panic!("Block size must be a multiple of sector size");
        }

        let bytes = device.get_sector_count() * device.get_sector_size() as u64;
        let block_count = (bytes / block_size as u64) as u32;
        IO { device, block_size, block_count }
    }

    pub fn get_block_size(&self) -> usize {
        self.block_size
    }

    pub fn get_block_count(&self) -> u32 {
        self.block_count
    }

    pub fn read_block(&self, index: BlockPointer) -> Result<Vec<u8>, FsError> {
        if index >= self.block_count {
            panic!("Block index out of range");
        }
        trace!("read block {index}");
        Ok(raw_read_block(&self.device, self.block_size, index)?)
    }

    pub fn write_block(&mut self, index: BlockPointer, block: &[u8]) -> Result<(), FsError> {
        if block.len() != self.block_size {
            panic!("Block size mismatch");
        }
        if index >= self.block_count {
            panic!("Block index out of range");
        }
        trace!("write block {index}");
        Ok(raw_write_block(&mut self.device, self.block_size, index, block)?)
    }
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;

    use super::IO;
    use crate::driver::file_drive::FileDrive;

    #[test]
    fn read_write() {
        let path = env::temp_dir().join("sfs_io_read_write.img");
        {
            let drive = FileDrive::create(&path, 1024, 512).unwrap();
            let mut io = IO::new(drive, 1024);
            assert_eq!(io.get_block_count(), 512);

            let block = vec![42; 1024];
            io.write_block(0, &block).unwrap();
            assert_eq!(io.read_block(0).unwrap(), block);
        }
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn read_write_multi_sector_block() {
        let path = env::temp_dir().join("sfs_io_multi_sector.img");
        {
            let drive = FileDrive::create(&path, 1024, 512).unwrap();
            let mut io = IO::new(drive, 4096);

            let block1 = vec![0x42; 4096];
            io.write_block(3, &block1).unwrap();
            assert_eq!(io.read_block(3).unwrap(), block1);

            let block2 = vec![0x1; 4096];
            io.write_block(4, &block2).unwrap();
            assert_eq!(io.read_block(4).unwrap(), block2);

            let block3 = vec![0x8; 4096];
            io.write_block(3, &block3).unwrap();
            assert_eq!(io.read_block(3).unwrap(), block3);
            assert_eq!(io.read_block(4).unwrap(), block2);
        }
        fs::remove_file(&path).unwrap();
    }

    #[test]
    #[should_panic(expected = "Block size mismatch")]
    fn rejects_wrong_block_size() {
        let path = env::temp_dir().join("sfs_io_wrong_size.img");
        let drive = FileDrive::create(&path, 64, 512).unwrap();
        let mut io = IO::new(drive, 4096);
        let _ = io.write_block(0, &[0u8; 100]);
    }
}
