use std::io;

use crate::consts::BlockPointer;
use crate::driver::DeviceDriver;

/// A filesystem block is `block_size / sector_size` consecutive sectors.

pub(crate) fn raw_read_block<D: DeviceDriver>(
    drive: &D,
    block_size: usize,
    index: BlockPointer,
) -> io::Result<Vec<u8>> {
    let sector_size = drive.get_sector_size();
    let ratio = (block_size / sector_size) as u64;
    let start = index as u64 * ratio;

    let mut buffer = vec![0u8; block_size];
    for i in 0..ratio {
        let offset = i as usize * sector_size;
        drive.read_sector(start + i, &mut buffer[offset..offset + sector_size])?;
    }
    Ok(buffer)
}

pub(crate) fn raw_write_block<D: DeviceDriver>(
    drive: &mut D,
    block_size: usize,
    index: BlockPointer,
    data: &[u8],
) -> io::Result<()> {
    let sector_size = drive.get_sector_size();
    let ratio = (block_size / sector_size) as u64;
    let start = index as u64 * ratio;

    for i in 0..ratio {
        let offset = i as usize * sector_size;
        drive.write_sector(start + i, &data[offset..offset + sector_size])?;
    }
    Ok(())
}
