use crate::consts::{BlockPointer, INODES_PER_BLOCK, INODE_SIZE, Inumber};
use crate::driver::DeviceDriver;
use crate::io::IO;
use crate::structure::inode::Inode;
use crate::util::error::FsError;

/// The inode region: blocks `1..=block_count`, each packed with
/// `INODES_PER_BLOCK` records. Inumber 0 is reserved.
#[derive(Debug, Clone, Copy)]
pub struct InodeTable {
    pub block_count: u32,
    pub inode_count: u32,
}

impl InodeTable {
    pub fn new(block_count: u32, inode_count: u32) -> InodeTable {
        InodeTable { block_count, inode_count }
    }

    /// Disk block holding `inumber`.
    #[inline]
    pub fn inode_block(inumber: Inumber) -> BlockPointer {
        1 + inumber / INODES_PER_BLOCK as u32
    }

    /// Byte offset of `inumber` within its block.
    #[inline]
    pub fn inode_offset(inumber: Inumber) -> usize {
        (inumber as usize % INODES_PER_BLOCK) * INODE_SIZE
    }

    pub fn contains(&self, inumber: Inumber) -> bool {
        inumber != 0 && inumber < self.inode_count
    }

    pub fn read_inode<D: DeviceDriver>(
        &self,
        io: &IO<D>,
        inumber: Inumber,
    ) -> Result<Inode, FsError> {
        let block = io.read_block(Self::inode_block(inumber))?;
        let offset = Self::inode_offset(inumber);
        Ok(Inode::from_bytes(&block[offset..offset + INODE_SIZE]))
    }

    /// Read-modify-write of the record's containing block.
    pub fn write_inode<D: DeviceDriver>(
        &self,
        io: &mut IO<D>,
        inumber: Inumber,
        inode: &Inode,
    ) -> Result<(), FsError> {
        let block_id = Self::inode_block(inumber);
        let mut block = io.read_block(block_id)?;
        let offset = Self::inode_offset(inumber);
        block[offset..offset + INODE_SIZE].copy_from_slice(&inode.to_bytes());
        io.write_block(block_id, &block)
    }
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;

    use super::InodeTable;
    use crate::consts::BLOCK_SIZE;
    use crate::driver::file_drive::FileDrive;
    use crate::io::IO;
    use crate::structure::inode::Inode;

    #[test]
    fn inumber_decomposition() {
        assert_eq!(InodeTable::inode_block(0), 1);
        assert_eq!(InodeTable::inode_offset(0), 0);
        assert_eq!(InodeTable::inode_block(1), 1);
        assert_eq!(InodeTable::inode_offset(1), 32);
        assert_eq!(InodeTable::inode_block(127), 1);
        assert_eq!(InodeTable::inode_offset(127), 127 * 32);
        assert_eq!(InodeTable::inode_block(128), 2);
        assert_eq!(InodeTable::inode_offset(128), 0);
    }

    #[test]
    fn contains_rejects_reserved_and_out_of_range() {
        let table = InodeTable::new(2, 256);
        assert!(!table.contains(0));
        assert!(table.contains(1));
        assert!(table.contains(255));
        assert!(!table.contains(256));
    }

    #[test]
    fn read_write_records() {
        let path = env::temp_dir().join("sfs_inode_table_round_trip.img");
        {
            let drive = FileDrive::create(&path, 160, 512).unwrap();
            let mut io = IO::new(drive, BLOCK_SIZE);
            let table = InodeTable::new(2, 256);

            let first = Inode { valid: true, size: 42, direct: [5, 0, 0, 0, 0], indirect: 0 };
            let second = Inode { valid: true, size: 9000, direct: [6, 7, 8, 0, 0], indirect: 11 };
            table.write_inode(&mut io, 5, &first).unwrap();
            table.write_inode(&mut io, 130, &second).unwrap();

            assert_eq!(table.read_inode(&io, 5).unwrap(), first);
            assert_eq!(table.read_inode(&io, 130).unwrap(), second);
            // neighbours stay untouched
            assert_eq!(table.read_inode(&io, 4).unwrap(), Inode::default());
            assert_eq!(table.read_inode(&io, 131).unwrap(), Inode::default());
        }
        fs::remove_file(&path).unwrap();
    }
}
