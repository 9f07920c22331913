use log::{debug, info, warn};

use crate::blockmap::BlockMap;
use crate::consts::{
    BLOCK_SIZE, INODES_PER_BLOCK, INODE_SIZE, Inumber, MAX_FILE_BLOCKS, MAX_FILE_SIZE,
    POINTERS_PER_BLOCK, POINTERS_PER_INODE,
};
use crate::driver::DeviceDriver;
use crate::io::IO;
use crate::structure::inode::Inode;
use crate::structure::inode_table::InodeTable;
use crate::structure::superblock::SuperBlock;
use crate::structure::{decode_pointers, encode_pointers};
use crate::util::error::FsError;
use crate::util::format::pretty_size;

/// One filesystem session over one device. Owns the mount state: the
/// superblock and the free-space bitmap live here, not in globals.
pub struct FileSystem<D: DeviceDriver> {
    io: IO<D>,
    mounted: Option<Mounted>,
}

struct Mounted {
    superblock: SuperBlock,
    inode_table: InodeTable,
    blockmap: BlockMap,
}

impl<D: DeviceDriver> FileSystem<D> {
    pub fn new(device: D) -> FileSystem<D> {
        FileSystem { io: IO::new(device, BLOCK_SIZE), mounted: None }
    }

    /// Writes an empty layout: the superblock plus zeroed inode blocks.
    /// Data blocks are left alone; they become implicitly free.
    pub fn format(&mut self) -> Result<(), FsError> {
        if self.mounted.is_some() {
            return Err(FsError::AlreadyMounted);
        }

        let superblock = SuperBlock::new(self.io.get_block_count());
        superblock.write(&mut self.io)?;
        let empty = vec![0u8; BLOCK_SIZE];
        for block_id in 1..=superblock.inode_block_count {
            self.io.write_block(block_id, &empty)?;
        }
        info!(
            "formatted {} blocks: {} inode blocks, {} inodes",
            superblock.block_count, superblock.inode_block_count, superblock.inode_count
        );
        Ok(())
    }

    /// Validates the magic number and rebuilds the bitmap by scanning the
    /// inode region. Remounting re-derives the same bitmap from the same
    /// on-disk state.
    pub fn mount(&mut self) -> Result<(), FsError> {
        let superblock = SuperBlock::read(&self.io)?;
        if superblock.block_count != self.io.get_block_count() {
            warn!(
                "superblock reports {} blocks, device has {}",
                superblock.block_count,
                self.io.get_block_count()
            );
        }

        let blockmap = BlockMap::scan(&self.io, &superblock)?;
        info!(
            "mounted: {} of {} blocks in use",
            blockmap.used_blocks(),
            superblock.block_count
        );
        let inode_table = InodeTable::new(superblock.inode_block_count, superblock.inode_count);
        self.mounted = Some(Mounted { superblock, inode_table, blockmap });
        Ok(())
    }

    /// Claims the first invalid inode slot, skipping the reserved inumber 0.
    /// No data blocks are allocated; write does that lazily.
    pub fn create(&mut self) -> Result<Inumber, FsError> {
        let mounted = self.mounted.as_mut().ok_or(FsError::NotMounted)?;

        for block_index in 0..mounted.superblock.inode_block_count {
            let block_id = 1 + block_index;
            let mut block = self.io.read_block(block_id)?;
            for slot in 0..INODES_PER_BLOCK {
                let inumber = block_index * INODES_PER_BLOCK as u32 + slot as u32;
                if inumber == 0 {
                    continue;
                }
                let offset = slot * INODE_SIZE;
                if Inode::from_bytes(&block[offset..offset + INODE_SIZE]).valid {
                    continue;
                }

                block[offset..offset + INODE_SIZE].copy_from_slice(&Inode::fresh().to_bytes());
                self.io.write_block(block_id, &block)?;
                mounted.blockmap.mark_used(block_id);
                debug!("created inode {inumber}");
                return Ok(inumber);
            }
        }
        Err(FsError::InodeFull)
    }

    /// Frees every block the inode references (the indirect block included),
    /// then invalidates the record. Deleting an already-invalid inode is a
    /// no-op.
    pub fn delete(&mut self, inumber: Inumber) -> Result<(), FsError> {
        let mounted = self.mounted.as_mut().ok_or(FsError::NotMounted)?;
        if !mounted.inode_table.contains(inumber) {
            return Err(FsError::InvalidInumber { inumber });
        }

        let block_id = InodeTable::inode_block(inumber);
        if !mounted.blockmap.is_used(block_id) {
            return Ok(());
        }

        let mut block = self.io.read_block(block_id)?;
        let offset = InodeTable::inode_offset(inumber);
        let inode = Inode::from_bytes(&block[offset..offset + INODE_SIZE]);
        if !inode.valid {
            return Ok(());
        }

        for &pointer in inode.direct.iter().filter(|&&pointer| pointer != 0) {
            mounted.blockmap.mark_free(pointer);
        }
        if inode.indirect != 0 {
            let indirect = self.io.read_block(inode.indirect)?;
            for pointer in decode_pointers(&indirect) {
                if pointer != 0 {
                    mounted.blockmap.mark_free(pointer);
                }
            }
            mounted.blockmap.mark_free(inode.indirect);
        }

        block[offset..offset + INODE_SIZE].copy_from_slice(&Inode::default().to_bytes());
        self.io.write_block(block_id, &block)?;

        // Drop the inode block itself once its last valid inode is gone.
        let any_valid = (0..INODES_PER_BLOCK)
            .any(|slot| Inode::from_bytes(&block[slot * INODE_SIZE..(slot + 1) * INODE_SIZE]).valid);
        if !any_valid {
            mounted.blockmap.mark_free(block_id);
        }
        debug!("deleted inode {inumber}");
        Ok(())
    }

    /// The logical byte length, regardless of how many blocks are allocated.
    pub fn getsize(&self, inumber: Inumber) -> Result<u32, FsError> {
        let mounted = self.mounted.as_ref().ok_or(FsError::NotMounted)?;
        if inumber == 0 || InodeTable::inode_block(inumber) > mounted.inode_table.block_count {
            return Err(FsError::OutOfRange { inumber });
        }

        let inode = mounted.inode_table.read_inode(&self.io, inumber)?;
        if !inode.valid {
            return Err(FsError::InvalidInode { inumber });
        }
        Ok(inode.size)
    }

    /// Copies up to `buf.len()` bytes starting at `offset` into `buf`,
    /// clamped to the file size. A pointer slot of 0 inside the file is a
    /// hole and reads as zeroes. Returns the number of bytes transferred.
    pub fn read(&self, inumber: Inumber, buf: &mut [u8], offset: u32) -> Result<usize, FsError> {
        let mounted = self.mounted.as_ref().ok_or(FsError::NotMounted)?;
        let inode = Self::load_valid_inode(&self.io, &mounted.inode_table, inumber)?;

        if offset >= inode.size {
            return Ok(0);
        }
        let mut remaining = buf.len().min((inode.size - offset) as usize);
        let mut indirect: Option<Vec<u32>> = None;
        let mut transferred = 0usize;
        let mut pos = offset;

        while remaining > 0 {
            let slot = pos as usize / BLOCK_SIZE;
            if slot >= MAX_FILE_BLOCKS {
                break;
            }
            let within = pos as usize % BLOCK_SIZE;
            let count = (BLOCK_SIZE - within).min(remaining);

            let pointer = if slot < POINTERS_PER_INODE {
                inode.direct[slot]
            } else if inode.indirect == 0 {
                0
            } else {
                if indirect.is_none() {
                    indirect = Some(decode_pointers(&self.io.read_block(inode.indirect)?));
                }
                indirect.as_ref().unwrap()[slot - POINTERS_PER_INODE]
            };

            let dest = &mut buf[transferred..transferred + count];
            if pointer == 0 {
                dest.fill(0);
            } else {
                let block = self.io.read_block(pointer)?;
                dest.copy_from_slice(&block[within..within + count]);
            }

            transferred += count;
            pos += count as u32;
            remaining -= count;
        }
        Ok(transferred)
    }

    /// Copies `buf` to the file starting at `offset`, allocating direct
    /// pointers, the indirect block and data blocks on demand, and growing
    /// `size` to the end of the transfer. Returns the number of bytes
    /// transferred; a short count means the disk or the pointer region ran
    /// out mid-way.
    pub fn write(&mut self, inumber: Inumber, buf: &[u8], offset: u32) -> Result<usize, FsError> {
        let mounted = self.mounted.as_mut().ok_or(FsError::NotMounted)?;
        let mut inode = Self::load_valid_inode(&self.io, &mounted.inode_table, inumber)?;

        if buf.is_empty() {
            return Ok(0);
        }
        if offset >= MAX_FILE_SIZE {
            return Err(FsError::AddressSpaceExhausted);
        }

        let had_indirect = inode.indirect != 0;
        let mut indirect: Option<Vec<u32>> = None;
        let mut indirect_dirty = false;
        let mut inode_dirty = false;
        let mut transferred = 0usize;
        let mut remaining = buf.len();
        let mut pos = offset;

        while remaining > 0 {
            let slot = pos as usize / BLOCK_SIZE;
            if slot >= MAX_FILE_BLOCKS {
                break;
            }
            let within = pos as usize % BLOCK_SIZE;
            let count = (BLOCK_SIZE - within).min(remaining);

            let pointer;
            if slot < POINTERS_PER_INODE {
                if inode.direct[slot] == 0 {
                    let Some(fresh) = mounted.blockmap.allocate() else { break };
                    inode.direct[slot] = fresh;
                    inode_dirty = true;
                }
                pointer = inode.direct[slot];
            } else {
                if inode.indirect == 0 {
                    let Some(fresh) = mounted.blockmap.allocate() else { break };
                    inode.indirect = fresh;
                    inode_dirty = true;
                    // fresh pointer blocks start out zeroed
                    indirect = Some(vec![0u32; POINTERS_PER_BLOCK]);
                    indirect_dirty = true;
                }
                if indirect.is_none() {
                    indirect = Some(decode_pointers(&self.io.read_block(inode.indirect)?));
                }
                let pointers = indirect.as_mut().unwrap();
                let islot = slot - POINTERS_PER_INODE;
                if pointers[islot] == 0 {
                    let Some(fresh) = mounted.blockmap.allocate() else { break };
                    pointers[islot] = fresh;
                    indirect_dirty = true;
                }
                pointer = pointers[islot];
            }

            // partial blocks are read-modify-written
            if count == BLOCK_SIZE {
                self.io.write_block(pointer, &buf[transferred..transferred + count])?;
            } else {
                let mut block = self.io.read_block(pointer)?;
                block[within..within + count].copy_from_slice(&buf[transferred..transferred + count]);
                self.io.write_block(pointer, &block)?;
            }

            transferred += count;
            pos += count as u32;
            remaining -= count;
        }

        if transferred == 0 {
            // nothing reached the disk; hand back a pointer block claimed in vain
            if !had_indirect && inode.indirect != 0 {
                mounted.blockmap.mark_free(inode.indirect);
            }
            return Err(FsError::AllocationExhausted);
        }

        if indirect_dirty {
            let pointers = indirect.as_ref().unwrap();
            self.io.write_block(inode.indirect, &encode_pointers(pointers))?;
        }
        let end = offset + transferred as u32;
        if end > inode.size {
            inode.size = end;
            inode_dirty = true;
        }
        if inode_dirty {
            mounted.inode_table.write_inode(&mut self.io, inumber, &inode)?;
        }
        Ok(transferred)
    }

    /// Superblock fields plus, for every valid inode, its size and the
    /// allocated block ids. Diagnostic only; changes nothing.
    pub fn debug_report(&self) -> Result<String, FsError> {
        let mounted = self.mounted.as_ref().ok_or(FsError::NotMounted)?;
        let superblock = &mounted.superblock;

        let mut out = String::new();
        out.push_str("superblock:\n");
        out.push_str(&format!("    {} blocks\n", superblock.block_count));
        out.push_str(&format!("    {} inode blocks\n", superblock.inode_block_count));
        out.push_str(&format!("    {} inodes\n", superblock.inode_count));

        for block_index in 0..superblock.inode_block_count {
            let block = self.io.read_block(1 + block_index)?;
            for slot in 0..INODES_PER_BLOCK {
                let inode = Inode::from_bytes(&block[slot * INODE_SIZE..(slot + 1) * INODE_SIZE]);
                if !inode.valid {
                    continue;
                }
                let inumber = block_index * INODES_PER_BLOCK as u32 + slot as u32;
                out.push_str(&format!("inode {}:\n", inumber));
                out.push_str(&format!(
                    "    size: {} bytes ({})\n",
                    inode.size,
                    pretty_size(inode.size as u64)
                ));

                let direct: Vec<String> = inode
                    .direct
                    .iter()
                    .filter(|&&pointer| pointer != 0)
                    .map(|pointer| pointer.to_string())
                    .collect();
                if !direct.is_empty() {
                    out.push_str(&format!("    direct blocks: {}\n", direct.join(" ")));
                }

                if inode.indirect != 0 {
                    out.push_str(&format!("    indirect block: {}\n", inode.indirect));
                    let pointers = decode_pointers(&self.io.read_block(inode.indirect)?);
                    let data: Vec<String> = pointers
                        .iter()
                        .filter(|&&pointer| pointer != 0)
                        .map(|pointer| pointer.to_string())
                        .collect();
                    if !data.is_empty() {
                        out.push_str(&format!("    indirect data blocks: {}\n", data.join(" ")));
                    }
                }
            }
        }
        Ok(out)
    }

    fn load_valid_inode(
        io: &IO<D>,
        table: &InodeTable,
        inumber: Inumber,
    ) -> Result<Inode, FsError> {
        if !table.contains(inumber) {
            return Err(FsError::InvalidInumber { inumber });
        }
        let inode = table.read_inode(io, inumber)?;
        if !inode.valid {
            return Err(FsError::InvalidInode { inumber });
        }
        Ok(inode)
    }

    #[cfg(test)]
    fn bitmap_bits(&self) -> Option<Vec<u8>> {
        self.mounted.as_ref().map(|mounted| mounted.blockmap.as_bytes().to_vec())
    }

    #[cfg(test)]
    fn used_blocks(&self) -> Option<u32> {
        self.mounted.as_ref().map(|mounted| mounted.blockmap.used_blocks())
    }
}
