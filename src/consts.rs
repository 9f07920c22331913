pub(crate) const BLOCK_SIZE: usize = 4096;
pub(crate) const MAGIC: u32 = 0xf0f03410;

pub(crate) const POINTERS_PER_INODE: usize = 5;
pub(crate) const POINTERS_PER_BLOCK: usize = BLOCK_SIZE / 4;

pub(crate) const INODE_SIZE: usize = 32;
pub(crate) const INODES_PER_BLOCK: usize = BLOCK_SIZE / INODE_SIZE;

pub(crate) const MAX_FILE_BLOCKS: usize = POINTERS_PER_INODE + POINTERS_PER_BLOCK;
pub(crate) const MAX_FILE_SIZE: u32 = (MAX_FILE_BLOCKS * BLOCK_SIZE) as u32;

pub type BlockPointer = u32;
pub type Inumber = u32;
pub type DirectPointers = [BlockPointer; POINTERS_PER_INODE];

const _: () = assert!(BLOCK_SIZE % INODE_SIZE == 0);
