use crate::consts::{BlockPointer, DirectPointers, INODE_SIZE, POINTERS_PER_INODE};

/// One 32-byte inode record. Pointer value 0 means "unused": block 0 is the
/// superblock and can never hold file data.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Inode {
    pub valid: bool,
    pub size: u32,
    pub direct: DirectPointers,
    pub indirect: BlockPointer,
}

impl Inode {
    /// A just-created inode: valid, empty, nothing allocated.
    pub fn fresh() -> Inode {
        Inode { valid: true, size: 0, direct: [0; POINTERS_PER_INODE], indirect: 0 }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(INODE_SIZE);
        bytes.extend_from_slice(&u32::from(self.valid).to_le_bytes());
        bytes.extend_from_slice(&self.size.to_le_bytes());
        for pointer in self.direct {
            bytes.extend_from_slice(&pointer.to_le_bytes());
        }
        bytes.extend_from_slice(&self.indirect.to_le_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Inode {
        let valid = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) != 0;
        let size = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        let mut direct = [0; POINTERS_PER_INODE];
        for (i, pointer) in direct.iter_mut().enumerate() {
            let at = 8 + i * 4;
            *pointer =
                u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
        }
        let indirect = u32::from_le_bytes([bytes[28], bytes[29], bytes[30], bytes[31]]);
        Inode { valid, size, direct, indirect }
    }
}

#[cfg(test)]
mod tests {
    use super::Inode;
    use crate::consts::INODE_SIZE;

    #[test]
    fn record_round_trip() {
        let inode = Inode { valid: true, size: 5000, direct: [3, 4, 0, 0, 0], indirect: 9 };

        let bytes = inode.to_bytes();
        assert_eq!(bytes.len(), INODE_SIZE);
        assert_eq!(Inode::from_bytes(&bytes), inode);
    }

    #[test]
    fn zeroed_record_is_invalid() {
        let decoded = Inode::from_bytes(&[0u8; INODE_SIZE]);
        assert_eq!(decoded, Inode::default());
        assert!(!decoded.valid);
    }

    #[test]
    fn fresh_inode_is_valid_and_empty() {
        let inode = Inode::fresh();
        assert!(inode.valid);
        assert_eq!(inode.size, 0);
        assert_eq!(inode.direct, [0; 5]);
        assert_eq!(inode.indirect, 0);
    }
}
