use std::error::Error;
use std::fmt;
use std::io;

use libc::c_int;

use crate::consts::Inumber;

/// Every condition the filesystem reports to its caller. All of them are
/// returned synchronously; nothing is retried internally.
#[derive(Debug)]
pub enum FsError {
    NotMounted,
    AlreadyMounted,
    BadMagic { found: u32 },
    InvalidInumber { inumber: Inumber },
    InodeFull,
    OutOfRange { inumber: Inumber },
    InvalidInode { inumber: Inumber },
    AllocationExhausted,
    AddressSpaceExhausted,
    Device(io::Error),
}

impl FsError {
    /// Errno equivalent, for the front-end boundary.
    pub fn errno(&self) -> c_int {
        match self {
            FsError::NotMounted => libc::ENODEV,
            FsError::AlreadyMounted => libc::EBUSY,
            FsError::BadMagic { .. } => libc::EINVAL,
            FsError::InvalidInumber { .. } => libc::ENOENT,
            FsError::InodeFull => libc::ENOSPC,
            FsError::OutOfRange { .. } => libc::EINVAL,
            FsError::InvalidInode { .. } => libc::ENOENT,
            FsError::AllocationExhausted => libc::ENOSPC,
            FsError::AddressSpaceExhausted => libc::EFBIG,
            FsError::Device(_) => libc::EIO,
        }
    }
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FsError::NotMounted => write!(f, "no filesystem mounted"),
            FsError::AlreadyMounted => write!(f, "filesystem already mounted"),
            FsError::BadMagic { found } => {
                write!(f, "not a filesystem image (magic {found:#010x})")
            }
            FsError::InvalidInumber { inumber } => write!(f, "invalid inumber {inumber}"),
            FsError::InodeFull => write!(f, "no free inode slot"),
            FsError::OutOfRange { inumber } => write!(f, "inumber {inumber} out of range"),
            FsError::InvalidInode { inumber } => write!(f, "inode {inumber} is not valid"),
            FsError::AllocationExhausted => write!(f, "no free data block"),
            FsError::AddressSpaceExhausted => write!(f, "offset beyond direct and indirect reach"),
            FsError::Device(err) => write!(f, "device error: {err}"),
        }
    }
}

impl Error for FsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            FsError::Device(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for FsError {
    fn from(err: io::Error) -> FsError {
        FsError::Device(err)
    }
}
