//! Inode-based block filesystem: superblock, inode cache, directory
//! entries, and the syscall surface built on top of them.

pub mod dir;
pub mod inode;
pub mod superblock;
pub mod syscall;

pub use inode::{Inode, InodeType, MAX_FILE_SIZE, NDIRECT};
pub use superblock::Superblock;
pub use syscall::Filesystem;
