//! The filesystem's syscall surface: open/close/read/write/mkdir/chdir/
//! listdir/create, as consumed by the shell (spec §6.2).

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::block::BlockDevice;
use crate::lib::error::Errno;

use super::dir::{self, DirEntry};
use super::inode::{Inode, InodeCacheInner, InodeType, NDIRECT};
use super::superblock::Superblock;

const MAX_OPEN_FILES: usize = 32;
const ROOT_INODE: u16 = 1;

struct OpenFile {
    inode: u16,
}

/// A mounted filesystem: the superblock, the backing device, the inode
/// cache, and simple bitmap allocators for inodes and data blocks.
pub struct Filesystem<D: BlockDevice> {
    sb: Superblock,
    dev: D,
    cache: InodeCacheInner,
    inode_bitmap: Vec<bool>,
    block_bitmap: Vec<bool>,
    open_files: [Option<OpenFile>; MAX_OPEN_FILES],
}

impl<D: BlockDevice> Filesystem<D> {
    const NO_OPEN_FILE: Option<OpenFile> = None;

    /// Format a fresh filesystem on `dev`: write the superblock and create
    /// the root directory inode.
    pub fn format(mut dev: D, ninodes: u32, nblocks: u32) -> Result<Self, Errno> {
        let sb = Superblock {
            magic: super::superblock::SUPERBLOCK_MAGIC,
            inode_map_start: 1,
            inode_map_blocks: 1,
            block_map_start: 2,
            block_map_blocks: 1,
            inodes_start: 3,
            blocks_start: 20,
            ninodes,
            nblocks,
        };
        dev.write_block(0, &sb.encode())?;

        let mut fs = Self {
            sb,
            dev,
            cache: InodeCacheInner::new(),
            inode_bitmap: alloc::vec![false; ninodes as usize + 1],
            block_bitmap: alloc::vec![false; nblocks as usize + 1],
            open_files: [Self::NO_OPEN_FILE; MAX_OPEN_FILES],
        };

        let root = fs.alloc_inode(InodeType::Directory)?;
        debug_assert_eq!(root, ROOT_INODE);
        let entries = dir::dot_entries(root, root);
        fs.write_inode_data(root, &dir::encode_all(&entries))?;
        Ok(fs)
    }

    fn alloc_inode(&mut self, itype: InodeType) -> Result<u16, Errno> {
        let id = self
            .inode_bitmap
            .iter()
            .skip(1)
            .position(|&used| !used)
            .ok_or(Errno::Enospc)? as u16
            + 1;
        self.inode_bitmap[id as usize] = true;
        let inode = Inode {
            id,
            itype,
            nlink: 1,
            size: 0,
            blocks: [0; NDIRECT],
            pos: 0,
        };
        self.cache.insert_new(inode, &self.sb, &mut self.dev)?;
        Ok(id)
    }

    fn alloc_block(&mut self) -> Result<u8, Errno> {
        let block = self
            .block_bitmap
            .iter()
            .skip(1)
            .position(|&used| !used)
            .ok_or(Errno::Enospc)? as u8
            + 1;
        self.block_bitmap[block as usize] = true;
        Ok(block)
    }

    fn write_inode_data(&mut self, id: u16, data: &[u8]) -> Result<usize, Errno> {
        let index = self.cache.get(id, &self.sb, &mut self.dev)?;
        self.cache.inode_mut(index).pos = 0;
        let sb = self.sb;
        // Destructure into disjoint field borrows so the allocator closure
        // (touching `block_bitmap`) and the `inode_write` call (touching
        // `cache`/`dev`) don't fight over `self`.
        let Self { cache, dev, block_bitmap, .. } = self;
        cache.inode_write(index, data, &sb, dev, || {
            let pos = block_bitmap.iter().skip(1).position(|&used| !used).ok_or(Errno::Enospc)?;
            let block = pos as u8 + 1;
            block_bitmap[block as usize] = true;
            Ok(block)
        })
    }

    fn read_inode_data(&mut self, id: u16, buf: &mut [u8]) -> Result<usize, Errno> {
        let index = self.cache.get(id, &self.sb, &mut self.dev)?;
        self.cache.inode_mut(index).pos = 0;
        let size = buf.len();
        let sb = self.sb;
        self.cache.inode_read(index, buf, size, &sb, &mut self.dev)
    }

    fn find_entry(&mut self, dir_inode: u16, name: &str) -> Result<Option<u16>, Errno> {
        let index = self.cache.get(dir_inode, &self.sb, &mut self.dev)?;
        let size = self.cache.inode(index).size as usize;
        let mut buf = alloc::vec![0u8; size];
        self.cache.inode_mut(index).pos = 0;
        let sb = self.sb;
        self.cache.inode_read(index, &mut buf, size, &sb, &mut self.dev)?;
        Ok(dir::decode_all(&buf).into_iter().find(|e| e.name == name).map(|e| e.inode))
    }

    fn append_entry(&mut self, dir_inode: u16, entry: DirEntry) -> Result<(), Errno> {
        let index = self.cache.get(dir_inode, &self.sb, &mut self.dev)?;
        let size = self.cache.inode(index).size as usize;
        let mut buf = alloc::vec![0u8; size];
        self.cache.inode_mut(index).pos = 0;
        let sb = self.sb;
        if size > 0 {
            self.cache.inode_read(index, &mut buf, size, &sb, &mut self.dev)?;
        }
        buf.extend_from_slice(&entry.encode());
        self.cache.inode_mut(index).pos = 0;
        self.cache.inode_mut(index).size = 0;
        self.write_inode_data(dir_inode, &buf)?;
        Ok(())
    }

    /// `create(path)`: make a new, empty file as an entry of `parent`.
    pub fn create(&mut self, parent: u16, name: &str) -> Result<u16, Errno> {
        if self.find_entry(parent, name)?.is_some() {
            return Err(Errno::Eexist);
        }
        let id = self.alloc_inode(InodeType::File)?;
        self.append_entry(parent, DirEntry { name: name.to_string(), inode: id })?;
        Ok(id)
    }

    /// `mkdir(path, parent)`.
    pub fn mkdir(&mut self, parent: u16, name: &str) -> Result<u16, Errno> {
        if self.find_entry(parent, name)?.is_some() {
            return Err(Errno::Eexist);
        }
        let id = self.alloc_inode(InodeType::Directory)?;
        let entries = dir::dot_entries(id, parent);
        self.write_inode_data(id, &dir::encode_all(&entries))?;
        self.append_entry(parent, DirEntry { name: name.to_string(), inode: id })?;
        Ok(id)
    }

    /// `chdir(path)`: resolve a name within `cwd` to its inode id.
    pub fn chdir(&mut self, cwd: u16, name: &str) -> Result<u16, Errno> {
        let id = self.find_entry(cwd, name)?.ok_or(Errno::Enoent)?;
        let index = self.cache.get(id, &self.sb, &mut self.dev)?;
        if self.cache.inode(index).itype != InodeType::Directory {
            return Err(Errno::Enotdir);
        }
        Ok(id)
    }

    /// `listdir(inode)`.
    pub fn listdir(&mut self, inode: u16) -> Result<Vec<(String, bool)>, Errno> {
        let index = self.cache.get(inode, &self.sb, &mut self.dev)?;
        if self.cache.inode(index).itype != InodeType::Directory {
            return Err(Errno::Enotdir);
        }
        let size = self.cache.inode(index).size as usize;
        let mut buf = alloc::vec![0u8; size];
        self.cache.inode_mut(index).pos = 0;
        let sb = self.sb;
        self.cache.inode_read(index, &mut buf, size, &sb, &mut self.dev)?;
        let mut out = Vec::new();
        for entry in dir::decode_all(&buf) {
            let entry_index = self.cache.get(entry.inode, &self.sb, &mut self.dev)?;
            let is_dir = self.cache.inode(entry_index).itype == InodeType::Directory;
            out.push((entry.name, is_dir));
        }
        Ok(out)
    }

    /// `open(path)`: resolve `name` within `cwd` and return a file
    /// descriptor.
    pub fn open(&mut self, cwd: u16, name: &str) -> Result<usize, Errno> {
        let id = self.find_entry(cwd, name)?.ok_or(Errno::Enoent)?;
        let fd = self.open_files.iter().position(Option::is_none).ok_or(Errno::Emfile)?;
        self.open_files[fd] = Some(OpenFile { inode: id });
        Ok(fd)
    }

    pub fn close(&mut self, fd: usize) -> Result<(), Errno> {
        let slot = self.open_files.get_mut(fd).ok_or(Errno::Einval)?;
        if slot.is_none() {
            return Err(Errno::Einval);
        }
        *slot = None;
        Ok(())
    }

    pub fn read(&mut self, fd: usize, buf: &mut [u8]) -> Result<usize, Errno> {
        let id = self.open_files.get(fd).and_then(Option::as_ref).ok_or(Errno::Einval)?.inode;
        self.read_inode_data(id, buf)
    }

    pub fn write(&mut self, fd: usize, data: &[u8]) -> Result<usize, Errno> {
        let id = self.open_files.get(fd).and_then(Option::as_ref).ok_or(Errno::Einval)?.inode;
        self.write_inode_data(id, data)
    }

    pub fn sync(&mut self) -> Result<(), Errno> {
        self.cache.sync_all(&self.sb, &mut self.dev)
    }

    pub const fn root_inode() -> u16 {
        ROOT_INODE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::MemBlockDevice;

    fn fresh_fs() -> Filesystem<MemBlockDevice> {
        Filesystem::format(MemBlockDevice::new(256), 64, 200).unwrap()
    }

    #[test]
    fn file_round_trip_through_create_open_write_close_reopen_read() {
        let mut fs = fresh_fs();
        let root = Filesystem::<MemBlockDevice>::root_inode();
        fs.create(root, "x").unwrap();
        let fd = fs.open(root, "x").unwrap();
        assert_eq!(fs.write(fd, b"hello").unwrap(), 5);
        fs.close(fd).unwrap();

        let fd2 = fs.open(root, "x").unwrap();
        let mut buf = [0u8; 5];
        assert_eq!(fs.read(fd2, &mut buf).unwrap(), 5);
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn directory_traversal_lists_dot_entries_and_children() {
        let mut fs = fresh_fs();
        let root = Filesystem::<MemBlockDevice>::root_inode();
        let d = fs.mkdir(root, "d").unwrap();
        fs.create(d, "y").unwrap();
        let listing = fs.listdir(d).unwrap();
        let names: Vec<&str> = listing.iter().map(|(n, _)| n.as_str()).collect();
        assert!(names.contains(&"."));
        assert!(names.contains(&".."));
        assert!(names.contains(&"y"));
        let y = listing.iter().find(|(n, _)| n == "y").unwrap();
        assert!(!y.1);
    }

    #[test]
    fn creating_a_duplicate_name_is_rejected() {
        let mut fs = fresh_fs();
        let root = Filesystem::<MemBlockDevice>::root_inode();
        fs.create(root, "x").unwrap();
        assert_eq!(fs.create(root, "x"), Err(Errno::Eexist));
    }

    #[test]
    fn chdir_into_a_file_fails_with_enotdir() {
        let mut fs = fresh_fs();
        let root = Filesystem::<MemBlockDevice>::root_inode();
        fs.create(root, "x").unwrap();
        assert_eq!(fs.chdir(root, "x"), Err(Errno::Enotdir));
    }
}
