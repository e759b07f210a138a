//! The filesystem superblock: block 0 of the partition, describing the
//! inode and block bitmaps and the start of the inode table and data
//! region. Fields are little-endian on disk per spec.

use crate::block::BLOCK_SIZE;
use crate::lib::error::Errno;

pub const SUPERBLOCK_MAGIC: u32 = 0x5346_4653; // "SFFS"

#[derive(Debug, Clone, Copy)]
pub struct Superblock {
    pub magic: u32,
    pub inode_map_start: u32,
    pub inode_map_blocks: u32,
    pub block_map_start: u32,
    pub block_map_blocks: u32,
    pub inodes_start: u32,
    pub blocks_start: u32,
    pub ninodes: u32,
    pub nblocks: u32,
}

const FIELD_COUNT: usize = 9;
const ENCODED_LEN: usize = FIELD_COUNT * 4;

impl Superblock {
    pub fn encode(&self) -> [u8; BLOCK_SIZE] {
        let mut out = [0u8; BLOCK_SIZE];
        let fields = [
            self.magic,
            self.inode_map_start,
            self.inode_map_blocks,
            self.block_map_start,
            self.block_map_blocks,
            self.inodes_start,
            self.blocks_start,
            self.ninodes,
            self.nblocks,
        ];
        for (i, field) in fields.iter().enumerate() {
            out[i * 4..i * 4 + 4].copy_from_slice(&field.to_le_bytes());
        }
        out
    }

    pub fn decode(block: &[u8; BLOCK_SIZE]) -> Result<Self, Errno> {
        if block.len() < ENCODED_LEN {
            return Err(Errno::Einval);
        }
        let read = |i: usize| u32::from_le_bytes(block[i * 4..i * 4 + 4].try_into().unwrap());
        let sb = Self {
            magic: read(0),
            inode_map_start: read(1),
            inode_map_blocks: read(2),
            block_map_start: read(3),
            block_map_blocks: read(4),
            inodes_start: read(5),
            blocks_start: read(6),
            ninodes: read(7),
            nblocks: read(8),
        };
        if sb.magic != SUPERBLOCK_MAGIC {
            return Err(Errno::Einval);
        }
        Ok(sb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn superblock_round_trips_through_encode_decode() {
        let sb = Superblock {
            magic: SUPERBLOCK_MAGIC,
            inode_map_start: 1,
            inode_map_blocks: 1,
            block_map_start: 2,
            block_map_blocks: 1,
            inodes_start: 3,
            blocks_start: 20,
            ninodes: 128,
            nblocks: 2048,
        };
        let decoded = Superblock::decode(&sb.encode()).unwrap();
        assert_eq!(decoded.ninodes, sb.ninodes);
        assert_eq!(decoded.blocks_start, sb.blocks_start);
    }

    #[test]
    fn bad_magic_is_rejected() {
        let block = [0u8; BLOCK_SIZE];
        assert!(Superblock::decode(&block).is_err());
    }
}
