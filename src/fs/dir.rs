//! Directory entries: a directory's data blocks hold a packed array of
//! fixed-size `(name, inode id)` records.

use alloc::string::String;
use alloc::vec::Vec;

pub const MAX_NAME_LENGTH: usize = 28;
pub const ENTRY_LEN: usize = MAX_NAME_LENGTH + 2;

#[derive(Debug, Clone)]
pub struct DirEntry {
    pub name: String,
    pub inode: u16,
}

impl DirEntry {
    pub fn encode(&self) -> [u8; ENTRY_LEN] {
        let mut out = [0u8; ENTRY_LEN];
        let bytes = self.name.as_bytes();
        let len = core::cmp::min(bytes.len(), MAX_NAME_LENGTH);
        out[..len].copy_from_slice(&bytes[..len]);
        out[MAX_NAME_LENGTH..].copy_from_slice(&self.inode.to_le_bytes());
        out
    }

    pub fn decode(raw: &[u8]) -> Option<Self> {
        if raw.len() < ENTRY_LEN {
            return None;
        }
        let name_end = raw[..MAX_NAME_LENGTH].iter().position(|&b| b == 0).unwrap_or(MAX_NAME_LENGTH);
        if name_end == 0 {
            return None;
        }
        let name = core::str::from_utf8(&raw[..name_end]).ok()?.into();
        let inode = u16::from_le_bytes([raw[MAX_NAME_LENGTH], raw[MAX_NAME_LENGTH + 1]]);
        Some(Self { name, inode })
    }
}

/// Pack the `.`/`..` entries written into every freshly created directory.
pub fn dot_entries(self_inode: u16, parent_inode: u16) -> Vec<DirEntry> {
    alloc::vec![
        DirEntry { name: ".".into(), inode: self_inode },
        DirEntry { name: "..".into(), inode: parent_inode },
    ]
}

/// Pack a list of entries into a flat byte buffer sized to whole entries.
pub fn encode_all(entries: &[DirEntry]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(entries.len() * ENTRY_LEN);
    for entry in entries {
        buf.extend_from_slice(&entry.encode());
    }
    buf
}

/// Unpack a flat byte buffer (as read from an inode's data blocks) into
/// directory entries, skipping slots that decode as empty (free slots).
pub fn decode_all(buf: &[u8]) -> Vec<DirEntry> {
    buf.chunks_exact(ENTRY_LEN).filter_map(DirEntry::decode).collect()
}

/// Find the first free (zeroed) slot index within an entry buffer, or
/// `None` if every slot is occupied.
pub fn find_free_slot(buf: &[u8]) -> Option<usize> {
    buf.chunks_exact(ENTRY_LEN).position(|chunk| chunk.iter().all(|&b| b == 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_round_trips_through_encode_decode() {
        let entry = DirEntry { name: "hello.txt".into(), inode: 42 };
        let decoded = DirEntry::decode(&entry.encode()).unwrap();
        assert_eq!(decoded.name, "hello.txt");
        assert_eq!(decoded.inode, 42);
    }

    #[test]
    fn dot_entries_point_at_self_and_parent() {
        let entries = dot_entries(5, 2);
        assert_eq!(entries[0].name, ".");
        assert_eq!(entries[0].inode, 5);
        assert_eq!(entries[1].name, "..");
        assert_eq!(entries[1].inode, 2);
    }

    #[test]
    fn find_free_slot_skips_occupied_entries() {
        let entries = dot_entries(1, 1);
        let mut buf = encode_all(&entries);
        buf.extend(alloc::vec![0u8; ENTRY_LEN]);
        assert_eq!(find_free_slot(&buf), Some(2));
    }
}
