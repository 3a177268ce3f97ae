//! Name-to-inode resolution and the persisted working directory.
//!
//! Each CLI invocation is a fresh process, so the current working inode is
//! kept in `<state>/curpath` between runs; the `shell` command reuses the
//! same file.

use crate::directory::DirectoryBlk;
use crate::superblock::Superblock;
use crate::{Error, Result};
use std::fs;
use std::path::Path;

pub const ROOT_INODE: u32 = 2;

/// Parses a decimal or `0x`-prefixed inode/block id.
pub fn parse_id(token: &str) -> Option<u32> {
    if let Some(hex) = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        return u32::from_str_radix(hex, 16).ok();
    }
    token.parse().ok()
}

/// The persisted working inode; a missing or unreadable file means root.
pub fn cur_inode(state: &Path) -> u32 {
    fs::read(state.join("curpath"))
        .ok()
        .and_then(|data| bincode::deserialize(&data).ok())
        .unwrap_or(ROOT_INODE)
}

pub fn set_cur_inode(state: &Path, id: u32) -> Result<()> {
    fs::create_dir_all(state)?;
    let data = bincode::serialize(&id).expect("serialize u32");
    fs::write(state.join("curpath"), data)?;
    Ok(())
}

/// Coerces a shell token to an inode id: integers win, otherwise the token
/// is looked up case-insensitively in the directory at `parent`.
pub fn name_or_inode(sb: &Superblock<'_>, token: &str, parent: u32) -> Result<u32> {
    if let Some(id) = parse_id(token) {
        return Ok(id);
    }
    let inode = sb.inode(parent)?;
    for blkid in inode.each_block(true)? {
        let mut dblk = DirectoryBlk::new(sb, blkid?);
        dblk.validate(true, false)?;
        if !dblk.errors.is_empty() {
            log::warn!(
                "directory block #{}: {} findings",
                dblk.blkid,
                dblk.errors.len()
            );
        }
        for entry in &dblk.entries {
            if entry.name_utf8()?.eq_ignore_ascii_case(token) {
                return Ok(entry.inode()?);
            }
        }
    }
    Err(Error::NoSuchFileOrDirectory(token.to_string()))
}

/// The inode behind `..` in the directory `id`, or 0 when absent.
pub fn parent_inode(sb: &Superblock<'_>, id: u32) -> Result<u32> {
    let inode = sb.inode(id)?;
    for blkid in inode.each_block(true)? {
        let mut dblk = DirectoryBlk::new(sb, blkid?);
        dblk.validate(true, true)?;
        for entry in &dblk.entries {
            if entry.name()? == b".." {
                return Ok(entry.inode()?);
            }
        }
    }
    Ok(0)
}

/// The name under which `parent` knows inode `id`, skipping `.`.
pub fn name_for_inode(sb: &Superblock<'_>, parent: u32, id: u32) -> Result<Option<String>> {
    let inode = sb.inode(parent)?;
    for blkid in inode.each_block(true)? {
        let mut dblk = DirectoryBlk::new(sb, blkid?);
        dblk.validate(true, true)?;
        for entry in &dblk.entries {
            if entry.name()? == b"." {
                continue;
            }
            if entry.inode()? == id {
                return Ok(Some(entry.name_utf8()?));
            }
        }
    }
    Ok(None)
}

/// Reconstructs a readable path by chasing `..` upward from `id`. The walk
/// ends at the root inode, or at the first step whose parent lacks a
/// back-reference; the unresolved head is emitted as a hex inode prefix.
pub fn cur_path(sb: &Superblock<'_>, id: u32) -> String {
    let mut inode = id;
    let mut path = String::new();
    loop {
        let parent = parent_inode(sb, inode).unwrap_or(0);
        let name = if parent == 0 {
            None
        } else {
            name_for_inode(sb, parent, inode).unwrap_or(None)
        };
        match name {
            Some(name) if inode != ROOT_INODE => {
                path = format!("/{name}{path}");
                inode = parent;
            }
            _ => return format!("{inode:#x}{path}"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn id_tokens() {
        assert_eq!(parse_id("12"), Some(12));
        assert_eq!(parse_id("0x0c"), Some(12));
        assert_eq!(parse_id("0XC"), Some(12));
        assert_eq!(parse_id("lost+found"), None);
        assert_eq!(parse_id(""), None);
    }

    #[test]
    fn cwd_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(cur_inode(dir.path()), ROOT_INODE);
        set_cur_inode(dir.path(), 77).unwrap();
        assert_eq!(cur_inode(dir.path()), 77);
    }
}
