//! Directory blocks: a tiled chain of length-prefixed entries.
//!
//! An entry's 8-byte header is followed by `name_len` raw name bytes, padded
//! so `rec_len` is a multiple of 4; the `rec_len`s must tile the block
//! exactly. An entry with `inode == 0` is a tombstone.

use crate::image::Image;
use crate::record::{Field, Format, Layout, Rec, Symbols};
use crate::superblock::Superblock;
use crate::Result;

pub const FT_UNKNOWN: u8 = 0;
pub const FT_REG_FILE: u8 = 1;
pub const FT_DIR: u8 = 2;

static FILE_TYPES: Symbols = &[
    (0, "FT_UNKNOWN"),
    (1, "FT_REG_FILE"),
    (2, "FT_DIR"),
    (3, "FT_CHRDEV"),
    (4, "FT_BLKDEV"),
    (5, "FT_FIFO"),
    (6, "FT_SOCK"),
    (7, "FT_SYMLINK"),
];

pub static LAYOUT: Layout = Layout {
    name: "dirent",
    size: 8,
    fields: &[
        Field {
            name: "inode",
            format: Format::U32,
            doc: "Inode number of the entry; 0 marks an unused entry.",
        },
        Field {
            name: "rec_len",
            format: Format::U16,
            doc: "Displacement to the next entry from the start of this one.",
        },
        Field {
            name: "name_len",
            format: Format::U8,
            doc: "Bytes of name data following the header.",
        },
        Field {
            name: "file_type",
            format: Format::U8,
            doc: "File type, mirroring the inode's type nibble.",
        },
    ],
    enums: &[("file_type", FILE_TYPES)],
    flags: &[],
};

pub struct DirectoryEntry<'fs> {
    pub rec: Rec<'fs>,
    pub blkid: u32,
}

impl<'fs> DirectoryEntry<'fs> {
    pub fn new(img: &'fs Image, offset: u64, blkid: u32) -> Self {
        Self {
            rec: Rec::new(img, offset, &LAYOUT),
            blkid,
        }
    }

    pub fn inode(&self) -> Result<u32> {
        self.rec.u32f("inode")
    }

    pub fn rec_len(&self) -> Result<u16> {
        self.rec.u16f("rec_len")
    }

    pub fn name_len(&self) -> Result<u8> {
        self.rec.u8f("name_len")
    }

    pub fn file_type(&self) -> Result<u8> {
        self.rec.u8f("file_type")
    }

    /// The raw name bytes following the header.
    pub fn name(&self) -> Result<Vec<u8>> {
        self.rec
            .img()
            .read_vec(self.rec.offset() + 8, self.name_len()? as usize)
    }

    pub fn name_utf8(&self) -> Result<String> {
        Ok(String::from_utf8_lossy(&self.name()?).into_owned())
    }

    /// Per-entry findings: name fits the record, the record fits the block,
    /// the name has no control bytes and (unless `nonameok`) is nonempty.
    pub fn validate(&self, block_size: u64, all: bool, nonameok: bool) -> Result<Vec<String>> {
        let mut errors = Vec::new();
        let fail = |errors: &mut Vec<String>, msg: String| {
            self.rec.push_error(msg.clone());
            errors.push(msg);
        };
        let rec_len = self.rec_len()?;
        if self.name_len()? as i32 > rec_len as i32 - 8 {
            fail(&mut errors, "name longer than record".to_string());
            if !all {
                return Ok(errors);
            }
        }
        let end = (self.blkid as u64 + 1) * block_size;
        if self.rec.offset() + rec_len as u64 > end {
            fail(
                &mut errors,
                format!("rec_len past end of block {} > {end}", self.rec.offset() + rec_len as u64),
            );
            if !all {
                return Ok(errors);
            }
        }
        match self.name() {
            Ok(name) => {
                for c in &name {
                    if *c < 32 {
                        fail(&mut errors, format!("Invalid name chars {c}"));
                        break;
                    }
                }
                if !nonameok && name.is_empty() {
                    fail(&mut errors, "No name".to_string());
                }
            }
            Err(e) => fail(&mut errors, format!("name unreadable: {e}")),
        }
        for err in self.rec.validate(all)? {
            if !errors.contains(&err) {
                errors.push(err);
            }
        }
        Ok(errors)
    }

    /// Repoints this entry at `inode` in place and drops the field cache.
    pub fn change_inode(&self, inode: u32) -> Result<()> {
        let offset = self.rec.field_offset("inode");
        self.rec.img().write_at(offset, &inode.to_le_bytes())?;
        self.rec.invalidate();
        Ok(())
    }
}

/// A whole block parsed as a directory: the entries in on-disk order plus
/// the collected findings.
pub struct DirectoryBlk<'fs> {
    pub sb: &'fs Superblock<'fs>,
    pub blkid: u32,
    pub entries: Vec<DirectoryEntry<'fs>>,
    pub errors: Vec<String>,
}

impl<'fs> DirectoryBlk<'fs> {
    pub fn new(sb: &'fs Superblock<'fs>, blkid: u32) -> Self {
        Self {
            sb,
            blkid,
            entries: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Walks and validates every entry, then the block-level rules: the
    /// `rec_len`s must tile the block exactly, and the block must be in use.
    /// A zero `rec_len` advances past the block end, terminating the walk.
    pub fn validate(&mut self, all: bool, nonameok: bool) -> Result<()> {
        let block_size = self.sb.block_size()?;
        let next_blk = (self.blkid as u64 + 1) * block_size;
        let mut offset = self.blkid as u64 * block_size;
        let mut di = 0;
        while offset < next_blk {
            let entry = DirectoryEntry::new(self.sb.rec.img(), offset, self.blkid);
            for err in entry.validate(block_size, all, nonameok)? {
                self.errors.push(format!("<{di}>{err}"));
            }
            let rec_len = entry.rec_len()? as u64;
            offset += if rec_len == 0 { 2 * block_size } else { rec_len };
            di += 1;
            self.entries.push(entry);
        }
        if offset != next_blk {
            self.errors.push(format!(
                "rec_len doesn't end on the next block {offset} != {next_blk}"
            ));
        }
        if self.sb.blkid_free(self.blkid)? {
            self.errors.push(format!("Block {} is free", self.blkid));
        }
        Ok(())
    }

    /// Raw entry iteration without validation.
    pub fn each_entry(&self) -> Result<EntryIter<'fs>> {
        let block_size = self.sb.block_size()?;
        Ok(EntryIter {
            img: self.sb.rec.img(),
            blkid: self.blkid,
            offset: self.blkid as u64 * block_size,
            block_size,
        })
    }
}

pub struct EntryIter<'fs> {
    img: &'fs Image,
    blkid: u32,
    offset: u64,
    block_size: u64,
}

impl<'fs> Iterator for EntryIter<'fs> {
    type Item = Result<DirectoryEntry<'fs>>;

    fn next(&mut self) -> Option<Self::Item> {
        let next_blk = (self.blkid as u64 + 1) * self.block_size;
        if self.offset >= next_blk {
            return None;
        }
        let entry = DirectoryEntry::new(self.img, self.offset, self.blkid);
        let rec_len = match entry.rec_len() {
            Ok(l) => l as u64,
            Err(e) => {
                self.offset = next_blk;
                return Some(Err(e));
            }
        };
        self.offset += if rec_len == 0 {
            2 * self.block_size
        } else {
            rec_len
        };
        Some(Ok(entry))
    }
}
