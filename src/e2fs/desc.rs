//! Block group descriptors, in the 32-byte (ext2/3) and 64-byte (64bit
//! feature) variants. The variant is picked by `sb.desc_size > 32`; the
//! shared accessors are defined once on [`Descriptor`].

use crate::image::Image;
use crate::record::{Field, Format, Layout, Rec, Symbols};
use crate::Result;
use std::fmt;

static BG_FLAGS: Symbols = &[
    (0x1, "BG_INODE_UNINIT"),
    (0x2, "BG_BLOCK_UNINIT"),
    (0x4, "BG_INODE_ZEROED"),
];

macro_rules! fld {
    ($name:literal, $fmt:expr, $doc:literal) => {
        Field {
            name: $name,
            format: $fmt,
            doc: $doc,
        }
    };
}

pub static LAYOUT32: Layout = Layout {
    name: "desc32",
    size: 32,
    fields: &[
        fld!("block_bitmap_lo", Format::U32, "Lower 32-bits of location of block bitmap."),
        fld!("inode_bitmap_lo", Format::U32, "Lower 32-bits of location of inode bitmap."),
        fld!("inode_table_lo", Format::U32, "Lower 32-bits of location of inode table."),
        fld!("free_blocks_count_lo", Format::U16, "Lower 16-bits of free block count."),
        fld!("free_inodes_count_lo", Format::U16, "Lower 16-bits of free inode count."),
        fld!("used_dirs_count_lo", Format::U16, "Lower 16-bits of directory count."),
        fld!("flags", Format::U16, "Block group flags."),
        fld!("exclude_bitmap_lo", Format::U32, "Snapshot exclusion bitmap location."),
        fld!("block_bitmap_csum_lo", Format::U16, "Lower 16-bits of the block bitmap checksum."),
        fld!("inode_bitmap_csum_lo", Format::U16, "Lower 16-bits of the inode bitmap checksum."),
        fld!("itable_unused_lo", Format::U16, "Lower 16-bits of unused inode count."),
        fld!("checksum", Format::U16, "Group descriptor checksum."),
    ],
    enums: &[],
    flags: &[("flags", BG_FLAGS)],
};

pub static LAYOUT64: Layout = Layout {
    name: "desc64",
    size: 64,
    fields: &[
        fld!("block_bitmap_lo", Format::U32, "Lower 32-bits of location of block bitmap."),
        fld!("inode_bitmap_lo", Format::U32, "Lower 32-bits of location of inode bitmap."),
        fld!("inode_table_lo", Format::U32, "Lower 32-bits of location of inode table."),
        fld!("free_blocks_count_lo", Format::U16, "Lower 16-bits of free block count."),
        fld!("free_inodes_count_lo", Format::U16, "Lower 16-bits of free inode count."),
        fld!("used_dirs_count_lo", Format::U16, "Lower 16-bits of directory count."),
        fld!("flags", Format::U16, "Block group flags."),
        fld!("exclude_bitmap_lo", Format::U32, "Snapshot exclusion bitmap location."),
        fld!("block_bitmap_csum_lo", Format::U16, "Lower 16-bits of the block bitmap checksum."),
        fld!("inode_bitmap_csum_lo", Format::U16, "Lower 16-bits of the inode bitmap checksum."),
        fld!("itable_unused_lo", Format::U16, "Lower 16-bits of unused inode count."),
        fld!("checksum", Format::U16, "Group descriptor checksum."),
        fld!("block_bitmap_hi", Format::U32, "Upper 32-bits of location of block bitmap."),
        fld!("inode_bitmap_hi", Format::U32, "Upper 32-bits of location of inode bitmap."),
        fld!("inode_table_hi", Format::U32, "Upper 32-bits of location of inode table."),
        fld!("free_blocks_count_hi", Format::U16, "Upper 16-bits of free block count."),
        fld!("free_inodes_count_hi", Format::U16, "Upper 16-bits of free inode count."),
        fld!("used_dirs_count_hi", Format::U16, "Upper 16-bits of directory count."),
        fld!("itable_unused_hi", Format::U16, "Upper 16-bits of unused inode count."),
        fld!("exclude_bitmap_hi", Format::U32, "Upper bits of snapshot exclusion bitmap."),
        fld!("block_bitmap_csum_hi", Format::U16, "Upper 16-bits of the block bitmap checksum."),
        fld!("inode_bitmap_csum_hi", Format::U16, "Upper 16-bits of the inode bitmap checksum."),
        fld!("pad", Format::U32, "Padding to 64 bytes."),
    ],
    enums: &[],
    flags: &[("flags", BG_FLAGS)],
};

/// One group descriptor: `bg` is the group it describes, `bg_src` the group
/// whose (primary or backup) table it was read from.
pub struct Descriptor<'fs> {
    pub rec: Rec<'fs>,
    pub bg: u32,
    pub bg_src: u32,
}

impl<'fs> Descriptor<'fs> {
    pub fn new(img: &'fs Image, offset: u64, wide: bool, bg: u32, bg_src: u32) -> Self {
        let layout = if wide { &LAYOUT64 } else { &LAYOUT32 };
        Self {
            rec: Rec::new(img, offset, layout),
            bg,
            bg_src,
        }
    }

    pub fn block_bitmap_lo(&self) -> Result<u32> {
        self.rec.u32f("block_bitmap_lo")
    }

    pub fn inode_bitmap_lo(&self) -> Result<u32> {
        self.rec.u32f("inode_bitmap_lo")
    }

    pub fn inode_table_lo(&self) -> Result<u32> {
        self.rec.u32f("inode_table_lo")
    }

    pub fn free_blocks_count_lo(&self) -> Result<u16> {
        self.rec.u16f("free_blocks_count_lo")
    }

    pub fn free_inodes_count_lo(&self) -> Result<u16> {
        self.rec.u16f("free_inodes_count_lo")
    }
}

impl fmt::Display for Descriptor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{}  {}/{}/{}   {}/{}",
            self.bg,
            self.block_bitmap_lo().map_err(|_| fmt::Error)?,
            self.inode_bitmap_lo().map_err(|_| fmt::Error)?,
            self.inode_table_lo().map_err(|_| fmt::Error)?,
            self.free_blocks_count_lo().map_err(|_| fmt::Error)?,
            self.free_inodes_count_lo().map_err(|_| fmt::Error)?,
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn layouts_are_consistent() {
        assert!(LAYOUT32.size_consistent());
        assert!(LAYOUT64.size_consistent());
        assert_eq!(LAYOUT32.field("free_blocks_count_lo").unwrap().0, 12);
        assert_eq!(LAYOUT64.field("block_bitmap_hi").unwrap().0, 32);
    }
}
