//! Block groups: positions of the bitmaps, inode table and descriptor table
//! within one group, and inode fetching.

use crate::bitmap::Bitmap;
use crate::desc::Descriptor;
use crate::inode::{Inode, LAYOUT as INODE_LAYOUT};
use crate::record::Rec;
use crate::superblock::{RoCompat, Superblock};
use crate::util::ceil_div;
use crate::{Error, Result};

/// `n` is a proper power of `base` (exponent >= 1).
fn is_pow(mut n: u32, base: u32) -> bool {
    if n < base {
        return false;
    }
    while n % base == 0 {
        n /= base;
    }
    n == 1
}

pub struct BlockGroup<'fs> {
    pub sb: &'fs Superblock<'fs>,
    pub bg: u32,
}

impl<'fs> BlockGroup<'fs> {
    /// Whether this group carries a superblock + descriptor table backup.
    /// With `RO_COMPAT_SPARSE_SUPER`, only group 0 and groups whose index is
    /// a power of 3, 5 or 7; without it, every group.
    pub fn is_super(&self) -> Result<bool> {
        if !self.sb.feature_ro_compat()?.contains(RoCompat::SPARSE_SUPER) {
            return Ok(true);
        }
        Ok(self.bg == 0 || is_pow(self.bg, 3) || is_pow(self.bg, 5) || is_pow(self.bg, 7))
    }

    /// Blocks occupied by this group's copy of the descriptor table.
    pub fn bg_desc_blocks_count(&self) -> Result<u64> {
        let desc_size = if self.sb.desc_size()? > 32 { 64 } else { 32 };
        Ok(ceil_div(
            self.sb.bg_count()? as u64 * desc_size,
            self.sb.block_size()?,
        ))
    }

    /// Blocks occupied by the inode table.
    pub fn inode_block_count(&self) -> Result<u64> {
        Ok(ceil_div(
            self.sb.inode_size()? as u64 * self.sb.inodes_per_group()? as u64,
            self.sb.block_size()?,
        ))
    }

    /// Offset of the block bitmap within the group, in blocks: past the
    /// superblock copy, descriptor table and reserved GDT blocks when this
    /// group carries a backup, at the group start otherwise.
    pub fn bitmap_offset(&self) -> Result<u64> {
        if self.is_super()? {
            Ok(1 + self.bg_desc_blocks_count()? + self.sb.reserved_gdt_blocks()? as u64)
        } else {
            Ok(0)
        }
    }

    /// The block bitmap: one block, covering `blocks_per_group` bits.
    pub fn data_bitmap(&self) -> Result<Bitmap<'fs>> {
        let offset = self.bg as u64 * self.sb.bg_size()? + self.bitmap_offset()? * self.sb.block_size()?;
        Ok(self.sb.bitmap_at(offset, self.sb.block_size()? as usize))
    }

    /// The inode bitmap, `inodes_per_group / 8` bytes.
    pub fn inode_bitmap(&self) -> Result<Bitmap<'fs>> {
        let offset = self.bg as u64 * self.sb.bg_size()?
            + (self.bitmap_offset()? + 1) * self.sb.block_size()?;
        Ok(self.sb.bitmap_at(offset, self.sb.inodes_per_group()? as usize / 8))
    }

    /// Absolute block id of the first inode table block.
    pub fn inode_table_blkid(&self) -> Result<u64> {
        Ok(self.bg as u64 * self.sb.blocks_per_group()? as u64 + self.bitmap_offset()? + 2)
    }

    /// Blocks at the head of the group (bitmaps, inode table, superblock and
    /// descriptor copies), counted from the group start.
    pub fn head_count(&self) -> Result<u64> {
        Ok(self.bitmap_offset()? + self.inode_block_count()? + 2)
    }

    /// Absolute ids of the group's data blocks, past the inode table.
    pub fn data_blkids(&self) -> Result<std::ops::Range<u64>> {
        let start = self.inode_table_blkid()? + self.inode_block_count()?;
        let group_end = (self.bg as u64 + 1) * self.sb.blocks_per_group()? as u64;
        let end = group_end.min(self.sb.blocks_count_lo()? as u64);
        Ok(start..end.max(start))
    }

    /// Whether block `index` (relative to the group) is free.
    pub fn blkidx_free(&self, index: usize) -> Result<bool> {
        Ok(!self.data_bitmap()?.bit(index)?)
    }

    /// The inode with the given id, which must live in this group. Only
    /// 128-byte inode tables are supported.
    pub fn inode_idx(&self, id: u32) -> Result<Inode<'fs>> {
        let inode_size = self.sb.inode_size()?;
        if inode_size != 128 {
            return Err(Error::InodeUnsupported(inode_size));
        }
        let index = (id - 1) % self.sb.inodes_per_group()?;
        let offset = self.inode_table_blkid()? * self.sb.block_size()?
            + index as u64 * inode_size as u64;
        let is_free = !self.inode_bitmap()?.bit(index as usize)?;
        Ok(Inode {
            rec: Rec::new(self.sb.rec.img(), offset, &INODE_LAYOUT),
            sb: self.sb,
            id,
            bg: self.bg,
            is_free,
        })
    }

    /// Every descriptor of this group's copy of the descriptor table, which
    /// sits in the block after the superblock copy.
    pub fn descriptors(&self) -> Result<Vec<Descriptor<'fs>>> {
        if !self.is_super()? {
            return Err(Error::NoSuperBackup(self.bg));
        }
        let wide = self.sb.desc_size()? > 32;
        let desc_size = if wide { 64u64 } else { 32 };
        let base = self.bg as u64 * self.sb.bg_size()? + self.sb.block_size()?;
        (0..self.sb.bg_count()?)
            .map(|i| {
                Ok(Descriptor::new(
                    self.sb.rec.img(),
                    base + i as u64 * desc_size,
                    wide,
                    i,
                    self.bg,
                ))
            })
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn proper_powers() {
        assert!(!is_pow(1, 3));
        assert!(is_pow(3, 3));
        assert!(is_pow(9, 3));
        assert!(is_pow(27, 3));
        assert!(!is_pow(6, 3));
        assert!(is_pow(5, 5));
        assert!(is_pow(25, 5));
        assert!(is_pow(49, 7));
        assert!(!is_pow(2, 3));
        assert!(!is_pow(0, 5));
    }
}
