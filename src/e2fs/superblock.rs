//! The ext superblock and the geometry derived from it.
//!
//! The primary lives at absolute offset 1024; every block group whose index
//! is 0 or a power of 3, 5 or 7 carries a backup at the start of the group
//! when `RO_COMPAT_SPARSE_SUPER` is set, otherwise every group does.

use crate::bitmap::Bitmap;
use crate::blkgrp::BlockGroup;
use crate::desc::Descriptor;
use crate::image::Image;
use crate::inode::Inode;
use crate::record::{Field, Format, Layout, Rec, Symbols};
use crate::util::{ceil_div, hex_bytes, label, pretty_time, ByteSize};
use crate::{Error, Result};
use bitflags::bitflags;
use std::collections::HashMap;

/// Magic signature at offset 56.
pub const MAGIC: u16 = 0xef53;
/// Absolute offset of the primary superblock.
pub const SUPERBLOCK_OFFSET: u64 = 1024;

bitflags! {
    /// Readonly-compatible feature set.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct RoCompat: u32 {
        const SPARSE_SUPER  = 0x0001;
        const LARGE_FILE    = 0x0002;
        const BTREE_DIR     = 0x0004;
        const HUGE_FILE     = 0x0008;
        const GDT_CSUM      = 0x0010;
        const DIR_NLINK     = 0x0020;
        const EXTRA_ISIZE   = 0x0040;
        const HAS_SNAPSHOT  = 0x0080;
        const QUOTA         = 0x0100;
        const BIGALLOC      = 0x0200;
        const METADATA_CSUM = 0x0400;
        const REPLICA       = 0x0800;
        const READONLY      = 0x1000;
        const PROJECT       = 0x2000;
    }
}

bitflags! {
    /// Incompatible feature set. Surfaced, not interpreted: extents,
    /// meta_bg, 64bit and friends are out of scope for the walker.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Incompat: u32 {
        const COMPRESSION = 0x0001;
        const FILETYPE    = 0x0002;
        const RECOVER     = 0x0004;
        const JOURNAL_DEV = 0x0008;
        const META_BG     = 0x0010;
        const EXTENTS     = 0x0040;
        const SIXTY_FOUR_BIT = 0x0080;
        const MMP         = 0x0100;
        const FLEX_BG     = 0x0200;
        const EA_INODE    = 0x0400;
        const DIRDATA     = 0x1000;
        const CSUM_SEED   = 0x2000;
        const LARGEDIR    = 0x4000;
        const INLINE_DATA = 0x8000;
        const ENCRYPT     = 0x10000;
    }
}

static STATE: Symbols = &[(0x1, "CLEAN"), (0x2, "ERRORS"), (0x4, "ORPHANS")];

static FS_FLAGS: Symbols = &[
    (0x1, "SIGNED_DIRECTORY_HASH"),
    (0x2, "UNSIGNED_DIRECTORY_HASH"),
    (0x4, "DEV_CODE"),
];

static FEATURE_COMPAT: Symbols = &[
    (0x1, "COMPAT_DIR_PREALLOC"),
    (0x2, "COMPAT_IMAGIC_INODES"),
    (0x4, "COMPAT_HAS_JOURNAL"),
    (0x8, "COMPAT_EXT_ATTR"),
    (0x10, "COMPAT_RESIZE_INODE"),
    (0x20, "COMPAT_DIR_INDEX"),
    (0x40, "COMPAT_LAZY_BG"),
    (0x80, "COMPAT_EXCLUDE_INODE"),
    (0x100, "COMPAT_EXCLUDE_BITMAP"),
    (0x200, "COMPAT_SPARSE_SUPER2"),
];

static FEATURE_INCOMPAT: Symbols = &[
    (0x1, "INCOMPAT_COMPRESSION"),
    (0x2, "INCOMPAT_FILETYPE"),
    (0x4, "INCOMPAT_RECOVER"),
    (0x8, "INCOMPAT_JOURNAL_DEV"),
    (0x10, "INCOMPAT_META_BG"),
    (0x40, "INCOMPAT_EXTENTS"),
    (0x80, "INCOMPAT_64BIT"),
    (0x100, "INCOMPAT_MMP"),
    (0x200, "INCOMPAT_FLEX_BG"),
    (0x400, "INCOMPAT_EA_INODE"),
    (0x1000, "INCOMPAT_DIRDATA"),
    (0x2000, "INCOMPAT_CSUM_SEED"),
    (0x4000, "INCOMPAT_LARGEDIR"),
    (0x8000, "INCOMPAT_INLINE_DATA"),
    (0x10000, "INCOMPAT_ENCRYPT"),
];

static FEATURE_RO_COMPAT: Symbols = &[
    (0x1, "RO_COMPAT_SPARSE_SUPER"),
    (0x2, "RO_COMPAT_LARGE_FILE"),
    (0x4, "RO_COMPAT_BTREE_DIR"),
    (0x8, "RO_COMPAT_HUGE_FILE"),
    (0x10, "RO_COMPAT_GDT_CSUM"),
    (0x20, "RO_COMPAT_DIR_NLINK"),
    (0x40, "RO_COMPAT_EXTRA_ISIZE"),
    (0x80, "RO_COMPAT_HAS_SNAPSHOT"),
    (0x100, "RO_COMPAT_QUOTA"),
    (0x200, "RO_COMPAT_BIGALLOC"),
    (0x400, "RO_COMPAT_METADATA_CSUM"),
    (0x800, "RO_COMPAT_REPLICA"),
    (0x1000, "RO_COMPAT_READONLY"),
    (0x2000, "RO_COMPAT_PROJECT"),
];

static DEFAULT_MOUNT_OPTS: Symbols = &[
    (0x0001, "EXT4_DEFM_DEBUG"),
    (0x0002, "EXT4_DEFM_BSDGROUPS"),
    (0x0004, "EXT4_DEFM_XATTR_USER"),
    (0x0008, "EXT4_DEFM_ACL"),
    (0x0010, "EXT4_DEFM_UID16"),
    (0x0020, "EXT4_DEFM_JMODE_DATA"),
    (0x0040, "EXT4_DEFM_JMODE_ORDERED"),
    (0x0060, "EXT4_DEFM_JMODE_WBACK"),
    (0x0100, "EXT4_DEFM_NOBARRIER"),
    (0x0200, "EXT4_DEFM_BLOCK_VALIDITY"),
    (0x0400, "EXT4_DEFM_DISCARD"),
    (0x0800, "EXT4_DEFM_NODELALLOC"),
];

static ERRORS: Symbols = &[(1, "CONTINUE"), (2, "REMOUNT_RO"), (3, "PANIC")];

static CREATOR_OS: Symbols = &[
    (0, "LINUX"),
    (1, "HURD"),
    (2, "MASIX"),
    (3, "FREEBSD"),
    (4, "LITES"),
];

static REV_LEVEL: Symbols = &[(0, "V0"), (1, "V2")];

static HASH_VERSION: Symbols = &[
    (0, "LEGACY"),
    (1, "HALF_MD4"),
    (2, "TEA"),
    (3, "LEGACY_UNSIGNED"),
    (4, "HALF_MD4_UNSIGNED"),
    (5, "TEA_UNSIGNED"),
];

static ENCRYPT_ALGOS: Symbols = &[
    (0, "ENCRYPTION_MODE_INVALID"),
    (1, "ENCRYPTION_MODE_AES_256_XTS"),
    (2, "ENCRYPTION_MODE_AES_256_GCM"),
    (3, "ENCRYPTION_MODE_AES_256_CBC"),
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

pub static LAYOUT: Layout = Layout {
    name: "superblock",
    size: 1024,
    fields: &[
        fld!("inodes_count", Format::U32, "Total inode count."),
        fld!("blocks_count_lo", Format::U32, "Total block count."),
        fld!("r_blocks_count_lo", Format::U32, "Blocks reserved for the super-user."),
        fld!("free_blocks_count_lo", Format::U32, "Free block count."),
        fld!("free_inodes_count", Format::U32, "Free inode count."),
        fld!("first_data_block", Format::U32, "First data block."),
        fld!("log_block_size", Format::U32, "Block size is 2 ^ (10 + log_block_size)."),
        fld!("log_cluster_size", Format::U32, "Cluster size if bigalloc is enabled."),
        fld!("blocks_per_group", Format::U32, "Blocks per group."),
        fld!("clusters_per_group", Format::U32, "Clusters per group if bigalloc is enabled."),
        fld!("inodes_per_group", Format::U32, "Inodes per group."),
        fld!("mtime", Format::U32, "Mount time, in seconds since the epoch."),
        fld!("wtime", Format::U32, "Write time, in seconds since the epoch."),
        fld!("mnt_count", Format::U16, "Number of mounts since the last fsck."),
        fld!("max_mnt_count", Format::U16, "Number of mounts beyond which a fsck is needed."),
        fld!("magic", Format::U16, "Magic signature, 0xEF53."),
        fld!("state", Format::U16, "File system state."),
        fld!("errors", Format::U16, "Behaviour when detecting errors."),
        fld!("minor_rev_level", Format::U16, "Minor revision level."),
        fld!("lastcheck", Format::U32, "Time of last check."),
        fld!("checkinterval", Format::U32, "Maximum time between checks."),
        fld!("creator_os", Format::U32, "OS."),
        fld!("rev_level", Format::U32, "Revision level."),
        fld!("def_resuid", Format::U16, "Default uid for reserved blocks."),
        fld!("def_resgid", Format::U16, "Default gid for reserved blocks."),
        fld!("first_ino", Format::U32, "First non-reserved inode."),
        fld!("inode_size", Format::U16, "Size of inode structure, in bytes."),
        fld!("block_group_nr", Format::U16, "Block group # of this superblock."),
        fld!("feature_compat", Format::U32, "Compatible feature set flags."),
        fld!("feature_incompat", Format::U32, "Incompatible feature set."),
        fld!("feature_ro_compat", Format::U32, "Readonly-compatible feature set."),
        fld!("uuid", Format::Bytes(16), "128-bit UUID for volume."),
        fld!("volume_name", Format::Bytes(16), "Volume label."),
        fld!("last_mounted", Format::Bytes(64), "Directory where filesystem was last mounted."),
        fld!("algorithm_usage_bitmap", Format::U32, "For compression."),
        fld!("prealloc_blocks", Format::U8, "# of blocks to preallocate for files."),
        fld!("prealloc_dir_blocks", Format::U8, "# of blocks to preallocate for directories."),
        fld!("reserved_gdt_blocks", Format::U16, "Reserved GDT entries for future expansion."),
        fld!("journal_uuid", Format::Bytes(16), "UUID of journal superblock."),
        fld!("journal_inum", Format::U32, "Inode number of journal file."),
        fld!("journal_dev", Format::U32, "Device number of journal file."),
        fld!("last_orphan", Format::U32, "Start of list of orphaned inodes to delete."),
        fld!("hash_seed", Format::U32s(4), "HTREE hash seed."),
        fld!("def_hash_version", Format::U8, "Default hash algorithm for directory hashes."),
        fld!("jnl_backup_type", Format::U8, "Journal backup type."),
        fld!("desc_size", Format::U16, "Size of group descriptors if the 64bit feature is set."),
        fld!("default_mount_opts", Format::U32, "Default mount options."),
        fld!("first_meta_bg", Format::U32, "First metablock block group."),
        fld!("mkfs_time", Format::U32, "When the filesystem was created."),
        fld!("jnl_blocks", Format::U32s(17), "Backup of the journal inode's block array and size."),
        fld!("blocks_count_hi", Format::U32, "High 32-bits of the block count."),
        fld!("r_blocks_count_hi", Format::U32, "High 32-bits of the reserved block count."),
        fld!("free_blocks_count_hi", Format::U32, "High 32-bits of the free block count."),
        fld!("min_extra_isize", Format::U16, "All inodes have at least # bytes."),
        fld!("want_extra_isize", Format::U16, "New inodes should reserve # bytes."),
        fld!("flags", Format::U32, "Miscellaneous flags."),
        fld!("raid_stride", Format::U16, "RAID stride."),
        fld!("mmp_interval", Format::U16, "Seconds to wait in MMP checking."),
        fld!("mmp_block", Format::U64, "Block # for multi-mount protection data."),
        fld!("raid_stripe_width", Format::U32, "RAID stripe width."),
        fld!("log_groups_per_flex", Format::U8, "Flexible block group size is 2 ^ this."),
        fld!("checksum_type", Format::U8, "Metadata checksum algorithm type."),
        fld!("reserved_pad", Format::U16, "Padding."),
        fld!("kbytes_written", Format::U64, "KiB written over the filesystem's lifetime."),
        fld!("snapshot_inum", Format::U32, "Inode number of active snapshot."),
        fld!("snapshot_id", Format::U32, "Sequential ID of active snapshot."),
        fld!("snapshot_r_blocks_count", Format::U64, "Blocks reserved for active snapshot."),
        fld!("snapshot_list", Format::U32, "Head of the on-disk snapshot list."),
        fld!("error_count", Format::U32, "Number of errors seen."),
        fld!("first_error_time", Format::U32, "First time an error happened."),
        fld!("first_error_ino", Format::U32, "Inode involved in first error."),
        fld!("first_error_block", Format::U64, "Block involved in first error."),
        fld!("first_error_func", Format::Bytes(32), "Function where the first error happened."),
        fld!("first_error_line", Format::U32, "Line number where the first error happened."),
        fld!("last_error_time", Format::U32, "Time of most recent error."),
        fld!("last_error_ino", Format::U32, "Inode involved in most recent error."),
        fld!("last_error_line", Format::U32, "Line number of most recent error."),
        fld!("last_error_block", Format::U64, "Block involved in most recent error."),
        fld!("last_error_func", Format::Bytes(32), "Function where the most recent error happened."),
        fld!("mount_opts", Format::Bytes(64), "ASCIIZ string of mount options."),
        fld!("usr_quota_inum", Format::U32, "Inode number of user quota file."),
        fld!("grp_quota_inum", Format::U32, "Inode number of group quota file."),
        fld!("overhead_blocks", Format::U32, "Overhead blocks/clusters in fs."),
        fld!("backup_bgs0", Format::U32, "Backup superblock group (sparse_super2)."),
        fld!("backup_bgs1", Format::U32, "Backup superblock group (sparse_super2)."),
        fld!("encrypt_algos", Format::U8s(4), "Encryption algorithms in use."),
        fld!("encrypt_pw_salt", Format::Bytes(16), "Salt for the string2key algorithm."),
        fld!("lpf_ino", Format::U32, "Inode number of lost+found."),
        fld!("prj_quota_inum", Format::U32, "Inode that tracks project quotas."),
        fld!("checksum_seed", Format::U32, "Seed for metadata_csum calculations."),
        fld!("end_of_block", Format::Bytes(392), "Padding to the end of the block."),
        fld!("checksum", Format::U32, "Superblock checksum."),
    ],
    enums: &[
        ("errors", ERRORS),
        ("creator_os", CREATOR_OS),
        ("rev_level", REV_LEVEL),
        ("def_hash_version", HASH_VERSION),
        ("encrypt_algos", ENCRYPT_ALGOS),
    ],
    flags: &[
        ("state", STATE),
        ("flags", FS_FLAGS),
        ("feature_compat", FEATURE_COMPAT),
        ("feature_incompat", FEATURE_INCOMPAT),
        ("feature_ro_compat", FEATURE_RO_COMPAT),
        ("default_mount_opts", DEFAULT_MOUNT_OPTS),
    ],
};

/// One descriptor bucket from [`Superblock::all_block_descriptors`]: a
/// representative descriptor and how many byte-identical copies were seen
/// across the backups.
pub struct DescriptorCopies<'fs> {
    pub desc: Descriptor<'fs>,
    pub copies: u32,
}

pub struct Superblock<'fs> {
    pub rec: Rec<'fs>,
}

impl<'fs> Superblock<'fs> {
    pub fn new(img: &'fs Image, offset: u64) -> Self {
        Self {
            rec: Rec::new(img, offset, &LAYOUT),
        }
    }

    pub fn magic(&self) -> Result<u16> {
        self.rec.u16f("magic")
    }

    pub fn blocks_count_lo(&self) -> Result<u32> {
        self.rec.u32f("blocks_count_lo")
    }

    pub fn log_block_size(&self) -> Result<u32> {
        self.rec.u32f("log_block_size")
    }

    pub fn blocks_per_group(&self) -> Result<u32> {
        self.rec.u32f("blocks_per_group")
    }

    pub fn inodes_per_group(&self) -> Result<u32> {
        self.rec.u32f("inodes_per_group")
    }

    pub fn reserved_gdt_blocks(&self) -> Result<u16> {
        self.rec.u16f("reserved_gdt_blocks")
    }

    pub fn block_group_nr(&self) -> Result<u16> {
        self.rec.u16f("block_group_nr")
    }

    pub fn first_ino(&self) -> Result<u32> {
        self.rec.u32f("first_ino")
    }

    /// Group descriptor size: 64 bytes when the 64bit feature widened them,
    /// else 32.
    pub fn desc_size(&self) -> Result<u16> {
        self.rec.u16f("desc_size")
    }

    /// Inode record size; revision 0 filesystems predate the field.
    pub fn inode_size(&self) -> Result<u16> {
        if self.rec.u32f("rev_level")? >= 1 {
            self.rec.u16f("inode_size")
        } else {
            Ok(128)
        }
    }

    pub fn feature_incompat(&self) -> Result<Incompat> {
        Ok(Incompat::from_bits_retain(self.rec.u32f("feature_incompat")?))
    }

    pub fn feature_ro_compat(&self) -> Result<RoCompat> {
        Ok(RoCompat::from_bits_retain(self.rec.u32f("feature_ro_compat")?))
    }

    pub fn block_size(&self) -> Result<u64> {
        // clamp absurd exponents from corrupted superblocks
        Ok(1 << (10 + self.log_block_size()?.min(20)))
    }

    /// Bytes covered by one block group.
    pub fn bg_size(&self) -> Result<u64> {
        Ok(self.blocks_per_group()? as u64 * self.block_size()?)
    }

    pub fn bg_count(&self) -> Result<u32> {
        Ok(ceil_div(self.blocks_count_lo()? as u64, self.blocks_per_group()? as u64) as u32)
    }

    pub fn inode_count(&self) -> Result<u32> {
        Ok(self.inodes_per_group()? * self.bg_count()?)
    }

    /// The volume label, trimmed at the first NUL.
    pub fn name(&self) -> Result<String> {
        Ok(label(&self.rec.bytes("volume_name")?))
    }

    /// Magic and geometry first, then the layout's enum/flag checks.
    pub fn validate(&self, all: bool) -> Result<Vec<String>> {
        if self.magic()? != MAGIC {
            self.rec.push_error("Bad magic".to_string());
            if !all {
                return Ok(self.rec.errors());
            }
        }
        let bpg = self.blocks_per_group()? as u64;
        if bpg != 8 * self.block_size()? {
            self.rec.push_error(format!(
                "block group size mismatch: {bpg} != {}",
                8 * self.block_size()?
            ));
            if !all {
                return Ok(self.rec.errors());
            }
        }
        self.rec.validate(all)
    }

    /// One-line identity: label, block size, capacity, group count, features.
    pub fn summary(&self) -> Result<String> {
        Ok(format!(
            "'{}' {}k/{}  {} groups\n{} {} {} {}",
            self.name()?,
            self.block_size()? / 1024,
            ByteSize(self.blocks_count_lo()? as u64 * self.block_size()?),
            self.bg_count()?,
            self.rec.pretty_val("flags"),
            self.rec.pretty_val("feature_compat"),
            self.rec.pretty_val("feature_incompat"),
            self.rec.pretty_val("feature_ro_compat"),
        ))
    }

    /// Pretty form of a field, with superblock-specific renderings layered
    /// over the generic symbol tables.
    pub fn pretty_val(&self, name: &str) -> String {
        match name {
            "mtime" | "wtime" | "lastcheck" | "mkfs_time" | "first_error_time"
            | "last_error_time" => match self.rec.u32f(name) {
                Ok(v) => pretty_time(v),
                Err(e) => format!("<{e}>"),
            },
            "uuid" | "journal_uuid" | "encrypt_pw_salt" => match self.rec.bytes(name) {
                Ok(b) => hex_bytes(&b),
                Err(e) => format!("<{e}>"),
            },
            "volume_name" | "last_mounted" | "mount_opts" | "first_error_func"
            | "last_error_func" => match self.rec.bytes(name) {
                Ok(b) => label(&b),
                Err(e) => format!("<{e}>"),
            },
            _ => self.rec.pretty_val(name),
        }
    }

    /// The block group `bg`, or `BlkgrpOutOfRange`.
    pub fn blkgrp<'a>(&'a self, bg: u32) -> Result<BlockGroup<'a>> {
        let max = self.bg_count()?;
        if bg >= max {
            return Err(Error::BlkgrpOutOfRange { bg, max });
        }
        Ok(BlockGroup { sb: self, bg })
    }

    /// Every block group in order.
    pub fn each_blkgrp<'a>(&'a self) -> Result<Vec<BlockGroup<'a>>> {
        (0..self.bg_count()?).map(|bg| self.blkgrp(bg)).collect()
    }

    /// `(group, backup superblock)` for every group that carries a backup.
    /// Backups whose magic does not check out are skipped.
    pub fn super_bgs<'a>(&'a self) -> Result<Vec<(BlockGroup<'a>, Superblock<'a>)>> {
        let mut out = Vec::new();
        for bg in 0..self.bg_count()? {
            let bgrp = self.blkgrp(bg)?;
            if !bgrp.is_super()? {
                continue;
            }
            let offset = if bg == 0 {
                SUPERBLOCK_OFFSET
            } else {
                bg as u64 * self.bg_size()?
            };
            let sb = Superblock::new(self.rec.img(), offset);
            if sb.magic()? != MAGIC {
                continue;
            }
            sb.validate(true)?;
            out.push((bgrp, sb));
        }
        Ok(out)
    }

    /// Collects every descriptor from every backup's table and buckets them
    /// by byte identity, counting duplicate copies. Used to spot a corrupted
    /// table by comparing it against the other backups.
    pub fn all_block_descriptors<'a>(&'a self) -> Result<Vec<DescriptorCopies<'a>>> {
        let mut order: Vec<DescriptorCopies<'a>> = Vec::new();
        let mut index: HashMap<Vec<u8>, usize> = HashMap::new();
        for (bgrp, _) in self.super_bgs()? {
            for desc in bgrp.descriptors()? {
                let raw = desc.rec.raw()?;
                match index.get(&raw) {
                    Some(i) => order[*i].copies += 1,
                    None => {
                        index.insert(raw, order.len());
                        order.push(DescriptorCopies { desc, copies: 1 });
                    }
                }
            }
        }
        Ok(order)
    }

    /// Whether `blkid` can be a data block: in range, nonzero (unless
    /// `zero_ok`), and past its group's inode table.
    pub fn valid_blkid(&self, blkid: u32, zero_ok: bool) -> Result<bool> {
        if blkid >= self.blocks_count_lo()? {
            return Ok(false);
        }
        if blkid == 0 {
            return Ok(zero_ok);
        }
        let bgrp = self.blkgrp(blkid / self.blocks_per_group()?)?;
        Ok(blkid as u64 >= bgrp.inode_table_blkid()? + bgrp.inode_block_count()?)
    }

    /// Fetches inode `id`; ids live in `(1, inode_count)`.
    pub fn inode<'a>(&'a self, id: u32) -> Result<Inode<'a>> {
        let max = self.inode_count()?;
        if id < 1 || id >= max {
            return Err(Error::InodeOutOfRange { id, max });
        }
        self.blkgrp((id - 1) / self.inodes_per_group()?)?.inode_idx(id)
    }

    /// Whether `blkid` is free according to its group's data bitmap.
    pub fn blkid_free(&self, blkid: u32) -> Result<bool> {
        let bpg = self.blocks_per_group()?;
        self.blkgrp(blkid / bpg)?.blkidx_free((blkid % bpg) as usize)
    }

    /// Whether inode `id` is free according to its group's inode bitmap.
    pub fn inode_free(&self, id: u32) -> Result<bool> {
        let ipg = self.inodes_per_group()?;
        let bgrp = self.blkgrp((id - 1) / ipg)?;
        Ok(!bgrp.inode_bitmap()?.bit(((id - 1) % ipg) as usize)?)
    }

    /// Bitmap view helper shared with [`BlockGroup`].
    pub(crate) fn bitmap_at<'a>(&'a self, offset: u64, byte_len: usize) -> Bitmap<'a> {
        Bitmap::image(self.rec.img(), offset, byte_len)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn layout_is_consistent() {
        assert!(LAYOUT.size_consistent());
        // pinned offsets from the on-disk format
        assert_eq!(LAYOUT.field("magic").unwrap().0, 56);
        assert_eq!(LAYOUT.field("inode_size").unwrap().0, 88);
        assert_eq!(LAYOUT.field("uuid").unwrap().0, 104);
        assert_eq!(LAYOUT.field("volume_name").unwrap().0, 120);
        assert_eq!(LAYOUT.field("desc_size").unwrap().0, 254);
        assert_eq!(LAYOUT.field("mmp_block").unwrap().0, 360);
        assert_eq!(LAYOUT.field("usr_quota_inum").unwrap().0, 576);
        assert_eq!(LAYOUT.field("checksum").unwrap().0, 1020);
    }
}
