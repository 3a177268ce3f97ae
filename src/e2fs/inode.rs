//! Inodes: the 128-byte record, the indirect-block walker and the file body
//! reader.

use crate::record::{Field, Format, Layout, Rec, Symbols};
use crate::superblock::Superblock;
use crate::util::{ceil_div, pretty_time};
use crate::{Error, Result};
use bitflags::bitflags;
use byteorder::{ByteOrder, LittleEndian};

pub const S_IXOTH: u16 = 0x1;
pub const S_IWOTH: u16 = 0x2;
pub const S_IROTH: u16 = 0x4;
pub const S_IXGRP: u16 = 0x8;
pub const S_IWGRP: u16 = 0x10;
pub const S_IRGRP: u16 = 0x20;
pub const S_IXUSR: u16 = 0x40;
pub const S_IWUSR: u16 = 0x80;
pub const S_IRUSR: u16 = 0x100;
pub const S_ISVTX: u16 = 0x200;
pub const S_ISGID: u16 = 0x400;
pub const S_ISUID: u16 = 0x800;

pub const S_IFIFO: u16 = 0x1000;
pub const S_IFCHR: u16 = 0x2000;
pub const S_IFDIR: u16 = 0x4000;
pub const S_IFBLK: u16 = 0x6000;
pub const S_IFREG: u16 = 0x8000;
pub const S_IFLNK: u16 = 0xa000;
pub const S_IFSOCK: u16 = 0xc000;

/// `(type nibble, one-letter code)` for the mode string.
static FTYPES: &[(u16, char)] = &[
    (S_IFIFO, 'p'),
    (S_IFCHR, 'c'),
    (S_IFDIR, 'd'),
    (S_IFBLK, 'b'),
    (S_IFREG, 'f'),
    (S_IFLNK, 'l'),
    (S_IFSOCK, 's'),
];

bitflags! {
    /// Inode flags. Extent-mapped and inline-data inodes are recognized so
    /// the walker can flag them; their mappings are not interpreted.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct InodeFlags: u32 {
        const SECRM        = 0x1;
        const UNRM         = 0x2;
        const COMPR        = 0x4;
        const SYNC         = 0x8;
        const IMMUTABLE    = 0x10;
        const APPEND       = 0x20;
        const NODUMP       = 0x40;
        const NOATIME      = 0x80;
        const DIRTY        = 0x100;
        const COMPRBLK     = 0x200;
        const NOCOMPR      = 0x400;
        const ENCRYPT      = 0x800;
        const INDEX        = 0x1000;
        const IMAGIC       = 0x2000;
        const JOURNAL_DATA = 0x4000;
        const NOTAIL       = 0x8000;
        const DIRSYNC      = 0x10000;
        const TOPDIR       = 0x20000;
        const HUGE_FILE    = 0x40000;
        const EXTENTS      = 0x80000;
        const EA_INODE     = 0x200000;
        const EOFBLOCKS    = 0x400000;
        const SNAPFILE     = 0x01000000;
        const SNAPFILE_DELETED = 0x04000000;
        const SNAPFILE_SHRUNK  = 0x08000000;
        const INLINE_DATA  = 0x10000000;
        const PROJINHERIT  = 0x20000000;
        const RESERVED     = 0x80000000;
    }
}

static MODE_BITS: Symbols = &[
    (0x1, "S_IXOTH"),
    (0x2, "S_IWOTH"),
    (0x4, "S_IROTH"),
    (0x8, "S_IXGRP"),
    (0x10, "S_IWGRP"),
    (0x20, "S_IRGRP"),
    (0x40, "S_IXUSR"),
    (0x80, "S_IWUSR"),
    (0x100, "S_IRUSR"),
    (0x200, "S_ISVTX"),
    (0x400, "S_ISGID"),
    (0x800, "S_ISUID"),
    (0x1000, "S_IFIFO"),
    (0x2000, "S_IFCHR"),
    (0x4000, "S_IFDIR"),
    (0x6000, "S_IFBLK"),
    (0x8000, "S_IFREG"),
    (0xa000, "S_IFLNK"),
    (0xc000, "S_IFSOCK"),
];

static INODE_FLAGS: Symbols = &[
    (0x1, "EXT4_SECRM_FL"),
    (0x2, "EXT4_UNRM_FL"),
    (0x4, "EXT4_COMPR_FL"),
    (0x8, "EXT4_SYNC_FL"),
    (0x10, "EXT4_IMMUTABLE_FL"),
    (0x20, "EXT4_APPEND_FL"),
    (0x40, "EXT4_NODUMP_FL"),
    (0x80, "EXT4_NOATIME_FL"),
    (0x100, "EXT4_DIRTY_FL"),
    (0x200, "EXT4_COMPRBLK_FL"),
    (0x400, "EXT4_NOCOMPR_FL"),
    (0x800, "EXT4_ENCRYPT_FL"),
    (0x1000, "EXT4_INDEX_FL"),
    (0x2000, "EXT4_IMAGIC_FL"),
    (0x4000, "EXT4_JOURNAL_DATA_FL"),
    (0x8000, "EXT4_NOTAIL_FL"),
    (0x10000, "EXT4_DIRSYNC_FL"),
    (0x20000, "EXT4_TOPDIR_FL"),
    (0x40000, "EXT4_HUGE_FILE_FL"),
    (0x80000, "EXT4_EXTENTS_FL"),
    (0x200000, "EXT4_EA_INODE_FL"),
    (0x400000, "EXT4_EOFBLOCKS_FL"),
    (0x01000000, "EXT4_SNAPFILE_FL"),
    (0x04000000, "EXT4_SNAPFILE_DELETED_FL"),
    (0x08000000, "EXT4_SNAPFILE_SHRUNK_FL"),
    (0x10000000, "EXT4_INLINE_DATA_FL"),
    (0x20000000, "EXT4_PROJINHERIT_FL"),
    (0x80000000, "EXT4_RESERVED_FL"),
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
    name: "inode",
    size: 128,
    fields: &[
        fld!("mode", Format::U16, "File mode."),
        fld!("uid", Format::U16, "Lower 16-bits of owner UID."),
        fld!("size_lo", Format::U32, "Lower 32-bits of size in bytes."),
        fld!("atime", Format::U32, "Last access time."),
        fld!("ctime", Format::U32, "Last inode change time."),
        fld!("mtime", Format::U32, "Last data modification time."),
        fld!("dtime", Format::U32, "Deletion time."),
        fld!("gid", Format::U16, "Lower 16-bits of GID."),
        fld!("links_count", Format::U16, "Hard link count."),
        fld!("blocks_lo", Format::U32, "Lower 32-bits of block count, in 512-byte sectors."),
        fld!("flags", Format::U32, "Inode flags."),
        fld!("version", Format::U32, "Inode version."),
        fld!("block", Format::U32s(15), "Block map: 12 direct, then single/double/triple indirect."),
        fld!("generation", Format::U32, "File version (for NFS)."),
        fld!("file_acl_lo", Format::U32, "Lower 32-bits of extended attribute block."),
        fld!("size_high", Format::U32, "Upper 32-bits of file size."),
        fld!("obso_faddr", Format::U32, "(Obsolete) fragment address."),
        fld!("blocks_high", Format::U16, "Upper 16-bits of the block count."),
        fld!("file_acl_high", Format::U16, "Upper 16-bits of the extended attribute block."),
        fld!("uid_high", Format::U16, "Upper 16-bits of the owner UID."),
        fld!("gid_high", Format::U16, "Upper 16-bits of the GID."),
        fld!("checksum_lo", Format::U16, "Lower 16-bits of the inode checksum."),
        fld!("reserved0", Format::U16, "Unused."),
    ],
    enums: &[],
    flags: &[("mode", MODE_BITS), ("flags", INODE_FLAGS)],
};

/// A 128-byte inode view. `is_free` reflects the group's inode bitmap at
/// fetch time.
pub struct Inode<'fs> {
    pub rec: Rec<'fs>,
    pub sb: &'fs Superblock<'fs>,
    pub id: u32,
    pub bg: u32,
    pub is_free: bool,
}

impl<'fs> Inode<'fs> {
    pub fn mode(&self) -> Result<u16> {
        self.rec.u16f("mode")
    }

    pub fn size_lo(&self) -> Result<u32> {
        self.rec.u32f("size_lo")
    }

    pub fn blocks_lo(&self) -> Result<u32> {
        self.rec.u32f("blocks_lo")
    }

    pub fn links_count(&self) -> Result<u16> {
        self.rec.u16f("links_count")
    }

    pub fn flags(&self) -> Result<InodeFlags> {
        Ok(InodeFlags::from_bits_retain(self.rec.u32f("flags")?))
    }

    /// The 15-entry block map.
    pub fn block(&self) -> Result<Vec<u32>> {
        Ok(self.rec.list("block")?.iter().map(|v| *v as u32).collect())
    }

    /// The type nibble of `mode`.
    pub fn ftype(&self) -> Result<u16> {
        Ok(self.mode()? & 0xf000)
    }

    /// File blocks from `blocks_lo`, which counts 512-byte sectors and
    /// includes indirect blocks.
    pub fn block_count(&self) -> Result<u64> {
        Ok(self.blocks_lo()? as u64 >> (1 + self.sb.log_block_size()?))
    }

    /// `free` finding plus the unknown-ftype and layout checks.
    pub fn validate(&self, all: bool) -> Result<Vec<String>> {
        if self.is_free {
            self.rec.push_error("free".to_string());
            if !all {
                return Ok(self.rec.errors());
            }
        }
        let ftype = self.ftype()?;
        if !FTYPES.iter().any(|(t, _)| *t == ftype) {
            self.rec.push_error(format!("Invalid value {ftype:#x} for 'ftype'"));
            if !all {
                return Ok(self.rec.errors());
            }
        }
        self.rec.validate(all)
    }

    /// Ten-character mode string: type code, rwx triples, then the
    /// setuid/setgid/sticky bits after a comma.
    pub fn pretty_mode(&self) -> Result<String> {
        let mode = self.mode()?;
        let ftype = self.ftype()?;
        let mut s = String::with_capacity(14);
        s.push(
            FTYPES
                .iter()
                .find(|(t, _)| *t == ftype)
                .map(|(_, c)| *c)
                .unwrap_or('?'),
        );
        for (bit, ch) in [
            (S_IRUSR, 'r'),
            (S_IWUSR, 'w'),
            (S_IXUSR, 'x'),
            (S_IRGRP, 'r'),
            (S_IWGRP, 'w'),
            (S_IXGRP, 'x'),
            (S_IROTH, 'r'),
            (S_IWOTH, 'w'),
            (S_IXOTH, 'x'),
        ] {
            s.push(if mode & bit != 0 { ch } else { '-' });
        }
        s.push(',');
        for (bit, ch) in [(S_ISUID, 'u'), (S_ISGID, 'g'), (S_ISVTX, 't')] {
            s.push(if mode & bit != 0 { ch } else { '-' });
        }
        Ok(s)
    }

    /// Pretty form of a field; mode and timestamps get custom renderings.
    pub fn pretty_val(&self, name: &str) -> String {
        match name {
            "mode" => self
                .pretty_mode()
                .unwrap_or_else(|e| format!("<{e}>")),
            "atime" | "ctime" | "mtime" | "dtime" => match self.rec.u32f(name) {
                Ok(v) => pretty_time(v),
                Err(e) => format!("<{e}>"),
            },
            _ => self.rec.pretty_val(name),
        }
    }

    /// Walks the data-block ids of this file in logical order: 12 direct
    /// pointers, then the single, double and triple indirect trees.
    ///
    /// Zero pointers are holes and are never yielded. With `zero_ok` the
    /// whole present structure is walked; without it the walk is bounded to
    /// `block_count` logical positions, the analyzer's dense-file rule. An
    /// extent-mapped inode is flagged on the record before the walk starts.
    pub fn each_block(&self, zero_ok: bool) -> Result<BlockIter<'_>> {
        if self.flags()?.contains(InodeFlags::EXTENTS) {
            self.rec
                .push_error("extent-mapped inode; block map is not a pointer table".to_string());
        }
        let block = self.block()?;
        let block_size = self.sb.block_size()?;
        let per = block_size / 4;
        // popped in direct -> single -> double -> triple order
        let mut stack = Vec::with_capacity(15);
        stack.push((block[14], 3u8));
        stack.push((block[13], 2));
        stack.push((block[12], 1));
        for i in (0..12).rev() {
            stack.push((block[i], 0));
        }
        Ok(BlockIter {
            inode: self,
            stack,
            per,
            limit: if zero_ok { None } else { Some(self.block_count()?) },
            examined: 0,
            yielded: 0,
            meta: 0,
            blocks_count: self.sb.blocks_count_lo()?,
            block_size,
            strict: false,
            finished: false,
        })
    }

    /// Reads the file body as a lazy sequence of chunks. With `nl`, chunks
    /// split after each newline (or at `line_size` when none shows up);
    /// otherwise chunks are exactly `line_size` bytes. Emission stops after
    /// `size` bytes (`None` means `size_lo`) or when the block map runs out.
    pub fn each_line(&self, line_size: usize, nl: bool, size: Option<u64>) -> Result<LineIter<'_>> {
        Ok(LineIter {
            blocks: self.each_block(true)?,
            inode: self,
            buf: Vec::new(),
            line_size,
            nl,
            total: size.unwrap_or(self.size_lo()? as u64),
            read: 0,
            block_size: self.sb.block_size()?,
            done: false,
        })
    }

    /// Rewrites block-map slot `index` in place and drops the field cache.
    pub fn change_block(&self, index: usize, blkid: u32) -> Result<()> {
        let offset = self.rec.field_offset("block") + 4 * index as u64;
        self.rec.img().write_at(offset, &blkid.to_le_bytes())?;
        self.rec.invalidate();
        Ok(())
    }

    /// Rewrites `blocks_lo` to cover `nblks` file blocks, in 512-byte
    /// sectors.
    pub fn change_blkcount(&self, nblks: u32) -> Result<()> {
        let new_lo = nblks * (2 << self.sb.log_block_size()?);
        let offset = self.rec.field_offset("blocks_lo");
        self.rec.img().write_at(offset, &new_lo.to_le_bytes())?;
        self.rec.invalidate();
        Ok(())
    }
}

/// Explicit cursor machine over the block map. Yields data-block ids in
/// logical order; indirect blocks are read one at a time as their level is
/// entered.
pub struct BlockIter<'a> {
    inode: &'a Inode<'a>,
    /// Pending `(block id, depth)` pairs; depth 0 is a data pointer, higher
    /// depths are indirect blocks whose entries get pushed in reverse.
    stack: Vec<(u32, u8)>,
    per: u64,
    /// Logical positions to examine, `None` for the full structure.
    limit: Option<u64>,
    examined: u64,
    yielded: u64,
    /// Indirect blocks traversed; they count toward `blocks_lo`.
    meta: u64,
    blocks_count: u32,
    block_size: u64,
    strict: bool,
    finished: bool,
}

impl BlockIter<'_> {
    /// Makes an out-of-range pointer fatal (`InvalidBlkid`) instead of a
    /// recorded finding.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Positions covered by a subtree rooted at `depth`.
    fn subtree(&self, depth: u8) -> u64 {
        self.per.saturating_pow(depth as u32)
    }

    fn finish(&mut self) -> Option<Result<u32>> {
        self.finished = true;
        let inode = self.inode;
        if let (Ok(bc), Ok(size)) = (inode.block_count(), inode.size_lo()) {
            if self.yielded + self.meta != bc {
                inode.rec.push_error(format!(
                    "block count mismatch: walked {} + {} indirect, blocks_lo says {bc}",
                    self.yielded, self.meta
                ));
            }
            let by_size = ceil_div(size as u64, self.block_size);
            if self.yielded != by_size {
                inode.rec.push_error(format!(
                    "size mismatch: {} blocks for {size} bytes",
                    self.yielded
                ));
            }
        }
        None
    }

    fn bad_blkid(&mut self, blkid: u32) -> Option<Result<u32>> {
        if self.strict {
            self.finished = true;
            return Some(Err(Error::InvalidBlkid {
                blkid,
                max: self.blocks_count,
            }));
        }
        self.inode
            .rec
            .push_error(format!("Invalid block id {blkid}"));
        log::warn!(
            "inode {:#x}: invalid block id {blkid}, treated as a hole",
            self.inode.id
        );
        None
    }
}

impl Iterator for BlockIter<'_> {
    type Item = Result<u32>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.finished {
                return None;
            }
            if let Some(limit) = self.limit {
                if self.examined >= limit {
                    return self.finish();
                }
            }
            let Some((blkid, depth)) = self.stack.pop() else {
                return self.finish();
            };
            if depth == 0 {
                self.examined += 1;
                if blkid == 0 {
                    continue;
                }
                if blkid >= self.blocks_count {
                    match self.bad_blkid(blkid) {
                        Some(err) => return Some(err),
                        None => continue,
                    }
                }
                self.yielded += 1;
                return Some(Ok(blkid));
            }
            // an indirect block: zero means the whole subtree is a hole
            if blkid == 0 {
                self.examined += self.subtree(depth);
                continue;
            }
            if blkid >= self.blocks_count {
                let skipped = self.subtree(depth);
                match self.bad_blkid(blkid) {
                    Some(err) => return Some(err),
                    None => {
                        self.examined += skipped;
                        continue;
                    }
                }
            }
            let data = match self
                .inode
                .rec
                .img()
                .read_vec(blkid as u64 * self.block_size, self.block_size as usize)
            {
                Ok(data) => data,
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            };
            self.meta += 1;
            for chunk in data.chunks_exact(4).rev() {
                self.stack.push((LittleEndian::read_u32(chunk), depth - 1));
            }
        }
    }
}

/// Lazy chunk reader over a file body, fed by a [`BlockIter`].
pub struct LineIter<'a> {
    blocks: BlockIter<'a>,
    inode: &'a Inode<'a>,
    buf: Vec<u8>,
    line_size: usize,
    nl: bool,
    /// Bytes to emit in total.
    total: u64,
    /// Bytes read from the image so far.
    read: u64,
    block_size: u64,
    done: bool,
}

impl LineIter<'_> {
    fn split_at(&self) -> Option<usize> {
        if self.nl {
            if let Some(p) = self.buf.iter().position(|b| *b == 0x0a) {
                return Some(p + 1);
            }
        }
        if self.buf.len() > self.line_size {
            return Some(self.line_size);
        }
        None
    }
}

impl Iterator for LineIter<'_> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }
            if let Some(idx) = self.split_at() {
                let rest = self.buf.split_off(idx);
                let chunk = std::mem::replace(&mut self.buf, rest);
                return Some(Ok(chunk));
            }
            // refill from the next data block, or drain what is left
            let want = (self.total - self.read).min(self.block_size);
            let blkid = if want == 0 { None } else { self.blocks.next() };
            let Some(blkid) = blkid else {
                self.done = true;
                if self.buf.is_empty() {
                    return None;
                }
                return Some(Ok(std::mem::take(&mut self.buf)));
            };
            let blkid = match blkid {
                Ok(b) => b,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            };
            let data = match self
                .inode
                .rec
                .img()
                .read_vec(blkid as u64 * self.block_size, want as usize)
            {
                Ok(data) => data,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            };
            self.read += data.len() as u64;
            self.buf.extend_from_slice(&data);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn layout_is_consistent() {
        assert!(LAYOUT.size_consistent());
        // the block map starts at offset 40; the narrow edits depend on it
        assert_eq!(LAYOUT.field("block").unwrap().0, 40);
        assert_eq!(LAYOUT.field("blocks_lo").unwrap().0, 28);
        assert_eq!(LAYOUT.field("size_lo").unwrap().0, 4);
        assert_eq!(LAYOUT.field("reserved0").unwrap().0, 126);
    }
}
