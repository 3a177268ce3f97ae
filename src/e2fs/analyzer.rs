//! Whole-image scan for directory-shaped blocks and data blocks reachable
//! from plausible inodes.
//!
//! On a damaged image the in-use bitmaps and the directory tree may disagree
//! or be partially zeroed, so the analyzer classifies every block by shape
//! instead: group head blocks, blocks that parse cleanly as directories, and
//! blocks reachable from inodes those directories point at. Progress is
//! checkpointed after every block group; interrupting between checkpoints
//! loses at most one group of work.

use crate::bitmap::Bitmap;
use crate::blkgrp::BlockGroup;
use crate::crc32;
use crate::directory::DirectoryBlk;
use crate::inode::S_IFDIR;
use crate::superblock::Superblock;
use crate::util::ceil_div;
use crate::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Checkpoint schema version; any mismatch restarts the scan from group 0.
pub const VERSION: u32 = 1;

/// `<prefix>_info`: where to resume, gated by the schema version.
#[derive(Serialize, Deserialize)]
struct ScanInfo {
    version: u32,
    bg_next: u32,
}

/// `<prefix>_bg<N>`: what one group's scan found.
#[derive(Default, Serialize, Deserialize)]
struct GroupDump {
    dir_blkids: BTreeSet<u32>,
    inode_ids: BTreeSet<u32>,
}

/// Blocks between two progress callbacks within one group.
const PROGRESS_INTERVAL: u32 = 1024;

/// A progress snapshot published to the sink.
pub struct Progress {
    pub bg: u32,
    pub bg_count: u32,
    pub blkids_found: u64,
    pub inodes_found: u64,
    pub valid_count: u64,
}

/// Final tallies over the whole image.
pub struct Totals {
    pub dir_blkids: u64,
    pub inodes: u64,
    pub valid: u64,
    pub blocks_count: u32,
    pub inode_count: u32,
}

pub struct Analyzer<'fs> {
    sb: &'fs Superblock<'fs>,
    prefix: PathBuf,
}

struct Counters {
    blkids: u64,
    inodes: u64,
    valid: u64,
}

impl<'fs> Analyzer<'fs> {
    /// `prefix` names the checkpoint files: `<prefix>_info`,
    /// `<prefix>_blocks.data` and `<prefix>_bg<N>`.
    pub fn new(sb: &'fs Superblock<'fs>, prefix: PathBuf) -> Self {
        Self { sb, prefix }
    }

    fn info_path(&self) -> PathBuf {
        suffixed(&self.prefix, "_info")
    }

    fn blocks_path(&self) -> PathBuf {
        suffixed(&self.prefix, "_blocks.data")
    }

    fn bg_path(&self, bg: u32) -> PathBuf {
        suffixed(&self.prefix, &format!("_bg{bg}"))
    }

    /// Directory for the search/isearch caches, next to the checkpoints.
    fn state_dir(&self) -> &Path {
        self.prefix.parent().unwrap_or(Path::new("."))
    }

    /// The group to resume from, if the persisted version matches.
    fn load_resume_point(&self) -> Option<u32> {
        let data = fs::read(self.info_path()).ok()?;
        let info: ScanInfo = bincode::deserialize(&data).ok()?;
        (info.version == VERSION).then_some(info.bg_next)
    }

    fn load_dump(&self, bg: u32) -> Option<GroupDump> {
        let data = fs::read(self.bg_path(bg)).ok()?;
        bincode::deserialize(&data).ok()
    }

    /// Runs the scan to completion, resuming from the last checkpoint when
    /// one is compatible. `progress` is called at every group boundary and
    /// every [`PROGRESS_INTERVAL`] blocks within a group.
    pub fn run(&self, progress: &mut dyn FnMut(&Progress)) -> Result<Totals> {
        let bg_count = self.sb.bg_count()?;
        let nbytes = ceil_div(self.sb.blocks_count_lo()? as u64, 8) as usize;
        if let Some(dir) = self.prefix.parent() {
            fs::create_dir_all(dir)?;
        }
        let mut bg = self.load_resume_point().unwrap_or_else(|| {
            let _ = fs::remove_file(self.blocks_path());
            0
        });
        let mut valid = match fs::read(self.blocks_path()) {
            Ok(buf) if buf.len() == nbytes => Bitmap::mem(buf),
            _ => {
                bg = 0;
                Bitmap::mem(vec![0; nbytes])
            }
        };
        let mut counters = Counters {
            blkids: 0,
            inodes: 0,
            valid: valid.count()? as u64,
        };
        log::info!("analyze: starting from group {bg}/{bg_count}");
        while bg < bg_count {
            let bgrp = self.sb.blkgrp(bg)?;
            let dump = self.scan_group(&bgrp, &mut valid, &mut counters, progress)?;
            counters.blkids += dump.dir_blkids.len() as u64;
            counters.inodes += dump.inode_ids.len() as u64;
            // checkpoint: valid map first, then the per-group dump, then the
            // resume pointer that makes them authoritative
            fs::write(self.blocks_path(), valid.raw_bytes()?)?;
            let data = bincode::serialize(&dump).expect("serialize scan dump");
            fs::write(self.bg_path(bg), data)?;
            let info = ScanInfo {
                version: VERSION,
                bg_next: bg + 1,
            };
            fs::write(
                self.info_path(),
                bincode::serialize(&info).expect("serialize scan info"),
            )?;
            bg += 1;
            progress(&Progress {
                bg,
                bg_count,
                blkids_found: counters.blkids,
                inodes_found: counters.inodes,
                valid_count: counters.valid,
            });
        }
        self.totals()
    }

    /// Classifies the blocks of one group. Returns the directory-shaped
    /// block ids and the ids of inodes that passed validation.
    fn scan_group(
        &self,
        bgrp: &BlockGroup<'_>,
        valid: &mut Bitmap<'_>,
        counters: &mut Counters,
        progress: &mut dyn FnMut(&Progress),
    ) -> Result<GroupDump> {
        let sb = self.sb;
        let block_size = sb.block_size()?;
        let blocks_count = sb.blocks_count_lo()?;
        let blocks_per_group = sb.blocks_per_group()?;
        let head = bgrp.head_count()?;
        let base = bgrp.bg as u64 * blocks_per_group as u64;
        let mut dump = GroupDump::default();
        for i in 0..blocks_per_group {
            let blkid = base + i as u64;
            if blkid >= blocks_count as u64 {
                break;
            }
            let blkid = blkid as u32;
            if (i as u64) < head && !valid.bit(blkid as usize)? {
                valid.set(blkid as usize, true)?;
                counters.valid += 1;
            }
            if valid.bit(blkid as usize)? {
                continue;
            }
            if i % PROGRESS_INTERVAL == 0 {
                progress(&Progress {
                    bg: bgrp.bg,
                    bg_count: sb.bg_count()?,
                    blkids_found: counters.blkids + dump.dir_blkids.len() as u64,
                    inodes_found: counters.inodes + dump.inode_ids.len() as u64,
                    valid_count: counters.valid,
                });
            }
            // directory-shaped?
            let mut dblk = DirectoryBlk::new(sb, blkid);
            dblk.validate(true, true)?;
            if !dblk.errors.is_empty() {
                continue;
            }
            dump.dir_blkids.insert(blkid);
            // chase every entry's inode
            for entry in &dblk.entries {
                let id = entry.inode()?;
                let Ok(inode) = sb.inode(id) else { continue };
                if dump.inode_ids.contains(&id) {
                    continue;
                }
                // a free inode can still be good on a wiped image; any
                // other finding disqualifies
                let findings = inode.validate(true)?;
                if findings.iter().any(|f| f != "free") {
                    continue;
                }
                let mut ids = BTreeSet::new();
                let mut ok = true;
                for blk in inode.each_block(false)?.strict() {
                    match blk {
                        Ok(b) => {
                            ids.insert(b);
                        }
                        Err(_) => {
                            ok = false;
                            break;
                        }
                    }
                }
                if !ok || ids.is_empty() {
                    continue;
                }
                let n = ids.len() as u64;
                let size = inode.size_lo()? as u64;
                if size <= (n - 1) * block_size || size > n * block_size {
                    continue;
                }
                dump.inode_ids.insert(id);
                if inode.ftype()? != S_IFDIR {
                    for blk in ids {
                        if !valid.bit(blk as usize)? {
                            valid.set(blk as usize, true)?;
                            counters.valid += 1;
                        }
                    }
                }
            }
        }
        Ok(dump)
    }

    /// Reloads every per-group dump and tallies the final counts.
    pub fn totals(&self) -> Result<Totals> {
        let mut dirs: BTreeSet<u32> = BTreeSet::new();
        let mut inodes: BTreeSet<u32> = BTreeSet::new();
        for bg in 0..self.sb.bg_count()? {
            if let Some(dump) = self.load_dump(bg) {
                dirs.extend(dump.dir_blkids);
                inodes.extend(dump.inode_ids);
            }
        }
        let valid = match fs::read(self.blocks_path()) {
            Ok(buf) => Bitmap::mem(buf).count()? as u64,
            Err(_) => 0,
        };
        Ok(Totals {
            dir_blkids: dirs.len() as u64,
            inodes: inodes.len() as u64,
            valid,
            blocks_count: self.sb.blocks_count_lo()?,
            inode_count: self.sb.inode_count()?,
        })
    }

    /// The union of every persisted per-group directory-block set.
    pub fn dir_blkids(&self) -> Result<BTreeSet<u32>> {
        let mut out = BTreeSet::new();
        for bg in 0..self.sb.bg_count()? {
            if let Some(dump) = self.load_dump(bg) {
                out.extend(dump.dir_blkids);
            }
        }
        Ok(out)
    }

    /// Directory blocks containing at least one entry whose name matches
    /// `re` (built from `pattern`). Results are memoized on disk keyed by a
    /// hash of the pattern.
    pub fn search(&self, pattern: &str, re: &Regex) -> Result<BTreeSet<u32>> {
        let key = format!("{:08x}", crc32::checksum(pattern.as_bytes()));
        let cache = self.state_dir().join("search").join(key);
        self.cached_scan(&cache, |entry_name, _| re.is_match(entry_name))
    }

    /// Directory blocks containing an entry that points at `inode`.
    pub fn isearch(&self, inode: u32) -> Result<BTreeSet<u32>> {
        let cache = self.state_dir().join("isearch").join(format!("{inode:#x}"));
        self.cached_scan(&cache, |_, entry_inode| entry_inode == inode)
    }

    fn cached_scan(
        &self,
        cache: &Path,
        mut matches: impl FnMut(&str, u32) -> bool,
    ) -> Result<BTreeSet<u32>> {
        if let Ok(data) = fs::read(cache) {
            if let Ok(hits) = bincode::deserialize(&data) {
                return Ok(hits);
            }
        }
        let mut hits = BTreeSet::new();
        for blkid in self.dir_blkids()? {
            let dblk = DirectoryBlk::new(self.sb, blkid);
            for entry in dblk.each_entry()? {
                let entry = entry?;
                if matches(&entry.name_utf8()?, entry.inode()?) {
                    hits.insert(blkid);
                    break;
                }
            }
        }
        if let Some(dir) = cache.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(cache, bincode::serialize(&hits).expect("serialize matches"))?;
        Ok(hits)
    }
}

fn suffixed(prefix: &Path, suffix: &str) -> PathBuf {
    let mut name = prefix.file_name().unwrap_or_default().to_os_string();
    name.push(suffix);
    prefix.with_file_name(name)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn suffixes() {
        assert_eq!(
            suffixed(Path::new("local/analysis"), "_info"),
            PathBuf::from("local/analysis_info")
        );
        assert_eq!(
            suffixed(Path::new("local/analysis"), "_bg3"),
            PathBuf::from("local/analysis_bg3")
        );
    }
}
