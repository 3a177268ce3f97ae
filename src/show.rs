//! Record-dump commands: superblocks, descriptor comparison, block groups,
//! inodes and raw/parsed block views.

use crate::{hex, Session};
use anyhow::{bail, Context, Result};
use e2fs::directory::DirectoryBlk;
use e2fs::inode::{Inode, S_IFDIR};
use e2fs::navigate::{cur_inode, name_or_inode, parse_id};
use e2fs::record::Rec;
use e2fs::util::ByteSize;

/// Prints a record as a `field  value` table, then its findings.
fn print_fields(rec: &Rec<'_>, pretty: &dyn Fn(&str) -> String) {
    for field in rec.layout().fields {
        println!("{:>24}  {}", field.name, pretty(field.name));
    }
    print_errors(&rec.errors());
}

pub(crate) fn print_errors(errors: &[String]) {
    if errors.is_empty() {
        return;
    }
    println!("Errors:");
    for err in errors {
        println!("  * {err}");
    }
}

fn limit_arg(args: &[String], default: usize) -> Result<usize> {
    let mut limit = default;
    let mut it = args.iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-l" | "--limit" => {
                limit = it
                    .next()
                    .context("missing value for --limit")?
                    .parse()
                    .context("bad --limit value")?;
            }
            other => bail!("unexpected argument `{other}`"),
        }
    }
    Ok(limit)
}

/// `superblocks [-l <n>]`: the primary in full, backups as diffs against
/// it.
pub fn superblocks(sess: &Session<'_>, args: &[String]) -> Result<()> {
    let limit = limit_arg(args, 1)?;
    let sb = sess.sb;
    let primary_bg = sb.block_group_nr()? as u32;
    for (i, (bgrp, backup)) in sb.super_bgs()?.into_iter().enumerate() {
        println!(
            "== bg {}  @ {}",
            bgrp.bg,
            ByteSize(backup.rec.offset())
        );
        if bgrp.bg == primary_bg {
            println!("{}", sb.summary()?);
            print_fields(&sb.rec, &|name| sb.pretty_val(name));
        } else {
            for (name, theirs, ours) in backup.rec.diff(&sb.rec)? {
                println!("{name:>24}  {theirs}  (primary: {ours})");
            }
            print_errors(&backup.rec.errors());
        }
        if i + 1 == limit {
            break;
        }
    }
    Ok(())
}

/// `descriptors [-l <n>]`: every descriptor bucket across the backups,
/// cross-checked against the group's computed layout and its bitmaps.
pub fn descriptors(sess: &Session<'_>, args: &[String]) -> Result<()> {
    let limit = limit_arg(args, 0)?;
    let sb = sess.sb;
    let bpg = sb.blocks_per_group()?;
    let ipg = sb.inodes_per_group()?;
    for d in sb.all_block_descriptors()? {
        if limit != 0 && d.desc.bg as usize >= limit {
            continue;
        }
        let bgrp = sb.blkgrp(d.desc.bg)?;
        let mark = if bgrp.is_super()? { '$' } else { '#' };
        let mut line = format!("{mark}{},{}  ({})  ", d.desc.bg, d.desc.bg_src, d.copies);

        let free_blocks = bpg as usize - bgrp.data_bitmap()?.count()?;
        let desc_free_blocks = d.desc.free_blocks_count_lo()? as usize;
        push_checked(&mut line, free_blocks, desc_free_blocks);
        line.push('/');
        let free_inodes = ipg as usize - bgrp.inode_bitmap()?.count()?;
        push_checked(&mut line, free_inodes, d.desc.free_inodes_count_lo()? as usize);
        line.push_str("  ");

        let offset = bgrp.bitmap_offset()? + d.desc.bg as u64 * bpg as u64;
        push_checked(&mut line, offset as usize, d.desc.block_bitmap_lo()? as usize);
        line.push('+');
        push_checked(
            &mut line,
            1,
            (d.desc.inode_bitmap_lo()? as u64).wrapping_sub(offset) as usize,
        );
        line.push('+');
        push_checked(
            &mut line,
            2,
            (d.desc.inode_table_lo()? as u64).wrapping_sub(offset) as usize,
        );
        println!("{line}");
    }
    Ok(())
}

/// Renders `got`, annotated when it disagrees with `expected`.
fn push_checked(line: &mut String, expected: usize, got: usize) {
    if expected == got {
        line.push_str(&expected.to_string());
    } else {
        line.push_str(&format!("{expected}!={got}"));
    }
}

/// `blkgrp <bg> [-f|--free]`.
pub fn blkgrp(sess: &Session<'_>, args: &[String]) -> Result<()> {
    let mut bg = None;
    let mut free = false;
    for arg in args {
        match arg.as_str() {
            "-f" | "--free" => free = true,
            other => bg = Some(parse_id(other).context("bad block group id")?),
        }
    }
    let bg = bg.unwrap_or(0);
    let sb = sess.sb;
    let bgrp = sb.blkgrp(bg)?;
    let free_blocks = sb.blocks_per_group()? as usize - bgrp.data_bitmap()?.count()?;
    let free_inodes = sb.inodes_per_group()? as usize - bgrp.inode_bitmap()?.count()?;
    println!(
        "BlockGroup #{bg}{}  free data/inode: {free_blocks} / {free_inodes}",
        if bgrp.is_super()? { "  SUPER" } else { "" }
    );
    if free {
        let bitmap = bgrp.data_bitmap()?;
        let base = bg as u64 * sb.blocks_per_group()? as u64;
        let mut ids = Vec::new();
        for i in 0..sb.blocks_per_group()? as usize {
            if base + (i as u64) >= sb.blocks_count_lo()? as u64 {
                break;
            }
            if !bitmap.bit(i)? {
                ids.push((base + i as u64).to_string());
            }
        }
        println!("{}", ids.join("  "));
    }
    Ok(())
}

fn print_inode(inode: &Inode<'_>) {
    print_fields(&inode.rec, &|name| inode.pretty_val(name));
}

/// `root_inodes`: the reserved inodes with their conventional roles.
pub fn root_inodes(sess: &Session<'_>, _args: &[String]) -> Result<()> {
    const ROLES: [&str; 11] = [
        "Defective blocks",
        "Root directory",
        "User quota",
        "Group quota",
        "Boot loader",
        "Undelete directory",
        "resize",
        "journal",
        "exclude",
        "replica",
        "lost_found",
    ];
    for (i, role) in ROLES.iter().enumerate() {
        let inode = sess.sb.inode(i as u32 + 1)?;
        inode.validate(true)?;
        println!(
            "== {:#x} {role}  nblks: {}",
            inode.id,
            inode.block_count()?
        );
        print_inode(&inode);
    }
    Ok(())
}

/// `inode <name-or-id>`.
pub fn inode(sess: &Session<'_>, args: &[String]) -> Result<()> {
    let [token] = args else {
        bail!("usage: inode <name-or-id>");
    };
    let id = name_or_inode(sess.sb, token, cur_inode(&sess.state))?;
    let inode = sess.sb.inode(id)?;
    inode.validate(true)?;
    println!(
        "== {:#x} #{}{}  nblks: {}",
        inode.id,
        inode.bg,
        if inode.is_free { "  free" } else { "" },
        inode.block_count()?
    );
    print_inode(&inode);
    Ok(())
}

/// `blk_data <blkid>`: raw hex of one block.
pub fn blk_data(sess: &Session<'_>, args: &[String]) -> Result<()> {
    let [token] = args else {
        bail!("usage: blk_data <blkid>");
    };
    let blkid = parse_id(token).context("bad block id")?;
    let sb = sess.sb;
    let block_size = sb.block_size()?;
    // the read comes first: out-of-range ids fail with EOF, not group math
    let data = sb.rec.img().read_vec(blkid as u64 * block_size, block_size as usize)?;
    let bgrp = sb.blkgrp(blkid / sb.blocks_per_group()?)?;
    let free = bgrp.blkidx_free((blkid % sb.blocks_per_group()?) as usize)?;
    println!(
        "== #{blkid}  bg:{} @ {}  {}",
        bgrp.bg,
        ByteSize(blkid as u64 * block_size),
        if free { "free" } else { "in use" }
    );
    hex::dump(&data, blkid as u64 * block_size);
    Ok(())
}

/// `blkls <blkid>`: one block parsed as a directory, entries annotated
/// with their inodes.
pub fn blkls(sess: &Session<'_>, args: &[String]) -> Result<()> {
    let [token] = args else {
        bail!("usage: blkls <blkid>");
    };
    let blkid = parse_id(token).context("bad block id")?;
    blkls_at(sess, blkid)
}

pub(crate) fn blkls_at(sess: &Session<'_>, blkid: u32) -> Result<()> {
    let sb = sess.sb;
    println!("== #{blkid}");
    let mut dblk = DirectoryBlk::new(sb, blkid);
    dblk.validate(true, false)?;
    print_errors(&dblk.errors);
    for entry in &dblk.entries {
        let name = entry.name_utf8()?;
        let id = entry.inode()?;
        match sb.inode(id) {
            Ok(inode) => {
                inode.validate(true)?;
                let errors = inode.rec.errors();
                let tail = if errors.iter().any(|e| e != "free") {
                    format!("{} Errors", errors.len())
                } else {
                    format!("{}  {}", inode.pretty_mode()?, ByteSize(inode.size_lo()? as u64))
                };
                let marker = match (inode.is_free, inode.ftype()? == S_IFDIR) {
                    (true, _) => "  (free)",
                    (false, true) => "/",
                    (false, false) => "",
                };
                println!("{name}{marker}  {id:#x}  {tail}");
            }
            Err(_) => println!("{name}  {id:#x}  Invalid inode ID"),
        }
    }
    Ok(())
}
