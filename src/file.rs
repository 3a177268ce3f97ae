//! `cat` and `cp`: streaming a file body out of the image.

use crate::{hex, Session};
use anyhow::{bail, Context, Result};
use e2fs::inode::{Inode, S_IFDIR, S_IFLNK, S_IFREG};
use e2fs::navigate::{cur_inode, name_or_inode};
use e2fs::util::ByteSize;
use std::fs::File;
use std::io::Write;

fn resolve<'a>(sess: &'a Session<'_>, token: &str) -> Result<Inode<'a>> {
    let id = name_or_inode(sess.sb, token, cur_inode(&sess.state))?;
    Ok(sess.sb.inode(id)?)
}

/// Special files keep their payload in the block-map area: a fast symlink
/// stores its target there, devices their numbers.
fn cat_special(inode: &Inode<'_>) -> Result<()> {
    let raw = inode
        .rec
        .img()
        .read_vec(inode.rec.field_offset("block"), 60)?;
    if inode.ftype()? == S_IFLNK {
        println!("{}", String::from_utf8_lossy(&raw));
    } else {
        hex::dump(&raw, 0);
    }
    Ok(())
}

/// `cat <name-or-id> [-b|--binary] [-s <size>]`.
pub fn cat(sess: &Session<'_>, args: &[String]) -> Result<()> {
    let mut token = None;
    let mut binary = false;
    let mut size = None;
    let mut it = args.iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-b" | "--binary" => binary = true,
            "-s" | "--size" => {
                size = Some(
                    it.next()
                        .context("missing value for --size")?
                        .parse()
                        .context("bad --size value")?,
                );
            }
            _ => token = Some(arg.clone()),
        }
    }
    let token = token.context("usage: cat <name-or-id> [-b] [-s <size>]")?;
    let inode = resolve(sess, &token)?;
    println!(
        "== {:#x} {} {}",
        inode.id,
        inode.pretty_mode()?,
        ByteSize(inode.size_lo()? as u64)
    );
    if inode.ftype()? != S_IFDIR && inode.ftype()? != S_IFREG {
        return cat_special(&inode);
    }
    if binary {
        let mut offset = 0;
        for chunk in inode.each_line(16, false, size)? {
            let chunk = chunk?;
            hex::dump(&chunk, offset);
            offset += chunk.len() as u64;
        }
    } else {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        for chunk in inode.each_line(4096, true, size)? {
            out.write_all(&chunk?)?;
        }
        out.flush()?;
    }
    Ok(())
}

/// `cp <name-or-id> <dest>`: copy a regular file to the host.
pub fn cp(sess: &Session<'_>, args: &[String]) -> Result<()> {
    let [token, dest] = args else {
        bail!("usage: cp <name-or-id> <dest>");
    };
    let inode = resolve(sess, token)?;
    if inode.ftype()? != S_IFREG {
        bail!("bad file type {}", inode.pretty_mode()?);
    }
    let block_size = sess.sb.block_size()?;
    let mut out = File::create(dest).with_context(|| format!("cannot create {dest}"))?;
    let mut remaining = inode.size_lo()? as u64;
    for blkid in inode.each_block(true)? {
        let blkid = blkid?;
        let want = remaining.min(block_size);
        if want == 0 {
            break;
        }
        let data = sess
            .sb
            .rec
            .img()
            .read_vec(blkid as u64 * block_size, want as usize)?;
        log::debug!("read {} bytes from block {blkid}", data.len());
        out.write_all(&data)?;
        remaining -= data.len() as u64;
    }
    out.flush()?;
    println!(
        "{} -> {dest}",
        ByteSize(inode.size_lo()? as u64 - remaining)
    );
    Ok(())
}
