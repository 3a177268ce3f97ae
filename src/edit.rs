//! The three narrow in-place edits, each behind an operator confirmation.

use crate::{show, Session};
use anyhow::{bail, Context, Result};
use e2fs::navigate::{cur_inode, name_or_inode, parse_id};
use e2fs::prompt::confirm;
use e2fs::Error;

fn are_you_sure() -> Result<()> {
    if !confirm("Are you sure? [y/N] ") {
        return Err(Error::Aborted.into());
    }
    Ok(())
}

/// `change_block <inode> <index> <blkid>`: rewrite one block-map slot.
pub fn change_block(sess: &Session<'_>, args: &[String]) -> Result<()> {
    let [token, index, blkid] = args else {
        bail!("usage: change_block <inode> <index> <blkid>");
    };
    let index: usize = index.parse().context("bad block index")?;
    if index >= 15 {
        bail!("block index out of range (0, 15): {index}");
    }
    let blkid = parse_id(blkid).context("bad block id")?;
    let id = name_or_inode(sess.sb, token, cur_inode(&sess.state))?;
    let inode = sess.sb.inode(id)?;
    println!("OLD blocks: {:?}", inode.block()?);
    let mut blocks = inode.block()?;
    blocks[index] = blkid;
    println!("NEW blocks: {blocks:?}");
    are_you_sure()?;
    inode.change_block(index, blkid)?;
    println!(
        "wrote 4 bytes at {}",
        inode.rec.field_offset("block") + 4 * index as u64
    );
    println!("now: {:?}", inode.block()?);
    Ok(())
}

/// `change_blkcount <inode> <nblks>`: rewrite `blocks_lo` to cover `nblks`
/// file blocks.
pub fn change_blkcount(sess: &Session<'_>, args: &[String]) -> Result<()> {
    let [token, nblks] = args else {
        bail!("usage: change_blkcount <inode> <nblks>");
    };
    let nblks: u32 = nblks.parse().context("bad block count")?;
    let id = name_or_inode(sess.sb, token, cur_inode(&sess.state))?;
    let inode = sess.sb.inode(id)?;
    let new_lo = nblks * (2 << sess.sb.log_block_size()?);
    println!(
        "Change blocks_lo of {:#x} from {} -> {new_lo}?",
        inode.id,
        inode.blocks_lo()?
    );
    are_you_sure()?;
    inode.change_blkcount(nblks)?;
    println!("now: blocks_lo = {}", inode.blocks_lo()?);
    Ok(())
}

/// `change_dir_entry <blkid> <name> <inode>`: repoint a directory entry.
pub fn change_dir_entry(sess: &Session<'_>, args: &[String]) -> Result<()> {
    let [blkid, name, inode] = args else {
        bail!("usage: change_dir_entry <blkid> <name> <inode>");
    };
    let blkid = parse_id(blkid).context("bad block id")?;
    let new_inode = parse_id(inode).context("bad inode id")?;
    show::blkls_at(sess, blkid)?;
    let dblk = e2fs::directory::DirectoryBlk::new(sess.sb, blkid);
    let mut target = None;
    for entry in dblk.each_entry()? {
        let entry = entry?;
        if entry.name_utf8()? == *name {
            target = Some(entry);
            break;
        }
    }
    let Some(entry) = target else {
        bail!("'{name}' not found in directory block #{blkid}");
    };
    println!(
        "Change '{name}' inode {:#x} => {new_inode:#x}",
        entry.inode()?
    );
    are_you_sure()?;
    entry.change_inode(new_inode)?;
    println!("now: {:#x}", entry.inode()?);
    Ok(())
}
