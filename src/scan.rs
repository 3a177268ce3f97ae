//! `analyze`, `search` and `isearch`: the whole-image scan and its query
//! surface.

use crate::{show, Session};
use anyhow::{bail, Context, Result};
use e2fs::analyzer::{Analyzer, Progress};
use e2fs::directory::DirectoryBlk;
use e2fs::navigate::parse_id;
use regex::RegexBuilder;
use std::io::Write;
use std::path::PathBuf;

fn analyzer<'a>(sess: &'a Session<'_>, prefix: Option<&String>) -> Analyzer<'a> {
    let prefix = prefix
        .map(PathBuf::from)
        .unwrap_or_else(|| sess.state.join("analysis"));
    Analyzer::new(sess.sb, prefix)
}

/// `analyze [prefix]`: run the scan to completion, resuming when possible.
pub fn analyze(sess: &Session<'_>, args: &[String]) -> Result<()> {
    if args.len() > 1 {
        bail!("usage: analyze [prefix]");
    }
    let analyzer = analyzer(sess, args.first());
    let totals = analyzer.run(&mut |p: &Progress| {
        eprint!(
            "\r#{}/{}  blkids:{}  inodes:{}  valid:{}    ",
            p.bg, p.bg_count, p.blkids_found, p.inodes_found, p.valid_count
        );
        let _ = std::io::stderr().flush();
    })?;
    eprintln!();
    println!(
        "blkids:{}  valid:{}/{}  inodes:{}/{}",
        totals.dir_blkids, totals.valid, totals.blocks_count, totals.inodes, totals.inode_count
    );
    Ok(())
}

/// `search <regex>`: case-insensitive full-name match over the scanned
/// directory blocks.
pub fn search(sess: &Session<'_>, args: &[String]) -> Result<()> {
    let [pattern] = args else {
        bail!("usage: search <regex>");
    };
    let re = RegexBuilder::new(&format!("^(?:{pattern})$"))
        .case_insensitive(true)
        .build()
        .context("bad pattern")?;
    let analyzer = analyzer(sess, None);
    let matches = analyzer.search(pattern, &re)?;
    for blkid in &matches {
        let dblk = DirectoryBlk::new(sess.sb, *blkid);
        for entry in dblk.each_entry()? {
            let entry = entry?;
            let name = entry.name_utf8()?;
            if re.is_match(&name) {
                println!("{blkid} : {name}  {:#x}", entry.inode()?);
                break;
            }
        }
    }
    println!("{} blocks found", matches.len());
    Ok(())
}

/// `isearch <inode>`: directory blocks with an entry pointing at `inode`.
pub fn isearch(sess: &Session<'_>, args: &[String]) -> Result<()> {
    let [token] = args else {
        bail!("usage: isearch <inode>");
    };
    let inode = parse_id(token).context("bad inode id")?;
    let analyzer = analyzer(sess, None);
    let matches = analyzer.isearch(inode)?;
    for blkid in &matches {
        show::blkls_at(sess, *blkid)?;
    }
    println!("{} blocks found", matches.len());
    Ok(())
}
