//! `ls`: recursive directory listing with validation.

use crate::{show, Session};
use anyhow::{bail, Context, Result};
use e2fs::directory::DirectoryBlk;
use e2fs::inode::{Inode, S_IFDIR};
use e2fs::navigate::{cur_inode, name_or_inode, parse_id};
use e2fs::util::ByteSize;

struct LsArgs {
    root: Option<String>,
    depth: usize,
    keep_going: bool,
    parent: Option<u32>,
}

fn parse_args(args: &[String]) -> Result<LsArgs> {
    let mut res = LsArgs {
        root: None,
        depth: 1,
        keep_going: false,
        parent: None,
    };
    let mut it = args.iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-d" | "--depth" => {
                res.depth = it
                    .next()
                    .context("missing value for --depth")?
                    .parse()
                    .context("bad --depth value")?;
            }
            "-k" | "--keep-going" => res.keep_going = true,
            "-p" | "--parent" => {
                let val = it.next().context("missing value for --parent")?;
                res.parent = Some(parse_id(val).context("bad --parent inode")?);
            }
            _ => res.root = Some(arg.clone()),
        }
    }
    Ok(res)
}

struct Walk<'a, 'fs> {
    sess: &'a Session<'fs>,
    depth_limit: usize,
    keep_going: bool,
    findings: Vec<String>,
}

impl Walk<'_, '_> {
    /// Records a finding; without `--keep-going` the first one aborts.
    fn finding(&mut self, msg: String) -> Result<()> {
        self.findings.push(msg);
        if !self.keep_going {
            bail!("{}", self.findings.last().unwrap());
        }
        Ok(())
    }

    fn branch(
        &mut self,
        inode: &Inode<'_>,
        parent: Option<u32>,
        depth: usize,
        path: &str,
    ) -> Result<()> {
        let sb = self.sess.sb;
        let indent = "  ".repeat(depth);
        for blkid in inode.each_block(true)? {
            let blkid = blkid?;
            let mut dblk = DirectoryBlk::new(sb, blkid);
            dblk.validate(true, false)?;
            println!("{indent}#{blkid}");
            if !dblk.errors.is_empty() {
                self.finding(format!(
                    "blk #{blkid} {path}: {}",
                    dblk.errors.join("; ")
                ))?;
            }
            for entry in &dblk.entries {
                let name = entry.name_utf8()?;
                let id = entry.inode()?;
                let entry_path = format!("{path}/{name}");
                if name.is_empty() && id == 0 {
                    continue;
                }
                if name == "." {
                    if id != inode.id {
                        self.finding(format!(
                            "{entry_path}: self inode mismatch {id:#x} != {:#x}",
                            inode.id
                        ))?;
                    }
                    continue;
                }
                if name == ".." {
                    if let Some(parent) = parent {
                        if id != parent {
                            self.finding(format!(
                                "{entry_path}: parent inode mismatch {id:#x} != {parent:#x}"
                            ))?;
                        }
                    }
                    continue;
                }
                let Ok(child) = sb.inode(id) else {
                    println!("{indent}{name}  {id:#x}  <invalid inode>");
                    self.finding(format!("{entry_path}: invalid inode {id:#x}"))?;
                    continue;
                };
                child.validate(true)?;
                let errors = child.rec.errors();
                let isdir = child.ftype()? == S_IFDIR;
                let tail = if errors.is_empty() {
                    format!(
                        "{}  {}",
                        child.pretty_mode()?,
                        ByteSize(child.size_lo()? as u64)
                    )
                } else {
                    format!("{} Errors", errors.len())
                };
                println!(
                    "{indent}{name}{}  {id:#x}  {tail}",
                    if isdir { "/" } else { "" }
                );
                if !errors.is_empty() {
                    self.finding(format!(
                        "inode {id:#x} {entry_path}: {}",
                        errors.join("; ")
                    ))?;
                }
                if isdir && depth + 1 < self.depth_limit {
                    self.branch(&child, Some(inode.id), depth + 1, &entry_path)?;
                }
            }
        }
        Ok(())
    }
}

pub fn ls(sess: &Session<'_>, args: &[String]) -> Result<()> {
    let args = parse_args(args)?;
    let root = match &args.root {
        Some(token) => name_or_inode(sess.sb, token, cur_inode(&sess.state))?,
        None => cur_inode(&sess.state),
    };
    let mut walk = Walk {
        sess,
        depth_limit: args.depth,
        keep_going: args.keep_going,
        findings: Vec::new(),
    };
    let inode = sess.sb.inode(root)?;
    inode.validate(true)?;
    if inode.rec.has_errors() {
        walk.finding(format!(
            "inode {root:#x}: {}",
            inode.rec.errors().join("; ")
        ))?;
    }
    walk.branch(&inode, args.parent, 0, "")?;
    if args.keep_going {
        show::print_errors(&walk.findings);
        println!("{} findings", walk.findings.len());
    }
    Ok(())
}
