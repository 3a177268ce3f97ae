//! `e2probe`: forensic inspector for ext2/ext3/ext4 filesystem images.
//!
//! One binary, many subcommands, dispatched from here. The image path comes
//! from `-f`/`--fname` or the `IMG_FILE` environment variable; the image is
//! opened read-only unless `-w`/`--write` is given.

mod edit;
mod file;
mod hex;
mod list;
mod scan;
mod shell;
mod show;

use anyhow::bail;
use e2fs::error;
use e2fs::image::Image;
use e2fs::superblock::{Incompat, Superblock};
use std::env;
use std::path::PathBuf;
use std::process::exit;

/// Per-invocation context handed to every command.
pub struct Session<'fs> {
    pub sb: &'fs Superblock<'fs>,
    /// Directory for persisted state: cwd, analyzer checkpoints, caches.
    pub state: PathBuf,
}

/// Structure storing command line arguments.
struct Args {
    help: bool,
    fname: Option<PathBuf>,
    sb_offset: u64,
    write: bool,
    state: PathBuf,
    /// The command name followed by its own arguments.
    cmd: Vec<String>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            help: false,
            fname: None,
            sb_offset: e2fs::superblock::SUPERBLOCK_OFFSET,
            write: false,
            state: PathBuf::from("local"),
            cmd: Vec::new(),
        }
    }
}

fn parse_args(args: env::ArgsOs) -> Args {
    let mut res: Args = Default::default();
    let mut args = args.map(|arg| {
        arg.into_string()
            .unwrap_or_else(|_| error("e2probe", "arguments must be valid UTF-8"))
    });
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => res.help = true,
            "-w" | "--write" => res.write = true,
            "-f" | "--fname" => {
                res.fname = Some(PathBuf::from(args.next().unwrap_or_else(|| {
                    error("e2probe", "missing value for --fname");
                })));
            }
            "--sb" => {
                let val = args.next().unwrap_or_else(|| {
                    error("e2probe", "missing value for --sb");
                });
                res.sb_offset = val.parse().unwrap_or_else(|_| {
                    error("e2probe", format_args!("bad superblock offset `{val}`"));
                });
            }
            "--state" => {
                res.state = PathBuf::from(args.next().unwrap_or_else(|| {
                    error("e2probe", "missing value for --state");
                }));
            }
            _ => {
                res.cmd.push(arg);
                res.cmd.extend(args);
                break;
            }
        }
    }
    res
}

/// Prints command help.
fn print_help() {
    println!();
    println!("Usage:");
    println!(" e2probe [options] <command> [args...]");
    println!();
    println!("Inspects an ext2/ext3/ext4 image and helps repair damaged metadata.");
    println!();
    println!("Options:");
    println!(" -h, --help\t\tPrints help.");
    println!(" -f, --fname <path>\tThe image file (default: $IMG_FILE).");
    println!(" -w, --write\t\tOpens the image read/write (edits only).");
    println!("     --sb <offset>\tByte offset of the primary superblock (default 1024).");
    println!("     --state <dir>\tDirectory for cwd and analyzer state (default `local`).");
    println!();
    println!("Commands:");
    println!(" superblocks [-l <n>]\t\tDump the primary superblock and its backups.");
    println!(" descriptors [-l <n>]\t\tCompare descriptor tables across backups.");
    println!(" blkgrp <bg> [-f]\t\tBlock group summary; -f lists free block ids.");
    println!(" root_inodes\t\t\tDump the reserved inodes 1..11.");
    println!(" inode <name-or-id>\t\tDump one inode.");
    println!(" blk_data <blkid>\t\tHex dump of one block.");
    println!(" blkls <blkid>\t\t\tParse one block as a directory.");
    println!(" ls [root] [-d <n>] [-k] [-p <id>]\tRecursive listing with validation.");
    println!(" cat <name-or-id> [-b] [-s <n>]\tStream a file body.");
    println!(" cp <name-or-id> <dest>\t\tCopy a file out of the image.");
    println!(" cd <name-or-id>\t\tChange the persisted working directory.");
    println!(" shell\t\t\t\tInteractive prompt over these commands.");
    println!(" analyze [prefix]\t\tScan the whole image (resumable).");
    println!(" search <regex>\t\t\tSearch scanned directory blocks by name.");
    println!(" isearch <inode>\t\tFind directory entries pointing at an inode.");
    println!(" change_block <inode> <index> <blkid>");
    println!(" change_blkcount <inode> <nblks>");
    println!(" change_dir_entry <blkid> <name> <inode>");
}

/// Routes one command; the shell calls back into this.
pub fn dispatch(sess: &Session<'_>, cmd: &str, args: &[String]) -> anyhow::Result<()> {
    match cmd {
        "superblocks" => show::superblocks(sess, args),
        "descriptors" => show::descriptors(sess, args),
        "blkgrp" => show::blkgrp(sess, args),
        "root_inodes" => show::root_inodes(sess, args),
        "inode" => show::inode(sess, args),
        "blk_data" => show::blk_data(sess, args),
        "blkls" => show::blkls(sess, args),
        "ls" => list::ls(sess, args),
        "cat" => file::cat(sess, args),
        "cp" => file::cp(sess, args),
        "cd" => shell::cd(sess, args),
        "shell" => shell::shell(sess),
        "analyze" => scan::analyze(sess, args),
        "search" => scan::search(sess, args),
        "isearch" => scan::isearch(sess, args),
        "change_block" => edit::change_block(sess, args),
        "change_blkcount" => edit::change_blkcount(sess, args),
        "change_dir_entry" => edit::change_dir_entry(sess, args),
        _ => bail!("unknown command `{cmd}`"),
    }
}

fn main() {
    env_logger::init();
    let mut args = env::args_os();
    args.next();
    let args = parse_args(args);
    if args.help || args.cmd.is_empty() {
        print_help();
        exit(if args.help { 0 } else { 1 });
    }
    let fname = args
        .fname
        .or_else(|| env::var_os("IMG_FILE").map(PathBuf::from))
        .unwrap_or_else(|| {
            error("e2probe", "set IMG_FILE or pass the image with -f");
        });
    let img = Image::open(&fname, args.write).unwrap_or_else(|e| {
        error("e2probe", format_args!("{}: {e}", fname.display()));
    });
    let sb = Superblock::new(&img, args.sb_offset);
    match sb.validate(true) {
        Ok(findings) => {
            for finding in findings {
                log::warn!("superblock: {finding}");
            }
            let incompat = sb.feature_incompat().unwrap_or(Incompat::empty());
            if incompat.contains(Incompat::EXTENTS) {
                log::warn!("image uses extents; extent-mapped inodes cannot be walked");
            }
        }
        Err(e) => error("e2probe", format_args!("{}: {e}", fname.display())),
    }
    let sess = Session {
        sb: &sb,
        state: args.state,
    };
    if let Err(e) = dispatch(&sess, &args.cmd[0], &args.cmd[1..]) {
        error("e2probe", format_args!("{}: {e:#}", args.cmd[0]));
    }
}
