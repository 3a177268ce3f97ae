//! Core library of `e2probe`: parsing and analysis of ext2/ext3/ext4 images.
//!
//! Everything here reads through [`image::Image`], an absolute-offset view of
//! a raw image file or block device. On-disk structures are thin
//! `(image, offset)` records decoded lazily through the layouts in
//! [`record`]; navigation ([`superblock`], [`blkgrp`], [`inode`],
//! [`directory`]) turns block-group/inode/block ids into byte offsets. The
//! [`analyzer`] scans a damaged image for directory-shaped blocks and data
//! blocks reachable from plausible inodes.
//!
//! Parsing findings (bad enum values, unknown flag bits, malformed directory
//! entries) are collected on the affected record so that a corrupted image
//! can still be explored; only I/O errors, out-of-range arguments and
//! operator aborts propagate as [`Error`].

use std::fmt;
use std::io;
use std::process::exit;

pub mod analyzer;
pub mod bitmap;
pub mod blkgrp;
pub mod crc32;
pub mod desc;
pub mod directory;
pub mod image;
pub mod inode;
pub mod navigate;
pub mod prompt;
pub mod record;
pub mod superblock;
pub mod util;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort the current operation.
///
/// Record-level findings are not represented here: they accumulate on the
/// record's error list and are surfaced when the record is printed.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("EOF: {len} bytes at {offset} past end of image ({img_len} bytes)")]
    ImageEof { offset: u64, len: u64, img_len: u64 },
    #[error("image is opened read-only")]
    ReadOnly,
    #[error("inode out of range (1, {max}): {id}")]
    InodeOutOfRange { id: u32, max: u32 },
    #[error("block group out of range (0, {max}): {bg}")]
    BlkgrpOutOfRange { bg: u32, max: u32 },
    #[error("invalid block id {blkid} (total blocks {max})")]
    InvalidBlkid { blkid: u32, max: u32 },
    #[error("only 128 byte inodes are supported, not {0}")]
    InodeUnsupported(u16),
    #[error("no superblock backup at block group {0}")]
    NoSuperBackup(u32),
    #[error("{0}: no such file or directory")]
    NoSuchFileOrDirectory(String),
    #[error("aborted")]
    Aborted,
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Writes an error to stderr, then exits.
pub fn error<M: fmt::Display>(bin: &str, msg: M) -> ! {
    eprintln!("{bin}: error: {msg}");
    exit(1);
}
