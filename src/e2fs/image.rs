//! Absolute-offset I/O over a raw image file or block device.

use crate::{Error, Result};
use libc::ioctl;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::AsRawFd;
use std::os::unix::fs::{FileExt, FileTypeExt};
use std::path::Path;

/// ioctl macro: Command.
macro_rules! ioc {
    ($a:expr, $b:expr, $c:expr, $d:expr) => {
        (($a) << 30) | (($b) << 8) | ($c) | (($d) << 16)
    };
}

/// ioctl macro: Read command.
macro_rules! ior {
    ($a:expr, $b:expr, $c:ty) => {
        ioc!(2, $a, $b, std::mem::size_of::<$c>() as u64)
    };
}

/// ioctl command: Get size of disk in bytes.
const BLKGETSIZE64: u64 = ior!(0x12, 114, u64);

/// Returns the size of the medium behind `file` in bytes.
///
/// Regular files report their metadata length; block and character devices
/// are sized with the `BLKGETSIZE64` ioctl.
fn byte_len(file: &File) -> io::Result<u64> {
    let metadata = file.metadata()?;
    let file_type = metadata.file_type();
    if file_type.is_block_device() || file_type.is_char_device() {
        let mut size = 0u64;
        let ret = unsafe { ioctl(file.as_raw_fd(), BLKGETSIZE64 as _, &mut size) };
        if ret < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(size)
    } else {
        Ok(metadata.len())
    }
}

/// A handle over a random-access byte-addressable medium of known length.
///
/// The image is owned by the session and outlives every record parsed from
/// it; records only keep `(&Image, offset)`. Reads and writes are
/// positioned, so a shared reference suffices for both.
pub struct Image {
    file: File,
    len: u64,
    writable: bool,
}

impl Image {
    /// Opens the image at `path`, read-only unless `write` is set.
    pub fn open(path: &Path, write: bool) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(write).open(path)?;
        let len = byte_len(&file)?;
        Ok(Self {
            file,
            len,
            writable: write,
        })
    }

    /// Length of the medium in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn writable(&self) -> bool {
        self.writable
    }

    fn check_range(&self, offset: u64, len: u64) -> Result<()> {
        match offset.checked_add(len) {
            Some(end) if end <= self.len => Ok(()),
            _ => Err(Error::ImageEof {
                offset,
                len,
                img_len: self.len,
            }),
        }
    }

    /// Reads exactly `buf.len()` bytes at `offset`.
    pub fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.check_range(offset, buf.len() as u64)?;
        self.file.read_exact_at(buf, offset)?;
        Ok(())
    }

    /// Reads exactly `n` bytes at `offset` into a fresh buffer.
    pub fn read_vec(&self, offset: u64, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0; n];
        self.read_at(offset, &mut buf)?;
        Ok(buf)
    }

    /// Writes `data` at `offset`. Only the narrow edit operations call this.
    pub fn write_at(&self, offset: u64, data: &[u8]) -> Result<()> {
        if !self.writable {
            return Err(Error::ReadOnly);
        }
        self.check_range(offset, data.len() as u64)?;
        self.file.write_all_at(data, offset)?;
        self.file.sync_data()?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    #[test]
    fn read_bounds() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(&[1, 2, 3, 4]).unwrap();
        let img = Image::open(tmp.path(), false).unwrap();
        assert_eq!(img.len(), 4);
        assert_eq!(img.read_vec(1, 2).unwrap(), vec![2, 3]);
        assert!(matches!(
            img.read_vec(3, 2),
            Err(Error::ImageEof {
                offset: 3,
                len: 2,
                img_len: 4
            })
        ));
    }

    #[test]
    fn write_requires_write_mode() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(&[0; 8]).unwrap();
        let img = Image::open(tmp.path(), false).unwrap();
        assert!(matches!(img.write_at(0, &[1]), Err(Error::ReadOnly)));
        let img = Image::open(tmp.path(), true).unwrap();
        img.write_at(2, &[9, 9]).unwrap();
        assert_eq!(img.read_vec(0, 4).unwrap(), vec![0, 0, 9, 9]);
    }
}
