//! Small shared helpers: integer math, byte sizes, timestamp rendering.

use chrono::DateTime;
use std::fmt;

/// Integer division rounding up.
pub fn ceil_div(a: u64, b: u64) -> u64 {
    (a + b - 1) / b
}

/// A number of bytes, displayed with a binary-unit suffix.
pub struct ByteSize(pub u64);

impl fmt::Display for ByteSize {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        const SUFFIXES: [&str; 6] = ["bytes", "KiB", "MiB", "GiB", "TiB", "PiB"];
        let mut n = self.0;
        let mut order = 0;
        while n >= 1024 && order + 1 < SUFFIXES.len() {
            n /= 1024;
            order += 1;
        }
        write!(fmt, "{} {}", n, SUFFIXES[order])
    }
}

/// Renders a second-resolution Unix timestamp; zero reads as `Never`.
pub fn pretty_time(secs: u32) -> String {
    if secs == 0 {
        return "Never".to_string();
    }
    match DateTime::from_timestamp(secs as i64, 0) {
        Some(t) => t.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => format!("{secs}"),
    }
}

/// Hex rendering of an opaque byte field (UUIDs, hash seeds).
pub fn hex_bytes(data: &[u8]) -> String {
    data.iter().map(|b| format!("{b:02x}")).collect()
}

/// ASCII label from a NUL-padded byte field, trimmed at the first NUL.
pub fn label(data: &[u8]) -> String {
    let end = data.iter().position(|b| *b == 0).unwrap_or(data.len());
    String::from_utf8_lossy(&data[..end]).into_owned()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bytesize() {
        assert_eq!(format!("{}", ByteSize(0)).as_str(), "0 bytes");
        assert_eq!(format!("{}", ByteSize(1023)).as_str(), "1023 bytes");
        assert_eq!(format!("{}", ByteSize(1024)).as_str(), "1 KiB");
        assert_eq!(format!("{}", ByteSize(4096)).as_str(), "4 KiB");
        assert_eq!(format!("{}", ByteSize(16 * 1024 * 1024)).as_str(), "16 MiB");
    }

    #[test]
    fn ceil() {
        assert_eq!(ceil_div(0, 8), 0);
        assert_eq!(ceil_div(1, 8), 1);
        assert_eq!(ceil_div(8, 8), 1);
        assert_eq!(ceil_div(9, 8), 2);
    }

    #[test]
    fn labels() {
        assert_eq!(label(b"root\0\0\0"), "root");
        assert_eq!(label(b"\0junk"), "");
        assert_eq!(hex_bytes(&[0xde, 0xad]), "dead");
    }

    #[test]
    fn times() {
        assert_eq!(pretty_time(0), "Never");
        assert_eq!(pretty_time(86400), "1970-01-02 00:00:00");
    }
}
