//! Hex dump rendering shared by `blk_data` and `cat --binary`.

/// Prints `data` as 16-byte rows with an ASCII gutter, offsets starting at
/// `base`.
pub fn dump(data: &[u8], base: u64) {
    for (row, chunk) in data.chunks(16).enumerate() {
        let mut hex = String::with_capacity(40);
        let mut ascii = String::with_capacity(16);
        for (i, b) in chunk.iter().enumerate() {
            if i > 0 && i % 2 == 0 {
                hex.push(' ');
            }
            hex.push_str(&format!("{b:02x}"));
            ascii.push(if *b > 32 && *b < 127 { *b as char } else { ' ' });
        }
        println!("{:08x}  {hex:<39}  |{ascii}|", base + row as u64 * 16);
    }
}
