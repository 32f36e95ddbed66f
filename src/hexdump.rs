//! Hex dump rendering.
//!
//! A dump is one line: every byte as two uppercase hex digits, bytes
//! separated by a single space, terminated by a newline.

use std::io::Write;

/// Render `bytes` as a dump line, including the trailing newline.
pub fn format_dump(bytes: &[u8]) -> String {
    let mut line = bytes
        .iter()
        .map(|b| hex::encode_upper([*b]))
        .collect::<Vec<_>>()
        .join(" ");
    line.push('\n');
    line
}

/// Write `label` followed by the dump of `bytes` to the sink.
pub fn write_dump<W: Write>(out: &mut W, label: &str, bytes: &[u8]) -> std::io::Result<()> {
    out.write_all(label.as_bytes())?;
    out.write_all(format_dump(bytes).as_bytes())
}

/// Render a multi-line dump with arena offsets, 16 bytes per row.
///
/// Used by `--show-heap` to print a chunk together with its guard zone.
pub fn format_rows(base_offset: usize, bytes: &[u8]) -> String {
    let mut out = String::new();
    for (row, chunk) in bytes.chunks(16).enumerate() {
        out.push_str(&format!("{:08X}  ", base_offset + row * 16));
        out.push_str(&format_dump(chunk));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_dump_is_newline() {
        assert_eq!(format_dump(&[]), "\n");
    }

    #[test]
    fn test_uppercase_space_separated() {
        assert_eq!(format_dump(b"hi\0"), "68 69 00\n");
        assert_eq!(format_dump(&[0xAB, 0x0F, 0xFF]), "AB 0F FF\n");
        assert_eq!(format_dump(&[0x7F]), "7F\n");
    }

    #[test]
    fn test_write_dump_with_label() {
        let mut out = Vec::new();
        write_dump(&mut out, "After overflow:  ", b"hi").unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "After overflow:  68 69\n");
    }

    #[test]
    fn test_rows() {
        let bytes: Vec<u8> = (0u8..18).collect();
        let rows = format_rows(0x40, &bytes);
        let lines: Vec<&str> = rows.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("00000040  00 01 02"));
        assert_eq!(lines[1], "00000050  10 11");
    }
}
