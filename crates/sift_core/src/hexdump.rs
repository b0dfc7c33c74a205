use std::fmt::Write;

use crate::scanner::is_printable;

pub const BYTES_PER_ROW: usize = 16;
const HEX_COLUMN_WIDTH: usize = BYTES_PER_ROW * 3 - 1;

/// Renders at most `limit` bytes of `data` as offset / hex / ASCII rows.
#[must_use]
pub fn hex_dump_lines(data: &[u8], limit: usize) -> Vec<String> {
    let shown = &data[..data.len().min(limit)];
    shown
        .chunks(BYTES_PER_ROW)
        .enumerate()
        .map(|(row, chunk)| {
            let mut hex = String::with_capacity(HEX_COLUMN_WIDTH);
            for (i, byte) in chunk.iter().enumerate() {
                if i > 0 {
                    hex.push(' ');
                }
                let _ = write!(hex, "{byte:02X}");
            }
            let ascii: String = chunk
                .iter()
                .map(|&b| if is_printable(b) { char::from(b) } else { '.' })
                .collect();
            format!(
                "{:08X}: {hex:<width$}  {ascii}",
                row * BYTES_PER_ROW,
                width = HEX_COLUMN_WIDTH
            )
        })
        .collect()
}

#[must_use]
pub fn hex_dump(data: &[u8], limit: usize) -> String {
    hex_dump_lines(data, limit).join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_row_layout() {
        let data: Vec<u8> = (0x41..0x51).collect();
        let lines = hex_dump_lines(&data, 64);
        assert_eq!(
            lines,
            vec!["00000000: 41 42 43 44 45 46 47 48 49 4A 4B 4C 4D 4E 4F 50  ABCDEFGHIJKLMNOP"]
        );
    }

    #[test]
    fn partial_row_is_padded() {
        let lines = hex_dump_lines(&[0x00, 0x7E, 0x1F], 64);
        assert_eq!(lines.len(), 1);
        assert_eq!(&lines[0][..18], "00000000: 00 7E 1F");
        assert!(lines[0].ends_with("  .~."));
        assert_eq!(lines[0].len(), 10 + HEX_COLUMN_WIDTH + 2 + 3);
    }

    #[test]
    fn limit_truncates_and_offsets_advance() {
        let data = [0u8; 40];
        let lines = hex_dump_lines(&data, 20);
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("00000010: 00 00 00 00  "));
        assert!(hex_dump(&[], 64).is_empty());
    }
}
