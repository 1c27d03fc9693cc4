/// Repairs UTF-8 text that was mis-decoded as Windows-1252 or Latin-1.
///
/// Each line is re-encoded to single bytes and decoded as UTF-8 again. Lines
/// that cannot be mapped back are returned unchanged.
pub fn fix_text(text: &str) -> String {
    text.split('\n').map(fix_line).collect::<Vec<_>>().join("\n")
}

fn fix_line(line: &str) -> String {
    if line.is_ascii() {
        return line.to_string();
    }
    let bytes: Option<Vec<u8>> = line.chars().map(encode_cp1252).collect();
    bytes
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| line.to_string())
}

/// Maps a character to the Windows-1252 byte that would have decoded to it.
fn encode_cp1252(c: char) -> Option<u8> {
    let byte = match c {
        '\u{20AC}' => 0x80,
        '\u{201A}' => 0x82,
        '\u{0192}' => 0x83,
        '\u{201E}' => 0x84,
        '\u{2026}' => 0x85,
        '\u{2020}' => 0x86,
        '\u{2021}' => 0x87,
        '\u{02C6}' => 0x88,
        '\u{2030}' => 0x89,
        '\u{0160}' => 0x8A,
        '\u{2039}' => 0x8B,
        '\u{0152}' => 0x8C,
        '\u{017D}' => 0x8E,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201C}' => 0x93,
        '\u{201D}' => 0x94,
        '\u{2022}' => 0x95,
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '\u{02DC}' => 0x98,
        '\u{2122}' => 0x99,
        '\u{0161}' => 0x9A,
        '\u{203A}' => 0x9B,
        '\u{0153}' => 0x9C,
        '\u{017E}' => 0x9E,
        '\u{0178}' => 0x9F,
        c if (c as u32) < 0x100 => c as u32 as u8,
        _ => return None,
    };
    Some(byte)
}
