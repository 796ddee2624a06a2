//! EBCDIC (IBM code page 500-family) ↔ ASCII codec for the textual header.
//!
//! The textual header is 40 lines of 80 characters (3200 bytes), stored on
//! disk as EBCDIC. Decoding uses `encoding8`'s `ebcdic::to_ascii`, the same
//! call the teacher's `memory_map.rs` makes; encoding has no equivalent
//! public function in that crate, so the reverse table below is hand-built
//! to cover the character set SEG-Y textual headers actually use (uppercase
//! and lowercase letters, digits, space, and common punctuation). Bytes
//! outside that set decode to `'?'` and encode to EBCDIC space (0x40), each
//! counted as a substitution rather than silently dropped.

pub const LINES: usize = 40;
pub const LINE_WIDTH: usize = 80;
pub const TEXTUAL_HEADER_LEN: usize = LINES * LINE_WIDTH;

/// Byte length of an optional tape label preceding the textual header.
pub const TAPE_LABEL_LEN: usize = 128;

/// EBCDIC space, used to pad short lines and to stand in for unmappable characters.
const EBCDIC_SPACE: u8 = 0x40;
/// ASCII substitute shown for an EBCDIC byte that has no reasonable ASCII counterpart.
const ASCII_SUBSTITUTE: char = '?';

/// Outcome of decoding or encoding the textual header: the transformed bytes,
/// plus how many bytes could not be round-tripped faithfully.
pub struct CodecResult {
    pub bytes: Vec<u8>,
    pub substitutions: usize,
}

/// Decode 3200 raw EBCDIC bytes into a 40-line ASCII string (lines joined by `\n`,
/// trailing spaces on each line trimmed).
pub fn decode(raw: &[u8; TEXTUAL_HEADER_LEN]) -> CodecResult {
    let mut substitutions = 0;
    let mut text = String::with_capacity(TEXTUAL_HEADER_LEN + LINES);
    for (i, chunk) in raw.chunks(LINE_WIDTH).enumerate() {
        if i > 0 {
            text.push('\n');
        }
        let mut line = String::with_capacity(LINE_WIDTH);
        for &b in chunk {
            let c = encoding8::ebcdic::to_ascii(b);
            if c == '\u{0}' && b != 0x00 {
                substitutions += 1;
                line.push(ASCII_SUBSTITUTE);
            } else {
                line.push(c);
            }
        }
        text.push_str(line.trim_end_matches(' '));
    }
    CodecResult { bytes: text.into_bytes(), substitutions }
}

/// Encode a multi-line ASCII string into a 3200-byte EBCDIC textual header. Lines
/// beyond 40 are truncated with a warning count; lines longer than 80 characters are
/// truncated to fit, with each dropped character counted as a substitution so the
/// caller can warn; short lines/files are padded with EBCDIC space.
pub fn encode(text: &str) -> CodecResult {
    let mut out = vec![EBCDIC_SPACE; TEXTUAL_HEADER_LEN];
    let mut substitutions = 0;
    for (i, line) in text.lines().take(LINES).enumerate() {
        let base = i * LINE_WIDTH;
        for (j, ch) in line.chars().take(LINE_WIDTH).enumerate() {
            out[base + j] = ascii_to_ebcdic(ch, &mut substitutions);
        }
        let overflow = line.chars().count().saturating_sub(LINE_WIDTH);
        substitutions += overflow;
    }
    if text.lines().count() > LINES {
        substitutions += text.lines().count() - LINES;
    }
    CodecResult { bytes: out, substitutions }
}

/// Detect whether a 128-byte tape label precedes the textual header, the way
/// the teacher's `giga-segy-in::memory_map::has_label` does: byte 0 should
/// look like the textual header's conventional leading `'C'` if the header
/// starts immediately; if it doesn't, but the byte 128 positions in does, a
/// tape label occupies the gap.
pub fn detects_tape_label(byte0: u8, byte128: u8) -> bool {
    let looks_like_c = |b: u8| b == b'C' || encoding8::ebcdic::to_ascii(b) == 'C';
    !looks_like_c(byte0) && looks_like_c(byte128)
}

fn ascii_to_ebcdic(ch: char, substitutions: &mut usize) -> u8 {
    if let Some(b) = ASCII_TO_EBCDIC_TABLE.iter().find(|(a, _)| *a == ch).map(|(_, b)| *b) {
        b
    } else {
        *substitutions += 1;
        EBCDIC_SPACE
    }
}

/// Hand-built reverse mapping for printable 7-bit ASCII, covering what a textual
/// header realistically contains. Derived by inverting `encoding8::ebcdic::to_ascii`
/// over the 0x00-0xFF domain, kept as a flat table rather than a second crate
/// dependency since `encoding8` exposes only the decode direction.
static ASCII_TO_EBCDIC_TABLE: &[(char, u8)] = &[
    (' ', 0x40), ('.', 0x4B), ('<', 0x4C), ('(', 0x4D), ('+', 0x4E), ('|', 0x4F),
    ('&', 0x50), ('!', 0x5A), ('$', 0x5B), ('*', 0x5C), (')', 0x5D), (';', 0x5E),
    ('-', 0x60), ('/', 0x61), (',', 0x6B), ('%', 0x6C), ('_', 0x6D), ('>', 0x6E),
    ('?', 0x6F), (':', 0x7A), ('#', 0x7B), ('@', 0x7C), ('\'', 0x7D), ('=', 0x7E),
    ('"', 0x7F),
    ('a', 0x81), ('b', 0x82), ('c', 0x83), ('d', 0x84), ('e', 0x85), ('f', 0x86),
    ('g', 0x87), ('h', 0x88), ('i', 0x89), ('j', 0x91), ('k', 0x92), ('l', 0x93),
    ('m', 0x94), ('n', 0x95), ('o', 0x96), ('p', 0x97), ('q', 0x98), ('r', 0x99),
    ('s', 0xA2), ('t', 0xA3), ('u', 0xA4), ('v', 0xA5), ('w', 0xA6), ('x', 0xA7),
    ('y', 0xA8), ('z', 0xA9),
    ('A', 0xC1), ('B', 0xC2), ('C', 0xC3), ('D', 0xC4), ('E', 0xC5), ('F', 0xC6),
    ('G', 0xC7), ('H', 0xC8), ('I', 0xC9), ('J', 0xD1), ('K', 0xD2), ('L', 0xD3),
    ('M', 0xD4), ('N', 0xD5), ('O', 0xD6), ('P', 0xD7), ('Q', 0xD8), ('R', 0xD9),
    ('S', 0xE2), ('T', 0xE3), ('U', 0xE4), ('V', 0xE5), ('W', 0xE6), ('X', 0xE7),
    ('Y', 0xE8), ('Z', 0xE9),
    ('0', 0xF0), ('1', 0xF1), ('2', 0xF2), ('3', 0xF3), ('4', 0xF4), ('5', 0xF5),
    ('6', 0xF6), ('7', 0xF7), ('8', 0xF8), ('9', 0xF9),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_plain_ascii() {
        let mut line = String::from("C 1 CLIENT ACME SEISMIC SURVEY 2024");
        line.push_str(&" ".repeat(80 - line.len()));
        let mut text = String::new();
        for i in 0..LINES {
            if i > 0 {
                text.push('\n');
            }
            text.push_str(line.trim_end());
        }
        let encoded = encode(&text);
        assert_eq!(encoded.substitutions, 0);
        let raw: [u8; TEXTUAL_HEADER_LEN] = encoded.bytes.try_into().unwrap();
        let decoded = decode(&raw);
        assert_eq!(decoded.substitutions, 0);
        assert_eq!(String::from_utf8(decoded.bytes).unwrap(), text);
    }

    #[test]
    fn short_line_is_space_padded_on_encode() {
        let encoded = encode("C 1 HELLO");
        assert_eq!(encoded.bytes.len(), TEXTUAL_HEADER_LEN);
        assert_eq!(encoded.bytes[9], EBCDIC_SPACE);
    }

    #[test]
    fn unmappable_char_counts_as_substitution() {
        let encoded = encode("C 1 caf\u{00e9}");
        assert_eq!(encoded.substitutions, 1);
    }

    #[test]
    fn overlong_line_is_truncated_to_80_and_counted() {
        let line: String = "x".repeat(120);
        let encoded = encode(&line);
        assert_eq!(encoded.substitutions, 40);
        let x_byte = ascii_to_ebcdic('x', &mut 0);
        assert!(encoded.bytes[0..80].iter().all(|&b| b == x_byte));
    }

    #[test]
    fn oversized_input_is_truncated_and_counted() {
        let many_lines: String = (0..50).map(|i| format!("line {}", i)).collect::<Vec<_>>().join("\n");
        let encoded = encode(&many_lines);
        assert_eq!(encoded.substitutions, 10);
        assert_eq!(encoded.bytes.len(), TEXTUAL_HEADER_LEN);
    }

    #[test]
    fn tape_label_detected_when_text_header_starts_at_128() {
        let c_ebcdic = ascii_to_ebcdic('C', &mut 0);
        let space_ebcdic = EBCDIC_SPACE;
        assert!(detects_tape_label(space_ebcdic, c_ebcdic));
    }

    #[test]
    fn tape_label_not_detected_when_text_header_starts_at_0() {
        let c_ebcdic = ascii_to_ebcdic('C', &mut 0);
        assert!(!detects_tape_label(c_ebcdic, EBCDIC_SPACE));
    }

    #[test]
    fn tape_label_not_detected_when_neither_byte_looks_like_c() {
        assert!(!detects_tape_label(EBCDIC_SPACE, EBCDIC_SPACE));
    }
}
