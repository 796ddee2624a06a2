//! EBCDIC-header editor (component E).
use segy_batch_core::ebcdic::{self, LINES, LINE_WIDTH, TEXTUAL_HEADER_LEN};
use segy_batch_core::SegyError;

use crate::plan::{ChangeEvent, ChangeRegion, EbcdicEditMode};

/// A textual header as 40 independently addressable lines.
pub struct TextualHeader {
    lines: Vec<String>,
}

impl TextualHeader {
    pub fn decode(raw: &[u8; TEXTUAL_HEADER_LEN]) -> Self {
        let text = String::from_utf8_lossy(&ebcdic::decode(raw).bytes).into_owned();
        Self::from_text(&text)
    }

    /// Build from text already decoded by the reader (e.g. `FileHeaders::textual`).
    pub fn from_text(text: &str) -> Self {
        let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
        lines.resize(LINES, String::new());
        Self { lines }
    }

    pub fn encode(&self) -> Result<[u8; TEXTUAL_HEADER_LEN], SegyError> {
        let joined = self.lines.join("\n");
        let result = ebcdic::encode(&joined);
        result
            .bytes
            .try_into()
            .map_err(|_| SegyError::WrongRegionLength { region: "textual header", expected: TEXTUAL_HEADER_LEN, found: 0 })
    }

    pub fn line(&self, idx: usize) -> &str {
        &self.lines[idx]
    }
}

/// Apply one `EbcdicEdit` operation, mutating `header` in place.
///
/// `lines` mode merges the given lines into the existing 40-line array; unspecified
/// lines pass through untouched, matching §4.5. `template` mode replaces all 40.
pub fn apply(header: &mut TextualHeader, mode: &EbcdicEditMode) -> Result<Vec<ChangeEvent>, SegyError> {
    let mut events = Vec::new();
    match mode {
        EbcdicEditMode::Lines { lines } => {
            for (&idx, text) in lines {
                if idx >= LINES {
                    return Err(SegyError::PlanParseError { msg: format!("line index {} out of range 0..39", idx) });
                }
                let (new_line, truncated) = pad_or_truncate(text);
                if truncated {
                    log::warn!("ebcdic line {}: {} characters truncated to {}", idx, text.chars().count(), LINE_WIDTH);
                }
                if header.lines[idx] != new_line {
                    events.push(line_change_event(idx, &header.lines[idx], &new_line));
                    header.lines[idx] = new_line;
                }
            }
        }
        EbcdicEditMode::Template { template } => {
            if template.len() != LINES {
                return Err(SegyError::PlanParseError {
                    msg: format!("template must have exactly {} lines, found {}", LINES, template.len()),
                });
            }
            for (idx, text) in template.iter().enumerate() {
                let (new_line, truncated) = pad_or_truncate(text);
                if truncated {
                    log::warn!("ebcdic line {}: {} characters truncated to {}", idx, text.chars().count(), LINE_WIDTH);
                }
                if header.lines[idx] != new_line {
                    events.push(line_change_event(idx, &header.lines[idx], &new_line));
                    header.lines[idx] = new_line;
                }
            }
        }
    }
    Ok(events)
}

/// Pad or truncate a line to exactly `LINE_WIDTH` characters. Counts and slices by
/// char, not byte, so non-ASCII input whose `LINE_WIDTH`th byte doesn't fall on a
/// char boundary never panics; returns whether truncation actually dropped characters
/// (§4.5: a line over 80 characters truncates with a warning).
fn pad_or_truncate(text: &str) -> (String, bool) {
    let char_count = text.chars().count();
    if char_count >= LINE_WIDTH {
        let truncated: String = text.chars().take(LINE_WIDTH).collect();
        (truncated, char_count > LINE_WIDTH)
    } else {
        let mut s = text.to_string();
        s.push_str(&" ".repeat(LINE_WIDTH - char_count));
        (s.trim_end().to_string(), false)
    }
}

fn line_change_event(idx: usize, old: &str, new: &str) -> ChangeEvent {
    ChangeEvent {
        trace_index: None,
        region: ChangeRegion::Ebcdic,
        field: format!("line_{}", idx),
        old_value: old.len() as i64,
        new_value: new.len() as i64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn blank_header() -> TextualHeader {
        TextualHeader { lines: vec![String::new(); LINES] }
    }

    #[test]
    fn lines_mode_preserves_unspecified_lines() {
        let mut header = blank_header();
        header.lines[5] = "PRESERVED".to_string();
        let mut lines = BTreeMap::new();
        lines.insert(0, "HELLO".to_string());
        lines.insert(1, "WORLD".to_string());
        apply(&mut header, &EbcdicEditMode::Lines { lines }).unwrap();
        assert_eq!(header.line(0), "HELLO");
        assert_eq!(header.line(1), "WORLD");
        assert_eq!(header.line(5), "PRESERVED");
        for i in 2..LINES {
            if i != 5 {
                assert_eq!(header.line(i), "");
            }
        }
    }

    #[test]
    fn template_mode_requires_exactly_40_lines() {
        let mut header = blank_header();
        let err = apply(&mut header, &EbcdicEditMode::Template { template: vec!["x".to_string(); 10] }).unwrap_err();
        assert!(matches!(err, SegyError::PlanParseError { .. }));
    }

    #[test]
    fn overlong_line_is_truncated_to_80_chars_and_flagged() {
        let line = "x".repeat(120);
        let (truncated, was_truncated) = pad_or_truncate(&line);
        assert_eq!(truncated.chars().count(), LINE_WIDTH);
        assert!(was_truncated);
    }

    #[test]
    fn non_ascii_line_truncates_on_char_boundary_without_panicking() {
        // Each "é" is 2 bytes in UTF-8, so a naive byte-index slice at position
        // LINE_WIDTH would not fall on a char boundary.
        let line = "é".repeat(90);
        let (truncated, was_truncated) = pad_or_truncate(&line);
        assert_eq!(truncated.chars().count(), LINE_WIDTH);
        assert!(was_truncated);
    }

    #[test]
    fn short_line_is_not_flagged_as_truncated() {
        let (_, was_truncated) = pad_or_truncate("HELLO");
        assert!(!was_truncated);
    }
}
