//! Binary-header editor (component D).
use segy_batch_core::{BinHeaderBytes, SegyError};

use crate::plan::{BinaryFieldEdit, ChangeEvent, ChangeRegion};

/// Apply a list of binary-header field edits in declaration order, returning the
/// change events for fields whose value actually changed.
///
/// `OutOfRange` on a binary-header edit is always fatal (§7): a constant edit has
/// no fallback value to skip to, so the whole operation errors out rather than
/// silently leaving a partially-applied header.
pub fn apply(header: &mut BinHeaderBytes, edits: &[BinaryFieldEdit]) -> Result<Vec<ChangeEvent>, SegyError> {
    let mut events = Vec::new();
    for edit in edits {
        let old_value = match edit.custom_offset {
            Some(c) => header.get_custom(c.offset, c.width, c.signed)?,
            None => header.get_by_name(&edit.name)?,
        };
        match edit.custom_offset {
            Some(c) => header.set_custom(c.offset, c.width, c.signed, edit.value)?,
            None => header.set_by_name(&edit.name, edit.value)?,
        }
        if old_value != edit.value {
            events.push(ChangeEvent {
                trace_index: None,
                region: ChangeRegion::Binary,
                field: edit.name.clone(),
                old_value,
                new_value: edit.value,
            });
        }
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use segy_batch_core::BINARY_HEADER_LEN;

    #[test]
    fn constant_edit_changes_byte_17_18() {
        let mut header = BinHeaderBytes::from_bytes([0u8; BINARY_HEADER_LEN]);
        header.set_by_name("sample_interval", 4000).unwrap();
        let events = apply(
            &mut header,
            &[BinaryFieldEdit { name: "sample_interval".to_string(), value: 2000, custom_offset: None }],
        )
        .unwrap();
        assert_eq!(header.as_bytes()[16..18], [0x07, 0xD0]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].old_value, 4000);
        assert_eq!(events[0].new_value, 2000);
    }

    #[test]
    fn out_of_range_is_fatal() {
        let mut header = BinHeaderBytes::from_bytes([0u8; BINARY_HEADER_LEN]);
        let err = apply(
            &mut header,
            &[BinaryFieldEdit { name: "sample_interval".to_string(), value: 32768, custom_offset: None }],
        )
        .unwrap_err();
        assert!(matches!(err, SegyError::OutOfRange { .. }));
    }

    #[test]
    fn unchanged_value_emits_no_event() {
        let mut header = BinHeaderBytes::from_bytes([0u8; BINARY_HEADER_LEN]);
        let events = apply(
            &mut header,
            &[BinaryFieldEdit { name: "sample_interval".to_string(), value: 0, custom_offset: None }],
        )
        .unwrap();
        assert!(events.is_empty());
    }
}
