//! Byte-level views over the binary header and a trace header.
//!
//! These replace the teacher's per-field `BinHeader`/`TraceHeader` structs
//! (`header_structs.rs`) with thin wrappers around the raw fixed-size byte
//! array, read and written only through `FieldSpec` lookups (by name or by
//! explicit custom offset). This is what makes the field table in
//! `field_table` the single source of truth: there is no parallel struct
//! definition that could drift out of sync with it.
use crate::errors::SegyError;
use crate::field_table::{self, FieldSpec};

pub const BINARY_HEADER_LEN: usize = 400;
pub const TRACE_HEADER_LEN: usize = 240;

fn read_signed(bytes: &[u8]) -> i64 {
    match bytes.len() {
        1 => bytes[0] as i8 as i64,
        2 => i16::from_be_bytes(bytes.try_into().unwrap()) as i64,
        4 => i32::from_be_bytes(bytes.try_into().unwrap()) as i64,
        8 => i64::from_be_bytes(bytes.try_into().unwrap()),
        n => unreachable!("unsupported field width {}", n),
    }
}

fn read_unsigned(bytes: &[u8]) -> i64 {
    match bytes.len() {
        1 => bytes[0] as i64,
        2 => u16::from_be_bytes(bytes.try_into().unwrap()) as i64,
        4 => u32::from_be_bytes(bytes.try_into().unwrap()) as i64,
        8 => i64::from_be_bytes(bytes.try_into().unwrap()),
        n => unreachable!("unsupported field width {}", n),
    }
}

fn write_value(dest: &mut [u8], value: i64, signed: bool) -> Result<(), SegyError> {
    match dest.len() {
        1 => dest.copy_from_slice(&(if signed { value as i8 as u8 } else { value as u8 }).to_be_bytes()),
        2 => dest.copy_from_slice(&(if signed { value as i16 } else { value as u16 as i16 }).to_be_bytes()),
        4 => dest.copy_from_slice(&(if signed { value as i32 } else { value as u32 as i32 }).to_be_bytes()),
        8 => dest.copy_from_slice(&value.to_be_bytes()),
        n => unreachable!("unsupported field width {}", n),
    }
    Ok(())
}

/// Validate that `value` fits in a field of this width/signedness before writing it.
fn check_bounds(field_name: &str, value: i64, width: u8, signed: bool) -> Result<(), SegyError> {
    let spec = FieldSpec { name: "", offset: 0, width, signed };
    let (lo, hi) = spec.value_bounds();
    if value < lo || value > hi {
        return Err(SegyError::OutOfRange { field: field_name.to_string(), value, width });
    }
    Ok(())
}

macro_rules! header_view {
    ($name:ident, $len:expr, $lookup:path) => {
        /// Raw header bytes, read and written only through field lookups.
        #[derive(Debug, Clone)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            pub fn from_bytes(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            /// Read a named field as a signed 64-bit value (sign/zero-extended per its spec).
            pub fn get_by_name(&self, name: &str) -> Result<i64, SegyError> {
                let spec = $lookup(name)?;
                Ok(self.get(spec))
            }

            /// Write a named field, validating it fits the field's declared width.
            pub fn set_by_name(&mut self, name: &str, value: i64) -> Result<(), SegyError> {
                let spec = *$lookup(name)?;
                self.set(&spec, value)
            }

            /// Read a field given its spec directly (used by table-driven iteration).
            pub fn get(&self, spec: &FieldSpec) -> i64 {
                let bytes = &self.0[spec.range()];
                if spec.signed { read_signed(bytes) } else { read_unsigned(bytes) }
            }

            /// Write a field given its spec directly.
            pub fn set(&mut self, spec: &FieldSpec, value: i64) -> Result<(), SegyError> {
                check_bounds(spec.name, value, spec.width, spec.signed)?;
                write_value(&mut self.0[spec.range()], value, spec.signed)
            }

            /// Read an arbitrary byte range outside the named table (the "custom offset"
            /// escape hatch for reserved/vendor-specific bytes).
            pub fn get_custom(&self, offset: usize, width: u8, signed: bool) -> Result<i64, SegyError> {
                let end = offset + width as usize;
                if end > $len {
                    return Err(SegyError::WrongRegionLength { region: stringify!($name), expected: $len, found: end });
                }
                let bytes = &self.0[offset..end];
                Ok(if signed { read_signed(bytes) } else { read_unsigned(bytes) })
            }

            /// Write an arbitrary byte range outside the named table.
            pub fn set_custom(&mut self, offset: usize, width: u8, signed: bool, value: i64) -> Result<(), SegyError> {
                let end = offset + width as usize;
                if end > $len {
                    return Err(SegyError::WrongRegionLength { region: stringify!($name), expected: $len, found: end });
                }
                check_bounds("<custom>", value, width, signed)?;
                write_value(&mut self.0[offset..end], value, signed)
            }
        }
    };
}

header_view!(BinHeaderBytes, BINARY_HEADER_LEN, field_table::binary_field);
header_view!(TraceHeaderBytes, TRACE_HEADER_LEN, field_table::trace_field);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_named_field() {
        let mut h = BinHeaderBytes::from_bytes([0u8; BINARY_HEADER_LEN]);
        h.set_by_name("samples_per_trace", 1500).unwrap();
        assert_eq!(h.get_by_name("samples_per_trace").unwrap(), 1500);
    }

    #[test]
    fn out_of_range_is_rejected() {
        let mut h = TraceHeaderBytes::from_bytes([0u8; TRACE_HEADER_LEN]);
        let err = h.set_by_name("coordinate_scalar", 100_000).unwrap_err();
        assert!(matches!(err, SegyError::OutOfRange { .. }));
    }

    #[test]
    fn custom_offset_round_trips() {
        let mut h = BinHeaderBytes::from_bytes([0u8; BINARY_HEADER_LEN]);
        h.set_custom(100, 4, true, -42).unwrap();
        assert_eq!(h.get_custom(100, 4, true).unwrap(), -42);
    }

    #[test]
    fn custom_offset_out_of_region_is_rejected() {
        let h = BinHeaderBytes::from_bytes([0u8; BINARY_HEADER_LEN]);
        assert!(h.get_custom(398, 4, true).is_err());
    }

    #[test]
    fn negative_value_round_trips_signed_field() {
        let mut h = TraceHeaderBytes::from_bytes([0u8; TRACE_HEADER_LEN]);
        h.set_by_name("source_x", -123456).unwrap();
        assert_eq!(h.get_by_name("source_x").unwrap(), -123456);
    }
}
