//! Static field tables for the binary and trace headers.
//!
//! This is the "reflection" the declarative edit plan needs (design note in
//! §9 of the spec): a single source of truth, indexed by canonical
//! snake_case name, used by the codec, the editors, the evaluator, and plan
//! validation alike. Byte offsets here are stored 0-based (idiomatic for
//! slice indexing); doc comments give the 1-based SEG-Y convention number
//! too, the way the teacher's `header_structs.rs` documents both.
use crate::errors::SegyError;

/// One row of a field table: a canonical name plus its wire location and numeric type.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Canonical snake_case name, as used in plan YAML and expressions.
    pub name: &'static str,
    /// 0-based byte offset within the header region.
    pub offset: usize,
    /// Width in bytes: 1, 2, 4, or 8.
    pub width: u8,
    /// Whether the field is read/written as a signed two's-complement integer.
    pub signed: bool,
}

impl FieldSpec {
    /// Inclusive-exclusive byte range of this field within its header.
    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..(self.offset + self.width as usize)
    }

    /// The representable range for this field's width/signedness, as `i64`.
    pub fn value_bounds(&self) -> (i64, i64) {
        if self.signed {
            match self.width {
                1 => (i8::MIN as i64, i8::MAX as i64),
                2 => (i16::MIN as i64, i16::MAX as i64),
                4 => (i32::MIN as i64, i32::MAX as i64),
                8 => (i64::MIN, i64::MAX),
                w => unreachable!("unsupported field width {}", w),
            }
        } else {
            match self.width {
                1 => (0, u8::MAX as i64),
                2 => (0, u16::MAX as i64),
                4 => (0, u32::MAX as i64),
                8 => (0, i64::MAX),
                w => unreachable!("unsupported field width {}", w),
            }
        }
    }
}

macro_rules! field {
    ($name:literal, $byte1:literal, $width:literal, signed) => {
        FieldSpec { name: $name, offset: $byte1 - 1, width: $width, signed: true }
    };
    ($name:literal, $byte1:literal, $width:literal, unsigned) => {
        FieldSpec { name: $name, offset: $byte1 - 1, width: $width, signed: false }
    };
}

/// Binary header fields, byte-1 offsets per the SEG-Y convention (binary header bytes
/// 1-400, i.e. file bytes 3201-3600). Covers the canonical minimum set plus the common
/// rev-1 fields the teacher's `BinHeader` models; bytes with no named entry (mostly
/// reserved/rev-2 extensions) remain reachable through the custom `(offset, width,
/// signed)` escape hatch described in §4.4.
pub static BINARY_HEADER_FIELDS: &[FieldSpec] = &[
    field!("job_id", 1, 4, signed),
    field!("line_number", 5, 4, signed),
    field!("reel_number", 9, 4, signed),
    field!("traces_per_ensemble", 13, 2, signed),
    field!("aux_traces_per_ensemble", 15, 2, signed),
    field!("sample_interval", 17, 2, signed),
    field!("sample_interval_original", 19, 2, signed),
    field!("samples_per_trace", 21, 2, signed),
    field!("samples_per_trace_original", 23, 2, signed),
    field!("format_code", 25, 2, signed),
    field!("ensemble_fold", 27, 2, signed),
    field!("trace_sorting_code", 29, 2, signed),
    field!("vertical_sum_code", 31, 2, unsigned),
    field!("sweep_frequency_start", 33, 2, unsigned),
    field!("sweep_frequency_end", 35, 2, unsigned),
    field!("sweep_length", 37, 2, unsigned),
    field!("sweep_type_code", 39, 2, unsigned),
    field!("sweep_channel_trace_number", 41, 2, unsigned),
    field!("sweep_taper_start", 43, 2, unsigned),
    field!("sweep_taper_end", 45, 2, unsigned),
    field!("taper_type", 47, 2, unsigned),
    field!("correlated_data_traces", 49, 2, unsigned),
    field!("binary_gain_recovered", 51, 2, unsigned),
    field!("amplitude_recovery_method", 53, 2, unsigned),
    field!("measurement_system", 55, 2, unsigned),
    field!("impulse_signal_polarity", 57, 2, unsigned),
    field!("vibratory_polarity_code", 59, 2, unsigned),
    field!("segy_format_revision", 301, 2, unsigned),
    field!("fixed_length_trace_flag", 303, 2, unsigned),
    field!("extended_header_count", 305, 2, signed),
];

/// Trace header fields, byte-1 offsets within the 240-byte trace header. Covers the
/// standard SEG-Y rev-1 layout; bytes 233-240 are unassigned in the standard and are
/// left out of the table (they pass through unmodified, as trace payload bytes would).
pub static TRACE_HEADER_FIELDS: &[FieldSpec] = &[
    field!("trace_sequence_line", 1, 4, signed),
    field!("trace_sequence_file", 5, 4, signed),
    field!("field_record", 9, 4, signed),
    field!("trace_number_field", 13, 4, signed),
    field!("energy_source_point", 17, 4, signed),
    field!("ensemble_number", 21, 4, signed),
    field!("trace_in_ensemble", 25, 4, signed),
    field!("trace_id_code", 29, 2, signed),
    field!("vertically_summed_traces", 31, 2, unsigned),
    field!("horizontally_stacked_traces", 33, 2, unsigned),
    field!("data_use", 35, 2, unsigned),
    field!("source_to_receiver_distance", 37, 4, signed),
    field!("receiver_group_elevation", 41, 4, signed),
    field!("source_surface_elevation", 45, 4, signed),
    field!("source_depth", 49, 4, signed),
    field!("datum_elevation_receiver_group", 53, 4, signed),
    field!("datum_elevation_source", 57, 4, signed),
    field!("water_depth_source", 61, 4, signed),
    field!("water_depth_group", 65, 4, signed),
    field!("elevation_scalar", 69, 2, signed),
    field!("coordinate_scalar", 71, 2, signed),
    field!("source_x", 73, 4, signed),
    field!("source_y", 77, 4, signed),
    field!("group_x", 81, 4, signed),
    field!("group_y", 85, 4, signed),
    field!("coordinate_units", 89, 2, unsigned),
    field!("weathering_velocity", 91, 2, unsigned),
    field!("subweathering_velocity", 93, 2, unsigned),
    field!("uphole_time_source", 95, 2, unsigned),
    field!("uphole_time_group", 97, 2, unsigned),
    field!("source_static_correction", 99, 2, unsigned),
    field!("group_static_correction", 101, 2, unsigned),
    field!("total_static_applied", 103, 2, unsigned),
    field!("lag_time_a", 105, 2, unsigned),
    field!("lag_time_b", 107, 2, unsigned),
    field!("delay_recording_time", 109, 2, unsigned),
    field!("mute_time_start", 111, 2, unsigned),
    field!("mute_time_end", 113, 2, unsigned),
    field!("samples_per_trace", 115, 2, unsigned),
    field!("sample_interval", 117, 2, unsigned),
    field!("gain_type", 119, 2, unsigned),
    field!("instrument_gain_constant", 121, 2, unsigned),
    field!("instrument_initial_gain", 123, 2, unsigned),
    field!("correlated", 125, 2, unsigned),
    field!("sweep_frequency_start", 127, 2, unsigned),
    field!("sweep_frequency_end", 129, 2, unsigned),
    field!("sweep_length", 131, 2, unsigned),
    field!("sweep_type_code", 133, 2, unsigned),
    field!("sweep_taper_start", 135, 2, unsigned),
    field!("sweep_taper_end", 137, 2, unsigned),
    field!("taper_type", 139, 2, unsigned),
    field!("alias_filter_frequency", 141, 2, unsigned),
    field!("alias_filter_slope", 143, 2, unsigned),
    field!("notch_filter_frequency", 145, 2, unsigned),
    field!("notch_filter_slope", 147, 2, unsigned),
    field!("low_cut_frequency", 149, 2, unsigned),
    field!("high_cut_frequency", 151, 2, unsigned),
    field!("low_cut_slope", 153, 2, unsigned),
    field!("high_cut_slope", 155, 2, unsigned),
    field!("year_recorded", 157, 2, unsigned),
    field!("day_of_year", 159, 2, unsigned),
    field!("hour_of_day", 161, 2, unsigned),
    field!("minute_of_hour", 163, 2, unsigned),
    field!("second_of_minute", 165, 2, unsigned),
    field!("time_basis_code", 167, 2, unsigned),
    field!("trace_weighting_factor", 169, 2, unsigned),
    field!("geophone_group_roll_switch_position_1", 171, 2, unsigned),
    field!("geophone_group_first_trace", 173, 2, unsigned),
    field!("geophone_group_last_trace", 175, 2, unsigned),
    field!("gap_size", 177, 2, unsigned),
    field!("over_travel", 179, 2, unsigned),
    field!("cdp_x", 181, 4, signed),
    field!("cdp_y", 185, 4, signed),
    field!("inline", 189, 4, signed),
    field!("crossline", 193, 4, signed),
    field!("shot_point", 197, 4, signed),
    field!("shot_point_scalar", 201, 2, unsigned),
    field!("trace_value_unit", 203, 2, unsigned),
    field!("transduction_constant_mantissa", 205, 4, signed),
    field!("transduction_constant_exponent", 209, 2, unsigned),
    field!("transduction_units", 211, 2, unsigned),
    field!("device_trace_identifier", 213, 2, unsigned),
    field!("time_scalar", 215, 2, unsigned),
    field!("source_type", 217, 2, unsigned),
    field!("source_energy_direction_vertical", 219, 2, unsigned),
    field!("source_energy_direction_inline", 221, 2, unsigned),
    field!("source_energy_direction_crossline", 223, 2, unsigned),
    field!("source_measurement_mantissa", 225, 4, signed),
    field!("source_measurement_exponent", 229, 2, unsigned),
    field!("source_measurement_unit", 231, 2, unsigned),
];

/// Look up a binary header field by canonical name.
pub fn binary_field(name: &str) -> Result<&'static FieldSpec, SegyError> {
    BINARY_HEADER_FIELDS
        .iter()
        .find(|f| f.name == name)
        .ok_or_else(|| SegyError::UnknownField { name: name.to_string() })
}

/// Look up a trace header field by canonical name.
pub fn trace_field(name: &str) -> Result<&'static FieldSpec, SegyError> {
    TRACE_HEADER_FIELDS
        .iter()
        .find(|f| f.name == name)
        .ok_or_else(|| SegyError::UnknownField { name: name.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_offsets_match_spec() {
        let f = binary_field("sample_interval").unwrap();
        assert_eq!(f.offset, 16); // byte 17, 0-based
        assert_eq!(f.width, 2);
    }

    #[test]
    fn trace_offsets_match_spec() {
        let f = trace_field("inline").unwrap();
        assert_eq!(f.offset, 188); // byte 189, 0-based
        let f = trace_field("coordinate_scalar").unwrap();
        assert_eq!(f.offset, 70); // byte 71, 0-based
    }

    #[test]
    fn unknown_field_is_an_error() {
        assert!(matches!(
            trace_field("not_a_real_field"),
            Err(SegyError::UnknownField { .. })
        ));
    }

    #[test]
    fn no_overlapping_fields_in_trace_table() {
        let mut ranges: Vec<_> = TRACE_HEADER_FIELDS.iter().map(|f| f.range()).collect();
        ranges.sort_by_key(|r| r.start);
        for pair in ranges.windows(2) {
            assert!(pair[0].end <= pair[1].start, "{:?} overlaps {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn no_overlapping_fields_in_binary_table() {
        let mut ranges: Vec<_> = BINARY_HEADER_FIELDS.iter().map(|f| f.range()).collect();
        ranges.sort_by_key(|r| r.start);
        for pair in ranges.windows(2) {
            assert!(pair[0].end <= pair[1].start, "{:?} overlaps {:?}", pair[0], pair[1]);
        }
    }
}
