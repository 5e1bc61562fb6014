//! Sortable, prefix-coded numeric terms.
//!
//! Numbers are indexed as byte strings whose lexicographic order matches the
//! numeric order. The layout is compatible with Lucene's `NumericUtils`: a
//! header byte carrying the type and shift, followed by the sign-flipped
//! value in big-endian 7-bit groups. Only full precision terms (shift 0) are
//! produced by this crate, but any shift is accepted on decode.

use crate::error::{Result, SarissaError};

/// Header base for long (64-bit) terms.
pub const SHIFT_START_LONG: u8 = 0x20;

/// Header base for int (32-bit) terms.
pub const SHIFT_START_INT: u8 = 0x60;

/// Length in bytes of a full precision long term.
pub const BUF_SIZE_LONG: usize = 63 / 7 + 2;

/// Length in bytes of a full precision int term.
pub const BUF_SIZE_INT: usize = 31 / 7 + 2;

/// Encode `value` shifted right by `shift` bits as a prefix-coded long.
pub fn long_to_prefix_coded(value: i64, shift: u32) -> Vec<u8> {
    debug_assert!(shift < 64);
    let mut chars = ((((63 - shift) * 37) >> 8) + 1) as usize;
    let mut bytes = vec![0u8; chars + 1];
    bytes[0] = SHIFT_START_LONG + shift as u8;

    let mut sortable = ((value as u64) ^ 0x8000_0000_0000_0000) >> shift;
    while chars > 0 {
        bytes[chars] = (sortable & 0x7F) as u8;
        sortable >>= 7;
        chars -= 1;
    }
    bytes
}

/// Encode `value` shifted right by `shift` bits as a prefix-coded int.
pub fn int_to_prefix_coded(value: i32, shift: u32) -> Vec<u8> {
    debug_assert!(shift < 32);
    let mut chars = ((((31 - shift) * 37) >> 8) + 1) as usize;
    let mut bytes = vec![0u8; chars + 1];
    bytes[0] = SHIFT_START_INT + shift as u8;

    let mut sortable = ((value as u32) ^ 0x8000_0000) >> shift;
    while chars > 0 {
        bytes[chars] = (sortable & 0x7F) as u8;
        sortable >>= 7;
        chars -= 1;
    }
    bytes
}

/// Decode a prefix-coded long term.
pub fn prefix_coded_to_long(bytes: &[u8]) -> Result<i64> {
    let shift = prefix_shift(bytes, SHIFT_START_LONG, 63, "long")?;
    let mut sortable = 0u64;
    for (position, &byte) in bytes.iter().enumerate().skip(1) {
        sortable = (sortable << 7) | u64::from(check_group(byte, position)?);
    }
    Ok(((sortable << shift) ^ 0x8000_0000_0000_0000) as i64)
}

/// Decode a prefix-coded int term.
pub fn prefix_coded_to_int(bytes: &[u8]) -> Result<i32> {
    let shift = prefix_shift(bytes, SHIFT_START_INT, 31, "int")?;
    let mut sortable = 0u32;
    for (position, &byte) in bytes.iter().enumerate().skip(1) {
        sortable = (sortable << 7) | u32::from(check_group(byte, position)?);
    }
    Ok(((sortable << shift) ^ 0x8000_0000) as i32)
}

fn prefix_shift(bytes: &[u8], start: u8, max_shift: u8, kind: &str) -> Result<u32> {
    let header = *bytes
        .first()
        .ok_or_else(|| SarissaError::schema_mismatch(format!("empty prefix coded {kind} term")))?;
    match header.checked_sub(start) {
        Some(shift) if shift <= max_shift => Ok(u32::from(shift)),
        _ => Err(SarissaError::schema_mismatch(format!(
            "invalid shift value in prefix coded {kind} term (header byte {header:#04x})"
        ))),
    }
}

fn check_group(byte: u8, position: usize) -> Result<u8> {
    if byte & 0x80 != 0 {
        return Err(SarissaError::schema_mismatch(format!(
            "invalid prefix coded numerical value representation (byte {byte:#04x} at position {position} is invalid)"
        )));
    }
    Ok(byte)
}

/// Map a double to a long whose signed order matches the double's order.
pub fn double_to_sortable_long(value: f64) -> i64 {
    // Canonical NaN, so every NaN sorts to the same place.
    let bits = if value.is_nan() {
        f64::NAN.to_bits() as i64
    } else {
        value.to_bits() as i64
    };
    bits ^ ((bits >> 63) & 0x7FFF_FFFF_FFFF_FFFF)
}

/// Inverse of [`double_to_sortable_long`].
pub fn sortable_long_to_double(value: i64) -> f64 {
    f64::from_bits((value ^ ((value >> 63) & 0x7FFF_FFFF_FFFF_FFFF)) as u64)
}

/// Map a float to an int whose signed order matches the float's order.
pub fn float_to_sortable_int(value: f32) -> i32 {
    let bits = if value.is_nan() {
        f32::NAN.to_bits() as i32
    } else {
        value.to_bits() as i32
    };
    bits ^ ((bits >> 31) & 0x7FFF_FFFF)
}

/// Inverse of [`float_to_sortable_int`].
pub fn sortable_int_to_float(value: i32) -> f32 {
    f32::from_bits((value ^ ((value >> 31) & 0x7FFF_FFFF)) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_long_layout() {
        let bytes = long_to_prefix_coded(0, 0);
        assert_eq!(bytes.len(), BUF_SIZE_LONG);
        assert_eq!(bytes[0], SHIFT_START_LONG);
        // Sign bit flipped: 0 encodes as 1 << 63.
        assert_eq!(bytes[1], 0x01);
        assert!(bytes[2..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_long_values() {
        for &value in &[0i64, 1, -1, 42, i64::MIN, i64::MAX, 1_234_567_890_123] {
            let bytes = long_to_prefix_coded(value, 0);
            assert_eq!(prefix_coded_to_long(&bytes).unwrap(), value);
        }
    }

    #[test]
    fn test_int_values() {
        for &value in &[0i32, 1, -1, 7, i32::MIN, i32::MAX] {
            let bytes = int_to_prefix_coded(value, 0);
            assert_eq!(bytes.len(), BUF_SIZE_INT);
            assert_eq!(prefix_coded_to_int(&bytes).unwrap(), value);
        }
    }

    #[test]
    fn test_terms_sort_like_numbers() {
        let values = [-100i64, -1, 0, 1, 100, 1 << 40];
        let terms: Vec<Vec<u8>> = values.iter().map(|&v| long_to_prefix_coded(v, 0)).collect();
        let mut sorted = terms.clone();
        sorted.sort();
        assert_eq!(terms, sorted);
    }

    #[test]
    fn test_shifted_value_drops_low_bits() {
        let bytes = long_to_prefix_coded(0x1234, 8);
        assert_eq!(bytes[0], SHIFT_START_LONG + 8);
        assert_eq!(prefix_coded_to_long(&bytes).unwrap(), 0x1200);
    }

    #[test]
    fn test_sortable_floats() {
        let values = [-2.5f64, -0.0, 0.0, 0.5, 3.75];
        let sortable: Vec<i64> = values.iter().map(|&v| double_to_sortable_long(v)).collect();
        assert!(sortable.windows(2).all(|w| w[0] <= w[1]));
        for &value in &values {
            assert_eq!(sortable_long_to_double(double_to_sortable_long(value)), value);
        }

        assert_eq!(sortable_int_to_float(float_to_sortable_int(-1.25)), -1.25);
        assert!(float_to_sortable_int(-1.0) < float_to_sortable_int(1.0));
    }

    #[test]
    fn test_malformed_terms() {
        assert!(prefix_coded_to_long(&[]).is_err());
        assert!(prefix_coded_to_long(&[0x60, 0x01]).is_err());
        assert!(prefix_coded_to_int(&[0x60, 0x80]).is_err());
        assert!(prefix_coded_to_int(&[0xFF, 0x01]).is_err());
    }
}
