//! CFB name ordering (spec §4.4 "CFB name ordering", §9 design note).
//!
//! This rule is idiosyncratic and deliberately does **not** use any
//! platform locale or case-fold function: it compares UTF-16 code-unit
//! *length* first, then compares code unit by code unit under a simple
//! uppercase fold. It backs both the red-black tree's sort order and
//! every name-based lookup.

use std::cmp::Ordering;

/// Simple, locale-independent uppercase fold of one UTF-16 code unit.
/// Surrogate halves (which do not stand for a complete scalar value on
/// their own) are left untouched.
fn fold_unit(unit: u16) -> u16 {
    match char::from_u32(unit as u32) {
        Some(c) => match c.to_uppercase().next() {
            Some(up) if (up as u32) <= 0xFFFF => up as u16,
            _ => unit,
        },
        None => unit,
    }
}

/// Compares two UTF-16 name strings (without their terminating NUL) using
/// the CFB red-black tree ordering: shorter names sort before longer ones,
/// and names of equal length compare case-insensitively, code unit by
/// code unit.
pub fn compare_names(a: &[u16], b: &[u16]) -> Ordering {
    match a.len().cmp(&b.len()) {
        Ordering::Equal => {}
        other => return other,
    }
    for (&x, &y) in a.iter().zip(b.iter()) {
        match fold_unit(x).cmp(&fold_unit(y)) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

/// Decodes a 64-byte directory-entry name field (UTF-16LE, NUL-padded)
/// into its UTF-16 code units, given the entry's declared `name_length`
/// in bytes (including the terminating NUL).
pub fn decode_name_units(raw: &[u8; 64], name_length: u16) -> Vec<u16> {
    if name_length < 2 {
        return Vec::new();
    }
    let code_unit_count = (name_length as usize / 2).saturating_sub(1);
    raw.chunks_exact(2)
        .take(code_unit_count)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Decodes a directory-entry name field straight to a `String`, for
/// display and for path-component comparisons.
pub fn decode_name(raw: &[u8; 64], name_length: u16) -> String {
    String::from_utf16_lossy(&decode_name_units(raw, name_length))
}
