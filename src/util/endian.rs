//! Byte order helpers

/// Fold bytes big-endian into a u64, keeping the low 64 bits.
///
/// Inputs longer than 8 bytes therefore reduce to their last 8 bytes.
pub fn be_int(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(0u64, |acc, &b| acc.wrapping_shl(8) | b as u64)
}

/// Append a 24-bit big-endian length. Values above 0xFFFFFF are truncated.
pub fn put_u24_be(out: &mut Vec<u8>, value: usize) {
    let v = value as u32;
    out.extend_from_slice(&v.to_be_bytes()[1..]);
}

/// Read a 16-bit big-endian integer at `offset`, if in bounds.
pub fn read_u16_be(bytes: &[u8], offset: usize) -> Option<u16> {
    let end = offset.checked_add(2)?;
    let b = bytes.get(offset..end)?;
    Some(u16::from_be_bytes([b[0], b[1]]))
}

/// Read a 24-bit big-endian integer at `offset`, if in bounds.
pub fn read_u24_be(bytes: &[u8], offset: usize) -> Option<u32> {
    let end = offset.checked_add(3)?;
    let b = bytes.get(offset..end)?;
    Some(u32::from_be_bytes([0, b[0], b[1], b[2]]))
}
