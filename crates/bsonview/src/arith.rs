//! Checked 32-bit size arithmetic.
//!
//! Every size that appears in the wire format is a signed 32-bit quantity, so
//! all size computations narrow through these helpers before any buffer is
//! touched. A `None` means the operation must be rejected with the buffer left
//! unchanged.

/// Add two element sizes, failing on 32-bit overflow.
pub(crate) fn add_i32(a: i32, b: i32) -> Option<i32> {
    a.checked_add(b)
}

/// Narrow a 64-bit size to the encodable 32-bit range.
pub(crate) fn i64_to_i32(v: i64) -> Option<i32> {
    i32::try_from(v).ok()
}

/// Narrow a host size to the encodable 32-bit range.
pub(crate) fn usize_to_i32(v: usize) -> Option<i32> {
    i32::try_from(v).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_overflow_is_detected() {
        assert_eq!(add_i32(i32::MAX, 1), None);
        assert_eq!(add_i32(i32::MAX - 1, 1), Some(i32::MAX));
    }

    #[test]
    fn narrowing_rejects_out_of_range() {
        assert_eq!(i64_to_i32(i64::from(i32::MAX) + 1), None);
        assert_eq!(i64_to_i32(-1), Some(-1));
        assert_eq!(usize_to_i32(usize::MAX), None);
        assert_eq!(usize_to_i32(7), Some(7));
    }
}
