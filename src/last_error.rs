//! Fixed-capacity, NUL-terminated message slot.

use crate::constants::LAST_ERROR_CAPACITY;

/// Copy `src` into `dst` as a C string, truncating so the NUL always fits.
///
/// Never splits a UTF-8 character. Returns the number of bytes copied,
/// excluding the NUL. An empty `dst` receives nothing.
pub(crate) fn copy_c_str(dst: &mut [u8], src: &str) -> usize {
    let Some(room) = dst.len().checked_sub(1) else {
        return 0;
    };
    let mut n = src.len().min(room);
    while !src.is_char_boundary(n) {
        n -= 1;
    }
    copy_c_bytes(dst, &src.as_bytes()[..n])
}

/// Byte-for-byte variant of [`copy_c_str`] for fields that are not text.
pub(crate) fn copy_c_bytes(dst: &mut [u8], src: &[u8]) -> usize {
    let Some(room) = dst.len().checked_sub(1) else {
        return 0;
    };
    let n = src.len().min(room);
    dst[..n].copy_from_slice(&src[..n]);
    dst[n] = 0;
    n
}

/// The last failure message of an [`crate::Obi`].
///
/// An empty slot means "no message", which says nothing about whether the
/// most recent operation succeeded.
#[derive(Clone)]
pub struct LastError {
    buf: [u8; LAST_ERROR_CAPACITY],
    len: usize,
}

impl LastError {
    pub const CAPACITY: usize = LAST_ERROR_CAPACITY;

    pub fn new() -> Self {
        Self {
            buf: [0; LAST_ERROR_CAPACITY],
            len: 0,
        }
    }

    pub fn set(&mut self, message: &str) {
        self.len = copy_c_str(&mut self.buf, message);
    }

    pub fn clear(&mut self) {
        self.buf[0] = 0;
        self.len = 0;
    }

    pub fn as_str(&self) -> &str {
        // only ever filled from a &str cut at a char boundary
        std::str::from_utf8(&self.buf[..self.len]).unwrap_or_default()
    }

    /// Message bytes including the terminating NUL
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        &self.buf[..=self.len]
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for LastError {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LastError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("LastError").field(&self.as_str()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_message_is_truncated_and_terminated() {
        let mut slot = LastError::new();
        let long = "x".repeat(200);
        slot.set(&long);

        assert_eq!(slot.as_str().len(), LastError::CAPACITY - 1);
        let raw = slot.as_bytes_with_nul();
        assert_eq!(raw.len(), LastError::CAPACITY);
        assert_eq!(raw[LastError::CAPACITY - 1], 0);
    }

    #[test]
    fn overwrite_and_clear() {
        let mut slot = LastError::new();
        assert!(slot.is_empty());
        slot.set("Failed to read battery data: No presence pulse");
        slot.set("Failed to read model");
        assert_eq!(slot.as_str(), "Failed to read model");
        assert_eq!(slot.as_bytes_with_nul().last(), Some(&0));
        slot.clear();
        assert_eq!(slot.as_str(), "");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let mut dst = [0xAAu8; 4];
        // 'é' is two bytes and would straddle the limit
        assert_eq!(copy_c_str(&mut dst, "abé"), 2);
        assert_eq!(&dst[..3], b"ab\0");
        assert_eq!(copy_c_str(&mut [], "abc"), 0);
        let mut one = [0xAAu8; 1];
        assert_eq!(copy_c_str(&mut one, "abc"), 0);
        assert_eq!(one, [0]);
    }

    #[test]
    fn raw_bytes_copied_verbatim() {
        let mut dst = [0xAAu8; 8];
        assert_eq!(copy_c_bytes(&mut dst, &[0xB0, 0xFF, 0x31]), 3);
        assert_eq!(&dst[..4], &[0xB0, 0xFF, 0x31, 0x00]);
        let mut small = [0xAAu8; 2];
        assert_eq!(copy_c_bytes(&mut small, &[0xB0, 0xFF]), 1);
        assert_eq!(small, [0xB0, 0x00]);
    }
}
