#![forbid(unsafe_code)]
//! Encoding and buffer utilities shared by the bulk payload encoders.

pub mod le {
    //! Fixed-width little-endian encoders used by the bulk-insert wire format.

    use core::convert::TryInto;

    const U32_LEN: usize = core::mem::size_of::<u32>();
    const U64_LEN: usize = core::mem::size_of::<u64>();

    /// Appends a u32 in little-endian byte order.
    pub fn put_u32(out: &mut Vec<u8>, v: u32) {
        out.extend_from_slice(&v.to_le_bytes());
    }

    /// Appends a u64 in little-endian byte order.
    pub fn put_u64(out: &mut Vec<u8>, v: u64) {
        out.extend_from_slice(&v.to_le_bytes());
    }

    /// Appends an i64 in little-endian two's complement.
    pub fn put_i64(out: &mut Vec<u8>, v: i64) {
        out.extend_from_slice(&v.to_le_bytes());
    }

    /// Appends an IEEE-754 f64 in little-endian byte order.
    pub fn put_f64(out: &mut Vec<u8>, v: f64) {
        out.extend_from_slice(&v.to_le_bytes());
    }

    /// Decodes a u32 from the head of `src`, if long enough.
    pub fn get_u32(src: &[u8]) -> Option<u32> {
        let head: [u8; U32_LEN] = src.get(..U32_LEN)?.try_into().ok()?;
        Some(u32::from_le_bytes(head))
    }

    /// Decodes a u64 from the head of `src`, if long enough.
    pub fn get_u64(src: &[u8]) -> Option<u64> {
        let head: [u8; U64_LEN] = src.get(..U64_LEN)?.try_into().ok()?;
        Some(u64::from_le_bytes(head))
    }
}

pub mod cstr {
    //! NUL-terminated strings.

    /// Appends `s` followed by a NUL terminator, dropping interior NUL bytes.
    pub fn put(out: &mut Vec<u8>, s: &str) {
        if s.as_bytes().contains(&0) {
            out.extend(s.bytes().filter(|b| *b != 0));
        } else {
            out.extend_from_slice(s.as_bytes());
        }
        out.push(0);
    }

    /// Number of bytes `put` writes for `s`.
    pub fn encoded_len(s: &str) -> usize {
        s.bytes().filter(|b| *b != 0).count() + 1
    }

    /// Splits a NUL-terminated string off the head of `src`, returning it and the
    /// number of bytes consumed including the terminator.
    pub fn split(src: &[u8]) -> Option<(&str, usize)> {
        let end = src.iter().position(|b| *b == 0)?;
        let s = core::str::from_utf8(&src[..end]).ok()?;
        Some((s, end + 1))
    }
}

pub mod buf {
    //! A simple slice-backed cursor for ergonomic parsing.

    use core::fmt;

    use super::{cstr, le};

    /// A cursor for reading bytes from a slice with offset tracking.
    pub struct Cursor<'a> {
        /// The underlying byte slice.
        pub buf: &'a [u8],
        /// Current read offset.
        pub off: usize,
    }

    impl<'a> Cursor<'a> {
        /// Creates a new cursor starting at offset 0.
        pub fn new(buf: &'a [u8]) -> Self {
            Self { buf, off: 0 }
        }

        /// Takes the next `n` bytes, or `None` if fewer remain.
        pub fn take(&mut self, n: usize) -> Option<&'a [u8]> {
            let end = self.off.checked_add(n)?;
            let slice = self.buf.get(self.off..end)?;
            self.off = end;
            Some(slice)
        }

        /// Reads a little-endian u32.
        pub fn u32_le(&mut self) -> Option<u32> {
            self.take(4).and_then(le::get_u32)
        }

        /// Reads a NUL-terminated string.
        pub fn cstr(&mut self) -> Option<&'a str> {
            let rest = self.buf.get(self.off..)?;
            let (s, used) = cstr::split(rest)?;
            self.off += used;
            Some(s)
        }

        /// Returns the number of bytes remaining in the buffer.
        pub fn remaining(&self) -> usize {
            self.buf.len().saturating_sub(self.off)
        }
    }

    impl<'a> fmt::Debug for Cursor<'a> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("Cursor")
                .field("off", &self.off)
                .field("remaining", &self.remaining())
                .finish()
        }
    }
}
