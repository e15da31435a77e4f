//! Low-level primitives shared by the encoders.

/// Byte-level utilities and encoding/decoding.
///
/// Little-endian integer helpers, NUL-terminated strings and a bounds-checked
/// read cursor.
pub mod bytes;
