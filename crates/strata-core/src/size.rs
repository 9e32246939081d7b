//! Byte-size helpers.

/// `n` kibibytes in bytes.
pub const fn kib(n: usize) -> usize {
    n * 1024
}

/// `n` mebibytes in bytes.
pub const fn mib(n: usize) -> usize {
    n * 1024 * 1024
}

/// `n` gibibytes in bytes.
pub const fn gib(n: usize) -> usize {
    n * 1024 * 1024 * 1024
}
