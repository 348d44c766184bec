//! Frame checksum
//!
//! The trailer byte is the sum of every preceding frame byte modulo 256.

/// Running modulo-256 sum
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Checksum(u8);

impl Checksum {
    /// Start a new sum at zero
    pub const fn new() -> Self {
        Self(0)
    }

    /// Add a single byte
    #[inline]
    pub fn push(&mut self, byte: u8) {
        self.0 = self.0.wrapping_add(byte);
    }

    /// Add a run of bytes
    pub fn update(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.push(byte);
        }
    }

    /// Current sum
    pub const fn value(&self) -> u8 {
        self.0
    }
}

/// Checksum of a raw byte buffer
pub fn sum(bytes: &[u8]) -> u8 {
    let mut checksum = Checksum::new();
    checksum.update(bytes);
    checksum.value()
}
