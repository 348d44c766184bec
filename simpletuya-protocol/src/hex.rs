//! Hex rendering for logs and debugging
//!
//! Output is space-separated uppercase pairs, e.g. `55 AA 03 07 00 05 ...`.
//! Nothing here is part of the wire contract.

use core::fmt::{self, Write};

use crate::frame::{DataFrame, Payload};

/// Writes bytes as hex pairs, inserting separators between calls
struct PairWriter<'a, 'b> {
    f: &'a mut fmt::Formatter<'b>,
    first: bool,
}

impl<'a, 'b> PairWriter<'a, 'b> {
    fn new(f: &'a mut fmt::Formatter<'b>) -> Self {
        Self { f, first: true }
    }

    fn bytes(&mut self, bytes: &[u8]) -> fmt::Result {
        for &byte in bytes {
            if !self.first {
                self.f.write_char(' ')?;
            }
            self.first = false;
            write!(self.f, "{:02X}", byte)?;
        }
        Ok(())
    }
}

/// Display adapter for a byte slice
#[derive(Debug, Clone, Copy)]
pub struct HexBytes<'a>(pub &'a [u8]);

impl fmt::Display for HexBytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        PairWriter::new(f).bytes(self.0)
    }
}

/// Display adapter for a frame, see [`DataFrame::hex`]
#[derive(Debug, Clone, Copy)]
pub struct HexDump<'a>(&'a DataFrame);

impl fmt::Display for HexDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let frame = self.0;
        let mut out = PairWriter::new(f);

        out.bytes(&frame.head())?;
        match &frame.payload {
            Payload::Empty => {}
            Payload::Unit(unit) => {
                out.bytes(&unit.header())?;
                unit.value.with_bytes(|value| out.bytes(value))?;
            }
            Payload::Raw(bytes) => out.bytes(bytes)?,
        }
        out.bytes(&[frame.checksum])
    }
}

impl DataFrame {
    /// Render header, fields, payload and checksum as hex pairs
    ///
    /// The checksum shown is the stored one, valid or not.
    pub fn hex(&self) -> HexDump<'_> {
        HexDump(self)
    }
}

/// Render a frame as an owned hex string
#[cfg(feature = "alloc")]
pub fn frame_to_hex_string(frame: &DataFrame) -> alloc::string::String {
    use alloc::string::ToString;
    frame.hex().to_string()
}
