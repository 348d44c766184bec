//! Frame encoding and decoding
//!
//! Frame format:
//! - HEADER (2 bytes): 0x55 0xAA synchronization marker
//! - VERSION (1 byte): protocol version
//! - COMMAND (1 byte): command code, selects the payload interpretation
//! - LENGTH (2 bytes, big-endian): payload length
//! - PAYLOAD (LENGTH bytes): a data unit, raw bytes, or nothing
//! - CHECKSUM (1 byte): sum of all preceding bytes modulo 256

use core::fmt;

use heapless::Vec;

use crate::bytes::{read_u16, u16_bytes};
use crate::checksum::Checksum;
use crate::command::carries_data_unit;
use crate::unit::{DataUnit, UNIT_HEADER_SIZE};

/// Frame synchronization marker
pub const FRAME_HEADER: [u8; 2] = [0x55, 0xAA];

/// Maximum complete frame size
pub const MAX_FRAME_SIZE: usize = 512;

/// HEADER + VERSION + COMMAND + LENGTH + CHECKSUM
pub const FRAME_OVERHEAD: usize = 7;

/// Bytes before the payload
const PAYLOAD_OFFSET: usize = 6;

/// Maximum payload size in bytes
pub const MAX_DATA_LEN: usize = MAX_FRAME_SIZE - FRAME_OVERHEAD;

/// Owned raw payload bytes
pub type RawBytes = Vec<u8, MAX_DATA_LEN>;

/// Errors that can occur during frame parsing or encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Input ends before the declared structure does
    BufferTooShort,
    /// Declared length exceeds capacity or contradicts the payload
    MalformedLength,
    /// Stored checksum differs from the computed one
    ChecksumMismatch,
    /// Unknown data unit type tag
    InvalidDataType,
    /// Output buffer too small for encoding
    BufferTooSmall,
    /// Value exceeds maximum allowed size
    PayloadTooLarge,
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            FrameError::BufferTooShort => "buffer too short for declared frame",
            FrameError::MalformedLength => "malformed length field",
            FrameError::ChecksumMismatch => "checksum mismatch",
            FrameError::InvalidDataType => "unknown data unit type",
            FrameError::BufferTooSmall => "output buffer too small",
            FrameError::PayloadTooLarge => "payload too large",
        };
        f.write_str(msg)
    }
}

/// Frame payload
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Payload {
    #[default]
    Empty,
    Unit(DataUnit),
    Raw(RawBytes),
}

impl Payload {
    /// Raw payload copied from `bytes`; an empty slice gives [`Payload::Empty`]
    pub fn raw(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.is_empty() {
            return Ok(Payload::Empty);
        }
        RawBytes::from_slice(bytes)
            .map(Payload::Raw)
            .map_err(|_| FrameError::PayloadTooLarge)
    }

    /// Length of the encoded payload
    pub fn encoded_len(&self) -> usize {
        match self {
            Payload::Empty => 0,
            Payload::Unit(unit) => unit.encoded_len(),
            Payload::Raw(bytes) => bytes.len(),
        }
    }

    pub fn as_unit(&self) -> Option<&DataUnit> {
        match self {
            Payload::Unit(unit) => Some(unit),
            _ => None,
        }
    }

    pub fn as_raw(&self) -> Option<&[u8]> {
        match self {
            Payload::Raw(bytes) => Some(bytes.as_slice()),
            _ => None,
        }
    }

    /// Interpret payload bytes according to the command class
    fn decode(command: u8, data: &[u8]) -> Result<Self, FrameError> {
        if carries_data_unit(command) {
            if data.len() < UNIT_HEADER_SIZE {
                return Err(FrameError::MalformedLength);
            }
            let unit = DataUnit::decode(data)?;
            if unit.encoded_len() != data.len() {
                return Err(FrameError::MalformedLength);
            }
            Ok(Payload::Unit(unit))
        } else if data.is_empty() {
            Ok(Payload::Empty)
        } else {
            RawBytes::from_slice(data)
                .map(Payload::Raw)
                .map_err(|_| FrameError::MalformedLength)
        }
    }

    fn encode(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        match self {
            Payload::Empty => Ok(0),
            Payload::Unit(unit) => unit.encode(buffer),
            Payload::Raw(bytes) => {
                let dest = buffer
                    .get_mut(..bytes.len())
                    .ok_or(FrameError::BufferTooSmall)?;
                dest.copy_from_slice(bytes);
                Ok(bytes.len())
            }
        }
    }

    fn update_checksum(&self, checksum: &mut Checksum) {
        match self {
            Payload::Empty => {}
            Payload::Unit(unit) => unit.update_checksum(checksum),
            Payload::Raw(bytes) => checksum.update(bytes),
        }
    }
}

/// A parsed or constructed frame
///
/// The payload length is derived from [`DataFrame::payload`], so it cannot
/// drift from what is encoded. The checksum is stored as received (or as set
/// at construction) and is only compared on request.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DataFrame {
    /// Protocol version
    pub version: u8,
    /// Command code
    pub command: u8,
    /// Payload data
    pub payload: Payload,
    /// Trailer byte
    pub checksum: u8,
}

impl DataFrame {
    /// Create a frame with a correct checksum
    pub fn new(version: u8, command: u8, payload: Payload) -> Self {
        let mut frame = Self {
            version,
            command,
            payload,
            checksum: 0,
        };
        frame.seal();
        frame
    }

    /// Create a frame with no payload
    pub fn empty(version: u8, command: u8) -> Self {
        Self::new(version, command, Payload::Empty)
    }

    /// Create a frame carrying a data unit
    pub fn with_unit(version: u8, command: u8, unit: DataUnit) -> Self {
        Self::new(version, command, Payload::Unit(unit))
    }

    /// Create a frame carrying raw bytes
    pub fn with_raw(version: u8, command: u8, bytes: &[u8]) -> Result<Self, FrameError> {
        Ok(Self::new(version, command, Payload::raw(bytes)?))
    }

    /// Payload length as carried in the LENGTH field
    pub fn data_len(&self) -> usize {
        self.payload.encoded_len()
    }

    /// Total encoded length
    pub fn encoded_len(&self) -> usize {
        FRAME_OVERHEAD + self.data_len()
    }

    /// The data unit, if this frame carries one
    pub fn unit(&self) -> Option<&DataUnit> {
        self.payload.as_unit()
    }

    pub(crate) fn head(&self) -> [u8; PAYLOAD_OFFSET] {
        let [len_hi, len_lo] = u16_bytes(self.data_len() as u16);
        [
            FRAME_HEADER[0],
            FRAME_HEADER[1],
            self.version,
            self.command,
            len_hi,
            len_lo,
        ]
    }

    /// Compute the checksum from the current contents
    pub fn compute_checksum(&self) -> u8 {
        let mut checksum = Checksum::new();
        checksum.update(&self.head());
        self.payload.update_checksum(&mut checksum);
        checksum.value()
    }

    /// Recompute and store the checksum
    pub fn seal(&mut self) {
        self.checksum = self.compute_checksum();
    }

    /// Returns true if the stored checksum matches the contents
    pub fn is_valid(&self) -> bool {
        self.compute_checksum() == self.checksum
    }

    /// Like [`is_valid`](Self::is_valid), as a `Result`
    pub fn verify(&self) -> Result<(), FrameError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(FrameError::ChecksumMismatch)
        }
    }

    /// Decode the first frame found in `bytes`
    ///
    /// Leading bytes before the header marker are skipped. The checksum is
    /// read but not checked; call [`verify`](Self::verify) for that.
    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        Self::decode_with_len(bytes).map(|(frame, _)| frame)
    }

    /// Decode the first frame found in `bytes`
    ///
    /// Also returns the number of bytes consumed, including skipped leading
    /// bytes, so several back-to-back frames can be walked.
    pub fn decode_with_len(bytes: &[u8]) -> Result<(Self, usize), FrameError> {
        let start = find_header(bytes)?;
        let raw = &bytes[start..];

        let version = raw[2];
        let command = raw[3];
        let data_len = read_u16(&raw[4..PAYLOAD_OFFSET]) as usize;
        if data_len > MAX_DATA_LEN {
            return Err(FrameError::MalformedLength);
        }

        let frame_len = FRAME_OVERHEAD + data_len;
        if raw.len() < frame_len {
            return Err(FrameError::BufferTooShort);
        }

        let data_end = PAYLOAD_OFFSET + data_len;
        let payload = Payload::decode(command, &raw[PAYLOAD_OFFSET..data_end])?;

        let frame = Self {
            version,
            command,
            payload,
            checksum: raw[data_end],
        };
        Ok((frame, start + frame_len))
    }

    /// Encode this frame into a byte buffer
    ///
    /// Returns the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        let frame_len = self.encoded_len();
        if buffer.len() < frame_len {
            return Err(FrameError::BufferTooSmall);
        }

        buffer[..PAYLOAD_OFFSET].copy_from_slice(&self.head());
        let data_len = self.payload.encode(&mut buffer[PAYLOAD_OFFSET..])?;
        buffer[PAYLOAD_OFFSET + data_len] = self.checksum;

        Ok(frame_len)
    }

    /// Encode this frame into a heapless Vec
    pub fn encode_to_vec(&self) -> Result<Vec<u8, MAX_FRAME_SIZE>, FrameError> {
        let mut buffer = [0u8; MAX_FRAME_SIZE];
        let len = self.encode(&mut buffer)?;
        Vec::from_slice(&buffer[..len]).map_err(|_| FrameError::BufferTooSmall)
    }
}

/// Offset of the first header marker with room for a minimal frame after it
fn find_header(bytes: &[u8]) -> Result<usize, FrameError> {
    if bytes.len() < FRAME_OVERHEAD {
        return Err(FrameError::BufferTooShort);
    }
    (0..=bytes.len() - FRAME_OVERHEAD)
        .find(|&i| bytes[i..i + 2] == FRAME_HEADER)
        .ok_or(FrameError::BufferTooShort)
}
