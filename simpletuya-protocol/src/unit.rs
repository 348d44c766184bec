//! Data unit encoding and decoding
//!
//! Data unit format:
//! - DPID (1 byte): data point identifier
//! - TYPE (1 byte): value type tag
//! - LENGTH (2 bytes, big-endian): value length
//! - VALUE (LENGTH bytes): Int is 4-byte big-endian, Bool/Char 1 byte,
//!   Raw/Str/Bitmap verbatim

use heapless::Vec;

use crate::bytes::{bytes_to_unsigned, read_u16, u16_bytes, unsigned_to_bytes};
use crate::checksum::Checksum;
use crate::frame::{FrameError, MAX_DATA_LEN};

/// DPID + TYPE + LENGTH
pub const UNIT_HEADER_SIZE: usize = 4;

/// Largest value that fits in a frame
pub const MAX_VALUE_LEN: usize = MAX_DATA_LEN - UNIT_HEADER_SIZE;

/// Owned variable-length value bytes
pub type ValueBytes = Vec<u8, MAX_VALUE_LEN>;

/// Value type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataType {
    /// N bytes
    Raw,
    /// 1 byte
    Bool,
    /// 4 bytes
    Int,
    /// N bytes
    Str,
    /// 1 byte
    Char,
    /// N bytes
    Bitmap,
}

// Wire format values
const TYPE_RAW: u8 = 0x00;
const TYPE_BOOL: u8 = 0x01;
const TYPE_INT: u8 = 0x02;
const TYPE_STR: u8 = 0x03;
const TYPE_CHAR: u8 = 0x04;
const TYPE_BITMAP: u8 = 0x05;

impl DataType {
    /// Parse a type from its wire format byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            TYPE_RAW => Some(DataType::Raw),
            TYPE_BOOL => Some(DataType::Bool),
            TYPE_INT => Some(DataType::Int),
            TYPE_STR => Some(DataType::Str),
            TYPE_CHAR => Some(DataType::Char),
            TYPE_BITMAP => Some(DataType::Bitmap),
            _ => None,
        }
    }

    /// Convert to wire format byte
    pub fn to_byte(self) -> u8 {
        match self {
            DataType::Raw => TYPE_RAW,
            DataType::Bool => TYPE_BOOL,
            DataType::Int => TYPE_INT,
            DataType::Str => TYPE_STR,
            DataType::Char => TYPE_CHAR,
            DataType::Bitmap => TYPE_BITMAP,
        }
    }

    /// Encoded value size for fixed-size types, `None` for variable ones
    pub fn fixed_size(self) -> Option<usize> {
        match self {
            DataType::Bool | DataType::Char => Some(1),
            DataType::Int => Some(4),
            DataType::Raw | DataType::Str | DataType::Bitmap => None,
        }
    }
}

/// A typed value
///
/// The type tag and the value length are both derived from the variant, so
/// they always agree with what gets serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataValue {
    Raw(ValueBytes),
    /// Wire byte, kept as received; non-zero is true
    Bool(u8),
    Int(i32),
    Str(ValueBytes),
    Char(u8),
    Bitmap(ValueBytes),
}

impl DataValue {
    /// Type tag of this value
    pub fn data_type(&self) -> DataType {
        match self {
            DataValue::Raw(_) => DataType::Raw,
            DataValue::Bool(_) => DataType::Bool,
            DataValue::Int(_) => DataType::Int,
            DataValue::Str(_) => DataType::Str,
            DataValue::Char(_) => DataType::Char,
            DataValue::Bitmap(_) => DataType::Bitmap,
        }
    }

    /// Encoded length of the value
    pub fn len(&self) -> usize {
        match self {
            DataValue::Raw(bytes) | DataValue::Str(bytes) | DataValue::Bitmap(bytes) => {
                bytes.len()
            }
            DataValue::Bool(_) | DataValue::Char(_) => 1,
            DataValue::Int(_) => 4,
        }
    }

    /// Returns true for a zero-length array value
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `f` over the encoded value bytes
    pub(crate) fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        match self {
            DataValue::Raw(bytes) | DataValue::Str(bytes) | DataValue::Bitmap(bytes) => {
                f(bytes.as_slice())
            }
            DataValue::Bool(value) | DataValue::Char(value) => f(&[*value][..]),
            DataValue::Int(value) => f(unsigned_to_bytes(*value as u32, 4).as_slice()),
        }
    }

    /// Decode a value of the given type from exactly its value bytes
    fn decode(data_type: DataType, bytes: &[u8]) -> Result<Self, FrameError> {
        if let Some(size) = data_type.fixed_size() {
            if bytes.len() != size {
                return Err(FrameError::MalformedLength);
            }
        }

        let owned = || ValueBytes::from_slice(bytes).map_err(|_| FrameError::MalformedLength);

        Ok(match data_type {
            DataType::Raw => DataValue::Raw(owned()?),
            DataType::Bool => DataValue::Bool(bytes[0]),
            DataType::Int => DataValue::Int(bytes_to_unsigned(bytes, 4) as i32),
            DataType::Str => DataValue::Str(owned()?),
            DataType::Char => DataValue::Char(bytes[0]),
            DataType::Bitmap => DataValue::Bitmap(owned()?),
        })
    }
}

/// A data point value tagged with its identifier
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DataUnit {
    /// Data point identifier
    pub dpid: u8,
    /// Typed value
    pub value: DataValue,
}

impl DataUnit {
    pub fn new(dpid: u8, value: DataValue) -> Self {
        Self { dpid, value }
    }

    pub fn int(dpid: u8, value: i32) -> Self {
        Self::new(dpid, DataValue::Int(value))
    }

    pub fn boolean(dpid: u8, value: bool) -> Self {
        Self::new(dpid, DataValue::Bool(u8::from(value)))
    }

    pub fn char(dpid: u8, value: u8) -> Self {
        Self::new(dpid, DataValue::Char(value))
    }

    /// Create a raw value unit, copying `bytes`
    pub fn raw(dpid: u8, bytes: &[u8]) -> Result<Self, FrameError> {
        Ok(Self::new(dpid, DataValue::Raw(Self::copy_value(bytes)?)))
    }

    /// Create a string value unit (UTF-8 bytes, no terminator)
    pub fn string(dpid: u8, text: &str) -> Result<Self, FrameError> {
        Ok(Self::new(
            dpid,
            DataValue::Str(Self::copy_value(text.as_bytes())?),
        ))
    }

    /// Create a bitmap value unit, copying `bytes`
    pub fn bitmap(dpid: u8, bytes: &[u8]) -> Result<Self, FrameError> {
        Ok(Self::new(dpid, DataValue::Bitmap(Self::copy_value(bytes)?)))
    }

    fn copy_value(bytes: &[u8]) -> Result<ValueBytes, FrameError> {
        ValueBytes::from_slice(bytes).map_err(|_| FrameError::PayloadTooLarge)
    }

    /// Type tag of the value
    pub fn data_type(&self) -> DataType {
        self.value.data_type()
    }

    /// Length of the encoded value
    pub fn value_len(&self) -> usize {
        self.value.len()
    }

    /// Length of the whole encoded unit
    pub fn encoded_len(&self) -> usize {
        UNIT_HEADER_SIZE + self.value_len()
    }

    /// Integer value, if this is an Int unit
    pub fn as_int(&self) -> Option<i32> {
        match self.value {
            DataValue::Int(value) => Some(value),
            _ => None,
        }
    }

    /// Boolean value, if this is a Bool unit
    pub fn as_bool(&self) -> Option<bool> {
        match self.value {
            DataValue::Bool(value) => Some(value != 0),
            _ => None,
        }
    }

    /// String value, if this is a Str unit holding valid UTF-8
    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            DataValue::Str(bytes) => core::str::from_utf8(bytes).ok(),
            _ => None,
        }
    }

    pub(crate) fn header(&self) -> [u8; UNIT_HEADER_SIZE] {
        let [len_hi, len_lo] = u16_bytes(self.value_len() as u16);
        [self.dpid, self.data_type().to_byte(), len_hi, len_lo]
    }

    /// Decode a unit from the start of `bytes`
    ///
    /// Bytes past the declared value length are ignored. The value is copied
    /// out, so the result does not borrow from `bytes`.
    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() < UNIT_HEADER_SIZE {
            return Err(FrameError::BufferTooShort);
        }

        let dpid = bytes[0];
        let data_type = DataType::from_byte(bytes[1]).ok_or(FrameError::InvalidDataType)?;
        let value_len = read_u16(&bytes[2..4]) as usize;

        let end = UNIT_HEADER_SIZE + value_len;
        if bytes.len() < end {
            return Err(FrameError::BufferTooShort);
        }

        let value = DataValue::decode(data_type, &bytes[UNIT_HEADER_SIZE..end])?;
        Ok(Self { dpid, value })
    }

    /// Encode this unit into a byte buffer
    ///
    /// Returns the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        let len = self.encoded_len();
        if buffer.len() < len {
            return Err(FrameError::BufferTooSmall);
        }

        buffer[..UNIT_HEADER_SIZE].copy_from_slice(&self.header());
        self.value
            .with_bytes(|value| buffer[UNIT_HEADER_SIZE..len].copy_from_slice(value));

        Ok(len)
    }

    /// Encode this unit into a heapless Vec
    pub fn encode_to_vec(&self) -> Result<Vec<u8, MAX_DATA_LEN>, FrameError> {
        let mut buffer = [0u8; MAX_DATA_LEN];
        let len = self.encode(&mut buffer)?;
        Vec::from_slice(&buffer[..len]).map_err(|_| FrameError::BufferTooSmall)
    }

    /// Add the encoded form of this unit to a running checksum
    pub(crate) fn update_checksum(&self, checksum: &mut Checksum) {
        checksum.update(&self.header());
        self.value.with_bytes(|value| checksum.update(value));
    }
}
