//! Byte-at-a-time frame extraction from a serial stream
//!
//! [`FrameExtractor`] accumulates bytes until a whole frame is buffered.
//! Malformed input is never reported: the extractor drops what it has and
//! waits for the next header marker.

use heapless::Vec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::bytes::read_u16;
use crate::frame::{DataFrame, FrameError, FRAME_HEADER, FRAME_OVERHEAD, MAX_FRAME_SIZE};

/// What to do with the byte that broke a header marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum HeaderRecovery {
    /// Drop it. `55 55 AA ...` loses the frame, as deployed modules do.
    #[default]
    Legacy,
    /// Re-check it as the first header byte, so `55 55 AA ...` still syncs.
    Rescan,
}

/// Extractor configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ExtractorConfig {
    /// Handling of a broken header marker
    pub header_recovery: HeaderRecovery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum ExtractState {
    /// Waiting for 0x55
    HeaderHigh,
    /// Got 0x55, waiting for 0xAA
    HeaderLow,
    Version,
    Command,
    LengthHigh,
    LengthLow,
    /// Reading payload bytes
    Data,
    /// Waiting for CHECKSUM
    Checksum,
}

/// State machine for extracting frames from a byte stream
///
/// `N` is the buffer capacity and bounds the largest accepted frame. Keep one
/// instance per stream.
#[derive(Debug, Clone)]
pub struct FrameExtractor<const N: usize = MAX_FRAME_SIZE> {
    config: ExtractorConfig,
    state: ExtractState,
    buffer: Vec<u8, N>,
    declared_len: usize,
    consumed: usize,
}

impl<const N: usize> Default for FrameExtractor<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> FrameExtractor<N> {
    /// Largest payload length this extractor accepts
    pub const MAX_DATA_LEN: usize = N.saturating_sub(FRAME_OVERHEAD);

    /// Create an extractor with the default configuration
    pub fn new() -> Self {
        Self::with_config(ExtractorConfig::default())
    }

    pub fn with_config(config: ExtractorConfig) -> Self {
        Self {
            config,
            state: ExtractState::HeaderHigh,
            buffer: Vec::new(),
            declared_len: 0,
            consumed: 0,
        }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Reset the extractor state, discarding any partial frame
    pub fn reset(&mut self) {
        self.state = ExtractState::HeaderHigh;
        self.buffer.clear();
        self.declared_len = 0;
        self.consumed = 0;
    }

    /// Returns true if no partial frame is buffered
    pub fn is_idle(&self) -> bool {
        self.state == ExtractState::HeaderHigh
    }

    /// Bytes accumulated so far
    ///
    /// Right after [`push`](Self::push) returns true this is one complete
    /// encoded frame. It is overwritten by the next call to `push`.
    pub fn frame_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Feed a single byte
    ///
    /// Returns true exactly when this byte completes a frame.
    pub fn push(&mut self, byte: u8) -> bool {
        match self.state {
            ExtractState::HeaderHigh => {
                self.buffer.clear();
                if byte == FRAME_HEADER[0] && self.store(byte) {
                    self.state = ExtractState::HeaderLow;
                }
                false
            }
            ExtractState::HeaderLow => {
                if byte == FRAME_HEADER[1] {
                    if self.store(byte) {
                        self.state = ExtractState::Version;
                    }
                    return false;
                }

                #[cfg(feature = "defmt")]
                defmt::trace!("broken header marker: {=u8:#x}", byte);

                self.reset();
                if self.config.header_recovery == HeaderRecovery::Rescan {
                    return self.push(byte);
                }
                false
            }
            ExtractState::Version => {
                if self.store(byte) {
                    self.state = ExtractState::Command;
                }
                false
            }
            ExtractState::Command => {
                if self.store(byte) {
                    self.state = ExtractState::LengthHigh;
                }
                false
            }
            ExtractState::LengthHigh => {
                if self.store(byte) {
                    self.state = ExtractState::LengthLow;
                }
                false
            }
            ExtractState::LengthLow => {
                if !self.store(byte) {
                    return false;
                }
                self.declared_len = usize::from(read_u16(&self.buffer[4..6]));

                if self.declared_len > Self::MAX_DATA_LEN {
                    #[cfg(feature = "defmt")]
                    defmt::debug!(
                        "dropping frame: declared length {} exceeds {}",
                        self.declared_len,
                        Self::MAX_DATA_LEN
                    );
                    self.reset();
                } else if self.declared_len == 0 {
                    self.state = ExtractState::Checksum;
                } else {
                    self.consumed = 0;
                    self.state = ExtractState::Data;
                }
                false
            }
            ExtractState::Data => {
                if !self.store(byte) {
                    return false;
                }
                self.consumed += 1;
                if self.consumed == self.declared_len {
                    self.state = ExtractState::Checksum;
                }
                false
            }
            ExtractState::Checksum => {
                if !self.store(byte) {
                    return false;
                }
                self.state = ExtractState::HeaderHigh;
                self.declared_len = 0;
                self.consumed = 0;
                true
            }
        }
    }

    /// Buffer a byte. Only fails when `N` is smaller than a minimal frame, in
    /// which case the partial frame is dropped.
    fn store(&mut self, byte: u8) -> bool {
        if self.buffer.push(byte).is_err() {
            self.reset();
            return false;
        }
        true
    }

    /// Feed a single byte, decoding the frame it completes
    ///
    /// Returns `None` while more bytes are needed.
    pub fn feed(&mut self, byte: u8) -> Option<Result<DataFrame, FrameError>> {
        if self.push(byte) {
            Some(DataFrame::decode(self.frame_bytes()))
        } else {
            None
        }
    }

    /// Feed multiple bytes
    ///
    /// Returns the first complete frame found, if any.
    /// Remaining bytes after a complete frame are not consumed.
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> Option<Result<DataFrame, FrameError>> {
        bytes.iter().find_map(|&byte| self.feed(byte))
    }

    /// Iterate over every frame completed by `bytes`
    pub fn frames<'a>(&'a mut self, bytes: &'a [u8]) -> Frames<'a, N> {
        Frames {
            extractor: self,
            bytes: bytes.iter(),
        }
    }
}

/// Iterator returned by [`FrameExtractor::frames`]
pub struct Frames<'a, const N: usize> {
    extractor: &'a mut FrameExtractor<N>,
    bytes: core::slice::Iter<'a, u8>,
}

impl<const N: usize> Iterator for Frames<'_, N> {
    type Item = Result<DataFrame, FrameError>;

    fn next(&mut self) -> Option<Self::Item> {
        let extractor = &mut *self.extractor;
        self.bytes.by_ref().find_map(|&byte| extractor.feed(byte))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CMD_HEARTBEAT, CMD_QUERY_DATA};
    use crate::frame::Payload;
    use crate::unit::DataUnit;

    const CHAR_FRAME: [u8; 12] = [
        0x55, 0xAA, 0x03, 0x07, 0x00, 0x05, 0x69, 0x04, 0x00, 0x01, 0x00, 0x7C,
    ];

    fn push_all<const N: usize>(extractor: &mut FrameExtractor<N>, bytes: &[u8]) -> usize {
        bytes.iter().filter(|&&b| extractor.push(b)).count()
    }

    #[test]
    fn test_extract_single_frame() {
        let mut extractor = FrameExtractor::<MAX_FRAME_SIZE>::new();
        for &byte in &CHAR_FRAME[..CHAR_FRAME.len() - 1] {
            assert!(!extractor.push(byte));
        }
        assert!(extractor.push(CHAR_FRAME[CHAR_FRAME.len() - 1]));
        assert_eq!(extractor.frame_bytes(), &CHAR_FRAME);
        assert!(extractor.is_idle());
    }

    #[test]
    fn test_resync_after_garbage() {
        // 55 AA 03 06 00 00 sums to 0x08
        let data = [0x01, 0x02, 0x55, 0xAA, 0x03, 0x06, 0x00, 0x00, 0x08];
        let mut extractor = FrameExtractor::<MAX_FRAME_SIZE>::new();

        assert_eq!(push_all(&mut extractor, &data), 1);
        assert_eq!(extractor.frame_bytes(), &data[2..]);
    }

    #[test]
    fn test_zero_length_skips_data() {
        let frame = DataFrame::empty(0x00, CMD_HEARTBEAT).encode_to_vec().unwrap();
        let mut extractor = FrameExtractor::<MAX_FRAME_SIZE>::new();

        let parsed = extractor.feed_bytes(&frame).unwrap().unwrap();
        assert_eq!(parsed.payload, Payload::Empty);
        assert!(parsed.is_valid());
    }

    #[test]
    fn test_oversize_length_resets() {
        let mut extractor = FrameExtractor::<16>::new();
        // Declares 10 payload bytes, capacity allows 9
        let data = [0x55, 0xAA, 0x00, 0x01, 0x00, 0x0A];
        assert_eq!(push_all(&mut extractor, &data), 0);
        assert!(extractor.is_idle());
        assert!(extractor.frame_bytes().is_empty());

        // Next good frame still comes through
        let frame = DataFrame::with_raw(0x00, 0x01, &[1, 2, 3]).unwrap();
        let parsed = extractor
            .feed_bytes(&frame.encode_to_vec().unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(parsed, frame);
    }

    #[test]
    fn test_capacity_boundary() {
        let mut extractor = FrameExtractor::<16>::new();
        let payload = [0xEEu8; 9];
        let frame = DataFrame::with_raw(0x00, 0x01, &payload).unwrap();
        let encoded = frame.encode_to_vec().unwrap();
        assert_eq!(encoded.len(), 16);
        assert_eq!(push_all(&mut extractor, &encoded), 1);
    }

    #[test]
    fn test_broken_header_legacy_loses_frame() {
        let mut data = Vec::<u8, 16>::new();
        data.push(0x55).unwrap();
        data.extend_from_slice(&CHAR_FRAME).unwrap();

        let mut extractor = FrameExtractor::<MAX_FRAME_SIZE>::new();
        assert_eq!(push_all(&mut extractor, &data), 0);
    }

    #[test]
    fn test_broken_header_rescan_recovers_frame() {
        let mut data = Vec::<u8, 16>::new();
        data.push(0x55).unwrap();
        data.extend_from_slice(&CHAR_FRAME).unwrap();

        let config = ExtractorConfig {
            header_recovery: HeaderRecovery::Rescan,
        };
        let mut extractor = FrameExtractor::<MAX_FRAME_SIZE>::with_config(config);
        assert_eq!(push_all(&mut extractor, &data), 1);
        assert_eq!(extractor.frame_bytes(), &CHAR_FRAME);
    }

    #[test]
    fn test_buffer_survives_until_next_push() {
        let mut extractor = FrameExtractor::<MAX_FRAME_SIZE>::new();
        push_all(&mut extractor, &CHAR_FRAME);
        assert_eq!(extractor.frame_bytes().len(), CHAR_FRAME.len());

        extractor.push(0x00);
        assert!(extractor.frame_bytes().is_empty());
    }

    #[test]
    fn test_feed_bytes_stops_after_first_frame() {
        let first = DataFrame::with_unit(0x03, CMD_QUERY_DATA, DataUnit::int(0x6D, 59));
        let second = DataFrame::with_unit(0x03, CMD_QUERY_DATA, DataUnit::boolean(0x01, true));

        let mut data = Vec::<u8, 64>::new();
        data.extend_from_slice(&first.encode_to_vec().unwrap()).unwrap();
        data.extend_from_slice(&second.encode_to_vec().unwrap()).unwrap();

        let mut extractor = FrameExtractor::<MAX_FRAME_SIZE>::new();
        let parsed = extractor.feed_bytes(&data).unwrap().unwrap();
        assert_eq!(parsed, first);

        let rest = &data[first.encoded_len()..];
        assert_eq!(extractor.feed_bytes(rest).unwrap().unwrap(), second);
    }

    #[test]
    fn test_frames_iterator() {
        let first = DataFrame::empty(0x00, CMD_HEARTBEAT);
        let second = DataFrame::with_unit(0x03, CMD_QUERY_DATA, DataUnit::char(0x69, 0x00));

        let mut data = Vec::<u8, 64>::new();
        data.extend_from_slice(&[0xFF, 0x00]).unwrap();
        data.extend_from_slice(&first.encode_to_vec().unwrap()).unwrap();
        data.extend_from_slice(&[0x13]).unwrap();
        data.extend_from_slice(&second.encode_to_vec().unwrap()).unwrap();

        let mut extractor = FrameExtractor::<MAX_FRAME_SIZE>::new();
        let mut frames = extractor.frames(&data);
        assert_eq!(frames.next(), Some(Ok(first)));
        assert_eq!(frames.next(), Some(Ok(second)));
        assert_eq!(frames.next(), None);
    }

    #[test]
    fn test_decode_error_surfaces_through_feed() {
        // Unit command with a 2 byte payload: framed fine, decodes badly
        let mut data = [0x55, 0xAA, 0x03, 0x07, 0x00, 0x02, 0x01, 0x02, 0x00];
        data[8] = crate::checksum::sum(&data[..8]);

        let mut extractor = FrameExtractor::<MAX_FRAME_SIZE>::new();
        assert_eq!(
            extractor.feed_bytes(&data),
            Some(Err(FrameError::MalformedLength))
        );
        assert!(extractor.is_idle());
    }

    #[test]
    fn test_independent_instances() {
        let mut a = FrameExtractor::<MAX_FRAME_SIZE>::new();
        let mut b = FrameExtractor::<MAX_FRAME_SIZE>::new();

        let mut completed = 0;
        for &byte in &CHAR_FRAME {
            completed += usize::from(a.push(byte));
            completed += usize::from(b.push(0x00));
        }
        assert_eq!(completed, 1);
        assert_eq!(a.frame_bytes(), &CHAR_FRAME);
        assert!(b.frame_bytes().is_empty());
    }

    #[test]
    fn test_reset_discards_partial_frame() {
        let mut extractor = FrameExtractor::<MAX_FRAME_SIZE>::new();
        push_all(&mut extractor, &CHAR_FRAME[..7]);
        assert!(!extractor.is_idle());

        extractor.reset();
        assert!(extractor.is_idle());
        assert_eq!(push_all(&mut extractor, &CHAR_FRAME), 1);
    }
}
