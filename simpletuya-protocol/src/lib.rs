//! SimpleTuya serial protocol codec
//!
//! This crate encodes and decodes the UART frames exchanged between an MCU and
//! a Tuya-style Wi-Fi module, and extracts those frames from a raw byte
//! stream one byte at a time. It performs no I/O.
//!
//! # Protocol Overview
//!
//! ```text
//! ┌─────────┬─────────┬─────────┬────────┬──────────────┬──────────┐
//! │ HEADER  │ VERSION │ COMMAND │ LENGTH │ PAYLOAD      │ CHECKSUM │
//! │ 55 AA   │ 1B      │ 1B      │ 2B BE  │ 0–505B       │ 1B       │
//! └─────────┴─────────┴─────────┴────────┴──────────────┴──────────┘
//! ```
//!
//! Data-unit commands carry a single typed value in the payload:
//!
//! ```text
//! ┌──────┬──────┬────────┬──────────────┐
//! │ DPID │ TYPE │ LENGTH │ VALUE        │
//! │ 1B   │ 1B   │ 2B BE  │ LENGTH bytes │
//! └──────┴──────┴────────┴──────────────┘
//! ```
//!
//! The checksum is the sum of every preceding byte modulo 256.
//!
//! # Example
//!
//! ```
//! use simpletuya_protocol::{DataFrame, FrameExtractor};
//!
//! let wire = [0x00, 0x55, 0xAA, 0x03, 0x07, 0x00, 0x05, 0x69, 0x04, 0x00, 0x01, 0x00, 0x7C];
//!
//! let mut extractor: FrameExtractor = FrameExtractor::new();
//! let frame: DataFrame = extractor.feed_bytes(&wire).unwrap().unwrap();
//! assert!(frame.is_valid());
//! assert_eq!(frame.unit().unwrap().dpid, 0x69);
//! ```

#![no_std]
#![deny(unsafe_code)]

#[cfg(feature = "alloc")]
extern crate alloc;

pub mod bytes;
pub mod checksum;
pub mod command;
pub mod frame;
pub mod hex;
pub mod parser;
pub mod unit;

pub use frame::{
    DataFrame, FrameError, Payload, FRAME_HEADER, FRAME_OVERHEAD, MAX_DATA_LEN, MAX_FRAME_SIZE,
};
#[cfg(feature = "alloc")]
pub use hex::frame_to_hex_string;
pub use hex::{HexBytes, HexDump};
pub use parser::{ExtractorConfig, FrameExtractor, HeaderRecovery};
pub use unit::{DataType, DataUnit, DataValue, MAX_VALUE_LEN};
