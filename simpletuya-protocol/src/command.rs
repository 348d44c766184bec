//! Command codes
//!
//! Only the split between "carries a data unit" and "carries raw bytes"
//! matters to the codec. The named codes are listed for callers building
//! frames.

// Module -> MCU
pub const CMD_HEARTBEAT: u8 = 0x00;
pub const CMD_PRODUCT_INFO: u8 = 0x01;
pub const CMD_WORKING_MODE: u8 = 0x02;
pub const CMD_NETWORK_STATUS: u8 = 0x03;
pub const CMD_SEND_DATA: u8 = 0x06;

// MCU -> Module
pub const CMD_RESET_MODULE: u8 = 0x04;
pub const CMD_QUERY_DATA: u8 = 0x07;

// Status reports
pub const CMD_STATUS_SYNC: u8 = 0x22;
pub const CMD_STATUS_RECORD: u8 = 0x26;

/// Commands whose payload is a single [`DataUnit`](crate::DataUnit)
pub const DATA_UNIT_COMMANDS: [u8; 4] = [
    CMD_SEND_DATA,
    CMD_QUERY_DATA,
    CMD_STATUS_SYNC,
    CMD_STATUS_RECORD,
];

/// Returns true if frames with this command carry a data unit payload
pub fn carries_data_unit(command: u8) -> bool {
    DATA_UNIT_COMMANDS.contains(&command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_unit_commands() {
        assert!(carries_data_unit(CMD_SEND_DATA));
        assert!(carries_data_unit(CMD_QUERY_DATA));
        assert!(carries_data_unit(0x22));
        assert!(carries_data_unit(0x26));
    }

    #[test]
    fn test_raw_commands() {
        assert!(!carries_data_unit(CMD_HEARTBEAT));
        assert!(!carries_data_unit(CMD_PRODUCT_INFO));
        assert!(!carries_data_unit(CMD_RESET_MODULE));
        assert!(!carries_data_unit(0xFF));
    }
}
