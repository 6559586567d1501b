//! Protocol constants for Makita LXT battery communication.
//!
//! This module defines the command bytes, framing prefixes, timing
//! parameters and serial adapter defaults used on the single-wire bus.

/// Broadcast read-ROM prefix (the pack answers with its 8-byte ROM id)
pub const READ_ROM_PREFIX: u8 = 0x33;

/// Skip-ROM prefix addressing the only device on the line
pub const SKIP_ROM_PREFIX: u8 = 0xCC;

/// Sub-command sent after skip-ROM to switch the pack's operating mode
pub const MODE_SWITCH_CMD: u8 = 0x99;

/// Read message block (ROM id, manufacture date, counters, lock status)
pub const READ_MSG_CMD: [u8; 2] = [0xAA, 0x00];

/// Response length of the message block, excluding the ROM id
pub const READ_MSG_RESPONSE_LEN: usize = 40;

/// Read model string
pub const MODEL_CMD: [u8; 2] = [0xDC, 0x0C];

/// Response length of the model command
pub const MODEL_RESPONSE_LEN: usize = 16;

/// Read voltages and temperatures
pub const READ_DATA_CMD: [u8; 4] = [0xD7, 0x00, 0x00, 0xFF];

/// Response length of the data command
pub const READ_DATA_RESPONSE_LEN: usize = 29;

/// Enter test mode
pub const TESTMODE_CMD: [u8; 3] = [0xD9, 0x96, 0xA5];

/// Turn the fuel gauge LEDs on (test mode only)
pub const LEDS_ON_CMD: [u8; 2] = [0xDA, 0x31];

/// Turn the fuel gauge LEDs off (test mode only)
pub const LEDS_OFF_CMD: [u8; 2] = [0xDA, 0x34];

/// Reset the fault latch (test mode only)
pub const RESET_ERROR_CMD: [u8; 2] = [0xDA, 0x04];

/// Acknowledge length of test mode and maintenance commands
pub const MAINTENANCE_RESPONSE_LEN: usize = 9;

/// Length of the ROM identifier
pub const ROM_ID_LEN: usize = 8;

/// Number of meaningful characters in the model field
pub const MODEL_NAME_LEN: usize = 7;

/// Capacity of the last-error slot, including the terminating NUL
pub const LAST_ERROR_CAPACITY: usize = 64;

/// Settling time after asserting the enable line
pub const ENABLE_SETTLE_MS: u32 = 400;

/// Recovery time after a reset/presence cycle
pub const RESET_RECOVERY_US: u32 = 400;

/// Pacing gap before every byte on the bus
pub const BYTE_GAP_US: u32 = 90;

/// Hold time while the pack changes operating mode
pub const MODE_SWITCH_SETTLE_MS: u32 = 400;

/// Settling time between clearing faults and re-reading the lock flag
pub const CLEAR_SETTLE_MS: u32 = 1000;

/// Default interval between presence polls
pub const POLL_INTERVAL_MS: u64 = 2000;

/// Baud rate of the reset/presence slot on a UART bus adapter
pub const RESET_BAUD_RATE: u32 = 9600;

/// Baud rate of the bit slots on a UART bus adapter
pub const DATA_BAUD_RATE: u32 = 115_200;

/// UART byte that produces a reset pulse at the reset baud rate
pub const RESET_PULSE: u8 = 0xF0;

/// UART byte for a write-1 or read slot at the data baud rate
pub const SLOT_HIGH: u8 = 0xFF;

/// UART byte for a write-0 slot at the data baud rate
pub const SLOT_LOW: u8 = 0x00;

/// Read timeout for adapter echoes in milliseconds
pub const TIMEOUT_MS: u64 = 100;
