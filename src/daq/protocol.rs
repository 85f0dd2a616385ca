//! Wire-level command layer for the USB-1608G scan engines.
//!
//! Commands go out as vendor control transfers; waveform data and
//! acquired samples move over the bulk endpoints. All multi-byte fields
//! are little-endian, matching the device firmware.

use byteorder::{ByteOrder, LittleEndian};

use crate::types::{AnalogRange, ChannelSpec, InputMode, OutputChannel};

// Vendor request codes.
pub const AIN_SCAN_START: u8 = 0x12;
pub const AIN_SCAN_STOP: u8 = 0x13;
pub const AIN_CONFIG: u8 = 0x14;
pub const AIN_CLR_FIFO: u8 = 0x15;
pub const AOUT_SCAN_START: u8 = 0x1a;
pub const AOUT_SCAN_STOP: u8 = 0x1b;
pub const AOUT_CLR_FIFO: u8 = 0x1c;
pub const STATUS: u8 = 0x40;
pub const BLINK_LED: u8 = 0x41;
pub const SERIAL: u8 = 0x48;

/// Bulk endpoint feeding the analog output FIFO.
pub const EP_AOUT: u8 = 0x02;
/// Bulk endpoint streaming analog input conversions.
pub const EP_AIN: u8 = 0x86;

/// Pacer base clock shared by both scan engines.
pub const BASE_CLOCK_HZ: f64 = 64_000_000.0;

/// Status word of a healthy device in normal operating mode.
pub const STATUS_NORMAL: u16 = 0x160;

// Status bits.
pub const AIN_SCAN_RUNNING: u16 = 1 << 1;
pub const AIN_SCAN_OVERRUN: u16 = 1 << 2;
pub const AOUT_SCAN_RUNNING: u16 = 1 << 3;
pub const AOUT_SCAN_UNDERRUN: u16 = 1 << 4;

// Scan-list entry layout: channel number in the low nibble, range code
// above it, wiring and terminal flags on top.
const CHANNEL_MASK: u8 = 0x0f;
const RANGE_SHIFT: u8 = 4;
const DIFF_MODE: u8 = 0x40;
pub const LAST_CHANNEL: u8 = 0x80;

// Output scan options.
const AO_CHAN0: u8 = 0x01;
const AO_CHAN1: u8 = 0x02;

/// Byte length of the serial number record.
pub const SERIAL_LEN: usize = 8;

fn range_code(range: AnalogRange) -> u8 {
    match range {
        AnalogRange::Bipolar10V => 0,
        AnalogRange::Bipolar5V => 1,
        AnalogRange::Bipolar2V => 2,
        AnalogRange::Bipolar1V => 3,
    }
}

/// Encode a validated channel list into scan-list entry bytes.
///
/// The device cycles the list once per pacer tick; the final entry must
/// carry the terminal flag so the firmware knows where the cycle ends.
pub fn encode_scan_list(channels: &[ChannelSpec]) -> Vec<u8> {
    let last = channels.len().saturating_sub(1);
    channels
        .iter()
        .enumerate()
        .map(|(i, spec)| {
            let mut entry = (spec.channel & CHANNEL_MASK) | (range_code(spec.range) << RANGE_SHIFT);
            if spec.mode == InputMode::Differential {
                entry |= DIFF_MODE;
            }
            if i == last {
                entry |= LAST_CHANNEL;
            }
            entry
        })
        .collect()
}

/// Divider turning the base clock into the requested pacer frequency.
pub fn pacer_period(frequency: f64) -> u32 {
    ((BASE_CLOCK_HZ / frequency).round() as u32).saturating_sub(1)
}

/// Option byte selecting the output channel for an AOut scan.
pub fn output_scan_options(channel: OutputChannel) -> u8 {
    match channel {
        OutputChannel::Channel0 => AO_CHAN0,
        OutputChannel::Channel1 => AO_CHAN1,
    }
}

fn scan_start_payload(total_samples: u32, retrig_count: u32, frequency: f64, options: u8) -> [u8; 13] {
    let mut buf = [0u8; 13];
    LittleEndian::write_u32(&mut buf[0..4], total_samples);
    LittleEndian::write_u32(&mut buf[4..8], retrig_count);
    LittleEndian::write_u32(&mut buf[8..12], pacer_period(frequency));
    buf[12] = options;
    buf
}

/// Payload for `AIN_SCAN_START`: total conversion count, retrigger count,
/// pacer divider, option flags.
pub fn ain_scan_start_payload(total_samples: u32, frequency: f64) -> [u8; 13] {
    scan_start_payload(total_samples, 0, frequency, 0)
}

/// Payload for `AOUT_SCAN_START`. `total_samples` is the exact FIFO
/// content length; zero would put the engine into continuous mode.
pub fn aout_scan_start_payload(
    total_samples: u32,
    frequency: f64,
    channel: OutputChannel,
) -> [u8; 13] {
    scan_start_payload(total_samples, 0, frequency, output_scan_options(channel))
}

/// Pack output codes into the little-endian byte stream the FIFO expects.
pub fn pack_samples(samples: &[u16]) -> Vec<u8> {
    let mut bytes = vec![0u8; 2 * samples.len()];
    LittleEndian::write_u16_into(samples, &mut bytes);
    bytes
}

/// Unpack an input bulk read back into codes. Callers verify the byte
/// count first; a trailing odd byte would be firmware corruption and is
/// dropped here.
pub fn unpack_samples(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks_exact(2)
        .map(LittleEndian::read_u16)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AnalogRange;

    #[test]
    fn test_scan_list_terminal_flag() {
        let channels = vec![
            ChannelSpec::new(0),
            ChannelSpec::new(3).with_range(AnalogRange::Bipolar1V),
        ];
        let encoded = encode_scan_list(&channels);
        assert_eq!(encoded.len(), 2);
        assert_eq!(encoded[0], 0x00);
        assert_eq!(encoded[1], LAST_CHANNEL | (3 << RANGE_SHIFT) | 0x03);
    }

    #[test]
    fn test_scan_list_single_entry_is_terminal() {
        let encoded = encode_scan_list(&[ChannelSpec::new(7)]);
        assert_eq!(encoded, vec![LAST_CHANNEL | 0x07]);
    }

    #[test]
    fn test_scan_list_differential_flag() {
        let encoded =
            encode_scan_list(&[ChannelSpec::new(2).with_mode(InputMode::Differential)]);
        assert_eq!(encoded, vec![LAST_CHANNEL | DIFF_MODE | 0x02]);
    }

    #[test]
    fn test_pacer_period() {
        assert_eq!(pacer_period(1000.0), 63_999);
        assert_eq!(pacer_period(BASE_CLOCK_HZ), 0);
        // Faster than the base clock clamps instead of wrapping.
        assert_eq!(pacer_period(2.0 * BASE_CLOCK_HZ), 0);
    }

    #[test]
    fn test_scan_start_payload_layout() {
        let payload = aout_scan_start_payload(1024, 1000.0, OutputChannel::Channel0);
        assert_eq!(&payload[0..4], &1024u32.to_le_bytes());
        assert_eq!(&payload[4..8], &0u32.to_le_bytes());
        assert_eq!(&payload[8..12], &63_999u32.to_le_bytes());
        assert_eq!(payload[12], AO_CHAN0);
    }

    #[test]
    fn test_sample_packing_round_trip() {
        let samples = [0u16, 1, 0x1234, u16::MAX];
        let bytes = pack_samples(&samples);
        assert_eq!(bytes.len(), 8);
        assert_eq!(bytes[4], 0x34);
        assert_eq!(bytes[5], 0x12);
        assert_eq!(unpack_samples(&bytes), samples);
    }
}
