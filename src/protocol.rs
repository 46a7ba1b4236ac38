//! Pro Controller USB wire protocol: report ids, frame building, and
//! reply matching.
//!
//! Outbound frame shapes:
//!   Command:    [0x80, command_id]
//!   Subcommand: [0x01, counter, rumble_low(4), rumble_high(4), id, params...]
//!   Rumble:     [0x10, counter, rumble_low(4), rumble_high(4)]
//!
//! Inbound frames are tagged by their first byte. A command ack (0x81)
//! echoes the command id at byte 1; a subcommand reply (0x21) echoes the
//! subcommand id at byte 14, with subcommand-specific data following the
//! echoed SPI address/length at byte 20.

pub const VENDOR_ID: u16 = 0x057E;
pub const PRODUCT_ID: u16 = 0x2009;

/// Size of every inbound HID packet.
pub const PACKET_SIZE: usize = 64;

/// Flash region holding the factory stick calibration.
pub const CALIBRATION_OFFSET: u32 = 0x603D;
pub const CALIBRATION_LENGTH: u8 = 0x12;

/// Attempts before a command or subcommand send is given up on.
pub const COMMAND_RETRIES: usize = 10;

/// Byte of a subcommand reply carrying the echoed subcommand id.
pub const SUBCOMMAND_ECHO: usize = 14;

/// First byte of the data section of an SPI flash read reply.
pub const SPI_REPLY_DATA: usize = 20;

/// HD rumble waveform for a silent band.
pub const RUMBLE_NEUTRAL: [u8; 4] = [0x00, 0x01, 0x40, 0x40];

/// HD rumble waveform for an active band.
pub const RUMBLE_ACTIVE: [u8; 4] = [0x74, 0xBE, 0xBD, 0x6F];

/// Default IMU sensitivity parameters (gyro 2000dps, accel 8G,
/// 208Hz gyro rate, 100Hz accel anti-aliasing).
pub const DEFAULT_IMU_SENSITIVITY: [u8; 4] = [0x03, 0x00, 0x00, 0x01];

/// Outbound report ids. The protocol is closed; these are the only
/// shapes the firmware accepts from a USB host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputReportId {
    RumbleSubcommand = 0x01,
    Rumble = 0x10,
    Command = 0x80,
}

/// Inbound report ids the driver cares about. Anything else arriving on
/// the interrupt endpoint is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum InputReportId {
    SubcommandReply = 0x21,
    ControllerState = 0x30,
    CommandAck = 0x81,
}

/// One-byte bootstrap commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandId {
    Handshake = 0x02,
    HighSpeed = 0x03,
    ForceUsb = 0x04,
}

/// Acknowledged vendor subcommands carried inside a 0x01 report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SubcommandId {
    SetInputReportMode = 0x03,
    SpiFlashRead = 0x10,
    SetPlayerLights = 0x30,
    SetHomeLight = 0x38,
    EnableImu = 0x40,
    SetImuSensitivity = 0x41,
    EnableVibration = 0x48,
}

/// Build a bootstrap command frame.
pub fn command_frame(id: CommandId) -> [u8; 2] {
    [OutputReportId::Command as u8, id as u8]
}

/// Build a subcommand frame. Every subcommand frame carries the current
/// rumble waveforms in its header; the protocol has no rumble-free shape.
pub fn subcommand_frame(
    counter: u8,
    rumble_low: [u8; 4],
    rumble_high: [u8; 4],
    id: SubcommandId,
    params: &[u8],
) -> Vec<u8> {
    let mut frame = Vec::with_capacity(11 + params.len());
    frame.push(OutputReportId::RumbleSubcommand as u8);
    frame.push(counter);
    frame.extend_from_slice(&rumble_low);
    frame.extend_from_slice(&rumble_high);
    frame.push(id as u8);
    frame.extend_from_slice(params);
    frame
}

/// Build a rumble-only frame. Fire-and-forget; no reply is expected.
pub fn rumble_frame(counter: u8, rumble_low: [u8; 4], rumble_high: [u8; 4]) -> [u8; 10] {
    let mut frame = [0u8; 10];
    frame[0] = OutputReportId::Rumble as u8;
    frame[1] = counter;
    frame[2..6].copy_from_slice(&rumble_low);
    frame[6..10].copy_from_slice(&rumble_high);
    frame
}

/// True when `reply` acknowledges the bootstrap command `id`.
pub fn is_command_ack(reply: &[u8], id: CommandId) -> bool {
    reply.len() >= 2 && reply[0] == InputReportId::CommandAck as u8 && reply[1] == id as u8
}

/// True when `reply` is the subcommand reply echoing `id`.
pub fn is_subcommand_reply(reply: &[u8], id: SubcommandId) -> bool {
    reply.len() > SUBCOMMAND_ECHO
        && reply[0] == InputReportId::SubcommandReply as u8
        && reply[SUBCOMMAND_ECHO] == id as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_frame_layout() {
        assert_eq!(command_frame(CommandId::Handshake), [0x80, 0x02]);
        assert_eq!(command_frame(CommandId::HighSpeed), [0x80, 0x03]);
        assert_eq!(command_frame(CommandId::ForceUsb), [0x80, 0x04]);
    }

    #[test]
    fn test_subcommand_frame_layout() {
        let frame = subcommand_frame(
            0x5A,
            RUMBLE_NEUTRAL,
            RUMBLE_ACTIVE,
            SubcommandId::SetPlayerLights,
            &[0x09],
        );
        assert_eq!(frame[0], 0x01);
        assert_eq!(frame[1], 0x5A);
        assert_eq!(&frame[2..6], &RUMBLE_NEUTRAL);
        assert_eq!(&frame[6..10], &RUMBLE_ACTIVE);
        assert_eq!(frame[10], 0x30);
        assert_eq!(frame[11], 0x09);
        assert_eq!(frame.len(), 12);
    }

    #[test]
    fn test_rumble_frame_layout() {
        let frame = rumble_frame(0x01, RUMBLE_ACTIVE, RUMBLE_NEUTRAL);
        assert_eq!(frame[0], 0x10);
        assert_eq!(frame[1], 0x01);
        assert_eq!(&frame[2..6], &RUMBLE_ACTIVE);
        assert_eq!(&frame[6..10], &RUMBLE_NEUTRAL);
    }

    #[test]
    fn test_command_ack_match() {
        let mut reply = [0u8; 64];
        reply[0] = 0x81;
        reply[1] = 0x02;
        assert!(is_command_ack(&reply, CommandId::Handshake));
        assert!(!is_command_ack(&reply, CommandId::HighSpeed));

        // Controller state report must never match
        reply[0] = 0x30;
        assert!(!is_command_ack(&reply, CommandId::Handshake));
    }

    #[test]
    fn test_subcommand_reply_match() {
        let mut reply = [0u8; 64];
        reply[0] = 0x21;
        reply[SUBCOMMAND_ECHO] = 0x10;
        assert!(is_subcommand_reply(&reply, SubcommandId::SpiFlashRead));
        assert!(!is_subcommand_reply(&reply, SubcommandId::EnableImu));

        reply[0] = 0x81;
        assert!(!is_subcommand_reply(&reply, SubcommandId::SpiFlashRead));
    }

    #[test]
    fn test_short_reply_never_matches() {
        assert!(!is_command_ack(&[0x81], CommandId::Handshake));
        assert!(!is_subcommand_reply(&[0x21, 0x00], SubcommandId::SpiFlashRead));
    }
}
