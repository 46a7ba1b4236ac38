//! Controller-state report decoding.
//!
//! CONTROLLER_STATE (0x30) packet layout, 64 bytes:
//!   [0]      = Report ID (0x30)
//!   [1]      = Timer
//!   [2]      = Battery nibble (high) + connection info (low)
//!   [3..6]   = Button bitfields (3 bytes)
//!   [6..9]   = Left stick (12-bit packed X/Y)
//!   [9..12]  = Right stick (12-bit packed X/Y)
//!   [12]     = Vibrator input report
//!   [13..19] = Accelerometer X/Y/Z (i16 LE each)
//!   [19..25] = Gyroscope X/Y/Z (i16 LE each)

use crate::calibration::{Axis, Stick, StickCalibrator};

/// Buttons of the Pro Controller, named as on the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    A,
    B,
    X,
    Y,
    Up,
    Down,
    Left,
    Right,
    Minus,
    Plus,
    Screenshot,
    Home,
    L,
    Zl,
    R,
    Zr,
    LStick,
    RStick,
}

impl Button {
    pub const ALL: [Button; 18] = [
        Button::A,
        Button::B,
        Button::X,
        Button::Y,
        Button::Up,
        Button::Down,
        Button::Left,
        Button::Right,
        Button::Minus,
        Button::Plus,
        Button::Screenshot,
        Button::Home,
        Button::L,
        Button::Zl,
        Button::R,
        Button::Zr,
        Button::LStick,
        Button::RStick,
    ];

    /// (index into the 3 button bytes, bitmask) in the wire layout.
    pub fn position(self) -> (usize, u8) {
        match self {
            Button::Y => (0, 0x01),
            Button::X => (0, 0x02),
            Button::B => (0, 0x04),
            Button::A => (0, 0x08),
            Button::R => (0, 0x40),
            Button::Zr => (0, 0x80),
            Button::Minus => (1, 0x01),
            Button::Plus => (1, 0x02),
            Button::RStick => (1, 0x04),
            Button::LStick => (1, 0x08),
            Button::Home => (1, 0x10),
            Button::Screenshot => (1, 0x20),
            Button::Down => (2, 0x01),
            Button::Up => (2, 0x02),
            Button::Right => (2, 0x04),
            Button::Left => (2, 0x08),
            Button::L => (2, 0x40),
            Button::Zl => (2, 0x80),
        }
    }
}

/// All button states, kept as the report's raw 3 bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ButtonState {
    bytes: [u8; 3],
}

impl ButtonState {
    pub fn from_bytes(bytes: [u8; 3]) -> Self {
        Self { bytes }
    }

    pub fn get(&self, btn: Button) -> bool {
        let (byte_idx, mask) = btn.position();
        self.bytes[byte_idx] & mask != 0
    }
}

/// One decoded controller-state packet. Constructed fresh per read and
/// handed to the session callback; nothing is retained.
#[derive(Debug, Clone)]
pub struct ControllerReport {
    pub buttons: ButtonState,
    /// Raw 12-bit stick samples, before calibration.
    pub left_stick_raw: (u16, u16),
    pub right_stick_raw: (u16, u16),
    /// Normalized stick values in [-0x7FFF, 0x7FFF].
    pub left_stick: (i16, i16),
    pub right_stick: (i16, i16),
    pub accel: (i16, i16, i16),
    pub gyro: (i16, i16, i16),
    /// 0-9; odd values mean "charging" in the firmware's convention.
    pub battery: u8,
}

/// Unpack two 12-bit values from 3 bytes: [lo8_x] [hi4_x | lo4_y] [hi8_y].
fn unpack_stick(data: &[u8]) -> (u16, u16) {
    let x = data[0] as u16 | ((data[1] as u16 & 0xF) << 8);
    let y = (data[1] as u16 >> 4) | ((data[2] as u16) << 4);
    (x, y)
}

/// Little-endian i16 at `offset`.
fn i16_at(report: &[u8; 64], offset: usize) -> i16 {
    i16::from_le_bytes([report[offset], report[offset + 1]])
}

/// Decode a CONTROLLER_STATE packet, running both sticks through the
/// calibrator (which may widen its extents as a side effect).
pub fn decode(report: &[u8; 64], cal: &mut StickCalibrator) -> ControllerReport {
    let buttons = ButtonState::from_bytes([report[3], report[4], report[5]]);

    let (l_x, l_y) = unpack_stick(&report[6..9]);
    let (r_x, r_y) = unpack_stick(&report[9..12]);

    ControllerReport {
        buttons,
        left_stick_raw: (l_x, l_y),
        right_stick_raw: (r_x, r_y),
        left_stick: (
            cal.normalize(l_x, Stick::Left, Axis::X),
            cal.normalize(l_y, Stick::Left, Axis::Y),
        ),
        right_stick: (
            cal.normalize(r_x, Stick::Right, Axis::X),
            cal.normalize(r_y, Stick::Right, Axis::Y),
        ),
        accel: (i16_at(report, 13), i16_at(report, 15), i16_at(report, 17)),
        gyro: (i16_at(report, 19), i16_at(report, 21), i16_at(report, 23)),
        battery: (report[2] & 0xF0) >> 4,
    }
}
