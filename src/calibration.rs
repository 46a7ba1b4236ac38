//! Factory stick calibration and auto-ranging normalization.
//!
//! The controller stores per-stick calibration in SPI flash as nibble-packed
//! 12-bit values: three values per axis, semantically
//! [min-side deviation, center, max-side deviation]. At runtime the driver
//! keeps per-axis extent bounds, seeded from the factory values scaled by a
//! margin factor and widened (never narrowed) as larger deviations are
//! observed. Full tilt converges to exactly ±0x7FFF as the stick is used.

/// A value of 0xFFF in flash means "not calibrated".
const SENTINEL: u16 = 0xFFF;

/// Factory extents are scaled down so real sticks reach full scale.
const EXTENT_MARGIN: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stick {
    Left = 0,
    Right = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X = 0,
    Y = 1,
}

/// Stick calibration plus the runtime extent bounds.
///
/// The factory values are immutable after load; the extents widen for the
/// lifetime of the session.
#[derive(Debug, Clone)]
pub struct StickCalibrator {
    /// [stick][axis] -> [min-side deviation, center, max-side deviation].
    calibration: [[[u16; 3]; 2]; 2],
    /// [stick][axis] -> [negative bound, positive bound] of observed
    /// deviations. Monotone non-narrowing.
    extents: [[[i32; 2]; 2]; 2],
}

/// 12-bit value packed in the low position: low byte + low nibble of next.
fn lo12(b0: u8, b1: u8) -> u16 {
    ((b1 as u16 & 0xF) << 8) | b0 as u16
}

/// 12-bit value packed in the high position: high nibble of byte + next byte.
fn hi12(b0: u8, b1: u8) -> u16 {
    ((b1 as u16) << 4) | (b0 as u16 >> 4)
}

impl StickCalibrator {
    /// Unpack the 18-byte factory calibration region (flash 0x603D).
    ///
    /// Left stick slots are stored max/center/min, right stick
    /// center/min/max; both use the same packing parity as the live
    /// report's X/Y pairs.
    pub fn from_flash(d: &[u8; 18]) -> Self {
        let mut calibration = [
            [
                // Left X: min, center, max
                [lo12(d[6], d[7]), lo12(d[3], d[4]), lo12(d[0], d[1])],
                // Left Y
                [hi12(d[7], d[8]), hi12(d[4], d[5]), hi12(d[1], d[2])],
            ],
            [
                // Right X
                [lo12(d[12], d[13]), lo12(d[9], d[10]), lo12(d[15], d[16])],
                // Right Y
                [hi12(d[13], d[14]), hi12(d[10], d[11]), hi12(d[16], d[17])],
            ],
        ];

        for stick in &mut calibration {
            for axis in stick.iter_mut() {
                for value in axis.iter_mut() {
                    if *value == SENTINEL {
                        *value = 0;
                    }
                }
            }
        }

        let mut extents = [[[0i32; 2]; 2]; 2];
        for (s, stick) in calibration.iter().enumerate() {
            for (a, axis) in stick.iter().enumerate() {
                extents[s][a] = [
                    -((axis[0] as f64 * EXTENT_MARGIN) as i32),
                    (axis[2] as f64 * EXTENT_MARGIN) as i32,
                ];
            }
        }

        Self {
            calibration,
            extents,
        }
    }

    /// Normalize a raw 12-bit stick sample into [-0x7FFF, 0x7FFF].
    ///
    /// Widening must happen before the division: a deviation past the
    /// current bound becomes the new bound and then normalizes to exactly
    /// full scale. With an uncalibrated extreme the seeded bound is 0 and
    /// the first nonzero sample on that side self-calibrates it.
    pub fn normalize(&mut self, raw: u16, stick: Stick, axis: Axis) -> i16 {
        let (s, a) = (stick as usize, axis as usize);
        let value = raw as i32 - self.calibration[s][a][1] as i32;

        let extent = &mut self.extents[s][a];
        if value < extent[0] {
            extent[0] = value;
        }
        if value > extent[1] {
            extent[1] = value;
        }

        if value > 0 {
            (value as f64 * 0x7FFF as f64 / extent[1] as f64).round() as i16
        } else if value < 0 {
            (value as f64 * -(0x7FFF as f64) / extent[0] as f64).round() as i16
        } else {
            0
        }
    }

    #[cfg(test)]
    fn extent(&self, stick: Stick, axis: Axis) -> [i32; 2] {
        self.extents[stick as usize][axis as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Factory calibration for a well-centered stick: center 0x800,
    /// 0x700 of travel on each side, both sticks identical.
    const FACTORY: [u8; 18] = [
        0x00, 0x07, 0x70, 0x00, 0x08, 0x80, 0x00, 0x07, 0x70, // left
        0x00, 0x07, 0x70, 0x00, 0x08, 0x80, 0x00, 0x07, 0x70, // right
    ];

    #[test]
    fn test_parse_factory_payload() {
        let cal = StickCalibrator::from_flash(&FACTORY);
        for stick in [Stick::Left, Stick::Right] {
            for axis in [Axis::X, Axis::Y] {
                let (s, a) = (stick as usize, axis as usize);
                assert_eq!(cal.calibration[s][a], [0x700, 0x800, 0x700]);
                // Seeded at 0.7 * 0x700 = 1254, fraction dropped
                assert_eq!(cal.extent(stick, axis), [-1254, 1254]);
            }
        }
    }

    #[test]
    fn test_right_stick_slot_order_differs_from_left() {
        // Right stick flash order is center/min/max, left is max/center/min.
        let mut d = [0u8; 18];
        // Left X: max=0x100, center=0x200, min=0x300 (low packing)
        d[1] = 0x01;
        d[4] = 0x02;
        d[7] = 0x03;
        // Right X: center=0x400, min=0x500, max=0x600
        d[10] = 0x04;
        d[13] = 0x05;
        d[16] = 0x06;

        let cal = StickCalibrator::from_flash(&d);
        assert_eq!(cal.calibration[0][0], [0x300, 0x200, 0x100]);
        assert_eq!(cal.calibration[1][0], [0x500, 0x400, 0x600]);
    }

    #[test]
    fn test_sentinel_becomes_zero() {
        // 0xFFF in every position
        let cal = StickCalibrator::from_flash(&[0xFF; 18]);
        for stick in cal.calibration {
            for axis in stick {
                assert_eq!(axis, [0, 0, 0]);
            }
        }
    }

    #[test]
    fn test_center_normalizes_to_zero() {
        let mut cal = StickCalibrator::from_flash(&FACTORY);
        assert_eq!(cal.normalize(0x800, Stick::Left, Axis::X), 0);
        assert_eq!(cal.normalize(0x800, Stick::Right, Axis::Y), 0);
    }

    #[test]
    fn test_bound_sample_normalizes_to_full_scale() {
        let mut cal = StickCalibrator::from_flash(&FACTORY);
        // Deviation exactly at the seeded bound
        assert_eq!(cal.normalize(0x800 + 1254, Stick::Left, Axis::X), 0x7FFF);
        assert_eq!(cal.normalize(0x800 - 1254, Stick::Left, Axis::X), -0x7FFF);
    }

    #[test]
    fn test_extents_widen_and_never_narrow() {
        let mut cal = StickCalibrator::from_flash(&FACTORY);
        assert_eq!(cal.normalize(0x800 + 1500, Stick::Left, Axis::X), 0x7FFF);
        assert_eq!(cal.extent(Stick::Left, Axis::X)[1], 1500);

        // A smaller deviation scales against the widened bound and
        // must not narrow it
        let v = cal.normalize(0x800 + 1254, Stick::Left, Axis::X);
        assert_eq!(v, (1254.0 * 32767.0 / 1500.0_f64).round() as i16);
        assert_eq!(cal.extent(Stick::Left, Axis::X)[1], 1500);
    }

    #[test]
    fn test_extents_monotone_over_sequence() {
        let mut cal = StickCalibrator::from_flash(&FACTORY);
        let mut prev = cal.extent(Stick::Right, Axis::Y);
        for raw in [0x800u16, 0xA00, 0x900, 0xFFF, 0x000, 0x400, 0x800] {
            cal.normalize(raw, Stick::Right, Axis::Y);
            let cur = cal.extent(Stick::Right, Axis::Y);
            assert!(cur[0] <= prev[0], "negative bound narrowed");
            assert!(cur[1] >= prev[1], "positive bound narrowed");
            prev = cur;
        }
    }

    #[test]
    fn test_uncalibrated_extreme_self_calibrates() {
        // All-sentinel flash: centers and extremes are 0, bounds seed at 0.
        let mut cal = StickCalibrator::from_flash(&[0xFF; 18]);
        // First nonzero sample becomes the bound and maps to full scale.
        assert_eq!(cal.normalize(100, Stick::Left, Axis::X), 0x7FFF);
        // Zero deviation against a zero bound stays well-defined.
        assert_eq!(cal.normalize(0, Stick::Left, Axis::Y), 0);
    }

    #[test]
    fn test_output_always_in_range() {
        let mut cal = StickCalibrator::from_flash(&FACTORY);
        for raw in 0..=0xFFFu16 {
            let v = cal.normalize(raw, Stick::Left, Axis::X) as i32;
            assert!((-0x7FFF..=0x7FFF).contains(&v), "raw {raw} -> {v}");
        }
    }
}
