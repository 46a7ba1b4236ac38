//! Controller session: bootstrap sequence, request/reply engine, and the
//! streaming loop.
//!
//! Everything is strictly synchronous. One thread owns the transport for
//! the session's lifetime; all reads block until the device delivers a
//! packet or the transport fails. The only cancellation-like mechanism is
//! the bounded retry on sends.

use std::time::Instant;

use tracing::{debug, info, warn};

use crate::calibration::StickCalibrator;
use crate::error::{Error, Result};
use crate::protocol::{
    self, CommandId, InputReportId, SubcommandId, CALIBRATION_LENGTH, CALIBRATION_OFFSET,
    COMMAND_RETRIES, DEFAULT_IMU_SENSITIVITY, PACKET_SIZE, SPI_REPLY_DATA,
};
use crate::report::{self, ControllerReport};
use crate::rumble::RumbleState;
use crate::transport::Transport;

/// Outcome of each bring-up step. The device acks bootstrap commands
/// inconsistently, so individual failures are tolerated and only logged;
/// the one exception is the calibration read, which is fatal.
#[derive(Debug, Default)]
pub struct BootstrapReport {
    steps: Vec<(&'static str, bool)>,
}

impl BootstrapReport {
    fn record(&mut self, step: &'static str, acked: bool) {
        if !acked {
            debug!("[SESSION] Bootstrap step '{step}' went unacknowledged");
        }
        self.steps.push((step, acked));
    }

    pub fn fully_acknowledged(&self) -> bool {
        self.steps.iter().all(|(_, acked)| *acked)
    }

    fn log_summary(&self) {
        let unacked: Vec<&str> = self
            .steps
            .iter()
            .filter(|(_, acked)| !acked)
            .map(|(step, _)| *step)
            .collect();
        if unacked.is_empty() {
            info!("[SESSION] Bootstrap complete, all {} steps acknowledged", self.steps.len());
        } else {
            warn!("[SESSION] Bootstrap complete, unacknowledged steps: {}", unacked.join(", "));
        }
    }
}

/// Request/reply engine. Owns the transport, the outbound frame counter,
/// and the rumble state every subcommand frame must embed.
#[derive(Debug)]
struct Link<T: Transport> {
    transport: T,
    counter: u8,
    rumble: RumbleState,
}

impl<T: Transport> Link<T> {
    fn new(transport: T) -> Self {
        Self {
            transport,
            counter: 0,
            rumble: RumbleState::default(),
        }
    }

    /// One attempt's write. Short or failed writes are transient; the
    /// attempt is simply consumed.
    fn write_frame(&mut self, frame: &[u8]) -> bool {
        match self.transport.write(frame) {
            Ok(n) if n == frame.len() => true,
            Ok(n) => {
                debug!("[SESSION] Short write: {n}/{} bytes", frame.len());
                false
            }
            Err(e) => {
                debug!("[SESSION] Write failed: {e}");
                false
            }
        }
    }

    /// Send a bootstrap command, retrying until it is acknowledged or the
    /// attempt bound is exhausted. `Ok(false)` means exhaustion, which
    /// callers may tolerate.
    fn send_command(&mut self, id: CommandId, wait_reply: bool) -> Result<bool> {
        let frame = protocol::command_frame(id);
        for _ in 0..COMMAND_RETRIES {
            if !self.write_frame(&frame) {
                continue;
            }
            if !wait_reply {
                return Ok(true);
            }
            let mut reply = [0u8; PACKET_SIZE];
            let n = self.transport.read(&mut reply)?;
            if protocol::is_command_ack(&reply[..n], id) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Send a subcommand and wait for the reply echoing its id. The
    /// counter is bumped exactly once per logical send; retries reuse the
    /// same frame. `Ok(None)` means the attempt bound was exhausted.
    fn send_subcommand(
        &mut self,
        id: SubcommandId,
        params: &[u8],
    ) -> Result<Option<[u8; PACKET_SIZE]>> {
        let (low, high) = self.rumble.waveforms();
        let frame = protocol::subcommand_frame(self.counter, low, high, id, params);
        self.counter = self.counter.wrapping_add(1);
        for _ in 0..COMMAND_RETRIES {
            if !self.write_frame(&frame) {
                continue;
            }
            let mut reply = [0u8; PACKET_SIZE];
            let n = self.transport.read(&mut reply)?;
            if protocol::is_subcommand_reply(&reply[..n], id) {
                return Ok(Some(reply));
            }
        }
        Ok(None)
    }

    /// Fire-and-forget rumble update carrying the current waveforms. No
    /// reply is awaited; exhaustion only means the update was dropped.
    fn send_rumble(&mut self) -> bool {
        let (low, high) = self.rumble.waveforms();
        let frame = protocol::rumble_frame(self.counter, low, high);
        self.counter = self.counter.wrapping_add(1);
        for _ in 0..COMMAND_RETRIES {
            if self.write_frame(&frame) {
                return true;
            }
        }
        false
    }

    /// Read `len` bytes of SPI flash at `addr`.
    fn spi_flash_read(&mut self, addr: u32, len: u8) -> Result<Option<Vec<u8>>> {
        let mut params = [0u8; 5];
        params[..4].copy_from_slice(&addr.to_le_bytes());
        params[4] = len;
        let reply = self.send_subcommand(SubcommandId::SpiFlashRead, &params)?;
        Ok(reply.map(|r| r[SPI_REPLY_DATA..SPI_REPLY_DATA + len as usize].to_vec()))
    }
}

/// An initialized controller session.
///
/// `start` drives the device through the full bring-up sequence; `run`
/// then streams decoded reports to the callback until the transport fails.
#[derive(Debug)]
pub struct Session<T: Transport> {
    link: Link<T>,
    calibration: StickCalibrator,
    bootstrap: BootstrapReport,
}

impl<T: Transport> Session<T> {
    /// Bring the controller into USB streaming mode.
    ///
    /// Sequence: handshake, high-speed, handshake again, load stick
    /// calibration from flash, enable vibration, full report mode, force
    /// USB (no ack), player lights, enable IMU, IMU sensitivity. Only the
    /// calibration read is required to succeed.
    pub fn start(transport: T, player: u8) -> Result<Self> {
        let mut link = Link::new(transport);
        let mut bootstrap = BootstrapReport::default();

        bootstrap.record("handshake", link.send_command(CommandId::Handshake, true)?);
        bootstrap.record("high-speed", link.send_command(CommandId::HighSpeed, true)?);
        bootstrap.record("handshake-2", link.send_command(CommandId::Handshake, true)?);

        let calibration = match link.spi_flash_read(CALIBRATION_OFFSET, CALIBRATION_LENGTH)? {
            Some(data) => {
                let bytes: [u8; CALIBRATION_LENGTH as usize] =
                    data.try_into().map_err(|_| Error::CalibrationUnavailable)?;
                StickCalibrator::from_flash(&bytes)
            }
            None => return Err(Error::CalibrationUnavailable),
        };

        bootstrap.record(
            "enable-vibration",
            link.send_subcommand(SubcommandId::EnableVibration, &[0x01])?.is_some(),
        );
        bootstrap.record(
            "input-report-mode",
            link.send_subcommand(
                SubcommandId::SetInputReportMode,
                &[InputReportId::ControllerState as u8],
            )?
            .is_some(),
        );
        bootstrap.record("force-usb", link.send_command(CommandId::ForceUsb, false)?);

        let lights = [player == 1, player == 2, player == 3, player == 4];
        bootstrap.record(
            "player-lights",
            link.send_subcommand(SubcommandId::SetPlayerLights, &[lights_param(lights)])?.is_some(),
        );
        bootstrap.record(
            "enable-imu",
            link.send_subcommand(SubcommandId::EnableImu, &[0x01])?.is_some(),
        );
        bootstrap.record(
            "imu-sensitivity",
            link.send_subcommand(SubcommandId::SetImuSensitivity, &DEFAULT_IMU_SENSITIVITY)?
                .is_some(),
        );

        bootstrap.log_summary();
        Ok(Self {
            link,
            calibration,
            bootstrap,
        })
    }

    pub fn bootstrap(&self) -> &BootstrapReport {
        &self.bootstrap
    }

    /// Set the home button light to `brightness` percent.
    pub fn set_home_light(&mut self, brightness: u8) -> Result<bool> {
        let brightness = brightness.min(100);
        let intensity = if brightness == 0 {
            0
        } else if brightness < 65 {
            (brightness + 5) / 10
        } else {
            (15.0 * (brightness as f64 / 100.0).powf(2.13)).ceil() as u8
        };
        let level = (intensity & 0xF) << 4;
        Ok(self
            .link
            .send_subcommand(SubcommandId::SetHomeLight, &[0x01, level, level, 0x00])?
            .is_some())
    }

    /// Switch each rumble band on or off. A nonzero duration arms a
    /// one-shot expiry that the streaming loop resolves back to neutral.
    /// Best-effort: returns false when the update could not be written.
    pub fn set_rumble(&mut self, low: bool, high: bool, duration_ms: u64) -> bool {
        self.link.rumble.set(low, high, duration_ms);
        self.link.send_rumble()
    }

    /// Stream controller-state reports to `callback` until the transport
    /// fails. Packets with any other report id are skipped; after each
    /// callback the rumble expiry is polled and, if reached, the bands
    /// return to neutral.
    pub fn run<F>(&mut self, mut callback: F) -> Result<()>
    where
        F: FnMut(&ControllerReport),
    {
        info!("[SESSION] Streaming controller state");
        loop {
            let mut buf = [0u8; PACKET_SIZE];
            let n = self.link.transport.read(&mut buf)?;
            if n < PACKET_SIZE || buf[0] != InputReportId::ControllerState as u8 {
                continue;
            }
            let decoded = report::decode(&buf, &mut self.calibration);
            callback(&decoded);
            if self.link.rumble.expired(Instant::now()) {
                self.set_rumble(false, false, 0);
            }
        }
    }
}

fn lights_param(lights: [bool; 4]) -> u8 {
    lights
        .iter()
        .enumerate()
        .fold(0u8, |param, (i, &on)| param | ((on as u8) << i))
}
