//! uinput virtual gamepad sink.
//!
//! Receives decoded reports and forwards edge-triggered button changes
//! plus absolute stick axes into a virtual evdev device. The first report
//! only seeds the previous-state tracking; nothing is emitted for it.

use evdev::{
    uinput::{VirtualDevice, VirtualDeviceBuilder},
    AbsInfo, AbsoluteAxisType, AttributeSet, EventType, InputEvent, Key, UinputAbsSetup,
};
use tracing::warn;

use crate::report::{Button, ButtonState, ControllerReport};

const DEVICE_NAME: &str = "Nintendo Switch Pro Controller";

/// evdev key for a controller button. Screenshot has no gamepad
/// counterpart and is not forwarded.
fn uinput_key(btn: Button) -> Option<Key> {
    match btn {
        Button::A => Some(Key::BTN_EAST),
        Button::B => Some(Key::BTN_SOUTH),
        Button::X => Some(Key::BTN_NORTH),
        Button::Y => Some(Key::BTN_WEST),
        Button::Up => Some(Key::BTN_DPAD_UP),
        Button::Down => Some(Key::BTN_DPAD_DOWN),
        Button::Left => Some(Key::BTN_DPAD_LEFT),
        Button::Right => Some(Key::BTN_DPAD_RIGHT),
        Button::Minus => Some(Key::BTN_SELECT),
        Button::Plus => Some(Key::BTN_START),
        Button::Screenshot => None,
        Button::Home => Some(Key::BTN_MODE),
        Button::L => Some(Key::BTN_TL),
        Button::Zl => Some(Key::BTN_TL2),
        Button::R => Some(Key::BTN_TR),
        Button::Zr => Some(Key::BTN_TR2),
        Button::LStick => Some(Key::BTN_THUMBL),
        Button::RStick => Some(Key::BTN_THUMBR),
    }
}

pub struct UinputSink {
    device: VirtualDevice,
    prev: Option<ButtonState>,
}

impl UinputSink {
    pub fn new() -> std::io::Result<Self> {
        let mut keys = AttributeSet::<Key>::new();
        for btn in Button::ALL {
            if let Some(key) = uinput_key(btn) {
                keys.insert(key);
            }
        }

        let stick_setup = AbsInfo::new(0, -0x7FFF, 0x7FFF, 0, 0, 1);
        let abs_x = UinputAbsSetup::new(AbsoluteAxisType::ABS_X, stick_setup);
        let abs_y = UinputAbsSetup::new(AbsoluteAxisType::ABS_Y, stick_setup);
        let abs_rx = UinputAbsSetup::new(AbsoluteAxisType::ABS_RX, stick_setup);
        let abs_ry = UinputAbsSetup::new(AbsoluteAxisType::ABS_RY, stick_setup);

        let device = VirtualDeviceBuilder::new()?
            .name(DEVICE_NAME)
            .with_keys(&keys)?
            .with_absolute_axis(&abs_x)?
            .with_absolute_axis(&abs_y)?
            .with_absolute_axis(&abs_rx)?
            .with_absolute_axis(&abs_ry)?
            .build()?;

        Ok(Self { device, prev: None })
    }

    /// Forward one decoded report. Emission is best-effort; a failed
    /// write is logged and the next report proceeds normally.
    pub fn handle(&mut self, decoded: &ControllerReport) {
        let Some(prev) = self.prev else {
            self.prev = Some(decoded.buttons);
            return;
        };

        let mut events = Vec::new();
        for btn in Button::ALL {
            let pressed = decoded.buttons.get(btn);
            if prev.get(btn) != pressed {
                if let Some(key) = uinput_key(btn) {
                    events.push(InputEvent::new(EventType::KEY, key.code(), pressed as i32));
                }
            }
        }
        self.prev = Some(decoded.buttons);

        // evdev Y grows downward; the controller reports up as positive
        let (lx, ly) = decoded.left_stick;
        let (rx, ry) = decoded.right_stick;
        events.push(abs(AbsoluteAxisType::ABS_X, lx as i32));
        events.push(abs(AbsoluteAxisType::ABS_Y, -(ly as i32)));
        events.push(abs(AbsoluteAxisType::ABS_RX, rx as i32));
        events.push(abs(AbsoluteAxisType::ABS_RY, -(ry as i32)));

        if let Err(e) = self.device.emit(&events) {
            warn!("[SINK] uinput emit failed: {e}");
        }
    }
}

fn abs(axis: AbsoluteAxisType, value: i32) -> InputEvent {
    InputEvent::new(EventType::ABSOLUTE, axis.0, value)
}
