//! Power-up sequence: hardware reset pulse followed by the fixed register
//! programming that leaves the panel awake, in RGB565 and displaying.
//!
//! The panel is never polled. Any failure aborts the sequence; continuing
//! after a short register write would misalign every later parameter.

use crate::bus::Bus;
use crate::lines::{LineRole, OutputLine};
use crate::protocol::{Command, Interface};
use crate::Result;
use std::time::Duration;
use tracing::{debug, info};

/// Reset held asserted for at least this long.
pub const RESET_HOLD: Duration = Duration::from_millis(5);

/// Wait after releasing reset before the first command.
pub const RESET_SETTLE: Duration = Duration::from_millis(120);

/// Progress through bring-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum InitState {
    #[default]
    Unpowered,
    ResetAsserted,
    ResetReleased,
    PoweredConfigured,
    SleepOut,
    DisplayOn,
}

/// One register write of the init table.
#[derive(Debug, Clone, Copy)]
pub struct InitStep {
    pub command: Command,
    pub payload: &'static [u8],
    /// Pause after the write.
    pub delay: Duration,
}

const fn step(command: Command, payload: &'static [u8]) -> InitStep {
    InitStep {
        command,
        payload,
        delay: Duration::ZERO,
    }
}

const fn step_then_wait(command: Command, payload: &'static [u8], millis: u64) -> InitStep {
    InitStep {
        command,
        payload,
        delay: Duration::from_millis(millis),
    }
}

/// Vendor bring-up table. Payload lengths follow the register map exactly.
pub static INIT_SEQUENCE: &[InitStep] = &[
    step(Command::PowerControlA, &[0x39, 0x2C, 0x00, 0x34, 0x02]),
    step(Command::PowerControlB, &[0x00, 0xC1, 0x30]),
    step(Command::DriverTimingControlA, &[0x85, 0x00, 0x78]),
    step(Command::DriverTimingControlB, &[0x00, 0x00]),
    step(Command::PowerOnSequenceControl, &[0x64, 0x03, 0x12, 0x81]),
    step(Command::PumpRatioControl, &[0x20]),
    step(Command::PowerControl1, &[0x23]),
    step(Command::PowerControl2, &[0x10]),
    step(Command::VcomControl1, &[0x3E, 0x28]),
    step(Command::VcomControl2, &[0x86]),
    // MX | BGR: rotation 0, BGR panel
    step(Command::MemoryAccessControl, &[0x48]),
    // 16 bits/pixel on both interfaces
    step(Command::PixelFormatSet, &[0x55]),
    step(Command::FrameRateControl, &[0x00, 0x18]),
    step(Command::DisplayFunctionControl, &[0x08, 0x82, 0x27]),
    step(Command::Enable3Gamma, &[0x00]),
    step(Command::GammaSet, &[0x01]),
    step(
        Command::PositiveGamma,
        &[
            0x0F, 0x31, 0x2B, 0x0C, 0x0E, 0x08, 0x4E, 0xF1, 0x37, 0x07, 0x10, 0x03, 0x0E, 0x09,
            0x00,
        ],
    ),
    step(
        Command::NegativeGamma,
        &[
            0x00, 0x0E, 0x14, 0x03, 0x11, 0x07, 0x31, 0xC1, 0x48, 0x08, 0x0F, 0x0C, 0x31, 0x36,
            0x0F,
        ],
    ),
    step_then_wait(Command::SleepOut, &[], 120),
    step_then_wait(Command::DisplayOn, &[], 20),
];

/// Pulses the reset line. A panel without a reset line only sees the delays.
pub fn reset_pulse<B: Bus, L: OutputLine>(
    iface: &mut Interface<B, L>,
    delay: fn(Duration),
    state: &mut InitState,
) -> Result<()> {
    iface.set_line(LineRole::Reset, true)?;
    *state = InitState::ResetAsserted;
    debug!("Reset asserted");
    delay(RESET_HOLD);

    iface.set_line(LineRole::Reset, false)?;
    *state = InitState::ResetReleased;
    debug!("Reset released");
    delay(RESET_SETTLE);
    Ok(())
}

/// Runs the full bring-up, advancing `state` as each stage completes.
pub fn run<B: Bus, L: OutputLine>(
    iface: &mut Interface<B, L>,
    delay: fn(Duration),
    state: &mut InitState,
) -> Result<()> {
    *state = InitState::Unpowered;
    reset_pulse(iface, delay, state)?;

    for step in INIT_SEQUENCE {
        if step.command == Command::SleepOut {
            *state = InitState::PoweredConfigured;
        }

        debug!(
            "Init {:?} (0x{:02X}, {} byte(s))",
            step.command,
            step.command as u8,
            step.payload.len()
        );
        iface.write_command_with_data(step.command.into(), step.payload)?;

        match step.command {
            Command::SleepOut => *state = InitState::SleepOut,
            Command::DisplayOn => *state = InitState::DisplayOn,
            _ => {}
        }
        if !step.delay.is_zero() {
            delay(step.delay);
        }
    }

    info!("Panel initialized ({} registers)", INIT_SEQUENCE.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Event, Recorder};
    use crate::protocol::Interface;

    fn no_delay(_: Duration) {}

    #[test]
    fn test_sequence_order() {
        let recorder = Recorder::default();
        let mut iface = Interface::new(recorder.bus(), recorder.bank(true, false));
        let mut state = InitState::default();

        run(&mut iface, no_delay, &mut state).unwrap();
        assert_eq!(state, InitState::DisplayOn);

        let expected: Vec<u8> = INIT_SEQUENCE.iter().map(|s| s.command as u8).collect();
        assert_eq!(recorder.opcodes(), expected);

        let opcodes = recorder.opcodes();
        let position = |op: u8| opcodes.iter().position(|&o| o == op).unwrap();
        assert!(position(0xC0) < position(0xC5));
        assert!(position(0xC5) < position(0x3A));
        assert!(position(0x3A) < position(0xE0));
        assert!(position(0xE0) < position(0x11));
        assert_eq!(&opcodes[opcodes.len() - 2..], &[0x11u8, 0x29][..]);
    }

    #[test]
    fn test_payload_widths() {
        let recorder = Recorder::default();
        let mut iface = Interface::new(recorder.bus(), recorder.bank(false, false));
        run(&mut iface, no_delay, &mut InitState::default()).unwrap();

        let widths: Vec<(u8, usize)> = recorder
            .commands()
            .into_iter()
            .map(|(op, payload)| (op, payload.len()))
            .collect();
        assert_eq!(
            widths,
            vec![
                (0xCB, 5),
                (0xCF, 3),
                (0xE8, 3),
                (0xEA, 2),
                (0xED, 4),
                (0xF7, 1),
                (0xC0, 1),
                (0xC1, 1),
                (0xC5, 2),
                (0xC7, 1),
                (0x36, 1),
                (0x3A, 1),
                (0xB1, 2),
                (0xB6, 3),
                (0xF2, 1),
                (0x26, 1),
                (0xE0, 15),
                (0xE1, 15),
                (0x11, 0),
                (0x29, 0),
            ]
        );
    }

    #[test]
    fn test_reset_pulse_precedes_commands() {
        let recorder = Recorder::default();
        let mut iface = Interface::new(recorder.bus(), recorder.bank(true, false));
        run(&mut iface, no_delay, &mut InitState::default()).unwrap();

        let events = recorder.events();
        assert_eq!(events[0], Event::Line(LineRole::Reset, true));
        assert_eq!(events[1], Event::Line(LineRole::Reset, false));
        assert!(matches!(events[2], Event::Line(LineRole::DataCommand, false)));
    }

    #[test]
    fn test_failure_aborts_sequence() {
        // Each payload-bearing step is two transfers; fail the payload of
        // the fourth step (DriverTimingControlB).
        let recorder = Recorder::default();
        let mut iface = Interface::new(recorder.bus(), recorder.bank(true, false));
        recorder.fail_transfer(8);
        let mut state = InitState::default();

        let err = run(&mut iface, no_delay, &mut state).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::IoFailure);
        assert_eq!(state, InitState::ResetReleased);
        assert_eq!(recorder.opcodes(), vec![0xCB, 0xCF, 0xE8, 0xEA]);
        assert_eq!(recorder.commands()[3].1, Vec::<u8>::new());
    }

    #[test]
    fn test_failure_at_display_on() {
        let recorder = Recorder::default();
        let mut iface = Interface::new(recorder.bus(), recorder.bank(false, false));
        // 18 payload steps * 2 + SleepOut = 37, DisplayOn is the 38th.
        recorder.fail_transfer(38);
        let mut state = InitState::default();

        assert!(run(&mut iface, no_delay, &mut state).is_err());
        assert_eq!(state, InitState::SleepOut);
    }

    #[test]
    fn test_reset_failure_stops_before_bus() {
        let recorder = Recorder::default();
        let mut iface = Interface::new(recorder.bus(), recorder.bank(true, false));
        recorder.fail_line(LineRole::Reset);
        let mut state = InitState::default();

        assert!(run(&mut iface, no_delay, &mut state).is_err());
        assert_eq!(state, InitState::Unpowered);
        assert_eq!(recorder.transfer_count(), 0);
    }
}
