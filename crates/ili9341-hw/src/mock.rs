//! Recording bus and control lines for tests.
//!
//! The bus and every line share one event log, and each transfer records the
//! data/command level seen at the moment it was issued.

use crate::bus::{Bus, Segment};
use crate::lines::{LineBank, LineRole, OutputLine};
use crate::panel::Ili9341;
use crate::{Error, Result};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    Write(Vec<u8>),
    Read(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Line(LineRole, bool),
    /// `data` is the data/command line level when the transfer started.
    Transfer { data: bool, segments: Vec<Recorded> },
}

#[derive(Default)]
struct State {
    events: Vec<Event>,
    dc: bool,
    transfers: usize,
    fail_transfer: Option<usize>,
    fail_line: Option<LineRole>,
    read_data: Vec<u8>,
}

#[derive(Clone, Default)]
pub struct Recorder {
    state: Rc<RefCell<State>>,
}

impl Recorder {
    pub fn line(&self, role: LineRole) -> MockLine {
        MockLine {
            role,
            recorder: self.clone(),
        }
    }

    pub fn bus(&self) -> MockBus {
        MockBus {
            recorder: self.clone(),
        }
    }

    pub fn bank(&self, reset: bool, backlight: bool) -> LineBank<MockLine> {
        LineBank::new(
            self.line(LineRole::DataCommand),
            reset.then(|| self.line(LineRole::Reset)),
            backlight.then(|| self.line(LineRole::Backlight)),
        )
    }

    /// A panel with no delays, wired to this recorder.
    pub fn panel(&self, reset: bool, backlight: bool) -> Ili9341<MockBus, MockLine> {
        Ili9341::new(self.bus(), self.bank(reset, backlight)).with_delay(|_| {})
    }

    /// Fails the `n`th transfer from now on (1-based).
    pub fn fail_transfer(&self, n: usize) {
        let mut state = self.state.borrow_mut();
        state.fail_transfer = Some(state.transfers + n);
    }

    pub fn fail_line(&self, role: LineRole) {
        self.state.borrow_mut().fail_line = Some(role);
    }

    pub fn set_read_data(&self, data: &[u8]) {
        self.state.borrow_mut().read_data = data.to_vec();
    }

    pub fn clear(&self) {
        self.state.borrow_mut().events.clear();
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.borrow().events.clone()
    }

    pub fn transfer_count(&self) -> usize {
        self.state
            .borrow()
            .events
            .iter()
            .filter(|e| matches!(e, Event::Transfer { .. }))
            .count()
    }

    /// Folds the transfer log into (opcode, payload) pairs.
    pub fn commands(&self) -> Vec<(u8, Vec<u8>)> {
        let mut commands: Vec<(u8, Vec<u8>)> = Vec::new();
        for event in self.state.borrow().events.iter() {
            let Event::Transfer { data, segments } = event else {
                continue;
            };
            for segment in segments {
                let Recorded::Write(bytes) = segment else {
                    continue;
                };
                if *data {
                    let (_, payload) = commands.last_mut().expect("data before any command");
                    payload.extend_from_slice(bytes);
                } else {
                    commands.push((bytes[0], bytes[1..].to_vec()));
                }
            }
        }
        commands
    }

    pub fn opcodes(&self) -> Vec<u8> {
        self.commands().into_iter().map(|(op, _)| op).collect()
    }
}

pub struct MockLine {
    role: LineRole,
    recorder: Recorder,
}

impl OutputLine for MockLine {
    fn set(&mut self, active: bool) -> Result<()> {
        let mut state = self.recorder.state.borrow_mut();
        if state.fail_line == Some(self.role) {
            return Err(Error::LineSet {
                role: self.role,
                source: std::io::Error::other("injected line failure"),
            });
        }
        if self.role == LineRole::DataCommand {
            state.dc = active;
        }
        state.events.push(Event::Line(self.role, active));
        Ok(())
    }
}

pub struct MockBus {
    recorder: Recorder,
}

impl Bus for MockBus {
    fn transfer(&mut self, segments: &mut [Segment<'_>]) -> Result<()> {
        let mut state = self.recorder.state.borrow_mut();
        state.transfers += 1;
        if state.fail_transfer == Some(state.transfers) {
            return Err(Error::Transfer(std::io::Error::other(
                "injected transfer failure",
            )));
        }

        let mut recorded = Vec::with_capacity(segments.len());
        for segment in segments.iter_mut() {
            match segment {
                Segment::Write(tx) => recorded.push(Recorded::Write(tx.to_vec())),
                Segment::Read(rx) => {
                    for (i, byte) in rx.iter_mut().enumerate() {
                        *byte = state.read_data.get(i).copied().unwrap_or(0);
                    }
                    recorded.push(Recorded::Read(rx.len()));
                }
            }
        }
        let data = state.dc;
        state.events.push(Event::Transfer {
            data,
            segments: recorded,
        });
        Ok(())
    }
}
