//! simulated TLC5916 chain behind virtual gpio lines

use crate::{LED_CHIPS, VOICE_COUNT};
use embedded_hal::{delay::DelayNs, digital::OutputPin};
use std::{cell::RefCell, collections::VecDeque, convert::Infallible, rc::Rc, time::Instant};

pub type Leds = drum_trigger_core::Tlc5916<SimPin, SimPin, SimPin, SimPin, SpinDelay, LED_CHIPS>;

/// board wiring: voice rows run bottom-up, steps left to right
///
/// Plain row-major, without the nibble swap of the 8-step prototype board,
/// so every voice stays on a two-chip chain.
pub fn led_index(voice: usize, step: usize, steps: usize) -> usize {
    (VOICE_COUNT - 1 - voice) * steps + step
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Line {
    Clk,
    Le,
    Sdi,
    Oe,
}

/// chip-side view of the lines
#[derive(Debug)]
pub struct Chain {
    clk: bool,
    le: bool,
    sdi: bool,
    oe: bool,
    /// front is the first chip's input
    shift: VecDeque<bool>,
    latched: Vec<bool>,
    /// (OE, LE) at the last five clock edges
    edges: VecDeque<(bool, bool)>,
    special: bool,
    config: Option<u8>,
}

impl Chain {
    fn new(len: usize) -> Self {
        Self {
            clk: false,
            le: false,
            sdi: false,
            oe: true,
            shift: VecDeque::from(vec![false; len]),
            latched: vec![false; len],
            edges: VecDeque::with_capacity(5),
            special: false,
            config: None,
        }
    }

    fn drive(&mut self, line: Line, level: bool) {
        match line {
            Line::Clk => {
                if level && !self.clk {
                    self.rising_clk();
                }
                self.clk = level;
            }
            Line::Le => {
                if level && !self.le {
                    self.rising_le();
                }
                self.le = level;
            }
            Line::Sdi => self.sdi = level,
            Line::Oe => self.oe = level,
        }
    }

    fn rising_clk(&mut self) {
        self.shift.pop_back();
        self.shift.push_front(self.sdi);

        if self.edges.len() == 5 {
            self.edges.pop_front();
        }
        self.edges.push_back((self.oe, self.le));
        // OE high, low, high; LE on the fourth edge picks the mode
        if let [(true, false), (false, false), (true, false), (true, mode), (true, false)] =
            self.edges.make_contiguous()
        {
            self.special = *mode;
            self.edges.clear();
        }
    }

    fn rising_le(&mut self) {
        if self.special {
            // last eight bits shifted, MSB first
            let byte = self
                .shift
                .iter()
                .take(8)
                .rev()
                .fold(0u8, |acc, bit| acc << 1 | u8::from(*bit));
            self.config = Some(byte);
        } else {
            self.latched = self.shift.iter().copied().collect();
        }
    }

    /// whether output `index` of the frame is lit
    pub fn lit(&self, index: usize) -> bool {
        let len = self.latched.len();
        !self.oe && index < len && self.latched[len - 1 - index]
    }

    pub fn config(&self) -> Option<u8> {
        self.config
    }
}

pub struct SimPin {
    line: Line,
    chain: Rc<RefCell<Chain>>,
}

impl embedded_hal::digital::ErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.chain.borrow_mut().drive(self.line, false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.chain.borrow_mut().drive(self.line, true);
        Ok(())
    }
}

/// busy-wait, the way the latch dwell runs on target
pub struct SpinDelay;

impl DelayNs for SpinDelay {
    fn delay_ns(&mut self, ns: u32) {
        let start = Instant::now();
        while start.elapsed().as_nanos() < u128::from(ns) {
            std::hint::spin_loop();
        }
    }
}

/// driver wired to a fresh simulated chain
pub fn init() -> (Leds, Rc<RefCell<Chain>>) {
    let chain = Rc::new(RefCell::new(Chain::new(LED_CHIPS * 8)));
    let pin = |line| SimPin {
        line,
        chain: chain.clone(),
    };
    let Ok(leds) = Leds::new(
        pin(Line::Clk),
        pin(Line::Le),
        pin(Line::Sdi),
        pin(Line::Oe),
        SpinDelay,
    );
    (leds, chain)
}
