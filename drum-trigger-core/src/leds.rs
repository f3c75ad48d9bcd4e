//! bit-banged TLC5916 constant-current LED sink chain

use crate::LATCH_DWELL_US;
use embedded_hal::{
    delay::DelayNs,
    digital::{OutputPin, PinState},
};

/// `CHIPS` daisy-chained TLC5916s, 8 outputs each
///
/// Output `i` is bit `i % 8` of byte `i / 8` in the frame buffer. Bit 0 is
/// shifted first, so it ends up furthest down the chain.
pub struct Tlc5916<CLK, LE, SDI, OE, D, const CHIPS: usize> {
    clk: CLK,
    le: LE,
    sdi: SDI,
    /// active low
    oe: OE,
    delay: D,
    frame: [u8; CHIPS],
}

impl<CLK, LE, SDI, OE, D, E, const CHIPS: usize> Tlc5916<CLK, LE, SDI, OE, D, CHIPS>
where
    CLK: OutputPin<Error = E>,
    LE: OutputPin<Error = E>,
    SDI: OutputPin<Error = E>,
    OE: OutputPin<Error = E>,
    D: DelayNs,
{
    /// take the control lines and enable outputs
    pub fn new(clk: CLK, le: LE, sdi: SDI, oe: OE, delay: D) -> Result<Self, E> {
        let mut leds = Self {
            clk,
            le,
            sdi,
            oe,
            delay,
            frame: [0; CHIPS],
        };
        leds.clk.set_low()?;
        leds.le.set_low()?;
        leds.sdi.set_low()?;
        leds.oe.set_low()?;
        Ok(leds)
    }

    pub const fn len(&self) -> usize {
        CHIPS * 8
    }

    pub const fn is_empty(&self) -> bool {
        CHIPS == 0
    }

    /// out-of-range indices are ignored
    pub fn set(&mut self, index: usize, on: bool) {
        if let Some(byte) = self.frame.get_mut(index / 8) {
            let mask = 1 << (index % 8);
            if on {
                *byte |= mask;
            } else {
                *byte &= !mask;
            }
        }
    }

    /// out-of-range indices read as off
    pub fn get(&self, index: usize) -> bool {
        self.frame
            .get(index / 8)
            .is_some_and(|byte| byte & (1 << (index % 8)) != 0)
    }

    pub fn clear(&mut self) {
        self.frame = [0; CHIPS];
    }

    /// shift the whole frame down the chain and latch it
    pub fn flush(&mut self) -> Result<(), E> {
        for index in 0..self.len() {
            let on = self.get(index);
            self.sdi.set_state(PinState::from(on))?;
            self.pulse_clk()?;
        }
        self.latch()
    }

    /// drive output enable; `true` lights the latched frame
    pub fn set_output_enable(&mut self, enable: bool) -> Result<(), E> {
        self.oe.set_state(PinState::from(!enable))
    }

    /// mode-switch handshake into (`enable`) or out of special mode
    ///
    /// OE toggles high, low, high across the first three clocks; LE sampled
    /// on the fourth selects the mode and drops on the fifth. OE is left high.
    pub fn enter_config_mode(&mut self, enable: bool) -> Result<(), E> {
        self.le.set_low()?;
        self.oe.set_high()?;
        self.pulse_clk()?;
        self.oe.set_low()?;
        self.pulse_clk()?;
        self.oe.set_high()?;
        self.pulse_clk()?;
        self.le.set_state(PinState::from(enable))?;
        self.pulse_clk()?;
        self.le.set_low()?;
        self.pulse_clk()
    }

    /// shift `value` MSB first into every chip's configuration latch
    ///
    /// Only meaningful between `enter_config_mode(true)` and
    /// `enter_config_mode(false)`.
    pub fn write_config(&mut self, value: u8) -> Result<(), E> {
        for _ in 0..CHIPS {
            for bit in (0..8).rev() {
                self.sdi.set_state(PinState::from(value & (1 << bit) != 0))?;
                self.pulse_clk()?;
            }
        }
        self.latch()
    }

    /// program every chip with `value` and return to display mode with
    /// outputs enabled
    pub fn configure(&mut self, value: u8) -> Result<(), E> {
        self.enter_config_mode(true)?;
        self.write_config(value)?;
        self.enter_config_mode(false)?;
        self.set_output_enable(true)
    }

    fn pulse_clk(&mut self) -> Result<(), E> {
        self.clk.set_high()?;
        self.clk.set_low()
    }

    fn latch(&mut self) -> Result<(), E> {
        self.le.set_high()?;
        self.delay.delay_us(LATCH_DWELL_US);
        self.le.set_low()
    }
}
