#![no_std]

#[cfg(any(test, feature = "std"))]
extern crate std;

use embedded_io::ErrorType;

/// log through defmt when the target provides it, otherwise compile to nothing
macro_rules! log {
    ($level:ident, $($arg:tt)+) => {{
        #[cfg(feature = "defmt")]
        defmt::$level!($($arg)+);
    }};
}

mod bits;
mod clock;
mod leds;
mod persist;
mod playhead;
mod sequencer;

pub use bits::BitSequence;
pub use clock::{Millis, StepClock};
pub use leds::Tlc5916;
pub use persist::{decode, encode, encoded_len, Header, PersistError};
pub use playhead::{Direction, Playhead};
pub use sequencer::{Cmd, Display, Effect, Knob, Sequencer, Voice};

pub const MIN_TEMPO: u16 = 10;
pub const MAX_TEMPO: u16 = 400;
pub const DEFAULT_TEMPO: u16 = 120;
/// subdivide beats down to 16th notes
pub const STEPS_PER_BEAT: u16 = 4;

/// bump whenever the persisted layout changes incompatibly
pub const MAGIC: u8 = 0x02;
/// upper bound of the persisted blob in bytes
pub const NVM_LEN: usize = 256;

/// minimum latch pulse width in micros
pub const LATCH_DWELL_US: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// index (bit, byte or voice) outside `0..len`
    OutOfRange { index: usize, len: usize },
    /// requested size exceeds a fixed capacity
    Capacity { requested: usize, capacity: usize },
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::OutOfRange { index, len } => {
                write!(f, "index {index} out of range for length {len}")
            }
            Error::Capacity {
                requested,
                capacity,
            } => write!(f, "{requested} exceeds capacity of {capacity}"),
        }
    }
}

impl core::error::Error for Error {}

/// non-volatile byte storage holding the persisted blob
pub trait Nvm: ErrorType {
    /// fill `buf` with the bytes stored at `offset`
    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// replace the bytes at `offset` with `buf` in one update
    fn write(&mut self, offset: usize, buf: &[u8]) -> Result<(), Self::Error>;
}

/// note output fired at step boundaries
pub trait Trigger {
    fn trigger(&mut self, note: u8);
}
