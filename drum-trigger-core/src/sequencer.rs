//! sequencer context driven by the host polling loop

use crate::{
    persist::{self, PersistError},
    BitSequence, Error, Millis, Nvm, Playhead, StepClock, Trigger, DEFAULT_TEMPO, MAX_TEMPO,
    MIN_TEMPO, NVM_LEN, STEPS_PER_BEAT,
};

pub const NAME_LEN: usize = 8;

/// one drum sound and its pattern
#[derive(Clone, PartialEq, Eq)]
pub struct Voice<const BYTES: usize> {
    pub name: heapless::String<NAME_LEN>,
    /// general midi drum note
    pub note: u8,
    pub pattern: BitSequence<BYTES>,
}

impl<const BYTES: usize> Voice<BYTES> {
    pub fn new(name: &str, note: u8, pattern: BitSequence<BYTES>) -> Result<Self, Error> {
        let name = heapless::String::try_from(name).map_err(|_| Error::Capacity {
            requested: name.len(),
            capacity: NAME_LEN,
        })?;
        Ok(Self {
            name,
            note,
            pattern,
        })
    }
}

impl<const BYTES: usize> core::fmt::Debug for Voice<BYTES> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Voice({:?}, {}, {:?})", self.name.as_str(), self.note, self.pattern)
    }
}

/// relative encoders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Knob {
    Tempo,
    RangeLength,
    RangeStart,
}

/// external events consumed by [`Sequencer::cmd`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Cmd {
    Toggle { voice: usize, step: usize },
    Transport,
    Reverse,
    Mode,
    Encoder(Knob, i32),
}

/// what the segment display should show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Display {
    Tempo(u16),
    Edit,
}

/// follow-up work for the host after a [`Cmd`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Effect {
    /// patterns or range changed; re-render the leds
    Redraw,
    /// refresh the segment display
    Display(Display),
    Started,
    /// transport stopped; persist state now
    Save,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Tempo,
    Edit,
}

pub struct Sequencer<const VOICES: usize, const BYTES: usize> {
    pub voices: heapless::Vec<Voice<BYTES>, VOICES>,
    pub playhead: Playhead,
    pub clock: StepClock,
    steps: u8,
    playing: bool,
    last_step: Millis,
    mode: Mode,
}

impl<const VOICES: usize, const BYTES: usize> Sequencer<VOICES, BYTES> {
    /// every voice must hold a pattern of exactly `steps` bits
    pub fn new(voices: heapless::Vec<Voice<BYTES>, VOICES>, steps: u8) -> Result<Self, Error> {
        if let Some(voice) = voices
            .iter()
            .find(|v| v.pattern.len() != usize::from(steps))
        {
            return Err(Error::OutOfRange {
                index: voice.pattern.len(),
                len: usize::from(steps),
            });
        }
        let steps_len = usize::from(steps);
        Ok(Self {
            voices,
            // one past the last step so the exclusive end can reach it
            playhead: Playhead::new(steps_len + 1, 0..steps_len),
            clock: StepClock::new(DEFAULT_TEMPO, STEPS_PER_BEAT),
            steps,
            playing: false,
            last_step: 0,
            mode: Mode::Tempo,
        })
    }

    pub fn steps(&self) -> usize {
        usize::from(self.steps)
    }

    pub fn tempo(&self) -> u16 {
        self.clock.tempo()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn display(&self) -> Display {
        match self.mode {
            Mode::Tempo => Display::Tempo(self.tempo()),
            Mode::Edit => Display::Edit,
        }
    }

    /// clamp into the supported tempo range and retime the clock
    pub fn set_tempo(&mut self, bpm: i32) {
        let bpm = bpm.clamp(i32::from(MIN_TEMPO), i32::from(MAX_TEMPO));
        // clamped into u16 range above
        self.clock.set_tempo(bpm as u16);
    }

    /// apply one external event
    pub fn cmd(&mut self, cmd: Cmd, now: Millis) -> Result<Option<Effect>, Error> {
        log!(debug, "cmd {}", cmd);
        let effect = match cmd {
            Cmd::Toggle { voice, step } => {
                let len = self.voices.len();
                self.voices
                    .get_mut(voice)
                    .ok_or(Error::OutOfRange { index: voice, len })?
                    .pattern
                    .toggle(step)?;
                Some(Effect::Redraw)
            }
            Cmd::Transport => {
                self.playing = !self.playing;
                self.playhead.reset();
                if self.playing {
                    log!(info, "play");
                    self.last_step = self.clock.primed(now);
                    Some(Effect::Started)
                } else {
                    log!(info, "stop");
                    Some(Effect::Save)
                }
            }
            Cmd::Reverse => {
                self.playhead.reverse();
                None
            }
            Cmd::Mode => {
                self.mode = match self.mode {
                    Mode::Tempo => Mode::Edit,
                    Mode::Edit => Mode::Tempo,
                };
                Some(Effect::Display(self.display()))
            }
            // the encoder only retimes while the display shows the tempo
            Cmd::Encoder(Knob::Tempo, delta) => match self.mode {
                Mode::Tempo => {
                    self.set_tempo(i32::from(self.tempo()).saturating_add(delta));
                    Some(Effect::Display(self.display()))
                }
                Mode::Edit => None,
            },
            Cmd::Encoder(Knob::RangeLength, delta) => {
                self.playhead.adjust_range_length(delta as isize);
                Some(Effect::Redraw)
            }
            Cmd::Encoder(Knob::RangeStart, delta) => {
                self.playhead.adjust_range_start(delta as isize);
                Some(Effect::Redraw)
            }
        };
        Ok(effect)
    }

    /// fire every voice set at the playhead if a step boundary passed, then
    /// advance; returns the step that played
    pub fn poll(
        &mut self,
        now: Millis,
        trigger: &mut impl Trigger,
    ) -> Result<Option<usize>, Error> {
        if !self.playing {
            return Ok(None);
        }
        let (due, last_step) = self.clock.tick(now, self.last_step);
        if !due {
            return Ok(None);
        }
        self.last_step = last_step;
        let step = self.playhead.current();
        for voice in self.voices.iter() {
            if voice.pattern.get(step)? {
                trigger.trigger(voice.note);
            }
        }
        self.playhead.advance();
        Ok(Some(step))
    }

    /// report every pattern bit as `(voice, step, on)`
    pub fn render(&self, mut lamp: impl FnMut(usize, usize, bool)) {
        for (v, voice) in self.voices.iter().enumerate() {
            for (s, on) in voice.pattern.iter().enumerate() {
                lamp(v, s, on);
            }
        }
    }

    pub fn save<N: Nvm>(&self, nvm: &mut N) -> Result<(), PersistError<N::Error>> {
        let blob = persist::encode(self.tempo(), self.steps, &self.voices)?;
        nvm.write(0, &blob).map_err(PersistError::Other)?;
        log!(info, "saved {=usize} bytes", blob.len());
        Ok(())
    }

    /// restore from `nvm`; `false` when it holds no valid state
    pub fn load<N: Nvm>(&mut self, nvm: &mut N) -> Result<bool, PersistError<N::Error>> {
        let mut blob = [0u8; NVM_LEN];
        let len = persist::encoded_len(&self.voices);
        let blob = blob.get_mut(..len).ok_or(Error::Capacity {
            requested: len,
            capacity: NVM_LEN,
        })?;
        nvm.read(0, blob).map_err(PersistError::Other)?;
        match persist::decode(blob, &mut self.voices) {
            Some(header) => {
                self.set_tempo(i32::from(header.tempo));
                log!(info, "loaded state at {=u16} bpm", header.tempo);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
