use crate::{DEFAULT_TEMPO, STEPS_PER_BEAT};

/// monotonic millisecond tick; wraps at `u32::MAX`
pub type Millis = u32;

/// tempo to step-period conversion and drift-damped step scheduling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StepClock {
    tempo: u16,
    steps_per_beat: u16,
    step_millis: Millis,
}

impl Default for StepClock {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPO, STEPS_PER_BEAT)
    }
}

impl StepClock {
    pub fn new(tempo: u16, steps_per_beat: u16) -> Self {
        let mut clock = Self {
            tempo,
            steps_per_beat: steps_per_beat.max(1),
            step_millis: 0,
        };
        clock.set_tempo(tempo);
        clock
    }

    pub fn tempo(&self) -> u16 {
        self.tempo
    }

    pub fn step_millis(&self) -> Millis {
        self.step_millis
    }

    /// retime the step period; range checks are the caller's business
    pub fn set_tempo(&mut self, bpm: u16) {
        self.tempo = bpm;
        let beat_millis = 60_000 / Millis::from(bpm.max(1));
        self.step_millis = beat_millis / Millis::from(self.steps_per_beat);
    }

    /// last-step stamp for which a step is due at `now`
    pub fn primed(&self, now: Millis) -> Millis {
        now.wrapping_sub(self.step_millis)
    }

    /// check for a step boundary since `last_step`
    ///
    /// When one is due, half of the overshoot is carried into the returned
    /// stamp so lateness is damped instead of accumulated.
    pub fn tick(&self, now: Millis, last_step: Millis) -> (bool, Millis) {
        let elapsed = now.wrapping_sub(last_step);
        if elapsed >= self.step_millis {
            let late = elapsed - self.step_millis;
            (true, now.wrapping_sub(late / 2))
        } else {
            (false, last_step)
        }
    }
}
