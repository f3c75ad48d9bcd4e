//! cyclic step position over an adjustable window

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

impl core::ops::Not for Direction {
    type Output = Self;

    fn not(self) -> Self {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }
}

/// free-running stepper over `range_start..range_end` within `0..space`
///
/// The window holds at least one step whenever `space >= 2`. Range edits
/// clamp and never touch `current`, so `current` may sit outside the window
/// until the next [`advance`](Self::advance), which always lands back inside
/// it.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Playhead {
    current: usize,
    range_start: usize,
    /// exclusive
    range_end: usize,
    direction: Direction,
    space: usize,
}

impl Playhead {
    /// playhead at `range.start`, moving forward; the range is clamped into
    /// `0..=space - 1` and widened to one step if empty
    pub fn new(space: usize, range: core::ops::Range<usize>) -> Self {
        let limit = space.saturating_sub(1);
        let range_start = range.start.min(limit.saturating_sub(1));
        let range_end = range.end.min(limit).max((range_start + 1).min(limit));
        Self {
            current: range_start,
            range_start,
            range_end,
            direction: Direction::Forward,
            space,
        }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn range(&self) -> core::ops::Range<usize> {
        self.range_start..self.range_end
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn space(&self) -> usize {
        self.space
    }

    /// step once in `direction`, wrapping inside the window
    pub fn advance(&mut self) -> usize {
        let (start, end) = (self.range_start, self.range_end);
        self.current = if start == end {
            start
        } else {
            match self.direction {
                Direction::Forward => {
                    let next = self.current + 1;
                    if next < start || next >= end {
                        start
                    } else {
                        next
                    }
                }
                Direction::Backward => {
                    if self.current <= start || self.current > end {
                        end - 1
                    } else {
                        self.current - 1
                    }
                }
            }
        };
        self.current
    }

    pub fn reverse(&mut self) {
        self.direction = !self.direction;
    }

    pub fn reset(&mut self) {
        self.current = self.range_start;
    }

    /// slide the whole window by `delta`, saturating at either end of the space
    pub fn adjust_range_start(&mut self, delta: isize) {
        let len = self.range_end - self.range_start;
        let max_start = self.space.saturating_sub(1) - len;
        let start = self.range_start.saturating_add_signed(delta).min(max_start);
        self.range_start = start;
        self.range_end = start + len;
    }

    /// move the window end by `delta`, keeping at least one step and
    /// saturating at `space - 1`
    pub fn adjust_range_length(&mut self, delta: isize) {
        let limit = self.space.saturating_sub(1);
        self.range_end = self
            .range_end
            .saturating_add_signed(delta)
            .min(limit)
            .max((self.range_start + 1).min(limit));
    }
}
