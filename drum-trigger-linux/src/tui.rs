use crate::{
    leds::{led_index, Chain},
    Sequencer,
};

use drum_trigger_core::{Direction, Display};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::Stylize,
    text::{Line, Span, Text},
    widgets::{Block, Padding, Paragraph, Widget},
};

/// front panel: segment display, transport, and the led grid as latched
/// by the chain
pub struct Panel<'a> {
    pub seq: &'a Sequencer,
    pub chain: &'a Chain,
    /// step that fired last, marked on the grid
    pub step: Option<usize>,
}

impl Panel<'_> {
    fn segment(&self) -> String {
        match self.seq.display() {
            Display::Tempo(bpm) => format!("{bpm:>4}"),
            Display::Edit => "Edit".to_string(),
        }
    }

    fn status(&self) -> Line<'static> {
        let transport = if self.seq.is_playing() {
            "play".bold()
        } else {
            "stop".dim()
        };
        let direction = match self.seq.playhead.direction() {
            Direction::Forward => ">>",
            Direction::Backward => "<<",
        };
        let range = self.seq.playhead.range();
        Line::from(vec![
            transport,
            Span::raw(format!(" {direction} {}..{}", range.start, range.end)),
        ])
    }

    fn grid(&self) -> Text<'static> {
        let steps = self.seq.steps();
        let range = self.seq.playhead.range();
        let mut lines = Vec::with_capacity(self.seq.voices.len() + 1);
        for (v, voice) in self.seq.voices.iter().enumerate() {
            let mut spans = vec![Span::raw(format!("{:<5}", voice.name.as_str()))];
            for step in 0..steps {
                let lamp = if self.chain.lit(led_index(v, step, steps)) {
                    "o"
                } else {
                    "."
                };
                let span = Span::raw(lamp);
                spans.push(if self.step == Some(step) {
                    span.reversed()
                } else {
                    span
                });
            }
            lines.push(Line::from(spans));
        }
        let marks: String = (0..steps)
            .map(|step| if range.contains(&step) { '^' } else { ' ' })
            .collect();
        lines.push(Line::raw(format!("{:<5}{marks}", "")));
        Text::from(lines)
    }
}

impl Widget for Panel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let [display_area, status_area, grid_area] =
            Layout::vertical(Constraint::from_lengths([3, 1, 6])).areas(area);
        let [display_area] = Layout::horizontal([Constraint::Length(8)]).areas(display_area);

        Paragraph::new(self.segment())
            .block(Block::bordered().padding(Padding::horizontal(1)))
            .render(display_area, buf);
        Paragraph::new(self.status()).render(status_area, buf);
        Paragraph::new(self.grid())
            .block(Block::new().padding(Padding::top(1)))
            .render(grid_area, buf);
    }
}
