use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use drum_trigger_core::{Cmd, Knob};

/// one keyboard row per voice, one key per step
const ROWS: [&str; 4] = ["1234", "qwer", "asdf", "zxcv"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Cmd(Cmd),
    Quit,
}

/// map a key to the switch or encoder it stands in for
pub fn action(event: KeyEvent) -> Option<Action> {
    if event.kind != KeyEventKind::Press {
        return None;
    }
    let cmd = match event.code {
        KeyCode::Esc => return Some(Action::Quit),
        KeyCode::Char('c') if event.modifiers.contains(KeyModifiers::CONTROL) => {
            return Some(Action::Quit)
        }
        KeyCode::Char(' ') => Cmd::Transport,
        KeyCode::Tab => Cmd::Mode,
        KeyCode::Enter => Cmd::Reverse,
        KeyCode::Up => Cmd::Encoder(Knob::Tempo, 1),
        KeyCode::Down => Cmd::Encoder(Knob::Tempo, -1),
        KeyCode::Right => Cmd::Encoder(Knob::RangeLength, 1),
        KeyCode::Left => Cmd::Encoder(Knob::RangeLength, -1),
        KeyCode::Char(']') => Cmd::Encoder(Knob::RangeStart, 1),
        KeyCode::Char('[') => Cmd::Encoder(Knob::RangeStart, -1),
        KeyCode::Char(c) => {
            let c = c.to_ascii_lowercase();
            let (voice, step) = ROWS
                .iter()
                .enumerate()
                .find_map(|(voice, row)| Some((voice, row.find(c)?)))?;
            Cmd::Toggle { voice, step }
        }
        _ => return None,
    };
    Some(Action::Cmd(cmd))
}
