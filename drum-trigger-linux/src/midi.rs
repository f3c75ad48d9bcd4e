use color_eyre::eyre::{eyre, Result};
use drum_trigger_core::Trigger;
use midir::{MidiOutput, MidiOutputConnection};
use midly::{
    live::LiveEvent,
    num::{u4, u7},
    MidiMessage,
};

/// general midi percussion channel (10, zero-based)
const DRUM_CHANNEL: u8 = 9;
const VELOCITY: u8 = 120;

pub fn note_message(note: u8, on: bool) -> Vec<u8> {
    let key = u7::new(note.min(127));
    let message = if on {
        MidiMessage::NoteOn {
            key,
            vel: u7::new(VELOCITY),
        }
    } else {
        MidiMessage::NoteOff {
            key,
            vel: u7::new(0),
        }
    };
    let event = LiveEvent::Midi {
        channel: u4::new(DRUM_CHANNEL),
        message,
    };
    let mut buf = Vec::with_capacity(3);
    // writing into a vec cannot fail
    let _ = event.write_std(&mut buf);
    buf
}

/// fires drum hits as note-on/note-off pairs
pub struct MidiTrigger {
    conn: Option<MidiOutputConnection>,
}

impl MidiTrigger {
    /// connect to the first output port whose name contains `filter`;
    /// without one, hits are only logged
    pub fn connect(filter: Option<&str>) -> Result<Self> {
        let output = MidiOutput::new("drum-trigger")?;
        let ports = output.ports();
        let port = ports.iter().find(|p| {
            output
                .port_name(p)
                .is_ok_and(|name| filter.is_none_or(|f| name.contains(f)))
        });
        let Some(port) = port else {
            tracing::warn!(?filter, "no midi output port, hits are logged only");
            return Ok(Self { conn: None });
        };
        let name = output.port_name(port)?;
        let conn = output
            .connect(port, "drum-trigger-out")
            .map_err(|e| eyre!("connecting to {name}: {e}"))?;
        tracing::info!(port = %name, "midi connected");
        Ok(Self { conn: Some(conn) })
    }
}

impl Trigger for MidiTrigger {
    fn trigger(&mut self, note: u8) {
        tracing::trace!(note, "hit");
        if let Some(conn) = self.conn.as_mut() {
            for on in [true, false] {
                if let Err(e) = conn.send(&note_message(note, on)) {
                    tracing::warn!(%e, note, "midi send failed");
                }
            }
        }
    }
}
