use crate::{Sequencer, PATTERN_BYTES, VOICE_COUNT};
use color_eyre::eyre::{eyre, Result, WrapErr};
use drum_trigger_core::{BitSequence, Voice};
use std::path::{Path, PathBuf};

#[derive(Debug, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    /// file standing in for the device nvm
    pub nvm: PathBuf,
    pub log: PathBuf,
    /// substring of the midi output port name; first port if unset
    pub midi_port: Option<String>,
    pub steps: u8,
    pub tempo: u16,
    /// TLC5916 configuration code written at startup
    pub led_config: u8,
    pub voices: Vec<VoiceConfig>,
}

#[derive(Debug, serde::Deserialize)]
pub struct VoiceConfig {
    pub name: String,
    pub note: u8,
    /// one entry per step, nonzero is on; padded with off steps
    #[serde(default)]
    pub pattern: Vec<u8>,
}

impl Default for Config {
    /// classic 808 set on four steps
    fn default() -> Self {
        let voice = |name: &str, note, pattern: [u8; 4]| VoiceConfig {
            name: name.to_string(),
            note,
            pattern: pattern.to_vec(),
        };
        Self {
            nvm: PathBuf::from("drum-trigger.nvm"),
            log: PathBuf::from("drum-trigger.log"),
            midi_port: None,
            steps: 4,
            tempo: drum_trigger_core::DEFAULT_TEMPO,
            led_config: 0xff,
            voices: vec![
                voice("Bass", 36, [1, 0, 0, 0]),
                voice("Snar", 38, [0, 0, 0, 0]),
                voice("LTom", 41, [1, 0, 0, 0]),
                voice("MTom", 43, [0, 0, 0, 0]),
            ],
        }
    }
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let file = std::fs::File::open(path)
                    .wrap_err_with(|| format!("opening kit {}", path.display()))?;
                Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
            }
            None => Ok(Self::default()),
        }
    }

    /// build the sequencer context described by this kit
    pub fn sequencer(&self) -> Result<Sequencer> {
        if self.voices.len() > VOICE_COUNT {
            return Err(eyre!(
                "kit has {} voices, at most {VOICE_COUNT} supported",
                self.voices.len()
            ));
        }
        if usize::from(self.steps) > PATTERN_BYTES * 8 {
            return Err(eyre!(
                "kit has {} steps, at most {} supported",
                self.steps,
                PATTERN_BYTES * 8
            ));
        }
        let mut voices = heapless::Vec::new();
        for voice in &self.voices {
            let bits = voice
                .pattern
                .iter()
                .map(|v| *v != 0)
                .chain(std::iter::repeat(false))
                .take(usize::from(self.steps));
            let pattern = BitSequence::from_bits(bits)?;
            let voice = Voice::new(&voice.name, voice.note, pattern)
                .wrap_err_with(|| format!("voice {:?}", voice.name))?;
            voices
                .push(voice)
                .map_err(|_| eyre!("too many voices"))?;
        }
        let mut seq = Sequencer::new(voices, self.steps)?;
        seq.set_tempo(i32::from(self.tempo));
        Ok(seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_kit() {
        let seq = Config::default().sequencer().unwrap();
        assert_eq!(seq.voices.len(), 4);
        assert_eq!(seq.steps(), 4);
        assert_eq!(seq.tempo(), 120);
        assert_eq!(
            format!("{:?}", seq.voices[2]),
            "Voice(\"LTom\", 41, BitSequence(1,0,0,0))"
        );
    }

    #[test]
    fn parses_partial_kit() {
        let config: Config = serde_json::from_str(
            r#"{
                "steps": 8,
                "tempo": 90,
                "voices": [
                    { "name": "Kick", "note": 36, "pattern": [1, 0, 1] },
                    { "name": "Clap", "note": 39 }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(config.nvm, PathBuf::from("drum-trigger.nvm"));
        let seq = config.sequencer().unwrap();
        assert_eq!(seq.voices.len(), 2);
        assert_eq!(seq.tempo(), 90);
        assert_eq!(seq.voices[0].pattern.as_bytes(), &[0b0000_0101]);
        assert_eq!(seq.voices[1].pattern.len(), 8);
    }

    #[test]
    fn clamps_tempo() {
        let config = Config {
            tempo: 1_000,
            ..Config::default()
        };
        assert_eq!(config.sequencer().unwrap().tempo(), 400);
    }

    #[test]
    fn rejects_oversized_kits() {
        let mut config = Config::default();
        config.steps = 33;
        assert!(config.sequencer().is_err());

        let mut config = Config::default();
        config.voices.push(VoiceConfig {
            name: "Clhh".to_string(),
            note: 42,
            pattern: vec![],
        });
        assert!(config.sequencer().is_err());

        let mut config = Config::default();
        config.voices[0].name = "Bass Drum 1".to_string();
        assert!(config.sequencer().is_err());
    }
}
