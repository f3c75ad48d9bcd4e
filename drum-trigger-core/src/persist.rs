//! byte-exact blob layout for sequencer state
//!
//! `[magic:1][steps:1][tempo:2 LE][voice 0 bytes][voice 1 bytes]...`
//!
//! The voice bytes are positional; only the header describes them. A blob
//! that fails validation is indistinguishable from blank storage.

use crate::{sequencer::Voice, Error, MAGIC, NVM_LEN};
use bytemuck::{Pod, Zeroable};

#[derive(Debug)]
pub enum PersistError<E> {
    Layout(Error),
    Other(E),
}

impl<E> From<Error> for PersistError<E> {
    fn from(value: Error) -> Self {
        Self::Layout(value)
    }
}

impl<E: core::fmt::Debug> core::fmt::Display for PersistError<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PersistError::Layout(e) => write!(f, "layout: {e}"),
            PersistError::Other(e) => write!(f, "storage: {e:?}"),
        }
    }
}

impl<E: core::fmt::Debug> core::error::Error for PersistError<E> {}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct RawHeader {
    magic: u8,
    steps: u8,
    tempo: [u8; 2],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Header {
    pub magic: u8,
    pub steps: u8,
    pub tempo: u16,
}

impl Header {
    pub const LEN: usize = core::mem::size_of::<RawHeader>();

    pub fn new(steps: u8, tempo: u16) -> Self {
        Self {
            magic: MAGIC,
            steps,
            tempo,
        }
    }

    pub fn to_bytes(self) -> [u8; Self::LEN] {
        bytemuck::cast(RawHeader {
            magic: self.magic,
            steps: self.steps,
            tempo: self.tempo.to_le_bytes(),
        })
    }

    pub fn from_bytes(bytes: [u8; Self::LEN]) -> Self {
        let raw: RawHeader = bytemuck::cast(bytes);
        Self {
            magic: raw.magic,
            steps: raw.steps,
            tempo: u16::from_le_bytes(raw.tempo),
        }
    }

    /// whether this header describes a blob written by the current layout
    pub fn is_valid(&self) -> bool {
        self.magic == MAGIC && self.steps != 0 && self.tempo != 0
    }
}

/// total blob length for `voices`
pub fn encoded_len<const BYTES: usize>(voices: &[Voice<BYTES>]) -> usize {
    Header::LEN
        + voices
            .iter()
            .map(|v| v.pattern.byte_len())
            .sum::<usize>()
}

/// serialize tempo, step count and every pattern in order
pub fn encode<const BYTES: usize>(
    tempo: u16,
    steps: u8,
    voices: &[Voice<BYTES>],
) -> Result<heapless::Vec<u8, NVM_LEN>, Error> {
    let len = encoded_len(voices);
    let mut blob = heapless::Vec::new();
    blob.resize_default(len).map_err(|_| Error::Capacity {
        requested: len,
        capacity: NVM_LEN,
    })?;
    blob[..Header::LEN].copy_from_slice(&Header::new(steps, tempo).to_bytes());
    let mut offset = Header::LEN;
    for voice in voices {
        voice.pattern.save_into(&mut blob, offset)?;
        offset += voice.pattern.byte_len();
    }
    Ok(blob)
}

/// validate `buffer` and load every pattern from it
///
/// Returns `None` without touching `voices` when the magic byte is stale,
/// the step count or tempo is zero, the step count disagrees with the
/// voices' pattern length, or the buffer is too short for the layout.
pub fn decode<const BYTES: usize>(buffer: &[u8], voices: &mut [Voice<BYTES>]) -> Option<Header> {
    let header = Header::from_bytes(buffer.get(..Header::LEN)?.try_into().ok()?);
    if !header.is_valid() {
        log!(info, "stored state invalid: magic {=u8:#x}", header.magic);
        return None;
    }
    if voices
        .iter()
        .any(|v| v.pattern.len() != usize::from(header.steps))
    {
        log!(warn, "stored step count {=u8} does not match patterns", header.steps);
        return None;
    }
    if buffer.len() < encoded_len(voices) {
        log!(warn, "stored state truncated");
        return None;
    }

    let mut offset = Header::LEN;
    for voice in voices.iter_mut() {
        // bounds checked above
        voice.pattern.load_from(buffer, offset).ok()?;
        offset += voice.pattern.byte_len();
    }
    Some(header)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BitSequence;

    type Voice = crate::Voice<2>;

    fn voice(name: &str, note: u8, bits: &[bool]) -> Voice {
        Voice::new(name, note, BitSequence::from_bits(bits.iter().copied()).unwrap()).unwrap()
    }

    fn kit() -> [Voice; 2] {
        [
            voice("Bass", 36, &[true, false, false, true]),
            voice("Snar", 38, &[false, true, true, false]),
        ]
    }

    fn blank() -> [Voice; 2] {
        [
            voice("Bass", 36, &[false; 4]),
            voice("Snar", 38, &[false; 4]),
        ]
    }

    #[test]
    fn header_layout() {
        assert_eq!(Header::LEN, 4);
        assert_eq!(Header::new(4, 120).to_bytes(), [MAGIC, 4, 120, 0]);
        assert_eq!(Header::new(16, 0x0190).to_bytes(), [MAGIC, 16, 0x90, 0x01]);
        assert_eq!(
            Header::from_bytes([MAGIC, 16, 0x90, 0x01]),
            Header::new(16, 400)
        );
    }

    #[test]
    fn blob_layout() {
        let blob = encode(120, 4, &kit()).unwrap();
        assert_eq!(&blob[..], &[MAGIC, 4, 120, 0, 0b1001, 0b0110]);
    }

    #[test]
    fn roundtrip() {
        let saved = kit();
        let blob = encode(120, 4, &saved).unwrap();
        let mut voices = blank();
        let header = decode(&blob, &mut voices).unwrap();
        assert_eq!(header.tempo, 120);
        assert_eq!(header.steps, 4);
        assert_eq!(voices[0].pattern, saved[0].pattern);
        assert_eq!(voices[1].pattern, saved[1].pattern);
    }

    #[test]
    fn rejects_wrong_magic() {
        let mut blob = encode(120, 4, &kit()).unwrap();
        blob[0] = MAGIC.wrapping_add(1);
        let mut voices = blank();
        assert_eq!(decode(&blob, &mut voices), None);
        assert!(voices.iter().all(|v| v.pattern.iter().all(|b| !b)));
    }

    #[test]
    fn rejects_zero_fields() {
        let mut voices = blank();
        let blob = encode(0, 4, &kit()).unwrap();
        assert_eq!(decode(&blob, &mut voices), None);
        let mut blob = encode(120, 4, &kit()).unwrap();
        blob[1] = 0;
        assert_eq!(decode(&blob, &mut voices), None);
        assert!(voices.iter().all(|v| v.pattern.iter().all(|b| !b)));
    }

    #[test]
    fn rejects_blank_storage() {
        let mut voices = blank();
        assert_eq!(decode(&[0; NVM_LEN], &mut voices), None);
        assert_eq!(decode(&[0xff; NVM_LEN], &mut voices), None);
        assert_eq!(decode(&[], &mut voices), None);
    }

    #[test]
    fn rejects_step_mismatch() {
        let blob = encode(120, 5, &kit()).unwrap();
        let mut voices = blank();
        assert_eq!(decode(&blob, &mut voices), None);
        assert!(voices.iter().all(|v| v.pattern.iter().all(|b| !b)));
    }

    #[test]
    fn rejects_truncated() {
        let blob = encode(120, 4, &kit()).unwrap();
        let mut voices = blank();
        assert_eq!(decode(&blob[..blob.len() - 1], &mut voices), None);
        assert!(voices.iter().all(|v| v.pattern.iter().all(|b| !b)));
    }

    #[test]
    fn ignores_trailing_bytes() {
        let blob = encode(90, 4, &kit()).unwrap();
        let mut nvm = [0xaa; 32];
        nvm[..blob.len()].copy_from_slice(&blob);
        let mut voices = blank();
        assert_eq!(decode(&nvm, &mut voices), Some(Header::new(4, 90)));
        assert_eq!(voices[1].pattern, kit()[1].pattern);
    }

    #[test]
    fn multi_byte_patterns() {
        let bits: [bool; 12] = core::array::from_fn(|i| i % 3 == 0);
        let saved = [voice("Bass", 36, &bits), voice("Snar", 38, &[true; 12])];
        let blob = encode(200, 12, &saved).unwrap();
        assert_eq!(blob.len(), Header::LEN + 4);
        let mut voices = [voice("Bass", 36, &[false; 12]), voice("Snar", 38, &[false; 12])];
        assert!(decode(&blob, &mut voices).is_some());
        assert_eq!(voices[0].pattern, saved[0].pattern);
        assert_eq!(voices[1].pattern, saved[1].pattern);
    }
}
