use drum_trigger_core::{Nvm, NVM_LEN};
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

/// fixed-size byte file standing in for microcontroller nvm
///
/// A missing or short file reads as zeros, like erased storage that never
/// held a valid header.
pub struct FileNvm {
    path: PathBuf,
}

impl FileNvm {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn contents(&self) -> std::io::Result<Vec<u8>> {
        let mut bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e),
        };
        bytes.resize(NVM_LEN, 0);
        Ok(bytes)
    }
}

impl embedded_io::ErrorType for FileNvm {
    type Error = std::io::Error;
}

impl Nvm for FileNvm {
    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<(), Self::Error> {
        let bytes = self.contents()?;
        let src = bytes
            .get(offset..offset + buf.len())
            .ok_or_else(|| std::io::Error::new(ErrorKind::UnexpectedEof, "read past nvm end"))?;
        buf.copy_from_slice(src);
        Ok(())
    }

    /// patch the image and swap it in with a rename so a crash never leaves
    /// a half-written file
    fn write(&mut self, offset: usize, buf: &[u8]) -> Result<(), Self::Error> {
        let mut bytes = self.contents()?;
        bytes
            .get_mut(offset..offset + buf.len())
            .ok_or_else(|| std::io::Error::new(ErrorKind::WriteZero, "write past nvm end"))?
            .copy_from_slice(buf);
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, &bytes)?;
        std::fs::rename(&tmp, &self.path)?;
        tracing::debug!(path = %self.path.display(), len = buf.len(), "nvm written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_reads_as_zeros() {
        let dir = tempfile::tempdir().unwrap();
        let mut nvm = FileNvm::new(dir.path().join("nvm"));
        let mut buf = [0xaa; 8];
        nvm.read(0, &mut buf).unwrap();
        assert_eq!(buf, [0; 8]);
    }

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nvm");
        let mut nvm = FileNvm::new(&path);
        nvm.write(2, &[1, 2, 3]).unwrap();
        assert_eq!(std::fs::read(&path).unwrap().len(), NVM_LEN);

        let mut buf = [0xaa; 6];
        FileNvm::new(&path).read(0, &mut buf).unwrap();
        assert_eq!(buf, [0, 0, 1, 2, 3, 0]);
    }

    #[test]
    fn bounds() {
        let dir = tempfile::tempdir().unwrap();
        let mut nvm = FileNvm::new(dir.path().join("nvm"));
        assert!(nvm.write(NVM_LEN - 1, &[1, 2]).is_err());
        assert!(nvm.read(NVM_LEN, &mut [0]).is_err());
    }

    #[test]
    fn sequencer_roundtrip() {
        use drum_trigger_core::Cmd;

        let dir = tempfile::tempdir().unwrap();
        let mut nvm = FileNvm::new(dir.path().join("nvm"));
        let mut seq = crate::config::Config::default().sequencer().unwrap();
        assert!(!seq.load(&mut nvm).unwrap());

        seq.cmd(Cmd::Toggle { voice: 1, step: 3 }, 0).unwrap();
        seq.set_tempo(133);
        seq.save(&mut nvm).unwrap();

        let mut restored = crate::config::Config::default().sequencer().unwrap();
        assert!(restored.load(&mut nvm).unwrap());
        assert_eq!(restored.tempo(), 133);
        assert_eq!(restored.voices, seq.voices);
    }
}
