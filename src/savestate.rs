use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::vcslib::{BusStuffMasks, ReadHandshake, VcsLib};

#[derive(Debug, Error)]
pub enum SaveStateError {
    #[error("save state i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("save state encoding: {0}")]
    Encoding(#[from] bincode::Error),
    #[error("save state version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeSaveState {
    pub version: u32,
    pub stuff_mask_a: u8,
    pub stuff_mask_x: u8,
    pub stuff_mask_y: u8,
    pub waiting_for_read: bool,
    pub waiting_for_read_address: u16,
    pub current_address: u16,
    pub current_value: u8,
}

impl BridgeSaveState {
    pub const CURRENT_VERSION: u32 = 1;

    pub fn to_bytes(&self) -> Result<Vec<u8>, SaveStateError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, SaveStateError> {
        let state: BridgeSaveState = bincode::deserialize(data)?;
        if state.version > Self::CURRENT_VERSION {
            return Err(SaveStateError::UnsupportedVersion {
                found: state.version,
                supported: Self::CURRENT_VERSION,
            });
        }
        Ok(state)
    }

    pub fn save_to_file(&self, filename: &str) -> Result<(), SaveStateError> {
        std::fs::write(filename, self.to_bytes()?)?;
        log::info!("Bridge state written to: {}", filename);
        Ok(())
    }

    pub fn load_from_file(filename: &str) -> Result<Self, SaveStateError> {
        let data = std::fs::read(filename)?;
        let state = Self::from_bytes(&data)?;
        log::info!("Bridge state loaded from: {}", filename);
        Ok(state)
    }
}

impl VcsLib {
    pub fn save_state(&self) -> BridgeSaveState {
        let (waiting_for_read, waiting_for_read_address) = match self.handshake {
            ReadHandshake::Idle => (false, 0),
            ReadHandshake::AwaitingRead(address) => (true, address),
        };

        BridgeSaveState {
            version: BridgeSaveState::CURRENT_VERSION,
            stuff_mask_a: self.stuff_masks.a,
            stuff_mask_x: self.stuff_masks.x,
            stuff_mask_y: self.stuff_masks.y,
            waiting_for_read,
            waiting_for_read_address,
            current_address: self.current_address,
            current_value: self.current_value,
        }
    }

    pub fn load_state(&mut self, state: &BridgeSaveState) {
        self.stuff_masks = BusStuffMasks {
            a: state.stuff_mask_a,
            x: state.stuff_mask_x,
            y: state.stuff_mask_y,
        };
        self.handshake = if state.waiting_for_read {
            ReadHandshake::AwaitingRead(state.waiting_for_read_address)
        } else {
            ReadHandshake::Idle
        };
        self.current_address = state.current_address;
        self.current_value = state.current_value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_survives_serialization() {
        let mut lib = VcsLib::new();
        lib.set_stuff_masks(BusStuffMasks { a: 1, x: 2, y: 3 });
        lib.handshake = ReadHandshake::AwaitingRead(0x0284);
        lib.update_bus(0x1F00, 0xEA);

        let bytes = lib.save_state().to_bytes().unwrap();
        let mut restored = VcsLib::new();
        restored.load_state(&BridgeSaveState::from_bytes(&bytes).unwrap());

        assert_eq!(restored.stuff_masks(), BusStuffMasks { a: 1, x: 2, y: 3 });
        assert_eq!(restored.handshake(), ReadHandshake::AwaitingRead(0x0284));
        assert_eq!(restored.bus_latch(), (0x1F00, 0xEA));
    }

    #[test]
    fn test_newer_version_is_rejected() {
        let mut state = VcsLib::new().save_state();
        state.version = BridgeSaveState::CURRENT_VERSION + 1;
        let bytes = bincode::serialize(&state).unwrap();

        assert!(matches!(
            BridgeSaveState::from_bytes(&bytes),
            Err(SaveStateError::UnsupportedVersion { found: 2, supported: 1 })
        ));
    }

    #[test]
    fn test_truncated_data_is_an_error() {
        let bytes = VcsLib::new().save_state().to_bytes().unwrap();
        assert!(matches!(
            BridgeSaveState::from_bytes(&bytes[..3]),
            Err(SaveStateError::Encoding(_))
        ));
    }

    #[test]
    fn test_file_round_trip() {
        let path = std::env::temp_dir().join(format!("vcs-bridge-{}.state", std::process::id()));
        let path = path.to_str().unwrap();

        let mut lib = VcsLib::new();
        lib.update_bus(0x0080, 0x42);
        lib.save_state().save_to_file(path).unwrap();
        let state = BridgeSaveState::load_from_file(path).unwrap();
        std::fs::remove_file(path).unwrap();

        assert_eq!(state, lib.save_state());
    }
}
