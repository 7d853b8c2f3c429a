use std::fmt;

/// Chunk identifiers used by the save-state and persistent-RAM envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkId {
    Memory = 0,
    Cpu = 1,
    Timer = 2,
    Mbc = 3,
    Apu = 4,
    Ppu = 5,
    MbcSave = 6,
    Serial = 7,
}

/// Failures that can occur while parsing a cartridge header or loading a
/// snapshot. The core never raises an error across its per-cycle step
/// boundary (see the propagation policy); this type is only ever returned
/// from the explicit load/parse entry points.
#[derive(Debug)]
pub enum LoadError {
    InvalidMagic,
    UnsupportedVersion { found: u32, max_supported: u32 },
    ChecksumMismatch { expected: u8, found: u8 },
    TruncatedHeader,
    TruncatedChunk { id: ChunkId, expected: u32, available: u32 },
    MissingChunk { id: ChunkId },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::InvalidMagic => write!(f, "invalid save-state magic"),
            LoadError::UnsupportedVersion { found, max_supported } => write!(
                f,
                "save-state version {} is newer than the supported {}",
                found, max_supported
            ),
            LoadError::ChecksumMismatch { expected, found } => write!(
                f,
                "save-state header checksum {:#04x} does not match loaded ROM checksum {:#04x}",
                found, expected
            ),
            LoadError::TruncatedHeader => write!(f, "cartridge image is too short to contain a header"),
            LoadError::TruncatedChunk { id, expected, available } => write!(
                f,
                "chunk {:?} expects {} bytes but only {} are available",
                id, expected, available
            ),
            LoadError::MissingChunk { id } => write!(f, "snapshot is missing required chunk {:?}", id),
        }
    }
}

impl std::error::Error for LoadError {}
