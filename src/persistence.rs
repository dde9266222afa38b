use crate::config::{CountConfig, HashingConfig};
use crate::error::{Result, VectorizeError};
use crate::vocabulary::Vocabulary;
use memmap2::Mmap;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Magic bytes for snapshot file identification
pub const MAGIC: &[u8; 4] = b"TVEC";

/// Current snapshot layout version
pub const FORMAT_VERSION: u16 = 1;

/// Persisted state of a vectorizer
///
/// The tokenizer is stored as its configuration and recompiled on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u16,
    pub state: SnapshotState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnapshotState {
    Hashing {
        config: HashingConfig,
    },
    Count {
        config: CountConfig,
        vocabulary: Option<Vocabulary>,
    },
}

impl Snapshot {
    pub fn hashing(config: HashingConfig) -> Self {
        Self {
            version: FORMAT_VERSION,
            state: SnapshotState::Hashing { config },
        }
    }

    pub fn count(config: CountConfig, vocabulary: Option<Vocabulary>) -> Self {
        Self {
            version: FORMAT_VERSION,
            state: SnapshotState::Count { config, vocabulary },
        }
    }
}

/// Magic bytes followed by the bincode payload
pub fn encode_snapshot(snapshot: &Snapshot) -> Result<Vec<u8>> {
    let config = bincode::config::standard();
    let encoded = bincode::serde::encode_to_vec(snapshot, config)
        .map_err(|e| VectorizeError::Serialization(e.to_string()))?;

    let mut bytes = Vec::with_capacity(MAGIC.len() + encoded.len());
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&encoded);
    Ok(bytes)
}

/// Decode a snapshot produced by [`encode_snapshot`]
pub fn decode_snapshot(bytes: &[u8]) -> Result<Snapshot> {
    if bytes.len() < MAGIC.len() || &bytes[..MAGIC.len()] != MAGIC {
        return Err(VectorizeError::InvalidSnapshotFormat(
            "Invalid magic bytes".to_string(),
        ));
    }

    let config = bincode::config::standard();
    let (snapshot, _): (Snapshot, _) =
        bincode::serde::decode_from_slice(&bytes[MAGIC.len()..], config)
            .map_err(|e| VectorizeError::Serialization(e.to_string()))?;

    if snapshot.version != FORMAT_VERSION {
        return Err(VectorizeError::InvalidSnapshotFormat(format!(
            "Snapshot version mismatch: expected {}, got {}",
            FORMAT_VERSION, snapshot.version
        )));
    }

    Ok(snapshot)
}

/// Save snapshot to disk
pub fn save_snapshot(snapshot: &Snapshot, path: &Path) -> Result<()> {
    let bytes = encode_snapshot(snapshot)?;

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&bytes)?;
    writer.flush()?;

    log::debug!("wrote {} byte snapshot to {}", bytes.len(), path.display());
    Ok(())
}

/// Load snapshot from disk
pub fn load_snapshot(path: &Path) -> Result<Snapshot> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    decode_snapshot(&bytes)
}

/// Load snapshot using memory mapping, for large vocabularies
pub fn load_snapshot_mmap(path: &Path) -> Result<Snapshot> {
    let file = File::open(path)?;
    // SAFETY: the map is read-only and dropped before returning; the
    // decoded snapshot owns all of its data.
    let mmap = unsafe { Mmap::map(&file)? };
    decode_snapshot(&mmap)
}

/// Check if a snapshot file exists and starts with the magic bytes
pub fn snapshot_exists(path: &Path) -> bool {
    if !path.exists() {
        return false;
    }

    if let Ok(file) = File::open(path) {
        let mut reader = BufReader::new(file);
        let mut magic = [0u8; 4];
        if reader.read_exact(&mut magic).is_ok() {
            return &magic == MAGIC;
        }
    }

    false
}
