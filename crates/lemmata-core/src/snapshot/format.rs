//! Snapshot file format.
//!
//! A fixed-size header (magic bytes, format version, flags, counts) is
//! followed by the JSON-serialized snapshot and a trailing SHA-256 over
//! header and payload.

use std::io::{self, Read, Write};
use std::path::Path;

use sha2::{Digest, Sha256};
use thiserror::Error;

use super::Snapshot;
use crate::path::NodePath;

/// Magic bytes identifying a snapshot file: "LMS\0"
pub const MAGIC: [u8; 4] = [0x4c, 0x4d, 0x53, 0x00];

/// 4 (magic) + 3 (version) + 1 (flags) + 8*3 (node count, edge count, payload length)
const HEADER_SIZE: usize = 32;

const HASH_SIZE: usize = 32;

/// Errors from assembling, reading, or writing snapshots.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("invalid magic bytes: expected LMS\\0")]
    InvalidMagic,

    #[error("unsupported snapshot format version {major}.{minor}.{patch}")]
    UnsupportedVersion { major: u8, minor: u8, patch: u8 },

    #[error("content hash mismatch: snapshot is corrupted")]
    HashMismatch,

    #[error("header counts ({nodes} nodes, {edges} edges) do not match payload")]
    CountMismatch { nodes: u64, edges: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("file too small to be a valid snapshot")]
    FileTooSmall,

    #[error("path {0} is already present in the snapshot")]
    DuplicatePath(NodePath),
}

/// Snapshot format version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatVersion {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl FormatVersion {
    pub const CURRENT: FormatVersion = FormatVersion {
        major: 0,
        minor: 1,
        patch: 0,
    };

    /// Same major version, and no newer minor than we understand.
    pub fn is_compatible(&self) -> bool {
        self.major == Self::CURRENT.major && self.minor <= Self::CURRENT.minor
    }
}

impl std::fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Header flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotFlags {
    bits: u8,
}

impl SnapshotFlags {
    pub const NONE: SnapshotFlags = SnapshotFlags { bits: 0 };

    /// Payload carries resolved narrations.
    pub const HAS_NARRATIONS: u8 = 0x01;

    /// Payload references nodes of other libraries.
    pub const HAS_EXTERNAL: u8 = 0x02;

    pub fn new(bits: u8) -> Self {
        Self { bits }
    }

    pub fn has(&self, flag: u8) -> bool {
        self.bits & flag != 0
    }

    pub fn set(&mut self, flag: u8) {
        self.bits |= flag;
    }

    pub fn bits(&self) -> u8 {
        self.bits
    }
}

/// A snapshot file: header metadata plus the snapshot.
#[derive(Debug)]
pub struct SnapshotFile {
    pub version: FormatVersion,
    pub flags: SnapshotFlags,
    pub snapshot: Snapshot,
}

impl SnapshotFile {
    pub fn new(snapshot: Snapshot) -> Self {
        let mut flags = SnapshotFlags::NONE;
        if snapshot.narrations().next().is_some() {
            flags.set(SnapshotFlags::HAS_NARRATIONS);
        }
        if snapshot.external().next().is_some() {
            flags.set(SnapshotFlags::HAS_EXTERNAL);
        }
        Self {
            version: FormatVersion::CURRENT,
            flags,
            snapshot,
        }
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), SnapshotError> {
        let payload = serde_json::to_vec(&self.snapshot)
            .map_err(|e| SnapshotError::Serialization(e.to_string()))?;

        let mut header = Vec::with_capacity(HEADER_SIZE);
        header.extend_from_slice(&MAGIC);
        header.extend_from_slice(&[self.version.major, self.version.minor, self.version.patch]);
        header.push(self.flags.bits());
        for val in [
            self.snapshot.node_count() as u64,
            self.snapshot.edge_count() as u64,
            payload.len() as u64,
        ] {
            header.extend_from_slice(&val.to_le_bytes());
        }

        let mut hasher = Sha256::new();
        hasher.update(&header);
        hasher.update(&payload);
        let hash: [u8; 32] = hasher.finalize().into();

        writer.write_all(&header)?;
        writer.write_all(&payload)?;
        writer.write_all(&hash)?;
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        let mut buf = Vec::new();
        self.write_to(&mut buf)?;
        Ok(buf)
    }

    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self, SnapshotError> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes(&data)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, SnapshotError> {
        if data.len() < HEADER_SIZE + HASH_SIZE {
            return Err(SnapshotError::FileTooSmall);
        }
        if data[0..4] != MAGIC {
            return Err(SnapshotError::InvalidMagic);
        }

        let version = FormatVersion {
            major: data[4],
            minor: data[5],
            patch: data[6],
        };
        if !version.is_compatible() {
            return Err(SnapshotError::UnsupportedVersion {
                major: version.major,
                minor: version.minor,
                patch: version.patch,
            });
        }
        let flags = SnapshotFlags::new(data[7]);

        let node_count = read_u64(data, 8);
        let edge_count = read_u64(data, 16);
        let payload_len = read_u64(data, 24) as usize;

        let payload_end = HEADER_SIZE
            .checked_add(payload_len)
            .ok_or(SnapshotError::FileTooSmall)?;
        if data.len() < payload_end + HASH_SIZE {
            return Err(SnapshotError::FileTooSmall);
        }

        let stored_hash = &data[payload_end..payload_end + HASH_SIZE];
        let mut hasher = Sha256::new();
        hasher.update(&data[..payload_end]);
        let computed: [u8; 32] = hasher.finalize().into();
        if computed != stored_hash {
            return Err(SnapshotError::HashMismatch);
        }

        let snapshot: Snapshot = serde_json::from_slice(&data[HEADER_SIZE..payload_end])
            .map_err(|e| SnapshotError::Serialization(e.to_string()))?;
        if snapshot.node_count() as u64 != node_count || snapshot.edge_count() as u64 != edge_count
        {
            return Err(SnapshotError::CountMismatch {
                nodes: node_count,
                edges: edge_count,
            });
        }

        Ok(Self {
            version,
            flags,
            snapshot,
        })
    }

    /// Write to a file on disk.
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Read from a file on disk.
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let data = std::fs::read(path)?;
        Self::from_bytes(&data)
    }
}

fn read_u64(data: &[u8], offset: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&data[offset..offset + 8]);
    u64::from_le_bytes(buf)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::graph::node::{Node, NodeKind, FIELD_BODY};
    use crate::graph::ModuleGraph;
    use crate::path::Version;

    fn sample() -> Snapshot {
        let v = Version::new(1, 2, 0);
        let m = NodePath::parse("notes").unwrap();
        let mut g = ModuleGraph::new(m.clone(), v.clone());
        g.add_node(
            Node::new(NodeKind::Annotation, m.child("Intro"), v.clone())
                .with_field(FIELD_BODY, "See <chart:\"x\">\n  ok"),
            None,
        )
        .unwrap();
        let mut snap = Snapshot::new("notes", v);
        snap.add_module(&g, &BTreeMap::new(), Vec::new()).unwrap();
        snap
    }

    #[test]
    fn round_trip() {
        let file = SnapshotFile::new(sample());
        let bytes = file.to_bytes().unwrap();
        assert_eq!(&bytes[0..4], &MAGIC);
        let back = SnapshotFile::from_bytes(&bytes).unwrap();
        assert_eq!(back.snapshot, file.snapshot);
        assert_eq!(back.version, FormatVersion::CURRENT);
        assert!(!back.flags.has(SnapshotFlags::HAS_EXTERNAL));
    }

    #[test]
    fn detects_corruption() {
        let mut bytes = SnapshotFile::new(sample()).to_bytes().unwrap();
        let mid = HEADER_SIZE + 5;
        bytes[mid] ^= 0xff;
        assert!(matches!(
            SnapshotFile::from_bytes(&bytes),
            Err(SnapshotError::HashMismatch)
        ));
    }

    #[test]
    fn rejects_bad_magic_and_short_input() {
        let mut bytes = SnapshotFile::new(sample()).to_bytes().unwrap();
        bytes[0] = b'X';
        assert!(matches!(
            SnapshotFile::from_bytes(&bytes),
            Err(SnapshotError::InvalidMagic)
        ));
        assert!(matches!(
            SnapshotFile::from_bytes(&[0u8; 10]),
            Err(SnapshotError::FileTooSmall)
        ));
    }

    #[test]
    fn rejects_newer_format() {
        let mut bytes = SnapshotFile::new(sample()).to_bytes().unwrap();
        bytes[4] = 9;
        assert!(matches!(
            SnapshotFile::from_bytes(&bytes),
            Err(SnapshotError::UnsupportedVersion { major: 9, .. })
        ));
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lib.lms");
        SnapshotFile::new(sample()).save(&path).unwrap();
        let back = SnapshotFile::load(&path).unwrap();
        assert_eq!(back.snapshot.library(), "notes");
    }
}
