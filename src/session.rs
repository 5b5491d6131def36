//! Session files.
//!
//! A session is a YAML document listing the sequences and the tracks to
//! display. Region tracks list their regions per sequence; numeric tracks
//! list one value per position; sequence tracks show the residues of the
//! sequences themselves.
//!
//! ```yaml
//! sequences:
//!   - name: chr1_promoter
//!     start: 1000
//!     end: 1999
//!     tss: 1500
//! tracks:
//!   - kind: region
//!     name: motifs
//!     regions:
//!       chr1_promoter:
//!         - { start: 1100, end: 1110, type: MA0001, score: 4.2, strand: direct }
//!   - kind: numeric
//!     name: conservation
//!     values:
//!       chr1_promoter: [0.1, 0.4, 0.9]
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{
    DataStore, Dataset, NumericTrack, Orientation, Region, RegionTrack, Sequence, SequenceTrack,
    Strand,
};

/// Errors that can occur while reading a session.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Failed to read session {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid session file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Session has no sequences")]
    NoSequences,

    #[error("Track '{track}' refers to unknown sequence '{sequence}'")]
    UnknownSequence { track: String, sequence: String },

    #[error("Duplicate sequence name '{0}'")]
    DuplicateSequence(String),

    #[error("Loading cancelled")]
    Cancelled,
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceEntry {
    pub name: String,
    pub start: i64,
    pub end: i64,
    #[serde(default)]
    pub orientation: Orientation,
    #[serde(default)]
    pub tss: Option<i64>,
    #[serde(default)]
    pub tes: Option<i64>,
    #[serde(default)]
    pub residues: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionEntry {
    pub start: i64,
    pub end: i64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub strand: Strand,
    #[serde(default)]
    pub residues: Option<String>,
    #[serde(default)]
    pub children: Vec<RegionEntry>,
}

impl RegionEntry {
    fn to_region(&self) -> Region {
        let mut region = Region::new(self.start, self.end, self.kind.clone())
            .with_score(self.score)
            .with_strand(self.strand)
            .with_children(self.children.iter().map(RegionEntry::to_region).collect());
        region.residues = self.residues.clone();
        region
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TrackEntry {
    Region {
        name: String,
        #[serde(default)]
        regions: BTreeMap<String, Vec<RegionEntry>>,
    },
    Numeric {
        name: String,
        #[serde(default)]
        values: BTreeMap<String, Vec<f64>>,
    },
    Sequence {
        name: String,
    },
}

impl TrackEntry {
    pub fn name(&self) -> &str {
        match self {
            TrackEntry::Region { name, .. } => name,
            TrackEntry::Numeric { name, .. } => name,
            TrackEntry::Sequence { name } => name,
        }
    }
}

/// Parsed content of a session file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionFile {
    #[serde(default)]
    pub sequences: Vec<SequenceEntry>,
    #[serde(default)]
    pub tracks: Vec<TrackEntry>,
}

impl SessionFile {
    /// Number of regions over every track, children excluded.
    pub fn region_count(&self) -> usize {
        self.tracks
            .iter()
            .map(|track| match track {
                TrackEntry::Region { regions, .. } => regions.values().map(Vec::len).sum(),
                _ => 0,
            })
            .sum()
    }

    /// Builds a data store, checking `is_cancelled` between tracks.
    pub fn build_store(&self, is_cancelled: impl Fn() -> bool) -> SessionResult<DataStore> {
        if self.sequences.is_empty() {
            return Err(SessionError::NoSequences);
        }

        let mut store = DataStore::new();
        for entry in &self.sequences {
            if store.sequence(&entry.name).is_some() {
                return Err(SessionError::DuplicateSequence(entry.name.clone()));
            }
            let mut sequence = Sequence::new(entry.name.clone(), entry.start, entry.end)
                .with_orientation(entry.orientation);
            sequence.tss = entry.tss;
            sequence.tes = entry.tes;
            sequence.residues = entry.residues.clone();
            store.add_sequence(sequence);
        }

        for track in &self.tracks {
            if is_cancelled() {
                return Err(SessionError::Cancelled);
            }
            self.add_track(&mut store, track)?;
        }

        Ok(store)
    }

    fn add_track(&self, store: &mut DataStore, track: &TrackEntry) -> SessionResult<()> {
        let unknown = |sequence: &str| SessionError::UnknownSequence {
            track: track.name().to_string(),
            sequence: sequence.to_string(),
        };

        match track {
            TrackEntry::Region { name, regions } => {
                store.add_track(Dataset::Region(RegionTrack::new(name.clone())));
                for (sequence, entries) in regions {
                    if store.sequence(sequence).is_none() {
                        return Err(unknown(sequence));
                    }
                    for entry in entries {
                        store.insert_region(name, sequence, entry.to_region());
                    }
                }
            }
            TrackEntry::Numeric { name, values } => {
                let mut numeric = NumericTrack::new(name.clone());
                for (sequence, values) in values {
                    if store.sequence(sequence).is_none() {
                        return Err(unknown(sequence));
                    }
                    numeric.set_values(sequence.clone(), values.clone());
                }
                store.add_track(Dataset::Numeric(numeric));
            }
            TrackEntry::Sequence { name } => {
                store.add_track(Dataset::Sequence(SequenceTrack { name: name.clone() }));
            }
        }
        Ok(())
    }
}

/// Parses a session from YAML text.
pub fn parse_session_str(text: &str) -> SessionResult<SessionFile> {
    Ok(serde_yaml::from_str(text)?)
}

/// Reads and parses a session file.
pub fn read_session<P: AsRef<Path>>(path: P) -> SessionResult<SessionFile> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| SessionError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_session_str(&text)
}

/// Reads a session file and builds its data store.
pub fn load_session<P: AsRef<Path>>(path: P) -> SessionResult<DataStore> {
    read_session(path)?.build_store(|| false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RegionSource;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SESSION: &str = "
sequences:
  - name: seq1
    start: 1000
    end: 1999
    tss: 1500
  - name: seq2
    start: 0
    end: 9
    orientation: reverse
    residues: ACGTACGTAC
tracks:
  - kind: region
    name: motifs
    regions:
      seq1:
        - { start: 1100, end: 1110, type: MA0001, score: 4.2, strand: direct }
        - start: 1200
          end: 1300
          type: module
          children:
            - { start: 1200, end: 1210, type: m1 }
            - { start: 1290, end: 1300, type: m2, strand: reverse }
  - kind: numeric
    name: conservation
    values:
      seq2: [0.1, 0.4, 0.9]
  - kind: sequence
    name: dna
";

    #[test]
    fn test_parse_and_build() {
        let session = parse_session_str(SESSION).unwrap();
        assert_eq!(session.sequences.len(), 2);
        assert_eq!(session.tracks.len(), 3);
        assert_eq!(session.region_count(), 2);

        let store = session.build_store(|| false).unwrap();
        let seq2 = store.sequence("seq2").unwrap();
        assert_eq!(seq2.orientation, Orientation::Reverse);
        assert_eq!(seq2.residue_at(1), Some('C'));
        assert_eq!(store.sequence("seq1").unwrap().tss, Some(1500));

        let ids = store.region_ids("motifs", "seq1");
        assert_eq!(ids.len(), 2);
        let module = store.region(ids[1]).unwrap();
        assert_eq!(module.children.len(), 2);
        assert_eq!(module.children[1].strand, Strand::Reverse);
        assert_eq!(store.region(ids[0]).unwrap().score, 4.2);

        match store.track("conservation") {
            Some(Dataset::Numeric(track)) => assert_eq!(track.value_at("seq2", 2), Some(0.9)),
            other => panic!("unexpected track {:?}", other),
        }
        assert!(matches!(store.track("dna"), Some(Dataset::Sequence(_))));
    }

    #[test]
    fn test_unknown_sequence() {
        let text = "
sequences:
  - { name: seq1, start: 0, end: 10 }
tracks:
  - kind: region
    name: motifs
    regions:
      nope:
        - { start: 1, end: 2, type: a }
";
        let err = parse_session_str(text).unwrap().build_store(|| false).unwrap_err();
        assert!(matches!(err, SessionError::UnknownSequence { .. }));
    }

    #[test]
    fn test_structural_errors() {
        let empty = parse_session_str("tracks: []").unwrap();
        assert!(matches!(empty.build_store(|| false), Err(SessionError::NoSequences)));

        let duplicate = parse_session_str(
            "sequences:\n  - { name: a, start: 0, end: 1 }\n  - { name: a, start: 0, end: 1 }\n",
        )
        .unwrap();
        assert!(matches!(
            duplicate.build_store(|| false),
            Err(SessionError::DuplicateSequence(_))
        ));

        assert!(matches!(parse_session_str("tracks: 3"), Err(SessionError::Yaml(_))));
    }

    #[test]
    fn test_cancelled() {
        let session = parse_session_str(SESSION).unwrap();
        assert!(matches!(session.build_store(|| true), Err(SessionError::Cancelled)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", SESSION).unwrap();
        let store = load_session(file.path()).unwrap();
        assert_eq!(store.sequences().len(), 2);

        assert!(matches!(
            load_session("/nonexistent/session.yaml"),
            Err(SessionError::Io { .. })
        ));
    }
}
