//! The persisted broadcast catalog.
//!
//! One JSON document holds every broadcast entry. The store loads it once,
//! mutates it in memory and writes the whole document back on `save`.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::CatalogError;
use crate::gateway::{self, Reachability};

pub const DEFAULT_CATALOG_PATH: &str = "data/broadcasts.json";

const PROJECT: &str = "CousinFM Community Data Hub";
const DESCRIPTION: &str = "Archive of CousinFM radio broadcasts and related media";
const VERSION: &str = "1.0.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogDocument {
    pub project: String,
    pub description: String,
    pub version: String,
    pub last_updated: String,
    pub broadcasts: Vec<Broadcast>,
    /// Top-level fields this tool does not manage, kept as found.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CatalogDocument {
    pub fn fresh() -> Self {
        CatalogDocument {
            project: PROJECT.to_string(),
            description: DESCRIPTION.to_string(),
            version: VERSION.to_string(),
            last_updated: today(),
            broadcasts: Vec::new(),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Broadcast {
    pub cid: String,
    pub title: String,
    pub file_size: String,
    pub date_uploaded: String,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub format: MediaFormat,
    /// Stored labels. Imports only derive `Tag` values, but older entries may
    /// carry anything.
    #[serde(default)]
    pub tags: Vec<String>,
    pub gateway: Gateway,
    /// Entry fields this tool does not manage, kept as found.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Audio,
    Video,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaFormat {
    Mp3,
    Mp4,
}

/// Category labels, declared in the order they are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Vinyl,
    Mix,
    Broadcast,
    Test,
    Live,
    Special,
    Revisited,
    Collaboration,
}

impl Tag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tag::Vinyl => "vinyl",
            Tag::Mix => "mix",
            Tag::Broadcast => "broadcast",
            Tag::Test => "test",
            Tag::Live => "live",
            Tag::Special => "special",
            Tag::Revisited => "revisited",
            Tag::Collaboration => "collaboration",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Access hints derived from the CID. Not authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gateway {
    pub ipfs: String,
    pub dweb: String,
    #[serde(flatten)]
    pub other: BTreeMap<String, String>,
}

impl Gateway {
    pub fn for_cid(cid: &str) -> Self {
        Gateway {
            ipfs: gateway::ipfs_url(cid),
            dweb: gateway::dweb_url(cid),
            other: BTreeMap::new(),
        }
    }
}

pub fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

pub struct CatalogStore {
    path: PathBuf,
    document: CatalogDocument,
    cids: HashSet<String>,
    probe: Option<Box<dyn Reachability>>,
}

impl CatalogStore {
    /// Load the catalog at `path`, or start a fresh one if the file does not exist.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, CatalogError> {
        let path = path.into();
        let document = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str::<CatalogDocument>(&raw).map_err(|source| {
                CatalogError::Corrupt {
                    path: path.clone(),
                    source,
                }
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = ?path, "no catalog found, starting a new one");
                CatalogDocument::fresh()
            }
            Err(source) => {
                return Err(CatalogError::Io {
                    action: "read",
                    path,
                    source,
                })
            }
        };

        let mut cids = HashSet::with_capacity(document.broadcasts.len());
        for b in &document.broadcasts {
            if !cids.insert(b.cid.clone()) {
                warn!(cid = %b.cid, "catalog already contains a duplicate CID");
            }
        }
        debug!(path = ?path, broadcasts = document.broadcasts.len(), "catalog loaded");

        Ok(CatalogStore {
            path,
            document,
            cids,
            probe: None,
        })
    }

    /// Attach a reachability probe. Without one, every CID counts as reachable.
    pub fn with_probe(mut self, probe: Box<dyn Reachability>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn document(&self) -> &CatalogDocument {
        &self.document
    }

    pub fn broadcasts(&self) -> &[Broadcast] {
        &self.document.broadcasts
    }

    pub fn len(&self) -> usize {
        self.document.broadcasts.len()
    }

    pub fn contains(&self, cid: &str) -> bool {
        self.cids.contains(cid)
    }

    pub fn validates_reachability(&self) -> bool {
        self.probe.is_some()
    }

    /// Best-effort liveness check. Never errors; any failure reads as `false`.
    pub fn validate_reachability(&self, cid: &str) -> bool {
        match &self.probe {
            Some(probe) => {
                let outcome = probe.probe(cid);
                if !outcome.is_reachable() {
                    warn!(%cid, ?outcome, "CID validation failed");
                }
                outcome.is_reachable()
            }
            None => true,
        }
    }

    /// Insert `entry` unless its CID is already present.
    pub fn append(&mut self, entry: Broadcast) -> bool {
        if !self.cids.insert(entry.cid.clone()) {
            return false;
        }
        self.document.broadcasts.push(entry);
        self.document.last_updated = today();
        true
    }

    pub fn sort_by_date_descending(&mut self) {
        self.document
            .broadcasts
            .sort_by(|a, b| b.date_uploaded.cmp(&a.date_uploaded));
    }

    /// Write the whole document, replacing the previous file via rename.
    pub fn save(&self) -> Result<(), CatalogError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|source| CatalogError::Io {
                action: "create directory for",
                path: self.path.clone(),
                source,
            })?;
        }

        let mut payload = serde_json::to_string_pretty(&self.document)?;
        payload.push('\n');

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, payload).map_err(|source| CatalogError::Io {
            action: "write",
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &self.path).map_err(|source| CatalogError::Io {
            action: "replace",
            path: self.path.clone(),
            source,
        })?;
        debug!(path = ?self.path, broadcasts = self.len(), "catalog saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::ProbeOutcome;
    use tempfile::TempDir;

    struct AlwaysDown;

    impl Reachability for AlwaysDown {
        fn probe(&self, _cid: &str) -> ProbeOutcome {
            ProbeOutcome::Failed("timed out".into())
        }
    }

    fn entry(cid: &str, date: &str) -> Broadcast {
        Broadcast {
            cid: cid.to_string(),
            title: format!("Broadcast {}", cid),
            file_size: "42 MB".to_string(),
            date_uploaded: date.to_string(),
            media_type: MediaType::Audio,
            format: MediaFormat::Mp3,
            tags: vec![Tag::Broadcast.to_string()],
            gateway: Gateway::for_cid(cid),
            extra: Map::new(),
        }
    }

    fn setup() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data").join("broadcasts.json");
        (dir, path)
    }

    #[test]
    fn missing_file_gives_fresh_document() {
        let (_dir, path) = setup();
        let store = CatalogStore::load(&path).unwrap();
        assert_eq!(store.len(), 0);
        assert_eq!(store.document().project, "CousinFM Community Data Hub");
        assert_eq!(store.document().version, "1.0.0");
        assert_eq!(store.document().last_updated, today());
        assert!(!path.exists());
    }

    #[test]
    fn corrupt_file_is_an_error_and_left_alone() {
        let (_dir, path) = setup();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{ not json").unwrap();

        let err = CatalogStore::load(&path).err().unwrap();
        assert!(matches!(err, CatalogError::Corrupt { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn wrong_shape_is_corrupt() {
        let (_dir, path) = setup();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, r#"{"project": "x", "broadcasts": "nope"}"#).unwrap();
        assert!(matches!(
            CatalogStore::load(&path),
            Err(CatalogError::Corrupt { .. })
        ));
    }

    #[test]
    fn append_skips_known_cids() {
        let (_dir, path) = setup();
        let mut store = CatalogStore::load(&path).unwrap();
        store.document.last_updated = "2000-01-01".into();

        assert!(store.append(entry("QmA", "2024-01-01")));
        assert_eq!(store.document().last_updated, today());
        assert!(store.contains("QmA"));

        store.document.last_updated = "2000-01-01".into();
        assert!(!store.append(entry("QmA", "2024-02-02")));
        assert_eq!(store.len(), 1);
        assert_eq!(store.document().last_updated, "2000-01-01");
    }

    #[test]
    fn sort_is_descending_and_stable() {
        let (_dir, path) = setup();
        let mut store = CatalogStore::load(&path).unwrap();
        store.append(entry("QmOld", "2023-05-01"));
        store.append(entry("QmFirst", "2024-03-05"));
        store.append(entry("QmNew", "2024-12-31"));
        store.append(entry("QmSecond", "2024-03-05"));
        store.sort_by_date_descending();

        let order: Vec<&str> = store.broadcasts().iter().map(|b| b.cid.as_str()).collect();
        assert_eq!(order, vec!["QmNew", "QmFirst", "QmSecond", "QmOld"]);
    }

    #[test]
    fn save_then_load_keeps_everything() {
        let (_dir, path) = setup();
        let mut store = CatalogStore::load(&path).unwrap();
        store.document.extra.insert("maintainer".into(), Value::from("cousin"));
        let mut e = entry("QmA", "2024-01-01");
        e.gateway
            .other
            .insert("cloudflare".into(), "https://cf-ipfs.com/ipfs/QmA".into());
        e.extra
            .insert("description".into(), Value::from("hand-written notes"));
        store.append(e);
        store.save().unwrap();

        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        assert!(!PathBuf::from(tmp).exists());

        let reloaded = CatalogStore::load(&path).unwrap();
        assert_eq!(reloaded.document(), store.document());
        assert!(reloaded.contains("QmA"));
        assert_eq!(
            reloaded.broadcasts()[0].extra["description"],
            "hand-written notes"
        );
    }

    #[test]
    fn hand_edited_entries_survive_a_save() {
        let (_dir, path) = setup();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(
            &path,
            r#"{
  "project": "CousinFM Community Data Hub",
  "description": "Archive of CousinFM radio broadcasts and related media",
  "version": "1.0.0",
  "lastUpdated": "2024-01-01",
  "broadcasts": [
    {
      "cid": "QmAmbient",
      "title": "Late Night Drift",
      "fileSize": "70 MB",
      "dateUploaded": "2024-01-01",
      "type": "audio",
      "format": "mp3",
      "tags": ["ambient", "live"],
      "gateway": {
        "ipfs": "https://ipfs.io/ipfs/QmAmbient",
        "dweb": "dweb:/ipfs/QmAmbient"
      },
      "description": "hand-written notes"
    }
  ]
}"#,
        )
        .unwrap();

        let store = CatalogStore::load(&path).unwrap();
        assert_eq!(store.broadcasts()[0].tags, vec!["ambient", "live"]);
        store.save().unwrap();

        let json: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let b = &json["broadcasts"][0];
        assert_eq!(b["description"], "hand-written notes");
        assert_eq!(b["tags"][0], "ambient");
        assert_eq!(b["tags"][1], "live");
    }

    #[test]
    fn saved_json_uses_catalog_field_names() {
        let (_dir, path) = setup();
        let mut store = CatalogStore::load(&path).unwrap();
        store.append(entry("QmA", "2024-01-01"));
        store.save().unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\n  \"lastUpdated\": "));
        let json: Value = serde_json::from_str(&raw).unwrap();
        let b = &json["broadcasts"][0];
        assert_eq!(b["fileSize"], "42 MB");
        assert_eq!(b["dateUploaded"], "2024-01-01");
        assert_eq!(b["type"], "audio");
        assert_eq!(b["format"], "mp3");
        assert_eq!(b["tags"][0], "broadcast");
        assert_eq!(b["gateway"]["ipfs"], "https://ipfs.io/ipfs/QmA");
        assert_eq!(b["gateway"]["dweb"], "dweb:/ipfs/QmA");
    }

    #[test]
    fn reachability_without_probe_passes() {
        let (_dir, path) = setup();
        let store = CatalogStore::load(&path).unwrap();
        assert!(!store.validates_reachability());
        assert!(store.validate_reachability("QmA"));
    }

    #[test]
    fn probe_failure_reads_as_unreachable() {
        let (_dir, path) = setup();
        let store = CatalogStore::load(&path)
            .unwrap()
            .with_probe(Box::new(AlwaysDown));
        assert!(store.validates_reachability());
        assert!(!store.validate_reachability("QmA"));
    }
}
