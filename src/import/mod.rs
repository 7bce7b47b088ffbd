//! CSV import: one file in, zero or more catalog entries out.

pub mod normalize;

use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use serde_json::Map;
use tracing::{debug, info};

use crate::catalog::{Broadcast, CatalogStore, Gateway};
use crate::error::{ImportError, SkipReason};

const COL_CID: &str = "CID";
const COL_TITLE: &str = "Title";
const COL_FILE_SIZE: &str = "File Size";
const COL_DATE: &str = "Date";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub added: usize,
    pub malformed: usize,
    pub duplicate: usize,
    pub unreachable: usize,
    pub total: usize,
}

impl ImportSummary {
    fn record_skip(&mut self, reason: &SkipReason) {
        match reason {
            SkipReason::MalformedRow(_) => self.malformed += 1,
            SkipReason::DuplicateIdentifier(_) => self.duplicate += 1,
            SkipReason::UnreachableIdentifier(_) => self.unreachable += 1,
        }
    }

    pub fn skipped(&self) -> usize {
        self.malformed + self.duplicate + self.unreachable
    }

    pub fn print(&self) {
        println!("\nImport completed! Total broadcasts: {}", self.total);
        println!(
            "Added {}, skipped {} ({} malformed, {} duplicate, {} unreachable).",
            self.added,
            self.skipped(),
            self.malformed,
            self.duplicate,
            self.unreachable
        );
    }
}

/// Header positions of the required columns.
struct Columns {
    cid: usize,
    title: usize,
    file_size: usize,
    date: usize,
}

impl Columns {
    fn from_headers(headers: &StringRecord, path: &Path) -> Result<Self, ImportError> {
        let find = |column: &'static str| {
            headers
                .iter()
                .position(|h| h == column)
                .ok_or_else(|| ImportError::MissingColumn {
                    path: path.to_path_buf(),
                    column,
                })
        };
        Ok(Columns {
            cid: find(COL_CID)?,
            title: find(COL_TITLE)?,
            file_size: find(COL_FILE_SIZE)?,
            date: find(COL_DATE)?,
        })
    }

    fn extract<'r>(&self, record: &'r StringRecord) -> Result<RawRow<'r>, SkipReason> {
        let field = |idx: usize, column: &str| {
            record.get(idx).ok_or_else(|| {
                SkipReason::MalformedRow(format!("line {}: no {} field", line_of(record), column))
            })
        };
        Ok(RawRow {
            cid: field(self.cid, COL_CID)?,
            title: field(self.title, COL_TITLE)?,
            file_size: field(self.file_size, COL_FILE_SIZE)?,
            date: field(self.date, COL_DATE)?,
        })
    }
}

struct RawRow<'r> {
    cid: &'r str,
    title: &'r str,
    file_size: &'r str,
    date: &'r str,
}

fn line_of(record: &StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or_default()
}

/// Normalize one row into a catalog entry.
fn build_entry(row: &RawRow) -> Result<Broadcast, SkipReason> {
    let cid = row.cid.trim();
    if cid.is_empty() {
        return Err(SkipReason::MalformedRow("empty CID".to_string()));
    }

    let title = normalize::clean_title(row.title);
    let (media_type, format) = normalize::infer_media(&title);
    let tags = normalize::extract_tags(&title)
        .iter()
        .map(|t| t.as_str().to_string())
        .collect();

    Ok(Broadcast {
        cid: cid.to_string(),
        title,
        file_size: row.file_size.to_string(),
        date_uploaded: normalize::normalize_date(row.date),
        media_type,
        format,
        tags,
        gateway: Gateway::for_cid(cid),
        extra: Map::new(),
    })
}

/// Dedup, validate and insert. The network probe only runs for new CIDs.
fn admit(store: &mut CatalogStore, entry: Broadcast) -> Result<(), SkipReason> {
    if store.contains(&entry.cid) {
        return Err(SkipReason::DuplicateIdentifier(entry.cid));
    }
    if !store.validate_reachability(&entry.cid) {
        return Err(SkipReason::UnreachableIdentifier(entry.cid));
    }
    let cid = entry.cid.clone();
    if store.append(entry) {
        Ok(())
    } else {
        Err(SkipReason::DuplicateIdentifier(cid))
    }
}

/// Import every row of `csv_path` into `store`, then sort and save the catalog.
///
/// Row problems are reported and skipped. Only file-level failures return
/// an error, and in that case nothing is written.
pub fn run(store: &mut CatalogStore, csv_path: &Path) -> Result<ImportSummary, ImportError> {
    let csv_err = |source| ImportError::Csv {
        path: csv_path.to_path_buf(),
        source,
    };

    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::Headers)
        .from_path(csv_path)
        .map_err(csv_err)?;
    let columns = Columns::from_headers(reader.headers().map_err(csv_err)?, csv_path)?;

    info!(
        csv = ?csv_path,
        catalog = ?store.path(),
        validate = store.validates_reachability(),
        "importing broadcasts"
    );

    let mut summary = ImportSummary::default();
    for result in reader.records() {
        let record = match result {
            Ok(r) => r,
            Err(e) if matches!(e.kind(), csv::ErrorKind::Io(_)) => return Err(csv_err(e)),
            Err(e) => {
                let reason = SkipReason::MalformedRow(e.to_string());
                println!("Skipped ({}): {}", reason.kind(), reason);
                summary.record_skip(&reason);
                continue;
            }
        };

        let outcome = columns
            .extract(&record)
            .and_then(|row| build_entry(&row))
            .map(|entry| (entry.title.clone(), entry))
            .and_then(|(title, entry)| admit(store, entry).map(|_| title));

        match outcome {
            Ok(title) => {
                summary.added += 1;
                println!("Added: {}", title);
            }
            Err(reason) => {
                let label = record
                    .get(columns.title)
                    .map(normalize::clean_title)
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| format!("line {}", line_of(&record)));
                debug!(%reason, line = line_of(&record), "row skipped");
                println!("Skipped ({}): {}", reason.kind(), label);
                summary.record_skip(&reason);
            }
        }
    }

    store.sort_by_date_descending();
    store.save()?;
    summary.total = store.len();
    info!(
        added = summary.added,
        skipped = summary.skipped(),
        total = summary.total,
        "import finished"
    );
    Ok(summary)
}
