//! Per-category CSV tables that accumulate rows across a week of runs.
//!
//! Writes are append, dedup (first occurrence wins), then a whole-file
//! replace through a temp file, so a crash mid-run never leaves a
//! half-written table behind.

pub mod state;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use csv::StringRecord;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};

use cardinals_common::{CardinalsError, Category};

pub use state::{CycleState, StateStore};

/// Unique-identifier columns, in order of preference.
const KEY_COLUMNS: &[&str] = &["LinkedIn", "URL"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    /// Rows in the table now that weren't there before.
    pub added: usize,
    pub total: usize,
    pub duplicates_removed: usize,
}

/// A header row plus records aligned to it.
struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Append `other`, matching columns by name. Unknown columns are added.
    fn extend(&mut self, other: Table) {
        for header in &other.headers {
            if self.column(header).is_none() {
                self.headers.push(header.clone());
            }
        }
        let width = self.headers.len();
        for row in &mut self.rows {
            row.resize(width, String::new());
        }

        let mapping: Vec<Option<usize>> = other.headers.iter().map(|h| self.column(h)).collect();
        for row in other.rows {
            let mut aligned = vec![String::new(); width];
            for (value, target) in row.into_iter().zip(&mapping) {
                if let Some(i) = target {
                    aligned[*i] = value;
                }
            }
            self.rows.push(aligned);
        }
    }

    /// Drop later rows repeating an earlier key. Returns how many were dropped.
    fn dedup_by(&mut self, key: usize) -> usize {
        let before = self.rows.len();
        let mut seen: HashSet<String> = HashSet::new();
        self.rows.retain(|row| seen.insert(row[key].clone()));
        before - self.rows.len()
    }
}

pub struct AccumulationStore {
    dir: PathBuf,
}

impl AccumulationStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, category: Category) -> PathBuf {
        self.dir.join(category.file_name())
    }

    /// Merge `rows` into the category table, deduplicating on the table's
    /// key column. Writing the same batch twice leaves the table as one
    /// write would.
    pub fn write_category<T: Serialize>(
        &self,
        category: Category,
        rows: &[T],
    ) -> Result<WriteSummary> {
        let path = self.path_for(category);
        if rows.is_empty() {
            let total = self.row_count(category);
            info!(%category, total, "No new rows, table untouched");
            return Ok(WriteSummary {
                total,
                ..Default::default()
            });
        }

        let incoming = serialize_rows(rows)?;
        let mut table = match load_table(&path) {
            Some(existing) => existing,
            None => Table {
                headers: Vec::new(),
                rows: Vec::new(),
            },
        };
        let existing = table.rows.len();
        table.extend(incoming);

        let duplicates_removed = match KEY_COLUMNS.iter().find_map(|k| table.column(k)) {
            Some(key) => table.dedup_by(key),
            None => {
                warn!(%category, "No URL or LinkedIn column, writing without dedup");
                0
            }
        };

        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create data dir {}", self.dir.display()))
            .and_then(|()| write_table(&path, &table))
            .map_err(|e| CardinalsError::Persistence(format!("{category}: {e:#}")))?;

        let summary = WriteSummary {
            added: table.rows.len().saturating_sub(existing),
            total: table.rows.len(),
            duplicates_removed,
        };
        info!(
            %category,
            added = summary.added,
            total = summary.total,
            duplicates = summary.duplicates_removed,
            "Category table written"
        );
        Ok(summary)
    }

    /// Every row of the category table. Missing or unreadable tables read as
    /// empty; rows that don't fit `T` are skipped.
    pub fn read_category<T: DeserializeOwned>(&self, category: Category) -> Vec<T> {
        let path = self.path_for(category);
        if !path.exists() {
            return Vec::new();
        }
        let mut reader = match csv::ReaderBuilder::new().flexible(true).from_path(&path) {
            Ok(r) => r,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unreadable table, treating as empty");
                return Vec::new();
            }
        };

        let mut out = Vec::new();
        for (line, record) in reader.deserialize::<T>().enumerate() {
            match record {
                Ok(row) => out.push(row),
                Err(e) => warn!(%category, line = line + 2, error = %e, "Skipping malformed row"),
            }
        }
        out
    }

    pub fn row_count(&self, category: Category) -> usize {
        load_table(&self.path_for(category)).map_or(0, |t| t.rows.len())
    }

    /// Delete every category table. Only called after a confirmed send.
    pub fn reset_all_categories(&self) -> Result<Vec<Category>> {
        let mut removed = Vec::new();
        for category in Category::ALL {
            let path = self.path_for(category);
            if path.exists() {
                fs::remove_file(&path)
                    .with_context(|| format!("Failed to delete {}", path.display()))?;
                removed.push(category);
            }
        }
        info!(removed = removed.len(), "Category tables reset");
        Ok(removed)
    }
}

fn serialize_rows<T: Serialize>(rows: &[T]) -> Result<Table> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row).context("Failed to serialize row")?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow!("Failed to flush rows: {}", e.error()))?;
    parse_table(bytes.as_slice()).context("Failed to re-read serialized rows")
}

fn parse_table<R: std::io::Read>(source: R) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(source);
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let width = headers.len();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record: StringRecord = record?;
        let mut row: Vec<String> = record.iter().map(str::to_string).collect();
        row.resize(width, String::new());
        rows.push(row);
    }
    Ok(Table { headers, rows })
}

/// Existing table, or `None` when absent, empty or corrupt.
fn load_table(path: &Path) -> Option<Table> {
    if !path.exists() {
        return None;
    }
    let parsed = fs::File::open(path)
        .map_err(anyhow::Error::from)
        .and_then(parse_table);
    match parsed {
        Ok(table) if table.headers.iter().any(|h| !h.is_empty()) => Some(table),
        Ok(_) => {
            warn!(path = %path.display(), "Empty table, treating as no prior data");
            None
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Corrupt table, treating as no prior data");
            None
        }
    }
}

fn write_table(path: &Path, table: &Table) -> Result<()> {
    let tmp = path.with_extension("csv.tmp");
    {
        let mut writer = csv::Writer::from_path(&tmp)
            .with_context(|| format!("Failed to create {}", tmp.display()))?;
        writer.write_record(&table.headers)?;
        for row in &table.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
    }
    fs::rename(&tmp, path).with_context(|| format!("Failed to replace {}", path.display()))
}

/// Replace `path` with `bytes` via a sibling temp file.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, bytes).with_context(|| format!("Failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("Failed to replace {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardinals_common::{CuratedItem, ExpertItem};

    fn item(url: &str, title: &str) -> CuratedItem {
        CuratedItem {
            title: title.to_string(),
            organization: "fund.org".to_string(),
            description: "Climate funding".to_string(),
            date_info: "none found".to_string(),
            deadline: "none found".to_string(),
            url: url.to_string(),
        }
    }

    fn expert(url: &str, name: &str) -> ExpertItem {
        ExpertItem {
            name: name.to_string(),
            role: "—".to_string(),
            organization: "—".to_string(),
            linkedin: url.to_string(),
        }
    }

    #[test]
    fn writing_twice_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = AccumulationStore::new(dir.path());
        let rows = vec![item("https://a.org", "A"), item("https://b.org", "B")];

        let first = store.write_category(Category::Grants, &rows).unwrap();
        assert_eq!(first.added, 2);
        let before = fs::read_to_string(store.path_for(Category::Grants)).unwrap();

        let second = store.write_category(Category::Grants, &rows).unwrap();
        assert_eq!(second.added, 0);
        assert_eq!(second.total, 2);
        assert_eq!(second.duplicates_removed, 2);
        let after = fs::read_to_string(store.path_for(Category::Grants)).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn first_occurrence_wins() {
        let dir = tempfile::tempdir().unwrap();
        let store = AccumulationStore::new(dir.path());
        store
            .write_category(Category::Events, &[item("https://a.org", "Old title")])
            .unwrap();
        store
            .write_category(
                Category::Events,
                &[item("https://a.org", "New title"), item("https://c.org", "C")],
            )
            .unwrap();

        let rows: Vec<CuratedItem> = store.read_category(Category::Events);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].title, "Old title");
        assert_eq!(rows[1].url, "https://c.org");
    }

    #[test]
    fn experts_dedup_on_linkedin() {
        let dir = tempfile::tempdir().unwrap();
        let store = AccumulationStore::new(dir.path());
        let summary = store
            .write_category(
                Category::Experts,
                &[
                    expert("https://linkedin.com/in/a", "Ann Lee"),
                    expert("https://linkedin.com/in/a", "Ann Lee"),
                    expert("https://linkedin.com/in/b", "Bo Kim"),
                ],
            )
            .unwrap();
        assert_eq!(summary.total, 2);
        let header = fs::read_to_string(store.path_for(Category::Experts)).unwrap();
        assert!(header.starts_with("Name,Role,Organization,LinkedIn"));
    }

    #[test]
    fn table_without_key_column_is_kept_whole() {
        #[derive(Serialize)]
        struct Note {
            text: String,
        }
        let dir = tempfile::tempdir().unwrap();
        let store = AccumulationStore::new(dir.path());
        let note = Note {
            text: "same".to_string(),
        };
        let summary = store
            .write_category(Category::Reports, &[&note, &note])
            .unwrap();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.duplicates_removed, 0);
    }

    #[test]
    fn corrupt_or_empty_table_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let store = AccumulationStore::new(dir.path());
        let path = store.path_for(Category::Grants);

        fs::write(&path, "").unwrap();
        let summary = store
            .write_category(Category::Grants, &[item("https://a.org", "A")])
            .unwrap();
        assert_eq!(summary.total, 1);

        fs::write(&path, [0xff, 0xfe, b'\n', 0x80]).unwrap();
        let summary = store
            .write_category(Category::Grants, &[item("https://b.org", "B")])
            .unwrap();
        assert_eq!(summary.total, 1);
        let rows: Vec<CuratedItem> = store.read_category(Category::Grants);
        assert_eq!(rows[0].url, "https://b.org");
    }

    #[test]
    fn empty_batch_leaves_table_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let store = AccumulationStore::new(dir.path());
        let empty: Vec<CuratedItem> = Vec::new();
        let summary = store.write_category(Category::Grants, &empty).unwrap();
        assert_eq!(summary, WriteSummary::default());
        assert!(!store.path_for(Category::Grants).exists());
    }

    #[test]
    fn older_tables_with_extra_columns_are_aligned() {
        let dir = tempfile::tempdir().unwrap();
        let store = AccumulationStore::new(dir.path());
        fs::write(
            store.path_for(Category::Grants),
            "URL,Title,Source\nhttps://a.org,A,manual\n",
        )
        .unwrap();
        let summary = store
            .write_category(Category::Grants, &[item("https://a.org", "dup"), item("https://b.org", "B")])
            .unwrap();
        assert_eq!(summary.total, 2);
        let text = fs::read_to_string(store.path_for(Category::Grants)).unwrap();
        assert!(text.starts_with("URL,Title,Source,Organization"));
    }

    #[test]
    fn reset_removes_every_table() {
        let dir = tempfile::tempdir().unwrap();
        let store = AccumulationStore::new(dir.path());
        store
            .write_category(Category::Grants, &[item("https://a.org", "A")])
            .unwrap();
        store
            .write_category(Category::Experts, &[expert("https://linkedin.com/in/a", "Ann Lee")])
            .unwrap();

        let removed = store.reset_all_categories().unwrap();
        assert_eq!(removed, vec![Category::Grants, Category::Experts]);
        for category in Category::ALL {
            assert_eq!(store.row_count(category), 0);
        }
    }

    #[test]
    fn unwritable_data_dir_is_a_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocked = dir.path().join("blocked");
        fs::write(&blocked, "not a directory").unwrap();
        let store = AccumulationStore::new(&blocked);

        let err = store
            .write_category(Category::Grants, &[item("https://a.org", "A")])
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CardinalsError>(),
            Some(CardinalsError::Persistence(_))
        ));
    }

    #[test]
    fn write_atomic_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");
        write_atomic(&path, b"one").unwrap();
        write_atomic(&path, b"two").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "two");
        assert!(!dir.path().join("nested").join("state.json.tmp").exists());
    }
}
