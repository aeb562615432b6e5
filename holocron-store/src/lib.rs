//! CSV-backed store of harvested posts and comments.
//!
//! The store is two flat files loaded once at the start of a run, mutated in
//! memory by [`Store::merge`], and overwritten wholesale by [`Store::persist`].
//! Files missing on disk load as empty tables; files written before the
//! `series`/`shares`/`reblogs` columns existed load with those columns defaulted.
use holocron_common::records::{COMMENT_COLUMNS, POST_COLUMNS};
use holocron_common::{Batch, CommentRecord, HolocronError, PostRecord, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub mod merge;

pub use merge::{MergeStats, merge_batch};

/// Locations of the two store files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    pub posts: PathBuf,
    pub comments: PathBuf,
}

impl StorePaths {
    pub fn new(posts: impl Into<PathBuf>, comments: impl Into<PathBuf>) -> Self {
        Self {
            posts: posts.into(),
            comments: comments.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Store {
    pub posts: Vec<PostRecord>,
    pub comments: Vec<CommentRecord>,
}

impl Store {
    /// Read both tables, treating missing files as empty.
    pub fn load(paths: &StorePaths) -> Result<Self> {
        let posts = read_table::<PostRecord>(&paths.posts)?;
        let comments = read_table::<CommentRecord>(&paths.comments)?;
        tracing::info!(
            posts_file=%paths.posts.display(),
            comments_file=%paths.comments.display(),
            posts=posts.len(),
            comments=comments.len(),
            "store.load"
        );
        Ok(Self { posts, comments })
    }

    /// Upsert a batch; see [`merge_batch`].
    pub fn merge(&mut self, batch: Batch) -> MergeStats {
        let stats = merge_batch(&mut self.posts, &mut self.comments, batch);
        tracing::debug!(
            inserted = stats.inserted,
            replaced = stats.replaced,
            comments_appended = stats.comments_appended,
            posts = self.posts.len(),
            comments = self.comments.len(),
            "store.merge"
        );
        stats
    }

    /// Overwrite both files with the in-memory tables, headers included.
    pub fn persist(&self, paths: &StorePaths) -> Result<()> {
        write_table(&paths.posts, &POST_COLUMNS, &self.posts)?;
        write_table(&paths.comments, &COMMENT_COLUMNS, &self.comments)?;
        tracing::info!(
            posts_file=%paths.posts.display(),
            comments_file=%paths.comments.display(),
            posts=self.posts.len(),
            comments=self.comments.len(),
            "store.persist"
        );
        Ok(())
    }
}

fn read_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            tracing::info!(path=%path.display(), "store.load.missing_file");
            return Ok(Vec::new());
        }
        Err(err) => return Err(err.into()),
    };

    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(file);
    reader
        .deserialize()
        .map(|row| row.map_err(|e| csv_error(path, e)))
        .collect()
}

fn write_table<T: Serialize>(path: &Path, header: &[&str], rows: &[T]) -> Result<()> {
    let file = File::create(path)?;
    // Header is written by hand so an empty table still gets one.
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    writer
        .write_record(header)
        .map_err(|e| csv_error(path, e))?;
    for row in rows {
        writer.serialize(row).map_err(|e| csv_error(path, e))?;
    }
    writer.flush()?;
    Ok(())
}

fn csv_error(path: &Path, err: csv::Error) -> HolocronError {
    if err.is_io_error() {
        if let csv::ErrorKind::Io(io) = err.into_kind() {
            return HolocronError::Io(io);
        }
        return HolocronError::Storage(format!("{}: i/o failure", path.display()));
    }
    HolocronError::Storage(format!("{}: {err}", path.display()))
}
