//! Single-file CBOR snapshot for durable stores.

use crate::error::{StorageError, StorageResult};
use crate::model::{LedgerEntry, UserRecord};
use crate::store::Tables;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct SnapshotImage {
    version: u32,
    users: Vec<UserRecord>,
    ledger: Vec<LedgerEntry>,
}

/// A snapshot file holding both tables.
///
/// # Durability
///
/// - `save()` writes a sibling temporary file, syncs it and renames it over
///   the snapshot, so a crash leaves either the old or the new image.
/// - A missing or zero-length file loads as empty tables.
#[derive(Debug)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    /// Opens a snapshot at `path`, creating parent directories if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if directories cannot be created.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Returns the snapshot path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the tables stored in the snapshot.
    ///
    /// # Errors
    ///
    /// Returns `Corrupted` if the file cannot be decoded, has an unknown
    /// version, or holds records that break model invariants.
    pub fn load(&self) -> StorageResult<Tables> {
        if !self.path.exists() || fs::metadata(&self.path)?.len() == 0 {
            return Ok(Tables::default());
        }

        let reader = BufReader::new(File::open(&self.path)?);
        let image: SnapshotImage = ciborium::from_reader(reader)
            .map_err(|e| StorageError::Corrupted(format!("{}: {e}", self.path.display())))?;

        if image.version != SNAPSHOT_VERSION {
            return Err(StorageError::Corrupted(format!(
                "unsupported snapshot version {} (expected {SNAPSHOT_VERSION})",
                image.version
            )));
        }

        let mut tables = Tables::default();
        for user in image.users {
            user.validate()
                .map_err(|e| StorageError::Corrupted(e.to_string()))?;
            tables.users.insert(user.id, user);
        }
        for entry in image.ledger {
            entry
                .validate()
                .map_err(|e| StorageError::Corrupted(e.to_string()))?;
            tables.ledger.insert(entry.key.clone(), entry);
        }
        Ok(tables)
    }

    /// Replaces the snapshot with `tables`.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or any file operation fails. The
    /// previous snapshot is left intact in that case.
    pub fn save(&self, tables: &Tables) -> StorageResult<()> {
        let image = SnapshotImage {
            version: SNAPSHOT_VERSION,
            users: tables.users.values().cloned().collect(),
            ledger: tables.ledger.values().cloned().collect(),
        };

        let tmp_path = self.tmp_path();
        let mut writer = BufWriter::new(File::create(&tmp_path)?);
        ciborium::into_writer(&image, &mut writer)
            .map_err(|e| StorageError::Codec(e.to_string()))?;
        writer.flush()?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
