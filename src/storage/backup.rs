//! Backups of the horse database.
//!
//! A backup is a tar.gz of the database directory plus a SHA-256 checksum,
//! indexed in `backups.json` next to the archives. Backups are taken before the
//! startup orphan purge, when a save cycle fails, and on demand.

use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tar::{Archive, Builder};

const METADATA_FILE: &str = "backups.json";

/// Backup metadata stored next to the archives
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupMetadata {
    /// Unique backup identifier (timestamp-based)
    pub id: String,
    /// Human-readable name (optional)
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub size_bytes: u64,
    pub backup_type: BackupType,
    /// SHA256 checksum for verification
    pub checksum: String,
    pub verified: bool,
    /// Path to backup file (relative to backup directory)
    pub path: PathBuf,
}

/// Why a backup was taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackupType {
    /// Requested by an administrator.
    Manual,
    /// Taken at startup before stale records are purged.
    Startup,
    /// Taken after a failed save, before the retry.
    SaveRecovery,
}

/// Backup retention policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionPolicy {
    /// Keep last N startup backups
    pub startup_count: usize,
    /// Keep last N save-recovery backups
    pub recovery_count: usize,
    /// Keep manual backups forever
    pub keep_manual: bool,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            startup_count: 10,
            recovery_count: 5,
            keep_manual: true,
        }
    }
}

pub struct BackupManager {
    /// Path to database directory
    db_path: PathBuf,
    /// Path to backup storage directory
    backup_path: PathBuf,
    retention: RetentionPolicy,
    backups: HashMap<String, BackupMetadata>,
}

impl BackupManager {
    pub fn new(db_path: PathBuf, backup_path: PathBuf, retention: RetentionPolicy) -> io::Result<Self> {
        fs::create_dir_all(&backup_path)?;

        let mut manager = Self {
            db_path,
            backup_path,
            retention,
            backups: HashMap::new(),
        };
        manager.load_metadata()?;

        Ok(manager)
    }

    fn load_metadata(&mut self) -> io::Result<()> {
        let metadata_path = self.backup_path.join(METADATA_FILE);

        if metadata_path.exists() {
            let contents = fs::read_to_string(&metadata_path)?;
            self.backups = serde_json::from_str(&contents)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        }

        Ok(())
    }

    fn save_metadata(&self) -> io::Result<()> {
        let metadata_path = self.backup_path.join(METADATA_FILE);
        let contents = serde_json::to_string_pretty(&self.backups)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(&metadata_path, contents)?;
        Ok(())
    }

    /// Archive the database directory.
    pub fn create_backup(&mut self, name: Option<String>, backup_type: BackupType) -> io::Result<BackupMetadata> {
        let timestamp = Utc::now();
        let mut id = format!("backup_{}", timestamp.format("%Y%m%d_%H%M%S_%3f"));
        let mut suffix = 1;
        while self.backups.contains_key(&id) {
            suffix += 1;
            id = format!("backup_{}_{}", timestamp.format("%Y%m%d_%H%M%S_%3f"), suffix);
        }
        let filename = format!("{}.tar.gz", id);
        let backup_file = self.backup_path.join(&filename);

        log::info!("Creating backup: {} (type: {:?})", id, backup_type);

        let tar_gz = File::create(&backup_file)?;
        let enc = GzEncoder::new(tar_gz, Compression::default());
        let mut tar = Builder::new(enc);
        tar.append_dir_all("data", &self.db_path)?;

        // Finish the archive before checksumming it.
        let enc = tar.into_inner()?;
        enc.finish()?;

        let checksum = calculate_checksum(&backup_file)?;
        let size_bytes = fs::metadata(&backup_file)?.len();

        let metadata = BackupMetadata {
            id: id.clone(),
            name,
            created_at: timestamp,
            size_bytes,
            backup_type,
            checksum,
            verified: false,
            path: PathBuf::from(&filename),
        };

        self.backups.insert(id.clone(), metadata.clone());
        self.save_metadata()?;

        log::info!("Backup created successfully: {} ({} bytes)", id, size_bytes);

        Ok(metadata)
    }

    /// Recompute the archive checksum and compare it with the recorded one.
    pub fn verify_backup(&mut self, backup_id: &str) -> io::Result<bool> {
        let metadata = self
            .backups
            .get(backup_id)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "Backup not found"))?;

        let backup_file = self.backup_path.join(&metadata.path);
        if !backup_file.exists() {
            return Err(io::Error::new(io::ErrorKind::NotFound, "Backup file missing"));
        }

        let valid = calculate_checksum(&backup_file)? == metadata.checksum;
        if valid {
            log::info!("Backup verification passed: {}", backup_id);
            if let Some(meta) = self.backups.get_mut(backup_id) {
                meta.verified = true;
            }
            self.save_metadata()?;
        } else {
            log::error!("Backup verification FAILED: {} (checksum mismatch)", backup_id);
        }

        Ok(valid)
    }

    /// Unpack a backup under `restore_path`; the database lands in `restore_path/data`.
    pub fn restore_backup(&self, backup_id: &str, restore_path: &Path) -> io::Result<()> {
        let metadata = self
            .backups
            .get(backup_id)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "Backup not found"))?;

        let backup_file = self.backup_path.join(&metadata.path);
        if !backup_file.exists() {
            return Err(io::Error::new(io::ErrorKind::NotFound, "Backup file missing"));
        }

        log::info!("Restoring backup: {} to {:?}", backup_id, restore_path);

        if calculate_checksum(&backup_file)? != metadata.checksum {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "Backup checksum mismatch"));
        }

        fs::create_dir_all(restore_path)?;
        let tar_gz = File::open(&backup_file)?;
        let mut archive = Archive::new(GzDecoder::new(tar_gz));
        archive.unpack(restore_path)?;

        log::info!("Backup restored successfully: {}", backup_id);
        Ok(())
    }

    /// Delete the oldest automatic backups beyond the retention counts. Manual
    /// backups are only removed through [`BackupManager::delete_backup`].
    pub fn apply_retention_policy(&mut self) -> io::Result<Vec<String>> {
        let mut deleted = Vec::new();

        for (backup_type, keep) in [
            (BackupType::Startup, self.retention.startup_count),
            (BackupType::SaveRecovery, self.retention.recovery_count),
        ] {
            let mut of_type: Vec<_> = self
                .backups
                .values()
                .filter(|b| b.backup_type == backup_type)
                .collect();
            of_type.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
            deleted.extend(of_type.iter().skip(keep).map(|b| b.id.clone()));
        }
        for backup_id in &deleted {
            if let Some(metadata) = self.backups.remove(backup_id) {
                let backup_file = self.backup_path.join(&metadata.path);
                if backup_file.exists() {
                    fs::remove_file(&backup_file)?;
                    log::info!("Deleted old backup: {}", backup_id);
                }
            }
        }

        if !deleted.is_empty() {
            self.save_metadata()?;
        }

        Ok(deleted)
    }

    /// All backups, newest first.
    pub fn list_backups(&self) -> Vec<BackupMetadata> {
        let mut backups: Vec<_> = self.backups.values().cloned().collect();
        backups.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        backups
    }

    pub fn get_backup(&self, backup_id: &str) -> Option<&BackupMetadata> {
        self.backups.get(backup_id)
    }

    /// Delete a specific backup. Manual backups are protected when the policy keeps them.
    pub fn delete_backup(&mut self, backup_id: &str) -> io::Result<()> {
        let metadata = self
            .backups
            .remove(backup_id)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "Backup not found"))?;

        if metadata.backup_type == BackupType::Manual && self.retention.keep_manual {
            self.backups.insert(backup_id.to_string(), metadata);
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "Cannot delete manual backups (retention policy)",
            ));
        }

        let backup_file = self.backup_path.join(&metadata.path);
        if backup_file.exists() {
            fs::remove_file(&backup_file)?;
        }

        self.save_metadata()?;
        log::info!("Deleted backup: {}", backup_id);
        Ok(())
    }
}

fn calculate_checksum(path: &Path) -> io::Result<String> {
    use sha2::{Digest, Sha256};

    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0; 8192];

    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}
