//! Validation logic for CStorVolumeReplica specs
//!
//! This module provides fail-fast structural validation at the API boundary:
//! - Block size range and power-of-two check
//! - Compression vocabulary
//! - String-encoded sizes and worker counts
//! - Immutable field changes between spec revisions

use std::str::FromStr;

use crate::controller::error::{Error, Result};
use crate::crd::CStorVolumeReplica;

/// Smallest valid logical block size in bytes
pub const MIN_BLOCK_SIZE: u32 = 512;

/// Largest valid logical block size in bytes (128 KiB)
pub const MAX_BLOCK_SIZE: u32 = 131_072;

/// Compression mode vocabulary for a volume replica.
///
/// The CRD carries the mode as a plain string for wire fidelity; this enum
/// is the closed set that string must parse into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Off,
    On,
    Gzip,
    /// gzip with an explicit level, 1..=9
    GzipLevel(u8),
    Lz4,
    Lzjb,
    Zle,
}

impl FromStr for Compression {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "off" => Ok(Compression::Off),
            "on" => Ok(Compression::On),
            "gzip" => Ok(Compression::Gzip),
            "lz4" => Ok(Compression::Lz4),
            "lzjb" => Ok(Compression::Lzjb),
            "zle" => Ok(Compression::Zle),
            other => {
                if let Some(level) = other.strip_prefix("gzip-") {
                    let level: u8 = level.parse().map_err(|_| {
                        Error::ValidationError(format!("invalid gzip level: {}", other))
                    })?;
                    if (1..=9).contains(&level) {
                        return Ok(Compression::GzipLevel(level));
                    }
                    return Err(Error::ValidationError(format!(
                        "gzip level must be 1-9: {}",
                        other
                    )));
                }
                Err(Error::ValidationError(format!(
                    "unknown compression mode: {} (expected off|on|gzip|gzip-N|lz4|lzjb|zle)",
                    other
                )))
            }
        }
    }
}

impl std::fmt::Display for Compression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Compression::Off => write!(f, "off"),
            Compression::On => write!(f, "on"),
            Compression::Gzip => write!(f, "gzip"),
            Compression::GzipLevel(n) => write!(f, "gzip-{}", n),
            Compression::Lz4 => write!(f, "lz4"),
            Compression::Lzjb => write!(f, "lzjb"),
            Compression::Zle => write!(f, "zle"),
        }
    }
}

/// Validate the replica spec
pub fn validate_spec(cvr: &CStorVolumeReplica) -> Result<()> {
    validate_replica_id(&cvr.spec.replica_id)?;
    validate_block_size(cvr.spec.block_size)?;
    cvr.spec.compression.parse::<Compression>()?;
    validate_capacity(&cvr.spec.capacity)?;
    validate_zvol_workers(&cvr.spec.zvol_workers)?;
    Ok(())
}

/// Validate the logical block size: any power of two from 512 bytes to
/// 128 KiB.
pub fn validate_block_size(block_size: u32) -> Result<()> {
    if !(MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&block_size) {
        return Err(Error::ValidationError(format!(
            "block size {} is outside the range {}..={}",
            block_size, MIN_BLOCK_SIZE, MAX_BLOCK_SIZE
        )));
    }

    if !block_size.is_power_of_two() {
        return Err(Error::ValidationError(format!(
            "block size {} is not a power of two",
            block_size
        )));
    }

    Ok(())
}

/// Validate a string-encoded size (e.g. "5G", "10Gi", "512").
pub fn validate_capacity(capacity: &str) -> Result<u64> {
    if capacity.is_empty() {
        return Err(Error::ValidationError("capacity must not be empty".to_string()));
    }

    let num_end = capacity
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(capacity.len());
    let (num_str, suffix) = capacity.split_at(num_end);

    let num: u64 = num_str
        .parse()
        .map_err(|_| Error::ValidationError(format!("invalid capacity number: {}", capacity)))?;

    match suffix {
        "" | "K" | "M" | "G" | "T" | "Ki" | "Mi" | "Gi" | "Ti" => Ok(num),
        _ => Err(Error::ValidationError(format!(
            "invalid capacity unit: {}",
            capacity
        ))),
    }
}

/// Validate the worker thread count: empty string means the engine default,
/// anything else must be a positive integer.
pub fn validate_zvol_workers(zvol_workers: &str) -> Result<()> {
    if zvol_workers.is_empty() {
        return Ok(());
    }

    let workers: u32 = zvol_workers.parse().map_err(|_| {
        Error::ValidationError(format!("invalid zvol worker count: {}", zvol_workers))
    })?;

    if workers == 0 {
        return Err(Error::ValidationError(
            "zvol worker count must be positive".to_string(),
        ));
    }

    Ok(())
}

/// Validate the replica identifier
fn validate_replica_id(replica_id: &str) -> Result<()> {
    if replica_id.is_empty() {
        return Err(Error::ValidationError(
            "replicaid must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Result of comparing old and new spec
#[derive(Debug, Clone)]
pub struct SpecDiff {
    /// Target endpoint moved (target failover)
    pub target_ip_changed: bool,
    /// Requested capacity changed (resize)
    pub capacity_changed: bool,
    /// Compression mode changed
    pub compression_changed: bool,
    /// Worker thread count changed
    pub zvol_workers_changed: bool,
}

impl SpecDiff {
    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.target_ip_changed
            || self.capacity_changed
            || self.compression_changed
            || self.zvol_workers_changed
    }
}

/// Validate spec changes between old and new replica specs.
///
/// The underlying store cannot change its block size after the first write,
/// and the replica's identity within its replica set is fixed, so both
/// fields are immutable.
pub fn validate_spec_change(
    old: &CStorVolumeReplica,
    new: &CStorVolumeReplica,
) -> Result<SpecDiff> {
    let old_spec = &old.spec;
    let new_spec = &new.spec;

    if old_spec.block_size != new_spec.block_size {
        return Err(Error::ValidationError(format!(
            "block size cannot be changed after creation ({} -> {})",
            old_spec.block_size, new_spec.block_size
        )));
    }

    if old_spec.replica_id != new_spec.replica_id {
        return Err(Error::ValidationError(
            "replicaid cannot be changed after creation".to_string(),
        ));
    }

    if old_spec.capacity != new_spec.capacity {
        let old_size = validate_capacity(&old_spec.capacity)?;
        let new_size = validate_capacity(&new_spec.capacity)?;
        // Same-unit comparison catches the common shrink case; the engine
        // re-checks against actual usage
        if new_size < old_size {
            tracing::warn!(
                "Capacity shrink requested: {} -> {}. Data past the new size is lost.",
                old_spec.capacity,
                new_spec.capacity
            );
        }
    }

    Ok(SpecDiff {
        target_ip_changed: old_spec.target_ip != new_spec.target_ip,
        capacity_changed: old_spec.capacity != new_spec.capacity,
        compression_changed: old_spec.compression != new_spec.compression,
        zvol_workers_changed: old_spec.zvol_workers != new_spec.zvol_workers,
    })
}
