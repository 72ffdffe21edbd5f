use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// CStorVolumeReplica is the schema for one physical replica of a logical
/// volume placed on a cstor pool.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, JsonSchema)]
#[kube(
    group = "cstor.openebs.io",
    version = "v1",
    kind = "CStorVolumeReplica",
    plural = "cstorvolumereplicas",
    shortname = "cvr",
    namespaced,
    status = "CStorVolumeReplicaStatus",
    printcolumn = r#"{"name":"Allocated", "type":"string", "jsonPath":".status.capacity.used"}"#,
    printcolumn = r#"{"name":"Total", "type":"string", "jsonPath":".status.capacity.total"}"#,
    printcolumn = r#"{"name":"Status", "type":"string", "jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct CStorVolumeReplicaSpec {
    /// iSCSI target IP through which the replica communicates IO workloads
    /// and other volume operations like snapshot and resize requests
    #[serde(rename = "targetIP")]
    pub target_ip: String,

    /// Desired capacity of the underlying volume (string-encoded size,
    /// e.g. "5Gi")
    pub capacity: String,

    /// Number of threads that execute client IOs. Empty means the storage
    /// engine picks its default.
    #[serde(default)]
    pub zvol_workers: String,

    /// Unique identifier of this replica within the volume's replica set
    #[serde(rename = "replicaid")]
    pub replica_id: String,

    /// Compression algorithm used for this volume.
    /// One of: off|on|gzip|gzip-N|lz4|lzjb|zle
    #[serde(default = "default_compression")]
    pub compression: String,

    /// Logical block size in bytes. Any power of 2 from 512 bytes to 128
    /// KiB is valid. The block size cannot be changed once the volume has
    /// been written, so it must be set at creation time.
    #[serde(default = "default_block_size")]
    pub block_size: u32,
}

fn default_compression() -> String {
    "off".to_string()
}

fn default_block_size() -> u32 {
    4096
}

/// Observed state of a volume replica. Written exclusively by the replica's
/// owning controller.
#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct CStorVolumeReplicaStatus {
    /// Current lifecycle phase of the replica
    #[serde(default, skip_serializing_if = "CStorVolumeReplicaPhase::is_empty")]
    pub phase: CStorVolumeReplicaPhase,

    /// Capacity accounting reported by the storage engine
    #[serde(default)]
    pub capacity: CVRCapacityDetails,

    /// Time of the last phase change. Untouched by status writes that keep
    /// the phase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,

    /// Time of the last status write of any kind
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update_time: Option<String>,

    /// Human-readable detail about the last transition. Advisory only,
    /// never parsed by consumers.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,

    /// Snapshots present on this replica, keyed by snapshot name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub snapshots: BTreeMap<String, CStorSnapshotInfo>,

    /// Snapshots requested but not yet materialized on this replica.
    /// A snapshot name never appears in both maps at once.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub pending_snapshots: BTreeMap<String, CStorSnapshotInfo>,
}

/// Per-snapshot metadata
#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CStorSnapshotInfo {
    /// The amount of space "logically" accessible by this snapshot. Ignores
    /// the effect of the compression and copies properties, giving a
    /// quantity closer to the amount of data applications see; includes
    /// space consumed by metadata.
    pub logical_referenced: u64,
    // Per-snapshot used-bytes accounting is deferred until rebuild
    // estimates land.
}

/// Capacity accounting for a volume replica
#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CVRCapacityDetails {
    /// Space consumed by this replica and all its descendents
    #[serde(default)]
    pub total: String,

    /// Space "logically" accessible by this dataset, metadata included
    #[serde(default)]
    pub used: String,
}

/// Lifecycle phase of a volume replica
///
/// The wire literals are fixed; `Online` serializes as `"Healthy"` and the
/// initial phase serializes as the absent/empty value.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, JsonSchema, Default, PartialEq, Eq, Hash)]
pub enum CStorVolumeReplicaPhase {
    /// Resource created but not yet claimed by a controller
    #[default]
    #[serde(rename = "")]
    Empty,
    /// Claimed by the controller, underlying dataset not yet created
    Init,
    /// Dataset exists but the replica is not connected to the target
    Offline,
    /// Connected to the target and serving IO, not yet fully synced
    Degraded,
    /// Freshly created or recreated replica attached to the target with no
    /// prior data. Excluded from quorum until rebuilt.
    NewReplicaDegraded,
    /// Actively syncing missing data from peer replicas
    Rebuilding,
    /// New replica actively reconstructing its entire data set from a
    /// healthy peer
    ReconstructingNewReplica,
    /// Fully synced and healthy; authoritative for reads
    #[serde(rename = "Healthy")]
    Online,
    /// Dataset missing unexpectedly from the pool
    Error,
    /// Teardown attempt failed
    DeletionFailed,
    /// Reserved, currently unenforced
    Invalid,
    /// Flagged for re-creation after pool recreation or scale-up
    Recreate,
}

impl CStorVolumeReplicaPhase {
    /// True for the initial/unset phase, which is omitted on the wire
    pub fn is_empty(&self) -> bool {
        matches!(self, CStorVolumeReplicaPhase::Empty)
    }

    /// Whether this replica may be counted as authoritative for quorum
    /// reads. Only a fully synced replica qualifies; the degraded and
    /// rebuilding phases never do.
    pub fn serves_quorum(&self) -> bool {
        matches!(self, CStorVolumeReplicaPhase::Online)
    }

    /// Failure phases requiring external remediation
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            CStorVolumeReplicaPhase::Error | CStorVolumeReplicaPhase::DeletionFailed
        )
    }

    /// Whether the replica is copying data from a peer
    pub fn is_rebuilding(&self) -> bool {
        matches!(
            self,
            CStorVolumeReplicaPhase::Rebuilding | CStorVolumeReplicaPhase::ReconstructingNewReplica
        )
    }
}

impl std::fmt::Display for CStorVolumeReplicaPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CStorVolumeReplicaPhase::Empty => write!(f, ""),
            CStorVolumeReplicaPhase::Init => write!(f, "Init"),
            CStorVolumeReplicaPhase::Offline => write!(f, "Offline"),
            CStorVolumeReplicaPhase::Degraded => write!(f, "Degraded"),
            CStorVolumeReplicaPhase::NewReplicaDegraded => write!(f, "NewReplicaDegraded"),
            CStorVolumeReplicaPhase::Rebuilding => write!(f, "Rebuilding"),
            CStorVolumeReplicaPhase::ReconstructingNewReplica => {
                write!(f, "ReconstructingNewReplica")
            }
            CStorVolumeReplicaPhase::Online => write!(f, "Healthy"),
            CStorVolumeReplicaPhase::Error => write!(f, "Error"),
            CStorVolumeReplicaPhase::DeletionFailed => write!(f, "DeletionFailed"),
            CStorVolumeReplicaPhase::Invalid => write!(f, "Invalid"),
            CStorVolumeReplicaPhase::Recreate => write!(f, "Recreate"),
        }
    }
}

/// Well-known label keys carried by CStorVolumeReplica objects
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CvrLabelKey {
    /// Enables/disables cloning for a replica
    CloneEnable,
    /// Name of the source volume whose snapshot was used to create this
    /// replica
    SourceVolume,
    /// Name of the snapshot being used to restore this replica
    SnapshotName,
}

impl CvrLabelKey {
    pub const fn as_str(&self) -> &'static str {
        match self {
            CvrLabelKey::CloneEnable => "openebs.io/cloned",
            CvrLabelKey::SourceVolume => "openebs.io/source-volume",
            CvrLabelKey::SnapshotName => "openebs.io/snapshot",
        }
    }
}

impl std::fmt::Display for CvrLabelKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
