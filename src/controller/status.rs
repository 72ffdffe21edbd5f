//! Status management for CStorVolumeReplica resources
//!
//! Status is owned exclusively by the replica's controller and written
//! through the status subresource so that spec writers never race it on the
//! same resource version. Two timestamps with different triggers live here:
//! `lastTransitionTime` moves only when the phase changes, `lastUpdateTime`
//! moves on every status write.

use chrono::Utc;
use kube::api::{Patch, PatchParams};
use kube::{Api, ResourceExt};

use crate::controller::Context;
use crate::controller::error::{Error, Result};
use crate::crd::{
    CStorSnapshotInfo, CStorVolumeReplica, CStorVolumeReplicaPhase, CStorVolumeReplicaStatus,
};

/// Field manager recorded on status patches
pub const STATUS_MANAGER: &str = "cvr-controller";

fn now() -> String {
    Utc::now().to_rfc3339()
}

/// Build the successor status for a phase observation.
///
/// Capacity and both snapshot maps carry forward from the current status.
/// `lastUpdateTime` is always refreshed; `lastTransitionTime` is refreshed
/// only if `phase` differs from the current phase.
pub fn next_status(
    current: Option<&CStorVolumeReplicaStatus>,
    phase: CStorVolumeReplicaPhase,
    message: impl Into<String>,
) -> CStorVolumeReplicaStatus {
    let stamp = now();

    let last_transition_time = match current {
        Some(s) if s.phase == phase => s.last_transition_time.clone(),
        _ => Some(stamp.clone()),
    };

    CStorVolumeReplicaStatus {
        phase,
        capacity: current.map(|s| s.capacity.clone()).unwrap_or_default(),
        last_transition_time,
        last_update_time: Some(stamp),
        message: message.into(),
        snapshots: current.map(|s| s.snapshots.clone()).unwrap_or_default(),
        pending_snapshots: current
            .map(|s| s.pending_snapshots.clone())
            .unwrap_or_default(),
    }
}

/// Record observed capacity. A status write without a phase change, so only
/// `lastUpdateTime` moves.
pub fn set_capacity(
    status: &mut CStorVolumeReplicaStatus,
    total: impl Into<String>,
    used: impl Into<String>,
) {
    status.capacity.total = total.into();
    status.capacity.used = used.into();
    status.last_update_time = Some(now());
}

/// Record a snapshot that has been requested but is not yet materialized on
/// this replica.
///
/// Fails if the name is already known, either as pending or as present: a
/// snapshot is pending XOR present at any instant.
pub fn record_pending_snapshot(
    status: &mut CStorVolumeReplicaStatus,
    name: &str,
    info: CStorSnapshotInfo,
) -> Result<()> {
    if status.snapshots.contains_key(name) {
        return Err(Error::SnapshotConflict(format!(
            "snapshot {} is already present on the replica",
            name
        )));
    }
    if status.pending_snapshots.contains_key(name) {
        return Err(Error::SnapshotConflict(format!(
            "snapshot {} is already pending",
            name
        )));
    }

    status.pending_snapshots.insert(name.to_string(), info);
    status.last_update_time = Some(now());
    Ok(())
}

/// Move a snapshot from pending to present once the engine reports it
/// materialized.
pub fn promote_snapshot(status: &mut CStorVolumeReplicaStatus, name: &str) -> Result<()> {
    let info = status
        .pending_snapshots
        .remove(name)
        .ok_or_else(|| Error::NotFound(format!("pending snapshot {}", name)))?;

    status.snapshots.insert(name.to_string(), info);
    status.last_update_time = Some(now());
    Ok(())
}

/// Drop a snapshot from whichever map holds it (snapshot deleted, or a
/// pending request withdrawn).
pub fn forget_snapshot(status: &mut CStorVolumeReplicaStatus, name: &str) -> Result<()> {
    if status.snapshots.remove(name).is_none() && status.pending_snapshots.remove(name).is_none() {
        return Err(Error::NotFound(format!("snapshot {}", name)));
    }
    status.last_update_time = Some(now());
    Ok(())
}

/// Verify the pending-XOR-present invariant over the two snapshot maps
pub fn snapshots_disjoint(status: &CStorVolumeReplicaStatus) -> bool {
    status
        .snapshots
        .keys()
        .all(|name| !status.pending_snapshots.contains_key(name))
}

/// Status writer for CStorVolumeReplica resources
pub struct StatusManager<'a> {
    cvr: &'a CStorVolumeReplica,
    ctx: &'a Context,
    ns: &'a str,
}

impl<'a> StatusManager<'a> {
    /// Create a new status manager
    pub fn new(cvr: &'a CStorVolumeReplica, ctx: &'a Context, ns: &'a str) -> Self {
        Self { cvr, ctx, ns }
    }

    /// Write a full status object through the status subresource
    pub async fn update(&self, status: CStorVolumeReplicaStatus) -> Result<()> {
        if !snapshots_disjoint(&status) {
            return Err(Error::SnapshotConflict(
                "snapshot maps overlap, refusing to write status".to_string(),
            ));
        }

        let api: Api<CStorVolumeReplica> = Api::namespaced(self.ctx.client.clone(), self.ns);
        let name = self.cvr.name_any();

        let patch = serde_json::json!({
            "status": status
        });

        api.patch_status(
            &name,
            &PatchParams::apply(STATUS_MANAGER),
            &Patch::Merge(&patch),
        )
        .await?;

        Ok(())
    }

    /// Record a phase observation, applying the timestamp rules from
    /// [`next_status`]
    pub async fn set_phase(
        &self,
        phase: CStorVolumeReplicaPhase,
        message: impl Into<String>,
    ) -> Result<()> {
        let message = message.into();
        let current = self.cvr.status.as_ref();

        if current.map(|s| s.phase) != Some(phase) {
            tracing::info!(
                replica = %self.cvr.name_any(),
                from = %current.map(|s| s.phase).unwrap_or_default(),
                to = %phase,
                "Replica phase transition"
            );
        }

        self.update(next_status(current, phase, message)).await
    }
}
