//! CStorVolumeReplica schema and lifecycle contract
//!
//! This crate defines the CStorVolumeReplica custom resource (one physical
//! replica of a logical volume on a cstor pool), the closed set of lifecycle
//! phases with their legal transitions, the status write rules the owning
//! controller must follow, and boundary validation for replica specs.
//!
//! The reconcile loop that drives a replica through this lifecycle lives in
//! the pool controller process, which links against this crate. Spec and
//! status travel through independent subresource paths so the provisioning
//! workflow and the controller never contend on one resource version.

pub mod controller;
pub mod crd;

pub use controller::state_machine::{
    ReplicaEvent, ReplicaStateMachine, TransitionContext, TransitionResult, determine_event,
};
pub use controller::status::{StatusManager, next_status, snapshots_disjoint};
pub use controller::validation::{Compression, SpecDiff, validate_spec, validate_spec_change};
pub use controller::{Context, Error, Result};
pub use crd::{
    CStorSnapshotInfo, CStorVolumeReplica, CStorVolumeReplicaPhase, CStorVolumeReplicaSpec,
    CStorVolumeReplicaStatus, CVRCapacityDetails, CvrLabelKey,
};
