//! Formal finite state machine for the CStorVolumeReplica lifecycle
//!
//! This module implements an FSM pattern with explicit state transitions,
//! guards, and descriptions. It ensures that only valid phase transitions
//! occur and gives the owning controller a clear audit trail of replica
//! lifecycle events.

use std::fmt;

use crate::crd::CStorVolumeReplicaPhase;

/// Events that trigger phase transitions in the replica lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplicaEvent {
    /// The pool controller has claimed the freshly created resource
    ControllerClaimed,
    /// The underlying dataset has been created on the pool
    DatasetCreated,
    /// A replica with prior data connected to the target
    TargetConnected,
    /// A replica with zero prior data connected to the target
    NewReplicaConnected,
    /// Rebuild of missing data from peer replicas has started
    RebuildStarted,
    /// A new replica started reconstructing its entire data set from a peer
    ReconstructionStarted,
    /// Rebuild or reconstruction finished and the replica is fully synced
    RebuildCompleted,
    /// The replica lost its connection to the target
    TargetDisconnected,
    /// A healthy replica was found to be missing data
    SyncLost,
    /// The underlying dataset disappeared from the pool unexpectedly
    DatasetMissing,
    /// The pool was recreated (disk loss) or the volume scaled up, forcing
    /// replica re-creation
    PoolRecreated,
    /// A teardown attempt during deletion failed
    TeardownFailed,
}

impl fmt::Display for ReplicaEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplicaEvent::ControllerClaimed => write!(f, "ControllerClaimed"),
            ReplicaEvent::DatasetCreated => write!(f, "DatasetCreated"),
            ReplicaEvent::TargetConnected => write!(f, "TargetConnected"),
            ReplicaEvent::NewReplicaConnected => write!(f, "NewReplicaConnected"),
            ReplicaEvent::RebuildStarted => write!(f, "RebuildStarted"),
            ReplicaEvent::ReconstructionStarted => write!(f, "ReconstructionStarted"),
            ReplicaEvent::RebuildCompleted => write!(f, "RebuildCompleted"),
            ReplicaEvent::TargetDisconnected => write!(f, "TargetDisconnected"),
            ReplicaEvent::SyncLost => write!(f, "SyncLost"),
            ReplicaEvent::DatasetMissing => write!(f, "DatasetMissing"),
            ReplicaEvent::PoolRecreated => write!(f, "PoolRecreated"),
            ReplicaEvent::TeardownFailed => write!(f, "TeardownFailed"),
        }
    }
}

/// Facts about the replica observed from the storage engine, available
/// during state transitions
#[derive(Debug, Clone)]
pub struct TransitionContext {
    /// Whether the underlying dataset exists on the pool
    pub dataset_exists: bool,
    /// Whether the replica currently holds a connection to the target
    pub target_connected: bool,
    /// Whether the replica's data is fully up to date with the volume
    pub fully_synced: bool,
    /// Whether the replica was created or recreated with zero prior data
    pub is_new_replica: bool,
}

impl TransitionContext {
    /// Context for a replica that exists and is attached but not yet synced
    pub fn new(dataset_exists: bool, target_connected: bool) -> Self {
        Self {
            dataset_exists,
            target_connected,
            fully_synced: false,
            is_new_replica: false,
        }
    }
}

/// A state transition definition
#[derive(Debug)]
pub struct Transition {
    /// Source phase
    pub from: CStorVolumeReplicaPhase,
    /// Target phase
    pub to: CStorVolumeReplicaPhase,
    /// Event that triggers this transition
    pub event: ReplicaEvent,
    /// Human-readable description of this transition
    pub description: &'static str,
}

impl Transition {
    const fn new(
        from: CStorVolumeReplicaPhase,
        to: CStorVolumeReplicaPhase,
        event: ReplicaEvent,
        description: &'static str,
    ) -> Self {
        Self {
            from,
            to,
            event,
            description,
        }
    }
}

/// Result of attempting a state transition
#[derive(Debug)]
pub enum TransitionResult {
    /// Transition was successful
    Success {
        from: CStorVolumeReplicaPhase,
        to: CStorVolumeReplicaPhase,
        event: ReplicaEvent,
        description: &'static str,
    },
    /// Transition was not valid for current phase
    InvalidTransition {
        current: CStorVolumeReplicaPhase,
        event: ReplicaEvent,
    },
    /// Guard condition prevented the transition
    GuardFailed {
        from: CStorVolumeReplicaPhase,
        to: CStorVolumeReplicaPhase,
        event: ReplicaEvent,
        reason: String,
    },
}

/// Formal state machine for the CStorVolumeReplica lifecycle
pub struct ReplicaStateMachine {
    transitions: Vec<Transition>,
}

impl Default for ReplicaStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

use CStorVolumeReplicaPhase as Phase;

impl ReplicaStateMachine {
    /// Create a new state machine with the defined transition table
    pub fn new() -> Self {
        Self {
            transitions: vec![
                // === Empty (just created, unmonitored) ===
                Transition::new(
                    Phase::Empty,
                    Phase::Init,
                    ReplicaEvent::ControllerClaimed,
                    "Pool controller claimed the replica",
                ),
                // === Init (claimed, dataset not yet created) ===
                Transition::new(
                    Phase::Init,
                    Phase::Offline,
                    ReplicaEvent::DatasetCreated,
                    "Dataset created, replica not yet attached to the target",
                ),
                Transition::new(
                    Phase::Init,
                    Phase::DeletionFailed,
                    ReplicaEvent::TeardownFailed,
                    "Teardown failed before the dataset was created",
                ),
                // === Offline (dataset exists, detached) ===
                Transition::new(
                    Phase::Offline,
                    Phase::Degraded,
                    ReplicaEvent::TargetConnected,
                    "Replica with prior data attached to the target",
                ),
                Transition::new(
                    Phase::Offline,
                    Phase::NewReplicaDegraded,
                    ReplicaEvent::NewReplicaConnected,
                    "Replica with no prior data attached to the target",
                ),
                Transition::new(
                    Phase::Offline,
                    Phase::Error,
                    ReplicaEvent::DatasetMissing,
                    "Dataset disappeared while detached",
                ),
                Transition::new(
                    Phase::Offline,
                    Phase::Recreate,
                    ReplicaEvent::PoolRecreated,
                    "Pool recreated, replica flagged for re-creation",
                ),
                Transition::new(
                    Phase::Offline,
                    Phase::DeletionFailed,
                    ReplicaEvent::TeardownFailed,
                    "Teardown failed while detached",
                ),
                // === Degraded (attached, serving IO, not fully synced) ===
                Transition::new(
                    Phase::Degraded,
                    Phase::Rebuilding,
                    ReplicaEvent::RebuildStarted,
                    "Started rebuilding missing data from peer replicas",
                ),
                Transition::new(
                    Phase::Degraded,
                    Phase::Offline,
                    ReplicaEvent::TargetDisconnected,
                    "Lost target connection while degraded",
                ),
                Transition::new(
                    Phase::Degraded,
                    Phase::Error,
                    ReplicaEvent::DatasetMissing,
                    "Dataset disappeared while degraded",
                ),
                Transition::new(
                    Phase::Degraded,
                    Phase::Recreate,
                    ReplicaEvent::PoolRecreated,
                    "Pool recreated while degraded",
                ),
                Transition::new(
                    Phase::Degraded,
                    Phase::DeletionFailed,
                    ReplicaEvent::TeardownFailed,
                    "Teardown failed while degraded",
                ),
                // === NewReplicaDegraded (attached, zero prior data) ===
                Transition::new(
                    Phase::NewReplicaDegraded,
                    Phase::ReconstructingNewReplica,
                    ReplicaEvent::ReconstructionStarted,
                    "New replica started reconstructing all data from a peer",
                ),
                Transition::new(
                    Phase::NewReplicaDegraded,
                    Phase::Offline,
                    ReplicaEvent::TargetDisconnected,
                    "New replica lost target connection",
                ),
                Transition::new(
                    Phase::NewReplicaDegraded,
                    Phase::Error,
                    ReplicaEvent::DatasetMissing,
                    "Dataset of new replica disappeared",
                ),
                Transition::new(
                    Phase::NewReplicaDegraded,
                    Phase::DeletionFailed,
                    ReplicaEvent::TeardownFailed,
                    "Teardown of new replica failed",
                ),
                // === Rebuilding ===
                Transition::new(
                    Phase::Rebuilding,
                    Phase::Online,
                    ReplicaEvent::RebuildCompleted,
                    "Rebuild finished, replica is healthy",
                ),
                Transition::new(
                    Phase::Rebuilding,
                    Phase::Offline,
                    ReplicaEvent::TargetDisconnected,
                    "Lost target connection during rebuild",
                ),
                Transition::new(
                    Phase::Rebuilding,
                    Phase::Error,
                    ReplicaEvent::DatasetMissing,
                    "Dataset disappeared during rebuild",
                ),
                Transition::new(
                    Phase::Rebuilding,
                    Phase::DeletionFailed,
                    ReplicaEvent::TeardownFailed,
                    "Teardown failed during rebuild",
                ),
                // === ReconstructingNewReplica ===
                Transition::new(
                    Phase::ReconstructingNewReplica,
                    Phase::Online,
                    ReplicaEvent::RebuildCompleted,
                    "Reconstruction finished, replica is healthy",
                ),
                Transition::new(
                    Phase::ReconstructingNewReplica,
                    Phase::Offline,
                    ReplicaEvent::TargetDisconnected,
                    "Lost target connection during reconstruction",
                ),
                Transition::new(
                    Phase::ReconstructingNewReplica,
                    Phase::Error,
                    ReplicaEvent::DatasetMissing,
                    "Dataset disappeared during reconstruction",
                ),
                Transition::new(
                    Phase::ReconstructingNewReplica,
                    Phase::DeletionFailed,
                    ReplicaEvent::TeardownFailed,
                    "Teardown failed during reconstruction",
                ),
                // === Online (healthy, authoritative for reads) ===
                Transition::new(
                    Phase::Online,
                    Phase::Degraded,
                    ReplicaEvent::SyncLost,
                    "Healthy replica found missing data",
                ),
                Transition::new(
                    Phase::Online,
                    Phase::Offline,
                    ReplicaEvent::TargetDisconnected,
                    "Healthy replica lost target connection",
                ),
                Transition::new(
                    Phase::Online,
                    Phase::Error,
                    ReplicaEvent::DatasetMissing,
                    "Dataset of healthy replica disappeared",
                ),
                Transition::new(
                    Phase::Online,
                    Phase::Recreate,
                    ReplicaEvent::PoolRecreated,
                    "Pool recreated under a healthy replica",
                ),
                Transition::new(
                    Phase::Online,
                    Phase::DeletionFailed,
                    ReplicaEvent::TeardownFailed,
                    "Teardown of healthy replica failed",
                ),
                // === Error (external remediation) ===
                Transition::new(
                    Phase::Error,
                    Phase::Offline,
                    ReplicaEvent::DatasetCreated,
                    "Dataset restored, replica leaves the error state",
                ),
                Transition::new(
                    Phase::Error,
                    Phase::Recreate,
                    ReplicaEvent::PoolRecreated,
                    "Pool recreated, errored replica flagged for re-creation",
                ),
                Transition::new(
                    Phase::Error,
                    Phase::DeletionFailed,
                    ReplicaEvent::TeardownFailed,
                    "Teardown of errored replica failed",
                ),
                // === Recreate (replica must be built from scratch) ===
                Transition::new(
                    Phase::Recreate,
                    Phase::Init,
                    ReplicaEvent::ControllerClaimed,
                    "Re-creation begins with a fresh dataset",
                ),
                Transition::new(
                    Phase::Recreate,
                    Phase::DeletionFailed,
                    ReplicaEvent::TeardownFailed,
                    "Teardown failed while flagged for re-creation",
                ),
                // === DeletionFailed / Invalid ===
                // DeletionFailed waits for external remediation; Invalid is
                // reserved and currently unenforced. Neither has outgoing
                // transitions.
            ],
        }
    }

    /// Attempt to transition to a new phase based on an event
    pub fn transition(
        &self,
        current: &CStorVolumeReplicaPhase,
        event: ReplicaEvent,
        ctx: &TransitionContext,
    ) -> TransitionResult {
        // Find a matching transition
        let transition = self
            .transitions
            .iter()
            .find(|t| t.from == *current && t.event == event);

        match transition {
            Some(t) => {
                if let Some(reason) = self.check_guard(t, ctx) {
                    TransitionResult::GuardFailed {
                        from: t.from,
                        to: t.to,
                        event,
                        reason,
                    }
                } else {
                    TransitionResult::Success {
                        from: t.from,
                        to: t.to,
                        event,
                        description: t.description,
                    }
                }
            }
            None => TransitionResult::InvalidTransition {
                current: *current,
                event,
            },
        }
    }

    /// Check if a transition is valid (ignoring guards)
    pub fn can_transition(&self, from: &CStorVolumeReplicaPhase, event: &ReplicaEvent) -> bool {
        self.transitions
            .iter()
            .any(|t| t.from == *from && t.event == *event)
    }

    /// Get all valid events for a given phase
    pub fn valid_events(&self, phase: &CStorVolumeReplicaPhase) -> Vec<&ReplicaEvent> {
        self.transitions
            .iter()
            .filter(|t| t.from == *phase)
            .map(|t| &t.event)
            .collect()
    }

    /// Check guard conditions for a transition
    fn check_guard(&self, transition: &Transition, ctx: &TransitionContext) -> Option<String> {
        match (&transition.to, &transition.event) {
            // Guard: a replica only becomes healthy once fully synced
            (Phase::Online, ReplicaEvent::RebuildCompleted) => {
                if !ctx.fully_synced {
                    Some("Cannot mark replica healthy, data is not fully synced".to_string())
                } else {
                    None
                }
            }
            // Guard: attaching requires a live target connection
            (Phase::Degraded, ReplicaEvent::TargetConnected) => {
                if !ctx.target_connected {
                    Some("Replica is not connected to the target".to_string())
                } else if ctx.is_new_replica {
                    Some("Replica has no prior data, must attach as a new replica".to_string())
                } else {
                    None
                }
            }
            (Phase::NewReplicaDegraded, ReplicaEvent::NewReplicaConnected) => {
                if !ctx.target_connected {
                    Some("Replica is not connected to the target".to_string())
                } else if !ctx.is_new_replica {
                    Some("Replica has prior data, must attach as an existing replica".to_string())
                } else {
                    None
                }
            }
            // Guard: a dataset cannot come into existence and be missing at once
            (Phase::Offline, ReplicaEvent::DatasetCreated) => {
                if !ctx.dataset_exists {
                    Some("Dataset does not exist on the pool".to_string())
                } else {
                    None
                }
            }
            // No guard for other transitions
            _ => None,
        }
    }
}

/// Determine the event to raise from observed facts, or `None` to hold the
/// current phase.
///
/// Teardown failure takes priority, then unexpected dataset loss; otherwise
/// the event follows the replica's position in the lifecycle.
pub fn determine_event(
    current: &CStorVolumeReplicaPhase,
    ctx: &TransitionContext,
    teardown_failed: bool,
) -> Option<ReplicaEvent> {
    if teardown_failed {
        return Some(ReplicaEvent::TeardownFailed);
    }

    // Dataset loss is an error from any phase where the dataset must exist
    if !ctx.dataset_exists
        && !matches!(
            current,
            Phase::Empty | Phase::Init | Phase::Recreate | Phase::Error | Phase::DeletionFailed
        )
    {
        return Some(ReplicaEvent::DatasetMissing);
    }

    match current {
        Phase::Empty => Some(ReplicaEvent::ControllerClaimed),
        Phase::Init => ctx.dataset_exists.then_some(ReplicaEvent::DatasetCreated),
        Phase::Offline => {
            if !ctx.target_connected {
                None
            } else if ctx.is_new_replica {
                Some(ReplicaEvent::NewReplicaConnected)
            } else {
                Some(ReplicaEvent::TargetConnected)
            }
        }
        Phase::Degraded => {
            if !ctx.target_connected {
                Some(ReplicaEvent::TargetDisconnected)
            } else {
                Some(ReplicaEvent::RebuildStarted)
            }
        }
        Phase::NewReplicaDegraded => {
            if !ctx.target_connected {
                Some(ReplicaEvent::TargetDisconnected)
            } else {
                Some(ReplicaEvent::ReconstructionStarted)
            }
        }
        Phase::Rebuilding | Phase::ReconstructingNewReplica => {
            if !ctx.target_connected {
                Some(ReplicaEvent::TargetDisconnected)
            } else if ctx.fully_synced {
                Some(ReplicaEvent::RebuildCompleted)
            } else {
                None
            }
        }
        Phase::Online => {
            if !ctx.target_connected {
                Some(ReplicaEvent::TargetDisconnected)
            } else if !ctx.fully_synced {
                Some(ReplicaEvent::SyncLost)
            } else {
                None
            }
        }
        // Error clears only when the dataset is restored; pool recreation is
        // signalled by the caller raising PoolRecreated directly
        Phase::Error => ctx.dataset_exists.then_some(ReplicaEvent::DatasetCreated),
        Phase::Recreate => Some(ReplicaEvent::ControllerClaimed),
        // Failure states requiring external remediation, and the reserved
        // Invalid phase, hold until acted upon from outside
        Phase::DeletionFailed | Phase::Invalid => None,
    }
}
