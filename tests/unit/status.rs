//! Unit tests for status construction: the two timestamp triggers and the
//! snapshot map invariant

use chrono::DateTime;

use cstor_cvr::controller::status::{
    forget_snapshot, next_status, promote_snapshot, record_pending_snapshot, set_capacity,
    snapshots_disjoint,
};
use cstor_cvr::crd::{CStorSnapshotInfo, CStorVolumeReplicaPhase, CStorVolumeReplicaStatus};

fn parse(ts: &Option<String>) -> DateTime<chrono::FixedOffset> {
    DateTime::parse_from_rfc3339(ts.as_deref().expect("timestamp set")).unwrap()
}

mod timestamp_tests {
    use super::*;

    #[test]
    fn test_first_write_sets_both_timestamps() {
        let status = next_status(None, CStorVolumeReplicaPhase::Init, "claimed");

        assert_eq!(status.phase, CStorVolumeReplicaPhase::Init);
        assert!(status.last_transition_time.is_some());
        assert!(status.last_update_time.is_some());
        assert_eq!(status.message, "claimed");
    }

    #[test]
    fn test_same_phase_write_keeps_transition_time() {
        let first = next_status(None, CStorVolumeReplicaPhase::Degraded, "attached");
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = next_status(Some(&first), CStorVolumeReplicaPhase::Degraded, "still degraded");

        // Same phase: lastTransitionTime carried forward untouched
        assert_eq!(second.last_transition_time, first.last_transition_time);
        // But this was a status write, so lastUpdateTime moved
        assert!(parse(&second.last_update_time) > parse(&first.last_update_time));
    }

    #[test]
    fn test_phase_change_moves_transition_time() {
        let first = next_status(None, CStorVolumeReplicaPhase::Degraded, "attached");
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = next_status(Some(&first), CStorVolumeReplicaPhase::Rebuilding, "rebuilding");

        assert!(parse(&second.last_transition_time) > parse(&first.last_transition_time));
    }

    #[test]
    fn test_init_to_online_lifecycle_timestamps() {
        // Init -> Degraded -> Rebuilding -> Online across three status
        // updates: three distinct transition times and one update time per
        // write, monotonically non-decreasing throughout.
        let initial = next_status(None, CStorVolumeReplicaPhase::Init, "claimed");

        let phases = [
            CStorVolumeReplicaPhase::Degraded,
            CStorVolumeReplicaPhase::Rebuilding,
            CStorVolumeReplicaPhase::Online,
        ];

        let mut history = vec![initial];
        for phase in phases {
            std::thread::sleep(std::time::Duration::from_millis(5));
            let next = next_status(Some(history.last().unwrap()), phase, "");
            history.push(next);
        }
        let updates = &history[1..];

        let transition_times: Vec<_> =
            updates.iter().map(|s| parse(&s.last_transition_time)).collect();
        let update_times: Vec<_> = updates.iter().map(|s| parse(&s.last_update_time)).collect();

        for window in transition_times.windows(2) {
            assert!(window[0] <= window[1], "transition times regressed");
        }
        for window in update_times.windows(2) {
            assert!(window[0] < window[1], "update times must be distinct per write");
        }

        let mut distinct = transition_times.clone();
        distinct.dedup();
        assert_eq!(distinct.len(), 3, "one transition time per phase change");
    }

    #[test]
    fn test_capacity_write_touches_update_time_only() {
        let mut status = next_status(None, CStorVolumeReplicaPhase::Online, "healthy");
        let transition_before = status.last_transition_time.clone();
        let update_before = status.last_update_time.clone();

        std::thread::sleep(std::time::Duration::from_millis(5));
        set_capacity(&mut status, "6K", "6K");

        assert_eq!(status.capacity.total, "6K");
        assert_eq!(status.capacity.used, "6K");
        assert_eq!(status.last_transition_time, transition_before);
        assert!(parse(&status.last_update_time) > parse(&update_before));
    }

    #[test]
    fn test_next_status_carries_capacity_and_snapshots() {
        let mut first = next_status(None, CStorVolumeReplicaPhase::Degraded, "");
        set_capacity(&mut first, "2G", "1G");
        record_pending_snapshot(&mut first, "snap-1", CStorSnapshotInfo::default()).unwrap();

        let second = next_status(Some(&first), CStorVolumeReplicaPhase::Rebuilding, "");

        assert_eq!(second.capacity, first.capacity);
        assert_eq!(second.pending_snapshots, first.pending_snapshots);
    }
}

mod snapshot_tests {
    use super::*;

    fn info(bytes: u64) -> CStorSnapshotInfo {
        CStorSnapshotInfo {
            logical_referenced: bytes,
        }
    }

    #[test]
    fn test_pending_then_promote() {
        let mut status = CStorVolumeReplicaStatus::default();

        record_pending_snapshot(&mut status, "snap-1", info(100)).unwrap();
        assert!(status.pending_snapshots.contains_key("snap-1"));
        assert!(!status.snapshots.contains_key("snap-1"));

        promote_snapshot(&mut status, "snap-1").unwrap();
        assert!(!status.pending_snapshots.contains_key("snap-1"));
        assert_eq!(status.snapshots["snap-1"], info(100));

        assert!(snapshots_disjoint(&status));
    }

    #[test]
    fn test_pending_rejects_present_name() {
        let mut status = CStorVolumeReplicaStatus::default();
        record_pending_snapshot(&mut status, "snap-1", info(1)).unwrap();
        promote_snapshot(&mut status, "snap-1").unwrap();

        let result = record_pending_snapshot(&mut status, "snap-1", info(2));
        assert!(result.is_err(), "a present snapshot cannot become pending again");
        assert!(snapshots_disjoint(&status));
    }

    #[test]
    fn test_pending_rejects_duplicate() {
        let mut status = CStorVolumeReplicaStatus::default();
        record_pending_snapshot(&mut status, "snap-1", info(1)).unwrap();
        assert!(record_pending_snapshot(&mut status, "snap-1", info(1)).is_err());
    }

    #[test]
    fn test_promote_unknown_snapshot() {
        let mut status = CStorVolumeReplicaStatus::default();
        assert!(promote_snapshot(&mut status, "nope").is_err());
    }

    #[test]
    fn test_forget_from_either_map() {
        let mut status = CStorVolumeReplicaStatus::default();
        record_pending_snapshot(&mut status, "pending", info(1)).unwrap();
        record_pending_snapshot(&mut status, "present", info(2)).unwrap();
        promote_snapshot(&mut status, "present").unwrap();

        forget_snapshot(&mut status, "pending").unwrap();
        forget_snapshot(&mut status, "present").unwrap();
        assert!(status.snapshots.is_empty());
        assert!(status.pending_snapshots.is_empty());

        assert!(forget_snapshot(&mut status, "pending").is_err());
    }

    #[test]
    fn test_snapshot_ops_touch_update_time() {
        let mut status = next_status(None, CStorVolumeReplicaPhase::Online, "");
        let before = status.last_update_time.clone();

        std::thread::sleep(std::time::Duration::from_millis(5));
        record_pending_snapshot(&mut status, "snap-1", info(1)).unwrap();

        assert!(parse(&status.last_update_time) > parse(&before));
    }

    #[test]
    fn test_disjointness_checker_detects_overlap() {
        let mut status = CStorVolumeReplicaStatus::default();
        status.snapshots.insert("dup".to_string(), info(1));
        status.pending_snapshots.insert("dup".to_string(), info(1));
        assert!(!snapshots_disjoint(&status));
    }
}
