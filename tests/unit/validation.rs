//! Unit tests for spec validation and immutability checks

use cstor_cvr::controller::validation::{
    Compression, MAX_BLOCK_SIZE, MIN_BLOCK_SIZE, validate_block_size, validate_capacity,
    validate_spec, validate_spec_change, validate_zvol_workers,
};

use crate::create_test_replica;

mod block_size_tests {
    use super::*;

    #[test]
    fn test_all_valid_block_sizes() {
        let mut size = MIN_BLOCK_SIZE;
        while size <= MAX_BLOCK_SIZE {
            assert!(validate_block_size(size).is_ok(), "block size {}", size);
            size *= 2;
        }
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert!(validate_block_size(256).is_err());
        assert!(validate_block_size(262_144).is_err());
        assert!(validate_block_size(0).is_err());
    }

    #[test]
    fn test_non_power_of_two_rejected() {
        assert!(validate_block_size(4095).is_err());
        assert!(validate_block_size(1000).is_err());
        assert!(validate_block_size(131_071).is_err());
    }
}

mod compression_tests {
    use super::*;

    #[test]
    fn test_vocabulary_accepted() {
        for mode in ["off", "on", "gzip", "gzip-6", "lz4", "lzjb", "zle"] {
            assert!(mode.parse::<Compression>().is_ok(), "mode {}", mode);
        }
    }

    #[test]
    fn test_unknown_modes_rejected() {
        for mode in ["", "zstd", "GZIP", "lz4hc", "gzip-"] {
            assert!(mode.parse::<Compression>().is_err(), "mode {:?}", mode);
        }
    }

    #[test]
    fn test_display_round_trip() {
        for mode in ["off", "gzip-3", "zle"] {
            let parsed: Compression = mode.parse().unwrap();
            assert_eq!(parsed.to_string(), mode);
        }
    }
}

mod capacity_tests {
    use super::*;

    #[test]
    fn test_valid_capacities() {
        for cap in ["5G", "10Gi", "512Mi", "100", "1Ti", "64K"] {
            assert!(validate_capacity(cap).is_ok(), "capacity {}", cap);
        }
    }

    #[test]
    fn test_invalid_capacities() {
        for cap in ["", "Gi", "-5Gi", "5 Gi", "5GB", "five"] {
            assert!(validate_capacity(cap).is_err(), "capacity {:?}", cap);
        }
    }
}

mod zvol_worker_tests {
    use super::*;

    #[test]
    fn test_empty_means_engine_default() {
        assert!(validate_zvol_workers("").is_ok());
    }

    #[test]
    fn test_positive_counts_accepted() {
        assert!(validate_zvol_workers("1").is_ok());
        assert!(validate_zvol_workers("16").is_ok());
    }

    #[test]
    fn test_bad_counts_rejected() {
        assert!(validate_zvol_workers("0").is_err());
        assert!(validate_zvol_workers("-1").is_err());
        assert!(validate_zvol_workers("many").is_err());
    }
}

mod spec_tests {
    use super::*;

    #[test]
    fn test_valid_spec_passes() {
        let cvr = create_test_replica("ok", None);
        assert!(validate_spec(&cvr).is_ok());
    }

    #[test]
    fn test_empty_replica_id_rejected() {
        let mut cvr = create_test_replica("no-id", None);
        cvr.spec.replica_id = String::new();
        assert!(validate_spec(&cvr).is_err());
    }

    #[test]
    fn test_bad_block_size_rejected() {
        let mut cvr = create_test_replica("bad-bs", None);
        cvr.spec.block_size = 3000;
        assert!(validate_spec(&cvr).is_err());
    }

    #[test]
    fn test_bad_compression_rejected() {
        let mut cvr = create_test_replica("bad-comp", None);
        cvr.spec.compression = "zstd".to_string();
        assert!(validate_spec(&cvr).is_err());
    }
}

mod spec_change_tests {
    use super::*;

    #[test]
    fn test_no_change() {
        let old = create_test_replica("same", None);
        let new = create_test_replica("same", None);
        let diff = validate_spec_change(&old, &new).unwrap();
        assert!(!diff.has_changes());
    }

    #[test]
    fn test_block_size_immutable() {
        let old = create_test_replica("bs", None);
        let mut new = create_test_replica("bs", None);
        new.spec.block_size = 8192;
        assert!(validate_spec_change(&old, &new).is_err());
    }

    #[test]
    fn test_replica_id_immutable() {
        let old = create_test_replica("rid", None);
        let mut new = create_test_replica("rid", None);
        new.spec.replica_id = "DIFFERENT".to_string();
        assert!(validate_spec_change(&old, &new).is_err());
    }

    #[test]
    fn test_resize_reported() {
        let old = create_test_replica("resize", None);
        let mut new = create_test_replica("resize", None);
        new.spec.capacity = "10Gi".to_string();

        let diff = validate_spec_change(&old, &new).unwrap();
        assert!(diff.capacity_changed);
        assert!(!diff.target_ip_changed);
        assert!(diff.has_changes());
    }

    #[test]
    fn test_target_failover_reported() {
        let old = create_test_replica("failover", None);
        let mut new = create_test_replica("failover", None);
        new.spec.target_ip = "10.0.0.6".to_string();

        let diff = validate_spec_change(&old, &new).unwrap();
        assert!(diff.target_ip_changed);
        assert!(!diff.capacity_changed);
    }

    #[test]
    fn test_compression_change_allowed() {
        let old = create_test_replica("comp", None);
        let mut new = create_test_replica("comp", None);
        new.spec.compression = "lz4".to_string();

        let diff = validate_spec_change(&old, &new).unwrap();
        assert!(diff.compression_changed);
    }
}
