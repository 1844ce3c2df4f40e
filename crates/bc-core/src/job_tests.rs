// SPDX-License-Identifier: MIT

use super::*;
use proptest::prelude::*;

#[yare::parameterized(
    idle = { JobStatus::Idle, true },
    completed = { JobStatus::Completed, true },
    failed = { JobStatus::Failed, true },
    cancelled = { JobStatus::Cancelled, true },
    running = { JobStatus::Running, false },
)]
fn can_start_iff_not_running(status: JobStatus, expected: bool) {
    assert_eq!(status.can_start(), expected);
}

#[test]
fn status_display_then_parse_round_trips() {
    for status in [
        JobStatus::Idle,
        JobStatus::Running,
        JobStatus::Completed,
        JobStatus::Failed,
        JobStatus::Cancelled,
    ] {
        let parsed: JobStatus = status.to_string().parse().expect("valid status text");
        assert_eq!(status, parsed);
    }
}

proptest! {
    #[test]
    fn remote_paths_round_trip(paths in proptest::collection::vec("[\\PC]{0,40}", 0..8)) {
        let encoded = encode_remote_paths(&paths);
        let decoded = decode_remote_paths(&encoded);
        prop_assert_eq!(paths, decoded);
    }
}

#[test]
fn decode_of_garbage_falls_back_to_empty() {
    assert_eq!(decode_remote_paths("not json"), Vec::<String>::new());
}
