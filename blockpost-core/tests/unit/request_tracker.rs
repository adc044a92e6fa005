use crate::fixtures::Lcg;
use blockpost_core::application::{RequestTracker, SkipReason};
use blockpost_core::foundation::RequestId;
use std::collections::HashSet;

#[test]
fn at_most_one_guard_per_id_under_random_interleavings() {
    for seed in [1u64, 7, 42, 1337, 9001] {
        let mut rng = Lcg::new(seed);
        let tracker = RequestTracker::new(1024);
        let mut live = Vec::new();
        let mut live_ids = HashSet::new();

        for _ in 0..500 {
            let id = RequestId::new(rng.next_in(0, 15) as u32);
            if rng.next_in(0, 2) == 0 && !live.is_empty() {
                let index = rng.next_in(0, live.len() as u64 - 1) as usize;
                let guard: blockpost_core::application::PendingGuard = live.swap_remove(index);
                live_ids.remove(&guard.id());
                drop(guard);
                continue;
            }
            match tracker.try_begin(id) {
                Ok(guard) => {
                    assert!(live_ids.insert(id), "seed {} handed out a second guard for {}", seed, id);
                    live.push(guard);
                }
                Err(reason) => {
                    assert_eq!(reason, SkipReason::Pending);
                    assert!(live_ids.contains(&id));
                }
            }
            assert_eq!(tracker.pending_len(), live_ids.len());
        }
    }
}
