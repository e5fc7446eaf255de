use std::sync::Arc;
use std::thread;

use atomicio::AtomicFlag;
use proptest::prelude::*;

#[test]
fn concurrent_toggles_settle_on_last_call() {
    let flag = Arc::new(AtomicFlag::new(false));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let flag = Arc::clone(&flag);
            thread::spawn(move || {
                for j in 0..10_000 {
                    if (i + j) % 2 == 0 {
                        flag.set();
                    } else {
                        flag.unset();
                    }
                    let _ = flag.is_set();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("worker thread");
    }

    flag.set();
    assert!(flag.is_set());
    flag.unset();
    assert!(!flag.is_set());
}

#[test]
fn set_is_visible_to_other_threads() {
    let flag = AtomicFlag::new(false);

    thread::scope(|scope| {
        let waiter = scope.spawn(|| {
            while !flag.is_set() {
                std::hint::spin_loop();
            }
        });
        flag.set();
        waiter.join().expect("waiter thread");
    });

    assert!(flag.is_set());
}

proptest! {
    #[test]
    fn flag_matches_plain_bool(initial in any::<bool>(), ops in proptest::collection::vec(any::<bool>(), 0..64)) {
        let flag = AtomicFlag::new(initial);
        let mut model = initial;

        for set in ops {
            if set {
                flag.set();
            } else {
                flag.unset();
            }
            model = set;
            prop_assert_eq!(flag.is_set(), model);
        }

        prop_assert_eq!(flag.is_set(), model);
    }
}
