/*!
 * One-Shot Trigger
 *
 * Lock-free flag that can be armed repeatedly but reports "was armed" to
 * exactly one caller per arming.
 */

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// One-shot atomic flag
///
/// There is deliberately no way to read the flag without clearing it:
/// `try_fire` is the only observation.
///
/// # Example
///
/// ```
/// use canvas_primitives::Trigger;
///
/// let trigger = Trigger::new(false);
/// trigger.prime();
/// trigger.prime();
///
/// assert!(trigger.try_fire());
/// assert!(!trigger.try_fire());
/// ```
pub struct Trigger {
    armed: AtomicBool,
}

impl Trigger {
    pub const fn new(initially_armed: bool) -> Self {
        Self {
            armed: AtomicBool::new(initially_armed),
        }
    }

    /// Arm the trigger (idempotent)
    #[inline]
    pub fn prime(&self) {
        self.armed.store(true, Ordering::Release);
    }

    /// Disarm and report whether the trigger was armed
    #[inline]
    pub fn try_fire(&self) -> bool {
        self.armed.swap(false, Ordering::AcqRel)
    }
}

impl Default for Trigger {
    fn default() -> Self {
        Self::new(false)
    }
}

impl fmt::Debug for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trigger").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Barrier};
    use std::thread;

    #[test]
    fn test_initial_state() {
        assert!(Trigger::new(true).try_fire());
        assert!(!Trigger::new(false).try_fire());
        assert!(!Trigger::default().try_fire());
    }

    #[test]
    fn test_rearm_after_fire() {
        let trigger = Trigger::new(false);
        for _ in 0..3 {
            trigger.prime();
            assert!(trigger.try_fire());
            assert!(!trigger.try_fire());
        }
    }

    #[test]
    fn test_single_winner_under_race() {
        const RACERS: usize = 8;

        for _ in 0..50 {
            let trigger = Arc::new(Trigger::new(false));
            let barrier = Arc::new(Barrier::new(RACERS));
            let winners = Arc::new(AtomicUsize::new(0));
            trigger.prime();

            let handles: Vec<_> = (0..RACERS)
                .map(|_| {
                    let trigger = trigger.clone();
                    let barrier = barrier.clone();
                    let winners = winners.clone();
                    thread::spawn(move || {
                        barrier.wait();
                        if trigger.try_fire() {
                            winners.fetch_add(1, Ordering::Relaxed);
                        }
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }
            assert_eq!(winners.load(Ordering::Relaxed), 1);
        }
    }
}
