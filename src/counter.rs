use std::sync::atomic::{AtomicUsize, Ordering};

/// Run-wide count of fully successful tiles or uploads.
///
/// Shared by reference between workers; each success is recorded with a
/// single atomic add, so concurrent increments are never lost.
#[derive(Debug, Default)]
pub struct SuccessCounter {
    count: AtomicUsize,
}

impl SuccessCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self) -> usize {
        self.count.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn get(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;
    use rayon::ThreadPoolBuilder;

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let counter = SuccessCounter::new();
        let pool = ThreadPoolBuilder::new().num_threads(8).build().unwrap();

        pool.install(|| {
            (0..64).into_par_iter().for_each(|_| {
                for _ in 0..1_000 {
                    counter.increment();
                }
            });
        });

        assert_eq!(counter.get(), 64_000);
    }

    #[test]
    fn test_increment_returns_new_value() {
        let counter = SuccessCounter::new();
        assert_eq!(counter.get(), 0);
        assert_eq!(counter.increment(), 1);
        assert_eq!(counter.increment(), 2);
        assert_eq!(counter.get(), 2);
    }
}
