//! Deterministic Seeding Harness
//!
//! A `RandomSource` is a handle to the generator every sampler draws from.
//! It is threaded explicitly through models and clients; there is no process
//! wide generator. `with_seed` swaps a freshly seeded generator into a source
//! for the duration of one replication and puts the previous one back on every
//! exit path.
//!
//! Handles are `Rc` based: one replication runs on a single thread and its
//! concurrent operations are local tasks. A borrow of the generator is never
//! held across an await point.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::Rc;

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::dlt_error::BenchError;
use crate::dlt_interface::ReplicationSeed;

#[derive(Clone)]
pub struct RandomSource {
    rng: Rc<RefCell<StdRng>>,
    scoped: Rc<Cell<bool>>,
}

impl RandomSource {
    pub fn from_seed(seed: ReplicationSeed) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    pub fn from_rng(rng: StdRng) -> Self {
        Self {
            rng: Rc::new(RefCell::new(rng)),
            scoped: Rc::new(Cell::new(false)),
        }
    }

    /// Run `f` with exclusive access to the active generator
    pub fn with<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        f(&mut self.rng.borrow_mut())
    }

    /// Uniform draw in [0, 1)
    pub fn uniform(&self) -> f64 {
        self.with(|rng| rng.gen::<f64>())
    }

    /// True while a `with_seed` scope is installed on this source
    pub fn is_scoped(&self) -> bool {
        self.scoped.get()
    }
}

/// Puts the displaced generator back when the seed scope ends, whether the
/// scope returned, failed, panicked or was dropped mid-flight.
struct RestoreGuard {
    source: RandomSource,
    previous: Option<StdRng>,
}

impl Drop for RestoreGuard {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            if let Ok(mut rng) = self.source.rng.try_borrow_mut() {
                *rng = previous;
            }
        }
        self.source.scoped.set(false);
    }
}

/// Install a generator seeded from `seed` into `source`, run `f` against it and
/// restore the previous generator afterwards.
///
/// Scopes do not nest: asking for a seed while one is active on the same source
/// fails with `BenchError::SeedScopeActive` and `f` is not run.
pub async fn with_seed<F, Fut, T>(
    source: &RandomSource,
    seed: ReplicationSeed,
    f: F,
) -> Result<T, BenchError>
where
    F: FnOnce(RandomSource) -> Fut,
    Fut: Future<Output = Result<T, BenchError>>,
{
    if source.scoped.replace(true) {
        return Err(BenchError::SeedScopeActive { seed });
    }

    let previous = std::mem::replace(
        &mut *source.rng.borrow_mut(),
        StdRng::seed_from_u64(seed),
    );
    let _guard = RestoreGuard {
        source: source.clone(),
        previous: Some(previous),
    };
    debug!("seed {} installed", seed);

    f(source.clone()).await
}
