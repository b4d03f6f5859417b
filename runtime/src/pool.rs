use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Bounds on a [`StatePool`]'s behavior.
#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    /// Maximum number of idle states retained; excess released states are dropped.
    pub max_size: usize,
    /// States idle longer than this are evicted by [`StatePool::cleanup`].
    pub idle_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 16,
            idle_timeout: Duration::from_secs(300),
        }
    }
}

struct Idle<T> {
    value: T,
    released_at: Instant,
}

/// A bounded pool of recycled runtime states.
///
/// Acquiring reuses an idle state when one is available (already reset
/// by the previous release) or creates a fresh one via `factory`
/// otherwise; releasing runs `reset` and returns the state to the free
/// list unless the pool is already at `max_size`, in which case the
/// state is dropped. This is the same shape as an interpreter pool that
/// hands out ready-to-run workers and reclaims them when a caller is
/// done, trading per-call startup cost for a fixed standing population.
pub struct StatePool<T> {
    factory: Box<dyn Fn() -> T + Send + Sync>,
    reset: Box<dyn Fn(&mut T) + Send + Sync>,
    free: Mutex<VecDeque<Idle<T>>>,
    config: PoolConfig,
    created: AtomicUsize,
    checked_out: AtomicUsize,
}

impl<T> StatePool<T> {
    pub fn new(
        config: PoolConfig,
        factory: impl Fn() -> T + Send + Sync + 'static,
        reset: impl Fn(&mut T) + Send + Sync + 'static,
    ) -> Self {
        Self {
            factory: Box::new(factory),
            reset: Box::new(reset),
            free: Mutex::new(VecDeque::new()),
            config,
            created: AtomicUsize::new(0),
            checked_out: AtomicUsize::new(0),
        }
    }

    /// Acquire a state, reusing an idle one if available.
    pub fn acquire(self: &std::sync::Arc<Self>) -> ScopedHandle<T> {
        let value = self
            .free
            .lock()
            .pop_front()
            .map(|idle| idle.value)
            .unwrap_or_else(|| {
                self.created.fetch_add(1, Ordering::Relaxed);
                (self.factory)()
            });
        self.checked_out.fetch_add(1, Ordering::Relaxed);
        ScopedHandle {
            pool: self.clone(),
            value: Some(value),
        }
    }

    fn release(&self, mut value: T) {
        self.checked_out.fetch_sub(1, Ordering::Relaxed);
        (self.reset)(&mut value);
        let mut free = self.free.lock();
        if free.len() < self.config.max_size {
            free.push_back(Idle {
                value,
                released_at: Instant::now(),
            });
        }
    }

    /// Evict idle states past `config.idle_timeout`. Returns the number evicted.
    pub fn cleanup(&self) -> usize {
        let mut free = self.free.lock();
        let before = free.len();
        let now = Instant::now();
        free.retain(|idle| now.duration_since(idle.released_at) < self.config.idle_timeout);
        before - free.len()
    }

    pub fn idle_count(&self) -> usize {
        self.free.lock().len()
    }

    pub fn checked_out_count(&self) -> usize {
        self.checked_out.load(Ordering::Relaxed)
    }

    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }
}

/// RAII handle returned by [`StatePool::acquire`]; the held state is
/// reset and returned to the pool's free list on drop.
pub struct ScopedHandle<T> {
    pool: std::sync::Arc<StatePool<T>>,
    value: Option<T>,
}

impl<T> std::ops::Deref for ScopedHandle<T> {
    type Target = T;
    fn deref(&self) -> &T {
        self.value.as_ref().expect("value present until drop")
    }
}

impl<T> std::ops::DerefMut for ScopedHandle<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.value.as_mut().expect("value present until drop")
    }
}

impl<T> Drop for ScopedHandle<T> {
    fn drop(&mut self) {
        if let Some(value) = self.value.take() {
            self.pool.release(value);
        }
    }
}
