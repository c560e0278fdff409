//! Usage Tracker - 토큰 사용량 알림
//!
//! 완료된 모델 호출마다 보고된 토큰 수를 하나의 대표값으로 줄여
//! 등록된 리스너들에게 전달합니다. 트래커 자체는 기록을 보관하지 않으며,
//! 누적은 리스너(예: [`UsageAccumulator`])의 책임입니다.
//!
//! ```ignore
//! let tracker = UsageTracker::new();
//! let totals = UsageAccumulator::new();
//! let id = tracker.subscribe(totals.clone());
//!
//! tracker.record(&response.usage);
//! println!("{} tokens", totals.total());
//!
//! tracker.unsubscribe(id);
//! ```

use crate::TokenUsage;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

// ============================================================================
// UsageListener Trait
// ============================================================================

/// 리스너 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "usage-listener-{}", self.0)
    }
}

/// Receives the representative token count of each completed call
pub trait UsageListener: Send + Sync {
    fn on_usage(&self, tokens: u64);
}

impl<F> UsageListener for F
where
    F: Fn(u64) + Send + Sync,
{
    fn on_usage(&self, tokens: u64) {
        self(tokens)
    }
}

// ============================================================================
// UsageTracker
// ============================================================================

#[derive(Default)]
struct Registry {
    listeners: RwLock<Vec<(ListenerId, Arc<dyn UsageListener>)>>,
    next_id: AtomicU64,
}

/// Usage accounting context shared by every component that calls the model.
///
/// Cloning is cheap and clones share the same listener list.
#[derive(Clone, Default)]
pub struct UsageTracker {
    registry: Arc<Registry>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 리스너 등록
    pub fn subscribe(&self, listener: impl UsageListener + 'static) -> ListenerId {
        let id = ListenerId(self.registry.next_id.fetch_add(1, Ordering::Relaxed));
        let listener: Arc<dyn UsageListener> = Arc::new(listener);
        self.registry.listeners.write().push((id, listener));
        trace!("Subscribed {}", id);
        id
    }

    /// 리스너 해제. Returns false if the id was not registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.registry.listeners.write();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Replace every registered listener with exactly one
    pub fn set_listener(&self, listener: impl UsageListener + 'static) -> ListenerId {
        let id = ListenerId(self.registry.next_id.fetch_add(1, Ordering::Relaxed));
        let listener: Arc<dyn UsageListener> = Arc::new(listener);
        *self.registry.listeners.write() = vec![(id, listener)];
        id
    }

    pub fn listener_count(&self) -> usize {
        self.registry.listeners.read().len()
    }

    /// Forward one call's usage to the listeners.
    ///
    /// Nothing happens when the representative count is zero.
    pub fn record(&self, usage: &TokenUsage) {
        let tokens = usage.representative_count();
        if tokens == 0 {
            return;
        }

        // Snapshot so listeners may (un)subscribe from inside the callback
        let listeners: Vec<Arc<dyn UsageListener>> = self
            .registry
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();

        trace!(tokens, listeners = listeners.len(), "Recording usage");
        for listener in listeners {
            listener.on_usage(tokens);
        }
    }
}

impl std::fmt::Debug for UsageTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsageTracker")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

// ============================================================================
// UsageAccumulator
// ============================================================================

/// Listener that keeps a running session total
#[derive(Debug, Clone, Default)]
pub struct UsageAccumulator {
    total: Arc<AtomicU64>,
    calls: Arc<AtomicU64>,
}

impl UsageAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 누적 토큰 수
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// 집계된 호출 수
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.total.store(0, Ordering::Relaxed);
        self.calls.store(0, Ordering::Relaxed);
    }
}

impl UsageListener for UsageAccumulator {
    fn on_usage(&self, tokens: u64) {
        self.total.fetch_add(tokens, Ordering::Relaxed);
        self.calls.fetch_add(1, Ordering::Relaxed);
    }
}
