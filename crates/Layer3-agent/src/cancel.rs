//! Cancel handle
//!
//! 각 컴포넌트는 교체 가능한 CancellationToken 하나를 보유합니다.
//! `cancel_in_flight()`는 현재 토큰으로 시작된 모든 호출을 중단하고,
//! 이후 호출을 위해 새 토큰을 설치합니다.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Shared, replaceable cancellation token
///
/// Clones control the same slot, so a signal handler can hold one while
/// the owning component keeps working.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    token: Arc<Mutex<CancellationToken>>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token for calls starting now
    pub fn current(&self) -> CancellationToken {
        self.token.lock().clone()
    }

    /// Cancel every call started under the current token
    pub fn cancel_in_flight(&self) {
        let previous = std::mem::take(&mut *self.token.lock());
        previous.cancel();
        info!("In-flight calls cancelled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_replaces_token() {
        let handle = CancelHandle::new();
        let before = handle.current();

        handle.clone().cancel_in_flight();

        assert!(before.is_cancelled());
        assert!(!handle.current().is_cancelled());
    }
}
