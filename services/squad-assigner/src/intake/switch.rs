//! Placement kill switch.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::db::StoreResult;

/// Runtime flag that halts placement without a redeploy.
#[async_trait]
pub trait AssignmentSwitch: Send + Sync {
    async fn is_paused(&self) -> StoreResult<bool>;
}

/// In-process switch.
#[derive(Debug, Default)]
pub struct StaticSwitch {
    paused: AtomicBool,
}

impl StaticSwitch {
    pub fn new(paused: bool) -> Self {
        Self {
            paused: AtomicBool::new(paused),
        }
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }
}

#[async_trait]
impl AssignmentSwitch for StaticSwitch {
    async fn is_paused(&self) -> StoreResult<bool> {
        Ok(self.paused.load(Ordering::SeqCst))
    }
}
