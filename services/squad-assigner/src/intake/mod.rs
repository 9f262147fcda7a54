//! Task intake.
//!
//! Placement requests arrive from an at-least-once queue. Before placing,
//! intake re-checks what may have changed since the task was enqueued: the
//! kill switch and the member's lifecycle state. The orchestrator's result
//! is turned into a [`TaskOutcome`] that tells the queue whether to ack,
//! retry, or dead-letter the delivery.

mod directory;
mod switch;
mod worker;

pub use directory::{LifecycleState, MemberDirectory, MemberStatus};
pub use switch::{AssignmentSwitch, StaticSwitch};
pub use worker::{
    DeliveryId, IntakeWorker, IntakeWorkerConfig, MemoryTaskQueue, QueueError, QueuedTask,
    RetryPolicy, TaskQueue,
};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use squad_catalog::PositionKey;
use squad_id::{AssignmentId, MemberId, RosterId};
use tracing::{error, info, instrument, warn};

use crate::assign::{AssignError, AssignmentOrchestrator, PlacementReason, PlacementRequest, PlacementResult};
use crate::context::RunContext;

/// Inbound placement request as delivered by the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementTask {
    pub member_id: String,
    pub birth_year: i32,
    pub primary_position_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_position_key: Option<String>,
}

/// Outbound placement result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementReport {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignment_id: Option<AssignmentId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roster_id: Option<RosterId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_key: Option<PositionKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jersey_number: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<PlacementReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
}

impl PlacementReport {
    pub fn placed(result: &PlacementResult) -> Self {
        Self {
            success: true,
            assignment_id: Some(result.assignment.id),
            roster_id: Some(result.assignment.roster_id),
            position_key: Some(result.assignment.position),
            jersey_number: Some(result.assignment.jersey_number),
            reason: Some(result.reason),
            error_kind: None,
        }
    }

    pub fn failed(error_kind: impl Into<String>) -> Self {
        Self {
            success: false,
            assignment_id: None,
            roster_id: None,
            position_key: None,
            jersey_number: None,
            reason: None,
            error_kind: Some(error_kind.into()),
        }
    }
}

/// What happened to one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed(PlacementReport),
    /// The kill switch was set; nothing was attempted.
    Paused,
    /// The member is not in a state that gets placed.
    Skipped { reason: String },
    Failed {
        report: PlacementReport,
        retryable: bool,
    },
}

impl TaskOutcome {
    fn failed(error_kind: &str, retryable: bool) -> Self {
        TaskOutcome::Failed {
            report: PlacementReport::failed(error_kind),
            retryable,
        }
    }
}

/// Validates tasks and hands them to the orchestrator.
#[derive(Clone)]
pub struct TaskIntake {
    orchestrator: AssignmentOrchestrator,
    directory: Arc<dyn MemberDirectory>,
    switch: Arc<dyn AssignmentSwitch>,
}

impl TaskIntake {
    pub fn new(
        orchestrator: AssignmentOrchestrator,
        directory: Arc<dyn MemberDirectory>,
        switch: Arc<dyn AssignmentSwitch>,
    ) -> Self {
        Self {
            orchestrator,
            directory,
            switch,
        }
    }

    /// Handles one delivery of a placement task.
    #[instrument(skip(self, ctx, task), fields(request_id = %ctx.request_id, member_id = %task.member_id))]
    pub async fn handle(&self, ctx: &RunContext, task: &PlacementTask) -> TaskOutcome {
        match self.switch.is_paused().await {
            Ok(true) => {
                info!("Squad assignment paused, skipping task");
                return TaskOutcome::Paused;
            }
            Ok(false) => {}
            Err(e) => {
                warn!(error = %e, "Failed to read kill switch");
                return TaskOutcome::failed("STORE", true);
            }
        }

        let member_id = match MemberId::parse(&task.member_id) {
            Ok(id) => id,
            Err(e) => {
                error!(error = %e, "Task carries an invalid member ID");
                return TaskOutcome::failed("INVALID_MEMBER_ID", false);
            }
        };

        let status = match self.directory.member_status(&member_id).await {
            Ok(Some(status)) => status,
            Ok(None) => {
                error!("Member does not exist");
                return TaskOutcome::failed("MEMBER_NOT_FOUND", false);
            }
            Err(e) => {
                warn!(error = %e, "Failed to read member state");
                return TaskOutcome::failed("STORE", true);
            }
        };
        if !status.profile_complete {
            error!("Member has no complete profile");
            return TaskOutcome::failed("PROFILE_MISSING", false);
        }
        if !status.is_active() {
            info!(lifecycle = %status.lifecycle, "Member not active, skipping task");
            return TaskOutcome::Skipped {
                reason: format!("member is {}", status.lifecycle),
            };
        }

        let request = PlacementRequest {
            member_id,
            birth_year: task.birth_year,
            primary_position: task.primary_position_key.clone(),
            secondary_position: task.secondary_position_key.clone(),
        };

        match self.orchestrator.auto_assign(ctx, &request).await {
            Ok(result) => TaskOutcome::Completed(PlacementReport::placed(&result)),
            Err(e) => self.on_failure(e),
        }
    }

    fn on_failure(&self, err: AssignError) -> TaskOutcome {
        let retryable = err.is_retryable();
        if retryable {
            warn!(error = %err, kind = err.kind(), "Placement failed, will retry");
        } else {
            error!(error = %err, kind = err.kind(), "Placement failed permanently");
        }
        TaskOutcome::failed(err.kind(), retryable)
    }
}
