//! Per-run diagnostic context.

use squad_id::RequestId;

/// Build and request metadata recorded on every placement span.
///
/// Passed explicitly into the orchestrator instead of living in process-wide
/// state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub service: &'static str,
    pub version: &'static str,
    pub request_id: RequestId,
}

impl RunContext {
    /// Context for a new request, stamped with this crate's name and version.
    pub fn new() -> Self {
        Self::with_request_id(RequestId::new())
    }

    /// Context for a request whose ID was assigned upstream.
    pub fn with_request_id(request_id: RequestId) -> Self {
        Self {
            service: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            request_id,
        }
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_context_carries_build_metadata() {
        let ctx = RunContext::new();
        assert_eq!(ctx.service, "squad-assigner");
        assert!(!ctx.version.is_empty());
        assert!(ctx.request_id.to_string().starts_with("req_"));
    }

    #[test]
    fn test_with_request_id_keeps_id() {
        let id = RequestId::new();
        assert_eq!(RunContext::with_request_id(id).request_id, id);
    }
}
