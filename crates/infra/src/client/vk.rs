use std::sync::Arc;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use vkrpc_core::{
    BatchCompiler, BatchPlan, CancellationRegistry, ChunkedLookupPlan, MultiEntityPlan, PageWalk, PaginatedPlan,
    RequestOrchestrator, RetryState,
};
use vkrpc_domain::constants::{EXECUTE_CODE_PARAM, SCRIPT_RUNTIME_ERROR_PREFIX};
use vkrpc_domain::{
    ApiError, CallOutcome, CallSpec, ClientConfig, MultiPageResult, PageResult, PartialError, Result,
};

use super::VkClientBuilder;

/// Sub-call failures reported by the last execute call that had any,
/// together with the script that produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecuteReport {
    pub code: String,
    pub errors: Vec<PartialError>,
}

/// One page of a plain (non-script) list method.
#[derive(Debug, Deserialize)]
struct ListPage<T> {
    #[serde(default)]
    count: Option<u64>,
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

/// Client bound to one access token.
///
/// Safe to share between tasks: retry counters are shared by every call made
/// through the same client.
pub struct VkClient {
    pub(super) orchestrator: RequestOrchestrator,
    pub(super) compiler: BatchCompiler,
    pub(super) registry: Arc<CancellationRegistry>,
    pub(super) last_execute: Mutex<Option<ExecuteReport>>,
}

impl VkClient {
    pub fn builder() -> VkClientBuilder {
        VkClientBuilder::default()
    }

    /// Client over the HTTP transport with settings from `config`.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }

    pub fn registry(&self) -> &Arc<CancellationRegistry> {
        &self.registry
    }

    /// Snapshot of both retry ladder counters.
    pub fn retry_state(&self) -> RetryState {
        self.orchestrator.governor().state()
    }

    /// Cancel every call in flight on this client's registry and refuse new
    /// ones. Returns the number of calls that were signalled.
    pub fn shutdown(&self) -> usize {
        let signalled = self.registry.shutdown_all();
        info!(signalled, "client shut down");
        signalled
    }

    pub async fn call(&self, call: &CallSpec) -> Result<CallOutcome> {
        self.orchestrator.call(call).await
    }

    pub async fn call_with_cancel(&self, call: &CallSpec, cancel: &CancellationToken) -> Result<CallOutcome> {
        self.orchestrator.call_with_cancel(call, cancel).await
    }

    /// Run `call` and decode its payload.
    pub async fn call_as<T: DeserializeOwned>(&self, call: &CallSpec) -> Result<T> {
        self.call(call).await?.decode()
    }

    /// Run a hand-written execute script.
    pub async fn execute(&self, code: impl Into<String>) -> Result<CallOutcome> {
        self.run_script(CallSpec::execute(code)).await
    }

    /// Compile `plan` and run the resulting script.
    pub async fn run_plan(&self, plan: &dyn BatchPlan) -> Result<CallOutcome> {
        let call = self.compiler.compile(plan)?;
        self.run_script(call).await
    }

    /// Sub-call failures of the most recent execute call that reported any.
    pub fn last_execute_report(&self) -> Option<ExecuteReport> {
        self.last_execute.lock().clone()
    }

    async fn run_script(&self, call: CallSpec) -> Result<CallOutcome> {
        let code = call.get(EXECUTE_CODE_PARAM).unwrap_or_default().to_string();

        match self.orchestrator.call(&call).await {
            Ok(outcome) => {
                if outcome.has_partial_errors() {
                    debug!(failed = outcome.partial_errors.len(), "execute finished with sub-call errors");
                    *self.last_execute.lock() =
                        Some(ExecuteReport { code, errors: outcome.partial_errors.clone() });
                }
                Ok(outcome)
            }
            Err(ApiError::Protocol(err)) if err.error_msg.starts_with(SCRIPT_RUNTIME_ERROR_PREFIX) => {
                error!(error = %err, script = %code, "execute script failed at runtime");
                Err(ApiError::Protocol(err))
            }
            Err(err) => Err(err),
        }
    }

    /// Fetch a whole collection, one script per `max_iterations` pages,
    /// resuming from the reported cursor until `count <= offset`.
    pub async fn fetch_all_pages<T: DeserializeOwned>(&self, plan: &PaginatedPlan) -> Result<PageResult<T>> {
        let mut result: PageResult<T> = self.run_plan(plan).await?.decode()?;
        let mut scripts = 1_u32;

        while let Some(next) = plan.resume_from(&result) {
            let before = result.offset;
            let page: PageResult<T> = self.run_plan(&next).await?.decode()?;
            if page.offset <= before && !page.is_complete() {
                return Err(ApiError::Parse(format!("pagination cursor stuck at offset {before}")));
            }
            result.absorb(page);
            scripts += 1;
        }

        debug!(scripts, count = result.count, items = result.items.len(), "paginated fetch complete");
        Ok(result)
    }

    /// Fetch a whole collection with one call per page, no scripts.
    pub async fn paginate_direct<T: DeserializeOwned>(&self, plan: &PaginatedPlan) -> Result<PageResult<T>> {
        let mut walk = PageWalk::unbounded(plan.offset(), plan.walk().page_size());
        if plan.progress().is_some() {
            walk = walk.tracking_progress();
        }
        let mut items = Vec::new();

        while let Some(offset) = walk.next_offset() {
            let outcome = self.call(&plan.page_call(offset)).await?;
            let page: ListPage<T> = outcome.decode()?;
            match plan.progress() {
                Some(field) => walk.record_progress(page.count, outcome.payload.get(field).and_then(Value::as_u64)),
                None => walk.record(page.count),
            }
            items.extend(page.items);
        }

        Ok(walk.finish(items))
    }

    /// First page for every entity of `plan`, split into as many scripts as
    /// the sub-call budget requires. Results keep the entity order.
    pub async fn run_multi_entity<T: DeserializeOwned>(&self, plan: &MultiEntityPlan) -> Result<MultiPageResult<T>> {
        let mut merged = MultiPageResult::default();
        for part in plan.split() {
            let result: MultiPageResult<T> = self.run_plan(&part).await?.decode()?;
            merged.extend(result);
        }
        Ok(merged)
    }

    /// Run a by-id lookup script and return the concatenated results.
    pub async fn lookup<T: DeserializeOwned>(&self, plan: &ChunkedLookupPlan) -> Result<Vec<T>> {
        let items: Option<Vec<T>> = self.run_plan(plan).await?.decode()?;
        Ok(items.unwrap_or_default())
    }
}
