//! Scatter/gather coordination of a classify request.
//!
//! The coordinator validates the request, checks read blocks, resolves one
//! shard iterator per shard group and runs one task per group on its search
//! pool. Each task tries the copies of its group in order until one answers.
//! The task completing last merges the per-shard results and hands the
//! response to the waiting [`ClassifyTask`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use chrono::Utc;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use log::{debug, info, warn};
use parking_lot::Mutex;
use rayon::{ThreadPool, ThreadPoolBuilder};
use uuid::Uuid;

use crate::action::config::ClassifyConfig;
use crate::action::request::ClassifyRequest;
use crate::action::response::{ClassifyResponse, ShardFailure};
use crate::action::shard::{
    SHARD_ACTION_NAME, ShardClassifyRequest, ShardClassifyResponse, ShardTarget,
};
use crate::classification::ClassifyResult;
use crate::cluster::{ClusterBlockService, ClusterService, RoutingResolver, ShardIterator};
use crate::error::{Result, SarissaError};
use crate::transport::Transport;

/// Transport action name of the classify request.
pub const ACTION_NAME: &str = "indices:data/read/classify";

/// What one shard group contributed.
#[derive(Debug, Default)]
enum ShardSlot {
    #[default]
    Pending,
    Completed(ClassifyResult),
    Failed(ShardFailure),
    /// No copy could be reached; counted in the total only.
    Inactive,
}

/// Runs classify requests against the shards of a cluster.
pub struct TransportClassifyAction {
    cluster: Arc<ClusterService>,
    routing: Arc<dyn RoutingResolver>,
    blocks: Arc<dyn ClusterBlockService>,
    transport: Arc<dyn Transport>,
    thread_pool: Arc<ThreadPool>,
    config: ClassifyConfig,
}

impl TransportClassifyAction {
    pub fn new(
        cluster: Arc<ClusterService>,
        routing: Arc<dyn RoutingResolver>,
        blocks: Arc<dyn ClusterBlockService>,
        transport: Arc<dyn Transport>,
        config: ClassifyConfig,
    ) -> Result<Self> {
        let thread_pool_size = config.thread_pool_size.unwrap_or_else(num_cpus::get);

        let thread_pool = ThreadPoolBuilder::new()
            .num_threads(thread_pool_size)
            .thread_name(|i| format!("classify-search-{i}"))
            .build()
            .map_err(|e| SarissaError::internal(format!("Failed to create thread pool: {e}")))?;

        Ok(Self {
            cluster,
            routing,
            blocks,
            transport,
            thread_pool: Arc::new(thread_pool),
            config,
        })
    }

    pub fn config(&self) -> &ClassifyConfig {
        &self.config
    }

    /// Run `request` and wait for the merged response, up to the configured deadline.
    pub fn execute(&self, request: ClassifyRequest) -> Result<ClassifyResponse> {
        let task = self.execute_async(request)?;
        match self.config.deadline() {
            Some(deadline) => task.wait_timeout(deadline),
            None => task.wait(),
        }
    }

    /// Dispatch `request` to every targeted shard group and return at once.
    ///
    /// Validation, block and routing errors are returned here, before any
    /// shard is contacted.
    pub fn execute_async(&self, mut request: ClassifyRequest) -> Result<ClassifyTask> {
        request.validate().into_result()?;

        let state = self.cluster.state();
        if let Some(err) = self.blocks.global_read_block(&state) {
            return Err(err);
        }
        let indices = vec![request.train_index().to_string()];
        if let Some(err) = self.blocks.indices_read_block(&state, &indices) {
            return Err(err);
        }
        let groups = self
            .routing
            .resolve_shards(&state, &indices, request.routing())?;

        request.set_now_in_millis(Utc::now().timestamp_millis());
        let id = Uuid::new_v4().to_string();
        info!(
            "[{id}] classifying on [{}] across {} shard groups",
            request.train_index(),
            groups.len()
        );

        let (sender, receiver) = crossbeam_channel::bounded(1);
        let cancelled = Arc::new(AtomicBool::new(false));
        let gather = Arc::new(Gather {
            id: id.clone(),
            request: Arc::new(request),
            slots: Mutex::new((0..groups.len()).map(|_| ShardSlot::Pending).collect()),
            remaining: AtomicUsize::new(groups.len()),
            sender,
            cancelled: Arc::clone(&cancelled),
        });

        if groups.is_empty() {
            gather.finish();
        }
        for (position, shard_it) in groups.into_iter().enumerate() {
            let gather = Arc::clone(&gather);
            let transport = Arc::clone(&self.transport);
            self.thread_pool.spawn(move || {
                let slot = perform(transport.as_ref(), &gather.request, shard_it);
                gather.on_slot(position, slot);
            });
        }

        Ok(ClassifyTask {
            id,
            receiver,
            cancelled,
        })
    }
}

impl std::fmt::Debug for TransportClassifyAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportClassifyAction")
            .field("threads", &self.thread_pool.current_num_threads())
            .field("config", &self.config)
            .finish()
    }
}

/// Try the copies of one shard group until one of them answers.
fn perform(transport: &dyn Transport, request: &ClassifyRequest, mut shard_it: ShardIterator) -> ShardSlot {
    let shard_id = shard_it.shard_id().clone();
    let mut last_failure: Option<(String, SarissaError)> = None;

    while let Some(copy) = shard_it.next_or_none() {
        let Some(node) = copy.current_node_id().map(String::from) else {
            continue;
        };
        let payload = ShardClassifyRequest::new(
            ShardTarget::new(shard_id.clone(), node.as_str()),
            request.clone(),
        )
        .to_bytes();

        let response = transport
            .send_request(&node, SHARD_ACTION_NAME, &payload)
            .and_then(|bytes| ShardClassifyResponse::from_bytes(&bytes));
        match response {
            Ok(response) => return ShardSlot::Completed(response.result),
            Err(e) => {
                if shard_it.remaining() > 0 {
                    debug!("{shard_id} failed on [{node}], retrying on the next copy: {e}");
                }
                last_failure = Some((node, e));
            }
        }
    }

    match last_failure {
        None => {
            debug!("{shard_id} has no active copy");
            ShardSlot::Inactive
        }
        Some((node, e)) if e.is_shard_not_available() => {
            debug!("{shard_id} is not available on [{node}]: {e}");
            ShardSlot::Inactive
        }
        Some((node, e)) => {
            warn!("{shard_id} failed on [{node}]: {}", e.detailed_message());
            ShardSlot::Failed(ShardFailure::new(shard_id, Some(node), e))
        }
    }
}

/// Collects shard slots; the last one to arrive triggers aggregation.
struct Gather {
    id: String,
    request: Arc<ClassifyRequest>,
    slots: Mutex<Vec<ShardSlot>>,
    remaining: AtomicUsize,
    sender: Sender<Result<ClassifyResponse>>,
    cancelled: Arc<AtomicBool>,
}

impl Gather {
    fn on_slot(&self, position: usize, slot: ShardSlot) {
        self.slots.lock()[position] = slot;
        if self.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.finish();
        }
    }

    fn finish(&self) {
        if self.cancelled.load(Ordering::SeqCst) {
            debug!("[{}] cancelled, discarding shard results", self.id);
            return;
        }
        let slots = std::mem::take(&mut *self.slots.lock());
        let _ = self.sender.send(aggregate(&self.request, slots));
    }
}

fn aggregate(request: &ClassifyRequest, slots: Vec<ShardSlot>) -> Result<ClassifyResponse> {
    let total_shards = slots.len();
    let mut results = Vec::new();
    let mut shard_failures = Vec::new();
    for slot in slots {
        match slot {
            ShardSlot::Completed(result) => results.push(result),
            ShardSlot::Failed(failure) => shard_failures.push(failure),
            ShardSlot::Pending | ShardSlot::Inactive => {}
        }
    }

    let result = ClassifyResult::from_average(&results);
    if !results.is_empty() && result.is_empty() {
        return Err(SarissaError::no_winner(
            "unable to evaluate the model, no winner class",
        ));
    }

    let took_in_millis = (Utc::now().timestamp_millis() - request.now_in_millis()).max(1) as u64;
    debug!(
        "classify on [{}]: {} of {total_shards} shards succeeded, {} failed, {} classes in {took_in_millis}ms",
        request.train_index(),
        results.len(),
        shard_failures.len(),
        result.len()
    );

    Ok(ClassifyResponse {
        eval_on: request.eval_on().to_string(),
        class_field: request.class_field().to_string(),
        result,
        top_n: request.top_n(),
        total_shards,
        successful_shards: results.len(),
        shard_failures,
        took_in_millis,
    })
}

/// Handle to a dispatched classify request.
#[derive(Debug)]
pub struct ClassifyTask {
    id: String,
    receiver: Receiver<Result<ClassifyResponse>>,
    cancelled: Arc<AtomicBool>,
}

impl ClassifyTask {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Stop waiting for this request. Shard tasks already running finish and
    /// their results are dropped.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Block until the merged response is available.
    pub fn wait(self) -> Result<ClassifyResponse> {
        if self.is_cancelled() {
            return Err(self.cancelled_error());
        }
        match self.receiver.recv() {
            Ok(response) => response,
            Err(_) => Err(self.cancelled_error()),
        }
    }

    /// Like [`wait`](Self::wait), giving up and cancelling after `timeout`.
    pub fn wait_timeout(self, timeout: Duration) -> Result<ClassifyResponse> {
        if self.is_cancelled() {
            return Err(self.cancelled_error());
        }
        match self.receiver.recv_timeout(timeout) {
            Ok(response) => response,
            Err(RecvTimeoutError::Timeout) => {
                self.cancel();
                Err(SarissaError::timeout(format!(
                    "classify request [{}] did not complete within {}ms",
                    self.id,
                    timeout.as_millis()
                )))
            }
            Err(RecvTimeoutError::Disconnected) => Err(self.cancelled_error()),
        }
    }

    fn cancelled_error(&self) -> SarissaError {
        SarissaError::cancelled(format!("classify request [{}] was cancelled", self.id))
    }
}
