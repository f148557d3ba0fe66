//! In-memory [`SmesherApi`] for command tests.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::sync::Mutex;

use super::types::*;
use super::{SmesherApi, StatusStream};
use crate::error::{Error, Result};
use crate::types::{Address, SmesherId};

/// A remote call as observed by the mock.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    SmeshingStatus,
    PostConfig,
    StartSmeshing(StartSmeshingRequest),
    StopSmeshing { delete_files: bool },
    ComputeProviders { benchmark: bool },
    SmesherId,
    RewardsAddress,
    SetRewardsAddress(Address),
    SmesherRewards {
        smesher_id: SmesherId,
        offset: u32,
        limit: u32,
    },
    StatusStream,
}

/// Canned responses. `None` makes the corresponding call fail.
#[derive(Default)]
pub struct MockApi {
    pub status: Option<SmeshingStatus>,
    pub config: Option<PostConfig>,
    pub start_code: RpcCode,
    pub stop_code: RpcCode,
    pub set_address_code: RpcCode,
    pub providers: Option<Vec<ComputeProvider>>,
    pub smesher_id: Option<SmesherId>,
    pub rewards_address: Option<Address>,
    pub rewards: Option<RewardsPage>,
    /// Items handed out by the status stream, taken on first open
    pub events: Mutex<Option<Vec<Result<PostSetupStatus>>>>,
    /// Stream that never yields, for cancellation tests
    pub stall_stream: bool,
    pub calls: Mutex<Vec<Call>>,
}

/// Error returned for calls without a canned response, as if the node
/// answered `UNAVAILABLE`.
pub fn unavailable() -> Error {
    Error::Rejected {
        action: "reach the node",
        code: RpcCode::Unavailable,
    }
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(self, events: Vec<Result<PostSetupStatus>>) -> Self {
        *self.events.lock().unwrap() = Some(events);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

fn status(code: RpcCode) -> RpcStatus {
    RpcStatus {
        code,
        message: String::new(),
    }
}

#[async_trait]
impl SmesherApi for MockApi {
    async fn smeshing_status(&self) -> Result<SmeshingStatus> {
        self.record(Call::SmeshingStatus);
        self.status.clone().ok_or_else(unavailable)
    }

    async fn post_config(&self) -> Result<PostConfig> {
        self.record(Call::PostConfig);
        self.config.clone().ok_or_else(unavailable)
    }

    async fn start_smeshing(&self, request: StartSmeshingRequest) -> Result<RpcStatus> {
        self.record(Call::StartSmeshing(request));
        Ok(status(self.start_code))
    }

    async fn stop_smeshing(&self, delete_files: bool) -> Result<RpcStatus> {
        self.record(Call::StopSmeshing { delete_files });
        Ok(status(self.stop_code))
    }

    async fn post_compute_providers(&self, benchmark: bool) -> Result<Vec<ComputeProvider>> {
        self.record(Call::ComputeProviders { benchmark });
        self.providers.clone().ok_or_else(unavailable)
    }

    async fn smesher_id(&self) -> Result<SmesherId> {
        self.record(Call::SmesherId);
        self.smesher_id.clone().ok_or_else(unavailable)
    }

    async fn rewards_address(&self) -> Result<Address> {
        self.record(Call::RewardsAddress);
        self.rewards_address.ok_or_else(unavailable)
    }

    async fn set_rewards_address(&self, address: Address) -> Result<RpcStatus> {
        self.record(Call::SetRewardsAddress(address));
        Ok(status(self.set_address_code))
    }

    async fn smesher_rewards(
        &self,
        smesher_id: &SmesherId,
        offset: u32,
        limit: u32,
    ) -> Result<RewardsPage> {
        self.record(Call::SmesherRewards {
            smesher_id: smesher_id.clone(),
            offset,
            limit,
        });
        self.rewards.clone().ok_or_else(unavailable)
    }

    async fn post_setup_status_stream(&self) -> Result<StatusStream> {
        self.record(Call::StatusStream);
        if self.stall_stream {
            return Ok(stream::pending().boxed());
        }
        let events = self.events.lock().unwrap().take().ok_or_else(unavailable)?;
        Ok(stream::iter(events).boxed())
    }
}
