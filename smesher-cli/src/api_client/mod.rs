//! API client library.
//!
//! This module provides a Rust client for the smesher API of a node, used by
//! the commands. [`SmesherApi`] is the seam the commands are written
//! against; [`Client`] implements it over the node's HTTP/JSON gateway with
//! reqwest.

pub mod types;

#[cfg(test)]
pub(crate) mod mock;

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};
use tokio_util::io::StreamReader;

use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::tracing::prelude::*;
use crate::types::{Address, SmesherId};
use types::*;

/// Stream of proof of space data creation updates.
///
/// Ends (`None`) when the node closes the stream.
pub type StatusStream = BoxStream<'static, Result<PostSetupStatus>>;

/// Longest accepted line of a streamed response.
const MAX_FRAME_LENGTH: usize = 1024 * 1024;

const SMESHING_STATUS: &str = "v1/smesher/smeshingstatus";
const POST_CONFIG: &str = "v1/smesher/postconfig";
const START_SMESHING: &str = "v1/smesher/startsmeshing";
const STOP_SMESHING: &str = "v1/smesher/stopsmeshing";
const COMPUTE_PROVIDERS: &str = "v1/smesher/postsetupcomputeproviders";
const SMESHER_ID: &str = "v1/smesher/smesherid";
const COINBASE: &str = "v1/smesher/coinbase";
const SET_COINBASE: &str = "v1/smesher/setcoinbase";
const SMESHER_REWARDS: &str = "v1/globalstate/smesherrewards";
const POST_SETUP_STATUS_STREAM: &str = "v1/smesher/postsetupstatusstream";

/// Remote operations the commands rely on.
#[async_trait]
pub trait SmesherApi: Send + Sync {
    /// Current smeshing state.
    async fn smeshing_status(&self) -> Result<SmeshingStatus>;

    /// Proof of space sizing parameters.
    async fn post_config(&self) -> Result<PostConfig>;

    /// Start proof of space data creation followed by smeshing.
    async fn start_smeshing(&self, request: StartSmeshingRequest) -> Result<RpcStatus>;

    /// Stop smeshing, optionally deleting the proof of space data.
    async fn stop_smeshing(&self, delete_files: bool) -> Result<RpcStatus>;

    /// Compute providers on the node's host.
    async fn post_compute_providers(&self, benchmark: bool) -> Result<Vec<ComputeProvider>>;

    async fn smesher_id(&self) -> Result<SmesherId>;

    async fn rewards_address(&self) -> Result<Address>;

    async fn set_rewards_address(&self, address: Address) -> Result<RpcStatus>;

    /// One page of rewards earned by `smesher_id`.
    async fn smesher_rewards(
        &self,
        smesher_id: &SmesherId,
        offset: u32,
        limit: u32,
    ) -> Result<RewardsPage>;

    /// Open the server-side stream of data creation progress.
    async fn post_setup_status_stream(&self) -> Result<StatusStream>;
}

/// HTTP client for the node's JSON API gateway.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: reqwest::Url,
    timeout: Duration,
}

impl Client {
    /// Build a client from configuration.
    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        let mut base_url = config.base_url()?;
        // Endpoint paths are relative; keep any path prefix of the base URL.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("smesher-cli/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url,
            timeout: config.timeout(),
        })
    }

    /// Build a client for `url` with the default timeout.
    pub fn with_base_url(url: impl Into<String>) -> Result<Self> {
        Self::from_config(&ApiConfig {
            url: url.into(),
            ..ApiConfig::default()
        })
    }

    pub fn base_url(&self) -> &reqwest::Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<reqwest::Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::Config(format!("invalid endpoint '{}': {}", path, e)))
    }

    /// Issue one unary call.
    async fn call<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp>
    where
        Req: Serialize + ?Sized + Sync,
        Resp: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        debug!(url = %url, "Calling node API");

        let response = self
            .http
            .post(url)
            .timeout(self.timeout)
            .json(body)
            .send()
            .await?
            .error_for_status()?;

        let bytes = response.bytes().await?;
        trace!(len = bytes.len(), "Node API response received");
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl SmesherApi for Client {
    async fn smeshing_status(&self) -> Result<SmeshingStatus> {
        let resp: SmeshingStatusResponse = self.call(SMESHING_STATUS, &Empty {}).await?;
        Ok(resp.status)
    }

    async fn post_config(&self) -> Result<PostConfig> {
        self.call(POST_CONFIG, &Empty {}).await
    }

    async fn start_smeshing(&self, request: StartSmeshingRequest) -> Result<RpcStatus> {
        let resp: StatusResponse = self.call(START_SMESHING, &request).await?;
        Ok(resp.status)
    }

    async fn stop_smeshing(&self, delete_files: bool) -> Result<RpcStatus> {
        let resp: StatusResponse = self
            .call(STOP_SMESHING, &StopSmeshingRequest { delete_files })
            .await?;
        Ok(resp.status)
    }

    async fn post_compute_providers(&self, benchmark: bool) -> Result<Vec<ComputeProvider>> {
        let resp: ComputeProvidersResponse = self
            .call(COMPUTE_PROVIDERS, &ComputeProvidersRequest { benchmark })
            .await?;
        Ok(resp.providers)
    }

    async fn smesher_id(&self) -> Result<SmesherId> {
        let resp: SmesherIdResponse = self.call(SMESHER_ID, &Empty {}).await?;
        Ok(resp.smesher_id.id)
    }

    async fn rewards_address(&self) -> Result<Address> {
        let resp: CoinbaseResponse = self.call(COINBASE, &Empty {}).await?;
        Ok(resp.account_id.address)
    }

    async fn set_rewards_address(&self, address: Address) -> Result<RpcStatus> {
        let request = SetCoinbaseRequest {
            id: AccountId { address },
        };
        let resp: StatusResponse = self.call(SET_COINBASE, &request).await?;
        Ok(resp.status)
    }

    async fn smesher_rewards(
        &self,
        smesher_id: &SmesherId,
        offset: u32,
        limit: u32,
    ) -> Result<RewardsPage> {
        let request = SmesherRewardsRequest {
            smesher_id,
            offset,
            max_results: limit,
        };
        self.call(SMESHER_REWARDS, &request).await
    }

    async fn post_setup_status_stream(&self) -> Result<StatusStream> {
        let url = self.endpoint(POST_SETUP_STATUS_STREAM)?;
        debug!(url = %url, "Opening node API stream");

        // No timeout: the stream stays open for as long as data is created.
        let response = self
            .http
            .post(url)
            .json(&Empty {})
            .send()
            .await?
            .error_for_status()?;

        let body = response.bytes_stream().map_err(std::io::Error::other);
        let lines = FramedRead::new(
            StreamReader::new(body),
            LinesCodec::new_with_max_length(MAX_FRAME_LENGTH),
        );

        Ok(lines
            .filter_map(|line| async move { decode_status_frame(line) })
            .boxed())
    }
}

/// Decode one line of the status stream. Blank lines are skipped.
fn decode_status_frame(
    line: std::result::Result<String, LinesCodecError>,
) -> Option<Result<PostSetupStatus>> {
    let line = match line {
        Ok(line) => line,
        Err(e) => {
            return Some(Err(Error::Stream {
                stream: "post setup status",
                message: e.to_string(),
            }))
        }
    };
    if line.trim().is_empty() {
        return None;
    }

    let frame: StreamFrame<PostSetupStatusEnvelope> = match serde_json::from_str(&line) {
        Ok(frame) => frame,
        Err(e) => return Some(Err(Error::Decode(e))),
    };

    match frame {
        StreamFrame {
            error: Some(status),
            ..
        } if !status.code.is_ok() => Some(Err(Error::Stream {
            stream: "post setup status",
            message: format!("node reported {}: {}", status.code, status.message),
        })),
        StreamFrame {
            result: Some(envelope),
            ..
        } => Some(Ok(envelope.status)),
        _ => Some(Err(Error::Stream {
            stream: "post setup status",
            message: "frame carried neither a result nor an error".into(),
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gets_trailing_slash() {
        let client = Client::with_base_url("http://node.local:9093/gateway").unwrap();
        assert_eq!(client.base_url().as_str(), "http://node.local:9093/gateway/");
        assert_eq!(
            client.endpoint(SMESHING_STATUS).unwrap().as_str(),
            "http://node.local:9093/gateway/v1/smesher/smeshingstatus"
        );
    }

    #[test]
    fn bad_url_is_a_config_error() {
        assert!(matches!(
            Client::with_base_url("::nope::"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn blank_lines_are_skipped() {
        assert!(decode_status_frame(Ok("   ".into())).is_none());
    }

    #[test]
    fn result_frame_decodes() {
        let line =
            r#"{"result": {"status": {"num_labels_written": 10, "opts": {"num_units": 1}}}}"#;
        let status = decode_status_frame(Ok(line.into())).unwrap().unwrap();
        assert_eq!(status.num_labels_written, 10);
        assert_eq!(status.opts.num_units, 1);
    }

    #[test]
    fn error_frame_is_a_stream_error() {
        let line = r#"{"error": {"code": 14, "message": "node shutting down"}}"#;
        let err = decode_status_frame(Ok(line.into())).unwrap().unwrap_err();
        match err {
            Error::Stream { message, .. } => {
                assert!(message.contains("14 (Unavailable)"));
                assert!(message.contains("node shutting down"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn garbage_frame_is_a_decode_error() {
        let err = decode_status_frame(Ok("{not json".into())).unwrap().unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn codec_error_is_a_stream_error() {
        let err = decode_status_frame(Err(LinesCodecError::MaxLineLengthExceeded))
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, Error::Stream { .. }));
    }
}
