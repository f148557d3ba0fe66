//! Request and response types of the node's smesher API.
//!
//! The node's JSON gateway renders enums either by symbolic name or by
//! number, and 64-bit integers either as numbers or as decimal strings.
//! Decoding accepts all of these. Enum values this client does not know
//! decode to an explicit unknown variant instead of failing.

use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;
use strum::IntoStaticStr;

use crate::types::{Address, SmesherId};

/// Enum value as it appears on the wire.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawEnum {
    Code(i32),
    Name(String),
}

impl fmt::Display for RawEnum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawEnum::Code(code) => write!(f, "{}", code),
            RawEnum::Name(name) => f.write_str(name),
        }
    }
}

/// Accept a u64 encoded as a JSON number or a decimal string.
pub(crate) fn lenient_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(u64),
        Text(String),
    }

    match Repr::deserialize(deserializer)? {
        Repr::Number(n) => Ok(n),
        Repr::Text(s) => s.trim().parse().map_err(de::Error::custom),
    }
}

/// Smeshing state reported by the node.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawEnum")]
pub enum SmeshingStatus {
    Idle,
    CreatingPostData,
    Active,
    /// Anything else, including the protocol's "unspecified" value
    Unknown(String),
}

impl From<RawEnum> for SmeshingStatus {
    fn from(raw: RawEnum) -> Self {
        match &raw {
            RawEnum::Code(1) => Self::Idle,
            RawEnum::Code(2) => Self::CreatingPostData,
            RawEnum::Code(3) => Self::Active,
            RawEnum::Name(name) => match name.as_str() {
                "SMESHING_STATUS_IDLE" => Self::Idle,
                "SMESHING_STATUS_CREATING_POST_DATA" => Self::CreatingPostData,
                "SMESHING_STATUS_ACTIVE" => Self::Active,
                _ => Self::Unknown(raw.to_string()),
            },
            _ => Self::Unknown(raw.to_string()),
        }
    }
}

/// Hardware API a compute provider runs on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(from = "RawEnum")]
pub enum ComputeApi {
    #[default]
    Unspecified,
    Cpu,
    Cuda,
    Vulkan,
    Unknown(String),
}

impl From<RawEnum> for ComputeApi {
    fn from(raw: RawEnum) -> Self {
        match &raw {
            RawEnum::Code(0) => Self::Unspecified,
            RawEnum::Code(1) => Self::Cpu,
            RawEnum::Code(2) => Self::Cuda,
            RawEnum::Code(3) => Self::Vulkan,
            RawEnum::Name(name) => match name.as_str() {
                "COMPUTE_API_CLASS_UNSPECIFIED" => Self::Unspecified,
                "COMPUTE_API_CLASS_CPU" => Self::Cpu,
                "COMPUTE_API_CLASS_CUDA" => Self::Cuda,
                "COMPUTE_API_CLASS_VULKAN" => Self::Vulkan,
                _ => Self::Unknown(raw.to_string()),
            },
            _ => Self::Unknown(raw.to_string()),
        }
    }
}

/// Phase of proof of space data creation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "RawEnum")]
pub enum PostSetupState {
    #[default]
    NotStarted,
    InProgress,
    Complete,
    Error,
    Unknown(String),
}

impl From<RawEnum> for PostSetupState {
    fn from(raw: RawEnum) -> Self {
        match &raw {
            RawEnum::Code(1) => Self::NotStarted,
            RawEnum::Code(2) => Self::InProgress,
            RawEnum::Code(3) => Self::Complete,
            RawEnum::Code(4) => Self::Error,
            RawEnum::Name(name) => match name.as_str() {
                "STATE_NOT_STARTED" => Self::NotStarted,
                "STATE_IN_PROGRESS" => Self::InProgress,
                "STATE_COMPLETE" => Self::Complete,
                "STATE_ERROR" => Self::Error,
                _ => Self::Unknown(raw.to_string()),
            },
            _ => Self::Unknown(raw.to_string()),
        }
    }
}

/// Application status code carried in node responses.
///
/// The node uses gRPC status codes. Only [`RpcCode::Ok`] means success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, IntoStaticStr)]
#[serde(from = "i32")]
pub enum RpcCode {
    #[default]
    Ok,
    Cancelled,
    Unknown,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    ResourceExhausted,
    FailedPrecondition,
    Aborted,
    OutOfRange,
    Unimplemented,
    Internal,
    Unavailable,
    DataLoss,
    Unauthenticated,
    Other(i32),
}

impl RpcCode {
    pub fn is_ok(&self) -> bool {
        matches!(self, RpcCode::Ok)
    }

    /// Numeric value as sent by the node.
    pub fn code(&self) -> i32 {
        match self {
            RpcCode::Ok => 0,
            RpcCode::Cancelled => 1,
            RpcCode::Unknown => 2,
            RpcCode::InvalidArgument => 3,
            RpcCode::DeadlineExceeded => 4,
            RpcCode::NotFound => 5,
            RpcCode::AlreadyExists => 6,
            RpcCode::PermissionDenied => 7,
            RpcCode::ResourceExhausted => 8,
            RpcCode::FailedPrecondition => 9,
            RpcCode::Aborted => 10,
            RpcCode::OutOfRange => 11,
            RpcCode::Unimplemented => 12,
            RpcCode::Internal => 13,
            RpcCode::Unavailable => 14,
            RpcCode::DataLoss => 15,
            RpcCode::Unauthenticated => 16,
            RpcCode::Other(code) => *code,
        }
    }
}

impl From<i32> for RpcCode {
    fn from(code: i32) -> Self {
        match code {
            0 => RpcCode::Ok,
            1 => RpcCode::Cancelled,
            2 => RpcCode::Unknown,
            3 => RpcCode::InvalidArgument,
            4 => RpcCode::DeadlineExceeded,
            5 => RpcCode::NotFound,
            6 => RpcCode::AlreadyExists,
            7 => RpcCode::PermissionDenied,
            8 => RpcCode::ResourceExhausted,
            9 => RpcCode::FailedPrecondition,
            10 => RpcCode::Aborted,
            11 => RpcCode::OutOfRange,
            12 => RpcCode::Unimplemented,
            13 => RpcCode::Internal,
            14 => RpcCode::Unavailable,
            15 => RpcCode::DataLoss,
            16 => RpcCode::Unauthenticated,
            other => RpcCode::Other(other),
        }
    }
}

impl fmt::Display for RpcCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RpcCode::Other(code) => write!(f, "{}", code),
            known => write!(f, "{} ({})", known.code(), <&'static str>::from(known)),
        }
    }
}

/// Status block embedded in mutating responses.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct RpcStatus {
    #[serde(default)]
    pub code: RpcCode,
    #[serde(default)]
    pub message: String,
}

/// Proof of space sizing parameters of the node.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct PostConfig {
    #[serde(default)]
    pub bits_per_label: u32,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub labels_per_unit: u64,
    #[serde(default)]
    pub min_num_units: u32,
    #[serde(default)]
    pub max_num_units: u32,
}

/// Options of a proof of space data creation session.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PostInitOpts {
    #[serde(default)]
    pub data_dir: String,
    #[serde(default)]
    pub num_units: u32,
    #[serde(default)]
    pub num_files: u32,
    #[serde(default)]
    pub compute_provider_id: u32,
    #[serde(default)]
    pub throttle: bool,
}

/// Account reference as the node expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountId {
    pub address: Address,
}

/// Request to create proof of space data and start smeshing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartSmeshingRequest {
    pub coinbase: AccountId,
    pub opts: PostInitOpts,
}

/// One progress update of proof of space data creation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct PostSetupStatus {
    #[serde(default)]
    pub state: PostSetupState,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub num_labels_written: u64,
    #[serde(default)]
    pub opts: PostInitOpts,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// A proof of space compute provider available on the node's host.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct ComputeProvider {
    #[serde(default)]
    pub id: u32,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub compute_api: ComputeApi,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub performance: u64,
}

/// A reward earned by a smesher.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct Reward {
    #[serde(default)]
    pub layer: u32,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub total: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub layer_reward: u64,
    #[serde(default)]
    pub layer_computed: u32,
    #[serde(default)]
    pub coinbase: Address,
    #[serde(default)]
    pub smesher: SmesherId,
}

/// A page of rewards together with the number of rewards in total.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct RewardsPage {
    #[serde(default)]
    pub rewards: Vec<Reward>,
    #[serde(default, rename = "total_results")]
    pub total: u32,
}

// Envelopes that only exist on the wire.

#[derive(Debug, Serialize)]
pub(crate) struct Empty {}

#[derive(Debug, Deserialize)]
pub(crate) struct SmeshingStatusResponse {
    pub status: SmeshingStatus,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusResponse {
    #[serde(default)]
    pub status: RpcStatus,
}

#[derive(Debug, Serialize)]
pub(crate) struct StopSmeshingRequest {
    pub delete_files: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct ComputeProvidersRequest {
    pub benchmark: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ComputeProvidersResponse {
    #[serde(default)]
    pub providers: Vec<ComputeProvider>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SmesherIdBlock {
    pub id: SmesherId,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SmesherIdResponse {
    pub smesher_id: SmesherIdBlock,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CoinbaseResponse {
    pub account_id: AccountId,
}

#[derive(Debug, Serialize)]
pub(crate) struct SetCoinbaseRequest {
    pub id: AccountId,
}

#[derive(Debug, Serialize)]
pub(crate) struct SmesherRewardsRequest<'a> {
    pub smesher_id: &'a SmesherId,
    pub offset: u32,
    pub max_results: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PostSetupStatusEnvelope {
    pub status: PostSetupStatus,
}

/// One line of a server-side stream.
#[derive(Debug, Deserialize)]
pub(crate) struct StreamFrame<T> {
    pub result: Option<T>,
    pub error: Option<RpcStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("\"SMESHING_STATUS_IDLE\"", SmeshingStatus::Idle; "idle by name")]
    #[test_case("2", SmeshingStatus::CreatingPostData; "creating by code")]
    #[test_case("\"SMESHING_STATUS_ACTIVE\"", SmeshingStatus::Active; "active by name")]
    #[test_case("0", SmeshingStatus::Unknown("0".into()); "unspecified code")]
    #[test_case("42", SmeshingStatus::Unknown("42".into()); "future code")]
    #[test_case(
        "\"SMESHING_STATUS_SLEEPING\"",
        SmeshingStatus::Unknown("SMESHING_STATUS_SLEEPING".into());
        "future name"
    )]
    fn test_smeshing_status_decoding(json: &str, expected: SmeshingStatus) {
        let status: SmeshingStatus = serde_json::from_str(json).unwrap();
        assert_eq!(status, expected);
    }

    #[test]
    fn test_compute_api_decoding() {
        let json = r#"["COMPUTE_API_CLASS_CPU", 2, "COMPUTE_API_CLASS_VULKAN", 0, 7]"#;
        let apis: Vec<ComputeApi> = serde_json::from_str(json).unwrap();
        assert_eq!(
            apis,
            vec![
                ComputeApi::Cpu,
                ComputeApi::Cuda,
                ComputeApi::Vulkan,
                ComputeApi::Unspecified,
                ComputeApi::Unknown("7".into()),
            ]
        );
    }

    #[test]
    fn test_rpc_code_roundtrip_and_display() {
        for code in 0..=16 {
            assert_eq!(RpcCode::from(code).code(), code);
        }
        assert_eq!(RpcCode::from(99), RpcCode::Other(99));
        assert_eq!(RpcCode::Ok.to_string(), "0 (Ok)");
        assert_eq!(RpcCode::from(5).to_string(), "5 (NotFound)");
        assert_eq!(RpcCode::from(-3).to_string(), "-3");
    }

    #[test]
    fn test_missing_status_is_ok() {
        let resp: StatusResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.status.code.is_ok());

        let resp: StatusResponse =
            serde_json::from_str(r#"{"status": {"code": 3, "message": "bad dir"}}"#).unwrap();
        assert_eq!(resp.status.code, RpcCode::InvalidArgument);
        assert_eq!(resp.status.message, "bad dir");
    }

    #[test]
    fn test_post_config_accepts_string_u64() {
        let cfg: PostConfig = serde_json::from_str(
            r#"{"bits_per_label": 8, "labels_per_unit": "1048576",
                "min_num_units": 1, "max_num_units": 10}"#,
        )
        .unwrap();
        assert_eq!(cfg.labels_per_unit, 1_048_576);
        assert_eq!(cfg.bits_per_label, 8);
    }

    #[test]
    fn test_post_setup_status_decoding() {
        let frame: StreamFrame<PostSetupStatusEnvelope> = serde_json::from_str(
            r#"{"result": {"status": {"state": "STATE_IN_PROGRESS", "num_labels_written": "2048",
                "opts": {"data_dir": "/data/post", "num_units": 4, "num_files": 1,
                         "compute_provider_id": 1, "throttle": false}}}}"#,
        )
        .unwrap();
        let status = frame.result.unwrap().status;
        assert_eq!(status.state, PostSetupState::InProgress);
        assert_eq!(status.num_labels_written, 2048);
        assert_eq!(status.opts.num_units, 4);
        assert_eq!(status.opts.data_dir, "/data/post");
        assert!(frame.error.is_none());
    }

    #[test]
    fn test_start_request_encoding() {
        let req = StartSmeshingRequest {
            coinbase: AccountId {
                address: Address::from_slice(&[0xab]),
            },
            opts: PostInitOpts {
                data_dir: "post".into(),
                num_units: 2,
                num_files: 1,
                compute_provider_id: 0,
                throttle: false,
            },
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(
            json["coinbase"]["address"],
            "0x00000000000000000000000000000000000000ab"
        );
        assert_eq!(json["opts"]["num_files"], 1);
        assert_eq!(json["opts"]["throttle"], false);
    }

    #[test]
    fn test_invalid_u64_string_is_rejected() {
        let err = serde_json::from_str::<PostConfig>(r#"{"labels_per_unit": "lots"}"#);
        assert!(err.is_err());
    }
}
