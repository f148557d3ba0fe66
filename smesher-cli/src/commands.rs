//! Smesher commands.
//!
//! Each [`Command`] asks the operator a few questions, makes one call to the
//! node, and prints the outcome. A failed call or a non-zero status code ends
//! the command; [`Session::run`] logs the error and returns control to the
//! caller. Only terminal I/O errors are passed up.

use std::collections::HashMap;
use std::fmt::Display;
use std::io::Write;
use std::str::FromStr;

use futures::StreamExt;
use strum::{Display as StrumDisplay, EnumIter, EnumMessage, EnumString};
use tokio::io::AsyncBufRead;
use tokio_util::sync::CancellationToken;

use crate::api_client::types::*;
use crate::api_client::SmesherApi;
use crate::error::{Error, Result};
use crate::interrupt::Interrupts;
use crate::terminal::Terminal;
use crate::tracing::prelude::*;
use crate::types::{Address, SmesherId};

/// Number of bytes the node calls one GiB.
///
/// This is not 2^30 (1,073,741,824). The node's tooling uses this value and
/// the sizes shown here are meant to match what it reports, so it is kept
/// as is until the node says otherwise.
pub const GIB: u64 = 1_262_485_504;

/// Rewards are requested as a single page starting at the first record.
pub const REWARDS_OFFSET: u32 = 0;
pub const REWARDS_LIMIT: u32 = 10_000;

/// Data creation always writes a single file.
pub const NUM_FILES: u32 = 1;

const PRINT_PREFIX: &str = ">";
const SEPARATOR: &str = "-----";

const ENTER_REWARDS_ADDRESS: &str = "Enter rewards address: ";
const ENTER_ADDRESS: &str = "Enter new rewards address: ";
const POS_DATA_DIR: &str = "Enter proof of space data directory (relative to node or absolute): ";
const POS_PROVIDER: &str = "Enter compute provider id (see `providers`): ";
const CONFIRM_DELETE_DATA: &str = "Delete proof of space data?";
const SMESHER_ID: &str = "Enter smesher id: ";

/// Commands understood by both front-ends.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    EnumString,
    EnumIter,
    EnumMessage,
    StrumDisplay,
    clap::Subcommand,
)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum Command {
    /// Show whether the node is smeshing
    #[strum(message = "Show whether the node is smeshing")]
    Status,
    /// Create proof of space data and start smeshing
    #[strum(message = "Create proof of space data and start smeshing")]
    Setup,
    /// Follow proof of space data creation progress
    #[strum(message = "Follow proof of space data creation progress (Ctrl-C stops)")]
    Progress,
    /// Stop smeshing
    #[strum(message = "Stop smeshing, optionally deleting the data")]
    Stop,
    /// List proof of space compute providers
    #[strum(message = "List proof of space compute providers")]
    Providers,
    /// Show the node's smesher id
    #[strum(message = "Show the node's smesher id")]
    SmesherId,
    /// Show the rewards address
    #[strum(message = "Show the rewards address")]
    RewardsAddress,
    /// Change the rewards address
    #[strum(message = "Change the rewards address")]
    SetRewardsAddress,
    /// Show rewards of a smesher id
    #[strum(message = "Show rewards of a smesher id")]
    Rewards,
    /// Show rewards of this node's smesher
    #[strum(message = "Show rewards of this node's smesher")]
    MyRewards,
}

/// Message printed for a smeshing status.
pub fn status_message(status: &SmeshingStatus) -> &'static str {
    match status {
        SmeshingStatus::Idle => "Proof of space data was not created.",
        SmeshingStatus::CreatingPostData => "Proof of space data creation is in progress.",
        SmeshingStatus::Active => "Proof of space data was created and is used for smeshing.",
        SmeshingStatus::Unknown(_) => "Unexpected api result.",
    }
}

/// Size of one unit in bytes: `bits_per_label * labels_per_unit / 8`.
pub fn unit_size_bytes(config: &PostConfig) -> u64 {
    u64::from(config.bits_per_label).saturating_mul(config.labels_per_unit) / 8
}

/// Convert bytes to GiB using [`GIB`].
pub fn bytes_to_gib(bytes: u64) -> f64 {
    bytes as f64 / GIB as f64
}

/// Number of labels a session with `num_units` units writes.
pub fn labels_target(num_units: u32, labels_per_unit: u64) -> u64 {
    u64::from(num_units).saturating_mul(labels_per_unit)
}

/// Whole percentage of `target` covered by `written`, rounded down.
///
/// A zero target reports 0%. A count far past the target saturates.
pub fn written_percent(written: u64, target: u64) -> u64 {
    if target == 0 {
        return 0;
    }
    u64::try_from(u128::from(written) * 100 / u128::from(target)).unwrap_or(u64::MAX)
}

fn parse_number<T>(input: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    input
        .parse()
        .map_err(|e| Error::InvalidInput(format!("'{}' is not a valid number: {}", input, e)))
}

/// Display names of compute APIs.
///
/// Built once at startup and handed to the provider formatter by reference.
/// APIs missing from the table print as an empty string.
#[derive(Debug, Clone)]
pub struct ComputeApiNames(HashMap<ComputeApi, &'static str>);

impl ComputeApiNames {
    pub fn new() -> Self {
        Self(HashMap::from([
            (ComputeApi::Unspecified, "Unspecified"),
            (ComputeApi::Cpu, "CPU"),
            (ComputeApi::Cuda, "CUDA"),
            (ComputeApi::Vulkan, "VULKAN"),
        ]))
    }

    pub fn name(&self, api: &ComputeApi) -> &'static str {
        self.0.get(api).copied().unwrap_or_default()
    }
}

impl Default for ComputeApiNames {
    fn default() -> Self {
        Self::new()
    }
}

/// Print the compute provider list.
pub fn write_providers(
    out: &mut impl Write,
    providers: &[ComputeProvider],
    names: &ComputeApiNames,
) -> std::io::Result<()> {
    if providers.is_empty() {
        writeln!(out, "{} No supported compute providers found", PRINT_PREFIX)?;
        return Ok(());
    }

    writeln!(out, "{} Supported providers on your system:", PRINT_PREFIX)?;
    for (i, provider) in providers.iter().enumerate() {
        if i != 0 {
            writeln!(out, "{}", SEPARATOR)?;
        }
        writeln!(out, "Provider id: {}", provider.id)?;
        writeln!(out, "Model: {}", provider.model)?;
        writeln!(out, "Compute api: {}", names.name(&provider.compute_api))?;
        writeln!(out, "Performance: {}", provider.performance)?;
    }
    Ok(())
}

/// Print a rewards page.
pub fn write_rewards(out: &mut impl Write, page: &RewardsPage) -> std::io::Result<()> {
    writeln!(out, "{} Total rewards: {}", PRINT_PREFIX, page.total)?;
    for (i, reward) in page.rewards.iter().enumerate() {
        if i != 0 {
            writeln!(out, "{}", SEPARATOR)?;
        }
        writeln!(out, "Layer: {}", reward.layer)?;
        writeln!(out, "Total: {}", reward.total)?;
        writeln!(out, "Layer reward: {}", reward.layer_reward)?;
        writeln!(out, "Layer computed: {}", reward.layer_computed)?;
        writeln!(out, "Coinbase: {}", reward.coinbase)?;
        writeln!(out, "Smesher: {}", reward.smesher)?;
    }
    Ok(())
}

/// Lines for the node's config file that keep smeshing across restarts.
pub fn node_config_snippet(request: &StartSmeshingRequest) -> serde_json::Value {
    serde_json::json!({
        "smeshing": {
            "smeshing-start": true,
            "smeshing-coinbase": request.coinbase.address.to_string(),
            "smeshing-opts": {
                "smeshing-opts-datadir": request.opts.data_dir,
                "smeshing-opts-numunits": request.opts.num_units,
                "smeshing-opts-numfiles": request.opts.num_files,
                "smeshing-opts-provider": request.opts.compute_provider_id,
                "smeshing-opts-throttle": request.opts.throttle,
            }
        }
    })
}

/// Executes commands against a node on behalf of the operator.
pub struct Session<A, R, W> {
    api: A,
    terminal: Terminal<R, W>,
    compute_apis: ComputeApiNames,
    interrupts: Interrupts,
}

impl<A, R, W> Session<A, R, W>
where
    A: SmesherApi,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    pub fn new(api: A, terminal: Terminal<R, W>, compute_apis: ComputeApiNames) -> Self {
        Self {
            api,
            terminal,
            compute_apis,
            interrupts: Interrupts::new(),
        }
    }

    /// Route interrupts from `interrupts` to commands that accept them.
    pub fn with_interrupts(mut self, interrupts: Interrupts) -> Self {
        self.interrupts = interrupts;
        self
    }

    pub fn terminal(&mut self) -> &mut Terminal<R, W> {
        &mut self.terminal
    }

    pub fn into_parts(self) -> (A, Terminal<R, W>) {
        (self.api, self.terminal)
    }

    /// Run a command, logging any failure that does not end the session.
    pub async fn run(&mut self, command: Command) -> Result<()> {
        match self.execute(command).await {
            Err(e) if e.ends_session() => Err(e),
            Err(e) => {
                error!(command = %command, error = %e, "Command failed");
                Ok(())
            }
            Ok(()) => Ok(()),
        }
    }

    /// Run a command, returning any failure.
    pub async fn execute(&mut self, command: Command) -> Result<()> {
        debug!(command = %command, "Executing command");
        match command {
            Command::Status => self.print_smeshing_status().await,
            Command::Setup => self.setup_pos().await,
            Command::Progress => {
                let armed = self.interrupts.arm();
                self.print_post_data_creation_progress(armed.token()).await
            }
            Command::Stop => self.stop_smeshing().await,
            Command::Providers => self.print_pos_providers().await,
            Command::SmesherId => self.print_smesher_id().await,
            Command::RewardsAddress => self.print_rewards_address().await,
            Command::SetRewardsAddress => self.set_rewards_address().await,
            Command::Rewards => self.print_smesher_rewards().await,
            Command::MyRewards => self.print_current_smesher_rewards().await,
        }
    }

    pub async fn print_smeshing_status(&mut self) -> Result<()> {
        let status = self.api.smeshing_status().await?;
        if let SmeshingStatus::Unknown(raw) = &status {
            warn!(status = %raw, "Node reported an unknown smeshing status");
        }
        writeln!(self.terminal.out(), "{} {}", PRINT_PREFIX, status_message(&status))?;
        Ok(())
    }

    /// Interactive proof of space data creation setup.
    pub async fn setup_pos(&mut self) -> Result<()> {
        let config = self.api.post_config().await?;

        let address: Address = self
            .terminal
            .input_not_blank(ENTER_REWARDS_ADDRESS)
            .await?
            .parse()?;
        let data_dir = self.terminal.input_not_blank(POS_DATA_DIR).await?;

        let unit_size = unit_size_bytes(&config);
        let unit_size_gib = bytes_to_gib(unit_size);
        // The node enforces min/max; they are shown as guidance only.
        let size_prompt = format!(
            "Enter number of units. Each unit is {:.4} GiB. Minimum: {}, maximum: {}: ",
            unit_size_gib, config.min_num_units, config.max_num_units
        );
        let num_units: u64 = parse_number(&self.terminal.input_not_blank(&size_prompt).await?)?;
        let num_units = u32::try_from(num_units)
            .map_err(|_| Error::InvalidInput(format!("{} units is too many", num_units)))?;

        let provider_id: u32 = parse_number(&self.terminal.input_not_blank(POS_PROVIDER).await?)?;

        let out = self.terminal.out();
        writeln!(out, "{} Proof of space setup request summary", PRINT_PREFIX)?;
        writeln!(out, "Directory path (relative to node or absolute): {}", data_dir)?;
        writeln!(out, "Number of units: {}", num_units)?;
        writeln!(out, "Size (GiB): {:.4}", unit_size_gib * f64::from(num_units))?;
        writeln!(out, "Compute provider id: {}", provider_id)?;
        writeln!(out, "Bits per label: {}", config.bits_per_label)?;
        writeln!(out, "Labels per unit: {}", config.labels_per_unit)?;
        writeln!(out, "Number of files: {}", NUM_FILES)?;

        let request = StartSmeshingRequest {
            coinbase: AccountId { address },
            opts: PostInitOpts {
                data_dir,
                num_units,
                num_files: NUM_FILES,
                compute_provider_id: provider_id,
                throttle: false,
            },
        };

        let status = self.api.start_smeshing(request.clone()).await?;
        if !status.code.is_ok() {
            return Err(Error::Rejected {
                action: "set up proof of space",
                code: status.code,
            });
        }

        let out = self.terminal.out();
        writeln!(
            out,
            "{} Proof of space setup has started and your node will be smeshing as soon as \
             it is complete. Please add the following to your node's config file so it \
             will continue smeshing after you restart it:",
            PRINT_PREFIX
        )?;
        writeln!(out, "{}", serde_json::to_string_pretty(&node_config_snippet(&request))?)?;
        Ok(())
    }

    /// Follow data creation progress until the node closes the stream, the
    /// stream fails, or `cancel` fires.
    pub async fn print_post_data_creation_progress(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let config = self.api.post_config().await?;
        let mut stream = self.api.post_setup_status_stream().await?;

        let mut initial = true;
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Stopped following proof of space data creation");
                    return Ok(());
                }
                next = stream.next() => next,
            };

            let status = match next {
                Some(status) => status?,
                None => {
                    info!("api server closed the server-side stream");
                    return Ok(());
                }
            };

            let target = labels_target(status.opts.num_units, config.labels_per_unit);
            let percent = written_percent(status.num_labels_written, target);

            let out = self.terminal.out();
            if initial {
                writeln!(out, "session options: {:?}", status.opts)?;
                writeln!(out, "config: {:?}", config)?;
                writeln!(out, "num labels target: {}", target)?;
                initial = false;
            }
            if let (PostSetupState::Error, Some(message)) = (&status.state, &status.error_message) {
                warn!(error = %message, "Node reported a data creation error");
            }
            writeln!(
                out,
                "num labels written: {} ({}%)",
                status.num_labels_written, percent
            )?;
            out.flush()?;
        }
    }

    pub async fn stop_smeshing(&mut self) -> Result<()> {
        let delete_files = self.terminal.yes_or_no(CONFIRM_DELETE_DATA).await?;
        let status = self.api.stop_smeshing(delete_files).await?;
        if !status.code.is_ok() {
            return Err(Error::Rejected {
                action: "stop smeshing",
                code: status.code,
            });
        }

        writeln!(
            self.terminal.out(),
            "{} Smeshing stopped. Don't forget to remove smeshing related data from your node's \
             config file or startup flags so it won't start smeshing after you restart it",
            PRINT_PREFIX
        )?;
        Ok(())
    }

    pub async fn print_pos_providers(&mut self) -> Result<()> {
        let providers = self.api.post_compute_providers(false).await?;
        write_providers(self.terminal.out(), &providers, &self.compute_apis)?;
        Ok(())
    }

    pub async fn print_smesher_id(&mut self) -> Result<()> {
        let id = self.api.smesher_id().await?;
        writeln!(self.terminal.out(), "{} Smesher id: {}", PRINT_PREFIX, id)?;
        Ok(())
    }

    pub async fn print_rewards_address(&mut self) -> Result<()> {
        let address = self.api.rewards_address().await?;
        writeln!(self.terminal.out(), "{} Rewards address is: {}", PRINT_PREFIX, address)?;
        Ok(())
    }

    /// Set the rewards address to one entered by the operator.
    pub async fn set_rewards_address(&mut self) -> Result<()> {
        let address: Address = self.terminal.input_not_blank(ENTER_ADDRESS).await?.parse()?;
        let status = self.api.set_rewards_address(address).await?;

        let out = self.terminal.out();
        if status.code.is_ok() {
            writeln!(out, "{} Rewards address set to: {}", PRINT_PREFIX, address)?;
        } else {
            writeln!(out, "{} Response status code: {}", PRINT_PREFIX, status.code)?;
        }
        Ok(())
    }

    /// Rewards of a smesher id entered by the operator.
    pub async fn print_smesher_rewards(&mut self) -> Result<()> {
        let smesher_id: SmesherId = self.terminal.input_not_blank(SMESHER_ID).await?.parse()?;
        self.print_rewards_of(&smesher_id).await
    }

    /// Rewards of the smesher id configured on the node.
    pub async fn print_current_smesher_rewards(&mut self) -> Result<()> {
        let smesher_id = self.api.smesher_id().await?;
        writeln!(self.terminal.out(), "{} Smesher id: {}", PRINT_PREFIX, smesher_id)?;
        self.print_rewards_of(&smesher_id).await
    }

    async fn print_rewards_of(&mut self, smesher_id: &SmesherId) -> Result<()> {
        // TODO: let the operator page through rewards instead of one fixed page.
        let page = self
            .api
            .smesher_rewards(smesher_id, REWARDS_OFFSET, REWARDS_LIMIT)
            .await?;
        write_rewards(self.terminal.out(), &page)?;
        Ok(())
    }
}
