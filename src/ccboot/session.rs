use std::time::Duration;

use ccboot::{
    DeviceSelector, ProtocolConfig, Session,
    constants::{CC1800_PRODUCT_ID, CC1800_VENDOR_ID, DEFAULT_TIMEOUT_MS, MAX_TIMEOUT_MS},
    error::BootResult,
};
use clap::Args;
use clap_num::maybe_hex;
use tracing::info;

#[derive(Args, Debug, Clone)]
pub(crate) struct SessionOptions {
    /// Timeout for each USB request, in milliseconds
    #[clap(
        short,
        long,
        default_value_t = DEFAULT_TIMEOUT_MS,
        value_parser = clap::value_parser!(u64).range(1..=MAX_TIMEOUT_MS)
    )]
    timeout: u64,

    /// USB vendor ID of the boot ROM
    #[clap(long, value_parser = maybe_hex::<u16>, default_value_t = CC1800_VENDOR_ID)]
    vid: u16,

    /// USB product ID of the boot ROM
    #[clap(long, value_parser = maybe_hex::<u16>, default_value_t = CC1800_PRODUCT_ID)]
    pid: u16,

    #[clap(long, default_value_t = false)]
    no_progress: bool,

    /// write <address> <file> | read <address> <length> <file> | exec
    #[clap(required = true, trailing_var_arg = true, value_name = "COMMAND")]
    commands: Vec<String>,
}

pub(crate) fn handle_session(opts: SessionOptions) -> BootResult<()> {
    let selector = DeviceSelector {
        vendor_id: opts.vid,
        product_id: opts.pid,
        ..DeviceSelector::default()
    };
    let config = ProtocolConfig {
        timeout: Duration::from_millis(opts.timeout),
    };

    let mut session = Session::open(&selector, config)?;
    session.progress_bar(!opts.no_progress);

    let outcomes = session.run_args(opts.commands.as_slice())?;
    info!("Completed {} command(s)", outcomes.len());

    Ok(())
}
