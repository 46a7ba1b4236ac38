//! Userspace driver for the Nintendo Switch Pro Controller over USB.
//!
//! Brings the controller into streaming mode, loads factory stick
//! calibration, and forwards decoded state into a uinput virtual gamepad.

mod calibration;
mod error;
mod protocol;
mod report;
mod rumble;
mod session;
mod sink;
mod transport;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use error::Error;
use session::Session;
use sink::UinputSink;
use transport::HidTransport;

#[derive(Parser)]
#[command(name = "procon", about = "Nintendo Switch Pro Controller driver (USB -> uinput)")]
struct Args {
    /// Player LED to light (1-4)
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=4))]
    player: u8,

    /// Home button light brightness (0-100)
    #[arg(long)]
    home_light: Option<u8>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    let mut sink = UinputSink::new().context(
        "unable to open the uinput device; make sure the uinput kernel module is \
         loaded (`sudo modprobe uinput`) and you have permission to open it \
         (either as root or with udev rules)",
    )?;

    info!("Initializing Nintendo Switch Pro Controller...");
    let transport = HidTransport::open(protocol::VENDOR_ID, protocol::PRODUCT_ID).map_err(
        |e| match e {
            Error::DeviceNotFound { .. } => anyhow::Error::new(e).context(
                "unable to open the controller; make sure it is plugged in and you \
                 have permission to open it (either as root or with udev rules)",
            ),
            other => other.into(),
        },
    )?;

    let mut session = Session::start(transport, args.player)?;
    if !session.bootstrap().fully_acknowledged() {
        warn!("Running with a partially acknowledged bootstrap");
    }
    if let Some(brightness) = args.home_light {
        session.set_home_light(brightness)?;
    }

    info!("Enjoy!");
    match session.run(|decoded| sink.handle(decoded)) {
        Err(Error::Io(e)) => {
            Err(anyhow::anyhow!("I/O failed: {e}; did you just unplug the controller?"))
        }
        Err(other) => Err(other.into()),
        Ok(()) => Ok(()),
    }
}
