//! Command-line probe for bus devices.
//!
//! Exercises the bus layer from a shell: enumerate detected adapters,
//! open a device by name and exchange raw bytes with it, or purge its
//! receive path. Useful for checking wiring and name conventions before
//! pointing real drive software at a device.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use drivebus::{BusRegistry, Error, MiscOperation};

#[derive(Parser)]
#[command(name = "drivebus-probe", about = "Probe and exercise bus devices")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List bus adapters detected by the vendor discovery backend
    List,
    /// Open a device, send bytes, optionally read a reply
    Send {
        /// Device name: /dev/ttyUSB0, COM3, host:port, FTDI0, ...
        device: String,
        /// Hex bytes to send, e.g. "55aa0f" or "55 aa 0f"
        #[arg(long)]
        data: String,
        /// Number of reply bytes to read after sending
        #[arg(long, default_value_t = 0)]
        read: usize,
        /// Baud rate for the open
        #[arg(long)]
        baud: Option<u32>,
    },
    /// Open a device and purge its receive path
    Purge {
        device: String,
        #[arg(long)]
        baud: Option<u32>,
    },
}

fn main() -> Result<()> {
    drivebus::tracing::init();
    let cli = Cli::parse();

    match cli.command {
        Command::List => list(),
        Command::Send {
            device,
            data,
            read,
            baud,
        } => send(&device, &data, read, baud),
        Command::Purge { device, baud } => purge(&device, baud),
    }
}

fn list() -> Result<()> {
    let count = drivebus::detected_bus_count();
    if count == 0 {
        println!("no bus adapters detected");
        return Ok(());
    }
    for index in 0..count {
        match drivebus::bus_device_details(index) {
            Ok(info) => println!(
                "{index}: {} ({}){}",
                info.device_name,
                info.description,
                if info.in_use { " [in use]" } else { "" },
            ),
            Err(e) => println!("{index}: <unavailable: {e}>"),
        }
    }
    Ok(())
}

fn open(registry: &mut BusRegistry, device: &str, baud: Option<u32>) -> Result<drivebus::BusHandle> {
    if let Some(baud) = baud {
        registry.set_baud_rate(baud);
    }
    registry
        .open(device)
        .with_context(|| format!("opening {device}"))
}

fn send(device: &str, data: &str, read: usize, baud: Option<u32>) -> Result<()> {
    let bytes = hex::decode(data.replace([' ', ':'], ""))
        .context("data must be hex bytes, e.g. \"55aa0f\"")?;

    let mut registry = BusRegistry::new();
    let bus = open(&mut registry, device, baud)?;

    for &byte in &bytes {
        registry
            .write_byte(bus, byte)
            .with_context(|| format!("queueing {} bytes", bytes.len()))?;
    }
    registry.transmit(bus).context("transmitting")?;
    println!("sent {} bytes", bytes.len());

    let mut reply = Vec::with_capacity(read);
    for _ in 0..read {
        match registry.read_byte(bus) {
            Ok(byte) => reply.push(byte),
            Err(Error::ShortIo { .. }) => break,
            Err(e) => return Err(e).context("reading reply"),
        }
    }
    if read > 0 {
        if reply.is_empty() {
            println!("no reply");
        } else {
            println!("reply: {}", hex::encode(&reply));
        }
    }

    registry.close(bus).context("closing")?;
    Ok(())
}

fn purge(device: &str, baud: Option<u32>) -> Result<()> {
    let mut registry = BusRegistry::new();
    let bus = open(&mut registry, device, baud)?;
    // open already purged once; purge again explicitly so the command
    // does what it says even if the semantics of open change
    if registry.misc_operation(bus, MiscOperation::PurgeRx).is_err() {
        registry.close(bus).ok();
        bail!("purge failed on {device}");
    }
    println!("purged {device}");
    registry.close(bus).context("closing")?;
    Ok(())
}
