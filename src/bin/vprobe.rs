use std::{path::PathBuf, process::ExitCode, time::Duration};

use clap::Parser;
use tracing_subscriber::EnvFilter;
use vlan_probe::{ProbeConfigBuilder, ProbeRange, TerminationPolicy};

/// Bring VLAN sub-interfaces up and check them for DHCP and ARP activity
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Physical interface carrying the VLANs
    #[arg(short, long, default_value = "eth0")]
    iface: String,

    /// VLAN range to probe, e.g. 1-10
    #[arg(short, long)]
    range: ProbeRange,

    /// Number of sub-interfaces probed at once
    #[arg(short, long, default_value_t = 10)]
    threads: usize,

    /// Timeout in seconds for each probe command
    #[arg(long, default_value_t = 60)]
    timeout: u64,

    /// Directory the generated interface stanzas are written to
    #[arg(long, default_value = "/tmp")]
    config_dir: PathBuf,

    /// Keep reporting until every sub-interface is down, not only the last one
    #[arg(long)]
    wait_all: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let termination = if args.wait_all {
        TerminationPolicy::WaitForAll
    } else {
        TerminationPolicy::FirstTerminal
    };
    let config = match ProbeConfigBuilder::new(&args.iface)
        .with_range(args.range)
        .with_concurrency(args.threads)
        .with_timeout(Duration::from_secs(args.timeout))
        .with_config_dir(args.config_dir)
        .with_termination(termination)
        .build()
    {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {}", err);
            return ExitCode::FAILURE;
        }
    };

    let mut stdout = std::io::stdout().lock();
    match vlan_probe::run(config, &mut stdout).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}
