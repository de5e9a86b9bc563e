//! ## Example
//! Following example probes VLANs 10 to 20 on `eth0`, five sub-interfaces at a time.
//! Every sub-interface is brought up, checked for a DHCP lease and for ARP replies,
//! and brought down again; one status line per stage is printed as it arrives.
//! ```no_run
//! use std::time::Duration;
//! use vlan_probe::{ProbeConfigBuilder, ProbeRange};
//!
//! # async fn probe() -> vlan_probe::Result<()> {
//! let config = ProbeConfigBuilder::new("eth0")
//!     .with_range("10-20".parse::<ProbeRange>()?)
//!     .with_concurrency(5)
//!     .with_timeout(Duration::from_secs(30))
//!     .build()?;
//! let report = vlan_probe::run(config, &mut std::io::stdout()).await?;
//! println!("{} sub-interfaces torn down", report.completed);
//! # Ok(())
//! # }
//! ```
//! The external programs can be swapped through [`config::Toolset`], e.g. to run
//! a dry-run with stand-in scripts.

pub mod aggregator;
pub mod config;
pub mod error;
pub mod interface;
pub mod lifecycle;
pub mod pipeline;
pub mod pool;
pub mod probe;
pub mod scanner;
pub mod status;

#[cfg(test)]
pub(crate) mod testing;

use std::{io::Write, sync::Arc};

use log::info;
use tokio::sync::mpsc;

pub use aggregator::{Report, ResultAggregator, TerminationPolicy};
pub use config::{ProbeConfig, ProbeConfigBuilder, Toolset};
pub use error::{Error, RangeError, Result};
pub use interface::{ProbeRange, SubInterface};
pub use pipeline::ProbePipeline;
pub use pool::WorkerPool;
pub use probe::{ProbeMethod, ProbeOutcome, TimedProbe};
pub use status::{Stage, StatusRecord};

/// Probes every sub-interface in `config.range` and writes the status lines to `out`.
///
/// Returns once the aggregator's [`TerminationPolicy`] is satisfied. With the
/// default policy, pipelines still running at that point are left to finish
/// on their own.
pub async fn run<W: Write>(config: ProbeConfig, out: &mut W) -> Result<Report> {
    let pool = WorkerPool::new(config.concurrency)?;
    info!(
        "probing {}.{} with {} slots",
        config.interface_name,
        config.range,
        pool.limit()
    );

    let (tx, rx) = mpsc::unbounded_channel();
    let pipeline = Arc::new(ProbePipeline::new(&config));
    let _dispatcher = pool.spawn_range(config.range, move |index| {
        let pipeline = Arc::clone(&pipeline);
        let tx = tx.clone();
        async move { pipeline.run(index, &tx).await }
    });

    ResultAggregator::new(rx, config.termination, config.range)
        .run(out)
        .await
}
