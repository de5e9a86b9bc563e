use std::io::Write;

use log::{debug, info};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::{
    error::{Error, Result},
    interface::ProbeRange,
    status::{Stage, StatusRecord},
};

/// When the aggregator stops consuming records.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum TerminationPolicy {
    /// Stop at the tear-down record of the range's last sub-interface.
    /// Records still in flight from other pipelines are not printed.
    #[default]
    FirstTerminal,
    /// Stop once every sub-interface in the range has been torn down.
    WaitForAll,
}

/// What the aggregator consumed before it stopped.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct Report {
    /// Records in the order they were printed.
    pub records: Vec<StatusRecord>,
    /// Tear-down records seen.
    pub completed: usize,
    /// Whether the tear-down of the range's last sub-interface arrived.
    pub terminal_seen: bool,
}

/// Single consumer of every pipeline's status records.
#[derive(Debug)]
pub struct ResultAggregator {
    results: UnboundedReceiver<StatusRecord>,
    policy: TerminationPolicy,
    expected: usize,
}

impl ResultAggregator {
    /// Consumes `results` until `policy` is met for `range`.
    pub fn new(
        results: UnboundedReceiver<StatusRecord>,
        policy: TerminationPolicy,
        range: ProbeRange,
    ) -> Self {
        Self {
            results,
            policy,
            expected: range.len(),
        }
    }

    /// Prints each record's message to `out` in arrival order until the policy
    /// says stop or every producer has hung up.
    pub async fn run<W: Write>(mut self, out: &mut W) -> Result<Report> {
        let mut report = Report::default();
        while let Some(record) = self.results.recv().await {
            writeln!(out, "{}", record.message).map_err(Error::Output)?;
            if record.stage == Stage::Down {
                report.completed += 1;
            }
            report.terminal_seen |= record.is_terminal;
            let done = match self.policy {
                TerminationPolicy::FirstTerminal => record.is_terminal,
                TerminationPolicy::WaitForAll => report.completed >= self.expected,
            };
            report.records.push(record);
            if done {
                debug!("stopping after {} records", report.records.len());
                break;
            }
        }
        out.flush().map_err(Error::Output)?;
        info!(
            "{} of {} sub-interfaces torn down",
            report.completed, self.expected
        );
        Ok(report)
    }
}
