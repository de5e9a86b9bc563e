use log::{debug, trace};
use tokio::sync::mpsc::UnboundedSender;

use crate::{
    config::ProbeConfig,
    interface::SubInterface,
    lifecycle::InterfaceLifecycle,
    probe::{ProbeMethod, TimedProbe},
    status::{Stage, StatusRecord},
};

/// Per sub-interface sequence: up, DHCP probe, ARP probe, down.
///
/// Every stage reports exactly one record and the next stage always runs,
/// whatever the previous one reported.
#[derive(Debug, Clone)]
pub struct ProbePipeline {
    interface_name: String,
    range_end: u32,
    lifecycle: InterfaceLifecycle,
    probe: TimedProbe,
}

impl ProbePipeline {
    pub fn new(config: &ProbeConfig) -> Self {
        Self {
            interface_name: config.interface_name.clone(),
            range_end: config.range.end(),
            lifecycle: InterfaceLifecycle::new(config.tools.clone(), &config.config_dir),
            probe: TimedProbe::new(config.tools.clone(), config.timeout),
        }
    }

    pub async fn run(&self, index: u32, results: &UnboundedSender<StatusRecord>) {
        let sub = SubInterface::new(&self.interface_name, index);
        for stage in Stage::SEQUENCE {
            let record = self.run_stage(stage, &sub).await;
            debug!("{}: {} stage done", sub, stage);
            if results.send(record).is_err() {
                // aggregator is gone, the remaining stages still run
                trace!("{}: {} record dropped", sub, stage);
            }
        }
    }

    async fn run_stage(&self, stage: Stage, sub: &SubInterface) -> StatusRecord {
        match stage {
            Stage::Up => self.lifecycle.bring_up(sub).await,
            Stage::DhcpProbe => self.probe_stage(stage, sub, ProbeMethod::Dhcp).await,
            Stage::ArpProbe => self.probe_stage(stage, sub, ProbeMethod::Arp).await,
            Stage::Down => self.lifecycle.bring_down(sub, self.range_end).await,
        }
    }

    async fn probe_stage(
        &self,
        stage: Stage,
        sub: &SubInterface,
        method: ProbeMethod,
    ) -> StatusRecord {
        let outcome = self.probe.probe(sub, method).await;
        StatusRecord::new(sub.index(), stage, outcome.describe(sub, method))
    }
}
