use std::{path::PathBuf, time::Duration};

use crate::{
    aggregator::TerminationPolicy,
    error::{Error, RangeError, Result},
    interface::{ProbeRange, SubInterface},
};

/// Names of the external programs a probe run shells out to.
///
/// Only the program names can be substituted; the arguments each one
/// receives are fixed by the stage that runs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolset {
    /// Activation command, run as `<ifup> -i <artifact> <vlan>`.
    pub ifup: String,
    /// Deactivation command, run as `<ifdown> -i <artifact> <vlan>`.
    pub ifdown: String,
    /// Wrapper enforcing the probe time limit, run as `<timeout> <secs> <tool> ...`.
    pub timeout: String,
    /// Lease client, run as `<dhcp_client> -v <vlan>`.
    pub dhcp_client: String,
    /// Packet capture, run as `<capture> -lnni <vlan>`.
    pub capture: String,
}

impl Default for Toolset {
    fn default() -> Self {
        Self {
            ifup: "ifup".into(),
            ifdown: "ifdown".into(),
            timeout: "timeout".into(),
            dhcp_client: "dhclient".into(),
            capture: "tcpdump".into(),
        }
    }
}

/// Settings of one probe run, built with [`ProbeConfigBuilder`].
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub interface_name: String,
    pub range: ProbeRange,
    pub concurrency: usize,
    pub timeout: Duration,
    pub config_dir: PathBuf,
    pub tools: Toolset,
    pub termination: TerminationPolicy,
}

impl ProbeConfig {
    pub fn sub_interface(&self, index: u32) -> SubInterface {
        SubInterface::new(&self.interface_name, index)
    }
}

/// Builder for [`ProbeConfig`].
#[derive(Debug, Clone)]
pub struct ProbeConfigBuilder {
    interface_name: String,
    range: Option<ProbeRange>,
    concurrency: usize,
    timeout: Duration,
    config_dir: PathBuf,
    tools: Toolset,
    termination: TerminationPolicy,
}

impl ProbeConfigBuilder {
    /// Starts a configuration for VLANs on `interface_name` with 10 slots,
    /// a 60 s timeout and `/tmp` as artifact directory.
    pub fn new(interface_name: &str) -> Self {
        Self {
            interface_name: interface_name.into(),
            range: None,
            concurrency: 10,
            timeout: Duration::from_secs(60),
            config_dir: PathBuf::from("/tmp"),
            tools: Toolset::default(),
            termination: TerminationPolicy::default(),
        }
    }

    /// Sets the sub-interface numbers to probe. Required.
    pub fn with_range(mut self, range: ProbeRange) -> Self {
        self.range = Some(range);
        self
    }

    /// Sets how many sub-interfaces are probed at once. Must be at least 1.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Wall-clock limit handed to the timeout wrapper of every probe.
    /// Sub-second parts are rounded up to a whole second.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the directory the interface stanzas are written to.
    pub fn with_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_dir = dir.into();
        self
    }

    /// Replaces the external programs.
    pub fn with_tools(mut self, tools: Toolset) -> Self {
        self.tools = tools;
        self
    }

    /// Sets when the run stops reporting.
    pub fn with_termination(mut self, termination: TerminationPolicy) -> Self {
        self.termination = termination;
        self
    }

    /// Fails if no range was set or the concurrency limit is zero.
    pub fn build(self) -> Result<ProbeConfig> {
        let range = self.range.ok_or(RangeError::Empty)?;
        if self.concurrency == 0 {
            return Err(Error::InvalidConcurrency);
        }
        Ok(ProbeConfig {
            interface_name: self.interface_name,
            range,
            concurrency: self.concurrency,
            timeout: self.timeout,
            config_dir: self.config_dir,
            tools: self.tools,
            termination: self.termination,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProbeConfigBuilder::new("eth0")
            .with_range(ProbeRange::new(1, 10).unwrap())
            .build()
            .unwrap();
        assert_eq!(config.concurrency, 10);
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.config_dir, PathBuf::from("/tmp"));
        assert_eq!(config.tools, Toolset::default());
        assert_eq!(config.termination, TerminationPolicy::FirstTerminal);
        assert_eq!(config.sub_interface(3).to_string(), "eth0.3");
    }

    #[test]
    fn test_missing_range() {
        let result = ProbeConfigBuilder::new("eth0").build();
        assert!(matches!(
            result,
            Err(Error::InvalidRange(RangeError::Empty))
        ));
    }

    #[test]
    fn test_zero_concurrency() {
        let result = ProbeConfigBuilder::new("eth0")
            .with_range(ProbeRange::new(1, 1).unwrap())
            .with_concurrency(0)
            .build();
        assert!(matches!(result, Err(Error::InvalidConcurrency)));
    }
}
