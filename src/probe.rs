use std::{fmt, net::Ipv4Addr, process::Stdio, sync::OnceLock, time::Duration};

use log::{debug, info, warn};
use nix::{
    errno::Errno,
    sys::signal::{killpg, Signal as UnixSignal},
    unistd::Pid,
};
use regex::Regex;
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;

use crate::{
    config::Toolset,
    interface::SubInterface,
    scanner::{spawn_scanner, Signal},
};

static DHCP_ACK_RE: OnceLock<Regex> = OnceLock::new();
static ARP_REPLY_RE: OnceLock<Regex> = OnceLock::new();
static ADDRESS_RE: OnceLock<Regex> = OnceLock::new();

fn address_re() -> &'static Regex {
    ADDRESS_RE
        .get_or_init(|| Regex::new(r"[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}").unwrap())
}

/// How liveness is observed on a sub-interface.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum ProbeMethod {
    /// Negotiate a lease and wait for the server's acknowledgment.
    Dhcp,
    /// Capture passively and wait for any ARP reply.
    Arp,
}

impl ProbeMethod {
    pub fn signal_pattern(&self) -> &'static Regex {
        match self {
            ProbeMethod::Dhcp => {
                DHCP_ACK_RE.get_or_init(|| Regex::new("DHCPACK.*?\n").unwrap())
            }
            ProbeMethod::Arp => {
                ARP_REPLY_RE.get_or_init(|| Regex::new("ARP, Reply.*?\n").unwrap())
            }
        }
    }

    fn program<'a>(&self, tools: &'a Toolset) -> &'a str {
        match self {
            ProbeMethod::Dhcp => &tools.dhcp_client,
            ProbeMethod::Arp => &tools.capture,
        }
    }

    fn args(&self, sub: &SubInterface) -> [String; 2] {
        match self {
            ProbeMethod::Dhcp => ["-v".into(), sub.to_string()],
            ProbeMethod::Arp => ["-lnni".into(), sub.to_string()],
        }
    }
}

impl fmt::Display for ProbeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeMethod::Dhcp => f.write_str("DHCP"),
            ProbeMethod::Arp => f.write_str("ARP"),
        }
    }
}

/// Liveness verdict for one probe of one sub-interface.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ProbeOutcome {
    /// Activity was seen; `address` is the first IPv4 address on the matched line.
    Live {
        method: ProbeMethod,
        address: Ipv4Addr,
    },
    /// No activity before the stream ended, including timeouts and launch failures.
    Dead,
}

impl ProbeOutcome {
    /// Builds the verdict from the scanner's signal. A match without a
    /// usable address counts as no activity.
    pub fn from_signal(method: ProbeMethod, signal: Signal) -> Self {
        signal
            .into_match()
            .and_then(|text| {
                address_re()
                    .find(&text)
                    .and_then(|found| found.as_str().parse::<Ipv4Addr>().ok())
            })
            .map_or(ProbeOutcome::Dead, |address| ProbeOutcome::Live {
                method,
                address,
            })
    }

    pub fn is_live(&self) -> bool {
        matches!(self, ProbeOutcome::Live { .. })
    }

    /// Status line for this verdict. `method` names the probe that ran; a live
    /// verdict reports the method it was observed with.
    pub fn describe(&self, sub: &SubInterface, method: ProbeMethod) -> String {
        match self {
            ProbeOutcome::Live {
                method: observed,
                address,
            } => format!("[+] Interface {}: Live ({}) - {}", sub, address, observed),
            ProbeOutcome::Dead => format!("[-] Interface {}: Failed - {}", sub, method),
        }
    }
}

/// Observation tool running in its own process group.
///
/// The timeout wrapper cannot pass SIGKILL on to the tool it supervises, so the
/// whole group is signalled instead. Dropping an unfinished tool kills the group.
#[derive(Debug)]
struct ToolProcess {
    child: Child,
    group: Option<Pid>,
}

impl ToolProcess {
    fn spawn(command: &mut Command) -> std::io::Result<Self> {
        let child = command.process_group(0).spawn()?;
        let group = child
            .id()
            .and_then(|pid| i32::try_from(pid).ok())
            .map(Pid::from_raw);
        Ok(Self { child, group })
    }

    fn kill_group(&self) {
        if let Some(group) = self.group {
            match killpg(group, UnixSignal::SIGKILL) {
                Ok(()) | Err(Errno::ESRCH) => {}
                Err(err) => warn!("failed to kill process group {}: {}", group, err),
            }
        }
    }

    /// Kills everything the tool started and reaps the wrapper.
    async fn terminate(mut self) {
        self.kill_group();
        if let Err(err) = self.child.wait().await {
            debug!("failed to reap observation tool: {}", err);
        }
        self.group = None;
    }
}

impl Drop for ToolProcess {
    fn drop(&mut self) {
        self.kill_group();
    }
}

/// Runs one observation tool under the timeout wrapper and watches its stderr.
#[derive(Debug, Clone)]
pub struct TimedProbe {
    tools: Toolset,
    timeout: Duration,
}

impl TimedProbe {
    /// Creates a probe that runs `tools` with a wall-clock limit of `timeout`.
    pub fn new(tools: Toolset, timeout: Duration) -> Self {
        Self { tools, timeout }
    }

    fn timeout_secs(&self) -> u64 {
        self.timeout.as_secs() + u64::from(self.timeout.subsec_nanos() > 0)
    }

    /// Probes `sub` once with `method`.
    ///
    /// Launch failures, timeouts and a stream that ends without a match all
    /// come back as [`ProbeOutcome::Dead`]. Once a signal arrives the tool's
    /// process group is killed and the wrapper reaped, so nothing outlives the
    /// call; the same happens if the returned future is dropped early.
    pub async fn probe(&self, sub: &SubInterface, method: ProbeMethod) -> ProbeOutcome {
        let program = method.program(&self.tools);
        debug!(
            "{}: launching {} {} {} {:?}",
            sub,
            self.tools.timeout,
            self.timeout_secs(),
            program,
            method.args(sub)
        );
        let mut command = Command::new(&self.tools.timeout);
        command
            .arg(self.timeout_secs().to_string())
            .arg(program)
            .args(method.args(sub))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        let mut tool = match ToolProcess::spawn(&mut command) {
            Ok(tool) => tool,
            Err(err) => {
                warn!("{}: failed to launch {} probe: {}", sub, method, err);
                return ProbeOutcome::Dead;
            }
        };
        let Some(stderr) = tool.child.stderr.take() else {
            warn!("{}: {} probe has no diagnostic stream", sub, method);
            return ProbeOutcome::Dead;
        };

        let token = CancellationToken::new();
        let _scanner_guard = token.clone().drop_guard();
        let signal = spawn_scanner(stderr, method.signal_pattern().clone(), token)
            .await
            .unwrap_or(Signal::EndOfStream);

        tool.terminate().await;

        let outcome = ProbeOutcome::from_signal(method, signal);
        info!("{}: {} probe finished: {:?}", sub, method, outcome);
        outcome
    }
}
