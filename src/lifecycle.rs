use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
    process::Stdio,
};

use log::{debug, warn};
use tokio::process::Command;

use crate::{
    config::Toolset,
    error::{Error, Result},
    interface::SubInterface,
    status::{Stage, StatusRecord},
};

/// Brings sub-interfaces up from a generated ifupdown stanza and takes them down again.
#[derive(Debug, Clone)]
pub struct InterfaceLifecycle {
    tools: Toolset,
    config_dir: PathBuf,
}

impl InterfaceLifecycle {
    pub fn new(tools: Toolset, config_dir: impl Into<PathBuf>) -> Self {
        Self {
            tools,
            config_dir: config_dir.into(),
        }
    }

    pub fn artifact_path(&self, sub: &SubInterface) -> PathBuf {
        sub.artifact_path(&self.config_dir)
    }

    /// Renders the auto-start stanza with the sub-interface's `/30` link-local block.
    pub fn render_artifact(sub: &SubInterface) -> String {
        let block = sub.address_block();
        format!(
            "\nauto {sub}\niface {sub} inet static\n  address {}\n  netmask {}\n",
            block.addr(),
            block.netmask()
        )
    }

    /// Writes the artifact and activates the sub-interface.
    ///
    /// Failures are reported in the record only; the record is never terminal.
    pub async fn bring_up(&self, sub: &SubInterface) -> StatusRecord {
        let message = match self.try_bring_up(sub).await {
            Ok(()) => format!("[*] Interface {} started", sub),
            Err(err @ Error::ConfigWrite { .. }) => {
                format!("[*] Interface {} File Error: {}", sub, err)
            }
            Err(err) => format!("[*] Interface {} Start ERROR: {}", sub, err),
        };
        StatusRecord::new(sub.index(), Stage::Up, message)
    }

    async fn try_bring_up(&self, sub: &SubInterface) -> Result<()> {
        let path = self.artifact_path(sub);
        tokio::fs::write(&path, Self::render_artifact(sub))
            .await
            .map_err(|source| Error::ConfigWrite {
                path: path.clone(),
                source,
            })?;
        debug!("{}: wrote {}", sub, path.display());
        self.run_interface_command(&self.tools.ifup, &path, sub)
            .await
    }

    /// Deactivates the sub-interface. The record is terminal iff `sub` is the
    /// last index of the range, whether or not the command succeeded.
    pub async fn bring_down(&self, sub: &SubInterface, range_end: u32) -> StatusRecord {
        let path = self.artifact_path(sub);
        let message = match self
            .run_interface_command(&self.tools.ifdown, &path, sub)
            .await
        {
            Ok(()) => format!("[*] Interface {}: Shutdown", sub),
            Err(err) => format!("[*] Interface {} Stop ERROR: {}", sub, err),
        };
        StatusRecord::new(sub.index(), Stage::Down, message).terminal(sub.index() == range_end)
    }

    async fn run_interface_command(
        &self,
        program: &str,
        artifact: &Path,
        sub: &SubInterface,
    ) -> Result<()> {
        let vlan = sub.to_string();
        let args = [OsStr::new("-i"), artifact.as_os_str(), OsStr::new(&vlan)];
        run_command(program, &args).await
    }
}

async fn run_command(program: &str, args: &[&OsStr]) -> Result<()> {
    let status = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map_err(|source| Error::CommandLaunch {
            program: program.into(),
            source,
        })?;
    if status.success() {
        Ok(())
    } else {
        warn!("{} {:?} exited with {}", program, args, status);
        Err(Error::CommandFailed {
            program: program.into(),
            status,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::testing::{fake_tool, quiet_tools};

    #[test]
    fn test_render_artifact() {
        let artifact = InterfaceLifecycle::render_artifact(&SubInterface::new("eth0", 36));
        assert_eq!(
            artifact,
            "\nauto eth0.36\niface eth0.36 inet static\n  \
             address 169.254.36.1\n  netmask 255.255.255.252\n"
        );
        let artifact = InterfaceLifecycle::render_artifact(&SubInterface::new("eth1", 255));
        assert!(artifact.contains("  address 169.254.0.1\n"));
    }

    #[tokio::test]
    async fn test_bring_up_writes_artifact_and_runs_ifup() {
        let dir = TempDir::new().unwrap();
        let mut tools = quiet_tools(dir.path());
        let log = dir.path().join("ifup.log");
        tools.ifup = fake_tool(
            dir.path(),
            "ifup",
            &format!(r#"echo "$1 $2 $3" > {}"#, log.display()),
        );
        let lifecycle = InterfaceLifecycle::new(tools, dir.path());
        let sub = SubInterface::new("eth0", 36);

        let record = lifecycle.bring_up(&sub).await;
        assert_eq!(record.message, "[*] Interface eth0.36 started");
        assert_eq!(record.stage, Stage::Up);
        assert!(!record.is_terminal);

        let artifact = fs::read_to_string(dir.path().join("interface_eth0.36")).unwrap();
        assert!(artifact.contains("address 169.254.36.1"));
        let invocation = fs::read_to_string(log).unwrap();
        assert_eq!(
            invocation.trim(),
            format!("-i {} eth0.36", dir.path().join("interface_eth0.36").display())
        );
    }

    #[tokio::test]
    async fn test_bring_up_reports_write_failure() {
        let dir = TempDir::new().unwrap();
        let lifecycle =
            InterfaceLifecycle::new(quiet_tools(dir.path()), dir.path().join("missing"));
        let record = lifecycle.bring_up(&SubInterface::new("eth0", 3)).await;
        assert!(record
            .message
            .starts_with("[*] Interface eth0.3 File Error: failed to write"));
        assert!(!record.is_terminal);
    }

    #[tokio::test]
    async fn test_bring_up_reports_command_failure() {
        let dir = TempDir::new().unwrap();
        let mut tools = quiet_tools(dir.path());
        tools.ifup = fake_tool(dir.path(), "ifup", "exit 1");
        let lifecycle = InterfaceLifecycle::new(tools, dir.path());
        let record = lifecycle.bring_up(&SubInterface::new("eth0", 3)).await;
        assert!(record
            .message
            .starts_with("[*] Interface eth0.3 Start ERROR:"));
        assert!(!record.is_terminal);
    }

    #[tokio::test]
    async fn test_bring_up_reports_missing_command() {
        let dir = TempDir::new().unwrap();
        let mut tools = quiet_tools(dir.path());
        tools.ifup = dir.path().join("no-such-ifup").to_string_lossy().into_owned();
        let lifecycle = InterfaceLifecycle::new(tools, dir.path());
        let record = lifecycle.bring_up(&SubInterface::new("eth0", 3)).await;
        assert!(record.message.contains("Start ERROR: failed to launch"));
    }

    #[tokio::test]
    async fn test_bring_down_terminal_only_for_range_end() {
        let dir = TempDir::new().unwrap();
        let lifecycle = InterfaceLifecycle::new(quiet_tools(dir.path()), dir.path());

        let record = lifecycle.bring_down(&SubInterface::new("eth0", 9), 10).await;
        assert_eq!(record.message, "[*] Interface eth0.9: Shutdown");
        assert!(!record.is_terminal);

        let record = lifecycle.bring_down(&SubInterface::new("eth0", 10), 10).await;
        assert_eq!(record.stage, Stage::Down);
        assert!(record.is_terminal);
    }

    #[tokio::test]
    async fn test_bring_down_terminal_despite_failure() {
        let dir = TempDir::new().unwrap();
        let mut tools = quiet_tools(dir.path());
        tools.ifdown = fake_tool(dir.path(), "ifdown", "exit 2");
        let lifecycle = InterfaceLifecycle::new(tools, dir.path());

        let record = lifecycle.bring_down(&SubInterface::new("eth0", 10), 10).await;
        assert!(record
            .message
            .starts_with("[*] Interface eth0.10 Stop ERROR:"));
        assert!(record.is_terminal);

        let record = lifecycle.bring_down(&SubInterface::new("eth0", 4), 10).await;
        assert!(!record.is_terminal);
    }
}
