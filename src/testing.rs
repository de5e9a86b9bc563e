use std::{fs, os::unix::fs::PermissionsExt, path::Path, time::Duration};

use crate::config::Toolset;

/// Writes an executable `sh` script standing in for an external tool.
pub(crate) fn fake_tool(dir: &Path, name: &str, body: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path.to_string_lossy().into_owned()
}

/// A toolset whose interface commands succeed and whose probes observe nothing.
pub(crate) fn quiet_tools(dir: &Path) -> Toolset {
    Toolset {
        ifup: fake_tool(dir, "ifup", "exit 0"),
        ifdown: fake_tool(dir, "ifdown", "exit 0"),
        timeout: "timeout".into(),
        dhcp_client: fake_tool(dir, "dhclient", r#"echo "DHCPDISCOVER on $2" >&2"#),
        capture: fake_tool(dir, "tcpdump", r#"echo "listening on $2" >&2"#),
    }
}

/// Reads the PID a fake tool recorded with `echo $$ > <path>`.
pub(crate) fn read_pid(path: &Path) -> u32 {
    fs::read_to_string(path).unwrap().trim().parse().unwrap()
}

/// Waits up to three seconds for `pid` to exit. A zombie counts as exited.
pub(crate) async fn wait_until_gone(pid: u32) -> bool {
    for _ in 0..60 {
        match fs::read_to_string(format!("/proc/{}/stat", pid)) {
            Err(_) => return true,
            Ok(stat) => {
                let state = stat
                    .rsplit_once(')')
                    .and_then(|(_, rest)| rest.split_whitespace().next());
                if state == Some("Z") {
                    return true;
                }
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}
