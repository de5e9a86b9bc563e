use std::fmt;

/// Pipeline stage a [`StatusRecord`] was produced by.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum Stage {
    Up,
    DhcpProbe,
    ArpProbe,
    Down,
}

impl Stage {
    /// Order in which every pipeline runs its stages.
    pub const SEQUENCE: [Stage; 4] = [Stage::Up, Stage::DhcpProbe, Stage::ArpProbe, Stage::Down];
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Up => "up",
            Stage::DhcpProbe => "dhcp",
            Stage::ArpProbe => "arp",
            Stage::Down => "down",
        };
        f.write_str(name)
    }
}

/// One line of the run report. `is_terminal` marks the tear-down of the last sub-interface.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct StatusRecord {
    pub sub_index: u32,
    pub stage: Stage,
    pub message: String,
    pub is_terminal: bool,
}

impl StatusRecord {
    pub fn new(sub_index: u32, stage: Stage, message: String) -> Self {
        Self {
            sub_index,
            stage,
            message,
            is_terminal: false,
        }
    }

    pub fn terminal(mut self, is_terminal: bool) -> Self {
        self.is_terminal = is_terminal;
        self
    }
}
