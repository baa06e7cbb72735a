use serde::{Deserialize, Serialize};

use groundlink_proto::SystemReport;

/// Overall robot state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SystemState {
    Disabled,
    Autonomous,
    Manual,
    Shutdown,
}

impl SystemState {
    /// Codes above the known range read as `Shutdown`, matching how the
    /// bridge treats them.
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Disabled,
            1 => Self::Autonomous,
            2 => Self::Manual,
            _ => Self::Shutdown,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::Disabled => 0,
            Self::Autonomous => 1,
            Self::Manual => 2,
            Self::Shutdown => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Disabled => "Disabled",
            Self::Autonomous => "Autonomous",
            Self::Manual => "Manual",
            Self::Shutdown => "Shutdown",
        }
    }
}

/// Run mode the robot is operating under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SystemMode {
    Competition,
    Simulation,
    Practice,
}

impl SystemMode {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Competition,
            1 => Self::Simulation,
            _ => Self::Practice,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::Competition => 0,
            Self::Simulation => 1,
            Self::Practice => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Competition => "Competition",
            Self::Simulation => "Simulation",
            Self::Practice => "Practice",
        }
    }
}

/// Typed view of the system tuple carried on the system-state topic and
/// in the node report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemStatus {
    pub state: SystemState,
    pub mode: SystemMode,
    pub mobility: bool,
}

impl From<SystemReport> for SystemStatus {
    fn from(report: SystemReport) -> Self {
        Self {
            state: SystemState::from_code(report.state),
            mode: SystemMode::from_code(report.mode),
            mobility: report.mobility,
        }
    }
}

impl From<SystemStatus> for SystemReport {
    fn from(status: SystemStatus) -> Self {
        Self {
            state: status.state.code(),
            mode: status.mode.code(),
            mobility: status.mobility,
        }
    }
}

impl std::fmt::Display for SystemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} / {} / mobility {}",
            self.state.name(),
            self.mode.name(),
            if self.mobility { "enabled" } else { "disabled" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_report_round_trip() {
        let report = SystemReport {
            state: 1,
            mode: 0,
            mobility: true,
        };
        let status = SystemStatus::from(report);
        assert_eq!(status.state, SystemState::Autonomous);
        assert_eq!(status.mode, SystemMode::Competition);
        assert_eq!(SystemReport::from(status), report);
    }

    #[test]
    fn out_of_range_codes_saturate() {
        assert_eq!(SystemState::from_code(9), SystemState::Shutdown);
        assert_eq!(SystemMode::from_code(9), SystemMode::Practice);
    }
}
