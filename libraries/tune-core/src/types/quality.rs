/// Streaming quality tiers
use serde::{Deserialize, Serialize};
use std::fmt;

/// Preferred streaming quality.
///
/// Catalog tracks carry up to five download variants ordered from lowest
/// (index 0) to highest (index 4) bitrate. Each tier walks those indices in
/// its own preference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioQuality {
    /// Low bitrate, saves bandwidth
    Low,
    /// Medium bitrate
    Medium,
    /// High bitrate
    High,
    /// Best available bitrate
    #[default]
    Highest,
}

impl AudioQuality {
    /// Download-variant indices to try, most preferred first
    pub fn preference_order(self) -> &'static [usize] {
        match self {
            Self::Highest => &[4, 3, 2, 1, 0],
            Self::High => &[3, 4, 2, 1, 0],
            Self::Medium => &[2, 3, 1, 4, 0],
            Self::Low => &[1, 0, 2, 3, 4],
        }
    }

    /// Convert to string representation
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Highest => "highest",
        }
    }

    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "highest" => Some(Self::Highest),
            _ => None,
        }
    }
}

impl fmt::Display for AudioQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
