use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::UnknownVariant;

/// Operating systems listed in a version manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
  Windows,
  Linux,
  MacOs,
}

impl Os {
  pub const ALL: [Os; 3] = [Os::Windows, Os::Linux, Os::MacOs];

  /// Detect the current operating system at runtime
  pub fn current() -> Option<Self> {
    match std::env::consts::OS {
      "linux" => Some(Self::Linux),
      "macos" => Some(Self::MacOs),
      "windows" => Some(Self::Windows),
      _ => None,
    }
  }

  /// Returns the key this OS is listed under in a manifest
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Windows => "windows",
      Self::Linux => "linux",
      Self::MacOs => "macos",
    }
  }
}

impl fmt::Display for Os {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for Os {
  type Err = UnknownVariant;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::ALL
      .into_iter()
      .find(|os| os.as_str() == s)
      .ok_or_else(|| UnknownVariant::new("os", s, &Self::ALL.map(|os| os.as_str())))
  }
}
