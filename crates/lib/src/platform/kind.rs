use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::UnknownVariant;

/// Which product's manifest to poll (`/versions/<type>.json`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoftwareType {
  Server,
  Client,
}

impl SoftwareType {
  pub const ALL: [SoftwareType; 2] = [SoftwareType::Server, SoftwareType::Client];

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Server => "server",
      Self::Client => "client",
    }
  }
}

impl fmt::Display for SoftwareType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for SoftwareType {
  type Err = UnknownVariant;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::ALL
      .into_iter()
      .find(|kind| kind.as_str() == s)
      .ok_or_else(|| UnknownVariant::new("type", s, &Self::ALL.map(|kind| kind.as_str())))
  }
}
