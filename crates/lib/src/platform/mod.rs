pub mod arch;
pub mod kind;
pub mod os;
pub mod paths;

use arch::Arch;
use os::Os;
use thiserror::Error;

/// A value that is not one of the fixed choices for a selector field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field} has invalid value '{value}': should be {expected}")]
pub struct UnknownVariant {
  pub field: &'static str,
  pub value: String,
  pub expected: String,
}

impl UnknownVariant {
  fn new(field: &'static str, value: &str, choices: &[&str]) -> Self {
    let expected = choices
      .iter()
      .map(|choice| format!("'{}'", choice))
      .collect::<Vec<_>>()
      .join(" ");
    Self {
      field,
      value: value.to_string(),
      expected,
    }
  }
}

/// Returns the `os/arch` pair of the running host (e.g., "linux/x86_64")
///
/// Returns `None` if the host is not one a manifest lists
pub fn host_platform() -> Option<String> {
  Some(format!("{}/{}", Os::current()?, Arch::current()?))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn expected_lists_every_choice_quoted() {
    let err = UnknownVariant::new("arch", "arm64", &["x86", "x86_64"]);
    assert_eq!(err.expected, "'x86' 'x86_64'");
    assert_eq!(err.value, "arm64");
  }
}
