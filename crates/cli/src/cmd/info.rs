use std::path::PathBuf;

use anyhow::Result;
use serde_json::json;

use vercheck_lib::consts::{DEFAULT_BASE_URL, DEFAULT_SCHEDULE};
use vercheck_lib::platform::arch::Arch;
use vercheck_lib::platform::host_platform;
use vercheck_lib::platform::kind::SoftwareType;
use vercheck_lib::platform::os::Os;
use vercheck_lib::platform::paths::{data_dir, default_config_path};

use crate::output::{OutputFormat, print_json, print_stat};

fn display_dir(dir: Option<PathBuf>) -> String {
  match dir {
    Some(dir) => dir.display().to_string(),
    None => "unavailable (set XDG_DATA_HOME or HOME)".to_string(),
  }
}

fn names<T: ToString>(values: &[T]) -> Vec<String> {
  values.iter().map(ToString::to_string).collect()
}

pub fn cmd_info(output: OutputFormat) -> Result<()> {
  let platform = host_platform();

  if output.is_json() {
    return print_json(&json!({
      "version": env!("CARGO_PKG_VERSION"),
      "platform": platform,
      "types": names(&SoftwareType::ALL),
      "os": names(&Os::ALL),
      "arch": names(&Arch::ALL),
      "config_file": default_config_path(),
      "data_dir": data_dir(),
    }));
  }

  println!("System:");
  match &platform {
    Some(platform) => print_stat("Platform", platform),
    None => print_stat("Platform", "not listed in version manifests"),
  }
  print_stat("Config file", &display_dir(default_config_path()));
  print_stat("Data dir", &display_dir(data_dir()));
  println!();
  println!("Options:");
  print_stat("type", &names(&SoftwareType::ALL).join(", "));
  print_stat("os", &names(&Os::ALL).join(", "));
  print_stat("arch", &names(&Arch::ALL).join(", "));
  print_stat("base_url", DEFAULT_BASE_URL);
  print_stat("watch --every", DEFAULT_SCHEDULE);

  Ok(())
}
