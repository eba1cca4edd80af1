/// Application directory name used under the data and config roots.
pub const APP_NAME: &str = "vercheck";

/// Host serving `/versions/<type>.json` when no `base_url` is configured.
pub const DEFAULT_BASE_URL: &str = "https://www.teamspeak.com";

/// Schedule used by `vercheck watch` when `--every` is not given.
pub const DEFAULT_SCHEDULE: &str = "1h";

pub const DEFAULT_RECEIVE_PERIOD_DAYS: u64 = 2;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Current on-disk format of the per-instance state file.
pub const STATE_VERSION: u32 = 1;

/// An error logged within this window before the last event still counts as recent.
pub const RECENT_ERROR_GRACE_SECS: u64 = 120;

pub const SECS_PER_DAY: u64 = 86_400;
