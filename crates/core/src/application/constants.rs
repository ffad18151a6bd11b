// Engine constants (no magic values)
use std::time::Duration;

/// Prediction service health probe timeout (5s)
pub const PREDICTION_HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Single prediction timeout (2s)
pub const PREDICTION_TIMEOUT: Duration = Duration::from_secs(2);

/// Delay before the post-transition recompute reads the queue (1s)
pub const DEFAULT_RECOMPUTE_DELAY: Duration = Duration::from_secs(1);

/// Debounce of listener-triggered position repair (500ms)
pub const DEFAULT_HEAL_DEBOUNCE: Duration = Duration::from_millis(500);

/// Recomputed estimates within this many minutes of the stored one are not written
pub const RECOMPUTE_THRESHOLD_MINUTES: u32 = 2;

/// Renumbering passes before entries that left the waiting set are skipped
pub const RECALCULATE_ATTEMPTS: u32 = 2;

/// Shortest accepted updater interval
pub const MIN_UPDATER_INTERVAL: Duration = Duration::from_secs(1);

/// Periodic wait-time updater interval (2 minutes)
pub const DEFAULT_UPDATER_INTERVAL: Duration = Duration::from_secs(2 * 60);

/// Buffered change events per subscriber before it lags
pub const CHANGE_FEED_CAPACITY: usize = 1024;

/// Board: most recently called entries shown
pub const BOARD_RECENT_CALLED: usize = 5;

/// Board: most recently served entries shown
pub const BOARD_RECENT_SERVED: usize = 10;
