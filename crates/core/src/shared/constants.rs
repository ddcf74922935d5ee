/// Max horizontal/vertical movement (frame pixels) still counted as "holding still".
pub const DEFAULT_MOVEMENT_THRESHOLD: f64 = 15.0;
/// Consecutive still frames required before a face counts as stable.
pub const DEFAULT_STABILITY_THRESHOLD: u32 = 3;

/// Allowed center offset as a fraction of frame width / height.
pub const DEFAULT_CENTER_THRESHOLD_X: f64 = 0.2;
pub const DEFAULT_CENTER_THRESHOLD_Y: f64 = 0.15;
pub const DEFAULT_MIN_CENTERED_FRAMES: u32 = 2;

/// Eye-open probability below which an eye counts as closed.
pub const DEFAULT_BLINK_THRESHOLD: f64 = 0.3;
pub const DEFAULT_REQUIRED_BLINKS: u32 = 3;

pub const DEFAULT_REQUIRED_CONSECUTIVE_LIVE_FRAMES: u32 = 3;
/// Minimum Laplacian sharpness for a crop to be trusted as a live frame.
pub const DEFAULT_SHARPNESS_FLOOR: f64 = 3500.0;
pub const DEFAULT_SPOOF_ACCEPTANCE_LEVEL: f64 = 0.35;

pub const DEFAULT_MIN_INTERVAL_MS: u64 = 500;
pub const DEFAULT_MAX_PROCESSING_MS: u64 = 500;

/// Single-face events are only offered every Nth processed frame.
pub const DEFAULT_BATCH_UPDATE_INTERVAL: u64 = 3;

pub const STATUS_EVENT_INTERVAL_MS: u64 = 800;
pub const LIVENESS_EVENT_INTERVAL_MS: u64 = 700;
pub const ANTI_SPOOF_EVENT_INTERVAL_MS: u64 = 500;

pub const CONFIG_DIR_NAME: &str = "FaceGate";
pub const CONFIG_FILE_NAME: &str = "session.json";
