use crate::error::{PanoError, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Most lookups a single resolution attempt may issue.
pub const MAX_LOOKUPS: u32 = 64;

/// Widest give-up radius accepted, in meters.
pub const MAX_GIVE_UP_RADIUS: f64 = 50_000.0;

/// Radius escalation settings for panorama lookups.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Radius of the first lookup in meters (default 10)
    pub initial_radius: f64,
    /// Added to the radius after each failed lookup (default 25)
    pub radius_step: f64,
    /// A lookup failing at or beyond this radius ends the search (default 100)
    pub give_up_radius: f64,
    /// Pause between a failed lookup and the next one (default none)
    pub retry_delay: Duration,
}

impl SearchConfig {
    /// Create the default configuration: 10 m, +25 m, give up at 100 m.
    pub fn new() -> Self {
        Self {
            initial_radius: 10.0,
            radius_step: 25.0,
            give_up_radius: 100.0,
            retry_delay: Duration::ZERO,
        }
    }

    /// Set the first lookup radius, clamped to `0..=MAX_GIVE_UP_RADIUS`.
    pub fn initial_radius(mut self, meters: f64) -> Self {
        self.initial_radius = if meters.is_nan() {
            0.0
        } else {
            meters.clamp(0.0, MAX_GIVE_UP_RADIUS)
        };
        self
    }

    /// Set the radius increment. Values below 1 m are raised to 1 m so a
    /// search always terminates.
    pub fn radius_step(mut self, meters: f64) -> Self {
        self.radius_step = meters.max(1.0);
        self
    }

    /// Set the give-up radius, clamped to `0..=MAX_GIVE_UP_RADIUS`.
    ///
    /// NaN is ignored and keeps the current value.
    pub fn give_up_radius(mut self, meters: f64) -> Self {
        if !meters.is_nan() {
            self.give_up_radius = meters.clamp(0.0, MAX_GIVE_UP_RADIUS);
        }
        self
    }

    /// Set the delay between retries.
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Upper bound on lookups one resolution attempt can issue.
    ///
    /// Never more than [`MAX_LOOKUPS`], whatever the fields hold.
    pub fn max_attempts(&self) -> u32 {
        let needed = self.lookups_needed();
        if needed.is_nan() {
            // Unusable radii: one lookup, then give up
            return 1;
        }
        if needed >= f64::from(MAX_LOOKUPS) {
            return MAX_LOOKUPS;
        }
        (needed as u32).max(1)
    }

    /// Lookups the radius rule alone would issue, before any cap.
    fn lookups_needed(&self) -> f64 {
        if self.give_up_radius.is_nan() || self.initial_radius.is_nan() {
            return f64::NAN;
        }
        if self.initial_radius >= self.give_up_radius {
            return 1.0;
        }
        let widenings = ((self.give_up_radius - self.initial_radius) / self.radius_step).ceil();
        if widenings.is_nan() {
            // Zero or NaN step never reaches the give-up radius
            return f64::INFINITY;
        }
        widenings + 1.0
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Load search settings from the environment, reading `.env` first.
///
/// Unset variables keep their defaults:
/// `PANO_INITIAL_RADIUS`, `PANO_RADIUS_STEP`, `PANO_GIVE_UP_RADIUS`,
/// `PANO_RETRY_DELAY_MS`.
///
/// # Errors
///
/// Returns `PanoError::InvalidConfig` if a variable is set but cannot be used.
pub fn load_search_config() -> Result<SearchConfig> {
    dotenvy::dotenv().ok();
    build_search_config(|key| std::env::var(key))
}

/// Directory that stores uploaded captures, from `OUTPUT_DIR`.
///
/// # Errors
///
/// Returns `PanoError::InvalidConfig` if `OUTPUT_DIR` is missing or empty.
pub fn load_output_dir() -> Result<PathBuf> {
    dotenvy::dotenv().ok();
    build_output_dir(|key| std::env::var(key))
}

fn build_search_config<F>(lookup: F) -> Result<SearchConfig>
where
    F: Fn(&str) -> std::result::Result<String, std::env::VarError>,
{
    let parse_f64 = |var: &str| -> Result<Option<f64>> {
        match lookup(var) {
            Ok(raw) => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(Some)
                .ok_or_else(|| PanoError::InvalidConfig {
                    var: var.to_string(),
                    reason: format!("{raw:?} is not a finite number"),
                }),
            Err(_) => Ok(None),
        }
    };

    let mut config = SearchConfig::new();

    if let Some(initial) = parse_f64("PANO_INITIAL_RADIUS")? {
        if initial < 0.0 {
            return Err(PanoError::InvalidConfig {
                var: "PANO_INITIAL_RADIUS".to_string(),
                reason: "must not be negative".to_string(),
            });
        }
        config = config.initial_radius(initial);
    }
    if let Some(step) = parse_f64("PANO_RADIUS_STEP")? {
        if step <= 0.0 {
            return Err(PanoError::InvalidConfig {
                var: "PANO_RADIUS_STEP".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        config = config.radius_step(step);
    }
    if let Some(give_up) = parse_f64("PANO_GIVE_UP_RADIUS")? {
        if !(0.0..=MAX_GIVE_UP_RADIUS).contains(&give_up) {
            return Err(PanoError::InvalidConfig {
                var: "PANO_GIVE_UP_RADIUS".to_string(),
                reason: format!("must be between 0 and {MAX_GIVE_UP_RADIUS}"),
            });
        }
        config = config.give_up_radius(give_up);
    }
    if let Ok(raw) = lookup("PANO_RETRY_DELAY_MS") {
        let millis = raw.trim().parse::<u64>().map_err(|e| PanoError::InvalidConfig {
            var: "PANO_RETRY_DELAY_MS".to_string(),
            reason: e.to_string(),
        })?;
        config = config.retry_delay(Duration::from_millis(millis));
    }

    let needed = config.lookups_needed();
    if needed > f64::from(MAX_LOOKUPS) {
        return Err(PanoError::InvalidConfig {
            var: "PANO_RADIUS_STEP".to_string(),
            reason: format!(
                "reaching {} m from {} m would take {needed} lookups, more than {MAX_LOOKUPS}",
                config.give_up_radius, config.initial_radius
            ),
        });
    }

    Ok(config)
}

fn build_output_dir<F>(lookup: F) -> Result<PathBuf>
where
    F: Fn(&str) -> std::result::Result<String, std::env::VarError>,
{
    match lookup("OUTPUT_DIR") {
        Ok(dir) if !dir.trim().is_empty() => Ok(PathBuf::from(dir)),
        _ => Err(PanoError::InvalidConfig {
            var: "OUTPUT_DIR".to_string(),
            reason: "must be set".to_string(),
        }),
    }
}
