//! Vehicle configuration – reads/writes `~/.tremaux/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tremaux_hal::sysfs::DEFAULT_GPIO_ROOT;
use tremaux_hal::{MotorLines, RetryPolicy, SensorLines};
use tremaux_runtime::{ControlLoopConfig, CorridorConfig};
use tremaux_types::{Cell, Level, Line, Pose};

/// Which [`DigitalPort`][tremaux_hal::DigitalPort] implementation drives the
/// vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// In-process simulated port; no hardware is touched.
    #[default]
    Sim,
    /// Linux `/sys/class/gpio`.
    Sysfs,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Sim => write!(f, "sim"),
            Backend::Sysfs => write!(f, "sysfs"),
        }
    }
}

impl std::str::FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sim" => Ok(Backend::Sim),
            "sysfs" => Ok(Backend::Sysfs),
            other => Err(format!("unknown backend {other:?} (expected \"sim\" or \"sysfs\")")),
        }
    }
}

/// Line numbers of the sensors and motor outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PinConfig {
    #[serde(default = "default_sensor_left")]
    pub sensor_left: u32,
    #[serde(default = "default_sensor_front")]
    pub sensor_front: u32,
    #[serde(default = "default_sensor_right")]
    pub sensor_right: u32,
    #[serde(default = "default_motor_forward_left")]
    pub motor_forward_left: u32,
    #[serde(default = "default_motor_forward_right")]
    pub motor_forward_right: u32,
    #[serde(default = "default_motor_reverse_left")]
    pub motor_reverse_left: u32,
    #[serde(default = "default_motor_reverse_right")]
    pub motor_reverse_right: u32,
}

/// Grid footprint and the entrance cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    #[serde(default = "default_grid_side")]
    pub width: usize,
    #[serde(default = "default_grid_side")]
    pub height: usize,
    #[serde(default = "default_start_x")]
    pub start_x: i32,
    #[serde(default)]
    pub start_y: i32,
}

/// Persisted configuration stored in `~/.tremaux/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: Backend,

    /// Root of the sysfs GPIO tree.
    #[serde(default = "default_gpio_root")]
    pub gpio_root: PathBuf,

    /// Raw level a sensor reports when nothing is in front of it.
    #[serde(default = "default_low")]
    pub sensor_open_level: Level,

    /// Level that energises a motor output.
    #[serde(default = "default_low")]
    pub motor_active_level: Level,

    /// Hold time of a 90° turn, in milliseconds.
    #[serde(default = "default_turn_unit_ms")]
    pub turn_unit_ms: u64,

    #[serde(default = "default_max_io_attempts")]
    pub max_io_attempts: u32,

    #[serde(default = "default_max_corridor_samples")]
    pub max_corridor_samples: u32,

    #[serde(default)]
    pub sample_interval_ms: u64,

    #[serde(default = "default_max_stalled_cycles")]
    pub max_stalled_cycles: u32,

    #[serde(default = "default_true")]
    pub demo_turns: bool,

    /// Append-only log file; console only when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,

    // Tables last: TOML forbids plain keys after a table header.
    #[serde(default)]
    pub pins: PinConfig,

    #[serde(default)]
    pub grid: GridConfig,
}

fn default_sensor_left() -> u32 {
    11
}
fn default_sensor_front() -> u32 {
    18
}
fn default_sensor_right() -> u32 {
    19
}
fn default_motor_forward_left() -> u32 {
    3
}
fn default_motor_forward_right() -> u32 {
    1
}
fn default_motor_reverse_left() -> u32 {
    2
}
fn default_motor_reverse_right() -> u32 {
    0
}
fn default_grid_side() -> usize {
    20
}
fn default_start_x() -> i32 {
    10
}
fn default_gpio_root() -> PathBuf {
    PathBuf::from(DEFAULT_GPIO_ROOT)
}
fn default_low() -> Level {
    Level::Low
}
fn default_turn_unit_ms() -> u64 {
    2000
}
fn default_max_io_attempts() -> u32 {
    5
}
fn default_max_corridor_samples() -> u32 {
    10_000
}
fn default_max_stalled_cycles() -> u32 {
    5
}
fn default_true() -> bool {
    true
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            sensor_left: default_sensor_left(),
            sensor_front: default_sensor_front(),
            sensor_right: default_sensor_right(),
            motor_forward_left: default_motor_forward_left(),
            motor_forward_right: default_motor_forward_right(),
            motor_reverse_left: default_motor_reverse_left(),
            motor_reverse_right: default_motor_reverse_right(),
        }
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: default_grid_side(),
            height: default_grid_side(),
            start_x: default_start_x(),
            start_y: 0,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            gpio_root: default_gpio_root(),
            pins: PinConfig::default(),
            sensor_open_level: default_low(),
            motor_active_level: default_low(),
            turn_unit_ms: default_turn_unit_ms(),
            max_io_attempts: default_max_io_attempts(),
            max_corridor_samples: default_max_corridor_samples(),
            sample_interval_ms: 0,
            max_stalled_cycles: default_max_stalled_cycles(),
            demo_turns: true,
            grid: GridConfig::default(),
            log_file: None,
        }
    }
}

impl Config {
    /// Reject settings the navigation loop cannot run with.
    pub fn validate(&self) -> Result<(), String> {
        if self.grid.width == 0 || self.grid.height == 0 {
            return Err(format!(
                "grid must be non-empty, got {}x{}",
                self.grid.width, self.grid.height
            ));
        }
        let start = self.start_pose().position;
        let inside = usize::try_from(start.x).is_ok_and(|x| x < self.grid.width)
            && usize::try_from(start.y).is_ok_and(|y| y < self.grid.height);
        if !inside {
            return Err(format!(
                "start cell {start} lies outside the {}x{} grid",
                self.grid.width, self.grid.height
            ));
        }
        if self.max_io_attempts == 0 {
            return Err("max_io_attempts must be at least 1".to_string());
        }
        Ok(())
    }

    pub fn sensor_lines(&self) -> SensorLines {
        SensorLines {
            left: Line(self.pins.sensor_left),
            straight: Line(self.pins.sensor_front),
            right: Line(self.pins.sensor_right),
        }
    }

    pub fn motor_lines(&self) -> MotorLines {
        MotorLines {
            forward_left: Line(self.pins.motor_forward_left),
            forward_right: Line(self.pins.motor_forward_right),
            reverse_left: Line(self.pins.motor_reverse_left),
            reverse_right: Line(self.pins.motor_reverse_right),
        }
    }

    pub fn retry(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_io_attempts)
    }

    pub fn turn_unit(&self) -> Duration {
        Duration::from_millis(self.turn_unit_ms)
    }

    pub fn start_pose(&self) -> Pose {
        Pose::entrance(Cell::new(self.grid.start_x, self.grid.start_y))
    }

    pub fn control_loop_config(&self) -> ControlLoopConfig {
        ControlLoopConfig {
            corridor: CorridorConfig {
                max_samples: self.max_corridor_samples,
                sample_interval: Duration::from_millis(self.sample_interval_ms),
            },
            max_stalled_cycles: self.max_stalled_cycles,
            demo_turns: self.demo_turns,
            ..ControlLoopConfig::default()
        }
    }
}

/// Return the config path: `$TREMAUX_CONFIG`, else `~/.tremaux/config.toml`.
pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("TREMAUX_CONFIG") {
        return PathBuf::from(path);
    }
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".tremaux").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, String> {
    load_from(&config_path())
}

/// Load the config from a specific path, without environment overrides.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    cfg.validate()?;
    Ok(Some(cfg))
}

/// Apply `TREMAUX_*` environment variable overrides to `cfg`.
///
/// Supported variables:
///
/// | Variable | Config field |
/// |---|---|
/// | `TREMAUX_BACKEND` | `backend` |
/// | `TREMAUX_GPIO_ROOT` | `gpio_root` |
/// | `TREMAUX_TURN_UNIT_MS` | `turn_unit_ms` |
/// | `TREMAUX_LOG_FILE` | `log_file` |
/// | `TREMAUX_DEMO_TURNS` | `demo_turns` |
///
/// Unparseable values are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("TREMAUX_BACKEND")
        && let Ok(backend) = v.parse::<Backend>()
    {
        cfg.backend = backend;
    }
    if let Ok(v) = std::env::var("TREMAUX_GPIO_ROOT") {
        cfg.gpio_root = PathBuf::from(v);
    }
    if let Ok(v) = std::env::var("TREMAUX_TURN_UNIT_MS")
        && let Ok(ms) = v.trim().parse::<u64>()
    {
        cfg.turn_unit_ms = ms;
    }
    if let Ok(v) = std::env::var("TREMAUX_LOG_FILE") {
        cfg.log_file = Some(PathBuf::from(v));
    }
    if let Ok(v) = std::env::var("TREMAUX_DEMO_TURNS")
        && let Ok(enabled) = v.trim().parse::<bool>()
    {
        cfg.demo_turns = enabled;
    }
}

/// Save the config to a specific path, creating its directory if necessary.
pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))
}

/// Save the config to the default location.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}
