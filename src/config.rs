use serde::{Deserialize, Serialize};
use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tracing::info;

use crate::{
    axis::config::AxisConfig, bridge::config::BridgeConfig,
    command_server::config::CommandServerConfig, dispatcher::config::DispatcherConfig,
    drawing::config::DrawingConfig, logging::LoggingConfig, motion::config::MotionConfig,
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("No plotter configuration at {}", .0.display())]
    Missing(PathBuf),

    #[error("Cannot access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed TOML in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Cannot encode configuration: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotterConfig {
    pub x_axis: AxisConfig,
    pub y_axis: AxisConfig,
    pub motion: MotionConfig,
    pub drawing: DrawingConfig,
    pub dispatcher: DispatcherConfig,
    pub server: CommandServerConfig,
    pub bridge: BridgeConfig,
    pub logging: LoggingConfig,
}

impl Default for PlotterConfig {
    fn default() -> Self {
        Self {
            x_axis: AxisConfig::x(),
            y_axis: AxisConfig::y(),
            motion: MotionConfig::default(),
            drawing: DrawingConfig::default(),
            dispatcher: DispatcherConfig::default(),
            server: CommandServerConfig::default(),
            bridge: BridgeConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl PlotterConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, axis) in [("x_axis", &self.x_axis), ("y_axis", &self.y_axis)] {
            ensure(
                axis.track_ticks > 0.0 && axis.track_length > 0.0,
                format!("{}: track_ticks and track_length must be positive", name),
            )?;
            ensure(
                axis.homing.poll_interval_ms > 0 && axis.homing.timeout_ms > 0,
                format!("{}: homing poll interval and timeout must be non-zero", name),
            )?;
        }

        ensure(
            self.motion.envelope.is_valid(),
            "motion.envelope: min must be below max on both axes",
        )?;
        ensure(
            self.motion.tolerance > 0.0,
            "motion.tolerance must be positive",
        )?;
        ensure(
            in_unit_range(self.motion.max_output),
            "motion.max_output must be in (0, 1]",
        )?;
        ensure(
            self.motion.poll_interval_ms > 0,
            "motion.poll_interval_ms must be non-zero",
        )?;

        for (name, speed) in [
            ("drawing.travel_speed", self.drawing.travel_speed),
            ("drawing.draw_speed", self.drawing.draw_speed),
            ("dispatcher.move_speed", self.dispatcher.move_speed),
        ] {
            ensure(in_unit_range(speed), format!("{} must be in (0, 1]", name))?;
        }
        ensure(
            self.drawing.stitch_tolerance >= 0.0,
            "drawing.stitch_tolerance must not be negative",
        )?;

        for (name, capacity) in [
            ("dispatcher.queue_capacity", self.dispatcher.queue_capacity),
            ("server.max_connections", self.server.max_connections),
            ("bridge.outbound_capacity", self.bridge.outbound_capacity),
            ("bridge.inbound_capacity", self.bridge.inbound_capacity),
        ] {
            ensure(capacity > 0, format!("{} must be non-zero", name))?;
        }

        Ok(())
    }
}

fn in_unit_range(value: f64) -> bool {
    value > 0.0 && value <= 1.0
}

fn ensure(condition: bool, message: impl Into<String>) -> Result<(), ConfigError> {
    if condition {
        Ok(())
    } else {
        Err(ConfigError::Invalid(message.into()))
    }
}

#[derive(Debug)]
pub struct ConfigManager {
    path: PathBuf,
    write_defaults: bool,
}

impl ConfigManager {
    /// Uses `CONFIG_PATH`, or `plotter.toml` in the working directory.
    pub fn from_env() -> Self {
        let path = std::env::var_os("CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("plotter.toml"));
        Self::at(path)
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_defaults: false,
        }
    }

    /// A missing file is written out with defaults instead of failing.
    pub fn write_defaults(mut self) -> Self {
        self.write_defaults = true;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<PlotterConfig, ConfigError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                if !self.write_defaults {
                    return Err(ConfigError::Missing(self.path.clone()));
                }
                let config = PlotterConfig::default();
                self.save(&config)?;
                info!("Wrote default configuration to {}", self.path.display());
                return Ok(config);
            }
            Err(source) => return Err(self.io_error(source)),
        };

        let config: PlotterConfig = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: self.path.clone(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, config: &PlotterConfig) -> Result<(), ConfigError> {
        let text = toml::to_string_pretty(config)?;
        if let Some(dir) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|source| self.io_error(source))?;
        }
        fs::write(&self.path, text).map_err(|source| self.io_error(source))
    }

    fn io_error(&self, source: std::io::Error) -> ConfigError {
        ConfigError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

/// Loads from `CONFIG_PATH`, falling back to defaults when no file exists.
pub fn load_or_default() -> Result<PlotterConfig, ConfigError> {
    match ConfigManager::from_env().load() {
        Err(ConfigError::Missing(_)) => Ok(PlotterConfig::default()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{axis::config::Coupling, geometry::Position};
    use tempfile::TempDir;

    fn manager_in(dir: &TempDir) -> ConfigManager {
        ConfigManager::at(dir.path().join("conf").join("plotter.toml"))
    }

    #[test]
    fn test_defaults_are_valid() {
        PlotterConfig::default().validate().unwrap();
    }

    #[test]
    fn test_missing_file_without_create_fails() {
        let dir = TempDir::new().unwrap();
        let err = manager_in(&dir).load().unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));
    }

    #[test]
    fn test_missing_file_is_created_with_defaults() {
        let dir = TempDir::new().unwrap();
        let manager = manager_in(&dir).write_defaults();

        let config = manager.load().unwrap();
        assert!(manager.path().exists());
        assert_eq!(config.server.bind_address, "0.0.0.0:10002");

        let reloaded = manager.load().unwrap();
        assert_eq!(reloaded.y_axis.coupling, Coupling::PerActuator);
        assert_eq!(reloaded.bridge, config.bridge);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let manager = manager_in(&dir);
        fs::create_dir_all(manager.path().parent().unwrap()).unwrap();
        fs::write(
            manager.path(),
            "[bridge]\naddress = \"10.0.0.2:10002\"\n\n[drawing]\nstitch_tolerance = 0.001\n",
        )
        .unwrap();

        let config = manager.load().unwrap();
        assert_eq!(config.bridge.address, "10.0.0.2:10002");
        assert_eq!(config.bridge.reconnect_interval_ms, 1000);
        assert_eq!(config.drawing.stitch_tolerance, 0.001);
        assert_eq!(config.motion.envelope.max, Position::new(5.0, 5.0));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let dir = TempDir::new().unwrap();
        let manager = manager_in(&dir);
        let mut config = PlotterConfig::default();
        config.drawing.draw_speed = 1.5;
        manager.save(&config).unwrap();

        let err = manager.load().unwrap_err();
        match err {
            ConfigError::Invalid(message) => {
                assert!(message.contains("draw_speed"), "{}", message)
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_garbage_fails_to_parse() {
        let dir = TempDir::new().unwrap();
        let manager = manager_in(&dir);
        fs::create_dir_all(manager.path().parent().unwrap()).unwrap();
        fs::write(manager.path(), "motion = [").unwrap();

        assert!(matches!(
            manager.load().unwrap_err(),
            ConfigError::Parse { .. }
        ));
    }

    #[test]
    fn test_unreadable_path_reports_io_error() {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::at(dir.path()).write_defaults();

        match manager.load().unwrap_err() {
            ConfigError::Io { path, .. } => assert_eq!(path, dir.path()),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        let mut config = PlotterConfig::default();
        config.dispatcher.queue_capacity = 0;
        assert!(config.validate().is_err());
    }
}
