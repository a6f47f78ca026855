use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::editor::{TextFontFamily, TextOptions};
use crate::geometry::{Color, Size};
use crate::storage::{SaveFormat, SaveMode, DEFAULT_JPEG_QUALITY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConfigPathError {
    MissingHomeDirectory,
}

const APP_DIR: &str = "folio";
const APP_CONFIG_FILE: &str = "config.json";
const DEFAULT_VIEWPORT: [f64; 2] = [1280.0, 800.0];

/// Application-level settings from `config.json`. Every field is optional.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub save_format: SaveFormat,
    pub save_mode: SaveMode,
    pub jpeg_quality: u8,
    pub font_path: Option<PathBuf>,
    pub text_family: TextFontFamily,
    pub text_size: f64,
    pub text_color: Color,
    pub text_background: Color,
    pub viewport: [f64; 2],
    pub notifications: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        let text = TextOptions::default();
        Self {
            save_format: SaveFormat::default(),
            save_mode: SaveMode::default(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            font_path: None,
            text_family: text.family,
            text_size: text.size,
            text_color: text.color,
            text_background: text.background,
            viewport: DEFAULT_VIEWPORT,
            notifications: true,
        }
    }
}

impl AppConfig {
    pub fn jpeg_quality(&self) -> u8 {
        self.jpeg_quality.clamp(1, 100)
    }

    pub fn text_options(&self) -> TextOptions {
        let mut options = TextOptions {
            family: self.text_family,
            color: self.text_color,
            background: self.text_background,
            ..TextOptions::default()
        };
        options.set_size(self.text_size);
        options
    }

    /// Container used for display-space math when no window exists.
    pub fn viewport(&self) -> Size {
        let [width, height] = self.viewport;
        if width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0 {
            Size::new(width, height)
        } else {
            tracing::warn!(viewport = ?self.viewport, "invalid viewport in config; using default");
            Size::new(DEFAULT_VIEWPORT[0], DEFAULT_VIEWPORT[1])
        }
    }
}

pub fn load_app_config() -> AppConfig {
    let (xdg_config_home, home) = config_env_dirs();
    load_app_config_with(xdg_config_home.as_deref(), home.as_deref())
}

fn load_app_config_with(xdg_config_home: Option<&Path>, home: Option<&Path>) -> AppConfig {
    let path = match app_config_path(APP_DIR, APP_CONFIG_FILE, xdg_config_home, home) {
        Ok(p) => p,
        Err(_) => return AppConfig::default(),
    };
    if !path.exists() {
        return AppConfig::default();
    }
    match std::fs::read_to_string(&path) {
        Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|err| {
            tracing::warn!(?err, ?path, "failed to parse config.json; using defaults");
            AppConfig::default()
        }),
        Err(err) => {
            tracing::warn!(?err, ?path, "failed to read config.json; using defaults");
            AppConfig::default()
        }
    }
}

pub(crate) fn config_env_dirs() -> (Option<PathBuf>, Option<PathBuf>) {
    (
        std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
        std::env::var_os("HOME").map(PathBuf::from),
    )
}

pub(crate) fn app_config_path(
    app_dir: &str,
    file_name: &str,
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, ConfigPathError> {
    let mut path = config_root(xdg_config_home, home)?;
    path.push(app_dir);
    path.push(file_name);
    Ok(path)
}

fn config_root(
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, ConfigPathError> {
    if let Some(xdg) = xdg_config_home.filter(|path| !path.as_os_str().is_empty()) {
        return Ok(xdg.to_path_buf());
    }

    let home = home.ok_or(ConfigPathError::MissingHomeDirectory)?;
    Ok(home.join(".config"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn fresh_config_root(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos())
            .unwrap_or_default();
        let root = std::env::temp_dir().join(format!("folio-config-{name}-{}-{nanos}", std::process::id()));
        std::fs::create_dir_all(root.join(APP_DIR)).expect("config dir should be creatable");
        root
    }

    #[test]
    fn app_config_path_prefers_xdg_config_home() {
        let path = app_config_path(
            "folio",
            "config.json",
            Some(Path::new("/tmp/config-root")),
            Some(Path::new("/tmp/home")),
        )
        .expect("path should resolve");

        assert_eq!(path, PathBuf::from("/tmp/config-root/folio/config.json"));
    }

    #[test]
    fn app_config_path_falls_back_to_home_dot_config() {
        let path = app_config_path("folio", "config.json", Some(Path::new("")), Some(Path::new("/tmp/home")))
            .expect("path should resolve");

        assert_eq!(path, PathBuf::from("/tmp/home/.config/folio/config.json"));
    }

    #[test]
    fn app_config_path_errors_when_home_missing_and_xdg_unset() {
        let error = app_config_path("folio", "config.json", None, None).unwrap_err();
        assert_eq!(error, ConfigPathError::MissingHomeDirectory);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = load_app_config_with(Some(Path::new("/nonexistent/folio-config")), None);
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.save_mode, SaveMode::CreateNew);
        assert_eq!(config.jpeg_quality(), 90);
        assert_eq!(config.viewport(), Size::new(1280.0, 800.0));
    }

    #[test]
    fn partial_file_overrides_only_given_fields() {
        let root = fresh_config_root("partial");
        std::fs::write(
            root.join(APP_DIR).join(APP_CONFIG_FILE),
            r#"{ "save_format": "jpg", "save_mode": "replace", "jpeg_quality": 0,
                 "text_size": -4, "text_color": [255, 0, 0, 255], "viewport": [640, 480] }"#,
        )
        .expect("write config");

        let config = load_app_config_with(Some(&root), None);
        assert_eq!(config.save_format, SaveFormat::Jpeg);
        assert_eq!(config.save_mode, SaveMode::Replace);
        assert_eq!(config.jpeg_quality(), 1);
        assert!(config.notifications);

        let text = config.text_options();
        assert_eq!(text.size, 1.0);
        assert_eq!(text.color, Color::new(255, 0, 0, 255));
        assert_eq!(text.background, TextOptions::default().background);
        assert_eq!(config.viewport(), Size::new(640.0, 480.0));

        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let root = fresh_config_root("malformed");
        std::fs::write(root.join(APP_DIR).join(APP_CONFIG_FILE), "{ not json").expect("write config");

        assert_eq!(load_app_config_with(Some(&root), None), AppConfig::default());

        let _ = std::fs::remove_dir_all(root);
    }
}
