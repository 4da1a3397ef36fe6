use crate::cli::CliArgs;
use crate::model::DisplayZone;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

const DEFAULT_REFRESH_SECS: u64 = 5;
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigSnapshot {
    pub source: Option<String>,
    pub refresh_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub display_zone: Option<DisplayZone>,
    pub theme: ThemeSpec,
}

/// Colour overrides, each a `#rrggbb` string or a colour name.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ThemeSpec {
    pub accent: Option<String>,
    pub border: Option<String>,
    pub selection: Option<String>,
    pub running: Option<String>,
    pub succeeded: Option<String>,
    pub failed: Option<String>,
    pub pending: Option<String>,
    pub unknown: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RuntimeConfigWatcher {
    path: Option<PathBuf>,
    modified: Option<SystemTime>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct FlowtopConfigFile {
    #[serde(alias = "refresh")]
    refresh_secs: Option<u64>,
    #[serde(alias = "timeout")]
    timeout_secs: Option<u64>,
    #[serde(alias = "timezone")]
    display_timezone: Option<String>,
    theme: ThemeSpec,
}

/// Poll timing and display zone after merging CLI flags over the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeSettings {
    pub refresh: Duration,
    pub timeout: Duration,
    pub display_zone: DisplayZone,
}

impl RuntimeSettings {
    pub fn resolve(args: &CliArgs, config: &ConfigSnapshot) -> Self {
        let refresh_secs = args
            .refresh_secs
            .or(config.refresh_secs)
            .unwrap_or(DEFAULT_REFRESH_SECS)
            .max(1);
        let timeout_secs = args
            .timeout_secs
            .or(config.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS)
            .max(1);
        let display_zone = if args.utc {
            DisplayZone::Utc
        } else if args.local {
            DisplayZone::Local
        } else {
            config.display_zone.unwrap_or_default()
        };

        Self {
            refresh: Duration::from_secs(refresh_secs),
            timeout: Duration::from_secs(timeout_secs),
            display_zone,
        }
    }
}

impl RuntimeConfigWatcher {
    pub fn discover() -> Self {
        Self {
            path: discover_config_path(),
            modified: None,
        }
    }

    #[cfg(test)]
    fn at(path: PathBuf) -> Self {
        Self {
            path: Some(path),
            modified: None,
        }
    }

    pub fn load_current(&mut self) -> Result<ConfigSnapshot> {
        let Some(path) = self.path.clone() else {
            return Ok(ConfigSnapshot::default());
        };

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        self.modified = fs::metadata(&path)
            .ok()
            .and_then(|meta| meta.modified().ok());

        let mut snapshot = parse_config(&raw)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        snapshot.source = Some(path.display().to_string());
        Ok(snapshot)
    }

    pub fn reload_if_changed(&mut self) -> Result<Option<ConfigSnapshot>> {
        let Some(current_path) = self.path.clone() else {
            self.path = discover_config_path();
            if self.path.is_some() {
                return self.load_current().map(Some);
            }
            return Ok(None);
        };

        if !current_path.exists() {
            self.path = discover_config_path();
            self.modified = None;
            if self.path.is_some() {
                return self.load_current().map(Some);
            }
            return Ok(Some(ConfigSnapshot::default()));
        }

        let modified = fs::metadata(&current_path)
            .ok()
            .and_then(|meta| meta.modified().ok());
        if modified != self.modified {
            return self.load_current().map(Some);
        }

        Ok(None)
    }
}

fn parse_config(raw: &str) -> Result<ConfigSnapshot> {
    // An empty file deserializes to YAML null.
    let parsed: FlowtopConfigFile = if raw.trim().is_empty() {
        FlowtopConfigFile::default()
    } else {
        serde_yaml::from_str(raw)?
    };

    let display_zone = parsed
        .display_timezone
        .as_deref()
        .map(|token| {
            DisplayZone::from_token(token)
                .with_context(|| format!("unknown display_timezone {token:?} (use utc or local)"))
        })
        .transpose()?;

    Ok(ConfigSnapshot {
        source: None,
        refresh_secs: parsed.refresh_secs,
        timeout_secs: parsed.timeout_secs,
        display_zone,
        theme: parsed.theme,
    })
}

fn discover_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("FLOWTOP_CONFIG")
        && !path.trim().is_empty()
    {
        return Some(PathBuf::from(path));
    }

    let cwd_candidates = [
        PathBuf::from("flowtop.yaml"),
        PathBuf::from("flowtop.yml"),
        PathBuf::from(".flowtop.yaml"),
    ];
    for candidate in cwd_candidates {
        if candidate.exists() {
            return Some(candidate);
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let user_candidates = [
            PathBuf::from(&home).join(".config/flowtop/config.yaml"),
            PathBuf::from(&home).join(".config/flowtop/config.yml"),
        ];
        for candidate in user_candidates {
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::{ConfigSnapshot, RuntimeConfigWatcher, RuntimeSettings, parse_config};
    use crate::cli::CliArgs;
    use crate::model::DisplayZone;
    use clap::Parser;
    use std::fs;
    use std::time::Duration;

    #[test]
    fn parses_timing_zone_and_theme() {
        let snapshot = parse_config(
            "refresh_secs: 3\ntimeout_secs: 20\ndisplay_timezone: local\ntheme:\n  running: \"#00ff00\"\n  failed: red\n",
        )
        .expect("parse");
        assert_eq!(snapshot.refresh_secs, Some(3));
        assert_eq!(snapshot.timeout_secs, Some(20));
        assert_eq!(snapshot.display_zone, Some(DisplayZone::Local));
        assert_eq!(snapshot.theme.running.as_deref(), Some("#00ff00"));
        assert_eq!(snapshot.theme.failed.as_deref(), Some("red"));
        assert_eq!(snapshot.theme.pending, None);
    }

    #[test]
    fn empty_file_is_all_defaults() {
        assert_eq!(parse_config("").expect("parse"), ConfigSnapshot::default());
    }

    #[test]
    fn unknown_display_zone_is_an_error() {
        let error = parse_config("display_timezone: mars").expect_err("should fail");
        assert!(format!("{error:#}").contains("mars"));
    }

    #[test]
    fn cli_flags_override_config_values() {
        let config = ConfigSnapshot {
            refresh_secs: Some(30),
            timeout_secs: Some(60),
            display_zone: Some(DisplayZone::Local),
            ..ConfigSnapshot::default()
        };

        let args = CliArgs::try_parse_from(["flowtop", "--refresh-secs", "2", "--utc"])
            .expect("parse");
        let settings = RuntimeSettings::resolve(&args, &config);
        assert_eq!(settings.refresh, Duration::from_secs(2));
        assert_eq!(settings.timeout, Duration::from_secs(60));
        assert_eq!(settings.display_zone, DisplayZone::Utc);
    }

    #[test]
    fn settings_fall_back_to_defaults_and_floor_at_one_second() {
        let args = CliArgs::try_parse_from(["flowtop"]).expect("parse");
        let settings = RuntimeSettings::resolve(&args, &ConfigSnapshot::default());
        assert_eq!(settings.refresh, Duration::from_secs(5));
        assert_eq!(settings.timeout, Duration::from_secs(10));
        assert_eq!(settings.display_zone, DisplayZone::Utc);

        let config = ConfigSnapshot {
            refresh_secs: Some(0),
            ..ConfigSnapshot::default()
        };
        let settings = RuntimeSettings::resolve(&args, &config);
        assert_eq!(settings.refresh, Duration::from_secs(1));
    }

    #[test]
    fn watcher_loads_file_and_skips_unchanged_reload() {
        let path = std::env::temp_dir().join(format!(
            "flowtop-config-test-{}.yaml",
            std::process::id()
        ));
        fs::write(&path, "refresh_secs: 7\n").expect("write config");

        let mut watcher = RuntimeConfigWatcher::at(path.clone());
        let snapshot = watcher.load_current().expect("load");
        assert_eq!(snapshot.refresh_secs, Some(7));
        assert_eq!(snapshot.source, Some(path.display().to_string()));
        assert_eq!(watcher.reload_if_changed().expect("reload"), None);

        fs::remove_file(&path).expect("cleanup");
    }
}
