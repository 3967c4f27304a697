//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use ini::Ini;
use std::path::PathBuf;
use std::str::FromStr;

use super::file::{ConfigFile, ConfigFileError, MAX_CACHE_AGE_DAYS, MAX_SUPPORTED_ZOOM};
use crate::tile::fix_base_url;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [source] section
    if let Some(section) = ini.section(Some("source")) {
        if let Some(v) = section.get("name") {
            let v = v.trim();
            if v.is_empty() {
                return Err(invalid("source", "name", v, "must not be empty"));
            }
            config.source.name = v.to_string();
        }
        if let Some(v) = section.get("url") {
            let v = v.trim();
            if fix_base_url(v).is_none() {
                return Err(invalid(
                    "source",
                    "url",
                    v,
                    "must be a URL whose host contains a dot",
                ));
            }
            config.source.url = v.to_string();
        }
        if let Some(v) = section.get("extension") {
            let v = v.trim().trim_start_matches('.');
            if v.is_empty() || !v.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(invalid(
                    "source",
                    "extension",
                    v,
                    "must be a file extension such as 'png' or 'jpg'",
                ));
            }
            config.source.extension = v.to_lowercase();
        }
        if let Some(v) = section.get("max_zoom") {
            let zoom: u8 = parse_number("source", "max_zoom", v)?;
            if zoom > MAX_SUPPORTED_ZOOM {
                return Err(invalid(
                    "source",
                    "max_zoom",
                    v,
                    &format!("must be at most {}", MAX_SUPPORTED_ZOOM),
                ));
            }
            config.source.max_zoom = zoom;
        }
    }

    // [cache] section
    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = section.get("directory") {
            let v = v.trim();
            config.cache.directory = if v.is_empty() {
                None
            } else {
                Some(expand_tilde(v))
            };
        }
        if let Some(v) = section.get("max_age_days") {
            let days: u64 = parse_positive("cache", "max_age_days", v)?;
            if days > MAX_CACHE_AGE_DAYS {
                return Err(invalid(
                    "cache",
                    "max_age_days",
                    v,
                    &format!("must be at most {}", MAX_CACHE_AGE_DAYS),
                ));
            }
            config.cache.max_age_days = days;
        }
    }

    // [fetch] section
    if let Some(section) = ini.section(Some("fetch")) {
        if let Some(v) = section.get("max_workers") {
            config.fetch.max_workers = parse_positive("fetch", "max_workers", v)?;
        }
        if let Some(v) = section.get("timeout") {
            config.fetch.timeout = parse_positive("fetch", "timeout", v)?;
        }
        if let Some(v) = section.get("user_agent") {
            let v = v.trim();
            if !v.is_empty() {
                config.fetch.user_agent = v.to_string();
            }
        }
        if let Some(v) = section.get("online") {
            config.fetch.online = parse_bool("fetch", "online", v)?;
        }
    }

    Ok(config)
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_number<T: FromStr>(section: &str, key: &str, value: &str) -> Result<T, ConfigFileError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value, "must be a non-negative integer"))
}

fn parse_positive<T>(section: &str, key: &str, value: &str) -> Result<T, ConfigFileError>
where
    T: FromStr + PartialOrd + Default,
{
    let n: T = value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value, "must be a positive integer"))?;
    if n <= T::default() {
        return Err(invalid(section, key, value, "must be a positive integer"));
    }
    Ok(n)
}

fn parse_bool(section: &str, key: &str, value: &str) -> Result<bool, ConfigFileError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(invalid(section, key, value, "must be 'true' or 'false'")),
    }
}

/// Expand a leading `~/` to the home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn load(content: &str) -> Result<ConfigFile, ConfigFileError> {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.ini");
        std::fs::write(&config_path, content).unwrap();
        ConfigFile::load_from(&config_path)
    }

    #[test]
    fn test_full_config() {
        let config = load(
            r#"
[source]
name = Topo
url = topo.example.org/tiles
extension = JPG
max_zoom = 17

[cache]
directory = /var/cache/tiles
max_age_days = 7

[fetch]
max_workers = 8
timeout = 10
user_agent = my-viewer/2.0
online = false
"#,
        )
        .unwrap();

        assert_eq!(config.source.name, "Topo");
        assert_eq!(config.source.url, "topo.example.org/tiles");
        assert_eq!(config.source.extension, "jpg");
        assert_eq!(config.source.max_zoom, 17);
        assert_eq!(config.cache.directory, Some(PathBuf::from("/var/cache/tiles")));
        assert_eq!(config.cache.max_age_days, 7);
        assert_eq!(config.fetch.max_workers, 8);
        assert_eq!(config.fetch.timeout, 10);
        assert_eq!(config.fetch.user_agent, "my-viewer/2.0");
        assert!(!config.fetch.online);
    }

    #[test]
    fn test_missing_keys_keep_defaults() {
        let config = load("[fetch]\nmax_workers = 3\n").unwrap();
        let default = ConfigFile::default();

        assert_eq!(config.fetch.max_workers, 3);
        assert_eq!(config.source, default.source);
        assert_eq!(config.cache, default.cache);
        assert_eq!(config.fetch.timeout, default.fetch.timeout);
    }

    #[test]
    fn test_empty_cache_directory_disables_cache() {
        let config = load("[cache]\ndirectory =\n").unwrap();
        assert!(config.cache.directory.is_none());
    }

    #[test]
    fn test_invalid_url() {
        let err = load("[source]\nurl = localhost\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigFileError::InvalidValue { ref key, .. } if key == "url"
        ));
    }

    #[test]
    fn test_invalid_max_workers() {
        let err = load("[fetch]\nmax_workers = 0\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid configuration: fetch.max_workers = '0' - must be a positive integer"
        );
        assert!(load("[fetch]\nmax_workers = many\n").is_err());
    }

    #[test]
    fn test_invalid_max_zoom() {
        assert!(load("[source]\nmax_zoom = 31\n").is_err());
        assert!(load("[source]\nmax_zoom = -1\n").is_err());
        assert!(load("[source]\nmax_zoom = 30\n").is_ok());
    }

    #[test]
    fn test_max_age_days_bounds() {
        let err = load("[cache]\nmax_age_days = 1000000000000000000\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigFileError::InvalidValue { ref key, .. } if key == "max_age_days"
        ));
        assert!(load("[cache]\nmax_age_days = 36501\n").is_err());
        assert!(load("[cache]\nmax_age_days = 0\n").is_err());

        let config = load("[cache]\nmax_age_days = 36500\n").unwrap();
        assert_eq!(config.cache.max_age_days, MAX_CACHE_AGE_DAYS);
        assert_eq!(
            config.disk_cache().max_age(),
            std::time::Duration::from_secs(MAX_CACHE_AGE_DAYS * 24 * 60 * 60)
        );
    }

    #[test]
    fn test_invalid_online_flag() {
        assert!(load("[fetch]\nonline = maybe\n").is_err());
        assert!(load("[fetch]\nonline = yes\n").unwrap().fetch.online);
    }

    #[test]
    fn test_invalid_extension() {
        assert!(load("[source]\nextension = p/ng\n").is_err());
        assert_eq!(
            load("[source]\nextension = .png\n").unwrap().source.extension,
            "png"
        );
    }

    #[test]
    fn test_expand_tilde() {
        let path = expand_tilde("~/test/path");
        if let Some(home) = dirs::home_dir() {
            assert_eq!(path, home.join("test/path"));
        }

        // Non-tilde paths should be unchanged
        let path = expand_tilde("/absolute/path");
        assert_eq!(path, PathBuf::from("/absolute/path"));
    }
}
