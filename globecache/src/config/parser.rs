//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This module contains the `parse_ini()` function and its helpers.
//! It is the single place where INI key names are mapped to struct fields.

use std::path::PathBuf;
use std::str::FromStr;

use ini::{Ini, Properties};

use super::file::ConfigFileError;
use super::settings::{ConfigFile, LayerRole, LayerSettings};
use crate::coord::MAX_LOD;
use crate::provider::{
    ProviderConfig, DEFAULT_WMS_FORMAT, DEFAULT_WMS_VERSION, DEFAULT_WMTS_FORMAT,
    DEFAULT_WMTS_MATRIX_SET, DEFAULT_WMTS_MAX_LOD, DEFAULT_WMTS_STYLE,
};

/// Prefix of per-layer section names, e.g. `[layer.world500]`.
pub(super) const LAYER_SECTION_PREFIX: &str = "layer.";

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
/// If the file declares any `[layer.*]` section, the declared layers replace
/// the default ones.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [cache] section
    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = section.get("max_blocks") {
            let parsed: i64 = parse_value("cache", "max_blocks", v, "must be an integer")?;
            // Zero or negative disables the size bound.
            config.cache.max_blocks = usize::try_from(parsed).unwrap_or(0);
        }
        if let Some(v) = section.get("fill_factor") {
            let reason = "must be greater than 0 and at most 1";
            let parsed: f64 = parse_value("cache", "fill_factor", v, reason)?;
            if !(parsed > 0.0 && parsed <= 1.0) {
                return Err(invalid("cache", "fill_factor", v, reason));
            }
            config.cache.fill_factor = parsed;
        }
        if let Some(v) = section.get("idle_expiry") {
            config.cache.idle_expiry = parse_value(
                "cache",
                "idle_expiry",
                v,
                "must be a non-negative integer (seconds)",
            )?;
        }
    }

    // [download] section
    if let Some(section) = ini.section(Some("download")) {
        if let Some(v) = section.get("timeout") {
            config.download.timeout =
                parse_value("download", "timeout", v, "must be a positive integer (seconds)")?;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("directory") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.directory = expand_tilde(v);
            }
        }
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = v.to_string();
            }
        }
    }

    // [layer.NAME] sections, in file order
    let mut layers = Vec::new();
    for (name, section) in ini.iter() {
        let Some(layer_name) = name.and_then(|n| n.strip_prefix(LAYER_SECTION_PREFIX)) else {
            continue;
        };
        let section_name = format!("{}{}", LAYER_SECTION_PREFIX, layer_name);
        if layer_name.trim().is_empty() {
            return Err(invalid(
                &section_name,
                "name",
                layer_name,
                "layer sections need a name, e.g. [layer.world500]",
            ));
        }
        layers.push(parse_layer(&section_name, layer_name.trim(), section)?);
    }
    if !layers.is_empty() {
        config.layers = layers;
    }

    Ok(config)
}

fn parse_layer(
    section_name: &str,
    name: &str,
    section: &Properties,
) -> Result<LayerSettings, ConfigFileError> {
    let role = match section.get("role").map(|v| v.trim().to_lowercase()) {
        None => LayerRole::Image,
        Some(v) if v == "image" => LayerRole::Image,
        Some(v) if v == "elevation" => LayerRole::Elevation,
        Some(v) => {
            return Err(invalid(
                section_name,
                "role",
                &v,
                "must be 'image' or 'elevation'",
            ))
        }
    };

    let kind = required(section_name, section, "type")?.to_lowercase();
    let provider = match kind.as_str() {
        "dataset" => ProviderConfig::Dataset {
            name: name.to_string(),
            servers: parse_servers(section_name, section)?,
            layer: required(section_name, section, "layer")?.to_string(),
        },
        "xyz" => {
            let min_lod = parse_lod(section_name, section, "min_lod", 0)?;
            let max_lod = parse_lod(section_name, section, "max_lod", 18)?;
            if min_lod > max_lod {
                return Err(invalid(
                    section_name,
                    "max_lod",
                    &max_lod.to_string(),
                    "must not be below min_lod",
                ));
            }
            ProviderConfig::Xyz {
                name: name.to_string(),
                servers: parse_servers(section_name, section)?,
                min_lod,
                max_lod,
                template: optional(section, "template"),
            }
        }
        "wms" => ProviderConfig::Wms {
            name: name.to_string(),
            server: required(section_name, section, "server")?.to_string(),
            layer: required(section_name, section, "layer")?.to_string(),
            format: optional(section, "format").unwrap_or_else(|| DEFAULT_WMS_FORMAT.to_string()),
            style: optional(section, "style").unwrap_or_default(),
            version: optional(section, "version")
                .unwrap_or_else(|| DEFAULT_WMS_VERSION.to_string()),
        },
        "wmts" => ProviderConfig::Wmts {
            name: name.to_string(),
            server: required(section_name, section, "server")?.to_string(),
            layer: required(section_name, section, "layer")?.to_string(),
            format: optional(section, "format").unwrap_or_else(|| DEFAULT_WMTS_FORMAT.to_string()),
            style: optional(section, "style").unwrap_or_else(|| DEFAULT_WMTS_STYLE.to_string()),
            matrix_set: optional(section, "matrix_set")
                .unwrap_or_else(|| DEFAULT_WMTS_MATRIX_SET.to_string()),
            max_lod: parse_lod(section_name, section, "max_lod", DEFAULT_WMTS_MAX_LOD)?,
        },
        _ => {
            return Err(invalid(
                section_name,
                "type",
                &kind,
                "must be one of: dataset, xyz, wms, wmts",
            ))
        }
    };

    Ok(LayerSettings { role, provider })
}

/// Comma-separated `servers` list. At least one entry is required.
fn parse_servers(section_name: &str, section: &Properties) -> Result<Vec<String>, ConfigFileError> {
    let raw = required(section_name, section, "servers")?;
    let servers: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();
    if servers.is_empty() {
        return Err(invalid(
            section_name,
            "servers",
            raw,
            "expected a comma-separated list of URLs",
        ));
    }
    Ok(servers)
}

fn parse_lod(
    section_name: &str,
    section: &Properties,
    key: &str,
    default: u8,
) -> Result<u8, ConfigFileError> {
    let reason = "must be a level of detail between 0 and 30";
    match section.get(key) {
        None => Ok(default),
        Some(v) => {
            let lod: u8 = parse_value(section_name, key, v, reason)?;
            if lod > MAX_LOD {
                return Err(invalid(section_name, key, v, reason));
            }
            Ok(lod)
        }
    }
}

fn required<'a>(
    section_name: &str,
    section: &'a Properties,
    key: &str,
) -> Result<&'a str, ConfigFileError> {
    match section.get(key).map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ConfigFileError::MissingKey {
            section: section_name.to_string(),
            key: key.to_string(),
        }),
    }
}

fn optional(section: &Properties, key: &str) -> Option<String> {
    section
        .get(key)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

fn parse_value<T: FromStr>(
    section: &str,
    key: &str,
    value: &str,
    reason: &str,
) -> Result<T, ConfigFileError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value, reason))
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Expand ~ to home directory in paths.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
