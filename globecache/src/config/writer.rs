//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! This module contains the `to_config_string()` function that produces
//! the commented INI representation written to `config.ini`.

use std::fmt::Write;
use std::path::Path;

use super::parser::LAYER_SECTION_PREFIX;
use super::settings::{ConfigFile, LayerSettings};
use crate::provider::ProviderConfig;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let mut out = format!(
        r#"[cache]
; Soft maximum of resident terrain blocks (0 = unbounded)
max_blocks = {}
; Fraction of max_blocks kept after a purge, greater than 0 and at most 1
fill_factor = {}
; Seconds a block may go unrequested before it expires (0 = never)
idle_expiry = {}

[download]
; HTTP request timeout in seconds
timeout = {}

[logging]
; Log directory; the log file is truncated at session start
directory = {}
file = {}
"#,
        config.cache.max_blocks,
        config.cache.fill_factor,
        config.cache.idle_expiry,
        config.download.timeout,
        path_to_string(&config.logging.directory),
        config.logging.file,
    );

    out.push_str(
        r#"
; Tile layers, one [layer.NAME] section each. Image layers blend in file order.
;   role = image | elevation
;   type = dataset  (servers, layer)
;          xyz      (servers, min_lod, max_lod, optional template using
;                    {server} {z} {x} and {y} for north-origin or {-y} for TMS rows)
;          wms      (server, layer, format, style, version)
;          wmts     (server, layer, format, style, matrix_set, max_lod)
"#,
    );

    for layer in &config.layers {
        out.push('\n');
        write_layer(&mut out, layer);
    }

    out
}

fn write_layer(out: &mut String, layer: &LayerSettings) {
    // Writing to a String never fails.
    let _ = writeln!(out, "[{}{}]", LAYER_SECTION_PREFIX, layer.name());
    let _ = writeln!(out, "role = {}", layer.role);
    let _ = writeln!(out, "type = {}", layer.provider.kind());

    match &layer.provider {
        ProviderConfig::Dataset { servers, layer, .. } => {
            let _ = writeln!(out, "servers = {}", servers.join(", "));
            let _ = writeln!(out, "layer = {}", layer);
        }
        ProviderConfig::Xyz {
            servers,
            min_lod,
            max_lod,
            template,
            ..
        } => {
            let _ = writeln!(out, "servers = {}", servers.join(", "));
            let _ = writeln!(out, "min_lod = {}", min_lod);
            let _ = writeln!(out, "max_lod = {}", max_lod);
            if let Some(template) = template {
                let _ = writeln!(out, "template = {}", template);
            }
        }
        ProviderConfig::Wms {
            server,
            layer,
            format,
            style,
            version,
            ..
        } => {
            let _ = writeln!(out, "server = {}", server);
            let _ = writeln!(out, "layer = {}", layer);
            let _ = writeln!(out, "format = {}", format);
            let _ = writeln!(out, "style = {}", style);
            let _ = writeln!(out, "version = {}", version);
        }
        ProviderConfig::Wmts {
            server,
            layer,
            format,
            style,
            matrix_set,
            max_lod,
            ..
        } => {
            let _ = writeln!(out, "server = {}", server);
            let _ = writeln!(out, "layer = {}", layer);
            let _ = writeln!(out, "format = {}", format);
            let _ = writeln!(out, "style = {}", style);
            let _ = writeln!(out, "matrix_set = {}", matrix_set);
            let _ = writeln!(out, "max_lod = {}", max_lod);
        }
    }
}

fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}
