//! Quadkey inspection CLI commands.
//!
//! `quadkey inspect` prints everything the codec knows about a quadkey;
//! `quadkey at` finds the quadkey containing a WGS84 position.

use clap::Subcommand;

use globecache::coord::{quadkey_at, QuadKey};

use crate::error::CliError;

/// Quadkey subcommands.
#[derive(Debug, Subcommand)]
pub enum QuadkeyCommands {
    /// Show tile coordinate, bounds, parent and children of a quadkey
    Inspect {
        /// Quadkey digits (0-3); use "" for the root tile
        quadkey: String,
    },

    /// Find the quadkey containing a position
    At {
        /// Latitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Longitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Level of detail (quadkey length, max 30)
        #[arg(long)]
        lod: u8,
    },
}

/// Run a quadkey subcommand.
pub fn run(command: QuadkeyCommands) -> Result<(), CliError> {
    match command {
        QuadkeyCommands::Inspect { quadkey } => {
            let quadkey = QuadKey::parse(&quadkey)?;
            print!("{}", describe(&quadkey));
            Ok(())
        }
        QuadkeyCommands::At { lat, lon, lod } => {
            let quadkey = quadkey_at(lat, lon, lod)?;
            println!("{}", quadkey);
            Ok(())
        }
    }
}

/// Multi-line description of a quadkey.
pub fn describe(quadkey: &QuadKey) -> String {
    let tile = quadkey.tile_coord();
    let parent = quadkey
        .parent()
        .map(|p| p.to_string())
        .unwrap_or_else(|| "(none)".to_string());
    let children = quadkey
        .children()
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(" ");

    format!(
        "Quadkey:    {}\n\
         Level:      {}\n\
         Tile:       x={} y={} (xyz row {})\n\
         Normalized: {}\n\
         Mercator:   {}\n\
         WGS84:      {}\n\
         Parent:     {}\n\
         Children:   {}\n",
        quadkey,
        quadkey.lod(),
        tile.x,
        tile.y,
        tile.xyz_row(),
        format_bounds(&quadkey.normalized_bounds(), 6),
        format_bounds(&quadkey.mercator_bounds(), 2),
        format_bounds(&quadkey.wgs84_bounds(), 6),
        parent,
        if children.is_empty() {
            "(none)".to_string()
        } else {
            children
        },
    )
}

fn format_bounds(bounds: &[f64; 4], precision: usize) -> String {
    let parts: Vec<String> = bounds
        .iter()
        .map(|v| format!("{:.*}", precision, v))
        .collect();
    format!("[{}]", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_quadkey() {
        let text = describe(&QuadKey::parse("0123").unwrap());
        assert!(text.contains("Level:      4"));
        assert!(text.contains("x=5 y=12 (xyz row 3)"));
        assert!(text.contains("Parent:     012"));
        assert!(text.contains("Children:   01230 01231 01232 01233"));
    }

    #[test]
    fn test_describe_shallow_quadkey_has_no_parent() {
        let text = describe(&QuadKey::parse("2").unwrap());
        assert!(text.contains("Parent:     (none)"));
        assert!(text.contains("Normalized: [0.000000, 0.500000, 0.500000, 0.000000]"));
    }

    #[test]
    fn test_format_bounds() {
        assert_eq!(format_bounds(&[1.0, -2.5, 3.26, 4.0], 1), "[1.0, -2.5, 3.3, 4.0]");
    }
}
