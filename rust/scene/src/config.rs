// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scene synchronization settings.

use roomview_geometry::TexCoordMode;
use serde::Deserialize;

/// Settings for the scene layer.
///
/// Deserializes from partial documents (missing fields keep their defaults)
/// and can be read from `ROOMVIEW_*` environment variables.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Instantiate bindings for shadow (provisional preview) entities.
    pub shadow_entities: bool,
    /// Pin every vertex marker at full transparency.
    pub debug_vertices: bool,
    /// Texture coordinate mode for wall faces.
    pub tex_coord_mode: TexCoordMode,
    /// Normal smoothing threshold in radians; zero is flat shading.
    pub crease_angle: f64,
    /// Thickness of walls without a thickness property.
    pub default_wall_thickness: f64,
    /// Height of vertices without a height property.
    pub default_wall_height: f64,
    /// Edge length of the vertex marker box.
    pub vertex_marker_size: f64,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            shadow_entities: true,
            debug_vertices: false,
            tex_coord_mode: TexCoordMode::Normalized,
            crease_angle: 0.0,
            default_wall_thickness: 0.1,
            default_wall_height: 2.4,
            vertex_marker_size: 0.2,
        }
    }
}

impl SceneConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Load configuration through a variable lookup, falling back to defaults
    /// for missing or unparsable values.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            shadow_entities: var("ROOMVIEW_SHADOW_ENTITIES")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.shadow_entities),
            debug_vertices: var("ROOMVIEW_DEBUG_VERTICES")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.debug_vertices),
            tex_coord_mode: var("ROOMVIEW_TEXCOORD_MODE")
                .and_then(|v| TexCoordMode::parse(&v))
                .unwrap_or(defaults.tex_coord_mode),
            crease_angle: var("ROOMVIEW_CREASE_ANGLE")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.crease_angle),
            default_wall_thickness: var("ROOMVIEW_WALL_THICKNESS")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.default_wall_thickness),
            default_wall_height: var("ROOMVIEW_WALL_HEIGHT")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.default_wall_height),
            vertex_marker_size: defaults.vertex_marker_size,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
