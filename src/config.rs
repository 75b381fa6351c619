//! Runtime settings for the event loop and the scene shader.
//!
//! Everything has a default. A few values can be overridden from the
//! environment: `FLOW_ASSET_ROOT` for the asset directory and
//! `FLOW_TICK_MILLIS` for the fixed update interval.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

pub const ASSET_ROOT_VAR: &str = "FLOW_ASSET_ROOT";
pub const TICK_MILLIS_VAR: &str = "FLOW_TICK_MILLIS";

/// Directional light shared by every model in the scene.
#[derive(Clone, Debug, PartialEq)]
pub struct LightConfig {
    pub direction: [f32; 3],
    pub ambient: [f32; 3],
    pub diffuse: [f32; 3],
    pub specular: [f32; 3],
    pub shininess: f32,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            direction: [-0.5, -1.0, -0.3],
            ambient: [0.3, 0.3, 0.3],
            diffuse: [0.8, 0.8, 0.8],
            specular: [1.0, 1.0, 1.0],
            shininess: 32.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub asset_root: PathBuf,
    pub window_title: String,
    pub clear_color: wgpu::Color,
    pub light: LightConfig,
    /// Fragments with an alpha below this are discarded.
    pub alpha_cutoff: f32,
    pub tick: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("./assets"),
            window_title: "flow instancing".to_string(),
            clear_color: wgpu::Color {
                r: 0.53,
                g: 0.81,
                b: 0.98,
                a: 1.0,
            },
            light: LightConfig::default(),
            alpha_cutoff: 0.1,
            tick: Duration::from_millis(16),
        }
    }
}

impl Config {
    /// Defaults with the environment overrides applied.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides looked up through `var`. Values that don't parse are ignored.
    pub fn with_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(root) = var(ASSET_ROOT_VAR).filter(|root| !root.trim().is_empty()) {
            self.asset_root = PathBuf::from(root);
        }
        if let Some(raw) = var(TICK_MILLIS_VAR) {
            match raw.trim().parse::<u64>() {
                Ok(millis) if millis > 0 => self.tick = Duration::from_millis(millis),
                _ => log::warn!(
                    "Ignoring {}={:?}, expected a positive number of milliseconds.",
                    TICK_MILLIS_VAR,
                    raw
                ),
            }
        }
        self
    }

    /// Resolve a model or texture path against the asset root.
    pub fn asset_path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.asset_root.join(relative)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = Config::default().with_overrides(env(&[]));
        assert_eq!(config, Config::default());
        assert_eq!(config.asset_path("cube.obj"), PathBuf::from("./assets/cube.obj"));
    }

    #[test]
    fn overrides_are_applied() {
        let config = Config::default().with_overrides(env(&[
            (ASSET_ROOT_VAR, "/srv/models"),
            (TICK_MILLIS_VAR, " 40 "),
        ]));
        assert_eq!(config.asset_path("a/b.obj"), PathBuf::from("/srv/models/a/b.obj"));
        assert_eq!(config.tick, Duration::from_millis(40));
    }

    #[test]
    fn bad_values_are_ignored() {
        let config = Config::default().with_overrides(env(&[
            (ASSET_ROOT_VAR, "  "),
            (TICK_MILLIS_VAR, "soon"),
        ]));
        assert_eq!(config, Config::default());

        let config = Config::default().with_overrides(env(&[(TICK_MILLIS_VAR, "0")]));
        assert_eq!(config.tick, Duration::from_millis(16));
    }
}
