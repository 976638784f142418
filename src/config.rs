use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{
    animation::StepPolicy,
    error::{Error, Result},
};

/// Everything needed to start the app: window, assets & animation timing
///
/// Missing fields in a config file fall back to [`AppConfig::default`]
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub title: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub resizable: bool,
    pub clear_color: [f64; 4],
    pub atlas_path: PathBuf,
    pub texture_path: PathBuf,
    /// WGSL replacing the built-in sprite shader
    pub shader_path: Option<PathBuf>,
    /// Animation sequence, in play order
    pub frames: Vec<String>,
    /// Seconds each frame stays on screen
    pub interval: f32,
    pub step_policy: StepPolicy,
    /// World units visible either side of the center
    pub view_half_extent: [f32; 2],
    /// World point the camera looks at
    pub view_center: [f32; 2],
    pub zoom: f32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Flipbook".to_string(),
            width: Some(600),
            height: Some(600),
            resizable: true,
            clear_color: [0.94, 0.78, 0.95, 1.0],
            atlas_path: "assets/spritesheets/character.json".into(),
            texture_path: "assets/spritesheets/character.png".into(),
            shader_path: None,
            frames: (1..=4).map(|i| format!("RunRight0{i}.png")).collect(),
            interval: 0.1,
            step_policy: StepPolicy::CatchUp,
            view_half_extent: [100.0, 100.0],
            view_center: [0.0, 0.0],
            zoom: 1.0,
        }
    }
}

impl AppConfig {
    /// Reads a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let resource = format!("config `{}`", path.display());
        let json = std::fs::read_to_string(path).map_err(|e| Error::init(&resource, e))?;
        serde_json::from_str(&json).map_err(|e| Error::init(resource, e))
    }

    /// Catches settings that would only fail later, mid-startup
    pub fn validate(&self) -> Result<()> {
        if self.frames.is_empty() {
            return Err(Error::EmptySequence);
        }
        if !(self.interval.is_finite() && self.interval > 0.0) {
            return Err(Error::InvalidInterval(self.interval));
        }
        if self.view_half_extent.iter().any(|v| !(v.is_finite() && *v > 0.0)) {
            return Err(Error::init(
                "camera",
                format!("view half extent {:?} must be positive", self.view_half_extent),
            ));
        }
        if !self.view_center.iter().all(|v| v.is_finite()) {
            return Err(Error::init(
                "camera",
                format!("view center {:?} must be finite", self.view_center),
            ));
        }
        if !(self.zoom.is_finite() && self.zoom > 0.0) {
            return Err(Error::init(
                "camera",
                format!("zoom {} must be positive", self.zoom),
            ));
        }
        Ok(())
    }
}
