use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use flipbook::{AppConfig, StepPolicy, app};

/// Plays a sprite animation from a texture atlas
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// JSON config file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,
    /// Atlas metadata (TexturePacker JSON)
    #[arg(long)]
    atlas: Option<PathBuf>,
    /// Atlas image
    #[arg(long)]
    texture: Option<PathBuf>,
    /// WGSL shader replacing the built-in one
    #[arg(long)]
    shader: Option<PathBuf>,
    /// Frame names in play order, comma separated
    #[arg(long, value_delimiter = ',')]
    frames: Option<Vec<String>>,
    /// Seconds per frame
    #[arg(long)]
    interval: Option<f32>,
    /// What to do with time left over after a long stall
    #[arg(long, value_enum)]
    policy: Option<StepPolicy>,
    #[arg(long)]
    width: Option<u32>,
    #[arg(long)]
    height: Option<u32>,
    #[arg(long)]
    title: Option<String>,
    /// Camera zoom factor
    #[arg(long)]
    zoom: Option<f32>,
}

impl Args {
    fn into_config(self) -> flipbook::Result<AppConfig> {
        let mut cfg = match &self.config {
            Some(path) => AppConfig::load(path)?,
            None => AppConfig::default(),
        };

        if let Some(atlas) = self.atlas {
            cfg.atlas_path = atlas;
        }
        if let Some(texture) = self.texture {
            cfg.texture_path = texture;
        }
        if self.shader.is_some() {
            cfg.shader_path = self.shader;
        }
        if let Some(frames) = self.frames {
            cfg.frames = frames;
        }
        if let Some(interval) = self.interval {
            cfg.interval = interval;
        }
        if let Some(policy) = self.policy {
            cfg.step_policy = policy;
        }
        if self.width.is_some() {
            cfg.width = self.width;
        }
        if self.height.is_some() {
            cfg.height = self.height;
        }
        if let Some(title) = self.title {
            cfg.title = title;
        }
        if let Some(zoom) = self.zoom {
            cfg.zoom = zoom;
        }
        Ok(cfg)
    }
}

fn main() -> ExitCode {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("warn"));

    let result = Args::parse().into_config().and_then(app::run);
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            eprintln!("flipbook: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_from(args: &[&str]) -> AppConfig {
        let argv = std::iter::once("flipbook").chain(args.iter().copied());
        Args::try_parse_from(argv).unwrap().into_config().unwrap()
    }

    #[test]
    fn no_flags_gives_defaults() {
        assert_eq!(config_from(&[]), AppConfig::default());
    }

    #[test]
    fn flags_override_individual_fields() {
        let cfg = config_from(&[
            "--frames",
            "Walk01.png,Walk02.png,Walk03.png",
            "--policy",
            "drop-excess",
            "--shader",
            "shaders/outline.wgsl",
            "--width",
            "1024",
            "--height",
            "768",
            "--interval",
            "0.2",
            "--zoom",
            "2",
        ]);

        assert_eq!(cfg.frames, ["Walk01.png", "Walk02.png", "Walk03.png"]);
        assert_eq!(cfg.step_policy, StepPolicy::DropExcess);
        assert_eq!(cfg.shader_path, Some(PathBuf::from("shaders/outline.wgsl")));
        assert_eq!((cfg.width, cfg.height), (Some(1024), Some(768)));
        assert_eq!(cfg.interval, 0.2);
        assert_eq!(cfg.zoom, 2.0);

        let defaults = AppConfig::default();
        assert_eq!(cfg.title, defaults.title);
        assert_eq!(cfg.atlas_path, defaults.atlas_path);
        assert_eq!(cfg.texture_path, defaults.texture_path);
    }

    #[test]
    fn flags_win_over_config_file() {
        let path = std::env::temp_dir().join(format!("flipbook-cli-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{"title": "From file", "interval": 0.5, "frames": ["Idle.png"]}"#,
        )
        .unwrap();

        let cfg = config_from(&[
            "--config",
            path.to_str().unwrap(),
            "--interval",
            "0.05",
            "--atlas",
            "other.json",
        ]);
        std::fs::remove_file(&path).unwrap();

        assert_eq!(cfg.interval, 0.05);
        assert_eq!(cfg.atlas_path, PathBuf::from("other.json"));
        assert_eq!(cfg.title, "From file");
        assert_eq!(cfg.frames, ["Idle.png"]);
    }

    #[test]
    fn unknown_policy_is_rejected() {
        assert!(Args::try_parse_from(["flipbook", "--policy", "rewind"]).is_err());
    }
}
