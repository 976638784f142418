//! Time-driven sprite animation from a packed texture atlas, rendered with `wgpu`
//!
//! Atlas metadata is resolved into normalized texture coordinates once at load time.
//! A fixed-interval [`AnimationClock`] picks the frame from elapsed wall time, and a
//! [`Sprite`] swaps only the texture coordinates of its quad when the frame changes

pub mod animation;
pub mod app;
pub mod atlas;
pub mod camera;
pub mod config;
pub mod context;
pub mod error;
pub mod program;
pub mod render_loop;
pub mod scene;
pub mod sprite;
pub mod texture;
pub mod time;
pub mod vertex;

pub use animation::{AnimationClock, ClockState, StepPolicy};
pub use atlas::{AtlasMetadata, AtlasSize, FrameRect, SpriteAtlas, UvRect, parse_atlas};
pub use camera::Camera;
pub use config::AppConfig;
pub use error::{Error, Result};
pub use render_loop::{FrameRenderer, RenderLoop, StopHandle, Tick};
pub use sprite::{Sprite, SpriteBindings, SpriteQuad};
