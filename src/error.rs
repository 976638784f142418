/// Everything that can go wrong while loading or animating a sprite
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A requested frame is not present in the atlas metadata
    #[error("atlas metadata has no frame named `{0}`")]
    MissingFrame(String),

    /// `set_texture_rect` was given a name the sprite's atlas doesn't know
    #[error("sprite atlas has no frame named `{0}`")]
    UnknownFrame(String),

    /// A frame rectangle is empty or reaches outside the atlas texture
    #[error("frame `{name}` ({x}, {y}, {width}x{height}) does not fit in the {atlas_width}x{atlas_height} atlas")]
    FrameOutOfBounds {
        name: String,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        atlas_width: u32,
        atlas_height: u32,
    },

    /// Shader, texture, atlas or GPU setup failed before the first tick
    #[error("failed to initialize {resource}: {reason}")]
    ResourceInit { resource: String, reason: String },

    /// The GPU context went away or reported an error mid-frame
    #[error("render state invalid: {0}")]
    RenderState(String),

    #[error("an animation needs at least one frame")]
    EmptySequence,

    #[error("animation interval must be positive & finite, got {0}")]
    InvalidInterval(f32),
}

impl Error {
    pub(crate) fn init(resource: impl Into<String>, reason: impl ToString) -> Self {
        Self::ResourceInit {
            resource: resource.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
