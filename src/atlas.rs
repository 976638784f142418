use std::{collections::HashMap, fmt, fs, path::Path};

use serde::{
    Deserialize, Deserializer,
    de::{MapAccess, Visitor},
};

use crate::error::{Error, Result};

/// Pixel-space rectangle of one named frame inside the atlas texture
///
/// Origin is the top-left corner of the image, `y` grows downward
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRect {
    pub name: String,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Normalized texture coordinates of a frame
///
/// Follows wgpu's texture space: `(0, 0)` is the top-left texel, so `v0` is the top edge
/// of the frame and `v1` the bottom edge. Always `u0 < u1` & `v0 < v1`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UvRect {
    pub u0: f32,
    pub v0: f32,
    pub u1: f32,
    pub v1: f32,
}

impl UvRect {
    /// Normalizes a pixel rectangle against the atlas dimensions
    ///
    /// Callers must have checked that `rect` is non-empty & inside `size`
    pub fn from_pixels(rect: &FrameRect, size: AtlasSize) -> Self {
        let (w, h) = (size.width as f32, size.height as f32);
        Self {
            u0: rect.x as f32 / w,
            v0: rect.y as f32 / h,
            u1: (rect.x + rect.width) as f32 / w,
            v1: (rect.y + rect.height) as f32 / h,
        }
    }

    /// Texture coordinates for the quad corners: top-left, top-right, bottom-right, bottom-left
    pub fn corners(&self) -> [[f32; 2]; 4] {
        [
            [self.u0, self.v0],
            [self.u1, self.v0],
            [self.u1, self.v1],
            [self.u0, self.v1],
        ]
    }
}

/// Pixel dimensions of the atlas texture
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct AtlasSize {
    #[serde(alias = "w")]
    pub width: u32,
    #[serde(alias = "h")]
    pub height: u32,
}

impl AtlasSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Raw atlas metadata as exported by TexturePacker-style tools
///
/// Accepts both the "hash" layout (`frames` keyed by name) & the "array" layout
/// (`frames` is a list of records carrying a `filename`). Fields other than the frame
/// rectangle & `meta.size` are ignored
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(try_from = "RawAtlas")]
pub struct AtlasMetadata {
    frames: HashMap<String, AtlasRecord>,
    size: Option<AtlasSize>,
}

#[derive(Clone, Debug)]
struct AtlasRecord {
    rect: FrameRect,
    rotated: bool,
}

#[derive(Deserialize)]
struct RawAtlas {
    frames: RawFrames,
    #[serde(default)]
    meta: Option<RawMeta>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawFrames {
    Hash(FrameEntries),
    Array(Vec<NamedFrame>),
}

/// Entries of a "hash" layout in document order, duplicate keys included
struct FrameEntries(Vec<(String, RawFrame)>);

impl<'de> Deserialize<'de> for FrameEntries {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = FrameEntries;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("an object mapping frame names to frame records")
            }

            fn visit_map<M>(self, mut map: M) -> Result<Self::Value, M::Error>
            where
                M: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry()? {
                    entries.push(entry);
                }
                Ok(FrameEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

#[derive(Deserialize)]
struct RawFrame {
    frame: PixelRect,
    #[serde(default)]
    rotated: bool,
}

#[derive(Deserialize)]
struct NamedFrame {
    filename: String,
    #[serde(flatten)]
    record: RawFrame,
}

#[derive(Deserialize)]
struct PixelRect {
    x: u32,
    y: u32,
    #[serde(alias = "width")]
    w: u32,
    #[serde(alias = "height")]
    h: u32,
}

#[derive(Deserialize)]
struct RawMeta {
    #[serde(default)]
    size: Option<AtlasSize>,
}

impl TryFrom<RawAtlas> for AtlasMetadata {
    type Error = String;

    fn try_from(raw: RawAtlas) -> Result<Self, Self::Error> {
        let named: Vec<(String, RawFrame)> = match raw.frames {
            RawFrames::Hash(FrameEntries(entries)) => entries,
            RawFrames::Array(list) => list.into_iter().map(|f| (f.filename, f.record)).collect(),
        };

        let mut frames = HashMap::with_capacity(named.len());
        for (name, raw) in named {
            let record = AtlasRecord {
                rect: FrameRect {
                    name: name.clone(),
                    x: raw.frame.x,
                    y: raw.frame.y,
                    width: raw.frame.w,
                    height: raw.frame.h,
                },
                rotated: raw.rotated,
            };
            if frames.insert(name.clone(), record).is_some() {
                return Err(format!("duplicate frame `{name}`"));
            }
        }

        Ok(Self {
            frames,
            size: raw.meta.and_then(|m| m.size),
        })
    }
}

impl AtlasMetadata {
    /// Builds metadata directly from pixel rectangles
    pub fn from_frames(
        frames: impl IntoIterator<Item = FrameRect>,
        size: Option<AtlasSize>,
    ) -> Self {
        Self {
            frames: frames
                .into_iter()
                .map(|rect| {
                    (
                        rect.name.clone(),
                        AtlasRecord {
                            rect,
                            rotated: false,
                        },
                    )
                })
                .collect(),
            size,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::init("atlas metadata", e))
    }

    /// Reads & parses an atlas JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let resource = format!("atlas metadata `{}`", path.display());
        let json = fs::read_to_string(path).map_err(|e| Error::init(&resource, e))?;
        serde_json::from_str(&json).map_err(|e| Error::init(resource, e))
    }

    /// Atlas texture dimensions declared in `meta.size`, if any
    pub fn size(&self) -> Option<AtlasSize> {
        self.size
    }

    pub fn frame(&self, name: &str) -> Option<&FrameRect> {
        self.frames.get(name).map(|r| &r.rect)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// A frame resolved against its atlas: pixel rectangle plus normalized coords
#[derive(Clone, Debug, PartialEq)]
pub struct AtlasFrame {
    pub rect: FrameRect,
    pub uv: UvRect,
}

/// Lookup from frame name to texture coordinates, built once at load time
#[derive(Clone, Debug, Default)]
pub struct SpriteAtlas {
    frames: HashMap<String, AtlasFrame>,
}

impl SpriteAtlas {
    pub fn get(&self, name: &str) -> Option<&AtlasFrame> {
        self.frames.get(name)
    }

    pub fn uv(&self, name: &str) -> Option<UvRect> {
        self.frames.get(name).map(|f| f.uv)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.frames.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.frames.keys().map(String::as_str)
    }
}

/// Resolves `requested` frames from `metadata` into a [`SpriteAtlas`]
///
/// Fails on the first name that isn't in the metadata; nothing partial is returned
pub fn parse_atlas<S: AsRef<str>>(
    metadata: &AtlasMetadata,
    requested: &[S],
    size: AtlasSize,
) -> Result<SpriteAtlas> {
    if size.width == 0 || size.height == 0 {
        return Err(Error::init(
            "atlas",
            format!("texture is {}x{}", size.width, size.height),
        ));
    }

    let mut frames = HashMap::with_capacity(requested.len());
    for name in requested {
        let name = name.as_ref();
        let record = metadata
            .frames
            .get(name)
            .ok_or_else(|| Error::MissingFrame(name.to_string()))?;
        let rect = &record.rect;

        let fits = rect.width > 0
            && rect.height > 0
            && u64::from(rect.x) + u64::from(rect.width) <= u64::from(size.width)
            && u64::from(rect.y) + u64::from(rect.height) <= u64::from(size.height);
        if !fits {
            return Err(Error::FrameOutOfBounds {
                name: name.to_string(),
                x: rect.x,
                y: rect.y,
                width: rect.width,
                height: rect.height,
                atlas_width: size.width,
                atlas_height: size.height,
            });
        }
        if record.rotated {
            log::warn!("frame `{name}` is packed rotated; sampling it unrotated");
        }

        frames.insert(
            name.to_string(),
            AtlasFrame {
                rect: rect.clone(),
                uv: UvRect::from_pixels(rect, size),
            },
        );
    }

    log::debug!(
        "parsed {} atlas frames from {}x{} texture",
        frames.len(),
        size.width,
        size.height
    );
    Ok(SpriteAtlas { frames })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(name: &str, x: u32, y: u32, width: u32, height: u32) -> FrameRect {
        FrameRect {
            name: name.to_string(),
            x,
            y,
            width,
            height,
        }
    }

    fn two_frames() -> AtlasMetadata {
        AtlasMetadata::from_frames(
            [rect("A", 0, 0, 10, 10), rect("B", 10, 0, 10, 10)],
            Some(AtlasSize::new(20, 10)),
        )
    }

    #[test]
    fn normalizes_against_atlas_size() {
        let meta = AtlasMetadata::from_frames([rect("f", 32, 16, 64, 48)], None);
        let atlas = parse_atlas(&meta, &["f"], AtlasSize::new(256, 128)).unwrap();
        let uv = atlas.uv("f").unwrap();

        assert_eq!(uv.u0, 32.0 / 256.0);
        assert_eq!(uv.u1, (32.0 + 64.0) / 256.0);
        assert_eq!(uv.v0, 16.0 / 128.0);
        assert_eq!(uv.v1, (16.0 + 48.0) / 128.0);
        assert!(uv.u0 < uv.u1 && uv.v0 < uv.v1);
    }

    #[test]
    fn top_row_maps_to_v_zero() {
        // pixel row 0 is the top of the image & wgpu samples v = 0 there
        let meta = AtlasMetadata::from_frames(
            [rect("top", 0, 0, 8, 8), rect("bottom", 0, 24, 8, 8)],
            None,
        );
        let atlas = parse_atlas(&meta, &["top", "bottom"], AtlasSize::new(8, 32)).unwrap();

        assert_eq!(atlas.uv("top").unwrap().v0, 0.0);
        assert_eq!(atlas.uv("bottom").unwrap().v1, 1.0);
        assert!(atlas.uv("top").unwrap().v1 <= atlas.uv("bottom").unwrap().v0);
    }

    #[test]
    fn same_row_frames_share_v_range() {
        let atlas = parse_atlas(&two_frames(), &["A", "B"], AtlasSize::new(20, 10)).unwrap();
        let (a, b) = (atlas.uv("A").unwrap(), atlas.uv("B").unwrap());

        assert_eq!((a.u0, a.u1), (0.0, 0.5));
        assert_eq!((b.u0, b.u1), (0.5, 1.0));
        assert_eq!((a.v0, a.v1), (b.v0, b.v1));
    }

    #[test]
    fn missing_frame_names_the_culprit() {
        let err = parse_atlas(&two_frames(), &["A", "C", "B"], AtlasSize::new(20, 10)).unwrap_err();
        assert!(matches!(err, Error::MissingFrame(ref name) if name == "C"));
    }

    #[test]
    fn only_requested_frames_are_kept() {
        let atlas = parse_atlas(&two_frames(), &["B"], AtlasSize::new(20, 10)).unwrap();
        assert_eq!(atlas.len(), 1);
        assert!(atlas.contains("B"));
        assert!(!atlas.contains("A"));
    }

    #[test]
    fn rejects_frames_outside_the_atlas() {
        let meta = AtlasMetadata::from_frames([rect("wide", 15, 0, 10, 10)], None);
        let err = parse_atlas(&meta, &["wide"], AtlasSize::new(20, 10)).unwrap_err();
        assert!(matches!(err, Error::FrameOutOfBounds { ref name, .. } if name == "wide"));

        let meta = AtlasMetadata::from_frames([rect("empty", 0, 0, 0, 10)], None);
        let err = parse_atlas(&meta, &["empty"], AtlasSize::new(20, 10)).unwrap_err();
        assert!(matches!(err, Error::FrameOutOfBounds { .. }));
    }

    #[test]
    fn rejects_zero_sized_atlas() {
        let err = parse_atlas(&two_frames(), &["A"], AtlasSize::new(0, 10)).unwrap_err();
        assert!(matches!(err, Error::ResourceInit { .. }));
    }

    #[test]
    fn parsing_is_deterministic() {
        let meta = AtlasMetadata::from_frames([rect("f", 3, 7, 11, 13)], None);
        let a = parse_atlas(&meta, &["f"], AtlasSize::new(97, 89)).unwrap();
        let b = parse_atlas(&meta, &["f"], AtlasSize::new(97, 89)).unwrap();
        let (a, b) = (a.uv("f").unwrap(), b.uv("f").unwrap());

        assert_eq!(a.u0.to_bits(), b.u0.to_bits());
        assert_eq!(a.v0.to_bits(), b.v0.to_bits());
        assert_eq!(a.u1.to_bits(), b.u1.to_bits());
        assert_eq!(a.v1.to_bits(), b.v1.to_bits());
    }

    #[test]
    fn reads_hash_layout_and_ignores_extra_fields() {
        let json = r#"{
            "frames": {
                "RunRight01.png": {
                    "frame": {"x": 0, "y": 0, "w": 10, "h": 10},
                    "rotated": false,
                    "trimmed": true,
                    "spriteSourceSize": {"x": 1, "y": 1, "w": 8, "h": 8},
                    "sourceSize": {"w": 12, "h": 12}
                },
                "RunRight02.png": {
                    "frame": {"x": 10, "y": 0, "w": 10, "h": 10}
                }
            },
            "meta": {"app": "packer", "size": {"w": 20, "h": 10}, "scale": "1"}
        }"#;
        let meta = AtlasMetadata::from_json(json).unwrap();

        assert_eq!(meta.len(), 2);
        assert_eq!(meta.size(), Some(AtlasSize::new(20, 10)));
        assert_eq!(
            meta.frame("RunRight02.png"),
            Some(&rect("RunRight02.png", 10, 0, 10, 10))
        );
    }

    #[test]
    fn reads_array_layout_with_width_aliases() {
        let json = r#"{
            "frames": [
                {"filename": "A", "frame": {"x": 0, "y": 0, "width": 10, "height": 10}},
                {"filename": "B", "frame": {"x": 10, "y": 0, "width": 10, "height": 10}, "rotated": true}
            ]
        }"#;
        let meta = AtlasMetadata::from_json(json).unwrap();

        assert_eq!(meta.size(), None);
        let atlas = parse_atlas(&meta, &["A", "B"], AtlasSize::new(20, 10)).unwrap();
        assert_eq!(atlas.uv("B").unwrap().u1, 1.0);
    }

    #[test]
    fn rejects_duplicate_array_entries() {
        let json = r#"{"frames": [
            {"filename": "A", "frame": {"x": 0, "y": 0, "w": 1, "h": 1}},
            {"filename": "A", "frame": {"x": 1, "y": 0, "w": 1, "h": 1}}
        ]}"#;
        assert!(matches!(
            AtlasMetadata::from_json(json),
            Err(Error::ResourceInit { .. })
        ));
    }

    #[test]
    fn rejects_duplicate_hash_keys() {
        let json = r#"{"frames": {
            "A": {"frame": {"x": 0, "y": 0, "w": 1, "h": 1}},
            "A": {"frame": {"x": 1, "y": 0, "w": 1, "h": 1}}
        }}"#;
        let err = AtlasMetadata::from_json(json).unwrap_err();
        assert!(matches!(err, Error::ResourceInit { .. }));
        assert!(err.to_string().contains("duplicate frame `A`"));
    }

    #[test]
    fn load_reports_the_path() {
        let err = AtlasMetadata::load("does/not/exist.json").unwrap_err();
        assert!(err.to_string().contains("does/not/exist.json"));
    }
}
