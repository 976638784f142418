use glam::{Mat4, Vec2, Vec3, vec3};

/// Orthographic camera looking down -Z at the sprite plane, Y-up
///
/// `half_extent` is how many world units must stay visible either side of `position`
/// at zoom 1. The view widens along one axis to match the surface so world units stay square
pub struct Camera {
    position: Vec2,
    zoom: f32,
    half_extent: Vec2,
    eye_distance: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            zoom: 1.0,
            half_extent: Vec2::splat(100.0),
            eye_distance: 50.0,
        }
    }
}

impl Camera {
    pub fn new(half_extent: Vec2) -> Self {
        Self {
            half_extent,
            ..Default::default()
        }
    }

    /// Set the camera's target position (center of view)
    pub fn target(&mut self, position: Vec2) {
        self.position = position;
    }

    /// Sets the zoom factor, clamped to 0.1..=10.0
    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = zoom.clamp(0.1, 10.0);
    }

    /// Half of the visible area in world units for a surface of `screen_size` pixels
    pub fn visible_half_extent(&self, screen_size: Vec2) -> Vec2 {
        let screen = screen_size.max(Vec2::ONE);
        let units_per_pixel = (self.half_extent / screen).max_element();
        screen * units_per_pixel / self.zoom
    }

    /// Returns the combined projection * view matrix for a surface of `screen_size` pixels
    pub fn view_proj(&self, screen_size: Vec2) -> Mat4 {
        let half = self.visible_half_extent(screen_size);
        let proj = Mat4::orthographic_rh(
            -half.x,
            half.x,
            -half.y,
            half.y,
            0.0,
            self.eye_distance * 2.0,
        );
        let eye = vec3(self.position.x, self.position.y, self.eye_distance);
        let center = vec3(self.position.x, self.position.y, 0.0);
        let view = Mat4::look_at_rh(eye, center, Vec3::Y);
        proj * view
    }
}
