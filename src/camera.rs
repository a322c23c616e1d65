//! Free-fly camera using Euler angles.
//!
//! Yaw and pitch are kept in degrees. The basis vectors are recomputed from them after
//! every look update, so `front`, `right` and `up` always form an orthonormal frame.

use glam::{Mat4, Vec3};

use crate::config::CameraSettings;

pub const YAW: f32 = -90.0;
pub const PITCH: f32 = 0.0;
pub const SPEED: f32 = 2.5;
pub const SENSITIVITY: f32 = 0.1;
pub const ZOOM: f32 = 45.0;

/// Pitch limit used when looking with `constrain_pitch`.
pub const PITCH_LIMIT: f32 = 89.0;
pub const MIN_ZOOM: f32 = 1.0;
pub const MAX_ZOOM: f32 = 45.0;

pub const NEAR: f32 = 0.1;
pub const FAR: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraMovement {
    Forward,
    Backward,
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    position: Vec3,
    front: Vec3,
    up: Vec3,
    right: Vec3,
    world_up: Vec3,
    yaw: f32,
    pitch: f32,
    movement_speed: f32,
    mouse_sensitivity: f32,
    zoom: f32,
    near: f32,
    far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Vec3::Y, YAW, PITCH)
    }
}

impl Camera {
    pub fn new(position: Vec3, world_up: Vec3, yaw: f32, pitch: f32) -> Self {
        let mut camera = Camera {
            position,
            front: Vec3::NEG_Z,
            up: world_up,
            right: Vec3::X,
            world_up,
            yaw,
            pitch,
            movement_speed: SPEED,
            mouse_sensitivity: SENSITIVITY,
            zoom: ZOOM,
            near: NEAR,
            far: FAR,
        };
        camera.update_camera_vectors();
        camera
    }

    pub fn from_settings(settings: &CameraSettings) -> Self {
        let mut camera = Self::new(
            Vec3::from(settings.position),
            Vec3::from(settings.world_up),
            settings.yaw,
            settings.pitch,
        );
        camera.movement_speed = settings.movement_speed;
        camera.mouse_sensitivity = settings.mouse_sensitivity;
        camera.zoom = settings.zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        camera.near = settings.near;
        camera.far = settings.far;
        camera
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front, self.up)
    }

    /// Perspective projection with the current zoom as vertical field of view.
    pub fn projection_matrix(&self, aspect_ratio: f32) -> Mat4 {
        Mat4::perspective_rh_gl(self.zoom.to_radians(), aspect_ratio, self.near, self.far)
    }

    /// Moves along the front or right vector by `movement_speed * delta_time`.
    pub fn process_movement(&mut self, direction: CameraMovement, delta_time: f32) {
        let velocity = self.movement_speed * delta_time;
        match direction {
            CameraMovement::Forward => self.position += self.front * velocity,
            CameraMovement::Backward => self.position -= self.front * velocity,
            CameraMovement::Left => self.position -= self.right * velocity,
            CameraMovement::Right => self.position += self.right * velocity,
        }
    }

    /// Applies a mouse offset. Positive `y_offset` looks up.
    ///
    /// Non-finite offsets are ignored.
    pub fn process_look(&mut self, x_offset: f32, y_offset: f32, constrain_pitch: bool) {
        if !x_offset.is_finite() || !y_offset.is_finite() {
            return;
        }
        self.yaw += x_offset * self.mouse_sensitivity;
        self.pitch += y_offset * self.mouse_sensitivity;

        if constrain_pitch {
            self.pitch = self.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        }

        self.update_camera_vectors();
    }

    /// Applies a scroll offset. Scrolling up narrows the field of view.
    ///
    /// Non-finite offsets are ignored.
    pub fn process_zoom(&mut self, y_offset: f32) {
        if !y_offset.is_finite() {
            return;
        }
        self.zoom = (self.zoom - y_offset).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    fn update_camera_vectors(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        self.front = Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos()).normalize();
        self.right = self.front.cross(self.world_up).normalize();
        self.up = self.right.cross(self.front).normalize();
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn front(&self) -> Vec3 {
        self.front
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn world_up(&self) -> Vec3 {
        self.world_up
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn movement_speed(&self) -> f32 {
        self.movement_speed
    }

    pub fn set_movement_speed(&mut self, speed: f32) {
        self.movement_speed = speed;
    }

    pub fn mouse_sensitivity(&self) -> f32 {
        self.mouse_sensitivity
    }

    pub fn set_mouse_sensitivity(&mut self, sensitivity: f32) {
        self.mouse_sensitivity = sensitivity;
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::Vec4;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    fn assert_orthonormal(camera: &Camera) {
        let (f, r, u) = (camera.front(), camera.right(), camera.up());
        for v in [f, r, u] {
            assert_relative_eq!(v.length(), 1.0, epsilon = 1e-4);
        }
        assert_relative_eq!(f.dot(r), 0.0, epsilon = 1e-4);
        assert_relative_eq!(f.dot(u), 0.0, epsilon = 1e-4);
        assert_relative_eq!(r.dot(u), 0.0, epsilon = 1e-4);
    }

    #[test]
    fn default_camera_looks_down_negative_z() {
        let camera = Camera::default();
        assert!(camera.front().abs_diff_eq(Vec3::NEG_Z, 1e-6));
        assert!(camera.right().abs_diff_eq(Vec3::X, 1e-6));
        assert!(camera.up().abs_diff_eq(Vec3::Y, 1e-6));
        assert!(camera.view_matrix().abs_diff_eq(Mat4::IDENTITY, 1e-6));
    }

    #[test]
    fn view_matrix_moves_the_world_opposite_the_camera() {
        let camera = Camera::new(Vec3::new(1.0, 2.0, 3.0), Vec3::Y, YAW, PITCH);
        let expected = Mat4::from_translation(Vec3::new(-1.0, -2.0, -3.0));
        assert!(camera.view_matrix().abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn movement_follows_the_basis() {
        let mut camera = Camera::default();
        camera.process_movement(CameraMovement::Forward, 2.0);
        assert!(camera.position().abs_diff_eq(Vec3::new(0.0, 0.0, -5.0), 1e-5));

        camera.process_movement(CameraMovement::Right, 1.0);
        camera.process_movement(CameraMovement::Backward, 2.0);
        assert!(camera.position().abs_diff_eq(Vec3::new(2.5, 0.0, 0.0), 1e-5));

        camera.set_movement_speed(1.0);
        camera.process_movement(CameraMovement::Left, 0.5);
        assert!(camera.position().abs_diff_eq(Vec3::new(2.0, 0.0, 0.0), 1e-5));
    }

    #[test]
    fn look_scales_by_sensitivity() {
        let mut camera = Camera::default();
        camera.process_look(900.0, 0.0, true);
        assert_relative_eq!(camera.yaw(), 0.0, epsilon = 1e-4);
        assert!(camera.front().abs_diff_eq(Vec3::X, 1e-5));

        camera.process_look(0.0, 2000.0, false);
        assert_relative_eq!(camera.pitch(), 200.0, epsilon = 1e-3);
    }

    #[test]
    fn pitch_stays_constrained() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut camera = Camera::default();
        for _ in 0..2000 {
            let dx = rng.random_range(-3000.0..3000.0);
            let dy = rng.random_range(-3000.0..3000.0);
            camera.process_look(dx, dy, true);
            assert!((-PITCH_LIMIT..=PITCH_LIMIT).contains(&camera.pitch()));
            assert_orthonormal(&camera);
        }
    }

    #[test]
    fn zoom_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut camera = Camera::default();
        for _ in 0..2000 {
            camera.process_zoom(rng.random_range(-100.0..100.0));
            assert!((MIN_ZOOM..=MAX_ZOOM).contains(&camera.zoom()));
        }
    }

    #[test]
    fn non_finite_look_is_ignored() {
        let mut camera = Camera::default();
        camera.process_look(300.0, 150.0, true);
        let before = camera.clone();

        for (dx, dy) in [
            (f32::NAN, 0.0),
            (0.0, f32::NAN),
            (f32::INFINITY, 1.0),
            (1.0, f32::NEG_INFINITY),
        ] {
            camera.process_look(dx, dy, true);
            assert_eq!(camera, before);
        }

        camera.process_look(10.0, -20.0, true);
        assert!(camera.yaw().is_finite());
        assert!((-PITCH_LIMIT..=PITCH_LIMIT).contains(&camera.pitch()));
        assert_orthonormal(&camera);
    }

    #[test]
    fn non_finite_zoom_is_ignored() {
        let mut camera = Camera::default();
        camera.process_zoom(5.0);
        for offset in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            camera.process_zoom(offset);
            assert_eq!(camera.zoom(), 40.0);
        }

        camera.process_zoom(1.0);
        assert_eq!(camera.zoom(), 39.0);
        let projection = camera.projection_matrix(1.0);
        assert!(projection.is_finite());
    }

    #[test]
    fn zoom_overshoot_clamps_immediately() {
        let mut camera = Camera::default();
        camera.process_zoom(100.0);
        assert_eq!(camera.zoom(), MIN_ZOOM);
        // a single step back in moves off the limit
        camera.process_zoom(-1.0);
        assert_eq!(camera.zoom(), 2.0);
        camera.process_zoom(-100.0);
        assert_eq!(camera.zoom(), MAX_ZOOM);
    }

    #[test]
    fn projection_uses_zoom_as_fov() {
        let mut camera = Camera::default();
        camera.process_zoom(-10.0);
        let near_point = camera.projection_matrix(1.0) * Vec4::new(0.0, 0.0, -NEAR, 1.0);
        assert_relative_eq!(near_point.z / near_point.w, -1.0, epsilon = 1e-4);

        let expected = Mat4::perspective_rh_gl(45f32.to_radians(), 1.5, NEAR, FAR);
        assert!(camera.projection_matrix(1.5).abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn settings_override_defaults() {
        let settings = CameraSettings {
            position: [0.0, 1.0, 5.0],
            zoom: 90.0,
            movement_speed: 10.0,
            ..Default::default()
        };
        let camera = Camera::from_settings(&settings);
        assert_eq!(camera.position(), Vec3::new(0.0, 1.0, 5.0));
        assert_eq!(camera.zoom(), MAX_ZOOM);
        assert_eq!(camera.movement_speed(), 10.0);
        assert_eq!(camera.mouse_sensitivity(), SENSITIVITY);
    }
}
