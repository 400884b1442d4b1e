/// Camera — position, orientation and projection with derived culling data.
///
/// The view matrix, projection matrix and frustum are recomputed whenever
/// a parameter changes, so the getters are always consistent. A far
/// distance of zero means an infinite far plane.

use glam::{Mat4, Quat, Vec3};
use super::frustum::Frustum;

/// Projection model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionType {
    Perspective,
    Orthographic,
}

/// Camera with a world transform and a projection.
#[derive(Debug, Clone)]
pub struct Camera {
    position: Vec3,
    orientation: Quat,
    projection_type: ProjectionType,
    /// Vertical field of view in radians (perspective)
    fov_y: f32,
    aspect: f32,
    /// Full view height (orthographic)
    ortho_height: f32,
    near: f32,
    far: f32,
    view_matrix: Mat4,
    projection_matrix: Mat4,
    frustum: Frustum,
}

impl Default for Camera {
    fn default() -> Self {
        Self::perspective(std::f32::consts::FRAC_PI_4, 1.0, 0.1, 1000.0)
    }
}

impl Camera {
    /// Perspective camera at the origin looking down -Z.
    pub fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            projection_type: ProjectionType::Perspective,
            fov_y,
            aspect,
            ortho_height: 10.0,
            near,
            far,
            view_matrix: Mat4::IDENTITY,
            projection_matrix: Mat4::IDENTITY,
            frustum: Frustum::from_view_projection(&Mat4::IDENTITY),
        };
        camera.refresh();
        camera
    }

    /// Orthographic camera at the origin looking down -Z.
    pub fn orthographic(height: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut camera = Self::perspective(std::f32::consts::FRAC_PI_4, aspect, near, far);
        camera.projection_type = ProjectionType::Orthographic;
        camera.ortho_height = height;
        camera.refresh();
        camera
    }

    // ===== GETTERS =====

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn orientation(&self) -> Quat {
        self.orientation
    }

    /// World-space viewing direction (-Z rotated by the orientation).
    pub fn direction(&self) -> Vec3 {
        self.orientation * -Vec3::Z
    }

    pub fn projection_type(&self) -> ProjectionType {
        self.projection_type
    }

    pub fn near(&self) -> f32 {
        self.near
    }

    /// Far distance; zero for an infinite far plane.
    pub fn far(&self) -> f32 {
        self.far
    }

    pub fn fov_y(&self) -> f32 {
        self.fov_y
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// View matrix (inverse of the camera's world transform).
    pub fn view_matrix(&self) -> &Mat4 {
        &self.view_matrix
    }

    pub fn projection_matrix(&self) -> &Mat4 {
        &self.projection_matrix
    }

    /// Combined view-projection matrix (projection * view).
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix * self.view_matrix
    }

    /// Frustum planes for culling.
    pub fn frustum(&self) -> &Frustum {
        &self.frustum
    }

    // ===== SETTERS =====

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.refresh();
    }

    pub fn set_orientation(&mut self, orientation: Quat) {
        self.orientation = orientation.normalize();
        self.refresh();
    }

    /// Set position and orientation in one step.
    pub fn set_transform(&mut self, position: Vec3, orientation: Quat) {
        self.position = position;
        self.orientation = orientation.normalize();
        self.refresh();
    }

    /// Orient the camera toward a target point, keeping +Y up.
    pub fn look_at(&mut self, target: Vec3) {
        let forward = (target - self.position).normalize_or_zero();
        if forward == Vec3::ZERO {
            return;
        }
        let view = Mat4::look_to_rh(Vec3::ZERO, forward, Self::up_for(forward));
        self.orientation = Quat::from_mat4(&view.inverse()).normalize();
        self.refresh();
    }

    pub fn set_projection_type(&mut self, projection_type: ProjectionType) {
        self.projection_type = projection_type;
        self.refresh();
    }

    pub fn set_fov_y(&mut self, fov_y: f32) {
        self.fov_y = fov_y;
        self.refresh();
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
        self.refresh();
    }

    pub fn set_ortho_height(&mut self, height: f32) {
        self.ortho_height = height;
        self.refresh();
    }

    /// Set clip distances; `far = 0` gives an infinite far plane.
    pub fn set_clip_distances(&mut self, near: f32, far: f32) {
        self.near = near;
        self.far = far;
        self.refresh();
    }

    fn up_for(forward: Vec3) -> Vec3 {
        if forward.cross(Vec3::Y).length_squared() < 1e-6 { Vec3::Z } else { Vec3::Y }
    }

    fn refresh(&mut self) {
        self.view_matrix = Mat4::from_rotation_translation(self.orientation, self.position).inverse();
        self.projection_matrix = match self.projection_type {
            ProjectionType::Perspective if self.far <= 0.0 => {
                Mat4::perspective_infinite_rh(self.fov_y, self.aspect, self.near)
            }
            ProjectionType::Perspective => {
                Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
            }
            ProjectionType::Orthographic => {
                let half_h = self.ortho_height * 0.5;
                let half_w = half_h * self.aspect;
                let far = if self.far > 0.0 { self.far } else { 1.0e6 };
                Mat4::orthographic_rh(-half_w, half_w, -half_h, half_h, self.near, far)
            }
        };
        self.frustum = Frustum::from_view_projection(&self.view_projection_matrix());
    }
}

#[cfg(test)]
#[path = "camera_tests.rs"]
mod tests;
