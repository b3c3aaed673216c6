use glam::{Affine3A, Mat4, Quat, Vec2, Vec3};

use crate::resources::geometry::Ray;
use crate::settings::CameraSettings;

/// Perspective camera driven by the XR viewer pose.
///
/// Matrices are cached; the renderer only reads them.
#[derive(Debug, Clone)]
pub struct Camera {
    pub name: String,

    // === Projection ===
    /// Vertical field of view in radians.
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,

    pub(crate) world_matrix: Affine3A,
    pub(crate) view_matrix: Mat4,
    pub(crate) projection_matrix: Mat4,
    pub(crate) view_projection_matrix: Mat4,
}

impl Camera {
    /// `fov` is given in degrees.
    #[must_use]
    pub fn new_perspective(fov: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut cam = Self {
            name: "Camera".to_string(),
            fov: fov.to_radians(),
            aspect,
            near,
            far,

            world_matrix: Affine3A::IDENTITY,
            view_matrix: Mat4::IDENTITY,
            projection_matrix: Mat4::IDENTITY,
            view_projection_matrix: Mat4::IDENTITY,
        };

        cam.update_projection_matrix();
        cam
    }

    #[must_use]
    pub fn from_settings(settings: &CameraSettings, aspect: f32) -> Self {
        Self::new_perspective(settings.fov_degrees, aspect, settings.near, settings.far)
    }

    pub fn update_projection_matrix(&mut self) {
        self.projection_matrix = Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far);
        self.view_projection_matrix = self.projection_matrix * self.view_matrix;
    }

    /// Updates the aspect ratio and the projection. Degenerate ratios are ignored.
    pub fn set_aspect(&mut self, aspect: f32) {
        if !aspect.is_finite() || aspect <= 0.0 {
            log::warn!("Ignoring invalid camera aspect ratio {aspect}");
            return;
        }
        self.aspect = aspect;
        self.update_projection_matrix();
    }

    pub fn update_view_projection(&mut self, world_transform: &Affine3A) {
        self.world_matrix = *world_transform;
        self.view_matrix = Mat4::from(*world_transform).inverse();
        self.view_projection_matrix = self.projection_matrix * self.view_matrix;
    }

    /// Places the camera at the XR viewer pose.
    pub fn update_from_viewer(&mut self, position: Vec3, orientation: Quat) {
        let world = Affine3A::from_rotation_translation(orientation, position);
        self.update_view_projection(&world);
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn position(&self) -> Vec3 {
        Vec3::from(self.world_matrix.translation)
    }

    #[inline]
    #[must_use]
    pub fn world_matrix(&self) -> &Affine3A {
        &self.world_matrix
    }

    #[inline]
    #[must_use]
    pub fn view_matrix(&self) -> &Mat4 {
        &self.view_matrix
    }

    #[inline]
    #[must_use]
    pub fn projection_matrix(&self) -> &Mat4 {
        &self.projection_matrix
    }

    #[inline]
    #[must_use]
    pub fn view_projection_matrix(&self) -> &Mat4 {
        &self.view_projection_matrix
    }

    // ========================================================================
    // Picking
    // ========================================================================

    /// Unprojects a point from normalized device coordinates to world space.
    /// `depth` is in the `[0, 1]` clip range used by `perspective_rh`.
    #[must_use]
    pub fn unproject(&self, ndc: Vec2, depth: f32) -> Vec3 {
        let inverse = self.view_projection_matrix.inverse();
        inverse.project_point3(ndc.extend(depth))
    }

    /// Picking ray through an NDC point, starting at the camera position.
    #[must_use]
    pub fn ray_from_ndc(&self, ndc: Vec2) -> Ray {
        let origin = self.position();
        let target = self.unproject(ndc, 0.5);
        Ray::new(origin, target - origin)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::from_settings(&CameraSettings::default(), 16.0 / 9.0)
    }
}
