//! Camera module — projection, frustums and portal-aware cameras.
//!
//! `Camera` and `Frustum` are plain culling tools. `PczCamera` adds a stack
//! of extra planes that the visibility walk grows as it passes through
//! portals; `PczFrustum` is that stack on its own, also used standalone for
//! anti-portal occlusion.

mod camera;
mod frustum;
mod pcz_camera;
mod pcz_frustum;

pub use camera::{Camera, ProjectionType};
pub use frustum::{
    Frustum, Visibility,
    PLANE_LEFT, PLANE_RIGHT, PLANE_BOTTOM, PLANE_TOP, PLANE_NEAR, PLANE_FAR,
};
pub use pcz_camera::{CameraKey, PczCamera};
pub use pcz_frustum::{CullingPlane, PczFrustum};
