//! Portal module — openings between zones and occluding anti-portals.
//!
//! Portals keep their previous and current world placement so node and
//! portal crossings are detected over the whole frame step.

mod portal;

pub use portal::{
    Portal, PortalIntersectResult, PortalKey, PortalKind, PortalShape,
};
