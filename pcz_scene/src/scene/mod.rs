//! Scene module — the portal-connected-zone scene manager.
//!
//! `PczSceneManager` owns zones, portals, nodes, cameras and lights in
//! slot maps and ties them together each frame: zone maintenance keeps
//! node and light membership current, the visibility walk fills a
//! `RenderQueue` for a camera.

mod light;
mod options;
mod render_queue;
mod scene_manager;
mod scene_node;
mod visibility;
mod zone_maintenance;

pub use light::{LightKey, LightType, PczLight, DEFAULT_ATTENUATION_RANGE};
pub use options::{BackTouchPolicy, OptionValue};
pub use render_queue::{CollectingRenderQueue, RenderQueue};
pub use scene_manager::{PczSceneManager, DEFAULT_ZONE_NAME};
pub use scene_node::{NodeFlags, NodeKey, SceneNode};
