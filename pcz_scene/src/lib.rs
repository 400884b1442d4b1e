/*!
# PCZ Scene

Portal-connected-zone scene management.

A scene is split into zones joined by portals. Each frame the manager
tracks which zone every node lives in and which zones it pokes into, then
walks outward from the camera's zone through visible portals to decide
what can be seen.

## Architecture

- **PczSceneManager**: Owns zones, portals, nodes, cameras and lights
- **Zone**: Spatial partition trait (default, octree and terrain zones)
- **Portal**: Quad, box or sphere opening between two zones
- **PczCamera**: Camera with a stack of portal culling planes
- **PczLight**: Light that tracks the zones it can reach
- **Engine**: Global logger and named scene manager registry
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod geometry;
pub mod octree;
pub mod portal;
pub mod camera;
pub mod zone;
pub mod scene;

// Main pcz namespace module
pub mod pcz {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine singleton
    pub use crate::engine::Engine;

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    pub mod geometry {
        pub use crate::geometry::*;
    }

    pub mod camera {
        pub use crate::camera::*;
    }

    pub mod portal {
        pub use crate::portal::*;
    }

    pub mod zone {
        pub use crate::zone::*;
    }

    pub mod scene {
        pub use crate::scene::*;
    }

    pub mod octree {
        pub use crate::octree::*;
    }
}

// Re-export math library at crate root
pub use glam;
