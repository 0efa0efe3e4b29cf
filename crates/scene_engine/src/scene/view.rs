//! Per-frame view state supplied by the frame collaborator

use crate::foundation::math::Mat4;
use crate::scene::bounds::Frustum;

/// The active view for one frame.
///
/// Built by the host once per frame, before any pose pass runs. The tick is a
/// monotonically increasing frame counter used to deduplicate repeated update
/// and pose calls on the same cell within a frame (a cell reached through
/// several portals still updates and poses once).
#[derive(Debug, Clone)]
pub struct ViewState {
    /// Monotonic frame counter, starting above zero
    pub tick: u64,
    /// World-to-view transform
    pub view: Mat4,
    /// View-to-clip transform
    pub projection: Mat4,
    /// World-space frustum derived from `projection * view`
    pub frustum: Frustum,
}

impl ViewState {
    /// Build the frame's view state, deriving the world frustum.
    pub fn new(tick: u64, view: Mat4, projection: Mat4) -> Self {
        debug_assert!(tick > 0, "frame ticks start at 1 so tick 0 can mean 'never'");
        Self {
            tick,
            view,
            projection,
            frustum: Frustum::from_matrix(&(projection * view)),
        }
    }
}
