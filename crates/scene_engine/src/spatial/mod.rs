//! Spatial partitioning and occlusion culling
//!
//! Provides the per-cell spatial index: a flat-array kd-tree over member
//! bounding boxes, extended with hardware occlusion queries that cull whole
//! subtrees a frame after the GPU proves them hidden.

pub mod kd_tree;
pub mod occlusion;

pub use kd_tree::{
    KdCoefficients, KdTree, Member, MemberKey, MemberShape, MAX_DEPTH, MIN_DEPTH, MIN_SPLIT_COUNT,
};
pub use occlusion::{
    LightPoseKind, OcclusionIndex, DEFAULT_MIN_VISIBLE_PIXELS, DEFAULT_QUERY_FRACTION,
};
