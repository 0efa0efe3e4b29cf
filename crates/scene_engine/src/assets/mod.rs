//! Content loading collaborator interface
//!
//! Cells consume loaded subgraphs through [`ContentProvider`]; the actual
//! deserialization of model files into meshes and materials lives outside
//! this crate. Providers may do their work on a background thread; the
//! delivery slot is the synchronization point, and the requesting cell
//! integrates the result on its own (main) thread.

use std::fmt;
use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::scene::graph::SceneGraph;
use crate::scene::node::NodeKey;
use crate::scene::registry::NameRegistry;

/// Identifier of a loadable subgraph's content
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentId(pub String);

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContentId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// A fully loaded subgraph, ready to install into a cell.
///
/// Poseable descendants arrive already populated with their mesh, material,
/// and effect references; the cell only has to integrate them spatially.
#[derive(Debug)]
pub struct Subgraph {
    /// The loaded node hierarchy
    pub graph: SceneGraph,
    /// Root node of the hierarchy
    pub root: NodeKey,
    /// Names registered while loading
    pub names: NameRegistry,
}

/// Errors a content provider can deliver
#[derive(Debug, Error)]
pub enum ContentError {
    /// No content exists under the requested identifier
    #[error("content '{0}' was not found")]
    NotFound(ContentId),

    /// The content exists but could not be decoded
    #[error("content '{id}' failed to decode: {reason}")]
    Decode {
        /// The identifier that failed
        id: ContentId,
        /// Human-readable decode failure
        reason: String,
    },
}

/// State of one requested load
#[derive(Debug, Default)]
pub enum LoadSlot {
    /// Still loading
    #[default]
    Pending,
    /// Loaded and waiting for the cell to install it
    Ready(Subgraph),
    /// The load failed; the cell may retry
    Failed(ContentError),
}

/// Delivery slot a provider fills when a load completes.
///
/// The mutex is the visibility gate between a provider's worker thread and
/// the cell's main-thread integration.
pub type SubgraphSlot = Arc<Mutex<LoadSlot>>;

/// Create an empty delivery slot.
pub fn empty_slot() -> SubgraphSlot {
    Arc::new(Mutex::new(LoadSlot::Pending))
}

/// Asynchronous, idempotent supplier of cell content.
pub trait ContentProvider {
    /// Begin (or continue) loading `id`, delivering into `slot` when done.
    ///
    /// Requests are idempotent: repeated requests for an identifier that is
    /// already loading or loaded must be no-ops. Implementations are free to
    /// fill the slot from a worker thread.
    fn request(&mut self, id: &ContentId, slot: SubgraphSlot);
}
