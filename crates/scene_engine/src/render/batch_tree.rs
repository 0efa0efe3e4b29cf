//! Per-frame render command tree with state deduplication
//!
//! Each level of the tree represents one GPU state change; adopting the same
//! command value twice at one level returns the same node, so the state is
//! bound once per frame no matter how many objects depend on it. Nodes live
//! in a reset arena and are valid for exactly one frame: the tree is reset
//! when building begins and again after it is drawn, and must never be
//! stored across frames.

use crate::foundation::memory::ResetArena;

const NIL: u32 = u32::MAX;

/// Handle to a node of a [`RenderTree`], valid for the current frame only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchNodeId(u32);

/// A deduplicatable state-change command executed by the draw pass.
///
/// `render` performs the state change and is responsible for rendering
/// `children` itself, so the state remains bound for the duration of every
/// descendant's rendering. Commands whose state is not safely left set
/// restore it after the children return; cheap bindings simply leave it.
pub trait RenderCommand<B>: PartialEq + Sized {
    /// Execute the state change, rendering descendants while it is bound.
    fn render(&self, backend: &mut B, children: Children<'_, Self>);
}

#[derive(Debug)]
struct BatchNode<C> {
    /// `None` only for the root sentinel.
    command: Option<C>,
    sort_key: f32,
    head: u32,
    next: u32,
}

/// A pooled tree of render commands built fresh every frame.
#[derive(Debug)]
pub struct RenderTree<C> {
    arena: ResetArena<BatchNode<C>>,
}

impl<C: PartialEq> RenderTree<C> {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create a tree with arena storage for `capacity` nodes pre-allocated.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut tree = Self {
            arena: ResetArena::with_capacity(capacity.max(1)),
        };
        tree.spawn_root();
        tree
    }

    fn spawn_root(&mut self) {
        let root = self.arena.grab(BatchNode {
            command: None,
            sort_key: f32::MAX,
            head: NIL,
            next: NIL,
        });
        debug_assert_eq!(root, 0, "root sentinel must occupy arena slot zero");
    }

    /// The root level of the tree.
    pub fn root(&self) -> BatchNodeId {
        BatchNodeId(0)
    }

    /// Free the whole tree back to the pool, leaving an empty root.
    ///
    /// Every [`BatchNodeId`] from before the reset is invalidated.
    pub fn reset(&mut self) {
        self.arena.reset();
        self.spawn_root();
    }

    fn grab(&mut self, command: C, sort_key: f32) -> u32 {
        self.arena.grab(BatchNode {
            command: Some(command),
            sort_key,
            head: NIL,
            next: NIL,
        })
    }

    /// Find or create a child of `parent` for `command`.
    ///
    /// A child whose command equals `command` is reused; otherwise a new
    /// child is created at the front of the level.
    pub fn adopt(&mut self, parent: BatchNodeId, command: C) -> BatchNodeId {
        let mut e = self.arena.get(parent.0).head;
        while e != NIL {
            let node = self.arena.get(e);
            if node.command.as_ref() == Some(&command) {
                return BatchNodeId(e);
            }
            e = node.next;
        }
        self.adopt_front(parent, command)
    }

    /// Unconditionally create a new child at the front of `parent`'s level.
    pub fn adopt_front(&mut self, parent: BatchNodeId, command: C) -> BatchNodeId {
        let id = self.grab(command, f32::MAX);
        let old_head = self.arena.get(parent.0).head;
        self.arena.get_mut(id).next = old_head;
        self.arena.get_mut(parent.0).head = id;
        BatchNodeId(id)
    }

    /// Find or create a child keeping the level ordered by ascending key.
    ///
    /// An exact `(sort_key, command)` match is reused; otherwise the new
    /// child is linked at its sorted position.
    pub fn adopt_sorted(&mut self, parent: BatchNodeId, command: C, sort_key: f32) -> BatchNodeId {
        let head = self.arena.get(parent.0).head;
        if head == NIL || self.arena.get(head).sort_key > sort_key {
            let id = self.adopt_front(parent, command);
            self.arena.get_mut(id.0).sort_key = sort_key;
            return id;
        }

        {
            let head_node = self.arena.get(head);
            if head_node.sort_key == sort_key && head_node.command.as_ref() == Some(&command) {
                return BatchNodeId(head);
            }
        }

        let mut prev = head;
        let mut e = self.arena.get(head).next;
        while e != NIL {
            let node = self.arena.get(e);
            if node.sort_key == sort_key && node.command.as_ref() == Some(&command) {
                return BatchNodeId(e);
            }
            if node.sort_key > sort_key {
                break;
            }
            prev = e;
            e = node.next;
        }

        let id = self.grab(command, sort_key);
        self.arena.get_mut(prev).next = id;
        self.arena.get_mut(id).next = e;
        BatchNodeId(id)
    }

    /// Like [`adopt_sorted`](Self::adopt_sorted), but deduplicates on the
    /// command alone: an existing match keeps the smaller of its current and
    /// the offered key and is re-spliced into sorted position. Used when the
    /// same state is shared by objects discovered in varying depth order.
    pub fn adopt_and_update_sort(
        &mut self,
        parent: BatchNodeId,
        command: C,
        sort_key: f32,
    ) -> BatchNodeId {
        let mut prev = NIL;
        let mut e = self.arena.get(parent.0).head;
        while e != NIL {
            let node = self.arena.get(e);
            if node.command.as_ref() == Some(&command) {
                let next = node.next;
                let updated = node.sort_key.min(sort_key);
                self.arena.get_mut(e).sort_key = updated;

                if prev == NIL {
                    self.arena.get_mut(parent.0).head = next;
                } else {
                    self.arena.get_mut(prev).next = next;
                }
                self.reinsert_sorted(parent, e);
                return BatchNodeId(e);
            }
            prev = e;
            e = node.next;
        }

        self.adopt_sorted(parent, command, sort_key)
    }

    fn reinsert_sorted(&mut self, parent: BatchNodeId, id: u32) {
        let key = self.arena.get(id).sort_key;
        let head = self.arena.get(parent.0).head;

        if head == NIL || self.arena.get(head).sort_key > key {
            self.arena.get_mut(id).next = head;
            self.arena.get_mut(parent.0).head = id;
            return;
        }

        let mut prev = head;
        let mut e = self.arena.get(head).next;
        while e != NIL {
            let node = self.arena.get(e);
            if node.sort_key > key {
                break;
            }
            prev = e;
            e = node.next;
        }
        self.arena.get_mut(prev).next = id;
        self.arena.get_mut(id).next = e;
    }

    /// The command recorded at a node; `None` for the root sentinel.
    pub fn command(&self, id: BatchNodeId) -> Option<&C> {
        self.arena.get(id.0).command.as_ref()
    }

    /// The sort key recorded at a node.
    pub fn sort_key(&self, id: BatchNodeId) -> f32 {
        self.arena.get(id.0).sort_key
    }

    /// Children of a node in draw order.
    pub fn children(&self, id: BatchNodeId) -> Vec<BatchNodeId> {
        let mut out = Vec::new();
        let mut e = self.arena.get(id.0).head;
        while e != NIL {
            out.push(BatchNodeId(e));
            e = self.arena.get(e).next;
        }
        out
    }

    /// Number of children of a node.
    pub fn child_count(&self, id: BatchNodeId) -> usize {
        self.children(id).len()
    }

    /// Execute the tree: state changes top-down, children in level order.
    pub fn render<B>(&self, backend: &mut B)
    where
        C: RenderCommand<B>,
    {
        Children {
            tree: self,
            head: self.arena.get(0).head,
        }
        .render_all(backend);
    }
}

impl<C: PartialEq> Default for RenderTree<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// The children of a render node, rendered while its state is bound.
pub struct Children<'a, C> {
    tree: &'a RenderTree<C>,
    head: u32,
}

impl<C: PartialEq> Children<'_, C> {
    /// Render every child in level order.
    pub fn render_all<B>(self, backend: &mut B)
    where
        C: RenderCommand<B>,
    {
        let mut e = self.head;
        while e != NIL {
            let node = self.tree.arena.get(e);
            if let Some(command) = &node.command {
                command.render(
                    backend,
                    Children {
                        tree: self.tree,
                        head: node.head,
                    },
                );
            }
            e = node.next;
        }
    }

    /// True when the node has no children.
    pub fn is_empty(&self) -> bool {
        self.head == NIL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Tag(u32);

    impl RenderCommand<Vec<u32>> for Tag {
        fn render(&self, backend: &mut Vec<u32>, children: Children<'_, Self>) {
            backend.push(self.0);
            children.render_all(backend);
        }
    }

    #[test]
    fn test_adopt_deduplicates_equal_commands() {
        let mut tree = RenderTree::new();
        let root = tree.root();

        let a = tree.adopt(root, Tag(7));
        let b = tree.adopt(root, Tag(7));
        let c = tree.adopt(root, Tag(9));

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(tree.child_count(root), 2);
    }

    #[test]
    fn test_adopt_sorted_keeps_keys_non_decreasing() {
        let mut tree = RenderTree::new();
        let root = tree.root();

        for (tag, key) in [(1, 5.0), (2, 1.0), (3, 9.0), (4, 1.0), (5, 4.0), (2, 1.0)] {
            tree.adopt_sorted(root, Tag(tag), key);
        }

        let keys: Vec<f32> = tree
            .children(root)
            .into_iter()
            .map(|id| tree.sort_key(id))
            .collect();
        assert!(keys.windows(2).all(|w| w[0] <= w[1]), "keys: {keys:?}");
        // (Tag(2), 1.0) adopted twice resolves to one node.
        assert_eq!(tree.child_count(root), 5);
    }

    #[test]
    fn test_adopt_and_update_sort_relocates() {
        let mut tree = RenderTree::new();
        let root = tree.root();

        tree.adopt_sorted(root, Tag(1), 2.0);
        tree.adopt_sorted(root, Tag(2), 4.0);
        let found = tree.adopt_and_update_sort(root, Tag(2), 1.0);

        // Existing node reused, key lowered to the minimum, order restored.
        assert_eq!(tree.sort_key(found), 1.0);
        let keys: Vec<f32> = tree
            .children(root)
            .into_iter()
            .map(|id| tree.sort_key(id))
            .collect();
        assert!(keys.windows(2).all(|w| w[0] <= w[1]), "keys: {keys:?}");
        assert_eq!(tree.child_count(root), 2);

        // A higher key never raises an existing node.
        let same = tree.adopt_and_update_sort(root, Tag(2), 8.0);
        assert_eq!(same, found);
        assert_eq!(tree.sort_key(found), 1.0);
    }

    #[test]
    fn test_render_executes_parent_before_children() {
        let mut tree = RenderTree::new();
        let root = tree.root();

        let effect = tree.adopt(root, Tag(100));
        tree.adopt(effect, Tag(1));
        tree.adopt(effect, Tag(2));

        let mut order = Vec::new();
        tree.render(&mut order);

        assert_eq!(order[0], 100);
        assert_eq!(order.len(), 3);
        assert!(order.contains(&1) && order.contains(&2));
    }

    #[test]
    fn test_reset_clears_residual_linkage() {
        let mut tree = RenderTree::new();
        let root = tree.root();

        let effect = tree.adopt(root, Tag(1));
        tree.adopt(effect, Tag(2));
        assert_eq!(tree.child_count(root), 1);

        tree.reset();
        let root = tree.root();
        assert_eq!(tree.child_count(root), 0);

        // A fresh adopt gets a node with no children from the prior frame.
        let fresh = tree.adopt(root, Tag(1));
        assert_eq!(tree.child_count(fresh), 0);
        assert_eq!(tree.child_count(root), 1);
    }
}
