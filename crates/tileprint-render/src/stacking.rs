//! Surface tree used to derive stacking paths.
//!
//! Models the element hierarchy of a live map view: a root map container,
//! pane surfaces beneath it, and one container per layer. Each surface may
//! carry a z-index; `auto` reads as 0.
//!
//! The tree uses arena allocation with [`SurfaceId`] indices for all
//! relationships, so layers can hold a cheap anchor id instead of a borrow.

/// A type-safe index into a [`SurfaceTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(pub usize);

impl SurfaceId {
    /// The map container is always at index 0.
    pub const ROOT: Self = Self(0);
}

/// One element of the rendering surface.
#[derive(Debug, Clone)]
pub struct Surface {
    /// Human-readable label (pane or layer name), for diagnostics.
    pub name: String,
    /// Explicit stacking index; `None` means `auto`.
    pub z_index: Option<i32>,
    /// Parent surface, `None` for the root or a detached surface.
    pub parent: Option<SurfaceId>,
    /// Child surfaces in insertion order.
    pub children: Vec<SurfaceId>,
}

/// Arena of surfaces rooted at the map container.
#[derive(Debug, Clone)]
pub struct SurfaceTree {
    surfaces: Vec<Surface>,
}

impl SurfaceTree {
    /// Create a tree holding only the map container.
    #[must_use]
    pub fn new() -> Self {
        Self {
            surfaces: vec![Surface {
                name: "map".to_string(),
                z_index: None,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// The map container id.
    #[must_use]
    pub const fn root(&self) -> SurfaceId {
        SurfaceId::ROOT
    }

    /// Get a surface by id.
    #[must_use]
    pub fn get(&self, id: SurfaceId) -> Option<&Surface> {
        self.surfaces.get(id.0)
    }

    /// Number of surfaces, including the root.
    #[must_use]
    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    /// Always false: the root exists from construction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    /// Allocate a detached surface.
    pub fn alloc(&mut self, name: &str, z_index: Option<i32>) -> SurfaceId {
        let id = SurfaceId(self.surfaces.len());
        self.surfaces.push(Surface {
            name: name.to_string(),
            z_index,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Append `child` as the last child of `parent`.
    ///
    /// Does nothing if either id is unknown.
    pub fn append_child(&mut self, parent: SurfaceId, child: SurfaceId) {
        if parent.0 >= self.surfaces.len() || child.0 >= self.surfaces.len() {
            return;
        }
        self.surfaces[parent.0].children.push(child);
        self.surfaces[child.0].parent = Some(parent);
    }

    /// Allocate a surface and attach it under `parent` in one step.
    pub fn insert(&mut self, parent: SurfaceId, name: &str, z_index: Option<i32>) -> SurfaceId {
        let id = self.alloc(name, z_index);
        self.append_child(parent, id);
        id
    }

    /// Change a surface's z-index (layers get reordered by the UI).
    pub fn set_z_index(&mut self, id: SurfaceId, z_index: Option<i32>) {
        if let Some(surface) = self.surfaces.get_mut(id.0) {
            surface.z_index = z_index;
        }
    }

    /// Parent of a surface.
    #[must_use]
    pub fn parent(&self, id: SurfaceId) -> Option<SurfaceId> {
        self.get(id).and_then(|s| s.parent)
    }

    /// Stacking indices from the root's child down to `anchor`.
    ///
    /// Walks `anchor` up to the root, recording each surface's z-index (the
    /// root itself is not recorded), then reverses. Returns `None` if `anchor`
    /// is unknown, is the root, or is not attached to the root.
    #[must_use]
    pub fn stacking_path(&self, anchor: SurfaceId) -> Option<Vec<i32>> {
        if anchor == SurfaceId::ROOT {
            return None;
        }
        let mut path = Vec::new();
        let mut current = anchor;
        while current != SurfaceId::ROOT {
            let surface = self.get(current)?;
            path.push(surface.z_index.unwrap_or(0));
            current = surface.parent?;
            // Re-parenting can build a cycle.
            if path.len() > self.surfaces.len() {
                return None;
            }
        }
        path.reverse();
        Some(path)
    }
}

impl Default for SurfaceTree {
    fn default() -> Self {
        Self::new()
    }
}
