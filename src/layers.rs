//! Parsed layered-document tree, as delivered by an external document parser.
//!
//! Nodes live in a flat arena and refer to children by [`LayerId`]. Lookups
//! walk the arena with an explicit stack, so deep or malformed trees can't
//! blow the call stack.

use crate::{
    MockupError, MockupResult,
    geometry::{LayerBounds, TransformMatrix},
};

/// Name the template authoring tools give the artwork layer by default.
pub const DEFAULT_SMART_LAYER: &str = "Your Design Here";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct LayerId(pub usize);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayerKind {
    Group,
    #[default]
    Pixel,
    SmartObject,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LayerNode {
    pub name: String,
    #[serde(default)]
    pub kind: LayerKind,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub bounds: Option<LayerBounds>,
    #[serde(default)]
    pub transform: Option<TransformMatrix>,
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    #[serde(default)]
    pub blend_mode: Option<String>,
    #[serde(default)]
    pub children: Vec<LayerId>,
}

fn default_opacity() -> f32 {
    1.0
}

impl LayerNode {
    pub fn new(name: impl Into<String>, kind: LayerKind) -> Self {
        Self {
            name: name.into(),
            kind,
            hidden: false,
            bounds: None,
            transform: None,
            opacity: 1.0,
            blend_mode: None,
            children: Vec::new(),
        }
    }
}

/// Arena of layers plus the top-level ids in document order.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LayerTree {
    pub nodes: Vec<LayerNode>,
    pub roots: Vec<LayerId>,
}

impl LayerTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: LayerId) -> Option<&LayerNode> {
        self.nodes.get(id.0)
    }

    /// Append a node under `parent` (or at the top level).
    pub fn push(&mut self, parent: Option<LayerId>, node: LayerNode) -> MockupResult<LayerId> {
        let id = LayerId(self.nodes.len());
        match parent {
            Some(p) => {
                let parent = self.nodes.get_mut(p.0).ok_or_else(|| {
                    MockupError::validation(format!("parent layer {} does not exist", p.0))
                })?;
                parent.children.push(id);
            }
            None => self.roots.push(id),
        }
        self.nodes.push(node);
        Ok(id)
    }

    /// Depth-first, document-order traversal. Each node is yielded once;
    /// dangling or repeated child ids are skipped.
    pub fn walk(&self) -> Vec<LayerId> {
        let mut visited = vec![false; self.nodes.len()];
        let mut order = Vec::new();
        let mut stack: Vec<LayerId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id.0) else {
                continue;
            };
            if std::mem::replace(&mut visited[id.0], true) {
                continue;
            }
            order.push(id);
            stack.extend(node.children.iter().rev().copied());
        }
        order
    }

    /// First layer named `name`: an exact match anywhere wins over a
    /// trimmed, case-insensitive one.
    pub fn find_by_name(&self, name: &str) -> Option<LayerId> {
        let order = self.walk();
        if let Some(id) = order.iter().find(|id| self.nodes[id.0].name == name) {
            return Some(*id);
        }
        let wanted = name.trim().to_lowercase();
        order
            .into_iter()
            .find(|id| self.nodes[id.0].name.trim().to_lowercase() == wanted)
    }

    pub fn smart_objects(&self) -> Vec<LayerId> {
        self.walk()
            .into_iter()
            .filter(|id| self.nodes[id.0].kind == LayerKind::SmartObject)
            .collect()
    }

    /// Layer named `name`, or the first smart object when no name matches.
    pub fn resolve_smart_layer(&self, name: &str) -> Option<LayerId> {
        self.find_by_name(name).or_else(|| {
            let fallback = self.smart_objects().into_iter().next();
            if fallback.is_some() {
                tracing::debug!(name, "smart layer not found by name; using first smart object");
            }
            fallback
        })
    }
}
