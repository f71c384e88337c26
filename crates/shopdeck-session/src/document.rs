//! Minimal page-tree model standing in for the host UI tree. The rendering
//! of operation markup is someone else's job; this tree exists so structural
//! observers can react to inserted subtrees.

use std::collections::BTreeMap;
use std::sync::Arc;

pub type NodeId = usize;

#[derive(Debug, Clone)]
pub struct Node {
    tag: String,
    attrs: BTreeMap<String, String>,
    children: Vec<NodeId>,
    enriched: bool,
}

/// Reacts to a subtree newly attached to the live tree. Implementations must
/// be idempotent: the same node may be observed more than once.
pub trait SubtreeObserver: Send + Sync {
    fn subtree_inserted(&self, doc: &mut Document, root: NodeId);
}

pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    observers: Vec<Arc<dyn SubtreeObserver>>,
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                tag: "body".to_string(),
                attrs: BTreeMap::new(),
                children: Vec::new(),
                enriched: false,
            }],
            root: 0,
            observers: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn attach_observer(&mut self, observer: Arc<dyn SubtreeObserver>) {
        self.observers.push(observer);
    }

    /// Create a detached element. It joins the live tree via
    /// [`Document::insert_subtree`].
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.nodes.push(Node {
            tag: tag.to_string(),
            attrs: BTreeMap::new(),
            children: Vec::new(),
            enriched: false,
        });
        self.nodes.len() - 1
    }

    pub fn tag(&self, id: NodeId) -> &str {
        &self.nodes[id].tag
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.nodes[id].attrs.get(name).map(String::as_str)
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        self.nodes[id]
            .attrs
            .insert(name.to_string(), value.to_string());
    }

    /// Structural link while building a detached fragment; observers are not
    /// notified until the fragment is inserted.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent].children.push(child);
    }

    /// Attach a subtree to the live tree and notify observers with its root.
    pub fn insert_subtree(&mut self, parent: NodeId, subtree: NodeId) {
        self.nodes[parent].children.push(subtree);
        self.notify_inserted(subtree);
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    /// Depth-first walk of a subtree, root included.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            for child in self.nodes[id].children.iter().rev() {
                stack.push(*child);
            }
        }
        out
    }

    pub fn is_enriched(&self, id: NodeId) -> bool {
        self.nodes[id].enriched
    }

    pub fn mark_enriched(&mut self, id: NodeId) {
        self.nodes[id].enriched = true;
    }

    fn notify_inserted(&mut self, root: NodeId) {
        let observers = self.observers.clone();
        for observer in observers {
            observer.subtree_inserted(self, root);
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
