//! Table of contents tree built from the legacy navigation document.

/// One entry in the table of contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct TocNode {
    /// `id` of the `navPoint`.
    pub id: String,
    /// Label text.
    pub name: String,
    /// Canonical path of the target document, without fragment.
    pub file_name: String,
    /// Canonical path of the target including any fragment.
    pub src: String,
    pub fragment: Option<String>,
    /// `playOrder` of the `navPoint`, when declared and numeric.
    pub play_order: Option<usize>,
    pub children: Vec<TocNode>,
}

impl TocNode {
    /// Depth-first iterator over this node and all of its descendants.
    pub fn walk(&self) -> Walk<'_> {
        Walk { stack: vec![self] }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Depth-first, document-order traversal over a subtree.
pub struct Walk<'a> {
    stack: Vec<&'a TocNode>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a TocNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// Flatten a forest of nodes in document order.
pub fn flatten(nodes: &[TocNode]) -> Vec<&TocNode> {
    nodes.iter().flat_map(TocNode::walk).collect()
}
