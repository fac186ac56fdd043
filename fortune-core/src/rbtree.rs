//! Arena-backed red-black tree with in-order `prev`/`next` threading.
//!
//! The tree has no key: callers position nodes themselves by descending from
//! the root and then inserting the new node as the in-order successor of a
//! chosen node (or as the first node). That is exactly what both the beachline
//! (keyed by breakpoints that move with the sweep) and the circle-event queue
//! need. Removed slots go onto a free list and are reused by later inserts.

/// Index into the tree's node arena
pub(crate) type NodeId = usize;

#[derive(Debug, Clone)]
struct RbNode<T> {
    value: T,
    parent: Option<NodeId>,
    left: Option<NodeId>,
    right: Option<NodeId>,
    prev: Option<NodeId>,
    next: Option<NodeId>,
    red: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct RbTree<T> {
    nodes: Vec<RbNode<T>>,
    free: Vec<NodeId>,
    root: Option<NodeId>,
}

impl<T> RbTree<T> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            root: None,
        }
    }

    /// Drop every node, keeping the arena's capacity.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.root = None;
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn get(&self, id: NodeId) -> &T {
        &self.nodes[id].value
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut T {
        &mut self.nodes[id].value
    }

    pub fn left(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].left
    }

    pub fn right(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].right
    }

    pub fn prev(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].prev
    }

    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].next
    }

    /// Smallest node of the whole tree
    #[cfg(test)]
    pub fn first(&self) -> Option<NodeId> {
        self.root.map(|r| self.leftmost(r))
    }

    /// Largest node of the whole tree
    #[cfg(test)]
    pub fn last(&self) -> Option<NodeId> {
        self.root.map(|r| self.rightmost(r))
    }

    /// Values in order, following the `next` threading
    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        let mut cursor = self.first();
        std::iter::from_fn(move || {
            let id = cursor?;
            cursor = self.nodes[id].next;
            Some(&self.nodes[id].value)
        })
    }

    fn leftmost(&self, mut id: NodeId) -> NodeId {
        while let Some(left) = self.nodes[id].left {
            id = left;
        }
        id
    }

    #[cfg(test)]
    fn rightmost(&self, mut id: NodeId) -> NodeId {
        while let Some(right) = self.nodes[id].right {
            id = right;
        }
        id
    }

    #[inline]
    fn is_red(&self, id: Option<NodeId>) -> bool {
        id.map_or(false, |i| self.nodes[i].red)
    }

    fn alloc(&mut self, value: T) -> NodeId {
        let node = RbNode {
            value,
            parent: None,
            left: None,
            right: None,
            prev: None,
            next: None,
            red: true,
        };
        match self.free.pop() {
            Some(id) => {
                self.nodes[id] = node;
                id
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    fn replace_child(&mut self, parent: Option<NodeId>, old: NodeId, new: Option<NodeId>) {
        match parent {
            Some(p) => {
                if self.nodes[p].left == Some(old) {
                    self.nodes[p].left = new;
                } else {
                    self.nodes[p].right = new;
                }
            }
            None => self.root = new,
        }
    }

    fn rotate_left(&mut self, p: NodeId) {
        let Some(q) = self.nodes[p].right else {
            return;
        };
        let parent = self.nodes[p].parent;
        self.replace_child(parent, p, Some(q));
        self.nodes[q].parent = parent;
        self.nodes[p].parent = Some(q);
        let inner = self.nodes[q].left;
        self.nodes[p].right = inner;
        if let Some(inner) = inner {
            self.nodes[inner].parent = Some(p);
        }
        self.nodes[q].left = Some(p);
    }

    fn rotate_right(&mut self, p: NodeId) {
        let Some(q) = self.nodes[p].left else {
            return;
        };
        let parent = self.nodes[p].parent;
        self.replace_child(parent, p, Some(q));
        self.nodes[q].parent = parent;
        self.nodes[p].parent = Some(q);
        let inner = self.nodes[q].right;
        self.nodes[p].left = inner;
        if let Some(inner) = inner {
            self.nodes[inner].parent = Some(p);
        }
        self.nodes[q].right = Some(p);
    }

    /// Insert `value` immediately after `node` in order, or as the first
    /// node when `node` is `None`. Returns the new node's id.
    pub fn insert_successor(&mut self, node: Option<NodeId>, value: T) -> NodeId {
        let successor = self.alloc(value);
        let parent = match node {
            Some(node) => {
                let next = self.nodes[node].next;
                self.nodes[successor].prev = Some(node);
                self.nodes[successor].next = next;
                if let Some(next) = next {
                    self.nodes[next].prev = Some(successor);
                }
                self.nodes[node].next = Some(successor);
                match self.nodes[node].right {
                    Some(right) => {
                        let leaf = self.leftmost(right);
                        self.nodes[leaf].left = Some(successor);
                        Some(leaf)
                    }
                    None => {
                        self.nodes[node].right = Some(successor);
                        Some(node)
                    }
                }
            }
            None => match self.root {
                Some(root) => {
                    let first = self.leftmost(root);
                    self.nodes[successor].next = Some(first);
                    self.nodes[first].prev = Some(successor);
                    self.nodes[first].left = Some(successor);
                    Some(first)
                }
                None => {
                    self.root = Some(successor);
                    None
                }
            },
        };
        self.nodes[successor].parent = parent;
        self.fix_insert(successor);
        successor
    }

    fn fix_insert(&mut self, mut node: NodeId) {
        while let Some(mut parent) = self.nodes[node].parent {
            if !self.nodes[parent].red {
                break;
            }
            // A red parent is never the root.
            let Some(grandpa) = self.nodes[parent].parent else {
                break;
            };
            if self.nodes[grandpa].left == Some(parent) {
                match self.nodes[grandpa].right.filter(|&u| self.nodes[u].red) {
                    Some(uncle) => {
                        self.nodes[parent].red = false;
                        self.nodes[uncle].red = false;
                        self.nodes[grandpa].red = true;
                        node = grandpa;
                    }
                    None => {
                        if self.nodes[parent].right == Some(node) {
                            self.rotate_left(parent);
                            std::mem::swap(&mut node, &mut parent);
                        }
                        self.nodes[parent].red = false;
                        self.nodes[grandpa].red = true;
                        self.rotate_right(grandpa);
                    }
                }
            } else {
                match self.nodes[grandpa].left.filter(|&u| self.nodes[u].red) {
                    Some(uncle) => {
                        self.nodes[parent].red = false;
                        self.nodes[uncle].red = false;
                        self.nodes[grandpa].red = true;
                        node = grandpa;
                    }
                    None => {
                        if self.nodes[parent].left == Some(node) {
                            self.rotate_right(parent);
                            std::mem::swap(&mut node, &mut parent);
                        }
                        self.nodes[parent].red = false;
                        self.nodes[grandpa].red = true;
                        self.rotate_left(grandpa);
                    }
                }
            }
        }
        if let Some(root) = self.root {
            self.nodes[root].red = false;
        }
    }

    /// Unlink `node` from the tree and the in-order threading and recycle
    /// its slot. The value stays readable until the slot is reused.
    pub fn remove(&mut self, node: NodeId) {
        let (prev, next) = (self.nodes[node].prev, self.nodes[node].next);
        if let Some(next) = next {
            self.nodes[next].prev = prev;
        }
        if let Some(prev) = prev {
            self.nodes[prev].next = next;
        }
        self.nodes[node].prev = None;
        self.nodes[node].next = None;

        let mut parent = self.nodes[node].parent;
        let left = self.nodes[node].left;
        let right = self.nodes[node].right;
        let replacement = match (left, right) {
            (None, _) => right,
            (Some(_), None) => left,
            (Some(_), Some(r)) => Some(self.leftmost(r)),
        };
        self.replace_child(parent, node, replacement);

        let removed_red;
        let mut x;
        match (left, right, replacement) {
            (Some(l), Some(r), Some(succ)) => {
                removed_red = self.nodes[succ].red;
                self.nodes[succ].red = self.nodes[node].red;
                self.nodes[succ].left = Some(l);
                self.nodes[l].parent = Some(succ);
                if succ != r {
                    parent = self.nodes[succ].parent;
                    self.nodes[succ].parent = self.nodes[node].parent;
                    x = self.nodes[succ].right;
                    if let Some(p) = parent {
                        self.nodes[p].left = x;
                    }
                    self.nodes[succ].right = Some(r);
                    self.nodes[r].parent = Some(succ);
                } else {
                    self.nodes[succ].parent = parent;
                    parent = Some(succ);
                    x = self.nodes[succ].right;
                }
            }
            _ => {
                removed_red = self.nodes[node].red;
                x = replacement;
            }
        }
        if let Some(x) = x {
            self.nodes[x].parent = parent;
        }
        self.nodes[node].parent = None;
        self.nodes[node].left = None;
        self.nodes[node].right = None;
        self.free.push(node);

        if removed_red {
            return;
        }
        if let Some(xi) = x.filter(|&i| self.nodes[i].red) {
            self.nodes[xi].red = false;
            return;
        }

        loop {
            if x == self.root {
                break;
            }
            let Some(p) = parent else {
                break;
            };
            if self.nodes[p].left == x {
                let Some(mut sibling) = self.nodes[p].right else {
                    break;
                };
                if self.nodes[sibling].red {
                    self.nodes[sibling].red = false;
                    self.nodes[p].red = true;
                    self.rotate_left(p);
                    let Some(s) = self.nodes[p].right else {
                        break;
                    };
                    sibling = s;
                }
                let (sl, sr) = (self.nodes[sibling].left, self.nodes[sibling].right);
                if self.is_red(sl) || self.is_red(sr) {
                    if !self.is_red(sr) {
                        if let Some(sl) = sl {
                            self.nodes[sl].red = false;
                        }
                        self.nodes[sibling].red = true;
                        self.rotate_right(sibling);
                        let Some(s) = self.nodes[p].right else {
                            break;
                        };
                        sibling = s;
                    }
                    self.nodes[sibling].red = self.nodes[p].red;
                    self.nodes[p].red = false;
                    if let Some(sr) = self.nodes[sibling].right {
                        self.nodes[sr].red = false;
                    }
                    self.rotate_left(p);
                    x = self.root;
                    break;
                }
                self.nodes[sibling].red = true;
            } else {
                let Some(mut sibling) = self.nodes[p].left else {
                    break;
                };
                if self.nodes[sibling].red {
                    self.nodes[sibling].red = false;
                    self.nodes[p].red = true;
                    self.rotate_right(p);
                    let Some(s) = self.nodes[p].left else {
                        break;
                    };
                    sibling = s;
                }
                let (sl, sr) = (self.nodes[sibling].left, self.nodes[sibling].right);
                if self.is_red(sl) || self.is_red(sr) {
                    if !self.is_red(sl) {
                        if let Some(sr) = sr {
                            self.nodes[sr].red = false;
                        }
                        self.nodes[sibling].red = true;
                        self.rotate_left(sibling);
                        let Some(s) = self.nodes[p].left else {
                            break;
                        };
                        sibling = s;
                    }
                    self.nodes[sibling].red = self.nodes[p].red;
                    self.nodes[p].red = false;
                    if let Some(sl) = self.nodes[sibling].left {
                        self.nodes[sl].red = false;
                    }
                    self.rotate_right(p);
                    x = self.root;
                    break;
                }
                self.nodes[sibling].red = true;
            }
            x = Some(p);
            parent = self.nodes[p].parent;
            if self.nodes[p].red {
                break;
            }
        }
        if let Some(x) = x {
            self.nodes[x].red = false;
        }
    }
}

impl<T> Default for RbTree<T> {
    fn default() -> Self {
        Self::new()
    }
}
