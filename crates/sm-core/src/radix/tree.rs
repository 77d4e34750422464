//! Binary PATRICIA tree over [`Prefix`] keys
//!
//! Nodes live in an arena. Each non-root node carries the segment of key
//! bits between its parent and itself; the first bit of that segment picks
//! the parent's `zero` or `one` edge. The root's segment is empty, so data
//! stored under a `/0` key sits on the root and covers every query.

use std::fmt::Write as _;
use std::sync::Arc;

use log::{debug, trace};

use crate::error::Result;

use super::prefix::Prefix;

/// Destructor hook run on payloads the tree discards.
pub type FreeFn<T> = Arc<dyn Fn(T) + Send + Sync>;
/// Renders a payload for [`RadixTree::dump`].
pub type PrintFn<T> = Arc<dyn Fn(&T) -> String + Send + Sync>;
/// Deep-copies a payload for [`RadixTree::clone_radix`].
pub type CloneFn<T> = Arc<dyn Fn(&T) -> T + Send + Sync>;

/// Optional payload hooks supplied at tree creation.
pub struct Callbacks<T> {
    pub free: Option<FreeFn<T>>,
    pub print: Option<PrintFn<T>>,
    pub clone: Option<CloneFn<T>>,
}

impl<T> Callbacks<T> {
    pub fn on_free(mut self, f: impl Fn(T) + Send + Sync + 'static) -> Self {
        self.free = Some(Arc::new(f));
        self
    }

    pub fn on_print(mut self, f: impl Fn(&T) -> String + Send + Sync + 'static) -> Self {
        self.print = Some(Arc::new(f));
        self
    }

    pub fn on_clone(mut self, f: impl Fn(&T) -> T + Send + Sync + 'static) -> Self {
        self.clone = Some(Arc::new(f));
        self
    }
}

impl<T> Default for Callbacks<T> {
    fn default() -> Self {
        Self {
            free: None,
            print: None,
            clone: None,
        }
    }
}

impl<T> Clone for Callbacks<T> {
    fn clone(&self) -> Self {
        Self {
            free: self.free.clone(),
            print: self.print.clone(),
            clone: self.clone.clone(),
        }
    }
}

struct RadixNode<T> {
    segment: Prefix,
    zero: Option<usize>,
    one: Option<usize>,
    data: Option<T>,
}

impl<T> RadixNode<T> {
    fn new(segment: Prefix, data: Option<T>) -> Self {
        Self {
            segment,
            zero: None,
            one: None,
            data,
        }
    }

    #[inline]
    fn child(&self, bit: bool) -> Option<usize> {
        if bit {
            self.one
        } else {
            self.zero
        }
    }

    fn set_child(&mut self, bit: bool, id: usize) {
        if bit {
            self.one = Some(id);
        } else {
            self.zero = Some(id);
        }
    }
}

/// Where an insertion lands, computed before anything is mutated.
enum Plan {
    /// Tree has no root yet; `leaf` is `None` for a `/0` key.
    Root { leaf: Option<Prefix> },
    /// Key ends exactly at an existing node.
    Attach(usize),
    /// Key leaves the tree through an empty edge.
    Append {
        parent: usize,
        bit: bool,
        leaf: Prefix,
    },
    /// Key diverges from, or ends inside, an existing segment.
    Split {
        node: usize,
        upper: Prefix,
        lower: Prefix,
        leaf: Option<Prefix>,
    },
}

// =============================================================================
// Tree
// =============================================================================

/// Prefix tree mapping bit-string keys to payloads.
pub struct RadixTree<T> {
    nodes: Vec<RadixNode<T>>,
    root: Option<usize>,
    elements: usize,
    callbacks: Callbacks<T>,
}

impl<T> RadixTree<T> {
    pub fn new() -> Self {
        Self::with_callbacks(Callbacks::default())
    }

    pub fn with_callbacks(callbacks: Callbacks<T>) -> Self {
        Self {
            nodes: Vec::new(),
            root: None,
            elements: 0,
            callbacks,
        }
    }

    /// Number of stored payloads.
    pub fn elements(&self) -> usize {
        self.elements
    }

    pub fn is_empty(&self) -> bool {
        self.elements == 0
    }

    /// Store `data` under `key`.
    ///
    /// An existing payload under the same key is replaced and handed to the
    /// free hook. On error the tree is unchanged.
    pub fn insert_data(&mut self, key: &Prefix, data: T) -> Result<()> {
        let plan = self.plan_insert(key)?;
        self.nodes.try_reserve(2)?;

        match plan {
            Plan::Root { leaf } => {
                let root = self.push(RadixNode::new(Prefix::empty(), None));
                self.root = Some(root);
                match leaf {
                    None => self.nodes[root].data = Some(data),
                    Some(leaf) => {
                        let bit = leaf.bit(0);
                        let id = self.push(RadixNode::new(leaf, Some(data)));
                        self.nodes[root].set_child(bit, id);
                    }
                }
                self.elements += 1;
            }
            Plan::Attach(node) => {
                if let Some(old) = self.nodes[node].data.replace(data) {
                    trace!("replacing payload for /{}", key.len());
                    self.release(old);
                } else {
                    self.elements += 1;
                }
            }
            Plan::Append { parent, bit, leaf } => {
                let id = self.push(RadixNode::new(leaf, Some(data)));
                self.nodes[parent].set_child(bit, id);
                self.elements += 1;
            }
            Plan::Split {
                node,
                upper,
                lower,
                leaf,
            } => {
                let lower_bit = lower.bit(0);
                let old = &mut self.nodes[node];
                let moved = RadixNode {
                    segment: lower,
                    zero: old.zero.take(),
                    one: old.one.take(),
                    data: old.data.take(),
                };
                old.segment = upper;
                let lower_id = self.push(moved);
                self.nodes[node].set_child(lower_bit, lower_id);

                match leaf {
                    None => self.nodes[node].data = Some(data),
                    Some(leaf) => {
                        let bit = leaf.bit(0);
                        let id = self.push(RadixNode::new(leaf, Some(data)));
                        self.nodes[node].set_child(bit, id);
                    }
                }
                self.elements += 1;
            }
        }

        trace!(
            "inserted /{} ({} elements, {} nodes)",
            key.len(),
            self.elements,
            self.nodes.len()
        );
        Ok(())
    }

    fn push(&mut self, node: RadixNode<T>) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn release(&self, data: T) {
        if let Some(free) = &self.callbacks.free {
            free(data);
        }
    }

    fn plan_insert(&self, key: &Prefix) -> Result<Plan> {
        let Some(mut node) = self.root else {
            let leaf = if key.is_empty() {
                None
            } else {
                Some(key.try_clone()?)
            };
            return Ok(Plan::Root { leaf });
        };

        let mut depth = 0;
        loop {
            if depth == key.len() {
                return Ok(Plan::Attach(node));
            }
            let bit = key.bit(depth);
            let Some(child) = self.nodes[node].child(bit) else {
                return Ok(Plan::Append {
                    parent: node,
                    bit,
                    leaf: key.slice(depth, key.len())?,
                });
            };

            let segment = &self.nodes[child].segment;
            let common = segment.common_len(key, depth);
            if common == segment.len() {
                node = child;
                depth += common;
                continue;
            }

            let leaf = if depth + common == key.len() {
                None
            } else {
                Some(key.slice(depth + common, key.len())?)
            };
            return Ok(Plan::Split {
                node: child,
                upper: segment.slice(0, common)?,
                lower: segment.slice(common, segment.len())?,
                leaf,
            });
        }
    }

    /// Nodes whose full key is a leading part of `key`, root first.
    fn covering<'k>(&self, key: &'k Prefix) -> Covering<'_, 'k, T> {
        Covering {
            tree: self,
            key,
            next: self.root,
            depth: 0,
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Payload stored under exactly `key`.
    pub fn match_exact(&self, key: &Prefix) -> Option<&T> {
        let (node, depth) = self.covering(key).last()?;
        if depth == key.len() {
            node.data.as_ref()
        } else {
            None
        }
    }

    /// Payload of the longest stored prefix covering `key`.
    pub fn match_closest(&self, key: &Prefix) -> Option<&T> {
        self.covering(key)
            .filter_map(|(node, _)| node.data.as_ref())
            .last()
    }

    /// Payloads of every stored prefix covering `key`, broadest first.
    ///
    /// `None` only when the tree has no nodes at all.
    pub fn match_all_data(&self, key: &Prefix) -> Option<Vec<&T>> {
        self.root?;
        Some(
            self.covering(key)
                .filter_map(|(node, _)| node.data.as_ref())
                .collect(),
        )
    }

    /// Payloads of every stored prefix that `key` covers, in tree order.
    pub fn match_within(&self, key: &Prefix) -> Vec<&T> {
        let Some(mut node) = self.root else {
            return Vec::new();
        };

        let mut depth = 0;
        while depth < key.len() {
            let Some(child) = self.nodes[node].child(key.bit(depth)) else {
                return Vec::new();
            };
            let segment = &self.nodes[child].segment;
            let common = segment.common_len(key, depth);
            if common == segment.len() {
                node = child;
                depth += common;
            } else if depth + common == key.len() {
                node = child;
                break;
            } else {
                return Vec::new();
            }
        }

        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            let n = &self.nodes[id];
            if let Some(data) = &n.data {
                out.push(data);
            }
            stack.extend(n.one);
            stack.extend(n.zero);
        }
        out
    }

    /// Deep copy of the tree, payloads copied via the clone hook when set
    /// and via `Clone` otherwise.
    pub fn clone_radix(&self) -> Result<Self>
    where
        T: Clone,
    {
        match self.callbacks.clone.clone() {
            Some(hook) => self.clone_radix_with(|data| hook(data)),
            None => self.clone_radix_with(T::clone),
        }
    }

    /// Deep copy of the tree with every payload copied by `copy`.
    pub fn clone_radix_with(&self, copy: impl Fn(&T) -> T) -> Result<Self> {
        let mut nodes = Vec::new();
        nodes.try_reserve_exact(self.nodes.len())?;
        for node in &self.nodes {
            nodes.push(RadixNode {
                segment: node.segment.try_clone()?,
                zero: node.zero,
                one: node.one,
                data: node.data.as_ref().map(&copy),
            });
        }
        debug!("cloned radix tree with {} elements", self.elements);
        Ok(Self {
            nodes,
            root: self.root,
            elements: self.elements,
            callbacks: self.callbacks.clone(),
        })
    }

    /// Indented rendering of every node: segment, key length and payload.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        match self.root {
            None => out.push_str("(empty)\n"),
            Some(root) => self.dump_node(root, 0, 0, &mut out),
        }
        out
    }

    fn dump_node(&self, id: usize, indent: usize, prefix_len: usize, out: &mut String) {
        let node = &self.nodes[id];
        let prefix_len = prefix_len + node.segment.len();
        let payload = match (&node.data, &self.callbacks.print) {
            (Some(data), Some(print)) => format!("[Y] {}", print(data)),
            (Some(_), None) => "[Y]".to_string(),
            (None, _) => "[N]".to_string(),
        };
        let _ = writeln!(
            out,
            "{:indent$}{} key_len={} {}",
            "",
            node.segment,
            prefix_len,
            payload,
            indent = indent
        );
        for child in [node.zero, node.one].into_iter().flatten() {
            self.dump_node(child, indent + 2, prefix_len, out);
        }
    }
}

impl<T> Default for RadixTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for RadixTree<T> {
    fn drop(&mut self) {
        if let Some(free) = self.callbacks.free.take() {
            for node in &mut self.nodes {
                if let Some(data) = node.data.take() {
                    free(data);
                }
            }
        }
    }
}

struct Covering<'a, 'k, T> {
    tree: &'a RadixTree<T>,
    key: &'k Prefix,
    next: Option<usize>,
    depth: usize,
}

impl<'a, T> Iterator for Covering<'a, '_, T> {
    /// Node and the key length at that node.
    type Item = (&'a RadixNode<T>, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next.take()?;
        let node = &self.tree.nodes[id];
        let depth = self.depth;

        if depth < self.key.len() {
            if let Some(child) = node.child(self.key.bit(depth)) {
                let segment = &self.tree.nodes[child].segment;
                if depth + segment.len() <= self.key.len()
                    && segment.common_len(self.key, depth) == segment.len()
                {
                    self.next = Some(child);
                    self.depth = depth + segment.len();
                }
            }
        }

        Some((node, depth))
    }
}
