use std::cmp::{self, Ordering};
use std::fmt;
use std::mem;
use std::ptr::NonNull;

use crate::error::TreeError;

/// An ordered key-value container implemented with an AVL tree.
///
/// Nodes keep a non-owning link to their parent, so rebalancing walks
/// upward from the point of change instead of retracing the search path.
///
/// ```
/// use avltree::AvlTree;
/// let mut tree = AvlTree::new();
/// tree.insert(10, "ten");
/// tree.insert(20, "twenty");
/// tree.insert(30, "thirty");
/// assert_eq!(tree.root(), Some((&20, &"twenty")));
/// assert_eq!(tree.in_order(), vec![&"ten", &"twenty", &"thirty"]);
/// ```
pub struct AvlTree<K: Ord, V> {
    root: Link<K, V>,
    num_nodes: usize,
}

struct Node<K, V> {
    key: K,
    value: V,
    left: Link<K, V>,
    right: Link<K, V>,
    parent: Link<K, V>,
    height: usize,
}

type NodePtr<K, V> = NonNull<Node<K, V>>;
type Link<K, V> = Option<NodePtr<K, V>>;
type LinkPtr<K, V> = NonNull<Link<K, V>>;

/// Where a key lands: on an existing node or in an empty child slot.
enum Slot<K, V> {
    Occupied(NodePtr<K, V>),
    Vacant(Link<K, V>, LinkPtr<K, V>),
}

#[allow(clippy::enum_variant_names)]
enum Direction {
    FromParent,
    FromLeft,
    FromRight,
}

impl<K: Ord, V> AvlTree<K, V> {
    /// Creates an empty tree.
    /// No memory is allocated until the first entry is inserted.
    pub fn new() -> Self {
        Self {
            root: None,
            num_nodes: 0,
        }
    }

    /// Returns true if the tree contains no entries.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Returns the number of entries in the tree.
    pub fn len(&self) -> usize {
        self.num_nodes
    }

    /// Returns the height of the root node, where a lone root has height 0.
    /// Returns `None` for an empty tree.
    pub fn height(&self) -> Option<usize> {
        self.root.map(|root_ptr| unsafe { root_ptr.as_ref().height })
    }

    /// Returns the entry stored at the root node.
    pub fn root(&self) -> Option<(&K, &V)> {
        self.root.map(|root_ptr| self.entry(root_ptr))
    }

    /// Clears the tree, deallocating all memory.
    pub fn clear(&mut self) {
        self.postorder(|node_ptr| unsafe { drop(Node::reclaim(node_ptr)) });
        self.root = None;
        self.num_nodes = 0;
    }

    /// Returns a reference to the value stored under the key.
    pub fn search(&self, key: &K) -> Result<&V, TreeError> {
        self.find(key)
            .map(|node_ptr| self.entry(node_ptr).1)
            .ok_or(TreeError::NotFound)
    }

    /// Returns true if the tree holds an entry for the key.
    pub fn contains_key(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    /// Returns the entry with the smallest key.
    pub fn min(&self) -> Option<(&K, &V)> {
        self.root.map(|root_ptr| self.entry(Self::leftmost(root_ptr)))
    }

    /// Returns the entry with the largest key.
    pub fn max(&self) -> Option<(&K, &V)> {
        self.root.map(|root_ptr| self.entry(Self::rightmost(root_ptr)))
    }

    /// Inserts a key-value pair into the tree.
    /// If the key is already present its value is replaced in place
    /// and the tree shape does not change.
    pub fn insert(&mut self, key: K, value: V) {
        match self.find_slot(&key) {
            Slot::Occupied(mut node_ptr) => unsafe {
                node_ptr.as_mut().value = value;
            },
            Slot::Vacant(parent, mut link_ptr) => {
                let node_ptr = Node::create(parent, key, value);
                unsafe {
                    *link_ptr.as_mut() = Some(node_ptr);
                }
                self.num_nodes += 1;
                self.rebalance_once(Some(node_ptr));
            }
        }
    }

    /// Removes a key from the tree.
    /// Returns the value that was stored under the key.
    pub fn remove(&mut self, key: &K) -> Result<V, TreeError> {
        let node_ptr = self.find(key).ok_or(TreeError::NotFound)?;
        debug_assert!(self.num_nodes >= 1);
        let unlinked_ptr = self.unlink_node(node_ptr);
        let node = unsafe { Node::reclaim(unlinked_ptr) };
        self.num_nodes -= 1;
        debug_assert!(self.find(key).is_none());
        Ok(node.value)
    }

    /// Returns the values in root-left-right order.
    pub fn pre_order(&self) -> Vec<&V> {
        let mut values = Vec::with_capacity(self.num_nodes);
        self.traverse(
            |node_ptr| values.push(self.entry(node_ptr).1),
            |_| {},
            |_| {},
        );
        values
    }

    /// Returns the values in left-root-right order, i.e. sorted by key.
    pub fn in_order(&self) -> Vec<&V> {
        let mut values = Vec::with_capacity(self.num_nodes);
        self.traverse(
            |_| {},
            |node_ptr| values.push(self.entry(node_ptr).1),
            |_| {},
        );
        values
    }

    /// Returns the values in left-right-root order.
    pub fn post_order(&self) -> Vec<&V> {
        let mut values = Vec::with_capacity(self.num_nodes);
        self.traverse(
            |_| {},
            |_| {},
            |node_ptr| values.push(self.entry(node_ptr).1),
        );
        values
    }

    /// Returns the first `rows` levels of the tree, top-down.
    ///
    /// Row `n` (counting from 1) always has `2^(n-1)` slots. A slot below a
    /// missing node, or for a missing child, is `None`, so the shape of an
    /// unbalanced region stays visible.
    ///
    /// # Panics
    ///
    /// The number of slots doubles with every row, so the allocation fails
    /// once `2^(rows-1)` slots no longer fit in memory. Keep `rows` small.
    ///
    /// ```
    /// use avltree::AvlTree;
    /// let mut tree = AvlTree::new();
    /// tree.insert(2, 'b');
    /// tree.insert(1, 'a');
    /// let rows = tree.level_view(2);
    /// assert_eq!(rows[0], vec![Some((&2, &'b'))]);
    /// assert_eq!(rows[1], vec![Some((&1, &'a')), None]);
    /// ```
    pub fn level_view(&self, rows: usize) -> Vec<Vec<Option<(&K, &V)>>> {
        let mut levels = Vec::with_capacity(rows.min(usize::BITS as usize));
        let mut links = vec![self.root];
        while levels.len() < rows {
            levels.push(
                links
                    .iter()
                    .map(|link| link.map(|node_ptr| self.entry(node_ptr)))
                    .collect(),
            );
            if levels.len() < rows {
                links = links.iter().flat_map(|&link| Self::children(link)).collect();
            }
        }
        levels
    }

    /// Verifies search order, parent links, cached heights, AVL balance and
    /// the entry count. Panics on the first violation.
    #[cfg(any(test, feature = "consistency_check"))]
    pub fn check_consistency(&self) {
        unsafe {
            // Check root link
            if let Some(root_node_ptr) = self.root {
                assert!(root_node_ptr.as_ref().parent.is_none());
            }

            // Check tree nodes
            let mut num_nodes = 0;
            self.preorder(|node_ptr| {
                let node = node_ptr.as_ref();

                // Check link for left child node
                if let Some(left_ptr) = node.left {
                    assert!(left_ptr.as_ref().parent == Some(node_ptr));
                    assert!(left_ptr.as_ref().key < node.key);
                }

                // Check link for right child node
                if let Some(right_ptr) = node.right {
                    assert!(right_ptr.as_ref().parent == Some(node_ptr));
                    assert!(right_ptr.as_ref().key > node.key);
                }

                // Check cached height against a full measurement
                let left_height = Self::measure_height(node.left);
                let right_height = Self::measure_height(node.right);
                assert_eq!(
                    node.height as isize,
                    1 + cmp::max(left_height, right_height)
                );

                // Check AVL condition (nearly balance)
                assert!((left_height - right_height).abs() <= 1);

                num_nodes += 1;
            });

            // Check global search order
            let mut prev: Option<NodePtr<K, V>> = None;
            self.inorder(|node_ptr| {
                if let Some(prev_ptr) = prev {
                    assert!(prev_ptr.as_ref().key < node_ptr.as_ref().key);
                }
                prev = Some(node_ptr);
            });

            // Check number of nodes
            assert_eq!(num_nodes, self.num_nodes);
        }
    }

    /// Returns the balance factor of the root node.
    #[cfg(test)]
    pub(crate) fn root_balance(&self) -> Option<isize> {
        self.root.map(Self::balance_factor)
    }

    fn entry(&self, node_ptr: NodePtr<K, V>) -> (&K, &V) {
        let node = unsafe { &*node_ptr.as_ptr() };
        (&node.key, &node.value)
    }

    fn children(link: Link<K, V>) -> [Link<K, V>; 2] {
        match link {
            None => [None, None],
            Some(node_ptr) => unsafe { [node_ptr.as_ref().left, node_ptr.as_ref().right] },
        }
    }

    fn find(&self, key: &K) -> Link<K, V> {
        let mut current = self.root;
        while let Some(node_ptr) = current {
            current = unsafe {
                match key.cmp(&node_ptr.as_ref().key) {
                    Ordering::Equal => break,
                    Ordering::Less => node_ptr.as_ref().left,
                    Ordering::Greater => node_ptr.as_ref().right,
                }
            }
        }
        current
    }

    fn find_slot(&mut self, key: &K) -> Slot<K, V> {
        let mut parent: Link<K, V> = None;
        let mut link_ptr: LinkPtr<K, V> = unsafe { LinkPtr::new_unchecked(&mut self.root) };
        unsafe {
            while let Some(mut node_ptr) = *link_ptr.as_ref() {
                parent = Some(node_ptr);
                link_ptr = match key.cmp(&node_ptr.as_ref().key) {
                    Ordering::Equal => return Slot::Occupied(node_ptr),
                    Ordering::Less => LinkPtr::new_unchecked(&mut node_ptr.as_mut().left),
                    Ordering::Greater => LinkPtr::new_unchecked(&mut node_ptr.as_mut().right),
                };
            }
        }
        Slot::Vacant(parent, link_ptr)
    }

    fn leftmost(mut node_ptr: NodePtr<K, V>) -> NodePtr<K, V> {
        while let Some(left_ptr) = unsafe { node_ptr.as_ref().left } {
            node_ptr = left_ptr;
        }
        node_ptr
    }

    fn rightmost(mut node_ptr: NodePtr<K, V>) -> NodePtr<K, V> {
        while let Some(right_ptr) = unsafe { node_ptr.as_ref().right } {
            node_ptr = right_ptr;
        }
        node_ptr
    }

    /// Detaches the entry of the given node from the tree.
    /// Returns the node that was physically unlinked, which holds the entry.
    fn unlink_node(&mut self, mut node_ptr: NodePtr<K, V>) -> NodePtr<K, V> {
        let (left, right, parent) = unsafe {
            let node = node_ptr.as_ref();
            (node.left, node.right, node.parent)
        };
        match right {
            // Two children, or a root with a right subtree: the in-order
            // successor takes over the entry slot and is spliced out instead.
            Some(right_ptr) if left.is_some() || parent.is_none() => {
                let mut successor_ptr = Self::leftmost(right_ptr);
                unsafe {
                    mem::swap(&mut node_ptr.as_mut().key, &mut successor_ptr.as_mut().key);
                    mem::swap(
                        &mut node_ptr.as_mut().value,
                        &mut successor_ptr.as_mut().value,
                    );
                }
                self.splice(successor_ptr);
                successor_ptr
            }
            _ => {
                self.splice(node_ptr);
                node_ptr
            }
        }
    }

    /// Replaces a node that has at most one child by that child,
    /// then rebalances from the former parent up to the root.
    fn splice(&mut self, node_ptr: NodePtr<K, V>) {
        let (child, parent) = unsafe {
            let node = node_ptr.as_ref();
            debug_assert!(node.left.is_none() || node.right.is_none());
            (node.left.or(node.right), node.parent)
        };
        if let Some(mut child_ptr) = child {
            unsafe { child_ptr.as_mut().parent = parent };
        }
        self.replace_child(parent, node_ptr, child);
        self.rebalance(parent);
    }

    /// Points the parent's link (or the root slot) that refers to `old_ptr` at `new`.
    fn replace_child(&mut self, parent: Link<K, V>, old_ptr: NodePtr<K, V>, new: Link<K, V>) {
        match parent {
            None => self.root = new,
            Some(mut parent_ptr) => unsafe {
                if parent_ptr.as_ref().left == Some(old_ptr) {
                    parent_ptr.as_mut().left = new;
                } else {
                    parent_ptr.as_mut().right = new;
                }
            },
        }
    }

    /// Height of a subtree from the cached value, -1 for an empty subtree.
    fn link_height(link: Link<K, V>) -> isize {
        match link {
            None => -1,
            Some(node_ptr) => unsafe { node_ptr.as_ref().height as isize },
        }
    }

    /// Height of a subtree measured by walking it, -1 for an empty subtree.
    #[cfg(any(test, feature = "consistency_check"))]
    fn measure_height(link: Link<K, V>) -> isize {
        match link {
            None => -1,
            Some(node_ptr) => unsafe {
                let node = node_ptr.as_ref();
                1 + cmp::max(
                    Self::measure_height(node.left),
                    Self::measure_height(node.right),
                )
            },
        }
    }

    fn balance_factor(node_ptr: NodePtr<K, V>) -> isize {
        unsafe {
            Self::link_height(node_ptr.as_ref().left) - Self::link_height(node_ptr.as_ref().right)
        }
    }

    fn adjust_height(mut node_ptr: NodePtr<K, V>) {
        unsafe {
            let height = 1 + cmp::max(
                Self::link_height(node_ptr.as_ref().left),
                Self::link_height(node_ptr.as_ref().right),
            );
            node_ptr.as_mut().height = height as usize;
        }
    }

    /// Single left rotation: the right child becomes the subtree root.
    fn rotate_left_minor(&mut self, mut node_ptr: NodePtr<K, V>) {
        unsafe {
            if let Some(mut pivot_ptr) = node_ptr.as_ref().right {
                node_ptr.as_mut().right = pivot_ptr.as_ref().left;
                if let Some(mut inner_ptr) = pivot_ptr.as_ref().left {
                    inner_ptr.as_mut().parent = Some(node_ptr);
                }

                let parent = node_ptr.as_ref().parent;
                pivot_ptr.as_mut().parent = parent;
                self.replace_child(parent, node_ptr, Some(pivot_ptr));

                pivot_ptr.as_mut().left = Some(node_ptr);
                node_ptr.as_mut().parent = Some(pivot_ptr);

                Self::adjust_height(node_ptr);
                Self::adjust_height(pivot_ptr);
            }
        }
    }

    /// Single right rotation: the left child becomes the subtree root.
    fn rotate_right_minor(&mut self, mut node_ptr: NodePtr<K, V>) {
        unsafe {
            if let Some(mut pivot_ptr) = node_ptr.as_ref().left {
                node_ptr.as_mut().left = pivot_ptr.as_ref().right;
                if let Some(mut inner_ptr) = pivot_ptr.as_ref().right {
                    inner_ptr.as_mut().parent = Some(node_ptr);
                }

                let parent = node_ptr.as_ref().parent;
                pivot_ptr.as_mut().parent = parent;
                self.replace_child(parent, node_ptr, Some(pivot_ptr));

                pivot_ptr.as_mut().right = Some(node_ptr);
                node_ptr.as_mut().parent = Some(pivot_ptr);

                Self::adjust_height(node_ptr);
                Self::adjust_height(pivot_ptr);
            }
        }
    }

    /// Right-left double rotation.
    fn rotate_left_major(&mut self, node_ptr: NodePtr<K, V>) {
        if let Some(right_ptr) = unsafe { node_ptr.as_ref().right } {
            self.rotate_right_minor(right_ptr);
        }
        self.rotate_left_minor(node_ptr);
    }

    /// Left-right double rotation.
    fn rotate_right_major(&mut self, node_ptr: NodePtr<K, V>) {
        if let Some(left_ptr) = unsafe { node_ptr.as_ref().left } {
            self.rotate_left_minor(left_ptr);
        }
        self.rotate_right_minor(node_ptr);
    }

    /// Rebalances nodes starting from given position up to the root node.
    fn rebalance(&mut self, start_from: Link<K, V>) {
        let mut current = start_from;
        while let Some(node_ptr) = current {
            let parent = unsafe { node_ptr.as_ref().parent };
            self.rebalance_node(node_ptr);
            current = parent;
        }
    }

    /// Rebalances nodes starting from given position up to the root node.
    /// Stops after first rebalance operation.
    /// This is enough to restore balance after a single insert operation.
    fn rebalance_once(&mut self, start_from: Link<K, V>) {
        let mut current = start_from;
        while let Some(node_ptr) = current {
            let parent = unsafe { node_ptr.as_ref().parent };
            if self.rebalance_node(node_ptr) {
                break;
            }
            current = parent;
        }
    }

    /// Restores AVL condition (balance) at given node if necessary and adjusts height.
    /// Initial balance must not exceed +2 or -2, which always holds after a single update.
    /// Returns whether a rotation had been necessary.
    fn rebalance_node(&mut self, node_ptr: NodePtr<K, V>) -> bool {
        let (left, right) = unsafe { (node_ptr.as_ref().left, node_ptr.as_ref().right) };
        let balance = Self::balance_factor(node_ptr);
        debug_assert!((-2..=2).contains(&balance));
        match (balance, left, right) {
            (-2, _, Some(right_ptr)) => {
                if Self::balance_factor(right_ptr) <= 0 {
                    self.rotate_left_minor(node_ptr);
                } else {
                    self.rotate_left_major(node_ptr);
                }
                true
            }
            (2, Some(left_ptr), _) => {
                if Self::balance_factor(left_ptr) >= 0 {
                    self.rotate_right_minor(node_ptr);
                } else {
                    self.rotate_right_major(node_ptr);
                }
                true
            }
            _ => {
                Self::adjust_height(node_ptr);
                false
            }
        }
    }

    #[cfg(any(test, feature = "consistency_check"))]
    fn preorder<F: FnMut(NodePtr<K, V>)>(&self, f: F) {
        self.traverse(f, |_| {}, |_| {});
    }

    #[cfg(any(test, feature = "consistency_check"))]
    fn inorder<F: FnMut(NodePtr<K, V>)>(&self, f: F) {
        self.traverse(|_| {}, f, |_| {});
    }

    fn postorder<F: FnMut(NodePtr<K, V>)>(&self, f: F) {
        self.traverse(|_| {}, |_| {}, f);
    }

    fn traverse<Pre, In, Post>(&self, mut preorder: Pre, mut inorder: In, mut postorder: Post)
    where
        Pre: FnMut(NodePtr<K, V>),
        In: FnMut(NodePtr<K, V>),
        Post: FnMut(NodePtr<K, V>),
    {
        if let Some(mut node_ptr) = self.root {
            let mut dir = Direction::FromParent;
            loop {
                match dir {
                    Direction::FromParent => {
                        preorder(node_ptr);
                        if let Some(left_ptr) = unsafe { node_ptr.as_ref().left } {
                            node_ptr = left_ptr;
                        } else {
                            dir = Direction::FromLeft;
                        }
                    }
                    Direction::FromLeft => {
                        inorder(node_ptr);
                        if let Some(right_ptr) = unsafe { node_ptr.as_ref().right } {
                            node_ptr = right_ptr;
                            dir = Direction::FromParent;
                        } else {
                            dir = Direction::FromRight;
                        }
                    }
                    Direction::FromRight => {
                        // Post order traversal is used for node deletion,
                        // so make sure not to use node pointer after postorder call.
                        if let Some(parent_ptr) = unsafe { node_ptr.as_ref().parent } {
                            if Some(node_ptr) == unsafe { parent_ptr.as_ref().left } {
                                dir = Direction::FromLeft;
                            } else {
                                dir = Direction::FromRight;
                            }
                            postorder(node_ptr);
                            node_ptr = parent_ptr;
                        } else {
                            postorder(node_ptr);
                            break;
                        }
                    }
                }
            }
        }
    }
}

impl<K: Ord, V> Drop for AvlTree<K, V> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<K: Ord, V> Default for AvlTree<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + fmt::Debug, V: fmt::Debug> fmt::Debug for AvlTree<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        self.traverse(
            |_| {},
            |node_ptr| {
                let (key, value) = self.entry(node_ptr);
                map.entry(key, value);
            },
            |_| {},
        );
        map.finish()
    }
}

impl<K, V> Node<K, V> {
    fn create(parent: Link<K, V>, key: K, value: V) -> NodePtr<K, V> {
        let boxed = Box::new(Node {
            key,
            value,
            parent,
            left: None,
            right: None,
            height: 0,
        });
        unsafe { NodePtr::new_unchecked(Box::into_raw(boxed)) }
    }

    /// Takes back ownership of a node allocated by `create`.
    unsafe fn reclaim(node_ptr: NodePtr<K, V>) -> Box<Self> {
        Box::from_raw(node_ptr.as_ptr())
    }
}
