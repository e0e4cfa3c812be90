use std::cmp;
use std::fmt;
use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::ptr::NonNull;

/// An ordered set of keys stored in a height-balanced binary search tree.
pub struct AvlTreeSet<T: Ord> {
    root: Link<T>,
    num_nodes: usize,
}

struct Node<T> {
    key: T,
    left: Link<T>,
    right: Link<T>,
    parent: Link<T>,
    height: usize,
}

type NodePtr<T> = NonNull<Node<T>>;
type Link<T> = Option<NodePtr<T>>;
type LinkPtr<T> = NonNull<Link<T>>;

/// An iterator over the keys of a set in ascending order.
pub struct Iter<'a, T> {
    current: Link<T>,
    _phantom: PhantomData<&'a T>,
}

#[allow(clippy::enum_variant_names)]
enum Direction {
    FromParent,
    FromLeft,
    FromRight,
}

impl<T: Ord> AvlTreeSet<T> {
    /// Creates an empty set.
    /// No memory is allocated until the first key is inserted.
    pub fn new() -> Self {
        Self {
            root: None,
            num_nodes: 0,
        }
    }

    /// Returns true if the set contains no keys.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Returns the number of keys in the set.
    pub fn len(&self) -> usize {
        self.num_nodes
    }

    /// Returns the height of the tree: the number of nodes on the longest
    /// path from the root down to a leaf, or 0 for an empty tree.
    pub fn height(&self) -> usize {
        Self::link_height(self.root)
    }

    /// Clears the set, deallocating all memory.
    pub fn clear(&mut self) {
        self.postorder(|node_ptr| unsafe { Node::destroy(node_ptr) });
        self.root = None;
        self.num_nodes = 0;
    }

    /// Returns true if the set contains the given key.
    pub fn contains(&self, key: &T) -> bool {
        self.find(key).is_some()
    }

    /// Returns a reference to the key in the set that is equal to the given key.
    pub fn get(&self, key: &T) -> Option<&T> {
        if let Some(node_ptr) = self.find(key) {
            return Some(&unsafe { &*node_ptr.as_ptr() }.key);
        }
        None
    }

    /// Inserts a key into the set.
    /// Returns false without modifying the set if the key is already present.
    pub fn insert(&mut self, key: T) -> bool {
        if let Some((parent, mut link_ptr)) = self.find_insert_pos(&key) {
            unsafe {
                *link_ptr.as_mut() = Some(Node::create(parent, key));
            }
            self.num_nodes += 1;
            self.rebalance_once(parent);
            return true;
        }
        false
    }

    /// Removes a key from the set.
    /// Returns whether the key was previously in the set.
    pub fn remove(&mut self, key: &T) -> bool {
        // Find node to-be-removed
        if let Some(node_ptr) = self.find(key) {
            debug_assert!(self.num_nodes >= 1);
            self.unlink_node(node_ptr);
            unsafe { Node::destroy(node_ptr) };
            self.num_nodes -= 1;
            debug_assert!(self.get(key).is_none());
            return true;
        }
        false
    }

    /// Gets an iterator over the keys of the set in ascending order.
    /// Each call starts a fresh traversal from the smallest key.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            current: Self::leftmost(self.root),
            _phantom: PhantomData,
        }
    }

    #[cfg(test)]
    pub fn root_key(&self) -> Option<&T> {
        self.root.map(|root_ptr| &unsafe { &*root_ptr.as_ptr() }.key)
    }

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
                let mut left_height = 0;
                let mut right_height = 0;

                // Check link for left child node
                if let Some(left_ptr) = node_ptr.as_ref().left {
                    assert!(left_ptr.as_ref().parent == Some(node_ptr));
                    assert!(left_ptr.as_ref().key < node_ptr.as_ref().key);
                    left_height = left_ptr.as_ref().height;
                }

                // Check link for right child node
                if let Some(right_ptr) = node_ptr.as_ref().right {
                    assert!(right_ptr.as_ref().parent == Some(node_ptr));
                    assert!(right_ptr.as_ref().key > node_ptr.as_ref().key);
                    right_height = right_ptr.as_ref().height;
                }

                // Check stored height against recomputed height
                assert_eq!(
                    node_ptr.as_ref().height,
                    1 + cmp::max(left_height, right_height)
                );

                // Check AVL condition (near balance)
                assert!(left_height <= right_height + 1);
                assert!(right_height <= left_height + 1);

                num_nodes += 1;
            });

            // Check number of nodes
            assert_eq!(num_nodes, self.num_nodes);
        }
    }

    fn find(&self, key: &T) -> Link<T> {
        let mut current = self.root;
        while let Some(node_ptr) = current {
            unsafe {
                if *key == node_ptr.as_ref().key {
                    break;
                } else if *key < node_ptr.as_ref().key {
                    current = node_ptr.as_ref().left;
                } else {
                    current = node_ptr.as_ref().right;
                }
            }
        }
        current
    }

    fn find_insert_pos(&mut self, key: &T) -> Option<(Link<T>, LinkPtr<T>)> {
        let mut parent: Link<T> = None;
        let mut link_ptr: LinkPtr<T> = unsafe { LinkPtr::new_unchecked(&mut self.root) };
        unsafe {
            while let Some(mut node_ptr) = link_ptr.as_ref() {
                if *key == node_ptr.as_ref().key {
                    return None;
                } else {
                    parent = *link_ptr.as_ref();
                    if *key < node_ptr.as_ref().key {
                        link_ptr = LinkPtr::new_unchecked(&mut node_ptr.as_mut().left);
                    } else {
                        link_ptr = LinkPtr::new_unchecked(&mut node_ptr.as_mut().right);
                    }
                }
            }
        }
        Some((parent, link_ptr))
    }

    fn unlink_node(&mut self, node_ptr: NodePtr<T>) {
        unsafe {
            // Check if node to-unlink has a right subtree
            if let Some(mut successor_ptr) = node_ptr.as_ref().right {
                // Find in-order successor, the smallest node in the right subtree
                let mut successor_parent_ptr = node_ptr;
                while let Some(left_ptr) = successor_ptr.as_ref().left {
                    successor_parent_ptr = successor_ptr;
                    successor_ptr = left_ptr;
                }

                // Successor is stem or leaf, unlink from tree
                debug_assert!(successor_ptr.as_ref().left.is_none());
                if successor_parent_ptr.as_ref().left == Some(successor_ptr) {
                    successor_parent_ptr.as_mut().left = successor_ptr.as_ref().right;
                } else {
                    successor_parent_ptr.as_mut().right = successor_ptr.as_ref().right;
                }
                if let Some(mut right_ptr) = successor_ptr.as_ref().right {
                    right_ptr.as_mut().parent = successor_ptr.as_ref().parent;
                }

                // Replace node to-unlink by its successor (up to 6 links)
                successor_ptr.as_mut().left = node_ptr.as_ref().left;
                if let Some(mut left_ptr) = node_ptr.as_ref().left {
                    left_ptr.as_mut().parent = Some(successor_ptr);
                }

                successor_ptr.as_mut().right = node_ptr.as_ref().right;
                if let Some(mut right_ptr) = node_ptr.as_ref().right {
                    right_ptr.as_mut().parent = Some(successor_ptr);
                }

                successor_ptr.as_mut().parent = node_ptr.as_ref().parent;
                match node_ptr.as_ref().parent {
                    None => self.root = Some(successor_ptr),
                    Some(mut parent_ptr) => {
                        if parent_ptr.as_ref().left == Some(node_ptr) {
                            parent_ptr.as_mut().left = Some(successor_ptr);
                        } else {
                            parent_ptr.as_mut().right = Some(successor_ptr);
                        }
                    }
                }

                // Parent of the successor might be out of balance now
                let mut rebalance_from = successor_parent_ptr;
                if rebalance_from == node_ptr {
                    // Parent is node to-unlink and has been replaced by the successor
                    rebalance_from = successor_ptr;
                }
                self.rebalance(Some(rebalance_from));
            } else {
                // Node to-unlink is stem or leaf, unlink from tree
                debug_assert!(node_ptr.as_ref().right.is_none());
                if let Some(mut left_ptr) = node_ptr.as_ref().left {
                    left_ptr.as_mut().parent = node_ptr.as_ref().parent;
                }
                match node_ptr.as_ref().parent {
                    None => self.root = node_ptr.as_ref().left,
                    Some(mut parent_ptr) => {
                        if parent_ptr.as_ref().left == Some(node_ptr) {
                            parent_ptr.as_mut().left = node_ptr.as_ref().left;
                        } else {
                            parent_ptr.as_mut().right = node_ptr.as_ref().left
                        }
                        // Parent node might be out of balance now
                        self.rebalance(Some(parent_ptr));
                    }
                }
            }
        }
    }

    fn link_height(link: Link<T>) -> usize {
        match link {
            None => 0,
            Some(node_ptr) => unsafe { node_ptr.as_ref().height },
        }
    }

    /// Balance factor: height of the left subtree minus height of the right.
    /// Stays within [-1, 1] except transiently after a structural edit, where
    /// a single level may reach +2 or -2 until rebalanced.
    fn balance(node_ptr: NodePtr<T>) -> isize {
        unsafe {
            Self::link_height(node_ptr.as_ref().left) as isize
                - Self::link_height(node_ptr.as_ref().right) as isize
        }
    }

    fn adjust_height(mut node_ptr: NodePtr<T>) {
        unsafe {
            node_ptr.as_mut().height = 1 + cmp::max(
                Self::link_height(node_ptr.as_ref().left),
                Self::link_height(node_ptr.as_ref().right),
            );
        }
    }

    fn leftmost(link: Link<T>) -> Link<T> {
        let mut node_ptr = link?;
        while let Some(left_ptr) = unsafe { node_ptr.as_ref().left } {
            node_ptr = left_ptr;
        }
        Some(node_ptr)
    }

    fn rotate_left(&mut self, mut node_ptr: NodePtr<T>) {
        unsafe {
            if let Some(mut right_ptr) = node_ptr.as_ref().right {
                node_ptr.as_mut().right = right_ptr.as_ref().left;
                if let Some(mut right_left_ptr) = right_ptr.as_mut().left {
                    right_left_ptr.as_mut().parent = Some(node_ptr);
                }

                right_ptr.as_mut().parent = node_ptr.as_ref().parent;
                match node_ptr.as_ref().parent {
                    None => self.root = Some(right_ptr),
                    Some(mut parent_ptr) => {
                        if parent_ptr.as_ref().left == Some(node_ptr) {
                            parent_ptr.as_mut().left = Some(right_ptr);
                        } else {
                            parent_ptr.as_mut().right = Some(right_ptr);
                        }
                    }
                }

                right_ptr.as_mut().left = Some(node_ptr);
                node_ptr.as_mut().parent = Some(right_ptr);

                // Demoted node first, its new height feeds into the subtree root
                Self::adjust_height(node_ptr);
                Self::adjust_height(right_ptr);
            }
        }
    }

    fn rotate_right(&mut self, mut node_ptr: NodePtr<T>) {
        unsafe {
            if let Some(mut left_ptr) = node_ptr.as_ref().left {
                node_ptr.as_mut().left = left_ptr.as_ref().right;
                if let Some(mut left_right_ptr) = left_ptr.as_ref().right {
                    left_right_ptr.as_mut().parent = Some(node_ptr);
                }

                left_ptr.as_mut().parent = node_ptr.as_ref().parent;
                match node_ptr.as_ref().parent {
                    None => self.root = Some(left_ptr),
                    Some(mut parent_ptr) => {
                        if parent_ptr.as_ref().left == Some(node_ptr) {
                            parent_ptr.as_mut().left = Some(left_ptr);
                        } else {
                            parent_ptr.as_mut().right = Some(left_ptr);
                        }
                    }
                }

                left_ptr.as_mut().right = Some(node_ptr);
                node_ptr.as_mut().parent = Some(left_ptr);

                Self::adjust_height(node_ptr);
                Self::adjust_height(left_ptr);
            }
        }
    }

    /// Rebalances nodes starting from given position up to the root node.
    /// A deletion may shorten a subtree at every level on the way up, so the
    /// balance check runs at each ancestor without stopping early.
    fn rebalance(&mut self, start_from: Link<T>) {
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
    fn rebalance_once(&mut self, start_from: Link<T>) {
        let mut current = start_from;
        while let Some(node_ptr) = current {
            let parent = unsafe { node_ptr.as_ref().parent };
            let did_rebalance = self.rebalance_node(node_ptr);
            if did_rebalance {
                break;
            }
            current = parent;
        }
    }

    /// Restores the AVL condition at the given node if necessary and adjusts height.
    /// The strict inequality on the child's balance factor matters: a too-high
    /// child that is itself perfectly balanced (reachable after a deletion)
    /// must resolve to a single rotation, not a double one.
    /// Returns whether rebalancing had been necessary.
    fn rebalance_node(&mut self, node_ptr: NodePtr<T>) -> bool {
        unsafe {
            let balance = Self::balance(node_ptr);
            debug_assert!((-2..=2).contains(&balance));
            if balance > 1 {
                // Left subtree too high
                let left_ptr = node_ptr.as_ref().left.unwrap();
                if Self::balance(left_ptr) < 0 {
                    self.rotate_left(left_ptr);
                }
                self.rotate_right(node_ptr);
                true
            } else if balance < -1 {
                // Right subtree too high
                let right_ptr = node_ptr.as_ref().right.unwrap();
                if Self::balance(right_ptr) > 0 {
                    self.rotate_right(right_ptr);
                }
                self.rotate_left(node_ptr);
                true
            } else {
                Self::adjust_height(node_ptr);
                false
            }
        }
    }

    #[cfg(any(test, feature = "consistency_check"))]
    fn preorder<F: FnMut(NodePtr<T>)>(&self, f: F) {
        self.traverse(f, |_| {}, |_| {});
    }

    fn postorder<F: FnMut(NodePtr<T>)>(&self, f: F) {
        self.traverse(|_| {}, |_| {}, f);
    }

    fn traverse<Pre, In, Post>(&self, mut preorder: Pre, mut inorder: In, mut postorder: Post)
    where
        Pre: FnMut(NodePtr<T>),
        In: FnMut(NodePtr<T>),
        Post: FnMut(NodePtr<T>),
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

impl<T: Ord> Drop for AvlTreeSet<T> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T: Ord> Default for AvlTreeSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Ord + fmt::Debug> fmt::Debug for AvlTreeSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T: Ord> FromIterator<T> for AvlTreeSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<T: Ord> Extend<T> for AvlTreeSet<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for key in iter {
            self.insert(key);
        }
    }
}

impl<'a, T: Ord> IntoIterator for &'a AvlTreeSet<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        let node_ptr = self.current?;
        let node = unsafe { &*node_ptr.as_ptr() };
        self.current = if let Some(mut next_ptr) = node.right {
            // Leftmost node of the right subtree
            while let Some(left_ptr) = unsafe { next_ptr.as_ref().left } {
                next_ptr = left_ptr;
            }
            Some(next_ptr)
        } else {
            // Climb until arriving from a left child
            let mut child_ptr = node_ptr;
            let mut parent = node.parent;
            while let Some(parent_ptr) = parent {
                if unsafe { parent_ptr.as_ref().left } == Some(child_ptr) {
                    break;
                }
                child_ptr = parent_ptr;
                parent = unsafe { parent_ptr.as_ref().parent };
            }
            parent
        };
        Some(&node.key)
    }
}

impl<T> FusedIterator for Iter<'_, T> {}

impl<T> Node<T> {
    fn create(parent: Link<T>, key: T) -> NodePtr<T> {
        let boxed = Box::new(Node {
            key,
            parent,
            left: None,
            right: None,
            height: 1,
        });
        unsafe { NodePtr::new_unchecked(Box::into_raw(boxed)) }
    }

    unsafe fn destroy(node_ptr: NodePtr<T>) {
        drop(Box::from_raw(node_ptr.as_ptr()));
    }
}
