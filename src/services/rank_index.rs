//! Order-statistics set used for the live standings.
//!
//! A treap whose nodes carry subtree sizes, so that besides the usual ordered
//! set operations it can answer "how many keys are smaller than this one" and
//! "which key sits at position k" in expected logarithmic time. Keys are
//! immutable while stored: a team whose metric changes is erased and
//! reinserted as a new key.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const DEFAULT_SEED: u64 = 0x5eed_1c9c;

type Link<K> = Option<Box<Node<K>>>;

#[derive(Debug)]
struct Node<K> {
    key: K,
    priority: u64,
    size: usize,
    left: Link<K>,
    right: Link<K>,
}

impl<K> Node<K> {
    fn new(key: K, priority: u64) -> Self {
        Self {
            key,
            priority,
            size: 1,
            left: None,
            right: None,
        }
    }

    fn update(&mut self) {
        self.size = 1 + size(&self.left) + size(&self.right);
    }
}

fn size<K>(link: &Link<K>) -> usize {
    link.as_ref().map_or(0, |node| node.size)
}

/// Splits `link` into the keys for which `goes_left` holds and the rest.
/// `goes_left` must be true on a prefix of the sorted order.
fn split<K, F>(link: Link<K>, goes_left: &F) -> (Link<K>, Link<K>)
where
    F: Fn(&K) -> bool,
{
    match link {
        None => (None, None),
        Some(mut node) => {
            if goes_left(&node.key) {
                let (left, right) = split(node.right.take(), goes_left);
                node.right = left;
                node.update();
                (Some(node), right)
            } else {
                let (left, right) = split(node.left.take(), goes_left);
                node.left = right;
                node.update();
                (left, Some(node))
            }
        }
    }
}

/// Joins two treaps where every key of `left` is smaller than every key of `right`.
fn merge<K>(left: Link<K>, right: Link<K>) -> Link<K> {
    match (left, right) {
        (None, right) => right,
        (left, None) => left,
        (Some(mut left), Some(mut right)) => {
            if left.priority > right.priority {
                left.right = merge(left.right.take(), Some(right));
                left.update();
                Some(left)
            } else {
                right.left = merge(Some(left), right.left.take());
                right.update();
                Some(right)
            }
        }
    }
}

#[derive(Debug)]
pub struct RankIndex<K> {
    root: Link<K>,
    rng: StdRng,
}

impl<K: Ord> Default for RankIndex<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord> RankIndex<K> {
    pub fn new() -> Self {
        Self::with_seed(DEFAULT_SEED)
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            root: None,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn len(&self) -> usize {
        size(&self.root)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn clear(&mut self) {
        self.root = None;
    }

    pub fn contains(&self, key: &K) -> bool {
        let mut cursor = self.root.as_deref();
        while let Some(node) = cursor {
            cursor = match key.cmp(&node.key) {
                std::cmp::Ordering::Less => node.left.as_deref(),
                std::cmp::Ordering::Greater => node.right.as_deref(),
                std::cmp::Ordering::Equal => return true,
            };
        }
        false
    }

    /// Inserts `key`. Returns false if an equal key is already present.
    pub fn insert(&mut self, key: K) -> bool {
        if self.contains(&key) {
            return false;
        }
        let priority = self.rng.r#gen::<u64>();
        let (left, right) = split(self.root.take(), &|k: &K| *k < key);
        let node = Some(Box::new(Node::new(key, priority)));
        self.root = merge(merge(left, node), right);
        true
    }

    /// Removes the key equal to `key`. Returns false if it was not present.
    pub fn remove(&mut self, key: &K) -> bool {
        let (left, rest) = split(self.root.take(), &|k: &K| k < key);
        let (found, right) = split(rest, &|k: &K| k <= key);
        self.root = merge(left, right);
        found.is_some()
    }

    /// Number of stored keys strictly smaller than `key`, plus one.
    /// `key` does not need to be present.
    pub fn rank_of(&self, key: &K) -> usize {
        let mut smaller = 0;
        let mut cursor = self.root.as_deref();
        while let Some(node) = cursor {
            if node.key < *key {
                smaller += size(&node.left) + 1;
                cursor = node.right.as_deref();
            } else {
                cursor = node.left.as_deref();
            }
        }
        smaller + 1
    }

    /// Key at 1-based position `rank`.
    pub fn select(&self, rank: usize) -> Option<&K> {
        if rank == 0 || rank > self.len() {
            return None;
        }
        let mut remaining = rank;
        let mut cursor = self.root.as_deref();
        while let Some(node) = cursor {
            let left_size = size(&node.left);
            if remaining <= left_size {
                cursor = node.left.as_deref();
            } else if remaining == left_size + 1 {
                return Some(&node.key);
            } else {
                remaining -= left_size + 1;
                cursor = node.right.as_deref();
            }
        }
        None
    }

    pub fn min(&self) -> Option<&K> {
        let mut node = self.root.as_deref()?;
        while let Some(left) = node.left.as_deref() {
            node = left;
        }
        Some(&node.key)
    }

    pub fn max(&self) -> Option<&K> {
        let mut node = self.root.as_deref()?;
        while let Some(right) = node.right.as_deref() {
            node = right;
        }
        Some(&node.key)
    }

    /// In-order (best to worst) traversal.
    pub fn iter(&self) -> Iter<'_, K> {
        let mut iter = Iter { stack: Vec::new() };
        iter.push_left(self.root.as_deref());
        iter
    }
}

pub struct Iter<'a, K> {
    stack: Vec<&'a Node<K>>,
}

impl<'a, K> Iter<'a, K> {
    fn push_left(&mut self, mut cursor: Option<&'a Node<K>>) {
        while let Some(node) = cursor {
            self.stack.push(node);
            cursor = node.left.as_deref();
        }
    }
}

impl<'a, K> Iterator for Iter<'a, K> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.push_left(node.right.as_deref());
        Some(&node.key)
    }
}

impl<'a, K: Ord> IntoIterator for &'a RankIndex<K> {
    type Item = &'a K;
    type IntoIter = Iter<'a, K>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
