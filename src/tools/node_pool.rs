//! Arena of tree nodes.
//! Nodes are addressed by their index in the pool, parents own children only
//! by holding their indices.  The same pool serves the coding tree, built bottom
//! up from frequencies, and the decoding tree, built top down from a code table.

#[derive(Clone,Copy,Debug,PartialEq)]
pub enum Side {
    Left,
    Right
}

impl From<bool> for Side {
    /// a 0 bit goes left, a 1 bit goes right
    fn from(bit: bool) -> Self {
        match bit {
            false => Side::Left,
            true => Side::Right
        }
    }
}

#[derive(Clone,Debug,PartialEq)]
pub enum Node {
    Leaf { symbol: u8, freq: u64 },
    Branch { freq: u64, left: Option<usize>, right: Option<usize> }
}

pub struct NodePool {
    nodes: Vec<Node>
}

impl NodePool {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new()
        }
    }
    pub fn len(&self) -> usize {
        self.nodes.len()
    }
    pub fn spawn_leaf(&mut self,symbol: u8,freq: u64) -> usize {
        self.nodes.push(Node::Leaf { symbol, freq });
        self.nodes.len() - 1
    }
    /// Join two subtrees under a new branch, frequency is the sum of the children.
    pub fn spawn_branch(&mut self,left: usize,right: usize) -> usize {
        let freq = self.freq(left) + self.freq(right);
        self.nodes.push(Node::Branch { freq, left: Some(left), right: Some(right) });
        self.nodes.len() - 1
    }
    /// Branch with no children yet, used while growing a decode tree.
    pub fn spawn_empty(&mut self) -> usize {
        self.nodes.push(Node::Branch { freq: 0, left: None, right: None });
        self.nodes.len() - 1
    }
    pub fn get(&self,handle: usize) -> &Node {
        &self.nodes[handle]
    }
    pub fn freq(&self,handle: usize) -> u64 {
        match self.nodes[handle] {
            Node::Leaf { freq, .. } => freq,
            Node::Branch { freq, .. } => freq
        }
    }
    pub fn is_leaf(&self,handle: usize) -> bool {
        matches!(self.nodes[handle],Node::Leaf { .. })
    }
    /// Child on the given side, `None` for leaves and for missing children.
    pub fn down(&self,handle: usize,side: Side) -> Option<usize> {
        match (&self.nodes[handle],side) {
            (Node::Branch { left, .. },Side::Left) => *left,
            (Node::Branch { right, .. },Side::Right) => *right,
            (Node::Leaf { .. },_) => None
        }
    }
    /// Attach `child` on the given side of a branch, returns false if `handle` is a leaf.
    pub fn attach(&mut self,handle: usize,side: Side,child: usize) -> bool {
        match (&mut self.nodes[handle],side) {
            (Node::Branch { left, .. },Side::Left) => *left = Some(child),
            (Node::Branch { right, .. },Side::Right) => *right = Some(child),
            (Node::Leaf { .. },_) => return false
        }
        true
    }
}

#[test]
fn branch_sums_children() {
    let mut pool = NodePool::new();
    let a = pool.spawn_leaf(b'a',3);
    let b = pool.spawn_leaf(b'b',4);
    let ab = pool.spawn_branch(a,b);
    assert_eq!(pool.freq(ab),7);
    assert_eq!(pool.down(ab,Side::Left),Some(a));
    assert_eq!(pool.down(ab,Side::from(true)),Some(b));
    assert_eq!(pool.down(a,Side::Left),None);
    assert!(pool.is_leaf(b));
    assert_eq!(pool.len(),3);
}

#[test]
fn attach_to_empty_branch() {
    let mut pool = NodePool::new();
    let root = pool.spawn_empty();
    let leaf = pool.spawn_leaf(0x41,0);
    assert_eq!(pool.down(root,Side::Right),None);
    assert!(pool.attach(root,Side::Right,leaf));
    assert_eq!(pool.down(root,Side::Right),Some(leaf));
    assert!(!pool.attach(leaf,Side::Left,root));
}
