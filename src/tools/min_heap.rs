//! Binary min-heap used to pick the two lightest subtrees during tree building.
//! The ordering key is `(frequency, order)`, where `order` is a secondary key
//! supplied by the caller, so equal frequencies always come out the same way.

use crate::Error;

/// An entry in the queue, `node` is a handle into the node pool.
#[derive(Clone,Copy,Debug,PartialEq)]
pub struct Item {
    pub freq: u64,
    pub order: usize,
    pub node: usize
}

impl Item {
    fn key(&self) -> (u64,usize) {
        (self.freq,self.order)
    }
}

pub struct MinHeap {
    slots: Vec<Item>
}

impl MinHeap {
    pub fn new() -> Self {
        Self {
            slots: Vec::new()
        }
    }
    /// Heapify a batch of items in one pass.
    pub fn build(items: Vec<Item>) -> Self {
        let mut heap = Self {
            slots: items
        };
        let n = heap.slots.len();
        for i in (0..n/2).rev() {
            heap.sift_down(i);
        }
        heap
    }
    pub fn len(&self) -> usize {
        self.slots.len()
    }
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
    pub fn insert(&mut self,item: Item) {
        self.slots.push(item);
        self.sift_up(self.slots.len()-1);
    }
    pub fn extract_min(&mut self) -> Result<Item,Error> {
        if self.slots.is_empty() {
            return Err(Error::EmptyQueue);
        }
        let last = self.slots.len() - 1;
        self.slots.swap(0,last);
        let ans = self.slots.pop().ok_or(Error::EmptyQueue)?;
        if !self.slots.is_empty() {
            self.sift_down(0);
        }
        Ok(ans)
    }
    fn sift_up(&mut self,mut i: usize) {
        while i > 0 {
            let parent = (i-1)/2;
            if self.slots[i].key() >= self.slots[parent].key() {
                break;
            }
            self.slots.swap(i,parent);
            i = parent;
        }
    }
    fn sift_down(&mut self,mut i: usize) {
        let n = self.slots.len();
        loop {
            let left = 2*i + 1;
            let right = left + 1;
            let mut smallest = i;
            if left < n && self.slots[left].key() < self.slots[smallest].key() {
                smallest = left;
            }
            if right < n && self.slots[right].key() < self.slots[smallest].key() {
                smallest = right;
            }
            if smallest == i {
                break;
            }
            self.slots.swap(i,smallest);
            i = smallest;
        }
    }
}

#[cfg(test)]
fn item(freq: u64,order: usize) -> Item {
    Item { freq, order, node: order }
}

#[test]
fn extracts_in_order() {
    let mut heap = MinHeap::build(vec![item(5,0),item(1,1),item(3,2),item(1,3),item(9,4)]);
    heap.insert(item(2,5));
    let mut ans = Vec::new();
    while !heap.is_empty() {
        let x = heap.extract_min().expect("heap underflow");
        ans.push((x.freq,x.order));
    }
    assert_eq!(ans,vec![(1,1),(1,3),(2,5),(3,2),(5,0),(9,4)]);
}

#[test]
fn ties_use_secondary_key() {
    // insertion order must not matter
    let mut heap = MinHeap::new();
    for order in [7,2,200,0,65] {
        heap.insert(item(4,order));
    }
    let first = heap.extract_min().expect("heap underflow");
    let second = heap.extract_min().expect("heap underflow");
    assert_eq!((first.order,second.order),(0,2));
    assert_eq!(heap.len(),3);
}

#[test]
fn empty_queue() {
    let mut heap = MinHeap::build(Vec::new());
    assert_eq!(heap.extract_min(),Err(Error::EmptyQueue));
}
