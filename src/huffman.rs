//! Static Huffman Compression
//!
//! The whole payload is counted first, a Huffman tree is built from the counts,
//! and every byte is replaced by its code.  The code table goes out as a separate
//! text artifact, see the `code_table` module for the format.
//!
//! * This transforms buffers, not files
//! * Ties in frequency are broken by byte value, so output is reproducible
//! * The decoder never sees the coding tree, it grows its own from the table
//!
//! Degenerate payloads are handled as follows.  An empty payload gives an empty
//! table and an empty packed stream.  A payload with a single distinct byte gives
//! that byte the 1 bit code `0`.

use std::borrow::Cow;
use bit_vec::BitVec;
use crate::tools::min_heap::{MinHeap,Item};
use crate::tools::node_pool::{NodePool,Node,Side};
use crate::tools::bits::{BitPacker,BitUnpacker};
use crate::tools::fnv::checksum;
use crate::code_table::{self,CodeTable,bits_string};
use crate::obfuscate::{obfuscate,deobfuscate};
use crate::{Error,Options};

/// secondary heap keys for branches start above every byte value
const FIRST_BRANCH_ORDER: usize = 256;

#[derive(Clone,Copy,Debug,PartialEq)]
pub struct ByteFrequency {
    pub symbol: u8,
    pub count: u64
}

/// Coding tree, lives only as long as it takes to produce the code table.
pub struct HuffmanTree {
    pool: NodePool,
    root: usize
}

/// Tree grown from a code table, used to walk the packed stream.
pub struct DecodeTree {
    pool: NodePool,
    root: usize
}

/// Output of the compressor
#[derive(Debug)]
pub struct Compressed {
    /// the coded bit stream
    pub packed: Vec<u8>,
    /// persisted code table
    pub table: String,
    /// length of the coded payload, including any header
    pub original_length: u64,
    /// FNV-1a of `packed`
    pub checksum: u64,
    /// weighted path length of the coding tree
    pub wpl: u64
}

/// Count occurrences of each byte, absent bytes are left out, result is in ascending byte order.
pub fn count_frequencies(dat: &[u8]) -> Vec<ByteFrequency> {
    let mut counts = [0u64;256];
    for by in dat {
        counts[*by as usize] += 1;
    }
    counts.iter().enumerate()
        .filter(|(_,count)| **count > 0)
        .map(|(symbol,count)| ByteFrequency { symbol: symbol as u8, count: *count })
        .collect()
}

impl HuffmanTree {
    /// Build the tree by repeatedly joining the two lightest subtrees.
    /// The first subtree extracted becomes the left son.
    pub fn build(freqs: &[ByteFrequency]) -> Result<Self,Error> {
        let mut pool = NodePool::new();
        let mut leaves = Vec::new();
        for f in freqs {
            let node = pool.spawn_leaf(f.symbol,f.count);
            leaves.push(Item { freq: f.count, order: f.symbol as usize, node });
        }
        let mut heap = MinHeap::build(leaves);
        let mut order = FIRST_BRANCH_ORDER;
        while heap.len() > 1 {
            let left = heap.extract_min()?;
            let right = heap.extract_min()?;
            let node = pool.spawn_branch(left.node,right.node);
            log::trace!("join {} + {} -> {}",left.freq,right.freq,pool.freq(node));
            heap.insert(Item { freq: pool.freq(node), order, node });
            order += 1;
        }
        let root = heap.extract_min()?.node;
        log::debug!("tree has {} nodes",pool.len());
        Ok(Self { pool, root })
    }
    /// Walk the tree, left appends 0 and right appends 1.
    /// A tree that is a single leaf gets the code `0`.
    pub fn code_table(&self) -> Result<CodeTable,Error> {
        let mut table = CodeTable::new();
        if let Node::Leaf { symbol, .. } = self.pool.get(self.root) {
            table.push(*symbol,BitVec::from_elem(1,false))?;
            return Ok(table);
        }
        // right is pushed first so the left branch is emitted first
        let mut stack = vec![(self.root,BitVec::new())];
        while let Some((node,path)) = stack.pop() {
            match self.pool.get(node) {
                Node::Leaf { symbol, .. } => {
                    log::trace!("code 0x{:02x} -> {}",symbol,bits_string(&path));
                    table.push(*symbol,path)?;
                },
                Node::Branch { left, right, .. } => {
                    for (child,bit) in [(right,true),(left,false)] {
                        if let Some(child) = child {
                            let mut child_path = path.clone();
                            child_path.push(bit);
                            stack.push((*child,child_path));
                        }
                    }
                }
            }
        }
        Ok(table)
    }
    fn walk<F: FnMut(&Node,u64)>(&self,mut visit: F) {
        let mut stack = vec![(self.root,0)];
        while let Some((node,depth)) = stack.pop() {
            visit(self.pool.get(node),depth);
            for side in [Side::Left,Side::Right] {
                if let Some(child) = self.pool.down(node,side) {
                    stack.push((child,depth+1));
                }
            }
        }
    }
    /// weighted path length, sum of frequency times depth over the leaves
    pub fn wpl(&self) -> u64 {
        let mut ans = 0;
        self.walk(|node,depth| if let Node::Leaf { freq, .. } = node {
            ans += freq * depth;
        });
        ans
    }
    /// length of the longest path from the root
    pub fn depth(&self) -> u64 {
        let mut ans: u64 = 0;
        self.walk(|_,depth| ans = ans.max(depth));
        ans
    }
}

impl DecodeTree {
    /// Grow the tree along each code path, checking the codes form a prefix code.
    pub fn create(table: &CodeTable) -> Result<Self,Error> {
        let mut pool = NodePool::new();
        let root = pool.spawn_empty();
        for entry in table.iter() {
            let last = match entry.code.len() {
                0 => return Err(Error::DegenerateInput),
                l => l - 1
            };
            let mut curs = root;
            for (i,bit) in entry.code.iter().enumerate() {
                let side = Side::from(bit);
                curs = match pool.down(curs,side) {
                    Some(_) if i == last => {
                        return Err(Error::MalformedTable(format!("code for 0x{:02x} is a prefix of another code",entry.symbol)));
                    },
                    Some(next) => next,
                    None => {
                        let next = match i == last {
                            true => pool.spawn_leaf(entry.symbol,0),
                            false => pool.spawn_empty()
                        };
                        if !pool.attach(curs,side,next) {
                            return Err(Error::MalformedTable(format!("code for 0x{:02x} extends another code",entry.symbol)));
                        }
                        next
                    }
                };
            }
        }
        Ok(Self { pool, root })
    }
    pub fn is_empty(&self) -> bool {
        self.pool.len() == 1
    }
    /// Decode exactly `original_length` bytes, pad bits past that point are ignored.
    pub fn unpack(&self,packed: &[u8],original_length: u64) -> Result<Vec<u8>,Error> {
        let mut ans = Vec::new();
        if original_length == 0 {
            return Ok(ans);
        }
        if self.is_empty() {
            log::error!("table has no codes but declares {} bytes",original_length);
            return Err(Error::DegenerateInput);
        }
        // every byte costs at least one bit
        let max_out = original_length.min(packed.len() as u64 * 8);
        ans.try_reserve_exact(usize::try_from(max_out).map_err(|_| Error::AllocationFailure)?)?;
        let mut bits = BitUnpacker::create(packed);
        let mut curs = self.root;
        while (ans.len() as u64) < original_length {
            let bit = match bits.get_bit() {
                Some(bit) => bit,
                None => return Err(Error::TruncatedStream { needed: original_length, produced: ans.len() as u64 })
            };
            curs = match self.pool.down(curs,Side::from(bit)) {
                Some(next) => next,
                None => return Err(Error::InvalidCode(bits.position() - 1))
            };
            if let Node::Leaf { symbol, .. } = self.pool.get(curs) {
                ans.push(*symbol);
                curs = self.root;
            }
        }
        let used = bits.position().div_ceil(8);
        if used < packed.len() {
            log::warn!("{} trailing bytes ignored",packed.len() - used);
        }
        Ok(ans)
    }
}

/// Replace each byte of `payload` with its code.  Every byte must have a code.
pub fn pack(payload: &[u8],table: &CodeTable) -> Result<Vec<u8>,Error> {
    let mut num_bits: u64 = 0;
    for by in payload {
        match table.get(*by) {
            Some(code) => num_bits += code.len() as u64,
            None => return Err(Error::MalformedTable(format!("no code for 0x{:02x}",by)))
        }
    }
    let mut packer = BitPacker::with_capacity(num_bits)?;
    for by in payload {
        if let Some(code) = table.get(*by) {
            packer.put_code(code)?;
        }
    }
    log::debug!("packed {} bits",packer.bit_len());
    packer.finish()
}

/// Build the code table for a payload, empty payload gives an empty table.
/// Returns the table and the weighted path length.
pub fn code_table_for(dat: &[u8]) -> Result<(CodeTable,u64),Error> {
    let freqs = count_frequencies(dat);
    log::debug!("{} distinct bytes in {} bytes",freqs.len(),dat.len());
    if freqs.is_empty() {
        return Ok((CodeTable::new(),0));
    }
    let tree = HuffmanTree::build(&freqs)?;
    log::debug!("tree depth {}",tree.depth());
    Ok((tree.code_table()?,tree.wpl()))
}

/// Main compression function.
/// `payload` is everything to be coded, including any header the caller has prepended.
pub fn compress(payload: &[u8],opt: &Options) -> Result<Compressed,Error> {
    let coded: Cow<[u8]> = match opt.obfuscation {
        Some(offset) => Cow::Owned(obfuscate(payload,offset)),
        None => Cow::Borrowed(payload)
    };
    let (table,wpl) = code_table_for(&coded)?;
    if opt.obfuscation.is_some() && log::log_enabled!(log::Level::Debug) {
        let (plain_table,_) = code_table_for(payload)?;
        for change in plain_table.diff(&table) {
            let show = |c: &Option<BitVec>| c.as_ref().map_or("-".to_string(),bits_string);
            log::debug!("byte 0x{:02x}: plain code {}, obfuscated code {}",change.symbol,show(&change.before),show(&change.after));
        }
    }
    log::info!("weighted path length {}",wpl);
    let packed = pack(&coded,&table)?;
    let hash = checksum(&packed);
    log::info!("packed {} bytes into {}, checksum 0x{:016x}",coded.len(),packed.len(),hash);
    let original_length = coded.len() as u64;
    let table = code_table::serialize(&table,original_length,match opt.checksum {
        true => Some(hash),
        false => None
    });
    Ok(Compressed {
        packed,
        table,
        original_length,
        checksum: hash,
        wpl
    })
}

/// Main decompression function.
/// `table` is the persisted code table produced along with `packed`.
/// If the table carries a checksum it is verified before decoding.
pub fn expand(packed: &[u8],table: &str,opt: &Options) -> Result<Vec<u8>,Error> {
    let persisted = code_table::deserialize(table)?;
    if let Some(expected) = persisted.checksum {
        let actual = checksum(packed);
        if actual != expected {
            return Err(Error::IntegrityMismatch { expected, actual });
        }
    }
    let tree = DecodeTree::create(&persisted.table)?;
    let coded = tree.unpack(packed,persisted.original_length)?;
    log::info!("expanded {} bytes into {}",packed.len(),coded.len());
    Ok(match opt.obfuscation {
        Some(offset) => deobfuscate(&coded,offset),
        None => coded
    })
}

// *************** TESTS *****************

#[cfg(test)]
fn codes_of(table: &CodeTable) -> Vec<(u8,String)> {
    table.iter().map(|e| (e.symbol,bits_string(&e.code))).collect()
}

#[cfg(test)]
fn round_trip(test_data: &[u8],opt: &Options) -> Vec<u8> {
    let compressed = compress(test_data,opt).expect("compression failed");
    expand(&compressed.packed,&compressed.table,opt).expect("expansion failed")
}

#[cfg(test)]
const NO_CHECKSUM: Options = Options {
    obfuscation: None,
    checksum: false
};

#[test]
fn counts() {
    let freqs = count_frequencies(b"abracadabra");
    let pairs: Vec<(u8,u64)> = freqs.iter().map(|f| (f.symbol,f.count)).collect();
    assert_eq!(pairs,vec![(b'a',5),(b'b',2),(b'c',1),(b'd',1),(b'r',2)]);
    assert!(count_frequencies(b"").is_empty());
}

#[test]
fn compression_works() {
    let compressed = compress(&[0x41,0x41,0x41,0x42],&crate::STD_OPTIONS).expect("compression failed");
    assert_eq!(compressed.packed,hex::decode("E0").unwrap());
    assert_eq!(compressed.table,"4\n0x42 1 0x00\n0x41 1 0x80\nfnv1a 0xaf645d4c8602c7bf\n");
    assert_eq!(compressed.original_length,4);
    assert_eq!(compressed.wpl,4);
    assert_eq!(expand(&compressed.packed,&compressed.table,&crate::STD_OPTIONS),Ok(vec![0x41,0x41,0x41,0x42]));
}

#[test]
fn tie_break_by_byte_value() {
    let freqs = [
        ByteFrequency { symbol: b'a', count: 5 },
        ByteFrequency { symbol: b'b', count: 2 },
        ByteFrequency { symbol: b'c', count: 1 },
        ByteFrequency { symbol: b'd', count: 1 }
    ];
    let tree = HuffmanTree::build(&freqs).expect("build failed");
    let table = tree.code_table().expect("walk failed");
    let expected: Vec<(u8,String)> = [(b'b',"00"),(b'c',"010"),(b'd',"011"),(b'a',"1")]
        .iter().map(|(s,c)| (*s,c.to_string())).collect();
    assert_eq!(codes_of(&table),expected);
    assert_eq!(tree.wpl(),15);
    assert_eq!(tree.depth(),3);
    // same frequencies given in another order
    let mut shuffled = freqs.to_vec();
    shuffled.reverse();
    let again = HuffmanTree::build(&shuffled).expect("build failed").code_table().expect("walk failed");
    assert_eq!(again,table);
}

#[test]
fn empty_payload() {
    let compressed = compress(b"",&NO_CHECKSUM).expect("compression failed");
    assert!(compressed.packed.is_empty());
    assert_eq!(compressed.table,"0\n");
    assert_eq!(expand(&[],"0\n",&NO_CHECKSUM),Ok(Vec::new()));
    assert_eq!(round_trip(b"",&crate::STD_OPTIONS),Vec::<u8>::new());
    assert!(matches!(HuffmanTree::build(&[]),Err(Error::EmptyQueue)));
}

#[test]
fn single_symbol() {
    let compressed = compress(b"zzzzzzzzzz",&NO_CHECKSUM).expect("compression failed");
    assert_eq!(compressed.table,"10\n0x7a 1 0x00\n");
    assert_eq!(compressed.packed,vec![0,0]);
    assert_eq!(round_trip(b"z",&NO_CHECKSUM),b"z".to_vec());
    assert_eq!(round_trip(b"zzzzzzzzzz",&crate::STD_OPTIONS),b"zzzzzzzzzz".to_vec());
}

#[test]
fn invertibility() {
    let test_data = "I am Sam. Sam I am. I do not like this Sam I am.\n".as_bytes();
    assert_eq!(round_trip(test_data,&crate::STD_OPTIONS),test_data.to_vec());
    let all: Vec<u8> = (0..=255).collect();
    let compressed = compress(&all,&crate::STD_OPTIONS).expect("compression failed");
    assert_eq!(compressed.packed.len(),256);
    assert_eq!(expand(&compressed.packed,&compressed.table,&crate::STD_OPTIONS),Ok(all));
}

#[test]
fn invertibility_obfuscated() {
    let test_data = "Sender: 2023001,Alice\nReceiver: 2023002,Bob\nhello hello hello\n".as_bytes();
    let opt = Options { obfuscation: Some(crate::DEFAULT_OFFSET), checksum: true };
    assert_eq!(round_trip(test_data,&opt),test_data.to_vec());
    // decoding without removing the offset yields the shifted bytes
    let compressed = compress(test_data,&opt).expect("compression failed");
    let raw = expand(&compressed.packed,&compressed.table,&crate::STD_OPTIONS).expect("expansion failed");
    assert_eq!(raw,obfuscate(test_data,crate::DEFAULT_OFFSET));
}

#[test]
fn long_codes() {
    // fibonacci counts give the most lopsided tree
    let fib: [usize;14] = [1,1,2,3,5,8,13,21,34,55,89,144,233,377];
    let mut test_data = Vec::new();
    for (i,n) in fib.iter().enumerate() {
        test_data.append(&mut vec![b'A' + i as u8;*n]);
    }
    let (table,_) = code_table_for(&test_data).expect("table failed");
    assert_eq!(table.iter().map(|e| e.code.len()).max(),Some(13));
    assert!(table.is_prefix_free());
    let back = code_table::deserialize(&code_table::serialize(&table,0,None)).expect("deserialize failed");
    assert_eq!(back.table,table);
    assert_eq!(round_trip(&test_data,&crate::STD_OPTIONS),test_data);
}

#[test]
fn prefix_free_and_deterministic() {
    let samples: [&[u8];4] = [b"abracadabra",b"mississippi river",b"\x00\x00\x01\xff\xfe\x00",b"to be or not to be, that is the question"];
    for test_data in samples {
        let first = compress(test_data,&crate::STD_OPTIONS).expect("compression failed");
        let second = compress(test_data,&crate::STD_OPTIONS).expect("compression failed");
        assert_eq!(first.packed,second.packed);
        assert_eq!(first.table,second.table);
        let persisted = code_table::deserialize(&first.table).expect("deserialize failed");
        assert!(persisted.table.is_prefix_free());
    }
}

#[test]
fn truncated_stream() {
    let table = "9\n0x42 1 0x00\n0x41 1 0x80\n";
    assert_eq!(expand(&[0xe0],table,&NO_CHECKSUM),Err(Error::TruncatedStream { needed: 9, produced: 8 }));
    assert_eq!(expand(&[],table,&NO_CHECKSUM),Err(Error::TruncatedStream { needed: 9, produced: 0 }));
}

#[test]
fn pad_bits_ignored() {
    // 3 payload bytes, the remaining 5 bits of padding would decode as more 0x42
    assert_eq!(expand(&[0xc0],"3\n0x42 1 0x00\n0x41 1 0x80\n",&NO_CHECKSUM),Ok(vec![0x41,0x41,0x42]));
}

#[test]
fn corruption_detected() {
    let test_data = "I am Sam. Sam I am. I do not like this Sam I am.\n".as_bytes();
    let mut compressed = compress(test_data,&crate::STD_OPTIONS).expect("compression failed");
    compressed.packed[3] ^= 0x10;
    assert!(matches!(expand(&compressed.packed,&compressed.table,&crate::STD_OPTIONS),Err(Error::IntegrityMismatch { .. })));
}

#[test]
fn bad_tables() {
    assert_eq!(expand(&[0x80],"2\n0x7a 1 0x00\n",&NO_CHECKSUM),Err(Error::InvalidCode(0)));
    assert_eq!(expand(&[],"5\n",&NO_CHECKSUM),Err(Error::DegenerateInput));
    assert!(matches!(expand(&[0xff],"1\n0x61 1 0x80\n0x62 2 0x80\n",&NO_CHECKSUM),Err(Error::MalformedTable(_))));
    assert!(matches!(expand(&[0xff],"1\n0x62 2 0x80\n0x61 1 0x80\n",&NO_CHECKSUM),Err(Error::MalformedTable(_))));
    let mut table = CodeTable::new();
    table.push(0x61,BitVec::new()).unwrap();
    assert!(matches!(DecodeTree::create(&table),Err(Error::DegenerateInput)));
}

#[test]
fn pack_needs_every_code() {
    let (table,_) = code_table_for(b"ab").expect("table failed");
    assert!(matches!(pack(b"abc",&table),Err(Error::MalformedTable(_))));
}
