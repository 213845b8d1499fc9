//! Code Table
//!
//! The table maps each byte that occurs in the payload to its Huffman code.
//! It is persisted as text, which is what the decoder needs to rebuild the tree:
//!
//! ```text
//! 4
//! 0x42 1 0x00
//! 0x41 1 0x80
//! fnv1a 0xaf645d4c8602c7bf
//! ```
//!
//! The first line is the length of the uncompressed payload.  Each record has the
//! byte, the code length in bits, and the code packed MSB first into `ceil(len/8)`
//! bytes with zeros in the unused low bits.  The optional `fnv1a` trailer is the
//! checksum of the packed stream.

use bit_vec::BitVec;
use crate::Error;

/// No code in a table of 256 symbols can be longer than this
pub const MAX_CODE_LEN: usize = 255;
const TRAILER_TAG: &str = "fnv1a";

#[derive(Clone,Debug,PartialEq)]
pub struct CodeEntry {
    pub symbol: u8,
    pub code: BitVec
}

/// Codes in generation order, with a reverse index for lookups by symbol.
#[derive(Clone,Debug,PartialEq)]
pub struct CodeTable {
    entries: Vec<CodeEntry>,
    index: Vec<Option<usize>>
}

/// A code that changed between two tables
#[derive(Debug,PartialEq)]
pub struct CodeChange {
    pub symbol: u8,
    pub before: Option<BitVec>,
    pub after: Option<BitVec>
}

/// Everything recovered from a persisted table
#[derive(Debug,PartialEq)]
pub struct Persisted {
    pub table: CodeTable,
    pub original_length: u64,
    pub checksum: Option<u64>
}

/// render a code as a string of 0 and 1
pub fn bits_string(code: &BitVec) -> String {
    code.iter().map(|b| if b { '1' } else { '0' }).collect()
}

impl CodeTable {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: vec![None;256]
        }
    }
    /// Append a code, the symbol must not already be present.
    pub fn push(&mut self,symbol: u8,code: BitVec) -> Result<(),Error> {
        if self.index[symbol as usize].is_some() {
            return Err(Error::MalformedTable(format!("duplicate byte 0x{:02x}",symbol)));
        }
        self.index[symbol as usize] = Some(self.entries.len());
        self.entries.push(CodeEntry { symbol, code });
        Ok(())
    }
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    pub fn get(&self,symbol: u8) -> Option<&BitVec> {
        self.index[symbol as usize].map(|i| &self.entries[i].code)
    }
    pub fn iter(&self) -> std::slice::Iter<'_,CodeEntry> {
        self.entries.iter()
    }
    /// true if no code is a prefix of another code
    pub fn is_prefix_free(&self) -> bool {
        for a in &self.entries {
            for b in &self.entries {
                if a.symbol != b.symbol && a.code.len() <= b.code.len() && a.code.iter().zip(b.code.iter()).all(|(x,y)| x==y) {
                    return false;
                }
            }
        }
        true
    }
    /// Symbols whose code is different in `other`, in ascending symbol order.
    pub fn diff(&self,other: &CodeTable) -> Vec<CodeChange> {
        let mut ans = Vec::new();
        for symbol in 0..=255 {
            let before = self.get(symbol);
            let after = other.get(symbol);
            if before != after {
                ans.push(CodeChange {
                    symbol,
                    before: before.cloned(),
                    after: after.cloned()
                });
            }
        }
        ans
    }
}

/// Produce the persisted text for `table`.
/// `original_length` is the full length of the coded payload.
pub fn serialize(table: &CodeTable,original_length: u64,checksum: Option<u64>) -> String {
    let mut ans = format!("{}\n",original_length);
    for entry in table.iter() {
        ans += &format!("0x{:02x} {}",entry.symbol,entry.code.len());
        for by in entry.code.to_bytes() {
            ans += &format!(" 0x{:02x}",by);
        }
        ans += "\n";
    }
    if let Some(hash) = checksum {
        ans += &format!("{} 0x{:016x}\n",TRAILER_TAG,hash);
    }
    ans
}

fn malformed(line: usize,msg: &str) -> Error {
    Error::MalformedTable(format!("line {}: {}",line,msg))
}

fn parse_hex(tok: &str,line: usize) -> Result<u64,Error> {
    match tok.strip_prefix("0x").or(tok.strip_prefix("0X")) {
        Some(digits) => u64::from_str_radix(digits,16).map_err(|_| malformed(line,&format!("bad hex value `{}`",tok))),
        None => Err(malformed(line,&format!("expected 0x prefix on `{}`",tok)))
    }
}

fn parse_hex_byte(tok: &str,line: usize) -> Result<u8,Error> {
    u8::try_from(parse_hex(tok,line)?).map_err(|_| malformed(line,&format!("`{}` is not a byte",tok)))
}

fn parse_length(tok: &str) -> Result<u64,Error> {
    if let Ok(n) = tok.parse::<i64>() {
        if n < 0 {
            return Err(malformed(1,"negative original length"));
        }
    }
    tok.parse::<u64>().map_err(|_| malformed(1,&format!("bad original length `{}`",tok)))
}

fn parse_record(toks: &[&str],line: usize) -> Result<(u8,BitVec),Error> {
    if toks.len() < 3 {
        return Err(malformed(line,"record needs byte, length, and code bytes"));
    }
    let symbol = parse_hex_byte(toks[0],line)?;
    let code_len = toks[1].parse::<usize>().map_err(|_| malformed(line,&format!("bad code length `{}`",toks[1])))?;
    if code_len == 0 {
        log::error!("line {}: byte 0x{:02x} has an empty code",line,symbol);
        return Err(Error::DegenerateInput);
    }
    if code_len > MAX_CODE_LEN {
        return Err(malformed(line,&format!("code length {} is too long",code_len)));
    }
    let byte_count = code_len.div_ceil(8);
    if toks.len() - 2 != byte_count {
        return Err(malformed(line,&format!("{} bits need {} bytes, found {}",code_len,byte_count,toks.len()-2)));
    }
    let mut packed = Vec::new();
    for tok in &toks[2..] {
        packed.push(parse_hex_byte(tok,line)?);
    }
    let rem = code_len % 8;
    if rem > 0 && packed[byte_count-1] & (0xff >> rem) != 0 {
        return Err(malformed(line,"padding bits are not zero"));
    }
    let mut code = BitVec::from_bytes(&packed);
    code.truncate(code_len);
    Ok((symbol,code))
}

/// Recover the table, payload length, and checksum from the persisted text.
pub fn deserialize(txt: &str) -> Result<Persisted,Error> {
    let mut lines = txt.lines().enumerate()
        .map(|(i,l)| (i+1,l.trim()))
        .filter(|(_,l)| !l.is_empty());
    let original_length = match lines.next() {
        Some((_,first)) => parse_length(first)?,
        None => return Err(Error::MalformedTable("table is empty".to_string()))
    };
    let mut table = CodeTable::new();
    let mut checksum = None;
    for (num,l) in lines {
        if checksum.is_some() {
            return Err(malformed(num,"data after checksum trailer"));
        }
        let toks: Vec<&str> = l.split_whitespace().collect();
        if toks[0] == TRAILER_TAG {
            if toks.len() != 2 {
                return Err(malformed(num,"trailer needs exactly one value"));
            }
            checksum = Some(parse_hex(toks[1],num)?);
            continue;
        }
        let (symbol,code) = parse_record(&toks,num)?;
        log::trace!("load 0x{:02x} -> {}",symbol,bits_string(&code));
        table.push(symbol,code).map_err(|e| match e {
            Error::MalformedTable(msg) => malformed(num,&msg),
            e => e
        })?;
    }
    Ok(Persisted {
        table,
        original_length,
        checksum
    })
}

// *************** TESTS *****************

#[cfg(test)]
fn code(s: &str) -> BitVec {
    s.chars().map(|c| c=='1').collect()
}

#[test]
fn serialize_works() {
    let mut table = CodeTable::new();
    table.push(0x41,code("0")).unwrap();
    table.push(0x0a,code("110")).unwrap();
    table.push(0xff,code("1110000001")).unwrap();
    let txt = serialize(&table,1234,Some(0x0123456789abcdef));
    assert_eq!(txt,"1234\n0x41 1 0x00\n0x0a 3 0xc0\n0xff 10 0xe0 0x40\nfnv1a 0x0123456789abcdef\n");
    let txt = serialize(&table,7,None);
    assert_eq!(txt.lines().count(),4);
}

#[test]
fn long_codes_survive() {
    let mut table = CodeTable::new();
    table.push(b'x',code("11111111111111111110")).unwrap();
    table.push(b'y',code("11111111111111111111")).unwrap();
    table.push(b'z',code("0")).unwrap();
    let back = deserialize(&serialize(&table,99,None)).expect("deserialize failed");
    assert_eq!(back.table,table);
    assert_eq!(back.original_length,99);
    assert_eq!(back.checksum,None);
    assert_eq!(back.table.get(b'x').map(|c| c.len()),Some(20));
}

#[test]
fn tolerates_blank_lines() {
    let back = deserialize("\n3\n\n0x61 1 0x80\n0x62 1 0x00\n\n").expect("deserialize failed");
    assert_eq!(back.table.len(),2);
    assert_eq!(back.table.get(b'a'),Some(&code("1")));
}

#[test]
fn rejects_malformed() {
    let bad = [
        "",
        "-5\n",
        "abc\n",
        "3\n0x61 1\n",
        "3\n0x61 9 0x80\n",
        "3\n0x61 2 0x80 0x00\n",
        "3\n0x61 1 0xc0\n",
        "3\n61 1 0x80\n",
        "3\n0x1ff 1 0x80\n",
        "3\n0x61 1 0x80\n0x61 1 0x00\n",
        "3\n0x61 x 0x80\n",
        "3\nfnv1a 0x12\n0x61 1 0x80\n",
        "3\n0x61 300 0x80\n"
    ];
    for txt in bad {
        match deserialize(txt) {
            Err(Error::MalformedTable(_)) => {},
            other => panic!("`{}` gave {:?}",txt,other)
        }
    }
    assert_eq!(deserialize("3\n0x61 0 0x00\n"),Err(Error::DegenerateInput));
}

#[test]
fn prefix_check() {
    let mut table = CodeTable::new();
    table.push(1,code("10")).unwrap();
    table.push(2,code("11")).unwrap();
    table.push(3,code("0")).unwrap();
    assert!(table.is_prefix_free());
    table.push(4,code("101")).unwrap();
    assert!(!table.is_prefix_free());
}

#[test]
fn diff_lists_changes() {
    let mut t1 = CodeTable::new();
    t1.push(1,code("0")).unwrap();
    t1.push(2,code("10")).unwrap();
    t1.push(3,code("11")).unwrap();
    let mut t2 = CodeTable::new();
    t2.push(2,code("10")).unwrap();
    t2.push(1,code("11")).unwrap();
    t2.push(4,code("0")).unwrap();
    let changes: Vec<u8> = t1.diff(&t2).iter().map(|c| c.symbol).collect();
    assert_eq!(changes,vec![1,3,4]);
    assert_eq!(t1.diff(&t1),Vec::new());
}
