//! Bit packing for the coded stream.
//! Codes are written MSB first, a partial final byte is padded with zeros
//! in its low bits.

use bit_vec::BitVec;
use crate::Error;

/// Accumulates codes into a growing byte buffer.
pub struct BitPacker {
    bytes: Vec<u8>,
    /// partial byte, filled from the MSB
    acc: u8,
    /// bits currently in `acc`, always < 8
    count: u8
}

/// Reads bits back out of a packed buffer.
pub struct BitUnpacker {
    bits: BitVec,
    ptr: usize
}

impl BitPacker {
    pub fn new() -> Self {
        Self {
            bytes: Vec::new(),
            acc: 0,
            count: 0
        }
    }
    /// Start with room for `num_bits`, fails if the buffer cannot be had.
    pub fn with_capacity(num_bits: u64) -> Result<Self,Error> {
        let byte_count = usize::try_from(num_bits.div_ceil(8)).map_err(|_| Error::AllocationFailure)?;
        let mut ans = Self::new();
        ans.bytes.try_reserve_exact(byte_count)?;
        Ok(ans)
    }
    /// number of bits written so far
    pub fn bit_len(&self) -> u64 {
        self.bytes.len() as u64 * 8 + self.count as u64
    }
    pub fn put_bit(&mut self,bit: bool) -> Result<(),Error> {
        if bit {
            self.acc |= 0x80 >> self.count;
        }
        self.count += 1;
        if self.count == 8 {
            self.bytes.try_reserve(1)?;
            self.bytes.push(self.acc);
            self.acc = 0;
            self.count = 0;
        }
        Ok(())
    }
    /// output all bits of `code` starting from the first
    pub fn put_code(&mut self,code: &BitVec) -> Result<(),Error> {
        for bit in code.iter() {
            self.put_bit(bit)?;
        }
        Ok(())
    }
    /// Flush the partial byte, if any, and hand over the buffer.
    pub fn finish(mut self) -> Result<Vec<u8>,Error> {
        if self.count > 0 {
            self.bytes.try_reserve(1)?;
            self.bytes.push(self.acc);
        }
        Ok(self.bytes)
    }
}

impl BitUnpacker {
    pub fn create(dat: &[u8]) -> Self {
        Self {
            bits: BitVec::from_bytes(dat),
            ptr: 0
        }
    }
    /// get the next bit, or None if the stream is exhausted
    pub fn get_bit(&mut self) -> Option<bool> {
        let ans = self.bits.get(self.ptr)?;
        self.ptr += 1;
        Some(ans)
    }
    /// index of the next bit to be read
    pub fn position(&self) -> usize {
        self.ptr
    }
}

#[test]
fn pads_low_bits() {
    let mut packer = BitPacker::new();
    for bit in [false,false,false,true] {
        packer.put_bit(bit).expect("put failed");
    }
    assert_eq!(packer.bit_len(),4);
    assert_eq!(packer.finish().expect("finish failed"),vec![0b0001_0000]);
}

#[test]
fn codes_span_bytes() {
    let mut packer = BitPacker::with_capacity(14).expect("no memory");
    let mut code = BitVec::new();
    for bit in [true,false,true,true,false,true,true,true,false,true] {
        code.push(bit);
    }
    packer.put_code(&code).expect("put failed");
    packer.put_code(&BitVec::from_elem(4,true)).expect("put failed");
    let packed = packer.finish().expect("finish failed");
    assert_eq!(packed,hex::decode("B77C").unwrap());
    let mut unpacker = BitUnpacker::create(&packed);
    for expected in code.iter() {
        assert_eq!(unpacker.get_bit(),Some(expected));
    }
    assert_eq!(unpacker.position(),10);
}

#[test]
fn exhausted() {
    let mut unpacker = BitUnpacker::create(&[0xff]);
    for _i in 0..8 {
        assert_eq!(unpacker.get_bit(),Some(true));
    }
    assert_eq!(unpacker.get_bit(),None);
    assert!(BitPacker::new().finish().expect("finish failed").is_empty());
}
