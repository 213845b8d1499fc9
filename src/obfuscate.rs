//! Fixed offset byte transform.
//!
//! Every byte is shifted by the same offset modulo 256 before coding, and shifted
//! back after decoding.  This only scrambles the plain bytes, it is not encryption.

pub fn obfuscate(dat: &[u8],offset: u8) -> Vec<u8> {
    dat.iter().map(|b| b.wrapping_add(offset)).collect()
}

pub fn deobfuscate(dat: &[u8],offset: u8) -> Vec<u8> {
    dat.iter().map(|b| b.wrapping_sub(offset)).collect()
}

#[test]
fn wraps_around() {
    assert_eq!(obfuscate(&[0x00,0x7f,0xab,0xff],0x55),vec![0x55,0xd4,0x00,0x54]);
    assert_eq!(deobfuscate(&[0x55,0xd4,0x00,0x54],0x55),vec![0x00,0x7f,0xab,0xff]);
}

#[test]
fn inverse_for_all_offsets() {
    let test_data: Vec<u8> = (0..=255).collect();
    for offset in 0..=255 {
        assert_eq!(deobfuscate(&obfuscate(&test_data,offset),offset),test_data);
    }
}
