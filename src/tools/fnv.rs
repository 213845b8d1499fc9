//! FNV-1a 64 bit digest, used as a fingerprint of the packed stream.

const FNV1A_64_INIT: u64 = 0xcbf29ce484222325;
const FNV1A_64_PRIME: u64 = 0x100000001b3;

pub fn checksum(dat: &[u8]) -> u64 {
    dat.iter().fold(FNV1A_64_INIT,|hash,b| (hash ^ *b as u64).wrapping_mul(FNV1A_64_PRIME))
}

#[test]
fn known_digests() {
    // reference values for FNV-1a 64
    assert_eq!(checksum(b""),0xcbf29ce484222325);
    assert_eq!(checksum(b"a"),0xaf63dc4c8601ec8c);
    assert_eq!(checksum(b"foobar"),0x85944171f73967e8);
}
