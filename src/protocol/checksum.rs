// XOR parity over the frame body (type byte + records).
//
// Detects truncation and any odd number of flipped bits in the same bit
// position. Two flips in the same column cancel out, including a payload
// flip paired with the matching flip of the checksum byte itself.

/// XOR-reduce `data`
pub fn xor_checksum(data: &[u8]) -> u8 {
    data.iter()
        .fold(0u8, |acc, &b| acc ^ b)
}

pub fn verify_xor(data: &[u8], expected: u8) -> bool {
    xor_checksum(data) == expected
}
