/// Internet checksum (RFC 1071) over `data`, continuing from the running sum `initial`.
///
/// An odd trailing byte is padded with a zero low byte. Pass `0` to start a fresh sum;
/// to chain a previous result, pass its complement.
pub fn checksum16(data: &[u8], initial: u16) -> u16 {
    let mut sum = initial as u64;
    let mut words = data.chunks_exact(2);
    for word in &mut words {
        sum += u16::from_be_bytes([word[0], word[1]]) as u64;
    }
    if let [last] = words.remainder() {
        sum += (*last as u64) << 8;
    }
    while sum >> 16 != 0 {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    !(sum as u16)
}
