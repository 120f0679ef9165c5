// 1500-byte MTU plus the Ethernet header
pub const MAX_FRAME_SIZE: usize = 1514;

pub fn io_err(msg: &str) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, msg)
}
