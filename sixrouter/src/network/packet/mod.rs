use thiserror::Error;

pub mod checksum;
pub mod ethernet;
pub mod icmpv6;
pub mod ipv6;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PacketError {
    #[error("{what} truncated: need {need} bytes, got {got}")]
    Truncated {
        what: &'static str,
        need: usize,
        got: usize,
    },
    #[error("Unexpected IP version {0}")]
    BadVersion(u8),
    #[error("Payload length {declared} exceeds {available} available bytes")]
    PayloadLength { declared: usize, available: usize },
}

pub(crate) fn ensure_len(what: &'static str, buf: &[u8], need: usize) -> Result<(), PacketError> {
    if buf.len() < need {
        Err(PacketError::Truncated {
            what,
            need,
            got: buf.len(),
        })
    } else {
        Ok(())
    }
}
