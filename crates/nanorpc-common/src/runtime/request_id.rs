use rand::rngs::OsRng;
use rand::RngCore;

use crate::protocol::RpcError;

/// Number of random bytes in a generated request id. The id itself is the
/// hex encoding, so it is twice as long.
pub const DEFAULT_REQ_ID_BYTES_LEN: usize = 16;

/// Produces request ids for calls that arrive without one.
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> Result<String, RpcError>;
}

/// Hex encoded random bytes from the operating system RNG.
#[derive(Debug, Clone, Copy)]
pub struct RandomIdGenerator {
    pub bytes_len: usize,
}

impl Default for RandomIdGenerator {
    fn default() -> Self {
        Self {
            bytes_len: DEFAULT_REQ_ID_BYTES_LEN,
        }
    }
}

impl IdGenerator for RandomIdGenerator {
    fn generate(&self) -> Result<String, RpcError> {
        let mut bytes = vec![0u8; self.bytes_len];
        OsRng.try_fill_bytes(&mut bytes).map_err(|e| {
            RpcError::unclassified("error generating request ID").with_cause(e)
        })?;
        Ok(hex::encode(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_id_is_hex_of_configured_length() {
        let id = RandomIdGenerator::default().generate().unwrap();
        assert_eq!(id.len(), 2 * DEFAULT_REQ_ID_BYTES_LEN);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));

        let short = RandomIdGenerator { bytes_len: 4 }.generate().unwrap();
        assert_eq!(short.len(), 8);
    }

    #[test]
    fn test_generated_ids_differ() {
        let ids = RandomIdGenerator::default();
        assert_ne!(ids.generate().unwrap(), ids.generate().unwrap());
    }
}
