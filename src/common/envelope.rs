use bincode::{Decode, Encode};
use std::io::Read;

use crate::common::algorithms::SymmetricAlgorithm;
use crate::common::handle::KeyHandle;
use crate::common::platform::Platform;
use crate::error::{Error, Result};

/// Current envelope format version.
pub const ENVELOPE_VERSION: u16 = 1;

/// Upper bound on the encoded envelope size. Key ids are short strings, so
/// anything larger is a corrupt or hostile frame.
const MAX_ENVELOPE_LEN: usize = 4096;

/// The metadata envelope prepended to every ciphertext.
///
/// The envelope is what makes ciphertext self-routing: decryption never
/// needs the caller to say which provider produced it. The body stays
/// opaque, only the named provider/key version can open it.
///
/// 所有密文前置的元数据信封。
#[derive(Debug, Clone, PartialEq, Eq, Decode, Encode)]
pub struct Envelope {
    /// The version of the envelope format.
    pub version: u16,
    /// The platform whose key produced the body.
    pub platform: Platform,
    /// Identifier of the key inside that platform.
    pub key_id: String,
    /// The key version the body was encrypted under.
    pub key_version: u32,
    /// The AEAD algorithm used for the body.
    pub algorithm: SymmetricAlgorithm,
    /// The nonce for the body.
    pub nonce: [u8; 12],
}

impl Envelope {
    pub fn new(
        platform: Platform,
        key_id: impl Into<String>,
        key_version: u32,
        algorithm: SymmetricAlgorithm,
        nonce: [u8; 12],
    ) -> Self {
        Self {
            version: ENVELOPE_VERSION,
            platform,
            key_id: key_id.into(),
            key_version,
            algorithm,
            nonce,
        }
    }

    /// The key handle this envelope names.
    pub fn handle(&self) -> KeyHandle {
        KeyHandle::new(self.platform, self.key_id.clone(), self.key_version)
    }

    /// Encodes the envelope into a byte vector.
    ///
    /// 将信封编码为字节向量。
    pub fn encode_to_vec(&self) -> Result<Vec<u8>> {
        static CONFIG: bincode::config::Configuration = bincode::config::standard();
        bincode::encode_to_vec(self, CONFIG).map_err(Error::from)
    }

    /// Decodes an envelope from a byte slice.
    ///
    /// 从字节切片解码信封。
    pub fn decode_from_slice(data: &[u8]) -> Result<(Self, usize)> {
        static CONFIG: bincode::config::Configuration = bincode::config::standard();
        let (envelope, read): (Envelope, usize) =
            bincode::decode_from_slice(data, CONFIG).map_err(Error::from)?;
        if envelope.version != ENVELOPE_VERSION {
            return Err(Error::UnsupportedEnvelopeVersion(envelope.version));
        }
        Ok((envelope, read))
    }

    /// Frames the encrypted body behind this envelope.
    ///
    /// The format is `[4-byte length (u32 LE)][bincode-encoded Envelope][body]`.
    pub fn seal(&self, body: &[u8]) -> Result<Vec<u8>> {
        let header = self.encode_to_vec()?;
        let mut out = Vec::with_capacity(4 + header.len() + body.len());
        out.extend_from_slice(&(header.len() as u32).to_le_bytes());
        out.extend_from_slice(&header);
        out.extend_from_slice(body);
        Ok(out)
    }

    /// Decodes a length-prefixed envelope from a ciphertext slice.
    ///
    /// # Returns
    ///
    /// A tuple containing the parsed `Envelope` and a slice pointing to the
    /// encrypted body.
    ///
    /// 从带有长度前缀的密文切片解码信封，返回信封和指向加密正文的切片。
    pub fn decode_from_prefixed_slice(ciphertext: &[u8]) -> Result<(Self, &[u8])> {
        if ciphertext.len() < 4 {
            return Err(Error::InvalidEnvelope);
        }
        let header_len = u32::from_le_bytes(ciphertext[0..4].try_into().unwrap()) as usize;
        if header_len > MAX_ENVELOPE_LEN || ciphertext.len() < 4 + header_len {
            return Err(Error::InvalidEnvelope);
        }
        let header_bytes = &ciphertext[4..4 + header_len];
        let body = &ciphertext[4 + header_len..];

        let (envelope, _) = Self::decode_from_slice(header_bytes)?;
        Ok((envelope, body))
    }

    /// Reads and decodes a length-prefixed envelope from a synchronous reader.
    ///
    /// 从同步读取器中读取并解码带有长度前缀的信封。
    pub fn decode_from_prefixed_reader<R: Read>(reader: &mut R) -> Result<Self> {
        let mut len_buf = [0u8; 4];
        reader.read_exact(&mut len_buf)?;
        let header_len = u32::from_le_bytes(len_buf) as usize;
        if header_len > MAX_ENVELOPE_LEN {
            return Err(Error::InvalidEnvelope);
        }

        let mut header_bytes = vec![0u8; header_len];
        reader.read_exact(&mut header_bytes)?;
        let (envelope, _) = Self::decode_from_slice(&header_bytes)?;

        Ok(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample() -> Envelope {
        Envelope::new(
            Platform::Aws,
            "4c9a1e2f",
            2,
            SymmetricAlgorithm::Aes256Gcm,
            [7u8; 12],
        )
    }

    #[test]
    fn test_frame_round_trip() {
        let envelope = sample();
        let framed = envelope.seal(b"ciphertext body").unwrap();

        let (decoded, body) = Envelope::decode_from_prefixed_slice(&framed).unwrap();
        assert_eq!(decoded, envelope);
        assert_eq!(body, b"ciphertext body");
    }

    #[test]
    fn test_reader_round_trip() {
        let envelope = sample();
        let framed = envelope.seal(b"body").unwrap();

        let mut cursor = Cursor::new(framed);
        let decoded = Envelope::decode_from_prefixed_reader(&mut cursor).unwrap();
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn test_truncated_frame_rejected() {
        let framed = sample().seal(b"body").unwrap();

        assert!(matches!(
            Envelope::decode_from_prefixed_slice(&framed[..3]),
            Err(Error::InvalidEnvelope)
        ));
        // Length prefix promising more header than exists.
        let mut short = framed.clone();
        short.truncate(6);
        assert!(Envelope::decode_from_prefixed_slice(&short).is_err());
    }

    #[test]
    fn test_oversized_header_rejected() {
        let mut framed = sample().seal(b"body").unwrap();
        framed[0..4].copy_from_slice(&(u32::MAX).to_le_bytes());
        assert!(matches!(
            Envelope::decode_from_prefixed_slice(&framed),
            Err(Error::InvalidEnvelope)
        ));
    }

    #[test]
    fn test_unknown_format_version_rejected() {
        let mut envelope = sample();
        envelope.version = 9;
        let encoded = envelope.encode_to_vec().unwrap();
        assert!(matches!(
            Envelope::decode_from_slice(&encoded),
            Err(Error::UnsupportedEnvelopeVersion(9))
        ));
    }

    #[test]
    fn test_handle_matches_envelope() {
        let handle = sample().handle();
        assert_eq!(handle.platform, Platform::Aws);
        assert_eq!(handle.key_id, "4c9a1e2f");
        assert_eq!(handle.version, 2);
    }
}
