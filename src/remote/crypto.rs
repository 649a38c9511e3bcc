//! Cryptographic protection for command transport.

use crate::error::{Error, Result};
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use sha2::{Digest, Sha256};

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

/// AES block and IV size.
const BLOCK_SIZE: usize = 16;

/* Implementation notes:
 *
 * The secrets should be generated always, hence serve as one-time
 * passwords. For this reason it is not necessary to maintain salt,
 * initialization vectors etc. It is enough to derive a bit string
 * long enough for the chosen cipher.
 */

/// Protects command payloads with AES-128-CBC and PKCS#7 padding.
///
/// The key is derived as the leading bytes of the SHA-256 digest of the
/// secret; the initialization vector is fixed to zero, which is acceptable
/// because every instance launch regenerates its secret.
pub struct CryptoProtection {
    key: [u8; BLOCK_SIZE],
}

impl CryptoProtection {
    /// Creates a new instance from the given non-empty secret.
    ///
    /// The construction verifies that a non-block-aligned sample survives
    /// the encrypt/decrypt round trip and fails with
    /// [`Error::CryptoUnavailable`] otherwise.
    pub fn new(secret: &str) -> Result<Self> {
        if secret.is_empty() {
            return Err(Error::CryptoUnavailable("empty secret supplied".to_string()));
        }

        let digest = Sha256::digest(secret.as_bytes());
        let mut key = [0u8; BLOCK_SIZE];
        key.copy_from_slice(&digest[..BLOCK_SIZE]);

        let result = Self { key };

        // Use a sample that does not match the cipher block size
        let sample = "data";
        match result.decrypt(&result.encrypt(sample)) {
            Ok(ref restored) if restored == sample => Ok(result),
            _ => Err(Error::CryptoUnavailable(
                "encryption/decryption check failed".to_string(),
            )),
        }
    }

    /// Encrypts a string into a message.
    pub fn encrypt(&self, payload: &str) -> Vec<u8> {
        let iv = [0u8; BLOCK_SIZE];
        Aes128CbcEnc::new(&self.key.into(), &iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(payload.as_bytes())
    }

    /// Decrypts a message into its string payload.
    pub fn decrypt(&self, message: &[u8]) -> Result<String> {
        let iv = [0u8; BLOCK_SIZE];
        let plain = Aes128CbcDec::new(&self.key.into(), &iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(message)
            .map_err(|_| Error::Transport("could not decrypt the message".to_string()))?;

        String::from_utf8(plain)
            .map_err(|_| Error::Transport("message payload is not valid UTF-8".to_string()))
    }
}
