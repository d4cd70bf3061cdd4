//! OpenSSL `enc -aes-256-cbc -pbkdf2` container format.
//!
//! Layout: `Salted__` (8 bytes) | salt (8 bytes) | AES-256-CBC ciphertext with
//! PKCS#7 padding. Key and IV come from PBKDF2-HMAC-SHA256 over the passphrase
//! and salt, 48 bytes split 32/16.

use aes::Aes256;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, KeyIvInit};
use hmac::Hmac;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::CipherError;

const MAGIC: &[u8; 8] = b"Salted__";
const SALT_LEN: usize = 8;
const KEY_LEN: usize = 32;
const IV_LEN: usize = 16;

/// Default iteration count of `openssl enc -pbkdf2`.
pub const OPENSSL_PBKDF2_ITERATIONS: u32 = 10_000;

/// Symmetric decryption of the credential container.
pub trait Decryptor {
    fn decrypt(
        &self,
        container: &[u8],
        passphrase: &str,
    ) -> Result<Zeroizing<Vec<u8>>, CipherError>;
}

/// Decrypts files produced by `openssl enc -aes-256-cbc -pbkdf2 -salt`.
#[derive(Debug, Clone, Copy)]
pub struct OpensslAes256Cbc {
    iterations: u32,
}

impl Default for OpensslAes256Cbc {
    fn default() -> Self {
        Self {
            iterations: OPENSSL_PBKDF2_ITERATIONS,
        }
    }
}

impl OpensslAes256Cbc {
    pub fn with_iterations(iterations: u32) -> Self {
        Self { iterations }
    }

    fn derive(
        &self,
        passphrase: &str,
        salt: &[u8],
    ) -> Result<Zeroizing<[u8; KEY_LEN + IV_LEN]>, CipherError> {
        let mut derived = Zeroizing::new([0u8; KEY_LEN + IV_LEN]);
        pbkdf2::pbkdf2::<Hmac<Sha256>>(
            passphrase.as_bytes(),
            salt,
            self.iterations,
            derived.as_mut_slice(),
        )
        .map_err(|e| CipherError::KeyDerivation(e.to_string()))?;
        Ok(derived)
    }
}

impl Decryptor for OpensslAes256Cbc {
    fn decrypt(
        &self,
        container: &[u8],
        passphrase: &str,
    ) -> Result<Zeroizing<Vec<u8>>, CipherError> {
        if container.len() < MAGIC.len() + SALT_LEN || &container[..MAGIC.len()] != MAGIC {
            return Err(CipherError::BadMagic);
        }
        let salt = &container[MAGIC.len()..MAGIC.len() + SALT_LEN];
        let ciphertext = &container[MAGIC.len() + SALT_LEN..];
        if ciphertext.is_empty() || ciphertext.len() % IV_LEN != 0 {
            return Err(CipherError::BadDecrypt);
        }

        let derived = self.derive(passphrase, salt)?;
        let (key, iv) = derived.split_at(KEY_LEN);

        let decryptor = cbc::Decryptor::<Aes256>::new_from_slices(key, iv)
            .map_err(|e| CipherError::KeyDerivation(e.to_string()))?;
        decryptor
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map(Zeroizing::new)
            .map_err(|_| CipherError::BadDecrypt)
    }
}

/// Produce an OpenSSL-compatible container. Used to build fixtures.
#[cfg(test)]
pub(crate) fn encrypt_for_tests(
    plaintext: &[u8],
    passphrase: &str,
    salt: [u8; SALT_LEN],
) -> Vec<u8> {
    use cbc::cipher::BlockEncryptMut;

    let derived = OpensslAes256Cbc::default()
        .derive(passphrase, &salt)
        .expect("pbkdf2 accepts any output length");
    let (key, iv) = derived.split_at(KEY_LEN);
    let encryptor = cbc::Encryptor::<Aes256>::new_from_slices(key, iv).expect("key and iv lengths");

    let mut out = MAGIC.to_vec();
    out.extend_from_slice(&salt);
    out.extend_from_slice(&encryptor.encrypt_padded_vec_mut::<Pkcs7>(plaintext));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SALT: [u8; 8] = [0x13, 0x37, 0xde, 0xad, 0xbe, 0xef, 0x00, 0x42];

    #[test]
    fn test_decrypts_with_correct_passphrase() {
        let container = encrypt_for_tests(b"credentialholder: {}\n", "s3cret", SALT);
        let plaintext = OpensslAes256Cbc::default()
            .decrypt(&container, "s3cret")
            .unwrap();
        assert_eq!(plaintext.as_slice(), b"credentialholder: {}\n");
    }

    #[test]
    fn test_wrong_passphrase_is_rejected() {
        let plaintext = b"credentialholder:\n  admin:\n    aws:\n      ClientId: abc\n";
        let container = encrypt_for_tests(plaintext, "s3cret", SALT);

        match OpensslAes256Cbc::default().decrypt(&container, "wrong") {
            Err(CipherError::BadDecrypt) => {}
            Ok(bytes) => assert_ne!(bytes.as_slice(), plaintext.as_slice()),
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_magic() {
        let err = OpensslAes256Cbc::default()
            .decrypt(b"credentialholder: plain yaml", "s3cret")
            .unwrap_err();
        assert_eq!(err, CipherError::BadMagic);
    }

    #[test]
    fn test_truncated_ciphertext() {
        let mut container = encrypt_for_tests(b"some credentials", "s3cret", SALT);
        container.truncate(container.len() - 3);
        let err = OpensslAes256Cbc::default()
            .decrypt(&container, "s3cret")
            .unwrap_err();
        assert_eq!(err, CipherError::BadDecrypt);
    }
}
