//! 64-bit Cipher Feedback (CFB64) streaming mode built on the Blowfish block
//! primitive.

use crate::block::{BlockState, BlowfishError, BLOCK_BYTES};

// Owned cipher: `Cfb64` frees and clears it on drop. Borrowed: the caller
// keeps the `BlockState` alive and `Cfb64` only touches it.
enum Cipher<'a> {
    Owned(BlockState),
    Borrowed(&'a mut BlockState),
}

impl Cipher<'_> {
    fn state(&self) -> &BlockState {
        match self {
            Cipher::Owned(s) => s,
            Cipher::Borrowed(s) => &**s,
        }
    }
}

/// A block cipher plus a 64-bit feedback register, used to encrypt or
/// decrypt byte buffers of arbitrary length.
pub struct Cfb64<'a> {
    cipher: Cipher<'a>,
    feedback: u64,
}

impl<'a> Cfb64<'a> {
    // The caller is responsible for having keyed `state` already.
    pub fn new(state: &'a mut BlockState, iv: u64) -> Self {
        Cfb64 {
            cipher: Cipher::Borrowed(state),
            feedback: iv,
        }
    }

    pub fn create(key: &[u8], iv: u64) -> Result<Self, BlowfishError> {
        let state = BlockState::new(key)?;
        Ok(Cfb64 {
            cipher: Cipher::Owned(state),
            feedback: iv,
        })
    }

    pub fn set_iv(&mut self, iv: u64) {
        self.feedback = iv;
    }

    // A zero-length buffer is a no-op. For a partial trailing block, the
    // feedback left behind is the full XOR result, zero low-order bytes
    // included, not just the encrypted high-order residue.
    pub fn encrypt(&mut self, data: &mut [u8]) {
        let state = self.cipher.state();
        let mut feedback = self.feedback;

        let full_blocks = data.len() / BLOCK_BYTES;
        for block_index in 0..full_blocks {
            feedback = state.encrypt_u64(feedback);

            let offset = block_index * BLOCK_BYTES;
            let chunk: &mut [u8; BLOCK_BYTES] =
                (&mut data[offset..offset + BLOCK_BYTES]).try_into().unwrap();
            let plain = u64::from_be_bytes(*chunk);
            let cipher_text = feedback ^ plain;
            *chunk = cipher_text.to_be_bytes();

            feedback = cipher_text;
        }

        let remainder = data.len() % BLOCK_BYTES;
        if remainder > 0 {
            feedback = state.encrypt_u64(feedback);

            let offset = data.len() - remainder;
            let mut plain_bytes = [0u8; BLOCK_BYTES];
            plain_bytes[..remainder].copy_from_slice(&data[offset..]);
            let plain = u64::from_be_bytes(plain_bytes);

            let cipher_text = feedback ^ plain;
            let cipher_bytes = cipher_text.to_be_bytes();
            data[offset..].copy_from_slice(&cipher_bytes[..remainder]);

            feedback = cipher_text;
        }

        self.feedback = feedback;
    }

    // Uses the cipher's encrypt primitive as the keystream generator, same
    // as `encrypt`. Partial-block feedback is the raw ciphertext as loaded
    // (zero low-order bytes), not the XORed plaintext.
    pub fn decrypt(&mut self, data: &mut [u8]) {
        let state = self.cipher.state();
        let mut feedback = self.feedback;

        let full_blocks = data.len() / BLOCK_BYTES;
        for block_index in 0..full_blocks {
            feedback = state.encrypt_u64(feedback);

            let offset = block_index * BLOCK_BYTES;
            let chunk: &mut [u8; BLOCK_BYTES] =
                (&mut data[offset..offset + BLOCK_BYTES]).try_into().unwrap();
            let cipher_text = u64::from_be_bytes(*chunk);
            let plain = cipher_text ^ feedback;
            *chunk = plain.to_be_bytes();

            feedback = cipher_text;
        }

        let remainder = data.len() % BLOCK_BYTES;
        if remainder > 0 {
            feedback = state.encrypt_u64(feedback);

            let offset = data.len() - remainder;
            let mut cipher_bytes = [0u8; BLOCK_BYTES];
            cipher_bytes[..remainder].copy_from_slice(&data[offset..]);
            let cipher_text = u64::from_be_bytes(cipher_bytes);

            let plain = cipher_text ^ feedback;
            let plain_bytes = plain.to_be_bytes();
            data[offset..].copy_from_slice(&plain_bytes[..remainder]);

            feedback = cipher_text;
        }

        self.feedback = feedback;
    }
}

impl Drop for Cfb64<'_> {
    fn drop(&mut self) {
        self.feedback = 0;
        if let Cipher::Owned(state) = &mut self.cipher {
            state.clear();
        }
    }
}
