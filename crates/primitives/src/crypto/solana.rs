//! Ed25519 verification for Solana wallets.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};

use crate::errors::SignatureError;

/// Verifies an Ed25519 `signature` over `message` by the 32 byte `public_key`.
pub fn verify(public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<(), SignatureError> {
    let key: [u8; 32] = public_key.try_into().map_err(|_| {
        SignatureError::MalformedKey(format!(
            "expected 32 byte public key, got {}",
            public_key.len()
        ))
    })?;
    let key =
        VerifyingKey::from_bytes(&key).map_err(|e| SignatureError::MalformedKey(e.to_string()))?;
    let signature = Signature::from_slice(signature)
        .map_err(|e| SignatureError::InvalidSignature(e.to_string()))?;

    key.verify(message, &signature)
        .map_err(|_| SignatureError::VerificationFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::AUTH_MESSAGE_BODY;

    #[test]
    fn test_verify_auth_proof() {
        let signature = hex::decode("8e7bda89472cab7b1974be22fd550b6527997bb3c9c6058dff281434a8ec21e08c11dab0d96a6f11a99039283ca3054a1d93fab5d77449b710ae685d135a560c").expect("must decode");
        let public_key = bs58::decode("9PmF2t7Fm2oBxiQLC8mRapZy2yqobbGmaqEo3QCDtR9o")
            .into_vec()
            .expect("must decode");

        verify(&public_key, AUTH_MESSAGE_BODY.as_bytes(), &signature)
            .expect("signature must verify");
    }

    #[test]
    fn test_verify_rejects_short_key() {
        assert!(matches!(
            verify(&[1u8; 31], b"msg", &[0u8; 64]),
            Err(SignatureError::MalformedKey(_))
        ));
    }
}
