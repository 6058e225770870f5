//! Ed25519 keys as published in cards (`KEY`, base64 DER SubjectPublicKeyInfo)
//! and the two signatures the toolkit produces: endorsements and feed items.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ed25519_dalek::pkcs8::spki::der::pem::LineEnding;
use ed25519_dalek::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;

use crate::errors::{DsiError, DsiResult};

/// A freshly generated keypair in its exported forms.
pub struct KeyMaterial {
    pub signing_key: SigningKey,
    pub private_pem: String,
    pub public_pem: String,
    /// Base64 DER public key, the form used in the card's `KEY` property.
    pub public_b64: String,
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("public_b64", &self.public_b64)
            .finish()
    }
}

pub fn generate_keypair() -> DsiResult<KeyMaterial> {
    let signing_key = SigningKey::generate(&mut OsRng);
    export_keypair(signing_key)
}

pub fn export_keypair(signing_key: SigningKey) -> DsiResult<KeyMaterial> {
    let private_pem = signing_key.to_pkcs8_pem(LineEnding::LF)?.to_string();
    let verifying_key = signing_key.verifying_key();
    let public_pem = verifying_key.to_public_key_pem(LineEnding::LF)?;
    let public_b64 = public_key_to_b64der(&verifying_key)?;

    Ok(KeyMaterial {
        signing_key,
        private_pem,
        public_pem,
        public_b64,
    })
}

pub fn public_key_to_b64der(key: &VerifyingKey) -> DsiResult<String> {
    let der = key.to_public_key_der()?;
    Ok(BASE64.encode(der.as_bytes()))
}

pub fn load_private_key_pem(pem: &str) -> DsiResult<SigningKey> {
    Ok(SigningKey::from_pkcs8_pem(pem.trim())?)
}

pub fn load_public_key_pem(pem: &str) -> DsiResult<VerifyingKey> {
    Ok(VerifyingKey::from_public_key_pem(pem.trim())?)
}

pub fn load_public_key_b64der(b64: &str) -> DsiResult<VerifyingKey> {
    let der = BASE64
        .decode(b64.trim())
        .map_err(|e| DsiError::Key(format!("invalid base64: {}", e)))?;
    Ok(VerifyingKey::from_public_key_der(&der)?)
}

/// Converts the card form of a public key back to PEM.
pub fn b64der_to_pem(b64: &str) -> DsiResult<String> {
    let key = load_public_key_b64der(b64)?;
    Ok(key.to_public_key_pem(LineEnding::LF)?)
}

fn sign_hex(key: &SigningKey, message: &[u8]) -> String {
    hex::encode(key.sign(message).to_bytes())
}

fn verify_hex(key: &VerifyingKey, message: &[u8], signature_hex: &str) -> bool {
    let Ok(bytes) = hex::decode(signature_hex.trim()) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(&bytes) else {
        return false;
    };
    key.verify(message, &signature).is_ok()
}

/// `endorse:<base64 DER key>`
pub fn canonical_endorsement(endorsee_key_b64: &str) -> Vec<u8> {
    format!("endorse:{}", endorsee_key_b64.trim()).into_bytes()
}

pub fn sign_endorsement(key: &SigningKey, endorsee_key_b64: &str) -> String {
    sign_hex(key, &canonical_endorsement(endorsee_key_b64))
}

pub fn verify_endorsement(key: &VerifyingKey, endorsee_key_b64: &str, signature_hex: &str) -> bool {
    verify_hex(key, &canonical_endorsement(endorsee_key_b64), signature_hex)
}

/// `<pubDate>\n<title>\n<description>`
pub fn canonical_feed_item(pub_date: &str, title: &str, description: &str) -> Vec<u8> {
    format!("{}\n{}\n{}", pub_date, title, description).into_bytes()
}

pub fn verify_feed_item(
    key: &VerifyingKey,
    pub_date: &str,
    title: &str,
    description: &str,
    signature_hex: &str,
) -> bool {
    verify_hex(
        key,
        &canonical_feed_item(pub_date, title, description),
        signature_hex,
    )
}

/// Signs feed items; the key id is the signer's public key in card form.
pub struct FeedSigner {
    key: SigningKey,
    key_id: String,
}

impl FeedSigner {
    pub fn new(key: SigningKey) -> DsiResult<Self> {
        let key_id = public_key_to_b64der(&key.verifying_key())?;
        Ok(Self { key, key_id })
    }

    pub fn from_pem(pem: &str) -> DsiResult<Self> {
        Self::new(load_private_key_pem(pem)?)
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn sign_item(&self, pub_date: &str, title: &str, description: &str) -> String {
        sign_hex(&self.key, &canonical_feed_item(pub_date, title, description))
    }
}
