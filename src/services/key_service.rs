use std::path::Path;

use tracing::info;

use crate::domain::{Endorsement, IdentityProfile};
use crate::errors::{DsiError, DsiResult};
use crate::security::{
    b64der_to_pem, generate_keypair, load_private_key_pem, load_public_key_pem,
    public_key_to_b64der, sign_endorsement, KeyMaterial,
};
use crate::storage::traits::{write_all, DocumentStore};
use crate::validation::validate_date;

pub struct KeyService<S: DocumentStore> {
    store: S,
}

impl<S: DocumentStore> KeyService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Generate a keypair and write it as PKCS#8 / SPKI PEM. Existing key
    /// files are never replaced.
    pub fn create(&self, private_path: &Path, public_path: &Path) -> DsiResult<KeyMaterial> {
        if private_path == public_path {
            return Err(DsiError::InvalidInput(
                "private and public key paths must differ".to_string(),
            ));
        }
        for path in [private_path, public_path] {
            if self.store.exists(path) {
                return Err(DsiError::AlreadyExists(path.display().to_string()));
            }
        }

        let material = generate_keypair()?;
        write_all(
            &self.store,
            &[
                (private_path, material.private_pem.as_bytes()),
                (public_path, material.public_pem.as_bytes()),
            ],
        )?;

        info!(
            private = %private_path.display(),
            public = %public_path.display(),
            "keypair written"
        );
        Ok(material)
    }
}

/// Public key PEM to the base64 DER form used in `KEY` properties.
pub fn encode_public_pem(pem: &str) -> DsiResult<String> {
    public_key_to_b64der(&load_public_key_pem(pem)?)
}

/// Base64 DER back to a public key PEM.
pub fn decode_public_b64(b64: &str) -> DsiResult<String> {
    b64der_to_pem(b64)
}

/// Sign the preferred key of someone else's profile.
pub fn endorse(
    private_pem: &str,
    endorsee: &IdentityProfile,
    date: Option<String>,
    confidence: Option<String>,
) -> DsiResult<Endorsement> {
    let key = load_private_key_pem(private_pem)?;
    let endorsee_key = endorsee
        .preferred_key()
        .map(|k| k.key.trim().to_string())
        .ok_or_else(|| {
            DsiError::Key(format!("{} publishes no public key to endorse", endorsee.name))
        })?;

    if let Some(date) = &date {
        validate_date("date", date)?;
    }

    let signature = sign_endorsement(&key, &endorsee_key);
    Ok(Endorsement {
        endorsee_key,
        signature,
        date,
        confidence,
    })
}
