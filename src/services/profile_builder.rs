use std::path::{Path, PathBuf};

use tracing::info;

use crate::domain::{IdentityProfile, PublicKey};
use crate::errors::{DsiError, DsiResult};
use crate::security::{generate_keypair, KeyMaterial};
use crate::storage::traits::{write_all, DocumentStore};
use crate::validation::validate_profile;
use crate::vcard::{profile_to_card, write_card};

pub struct ProfileBuilder<S: DocumentStore> {
    store: S,
}

impl<S: DocumentStore> ProfileBuilder<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Validate the profile and serialize it as a vCard 4.0 document.
    pub fn render(profile: &IdentityProfile) -> DsiResult<String> {
        validate_profile(profile)?;
        Ok(write_card(&profile_to_card(profile)))
    }

    /// Render and write the card. Nothing is written when validation fails.
    pub fn build(&self, profile: &IdentityProfile, output: &Path) -> DsiResult<String> {
        let document = Self::render(profile)?;
        self.store.write(output, document.as_bytes())?;

        info!(
            output = %output.display(),
            contacts = profile.contacts.len(),
            keys = profile.public_keys.len(),
            "profile written"
        );
        Ok(document)
    }

    /// Like [`build`](Self::build), but first generates an Ed25519 keypair,
    /// stores it next to the card and publishes it as the preferred key.
    pub fn build_with_new_key(
        &self,
        profile: &IdentityProfile,
        output: &Path,
    ) -> DsiResult<(String, KeyMaterial)> {
        let (private_path, public_path) = key_paths(output);
        for path in [&private_path, &public_path] {
            if self.store.exists(path) {
                return Err(DsiError::AlreadyExists(path.display().to_string()));
            }
        }

        let material = generate_keypair()?;
        let mut profile = profile.clone();
        profile.public_keys.insert(
            0,
            PublicKey {
                alg: "ed25519".to_string(),
                key: material.public_b64.clone(),
                pref: Some(1),
            },
        );

        // Validate before any key file touches the disk.
        let document = Self::render(&profile)?;

        // Card first: a card that cannot be written must not leave keys behind.
        write_all(
            &self.store,
            &[
                (output, document.as_bytes()),
                (&private_path, material.private_pem.as_bytes()),
                (&public_path, material.public_pem.as_bytes()),
            ],
        )?;
        info!(
            output = %output.display(),
            private = %private_path.display(),
            public = %public_path.display(),
            "profile and keypair written"
        );

        Ok((document, material))
    }
}

/// `<dir>/<stem>_private.pem` and `<dir>/<stem>_public.pem` for an output card.
pub fn key_paths(output: &Path) -> (PathBuf, PathBuf) {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "profile".to_string());
    let dir = output.parent().unwrap_or_else(|| Path::new(""));

    (
        dir.join(format!("{}_private.pem", stem)),
        dir.join(format!("{}_public.pem", stem)),
    )
}
