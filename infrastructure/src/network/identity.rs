//! Organization admin identity loaded from credential files

use endorse_application::NetworkError;
use endorse_application::config::OrganizationConfig;
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::debug;

/// Admin certificate and key one organization's client signs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminIdentity {
    organization: String,
    msp_id: String,
    certificate: Vec<u8>,
    private_key: Vec<u8>,
}

impl AdminIdentity {
    /// Load the identity of `organization`.
    ///
    /// Both credential files must be configured to be read; when neither is,
    /// the client acts with an unsigned development identity. Configuring
    /// only one of the two is a configuration error.
    pub async fn load(organization: &OrganizationConfig) -> Result<Self, NetworkError> {
        let (certificate, private_key) =
            match (&organization.signed_cert, &organization.admin_private_key) {
                (Some(cert), Some(key)) => (read_pem(cert).await?, read_pem(key).await?),
                (None, None) => {
                    debug!(
                        "No credentials configured for {}, using a development identity",
                        organization.name
                    );
                    (Vec::new(), Vec::new())
                }
                _ => {
                    return Err(NetworkError::Configuration(format!(
                        "organization {} needs both signed_cert and admin_private_key",
                        organization.name
                    )));
                }
            };

        Ok(Self {
            organization: organization.name.clone(),
            msp_id: organization.msp_id.clone(),
            certificate,
            private_key,
        })
    }

    pub fn organization(&self) -> &str {
        &self.organization
    }

    pub fn msp_id(&self) -> &str {
        &self.msp_id
    }

    /// Serialized creator: membership id followed by the certificate.
    pub fn creator(&self) -> Vec<u8> {
        let mut creator = self.msp_id.as_bytes().to_vec();
        creator.extend_from_slice(&self.certificate);
        creator
    }

    /// Keyed digest standing in for a signature over `bytes`.
    pub fn sign(&self, bytes: &[u8]) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(&self.private_key);
        hasher.update(self.msp_id.as_bytes());
        hasher.update(bytes);
        hasher.finalize().to_vec()
    }

    /// Short hex fingerprint of the certificate.
    pub fn fingerprint(&self) -> String {
        hex::encode(&Sha256::digest(&self.certificate)[..8])
    }
}

async fn read_pem(path: &Path) -> Result<Vec<u8>, NetworkError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        NetworkError::Configuration(format!("cannot read {}: {}", path.display(), e))
    })?;
    let text = String::from_utf8_lossy(&bytes);
    if !text.contains("-----BEGIN") {
        return Err(NetworkError::Configuration(format!(
            "{} is not a PEM file",
            path.display()
        )));
    }
    Ok(bytes)
}
