//! Client identity and server pin for the operator-console link.
//!
//! The controller authenticates with an X.509 client certificate and
//! accepts exactly one server certificate, identified by its thumbprint.
//!
//! | Item                | Source                                  |
//! |---------------------|-----------------------------------------|
//! | client certificate  | PEM file (chain allowed, leaf first)    |
//! | client private key  | PEM file (PKCS#8, PKCS#1 or SEC1)       |
//! | pinned thumbprint   | config, uppercase hex SHA-256 of DER    |

use std::path::Path;

use log::{info, warn};
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};

use crate::error::TransportError;

/// Length of a SHA-256 thumbprint in hex characters.
pub const THUMBPRINT_HEX_LEN: usize = 64;

/// Uppercase hex SHA-256 over a DER certificate.
pub fn thumbprint(der: &[u8]) -> String {
    hex::encode_upper(hmac_sha256::Hash::hash(der))
}

/// Whether `der` is the certificate `pinned` names. Case-sensitive.
pub fn matches_pin(pinned: &str, der: &[u8]) -> bool {
    thumbprint(der) == pinned
}

/// Loaded client identity plus the server pin.
pub struct CertificateIdentity {
    chain: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
    pinned_thumbprint: String,
}

impl core::fmt::Debug for CertificateIdentity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CertificateIdentity")
            .field("chain_len", &self.chain.len())
            .field("pinned_thumbprint", &self.pinned_thumbprint)
            .finish_non_exhaustive()
    }
}

impl CertificateIdentity {
    /// Parse PEM text. The pin is compared verbatim, so it must be
    /// uppercase hex.
    pub fn from_pem(
        cert_pem: &[u8],
        key_pem: &[u8],
        pinned_thumbprint: &str,
    ) -> Result<Self, TransportError> {
        let chain = CertificateDer::pem_slice_iter(cert_pem)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| {
                warn!("CertStore: bad client certificate PEM: {e:?}");
                TransportError::InvalidIdentity
            })?;
        if chain.is_empty() {
            warn!("CertStore: no certificate in client PEM");
            return Err(TransportError::InvalidIdentity);
        }

        let key = PrivateKeyDer::from_pem_slice(key_pem).map_err(|e| {
            warn!("CertStore: bad client key PEM: {e:?}");
            TransportError::InvalidIdentity
        })?;

        if pinned_thumbprint.len() != THUMBPRINT_HEX_LEN {
            warn!(
                "CertStore: pinned thumbprint has {} chars, expected {}",
                pinned_thumbprint.len(),
                THUMBPRINT_HEX_LEN
            );
        }

        info!(
            "CertStore: loaded client identity (chain={}, leaf={})",
            chain.len(),
            thumbprint(&chain[0])
        );

        Ok(Self {
            chain,
            key,
            pinned_thumbprint: pinned_thumbprint.to_owned(),
        })
    }

    pub fn from_files(
        cert_path: &Path,
        key_path: &Path,
        pinned_thumbprint: &str,
    ) -> Result<Self, TransportError> {
        let read = |path: &Path| {
            std::fs::read(path).map_err(|e| {
                warn!("CertStore: cannot read {}: {e}", path.display());
                TransportError::InvalidIdentity
            })
        };
        Self::from_pem(&read(cert_path)?, &read(key_path)?, pinned_thumbprint)
    }

    /// Hand the chain, key and pin to the TLS config builder.
    pub fn into_parts(
        self,
    ) -> (
        Vec<CertificateDer<'static>>,
        PrivateKeyDer<'static>,
        String,
    ) {
        (self.chain, self.key, self.pinned_thumbprint)
    }
}
