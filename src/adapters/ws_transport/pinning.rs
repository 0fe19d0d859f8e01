//! Server certificate verifier that trusts a single pinned thumbprint.
//!
//! Chain building, hostname checks and expiry are skipped; the end-entity
//! certificate's SHA-256 must match the pin exactly. Handshake signatures
//! are still verified against the presented certificate.

use std::sync::Arc;

use log::warn;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, verify_tls12_signature, verify_tls13_signature};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{CertificateError, DigitallySignedStruct, SignatureScheme};

use crate::adapters::cert_store::{matches_pin, thumbprint};

#[derive(Debug)]
pub struct PinnedServerVerifier {
    pinned: String,
    provider: Arc<CryptoProvider>,
}

impl PinnedServerVerifier {
    pub fn new(pinned: String, provider: Arc<CryptoProvider>) -> Self {
        Self { pinned, provider }
    }
}

impl ServerCertVerifier for PinnedServerVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        if matches_pin(&self.pinned, end_entity) {
            Ok(ServerCertVerified::assertion())
        } else {
            warn!(
                "WS: server certificate rejected, thumbprint {}",
                thumbprint(end_entity)
            );
            Err(rustls::Error::InvalidCertificate(
                CertificateError::ApplicationVerificationFailure,
            ))
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier_for(pin: String) -> PinnedServerVerifier {
        PinnedServerVerifier::new(pin, Arc::new(rustls::crypto::ring::default_provider()))
    }

    fn verify(v: &PinnedServerVerifier, der: &CertificateDer<'_>) -> Result<(), rustls::Error> {
        let name = ServerName::try_from("device.local").unwrap();
        v.verify_server_cert(der, &[], &name, &[], UnixTime::now())
            .map(|_| ())
    }

    #[test]
    fn accepts_pinned_certificate_regardless_of_name() {
        let ck = rcgen::generate_simple_self_signed(vec!["elsewhere".into()]).unwrap();
        let v = verifier_for(thumbprint(ck.cert.der()));
        assert!(verify(&v, ck.cert.der()).is_ok());
    }

    #[test]
    fn rejects_other_certificate() {
        let pinned = rcgen::generate_simple_self_signed(vec!["a".into()]).unwrap();
        let other = rcgen::generate_simple_self_signed(vec!["b".into()]).unwrap();
        let v = verifier_for(thumbprint(pinned.cert.der()));
        assert_eq!(
            verify(&v, other.cert.der()),
            Err(rustls::Error::InvalidCertificate(
                CertificateError::ApplicationVerificationFailure
            ))
        );
    }
}
