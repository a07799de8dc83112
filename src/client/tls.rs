//! rustls configuration for `https://` gateways

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};

use crate::error::{Error, Result};

/// Skips chain and hostname checks but still verifies handshake
/// signatures. Only installed for `accept_invalid_certs`.
#[derive(Debug)]
struct AcceptAnyServerCert(Arc<CryptoProvider>);

impl ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        let algorithms = &self.0.signature_verification_algorithms;
        rustls::crypto::verify_tls12_signature(message, cert, dss, algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        let algorithms = &self.0.signature_verification_algorithms;
        rustls::crypto::verify_tls13_signature(message, cert, dss, algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}

/// Load every certificate of a PEM bundle into `roots`.
fn add_pem_bundle(roots: &mut RootCertStore, path: &Path) -> Result<()> {
    let file = File::open(path)
        .map_err(|e| Error::Tls(format!("Failed to open CA bundle '{}': {}", path.display(), e)))?;

    let certs = rustls_pemfile::certs(&mut BufReader::new(file))
        .collect::<std::result::Result<Vec<CertificateDer<'static>>, _>>()
        .map_err(|e| Error::Tls(format!("Failed to parse CA bundle '{}': {}", path.display(), e)))?;

    if certs.is_empty() {
        return Err(Error::Tls(format!("CA bundle '{}' contains no certificates", path.display())));
    }

    match roots.add_parsable_certificates(certs) {
        (0, rejected) => Err(Error::Tls(format!(
            "CA bundle '{}' contains no usable certificates ({} rejected)",
            path.display(),
            rejected
        ))),
        _ => Ok(()),
    }
}

/// Client TLS settings for the gateway connection.
///
/// `accept_invalid_certs` wins over everything else. Otherwise the webpki
/// roots are trusted, plus the certificates of `ca_cert_path` if given.
pub fn build_tls_config(ca_cert_path: Option<&Path>, accept_invalid_certs: bool) -> Result<ClientConfig> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let builder = ClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()
        .map_err(|e| Error::Tls(format!("No usable protocol versions: {}", e)))?;

    if accept_invalid_certs {
        return Ok(builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert(provider)))
            .with_no_client_auth());
    }

    let mut roots = RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };
    if let Some(path) = ca_cert_path {
        add_pem_bundle(&mut roots, path)?;
    }

    Ok(builder.with_root_certificates(roots).with_no_client_auth())
}
