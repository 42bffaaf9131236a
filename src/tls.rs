//! TLS 1.2+ client configuration with mutual authentication and a
//! pinned-Common-Name allow-list (spec §4.1, §3 "secure_mode_enabled").
//!
//! The client identity is loaded from a PKCS#12 blob with an empty
//! passphrase; the CA is a PEM bundle. After the handshake, the peer's leaf
//! certificate Subject CN must appear in `trusted_servers` or the socket is
//! closed (spec §4.1: "If the peer's CN is not in `trusted_servers`, the
//! socket is closed").

use std::collections::HashSet;
use std::io::Cursor;
use std::sync::Arc;

use rustls::client::danger::{
    HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use rustls::client::WebPkiServerVerifier;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, Error as TlsError, RootCertStore, SignatureScheme};

use crate::config::Configuration;
use crate::error::{ClipShareError, Result};

/// Resolves the TLS config a session should connect with, per
/// `config.secure_mode_enabled` (spec §3, §4.1): `None` for a plaintext
/// session, or a freshly built mutual-auth config from `config.client_cert`/
/// `config.ca_cert`/`config.trusted_servers` otherwise.
pub fn client_config_for(config: &Configuration) -> Result<Option<Arc<ClientConfig>>> {
    if !config.secure_mode_enabled {
        return Ok(None);
    }
    build_client_config(&config.client_cert, &config.ca_cert, config.trusted_servers.clone()).map(Some)
}

/// Builds the shared, reusable `rustls::ClientConfig` for this process
/// (spec §5: "`SSL_CTX` is created on first use and shared").
pub fn build_client_config(
    client_pkcs12: &[u8],
    ca_pem: &[u8],
    trusted_servers: HashSet<String>,
) -> Result<Arc<ClientConfig>> {
    let mut root_store = RootCertStore::empty();
    let mut reader = Cursor::new(ca_pem);
    for cert in rustls_pemfile::certs(&mut reader) {
        let cert = cert.map_err(|e| {
            ClipShareError::ConnectionFailure(format!("invalid CA certificate PEM: {e}"))
        })?;
        root_store.add(cert).map_err(|e| {
            ClipShareError::ConnectionFailure(format!("CA certificate rejected: {e}"))
        })?;
    }

    let (client_chain, client_key) = parse_pkcs12(client_pkcs12)?;

    let inner_verifier = WebPkiServerVerifier::builder(Arc::new(root_store))
        .build()
        .map_err(|e| ClipShareError::ConnectionFailure(format!("TLS verifier setup: {e}")))?;
    let verifier = Arc::new(PinnedCnVerifier {
        inner: inner_verifier,
        trusted_servers,
    });

    let config = ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(verifier)
        .with_client_auth_cert(client_chain, client_key)
        .map_err(|e| ClipShareError::ConnectionFailure(format!("client identity rejected: {e}")))?;

    Ok(Arc::new(config))
}

/// Parses a PKCS#12 blob (empty passphrase, per spec §4.1) into a leaf
/// certificate chain and its private key.
fn parse_pkcs12(der: &[u8]) -> Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>)> {
    let pfx = p12::PFX::parse(der)
        .map_err(|e| ClipShareError::ConnectionFailure(format!("invalid PKCS#12: {e:?}")))?;

    let cert_ders = pfx
        .cert_bags("")
        .map_err(|e| ClipShareError::ConnectionFailure(format!("PKCS#12 certs: {e:?}")))?;
    if cert_ders.is_empty() {
        return Err(ClipShareError::ConnectionFailure(
            "PKCS#12 contains no client certificate".into(),
        ));
    }
    let key_der = pfx
        .key_bags("")
        .map_err(|e| ClipShareError::ConnectionFailure(format!("PKCS#12 key: {e:?}")))?
        .into_iter()
        .next()
        .ok_or_else(|| ClipShareError::ConnectionFailure("PKCS#12 has no private key".into()))?;

    let chain = cert_ders
        .into_iter()
        .map(CertificateDer::from)
        .collect::<Vec<_>>();
    let key = PrivateKeyDer::try_from(key_der)
        .map_err(|e| ClipShareError::ConnectionFailure(format!("unsupported key format: {e}")))?;

    Ok((chain, key))
}

/// Extracts the Subject Common Name from a DER-encoded leaf certificate.
pub fn leaf_common_name(leaf: &CertificateDer<'_>) -> Result<String> {
    let (_, cert) = x509_parser::parse_x509_certificate(leaf.as_ref())
        .map_err(|e| ClipShareError::ConnectionFailure(format!("malformed peer certificate: {e}")))?;
    cert.subject()
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .map(|s| s.to_owned())
        .ok_or_else(|| ClipShareError::ConnectionFailure("peer certificate has no CN".into()))
}

/// Validates the certificate chain cryptographically (delegating to
/// `rustls`'s standard webpki path-building verifier) and additionally
/// requires the leaf's Subject CN to be in the caller's allow-list. The
/// inner verifier is driven against a `ServerName` built from the leaf's
/// own CN: the spec pins identity by CN rather than by the dialed address
/// (servers are discovered by broadcast, so the dialed address carries no
/// meaningful hostname), and the CN allow-list check below is what
/// actually enforces trust, not the synthetic name match.
#[derive(Debug)]
struct PinnedCnVerifier {
    inner: Arc<WebPkiServerVerifier>,
    trusted_servers: HashSet<String>,
}

impl ServerCertVerifier for PinnedCnVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, TlsError> {
        let cn = leaf_common_name(end_entity)
            .map_err(|e| TlsError::General(e.to_string()))?;
        if !self.trusted_servers.contains(&cn) {
            return Err(TlsError::General(format!(
                "peer CN '{cn}' is not in the trusted-servers allow-list"
            )));
        }
        let synthetic_name = ServerName::try_from(cn)
            .map_err(|e| TlsError::General(format!("CN is not a valid server name: {e}")))?;
        self.inner.verify_server_cert(
            end_entity,
            intermediates,
            &synthetic_name,
            ocsp_response,
            now,
        )
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, TlsError> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, TlsError> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}
