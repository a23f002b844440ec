use std::sync::Arc;

use x509_parser::certificate::X509Certificate;
use x509_parser::prelude::FromDer;

use crate::clock::{Clock, SystemClock};
use crate::errors::WebauthnError;

use super::certificate::Certificate;

pub const DEFAULT_MAX_CHAIN_DEPTH: usize = 5;

/// Decides whether an attestation certificate chain (leaf first) is trusted.
pub trait ChainValidator: Send + Sync {
    fn validate(&self, chain: &[Certificate]) -> Result<(), WebauthnError>;
}

/// Validates a chain against a fixed set of trust anchors.
///
/// Checks the depth limit, the validity window of every certificate at the
/// clock's current time, each issuer signature along the chain and that the
/// last certificate is an anchor or is signed by one. Every issuer, anchors
/// included, must be a CA whose path length constraint admits the
/// intermediates below it.
pub struct TrustAnchorValidator {
    anchors: Vec<Certificate>,
    max_depth: usize,
    clock: Arc<dyn Clock>,
}

impl TrustAnchorValidator {
    pub fn new(anchors: Vec<Certificate>) -> Self {
        Self {
            anchors,
            max_depth: DEFAULT_MAX_CHAIN_DEPTH,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn check_validity(&self, cert: &Certificate, now: i64) -> Result<(), WebauthnError> {
        let details = cert.details();
        if now < details.not_before() || now > details.not_after() {
            return Err(WebauthnError::Verification(format!(
                "Certificate '{}' is not valid at the current time",
                details.common_name().unwrap_or("<no CN>")
            )));
        }
        Ok(())
    }
}

/// `intermediates` is the number of non-leaf certificates the issuer signs for.
fn check_issuer(issuer: &Certificate, intermediates: usize) -> Result<(), WebauthnError> {
    let details = issuer.details();
    let name = details.common_name().unwrap_or("<no CN>");
    if !details.is_ca() {
        tracing::debug!("Issuer '{}' lacks basicConstraints cA=true", name);
        return Err(WebauthnError::Verification(format!(
            "Certificate '{name}' issues other certificates but is not a CA"
        )));
    }
    if let Some(path_len) = details.path_len_constraint() {
        if intermediates > path_len as usize {
            return Err(WebauthnError::Verification(format!(
                "Certificate chain exceeds the path length constraint of '{name}'"
            )));
        }
    }
    Ok(())
}

fn parse(cert: &Certificate) -> Result<X509Certificate<'_>, WebauthnError> {
    X509Certificate::from_der(cert.der().as_slice())
        .map(|(_, parsed)| parsed)
        .map_err(|e| WebauthnError::Parse(format!("Failed to parse X.509 certificate: {e}")))
}

fn is_signed_by(subject: &Certificate, issuer: &Certificate) -> Result<bool, WebauthnError> {
    let subject = parse(subject)?;
    let issuer = parse(issuer)?;
    Ok(subject.verify_signature(Some(issuer.public_key())).is_ok())
}

impl ChainValidator for TrustAnchorValidator {
    fn validate(&self, chain: &[Certificate]) -> Result<(), WebauthnError> {
        if chain.is_empty() {
            return Err(WebauthnError::Verification(
                "Certificate chain is empty".to_string(),
            ));
        }
        if chain.len() > self.max_depth {
            return Err(WebauthnError::Verification(format!(
                "Certificate chain length {} exceeds the maximum depth of {}",
                chain.len(),
                self.max_depth
            )));
        }
        if self.anchors.is_empty() {
            return Err(WebauthnError::Config(
                "No trust anchors configured for chain validation".to_string(),
            ));
        }

        let now = self.clock.now().timestamp();
        for cert in chain {
            self.check_validity(cert, now)?;
        }

        for (index, pair) in chain.windows(2).enumerate() {
            if !is_signed_by(&pair[0], &pair[1])? {
                return Err(WebauthnError::Verification(
                    "Certificate chain is broken: issuer signature does not verify".to_string(),
                ));
            }
            check_issuer(&pair[1], index)?;
        }

        let Some(last) = chain.last() else {
            return Err(WebauthnError::Verification(
                "Certificate chain is empty".to_string(),
            ));
        };
        if self.anchors.iter().any(|anchor| anchor == last) {
            return Ok(());
        }
        for anchor in &self.anchors {
            if is_signed_by(last, anchor)? {
                self.check_validity(anchor, now)?;
                check_issuer(anchor, chain.len() - 1)?;
                return Ok(());
            }
        }

        tracing::debug!("Certificate chain does not terminate at a trust anchor");
        Err(WebauthnError::Verification(
            "Certificate chain does not terminate at a trusted root".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::test_utils::TestKeyPair;
    use crate::test_utils::der_builder::CertificateBuilder;

    struct Pki {
        root: Certificate,
        intermediate: Certificate,
        leaf: Certificate,
    }

    fn pki() -> Pki {
        let root_key = TestKeyPair::p256();
        let intermediate_key = TestKeyPair::p256();
        let leaf_key = TestKeyPair::p256();
        let root = CertificateBuilder::new()
            .subject_attribute("2.5.4.3", "Root")
            .issuer_attribute("2.5.4.3", "Root")
            .basic_constraints(true)
            .build(&root_key.spki_der(), &root_key);
        let intermediate = CertificateBuilder::new()
            .subject_attribute("2.5.4.3", "Intermediate")
            .issuer_attribute("2.5.4.3", "Root")
            .basic_constraints(true)
            .build(&intermediate_key.spki_der(), &root_key);
        let leaf = CertificateBuilder::new()
            .subject_attribute("2.5.4.3", "Leaf")
            .issuer_attribute("2.5.4.3", "Intermediate")
            .build(&leaf_key.spki_der(), &intermediate_key);
        Pki {
            root: Certificate::from_der(root).unwrap(),
            intermediate: Certificate::from_der(intermediate).unwrap(),
            leaf: Certificate::from_der(leaf).unwrap(),
        }
    }

    fn clock_2030() -> Arc<dyn Clock> {
        Arc::new(FixedClock::from_timestamp_millis(1_893_456_000_000).unwrap())
    }

    #[test]
    fn test_chain_to_anchor() {
        let pki = pki();
        let validator = TrustAnchorValidator::new(vec![pki.root.clone()]).with_clock(clock_2030());
        validator
            .validate(&[pki.leaf.clone(), pki.intermediate.clone()])
            .unwrap();
        validator
            .validate(&[pki.leaf.clone(), pki.intermediate.clone(), pki.root.clone()])
            .unwrap();
    }

    #[test]
    fn test_untrusted_root() {
        let fixture = pki();
        let other = pki();
        let validator = TrustAnchorValidator::new(vec![other.root]).with_clock(clock_2030());
        let err = validator
            .validate(&[fixture.leaf, fixture.intermediate])
            .unwrap_err();
        assert!(err.to_string().contains("trusted root"));
    }

    #[test]
    fn test_broken_chain() {
        let pki = pki();
        let validator = TrustAnchorValidator::new(vec![pki.root.clone()]).with_clock(clock_2030());
        let err = validator.validate(&[pki.leaf, pki.root]).unwrap_err();
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn test_expired_and_depth() {
        let pki = pki();
        // 2060 is past the builder's notAfter
        let late: Arc<dyn Clock> =
            Arc::new(FixedClock::from_timestamp_millis(2_840_140_800_000).unwrap());
        let validator = TrustAnchorValidator::new(vec![pki.root.clone()]).with_clock(late);
        assert!(validator.validate(&[pki.leaf.clone(), pki.intermediate.clone()]).is_err());

        let validator = TrustAnchorValidator::new(vec![pki.root.clone()])
            .with_clock(clock_2030())
            .with_max_depth(1);
        let err = validator
            .validate(&[pki.leaf, pki.intermediate])
            .unwrap_err();
        assert!(err.to_string().contains("maximum depth"));
    }

    #[test]
    fn test_no_anchors_is_configuration_error() {
        let pki = pki();
        let validator = TrustAnchorValidator::new(Vec::new());
        let err = validator.validate(&[pki.leaf]).unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::Configuration);
    }

    #[test]
    fn test_end_entity_cannot_issue() {
        let root_key = TestKeyPair::p256();
        let device_key = TestKeyPair::p256();
        let minted_key = TestKeyPair::p256();
        let root = CertificateBuilder::new()
            .subject_attribute("2.5.4.3", "Root")
            .issuer_attribute("2.5.4.3", "Root")
            .basic_constraints(true)
            .build(&root_key.spki_der(), &root_key);
        let device = CertificateBuilder::new()
            .subject_attribute("2.5.4.3", "Device")
            .issuer_attribute("2.5.4.3", "Root")
            .basic_constraints(false)
            .build(&device_key.spki_der(), &root_key);
        let minted = CertificateBuilder::new()
            .subject_attribute("2.5.4.3", "attest.android.com")
            .issuer_attribute("2.5.4.3", "Device")
            .build(&minted_key.spki_der(), &device_key);
        let root = Certificate::from_der(root).unwrap();
        let device = Certificate::from_der(device).unwrap();
        let minted = Certificate::from_der(minted).unwrap();

        let validator = TrustAnchorValidator::new(vec![root]).with_clock(clock_2030());
        validator.validate(&[device.clone()]).unwrap();
        let err = validator.validate(&[minted.clone(), device.clone()]).unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::Verification);
        assert!(err.to_string().contains("not a CA"));

        // same when the end-entity certificate is configured as the anchor
        let validator = TrustAnchorValidator::new(vec![device]).with_clock(clock_2030());
        assert!(validator.validate(&[minted]).unwrap_err().to_string().contains("not a CA"));
    }

    #[test]
    fn test_path_length_constraint() {
        let root_key = TestKeyPair::p256();
        let intermediate_key = TestKeyPair::p256();
        let leaf_key = TestKeyPair::p256();
        let root = CertificateBuilder::new()
            .subject_attribute("2.5.4.3", "Root")
            .issuer_attribute("2.5.4.3", "Root")
            .basic_constraints_path_len(0)
            .build(&root_key.spki_der(), &root_key);
        let intermediate = CertificateBuilder::new()
            .subject_attribute("2.5.4.3", "Intermediate")
            .issuer_attribute("2.5.4.3", "Root")
            .basic_constraints(true)
            .build(&intermediate_key.spki_der(), &root_key);
        let leaf = CertificateBuilder::new()
            .subject_attribute("2.5.4.3", "Leaf")
            .issuer_attribute("2.5.4.3", "Intermediate")
            .build(&leaf_key.spki_der(), &intermediate_key);
        let root = Certificate::from_der(root).unwrap();
        let intermediate = Certificate::from_der(intermediate).unwrap();
        let leaf = Certificate::from_der(leaf).unwrap();

        let validator = TrustAnchorValidator::new(vec![root]).with_clock(clock_2030());
        validator.validate(&[intermediate.clone()]).unwrap();
        let err = validator.validate(&[leaf, intermediate]).unwrap_err();
        assert!(err.to_string().contains("path length"));
    }
}
