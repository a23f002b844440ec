use oid_registry::{
    OID_X509_EXT_BASIC_CONSTRAINTS, OID_X509_EXT_EXTENDED_KEY_USAGE, OID_X509_EXT_SUBJECT_ALT_NAME,
};
use x509_parser::certificate::X509Certificate;
use x509_parser::extensions::ParsedExtension;
use x509_parser::pem::parse_x509_pem;
use x509_parser::prelude::FromDer;
use x509_parser::x509::SubjectPublicKeyInfo as X509PublicKeyInfo;

use crate::buffer::ByteBuffer;
use crate::cose::der::pem_encode;
use crate::cose::{CoseAlgorithm, EcCurve};
use crate::crypto::{self, PublicKeyMaterial};
use crate::errors::WebauthnError;

use super::extensions::{TpmDeviceAttributes, extended_key_usage_oids};

pub const OID_COMMON_NAME: &str = "2.5.4.3";
pub const OID_COUNTRY_NAME: &str = "2.5.4.6";
pub const OID_ORGANIZATION_NAME: &str = "2.5.4.10";
pub const OID_ORGANIZATIONAL_UNIT: &str = "2.5.4.11";

const OID_EC_PUBLIC_KEY: &str = "1.2.840.10045.2.1";
const OID_RSA_ENCRYPTION: &str = "1.2.840.113549.1.1.1";
const OID_ED25519: &str = "1.3.101.112";
const OID_CURVE_P256: &str = "1.2.840.10045.3.1.7";
const OID_CURVE_P384: &str = "1.3.132.0.34";
const OID_CURVE_P521: &str = "1.3.132.0.35";

/// An X.509 certificate from an attestation chain.
///
/// Owns the DER encoding and the details verifiers query; the DER is the
/// source of truth for chain validation and PEM export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    der: ByteBuffer,
    details: CertificateDetails,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateExtension {
    pub oid: String,
    pub critical: bool,
    pub value: ByteBuffer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectPublicKeyInfo {
    der: ByteBuffer,
    algorithm: String,
    parameters: Option<String>,
    key: ByteBuffer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateDetails {
    version: u32,
    subject: Vec<(String, String)>,
    extensions: Vec<CertificateExtension>,
    ca: bool,
    path_len_constraint: Option<u32>,
    extended_key_usage: Vec<String>,
    tpm_device_attributes: Option<TpmDeviceAttributes>,
    public_key: SubjectPublicKeyInfo,
    not_before: i64,
    not_after: i64,
}

impl Certificate {
    pub fn from_der(der: impl Into<Vec<u8>>) -> Result<Self, WebauthnError> {
        let der = der.into();
        let (rest, cert) = X509Certificate::from_der(&der).map_err(|e| {
            WebauthnError::Parse(format!("Failed to parse X.509 certificate: {e}"))
        })?;
        if !rest.is_empty() {
            return Err(WebauthnError::Parse(format!(
                "Unused bytes after X.509 certificate: {} bytes remaining",
                rest.len()
            )));
        }
        let details = CertificateDetails::from_x509(&cert)?;
        Ok(Self {
            der: ByteBuffer::new(der),
            details,
        })
    }

    pub fn from_pem(pem: &str) -> Result<Self, WebauthnError> {
        let (_, pem) = parse_x509_pem(pem.as_bytes())
            .map_err(|e| WebauthnError::Parse(format!("Failed to parse PEM certificate: {e}")))?;
        if pem.label != "CERTIFICATE" {
            return Err(WebauthnError::Parse(format!(
                "Unexpected PEM label: {}",
                pem.label
            )));
        }
        Self::from_der(pem.contents)
    }

    pub fn der(&self) -> &ByteBuffer {
        &self.der
    }

    pub fn to_pem(&self) -> String {
        pem_encode("CERTIFICATE", self.der.as_slice())
    }

    pub fn details(&self) -> &CertificateDetails {
        &self.details
    }

    pub fn public_key(&self) -> &SubjectPublicKeyInfo {
        &self.details.public_key
    }

    /// Verifies a signature made with this certificate's subject key.
    pub fn verify_signature(
        &self,
        data: &[u8],
        signature: &[u8],
        algorithm: CoseAlgorithm,
    ) -> Result<bool, WebauthnError> {
        let material = self.details.public_key.material()?;
        crypto::verify_signature(algorithm, material, data, signature)
    }
}

impl CertificateDetails {
    fn from_x509(cert: &X509Certificate<'_>) -> Result<Self, WebauthnError> {
        let subject = cert
            .subject()
            .iter_attributes()
            .map(|attr| {
                (
                    attr.attr_type().to_id_string(),
                    attr.as_str().unwrap_or_default().to_string(),
                )
            })
            .collect();

        let extensions = cert
            .extensions()
            .iter()
            .map(|ext| CertificateExtension {
                oid: ext.oid.to_id_string(),
                critical: ext.critical,
                value: ByteBuffer::from(ext.value),
            })
            .collect();

        let mut ca = false;
        let mut path_len_constraint = None;
        let mut extended_key_usage = Vec::new();
        let mut tpm_device_attributes = None;
        for ext in cert.extensions() {
            match ext.parsed_extension() {
                ParsedExtension::BasicConstraints(constraints) => {
                    ca = constraints.ca;
                    path_len_constraint = constraints.path_len_constraint;
                }
                ParsedExtension::ExtendedKeyUsage(eku) => {
                    extended_key_usage = extended_key_usage_oids(eku);
                }
                ParsedExtension::SubjectAlternativeName(san) => {
                    tpm_device_attributes = TpmDeviceAttributes::from_san(san)?;
                }
                _ => {
                    let inspected = [
                        &OID_X509_EXT_BASIC_CONSTRAINTS,
                        &OID_X509_EXT_EXTENDED_KEY_USAGE,
                        &OID_X509_EXT_SUBJECT_ALT_NAME,
                    ];
                    if inspected.iter().any(|oid| ext.oid.as_bytes() == oid.as_bytes()) {
                        return Err(WebauthnError::Parse(format!(
                            "Malformed certificate extension {}",
                            ext.oid.to_id_string()
                        )));
                    }
                }
            }
        }

        let validity = cert.validity();
        Ok(Self {
            version: cert.version().0 + 1,
            subject,
            extensions,
            ca,
            path_len_constraint,
            extended_key_usage,
            tpm_device_attributes,
            public_key: SubjectPublicKeyInfo::from_x509(cert.public_key()),
            not_before: validity.not_before.timestamp(),
            not_after: validity.not_after.timestamp(),
        })
    }

    /// X.509 version number (1, 2 or 3).
    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn subject(&self) -> &[(String, String)] {
        &self.subject
    }

    pub fn subject_is_empty(&self) -> bool {
        self.subject.is_empty()
    }

    pub fn subject_attribute(&self, oid: &str) -> Option<&str> {
        self.subject
            .iter()
            .find(|(o, _)| o == oid)
            .map(|(_, v)| v.as_str())
    }

    pub fn common_name(&self) -> Option<&str> {
        self.subject_attribute(OID_COMMON_NAME)
    }

    pub fn organizational_unit(&self) -> Option<&str> {
        self.subject_attribute(OID_ORGANIZATIONAL_UNIT)
    }

    pub fn extensions(&self) -> &[CertificateExtension] {
        &self.extensions
    }

    pub fn extension(&self, oid: &str) -> Option<&CertificateExtension> {
        self.extensions.iter().find(|ext| ext.oid == oid)
    }

    /// `cA` flag of the basic constraints extension; false when absent.
    pub fn is_ca(&self) -> bool {
        self.ca
    }

    /// Maximum number of intermediate CAs this CA may sign for.
    pub fn path_len_constraint(&self) -> Option<u32> {
        self.path_len_constraint
    }

    /// Extended key usage purposes as dotted OIDs; empty when absent.
    pub fn extended_key_usage(&self) -> &[String] {
        &self.extended_key_usage
    }

    pub fn has_extended_key_usage(&self, oid: &str) -> bool {
        self.extended_key_usage.iter().any(|usage| usage == oid)
    }

    pub fn tpm_device_attributes(&self) -> Option<&TpmDeviceAttributes> {
        self.tpm_device_attributes.as_ref()
    }

    pub fn not_before(&self) -> i64 {
        self.not_before
    }

    pub fn not_after(&self) -> i64 {
        self.not_after
    }
}

impl SubjectPublicKeyInfo {
    fn from_x509(spki: &X509PublicKeyInfo<'_>) -> Self {
        // only named curves carry an OID parameter
        let parameters = spki
            .algorithm
            .parameters
            .as_ref()
            .and_then(|params| params.as_oid().ok())
            .map(|oid| oid.to_id_string());
        Self {
            der: ByteBuffer::from(spki.raw),
            algorithm: spki.algorithm.algorithm.to_id_string(),
            parameters,
            key: ByteBuffer::new(spki.subject_public_key.data.to_vec()),
        }
    }

    /// Full SubjectPublicKeyInfo DER.
    pub fn der(&self) -> &ByteBuffer {
        &self.der
    }

    pub fn algorithm_oid(&self) -> &str {
        &self.algorithm
    }

    /// Content of the subjectPublicKey BIT STRING.
    pub fn key_bytes(&self) -> &ByteBuffer {
        &self.key
    }

    pub fn ec_curve(&self) -> Option<EcCurve> {
        if self.algorithm != OID_EC_PUBLIC_KEY {
            return None;
        }
        match self.parameters.as_deref() {
            Some(OID_CURVE_P256) => Some(EcCurve::P256),
            Some(OID_CURVE_P384) => Some(EcCurve::P384),
            Some(OID_CURVE_P521) => Some(EcCurve::P521),
            _ => None,
        }
    }

    pub fn is_rsa(&self) -> bool {
        self.algorithm == OID_RSA_ENCRYPTION
    }

    pub(crate) fn material(&self) -> Result<PublicKeyMaterial<'_>, WebauthnError> {
        if let Some(curve) = self.ec_curve() {
            return Ok(PublicKeyMaterial::Ec {
                curve,
                point: self.key.as_slice(),
            });
        }
        match self.algorithm.as_str() {
            OID_RSA_ENCRYPTION => Ok(PublicKeyMaterial::RsaPkcs1 {
                der: self.key.as_slice(),
            }),
            OID_ED25519 => Ok(PublicKeyMaterial::Ed25519 {
                key: self.key.as_slice(),
            }),
            other => Err(WebauthnError::Unsupported(format!(
                "Certificate public key algorithm {other} ({:?})",
                self.parameters
            ))),
        }
    }
}
