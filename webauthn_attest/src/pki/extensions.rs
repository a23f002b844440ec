//! Decoders for the X.509 extension payloads attestation verifiers inspect.

use std::fmt::Display;

use x509_parser::der_parser::ber::{BerObject, BerObjectContent};
use x509_parser::der_parser::der::{Class, parse_der, parse_der_octetstring};
use x509_parser::extensions::{ExtendedKeyUsage, GeneralName, SubjectAlternativeName};
use x509_parser::x509::X509Name;

use crate::errors::WebauthnError;

pub const OID_BASIC_CONSTRAINTS: &str = "2.5.29.19";
pub const OID_SUBJECT_ALT_NAME: &str = "2.5.29.17";
pub const OID_EXTENDED_KEY_USAGE: &str = "2.5.29.37";
/// id-fido-gen-ce-aaguid
pub const OID_FIDO_GEN_CE_AAGUID: &str = "1.3.6.1.4.1.45724.1.1.4";
pub const OID_ANDROID_KEY_ATTESTATION: &str = "1.3.6.1.4.1.11129.2.1.17";
pub const OID_APPLE_NONCE: &str = "1.2.840.113635.100.8.2";
pub const OID_TCG_KP_AIK_CERTIFICATE: &str = "2.23.133.8.3";
pub const OID_TCG_AT_TPM_MANUFACTURER: &str = "2.23.133.2.1";
pub const OID_TCG_AT_TPM_MODEL: &str = "2.23.133.2.2";
pub const OID_TCG_AT_TPM_VERSION: &str = "2.23.133.2.3";

const OID_KP_ANY: &str = "2.5.29.37.0";
const OID_KP_SERVER_AUTH: &str = "1.3.6.1.5.5.7.3.1";
const OID_KP_CLIENT_AUTH: &str = "1.3.6.1.5.5.7.3.2";
const OID_KP_CODE_SIGNING: &str = "1.3.6.1.5.5.7.3.3";
const OID_KP_EMAIL_PROTECTION: &str = "1.3.6.1.5.5.7.3.4";
const OID_KP_TIME_STAMPING: &str = "1.3.6.1.5.5.7.3.8";
const OID_KP_OCSP_SIGNING: &str = "1.3.6.1.5.5.7.3.9";

/// Keymaster tag numbers used in AuthorizationList.
const KM_TAG_PURPOSE: u32 = 1;
const KM_TAG_ALL_APPLICATIONS: u32 = 600;
const KM_TAG_ORIGIN: u32 = 702;

pub const KM_ORIGIN_GENERATED: u64 = 0;
pub const KM_PURPOSE_SIGN: u64 = 2;

fn malformed<E: Display>(what: &'static str) -> impl Fn(E) -> WebauthnError {
    move |e| WebauthnError::Parse(format!("Malformed {what}: {e}"))
}

/// Parses exactly one DER object from `value`.
fn parse_single<'a>(value: &'a [u8], what: &'static str) -> Result<BerObject<'a>, WebauthnError> {
    let (rest, object) = parse_der(value).map_err(malformed(what))?;
    if !rest.is_empty() {
        return Err(WebauthnError::Parse(format!(
            "Malformed {what}: {} trailing bytes",
            rest.len()
        )));
    }
    Ok(object)
}

/// Dotted OIDs of an ExtKeyUsageSyntax; the well-known purposes x509-parser
/// folds into flags are listed first.
pub(crate) fn extended_key_usage_oids(eku: &ExtendedKeyUsage<'_>) -> Vec<String> {
    [
        (eku.any, OID_KP_ANY),
        (eku.server_auth, OID_KP_SERVER_AUTH),
        (eku.client_auth, OID_KP_CLIENT_AUTH),
        (eku.code_signing, OID_KP_CODE_SIGNING),
        (eku.email_protection, OID_KP_EMAIL_PROTECTION),
        (eku.time_stamping, OID_KP_TIME_STAMPING),
        (eku.ocsp_signing, OID_KP_OCSP_SIGNING),
    ]
    .into_iter()
    .filter_map(|(set, oid)| set.then(|| oid.to_string()))
    .chain(eku.other.iter().map(|oid| oid.to_id_string()))
    .collect()
}

/// fido-gen-ce-aaguid payload: OCTET STRING of 16 bytes.
pub(crate) fn parse_aaguid_extension(value: &[u8]) -> Result<[u8; 16], WebauthnError> {
    let (rest, octets) = parse_der_octetstring(value).map_err(malformed("AAGUID extension"))?;
    if !rest.is_empty() {
        return Err(WebauthnError::Parse(
            "Malformed AAGUID extension: trailing bytes".to_string(),
        ));
    }
    let content = octets.as_slice().map_err(malformed("AAGUID extension"))?;
    content.try_into().map_err(|_| {
        WebauthnError::Parse(format!(
            "AAGUID extension must hold 16 bytes, got {}",
            content.len()
        ))
    })
}

/// Apple anonymous attestation nonce: `SEQUENCE { [1] EXPLICIT OCTET STRING }`.
pub(crate) fn parse_apple_nonce(value: &[u8]) -> Result<Vec<u8>, WebauthnError> {
    let object = parse_single(value, "Apple nonce extension")?;
    let fields = object.as_sequence().map_err(malformed("Apple nonce extension"))?;
    let tagged = fields
        .first()
        .filter(|field| field.header.class() == Class::ContextSpecific && field.tag().0 == 1);
    let Some(BerObjectContent::Unknown(any)) = tagged.map(|field| &field.content) else {
        return Err(WebauthnError::Parse(
            "Apple nonce extension must contain a [1] tagged value".to_string(),
        ));
    };
    let (_, nonce) = parse_der_octetstring(any.data).map_err(malformed("Apple nonce"))?;
    Ok(nonce.as_slice().map_err(malformed("Apple nonce"))?.to_vec())
}

/// Content of a context-specific `[n] EXPLICIT` entry.
fn explicit_inner<'a>(entry: &BerObject<'a>) -> Result<BerObject<'a>, WebauthnError> {
    match &entry.content {
        BerObjectContent::Unknown(any) => parse_single(any.data, "AuthorizationList entry"),
        _ => Err(WebauthnError::Parse(format!(
            "AuthorizationList entry [{}] is not explicitly tagged",
            entry.tag().0
        ))),
    }
}

/// The subset of a Keymaster AuthorizationList the verifier checks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizationList {
    pub purpose: Vec<u64>,
    pub all_applications: bool,
    pub origin: Option<u64>,
}

impl AuthorizationList {
    fn from_ber(object: &BerObject<'_>) -> Result<Self, WebauthnError> {
        let entries = object.as_sequence().map_err(malformed("AuthorizationList"))?;
        let mut list = AuthorizationList::default();
        for entry in entries {
            if entry.header.class() != Class::ContextSpecific {
                continue;
            }
            match entry.tag().0 {
                KM_TAG_PURPOSE => {
                    let set = explicit_inner(entry)?;
                    for purpose in set.as_set().map_err(malformed("Keymaster purpose"))? {
                        list.purpose
                            .push(purpose.as_u64().map_err(malformed("Keymaster purpose"))?);
                    }
                }
                KM_TAG_ALL_APPLICATIONS => list.all_applications = true,
                KM_TAG_ORIGIN => {
                    let origin = explicit_inner(entry)?;
                    list.origin = Some(origin.as_u64().map_err(malformed("Keymaster origin"))?);
                }
                _ => {}
            }
        }
        Ok(list)
    }

    /// Key was generated in the keystore and may only be used for signing.
    pub fn is_generated_signing_key(&self) -> bool {
        self.origin == Some(KM_ORIGIN_GENERATED) && self.purpose.contains(&KM_PURPOSE_SIGN)
    }
}

/// Android KeyDescription (key attestation extension).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AndroidKeyDescription {
    pub attestation_version: u64,
    pub attestation_security_level: u64,
    pub attestation_challenge: Vec<u8>,
    pub software_enforced: AuthorizationList,
    pub tee_enforced: AuthorizationList,
}

impl AndroidKeyDescription {
    pub(crate) fn parse(value: &[u8]) -> Result<Self, WebauthnError> {
        let object = parse_single(value, "Android key description")?;
        let fields = object
            .as_sequence()
            .map_err(malformed("Android key description"))?;
        // version, security level, keymaster version, keymaster security
        // level, challenge, uniqueId, softwareEnforced, teeEnforced
        let [
            version,
            security_level,
            _,
            _,
            challenge,
            _,
            software_enforced,
            tee_enforced,
        ] = fields.as_slice()
        else {
            return Err(WebauthnError::Parse(format!(
                "Android key description must have 8 fields, got {}",
                fields.len()
            )));
        };

        Ok(Self {
            attestation_version: version
                .as_u64()
                .map_err(malformed("attestationVersion"))?,
            attestation_security_level: security_level
                .as_u64()
                .map_err(malformed("attestationSecurityLevel"))?,
            attestation_challenge: challenge
                .as_slice()
                .map_err(malformed("attestationChallenge"))?
                .to_vec(),
            software_enforced: AuthorizationList::from_ber(software_enforced)?,
            tee_enforced: AuthorizationList::from_ber(tee_enforced)?,
        })
    }
}

/// TPM device attributes from the SubjectAltName directoryName.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TpmDeviceAttributes {
    pub manufacturer: String,
    pub model: String,
    pub version: String,
}

impl TpmDeviceAttributes {
    /// Collects the TCG attributes from every directoryName; `None` unless
    /// all three are present.
    pub(crate) fn from_san(
        san: &SubjectAlternativeName<'_>,
    ) -> Result<Option<Self>, WebauthnError> {
        let mut manufacturer = None;
        let mut model = None;
        let mut version = None;
        let names = san.general_names.iter().filter_map(|name| match name {
            GeneralName::DirectoryName(name) => Some(name),
            _ => None,
        });
        for name in names {
            for (oid, value) in directory_attributes(name)? {
                match oid.as_str() {
                    OID_TCG_AT_TPM_MANUFACTURER => manufacturer = Some(value),
                    OID_TCG_AT_TPM_MODEL => model = Some(value),
                    OID_TCG_AT_TPM_VERSION => version = Some(value),
                    _ => {}
                }
            }
        }
        Ok(match (manufacturer, model, version) {
            (Some(manufacturer), Some(model), Some(version)) => Some(Self {
                manufacturer,
                model,
                version,
            }),
            _ => None,
        })
    }
}

fn directory_attributes(name: &X509Name<'_>) -> Result<Vec<(String, String)>, WebauthnError> {
    name.iter_attributes()
        .map(|attr| {
            let value = attr
                .as_str()
                .map_err(malformed("SubjectAltName directoryName"))?;
            Ok((attr.attr_type().to_id_string(), value.to_string()))
        })
        .collect()
}
