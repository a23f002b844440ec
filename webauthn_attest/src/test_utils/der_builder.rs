//! Self-signed and CA-issued test certificates plus the extension payloads
//! attestation verifiers look for.

use crate::cose::der::{self, TAG_SEQUENCE, octet_string, sequence, tlv};
use crate::cose::EcCurve;
use crate::crypto::PublicKeyMaterial;
use crate::pki::{
    OID_BASIC_CONSTRAINTS, OID_COUNTRY_NAME, OID_TCG_AT_TPM_MANUFACTURER, OID_TCG_AT_TPM_MODEL,
    OID_TCG_AT_TPM_VERSION,
};

use super::TestKeyPair;

const TAG_BOOLEAN: u8 = 0x01;
const TAG_ENUMERATED: u8 = 0x0a;
const TAG_UTF8_STRING: u8 = 0x0c;
const TAG_PRINTABLE_STRING: u8 = 0x13;
const TAG_UTC_TIME: u8 = 0x17;
const TAG_SET: u8 = 0x31;

const OID_ECDSA_WITH_SHA256: &str = "1.2.840.10045.4.3.2";
const OID_ECDSA_WITH_SHA384: &str = "1.2.840.10045.4.3.3";
const OID_ED25519: &str = "1.3.101.112";

/// Encodes a dotted OID string as a DER OBJECT IDENTIFIER.
pub(crate) fn oid(dotted: &str) -> Vec<u8> {
    let arcs: Vec<u64> = dotted.split('.').map(|arc| arc.parse().unwrap()).collect();
    let mut content = Vec::new();
    let mut push_arc = |mut value: u64| {
        let mut chunk = vec![(value & 0x7f) as u8];
        value >>= 7;
        while value > 0 {
            chunk.push(0x80 | (value & 0x7f) as u8);
            value >>= 7;
        }
        chunk.reverse();
        content.extend_from_slice(&chunk);
    };
    push_arc(arcs[0] * 40 + arcs[1]);
    for arc in &arcs[2..] {
        push_arc(*arc);
    }
    der::oid(&content)
}

fn small_integer(value: u8) -> Vec<u8> {
    tlv(der::TAG_INTEGER, &[value])
}

fn name(attributes: &[(String, String)]) -> Vec<u8> {
    let rdns: Vec<Vec<u8>> = attributes
        .iter()
        .map(|(attr_oid, value)| {
            let string_tag = if attr_oid == OID_COUNTRY_NAME {
                TAG_PRINTABLE_STRING
            } else {
                TAG_UTF8_STRING
            };
            let atv = sequence(&[&oid(attr_oid), &tlv(string_tag, value.as_bytes())]);
            tlv(TAG_SET, &atv)
        })
        .collect();
    tlv(TAG_SEQUENCE, &rdns.concat())
}

/// Assembles X.509 certificates signed by a [`TestKeyPair`].
///
/// Defaults: version 3, empty subject, issuer `CN=Test CA`, valid from
/// 2020 to the end of 2049.
#[derive(Clone, Default)]
pub(crate) struct CertificateBuilder {
    subject: Vec<(String, String)>,
    issuer: Vec<(String, String)>,
    extensions: Vec<(String, bool, Vec<u8>)>,
    version1: bool,
}

impl CertificateBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn subject_attribute(mut self, attr_oid: &str, value: &str) -> Self {
        self.subject.push((attr_oid.to_string(), value.to_string()));
        self
    }

    pub(crate) fn issuer_attribute(mut self, attr_oid: &str, value: &str) -> Self {
        self.issuer.push((attr_oid.to_string(), value.to_string()));
        self
    }

    pub(crate) fn basic_constraints(self, ca: bool) -> Self {
        let value = if ca {
            sequence(&[&tlv(TAG_BOOLEAN, &[0xff])])
        } else {
            sequence(&[])
        };
        self.extension(OID_BASIC_CONSTRAINTS, true, value)
    }

    /// CA with a pathLenConstraint.
    pub(crate) fn basic_constraints_path_len(self, path_len: u8) -> Self {
        let value = sequence(&[&tlv(TAG_BOOLEAN, &[0xff]), &small_integer(path_len)]);
        self.extension(OID_BASIC_CONSTRAINTS, true, value)
    }

    /// Emits a v1 certificate; extensions are dropped.
    pub(crate) fn version1(mut self) -> Self {
        self.version1 = true;
        self
    }

    /// Adds an extension, replacing any earlier one with the same OID.
    pub(crate) fn extension(mut self, ext_oid: &str, critical: bool, value: Vec<u8>) -> Self {
        self.extensions.retain(|(existing, _, _)| existing != ext_oid);
        self.extensions.push((ext_oid.to_string(), critical, value));
        self
    }

    pub(crate) fn build(&self, spki_der: &[u8], issuer_key: &TestKeyPair) -> Vec<u8> {
        let signature_algorithm = match issuer_key.material() {
            PublicKeyMaterial::Ec {
                curve: EcCurve::P384,
                ..
            } => OID_ECDSA_WITH_SHA384,
            PublicKeyMaterial::Ed25519 { .. } => OID_ED25519,
            _ => OID_ECDSA_WITH_SHA256,
        };
        let algorithm_identifier = sequence(&[&oid(signature_algorithm)]);

        let issuer = if self.issuer.is_empty() {
            vec![("2.5.4.3".to_string(), "Test CA".to_string())]
        } else {
            self.issuer.clone()
        };
        let validity = sequence(&[
            &tlv(TAG_UTC_TIME, b"200101000000Z"),
            &tlv(TAG_UTC_TIME, b"491231235959Z"),
        ]);

        let mut tbs_fields: Vec<Vec<u8>> = Vec::new();
        if !self.version1 {
            tbs_fields.push(tlv(0xa0, &small_integer(2)));
        }
        tbs_fields.push(small_integer(0x01));
        tbs_fields.push(algorithm_identifier.clone());
        tbs_fields.push(name(&issuer));
        tbs_fields.push(validity);
        tbs_fields.push(name(&self.subject));
        tbs_fields.push(spki_der.to_vec());
        if !self.version1 && !self.extensions.is_empty() {
            let extensions: Vec<Vec<u8>> = self
                .extensions
                .iter()
                .map(|(ext_oid, critical, value)| {
                    let mut fields = oid(ext_oid);
                    if *critical {
                        fields.extend_from_slice(&tlv(TAG_BOOLEAN, &[0xff]));
                    }
                    fields.extend_from_slice(&octet_string(value));
                    tlv(TAG_SEQUENCE, &fields)
                })
                .collect();
            tbs_fields.push(tlv(0xa3, &tlv(TAG_SEQUENCE, &extensions.concat())));
        }
        let tbs = tlv(TAG_SEQUENCE, &tbs_fields.concat());

        let signature = issuer_key.sign(&tbs);
        sequence(&[&tbs, &algorithm_identifier, &der::bit_string(&signature)])
    }
}

/// fido-gen-ce-aaguid value.
pub(crate) fn aaguid_extension(aaguid: &[u8; 16]) -> Vec<u8> {
    octet_string(aaguid)
}

/// Apple nonce value: `SEQUENCE { [1] { OCTET STRING nonce } }`.
pub(crate) fn apple_nonce_extension(nonce: &[u8]) -> Vec<u8> {
    sequence(&[&tlv(0xa1, &octet_string(nonce))])
}

/// ExtKeyUsageSyntax listing `usages`.
pub(crate) fn extended_key_usage_extension(usages: &[&str]) -> Vec<u8> {
    let oids: Vec<Vec<u8>> = usages.iter().map(|usage| oid(usage)).collect();
    tlv(TAG_SEQUENCE, &oids.concat())
}

/// SubjectAltName with a directoryName carrying the TCG device attributes.
pub(crate) fn tpm_san_extension(manufacturer: &str, model: &str, version: &str) -> Vec<u8> {
    let rdns: Vec<Vec<u8>> = [
        (OID_TCG_AT_TPM_MANUFACTURER, manufacturer),
        (OID_TCG_AT_TPM_MODEL, model),
        (OID_TCG_AT_TPM_VERSION, version),
    ]
    .iter()
    .map(|(attr_oid, value)| {
        let atv = sequence(&[&oid(attr_oid), &tlv(TAG_UTF8_STRING, value.as_bytes())]);
        tlv(TAG_SET, &atv)
    })
    .collect();
    let directory_name = tlv(0xa4, &tlv(TAG_SEQUENCE, &rdns.concat()));
    sequence(&[&directory_name])
}

/// Android KeyDescription.
///
/// `tee_generated_sign` puts purpose=SIGN and origin=GENERATED in the TEE
/// list (otherwise the key is marked as imported); `software_all_apps` adds
/// allApplications to the software list.
pub(crate) fn android_key_description(
    challenge: &[u8],
    tee_generated_sign: bool,
    software_all_apps: bool,
) -> Vec<u8> {
    let purpose_sign = tlv(0xa1, &tlv(TAG_SET, &small_integer(2)));
    let origin = if tee_generated_sign { 0 } else { 2 };
    // [702] origin, high tag number form
    let mut origin_entry = vec![0xbf, 0x85, 0x3e];
    let origin_value = small_integer(origin);
    origin_entry.push(origin_value.len() as u8);
    origin_entry.extend_from_slice(&origin_value);
    let tee_enforced = sequence(&[&purpose_sign, &origin_entry]);

    let software_enforced = if software_all_apps {
        // [600] allApplications NULL
        sequence(&[&[0xbf, 0x84, 0x58, 0x02, 0x05, 0x00]])
    } else {
        sequence(&[])
    };

    sequence(&[
        &small_integer(3),
        &tlv(TAG_ENUMERATED, &[1]),
        &small_integer(4),
        &tlv(TAG_ENUMERATED, &[1]),
        &octet_string(challenge),
        &octet_string(&[]),
        &software_enforced,
        &tee_enforced,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oid_encoding() {
        assert_eq!(oid("2.5.29.19"), vec![0x06, 0x03, 0x55, 0x1d, 0x13]);
        assert_eq!(
            oid("1.2.840.10045.2.1"),
            vec![0x06, 0x07, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x02, 0x01]
        );
    }
}
