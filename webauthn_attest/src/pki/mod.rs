//! X.509 certificate details and chain validation.

mod certificate;
mod chain;
mod extensions;

pub use certificate::{
    Certificate, CertificateDetails, CertificateExtension, OID_COMMON_NAME, OID_COUNTRY_NAME,
    OID_ORGANIZATION_NAME, OID_ORGANIZATIONAL_UNIT, SubjectPublicKeyInfo,
};
pub use chain::{ChainValidator, DEFAULT_MAX_CHAIN_DEPTH, TrustAnchorValidator};
pub use extensions::{
    AndroidKeyDescription, AuthorizationList, KM_ORIGIN_GENERATED, KM_PURPOSE_SIGN,
    OID_ANDROID_KEY_ATTESTATION, OID_APPLE_NONCE, OID_BASIC_CONSTRAINTS, OID_EXTENDED_KEY_USAGE,
    OID_FIDO_GEN_CE_AAGUID, OID_SUBJECT_ALT_NAME, OID_TCG_AT_TPM_MANUFACTURER,
    OID_TCG_AT_TPM_MODEL, OID_TCG_AT_TPM_VERSION, OID_TCG_KP_AIK_CERTIFICATE, TpmDeviceAttributes,
};
pub(crate) use extensions::{parse_aaguid_extension, parse_apple_nonce};
