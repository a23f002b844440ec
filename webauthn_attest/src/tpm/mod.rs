//! TPM 2.0 structures carried by the `tpm` attestation format
//! (TPMT_PUBLIC and TPMS_ATTEST, TPM 2.0 Library Part 2).

mod attest;
mod cursor;
mod public;

pub use attest::TpmAttest;
pub use public::{EccParameters, RsaParameters, TpmKeyParameters, TpmPublic, TpmUnique};

use crate::cose::{EcCurve, HashAlgorithm};

pub const TPM_GENERATED_VALUE: u32 = 0xff54_4347;
pub const TPM_ST_ATTEST_CERTIFY: u16 = 0x8017;

pub const TPM_ALG_RSA: u16 = 0x0001;
pub const TPM_ALG_SHA1: u16 = 0x0004;
pub const TPM_ALG_SHA256: u16 = 0x000b;
pub const TPM_ALG_SHA384: u16 = 0x000c;
pub const TPM_ALG_SHA512: u16 = 0x000d;
pub const TPM_ALG_NULL: u16 = 0x0010;
pub const TPM_ALG_ECC: u16 = 0x0023;

pub const TPM_ECC_NIST_P256: u16 = 0x0003;
pub const TPM_ECC_NIST_P384: u16 = 0x0004;
pub const TPM_ECC_NIST_P521: u16 = 0x0005;

const NAME_ALGORITHMS: &[(u16, HashAlgorithm)] = &[
    (TPM_ALG_SHA1, HashAlgorithm::Sha1),
    (TPM_ALG_SHA256, HashAlgorithm::Sha256),
    (TPM_ALG_SHA384, HashAlgorithm::Sha384),
    (TPM_ALG_SHA512, HashAlgorithm::Sha512),
];

const ECC_CURVES: &[(u16, EcCurve)] = &[
    (TPM_ECC_NIST_P256, EcCurve::P256),
    (TPM_ECC_NIST_P384, EcCurve::P384),
    (TPM_ECC_NIST_P521, EcCurve::P521),
];

/// Hash function for a TPM_ALG_ID used as a name algorithm.
pub fn name_hash_algorithm(alg_id: u16) -> Option<HashAlgorithm> {
    NAME_ALGORITHMS
        .iter()
        .find(|(id, _)| *id == alg_id)
        .map(|(_, hash)| *hash)
}

/// COSE curve for a TPM_ECC_CURVE identifier.
pub fn ecc_curve(curve_id: u16) -> Option<EcCurve> {
    ECC_CURVES
        .iter()
        .find(|(id, _)| *id == curve_id)
        .map(|(_, curve)| *curve)
}
