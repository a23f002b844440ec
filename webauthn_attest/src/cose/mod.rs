//! COSE_Key public keys (RFC 8152 / RFC 9053) as used for WebAuthn credentials.

mod algorithm;
mod compat;
pub(crate) mod der;
mod ec2;
mod key;
mod okp;
mod rsa;

pub use algorithm::{CoseAlgorithm, HashAlgorithm};
pub use ec2::{EcCurve, Ec2Key};
pub use key::CoseKey;
pub use okp::{OkpCurve, OkpKey};
pub use rsa::RsaKey;

/// COSE key map labels.
pub mod labels {
    pub const KTY: i64 = 1;
    pub const KID: i64 = 2;
    pub const ALG: i64 = 3;
    pub const KEY_OPS: i64 = 4;
    pub const BASE_IV: i64 = 5;

    pub const EC2_CRV: i64 = -1;
    pub const EC2_X: i64 = -2;
    pub const EC2_Y: i64 = -3;

    pub const OKP_CRV: i64 = -1;
    pub const OKP_X: i64 = -2;

    pub const RSA_N: i64 = -1;
    pub const RSA_E: i64 = -2;

    pub const KTY_OKP: i64 = 1;
    pub const KTY_EC2: i64 = 2;
    pub const KTY_RSA: i64 = 3;
}
