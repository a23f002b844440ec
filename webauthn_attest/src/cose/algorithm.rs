use std::fmt;

use ring::digest;

use crate::errors::WebauthnError;

/// COSE algorithm identifiers accepted for credential and attestation keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoseAlgorithm {
    ES256,
    ES384,
    ES512,
    EdDSA,
    RS256,
    RS384,
    RS512,
    PS256,
    PS384,
    PS512,
    /// RSASSA-PKCS1-v1_5 with SHA-1, still emitted by some TPMs.
    RS1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

// IANA COSE Algorithms registry
const ALGORITHMS: &[(i64, CoseAlgorithm, Option<HashAlgorithm>)] = &[
    (-7, CoseAlgorithm::ES256, Some(HashAlgorithm::Sha256)),
    (-35, CoseAlgorithm::ES384, Some(HashAlgorithm::Sha384)),
    (-36, CoseAlgorithm::ES512, Some(HashAlgorithm::Sha512)),
    (-8, CoseAlgorithm::EdDSA, None),
    (-257, CoseAlgorithm::RS256, Some(HashAlgorithm::Sha256)),
    (-258, CoseAlgorithm::RS384, Some(HashAlgorithm::Sha384)),
    (-259, CoseAlgorithm::RS512, Some(HashAlgorithm::Sha512)),
    (-37, CoseAlgorithm::PS256, Some(HashAlgorithm::Sha256)),
    (-38, CoseAlgorithm::PS384, Some(HashAlgorithm::Sha384)),
    (-39, CoseAlgorithm::PS512, Some(HashAlgorithm::Sha512)),
    (-65535, CoseAlgorithm::RS1, Some(HashAlgorithm::Sha1)),
];

impl CoseAlgorithm {
    pub fn from_identifier(identifier: i64) -> Option<Self> {
        ALGORITHMS
            .iter()
            .find(|(id, _, _)| *id == identifier)
            .map(|(_, alg, _)| *alg)
    }

    pub fn identifier(self) -> i64 {
        self.entry().0
    }

    /// Digest used by the signature scheme; `None` for EdDSA, which hashes
    /// internally.
    pub fn hash_algorithm(self) -> Option<HashAlgorithm> {
        self.entry().2
    }

    pub fn is_ecdsa(self) -> bool {
        matches!(
            self,
            CoseAlgorithm::ES256 | CoseAlgorithm::ES384 | CoseAlgorithm::ES512
        )
    }

    pub fn is_rsa(self) -> bool {
        matches!(
            self,
            CoseAlgorithm::RS256
                | CoseAlgorithm::RS384
                | CoseAlgorithm::RS512
                | CoseAlgorithm::PS256
                | CoseAlgorithm::PS384
                | CoseAlgorithm::PS512
                | CoseAlgorithm::RS1
        )
    }

    fn entry(self) -> (i64, CoseAlgorithm, Option<HashAlgorithm>) {
        ALGORITHMS
            .iter()
            .copied()
            .find(|(_, alg, _)| *alg == self)
            .unwrap_or((0, self, None))
    }
}

impl TryFrom<i64> for CoseAlgorithm {
    type Error = WebauthnError;

    fn try_from(identifier: i64) -> Result<Self, Self::Error> {
        CoseAlgorithm::from_identifier(identifier).ok_or_else(|| {
            WebauthnError::Parse(format!("Unsupported COSE algorithm identifier: {identifier}"))
        })
    }
}

impl fmt::Display for CoseAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({})", self, self.identifier())
    }
}

impl HashAlgorithm {
    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        let algorithm = match self {
            HashAlgorithm::Sha1 => &digest::SHA1_FOR_LEGACY_USE_ONLY,
            HashAlgorithm::Sha256 => &digest::SHA256,
            HashAlgorithm::Sha384 => &digest::SHA384,
            HashAlgorithm::Sha512 => &digest::SHA512,
        };
        digest::digest(algorithm, data).as_ref().to_vec()
    }

    pub fn output_len(self) -> usize {
        match self {
            HashAlgorithm::Sha1 => 20,
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha384 => 48,
            HashAlgorithm::Sha512 => 64,
        }
    }
}
