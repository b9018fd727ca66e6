use thiserror::Error;

/// Discriminant of a [`VerificationError`], for callers that only need to branch on the
/// failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotAnEnclave,
    QuoteValidation,
    EnclaveHeldData,
    Identity,
    DebugNotAllowed,
    Attestation,
    NitroAttestation,
}

/// Every way an attestation can be rejected.
///
/// Verification is all-or-nothing: an operation returns either the full claims or one of
/// these, never a partially verified result. All variants are fatal for the connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// The hardware root of trust could not validate the PCK certificate.
    #[error("not an enclave: {0}")]
    NotAnEnclave(String),

    /// TCB info, QE identity or quote status is unacceptable.
    #[error("quote validation failed: {0}")]
    QuoteValidation(String),

    /// The hash of the data bound by the enclave does not match the report.
    /// Likely a man-in-the-middle substituting the transport certificate.
    #[error(
        "enclave held data does not match the attested report data, expected {} but got {}",
        hex::encode(.expected),
        hex::encode(.got)
    )]
    EnclaveHeldData { expected: Vec<u8>, got: Vec<u8> },

    /// MRENCLAVE or PCR0 is not the expected one.
    #[error(
        "invalid enclave measurement, expected {} but got {}",
        hex::encode(.expected),
        hex::encode(.got)
    )]
    Identity { expected: Vec<u8>, got: Vec<u8> },

    #[error("enclave is running in debug mode but the policy forbids it")]
    DebugNotAllowed,

    /// Generic policy conformance failure.
    #[error("attestation does not conform to the policy: {0}")]
    Attestation(String),

    /// Nitro attestation document decode, chain or signature failure.
    #[error("nitro attestation failed: {0}")]
    NitroAttestation(String),
}

impl VerificationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotAnEnclave(_) => ErrorKind::NotAnEnclave,
            Self::QuoteValidation(_) => ErrorKind::QuoteValidation,
            Self::EnclaveHeldData { .. } => ErrorKind::EnclaveHeldData,
            Self::Identity { .. } => ErrorKind::Identity,
            Self::DebugNotAllowed => ErrorKind::DebugNotAllowed,
            Self::Attestation(_) => ErrorKind::Attestation,
            Self::NitroAttestation(_) => ErrorKind::NitroAttestation,
        }
    }

    pub(crate) fn attestation(reason: impl Into<String>) -> Self {
        Self::Attestation(reason.into())
    }

    pub(crate) fn nitro(reason: impl Into<String>) -> Self {
        Self::NitroAttestation(reason.into())
    }
}

pub type Result<T> = std::result::Result<T, VerificationError>;

/// Failure to load a policy document. Kept apart from [`VerificationError`]: a bad policy
/// file is a configuration problem, not an attestation verdict.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("failed to read policy file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid policy document: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize policy document: {0}")]
    Serialize(#[from] toml::ser::Error),
}
