use std::{fmt, str::FromStr, time::SystemTime};

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use super::{collateral::Collateral, report::EnclaveReport};

/// Status codes reported by the DCAP Quote Verification Library, one per verified component.
// https://github.com/intel/SGX-TDX-DCAP-QuoteVerificationLibrary/blob/master/Src/AttestationLibrary/include/SgxEcdsaAttestation/QuoteVerification.h
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum VerificationStatus {
    Ok,
    UnsupportedCertFormat,
    SgxRootCaMissing,
    SgxRootCaInvalid,
    SgxRootCaInvalidExtensions,
    SgxRootCaInvalidIssuer,
    SgxRootCaUntrusted,
    SgxIntermediateCaMissing,
    SgxIntermediateCaInvalid,
    SgxIntermediateCaInvalidExtensions,
    SgxIntermediateCaInvalidIssuer,
    SgxIntermediateCaRevoked,
    SgxPckMissing,
    SgxPckInvalid,
    SgxPckInvalidExtensions,
    SgxPckInvalidIssuer,
    SgxPckRevoked,
    TrustedRootCaInvalid,
    SgxPckCertChainUntrusted,
    SgxTcbInfoUnsupportedFormat,
    SgxTcbInfoInvalid,
    TcbInfoInvalidSignature,
    SgxTcbSigningCertMissing,
    SgxTcbSigningCertInvalid,
    SgxTcbSigningCertInvalidExtensions,
    SgxTcbSigningCertInvalidIssuer,
    SgxTcbSigningCertChainUntrusted,
    SgxTcbSigningCertRevoked,
    SgxCrlUnsupportedFormat,
    SgxCrlUnknownIssuer,
    SgxCrlInvalid,
    SgxCrlInvalidExtensions,
    SgxCrlInvalidSignature,
    SgxCaCertUnsupportedFormat,
    SgxCaCertInvalid,
    TrustedRootCaUnsupportedFormat,
    MissingParameters,
    UnsupportedQuoteFormat,
    UnsupportedPckCertFormat,
    InvalidPckCert,
    UnsupportedPckRlFormat,
    InvalidPckCrl,
    UnsupportedTcbInfoFormat,
    PckRevoked,
    TcbInfoMismatch,
    TcbOutOfDate,
    TcbRevoked,
    TcbConfigurationNeeded,
    TcbOutOfDateConfigurationNeeded,
    TcbNotSupported,
    TcbUnrecognizedStatus,
    UnsupportedQeCertification,
    InvalidQeCertificationDataSize,
    UnsupportedQeCertificationDataType,
    PckCertMismatch,
    InvalidQeReportSignature,
    InvalidQeReportData,
    InvalidQuoteSignature,
    SgxQeIdentityUnsupportedFormat,
    SgxQeIdentityInvalid,
    SgxQeIdentityInvalidSignature,
    SgxEnclaveReportUnsupportedFormat,
    SgxEnclaveIdentityUnsupportedFormat,
    SgxEnclaveIdentityInvalid,
    SgxEnclaveIdentityUnsupportedVersion,
    SgxEnclaveIdentityOutOfDate,
    SgxEnclaveReportMiscselectMismatch,
    SgxEnclaveReportAttributesMismatch,
    SgxEnclaveReportMrenclaveMismatch,
    SgxEnclaveReportMrsignerMismatch,
    SgxEnclaveReportIsvprodidMismatch,
    SgxEnclaveReportIsvsvnOutOfDate,
    UnsupportedQeIdentityFormat,
    QeIdentityOutOfDate,
    QeIdentityMismatch,
    SgxTcbInfoExpired,
    SgxEnclaveIdentityInvalidSignature,
    InvalidParameter,
    SgxPckCertChainExpired,
    SgxCrlExpired,
    SgxSigningCertChainExpired,
    SgxEnclaveIdentityExpired,
    TcbSwHardeningNeeded,
    TcbConfigurationAndSwHardeningNeeded,
    SgxEnclaveReportIsvsvnRevoked,
    SgxEnclaveIdentityRevoked,
}

macro_rules! status_names {
    ($($variant:ident => $name:literal,)*) => {
        impl VerificationStatus {
            /// The `STATUS_*` name used by the verification library.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)*
                }
            }
        }

        impl FromStr for VerificationStatus {
            type Err = anyhow::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(Self::$variant),)*
                    _ => Err(anyhow!("unknown verification status {s}")),
                }
            }
        }
    };
}

status_names! {
    Ok => "STATUS_OK",
    UnsupportedCertFormat => "STATUS_UNSUPPORTED_CERT_FORMAT",
    SgxRootCaMissing => "STATUS_SGX_ROOT_CA_MISSING",
    SgxRootCaInvalid => "STATUS_SGX_ROOT_CA_INVALID",
    SgxRootCaInvalidExtensions => "STATUS_SGX_ROOT_CA_INVALID_EXTENSIONS",
    SgxRootCaInvalidIssuer => "STATUS_SGX_ROOT_CA_INVALID_ISSUER",
    SgxRootCaUntrusted => "STATUS_SGX_ROOT_CA_UNTRUSTED",
    SgxIntermediateCaMissing => "STATUS_SGX_INTERMEDIATE_CA_MISSING",
    SgxIntermediateCaInvalid => "STATUS_SGX_INTERMEDIATE_CA_INVALID",
    SgxIntermediateCaInvalidExtensions => "STATUS_SGX_INTERMEDIATE_CA_INVALID_EXTENSIONS",
    SgxIntermediateCaInvalidIssuer => "STATUS_SGX_INTERMEDIATE_CA_INVALID_ISSUER",
    SgxIntermediateCaRevoked => "STATUS_SGX_INTERMEDIATE_CA_REVOKED",
    SgxPckMissing => "STATUS_SGX_PCK_MISSING",
    SgxPckInvalid => "STATUS_SGX_PCK_INVALID",
    SgxPckInvalidExtensions => "STATUS_SGX_PCK_INVALID_EXTENSIONS",
    SgxPckInvalidIssuer => "STATUS_SGX_PCK_INVALID_ISSUER",
    SgxPckRevoked => "STATUS_SGX_PCK_REVOKED",
    TrustedRootCaInvalid => "STATUS_TRUSTED_ROOT_CA_INVALID",
    SgxPckCertChainUntrusted => "STATUS_SGX_PCK_CERT_CHAIN_UNTRUSTED",
    SgxTcbInfoUnsupportedFormat => "STATUS_SGX_TCB_INFO_UNSUPPORTED_FORMAT",
    SgxTcbInfoInvalid => "STATUS_SGX_TCB_INFO_INVALID",
    TcbInfoInvalidSignature => "STATUS_TCB_INFO_INVALID_SIGNATURE",
    SgxTcbSigningCertMissing => "STATUS_SGX_TCB_SIGNING_CERT_MISSING",
    SgxTcbSigningCertInvalid => "STATUS_SGX_TCB_SIGNING_CERT_INVALID",
    SgxTcbSigningCertInvalidExtensions => "STATUS_SGX_TCB_SIGNING_CERT_INVALID_EXTENSIONS",
    SgxTcbSigningCertInvalidIssuer => "STATUS_SGX_TCB_SIGNING_CERT_INVALID_ISSUER",
    SgxTcbSigningCertChainUntrusted => "STATUS_SGX_TCB_SIGNING_CERT_CHAIN_UNTRUSTED",
    SgxTcbSigningCertRevoked => "STATUS_SGX_TCB_SIGNING_CERT_REVOKED",
    SgxCrlUnsupportedFormat => "STATUS_SGX_CRL_UNSUPPORTED_FORMAT",
    SgxCrlUnknownIssuer => "STATUS_SGX_CRL_UNKNOWN_ISSUER",
    SgxCrlInvalid => "STATUS_SGX_CRL_INVALID",
    SgxCrlInvalidExtensions => "STATUS_SGX_CRL_INVALID_EXTENSIONS",
    SgxCrlInvalidSignature => "STATUS_SGX_CRL_INVALID_SIGNATURE",
    SgxCaCertUnsupportedFormat => "STATUS_SGX_CA_CERT_UNSUPPORTED_FORMAT",
    SgxCaCertInvalid => "STATUS_SGX_CA_CERT_INVALID",
    TrustedRootCaUnsupportedFormat => "STATUS_TRUSTED_ROOT_CA_UNSUPPORTED_FORMAT",
    MissingParameters => "STATUS_MISSING_PARAMETERS",
    UnsupportedQuoteFormat => "STATUS_UNSUPPORTED_QUOTE_FORMAT",
    UnsupportedPckCertFormat => "STATUS_UNSUPPORTED_PCK_CERT_FORMAT",
    InvalidPckCert => "STATUS_INVALID_PCK_CERT",
    UnsupportedPckRlFormat => "STATUS_UNSUPPORTED_PCK_RL_FORMAT",
    InvalidPckCrl => "STATUS_INVALID_PCK_CRL",
    UnsupportedTcbInfoFormat => "STATUS_UNSUPPORTED_TCB_INFO_FORMAT",
    PckRevoked => "STATUS_PCK_REVOKED",
    TcbInfoMismatch => "STATUS_TCB_INFO_MISMATCH",
    TcbOutOfDate => "STATUS_TCB_OUT_OF_DATE",
    TcbRevoked => "STATUS_TCB_REVOKED",
    TcbConfigurationNeeded => "STATUS_TCB_CONFIGURATION_NEEDED",
    TcbOutOfDateConfigurationNeeded => "STATUS_TCB_OUT_OF_DATE_CONFIGURATION_NEEDED",
    TcbNotSupported => "STATUS_TCB_NOT_SUPPORTED",
    TcbUnrecognizedStatus => "STATUS_TCB_UNRECOGNIZED_STATUS",
    UnsupportedQeCertification => "STATUS_UNSUPPORTED_QE_CERTIFICATION",
    InvalidQeCertificationDataSize => "STATUS_INVALID_QE_CERTIFICATION_DATA_SIZE",
    UnsupportedQeCertificationDataType => "STATUS_UNSUPPORTED_QE_CERTIFICATION_DATA_TYPE",
    PckCertMismatch => "STATUS_PCK_CERT_MISMATCH",
    InvalidQeReportSignature => "STATUS_INVALID_QE_REPORT_SIGNATURE",
    InvalidQeReportData => "STATUS_INVALID_QE_REPORT_DATA",
    InvalidQuoteSignature => "STATUS_INVALID_QUOTE_SIGNATURE",
    SgxQeIdentityUnsupportedFormat => "STATUS_SGX_QE_IDENTITY_UNSUPPORTED_FORMAT",
    SgxQeIdentityInvalid => "STATUS_SGX_QE_IDENTITY_INVALID",
    SgxQeIdentityInvalidSignature => "STATUS_SGX_QE_IDENTITY_INVALID_SIGNATURE",
    SgxEnclaveReportUnsupportedFormat => "STATUS_SGX_ENCLAVE_REPORT_UNSUPPORTED_FORMAT",
    SgxEnclaveIdentityUnsupportedFormat => "STATUS_SGX_ENCLAVE_IDENTITY_UNSUPPORTED_FORMAT",
    SgxEnclaveIdentityInvalid => "STATUS_SGX_ENCLAVE_IDENTITY_INVALID",
    SgxEnclaveIdentityUnsupportedVersion => "STATUS_SGX_ENCLAVE_IDENTITY_UNSUPPORTED_VERSION",
    SgxEnclaveIdentityOutOfDate => "STATUS_SGX_ENCLAVE_IDENTITY_OUT_OF_DATE",
    SgxEnclaveReportMiscselectMismatch => "STATUS_SGX_ENCLAVE_REPORT_MISCSELECT_MISMATCH",
    SgxEnclaveReportAttributesMismatch => "STATUS_SGX_ENCLAVE_REPORT_ATTRIBUTES_MISMATCH",
    SgxEnclaveReportMrenclaveMismatch => "STATUS_SGX_ENCLAVE_REPORT_MRENCLAVE_MISMATCH",
    SgxEnclaveReportMrsignerMismatch => "STATUS_SGX_ENCLAVE_REPORT_MRSIGNER_MISMATCH",
    SgxEnclaveReportIsvprodidMismatch => "STATUS_SGX_ENCLAVE_REPORT_ISVPRODID_MISMATCH",
    SgxEnclaveReportIsvsvnOutOfDate => "STATUS_SGX_ENCLAVE_REPORT_ISVSVN_OUT_OF_DATE",
    UnsupportedQeIdentityFormat => "STATUS_UNSUPPORTED_QE_IDENTITY_FORMAT",
    QeIdentityOutOfDate => "STATUS_QE_IDENTITY_OUT_OF_DATE",
    QeIdentityMismatch => "STATUS_QE_IDENTITY_MISMATCH",
    SgxTcbInfoExpired => "STATUS_SGX_TCB_INFO_EXPIRED",
    SgxEnclaveIdentityInvalidSignature => "STATUS_SGX_ENCLAVE_IDENTITY_INVALID_SIGNATURE",
    InvalidParameter => "STATUS_INVALID_PARAMETER",
    SgxPckCertChainExpired => "STATUS_SGX_PCK_CERT_CHAIN_EXPIRED",
    SgxCrlExpired => "STATUS_SGX_CRL_EXPIRED",
    SgxSigningCertChainExpired => "STATUS_SGX_SIGNING_CERT_CHAIN_EXPIRED",
    SgxEnclaveIdentityExpired => "STATUS_SGX_ENCLAVE_IDENTITY_EXPIRED",
    TcbSwHardeningNeeded => "STATUS_TCB_SW_HARDENING_NEEDED",
    TcbConfigurationAndSwHardeningNeeded => "STATUS_TCB_CONFIGURATION_AND_SW_HARDENING_NEEDED",
    SgxEnclaveReportIsvsvnRevoked => "STATUS_SGX_ENCLAVE_REPORT_ISVSVN_REVOKED",
    SgxEnclaveIdentityRevoked => "STATUS_SGX_ENCLAVE_IDENTITY_REVOKED",
}

impl VerificationStatus {
    pub fn is_ok(&self) -> bool {
        *self == Self::Ok
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for VerificationStatus {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VerificationStatus> for String {
    fn from(value: VerificationStatus) -> Self {
        value.as_str().to_string()
    }
}

/// What a quote verifier reports back: one status per verified component, plus the
/// enclave report fields when the quote could be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteVerificationRecord {
    pub pck_certificate_status: VerificationStatus,
    pub tcb_info_status: VerificationStatus,
    pub qe_identity_status: VerificationStatus,
    pub quote_status: VerificationStatus,
    pub enclave_report: Option<EnclaveReport>,
}

/// Cryptographic verification of a DCAP quote against its collateral: PCK certificate chain,
/// TCB info, QE identity and quote signature.
///
/// Implementations must not apply any policy of their own beyond reporting statuses; the
/// accept/reject decision is taken by [`crate::sgx::extract`].
pub trait QuoteVerifier {
    fn verify(
        &self,
        quote: &[u8],
        collateral: &Collateral,
        current_time: SystemTime,
    ) -> anyhow::Result<QuoteVerificationRecord>;
}

impl<F> QuoteVerifier for F
where
    F: Fn(&[u8], &Collateral, SystemTime) -> anyhow::Result<QuoteVerificationRecord>,
{
    fn verify(
        &self,
        quote: &[u8],
        collateral: &Collateral,
        current_time: SystemTime,
    ) -> anyhow::Result<QuoteVerificationRecord> {
        self(quote, collateral, current_time)
    }
}
