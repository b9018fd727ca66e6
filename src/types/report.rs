use anyhow::anyhow;
use zerocopy::{little_endian, AsBytes, FromBytes, FromZeroes};

use crate::constants::{ATTRIBUTES_LEN, ENCLAVE_REPORT_LEN, MR_ENCLAVE_LEN, REPORT_DATA_LEN};
use crate::utils;

/// Body of an SGX enclave report (Intel SDM, EREPORT `REPORT` structure), as carried in a
/// DCAP quote right after the 48 byte header.
///
/// Parsed with zerocopy: the struct layout is checked against the raw bytes at compile time
/// and no copy happens until individual fields are read.
#[derive(Debug, Clone, Copy, FromBytes, FromZeroes, AsBytes)]
#[repr(C)]
pub struct EnclaveReportBody {
    /// Security Version of the CPU (raw value)
    /// [16 bytes]
    pub cpu_svn: [u8; 16],

    /// SSA Frame extended feature set.
    /// Reports what SECS.MISCSELECT settings are used in the enclave.
    /// [4 bytes]
    pub misc_select: little_endian::U32,

    /// [28 bytes]
    pub reserved_1: [u8; 28],

    /// Set of flags describing attributes of the enclave: FLAGS (8 bytes) then XFRM (8 bytes).
    /// [16 bytes]
    pub sgx_attributes: [u8; ATTRIBUTES_LEN],

    /// Measurement of the enclave: SHA-256 of the ENCLAVEHASH field in the SIGSTRUCT.
    /// [32 bytes]
    pub mr_enclave: [u8; MR_ENCLAVE_LEN],

    /// [32 bytes]
    pub reserved_2: [u8; 32],

    /// Measurement of the enclave signer.
    /// [32 bytes]
    pub mr_signer: [u8; 32],

    /// [96 bytes]
    pub reserved_3: [u8; 96],

    /// [2 bytes]
    pub isv_prod_id: little_endian::U16,

    /// [2 bytes]
    pub isv_svn: little_endian::U16,

    /// [60 bytes]
    pub reserved_4: [u8; 60],

    /// Data provided by the enclave. The quote signature covers it, so the first 32 bytes are
    /// used to bind a hash of the enclave held data.
    /// [64 bytes]
    pub user_report_data: [u8; REPORT_DATA_LEN],
}

impl TryFrom<&[u8]> for EnclaveReportBody {
    type Error = anyhow::Error;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        if value.len() != ENCLAVE_REPORT_LEN {
            return Err(anyhow!(
                "incorrect enclave report size, expected {} but got {}",
                ENCLAVE_REPORT_LEN,
                value.len()
            ));
        }
        let mut bytes = value;
        utils::read_from_bytes::<EnclaveReportBody>(&mut bytes)
            .ok_or_else(|| anyhow!("underflow reading enclave report body"))
    }
}

/// The report fields a [`QuoteVerifier`](super::verification::QuoteVerifier) hands back
/// after checking a quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnclaveReport {
    pub report_data: [u8; REPORT_DATA_LEN],
    pub mr_enclave: [u8; MR_ENCLAVE_LEN],
    pub attributes: [u8; ATTRIBUTES_LEN],
    pub misc_select: u32,
}

impl From<&EnclaveReportBody> for EnclaveReport {
    fn from(body: &EnclaveReportBody) -> Self {
        Self {
            report_data: body.user_report_data,
            mr_enclave: body.mr_enclave,
            attributes: body.sgx_attributes,
            misc_select: body.misc_select.get(),
        }
    }
}

impl EnclaveReport {
    /// Extracts the report fields from a raw 384 byte report body.
    pub fn from_report_body(bytes: &[u8]) -> anyhow::Result<Self> {
        let body = EnclaveReportBody::try_from(bytes)?;
        Ok(Self::from(&body))
    }
}
