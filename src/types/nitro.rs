use std::collections::BTreeMap;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::{byte_seq, pcr_map};

/// Attestation document produced by the Nitro Secure Module, carried as the CBOR payload of a
/// COSE_Sign1 structure.
///
/// https://github.com/aws/aws-nitro-enclaves-nsm-api/blob/main/docs/attestation_process.md
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NitroAttestationDocument {
    /// Issuing Nitro hypervisor module ID
    pub module_id: String,

    /// UTC time when the document was created, in milliseconds since the UNIX epoch
    pub timestamp: u64,

    /// The digest function used for calculating the register values
    pub digest: String,

    /// Platform configuration registers. PCR0 is the hash of the enclave image file.
    #[serde(with = "pcr_map")]
    pub pcrs: BTreeMap<u8, Vec<u8>>,

    /// The infrastucture certificate used to sign this document, DER encoded
    #[serde(with = "serde_bytes")]
    pub certificate: Vec<u8>,

    /// Issuing CA bundle for the infrastructure certificate, root first
    #[serde(with = "byte_seq")]
    pub cabundle: Vec<Vec<u8>>,

    #[serde(default, with = "serde_bytes")]
    pub public_key: Option<Vec<u8>>,

    /// Additional signed user data. The enclave binds its TLS certificate here.
    #[serde(default, with = "serde_bytes")]
    pub user_data: Option<Vec<u8>>,

    #[serde(default, with = "serde_bytes")]
    pub nonce: Option<Vec<u8>>,
}

impl NitroAttestationDocument {
    pub fn from_cbor(payload: &[u8]) -> anyhow::Result<Self> {
        ciborium::de::from_reader(payload).context("malformed attestation document")
    }

    pub fn to_cbor(&self) -> anyhow::Result<Vec<u8>> {
        let mut out = Vec::new();
        ciborium::ser::into_writer(self, &mut out)
            .context("failed to encode attestation document")?;
        Ok(out)
    }

    pub fn pcr(&self, index: u8) -> Option<&[u8]> {
        self.pcrs.get(&index).map(Vec::as_slice)
    }

    /// Creation time of the document, `None` if the timestamp is out of range.
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        let millis = i64::try_from(self.timestamp).ok()?;
        DateTime::from_timestamp_millis(millis)
    }
}
