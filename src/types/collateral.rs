use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Quote verification collateral, as served by the Intel PCS / a PCCS cache
/// (`sgx_ql_qve_collateral_t`).
///
/// Only the [`QuoteVerifier`](super::verification::QuoteVerifier) looks inside it; the claims
/// extractor and policy matcher treat it as opaque.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collateral {
    /// Collateral layout version. Version 1 carries the PCK certificate chain in the quote.
    #[serde(default = "default_version")]
    pub version: u32,

    /* Certificate Revocation Lists */
    /// PCK CRL Issuer Chain in PEM format
    pub pck_crl_issuer_chain: String,
    /// Root CA CRL in PEM format
    /// Contains a list of revoked certificates signed by Intel SGX Root CA.
    pub root_ca_crl: String,
    /// PCK Cert CRL in PEM format
    pub pck_crl: String,

    /* Structured Data */
    /// TCB Info issuer chain in PEM format
    pub tcb_info_issuer_chain: String,
    /// TCB Info structure (JSON). Contains security version information and TCB levels.
    pub tcb_info: String,
    /// QE Identity issuer chain in PEM format
    pub qe_identity_issuer_chain: String,
    /// QE Identity structure (JSON)
    pub qe_identity: String,

    /* PCK */
    /// PCK certificate in PEM format
    pub pck_certificate: String,
    /// PCK signing chain in PEM format
    pub pck_signing_chain: String,
}

fn default_version() -> u32 {
    1
}

impl Collateral {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("malformed collateral")
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        serde_json::to_string(self).context("failed to serialize collateral")
    }
}
