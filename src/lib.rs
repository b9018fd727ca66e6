pub mod constants;
pub mod error;
pub mod nitro;
pub mod sgx;
pub mod trust_store;
pub mod types;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_utils;

use std::time::SystemTime;

pub use error::{ErrorKind, PolicyError, VerificationError};
use types::{
    claims::{Claims, DcapClaims},
    collateral::Collateral,
    policy::{NitroPolicy, SgxPolicy},
    verification::QuoteVerifier,
};

/// Verifies an SGX DCAP quote end to end and checks the enclave against `policy`.
///
/// 1. Verify the quote against its collateral with `verifier` (PCK chain, TCB, QE identity,
///    quote signature).
/// 2. Check the resulting statuses and that the report data binds `enclave_held_data`.
/// 3. Match the enclave identity and attributes against the policy.
pub fn verify_dcap_attestation<V: QuoteVerifier + ?Sized>(
    verifier: &V,
    quote: &[u8],
    collateral: &Collateral,
    enclave_held_data: &[u8],
    policy: &SgxPolicy,
    current_time: SystemTime,
) -> error::Result<DcapClaims> {
    let record = sgx::verify_quote(verifier, quote, collateral, current_time)?;
    let claims = sgx::extract(&record, quote, enclave_held_data)?;
    sgx::matches(&claims, policy)?;
    Ok(claims)
}

/// Verifies a Nitro attestation document end to end: provenance, enclave image (PCR0) and
/// binding of the enclave TLS certificate.
///
/// `root_ca_pem` defaults to the AWS Nitro Enclaves root.
pub fn validate_nitro_attestation(
    raw_doc: &[u8],
    enclave_cert: &[u8],
    policy: &NitroPolicy,
    root_ca_pem: Option<&str>,
    current_time: SystemTime,
) -> error::Result<Claims> {
    let root_ca_pem = root_ca_pem.unwrap_or(constants::NITRO_ROOT_CA_PEM);
    let doc = nitro::verify(raw_doc, root_ca_pem, current_time)?;
    nitro::validate(&doc, enclave_cert, &policy.expected_pcr0)?;
    Ok(Claims::Nitro(doc))
}
