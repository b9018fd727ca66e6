//! Intel SGX DCAP: turning a quote verification record into claims.

use std::time::SystemTime;

use crate::{
    error::{Result, VerificationError},
    types::{
        claims::DcapClaims,
        collateral::Collateral,
        verification::{QuoteVerificationRecord, QuoteVerifier, VerificationStatus},
    },
    utils::hash::sha256sum,
};

pub mod policy;

pub use policy::{matches, violations};

/// Runs the low-level quote verification and maps a verifier failure to a rejection.
pub fn verify_quote<V: QuoteVerifier + ?Sized>(
    verifier: &V,
    quote: &[u8],
    collateral: &Collateral,
    current_time: SystemTime,
) -> Result<QuoteVerificationRecord> {
    verifier.verify(quote, collateral, current_time).map_err(|e| {
        tracing::warn!(error = %e, "quote verifier failed");
        VerificationError::QuoteValidation(format!("{e:#}"))
    })
}

/// Checks the statuses of a verification record and the binding of the enclave held data,
/// then returns the claims of the quote.
///
/// # Parameters
/// * `record` - Output of the [`QuoteVerifier`] for `quote`
/// * `quote` - The raw quote, copied into the claims
/// * `enclave_held_data` - Data whose SHA-256 must make up the first half of the report data
pub fn extract(
    record: &QuoteVerificationRecord,
    quote: &[u8],
    enclave_held_data: &[u8],
) -> Result<DcapClaims> {
    if !record.pck_certificate_status.is_ok() {
        return Err(reject(VerificationError::NotAnEnclave(format!(
            "pck certificate status {}",
            record.pck_certificate_status
        ))));
    }

    for (what, status) in [
        ("tcb info", record.tcb_info_status),
        ("qe identity", record.qe_identity_status),
    ] {
        if !status.is_ok() {
            return Err(reject(VerificationError::QuoteValidation(format!(
                "{what} status {status}"
            ))));
        }
    }

    match record.quote_status {
        VerificationStatus::Ok => {}
        VerificationStatus::TcbSwHardeningNeeded => {
            tracing::warn!(
                status = %record.quote_status,
                "accepting quote from a platform that needs software hardening"
            );
        }
        status => {
            return Err(reject(VerificationError::QuoteValidation(format!(
                "quote status {status}"
            ))));
        }
    }

    let report = record.enclave_report.as_ref().ok_or_else(|| {
        reject(VerificationError::QuoteValidation(
            "verification record has no enclave report".into(),
        ))
    })?;

    let ehd_hash = sha256sum(enclave_held_data);
    if ehd_hash[..] != report.report_data[..32] {
        return Err(reject(VerificationError::EnclaveHeldData {
            expected: report.report_data[..32].to_vec(),
            got: ehd_hash.to_vec(),
        }));
    }

    let claims = DcapClaims {
        raw_quote: quote.to_vec(),
        sgx_mrenclave: report.mr_enclave,
        sgx_attributes: report.attributes,
        sgx_misc_select: report.misc_select,
        sgx_is_debuggable: report.attributes[0] & 0b10 != 0,
        sgx_ehd: enclave_held_data.to_vec(),
    };
    tracing::debug!(
        mr_enclave = %claims.mr_enclave_hex(),
        debug = claims.sgx_is_debuggable,
        "extracted dcap claims"
    );
    Ok(claims)
}

fn reject(err: VerificationError) -> VerificationError {
    tracing::warn!(kind = ?err.kind(), error = %err, "dcap quote rejected");
    err
}
