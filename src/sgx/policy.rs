//! Matching DCAP claims against an [`SgxPolicy`].

use crate::{
    constants::SGX_FLAGS_INITTED,
    error::{Result, VerificationError},
    types::{claims::DcapClaims, policy::SgxPolicy},
};

type Check = fn(&DcapClaims, &SgxPolicy) -> Result<()>;

// Order matters: `matches` reports the first failing check.
const CHECKS: [Check; 5] = [
    check_mr_enclave,
    check_debug,
    check_attributes_flags,
    check_attributes_xfrm,
    check_misc_select,
];

/// Accepts the claims if they conform to the policy, otherwise returns the first violation.
pub fn matches(claims: &DcapClaims, policy: &SgxPolicy) -> Result<()> {
    for check in CHECKS {
        if let Err(err) = check(claims, policy) {
            tracing::warn!(kind = ?err.kind(), error = %err, "claims rejected by sgx policy");
            return Err(err);
        }
    }
    tracing::debug!(mr_enclave = %claims.mr_enclave_hex(), "claims match sgx policy");
    Ok(())
}

/// Every violation of the policy, in the order [`matches`] checks them. Empty when accepted.
pub fn violations(claims: &DcapClaims, policy: &SgxPolicy) -> Vec<VerificationError> {
    CHECKS
        .iter()
        .filter_map(|check| check(claims, policy).err())
        .collect()
}

fn check_mr_enclave(claims: &DcapClaims, policy: &SgxPolicy) -> Result<()> {
    if claims.sgx_mrenclave != policy.mr_enclave {
        return Err(VerificationError::Identity {
            expected: policy.mr_enclave.to_vec(),
            got: claims.sgx_mrenclave.to_vec(),
        });
    }
    Ok(())
}

fn check_debug(claims: &DcapClaims, policy: &SgxPolicy) -> Result<()> {
    if claims.sgx_is_debuggable && !policy.allow_debug {
        return Err(VerificationError::DebugNotAllowed);
    }
    Ok(())
}

fn check_attributes_flags(claims: &DcapClaims, policy: &SgxPolicy) -> Result<()> {
    // INITTED is required whatever the policy says.
    let expected = policy.attributes_flags | SGX_FLAGS_INITTED;
    if claims.attributes_flags() & policy.attributes_mask_flags != expected {
        return Err(VerificationError::attestation("attributes flags"));
    }
    Ok(())
}

fn check_attributes_xfrm(claims: &DcapClaims, policy: &SgxPolicy) -> Result<()> {
    if claims.attributes_xfrm() & policy.attributes_mask_xfrm != policy.attributes_xfrm {
        return Err(VerificationError::attestation("attributes xfrm"));
    }
    Ok(())
}

fn check_misc_select(claims: &DcapClaims, policy: &SgxPolicy) -> Result<()> {
    if claims.sgx_misc_select & policy.misc_mask != policy.misc_select {
        return Err(VerificationError::attestation("misc select"));
    }
    Ok(())
}
