use crate::{
    constants::{NITRO_APP_HASH, NITRO_DIGEST, NITRO_PCR_LEN},
    error::{Result, VerificationError},
    types::nitro::NitroAttestationDocument,
    utils::hash::sha256sum,
};

/// The `user_data` an enclave serving `enclave_cert` over TLS puts in its attestation
/// document: `sha256:<hex cert hash>;sha256:<hex application hash>`.
pub fn expected_user_data(enclave_cert: &[u8]) -> Vec<u8> {
    format!(
        "sha256:{};sha256:{}",
        hex::encode(sha256sum(enclave_cert)),
        hex::encode(NITRO_APP_HASH)
    )
    .into_bytes()
}

/// Checks a verified attestation document against the expected enclave image and binds it to
/// the certificate the enclave presented.
pub fn validate(
    doc: &NitroAttestationDocument,
    enclave_cert: &[u8],
    expected_pcr0: &[u8; NITRO_PCR_LEN],
) -> Result<()> {
    if doc.digest != NITRO_DIGEST {
        return Err(reject(VerificationError::attestation("digest")));
    }

    let pcr0 = doc.pcr(0).unwrap_or_default();
    if pcr0 != expected_pcr0 {
        return Err(reject(VerificationError::Identity {
            expected: expected_pcr0.to_vec(),
            got: pcr0.to_vec(),
        }));
    }

    let expected = expected_user_data(enclave_cert);
    let got = doc.user_data.as_deref().unwrap_or_default();
    if got != expected {
        return Err(reject(VerificationError::EnclaveHeldData {
            expected,
            got: got.to_vec(),
        }));
    }

    tracing::debug!(pcr0 = %hex::encode(pcr0), "nitro attestation document matches");
    Ok(())
}

fn reject(err: VerificationError) -> VerificationError {
    tracing::warn!(kind = ?err.kind(), error = %err, "nitro claims rejected");
    err
}
