//! AWS Nitro Enclaves: verifying a COSE_Sign1 attestation document.
//!
//! Follows the steps of
//! https://docs.aws.amazon.com/enclaves/latest/user/verify-root.html
//! 1. Decode the CBOR object and map it to a COSE_Sign1 structure.
//! 2. Extract the attestation document from the COSE_Sign1 structure.
//! 3. Verify the certificate chain up to the trusted root.
//! 4. Ensure that the attestation document is properly signed.

use std::time::SystemTime;

use coset::{CborSerializable, CoseSign1, TaggedCborSerializable};
use p384::ecdsa::{signature::Verifier, Signature, VerifyingKey};
use x509_cert::{
    certificate::CertificateInner,
    der::{
        oid::{
            db::rfc5912::{ID_EC_PUBLIC_KEY, SECP_384_R_1},
            ObjectIdentifier,
        },
        Decode, Encode,
    },
};

use crate::{
    error::{Result, VerificationError},
    trust_store::TrustStore,
    types::nitro::NitroAttestationDocument,
    utils::cert::{parse_der_chain, parse_pem_chain},
};

pub mod claims;

pub use claims::{expected_user_data, validate};

/// Decodes a Nitro attestation document and checks that it is signed by a certificate
/// chaining up to `root_ca_pem`, with every certificate valid at `current_time`.
///
/// Only the provenance of the document is checked here; see [`validate`] for its content.
pub fn verify(
    raw_doc: &[u8],
    root_ca_pem: &str,
    current_time: SystemTime,
) -> Result<NitroAttestationDocument> {
    let cose = decode_cose(raw_doc).map_err(reject)?;
    let payload = cose
        .payload
        .as_deref()
        .ok_or_else(|| reject(VerificationError::attestation("decode")))?;
    let doc = NitroAttestationDocument::from_cbor(payload).map_err(|e| {
        tracing::debug!(error = %e, "failed to decode attestation document payload");
        reject(VerificationError::attestation("decode"))
    })?;
    tracing::debug!(module_id = %doc.module_id, "decoded nitro attestation document");

    let roots = parse_pem_chain(root_ca_pem).map_err(|e| {
        tracing::debug!(error = %e, "failed to parse nitro root certificate");
        reject(VerificationError::nitro("Invalid root certificate"))
    })?;

    let leaf = verify_signing_certificate(&doc, roots, current_time).map_err(|e| {
        tracing::debug!(error = %e, "nitro signing certificate rejected");
        reject(VerificationError::nitro("Invalid signing certificate"))
    })?;

    let key = signing_key(&leaf).map_err(reject)?;

    cose.verify_signature(&[], |signature, message| {
        let signature = Signature::try_from(signature)?;
        key.verify(message, &signature)
    })
    .map_err(|_| reject(VerificationError::nitro("Wrong signature")))?;

    tracing::debug!(
        module_id = %doc.module_id,
        timestamp = doc.timestamp,
        "nitro attestation document verified"
    );
    Ok(doc)
}

fn decode_cose(raw_doc: &[u8]) -> Result<CoseSign1> {
    // The NSM emits an untagged COSE_Sign1, other producers tag it.
    CoseSign1::from_slice(raw_doc)
        .or_else(|_| CoseSign1::from_tagged_slice(raw_doc))
        .map_err(|e| {
            tracing::debug!(error = ?e, "failed to decode COSE_Sign1");
            VerificationError::attestation("decode")
        })
}

/// Verifies `leaf <- cabundle[n-1] <- ... <- cabundle[1] <- root`. The root shipped in the
/// bundle is ignored in favour of the trusted one.
fn verify_signing_certificate(
    doc: &NitroAttestationDocument,
    roots: Vec<CertificateInner>,
    current_time: SystemTime,
) -> anyhow::Result<CertificateInner> {
    let store = TrustStore::new(current_time, roots)?;

    let mut chain = parse_der_chain(std::slice::from_ref(&doc.certificate))?;
    let bundle = parse_der_chain(&doc.cabundle)?;
    chain.extend(bundle.into_iter().skip(1).rev());

    store.verify_chain_leaf(&chain)
}

fn signing_key(leaf: &CertificateInner) -> Result<VerifyingKey> {
    let spki = &leaf.tbs_certificate.subject_public_key_info;
    if spki.algorithm.oid != ID_EC_PUBLIC_KEY {
        return Err(VerificationError::nitro("Unsupported signing algorithm"));
    }

    let curve = spki
        .algorithm
        .parameters
        .as_ref()
        .and_then(|params| params.to_der().ok())
        .and_then(|der| ObjectIdentifier::from_der(&der).ok());
    if curve != Some(SECP_384_R_1) {
        return Err(VerificationError::nitro(
            "Unsupported elliptic curve used for signing",
        ));
    }

    spki.subject_public_key
        .as_bytes()
        .and_then(|sec1| VerifyingKey::from_sec1_bytes(sec1).ok())
        .ok_or_else(|| VerificationError::nitro("Invalid signing certificate"))
}

fn reject(err: VerificationError) -> VerificationError {
    tracing::warn!(kind = ?err.kind(), error = %err, "nitro attestation rejected");
    err
}
