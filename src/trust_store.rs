use std::{collections::BTreeMap, time::SystemTime};

use anyhow::{bail, Context};
use x509_cert::{
    certificate::CertificateInner,
    ext::pkix::{BasicConstraints, KeyUsage},
};
use x509_verify::VerifyingKey;

use crate::utils::Expireable;

/// TrustStore is a minimal PKI used to root attestation certificate chains (e.g. the Nitro
/// CA bundle) in a set of caller-supplied anchors. Issuers are looked up by subject name and
/// every link in a chain must be signed by its issuer and valid at `current_time`.
pub struct TrustStore {
    /// Trusted CAs (Certificate Authorities)
    pub trusted: BTreeMap<String, TrustedIdentity>,
    /// Time reference for validity checks
    pub current_time: SystemTime,
}

/// Wrapper for pre-parse trusted identity for verification.
pub struct TrustedIdentity {
    pub cert: CertificateInner,
    pub pk: VerifyingKey,
}

impl TrustStore {
    /// Creates a new trust store with the given root certificates
    ///
    /// # Parameters
    /// * `current_time` - Time reference for validity checks
    /// * `trusted_certs` - Initial set of trusted root certificates
    ///
    /// # Security Considerations
    /// * The provided roots establish the foundation of trust
    /// * A root that is not valid at `current_time` is rejected here
    pub fn new(
        current_time: SystemTime,
        trusted_certs: Vec<CertificateInner>,
    ) -> anyhow::Result<Self> {
        let mut trusted = BTreeMap::new();

        for cert in trusted_certs {
            if !cert.valid_at(current_time) {
                bail!(
                    "trusted root {} is not valid at the verification time",
                    cert.tbs_certificate.subject
                );
            }

            let pk: VerifyingKey = (&cert)
                .try_into()
                .map_err(|e| anyhow::anyhow!("failed to decode key from certificate: {}", e))?;

            trusted.insert(cert.tbs_certificate.subject.to_string(), TrustedIdentity { cert, pk });
        }

        Ok(Self {
            trusted,
            current_time,
        })
    }

    /// Verify the leaf node in a certificate chain is rooted in the trust store.
    ///
    /// # Parameters
    /// * `chain` - The certificate chain to verify, leaf first. The last certificate must be
    ///   issued by one of the trusted roots.
    ///
    /// Every issuer must be a CA allowed to sign certificates, within its path length. The
    /// leaf key is not decoded; that is left to the caller.
    pub fn verify_chain_leaf(&self, chain: &[CertificateInner]) -> anyhow::Result<CertificateInner> {
        // If the chain is empty, it is not valid
        if chain.is_empty() {
            bail!("certificate chain is empty");
        }

        // If the chain is expired, it is not valid
        if !chain.valid_at(self.current_time) {
            bail!("certificate chain is expired");
        }

        // Work through the certificate chain from the root (last) certificate. `depth` is also
        // the number of intermediates between the signer and the leaf.
        let mut intermediary = BTreeMap::new();

        for (depth, cert) in chain.iter().enumerate().rev() {
            let issuer = cert.tbs_certificate.issuer.to_string();
            let subject = cert.tbs_certificate.subject.to_string();

            let signer = self.find_issuer(&issuer, &intermediary)?;
            check_issuer(&signer.cert, depth)?;

            // Validate issuer signature.
            signer
                .pk
                .verify_strict(cert)
                .map_err(|e| anyhow::anyhow!("failed to verify signature of {}: {}", subject, e))?;

            if depth == 0 {
                // Leaf reached: intermediaries are only trusted for the duration of this call.
                tracing::debug!(leaf = %subject, "certificate chain verified");
                return Ok(cert.clone());
            }

            let pk: VerifyingKey = cert
                .try_into()
                .map_err(|e| anyhow::anyhow!("failed to decode key from certificate: {}", e))?;
            intermediary.insert(subject, TrustedIdentity { cert: cert.clone(), pk });
        }

        bail!("certificate chain has no leaf")
    }

    /// Find an issuer in the trusted or intermediary stores
    fn find_issuer<'a>(
        &'a self,
        issuer: &str,
        intermediary: &'a BTreeMap<String, TrustedIdentity>,
    ) -> anyhow::Result<&'a TrustedIdentity> {
        self.trusted
            .get(issuer)
            .or_else(|| intermediary.get(issuer))
            .with_context(|| format!("failed to find trusted issuer {issuer}"))
    }
}

/// Checks that `issuer` may sign a certificate with `intermediates_below` CA certificates
/// between it and the leaf.
fn check_issuer(issuer: &CertificateInner, intermediates_below: usize) -> anyhow::Result<()> {
    let tbs = &issuer.tbs_certificate;
    let subject = &tbs.subject;

    let constraints = tbs
        .get::<BasicConstraints>()
        .with_context(|| format!("failed to decode basic constraints of {subject}"))?
        .map(|(_, constraints)| constraints)
        .filter(|constraints| constraints.ca)
        .with_context(|| format!("{subject} is not a certificate authority"))?;

    let can_sign = tbs
        .get::<KeyUsage>()
        .with_context(|| format!("failed to decode key usage of {subject}"))?
        .is_some_and(|(_, usage)| usage.key_cert_sign());
    if !can_sign {
        bail!("{subject} is not allowed to sign certificates");
    }

    if let Some(path_len) = constraints.path_len_constraint {
        if intermediates_below > usize::from(path_len) {
            bail!("{subject} path length {path_len} exceeded by {intermediates_below} intermediates");
        }
    }

    Ok(())
}
