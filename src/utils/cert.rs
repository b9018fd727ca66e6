use anyhow::{bail, Context};
use pem::Pem;
use x509_cert::{certificate::CertificateInner, der::Decode};

const CERTIFICATE_TAG: &str = "CERTIFICATE";

/// Parses every `CERTIFICATE` block of a PEM bundle, in order.
pub fn parse_pem_chain(input: &str) -> anyhow::Result<Vec<CertificateInner>> {
    let pems = pem::parse_many(input).context("malformed PEM")?;
    let certs = pems
        .iter()
        .filter(|p| p.tag() == CERTIFICATE_TAG)
        .map(|p| CertificateInner::from_der(p.contents()).context("malformed certificate"))
        .collect::<anyhow::Result<Vec<_>>>()?;

    if certs.is_empty() {
        bail!("no certificate found in PEM input");
    }
    Ok(certs)
}

/// Parses DER certificates, keeping their order.
pub fn parse_der_chain<B: AsRef<[u8]>>(certs: &[B]) -> anyhow::Result<Vec<CertificateInner>> {
    certs
        .iter()
        .enumerate()
        .map(|(i, der)| {
            CertificateInner::from_der(der.as_ref())
                .with_context(|| format!("malformed certificate at index {i}"))
        })
        .collect()
}

pub fn der_to_pem(der: &[u8]) -> String {
    pem::encode(&Pem::new(CERTIFICATE_TAG, der.to_vec()))
}
