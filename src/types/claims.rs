use serde::{Deserialize, Serialize};

use super::nitro::NitroAttestationDocument;
use crate::{
    constants::{ATTRIBUTES_LEN, MR_ENCLAVE_LEN},
    utils::cert::der_to_pem,
};

/// Verified content of an SGX DCAP quote, produced by [`crate::sgx::extract`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DcapClaims {
    #[serde(with = "hex")]
    pub raw_quote: Vec<u8>,
    #[serde(with = "hex")]
    pub sgx_mrenclave: [u8; MR_ENCLAVE_LEN],
    /// ATTRIBUTES.FLAGS || ATTRIBUTES.XFRM, both little-endian.
    #[serde(with = "hex")]
    pub sgx_attributes: [u8; ATTRIBUTES_LEN],
    pub sgx_misc_select: u32,
    pub sgx_is_debuggable: bool,
    /// Enclave held data: the bytes whose SHA-256 the enclave put in its report data.
    #[serde(with = "hex")]
    pub sgx_ehd: Vec<u8>,
}

impl DcapClaims {
    pub fn attributes_flags(&self) -> u64 {
        let mut flags = [0; 8];
        flags.copy_from_slice(&self.sgx_attributes[..8]);
        u64::from_le_bytes(flags)
    }

    pub fn attributes_xfrm(&self) -> u64 {
        let mut xfrm = [0; 8];
        xfrm.copy_from_slice(&self.sgx_attributes[8..]);
        u64::from_le_bytes(xfrm)
    }

    pub fn mr_enclave_hex(&self) -> String {
        hex::encode(self.sgx_mrenclave)
    }

    /// The enclave held data is the DER TLS certificate served by the enclave.
    pub fn server_cert_pem(&self) -> String {
        der_to_pem(&self.sgx_ehd)
    }
}

/// Claims of an accepted attestation, whichever TEE produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claims {
    Sgx(DcapClaims),
    Nitro(NitroAttestationDocument),
}

impl Claims {
    /// MRENCLAVE for SGX, PCR0 for Nitro.
    pub fn measurement(&self) -> &[u8] {
        match self {
            Self::Sgx(claims) => &claims.sgx_mrenclave,
            Self::Nitro(doc) => doc.pcr(0).unwrap_or_default(),
        }
    }

    pub fn is_debuggable(&self) -> bool {
        match self {
            Self::Sgx(claims) => claims.sgx_is_debuggable,
            Self::Nitro(doc) => doc.pcr(0).is_some_and(|pcr| pcr.iter().all(|b| *b == 0)),
        }
    }
}

impl From<DcapClaims> for Claims {
    fn from(claims: DcapClaims) -> Self {
        Self::Sgx(claims)
    }
}

impl From<NitroAttestationDocument> for Claims {
    fn from(doc: NitroAttestationDocument) -> Self {
        Self::Nitro(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn claims() -> DcapClaims {
        let mut sgx_attributes = [0; ATTRIBUTES_LEN];
        sgx_attributes[0] = 0x07;
        sgx_attributes[8] = 0x03;
        sgx_attributes[15] = 0x80;
        DcapClaims {
            raw_quote: vec![],
            sgx_mrenclave: [0x11; MR_ENCLAVE_LEN],
            sgx_attributes,
            sgx_misc_select: 0,
            sgx_is_debuggable: true,
            sgx_ehd: vec![0x30, 0x00],
        }
    }

    #[test]
    fn attributes_are_little_endian() {
        let claims = claims();
        assert_eq!(claims.attributes_flags(), 0x07);
        assert_eq!(claims.attributes_xfrm(), 0x8000_0000_0000_0003);
        assert_eq!(claims.mr_enclave_hex(), "11".repeat(32));
        assert!(claims.server_cert_pem().starts_with("-----BEGIN CERTIFICATE-----"));
    }

    #[test]
    fn claims_json_is_hex() {
        let json = serde_json::to_value(claims()).unwrap();
        assert_eq!(json["sgx_mrenclave"], "11".repeat(32));
        assert_eq!(json["sgx_ehd"], "3000");
        let back: DcapClaims = serde_json::from_value(json).unwrap();
        assert_eq!(back, claims());
    }

    #[test]
    fn nitro_measurement_is_pcr0() {
        let doc = NitroAttestationDocument {
            module_id: "m".into(),
            timestamp: 0,
            digest: "SHA384".into(),
            pcrs: BTreeMap::from([(0, vec![0; 48]), (1, vec![1; 48])]),
            certificate: vec![],
            cabundle: vec![],
            public_key: None,
            user_data: None,
            nonce: None,
        };
        let nitro = Claims::from(doc);
        assert_eq!(nitro.measurement(), &[0; 48][..]);
        assert!(nitro.is_debuggable());

        let sgx = Claims::from(claims());
        assert_eq!(sgx.measurement(), &[0x11; 32][..]);
        assert!(sgx.is_debuggable());
    }
}
