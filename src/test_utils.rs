//! Fixtures shared by the unit tests: deterministic P-384 certificate chains, signed Nitro
//! attestation documents and SGX verification records.

use std::{
    collections::BTreeMap,
    str::FromStr,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use coset::{iana, CborSerializable, CoseSign1, CoseSign1Builder, HeaderBuilder, TaggedCborSerializable};
use p384::ecdsa::{signature::Signer, DerSignature, Signature, SigningKey, VerifyingKey};
use x509_cert::{
    builder::{Builder, CertificateBuilder, Profile},
    certificate::CertificateInner,
    der::{
        asn1::{BitString, UtcTime},
        oid::db::rfc8410::ID_ED_25519,
        Encode,
    },
    name::Name,
    serial_number::SerialNumber,
    spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned},
    time::{Time, Validity},
};

use crate::{
    constants::{ENCLAVE_REPORT_LEN, NITRO_PCR_LEN},
    nitro::expected_user_data,
    types::{
        claims::DcapClaims,
        collateral::Collateral,
        nitro::NitroAttestationDocument,
        policy::SgxPolicy,
        report::EnclaveReport,
        verification::{QuoteVerificationRecord, QuoteVerifier, VerificationStatus},
    },
    utils::{cert::der_to_pem, hash::sha256sum},
};

/// Validity bounds of every fixture certificate, in seconds since the epoch.
pub const NOT_BEFORE: u64 = 1_700_000_000;
pub const NOT_AFTER: u64 = 1_900_000_000;

/// A time at which every fixture certificate is valid.
pub fn within_validity() -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(1_750_000_000)
}

pub fn before_validity() -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(NOT_BEFORE - 86_400)
}

pub fn after_validity() -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(NOT_AFTER + 86_400)
}

pub fn signing_key(seed: u8) -> SigningKey {
    SigningKey::from_slice(&[seed; 48]).unwrap()
}

fn validity() -> Validity {
    Validity {
        not_before: Time::UtcTime(UtcTime::from_unix_duration(Duration::from_secs(NOT_BEFORE)).unwrap()),
        not_after: Time::UtcTime(UtcTime::from_unix_duration(Duration::from_secs(NOT_AFTER)).unwrap()),
    }
}

pub fn build_cert(
    profile: Profile,
    serial: u8,
    subject: &Name,
    spki: SubjectPublicKeyInfoOwned,
    issuer_key: &SigningKey,
) -> CertificateInner {
    CertificateBuilder::new(
        profile,
        SerialNumber::new(&[serial]).unwrap(),
        validity(),
        subject.clone(),
        spki,
        issuer_key,
    )
    .unwrap()
    .build::<DerSignature>()
    .unwrap()
}

/// Root -> intermediate -> leaf, all P-384, subjects distinguished by `seed`.
pub struct ChainFixture {
    pub root: CertificateInner,
    pub intermediate: CertificateInner,
    pub leaf: CertificateInner,
    pub leaf_key: SigningKey,
}

impl ChainFixture {
    pub fn new() -> Self {
        Self::with_seed(0x10)
    }

    pub fn with_seed(seed: u8) -> Self {
        let leaf_key = signing_key(seed + 2);
        let leaf_spki = SubjectPublicKeyInfoOwned::from_key(VerifyingKey::from(&leaf_key)).unwrap();
        Self::with_leaf_spki(seed, leaf_spki, leaf_key)
    }

    /// Issues an end-entity certificate signed by the leaf, which is not a CA.
    pub fn issue_under_leaf(&self, seed: u8) -> (CertificateInner, SigningKey) {
        let key = signing_key(seed);
        let name = Name::from_str(&format!("CN=issued by leaf {seed:02x},O=Enclave Tests")).unwrap();
        let cert = build_cert(
            Profile::Leaf {
                issuer: self.leaf.tbs_certificate.subject.clone(),
                enable_key_agreement: false,
                enable_key_encipherment: false,
            },
            4,
            &name,
            SubjectPublicKeyInfoOwned::from_key(VerifyingKey::from(&key)).unwrap(),
            &self.leaf_key,
        );
        (cert, key)
    }

    fn with_leaf_spki(seed: u8, leaf_spki: SubjectPublicKeyInfoOwned, leaf_key: SigningKey) -> Self {
        let root_key = signing_key(seed);
        let intermediate_key = signing_key(seed + 1);

        let root_name = Name::from_str(&format!("CN=test root {seed:02x},O=Enclave Tests")).unwrap();
        let intermediate_name =
            Name::from_str(&format!("CN=test intermediate {seed:02x},O=Enclave Tests")).unwrap();
        let leaf_name = Name::from_str(&format!("CN=test leaf {seed:02x},O=Enclave Tests")).unwrap();

        let root = build_cert(
            Profile::Root,
            1,
            &root_name,
            SubjectPublicKeyInfoOwned::from_key(VerifyingKey::from(&root_key)).unwrap(),
            &root_key,
        );
        let intermediate = build_cert(
            Profile::SubCA {
                issuer: root_name,
                path_len_constraint: None,
            },
            2,
            &intermediate_name,
            SubjectPublicKeyInfoOwned::from_key(VerifyingKey::from(&intermediate_key)).unwrap(),
            &root_key,
        );
        let leaf = build_cert(
            Profile::Leaf {
                issuer: intermediate_name,
                enable_key_agreement: false,
                enable_key_encipherment: false,
            },
            3,
            &leaf_name,
            leaf_spki,
            &intermediate_key,
        );

        Self {
            root,
            intermediate,
            leaf,
            leaf_key,
        }
    }
}

/// A Nitro signing chain plus helpers to produce COSE_Sign1 attestation documents with it.
pub struct NitroFixture {
    pub chain: ChainFixture,
}

impl NitroFixture {
    pub fn new() -> Self {
        Self {
            chain: ChainFixture::with_seed(0x20),
        }
    }

    /// The document certificate carries a P-256 key, which Nitro never uses.
    pub fn with_p256_leaf() -> Self {
        let p256_key = p256::ecdsa::SigningKey::from_slice(&[0x33; 32]).unwrap();
        let spki = SubjectPublicKeyInfoOwned::from_key(p256::ecdsa::VerifyingKey::from(&p256_key)).unwrap();
        Self {
            chain: ChainFixture::with_leaf_spki(0x30, spki, signing_key(0x32)),
        }
    }

    /// The document certificate carries an Ed25519 key, which is not an EC key at all.
    pub fn with_ed25519_leaf() -> Self {
        let spki = SubjectPublicKeyInfoOwned {
            algorithm: AlgorithmIdentifierOwned {
                oid: ID_ED_25519,
                parameters: None,
            },
            subject_public_key: BitString::from_bytes(&[0x55; 32]).unwrap(),
        };
        Self {
            chain: ChainFixture::with_leaf_spki(0x50, spki, signing_key(0x52)),
        }
    }

    pub fn root_pem(&self) -> String {
        der_to_pem(&self.chain.root.to_der().unwrap())
    }

    pub fn now(&self) -> SystemTime {
        within_validity()
    }

    pub fn before_validity(&self) -> SystemTime {
        before_validity()
    }

    pub fn after_validity(&self) -> SystemTime {
        after_validity()
    }

    /// A debug-mode document (all-zero PCRs) binding `enclave_cert`.
    pub fn document(&self, enclave_cert: &[u8]) -> NitroAttestationDocument {
        let timestamp = self
            .now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_millis() as u64;
        NitroAttestationDocument {
            module_id: "i-0f1e2d3c4b5a69788-enc0123456789abcdef".into(),
            timestamp,
            digest: "SHA384".into(),
            pcrs: (0..3u8).map(|i| (i, vec![0; NITRO_PCR_LEN])).collect::<BTreeMap<_, _>>(),
            certificate: self.chain.leaf.to_der().unwrap(),
            cabundle: vec![
                self.chain.root.to_der().unwrap(),
                self.chain.intermediate.to_der().unwrap(),
            ],
            public_key: None,
            user_data: Some(expected_user_data(enclave_cert)),
            nonce: None,
        }
    }

    fn cose(&self, payload: Vec<u8>) -> CoseSign1 {
        cose_signed_by(&self.chain.leaf_key, payload)
    }

    pub fn sign_payload(&self, payload: Vec<u8>) -> Vec<u8> {
        self.cose(payload).to_vec().unwrap()
    }

    pub fn sign(&self, doc: &NitroAttestationDocument) -> Vec<u8> {
        self.sign_payload(doc.to_cbor().unwrap())
    }

    pub fn sign_tagged(&self, doc: &NitroAttestationDocument) -> Vec<u8> {
        self.cose(doc.to_cbor().unwrap()).to_tagged_vec().unwrap()
    }
}

/// Signs `doc` with `key`, whatever certificate the document carries.
pub fn sign_with(key: &SigningKey, doc: &NitroAttestationDocument) -> Vec<u8> {
    cose_signed_by(key, doc.to_cbor().unwrap()).to_vec().unwrap()
}

fn cose_signed_by(key: &SigningKey, payload: Vec<u8>) -> CoseSign1 {
    let protected = HeaderBuilder::new()
        .algorithm(iana::Algorithm::ES384)
        .build();
    CoseSign1Builder::new()
        .protected(protected)
        .payload(payload)
        .create_signature(&[], |data| {
            let signature: Signature = key.sign(data);
            signature.to_bytes().to_vec()
        })
        .build()
}

pub const MR_ENCLAVE: [u8; 32] = [
    0x83, 0xef, 0xab, 0x03, 0xb9, 0x04, 0xf4, 0x91, 0xc2, 0x37, 0xe0, 0x46, 0x9c, 0xe7, 0x1a, 0xb1,
    0x55, 0xd4, 0x0f, 0x95, 0x12, 0xd3, 0x79, 0x91, 0xa3, 0xbc, 0xb6, 0xda, 0x74, 0x0c, 0x5b, 0xee,
];

const XFRM: u64 = 0x03;

pub fn sgx_policy() -> SgxPolicy {
    include_str!("../data/policy.toml").parse().unwrap()
}

fn attributes(flags: u64) -> [u8; 16] {
    let mut attributes = [0; 16];
    attributes[..8].copy_from_slice(&flags.to_le_bytes());
    attributes[8..].copy_from_slice(&XFRM.to_le_bytes());
    attributes
}

pub fn dcap_claims(flags: u64) -> DcapClaims {
    DcapClaims {
        raw_quote: vec![],
        sgx_mrenclave: MR_ENCLAVE,
        sgx_attributes: attributes(flags),
        sgx_misc_select: 0,
        sgx_is_debuggable: flags & 0b10 != 0,
        sgx_ehd: vec![],
    }
}

/// A fully successful verification record for an enclave bound to `ehd`.
pub fn sgx_record(ehd: &[u8], flags: u64) -> QuoteVerificationRecord {
    let mut report_data = [0; 64];
    report_data[..32].copy_from_slice(&sha256sum(ehd));
    QuoteVerificationRecord {
        pck_certificate_status: VerificationStatus::Ok,
        tcb_info_status: VerificationStatus::Ok,
        qe_identity_status: VerificationStatus::Ok,
        quote_status: VerificationStatus::Ok,
        enclave_report: Some(EnclaveReport {
            report_data,
            mr_enclave: MR_ENCLAVE,
            attributes: attributes(flags),
            misc_select: 0,
        }),
    }
}

const QUOTE_HEADER_LEN: usize = 48;

/// A v3 quote shaped byte string: 48 byte header, report body, empty signature section.
pub fn raw_quote(ehd: &[u8], flags: u64) -> Vec<u8> {
    let mut quote = vec![0; QUOTE_HEADER_LEN + ENCLAVE_REPORT_LEN + 4];
    quote[0] = 3;
    let body = &mut quote[QUOTE_HEADER_LEN..QUOTE_HEADER_LEN + ENCLAVE_REPORT_LEN];
    body[48..64].copy_from_slice(&attributes(flags));
    body[64..96].copy_from_slice(&MR_ENCLAVE);
    body[320..352].copy_from_slice(&sha256sum(ehd));
    quote
}

/// Reads the report body straight out of the quote and reports every check as passed.
pub struct TrustingVerifier;

impl QuoteVerifier for TrustingVerifier {
    fn verify(
        &self,
        quote: &[u8],
        _collateral: &Collateral,
        _current_time: SystemTime,
    ) -> anyhow::Result<QuoteVerificationRecord> {
        let body = quote
            .get(QUOTE_HEADER_LEN..QUOTE_HEADER_LEN + ENCLAVE_REPORT_LEN)
            .ok_or_else(|| anyhow::anyhow!("quote too short"))?;
        Ok(QuoteVerificationRecord {
            pck_certificate_status: VerificationStatus::Ok,
            tcb_info_status: VerificationStatus::Ok,
            qe_identity_status: VerificationStatus::Ok,
            quote_status: VerificationStatus::Ok,
            enclave_report: Some(EnclaveReport::from_report_body(body)?),
        })
    }
}

pub fn collateral() -> Collateral {
    Collateral {
        version: 1,
        pck_crl_issuer_chain: String::new(),
        root_ca_crl: String::new(),
        pck_crl: String::new(),
        tcb_info_issuer_chain: String::new(),
        tcb_info: "{}".into(),
        qe_identity_issuer_chain: String::new(),
        qe_identity: "{}".into(),
        pck_certificate: String::new(),
        pck_signing_chain: String::new(),
    }
}
