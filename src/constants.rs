// SGX ATTRIBUTES / MISCSELECT layout:
// https://www.intel.com/content/dam/www/public/us/en/documents/manuals/64-ia-32-architectures-software-developer-vol-3d-part-4-manual.pdf

pub const ENCLAVE_REPORT_LEN: usize = 384;
pub const REPORT_DATA_LEN: usize = 64;
pub const MR_ENCLAVE_LEN: usize = 32;
pub const ATTRIBUTES_LEN: usize = 16;

/// The enclave has been initialized by EINIT. Set on every report produced after EINIT.
pub const SGX_FLAGS_INITTED: u64 = 1 << 0;
/// The enclave permits a debugger to read and write enclave data (EDBGRD/EDBGWR).
pub const SGX_FLAGS_DEBUG: u64 = 1 << 1;

// https://github.com/aws/aws-nitro-enclaves-nsm-api/blob/main/docs/attestation_process.md

pub const NITRO_DIGEST: &str = "SHA384";
pub const NITRO_PCR_LEN: usize = 48;

/// Application hash slot of the Nitro user data. Always zero for now.
pub const NITRO_APP_HASH: [u8; 32] = [0; 32];

/// AWS Nitro Enclaves Root-G1, from
/// https://aws-nitro-enclaves.amazonaws.com/AWS_NitroEnclaves_Root-G1.zip
///
/// SHA-256 fingerprint (DER):
/// 64:1A:03:21:A3:E2:44:EF:E4:56:46:31:95:D6:06:31:7E:D7:CD:CC:3C:17:56:E0:98:93:F3:C6:8F:79:BB:5B
pub const NITRO_ROOT_CA_PEM: &str = include_str!("../data/aws_nitro_enclaves_rootca.pem");
