use std::{fs, path::Path, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    constants::{MR_ENCLAVE_LEN, NITRO_PCR_LEN},
    error::PolicyError,
    utils::{hex_array, u32_hex, u64_hex},
};

/// Expected identity and attributes of an SGX enclave.
///
/// Stored as TOML with the bitvectors written as hex numbers:
///
/// ```toml
/// mr_enclave = "83efab03b904f491c237e0469ce71ab155d40f9512d37991a3bcb6da740c5bee"
/// misc_select_hex = "0"
/// misc_mask_hex = "FFFFFFFF"
/// attributes_flags_hex = "4"
/// attributes_xfrm_hex = "3"
/// attributes_mask_flags_hex = "FFFFFFFFFFFFFFFD"
/// attributes_mask_xfrm_hex = "FFFFFFFFFFFFFF1B"
/// allow_debug = false
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SgxPolicy {
    /// MRENCLAVE the enclave must report.
    #[serde(with = "hex_array")]
    pub mr_enclave: [u8; MR_ENCLAVE_LEN],

    #[serde(rename = "misc_select_hex", with = "u32_hex")]
    pub misc_select: u32,
    #[serde(rename = "misc_mask_hex", with = "u32_hex")]
    pub misc_mask: u32,

    /// Required ATTRIBUTES.FLAGS, excluding INITTED which is always required.
    #[serde(rename = "attributes_flags_hex", with = "u64_hex")]
    pub attributes_flags: u64,
    #[serde(rename = "attributes_xfrm_hex", with = "u64_hex")]
    pub attributes_xfrm: u64,
    #[serde(rename = "attributes_mask_flags_hex", with = "u64_hex")]
    pub attributes_mask_flags: u64,
    #[serde(rename = "attributes_mask_xfrm_hex", with = "u64_hex")]
    pub attributes_mask_xfrm: u64,

    pub allow_debug: bool,
}

impl SgxPolicy {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let content = fs::read_to_string(path)?;
        content.parse()
    }

    pub fn to_toml(&self) -> Result<String, PolicyError> {
        Ok(toml::to_string(self)?)
    }

    pub fn mr_enclave_hex(&self) -> String {
        hex::encode(self.mr_enclave)
    }
}

impl FromStr for SgxPolicy {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(s)?)
    }
}

/// Expected measurement of a Nitro enclave image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NitroPolicy {
    #[serde(rename = "pcr0", with = "hex_array")]
    pub expected_pcr0: [u8; NITRO_PCR_LEN],
}

impl NitroPolicy {
    pub fn new(expected_pcr0: [u8; NITRO_PCR_LEN]) -> Self {
        Self { expected_pcr0 }
    }

    /// Enclaves started in debug mode report an all-zero PCR0.
    pub fn debug() -> Self {
        Self::new([0; NITRO_PCR_LEN])
    }

    pub fn is_debug(&self) -> bool {
        self.expected_pcr0.iter().all(|b| *b == 0)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let content = fs::read_to_string(path)?;
        content.parse()
    }

    pub fn to_toml(&self) -> Result<String, PolicyError> {
        Ok(toml::to_string(self)?)
    }
}

impl FromStr for NitroPolicy {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(s)?)
    }
}
