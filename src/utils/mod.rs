use std::time::SystemTime;

use x509_cert::certificate::CertificateInner;

pub mod cert;
pub mod hash;

/// Little-endian bitvectors carried in policy documents as hex numbers
/// (`"FFFFFFFF"`, `"0x3"`).
pub mod u32_hex {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u32, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = <String>::deserialize(deserializer)?;
        u32::from_str_radix(super::strip_hex_prefix(&s), 16).map_err(de::Error::custom)
    }

    pub fn serialize<S: Serializer>(value: &u32, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{value:08X}"))
    }
}

pub mod u64_hex {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = <String>::deserialize(deserializer)?;
        u64::from_str_radix(super::strip_hex_prefix(&s), 16).map_err(de::Error::custom)
    }

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{value:016X}"))
    }
}

fn strip_hex_prefix(s: &str) -> &str {
    let s = s.trim();
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// Fixed-size byte arrays as hex strings, rejecting any other length.
pub mod hex_array {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn deserialize<'de, D, const N: usize>(deserializer: D) -> Result<[u8; N], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = <String>::deserialize(deserializer)?;
        let bytes = hex::decode(super::strip_hex_prefix(&s)).map_err(de::Error::custom)?;
        let len = bytes.len();
        bytes
            .try_into()
            .map_err(|_| de::Error::custom(format!("expected {N} bytes but got {len}")))
    }

    pub fn serialize<S: Serializer, const N: usize>(
        value: &[u8; N],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(value))
    }
}

/// A CBOR array of byte strings, e.g. the DER certificates of a Nitro CA bundle.
pub mod byte_seq {
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_bytes::{ByteBuf, Bytes};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bufs = Vec::<ByteBuf>::deserialize(deserializer)?;
        Ok(bufs.into_iter().map(ByteBuf::into_vec).collect())
    }

    pub fn serialize<S: Serializer>(value: &[Vec<u8>], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(value.iter().map(|b| Bytes::new(b)))
    }
}

/// A CBOR map of register index to byte string (Nitro PCRs).
pub mod pcr_map {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serializer};
    use serde_bytes::{ByteBuf, Bytes};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<u8, Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let map = BTreeMap::<u8, ByteBuf>::deserialize(deserializer)?;
        Ok(map.into_iter().map(|(k, v)| (k, v.into_vec())).collect())
    }

    pub fn serialize<S: Serializer>(
        value: &BTreeMap<u8, Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_map(value.iter().map(|(k, v)| (k, Bytes::new(v))))
    }
}

pub trait Expireable {
    fn valid_at(&self, timestamp: SystemTime) -> bool;
}

impl Expireable for CertificateInner {
    /// Validate a single certificate not_before/not_after, both bounds inclusive
    fn valid_at(&self, timestamp: SystemTime) -> bool {
        let nb = self.tbs_certificate.validity.not_before.to_system_time();
        let na = self.tbs_certificate.validity.not_after.to_system_time();
        !(timestamp < nb || na < timestamp)
    }
}

impl Expireable for &[CertificateInner] {
    fn valid_at(&self, timestamp: SystemTime) -> bool {
        self.iter().all(|cert| cert.valid_at(timestamp))
    }
}

/// Removes `std::mem::size_of<T>()` bytes from the front of `bytes` and returns it as a `T`.
///
/// Returns `None` and leaves `bytes` unchanged if it isn't long enough.
pub fn read_from_bytes<T: zerocopy::FromBytes>(bytes: &mut &[u8]) -> Option<T> {
    let front = T::read_from_prefix(bytes)?;
    *bytes = &bytes[std::mem::size_of::<T>()..];
    Some(front)
}
