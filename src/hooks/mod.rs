//! Hook primitives shared by the definition store, slot tables, state store
//! and the SetHook processor.
//!
//! Identifiers that travel over the wire as hex (`HookNamespace`, `HookOn`,
//! definition hashes) are wrapped in newtypes here so that a malformed value
//! is rejected at parse time rather than deep inside the processor.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha512};

pub mod definition;
pub mod processor;
pub mod reserve;
pub mod slots;
pub mod state;
pub mod wire;

/// Transaction type code of SetHook itself.
pub const TT_HOOK_SET: u16 = 22;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseIdError {
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("expected {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },
}

fn decode_fixed<const N: usize>(s: &str) -> Result<[u8; N], ParseIdError> {
    let bytes = hex::decode(s.trim())?;
    if bytes.len() != N {
        return Err(ParseIdError::Length {
            expected: N,
            actual: bytes.len(),
        });
    }
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes);
    Ok(out)
}

macro_rules! hex_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name(pub [u8; 32]);

        impl $name {
            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            pub fn to_hex(&self) -> String {
                hex::encode_upper(self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                decode_fixed::<32>(s).map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let encoded = String::deserialize(deserializer)?;
                encoded.parse().map_err(D::Error::custom)
            }
        }
    };
}

hex_id!(
    /// Content address of a hook definition: SHA-512Half of its code bytes.
    HookHash
);

hex_id!(
    /// 32-byte identifier partitioning an account's hook state.
    Namespace
);

impl HookHash {
    pub fn of_code(code: &[u8]) -> Self {
        let digest = Sha512::digest(code);
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest[..32]);
        Self(out)
    }
}

/// Trigger bitmask selecting which transaction types invoke a hook.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct HookOn(pub u64);

impl HookOn {
    /// Whether a hook carrying this mask fires for `tx_type`.
    ///
    /// The SetHook bit is inverted before the whole mask is inverted, so a
    /// zero mask fires on every transaction type except SetHook.
    pub fn can_hook(&self, tx_type: u16) -> bool {
        if tx_type >= 64 {
            return false;
        }
        let mask = !(self.0 ^ (1u64 << TT_HOOK_SET));
        (mask >> tx_type) & 1 == 1
    }

    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0.to_be_bytes())
    }
}

impl FromStr for HookOn {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_fixed::<8>(s).map(|b| Self(u64::from_be_bytes(b)))
    }
}

impl fmt::Display for HookOn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for HookOn {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for HookOn {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        encoded.parse().map_err(D::Error::custom)
    }
}

/// Named install-time argument handed to a hook. Definitions carry the
/// defaults; a slot may override them by name, and an override with an empty
/// value removes the default.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct HookParameter {
    #[serde(with = "serde_bytes")]
    pub name: Vec<u8>,
    #[serde(with = "serde_bytes")]
    pub value: Vec<u8>,
}

/// Parameters a slot actually runs with: the definition's defaults with the
/// slot's overrides applied.
pub fn effective_parameters(
    defaults: &[HookParameter],
    overrides: &[HookParameter],
) -> BTreeMap<Vec<u8>, Vec<u8>> {
    let mut merged: BTreeMap<Vec<u8>, Vec<u8>> = defaults
        .iter()
        .map(|p| (p.name.clone(), p.value.clone()))
        .collect();
    for param in overrides {
        if param.value.is_empty() {
            merged.remove(&param.name);
        } else {
            merged.insert(param.name.clone(), param.value.clone());
        }
    }
    merged
}

/// Per-entry SetHook flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HookFlags(pub u32);

impl HookFlags {
    pub const NSDELETE: u32 = 0x0000_0002;
    pub const ALL: u32 = Self::NSDELETE;

    pub fn ns_delete(&self) -> bool {
        self.0 & Self::NSDELETE != 0
    }

    pub fn unknown_bits(&self) -> u32 {
        self.0 & !Self::ALL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_hook_on_fires_on_everything_but_sethook() {
        let on = HookOn(0);
        assert!(on.can_hook(0));
        assert!(on.can_hook(3));
        assert!(!on.can_hook(TT_HOOK_SET));
        let only_sethook = HookOn(1 << TT_HOOK_SET);
        assert!(only_sethook.can_hook(TT_HOOK_SET));
        assert!(only_sethook.can_hook(0));
        let skip_payment = HookOn(1);
        assert!(!skip_payment.can_hook(0));
    }

    #[test]
    fn namespace_parses_wire_hex() {
        let ns: Namespace = "DEADBEEFDEADBEEFDEADBEEFDEADBEEFDEADBEEFDEADBEEFDEADBEEFDEADBEEF"
            .parse()
            .unwrap();
        assert_eq!(ns.0[0], 0xDE);
        assert_eq!(ns.0[31], 0xEF);
        assert!("DEADBEEF".parse::<Namespace>().is_err());
        assert!("zz".repeat(32).parse::<Namespace>().is_err());
    }

    #[test]
    fn id_parse_errors_say_what_was_wrong() {
        assert_eq!(
            "DEADBEEF".parse::<Namespace>(),
            Err(ParseIdError::Length {
                expected: 32,
                actual: 4
            })
        );
        assert!(matches!(
            "zz".parse::<HookHash>(),
            Err(ParseIdError::Hex(hex::FromHexError::InvalidHexCharacter { .. }))
        ));
    }

    #[test]
    fn hook_hash_is_content_addressed() {
        let a = HookHash::of_code(b"\0asm makestate");
        let b = HookHash::of_code(b"\0asm makestate");
        let c = HookHash::of_code(b"\0asm checkstate");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn hook_on_round_trips_through_json() {
        let on: HookOn = serde_json::from_str("\"00000000004000FF\"").unwrap();
        assert_eq!(on.0, 0x0000_0000_0040_00FF);
        assert_eq!(serde_json::to_string(&on).unwrap(), "\"00000000004000FF\"");
    }

    #[test]
    fn slot_parameters_override_and_remove_defaults() {
        let param = |name: &[u8], value: &[u8]| HookParameter {
            name: name.to_vec(),
            value: value.to_vec(),
        };
        let defaults = [param(b"limit", b"\x10"), param(b"owner", b"rA"), param(b"mode", b"1")];
        let overrides = [param(b"limit", b"\x20"), param(b"mode", b"")];
        let merged = effective_parameters(&defaults, &overrides);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[&b"limit".to_vec()], b"\x20".to_vec());
        assert_eq!(merged[&b"owner".to_vec()], b"rA".to_vec());
        assert!(!merged.contains_key(&b"mode".to_vec()));
    }
}

pub(crate) mod serde_bytes {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode_upper(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        hex::decode(&encoded).map_err(D::Error::custom)
    }
}
