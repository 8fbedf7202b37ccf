//! SetHook transaction as submitted over the wire, and its conversion into
//! the tagged [`HookEntry`] form the processor works with.
//!
//! Hex fields stay strings and numeric fields stay raw JSON values at this
//! layer so that a bad value is reported as a structured `MalformedEntry`
//! naming the entry, not as a JSON error.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{HookFlags, HookHash, HookOn, HookParameter, Namespace};
use crate::config::ProtocolConfig;
use crate::error::SetHookError;
use crate::ledger::{AccountId, Amount};

pub const SET_HOOK_TRANSACTION_TYPE: &str = "SetHook";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct SetHookTransaction {
    pub account: AccountId,
    pub transaction_type: String,
    pub hooks: Vec<HookWrapper>,
    pub fee: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct HookWrapper {
    pub hook: HookObject,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct HookObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hook_api_version: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hook_namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hook_on: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hook_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hook_parameters: Option<Vec<HookParameterWrapper>>,
    #[serde(flatten)]
    pub unknown: BTreeMap<String, serde_json::Value>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct HookParameterWrapper {
    pub hook_parameter: HookParameterObject,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct HookParameterObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hook_parameter_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hook_parameter_value: Option<String>,
    #[serde(flatten)]
    pub unknown: BTreeMap<String, serde_json::Value>,
}

/// Where the code of an install comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HookSource {
    Code { code: Vec<u8>, api_version: u16 },
    Existing(HookHash),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstallHook {
    pub source: HookSource,
    /// Always present for `HookSource::Code`; defaults to the stored
    /// definition's value for `HookSource::Existing`.
    pub namespace: Option<Namespace>,
    pub hook_on: Option<HookOn>,
    /// Definition defaults for `HookSource::Code`, slot overrides for
    /// `HookSource::Existing`.
    pub parameters: Vec<HookParameter>,
}

/// One position of the `Hooks` array.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HookEntry {
    /// `Hook: {}`; the slot is left as it is.
    Noop,
    Install(InstallHook),
    /// `CreateCode: ""`; empties the slot.
    Clear,
    /// New metadata for the hook already in the slot. `parameters`
    /// replaces the slot's overrides when present.
    Update {
        namespace: Option<Namespace>,
        hook_on: Option<HookOn>,
        parameters: Option<Vec<HookParameter>>,
    },
    DeleteNamespace { namespace: Namespace },
}

impl HookEntry {
    pub fn is_noop(&self) -> bool {
        matches!(self, HookEntry::Noop)
    }
}

/// A SetHook whose every entry has passed stateless validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SetHookRequest {
    pub account: AccountId,
    pub fee: Amount,
    pub entries: Vec<HookEntry>,
}

impl SetHookRequest {
    /// Entries that cost more than a no-op.
    pub fn operation_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_noop()).count()
    }
}

fn parse_namespace(index: usize, raw: &str) -> Result<Namespace, SetHookError> {
    raw.parse()
        .map_err(|e| SetHookError::malformed(index, format!("HookNamespace: {e}")))
}

fn parse_hook_on(index: usize, raw: &str) -> Result<HookOn, SetHookError> {
    raw.parse()
        .map_err(|e| SetHookError::malformed(index, format!("HookOn: {e}")))
}

fn parse_uint<T: TryFrom<u64>>(
    index: usize,
    field: &str,
    value: &serde_json::Value,
) -> Result<T, SetHookError> {
    let raw = value.as_u64().ok_or_else(|| {
        SetHookError::malformed(index, format!("{field} must be an unsigned integer, got {value}"))
    })?;
    T::try_from(raw)
        .map_err(|_| SetHookError::malformed(index, format!("{field} {raw} is out of range")))
}

fn parse_hex_field(index: usize, field: &str, raw: &str) -> Result<Vec<u8>, SetHookError> {
    hex::decode(raw.trim()).map_err(|e| SetHookError::malformed(index, format!("{field}: {e}")))
}

/// Decode and bound `HookParameters`, returning them sorted by name.
fn parse_parameters(
    index: usize,
    list: &[HookParameterWrapper],
    config: &ProtocolConfig,
) -> Result<Vec<HookParameter>, SetHookError> {
    if list.len() > config.max_hook_parameters {
        return Err(SetHookError::malformed(
            index,
            format!(
                "{} HookParameters exceed the limit of {}",
                list.len(),
                config.max_hook_parameters
            ),
        ));
    }
    let mut parameters = Vec::with_capacity(list.len());
    for wrapper in list {
        let object = &wrapper.hook_parameter;
        if let Some(field) = object.unknown.keys().next() {
            return Err(SetHookError::malformed(
                index,
                format!("unsupported HookParameter field {field}"),
            ));
        }
        let name = object.hook_parameter_name.as_deref().ok_or_else(|| {
            SetHookError::malformed(index, "HookParameter requires HookParameterName")
        })?;
        let value = object.hook_parameter_value.as_deref().ok_or_else(|| {
            SetHookError::malformed(index, "HookParameter requires HookParameterValue")
        })?;
        let name = parse_hex_field(index, "HookParameterName", name)?;
        let value = parse_hex_field(index, "HookParameterValue", value)?;
        if name.is_empty() || name.len() > config.max_hook_parameter_name_size {
            return Err(SetHookError::malformed(
                index,
                format!(
                    "HookParameterName must be 1..={} bytes, got {}",
                    config.max_hook_parameter_name_size,
                    name.len()
                ),
            ));
        }
        if value.len() > config.max_hook_parameter_value_size {
            return Err(SetHookError::malformed(
                index,
                format!(
                    "HookParameterValue is {} bytes, limit {}",
                    value.len(),
                    config.max_hook_parameter_value_size
                ),
            ));
        }
        parameters.push(HookParameter { name, value });
    }
    parameters.sort();
    if let Some(pair) = parameters.windows(2).find(|w| w[0].name == w[1].name) {
        return Err(SetHookError::malformed(
            index,
            format!("duplicate HookParameterName {}", hex::encode_upper(&pair[0].name)),
        ));
    }
    Ok(parameters)
}

impl HookObject {
    pub fn is_empty(&self) -> bool {
        *self == HookObject::default()
    }

    pub fn to_entry(&self, index: usize, config: &ProtocolConfig) -> Result<HookEntry, SetHookError> {
        if let Some(field) = self.unknown.keys().next() {
            return Err(SetHookError::malformed(
                index,
                format!("unsupported field {field}"),
            ));
        }
        if self.is_empty() {
            return Ok(HookEntry::Noop);
        }

        let flags = match &self.flags {
            Some(raw) => HookFlags(parse_uint(index, "Flags", raw)?),
            None => HookFlags::default(),
        };
        if flags.ns_delete() && (self.create_code.is_some() || self.hook_hash.is_some()) {
            return Err(SetHookError::ConflictingFlags { index });
        }
        if flags.unknown_bits() != 0 {
            return Err(SetHookError::malformed(
                index,
                format!("unknown flag bits {:#010x}", flags.unknown_bits()),
            ));
        }

        if flags.ns_delete() {
            if self.hook_on.is_some()
                || self.hook_api_version.is_some()
                || self.hook_parameters.is_some()
            {
                return Err(SetHookError::malformed(
                    index,
                    "NSDELETE takes only HookNamespace",
                ));
            }
            let raw = self.hook_namespace.as_deref().ok_or_else(|| {
                SetHookError::malformed(index, "NSDELETE requires HookNamespace")
            })?;
            return Ok(HookEntry::DeleteNamespace {
                namespace: parse_namespace(index, raw)?,
            });
        }

        let namespace = self
            .hook_namespace
            .as_deref()
            .map(|raw| parse_namespace(index, raw))
            .transpose()?;
        let hook_on = self
            .hook_on
            .as_deref()
            .map(|raw| parse_hook_on(index, raw))
            .transpose()?;
        let parameters = self
            .hook_parameters
            .as_deref()
            .map(|list| parse_parameters(index, list, config))
            .transpose()?;
        let api_version: Option<u16> = self
            .hook_api_version
            .as_ref()
            .map(|raw| parse_uint(index, "HookApiVersion", raw))
            .transpose()?;
        if let Some(version) = api_version {
            if !config.supported_api_versions.contains(&version) {
                return Err(SetHookError::malformed(
                    index,
                    format!("unsupported HookApiVersion {version}"),
                ));
            }
        }

        match (&self.create_code, &self.hook_hash) {
            (Some(_), Some(_)) => Err(SetHookError::malformed(
                index,
                "CreateCode and HookHash are mutually exclusive",
            )),
            (Some(code_hex), None) if code_hex.is_empty() => {
                if namespace.is_some()
                    || hook_on.is_some()
                    || api_version.is_some()
                    || parameters.is_some()
                {
                    return Err(SetHookError::malformed(
                        index,
                        "clearing a slot takes no other fields",
                    ));
                }
                Ok(HookEntry::Clear)
            }
            (Some(code_hex), None) => {
                // hex length is checked first so huge payloads are never decoded
                let size = code_hex.len() / 2;
                if size > config.max_definition_size {
                    return Err(SetHookError::DefinitionTooLarge {
                        index,
                        size,
                        max: config.max_definition_size,
                    });
                }
                let code = hex::decode(code_hex)
                    .map_err(|e| SetHookError::malformed(index, format!("CreateCode: {e}")))?;
                let api_version = api_version.ok_or_else(|| {
                    SetHookError::malformed(index, "CreateCode requires HookApiVersion")
                })?;
                let namespace = namespace.ok_or_else(|| {
                    SetHookError::malformed(index, "CreateCode requires HookNamespace")
                })?;
                let hook_on = hook_on.ok_or_else(|| {
                    SetHookError::malformed(index, "CreateCode requires HookOn")
                })?;
                Ok(HookEntry::Install(InstallHook {
                    source: HookSource::Code { code, api_version },
                    namespace: Some(namespace),
                    hook_on: Some(hook_on),
                    parameters: parameters.unwrap_or_default(),
                }))
            }
            (None, Some(hash_hex)) => {
                if api_version.is_some() {
                    return Err(SetHookError::malformed(
                        index,
                        "HookApiVersion is fixed by the referenced definition",
                    ));
                }
                let hash: HookHash = hash_hex
                    .parse()
                    .map_err(|e| SetHookError::malformed(index, format!("HookHash: {e}")))?;
                Ok(HookEntry::Install(InstallHook {
                    source: HookSource::Existing(hash),
                    namespace,
                    hook_on,
                    parameters: parameters.unwrap_or_default(),
                }))
            }
            (None, None) => {
                if api_version.is_some() {
                    return Err(SetHookError::malformed(
                        index,
                        "HookApiVersion without CreateCode",
                    ));
                }
                if namespace.is_none() && hook_on.is_none() && parameters.is_none() {
                    // Flags: 0 alone
                    return Ok(HookEntry::Noop);
                }
                Ok(HookEntry::Update {
                    namespace,
                    hook_on,
                    parameters,
                })
            }
        }
    }
}

impl SetHookTransaction {
    /// Stateless checks over the whole transaction. Nothing here looks at
    /// the ledger.
    pub fn parse(&self, config: &ProtocolConfig) -> Result<SetHookRequest, SetHookError> {
        if self.transaction_type != SET_HOOK_TRANSACTION_TYPE {
            return Err(SetHookError::malformed_tx(format!(
                "TransactionType {} is not {SET_HOOK_TRANSACTION_TYPE}",
                self.transaction_type
            )));
        }
        if self.account.is_empty() {
            return Err(SetHookError::malformed_tx("Account is empty"));
        }
        if self.hooks.is_empty() {
            return Err(SetHookError::malformed_tx("Hooks array is empty"));
        }
        if self.hooks.len() > config.max_slots {
            return Err(SetHookError::TooManySlots {
                count: self.hooks.len(),
                max: config.max_slots,
            });
        }
        let fee: Amount = self
            .fee
            .trim()
            .parse()
            .map_err(|e| SetHookError::malformed_tx(format!("Fee {:?}: {e}", self.fee)))?;
        let entries = self
            .hooks
            .iter()
            .enumerate()
            .map(|(index, wrapper)| wrapper.hook.to_entry(index, config))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SetHookRequest {
            account: self.account.clone(),
            fee,
            entries,
        })
    }

    /// Identifier of the transaction, independent of JSON formatting.
    pub fn hash(&self) -> [u8; 32] {
        fn field(hasher: &mut Sha256, tag: &[u8], value: Option<&[u8]>) {
            if let Some(value) = value {
                hasher.update(tag);
                hasher.update((value.len() as u64).to_le_bytes());
                hasher.update(value);
            }
        }

        let mut hasher = Sha256::new();
        hasher.update(b"hookset-tx-v1");
        field(&mut hasher, b"account", Some(self.account.as_bytes()));
        field(&mut hasher, b"type", Some(self.transaction_type.as_bytes()));
        field(&mut hasher, b"fee", Some(self.fee.as_bytes()));
        hasher.update((self.hooks.len() as u64).to_le_bytes());
        for wrapper in &self.hooks {
            let hook = &wrapper.hook;
            hasher.update(b"hook");
            field(&mut hasher, b"code", hook.create_code.as_deref().map(str::as_bytes));
            let version = hook.hook_api_version.as_ref().map(|v| v.to_string());
            field(&mut hasher, b"version", version.as_deref().map(str::as_bytes));
            field(&mut hasher, b"ns", hook.hook_namespace.as_deref().map(str::as_bytes));
            field(&mut hasher, b"on", hook.hook_on.as_deref().map(str::as_bytes));
            let flags = hook.flags.as_ref().map(|f| f.to_string());
            field(&mut hasher, b"flags", flags.as_deref().map(str::as_bytes));
            field(&mut hasher, b"hash", hook.hook_hash.as_deref().map(str::as_bytes));
            if let Some(parameters) = &hook.hook_parameters {
                hasher.update(b"params");
                hasher.update((parameters.len() as u64).to_le_bytes());
                for wrapper in parameters {
                    let param = &wrapper.hook_parameter;
                    field(
                        &mut hasher,
                        b"pname",
                        param.hook_parameter_name.as_deref().map(str::as_bytes),
                    );
                    field(
                        &mut hasher,
                        b"pvalue",
                        param.hook_parameter_value.as_deref().map(str::as_bytes),
                    );
                }
            }
        }
        hasher.finalize().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    const DEADBEEF: &str = "DEADBEEFDEADBEEFDEADBEEFDEADBEEFDEADBEEFDEADBEEFDEADBEEFDEADBEEF";

    fn install(code: &[u8]) -> HookObject {
        HookObject {
            create_code: Some(hex::encode_upper(code)),
            hook_api_version: Some(json!(0)),
            hook_namespace: Some(DEADBEEF.into()),
            hook_on: Some("0000000000000000".into()),
            ..HookObject::default()
        }
    }

    fn entry(obj: HookObject) -> Result<HookEntry, SetHookError> {
        obj.to_entry(0, &ProtocolConfig::default())
    }

    #[test]
    fn parses_the_nsdelete_wire_format() {
        let json = format!(
            r#"{{
                "Account": "rAlice",
                "TransactionType": "SetHook",
                "Fee": "100000",
                "Hooks": [
                    {{ "Hook": {{ "Flags": 2, "HookNamespace": "{DEADBEEF}" }} }},
                    {{ "Hook": {{}} }}
                ]
            }}"#
        );
        let tx: SetHookTransaction = serde_json::from_str(&json).unwrap();
        let request = tx.parse(&ProtocolConfig::default()).unwrap();
        assert_eq!(request.fee, 100_000);
        assert_eq!(
            request.entries,
            vec![
                HookEntry::DeleteNamespace {
                    namespace: DEADBEEF.parse().unwrap()
                },
                HookEntry::Noop
            ]
        );
        assert_eq!(request.operation_count(), 1);
    }

    #[test]
    fn empty_hook_object_serializes_as_empty_map() {
        let wrapper = HookWrapper::default();
        assert_eq!(serde_json::to_string(&wrapper).unwrap(), r#"{"Hook":{}}"#);
    }

    #[test]
    fn install_requires_every_definition_field() {
        let parsed = entry(install(b"\0asm")).unwrap();
        assert!(matches!(parsed, HookEntry::Install(_)));
        let mut missing_on = install(b"\0asm");
        missing_on.hook_on = None;
        assert!(matches!(
            entry(missing_on),
            Err(SetHookError::MalformedEntry { index: Some(0), .. })
        ));
    }

    #[test]
    fn code_with_nsdelete_conflicts() {
        let mut obj = install(b"\0asm");
        obj.flags = Some(json!(HookFlags::NSDELETE));
        assert_eq!(entry(obj), Err(SetHookError::ConflictingFlags { index: 0 }));
    }

    #[test]
    fn oversized_code_is_rejected() {
        let config = ProtocolConfig {
            max_definition_size: 4,
            ..ProtocolConfig::default()
        };
        let err = install(b"\0asm!").to_entry(1, &config).unwrap_err();
        assert_eq!(
            err,
            SetHookError::DefinitionTooLarge {
                index: 1,
                size: 5,
                max: 4
            }
        );
    }

    #[test]
    fn rejects_bad_namespace_version_and_flags() {
        let mut short_ns = install(b"\0asm");
        short_ns.hook_namespace = Some("DEADBEEF".into());
        assert!(matches!(entry(short_ns), Err(SetHookError::MalformedEntry { .. })));

        let mut version = install(b"\0asm");
        version.hook_api_version = Some(json!(7));
        assert!(matches!(entry(version), Err(SetHookError::MalformedEntry { .. })));

        let flags = HookObject {
            flags: Some(json!(0x80)),
            hook_namespace: Some(DEADBEEF.into()),
            ..HookObject::default()
        };
        assert!(matches!(entry(flags), Err(SetHookError::MalformedEntry { .. })));

        let nsdelete_without_ns = HookObject {
            flags: Some(json!(HookFlags::NSDELETE)),
            ..HookObject::default()
        };
        assert!(matches!(
            entry(nsdelete_without_ns),
            Err(SetHookError::MalformedEntry { .. })
        ));
    }

    #[test]
    fn clear_update_and_hash_reference_variants() {
        let clear = HookObject {
            create_code: Some(String::new()),
            ..HookObject::default()
        };
        assert_eq!(entry(clear).unwrap(), HookEntry::Clear);

        let update = HookObject {
            hook_on: Some("0000000000000001".into()),
            ..HookObject::default()
        };
        assert_eq!(
            entry(update).unwrap(),
            HookEntry::Update {
                namespace: None,
                hook_on: Some(HookOn(1)),
                parameters: None,
            }
        );

        let hash = HookHash::of_code(b"\0asm");
        let by_hash = HookObject {
            hook_hash: Some(hash.to_hex()),
            ..HookObject::default()
        };
        assert_eq!(
            entry(by_hash).unwrap(),
            HookEntry::Install(InstallHook {
                source: HookSource::Existing(hash),
                namespace: None,
                hook_on: None,
                parameters: Vec::new(),
            })
        );
    }

    #[test]
    fn unknown_fields_are_malformed() {
        let obj: HookObject = serde_json::from_str(r#"{"HookGrants": []}"#).unwrap();
        assert!(matches!(entry(obj), Err(SetHookError::MalformedEntry { .. })));
    }

    #[test]
    fn mistyped_numbers_are_reported_per_entry() {
        let tx: SetHookTransaction = serde_json::from_value(json!({
            "Account": "rAlice",
            "TransactionType": "SetHook",
            "Fee": "100000",
            "Hooks": [
                { "Hook": {} },
                { "Hook": { "Flags": "2", "HookNamespace": DEADBEEF } },
            ],
        }))
        .unwrap();
        let err = tx.parse(&ProtocolConfig::default()).unwrap_err();
        assert!(matches!(err, SetHookError::MalformedEntry { index: Some(1), .. }));
        assert!(err.to_string().contains("Flags must be an unsigned integer"));

        let mut version = install(b"\0asm");
        version.hook_api_version = Some(json!(70000));
        let err = entry(version).unwrap_err();
        assert!(matches!(err, SetHookError::MalformedEntry { index: Some(0), .. }));
        assert!(err.to_string().contains("HookApiVersion 70000 is out of range"));

        let mut negative = install(b"\0asm");
        negative.hook_api_version = Some(json!(-1));
        assert!(matches!(
            entry(negative),
            Err(SetHookError::MalformedEntry { index: Some(0), .. })
        ));
    }

    fn param(name: &str, value: &str) -> HookParameterWrapper {
        HookParameterWrapper {
            hook_parameter: HookParameterObject {
                hook_parameter_name: Some(name.into()),
                hook_parameter_value: Some(value.into()),
                ..HookParameterObject::default()
            },
        }
    }

    #[test]
    fn install_carries_sorted_hook_parameters() {
        let obj: HookObject = serde_json::from_value(json!({
            "CreateCode": "0061736D",
            "HookApiVersion": 0,
            "HookNamespace": DEADBEEF,
            "HookOn": "0000000000000000",
            "HookParameters": [
                { "HookParameter": { "HookParameterName": "BB", "HookParameterValue": "02" } },
                { "HookParameter": { "HookParameterName": "AA", "HookParameterValue": "01" } },
            ],
        }))
        .unwrap();
        let HookEntry::Install(install) = entry(obj).unwrap() else {
            panic!("expected an install");
        };
        assert_eq!(
            install.parameters,
            vec![
                HookParameter {
                    name: vec![0xAA],
                    value: vec![0x01]
                },
                HookParameter {
                    name: vec![0xBB],
                    value: vec![0x02]
                },
            ]
        );
    }

    #[test]
    fn hook_parameters_are_bounded() {
        let config = ProtocolConfig::default();
        let with = |params: Vec<HookParameterWrapper>| {
            let mut obj = install(b"\0asm");
            obj.hook_parameters = Some(params);
            obj.to_entry(0, &config)
        };
        let malformed = |r: Result<HookEntry, SetHookError>| {
            matches!(r, Err(SetHookError::MalformedEntry { index: Some(0), .. }))
        };

        assert!(with(vec![param("AA", "")]).is_ok());
        assert!(malformed(with(vec![param("", "01")])));
        assert!(malformed(with(vec![param(&"AB".repeat(33), "01")])));
        assert!(malformed(with(vec![param("AA", &"CD".repeat(257))])));
        assert!(malformed(with(vec![param("AA", "01"), param("aa", "02")])));
        assert!(malformed(with(vec![param("ZZ", "01")])));
        let many = (0..17u8).map(|i| param(&hex::encode([i]), "01")).collect();
        assert!(malformed(with(many)));

        let mut missing_value = param("AA", "01");
        missing_value.hook_parameter.hook_parameter_value = None;
        assert!(malformed(with(vec![missing_value])));
    }

    #[test]
    fn nsdelete_and_clear_reject_parameters() {
        let nsdelete = HookObject {
            flags: Some(json!(HookFlags::NSDELETE)),
            hook_namespace: Some(DEADBEEF.into()),
            hook_parameters: Some(vec![param("AA", "01")]),
            ..HookObject::default()
        };
        assert!(matches!(entry(nsdelete), Err(SetHookError::MalformedEntry { .. })));
        let clear = HookObject {
            create_code: Some(String::new()),
            hook_parameters: Some(Vec::new()),
            ..HookObject::default()
        };
        assert!(matches!(entry(clear), Err(SetHookError::MalformedEntry { .. })));
    }

    #[test]
    fn transaction_level_checks() {
        let config = ProtocolConfig {
            max_slots: 2,
            ..ProtocolConfig::default()
        };
        let mut tx = SetHookTransaction {
            account: "rAlice".into(),
            transaction_type: SET_HOOK_TRANSACTION_TYPE.into(),
            hooks: vec![HookWrapper::default(); 3],
            fee: "10".into(),
        };
        assert_eq!(
            tx.parse(&config),
            Err(SetHookError::TooManySlots { count: 3, max: 2 })
        );
        tx.hooks.truncate(1);
        tx.fee = "ten".into();
        assert!(matches!(
            tx.parse(&config),
            Err(SetHookError::MalformedEntry { index: None, .. })
        ));
        tx.fee = "10".into();
        tx.transaction_type = "Payment".into();
        assert!(tx.parse(&config).is_err());
    }

    #[test]
    fn hash_ignores_json_layout() {
        let a: SetHookTransaction = serde_json::from_str(
            r#"{"Account":"rA","TransactionType":"SetHook","Fee":"10","Hooks":[{"Hook":{}}]}"#,
        )
        .unwrap();
        let b: SetHookTransaction = serde_json::from_str(
            r#"{ "Hooks": [ { "Hook": { } } ], "Fee": "10", "TransactionType": "SetHook", "Account": "rA" }"#,
        )
        .unwrap();
        assert_eq!(a.hash(), b.hash());
        let mut c = a.clone();
        c.fee = "11".into();
        assert_ne!(a.hash(), c.hash());
        let mut d = a.clone();
        d.hooks[0].hook.hook_parameters = Some(vec![param("AA", "01")]);
        assert_ne!(a.hash(), d.hash());
    }
}
