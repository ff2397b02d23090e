//! Tenant configuration container with per-key visibility tiers
//!
//! Every config key carries a visibility tier deciding how far it may
//! travel: `public` keys may reach the browser, `protected` keys stop at
//! server-side rendering, `private` keys never leave the backend. A key
//! with no explicit tier is private.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::{TenancyError, TenancyResult};

/// Companion key carrying the visibility map in the legacy flat format
/// and in outward-facing dumps.
pub const VISIBILITY_KEY: &str = "__visibility";

/// Visibility tier of a single config key
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Browser-exposable
    Public,
    /// Server-side rendering only, never the browser
    Protected,
    /// Backend-only, never serialized outward
    Private,
}

impl Visibility {
    /// Wire name of the tier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Protected => "protected",
            Self::Private => "private",
        }
    }

    /// Parse a wire name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "public" => Some(Self::Public),
            "protected" => Some(Self::Protected),
            "private" => Some(Self::Private),
            _ => None,
        }
    }
}

/// A batch of config entries contributed by a seeder, pipe or provider
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFragment {
    /// Contributed values
    pub values: BTreeMap<String, Value>,
    /// Visibility for contributed keys; keys absent here stay private
    pub visibility: BTreeMap<String, Visibility>,
}

impl ConfigFragment {
    /// Empty fragment
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry, chainable
    pub fn with(
        mut self,
        key: impl Into<String>,
        value: Value,
        visibility: Option<Visibility>,
    ) -> Self {
        self.insert(key, value, visibility);
        self
    }

    /// Add an entry
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: Value,
        visibility: Option<Visibility>,
    ) {
        let key = key.into();
        if let Some(vis) = visibility {
            self.visibility.insert(key.clone(), vis);
        }
        self.values.insert(key, value);
    }

    /// True when the fragment contributes nothing
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Tenant configuration: a JSON value bag with a lockstep visibility map
///
/// The value map and the visibility map move in lockstep: forgetting a key
/// drops its tier, and a tier can only exist for a present key. An
/// optional subscription tier label travels alongside but is not part of
/// the lockstep.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TenantConfig {
    config: BTreeMap<String, Value>,
    visibility: BTreeMap<String, Visibility>,
    tier: Option<String>,
}

impl TenantConfig {
    /// Empty config
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.config.get(key)
    }

    /// Get a value, falling back to a default
    pub fn get_or<'a>(&'a self, key: &str, default: &'a Value) -> &'a Value {
        self.config.get(key).unwrap_or(default)
    }

    /// Set a value. A new key starts private; an existing key keeps its tier.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.config.insert(key.into(), value);
    }

    /// Set a value together with its visibility tier
    pub fn set_with_visibility(
        &mut self,
        key: impl Into<String>,
        value: Value,
        visibility: Visibility,
    ) {
        let key = key.into();
        self.visibility.insert(key.clone(), visibility);
        self.config.insert(key, value);
    }

    /// True when the key is present
    pub fn has(&self, key: &str) -> bool {
        self.config.contains_key(key)
    }

    /// Remove a key and its visibility entry
    pub fn forget(&mut self, key: &str) {
        self.config.remove(key);
        self.visibility.remove(key);
    }

    /// Visibility of a key; absent keys and keys without an explicit tier
    /// are private
    pub fn visibility_of(&self, key: &str) -> Visibility {
        self.visibility
            .get(key)
            .copied()
            .unwrap_or(Visibility::Private)
    }

    /// Change the tier of an existing key. Returns false when the key is
    /// absent (a tier cannot exist without its key).
    pub fn set_visibility(&mut self, key: &str, visibility: Visibility) -> bool {
        if !self.config.contains_key(key) {
            return false;
        }
        self.visibility.insert(key.to_string(), visibility);
        true
    }

    /// Subscription tier label
    pub fn tier(&self) -> Option<&str> {
        self.tier.as_deref()
    }

    /// Set the subscription tier label
    pub fn set_tier(&mut self, tier: Option<String>) {
        self.tier = tier;
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.config.len()
    }

    /// True when no keys are present
    pub fn is_empty(&self) -> bool {
        self.config.is_empty()
    }

    /// All values, keyed
    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.config
    }

    /// The explicit visibility entries
    pub fn visibility(&self) -> &BTreeMap<String, Visibility> {
        &self.visibility
    }

    /// Keys with tier `public`
    pub fn public_view(&self) -> BTreeMap<String, Value> {
        self.view(Visibility::Public)
    }

    /// Keys with tier `public` or `protected`
    pub fn protected_view(&self) -> BTreeMap<String, Value> {
        self.view(Visibility::Protected)
    }

    fn view(&self, max: Visibility) -> BTreeMap<String, Value> {
        self.config
            .iter()
            .filter(|(k, _)| self.visibility_of(k) <= max)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Merge a fragment, filling only keys still absent
    pub fn merge_absent(&mut self, fragment: ConfigFragment) {
        for (key, value) in fragment.values {
            if self.config.contains_key(&key) {
                continue;
            }
            if let Some(vis) = fragment.visibility.get(&key) {
                self.visibility.insert(key.clone(), *vis);
            }
            self.config.insert(key, value);
        }
    }

    /// Persisted representation: `{"config": .., "visibility": .., "tier": ..}`
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "config": self.config,
            "visibility": self.visibility,
            "tier": self.tier,
        })
    }

    /// Decode a persisted representation, upgrading the legacy flat format.
    ///
    /// The structured shape is an object with a `"config"` object inside.
    /// Anything else that is an object is treated as the legacy flat map:
    /// plain key/value pairs with an inline `__visibility` companion key.
    pub fn from_value(value: &Value) -> TenancyResult<Self> {
        let obj = match value.as_object() {
            Some(obj) => obj,
            None => {
                return Err(TenancyError::InvalidConfigShape(
                    "not a JSON object".into(),
                ))
            }
        };

        if obj.contains_key("config") {
            Self::from_structured(obj)
        } else {
            Self::from_legacy_flat(obj)
        }
    }

    /// Decode a persisted representation, falling back to an empty
    /// all-private config on malformed input instead of failing the read.
    pub fn from_value_lossy(value: &Value) -> Self {
        match Self::from_value(value) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(error = %err, "malformed tenant config, using empty private config");
                Self::default()
            }
        }
    }

    fn from_structured(obj: &serde_json::Map<String, Value>) -> TenancyResult<Self> {
        let config_obj = obj
            .get("config")
            .and_then(Value::as_object)
            .ok_or_else(|| TenancyError::InvalidConfigShape("'config' is not an object".into()))?;

        let mut config = BTreeMap::new();
        for (key, value) in config_obj {
            config.insert(key.clone(), value.clone());
        }

        let visibility = match obj.get("visibility") {
            None | Some(Value::Null) => BTreeMap::new(),
            Some(value) => Self::parse_visibility(value)?,
        };

        let tier = match obj.get("tier") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                return Err(TenancyError::InvalidConfigShape("'tier' is not a string".into()))
            }
        };

        Ok(Self::with_lockstep(config, visibility, tier))
    }

    fn from_legacy_flat(obj: &serde_json::Map<String, Value>) -> TenancyResult<Self> {
        let visibility = match obj.get(VISIBILITY_KEY) {
            None | Some(Value::Null) => BTreeMap::new(),
            Some(value) => Self::parse_visibility(value)?,
        };

        let mut config = BTreeMap::new();
        for (key, value) in obj {
            if key == VISIBILITY_KEY {
                continue;
            }
            config.insert(key.clone(), value.clone());
        }

        Ok(Self::with_lockstep(config, visibility, None))
    }

    fn parse_visibility(value: &Value) -> TenancyResult<BTreeMap<String, Visibility>> {
        let obj = value.as_object().ok_or_else(|| {
            TenancyError::InvalidConfigShape("visibility map is not an object".into())
        })?;

        let mut visibility = BTreeMap::new();
        for (key, tier) in obj {
            let name = tier.as_str().ok_or_else(|| {
                TenancyError::InvalidConfigShape(format!("visibility of '{key}' is not a string"))
            })?;
            let vis = Visibility::parse(name).ok_or_else(|| {
                TenancyError::InvalidConfigShape(format!("unknown visibility tier '{name}'"))
            })?;
            visibility.insert(key.clone(), vis);
        }
        Ok(visibility)
    }

    // Visibility entries for keys that are not present are dropped.
    fn with_lockstep(
        config: BTreeMap<String, Value>,
        mut visibility: BTreeMap<String, Visibility>,
        tier: Option<String>,
    ) -> Self {
        visibility.retain(|key, _| config.contains_key(key));
        Self {
            config,
            visibility,
            tier,
        }
    }
}

impl Serialize for TenantConfig {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        #[derive(Serialize)]
        struct Stored<'a> {
            config: &'a BTreeMap<String, Value>,
            visibility: &'a BTreeMap<String, Visibility>,
            tier: &'a Option<String>,
        }

        Stored {
            config: &self.config,
            visibility: &self.visibility,
            tier: &self.tier,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TenantConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_value_lossy(&value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> TenantConfig {
        let mut config = TenantConfig::new();
        config.set_with_visibility("app_name", json!("Acme"), Visibility::Public);
        config.set_with_visibility("support_email", json!("help@acme.test"), Visibility::Protected);
        config.set_with_visibility("secret_key", json!("s3cr3t"), Visibility::Private);
        config.set("internal_note", json!("no explicit tier"));
        config.set_tier(Some("business".into()));
        config
    }

    #[test]
    fn test_round_trip() {
        let config = sample();
        let restored = TenantConfig::from_value(&config.to_value()).unwrap();
        assert_eq!(config, restored);
    }

    #[test]
    fn test_serde_round_trip() {
        let config = sample();
        let encoded = serde_json::to_string(&config).unwrap();
        let decoded: TenantConfig = serde_json::from_str(&encoded).unwrap();
        assert_eq!(config, decoded);
    }

    #[test]
    fn test_default_visibility_is_private() {
        let mut config = TenantConfig::new();
        config.set("x", json!(1));

        assert_eq!(config.visibility_of("x"), Visibility::Private);
        assert!(!config.protected_view().contains_key("x"));
        assert!(!config.public_view().contains_key("x"));
    }

    #[test]
    fn test_view_containment() {
        let config = sample();
        let public = config.public_view();
        let protected = config.protected_view();

        assert_eq!(public.len(), 1);
        assert!(public.contains_key("app_name"));

        assert_eq!(protected.len(), 2);
        assert!(protected.contains_key("app_name"));
        assert!(protected.contains_key("support_email"));

        assert!(!protected.contains_key("secret_key"));
        assert!(!protected.contains_key("internal_note"));
    }

    #[test]
    fn test_forget_drops_visibility() {
        let mut config = sample();
        config.forget("app_name");

        assert!(!config.has("app_name"));
        assert_eq!(config.visibility_of("app_name"), Visibility::Private);
        assert!(config.visibility().get("app_name").is_none());
    }

    #[test]
    fn test_set_visibility_requires_key() {
        let mut config = TenantConfig::new();
        assert!(!config.set_visibility("ghost", Visibility::Public));

        config.set("ghost", json!(true));
        assert!(config.set_visibility("ghost", Visibility::Public));
        assert_eq!(config.visibility_of("ghost"), Visibility::Public);
    }

    #[test]
    fn test_legacy_flat_map_upgrade() {
        let legacy = json!({
            "app_name": "Acme",
            "secret_key": "s3cr3t",
            "__visibility": { "app_name": "public" }
        });

        let config = TenantConfig::from_value(&legacy).unwrap();
        assert_eq!(config.get("app_name"), Some(&json!("Acme")));
        assert_eq!(config.visibility_of("app_name"), Visibility::Public);
        assert_eq!(config.visibility_of("secret_key"), Visibility::Private);
        assert!(!config.has(VISIBILITY_KEY));
        assert_eq!(config.tier(), None);
    }

    #[test]
    fn test_malformed_falls_back_to_empty() {
        for bad in [json!("just a string"), json!(42), json!([1, 2, 3])] {
            assert!(TenantConfig::from_value(&bad).is_err());
            let config = TenantConfig::from_value_lossy(&bad);
            assert!(config.is_empty());
        }

        let bad_tier = json!({ "a": 1, "__visibility": { "a": "browser" } });
        assert!(TenantConfig::from_value(&bad_tier).is_err());
        assert!(TenantConfig::from_value_lossy(&bad_tier).is_empty());
    }

    #[test]
    fn test_visibility_without_key_is_dropped() {
        let stored = json!({
            "config": { "a": 1 },
            "visibility": { "a": "public", "orphan": "protected" },
            "tier": null
        });

        let config = TenantConfig::from_value(&stored).unwrap();
        assert_eq!(config.visibility().len(), 1);
        assert_eq!(config.visibility_of("orphan"), Visibility::Private);
    }

    #[test]
    fn test_merge_absent() {
        let mut config = TenantConfig::new();
        config.set_with_visibility("kept", json!("original"), Visibility::Public);

        let fragment = ConfigFragment::new()
            .with("kept", json!("overwritten"), Some(Visibility::Private))
            .with("added", json!(7), Some(Visibility::Protected));
        config.merge_absent(fragment);

        assert_eq!(config.get("kept"), Some(&json!("original")));
        assert_eq!(config.visibility_of("kept"), Visibility::Public);
        assert_eq!(config.get("added"), Some(&json!(7)));
        assert_eq!(config.visibility_of("added"), Visibility::Protected);
    }
}
