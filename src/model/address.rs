//! Data addresses used in routine inputs and outputs.
//!
//! A data address names one attribute of one asset. In a plan it is usually
//! written symbolically as `{asset: "local.{{Tank1}}", attribute: "temperature"}`;
//! once resolved both fields hold engine ids.

use serde::{Deserialize, Serialize};

/// A reference to a specific attribute of a specific asset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataAddress {
    /// Asset id, or a symbolic `<scope>.{{<name>}}` reference.
    pub asset: String,
    /// Attribute id, or a plain attribute name.
    pub attribute: String,
}

/// The value bound to an input or output element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataAddressValue {
    /// A single address.
    Single(DataAddress),
    /// A list of addresses.
    Many(Vec<DataAddress>),
}

/// Where a symbolic asset reference is looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceScope {
    /// Plan-owned assets of the state.
    Local,
    /// Imported assets of the state.
    Imported,
}

/// A parsed `<scope>.{{<name>}}` asset reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolicRef<'a> {
    /// The scope prefix as written.
    pub scope: &'a str,
    /// Referenced asset name.
    pub name: &'a str,
}

impl DataAddress {
    /// Creates a data address.
    #[must_use]
    pub fn new(asset: &str, attribute: &str) -> Self {
        Self {
            asset: asset.to_string(),
            attribute: attribute.to_string(),
        }
    }

    /// Creates a symbolic address to an asset in the local scope.
    #[must_use]
    pub fn local(asset_name: &str, attribute: &str) -> Self {
        Self::new(&format!("local.{{{{{asset_name}}}}}"), attribute)
    }

    /// Parses the asset field as a symbolic reference.
    #[must_use]
    pub fn symbolic_asset(&self) -> Option<SymbolicRef<'_>> {
        parse_symbolic(&self.asset)
    }
}

impl SymbolicRef<'_> {
    /// Resolves the written scope to a known scope.
    #[must_use]
    pub fn known_scope(&self) -> Option<ReferenceScope> {
        match self.scope {
            "local" => Some(ReferenceScope::Local),
            "imported" => Some(ReferenceScope::Imported),
            _ => None,
        }
    }
}

/// Parses `<scope>.{{<name>}}`.
#[must_use]
pub fn parse_symbolic(value: &str) -> Option<SymbolicRef<'_>> {
    let (scope, rest) = value.trim().split_once('.')?;
    let name = rest.strip_prefix("{{")?.strip_suffix("}}")?.trim();

    if scope.is_empty() || name.is_empty() || !is_identifier(scope) {
        return None;
    }

    Some(SymbolicRef { scope, name })
}

/// Whether a value is syntactically usable as a concrete engine id.
#[must_use]
pub fn is_identifier(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_symbolic() {
        let parsed = parse_symbolic("local.{{Tank1}}");
        assert_eq!(parsed, Some(SymbolicRef { scope: "local", name: "Tank1" }));

        let parsed = parse_symbolic("imported.{{ Main Boiler }}");
        assert_eq!(
            parsed.map(|p| (p.known_scope(), p.name)),
            Some((Some(ReferenceScope::Imported), "Main Boiler"))
        );
    }

    #[test]
    fn test_parse_symbolic_rejects_plain_ids() {
        assert!(parse_symbolic("A1").is_none());
        assert!(parse_symbolic("local.Tank1").is_none());
        assert!(parse_symbolic("local.{{}}").is_none());
        assert!(parse_symbolic(".{{Tank1}}").is_none());
    }

    #[test]
    fn test_local_constructor_round_trips() {
        let address = DataAddress::local("Tank1", "temperature");
        assert_eq!(address.asset, "local.{{Tank1}}");
        assert_eq!(address.symbolic_asset().map(|s| s.name), Some("Tank1"));
    }

    #[test]
    fn test_value_shapes_deserialize() {
        let single: DataAddressValue =
            serde_yaml::from_str("{asset: A1, attribute: T1}").expect("single");
        assert!(matches!(single, DataAddressValue::Single(_)));

        let many: DataAddressValue =
            serde_yaml::from_str("[{asset: A1, attribute: T1}, {asset: A2, attribute: T2}]")
                .expect("many");
        assert!(matches!(many, DataAddressValue::Many(ref v) if v.len() == 2));
    }

    #[test]
    fn test_identifier_syntax() {
        assert!(is_identifier("3f2a-11ee_b9"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("local.{{Tank1}}"));
    }
}
