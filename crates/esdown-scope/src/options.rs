//! Options recognized by the lowering core.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-unit configuration, usually read from `esdown.toml`.
///
/// ```toml
/// disallow-vars = false
/// disallow-unknown-references = true
/// environments = ["node"]
///
/// [globals]
/// jQuery = false   # read-only
/// app = true       # writable
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Options {
    /// Reject every `var` declaration.
    pub disallow_vars: bool,
    /// Report unresolved names instead of treating them as globals.
    pub disallow_unknown_references: bool,
    /// Ambient-global presets, injected in order after `builtin`.
    pub environments: Vec<String>,
    /// Extra globals; `true` marks the name writable.
    pub globals: BTreeMap<String, bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options: Options = toml::from_str("").unwrap();
        assert_eq!(options, Options::default());
    }

    #[test]
    fn test_parse_toml() {
        let options: Options = toml::from_str(
            r#"
            disallow-unknown-references = true
            environments = ["browser", "node"]

            [globals]
            jQuery = false
            app = true
            "#,
        )
        .unwrap();
        assert!(options.disallow_unknown_references);
        assert!(!options.disallow_vars);
        assert_eq!(options.environments, vec!["browser", "node"]);
        assert_eq!(options.globals.get("jQuery"), Some(&false));
        assert_eq!(options.globals.get("app"), Some(&true));
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(toml::from_str::<Options>("strict = true").is_err());
    }
}
