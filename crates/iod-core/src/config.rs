use dirs::home_dir;
use std::path::PathBuf;

/// Overrides the IoD home directory (`~/.iod`).
pub const HOME_ENV: &str = "IOD_HOME";
/// Directory the catalog is loaded from.
pub const PACKAGE_DIR_ENV: &str = "IOD_PACKAGE_DIR";
/// Private key used by the packaging tool.
pub const SIGNING_KEY_ENV: &str = "IOD_SIGNING_KEY";

/// IoD home directory (`$IOD_HOME`, else `~/.iod`), or None if the user's
/// home cannot be resolved.
fn home_from(lookup: impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    if let Some(val) = lookup(HOME_ENV).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(val));
    }
    home_dir().map(|h| h.join(".iod"))
}

/// Runtime configuration resolved from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IodConfig {
    pub package_dir: PathBuf,
    pub signing_key: Option<PathBuf>,
}

impl IodConfig {
    /// Resolve configuration from process environment variables.
    ///
    /// Returns None when no package directory is set and no home directory
    /// can be found to derive one from.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let package_dir = match lookup(PACKAGE_DIR_ENV).filter(|v| !v.is_empty()) {
            Some(dir) => PathBuf::from(dir),
            None => home_from(&lookup)?.join("packages"),
        };

        Some(Self {
            package_dir,
            signing_key: lookup(SIGNING_KEY_ENV)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn package_dir_wins() {
        let config = IodConfig::from_lookup(env(&[
            (PACKAGE_DIR_ENV, "/srv/packages"),
            (HOME_ENV, "/opt/iod"),
            (SIGNING_KEY_ENV, "/keys/iod-private.pem"),
        ]))
        .unwrap();

        assert_eq!(config.package_dir, PathBuf::from("/srv/packages"));
        assert_eq!(config.signing_key, Some(PathBuf::from("/keys/iod-private.pem")));
    }

    #[test]
    fn falls_back_to_home() {
        let config = IodConfig::from_lookup(env(&[(HOME_ENV, "/opt/iod")])).unwrap();
        assert_eq!(config.package_dir, PathBuf::from("/opt/iod/packages"));
        assert_eq!(config.signing_key, None);
    }

    #[test]
    fn empty_home_is_unset() {
        let config = IodConfig::from_lookup(env(&[(HOME_ENV, "")]));
        // Falls through to the user's ~/.iod rather than a bare `packages`.
        if let Some(config) = config {
            assert_ne!(config.package_dir, PathBuf::from("packages"));
            assert!(config.package_dir.ends_with(".iod/packages"));
        }
    }

    #[test]
    fn empty_values_are_unset() {
        let config =
            IodConfig::from_lookup(env(&[(PACKAGE_DIR_ENV, ""), (HOME_ENV, "/opt/iod"), (SIGNING_KEY_ENV, "")]))
                .unwrap();
        assert_eq!(config.package_dir, PathBuf::from("/opt/iod/packages"));
        assert!(config.signing_key.is_none());
    }
}
