//! Logical ID allocation.
//!
//! Logical IDs are derived from construct paths relative to their stack, using
//! the same scheme as the AWS CDK so that templates stay stable across
//! toolchains:
//!
//! - `Default` path components are dropped entirely.
//! - A single remaining component is used verbatim (alphanumerics only).
//! - Otherwise the human-readable part (components without `Resource`, with
//!   suffix duplicates removed) is followed by the first 8 upper-case hex
//!   characters of the MD5 of the joined path.
//!
//! Resources that must be replaced whenever some content changes (API
//! deployments) additionally carry a content hash, see [`salted`].

use md5::{Digest, Md5};

const HIDDEN_ID: &str = "Default";
const HIDDEN_FROM_HUMAN_ID: &str = "Resource";
const PATH_SEP: &str = "/";
const HASH_LEN: usize = 8;
const MAX_HUMAN_LEN: usize = 240;
const MAX_ID_LEN: usize = 255;

/// Allocate a logical ID for a construct path.
///
/// Returns an empty string for an empty (or all-`Default`) path.
#[must_use]
pub fn allocate<S: AsRef<str>>(path: &[S]) -> String {
    let components: Vec<&str> = path
        .iter()
        .map(AsRef::as_ref)
        .filter(|c| *c != HIDDEN_ID)
        .collect();

    match components.as_slice() {
        [] => String::new(),
        [single] if remove_non_alphanumeric(single).len() <= MAX_ID_LEN => {
            remove_non_alphanumeric(single)
        }
        _ => {
            let hash = path_hash(&components);
            let human: String = remove_dupes(&components)
                .into_iter()
                .filter(|c| *c != HIDDEN_FROM_HUMAN_ID)
                .map(remove_non_alphanumeric)
                .collect::<String>()
                .chars()
                .take(MAX_HUMAN_LEN)
                .collect();
            format!("{human}{hash}")
        }
    }
}

/// Append the full lower-case MD5 of `salt` to a logical ID.
#[must_use]
pub fn salted(logical_id: &str, salt: &str) -> String {
    let digest = Md5::digest(salt.as_bytes());
    format!("{logical_id}{}", hex::encode(digest.as_slice()))
}

fn path_hash(components: &[&str]) -> String {
    let digest = Md5::digest(components.join(PATH_SEP).as_bytes());
    hex::encode(digest.as_slice())[..HASH_LEN].to_uppercase()
}

/// Drop components that the previous kept component already ends with.
fn remove_dupes<'a>(components: &[&'a str]) -> Vec<&'a str> {
    let mut kept: Vec<&str> = Vec::with_capacity(components.len());
    for component in components {
        if kept.last().is_none_or(|prev| !prev.ends_with(component)) {
            kept.push(component);
        }
    }
    kept
}

fn remove_non_alphanumeric(s: &str) -> String {
    s.chars().filter(char::is_ascii_alphanumeric).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_use_single_component_verbatim() {
        assert_eq!(allocate(&["LumaIdentityPool"]), "LumaIdentityPool");
        assert_eq!(allocate(&["User-Pool.Id"]), "UserPoolId");
    }

    #[test]
    fn test_should_drop_default_components() {
        assert_eq!(allocate(&["Output", "Default"]), "Output");
        assert_eq!(allocate::<&str>(&[]), "");
    }

    #[test]
    fn test_should_hash_multi_component_paths() {
        let id = allocate(&["LumaUserPool", "Resource"]);
        assert!(id.starts_with("LumaUserPool"));
        assert_eq!(id.len(), "LumaUserPool".len() + HASH_LEN);
        assert!(
            id["LumaUserPool".len()..]
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
        );
    }

    #[test]
    fn test_should_be_deterministic_and_path_sensitive() {
        let a = allocate(&["Api", "Default", "api", "Resource"]);
        let b = allocate(&["Api", "Default", "api", "Resource"]);
        let c = allocate(&["Api", "Default", "v1", "Resource"]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_should_strip_proxy_braces_from_human_part() {
        let id = allocate(&["LumaApi", "Default", "api", "v1", "{proxy+}", "ANY", "Resource"]);
        assert!(id.starts_with("LumaApiapiv1proxyANY"));
    }

    #[test]
    fn test_should_salt_with_content_hash() {
        let base = allocate(&["Api", "Deployment", "Resource"]);
        let a = salted(&base, "[1]");
        assert!(a.starts_with(&base));
        assert_eq!(a.len(), base.len() + 32);
        assert_eq!(a, salted(&base, "[1]"));
        assert_ne!(a, salted(&base, "[2]"));
    }

    #[test]
    fn test_should_remove_suffix_duplicates() {
        let id = allocate(&["Bucket", "Bucket", "Resource"]);
        assert!(id.starts_with("Bucket"));
        assert!(!id.starts_with("BucketBucket"));
    }
}
