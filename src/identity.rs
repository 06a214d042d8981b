use serde::{Deserialize, Serialize};

/// A user record as the backend hands it out. Depending on which service
/// produced it, the identifier arrives as `userId` or as `_id`; neither
/// spelling is guaranteed, and some records carry both.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawUser {
    #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// The single resolved identifier for a user. Every cache key and every
/// id comparison in the crate goes through this type, so the two source
/// spellings never leak past the session boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalId(String);

impl CanonicalId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CanonicalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolve the canonical id: first non-empty of `userId` then `_id`.
/// Whitespace-only values count as absent.
pub fn canonical_id(user: &RawUser) -> Option<CanonicalId> {
    [&user.user_id, &user.record_id]
        .into_iter()
        .flatten()
        .map(|id| id.trim())
        .find(|id| !id.is_empty())
        .map(|id| CanonicalId(id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(primary: Option<&str>, secondary: Option<&str>) -> RawUser {
        RawUser {
            user_id: primary.map(String::from),
            record_id: secondary.map(String::from),
            name: None,
        }
    }

    #[test]
    fn test_primary_field_wins_when_both_present() {
        let resolved = canonical_id(&user(Some("u-1"), Some("m-2"))).unwrap();
        assert_eq!(resolved.as_str(), "u-1");
    }

    #[test]
    fn test_secondary_field_used_when_primary_missing() {
        let resolved = canonical_id(&user(None, Some("m-2"))).unwrap();
        assert_eq!(resolved.as_str(), "m-2");
    }

    #[test]
    fn test_empty_primary_falls_through_to_secondary() {
        let resolved = canonical_id(&user(Some(""), Some("m-2"))).unwrap();
        assert_eq!(resolved.as_str(), "m-2");

        let resolved = canonical_id(&user(Some("   "), Some("m-2"))).unwrap();
        assert_eq!(resolved.as_str(), "m-2");
    }

    #[test]
    fn test_no_id_resolves_to_none() {
        assert!(canonical_id(&user(None, None)).is_none());
        assert!(canonical_id(&user(Some(""), Some(""))).is_none());
    }

    #[test]
    fn test_resolved_id_is_trimmed() {
        let resolved = canonical_id(&user(Some("  u-1 "), None)).unwrap();
        assert_eq!(resolved.as_str(), "u-1");
    }

    #[test]
    fn test_deserializes_either_spelling() {
        let raw: RawUser = serde_json::from_str(r#"{"_id": "abc", "name": "Dana"}"#).unwrap();
        assert_eq!(canonical_id(&raw).unwrap().as_str(), "abc");

        let raw: RawUser = serde_json::from_str(r#"{"userId": "xyz"}"#).unwrap();
        assert_eq!(canonical_id(&raw).unwrap().as_str(), "xyz");
    }
}
