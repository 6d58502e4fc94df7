//! Parsing of the free-form `target-repository` and `permissions` inputs.
//!
//! Both inputs accept either JSON or a terse comma/newline separated form. A value
//! that parses as JSON is committed to the JSON path: shape or validation errors
//! after that point are final and never retried as delimited text.

use std::fmt::Display;

use indexmap::IndexMap;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub(crate) enum ParseError {
    #[error("Input is a JSON, but is not supported: requires array of strings or string")]
    UnsupportedRepositoryJson,
    #[error("Input is a JSON array, but contains non-string values")]
    NonStringRepository,
    #[error("Invalid repository format: {0}. Must be in the format 'owner/repo'.")]
    InvalidRepository(String),
    #[error("Input is a JSON, but is not supported: requires an object with permission to access")]
    UnsupportedPermissionsJson,
    #[error("Invalid access for {permission}: {access}. Must be one of 'read', 'write'.")]
    InvalidAccess { permission: String, access: String },
    #[error("Invalid permission '{0}'. Must be in the format 'permission: access' or 'permission=access'.")]
    MalformedPermission(String),
}

/// A repository in the `owner/name` form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub(crate) struct RepositoryIdentifier(String);

impl RepositoryIdentifier {
    pub(crate) fn parse(value: &str) -> Result<Self, ParseError> {
        let mut segments = value.split('/');
        let valid = match (segments.next(), segments.next(), segments.next()) {
            (Some(owner), Some(name), None) => is_valid_segment(owner) && is_valid_segment(name),
            _ => false,
        };

        if valid {
            Ok(Self(value.to_string()))
        } else {
            Err(ParseError::InvalidRepository(value.to_string()))
        }
    }

    pub(crate) fn owner(&self) -> &str {
        self.0.split_once('/').map(|(owner, _)| owner).unwrap_or_default()
    }

    pub(crate) fn name(&self) -> &str {
        self.0.split_once('/').map(|(_, name)| name).unwrap_or_default()
    }
}

impl Display for RepositoryIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

/// Repositories in input order, duplicates kept.
pub(crate) type RepositoryList = Vec<RepositoryIdentifier>;

/// Access that may be requested. `none` only ever appears in responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum AccessLevel {
    Read,
    Write,
}

impl AccessLevel {
    fn parse(permission: &str, access: &str) -> Result<Self, ParseError> {
        match access {
            "read" => Ok(AccessLevel::Read),
            "write" => Ok(AccessLevel::Write),
            other => Err(ParseError::InvalidAccess {
                permission: permission.to_string(),
                access: other.to_string(),
            }),
        }
    }
}

impl Display for AccessLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessLevel::Read => f.write_str("read"),
            AccessLevel::Write => f.write_str("write"),
        }
    }
}

/// Requested permissions, in first-seen order. A repeated name keeps its
/// position and takes the last value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub(crate) struct PermissionMap(IndexMap<String, AccessLevel>);

impl PermissionMap {
    fn insert(&mut self, permission: &str, access: &str) -> Result<(), ParseError> {
        let permission = permission.trim();
        let access = AccessLevel::parse(permission, access.trim())?;
        self.0.insert(permission.to_string(), access);
        Ok(())
    }

    pub(crate) fn len(&self) -> usize {
        self.0.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&str, AccessLevel)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

fn split_delimited(input: &str) -> impl Iterator<Item = &str> {
    input
        .split(['\n', ','])
        .map(str::trim)
        .filter(|item| !item.is_empty())
}

/// Parses repositories given as a JSON array, a JSON string, or a comma/newline
/// separated list. May return an empty list; callers decide whether that is an error.
///
/// Examples:
/// - `owner/repo1, owner/repo2`
/// - `owner/repo1\nowner/repo2`
/// - `["owner/repo1", "owner/repo2"]`
pub(crate) fn parse_repository_list(input: &str) -> Result<RepositoryList, ParseError> {
    let Ok(json) = serde_json::from_str::<serde_json::Value>(input) else {
        return split_delimited(input)
            .map(RepositoryIdentifier::parse)
            .collect();
    };

    match json {
        serde_json::Value::Array(items) => {
            let items = items
                .iter()
                .map(|item| item.as_str().ok_or(ParseError::NonStringRepository))
                .collect::<Result<Vec<_>, _>>()?;

            items
                .into_iter()
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(RepositoryIdentifier::parse)
                .collect()
        }
        serde_json::Value::String(repository) => {
            Ok(vec![RepositoryIdentifier::parse(repository.trim())?])
        }
        _ => Err(ParseError::UnsupportedRepositoryJson),
    }
}

/// Parses permissions given as a JSON object or as `name: access` / `name=access`
/// pairs separated by commas or newlines. May return an empty map.
pub(crate) fn parse_permission_map(input: &str) -> Result<PermissionMap, ParseError> {
    let mut permissions = PermissionMap::default();

    let Ok(json) = serde_json::from_str::<serde_json::Value>(input) else {
        for segment in split_delimited(input) {
            let Some((permission, access)) = segment.split_once([':', '=']) else {
                return Err(ParseError::MalformedPermission(segment.to_string()));
            };
            if permission.trim().is_empty() {
                return Err(ParseError::MalformedPermission(segment.to_string()));
            }
            permissions.insert(permission, access)?;
        }
        return Ok(permissions);
    };

    let serde_json::Value::Object(entries) = json else {
        return Err(ParseError::UnsupportedPermissionsJson);
    };

    for (permission, access) in &entries {
        match access {
            serde_json::Value::String(access) => permissions.insert(permission, access)?,
            other => {
                return Err(ParseError::InvalidAccess {
                    permission: permission.trim().to_string(),
                    access: other.to_string(),
                })
            }
        }
    }

    Ok(permissions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &RepositoryList) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn repositories_comma_separated() {
        let list = parse_repository_list("owner/repo1, owner/repo2").unwrap();
        assert_eq!(names(&list), ["owner/repo1", "owner/repo2"]);
    }

    #[test]
    fn repositories_multiline_matches_json() {
        let text = parse_repository_list("\n   owner/repo1\n   owner/repo2,,\n\n owner/repo1\n").unwrap();
        let json =
            parse_repository_list(r#"[" owner/repo1", "owner/repo2 ", "", "owner/repo1"]"#).unwrap();
        assert_eq!(text, json);
        assert_eq!(names(&text), ["owner/repo1", "owner/repo2", "owner/repo1"]);
    }

    #[test]
    fn repositories_json_string() {
        let list = parse_repository_list(r#""my-org/my.repo_1""#).unwrap();
        assert_eq!(names(&list), ["my-org/my.repo_1"]);
        assert_eq!(list[0].owner(), "my-org");
        assert_eq!(list[0].name(), "my.repo_1");
    }

    #[test]
    fn repositories_empty_input_is_not_an_error() {
        assert!(parse_repository_list("").unwrap().is_empty());
        assert!(parse_repository_list(" ,\n ,").unwrap().is_empty());
        assert!(parse_repository_list("[]").unwrap().is_empty());
    }

    #[test]
    fn repositories_unsupported_json_shapes() {
        for input in [r#"{"repository": "owner/repo1"}"#, "42", "true", "null"] {
            assert_eq!(
                parse_repository_list(input).unwrap_err(),
                ParseError::UnsupportedRepositoryJson,
                "{input}"
            );
        }
    }

    #[test]
    fn repositories_json_array_with_non_strings() {
        let err = parse_repository_list(r#"["owner/repo1", 7]"#).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Input is a JSON array, but contains non-string values"
        );
    }

    #[test]
    fn repositories_invalid_format() {
        for input in ["owner", "owner/repo/extra", "/repo", "owner/", "own er/repo", "owner/re$po"] {
            assert_eq!(
                parse_repository_list(input).unwrap_err(),
                ParseError::InvalidRepository(input.to_string()),
            );
        }

        let err = parse_repository_list("owner/repo1, nope").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid repository format: nope. Must be in the format 'owner/repo'."
        );
    }

    #[test]
    fn repositories_json_errors_do_not_fall_back_to_text() {
        // As text this would be a valid single repository.
        let err = parse_repository_list(r#"["owner/repo1,owner/repo2"]"#).unwrap_err();
        assert_eq!(
            err,
            ParseError::InvalidRepository("owner/repo1,owner/repo2".to_string())
        );
    }

    #[test]
    fn permissions_text_and_json_agree() {
        let text = parse_permission_map("contents: read, issues: write").unwrap();
        let json = parse_permission_map(r#"{"contents":"read","issues":"write"}"#).unwrap();
        assert_eq!(text, json);
        assert_eq!(
            text.iter().collect::<Vec<_>>(),
            [("contents", AccessLevel::Read), ("issues", AccessLevel::Write)]
        );
    }

    #[test]
    fn permissions_multiline_mixed_separators() {
        let permissions = parse_permission_map(
            "\n    actions: read\n    contents : read\n    issues = write\n    pull-requests=read\n",
        )
        .unwrap();
        let entries: Vec<_> = permissions.iter().collect();
        assert_eq!(
            entries,
            [
                ("actions", AccessLevel::Read),
                ("contents", AccessLevel::Read),
                ("issues", AccessLevel::Write),
                ("pull-requests", AccessLevel::Read),
            ]
        );
    }

    #[test]
    fn permissions_last_occurrence_wins_in_first_position() {
        let permissions = parse_permission_map("issues: read, contents: read, issues: write").unwrap();
        let entries: Vec<_> = permissions.iter().collect();
        assert_eq!(
            entries,
            [("issues", AccessLevel::Write), ("contents", AccessLevel::Read)]
        );
    }

    #[test]
    fn permissions_serialize_in_order() {
        let permissions = parse_permission_map("issues=write\ncontents=read").unwrap();
        assert_eq!(
            serde_json::to_string(&permissions).unwrap(),
            r#"{"issues":"write","contents":"read"}"#
        );
    }

    #[test]
    fn permissions_json_keeps_document_order() {
        let permissions =
            parse_permission_map(r#"{"issues":"read","contents":"read","issues":"write"}"#).unwrap();
        assert_eq!(
            serde_json::to_string(&permissions).unwrap(),
            r#"{"issues":"write","contents":"read"}"#
        );
    }

    #[test]
    fn permissions_json_trims_keys_and_values() {
        let permissions = parse_permission_map(r#"{" contents ": " read "}"#).unwrap();
        assert_eq!(
            permissions.iter().collect::<Vec<_>>(),
            [("contents", AccessLevel::Read)]
        );
    }

    #[test]
    fn permissions_empty_input_is_not_an_error() {
        assert!(parse_permission_map("").unwrap().is_empty());
        assert!(parse_permission_map("{}").unwrap().is_empty());
        assert!(parse_permission_map(" \n , ").unwrap().is_empty());
    }

    #[test]
    fn permissions_invalid_access_values() {
        let err = parse_permission_map(r#"{"actions": {}}"#).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid access for actions: {}. Must be one of 'read', 'write'."
        );

        let err = parse_permission_map(r#"{"actions": 1}"#).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid access for actions: 1. Must be one of 'read', 'write'."
        );

        let err = parse_permission_map("contents: read, deployments: deploy").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid access for deployments: deploy. Must be one of 'read', 'write'."
        );

        // `none` is only ever granted, never requested
        assert!(parse_permission_map("contents: none").is_err());
        assert!(parse_permission_map("contents: Read").is_err());
    }

    #[test]
    fn permissions_split_on_first_separator_only() {
        let err = parse_permission_map("contents: read=write").unwrap_err();
        assert_eq!(
            err,
            ParseError::InvalidAccess {
                permission: "contents".to_string(),
                access: "read=write".to_string(),
            }
        );
    }

    #[test]
    fn permissions_malformed_segments() {
        let err = parse_permission_map("contents: read, issues").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid permission 'issues'. Must be in the format 'permission: access' or 'permission=access'."
        );
        assert_eq!(
            parse_permission_map(": read").unwrap_err(),
            ParseError::MalformedPermission(": read".to_string())
        );
    }

    #[test]
    fn permissions_unsupported_json_shapes() {
        for input in [r#"[{"actions": "read"}]"#, r#""contents""#, "3", "null"] {
            assert_eq!(
                parse_permission_map(input).unwrap_err(),
                ParseError::UnsupportedPermissionsJson,
                "{input}"
            );
        }
    }
}
