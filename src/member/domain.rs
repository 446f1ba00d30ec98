//! Core member domain types.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize};

use crate::{Error, database_id::DatabaseId};

/// Database identifier for a member.
pub type MemberId = DatabaseId;

/// A validated, non-empty member name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct MemberName(String);

impl MemberName {
    /// Create a member name.
    ///
    /// Leading and trailing whitespace is removed.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::EmptyMemberName] if `name` is empty
    /// or only contains whitespace.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::EmptyMemberName)
        } else {
            Ok(Self(name.to_string()))
        }
    }

    /// Create a member name without validation.
    ///
    /// The caller should ensure that the string is not empty.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl AsRef<str> for MemberName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for MemberName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MemberName::new(s)
    }
}

impl TryFrom<String> for MemberName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        MemberName::new(&value)
    }
}

impl From<MemberName> for String {
    fn from(value: MemberName) -> Self {
        value.0
    }
}

impl Display for MemberName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A community member and their post counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    /// The member's ID.
    pub id: MemberId,
    /// The member's display name.
    pub name: MemberName,
    /// A URI or data URI for the member's avatar.
    pub image: Option<String>,
    /// How many posts the member has made since the last monthly reset.
    pub posts_this_month: u32,
    /// How many posts the member has made overall.
    pub total_posts: u32,
    /// Client supplied display position.
    pub order: i64,
}

/// The data needed to create a member. Both post counters start at zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMember {
    /// Client supplied display position.
    pub order: i64,
    /// The member's display name.
    pub name: MemberName,
    /// A URI or data URI for the member's avatar.
    pub image: Option<String>,
}

/// The request body for creating a member.
#[derive(Debug, Serialize, Deserialize)]
pub struct MemberFormData {
    #[serde(default)]
    pub order: i64,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
}

/// A partial update of a member's editable fields.
///
/// Fields that are absent are left unchanged. For `image`, an explicit `null`
/// clears the image while an absent key keeps it.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemberPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub image: Option<Option<String>>,
    #[serde(default)]
    pub order: Option<i64>,
}

impl MemberPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.image.is_none() && self.order.is_none()
    }
}

/// The request body for adjusting a member's post counters.
#[derive(Debug, Serialize, Deserialize)]
pub struct AdjustPostCountData {
    pub increment: bool,
}

// Distinguishes an explicit `null` (Some(None)) from a missing key (None).
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}


#[cfg(test)]
mod member_serde_tests {
    use serde_json::json;

    use crate::member::{Member, MemberName, MemberPatch};

    #[test]
    fn member_uses_camel_case_fields() {
        let member = Member {
            id: 1,
            name: MemberName::new_unchecked("Ann"),
            image: None,
            posts_this_month: 2,
            total_posts: 5,
            order: 1,
        };

        let value = serde_json::to_value(&member).unwrap();

        assert_eq!(
            value,
            json!({
                "id": 1,
                "name": "Ann",
                "image": null,
                "postsThisMonth": 2,
                "totalPosts": 5,
                "order": 1
            })
        );
    }

    #[test]
    fn patch_distinguishes_null_image_from_missing_image() {
        let cleared: MemberPatch = serde_json::from_value(json!({ "image": null })).unwrap();
        let untouched: MemberPatch = serde_json::from_value(json!({ "name": "Bo" })).unwrap();

        assert_eq!(cleared.image, Some(None));
        assert_eq!(untouched.image, None);
    }

    #[test]
    fn patch_rejects_unknown_fields() {
        let result = serde_json::from_value::<MemberPatch>(json!({ "postsThisMonth": 3 }));

        assert!(result.is_err());
    }
}
