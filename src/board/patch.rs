//! Tri-state field for partial updates.
//!
//! A JSON body distinguishes three cases per field: the key is absent (leave
//! the stored value alone), the key is `null` (clear it), or the key carries a
//! value (overwrite). `Option<T>` alone collapses the first two.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A field of a partial update request.
///
/// Use with `#[serde(default, skip_serializing_if = "Patch::is_absent")]`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Patch<T> {
    /// Key not present in the body
    #[default]
    Absent,
    /// Key present with `null`
    Null,
    /// Key present with a value
    Set(T),
}

impl<T> Patch<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Patch::Absent)
    }

    pub fn is_present(&self) -> bool {
        !self.is_absent()
    }

    /// Collapse to `Option<Option<T>>`: outer `None` is absent, inner `None` is null
    pub fn into_option(self) -> Option<Option<T>> {
        match self {
            Patch::Absent => None,
            Patch::Null => Some(None),
            Patch::Set(value) => Some(Some(value)),
        }
    }
}

impl<T> From<T> for Patch<T> {
    fn from(value: T) -> Self {
        Patch::Set(value)
    }
}

impl<'de, T> Deserialize<'de> for Patch<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(value) => Patch::Set(value),
            None => Patch::Null,
        })
    }
}

impl<T> Serialize for Patch<T>
where
    T: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Patch::Set(value) => value.serialize(serializer),
            Patch::Absent | Patch::Null => serializer.serialize_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Body {
        #[serde(default, skip_serializing_if = "Patch::is_absent")]
        assignee: Patch<String>,
    }

    #[test]
    fn test_absent_null_and_value() {
        let absent: Body = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.assignee, Patch::Absent);

        let null: Body = serde_json::from_str(r#"{"assignee":null}"#).unwrap();
        assert_eq!(null.assignee, Patch::Null);

        let set: Body = serde_json::from_str(r#"{"assignee":"kim"}"#).unwrap();
        assert_eq!(set.assignee, Patch::Set("kim".to_string()));
    }

    #[test]
    fn test_serialize_skips_absent() {
        assert_eq!(serde_json::to_string(&Body::default()).unwrap(), "{}");

        let null = Body {
            assignee: Patch::Null,
        };
        assert_eq!(
            serde_json::to_string(&null).unwrap(),
            r#"{"assignee":null}"#
        );
    }

    #[test]
    fn test_into_option() {
        assert_eq!(Patch::<u8>::Absent.into_option(), None);
        assert_eq!(Patch::<u8>::Null.into_option(), Some(None));
        assert_eq!(Patch::Set(3u8).into_option(), Some(Some(3)));
    }
}
