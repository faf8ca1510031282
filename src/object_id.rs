use std::{
    cmp::Ordering,
    hash::{Hash, Hasher},
    marker::PhantomData,
    str::FromStr,
};

use base64::{display::Base64Display, engine::GeneralPurpose, Engine};
use sqlx::{sqlite::SqliteTypeInfo, Sqlite};
use thiserror::Error;
use uuid::Uuid;

/// Create a new ObjectId type. This implements the prefix structure and creates
/// a type alias for the type.
#[macro_export]
macro_rules! make_object_id {
    ($typ:ident, $prefix:ident) => {
        mod $prefix {
            pub struct $typ;
            impl $crate::object_id::ObjectIdPrefix for $typ {
                fn prefix() -> &'static str {
                    stringify!($prefix)
                }
            }
        }

        /// The ObjectId type alias for this model.
        pub type $typ = $crate::object_id::ObjectId<$prefix::$typ>;
    };
}

/// An error related to parsing an ObjectId
#[derive(Debug, Error)]
pub enum ObjectIdError {
    /// The prefix in the parsed ID did not match the expected prefix
    #[error("Invalid ID prefix, expected {0}")]
    InvalidPrefix(&'static str),

    /// Some other parsing error, such as invalid base64
    #[error("Failed to decode object ID")]
    DecodeFailure,
}

/// An object that provides the prefix for a serialized ObjectId.
pub trait ObjectIdPrefix {
    /// The short prefix for this ID type
    fn prefix() -> &'static str;
}

/// A UUIDv7 that is stored as a 16-byte blob, and rendered externally as a type prefix
/// followed by URL-safe base64. UUIDv7 keeps the IDs sortable by creation time.
pub struct ObjectId<PREFIX: ObjectIdPrefix>(pub Uuid, PhantomData<PREFIX>);

impl<PREFIX: ObjectIdPrefix> Clone for ObjectId<PREFIX> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<PREFIX: ObjectIdPrefix> Copy for ObjectId<PREFIX> {}

impl<PREFIX: ObjectIdPrefix> ObjectId<PREFIX> {
    /// Create a new ObjectId with a timestamp of now
    pub fn new() -> Self {
        Self(Uuid::now_v7(), PhantomData)
    }

    /// Create a new ObjectId from a UUID
    pub const fn from_uuid(u: Uuid) -> Self {
        Self(u, PhantomData)
    }

    /// Return the inner Uuid
    pub fn into_inner(self) -> Uuid {
        self.0
    }

    /// Return a reference to the inner Uuid
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Writes the UUID portion of the object ID, without the prefix
    pub fn display_without_prefix(&self) -> Base64Display<'_, '_, GeneralPurpose> {
        Base64Display::new(
            self.0.as_bytes(),
            &base64::engine::general_purpose::URL_SAFE_NO_PAD,
        )
    }
}

impl<PREFIX: ObjectIdPrefix> Default for ObjectId<PREFIX> {
    fn default() -> Self {
        Self::new()
    }
}

impl<PREFIX: ObjectIdPrefix> PartialEq for ObjectId<PREFIX> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<PREFIX: ObjectIdPrefix> Eq for ObjectId<PREFIX> {}

impl<PREFIX: ObjectIdPrefix> PartialEq<Uuid> for ObjectId<PREFIX> {
    fn eq(&self, other: &Uuid) -> bool {
        &self.0 == other
    }
}

impl<PREFIX: ObjectIdPrefix> PartialOrd for ObjectId<PREFIX> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<PREFIX: ObjectIdPrefix> Ord for ObjectId<PREFIX> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl<PREFIX: ObjectIdPrefix> Hash for ObjectId<PREFIX> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state)
    }
}

impl<PREFIX: ObjectIdPrefix> From<Uuid> for ObjectId<PREFIX> {
    fn from(u: Uuid) -> Self {
        Self(u, PhantomData)
    }
}

impl<PREFIX: ObjectIdPrefix> From<ObjectId<PREFIX>> for Uuid {
    fn from(data: ObjectId<PREFIX>) -> Self {
        data.0
    }
}

impl<PREFIX: ObjectIdPrefix> std::fmt::Debug for ObjectId<PREFIX> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ObjectId")
            .field(&self.to_string())
            .field(&self.0)
            .finish()
    }
}

impl<PREFIX: ObjectIdPrefix> std::fmt::Display for ObjectId<PREFIX> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(PREFIX::prefix())?;
        self.display_without_prefix().fmt(f)
    }
}

fn decode_suffix(s: &str) -> Result<Uuid, ObjectIdError> {
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(s)
        .map_err(|_| ObjectIdError::DecodeFailure)?;
    Uuid::from_slice(&bytes).map_err(|_| ObjectIdError::DecodeFailure)
}

impl<PREFIX: ObjectIdPrefix> FromStr for ObjectId<PREFIX> {
    type Err = ObjectIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let expected_prefix = PREFIX::prefix();
        let suffix = s
            .strip_prefix(expected_prefix)
            .ok_or(ObjectIdError::InvalidPrefix(expected_prefix))?;

        decode_suffix(suffix).map(Self::from_uuid)
    }
}

impl<PREFIX: ObjectIdPrefix> serde::Serialize for ObjectId<PREFIX> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

struct ObjectIdVisitor<PREFIX: ObjectIdPrefix>(PhantomData<PREFIX>);

impl<'de, PREFIX: ObjectIdPrefix> serde::de::Visitor<'de> for ObjectIdVisitor<PREFIX> {
    type Value = ObjectId<PREFIX>;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("an object ID starting with ")?;
        formatter.write_str(PREFIX::prefix())
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        Self::Value::from_str(v)
            .or_else(|e| {
                // Plain UUIDs are accepted too, since that is what ends up in hand-written JSON.
                Uuid::from_str(v)
                    .map(ObjectId::<PREFIX>::from_uuid)
                    .map_err(|_| e)
            })
            .map_err(|_| E::invalid_value(serde::de::Unexpected::Str(v), &self))
    }
}

impl<'de, PREFIX: ObjectIdPrefix> serde::Deserialize<'de> for ObjectId<PREFIX> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_str(ObjectIdVisitor(PhantomData))
    }
}

/// Store and retrieve in SQLite as a raw 16-byte UUID blob
impl<PREFIX: ObjectIdPrefix> sqlx::Type<Sqlite> for ObjectId<PREFIX> {
    fn type_info() -> SqliteTypeInfo {
        <Uuid as sqlx::Type<Sqlite>>::type_info()
    }

    fn compatible(ty: &SqliteTypeInfo) -> bool {
        <Uuid as sqlx::Type<Sqlite>>::compatible(ty)
    }
}

impl<'q, PREFIX: ObjectIdPrefix> sqlx::Encode<'q, Sqlite> for ObjectId<PREFIX> {
    fn encode_by_ref(
        &self,
        buf: &mut <Sqlite as sqlx::database::HasArguments<'q>>::ArgumentBuffer,
    ) -> sqlx::encode::IsNull {
        <Uuid as sqlx::Encode<'q, Sqlite>>::encode_by_ref(&self.0, buf)
    }
}

impl<'r, PREFIX: ObjectIdPrefix> sqlx::Decode<'r, Sqlite> for ObjectId<PREFIX> {
    fn decode(
        value: <Sqlite as sqlx::database::HasValueRef<'r>>::ValueRef,
    ) -> Result<Self, sqlx::error::BoxDynError> {
        let u = <Uuid as sqlx::Decode<'r, Sqlite>>::decode(value)?;
        Ok(Self::from_uuid(u))
    }
}

#[cfg(test)]
mod tests {
    use axum::{extract::Path, response::IntoResponse, Router};

    use super::*;

    make_object_id!(TeamId, tm);

    #[test]
    fn to_from_str() {
        let id = TeamId::new();

        let s = id.to_string();
        assert!(s.starts_with("tm"));
        let id2 = TeamId::from_str(&s).unwrap();
        assert_eq!(id, id2, "ID converts to string and back");
    }

    #[test]
    fn wrong_prefix() {
        let err = TeamId::from_str("xxAAAAAAAAAAAAAAAAAAAAAA").expect_err("prefix mismatch");
        assert!(matches!(err, ObjectIdError::InvalidPrefix("tm")));
    }

    #[test]
    fn accepts_plain_uuid_in_json() {
        let id = TeamId::new();
        let json = format!("\"{}\"", id.as_uuid());
        let parsed: TeamId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn can_use_in_axum_path() {
        async fn get_id(Path(_id): Path<TeamId>) -> impl IntoResponse {
            "ok"
        }

        let _ = Router::<()>::new().route("/:id", axum::routing::get(get_id));
    }
}
