//! # Document Identity Newtypes
//!
//! The external store assigns opaque string ids to documents. These
//! newtypes keep a contact id from being passed where an account id is
//! expected.

use serde::{Deserialize, Serialize};

macro_rules! document_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Wrap a raw document id.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Access the raw document id.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

document_id!(
    /// Id of a document in the `contacts` collection.
    ContactId,
    "contact"
);

document_id!(
    /// Id of a document in the `reservations` collection.
    ReservationId,
    "reservation"
);

document_id!(
    /// Identity-service user id. Also the id of the matching `admins` document.
    UserId,
    "user"
);
