//! # Contact — Public Inquiry Records
//!
//! A contact is created by the marketing site's form and then handled by
//! the back-office. Status changes are unconstrained: any status may follow
//! any other. The back-office offers "en cours" and "traité" as shortcuts
//! but does not enforce an order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ValidationError;
use crate::identity::ContactId;

/// Collection holding contact documents.
pub const COLLECTION: &str = "contacts";

/// Persisted field names, for building queries.
pub mod field {
    pub const NAME: &str = "nom";
    pub const SERVICE: &str = "service";
    pub const SUBMITTED_AT: &str = "date_soumission";
    pub const STATUS: &str = "statut";
    pub const LAST_FOLLOWED_UP: &str = "date_dernier_suivi";
}

/// Handling status of a contact.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ContactStatus {
    /// Just submitted, nobody has looked at it yet.
    Nouveau,
    /// Someone is following up.
    EnCours,
    /// Handled.
    Traite,
    /// Cancelled.
    Annule,
}

impl ContactStatus {
    pub const ALL: [ContactStatus; 4] = [
        Self::Nouveau,
        Self::EnCours,
        Self::Traite,
        Self::Annule,
    ];

    /// Stored string value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nouveau => "nouveau",
            Self::EnCours => "en_cours",
            Self::Traite => "traite",
            Self::Annule => "annule",
        }
    }

    /// French display label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Nouveau => "Nouveau",
            Self::EnCours => "En Cours",
            Self::Traite => "Traité",
            Self::Annule => "Annulé",
        }
    }
}

impl std::fmt::Display for ContactStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContactStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownVariant {
                kind: "status",
                value: s.to_string(),
            })
    }
}

/// Follow-up priority, derived from the requested service.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Basse,
    #[default]
    Moyenne,
    Haute,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basse => "basse",
            Self::Moyenne => "moyenne",
            Self::Haute => "haute",
        }
    }
}

/// Venue offer a contact is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceCategory {
    Piscine,
    SalleJeux,
    BubbleTea,
    FastFood,
    Boulangerie,
    PlaceFetes,
    Anniversaire,
    General,
}

impl ServiceCategory {
    pub const ALL: [ServiceCategory; 8] = [
        Self::Piscine,
        Self::SalleJeux,
        Self::BubbleTea,
        Self::FastFood,
        Self::Boulangerie,
        Self::PlaceFetes,
        Self::Anniversaire,
        Self::General,
    ];

    /// Stored string value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Piscine => "piscine",
            Self::SalleJeux => "salle-jeux",
            Self::BubbleTea => "bubble-tea",
            Self::FastFood => "fast-food",
            Self::Boulangerie => "boulangerie",
            Self::PlaceFetes => "place-fetes",
            Self::Anniversaire => "anniversaire",
            Self::General => "general",
        }
    }

    /// French display label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Piscine => "Piscine",
            Self::SalleJeux => "Salle de Jeux",
            Self::BubbleTea => "Bar Bubble Tea",
            Self::FastFood => "Fast Food",
            Self::Boulangerie => "Boulangerie",
            Self::PlaceFetes => "Place des Fêtes",
            Self::Anniversaire => "Packs Anniversaire",
            Self::General => "Demande générale",
        }
    }

    /// Priority given to a new inquiry about this service.
    ///
    /// Event bookings (party hall, birthday packs) are time-sensitive and
    /// go first; general questions go last.
    pub fn priority(&self) -> Priority {
        match self {
            Self::PlaceFetes | Self::Anniversaire => Priority::Haute,
            Self::General => Priority::Basse,
            _ => Priority::Moyenne,
        }
    }
}

impl std::fmt::Display for ServiceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ServiceCategory {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownVariant {
                kind: "service",
                value: s.to_string(),
            })
    }
}

fn default_source() -> String {
    "site_web".to_string()
}

/// A contact document as stored in the `contacts` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Contact {
    #[serde(rename = "nom")]
    pub name: String,
    pub email: String,
    #[serde(rename = "telephone", default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub service: ServiceCategory,
    #[serde(rename = "sujet")]
    pub subject: String,
    pub message: String,
    #[serde(rename = "date_soumission")]
    pub submitted_at: DateTime<Utc>,
    #[serde(rename = "statut")]
    pub status: ContactStatus,
    #[serde(rename = "priorite", default)]
    pub priority: Priority,
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default)]
    pub newsletter: bool,
    #[serde(rename = "lu", default)]
    pub read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(
        rename = "date_dernier_suivi",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub last_followed_up: Option<DateTime<Utc>>,
}

/// A contact together with its document id.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ContactRecord {
    #[schema(value_type = String)]
    pub id: ContactId,
    #[serde(flatten)]
    pub contact: Contact,
}
