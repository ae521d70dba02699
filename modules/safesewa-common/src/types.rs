use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Coordinate precision used for fingerprint equality: 4 decimal places
/// (~11 m), finer than any of the upstream sources emit.
const COORD_SCALE: f64 = 10_000.0;

/// A WGS84 coordinate pair. Validated at construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> anyhow::Result<Self> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            anyhow::bail!("latitude out of range: {lat}");
        }
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            anyhow::bail!("longitude out of range: {lng}");
        }
        Ok(Self { lat, lng })
    }

    /// Location rounded to fingerprint precision.
    pub fn rounded(&self) -> (i64, i64) {
        (
            (self.lat * COORD_SCALE).round() as i64,
            (self.lng * COORD_SCALE).round() as i64,
        )
    }
}

/// Closed set of hazard categories the platform tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertCategory {
    Earthquake,
    Flood,
    Fire,
    Curfew,
}

impl AlertCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Earthquake => "earthquake",
            Self::Flood => "flood",
            Self::Fire => "fire",
            Self::Curfew => "curfew",
        }
    }
}

impl std::fmt::Display for AlertCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AlertCategory {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "earthquake" => Ok(Self::Earthquake),
            "flood" => Ok(Self::Flood),
            "fire" => Ok(Self::Fire),
            "curfew" => Ok(Self::Curfew),
            _ => Err(anyhow::anyhow!("Unknown alert category: {}", s)),
        }
    }
}

/// How a source matches descriptions when deduplicating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Whole description must match (case-insensitive).
    Exact,
    /// Persisted description must contain the key (case-insensitive).
    Substring,
}

/// An unpersisted, source-parsed hazard observation pending dedup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateAlert {
    pub category: AlertCategory,
    pub location: GeoPoint,
    pub description: String,
    pub detected_at: DateTime<Utc>,
    /// Adapter that produced this candidate (for logging/provenance).
    pub source: String,
    /// Substring dedup key, when the source convention is substring match
    /// (e.g. the seismic scraper keys on the epicenter name). `None` means
    /// exact match on the full description.
    pub dedup_key: Option<String>,
}

impl CandidateAlert {
    pub fn fingerprint(&self) -> Fingerprint {
        let (lat_e4, lng_e4) = self.location.rounded();
        match &self.dedup_key {
            Some(key) => Fingerprint {
                category: self.category,
                lat_e4,
                lng_e4,
                key: key.clone(),
                mode: MatchMode::Substring,
            },
            None => Fingerprint {
                category: self.category,
                lat_e4,
                lng_e4,
                key: self.description.clone(),
                mode: MatchMode::Exact,
            },
        }
    }
}

/// The dedup key: (category, location rounded to source precision,
/// description per the source's match convention).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub category: AlertCategory,
    pub lat_e4: i64,
    pub lng_e4: i64,
    pub key: String,
    pub mode: MatchMode,
}

impl Fingerprint {
    /// Whether a persisted alert carries this fingerprint.
    pub fn matches(&self, alert: &HazardAlert) -> bool {
        if alert.category != self.category {
            return false;
        }
        let (lat_e4, lng_e4) = alert.location.rounded();
        if (lat_e4, lng_e4) != (self.lat_e4, self.lng_e4) {
            return false;
        }
        let desc = alert.description.to_lowercase();
        let key = self.key.to_lowercase();
        match self.mode {
            MatchMode::Exact => desc == key,
            MatchMode::Substring => desc.contains(&key),
        }
    }
}

/// A persisted hazard alert. Immutable once stored; never deleted by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HazardAlert {
    pub id: Uuid,
    pub category: AlertCategory,
    pub location: GeoPoint,
    pub description: String,
    pub detected_at: DateTime<Utc>,
    /// Name of the source adapter that produced it.
    pub source: String,
}

impl HazardAlert {
    pub fn from_candidate(candidate: &CandidateAlert) -> Self {
        Self {
            id: Uuid::new_v4(),
            category: candidate.category,
            location: candidate.location,
            description: candidate.description.clone(),
            detected_at: candidate.detected_at,
            source: candidate.source.clone(),
        }
    }
}

/// SOS lifecycle states. Transitions are monotonic:
/// Open → Accepted → {Resolved, Expired}, or Open straight to a terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SosStatus {
    Open,
    Accepted,
    Resolved,
    Expired,
}

impl SosStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved | Self::Expired)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Accepted => "accepted",
            Self::Resolved => "resolved",
            Self::Expired => "expired",
        }
    }
}

impl std::fmt::Display for SosStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who is issuing a location refresh on a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Requester,
    Volunteer,
}

impl std::fmt::Display for ActorRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Requester => f.write_str("requester"),
            Self::Volunteer => f.write_str("volunteer"),
        }
    }
}

/// An SOS request between a requester and a responding volunteer.
///
/// Invariant: `volunteer_id`/`volunteer_location` are set only after
/// acceptance; `updated_at` advances on every mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SosSession {
    pub id: Uuid,
    pub requester_id: String,
    pub requester_location: GeoPoint,
    pub status: SosStatus,
    pub volunteer_id: Option<String>,
    pub volunteer_location: Option<GeoPoint>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields to change in a conditional session update. The store stamps
/// `updated_at` on every applied patch.
#[derive(Debug, Clone, Default)]
pub struct SessionPatch {
    pub status: Option<SosStatus>,
    pub requester_location: Option<GeoPoint>,
    pub volunteer_id: Option<String>,
    pub volunteer_location: Option<GeoPoint>,
}

impl SessionPatch {
    pub fn status(status: SosStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn with_volunteer(mut self, id: impl Into<String>, location: GeoPoint) -> Self {
        self.volunteer_id = Some(id.into());
        self.volunteer_location = Some(location);
        self
    }
}
