//! Events pushed over the live subscription channel.

use serde::{Deserialize, Serialize};

use crate::types::{HazardAlert, SosSession};

/// Topics a subscriber can attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    HazardAlerts,
    SosEvents,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HazardAlerts => "hazard_alerts",
            Self::SosEvents => "sos_events",
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Topic {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hazard_alerts" => Ok(Self::HazardAlerts),
            "sos_events" => Ok(Self::SosEvents),
            _ => Err(anyhow::anyhow!("Unknown topic: {}", s)),
        }
    }
}

/// A live event, carrying the full updated entity as payload.
///
/// Serializes as `{"event": "new_alert", "data": {...}}`, the shape the
/// mobile clients listen for.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum LiveEvent {
    NewAlert(HazardAlert),
    SosCreated(SosSession),
    SosAccepted(SosSession),
    LocationUpdate(SosSession),
    SosClosed(SosSession),
}

impl LiveEvent {
    /// The topic this event fans out on.
    pub fn topic(&self) -> Topic {
        match self {
            Self::NewAlert(_) => Topic::HazardAlerts,
            Self::SosCreated(_)
            | Self::SosAccepted(_)
            | Self::LocationUpdate(_)
            | Self::SosClosed(_) => Topic::SosEvents,
        }
    }

    /// Wire name of the event (the serde tag).
    pub fn name(&self) -> &'static str {
        match self {
            Self::NewAlert(_) => "new_alert",
            Self::SosCreated(_) => "sos_created",
            Self::SosAccepted(_) => "sos_accepted",
            Self::LocationUpdate(_) => "location_update",
            Self::SosClosed(_) => "sos_closed",
        }
    }
}
