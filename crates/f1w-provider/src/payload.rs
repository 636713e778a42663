//! Wire shapes for the schedule-metadata provider (§6 "Schedule provider").
//!
//! The provider is an opaque `fetchSeason(year) -> Season` collaborator; this
//! module only has to be tolerant of its JSON, not own it. Nulls, a
//! stringly-typed `round`, and a unit-suffixed `circuitLength` are all
//! accepted without failing the whole payload.

use serde::Deserialize;

/// Top-level `races[]` payload returned by `GET {base}/api/{year}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSeasonPayload {
    pub races: Vec<ProviderRacePayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderRacePayload {
    #[serde(rename = "round", deserialize_with = "round_from_string_or_int")]
    pub round: i32,
    #[serde(rename = "raceId")]
    pub race_id: Option<String>,
    #[serde(rename = "raceName")]
    pub race_name: String,
    pub schedule: ProviderSchedule,
    pub circuit: ProviderCircuit,
    /// `{base}/api/{year}/{round}` additionally fills these; the season-level
    /// endpoint omits them. Unused by the entity graph — the provider is
    /// treated as an opaque schedule source, not a results source — but kept
    /// so deserialization doesn't choke on the richer round payload.
    pub winner: Option<String>,
    #[serde(rename = "teamWinner")]
    pub team_winner: Option<String>,
    #[serde(rename = "fast_lap")]
    pub fast_lap: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderSchedule {
    pub race: Option<ProviderSessionTime>,
    pub qualy: Option<ProviderSessionTime>,
    pub fp1: Option<ProviderSessionTime>,
    pub fp2: Option<ProviderSessionTime>,
    pub fp3: Option<ProviderSessionTime>,
    #[serde(rename = "sprintQualy")]
    pub sprint_qualy: Option<ProviderSessionTime>,
    #[serde(rename = "sprintRace")]
    pub sprint_race: Option<ProviderSessionTime>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSessionTime {
    pub date: String,
    pub time: Option<String>,
}

impl ProviderSessionTime {
    /// Combines `date` + `time` as ISO/UTC (§6). A missing `time` defaults
    /// to midnight UTC rather than failing the whole round.
    pub fn to_utc(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        let time = self.time.as_deref().unwrap_or("00:00:00Z");
        let combined = if time.ends_with('Z') {
            format!("{}T{}", self.date, time)
        } else {
            format!("{}T{}Z", self.date, time)
        };
        chrono::DateTime::parse_from_rfc3339(&combined)
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .ok()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderCircuit {
    pub city: String,
    pub country: String,
    /// e.g. `"5.412km"` — tolerated, never parsed to a number; nothing in
    /// the entity graph stores circuit length.
    #[serde(rename = "circuitLength")]
    pub circuit_length: Option<String>,
}

fn round_from_string_or_int<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RoundField {
        Int(i32),
        Str(String),
    }
    match RoundField::deserialize(deserializer)? {
        RoundField::Int(n) => Ok(n),
        RoundField::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Sponsor tokens stripped from `raceName` when deriving the canonical round
/// name (§4.2: "if provider names are sponsor-heavy, strip sponsor tokens").
/// Not exhaustive — a fixed, easily-extended list rather than a NLP pass.
const SPONSOR_TOKENS: &[&str] = &[
    "Crypto.com",
    "Heineken",
    "Rolex",
    "Aramco",
    "STC",
    "Lenovo",
    "Qatar Airways",
    "Louis Vuitton",
    "MSC Cruises",
    "DHL",
    "Pirelli",
    "Emirates",
    "Michelob Ultra",
    "Visa Cash App",
];

/// Strips known sponsor tokens from a race name, collapsing whitespace. The
/// raw name is always preserved as an alias by the caller (§4.2).
pub fn strip_sponsor_tokens(race_name: &str) -> String {
    let mut stripped = race_name.to_string();
    for token in SPONSOR_TOKENS {
        stripped = stripped.replace(token, "");
    }
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}
