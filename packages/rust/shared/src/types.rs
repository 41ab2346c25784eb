//! Core domain types for IdeaScope evaluations.
//!
//! Wire names follow the JSON contract of `POST /chat`, which mixes
//! camelCase (`marketDemand`, `revenueModels`) with flat lowercase keys
//! (`feasibilityscore`, `personalizedstatus`, `founderfit*`).

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Lowest score a research or founder-fit score may take.
pub const MIN_SCORE: f64 = 1.0;
/// Highest score a research or founder-fit score may take.
pub const MAX_SCORE: f64 = 10.0;

/// Caller label that selects the standard (shallow) research depth.
pub const QUICK_SEARCH_LABEL: &str = "Quick Search";

/// Clamp a provider-reported score into `[MIN_SCORE, MAX_SCORE]`.
///
/// NaN maps to the minimum.
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        return MIN_SCORE;
    }
    score.clamp(MIN_SCORE, MAX_SCORE)
}

// ---------------------------------------------------------------------------
// RequestId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one pipeline run (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub Uuid);

impl RequestId {
    /// Generate a new time-sortable request identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Mode
// ---------------------------------------------------------------------------

/// Research depth requested from the search provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Standard,
    Deep,
}

impl Mode {
    /// Resolve the caller-supplied model label. Only the exact label
    /// `"Quick Search"` selects [`Mode::Standard`].
    pub fn from_label(label: &str) -> Self {
        if label == QUICK_SEARCH_LABEL {
            Self::Standard
        } else {
            Self::Deep
        }
    }

    /// Wire value for the search provider's `depth` parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Deep => "deep",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// UserProfile
// ---------------------------------------------------------------------------

/// Founder location; any part may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default, deserialize_with = "lenient_string")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub country: Option<String>,
}

impl Location {
    /// Comma-joined non-empty parts, or `None` when every part is empty.
    pub fn display(&self) -> Option<String> {
        let parts: Vec<&str> = [&self.city, &self.state, &self.country]
            .into_iter()
            .filter_map(|p| p.as_deref())
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

/// Optional founder/startup profile that personalizes prompts.
///
/// Every field is optional; form clients send numbers for some fields
/// (`teamSize`), so scalars are accepted and stored as strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default, deserialize_with = "lenient_string")]
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub last_name: Option<String>,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub background: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub technical_skills: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub previous_experience: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub startup_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub startup_description: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub industry: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub customer_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub stage: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub team_size: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub tech_stack: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub funding: Option<String>,
}

impl UserProfile {
    /// Location rendered for prompts, if any part is known.
    pub fn location_display(&self) -> Option<String> {
        self.location.as_ref().and_then(Location::display)
    }
}

/// Accept a string, number, or bool and keep it as a string. Empty strings
/// and `null` become `None`.
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(serde_json::Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Accept a number or a numeric string. Anything else becomes `None`.
fn lenient_number<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Like [`lenient_number`]; unreadable scores fall to zero and are clamped
/// by [`BaseResult::normalize`].
fn lenient_score<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_number(deserializer)?.unwrap_or(0.0))
}

// ---------------------------------------------------------------------------
// BaseResult (market research)
// ---------------------------------------------------------------------------

/// Three-level rating used for competitor popularity and feature priority/effort.
///
/// Anything outside the three levels, or a missing value, reads as `Unknown`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Level {
    #[serde(alias = "high", alias = "HIGH")]
    High,
    #[serde(alias = "medium", alias = "MEDIUM")]
    Medium,
    #[serde(alias = "low", alias = "LOW")]
    Low,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Kind of online community where a target audience gathers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DestinationType {
    Reddit,
    Discord,
    Forum,
    #[serde(rename = "Facebook Group", alias = "FacebookGroup")]
    FacebookGroup,
    #[default]
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PainPoints {
    #[serde(default)]
    pub primary_pain_point: String,
    #[serde(default)]
    pub urgency: String,
    #[serde(default)]
    pub evidence: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingTrends {
    #[serde(default)]
    pub market_readiness: String,
    #[serde(default)]
    pub emerging_trends: String,
    #[serde(default)]
    pub timing_assessment: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketDemand {
    #[serde(default)]
    pub pain_points: PainPoints,
    #[serde(default)]
    pub timing_trends: TimingTrends,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Competitor {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub popularity: Level,
    #[serde(default)]
    pub locations: String,
    #[serde(default)]
    pub pricing: String,
    #[serde(default)]
    pub pros: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub competitiveness: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnlineDestination {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: DestinationType,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetAudienceGroup {
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub online_destinations: Vec<OnlineDestination>,
}

/// Structured market-research result returned by the search provider
/// (or the mock fixture).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub overview: String,
    #[serde(default, deserialize_with = "lenient_score")]
    pub score: f64,
    #[serde(
        rename = "feasibilityscore",
        alias = "feasibilityScore",
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub feasibility_score: Option<f64>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub market_demand: MarketDemand,
    #[serde(default)]
    pub competitors: Vec<Competitor>,
    #[serde(default)]
    pub target_audience: Vec<TargetAudienceGroup>,
    #[serde(rename = "personalizedstatus", alias = "personalizedStatus", default)]
    pub personalized_status: bool,
}

impl BaseResult {
    /// Enforce the result invariants: scores inside `[1, 10]` and the
    /// personalization status mirroring the request flag.
    pub fn normalize(mut self, personalized: bool) -> Self {
        self.score = clamp_score(self.score);
        self.feasibility_score = self.feasibility_score.map(clamp_score);
        self.personalized_status = personalized;
        self
    }

    /// Comma-joined audience group names, if any.
    pub fn audience_groups(&self) -> Option<String> {
        if self.target_audience.is_empty() {
            return None;
        }
        Some(
            self.target_audience
                .iter()
                .map(|a| a.group.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        )
    }
}

// ---------------------------------------------------------------------------
// Fragments (generation stage outputs)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PitchFragment {
    pub pitch: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueFragment {
    pub revenue_models: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MvpFeature {
    pub feature: String,
    #[serde(default)]
    pub differentiation_factor: String,
    #[serde(default)]
    pub unique_implementation: String,
    pub priority: Level,
    pub effort: Level,
    #[serde(default)]
    pub competitive_advantage: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MvpFragment {
    pub mvp_design: String,
    pub mvp_features: Vec<MvpFeature>,
}

/// One founder strength or gap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitItem {
    pub skill: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FounderFitFragment {
    pub founderfit: String,
    pub founderfitscore: f64,
    pub positivefounderfit: Vec<FitItem>,
    pub negativefounderfit: Vec<FitItem>,
}

/// Output of one generation stage, merged additively into the response.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    Pitch(PitchFragment),
    Revenue(RevenueFragment),
    Mvp(MvpFragment),
    FounderFit(FounderFitFragment),
}

impl Fragment {
    /// Position in the composer's total order; later fragments win on key
    /// collisions.
    pub fn merge_rank(&self) -> u8 {
        match self {
            Self::Pitch(_) => 0,
            Self::Revenue(_) => 1,
            Self::Mvp(_) => 2,
            Self::FounderFit(_) => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_from_label() {
        assert_eq!(Mode::from_label("Quick Search"), Mode::Standard);
        assert_eq!(Mode::from_label("Comprehensive"), Mode::Deep);
        assert_eq!(Mode::from_label("quick search"), Mode::Deep);
        assert_eq!(Mode::from_label(""), Mode::Deep);
        assert_eq!(Mode::Standard.as_str(), "standard");
        assert_eq!(Mode::Deep.to_string(), "deep");
    }

    #[test]
    fn clamp_score_bounds() {
        assert_eq!(clamp_score(0.0), 1.0);
        assert_eq!(clamp_score(11.5), 10.0);
        assert_eq!(clamp_score(7.5), 7.5);
        assert_eq!(clamp_score(f64::NAN), 1.0);
    }

    #[test]
    fn profile_accepts_numbers_and_blank_strings() {
        let json = r#"{
            "firstName": "Ada",
            "teamSize": 3,
            "industry": "   ",
            "location": { "city": "Austin", "state": "", "country": "USA" }
        }"#;
        let profile: UserProfile = serde_json::from_str(json).expect("parse profile");
        assert_eq!(profile.first_name.as_deref(), Some("Ada"));
        assert_eq!(profile.team_size.as_deref(), Some("3"));
        assert!(profile.industry.is_none());
        assert_eq!(profile.location_display().as_deref(), Some("Austin, USA"));
    }

    #[test]
    fn base_result_tolerates_missing_fields() {
        let json = r#"{ "title": "Sneaker Swap", "score": 14 }"#;
        let base: BaseResult = serde_json::from_str(json).expect("parse base");
        let base = base.normalize(true);
        assert_eq!(base.score, 10.0);
        assert!(base.personalized_status);
        assert!(base.competitors.is_empty());

        let out = serde_json::to_value(&base).expect("serialize");
        for key in [
            "title",
            "overview",
            "score",
            "summary",
            "details",
            "marketDemand",
            "competitors",
            "targetAudience",
            "personalizedstatus",
        ] {
            assert!(out.get(key).is_some(), "missing key {key}");
        }
    }

    #[test]
    fn destination_type_wire_names() {
        let d: OnlineDestination = serde_json::from_str(
            r#"{"name":"Sneakerheads","type":"Facebook Group","url":"https://fb.com/g","description":"x"}"#,
        )
        .expect("parse destination");
        assert_eq!(d.kind, DestinationType::FacebookGroup);
        let out = serde_json::to_value(&d).expect("serialize");
        assert_eq!(out["type"], "Facebook Group");
    }

    #[test]
    fn research_result_tolerates_off_shape_values() {
        let json = r#"{
            "title": "Sneaker Swap",
            "score": "7",
            "feasibilityscore": "n/a",
            "competitors": [
                { "name": "StockX" },
                { "name": "GOAT", "popularity": "Very High", "competitiveness": "8.5" }
            ],
            "targetAudience": [
                { "onlineDestinations": [ { "name": "Sneaker Slack", "type": "Slack" } ] }
            ]
        }"#;
        let base: BaseResult = serde_json::from_str(json).expect("parse base");
        assert_eq!(base.score, 7.0);
        assert!(base.feasibility_score.is_none());
        assert_eq!(base.competitors[0].popularity, Level::Unknown);
        assert_eq!(base.competitors[1].popularity, Level::Unknown);
        assert_eq!(base.competitors[1].competitiveness, Some(8.5));
        assert_eq!(base.target_audience[0].group, "");
        assert_eq!(
            base.target_audience[0].online_destinations[0].kind,
            DestinationType::Other
        );
    }

    #[test]
    fn unreadable_score_is_clamped_to_minimum() {
        let base: BaseResult =
            serde_json::from_str(r#"{ "score": "high" }"#).expect("parse base");
        assert_eq!(base.normalize(false).score, MIN_SCORE);
    }

    #[test]
    fn fragment_merge_rank_is_total() {
        let pitch = Fragment::Pitch(PitchFragment { pitch: "p".into() });
        let revenue = Fragment::Revenue(RevenueFragment {
            revenue_models: vec![],
        });
        assert!(pitch.merge_rank() < revenue.merge_rank());
    }
}
