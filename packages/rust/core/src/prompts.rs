//! Prompt builders for every provider call.
//!
//! All builders are pure functions. Missing profile fields render as a fixed
//! placeholder so the prompt layout does not depend on how complete the
//! profile is.

use std::fmt::Write;

use ideascope_shared::{BaseResult, UserProfile};

/// Placeholder for missing fields in generation prompts.
const NOT_SPECIFIED: &str = "Not specified";
/// Placeholder for missing fields in rephrase and research prompts.
const NA: &str = "N/A";

/// System message for the rephrase completion.
pub const REPHRASE_SYSTEM: &str = "You are an expert market research query formulator. You help rephrase startup ideas into detailed, searchable questions without adding new information.";

fn or<'a>(value: &'a Option<String>, placeholder: &'a str) -> &'a str {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(placeholder)
}

fn non_empty<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.trim().is_empty() { placeholder } else { value }
}

fn full_name(profile: &UserProfile) -> String {
    let first = or(&profile.first_name, NA);
    let last = profile.last_name.as_deref().unwrap_or("");
    format!("{first} {last}")
}

fn location(profile: &UserProfile) -> String {
    profile
        .location_display()
        .unwrap_or_else(|| NOT_SPECIFIED.to_string())
}

/// Market demand score rendered as `N/10`, or `N/A/10` when unknown.
fn score(base: &BaseResult) -> String {
    if base.score > 0.0 {
        format!("{}/10", base.score)
    } else {
        format!("{NA}/10")
    }
}

fn audience(base: &BaseResult) -> String {
    base.audience_groups()
        .unwrap_or_else(|| NOT_SPECIFIED.to_string())
}

// ---------------------------------------------------------------------------
// Rephrase & research
// ---------------------------------------------------------------------------

/// User prompt for the query rephraser.
pub fn rephrase_prompt(idea: &str, profile: Option<&UserProfile>) -> String {
    let mut context = String::new();
    if let Some(p) = profile {
        let _ = write!(
            context,
            "\n\nFounder Context (use this to make the search more relevant):\n\
             - Name: {}\n\
             - Location: {}\n\
             - Background: {}\n\
             - Technical Skills: {}\n\
             - Previous Experience: {}\n\
             - Startup Name: {}\n\
             - Industry: {}\n\
             - Target Customer: {}\n\
             - Stage: {}\n\
             - Team Size: {}\n\
             - Tech Stack: {}\n\
             - Funding: {}",
            full_name(p),
            location(p),
            or(&p.background, NA),
            or(&p.technical_skills, NA),
            or(&p.previous_experience, NA),
            or(&p.startup_name, NA),
            or(&p.industry, NA),
            or(&p.customer_type, NA),
            or(&p.stage, NA),
            or(&p.team_size, NA),
            or(&p.tech_stack, NA),
            or(&p.funding, NA),
        );
    }

    format!(
        "You are an expert at rephrasing startup ideas into detailed, search-engine-optimized queries for market research.\n\
         \n\
         Your task is to take a user's startup idea and rephrase it into a strictly concise, comprehensive, detailed question that would be perfect for searching the web to find:\n\
         - Market demand and validation\n\
         - Competitor analysis\n\
         - Industry trends and timing\n\
         - Target audience insights\n\
         - Pain points and opportunities\n\
         \n\
         IMPORTANT RULES:\n\
         1. DO NOT add any new details or assumptions about the startup idea\n\
         2. DO NOT invent features, markets, or business models not mentioned by the user\n\
         3. ONLY expand on what the user has explicitly stated if a certain aspect is unclear\n\
         4. Make the query more specific and detailed for better search results\n\
         5. Format as a comprehensive research question\n\
         6. Include relevant industry terms and market research keywords\n\
         7. Consider the founder's background and context if provided\n\
         \n\
         Original startup idea: \"{idea}\"{context}\n\
         \n\
         Rephrase this into a strictly concise, detailed, search-engine-optimized query for market/competitor research:"
    )
}

/// Natural-language query for the market-research search.
///
/// The background block is only added when a profile is passed; callers pass
/// one only for personalized requests.
pub fn research_query(rephrased: &str, profile: Option<&UserProfile>) -> String {
    let mut context = String::new();
    if let Some(p) = profile {
        let _ = write!(
            context,
            "\n\nHere is my personal and startup background. Use this information to find results for maximum relevance and specificity.\n\
             \n\
             - Name: {}\n\
             - Location: {}\n\
             - Background/Field of Study: {}\n\
             - Technical Skills: {}\n\
             - Previous Startup Experience: {}\n\
             - Startup Name: {}\n\
             - Description: {}\n\
             - Target Industry: {}\n\
             - Target Customer: {}\n\
             - Current Stage: {}\n\
             - Team Size: {}\n\
             - Tech Stack/AI Models: {}\n\
             - Funding Raised: {}\n\
             \n\
             Please place heavy emphasis and consider this rich context when finding results for analyzing my startup idea. Consider local\n\
             market conditions, my demonstrated skills, competitive landscape within my idea's industry, and the feasibility of\n\
             my idea given their current stage and team size. Avoid having redundant information across multiple description fields.",
            full_name(p),
            location(p),
            or(&p.background, NA),
            or(&p.technical_skills, NA),
            or(&p.previous_experience, NA),
            or(&p.startup_name, NA),
            or(&p.startup_description, NA),
            or(&p.industry, NA),
            or(&p.customer_type, NA),
            or(&p.stage, NA),
            or(&p.team_size, NA),
            or(&p.tech_stack, NA),
            or(&p.funding, NA),
        );
    }

    format!(
        " Based on important market factors, how valid is my startup idea? Here's my startup idea: {rephrased}{context}.\n"
    )
}

// ---------------------------------------------------------------------------
// Generation stages
// ---------------------------------------------------------------------------

/// Render a `Founder Context` block from `(label, value)` pairs.
fn founder_context(fields: &[(&str, &Option<String>)]) -> String {
    let mut out = String::from("\n\nFounder Context:");
    for (label, value) in fields {
        let _ = write!(out, "\n- {label}: {}", or(value, NOT_SPECIFIED));
    }
    out
}

pub fn pitch_prompt(idea: &str, base: &BaseResult, profile: Option<&UserProfile>) -> String {
    let context = profile
        .map(|p| {
            founder_context(&[
                ("Background", &p.background),
                ("Technical Skills", &p.technical_skills),
                ("Previous Experience", &p.previous_experience),
                ("Industry", &p.industry),
                ("Stage", &p.stage),
            ])
        })
        .unwrap_or_default();
    let demand = &base.market_demand;

    format!(
        "Based on the following startup idea and market analysis, create a compelling five-sentence pitch that follows these guidelines:\n\
         \n\
         1. Hook: Start with a compelling statement that grabs attention\n\
         2. Value: Clearly state the core value proposition\n\
         3. Evidence: Support with market data and validation\n\
         4. Differentiator: Explain how it stands out from competitors\n\
         5. Call to Action: End with a clear next step or invitation\n\
         \n\
         Startup Idea: {idea}\n\
         \n\
         Market Analysis Context:\n\
         - Market Demand Score: {score}\n\
         - Market Summary: {summary}\n\
         - Primary Pain Point: {pain}\n\
         - Market Readiness: {readiness}{context}\n\
         \n\
         Create a professional, investor-ready pitch that incorporates the market insights and founder context.",
        score = score(base),
        summary = non_empty(&base.summary, NA),
        pain = non_empty(&demand.pain_points.primary_pain_point, NA),
        readiness = non_empty(&demand.timing_trends.market_readiness, NA),
    )
}

pub fn revenue_prompt(idea: &str, base: &BaseResult, profile: Option<&UserProfile>) -> String {
    let context = profile
        .map(|p| {
            founder_context(&[
                ("Industry", &p.industry),
                ("Stage", &p.stage),
                ("Team Size", &p.team_size),
                ("Funding", &p.funding),
            ])
        })
        .unwrap_or_default();

    format!(
        "Based on the following startup idea and market analysis, suggest 3-5 potential revenue models that would be viable for this business.\n\
         \n\
         Startup Idea: {idea}\n\
         \n\
         Market Analysis:\n\
         - Target Audience: {audience}\n\
         - Market Demand Score: {score}\n\
         - Industry Context: {trends}{context}\n\
         \n\
         Provide specific, actionable revenue model suggestions that align with the market opportunity and business model. Each suggestion should be a concise description of how the startup could generate revenue.",
        audience = audience(base),
        score = score(base),
        trends = non_empty(&base.market_demand.timing_trends.emerging_trends, NA),
    )
}

pub fn mvp_prompt(idea: &str, base: &BaseResult, profile: Option<&UserProfile>) -> String {
    let context = profile
        .map(|p| {
            founder_context(&[
                ("Technical Skills", &p.technical_skills),
                ("Tech Stack", &p.tech_stack),
                ("Team Size", &p.team_size),
                ("Stage", &p.stage),
            ])
        })
        .unwrap_or_default();

    format!(
        "Based on the following startup idea and market analysis, design a highly differentiated MVP (Minimum Viable Product) that stands out from competitors.\n\
         \n\
         Startup Idea: {idea}\n\
         \n\
         Market Analysis:\n\
         - Primary Pain Point: {pain}\n\
         - Target Audience: {audience}\n\
         - Market Demand Score: {score}{context}\n\
         \n\
         Your task is to design an MVP that is NOT just another copy of existing solutions. Focus on:\n\
         \n\
         1. **Unique Value Proposition**: What makes this MVP fundamentally different from what's already in the market?\n\
         2. **Competitive Moats**: What features or approaches create defensible advantages?\n\
         3. **Innovation Angles**: How can you solve the problem in a way competitors haven't considered?\n\
         \n\
         **IMPORTANT**: For the MVP Design section, provide a comprehensive, detailed description (150-250 words) that thoroughly explains:\n\
         - The strategic vision and approach\n\
         - Technical architecture and implementation strategy\n\
         - User experience design principles\n\
         - Competitive positioning and differentiation\n\
         - How the MVP addresses identified market needs\n\
         - Development timeline and milestones\n\
         \n\
         For each feature, specify:\n\
         - **Feature Name**: Be specific and descriptive\n\
         - **Differentiation Factor**: How this feature differs from competitor offerings\n\
         - **Unique Implementation**: Specific technical or business approach that sets it apart\n\
         - **Priority**: High/Medium/Low based on differentiation impact\n\
         - **Implementation Effort**: High/Medium/Low based on technical complexity\n\
         - **Competitive Advantage**: Why this feature creates a moat\n\
         \n\
         Provide 5-8 highly differentiated features that together create a unique product experience. Avoid generic features that could apply to any startup in the space. Each feature should have a clear competitive differentiation story.",
        pain = non_empty(&base.market_demand.pain_points.primary_pain_point, NA),
        audience = audience(base),
        score = score(base),
    )
}

pub fn founder_fit_prompt(idea: &str, base: &BaseResult, profile: Option<&UserProfile>) -> String {
    let mut context = String::new();
    if let Some(p) = profile {
        let _ = write!(
            context,
            "\n\nFounder Profile:\n- Name: {}\n- Location: {}",
            full_name(p),
            location(p)
        );
        for (label, value) in [
            ("Background", &p.background),
            ("Technical Skills", &p.technical_skills),
            ("Previous Experience", &p.previous_experience),
            ("Industry", &p.industry),
            ("Customer Type", &p.customer_type),
            ("Stage", &p.stage),
            ("Team Size", &p.team_size),
            ("Tech Stack", &p.tech_stack),
            ("Funding", &p.funding),
        ] {
            let _ = write!(context, "\n- {label}: {}", or(value, NOT_SPECIFIED));
        }
    }
    let demand = &base.market_demand;

    format!(
        "Evaluate the founder fit for the following startup idea using the market analysis insight and the founder's profile. Return structured JSON only with the fields specified.\n\
         \n\
         Startup Idea: {idea}\n\
         \n\
         Market Analysis Context (use strictly for evidence and relevance):\n\
         - Primary Pain Point: {pain}\n\
         - Timing & Trends: {trends}\n\
         - Target Audience: {audience}\n\
         - Market Demand Score: {score}{context}\n\
         \n\
         Instructions:\n\
         - Write 'founderfit' as direct, second-person feedback. Be specific and actionable.\n\
         - Set 'founderfitscore' from 1-10 based only on demonstrated evidence in the profile; do not be optimistic.\n\
         - Provide exactly three items for both 'positivefounderfit' and 'negativefounderfit'.\n\
         - Do not invent details beyond the provided profile; if unknown, focus feedback on what's missing.\n\
         - Keep each description concise (1-2 sentences).",
        pain = non_empty(&demand.pain_points.primary_pain_point, NA),
        trends = non_empty(&demand.timing_trends.emerging_trends, NA),
        audience = audience(base),
        score = score(base),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ideascope_shared::{Location, TargetAudienceGroup};

    fn base() -> BaseResult {
        let mut base: BaseResult = serde_json::from_str("{}").unwrap();
        base.score = 7.0;
        base.summary = "Strong collector demand.".into();
        base.target_audience = vec![
            TargetAudienceGroup {
                group: "Collectors".into(),
                online_destinations: vec![],
            },
            TargetAudienceGroup {
                group: "Resellers".into(),
                online_destinations: vec![],
            },
        ];
        base
    }

    fn profile() -> UserProfile {
        UserProfile {
            first_name: Some("Ada".into()),
            location: Some(Location {
                city: Some("Austin".into()),
                state: None,
                country: Some("USA".into()),
            }),
            industry: Some("Retail".into()),
            ..Default::default()
        }
    }

    #[test]
    fn pitch_without_profile_has_no_founder_block() {
        let prompt = pitch_prompt("Vintage sneakers", &base(), None);
        assert!(prompt.contains("Startup Idea: Vintage sneakers"));
        assert!(prompt.contains("- Market Demand Score: 7/10"));
        assert!(prompt.contains("- Primary Pain Point: N/A"));
        assert!(!prompt.contains("Founder Context"));
    }

    #[test]
    fn missing_profile_fields_render_placeholder() {
        let prompt = revenue_prompt("Vintage sneakers", &base(), Some(&profile()));
        assert!(prompt.contains("- Target Audience: Collectors, Resellers"));
        assert!(prompt.contains("Founder Context:\n- Industry: Retail\n- Stage: Not specified"));
        assert!(prompt.contains("- Funding: Not specified"));
    }

    #[test]
    fn mvp_uses_tech_fields() {
        let prompt = mvp_prompt("Vintage sneakers", &base(), Some(&UserProfile::default()));
        assert!(prompt.contains("- Tech Stack: Not specified"));
        assert!(prompt.contains("Provide 5-8 highly differentiated features"));
    }

    #[test]
    fn founder_fit_has_full_profile() {
        let prompt = founder_fit_prompt("Vintage sneakers", &base(), Some(&profile()));
        assert!(prompt.contains("Founder Profile:\n- Name: Ada \n- Location: Austin, USA"));
        assert!(prompt.contains("- Customer Type: Not specified"));
        assert!(prompt.contains("exactly three items"));
    }

    #[test]
    fn empty_audience_is_not_specified() {
        let empty: BaseResult = serde_json::from_str("{}").unwrap();
        let prompt = founder_fit_prompt("x", &empty, None);
        assert!(prompt.contains("- Target Audience: Not specified"));
        assert!(prompt.contains("- Market Demand Score: N/A/10"));
    }

    #[test]
    fn research_query_with_and_without_profile() {
        let plain = research_query("resale sneaker demand?", None);
        assert_eq!(
            plain,
            " Based on important market factors, how valid is my startup idea? Here's my startup idea: resale sneaker demand?.\n"
        );

        let personal = research_query("resale sneaker demand?", Some(&profile()));
        assert!(personal.contains("- Location: Austin, USA"));
        assert!(personal.contains("- Funding Raised: N/A"));
    }

    #[test]
    fn rephrase_prompt_quotes_idea() {
        let prompt = rephrase_prompt("sneakers", None);
        assert!(prompt.contains("Original startup idea: \"sneakers\""));
        assert!(!prompt.contains("Founder Context"));
        assert!(rephrase_prompt("sneakers", Some(&profile())).contains("- Stage: N/A"));
    }
}
