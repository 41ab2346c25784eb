//! Versioned registry of structured-output contracts.
//!
//! The two market-research schemas are plain JSON Schema (sent to the search
//! provider as a string). The four generation schemas use the generation
//! provider's OpenAPI subset (upper-case types, `propertyOrdering`).
//! Every schema is checked once when the registry is built, so a malformed
//! contract stops the process at startup instead of failing a request.

use std::collections::BTreeMap;

use serde_json::{Value, json};

use ideascope_shared::{IdeaScopeError, Result};

/// Bumped whenever any contract changes shape.
pub const SCHEMA_VERSION: u32 = 1;

/// Identifier of a registered schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SchemaId {
    MarketResearch,
    MarketResearchPersonalized,
    Pitch,
    RevenueModels,
    Mvp,
    FounderFit,
}

impl SchemaId {
    pub const ALL: [SchemaId; 6] = [
        Self::MarketResearch,
        Self::MarketResearchPersonalized,
        Self::Pitch,
        Self::RevenueModels,
        Self::Mvp,
        Self::FounderFit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MarketResearch => "market_research",
            Self::MarketResearchPersonalized => "market_research_personalized",
            Self::Pitch => "pitch",
            Self::RevenueModels => "revenue_models",
            Self::Mvp => "mvp",
            Self::FounderFit => "founder_fit",
        }
    }

    /// Research variant for the personalization flag.
    pub fn market_research(personalized: bool) -> Self {
        if personalized {
            Self::MarketResearchPersonalized
        } else {
            Self::MarketResearch
        }
    }
}

impl std::fmt::Display for SchemaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SchemaId {
    type Err = IdeaScopeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| IdeaScopeError::validation(format!("unknown schema id '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Immutable set of validated schemas, shared across requests.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    version: u32,
    schemas: BTreeMap<SchemaId, Value>,
}

impl SchemaRegistry {
    /// Build and validate every built-in schema.
    pub fn load() -> Result<Self> {
        let schemas = SchemaId::ALL
            .into_iter()
            .map(|id| (id, builtin(id)))
            .collect();
        Self::from_schemas(schemas)
    }

    /// Validate an explicit schema set. Every [`SchemaId`] must be present.
    pub fn from_schemas(schemas: BTreeMap<SchemaId, Value>) -> Result<Self> {
        for id in SchemaId::ALL {
            let schema = schemas
                .get(&id)
                .ok_or_else(|| IdeaScopeError::Schema(format!("{id}: not registered")))?;
            validate_node(schema, id.as_str())?;
        }

        tracing::debug!(version = SCHEMA_VERSION, count = schemas.len(), "schema registry validated");

        Ok(Self {
            version: SCHEMA_VERSION,
            schemas,
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Look up a schema. Registration of every id is checked at load time.
    pub fn get(&self, id: SchemaId) -> &Value {
        static EMPTY: Value = Value::Null;
        self.schemas.get(&id).unwrap_or(&EMPTY)
    }

    pub fn iter(&self) -> impl Iterator<Item = (SchemaId, &Value)> {
        self.schemas.iter().map(|(id, schema)| (*id, schema))
    }
}

/// Recursively check a schema node.
///
/// Object nodes need a `properties` map, and every name listed in
/// `required` or `propertyOrdering` must be one of those properties.
/// Array nodes need `items`. `enum` must be a non-empty list of strings.
fn validate_node(node: &Value, at: &str) -> Result<()> {
    let obj = node
        .as_object()
        .ok_or_else(|| IdeaScopeError::Schema(format!("{at}: schema node is not an object")))?;

    let ty = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| IdeaScopeError::Schema(format!("{at}: missing string `type`")))?
        .to_ascii_lowercase();

    match ty.as_str() {
        "object" => {
            let props = obj
                .get("properties")
                .and_then(Value::as_object)
                .ok_or_else(|| IdeaScopeError::Schema(format!("{at}: object without `properties`")))?;

            for key in ["required", "propertyOrdering"] {
                let Some(list) = obj.get(key) else { continue };
                let names = list
                    .as_array()
                    .ok_or_else(|| IdeaScopeError::Schema(format!("{at}: `{key}` is not a list")))?;
                for name in names {
                    let name = name.as_str().ok_or_else(|| {
                        IdeaScopeError::Schema(format!("{at}: `{key}` entry is not a string"))
                    })?;
                    if !props.contains_key(name) {
                        return Err(IdeaScopeError::Schema(format!(
                            "{at}: `{key}` names unknown property '{name}'"
                        )));
                    }
                }
            }

            for (name, child) in props {
                validate_node(child, &format!("{at}.{name}"))?;
            }
        }
        "array" => {
            let items = obj
                .get("items")
                .ok_or_else(|| IdeaScopeError::Schema(format!("{at}: array without `items`")))?;
            validate_node(items, &format!("{at}[]"))?;
        }
        "string" | "number" | "integer" | "boolean" => {}
        other => {
            return Err(IdeaScopeError::Schema(format!("{at}: unsupported type '{other}'")));
        }
    }

    if let Some(values) = obj.get("enum") {
        let ok = values
            .as_array()
            .is_some_and(|v| !v.is_empty() && v.iter().all(Value::is_string));
        if !ok {
            return Err(IdeaScopeError::Schema(format!(
                "{at}: `enum` must be a non-empty list of strings"
            )));
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Built-in schemas
// ---------------------------------------------------------------------------

fn builtin(id: SchemaId) -> Value {
    match id {
        SchemaId::MarketResearch => market_research(false),
        SchemaId::MarketResearchPersonalized => market_research(true),
        SchemaId::Pitch => pitch(),
        SchemaId::RevenueModels => revenue_models(),
        SchemaId::Mvp => mvp(),
        SchemaId::FounderFit => founder_fit(),
    }
}

fn market_research(personalized: bool) -> Value {
    let title = if personalized {
        "A short, catchy, descriptive title for the startup idea."
    } else {
        "A short, descriptive title for the startup idea."
    };
    let pain_point = if personalized {
        "The most critical pain point the startup is solving."
    } else {
        "The most critical pain point the startup is solving. Based on research"
    };
    let competitors = if personalized {
        "A list of five to twenty reasonable competitors that are similar to the user's startup idea. They can be specific and niche. Rank them by popularity, market share, and other relevant metrics."
    } else {
        "A list of ten competitors that are similar to the user's startup idea in any aspect. Rank them by popularity, market share, and other relevant metrics."
    };
    let audience = if personalized {
        "A list of five target audience groups that the startup is targeting. For each group, provide a list of online communities/destinations that are relevant to the target audience."
    } else {
        "A list of five target audience groups that the startup is targeting. For each group, provide a list of online communities/destinations that are specifically relevant to the target audience."
    };

    json!({
        "type": "object",
        "properties": {
            "title": { "type": "string", "description": title },
            "overview": { "type": "string", "description": "A concise, one-paragraph summary of the entire analysis, covering the idea's potential, market, and key challenges." },
            "score": { "type": "number", "description": "An extremely strict and realistic score from 1-10 for the idea's market demand and feasibility." },
            "feasibilityscore": { "type": "number", "description": "An extremely strict and realistic score from 1-10 for the idea's market competitiveness. With 10 being most competitive." },
            "summary": { "type": "string", "description": "A multi-source supported summary of the market demand." },
            "details": { "type": "string", "description": "An extremely detailed analysis of the market demand." },
            "marketDemand": {
                "type": "object",
                "properties": {
                    "painPoints": {
                        "type": "object",
                        "properties": {
                            "primaryPainPoint": { "type": "string", "description": pain_point },
                            "urgency": { "type": "string", "description": "How urgent is this problem for the target audience." },
                            "evidence": { "type": "string", "description": "Evidence supporting the existence and urgency of the pain point." }
                        },
                        "required": ["primaryPainPoint", "urgency", "evidence"]
                    },
                    "timingTrends": {
                        "type": "object",
                        "properties": {
                            "marketReadiness": { "type": "string", "description": "Is the market ready for this solution?" },
                            "emergingTrends": { "type": "string", "description": "What emerging trends support this idea?" },
                            "timingAssessment": { "type": "string", "description": "Overall assessment of the market timing." }
                        },
                        "required": ["marketReadiness", "emergingTrends", "timingAssessment"]
                    }
                },
                "required": ["painPoints", "timingTrends"]
            },
            "competitors": {
                "type": "array",
                "description": competitors,
                "items": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string", "description": "Name of the competitor." },
                        "description": { "type": "string", "description": "Description of the competitor's business." },
                        "popularity": { "type": "string", "enum": ["High", "Medium", "Low"], "description": "Popularity of the competitor." },
                        "locations": { "type": "string", "description": "Geographic locations where the competitor operates." },
                        "pricing": { "type": "string", "description": "The competitor's pricing model." },
                        "pros": { "type": "array", "items": { "type": "string" }, "description": "Strengths of the competitor." },
                        "weaknesses": { "type": "array", "items": { "type": "string" }, "description": "Weaknesses of the competitor." },
                        "competitiveness": { "type": "number", "description": "How competitive the competitor is in their market. With 10 being most competitive." }
                    },
                    "required": ["name", "description", "popularity", "locations", "pricing", "pros", "weaknesses"]
                }
            },
            "targetAudience": {
                "type": "array",
                "description": audience,
                "items": {
                    "type": "object",
                    "properties": {
                        "group": { "type": "string", "description": "A specific target audience group." },
                        "onlineDestinations": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "name": { "type": "string", "description": "Name of the online community/destination." },
                                    "type": { "type": "string", "enum": ["Reddit", "Discord", "Forum", "Facebook Group", "Other"], "description": "Type of the online community." },
                                    "url": { "type": "string", "description": "URL to the online community." },
                                    "description": { "type": "string", "description": "Description of why this is a good place to find the target audience." }
                                },
                                "required": ["name", "type", "url", "description"]
                            }
                        }
                    },
                    "required": ["group", "onlineDestinations"]
                }
            },
            "personalizedstatus": { "type": "boolean", "default": personalized, "description": "Whether or not founder fit/user profile was given." }
        },
        "required": ["title", "overview", "score", "summary", "details", "marketDemand", "competitors", "targetAudience", "personalizedstatus"]
    })
}

fn pitch() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "pitch": {
                "type": "STRING",
                "description": "A compelling five-sentence pitch that follows these guidelines: 1. Hook: Start with a compelling statement that grabs attention 2. Value: Clearly state the core value proposition 3. Evidence: Support with market data and validation 4. Differentiator: Explain how it stands out from competitors 5. Call to Action: End with a clear next step or invitation"
            }
        },
        "required": ["pitch"],
        "propertyOrdering": ["pitch"]
    })
}

fn revenue_models() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "revenueModels": {
                "type": "ARRAY",
                "items": {
                    "type": "STRING",
                    "description": "A concise description of how the startup could generate revenue"
                },
                "minItems": 3,
                "maxItems": 5,
                "description": "3-5 potential revenue models that would be viable for this business"
            }
        },
        "required": ["revenueModels"],
        "propertyOrdering": ["revenueModels"]
    })
}

fn mvp() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "mvpDesign": {
                "type": "STRING",
                "description": "A comprehensive 150-250 word description of the MVP's strategic vision, architecture, user experience, differentiation, market fit and milestones"
            },
            "mvpFeatures": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "feature": { "type": "STRING", "description": "A specific, descriptive name for the MVP feature" },
                        "differentiationFactor": { "type": "STRING", "description": "How this feature differs from competitor offerings" },
                        "uniqueImplementation": { "type": "STRING", "description": "Specific technical or business approach that sets it apart" },
                        "priority": { "type": "STRING", "enum": ["High", "Medium", "Low"], "description": "Priority of the feature based on differentiation impact" },
                        "effort": { "type": "STRING", "enum": ["High", "Medium", "Low"], "description": "Estimated effort to implement the feature based on technical complexity" },
                        "competitiveAdvantage": { "type": "STRING", "description": "Why this feature creates a competitive moat" }
                    },
                    "required": ["feature", "differentiationFactor", "uniqueImplementation", "priority", "effort", "competitiveAdvantage"],
                    "propertyOrdering": ["feature", "differentiationFactor", "uniqueImplementation", "priority", "effort", "competitiveAdvantage"]
                },
                "minItems": 5,
                "maxItems": 8,
                "description": "5-8 highly differentiated features that together create a unique product experience"
            }
        },
        "required": ["mvpDesign", "mvpFeatures"],
        "propertyOrdering": ["mvpDesign", "mvpFeatures"]
    })
}

fn fit_items(description: &str, skill: &str, why: &str) -> Value {
    json!({
        "type": "ARRAY",
        "description": description,
        "minItems": 3,
        "maxItems": 3,
        "items": {
            "type": "OBJECT",
            "properties": {
                "skill": { "type": "STRING", "description": skill },
                "description": { "type": "STRING", "description": why }
            },
            "required": ["skill", "description"],
            "propertyOrdering": ["skill", "description"]
        }
    })
}

fn founder_fit() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "founderfit": {
                "type": "STRING",
                "description": "Direct, second-person feedback about the user's fit for the idea. Concise, specific, and constructive."
            },
            "founderfitscore": {
                "type": "NUMBER",
                "minimum": 1,
                "maximum": 10,
                "description": "Strict evidence-based score from 1 to 10 for the user's fit to the proposed business or product."
            },
            "positivefounderfit": fit_items(
                "Three skills/experiences/attributes the founder possesses that are advantageous.",
                "Advantageous founder skill/experience/attribute.",
                "Short explanation why this helps in this market/business."
            ),
            "negativefounderfit": fit_items(
                "Three missing skills/experiences/attributes the founder lacks that are necessary.",
                "Missing founder skill/experience/attribute.",
                "Short explanation of relevance and impact of the gap."
            )
        },
        "required": ["founderfit", "founderfitscore", "positivefounderfit", "negativefounderfit"],
        "propertyOrdering": ["founderfit", "founderfitscore", "positivefounderfit", "negativefounderfit"]
    })
}
