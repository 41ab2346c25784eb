//! Merge the base result and stage fragments into the response object.

use serde::Serialize;
use serde_json::{Map, Value};

use ideascope_shared::{BaseResult, Fragment, IdeaScopeError, Result};

/// Flat JSON object returned to callers as `reply`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ComposedResult(Map<String, Value>);

impl ComposedResult {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// Base fields first, then each fragment's fields in merge-rank order.
///
/// The current schemas share no keys between the base result and any
/// fragment. The fixed order only decides the winner should a schema
/// change introduce a collision: the later fragment replaces the field.
pub fn compose(base: &BaseResult, mut fragments: Vec<Fragment>) -> Result<ComposedResult> {
    let mut out = to_object("base result", base)?;

    fragments.sort_by_key(Fragment::merge_rank);
    for fragment in &fragments {
        let fields = match fragment {
            Fragment::Pitch(f) => to_object("pitch", f)?,
            Fragment::Revenue(f) => to_object("revenue models", f)?,
            Fragment::Mvp(f) => to_object("mvp", f)?,
            Fragment::FounderFit(f) => to_object("founder fit", f)?,
        };
        out.extend(fields);
    }

    Ok(ComposedResult(out))
}

fn to_object<T: Serialize>(what: &str, value: &T) -> Result<Map<String, Value>> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(IdeaScopeError::validation(format!("{what} did not serialize to an object"))),
        Err(e) => Err(IdeaScopeError::parse(format!("failed to serialize {what}: {e}"))),
    }
}
