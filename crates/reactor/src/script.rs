//! Reactor scripts.
//!
//! A script belongs to one reactor classification and holds two ordered
//! rule lists: hit rules run when a character strikes the reactor, act
//! rules when it reaches its trigger state. Script files use the JSON
//! shape below and are seeded into a [`StaticScripts`] at start-up.
//!
//! ```json
//! {
//!   "reactorId": "2001",
//!   "hitRules": [],
//!   "actRules": [
//!     {
//!       "id": "drop",
//!       "conditions": [{ "type": "reactor_state", "operator": ">=", "value": "3" }],
//!       "operations": [{ "type": "drop_items", "params": { "items": "4031161:1" } }]
//!     }
//!   ]
//! }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactorScript {
    /// Reactor classification the script answers for.
    pub reactor_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub hit_rules: Vec<Rule>,
    #[serde(default)]
    pub act_rules: Vec<Rule>,
}

impl ReactorScript {
    pub fn new(reactor_id: impl Into<String>) -> Self {
        Self {
            reactor_id: reactor_id.into(),
            description: String::new(),
            hit_rules: Vec::new(),
            act_rules: Vec::new(),
        }
    }

    pub fn hit_rule(mut self, rule: Rule) -> Self {
        self.hit_rules.push(rule);
        self
    }

    pub fn act_rule(mut self, rule: Rule) -> Self {
        self.act_rules.push(rule);
        self
    }
}

/// Conditions that must all hold, and the operations run when they do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: String,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub operations: Vec<Operation>,
}

impl Rule {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            conditions: Vec::new(),
            operations: Vec::new(),
        }
    }

    pub fn when(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn then(mut self, operation: Operation) -> Self {
        self.operations.push(operation);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: String,
    pub operator: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
}

impl Condition {
    /// A `reactor_state` comparison, e.g. `state(">=", 3)`.
    pub fn state(operator: &str, value: i8) -> Self {
        Self {
            condition_type: crate::evaluator::REACTOR_STATE.to_string(),
            operator: operator.to_string(),
            value: value.to_string(),
            reference_id: None,
            step: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(rename = "type")]
    pub operation_type: String,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

impl Operation {
    pub fn new(operation_type: impl Into<String>) -> Self {
        Self {
            operation_type: operation_type.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

/// Source of reactor scripts.
pub trait ScriptProvider: Send + Sync {
    fn script(&self, reactor_id: &str) -> Option<ReactorScript>;
}

/// Scripts held in memory, keyed by reactor classification.
#[derive(Debug, Clone, Default)]
pub struct StaticScripts {
    scripts: HashMap<String, ReactorScript>,
}

impl StaticScripts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, script: ReactorScript) -> Self {
        self.scripts.insert(script.reactor_id.clone(), script);
        self
    }

    /// Loads every `*.json` script in `dir`. A later file for the same
    /// reactor replaces an earlier one.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut scripts = Self::new();
        for path in paths {
            let script: ReactorScript = serde_json::from_slice(&std::fs::read(&path)?)?;
            tracing::debug!(reactor_id = %script.reactor_id, path = %path.display(), "loaded reactor script");
            scripts = scripts.with(script);
        }
        Ok(scripts)
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}

impl ScriptProvider for StaticScripts {
    fn script(&self, reactor_id: &str) -> Option<ReactorScript> {
        self.scripts.get(reactor_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = r#"{
        "reactorId": "2001",
        "description": "box",
        "hitRules": [],
        "actRules": [
            {
                "id": "drop",
                "conditions": [{ "type": "reactor_state", "operator": ">=", "value": "3" }],
                "operations": [{ "type": "drop_items", "params": { "items": "4031161:1" } }]
            },
            { "id": "fallback", "conditions": [], "operations": [] }
        ]
    }"#;

    #[test]
    fn parses_script_json() {
        let script: ReactorScript = serde_json::from_str(SCRIPT).unwrap();
        assert_eq!(script.reactor_id, "2001");
        assert!(script.hit_rules.is_empty());
        assert_eq!(script.act_rules.len(), 2);

        let rule = &script.act_rules[0];
        assert_eq!(rule.conditions[0], Condition::state(">=", 3));
        assert_eq!(rule.operations[0].operation_type, "drop_items");
        assert_eq!(rule.operations[0].get("items"), Some("4031161:1"));
    }

    #[test]
    fn condition_omits_empty_optionals() {
        let json = serde_json::to_value(Condition::state("=", 0)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "type": "reactor_state", "operator": "=", "value": "0" })
        );
    }

    #[test]
    fn loads_scripts_from_directory() {
        let dir = std::env::temp_dir().join(format!("reactor-scripts-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("2001.json"), SCRIPT).unwrap();
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let scripts = StaticScripts::from_dir(&dir).unwrap();
        std::fs::remove_dir_all(&dir).unwrap();

        assert_eq!(scripts.len(), 1);
        assert!(scripts.script("2001").is_some());
        assert!(scripts.script("9999").is_none());
    }
}
