//! Assistant domain and training-data files.
//!
//! The dialogue engine interprets these files; here they are only parsed so
//! that they can be checked against the knowledge-base schema before the
//! assistant is trained. See [`validate`].

use serde::Deserialize;
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::schema::Catalog;
use crate::slots::{
    ACTION_QUERY_KNOWLEDGE_BASE, KNOWLEDGE_BASE_SLOTS, RESPONSE_ASK_REPHRASE, RESPONSE_KB_UNAVAILABLE,
    SLOT_ATTRIBUTE, SLOT_MENTION, SLOT_OBJECT_TYPE,
};

const DEFAULT_ACTIONS: &[&str] = &[
    "action_listen",
    "action_restart",
    "action_session_start",
    "action_default_fallback",
    "action_deactivate_loop",
    "action_revert_fallback_events",
    "action_default_ask_affirmation",
    "action_default_ask_rephrase",
    "action_two_stage_fallback",
    "action_back",
];

const DEFAULT_INTENTS: &[&str] = &["nlu_fallback", "restart", "back", "out_of_scope", "session_start"];

/// Name of a list entry that is either `name` or `{name: {...}}`.
fn entry_name(entry: &Value) -> Option<String> {
    match entry {
        Value::String(s) => Some(s.clone()),
        Value::Mapping(m) if m.len() == 1 => m.iter().next().and_then(|(k, _)| k.as_str()).map(str::to_string),
        _ => None,
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other).unwrap_or_default().trim().to_string(),
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlotSpec {
    #[serde(rename = "type")]
    pub slot_type: String,
    #[serde(default)]
    pub values: Option<Vec<String>>,
    #[serde(default)]
    pub influence_conversation: Option<bool>,
    #[serde(default)]
    pub initial_value: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseVariant {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Domain {
    #[serde(default)]
    intents: Vec<Value>,
    #[serde(default)]
    entities: Vec<Value>,
    #[serde(default)]
    pub slots: BTreeMap<String, SlotSpec>,
    #[serde(default)]
    pub responses: BTreeMap<String, Vec<ResponseVariant>>,
    #[serde(default)]
    pub actions: Vec<String>,
}

impl Domain {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_yaml(&fs::read_to_string(path)?)
    }

    pub fn intents(&self) -> Vec<String> {
        self.intents.iter().filter_map(entry_name).collect()
    }

    pub fn entities(&self) -> Vec<String> {
        self.entities.iter().filter_map(entry_name).collect()
    }

    pub fn has_intent(&self, name: &str) -> bool {
        DEFAULT_INTENTS.contains(&name) || self.intents().iter().any(|i| i == name)
    }

    pub fn has_entity(&self, name: &str) -> bool {
        self.entities().iter().any(|e| e == name)
    }

    /// Custom actions, responses and built-in actions are all valid steps.
    pub fn has_action(&self, name: &str) -> bool {
        DEFAULT_ACTIONS.contains(&name)
            || self.actions.iter().any(|a| a == name)
            || self.responses.contains_key(name)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Step {
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub entities: Vec<Value>,
    #[serde(default)]
    pub slot_was_set: Vec<Value>,
    #[serde(default)]
    pub checkpoint: Option<String>,
}

impl Step {
    pub fn entity_names(&self) -> Vec<String> {
        self.entities.iter().filter_map(entry_name).collect()
    }

    /// `slot=value` for every entry of `slot_was_set`.
    pub fn slot_conditions(&self) -> Vec<String> {
        self.slot_was_set
            .iter()
            .filter_map(|entry| match entry {
                Value::String(s) => Some(format!("{}=*", s)),
                Value::Mapping(m) => m.iter().next().map(|(k, v)| format!("{}={}", scalar(k), scalar(v))),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Story {
    pub story: String,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Rule {
    pub rule: String,
    #[serde(default)]
    pub condition: Vec<Step>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NluEntry {
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default)]
    pub examples: Option<String>,
}

impl NluEntry {
    /// Entity names annotated as `[text](entity)` or `[text]{"entity": "x"}`.
    pub fn annotated_entities(&self) -> Vec<String> {
        let mut names = Vec::new();
        let Some(examples) = &self.examples else { return names };
        let mut rest = examples.as_str();
        while let Some(pos) = rest.find(']') {
            let after = &rest[pos + 1..];
            if let Some(inner) = after.strip_prefix('(') {
                if let Some(end) = inner.find(')') {
                    let name = inner[..end].split(':').next().unwrap_or_default().trim();
                    if !name.is_empty() {
                        names.push(name.to_string());
                    }
                }
            } else if after.starts_with('{') {
                if let Some(end) = after.find('}') {
                    if let Ok(json) = serde_json::from_str::<serde_json::Value>(&after[..=end]) {
                        if let Some(name) = json.get("entity").and_then(serde_json::Value::as_str) {
                            names.push(name.to_string());
                        }
                    }
                }
            }
            rest = after;
        }
        names
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct TrainingFile {
    #[serde(default)]
    nlu: Vec<NluEntry>,
    #[serde(default)]
    stories: Vec<Story>,
    #[serde(default)]
    rules: Vec<Rule>,
}

/// Stories, rules and NLU examples gathered from one or more files.
#[derive(Debug, Clone, Default)]
pub struct Scripts {
    pub nlu: Vec<NluEntry>,
    pub stories: Vec<Story>,
    pub rules: Vec<Rule>,
}

/// One row of the rule table: the intent and slot state a rule reacts to
/// and the actions it predicts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleRow {
    pub rule: String,
    pub intent: Option<String>,
    pub conditions: Vec<String>,
    pub actions: Vec<String>,
}

impl Scripts {
    pub fn add_yaml(&mut self, yaml: &str) -> Result<()> {
        let file: TrainingFile = serde_yaml::from_str(yaml)?;
        self.nlu.extend(file.nlu);
        self.stories.extend(file.stories);
        self.rules.extend(file.rules);
        Ok(())
    }

    /// Reads every `.yml`/`.yaml` file below `dir`.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let mut files: Vec<_> = walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| matches!(e.path().extension().and_then(|s| s.to_str()), Some("yml" | "yaml")))
            .map(|e| e.path().to_path_buf())
            .collect();
        files.sort();
        let mut scripts = Self::default();
        for path in files {
            scripts.add_yaml(&fs::read_to_string(&path)?)?;
        }
        Ok(scripts)
    }

    fn all_steps(&self) -> impl Iterator<Item = (&str, &Step)> {
        let story_steps = self.stories.iter().flat_map(|s| s.steps.iter().map(move |st| (s.story.as_str(), st)));
        let rule_steps = self
            .rules
            .iter()
            .flat_map(|r| r.condition.iter().chain(r.steps.iter()).map(move |st| (r.rule.as_str(), st)));
        story_steps.chain(rule_steps)
    }

    pub fn rule_table(&self) -> Vec<RuleRow> {
        let mut rows = Vec::new();
        for rule in &self.rules {
            let base: Vec<String> = rule.condition.iter().flat_map(Step::slot_conditions).collect();
            let mut current = RuleRow { rule: rule.rule.clone(), intent: None, conditions: base.clone(), actions: Vec::new() };
            for step in &rule.steps {
                if let Some(intent) = &step.intent {
                    if current.intent.is_some() || !current.actions.is_empty() {
                        let next = RuleRow { rule: rule.rule.clone(), intent: None, conditions: base.clone(), actions: Vec::new() };
                        rows.push(std::mem::replace(&mut current, next));
                    }
                    current.intent = Some(intent.clone());
                }
                current.conditions.extend(step.slot_conditions());
                if let Some(action) = &step.action {
                    current.actions.push(action.clone());
                }
            }
            rows.push(current);
        }
        rows
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub issues: Vec<Issue>,
}

impl ValidationReport {
    fn error(&mut self, message: String) {
        self.issues.push(Issue { severity: Severity::Error, message });
    }

    fn warning(&mut self, message: String) {
        self.issues.push(Issue { severity: Severity::Warning, message });
    }

    pub fn is_ok(&self) -> bool {
        self.issues.iter().all(|i| i.severity == Severity::Warning)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }
}

/// Checks the domain and scripts for consistency with each other and with
/// what the knowledge-base action expects of them.
pub fn validate(domain: &Domain, scripts: &Scripts, catalog: &Catalog, outcome_slot: Option<&str>) -> ValidationReport {
    let mut report = ValidationReport::default();

    for (source, step) in scripts.all_steps() {
        if let Some(intent) = &step.intent {
            if !domain.has_intent(intent) {
                report.error(format!("'{}' uses undeclared intent '{}'", source, intent));
            }
        }
        if let Some(action) = &step.action {
            if !domain.has_action(action) {
                report.error(format!("'{}' uses undeclared action '{}'", source, action));
            }
        }
        for entity in step.entity_names() {
            if !domain.has_entity(&entity) {
                report.error(format!("'{}' uses undeclared entity '{}'", source, entity));
            }
        }
    }

    let intents = domain.intents();
    for entry in &scripts.nlu {
        if let Some(intent) = &entry.intent {
            if !domain.has_intent(intent) {
                report.error(format!("NLU examples for undeclared intent '{}'", intent));
            }
        }
        for entity in entry.annotated_entities() {
            if !domain.has_entity(&entity) {
                report.error(format!("NLU examples annotate undeclared entity '{}'", entity));
            }
        }
    }
    for intent in &intents {
        if !scripts.nlu.iter().any(|e| e.intent.as_deref() == Some(intent.as_str())) {
            report.warning(format!("intent '{}' has no NLU examples", intent));
        }
    }

    if !domain.actions.iter().any(|a| a == ACTION_QUERY_KNOWLEDGE_BASE) {
        report.error(format!("domain does not list action '{}'", ACTION_QUERY_KNOWLEDGE_BASE));
    }
    for response in [RESPONSE_ASK_REPHRASE, RESPONSE_KB_UNAVAILABLE] {
        if !domain.responses.contains_key(response) {
            report.error(format!("domain lacks response '{}' uttered by the knowledge-base action", response));
        }
    }

    for slot in KNOWLEDGE_BASE_SLOTS {
        if !domain.slots.contains_key(slot) {
            report.error(format!("domain lacks knowledge-base slot '{}'", slot));
        }
    }
    if let Some(slot) = outcome_slot {
        if !domain.slots.contains_key(slot) {
            report.warning(format!("outcome slot '{}' is not declared; the engine will ignore it", slot));
        }
    }
    for attribute in catalog.all_attributes() {
        if !domain.slots.contains_key(&attribute) {
            report.error(format!("attribute '{}' has no slot", attribute));
        }
        if !domain.has_entity(&attribute) {
            report.warning(format!("attribute '{}' has no entity to fill its slot", attribute));
        }
    }
    for entity in [SLOT_OBJECT_TYPE, SLOT_ATTRIBUTE, SLOT_MENTION] {
        if !domain.has_entity(entity) {
            report.warning(format!("entity '{}' is not declared", entity));
        }
    }

    if let Some(values) = domain.slots.get(SLOT_OBJECT_TYPE).and_then(|s| s.values.as_ref()) {
        for value in values {
            if catalog.get(value).is_none() {
                report.error(format!("object_type value '{}' names no document type", value));
            }
        }
        for doc_type in catalog.iter() {
            if !values.contains(&doc_type.name) {
                report.warning(format!("document type '{}' is not an object_type value", doc_type.name));
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOMAIN: &str = r#"
version: "2.0"
intents:
  - greet
  - query_books:
      use_entities: true
entities:
  - object_type
  - author
slots:
  object_type:
    type: categorical
    values: [book, song]
responses:
  utter_greet:
    - text: "Hello!"
actions:
  - action_query_knowledge_base
"#;

    #[test]
    fn domain_accepts_plain_and_mapped_entries() {
        let domain = Domain::from_yaml(DOMAIN).unwrap();
        assert_eq!(domain.intents(), ["greet", "query_books"]);
        assert!(domain.has_action("utter_greet"));
        assert!(domain.has_action("action_listen"));
        assert!(!domain.has_action("action_unknown"));
    }

    #[test]
    fn rule_table_splits_on_intents() {
        let mut scripts = Scripts::default();
        scripts
            .add_yaml(
                r#"
rules:
  - rule: answer follow-up
    condition:
      - slot_was_set:
          - object_type: book
    steps:
      - intent: know_more
      - action: action_query_knowledge_base
      - intent: goodbye
      - action: utter_goodbye
"#,
            )
            .unwrap();
        let rows = scripts.rule_table();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].intent.as_deref(), Some("know_more"));
        assert_eq!(rows[0].conditions, ["object_type=book"]);
        assert_eq!(rows[0].actions, ["action_query_knowledge_base"]);
        assert_eq!(rows[1].actions, ["utter_goodbye"]);
    }

    #[test]
    fn annotated_entities_cover_both_syntaxes() {
        let entry = NluEntry {
            intent: Some("query_books".into()),
            examples: Some("- books by [Scott Fitzgerald](author)\n- any [books]{\"entity\": \"object_type\", \"value\": \"book\"}\n".into()),
        };
        assert_eq!(entry.annotated_entities(), ["author", "object_type"]);
    }

    #[test]
    fn validate_flags_undeclared_names() {
        let domain = Domain::from_yaml(DOMAIN).unwrap();
        let mut scripts = Scripts::default();
        scripts
            .add_yaml(
                r#"
stories:
  - story: ask
    steps:
      - intent: query_movies
      - action: utter_missing
"#,
            )
            .unwrap();
        let report = validate(&domain, &scripts, &Catalog::default(), None);
        assert!(!report.is_ok());
        let messages: Vec<_> = report.errors().map(|i| i.message.clone()).collect();
        assert!(messages.iter().any(|m| m.contains("intent 'query_movies'")));
        assert!(messages.iter().any(|m| m.contains("action 'utter_missing'")));
        assert!(messages.iter().any(|m| m.contains("'song' names no document type")));
        assert!(messages.iter().any(|m| m.contains("utter_ask_rephrase")));
    }
}
