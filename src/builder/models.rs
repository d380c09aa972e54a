use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::BuilderError;

pub const DEFAULT_CHECKER_ID: &str = "initial-checker";
pub const DEFAULT_TITLE: &str = "Checker Title";
pub const DEFAULT_DESCRIPTION: &str = "My description";

static CHECKER_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9-]+$").expect("checker id pattern is valid"));

/// Identifier of a stored checker: lowercase alphanumerics and hyphens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CheckerId(String);

impl CheckerId {
    pub fn parse(id: impl Into<String>) -> Result<Self, BuilderError> {
        let id = id.into();
        if CHECKER_ID_PATTERN.is_match(&id) {
            Ok(Self(id))
        } else {
            Err(BuilderError::InvalidId(id))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CheckerId {
    type Error = BuilderError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<CheckerId> for String {
    fn from(id: CheckerId) -> Self {
        id.0
    }
}

impl FromStr for CheckerId {
    type Err = BuilderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for CheckerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One entry of an ordered sequence. Elements are heterogeneous records
/// (a question field, a constant table, an operation, a display), so the
/// only structural requirement is that they are JSON objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Element(Map<String, Value>);

impl Element {
    /// The element's `type` tag, when it carries one.
    pub fn kind(&self) -> Option<&str> {
        self.0.get("type").and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

impl TryFrom<Value> for Element {
    type Error = BuilderError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(BuilderError::InvalidDocument(format!(
                "element must be a JSON object, got {}",
                other
            ))),
        }
    }
}

/// Selects one of the four ordered sequences of a [`Checker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Sequence {
    Fields,
    Constants,
    Operations,
    Displays,
}

impl Sequence {
    pub const ALL: [Sequence; 4] = [
        Sequence::Fields,
        Sequence::Constants,
        Sequence::Operations,
        Sequence::Displays,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fields => "fields",
            Self::Constants => "constants",
            Self::Operations => "operations",
            Self::Displays => "displays",
        }
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Sequence {
    type Error = BuilderError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl FromStr for Sequence {
    type Err = BuilderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fields" => Ok(Self::Fields),
            "constants" => Ok(Self::Constants),
            "operations" => Ok(Self::Operations),
            "displays" => Ok(Self::Displays),
            _ => Err(BuilderError::UnknownSequenceOrField(s.to_string())),
        }
    }
}

/// Names of the scalar settings of a [`Checker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum Setting {
    Title,
    Description,
}

impl TryFrom<String> for Setting {
    type Error = BuilderError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl FromStr for Setting {
    type Err = BuilderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "title" => Ok(Self::Title),
            "description" => Ok(Self::Description),
            _ => Err(BuilderError::UnknownSequenceOrField(s.to_string())),
        }
    }
}

/// A new value for one scalar setting. Wire form: `{"name": .., "value": ..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "name",
    content = "value",
    rename_all = "lowercase",
    try_from = "RawSettingUpdate"
)]
pub enum SettingUpdate {
    Title(String),
    Description(Option<String>),
}

#[derive(Deserialize)]
struct RawSettingUpdate {
    name: Setting,
    #[serde(default)]
    value: Option<String>,
}

impl TryFrom<RawSettingUpdate> for SettingUpdate {
    type Error = BuilderError;

    fn try_from(raw: RawSettingUpdate) -> Result<Self, Self::Error> {
        match (raw.name, raw.value) {
            (Setting::Title, Some(title)) => Ok(Self::Title(title)),
            (Setting::Title, None) => Err(BuilderError::InvalidDocument(
                "title cannot be null".to_string(),
            )),
            (Setting::Description, description) => Ok(Self::Description(description)),
        }
    }
}

/// The configuration document describing one checker.
///
/// The four sequences are required on the wire; a payload missing any of
/// them fails to deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checker {
    pub id: CheckerId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub fields: Vec<Element>,
    pub constants: Vec<Element>,
    pub operations: Vec<Element>,
    pub displays: Vec<Element>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Default for Checker {
    fn default() -> Self {
        Self {
            id: CheckerId(DEFAULT_CHECKER_ID.to_string()),
            title: DEFAULT_TITLE.to_string(),
            description: Some(DEFAULT_DESCRIPTION.to_string()),
            fields: Vec::new(),
            constants: Vec::new(),
            operations: Vec::new(),
            displays: Vec::new(),
            created_at: None,
            updated_at: None,
        }
    }
}

impl Checker {
    pub fn new(id: CheckerId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            description: None,
            ..Self::default()
        }
    }

    /// Parse a document, rejecting payloads that do not match the schema.
    pub fn from_json(content: &str) -> Result<Self, BuilderError> {
        serde_json::from_str(content).map_err(|e| BuilderError::InvalidDocument(e.to_string()))
    }

    pub fn sequence(&self, sequence: Sequence) -> &[Element] {
        match sequence {
            Sequence::Fields => &self.fields,
            Sequence::Constants => &self.constants,
            Sequence::Operations => &self.operations,
            Sequence::Displays => &self.displays,
        }
    }

    pub(crate) fn sequence_mut(&mut self, sequence: Sequence) -> &mut Vec<Element> {
        match sequence {
            Sequence::Fields => &mut self.fields,
            Sequence::Constants => &mut self.constants,
            Sequence::Operations => &mut self.operations,
            Sequence::Displays => &mut self.displays,
        }
    }

    /// Equality of everything a user can edit; server timestamps are ignored.
    pub fn content_eq(&self, other: &Checker) -> bool {
        self.id == other.id
            && self.title == other.title
            && self.description == other.description
            && self.fields == other.fields
            && self.constants == other.constants
            && self.operations == other.operations
            && self.displays == other.displays
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckerSummary {
    pub id: CheckerId,
    pub title: String,
    pub updated_at: String,
}

/// An immutable copy of a stored checker, taken when it was published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedChecker {
    pub id: i64,
    pub checker_id: CheckerId,
    pub checker: Checker,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_checker_id_accepts_lowercase_and_hyphens() {
        assert!(CheckerId::parse("covid-19-checker").is_ok());
        assert!(CheckerId::parse("abc").is_ok());
    }

    #[test]
    fn test_checker_id_rejects_other_characters() {
        for bad in ["", "Upper", "with space", "under_score", "dot.ted", "slash/id"] {
            match CheckerId::parse(bad) {
                Err(BuilderError::InvalidId(id)) => assert_eq!(id, bad),
                other => panic!("expected InvalidId for {:?}, got {:?}", bad, other),
            }
        }
    }

    #[test]
    fn test_sequence_from_str_round_trips_names() {
        for seq in Sequence::ALL {
            assert_eq!(seq.as_str().parse::<Sequence>().unwrap(), seq);
        }
        assert!(matches!(
            "questions".parse::<Sequence>(),
            Err(BuilderError::UnknownSequenceOrField(name)) if name == "questions"
        ));
    }

    #[test]
    fn test_setting_from_str_rejects_unknown() {
        assert_eq!("title".parse::<Setting>().unwrap(), Setting::Title);
        assert!(matches!(
            "fields".parse::<Setting>(),
            Err(BuilderError::UnknownSequenceOrField(_))
        ));
    }

    #[test]
    fn test_selectors_deserialize_through_from_str() {
        assert_eq!(
            serde_json::from_value::<Sequence>(json!("displays")).unwrap(),
            Sequence::Displays
        );
        let err = serde_json::from_value::<Sequence>(json!("widgets")).unwrap_err();
        assert!(err.to_string().contains("Unknown sequence or setting 'widgets'"));

        let err =
            serde_json::from_value::<SettingUpdate>(json!({"name": "colour", "value": "red"}))
                .unwrap_err();
        assert!(err.to_string().contains("Unknown sequence or setting 'colour'"));
    }

    #[test]
    fn test_setting_update_wire_format() {
        let update = SettingUpdate::Description(None);
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(value, json!({"name": "description", "value": null}));
        assert_eq!(
            serde_json::from_value::<SettingUpdate>(value).unwrap(),
            update
        );
        assert!(
            serde_json::from_value::<SettingUpdate>(json!({"name": "title", "value": null}))
                .is_err()
        );
    }

    #[test]
    fn test_default_checker_shape() {
        let checker = Checker::default();
        assert_eq!(checker.id.as_str(), DEFAULT_CHECKER_ID);
        assert_eq!(checker.title, DEFAULT_TITLE);
        for seq in Sequence::ALL {
            assert!(checker.sequence(seq).is_empty());
        }
    }

    #[test]
    fn test_checker_wire_format_is_camel_case() {
        let mut checker = Checker::new(CheckerId::parse("wire").unwrap(), "Wire");
        checker.updated_at = Some("2024-01-01 00:00:00".into());
        let value = serde_json::to_value(&checker).unwrap();
        assert_eq!(value["id"], "wire");
        assert_eq!(value["updatedAt"], "2024-01-01 00:00:00");
        assert!(value.get("createdAt").is_none());
        assert_eq!(value["fields"], json!([]));
        assert_eq!(value["displays"], json!([]));
    }

    #[test]
    fn test_from_json_requires_all_sequences() {
        let missing = r#"{"id":"x","title":"t","fields":[],"constants":[],"operations":[]}"#;
        assert!(matches!(
            Checker::from_json(missing),
            Err(BuilderError::InvalidDocument(msg)) if msg.contains("displays")
        ));

        let complete =
            r#"{"id":"x","title":"t","fields":[],"constants":[],"operations":[],"displays":[]}"#;
        let checker = Checker::from_json(complete).unwrap();
        assert!(checker.description.is_none());
    }

    #[test]
    fn test_from_json_rejects_invalid_id_and_non_object_elements() {
        let bad_id =
            r#"{"id":"Bad Id","title":"t","fields":[],"constants":[],"operations":[],"displays":[]}"#;
        assert!(Checker::from_json(bad_id).is_err());

        let bad_element =
            r#"{"id":"x","title":"t","fields":[1],"constants":[],"operations":[],"displays":[]}"#;
        assert!(Checker::from_json(bad_element).is_err());
    }

    #[test]
    fn test_element_kind_and_try_from() {
        let element = Element::try_from(json!({"type": "NUMERIC", "id": "N1"})).unwrap();
        assert_eq!(element.kind(), Some("NUMERIC"));
        assert_eq!(element.get("id"), Some(&json!("N1")));
        assert!(Element::try_from(json!("scalar")).is_err());
    }

    #[test]
    fn test_content_eq_ignores_timestamps() {
        let a = Checker::default();
        let mut b = a.clone();
        b.created_at = Some("2024-01-01 00:00:00".into());
        b.updated_at = Some("2024-01-02 00:00:00".into());
        assert!(a.content_eq(&b));
        assert_ne!(a, b);

        b.title = "Other".into();
        assert!(!a.content_eq(&b));
    }
}
