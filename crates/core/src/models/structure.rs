use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::consts::HIGH_PRIORITY_KEYWORDS;
use crate::utils::camel_tokens;

/// A single field as reported by the structure dumper.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldInfo {
    pub name: String,
    /// Type tag, e.g. "float", "int32", "Vector3"
    #[serde(rename = "type")]
    pub field_type: String,
    /// Hex string such as "0x58", or empty when unknown
    #[serde(default)]
    pub offset: String,
    #[serde(rename = "static", default, skip_serializing_if = "is_false")]
    pub is_static: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl FieldInfo {
    pub fn new(name: &str, field_type: &str, offset: &str) -> Self {
        Self {
            name: name.to_string(),
            field_type: field_type.to_string(),
            offset: offset.to_string(),
            is_static: false,
        }
    }

    pub fn new_static(name: &str, field_type: &str) -> Self {
        Self {
            is_static: true,
            ..Self::new(name, field_type, "")
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClassInfo {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(rename = "parent", default, skip_serializing_if = "Option::is_none")]
    pub parent_class: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldInfo>,
}

impl ClassInfo {
    pub fn new(name: &str, namespace: &str, fields: Vec<FieldInfo>) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            parent_class: None,
            fields,
        }
    }
}

/// Canonical dumper output: the ordered class/field table of one target.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StructureSnapshot {
    #[serde(default)]
    pub engine: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub classes: Vec<ClassInfo>,
}

impl StructureSnapshot {
    pub fn new(engine: &str, version: &str, classes: Vec<ClassInfo>) -> Self {
        Self {
            engine: engine.to_string(),
            version: version.to_string(),
            classes,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn field_count(&self) -> usize {
        self.classes.iter().map(|c| c.fields.len()).sum()
    }

    /// Case-insensitive class lookup
    pub fn find_class(&self, name: &str) -> Option<&ClassInfo> {
        self.classes
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn find_field(&self, class_name: &str, field_name: &str) -> Option<&FieldInfo> {
        self.find_class(class_name)?
            .fields
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(field_name))
    }

    /// Classes ordered by gameplay relevance, most relevant first.
    ///
    /// Relevance is the number of CamelCase tokens of the class name found in
    /// [`HIGH_PRIORITY_KEYWORDS`]; ties are broken by name so the order is stable.
    pub fn prioritized_classes(&self) -> Vec<&ClassInfo> {
        let mut classes: Vec<(usize, &ClassInfo)> = self
            .classes
            .iter()
            .map(|c| (keyword_hits(&c.name), c))
            .collect();
        classes.sort_by(|(hits_a, a), (hits_b, b)| hits_b.cmp(hits_a).then_with(|| a.name.cmp(&b.name)));
        classes.into_iter().map(|(_, c)| c).collect()
    }

    /// Compact text form of the snapshot for inclusion in a prompt.
    ///
    /// ```text
    /// [PlayerController (Game.Player) : MonoBehaviour]
    ///   health: float @0x58
    /// ```
    pub fn to_prompt_str(&self, max_classes: usize) -> String {
        let shown = self.classes.len().min(max_classes);
        let mut lines = vec![
            format!("Engine: {} {}", self.engine, self.version),
            format!("Classes ({}/{} shown):", shown, self.classes.len()),
            String::new(),
        ];

        for class in self.prioritized_classes().into_iter().take(max_classes) {
            let namespace = if class.namespace.is_empty() {
                String::new()
            } else {
                format!(" ({})", class.namespace)
            };
            let parent = match &class.parent_class {
                Some(parent) if !parent.is_empty() => format!(" : {}", parent),
                _ => String::new(),
            };
            lines.push(format!("[{}{}{}]", class.name, namespace, parent));

            for field in &class.fields {
                let offset = if field.offset.is_empty() {
                    String::new()
                } else {
                    format!(" @{}", field.offset)
                };
                let static_tag = if field.is_static { " [static]" } else { "" };
                lines.push(format!("  {}: {}{}{}", field.name, field.field_type, offset, static_tag));
            }
            lines.push(String::new());
        }

        lines.join("\n")
    }
}

fn keyword_hits(class_name: &str) -> usize {
    let tokens: HashSet<String> = camel_tokens(class_name).into_iter().collect();
    HIGH_PRIORITY_KEYWORDS
        .iter()
        .filter(|keyword| tokens.contains(**keyword))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StructureSnapshot {
        StructureSnapshot::new(
            "Unity_IL2CPP",
            "2022.3.10f1",
            vec![
                ClassInfo::new("AudioMixer", "", vec![FieldInfo::new("volume", "float", "0x10")]),
                ClassInfo::new(
                    "PlayerController",
                    "Game.Player",
                    vec![
                        FieldInfo::new("health", "float", "0x58"),
                        FieldInfo::new_static("instance", "PlayerController"),
                    ],
                ),
                ClassInfo::new("Weapon", "Game.Combat", vec![FieldInfo::new("ammo", "int32", "0x20")]),
            ],
        )
    }

    #[test]
    fn test_deserialize_dumper_json() {
        let json = r#"{
            "engine": "Unity_Mono",
            "version": "2021.3.5f1",
            "classes": [
                {
                    "name": "GameManager",
                    "namespace": "",
                    "parent": "MonoBehaviour",
                    "fields": [
                        {"name": "instance", "type": "GameManager", "offset": "", "static": true},
                        {"name": "gold", "type": "int32", "offset": "0x18"}
                    ]
                }
            ]
        }"#;

        let snapshot = StructureSnapshot::from_json(json).unwrap();
        assert_eq!(snapshot.classes.len(), 1);
        let class = &snapshot.classes[0];
        assert_eq!(class.parent_class.as_deref(), Some("MonoBehaviour"));
        assert!(class.fields[0].is_static);
        assert!(!class.fields[1].is_static);
        assert_eq!(class.fields[1].offset, "0x18");
        assert_eq!(snapshot.field_count(), 2);
    }

    #[test]
    fn test_serialize_omits_false_static() {
        let json = serde_json::to_string(&FieldInfo::new("hp", "float", "0x10")).unwrap();
        assert!(!json.contains("static"));
        let json = serde_json::to_string(&FieldInfo::new_static("instance", "Foo")).unwrap();
        assert!(json.contains(r#""static":true"#));
    }

    #[test]
    fn test_find_is_case_insensitive() {
        let snapshot = sample();
        assert!(snapshot.find_class("playercontroller").is_some());
        assert_eq!(
            snapshot.find_field("PLAYERCONTROLLER", "Health").map(|f| f.offset.as_str()),
            Some("0x58")
        );
        assert!(snapshot.find_field("PlayerController", "mana").is_none());
        assert!(snapshot.find_class("Missing").is_none());
    }

    #[test]
    fn test_prioritized_classes() {
        let snapshot = sample();
        let names: Vec<&str> = snapshot
            .prioritized_classes()
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        // "player" + "controller" beat "weapon", which beats no hits
        assert_eq!(names, vec!["PlayerController", "Weapon", "AudioMixer"]);
    }

    #[test]
    fn test_prompt_str_truncates_and_tags() {
        let text = sample().to_prompt_str(2);
        assert!(text.starts_with("Engine: Unity_IL2CPP 2022.3.10f1"));
        assert!(text.contains("Classes (2/3 shown):"));
        assert!(text.contains("[PlayerController (Game.Player)]"));
        assert!(text.contains("  health: float @0x58"));
        assert!(text.contains("  instance: PlayerController [static]"));
        assert!(!text.contains("AudioMixer"));
    }
}
