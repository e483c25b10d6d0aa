use std::fmt;

use anyhow::Result;
use serde_json::Value;

use crate::error::BulletinError;

pub const STEP_ENTRY_TYPE: &str = "step";
pub const DECORATOR_ENTRY_TYPE: &str = "task-decorator";

const ENTRY_TYPE_KEY: &str = "type";

/// Step shapes understood by the engine, keyed by their discriminant field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepShape {
    Get,
    Put,
    Task,
    Aggregate,
    Do,
    Try,
    Unrecognized,
}

// Checked in this order; the first key present decides.
const DISCRIMINANTS: [(&str, StepShape); 6] = [
    ("get", StepShape::Get),
    ("put", StepShape::Put),
    ("task", StepShape::Task),
    ("aggregate", StepShape::Aggregate),
    ("do", StepShape::Do),
    ("try", StepShape::Try),
];

impl StepShape {
    pub fn of(doc: &Value) -> StepShape {
        let Some(map) = doc.as_object() else {
            return StepShape::Unrecognized;
        };
        DISCRIMINANTS
            .iter()
            .find(|(key, _)| map.contains_key(*key))
            .map(|(_, shape)| *shape)
            .unwrap_or(StepShape::Unrecognized)
    }

    /// Like [`StepShape::of`] but treats an unclassifiable document as an error.
    pub fn require(doc: &Value) -> Result<StepShape> {
        match StepShape::of(doc) {
            StepShape::Unrecognized => Err(BulletinError::UnrecognizedShape {
                context: abbreviate(doc),
            }
            .into()),
            shape => Ok(shape),
        }
    }

    pub fn key(self) -> Option<&'static str> {
        DISCRIMINANTS
            .iter()
            .find(|(_, shape)| *shape == self)
            .map(|(key, _)| *key)
    }

    pub fn as_str(self) -> &'static str {
        self.key().unwrap_or("unrecognized")
    }

    pub fn is_named(self) -> bool {
        matches!(self, StepShape::Get | StepShape::Put | StepShape::Task)
    }

    pub fn is_group(self) -> bool {
        matches!(self, StepShape::Aggregate | StepShape::Do | StepShape::Try)
    }
}

impl fmt::Display for StepShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn step_name(doc: &Value) -> Option<&str> {
    let shape = StepShape::of(doc);
    if !shape.is_named() {
        return None;
    }
    doc.get(shape.key()?).and_then(Value::as_str)
}

pub fn nested_steps(doc: &Value) -> Option<&Vec<Value>> {
    let shape = StepShape::of(doc);
    if !shape.is_group() {
        return None;
    }
    doc.get(shape.key()?).and_then(Value::as_array)
}

pub fn nested_steps_mut(doc: &mut Value) -> Option<&mut Vec<Value>> {
    let shape = StepShape::of(doc);
    if !shape.is_group() {
        return None;
    }
    doc.get_mut(shape.key()?).and_then(Value::as_array_mut)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Step,
    Decorator,
    Unrecognized,
}

impl EntryKind {
    pub fn of(doc: &Value) -> EntryKind {
        EntryKind::declared(doc).unwrap_or(EntryKind::Unrecognized)
    }

    /// `None` when the document carries no string `type` field at all.
    pub fn declared(doc: &Value) -> Option<EntryKind> {
        let declared = doc.get(ENTRY_TYPE_KEY)?.as_str()?;
        Some(EntryKind::from_type(declared))
    }

    pub fn from_type(declared: &str) -> EntryKind {
        match declared {
            STEP_ENTRY_TYPE => EntryKind::Step,
            DECORATOR_ENTRY_TYPE => EntryKind::Decorator,
            _ => EntryKind::Unrecognized,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntryKind::Step => STEP_ENTRY_TYPE,
            EntryKind::Decorator => DECORATOR_ENTRY_TYPE,
            EntryKind::Unrecognized => "unrecognized",
        }
    }
}

fn abbreviate(doc: &Value) -> String {
    const LIMIT: usize = 80;
    let text = doc.to_string();
    if text.chars().count() <= LIMIT {
        return text;
    }
    let cut: String = text.chars().take(LIMIT).collect();
    format!("{cut}...")
}
