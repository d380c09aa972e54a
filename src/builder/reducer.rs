//! Ordered-configuration reducer.
//!
//! [`reduce`] maps `(document, action)` to a new document. It never touches
//! its input: a rejected action leaves the caller's document exactly as it
//! was, so state can only change through a successful reduction.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::models::{Checker, Element, Sequence, Setting, SettingUpdate};
use crate::errors::BuilderError;

/// A single edit of a checker document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Action {
    /// Insert `element` at `index`; `index == len` appends.
    Add {
        sequence: Sequence,
        element: Element,
        index: usize,
    },
    /// Replace the element at `index`.
    Update {
        sequence: Sequence,
        element: Element,
        index: usize,
    },
    Remove {
        sequence: Sequence,
        index: usize,
    },
    /// Take the element at `from` out, then insert it at `to`. `to` is a
    /// position in the sequence as it looks after the removal.
    Reorder {
        sequence: Sequence,
        from: usize,
        to: usize,
    },
    UpdateSettings(SettingUpdate),
    /// Replace the whole document.
    LoadConfig(Box<Checker>),
}

impl Action {
    /// The sequence this action edits, if any.
    pub fn sequence(&self) -> Option<Sequence> {
        match self {
            Action::Add { sequence, .. }
            | Action::Update { sequence, .. }
            | Action::Remove { sequence, .. }
            | Action::Reorder { sequence, .. } => Some(*sequence),
            Action::UpdateSettings(_) | Action::LoadConfig(_) => None,
        }
    }
}

pub fn reduce(state: &Checker, action: Action) -> Result<Checker, BuilderError> {
    match action {
        Action::Add {
            sequence,
            element,
            index,
        } => {
            let len = state.sequence(sequence).len();
            if index > len {
                return Err(invalid_index(sequence, index, len));
            }
            let mut next = state.clone();
            next.sequence_mut(sequence).insert(index, element);
            Ok(next)
        }
        Action::Update {
            sequence,
            element,
            index,
        } => {
            check_existing(state, sequence, index)?;
            let mut next = state.clone();
            next.sequence_mut(sequence)[index] = element;
            Ok(next)
        }
        Action::Remove { sequence, index } => {
            check_existing(state, sequence, index)?;
            let mut next = state.clone();
            next.sequence_mut(sequence).remove(index);
            Ok(next)
        }
        Action::Reorder { sequence, from, to } => {
            check_existing(state, sequence, from)?;
            // After removal the sequence holds len - 1 elements, so `to` may
            // range over 0..=len - 1.
            check_existing(state, sequence, to)?;
            if from == to {
                return Ok(state.clone());
            }
            let mut next = state.clone();
            let items = next.sequence_mut(sequence);
            let moved = items.remove(from);
            items.insert(to, moved);
            Ok(next)
        }
        Action::UpdateSettings(update) => {
            let mut next = state.clone();
            match update {
                SettingUpdate::Title(title) => next.title = title,
                SettingUpdate::Description(description) => next.description = description,
            }
            Ok(next)
        }
        Action::LoadConfig(loaded) => Ok(*loaded),
    }
}

/// Apply `actions` in order. On failure, returns the zero-based position of
/// the rejected action together with its error.
pub fn reduce_all(
    state: &Checker,
    actions: impl IntoIterator<Item = Action>,
) -> Result<Checker, (usize, BuilderError)> {
    let mut current = state.clone();
    for (position, action) in actions.into_iter().enumerate() {
        current = reduce(&current, action).map_err(|e| (position, e))?;
    }
    Ok(current)
}

impl TryFrom<Value> for Action {
    type Error = BuilderError;

    /// Selector names are checked before the rest of the payload so an
    /// unknown name is reported as `UnknownSequenceOrField`.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let payload = value.get("payload");
        if let Some(name) = payload
            .and_then(|p| p.get("sequence"))
            .and_then(Value::as_str)
        {
            name.parse::<Sequence>()?;
        }
        if value.get("type").and_then(Value::as_str) == Some("update_settings") {
            if let Some(name) = payload.and_then(|p| p.get("name")).and_then(Value::as_str) {
                name.parse::<Setting>()?;
            }
        }
        serde_json::from_value(value).map_err(|e| BuilderError::InvalidDocument(e.to_string()))
    }
}

/// Parse a JSON array of actions.
pub fn parse_actions(content: &str) -> Result<Vec<Action>, BuilderError> {
    let raw: Vec<Value> =
        serde_json::from_str(content).map_err(|e| BuilderError::InvalidDocument(e.to_string()))?;
    raw.into_iter().map(Action::try_from).collect()
}

fn check_existing(state: &Checker, sequence: Sequence, index: usize) -> Result<(), BuilderError> {
    let len = state.sequence(sequence).len();
    if index < len {
        Ok(())
    } else {
        Err(invalid_index(sequence, index, len))
    }
}

fn invalid_index(sequence: Sequence, index: usize, len: usize) -> BuilderError {
    BuilderError::InvalidIndex {
        sequence,
        index,
        len,
    }
}
