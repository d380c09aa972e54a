//! Behavioural properties of the reducer, exercised through the public API.

use checker_builder::builder::{Action, Checker, CheckerId, Element, Sequence, SettingUpdate, reduce};
use checker_builder::errors::BuilderError;
use serde_json::json;

fn el(id: &str) -> Element {
    Element::try_from(json!({ "id": id })).unwrap()
}

fn ids(checker: &Checker, sequence: Sequence) -> Vec<String> {
    checker
        .sequence(sequence)
        .iter()
        .map(|e| e.get("id").and_then(|v| v.as_str()).unwrap_or("").to_string())
        .collect()
}

/// A document with three elements in every sequence, prefixed per sequence.
fn populated() -> Checker {
    let mut doc = Checker::new(CheckerId::parse("props").unwrap(), "Props");
    for sequence in Sequence::ALL {
        for (i, name) in ["A", "B", "C"].iter().enumerate() {
            doc = reduce(
                &doc,
                Action::Add {
                    sequence,
                    element: el(&format!("{}-{}", sequence, name)),
                    index: i,
                },
            )
            .unwrap();
        }
    }
    doc
}

#[test]
fn add_then_remove_at_same_index_restores_sequence() {
    let doc = populated();
    for sequence in Sequence::ALL {
        for index in 0..=3 {
            let added = reduce(
                &doc,
                Action::Add {
                    sequence,
                    element: el("X"),
                    index,
                },
            )
            .unwrap();
            let removed = reduce(&added, Action::Remove { sequence, index }).unwrap();
            assert_eq!(removed, doc, "{} at {}", sequence, index);
        }
    }
}

#[test]
fn update_changes_exactly_one_element_of_one_sequence() {
    let doc = populated();
    let updated = reduce(
        &doc,
        Action::Update {
            sequence: Sequence::Operations,
            element: el("Y"),
            index: 1,
        },
    )
    .unwrap();

    assert_eq!(
        ids(&updated, Sequence::Operations),
        ["operations-A", "Y", "operations-C"]
    );
    for sequence in [Sequence::Fields, Sequence::Constants, Sequence::Displays] {
        assert_eq!(updated.sequence(sequence), doc.sequence(sequence));
    }
    assert_eq!(updated.title, doc.title);
}

#[test]
fn reorder_to_same_index_is_noop() {
    let doc = populated();
    for index in 0..3 {
        let result = reduce(
            &doc,
            Action::Reorder {
                sequence: Sequence::Displays,
                from: index,
                to: index,
            },
        )
        .unwrap();
        assert_eq!(result, doc);
    }
}

#[test]
fn reorder_there_and_back_restores_order() {
    let doc = populated();
    for from in 0..3 {
        for to in 0..3 {
            let moved = reduce(
                &doc,
                Action::Reorder {
                    sequence: Sequence::Fields,
                    from,
                    to,
                },
            )
            .unwrap();
            let back = reduce(
                &moved,
                Action::Reorder {
                    sequence: Sequence::Fields,
                    from: to,
                    to: from,
                },
            )
            .unwrap();
            assert_eq!(back, doc, "from {} to {}", from, to);
        }
    }
}

#[test]
fn load_config_returns_the_loaded_document() {
    let doc = populated();
    let mut other = Checker::new(CheckerId::parse("other").unwrap(), "Other");
    other.description = Some("Loaded".into());

    let result = reduce(&doc, Action::LoadConfig(Box::new(other.clone()))).unwrap();
    assert_eq!(result, other);
}

#[test]
fn add_then_remove_example() {
    let mut doc = Checker::default();
    doc.fields = vec![el("A"), el("B"), el("C")];

    let doc = reduce(
        &doc,
        Action::Add {
            sequence: Sequence::Fields,
            element: el("X"),
            index: 1,
        },
    )
    .unwrap();
    assert_eq!(ids(&doc, Sequence::Fields), ["A", "X", "B", "C"]);

    let doc = reduce(
        &doc,
        Action::Remove {
            sequence: Sequence::Fields,
            index: 2,
        },
    )
    .unwrap();
    assert_eq!(ids(&doc, Sequence::Fields), ["A", "X", "C"]);
}

#[test]
fn update_settings_title_changes_only_title() {
    let doc = populated();
    let result = reduce(
        &doc,
        Action::UpdateSettings(SettingUpdate::Title("New Title".into())),
    )
    .unwrap();

    let mut expected = doc.clone();
    expected.title = "New Title".into();
    assert_eq!(result, expected);
}

#[test]
fn rejected_actions_report_sequence_and_length() {
    let doc = populated();
    let cases = [
        Action::Add {
            sequence: Sequence::Constants,
            element: el("X"),
            index: 4,
        },
        Action::Update {
            sequence: Sequence::Constants,
            element: el("X"),
            index: 3,
        },
        Action::Remove {
            sequence: Sequence::Constants,
            index: 3,
        },
        Action::Reorder {
            sequence: Sequence::Constants,
            from: 0,
            to: 3,
        },
    ];
    for action in cases {
        let err = reduce(&doc, action.clone()).unwrap_err();
        assert!(
            matches!(
                err,
                BuilderError::InvalidIndex {
                    sequence: Sequence::Constants,
                    len: 3,
                    ..
                }
            ),
            "{:?} -> {:?}",
            action,
            err
        );
    }
}

#[test]
fn unknown_selector_names_are_rejected() {
    assert!(matches!(
        "widgets".parse::<Sequence>(),
        Err(BuilderError::UnknownSequenceOrField(name)) if name == "widgets"
    ));
    assert!(matches!(
        "colour".parse::<checker_builder::builder::Setting>(),
        Err(BuilderError::UnknownSequenceOrField(_))
    ));
}
