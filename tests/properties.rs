use json_blueprint::{ErrorClass, RootDeserializer, load_str};
use proptest::prelude::*;
use serde_json::{Value, json};

const BLUEPRINT: &str = r#"
type Item { sku: string, qty: integer(min = 0), price: number }
root Order {
    id: integer
    items: Item[]
    optional note: string
    rush: boolean = false
    meta: open { source: string }
}
"#;

fn order() -> RootDeserializer {
    load_str(BLUEPRINT).unwrap().choose_root("Order")
}

// Integers and quarter steps survive a text round trip exactly.
fn number() -> impl Strategy<Value = Value> {
    prop_oneof![
        (-1_000_000i64..1_000_000).prop_map(|n| json!(n)),
        (-4_000i64..4_000).prop_map(|n| json!(n as f64 / 4.0)),
    ]
}

fn item() -> impl Strategy<Value = Value> {
    ("[a-z]{1,6}", 0i64..500, number()).prop_map(|(sku, qty, price)| json!({ "sku": sku, "qty": qty, "price": price }))
}

/// A valid order and the normalized form it must produce: `rush` filled in
/// when absent, undeclared `meta` keys dropped.
fn order_case() -> impl Strategy<Value = (Value, Value)> {
    (
        any::<i32>(),
        prop::collection::vec(item(), 0..5),
        prop::option::of("[ -~]{0,12}"),
        prop::option::of(any::<bool>()),
        "[a-z]{0,8}",
        prop::collection::btree_map("x_[a-z]{1,6}", number(), 0..4),
    )
        .prop_map(|(id, items, note, rush, source, extras)| {
            let mut doc = json!({ "id": id, "items": items, "meta": { "source": source } });
            if let Some(note) = note {
                doc["note"] = json!(note);
            }
            if let Some(rush) = rush {
                doc["rush"] = json!(rush);
            }
            let mut expected = doc.clone();
            expected["rush"] = json!(rush.unwrap_or(false));
            for (key, value) in extras {
                doc["meta"][key.as_str()] = value;
            }
            (doc, expected)
        })
}

fn order_doc() -> impl Strategy<Value = Value> {
    order_case().prop_map(|(doc, _)| doc)
}

proptest! {
    #[test]
    fn normalizing_is_idempotent((doc, expected) in order_case()) {
        let de = order();
        let first = de.deserialize(doc.to_string()).unwrap();
        prop_assert_eq!(first.to_json(), expected);

        let second = de.deserialize(first.to_json().to_string());
        prop_assert_eq!(second.ok(), Some(first));
    }

    #[test]
    fn results_are_deterministic(doc in order_doc(), drop in 0usize..6) {
        let mut doc = doc;
        if let Some(map) = doc.as_object_mut() {
            let key = map.keys().nth(drop).cloned();
            if let Some(key) = key {
                map.shift_remove(&key);
            }
        }
        let raw = doc.to_string();
        let de = order();
        let first = de.deserialize(&raw).map(|v| v.to_json()).map_err(|e| e.to_string());
        let second = de.deserialize(&raw).map(|v| v.to_json()).map_err(|e| e.to_string());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn dropping_a_required_field_names_it(doc in order_doc(), pick in 0usize..2) {
        let field = ["id", "items"][pick];
        let mut doc = doc;
        doc.as_object_mut().unwrap().shift_remove(field);
        let err = order().deserialize(doc.to_string()).unwrap_err();
        prop_assert_eq!(err.class(), ErrorClass::MissingRequiredField);
        prop_assert_eq!(err.path().to_strings(), vec![field.to_string()]);
    }

    #[test]
    fn extra_keys_are_unknown_fields(doc in order_doc(), key in "x_[a-z]{1,8}") {
        let mut doc = doc;
        doc[key.as_str()] = json!(1);
        let err = order().deserialize(doc.to_string()).unwrap_err();
        prop_assert_eq!(err.class(), ErrorClass::UnknownField);
        prop_assert_eq!(err.path().to_strings(), vec![key]);
    }

    #[test]
    fn arbitrary_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        if let Err(err) = order().deserialize(&bytes) {
            prop_assert!(err.class() != ErrorClass::MalformedInput || err.path().is_root());
        }
    }
}

#[test]
fn default_is_filled_when_absent() {
    let value = order()
        .deserialize(r#"{"id": 1, "items": [], "meta": {"source": "web", "referrer": "x"}}"#)
        .unwrap();
    assert_eq!(value["rush"].as_bool(), Some(false));
    assert!(value.get("note").is_none());
    assert!(value["meta"].get("referrer").is_none());
}
