//! Property-based round-trip coverage for the typed payload codecs.

use proptest::collection::vec;
use proptest::prelude::*;
use shmdb_codec::{
    encode_dict_str_int, encode_int_set, encode_string_set, DictStrIntView, IntSetView,
    ObjectView, StringSetView, StringVectorView, Value, ValueType,
};

fn key_string() -> impl Strategy<Value = String> {
    "[a-z0-9_]{1,12}"
}

fn leaf_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        // Finite floats only: NaN breaks PartialEq-based comparison, not
        // the codec.
        (-1.0e12f64..1.0e12).prop_map(Value::Float),
        key_string().prop_map(Value::Str),
        vec(any::<u8>(), 0..32).prop_map(Value::Bytes),
        vec(any::<i64>(), 0..16).prop_map(Value::IntVector),
        vec(any::<bool>(), 0..16).prop_map(Value::BoolVector),
        vec(key_string(), 0..8).prop_map(Value::StringVector),
    ]
}

fn object_value() -> impl Strategy<Value = Value> {
    leaf_value().prop_recursive(3, 24, 6, |inner| {
        prop_oneof![
            proptest::collection::hash_map(key_string(), inner.clone(), 0..6).prop_map(|m| {
                Value::Object(m.into_iter().collect())
            }),
            vec(inner, 0..6).prop_map(Value::List),
        ]
    })
}

proptest! {
    #[test]
    fn leaf_roundtrip(value in leaf_value()) {
        let payload = value.encode().unwrap();
        let decoded = Value::decode(value.tag(), &payload).unwrap();
        prop_assert_eq!(decoded, value);
    }

    #[test]
    fn int_set_is_strictly_increasing(values in vec(any::<i64>(), 0..64)) {
        let payload = encode_int_set(&values).unwrap();
        let view = IntSetView::parse(&payload).unwrap();
        let decoded = view.to_vec();
        prop_assert!(decoded.windows(2).all(|w| w[0] < w[1]));
        for v in &values {
            prop_assert!(view.contains(*v));
        }
    }

    #[test]
    fn string_set_is_strictly_increasing(values in vec(vec(any::<u8>(), 0..8), 0..32)) {
        let items: Vec<&[u8]> = values.iter().map(|v| v.as_slice()).collect();
        let payload = encode_string_set(&items).unwrap();
        let view = StringSetView::parse(&payload).unwrap();
        let decoded: Vec<&[u8]> = view.iter().collect();
        prop_assert!(decoded.windows(2).all(|w| w[0] < w[1]));
        for item in &items {
            prop_assert!(view.contains(item));
        }
    }

    #[test]
    fn dict_keys_sorted_and_searchable(
        entries in proptest::collection::hash_map(key_string(), any::<i64>(), 0..32)
    ) {
        let entries: Vec<(String, i64)> = entries.into_iter().collect();
        let pairs: Vec<(&[u8], i64)> =
            entries.iter().map(|(k, v)| (k.as_bytes(), *v)).collect();
        let payload = encode_dict_str_int(&pairs).unwrap();
        let view = DictStrIntView::parse(&payload).unwrap();

        let keys: Vec<&[u8]> = (0..view.len()).map(|i| view.key_at(i).unwrap()).collect();
        prop_assert!(keys.windows(2).all(|w| w[0] < w[1]));
        for (k, v) in &entries {
            prop_assert_eq!(view.get(k.as_bytes()), Some(*v));
        }
        prop_assert_eq!(view.get(b"\xffnever-a-key"), None);
    }

    #[test]
    fn offset_table_terminal_is_blob_len(values in vec(vec(any::<u8>(), 0..16), 0..16)) {
        let items: Vec<&[u8]> = values.iter().map(|v| v.as_slice()).collect();
        let payload = shmdb_codec::encode_string_vector(&items).unwrap();
        let view = StringVectorView::parse(&payload).unwrap();
        let total: usize = values.iter().map(Vec::len).sum();
        prop_assert_eq!(view.table().blob_len() as usize, total);
    }

    #[test]
    fn object_field_access_matches_model(tree in object_value()) {
        let payload = tree.encode().unwrap();
        let decoded = Value::decode(tree.tag(), &payload).unwrap();

        if let (Value::Object(_), ValueType::Object) = (&tree, tree.tag()) {
            let view = ObjectView::parse(&payload).unwrap();
            let Value::Object(fields) = &decoded else { unreachable!() };
            prop_assert_eq!(view.len(), fields.len());
            for (name, expected) in fields {
                let field = view.field(name.as_bytes()).unwrap().unwrap();
                let got = Value::decode(field.tag, field.payload).unwrap();
                prop_assert_eq!(&got, expected);
            }
            prop_assert!(view.field(b"\xff").unwrap().is_none());
        }
    }
}
