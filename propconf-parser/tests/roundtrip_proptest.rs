//! Property-based round trip: reading back what the writer produced gives the same store
//!
//! Reals written with a unit go through a division and a multiplication by the unit factor, so
//! they are compared with a relative tolerance. Everything else must match exactly.

use approx::relative_eq;
use proptest::prelude::*;
use propconf_parser::{parse_str, Data, Datum, PropertyStore, Writer, WriterOptions};

const SYMBOLS: &[&str] = &["mm", "cm", "km", "s", "ns", "ms", "MeV", "keV", "deg", "T"];

fn key_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z][a-z0-9_]{0,8}",
        "[a-z][a-z0-9]{0,4}\\.[a-z][a-z0-9_]{0,4}",
    ]
}

fn description_strategy() -> impl Strategy<Value = Option<String>> {
    prop::option::of("[A-Za-z][A-Za-z0-9]{0,10}( [A-Za-z0-9]{1,8}){0,2}")
}

fn string_value_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z0-9_./-]{0,12}",
        // quotes, blanks and backslashes survive quoting
        "[a-zA-Z0-9 \"\\\\#]{0,12}",
    ]
}

fn data_strategy() -> impl Strategy<Value = (Data, bool)> {
    prop_oneof![
        any::<bool>().prop_map(|v| (Data::Boolean { values: vec![v] }, false)),
        prop::collection::vec(any::<bool>(), 0..24)
            .prop_map(|values| (Data::Boolean { values }, true)),
        any::<i32>().prop_map(|v| (Data::Integer { values: vec![v] }, false)),
        prop::collection::vec(any::<i32>(), 0..12)
            .prop_map(|values| (Data::Integer { values }, true)),
        (-1.0e6..1.0e6f64, prop::option::of(prop::sample::select(SYMBOLS))).prop_map(
            |(v, symbol)| (
                Data::Real {
                    values: vec![v],
                    unit_symbol: symbol.map(str::to_string),
                },
                false
            )
        ),
        (
            prop::collection::vec(-1.0e6..1.0e6f64, 0..6),
            prop::option::of(prop::sample::select(SYMBOLS))
        )
            .prop_map(|(values, symbol)| (
                Data::Real {
                    values,
                    unit_symbol: symbol.map(str::to_string),
                },
                true
            )),
        (string_value_strategy(), any::<bool>()).prop_map(|(v, explicit_path)| (
            Data::String {
                values: vec![v],
                explicit_path
            },
            false
        )),
        (prop::collection::vec(string_value_strategy(), 0..4), any::<bool>()).prop_map(
            |(values, explicit_path)| (
                Data::String {
                    values,
                    explicit_path
                },
                true
            )
        ),
    ]
}

fn datum_strategy() -> impl Strategy<Value = Datum> {
    (data_strategy(), any::<bool>(), description_strategy()).prop_map(
        |((data, vector), locked, description)| {
            let datum = if vector {
                Datum::vector(data)
            } else {
                Datum::scalar(data)
            };
            let datum = datum.with_locked(locked);
            match description {
                Some(text) => datum.with_description(text),
                None => datum,
            }
        },
    )
}

fn store_strategy() -> impl Strategy<Value = PropertyStore> {
    (
        prop::collection::btree_map(key_strategy(), datum_strategy(), 0..8),
        description_strategy(),
    )
        .prop_map(|(entries, description)| {
            let mut store = PropertyStore::new();
            if let Some(text) = description {
                store.set_description(text);
            }
            for (key, datum) in entries {
                store.store(key, datum);
            }
            store
        })
}

fn same_data(left: &Data, right: &Data) -> bool {
    match (left, right) {
        (
            Data::Real {
                values: a,
                unit_symbol: sa,
            },
            Data::Real {
                values: b,
                unit_symbol: sb,
            },
        ) => {
            sa == sb
                && a.len() == b.len()
                && a.iter()
                    .zip(b)
                    .all(|(x, y)| relative_eq!(*x, *y, epsilon = 1e-9, max_relative = 1e-12))
        }
        _ => left == right,
    }
}

fn assert_same_store(written: &PropertyStore, read: &PropertyStore) -> Result<(), TestCaseError> {
    prop_assert_eq!(written.description(), read.description());
    prop_assert_eq!(
        written.keys().collect::<Vec<_>>(),
        read.keys().collect::<Vec<_>>()
    );
    for (key, datum) in written.iter() {
        let other = read.get(key).unwrap();
        prop_assert_eq!(datum.cardinality(), other.cardinality(), "key {}", key);
        prop_assert_eq!(datum.is_locked(), other.is_locked(), "key {}", key);
        prop_assert_eq!(datum.description(), other.description(), "key {}", key);
        prop_assert!(
            same_data(datum.data(), other.data()),
            "key {}: {:?} vs {:?}",
            key,
            datum.data(),
            other.data()
        );
    }
    Ok(())
}

proptest! {
    #[test]
    fn test_write_then_read(store in store_strategy(), wrap in any::<bool>()) {
        let text = Writer::new(WriterOptions::default().with_smart_modulo(wrap))
            .write_string(&store)
            .unwrap();
        let read = parse_str(&text).unwrap();
        assert_same_store(&store, &read)?;
    }
}
