//! Property store
//!
//!     A [PropertyStore] maps keys to [Datum] values in declaration order. The order matters:
//!     the writer emits entries in the order they were stored, and a whole-key override moves
//!     the key to the end, the same as removing it and declaring it again.
//!
//!     [Data] is a closed sum over the four value kinds. Unit metadata only exists on reals and
//!     the path flag only on strings, so the invalid combinations cannot be built.

use crate::props::error::Fault;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

/// Prefix marking keys that are not meant for end users
pub const PRIVATE_KEY_PREFIX: &str = "__";

/// Value kind of a datum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Boolean,
    Integer,
    Real,
    String,
}

impl Kind {
    /// Type label as written in declarations
    pub fn label(&self) -> &'static str {
        match self {
            Kind::Boolean => "boolean",
            Kind::Integer => "integer",
            Kind::Real => "real",
            Kind::String => "string",
        }
    }

    pub fn from_label(label: &str) -> Option<Kind> {
        match label {
            "boolean" => Some(Kind::Boolean),
            "integer" => Some(Kind::Integer),
            "real" => Some(Kind::Real),
            "string" => Some(Kind::String),
            _ => None,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    Scalar,
    Vector,
}

/// Typed values of a datum
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Data {
    Boolean {
        values: Vec<bool>,
    },
    Integer {
        values: Vec<i32>,
    },
    Real {
        /// Values in base units
        values: Vec<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        unit_symbol: Option<String>,
    },
    String {
        values: Vec<String>,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        explicit_path: bool,
    },
}

impl Data {
    pub fn kind(&self) -> Kind {
        match self {
            Data::Boolean { .. } => Kind::Boolean,
            Data::Integer { .. } => Kind::Integer,
            Data::Real { .. } => Kind::Real,
            Data::String { .. } => Kind::String,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Data::Boolean { values } => values.len(),
            Data::Integer { values } => values.len(),
            Data::Real { values, .. } => values.len(),
            Data::String { values, .. } => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn unit_symbol(&self) -> Option<&str> {
        match self {
            Data::Real { unit_symbol, .. } => unit_symbol.as_deref(),
            _ => None,
        }
    }

    pub fn is_explicit_path(&self) -> bool {
        matches!(
            self,
            Data::String {
                explicit_path: true,
                ..
            }
        )
    }

    /// Kind, unit symbol and path flag all agree
    pub fn is_compatible_with(&self, other: &Data) -> bool {
        self.kind() == other.kind()
            && self.unit_symbol() == other.unit_symbol()
            && self.is_explicit_path() == other.is_explicit_path()
    }

    /// Append the values of a compatible `other`
    pub fn extend_from(&mut self, other: Data) -> Result<(), Fault> {
        match (self, other) {
            (Data::Boolean { values }, Data::Boolean { values: more }) => values.extend(more),
            (Data::Integer { values }, Data::Integer { values: more }) => values.extend(more),
            (Data::Real { values, .. }, Data::Real { values: more, .. }) => values.extend(more),
            (Data::String { values, .. }, Data::String { values: more, .. }) => {
                values.extend(more)
            }
            (this, other) => {
                return Err(Fault::semantic(format!(
                    "cannot append {} values to {} values",
                    other.kind(),
                    this.kind()
                )))
            }
        }
        Ok(())
    }

    /// Replace element `index` with the first value of a compatible `other`
    pub fn replace_item(&mut self, index: usize, other: Data) -> Result<(), Fault> {
        let len = self.len();
        if index >= len {
            return Err(Fault::semantic(format!(
                "invalid array index [{}] for a vector of size {}",
                index, len
            )));
        }
        let replaced = match (self, other) {
            (Data::Boolean { values }, Data::Boolean { values: new }) => {
                new.into_iter().next().map(|v| values[index] = v)
            }
            (Data::Integer { values }, Data::Integer { values: new }) => {
                new.into_iter().next().map(|v| values[index] = v)
            }
            (Data::Real { values, .. }, Data::Real { values: new, .. }) => {
                new.into_iter().next().map(|v| values[index] = v)
            }
            (Data::String { values, .. }, Data::String { values: new, .. }) => {
                new.into_iter().next().map(|v| values[index] = v)
            }
            (this, other) => {
                return Err(Fault::semantic(format!(
                    "type mismatch '{}' vs '{}' for array item override",
                    other.kind(),
                    this.kind()
                )))
            }
        };
        replaced.ok_or_else(|| Fault::semantic("missing value for array item override"))
    }
}

/// A single stored property
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Datum {
    #[serde(flatten)]
    data: Data,
    cardinality: Cardinality,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    locked: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    description: String,
}

impl Datum {
    /// Single value datum; `data` must hold exactly one value
    pub fn scalar(data: Data) -> Self {
        debug_assert_eq!(data.len(), 1, "scalar data must hold one value");
        Datum {
            data,
            cardinality: Cardinality::Scalar,
            locked: false,
            description: String::new(),
        }
    }

    pub fn vector(data: Data) -> Self {
        Datum {
            data,
            cardinality: Cardinality::Vector,
            locked: false,
            description: String::new(),
        }
    }

    pub fn boolean(value: bool) -> Self {
        Self::scalar(Data::Boolean {
            values: vec![value],
        })
    }

    pub fn integer(value: i32) -> Self {
        Self::scalar(Data::Integer {
            values: vec![value],
        })
    }

    pub fn real(value: f64) -> Self {
        Self::scalar(Data::Real {
            values: vec![value],
            unit_symbol: None,
        })
    }

    /// Real in base units, annotated with the symbol it was expressed in
    pub fn real_with_unit(value: f64, symbol: impl Into<String>) -> Self {
        Self::scalar(Data::Real {
            values: vec![value],
            unit_symbol: Some(symbol.into()),
        })
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::scalar(Data::String {
            values: vec![value.into()],
            explicit_path: false,
        })
    }

    pub fn path(value: impl Into<String>) -> Self {
        Self::scalar(Data::String {
            values: vec![value.into()],
            explicit_path: true,
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_locked(mut self, locked: bool) -> Self {
        self.locked = locked;
        self
    }

    pub fn data(&self) -> &Data {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Data {
        &mut self.data
    }

    pub fn into_data(self) -> Data {
        self.data
    }

    pub fn kind(&self) -> Kind {
        self.data.kind()
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    pub fn is_scalar(&self) -> bool {
        self.cardinality == Cardinality::Scalar
    }

    pub fn is_vector(&self) -> bool {
        self.cardinality == Cardinality::Vector
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn unit_symbol(&self) -> Option<&str> {
        self.data.unit_symbol()
    }

    pub fn has_explicit_unit(&self) -> bool {
        self.unit_symbol().is_some()
    }

    pub fn is_explicit_path(&self) -> bool {
        self.data.is_explicit_path()
    }
}

/// Insertion-ordered mapping from keys to data
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PropertyStore {
    #[serde(skip_serializing_if = "String::is_empty")]
    description: String,
    #[serde(rename = "properties")]
    entries: IndexMap<String, Datum>,
}

impl PropertyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Datum> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Datum> {
        self.entries.get_mut(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Datum)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Insert `datum` at the end of the order, dropping any previous entry for `key`
    pub fn store(&mut self, key: impl Into<String>, datum: Datum) -> Option<Datum> {
        let key = key.into();
        let previous = self.entries.shift_remove(&key);
        self.entries.insert(key, datum);
        previous
    }

    pub fn remove(&mut self, key: &str) -> Option<Datum> {
        self.entries.shift_remove(key)
    }

    pub fn clear(&mut self) {
        self.description.clear();
        self.entries.clear();
    }

    pub fn is_private_key(key: &str) -> bool {
        key.starts_with(PRIVATE_KEY_PREFIX)
    }

    /// Merge every entry of `other` into `self`
    ///
    /// A key already present is replaced only when `allow_override` is set and the present
    /// datum is not locked.
    pub fn merge_with(&mut self, other: PropertyStore, allow_override: bool) -> Result<(), Fault> {
        for (key, datum) in other.entries {
            if let Some(existing) = self.entries.get(&key) {
                if !allow_override {
                    return Err(Fault::semantic(format!(
                        "key '{}' is already used and property override is not allowed",
                        key
                    )));
                }
                if existing.is_locked() {
                    return Err(Fault::semantic(format!(
                        "property '{}' is locked and cannot be overridden",
                        key
                    )));
                }
            }
            self.store(key, datum);
        }
        Ok(())
    }

    pub fn boolean(&self, key: &str) -> Option<bool> {
        match self.scalar(key)? {
            Data::Boolean { values } => values.first().copied(),
            _ => None,
        }
    }

    pub fn integer(&self, key: &str) -> Option<i32> {
        match self.scalar(key)? {
            Data::Integer { values } => values.first().copied(),
            _ => None,
        }
    }

    /// Scalar real in base units
    pub fn real(&self, key: &str) -> Option<f64> {
        match self.scalar(key)? {
            Data::Real { values, .. } => values.first().copied(),
            _ => None,
        }
    }

    pub fn string(&self, key: &str) -> Option<&str> {
        match self.scalar(key)? {
            Data::String { values, .. } => values.first().map(String::as_str),
            _ => None,
        }
    }

    pub fn boolean_vector(&self, key: &str) -> Option<&[bool]> {
        match self.vector(key)? {
            Data::Boolean { values } => Some(values),
            _ => None,
        }
    }

    pub fn integer_vector(&self, key: &str) -> Option<&[i32]> {
        match self.vector(key)? {
            Data::Integer { values } => Some(values),
            _ => None,
        }
    }

    pub fn real_vector(&self, key: &str) -> Option<&[f64]> {
        match self.vector(key)? {
            Data::Real { values, .. } => Some(values),
            _ => None,
        }
    }

    pub fn string_vector(&self, key: &str) -> Option<&[String]> {
        match self.vector(key)? {
            Data::String { values, .. } => Some(values),
            _ => None,
        }
    }

    fn scalar(&self, key: &str) -> Option<&Data> {
        self.get(key).filter(|d| d.is_scalar()).map(Datum::data)
    }

    fn vector(&self, key: &str) -> Option<&Data> {
        self.get(key).filter(|d| d.is_vector()).map(Datum::data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PropertyStore {
        let mut store = PropertyStore::new();
        store.store("a", Datum::integer(1));
        store.store("b", Datum::string("two"));
        store.store(
            "c",
            Datum::vector(Data::Integer {
                values: vec![1, 2, 3],
            }),
        );
        store
    }

    #[test]
    fn test_store_keeps_insertion_order() {
        let store = sample();
        assert_eq!(store.keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_store_replacement_moves_key_to_end() {
        let mut store = sample();
        let previous = store.store("a", Datum::integer(5));
        assert_eq!(previous, Some(Datum::integer(1)));
        assert_eq!(store.keys().collect::<Vec<_>>(), vec!["b", "c", "a"]);
        assert_eq!(store.integer("a"), Some(5));
    }

    #[test]
    fn test_typed_fetchers_respect_cardinality() {
        let store = sample();
        assert_eq!(store.integer("a"), Some(1));
        assert_eq!(store.string("b"), Some("two"));
        assert_eq!(store.integer("c"), None);
        assert_eq!(store.integer_vector("c"), Some(&[1, 2, 3][..]));
        assert_eq!(store.integer_vector("a"), None);
        assert_eq!(store.real("a"), None);
    }

    #[test]
    fn test_merge_without_override_rejects_collision() {
        let mut store = sample();
        let mut other = PropertyStore::new();
        other.store("a", Datum::integer(7));
        let err = store.merge_with(other, false).unwrap_err();
        assert!(matches!(err, Fault::Semantic(_)));
        assert_eq!(store.integer("a"), Some(1));
    }

    #[test]
    fn test_merge_with_override_replaces_unlocked() {
        let mut store = sample();
        let mut other = PropertyStore::new();
        other.store("a", Datum::integer(7));
        other.store("d", Datum::boolean(true));
        store.merge_with(other, true).unwrap();
        assert_eq!(store.integer("a"), Some(7));
        assert_eq!(store.boolean("d"), Some(true));
    }

    #[test]
    fn test_merge_never_replaces_locked() {
        let mut store = PropertyStore::new();
        store.store("pi", Datum::real(3.14).with_locked(true));
        let mut other = PropertyStore::new();
        other.store("pi", Datum::real(3.0));
        let err = store.merge_with(other, true).unwrap_err();
        assert!(err.message().contains("locked"));
    }

    #[test]
    fn test_private_keys() {
        assert!(PropertyStore::is_private_key("__hidden"));
        assert!(!PropertyStore::is_private_key("visible"));
    }

    #[test]
    fn test_replace_item_out_of_range() {
        let mut data = Data::Integer {
            values: vec![1, 2],
        };
        let err = data
            .replace_item(2, Data::Integer { values: vec![9] })
            .unwrap_err();
        assert!(err.message().contains("invalid array index [2]"));
    }

    #[test]
    fn test_compatibility_checks_unit_and_path() {
        let mm = Data::Real {
            values: vec![1.0],
            unit_symbol: Some("mm".to_string()),
        };
        let bare = Data::Real {
            values: vec![1.0],
            unit_symbol: None,
        };
        assert!(!mm.is_compatible_with(&bare));
        assert!(mm.is_compatible_with(&mm.clone()));
    }
}
