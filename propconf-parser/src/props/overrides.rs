//! Key collision policy
//!
//!     Decides what happens when a declaration meets the store:
//!
//!         existing   mode        requires                                 effect
//!         no         declare     -                                        insert
//!         yes        declare     override allowed, not locked             replace, moved last
//!         yes        K[i] = v    override allowed, vector, compatible     element i replaced
//!         yes        K += v      override allowed, vector, compatible     elements appended
//!         no         K[i], +=    -                                        error
//!
//!     Compatible means same kind, same unit symbol and same path flag. A locked datum is never
//!     a valid target.

use crate::props::error::Fault;
use crate::props::parsing::Mode;
use crate::props::store::{Datum, PropertyStore};
use tracing::warn;

/// Put `datum` under `key` according to `mode`
pub fn apply(
    store: &mut PropertyStore,
    key: &str,
    datum: Datum,
    mode: Mode,
    allow_override: bool,
) -> Result<(), Fault> {
    let existing = match store.get(key) {
        Some(existing) => existing,
        None => {
            return match mode {
                Mode::Declare => {
                    store.store(key, datum);
                    Ok(())
                }
                Mode::Append => Err(Fault::semantic(format!(
                    "cannot append values to missing key '{}'",
                    key
                ))),
                Mode::ItemOverride(index) => Err(Fault::semantic(format!(
                    "cannot override item [{}] of missing key '{}'",
                    index, key
                ))),
            }
        }
    };

    if existing.is_locked() {
        return Err(Fault::semantic(format!(
            "key '{}' is locked and cannot be overridden",
            key
        )));
    }
    if !allow_override {
        return Err(Fault::semantic(format!(
            "key '{}' is already used and override is not allowed",
            key
        )));
    }
    if mode == Mode::Declare {
        warn!(key = %key, "overriding existing property");
        store.store(key, datum);
        return Ok(());
    }
    if !existing.is_vector() {
        return Err(Fault::semantic(format!("key '{}' is not a vector", key)));
    }
    if !existing.data().is_compatible_with(datum.data()) {
        return Err(Fault::semantic(format!(
            "incompatible {} values for existing {} vector '{}'",
            datum.kind(),
            existing.kind(),
            key
        )));
    }

    if let Some(target) = store.get_mut(key) {
        match mode {
            Mode::ItemOverride(index) => target.data_mut().replace_item(index, datum.into_data())?,
            _ => target.data_mut().extend_from(datum.into_data())?,
        }
    }
    Ok(())
}
