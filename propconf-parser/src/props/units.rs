//! Physical units
//!
//!     Reals carry no unit at runtime: a value written as `2 s` is stored as `2 × second` in
//!     base units and only the symbol is remembered for writing it back. Base units follow the
//!     usual particle physics convention: millimeter, nanosecond, MeV and the positron charge
//!     are all 1.
//!
//!     Units are grouped by label (the dimension: "length", "time", ...). A declaration can
//!     require a label with `as <label>` and the writer can swap a symbol for a preferred one of
//!     the same label.
//!
//!     The reader and writer only talk to the [UnitRegistry] trait. [StandardUnits] is the
//!     built-in table.

use indexmap::IndexMap;
use once_cell::sync::Lazy;

/// A resolved unit symbol
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    /// Value of one unit expressed in base units
    pub factor: f64,
    pub label: String,
}

/// Lookup of unit symbols and labels
pub trait UnitRegistry: std::fmt::Debug {
    fn find_unit(&self, symbol: &str) -> Option<Unit>;

    fn is_label_valid(&self, label: &str) -> bool;
}

mod base {
    use std::f64::consts::PI;

    pub const MILLIMETER: f64 = 1.0;
    pub const CENTIMETER: f64 = 10.0 * MILLIMETER;
    pub const METER: f64 = 1000.0 * MILLIMETER;
    pub const KILOMETER: f64 = 1000.0 * METER;
    pub const NANOSECOND: f64 = 1.0;
    pub const SECOND: f64 = 1.0e9 * NANOSECOND;
    pub const MEV: f64 = 1.0;
    pub const EPLUS: f64 = 1.0;
    pub const E_SI: f64 = 1.602176634e-19;
    pub const RADIAN: f64 = 1.0;
    pub const DEGREE: f64 = PI / 180.0 * RADIAN;
    pub const JOULE: f64 = 1.0e-6 * MEV / E_SI;
    pub const KILOGRAM: f64 = JOULE * SECOND * SECOND / (METER * METER);
    pub const GRAM: f64 = 1.0e-3 * KILOGRAM;
    pub const PASCAL: f64 = JOULE / METER / (METER * METER);
    pub const BAR: f64 = 1.0e5 * PASCAL;
    pub const VOLT: f64 = 1.0e-6 * MEV / EPLUS;
    pub const TESLA: f64 = VOLT * SECOND / (METER * METER);
    pub const GAUSS: f64 = 1.0e-4 * TESLA;
    pub const KELVIN: f64 = 1.0;
    pub const HERTZ: f64 = 1.0 / SECOND;
    pub const BECQUEREL: f64 = 1.0 / SECOND;
    pub const CURIE: f64 = 3.7e10 * BECQUEREL;
    pub const COULOMB: f64 = EPLUS / E_SI;
    pub const AMPERE: f64 = COULOMB / SECOND;
    pub const C_LIGHT: f64 = 299.792458 * MILLIMETER / NANOSECOND;
    pub const PARSEC: f64 = 3.0856775807e16 * METER;
}

/// Unit labels, in lookup order
const LABELS: &[&str] = &[
    "length",
    "surface",
    "volume",
    "time",
    "angle",
    "solid_angle",
    "energy",
    "mass",
    "pressure",
    "magnetic_field",
    "electric_field",
    "electric_tension",
    "temperature",
    "density",
    "activity",
    "surface_activity",
    "volume_activity",
    "mass_activity",
    "frequency",
    "electric_charge",
    "electric_current",
    "speed",
];

static TABLE: Lazy<IndexMap<&'static str, (f64, &'static str)>> = Lazy::new(|| {
    use base::*;

    let m2 = METER * METER;
    let m3 = m2 * METER;
    let cm3 = CENTIMETER * CENTIMETER * CENTIMETER;
    let c2 = C_LIGHT * C_LIGHT;

    let mut table = IndexMap::new();
    let mut add = |label: &'static str, symbols: &[&'static str], factor: f64| {
        for symbol in symbols {
            // First label wins, matching the lookup order of LABELS
            table.entry(*symbol).or_insert((factor, label));
        }
    };

    add("length", &["angstrom"], 1.0e-10 * METER);
    add("length", &["fm", "fermi"], 1.0e-15 * METER);
    add("length", &["nm", "nanometer"], 1.0e-9 * METER);
    add("length", &["um", "micrometer"], 1.0e-6 * METER);
    add("length", &["mm", "millimeter"], MILLIMETER);
    add("length", &["cm", "centimeter"], CENTIMETER);
    add("length", &["m", "meter"], METER);
    add("length", &["km", "kilometer"], KILOMETER);
    add("length", &["pc", "parsec"], PARSEC);
    add("length", &["inch"], 2.54 * CENTIMETER);

    add("surface", &["m2"], m2);
    add("surface", &["cm2"], CENTIMETER * CENTIMETER);
    add("surface", &["mm2"], MILLIMETER * MILLIMETER);
    add("surface", &["km2"], KILOMETER * KILOMETER);

    add("volume", &["m3"], m3);
    add("volume", &["cm3"], cm3);
    add("volume", &["mm3"], MILLIMETER * MILLIMETER * MILLIMETER);
    add("volume", &["km3"], KILOMETER * KILOMETER * KILOMETER);

    add("time", &["fs", "femtosecond"], 1.0e-15 * SECOND);
    add("time", &["ps", "picosecond"], 1.0e-12 * SECOND);
    add("time", &["ns", "nanosecond"], NANOSECOND);
    add("time", &["us", "microsecond"], 1.0e-6 * SECOND);
    add("time", &["ms", "millisecond"], 1.0e-3 * SECOND);
    add("time", &["s", "second"], SECOND);
    add("time", &["minute"], 60.0 * SECOND);
    add("time", &["h", "hour"], 3600.0 * SECOND);

    add("angle", &["rad", "radian"], RADIAN);
    add("angle", &["mrad", "milliradian"], 1.0e-3 * RADIAN);
    add("angle", &["deg", "degree"], DEGREE);

    add("solid_angle", &["steradian"], 1.0);

    add("energy", &["eV", "electronvolt"], 1.0e-6 * MEV);
    add("energy", &["keV", "kiloelectronvolt"], 1.0e-3 * MEV);
    add("energy", &["MeV", "megaelectronvolt"], MEV);
    add("energy", &["GeV", "gigaelectronvolt"], 1.0e3 * MEV);
    add("energy", &["TeV", "teraelectronvolt"], 1.0e6 * MEV);
    add("energy", &["PeV", "petaelectronvolt"], 1.0e9 * MEV);
    add("energy", &["J", "joule"], JOULE);

    add("mass", &["eV/c2"], 1.0e-6 * MEV / c2);
    add("mass", &["MeV/c2"], MEV / c2);
    add("mass", &["GeV/c2"], 1.0e3 * MEV / c2);
    add("mass", &["kg", "kilogram"], KILOGRAM);
    add("mass", &["g", "gram"], GRAM);
    add("mass", &["mg", "milligram"], 1.0e-3 * GRAM);
    add("mass", &["ug", "microgram"], 1.0e-6 * GRAM);
    add("mass", &["t", "ton"], 1000.0 * KILOGRAM);

    add("pressure", &["mbar", "millibar"], 1.0e-3 * BAR);
    add("pressure", &["bar"], BAR);
    add("pressure", &["atmosphere"], 101325.0 * PASCAL);
    add("pressure", &["Pa", "pascal"], PASCAL);

    add("magnetic_field", &["T", "tesla"], TESLA);
    add("magnetic_field", &["G", "gauss"], GAUSS);
    add("magnetic_field", &["kG", "kilogauss"], 1.0e3 * GAUSS);

    add("electric_field", &["V/cm"], VOLT / CENTIMETER);
    add("electric_field", &["V/m"], VOLT / METER);
    add("electric_field", &["kV/cm"], 1.0e3 * VOLT / CENTIMETER);
    add("electric_field", &["kV/m"], 1.0e3 * VOLT / METER);

    add("electric_tension", &["uV"], 1.0e-6 * VOLT);
    add("electric_tension", &["mV"], 1.0e-3 * VOLT);
    add("electric_tension", &["V"], VOLT);
    add("electric_tension", &["kV"], 1.0e3 * VOLT);
    add("electric_tension", &["MV"], 1.0e6 * VOLT);

    add("temperature", &["kelvin"], KELVIN);

    add("density", &["mg/cm3"], 1.0e-3 * GRAM / cm3);
    add("density", &["g/cm3"], GRAM / cm3);
    add("density", &["kg/m3"], KILOGRAM / m3);

    add("activity", &["Bq"], BECQUEREL);
    add("activity", &["mBq"], 1.0e-3 * BECQUEREL);
    add("activity", &["uBq"], 1.0e-6 * BECQUEREL);
    add("activity", &["kBq"], 1.0e3 * BECQUEREL);
    add("activity", &["MBq"], 1.0e6 * BECQUEREL);
    add("activity", &["GBq"], 1.0e9 * BECQUEREL);
    add("activity", &["Ci"], CURIE);
    add("activity", &["kCi"], 1.0e3 * CURIE);
    add("activity", &["MCi"], 1.0e6 * CURIE);
    add("activity", &["mCi"], 1.0e-3 * CURIE);
    add("activity", &["uCi"], 1.0e-6 * CURIE);
    add("activity", &["nCi"], 1.0e-9 * CURIE);
    add("activity", &["pCi"], 1.0e-12 * CURIE);
    add("activity", &["dpm"], BECQUEREL / 60.0);

    add("surface_activity", &["Bq/m2"], BECQUEREL / m2);
    add("surface_activity", &["mBq/m2"], 1.0e-3 * BECQUEREL / m2);
    add("surface_activity", &["uBq/m2"], 1.0e-6 * BECQUEREL / m2);
    add("surface_activity", &["kBq/m2"], 1.0e3 * BECQUEREL / m2);
    add("surface_activity", &["MBq/m2"], 1.0e6 * BECQUEREL / m2);
    add("surface_activity", &["GBq/m2"], 1.0e9 * BECQUEREL / m2);
    add("surface_activity", &["dpm/m2"], BECQUEREL / 60.0 / m2);

    add("volume_activity", &["Bq/m3"], BECQUEREL / m3);
    add("volume_activity", &["mBq/m3"], 1.0e-3 * BECQUEREL / m3);
    add("volume_activity", &["uBq/m3"], 1.0e-6 * BECQUEREL / m3);
    add("volume_activity", &["kBq/m3"], 1.0e3 * BECQUEREL / m3);
    add("volume_activity", &["MBq/m3"], 1.0e6 * BECQUEREL / m3);
    add("volume_activity", &["GBq/m3"], 1.0e9 * BECQUEREL / m3);
    add("volume_activity", &["dpm/m3"], BECQUEREL / 60.0 / m3);

    add("mass_activity", &["Bq/kg"], BECQUEREL / KILOGRAM);
    add("mass_activity", &["mBq/kg"], 1.0e-3 * BECQUEREL / KILOGRAM);
    add("mass_activity", &["uBq/kg"], 1.0e-6 * BECQUEREL / KILOGRAM);
    add("mass_activity", &["kBq/kg"], 1.0e3 * BECQUEREL / KILOGRAM);
    add("mass_activity", &["MBq/kg"], 1.0e6 * BECQUEREL / KILOGRAM);
    add("mass_activity", &["GBq/kg"], 1.0e9 * BECQUEREL / KILOGRAM);
    add("mass_activity", &["dpm/kg"], BECQUEREL / 60.0 / KILOGRAM);

    add("frequency", &["Hz"], HERTZ);
    add("frequency", &["mHz"], 1.0e-3 * HERTZ);
    add("frequency", &["kHz"], 1.0e3 * HERTZ);
    add("frequency", &["MHz"], 1.0e6 * HERTZ);
    add("frequency", &["GHz"], 1.0e9 * HERTZ);

    add("electric_charge", &["C"], COULOMB);
    add("electric_charge", &["nC"], 1.0e-9 * COULOMB);
    add("electric_charge", &["pC"], 1.0e-12 * COULOMB);

    add("electric_current", &["A"], AMPERE);
    add("electric_current", &["mA"], 1.0e-3 * AMPERE);
    add("electric_current", &["uA"], 1.0e-6 * AMPERE);
    add("electric_current", &["nA"], 1.0e-9 * AMPERE);

    add("speed", &["km/s"], KILOMETER / SECOND);
    add("speed", &["km/h"], KILOMETER / (3600.0 * SECOND));
    add("speed", &["m/s"], METER / SECOND);
    add("speed", &["mm/s"], MILLIMETER / SECOND);
    add("speed", &["cm/s"], CENTIMETER / SECOND);
    add("speed", &["m/ms"], METER / (1.0e-3 * SECOND));
    add("speed", &["mm/ms"], MILLIMETER / (1.0e-3 * SECOND));
    add("speed", &["cm/ms"], CENTIMETER / (1.0e-3 * SECOND));
    add("speed", &["m/us"], METER / (1.0e-6 * SECOND));
    add("speed", &["mm/us"], MILLIMETER / (1.0e-6 * SECOND));
    add("speed", &["cm/us"], CENTIMETER / (1.0e-6 * SECOND));
    add("speed", &["m/ns"], METER / NANOSECOND);
    add("speed", &["mm/ns"], MILLIMETER / NANOSECOND);
    add("speed", &["cm/ns"], CENTIMETER / NANOSECOND);

    table
});

/// The built-in unit table
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardUnits;

impl UnitRegistry for StandardUnits {
    fn find_unit(&self, symbol: &str) -> Option<Unit> {
        TABLE.get(symbol).map(|(factor, label)| Unit {
            factor: *factor,
            label: (*label).to_string(),
        })
    }

    fn is_label_valid(&self, label: &str) -> bool {
        LABELS.iter().any(|l| *l == label)
    }
}
