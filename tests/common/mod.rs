//! Shared test fixtures for integration tests.

use ems_toolkit::registry::{Distribution, SubPackage, Symbol};

/// Manifest text describing the fixture distribution: a units sub-package
/// with a private constant, and a readings sub-package.
pub const FIXTURE_MANIFEST: &str = r#"
name = "ems-toolkit"
version = "0.1.0"

[[sub_packages]]
name = "energy_units"
exports = ["convert_kwh_to_joules", "convert_joules_to_kwh"]
members = [
    { name = "convert_kwh_to_joules", kind = "function" },
    { name = "convert_joules_to_kwh", kind = "function" },
    { name = "_internal_constant", kind = "constant" },
]

[[sub_packages]]
name = "readings"
exports = ["load_samples", "MeterReading"]
members = [
    { name = "load_samples", kind = "function" },
    { name = "MeterReading", kind = "type" },
    { name = "_parse_row", kind = "function" },
]
"#;

/// The fixture distribution, assembled in code rather than from TOML.
pub fn fixture_distribution() -> Distribution {
    let mut dist = Distribution::new("ems-toolkit", "0.1.0")
        .with_sub_package(
            SubPackage::new("energy_units")
                .with_member(Symbol::function("convert_kwh_to_joules"))
                .with_member(Symbol::function("convert_joules_to_kwh"))
                .with_member(Symbol::constant("_internal_constant")),
        )
        .with_sub_package(
            SubPackage::new("readings")
                .with_member(Symbol::function("load_samples"))
                .with_member(Symbol::type_("MeterReading"))
                .with_member(Symbol::function("_parse_row")),
        );
    dist.declare(
        "energy_units",
        &["convert_kwh_to_joules", "convert_joules_to_kwh"],
    )
    .expect("energy_units declaration");
    dist.declare("readings", &["load_samples", "MeterReading"])
        .expect("readings declaration");
    dist
}
