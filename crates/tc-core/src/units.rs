// tc-core/src/units.rs

use core::fmt;

use uom::si::f64::{Power as UomPower, ThermodynamicTemperature as UomThermodynamicTemperature};

// Public canonical unit types (SI, f64) for boundary-condition entry points.
// Solver internals carry raw f64 values in these units.
pub type Temperature = UomThermodynamicTemperature;
pub type HeatRate = UomPower;

#[inline]
pub fn k(v: f64) -> Temperature {
    use uom::si::thermodynamic_temperature::kelvin;
    Temperature::new::<kelvin>(v)
}

#[inline]
pub fn w(v: f64) -> HeatRate {
    use uom::si::power::watt;
    HeatRate::new::<watt>(v)
}

/// Unit tag attached to every registry variable.
///
/// Tags are metadata: they let configuration-time checks reject a boundary
/// value bound to a variable of the wrong kind, and they label diagnostics.
/// They do not participate in arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    /// Temperature in kelvin.
    Kelvin,
    /// Heat flux in watts.
    Watt,
    /// Thermal resistance in kelvin per watt.
    KelvinPerWatt,
    /// No physical unit.
    Dimensionless,
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Unit::Kelvin => "K",
            Unit::Watt => "W",
            Unit::KelvinPerWatt => "K/W",
            Unit::Dimensionless => "-",
        };
        write!(f, "{s}")
    }
}
