// cc-core/src/units.rs

use uom::si::f64::{
    Power as UomPower, Pressure as UomPressure,
    ThermodynamicTemperature as UomThermodynamicTemperature, VolumeRate as UomVolumeRate,
};

// Public canonical unit types (SI, f64)
pub type Power = UomPower;
pub type Pressure = UomPressure;
pub type Temperature = UomThermodynamicTemperature;
pub type VolumeRate = UomVolumeRate;

#[inline]
pub fn bar(v: f64) -> Pressure {
    use uom::si::pressure::bar;
    Pressure::new::<bar>(v)
}

#[inline]
pub fn k(v: f64) -> Temperature {
    use uom::si::thermodynamic_temperature::kelvin;
    Temperature::new::<kelvin>(v)
}

#[inline]
pub fn watts(v: f64) -> Power {
    use uom::si::power::watt;
    Power::new::<watt>(v)
}

#[inline]
pub fn lpm(v: f64) -> VolumeRate {
    use uom::si::volume_rate::liter_per_minute;
    VolumeRate::new::<liter_per_minute>(v)
}

#[inline]
pub fn in_bar(p: Pressure) -> f64 {
    p.get::<uom::si::pressure::bar>()
}

#[inline]
pub fn in_kelvin(t: Temperature) -> f64 {
    t.get::<uom::si::thermodynamic_temperature::kelvin>()
}

#[inline]
pub fn in_watts(p: Power) -> f64 {
    p.get::<uom::si::power::watt>()
}

#[inline]
pub fn in_lpm(q: VolumeRate) -> f64 {
    q.get::<uom::si::volume_rate::liter_per_minute>()
}

pub mod constants {
    /// Normal boiling point of nitrogen at 1 atm.
    pub const LN2_BOILING_K: f64 = 77.0;
    /// Saturation slope used by the lumped boiling-point fit.
    pub const LN2_BOIL_SLOPE_K_PER_BAR: f64 = 3.8;
}
