//! Physical units attached to scaled integral fields.

/// Family of units that can be converted into one another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UnitKind {
    /// Durations
    Time,
    /// Lengths
    Distance,
    /// Velocities
    Speed,
    /// Frequencies
    Frequency,
    /// Plane angles
    Angle,
    /// Electric current
    Current,
    /// Electric potential
    Voltage,
    /// Data sizes
    Memory,
}

/// Unit of the scaled value of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub enum Units {
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
    Weeks,
    Nanometers,
    Micrometers,
    Millimeters,
    Centimeters,
    Meters,
    Kilometers,
    NanometersPerSecond,
    MicrometersPerSecond,
    MillimetersPerSecond,
    CentimetersPerSecond,
    MetersPerSecond,
    KilometersPerSecond,
    KilometersPerHour,
    Hertz,
    Kilohertz,
    Megahertz,
    Gigahertz,
    Degrees,
    Radians,
    Nanoamps,
    Microamps,
    Milliamps,
    Amps,
    Kiloamps,
    Nanovolts,
    Microvolts,
    Millivolts,
    Volts,
    Kilovolts,
    Bytes,
    Kilobytes,
    Megabytes,
    Gigabytes,
    Terabytes,
}

impl Units {
    /// Unit family.
    #[must_use]
    pub const fn kind(self) -> UnitKind {
        use Units::*;

        match self {
            Nanoseconds | Microseconds | Milliseconds | Seconds | Minutes | Hours | Days
            | Weeks => UnitKind::Time,
            Nanometers | Micrometers | Millimeters | Centimeters | Meters | Kilometers => {
                UnitKind::Distance
            }
            NanometersPerSecond
            | MicrometersPerSecond
            | MillimetersPerSecond
            | CentimetersPerSecond
            | MetersPerSecond
            | KilometersPerSecond
            | KilometersPerHour => UnitKind::Speed,
            Hertz | Kilohertz | Megahertz | Gigahertz => UnitKind::Frequency,
            Degrees | Radians => UnitKind::Angle,
            Nanoamps | Microamps | Milliamps | Amps | Kiloamps => UnitKind::Current,
            Nanovolts | Microvolts | Millivolts | Volts | Kilovolts => UnitKind::Voltage,
            Bytes | Kilobytes | Megabytes | Gigabytes | Terabytes => UnitKind::Memory,
        }
    }

    /// Size of one unit expressed in the family's base unit
    /// (seconds, meters, m/s, Hz, radians, amps, volts, bytes).
    #[must_use]
    pub fn factor(self) -> f64 {
        use Units::*;

        match self {
            Nanoseconds => 1e-9,
            Microseconds => 1e-6,
            Milliseconds => 1e-3,
            Seconds => 1.0,
            Minutes => 60.0,
            Hours => 3_600.0,
            Days => 86_400.0,
            Weeks => 604_800.0,
            Nanometers => 1e-9,
            Micrometers => 1e-6,
            Millimeters => 1e-3,
            Centimeters => 1e-2,
            Meters => 1.0,
            Kilometers => 1e3,
            NanometersPerSecond => 1e-9,
            MicrometersPerSecond => 1e-6,
            MillimetersPerSecond => 1e-3,
            CentimetersPerSecond => 1e-2,
            MetersPerSecond => 1.0,
            KilometersPerSecond => 1e3,
            KilometersPerHour => 1e3 / 3_600.0,
            Hertz => 1.0,
            Kilohertz => 1e3,
            Megahertz => 1e6,
            Gigahertz => 1e9,
            Degrees => std::f64::consts::PI / 180.0,
            Radians => 1.0,
            Nanoamps => 1e-9,
            Microamps => 1e-6,
            Milliamps => 1e-3,
            Amps => 1.0,
            Kiloamps => 1e3,
            Nanovolts => 1e-9,
            Microvolts => 1e-6,
            Millivolts => 1e-3,
            Volts => 1.0,
            Kilovolts => 1e3,
            Bytes => 1.0,
            Kilobytes => 1024.0,
            Megabytes => 1024.0 * 1024.0,
            Gigabytes => 1024.0 * 1024.0 * 1024.0,
            Terabytes => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        }
    }

    /// Convert `value` expressed in `self` into `target`, if both belong to
    /// the same family.
    #[must_use]
    pub fn convert(self, value: f64, target: Self) -> Option<f64> {
        if self.kind() != target.kind() {
            return None;
        }
        if self == target {
            return Some(value);
        }
        Some(value * self.factor() / target.factor())
    }
}
