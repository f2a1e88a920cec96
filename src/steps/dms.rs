//! Degree-minute-second angles.

use std::fmt;
use std::str::FromStr;

use super::StepError;
use super::format::{SIG_FIGS, fmt_sig, fmt_trim, round_to};

/// Smallest unit kept when converting to DMS.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DmsPrecision {
    Degrees,
    Minutes,
    Seconds,
    /// Fractional seconds, to four decimal places.
    Full,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Dms {
    pub negative: bool,
    pub degrees: u32,
    pub minutes: u32,
    pub seconds: f64,
    pub precision: DmsPrecision,
}

/// Split decimal degrees into DMS, rounding at `precision` and carrying so that minutes and
/// seconds stay in `[0, 60)`.
pub fn decimal_to_dms(x: f64, precision: DmsPrecision) -> Dms {
    let d = x.abs();
    let mut deg = d.floor();
    let rem = (d - deg) * 60.0;
    let mut min = rem.floor();
    let mut sec = (rem - min) * 60.0;

    match precision {
        DmsPrecision::Full => sec = round_to(sec, 4),
        DmsPrecision::Seconds => sec = sec.round(),
        DmsPrecision::Minutes => {
            if sec >= 30.0 {
                min += 1.0;
            }
            sec = 0.0;
        }
        DmsPrecision::Degrees => {
            if min >= 30.0 {
                deg += 1.0;
            }
            min = 0.0;
            sec = 0.0;
        }
    }
    if sec >= 60.0 {
        sec -= 60.0;
        min += 1.0;
    }
    if min >= 60.0 {
        min -= 60.0;
        deg += 1.0;
    }

    Dms {
        negative: x < 0.0,
        degrees: deg as u32,
        minutes: min as u32,
        seconds: sec,
        precision,
    }
}

pub fn dms_to_decimal(dms: &Dms) -> f64 {
    let v = dms.degrees as f64 + dms.minutes as f64 / 60.0 + dms.seconds / 3600.0;
    if dms.negative { -v } else { v }
}

impl fmt::Display for Dms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            f.write_str("-")?;
        }
        write!(f, "{}°", self.degrees)?;
        match self.precision {
            DmsPrecision::Degrees => Ok(()),
            DmsPrecision::Minutes => write!(f, "{}'", self.minutes),
            DmsPrecision::Seconds => write!(f, "{}'{}\"", self.minutes, self.seconds as u32),
            DmsPrecision::Full => write!(f, "{}'{}\"", self.minutes, fmt_trim(self.seconds, 4)),
        }
    }
}

/// How an angle was written, so derivations can echo it back.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum AngleFormat {
    Decimal,
    Dms(DmsPrecision),
}

/// An angle in degrees plus the notation it was given in.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Angle {
    pub degrees: f64,
    pub format: AngleFormat,
}

impl Angle {
    pub fn from_degrees(degrees: f64) -> Self {
        Self {
            degrees,
            format: AngleFormat::Decimal,
        }
    }

    pub fn from_dms(degrees: u32, minutes: u32, seconds: f64) -> Self {
        let precision = if seconds != 0.0 {
            DmsPrecision::Seconds
        } else {
            DmsPrecision::Minutes
        };
        Self {
            degrees: degrees as f64 + minutes as f64 / 60.0 + seconds / 3600.0,
            format: AngleFormat::Dms(precision),
        }
    }

    pub fn radians(&self) -> f64 {
        self.degrees.to_radians()
    }

    /// The complementary angle of a right triangle, in the same notation.
    pub fn complement(&self) -> Self {
        Self {
            degrees: 90.0 - self.degrees,
            format: self.format,
        }
    }

    /// Calculator key presses entering this angle.
    pub fn keystrokes(&self) -> String {
        match self.format {
            AngleFormat::Decimal => fmt_sig(self.degrees, SIG_FIGS),
            AngleFormat::Dms(p) => {
                let d = decimal_to_dms(self.degrees, p);
                let mut keys = format!("{} °'\" {} °'\"", d.degrees, d.minutes);
                if p == DmsPrecision::Seconds || p == DmsPrecision::Full {
                    keys.push_str(&format!(" {} °'\"", fmt_trim(d.seconds, 4)));
                }
                keys
            }
        }
    }
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.format {
            AngleFormat::Decimal => write!(f, "{}°", fmt_sig(self.degrees, SIG_FIGS)),
            AngleFormat::Dms(p) => decimal_to_dms(self.degrees, p).fmt(f),
        }
    }
}

impl FromStr for Angle {
    type Err = StepError;

    /// Accepts `20.5`, `20.5°`, `20°32'`, `20°32'15"`, `20° 32′ 15″` and `20d32m15s`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || StepError::Parse(format!("cannot read angle {s:?}"));
        let mut fields: Vec<(f64, char)> = Vec::new();
        let mut num = String::new();
        for c in s.trim().chars() {
            let unit = match c {
                '0'..='9' | '.' => {
                    num.push(c);
                    continue;
                }
                ' ' => continue,
                '°' | 'd' => 'd',
                '\'' | '′' | 'm' => 'm',
                '"' | '″' | 's' => 's',
                _ => return Err(bad()),
            };
            let v: f64 = num.parse().map_err(|_| bad())?;
            fields.push((v, unit));
            num.clear();
        }

        if fields.is_empty() {
            let v: f64 = num.parse().map_err(|_| bad())?;
            return Ok(Angle::from_degrees(v));
        }
        if !num.is_empty() {
            return Err(bad());
        }
        match fields.as_slice() {
            [(d, 'd')] => Ok(Angle::from_degrees(*d)),
            [(d, 'd'), (m, 'm')] if d.fract() == 0.0 && m.fract() == 0.0 && *m < 60.0 => {
                Ok(Angle::from_dms(*d as u32, *m as u32, 0.0))
            }
            [(d, 'd'), (m, 'm'), (sec, 's')]
                if d.fract() == 0.0 && m.fract() == 0.0 && *m < 60.0 && *sec < 60.0 =>
            {
                Ok(Angle::from_dms(*d as u32, *m as u32, *sec))
            }
            _ => Err(bad()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_full_precision() {
        for i in 0..3600 {
            let x = i as f64 * 0.1 + 0.0123;
            let back = dms_to_decimal(&decimal_to_dms(x, DmsPrecision::Full));
            assert!((back - x).abs() < 1e-6, "{x} -> {back}");
        }
    }

    #[test]
    fn test_minutes_round_up_and_carry() {
        let d = decimal_to_dms(36.869_897_6, DmsPrecision::Minutes);
        assert_eq!((d.degrees, d.minutes), (36, 52));
        let d = decimal_to_dms(29.999_9, DmsPrecision::Minutes);
        assert_eq!((d.degrees, d.minutes), (30, 0));
        let d = decimal_to_dms(45.508_3, DmsPrecision::Degrees);
        assert_eq!(d.degrees, 46);
        let d = decimal_to_dms(10.999_99, DmsPrecision::Seconds);
        assert_eq!((d.degrees, d.minutes, d.seconds), (11, 0, 0.0));
    }

    #[test]
    fn test_display() {
        assert_eq!(decimal_to_dms(36.869_897_6, DmsPrecision::Minutes).to_string(), "36°52'");
        assert_eq!(decimal_to_dms(36.869_897_6, DmsPrecision::Seconds).to_string(), "36°52'12\"");
        assert_eq!(decimal_to_dms(20.5, DmsPrecision::Degrees).to_string(), "21°");
    }

    #[test]
    fn test_full_precision_carries_rounded_seconds() {
        let d = decimal_to_dms(9.999_999_999_99, DmsPrecision::Full);
        assert_eq!((d.degrees, d.minutes), (10, 0));
        assert_eq!(d.to_string(), "10°0'0\"");
        assert_eq!(decimal_to_dms(12.5, DmsPrecision::Full).to_string(), "12°30'0\"");
        assert_eq!(
            decimal_to_dms(1.0 + 1.0 / 60.0 + 7.25 / 3600.0, DmsPrecision::Full).to_string(),
            "1°1'7.25\""
        );
    }

    #[test]
    fn test_parse_angles() {
        let a: Angle = "20°32'".parse().unwrap();
        assert!((a.degrees - (20.0 + 32.0 / 60.0)).abs() < 1e-12);
        assert_eq!(a.to_string(), "20°32'");
        assert_eq!(a.keystrokes(), "20 °'\" 32 °'\"");

        let b: Angle = "20d32m15s".parse().unwrap();
        assert_eq!(b.to_string(), "20°32'15\"");
        let c: Angle = "41.4".parse().unwrap();
        assert_eq!(c.format, AngleFormat::Decimal);
        assert_eq!(c.to_string(), "41.4°");

        assert!("20°70'".parse::<Angle>().is_err());
        assert!("north".parse::<Angle>().is_err());
    }
}
