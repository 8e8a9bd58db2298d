use std::fmt;
use std::str::FromStr;

use colorous::Gradient;
use thiserror::Error;

use crate::threshold::Sign;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColormapError {
    #[error("unknown colormap '{0}' (options: {})", Colormap::names().join(", "))]
    Unknown(String),
    #[error("colormap '{0}' is diverging and needs sign=both")]
    NeedsBothSigns(Colormap),
}

// ---------------------------------------------------------------------------
// Named colormaps
// ---------------------------------------------------------------------------

/// Colormaps selectable from the command line.
///
/// The single-hue maps run from dark (lowest contour) to light, so the
/// faintest signals stand out against a white background. `coolwarm` is
/// the blue to red diverging scheme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Colormap {
    #[default]
    Viridis,
    Red,
    Blue,
    Green,
    Purple,
    Orange,
    Grey,
    LightRed,
    LightBlue,
    Coolwarm,
}

impl Colormap {
    pub const ALL: [Colormap; 10] = [
        Colormap::Viridis,
        Colormap::Red,
        Colormap::Blue,
        Colormap::Green,
        Colormap::Purple,
        Colormap::Orange,
        Colormap::Grey,
        Colormap::LightRed,
        Colormap::LightBlue,
        Colormap::Coolwarm,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Colormap::Viridis => "viridis",
            Colormap::Red => "red",
            Colormap::Blue => "blue",
            Colormap::Green => "green",
            Colormap::Purple => "purple",
            Colormap::Orange => "orange",
            Colormap::Grey => "grey",
            Colormap::LightRed => "light_red",
            Colormap::LightBlue => "light_blue",
            Colormap::Coolwarm => "coolwarm",
        }
    }

    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|c| c.name()).collect()
    }

    pub fn is_diverging(self) -> bool {
        matches!(self, Colormap::Coolwarm)
    }

    /// Reject combinations that cannot be drawn meaningfully.
    pub fn check_sign(self, sign: Sign) -> Result<(), ColormapError> {
        if self.is_diverging() && sign != Sign::Both {
            return Err(ColormapError::NeedsBothSigns(self));
        }
        Ok(())
    }

    /// The gradient behind this map, and whether it runs reversed.
    ///
    /// Single-hue maps use the reversed sequential schemes so the lowest
    /// contour is the darkest.
    fn gradient(self) -> (Gradient, bool) {
        match self {
            Colormap::Viridis => (colorous::VIRIDIS, false),
            Colormap::Red => (colorous::REDS, true),
            Colormap::Blue => (colorous::BLUES, true),
            Colormap::Green => (colorous::GREENS, true),
            Colormap::Purple => (colorous::PURPLES, true),
            Colormap::Orange => (colorous::ORANGES, true),
            Colormap::Grey => (colorous::GREYS, true),
            Colormap::LightRed => (colorous::YELLOW_ORANGE_RED, true),
            Colormap::LightBlue => (colorous::GREEN_BLUE, true),
            Colormap::Coolwarm => (colorous::RED_BLUE, true),
        }
    }

    /// Colour at `t` in `[0, 1]`.
    pub fn eval(self, t: f64) -> [u8; 3] {
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
        let (gradient, reversed) = self.gradient();
        let color = gradient.eval_continuous(if reversed { 1.0 - t } else { t });
        [color.r, color.g, color.b]
    }
}

impl fmt::Display for Colormap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Colormap {
    type Err = ColormapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.name() == wanted)
            .ok_or_else(|| ColormapError::Unknown(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Level colouring
// ---------------------------------------------------------------------------

/// Colour of contour `index` out of `count` levels of one polarity.
///
/// Diverging maps put negative levels on the cool half and positive levels
/// on the warm half, strongest at the ends.
pub fn level_color(colormap: Colormap, index: usize, count: usize, negative: bool) -> [u8; 3] {
    let t = if count > 1 {
        index as f64 / (count - 1) as f64
    } else {
        0.0
    };
    if colormap.is_diverging() {
        if negative {
            colormap.eval(0.45 * (1.0 - t))
        } else {
            colormap.eval(0.55 + 0.45 * t)
        }
    } else {
        colormap.eval(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: [u8; 3], expected: [u8; 3]) {
        let close = actual
            .iter()
            .zip(expected)
            .all(|(&a, e)| (a as i16 - e as i16).abs() <= 1);
        assert!(close, "{actual:?} != {expected:?}");
    }

    #[test]
    fn test_parse_names() {
        for cmap in Colormap::ALL {
            assert_eq!(cmap.name().parse::<Colormap>().unwrap(), cmap);
        }
        assert_eq!("Light_Blue".parse::<Colormap>().unwrap(), Colormap::LightBlue);
        let err = "jet".parse::<Colormap>().unwrap_err();
        assert!(err.to_string().contains("viridis"));
    }

    #[test]
    fn test_eval_endpoints() {
        assert_close(Colormap::Viridis.eval(0.0), [68, 1, 84]);
        assert_close(Colormap::Viridis.eval(1.0), [253, 231, 37]);
        assert_close(Colormap::Grey.eval(-3.0), [0, 0, 0]);
        assert_close(Colormap::Grey.eval(f64::NAN), [0, 0, 0]);
        assert_close(Colormap::Grey.eval(1.0), [255, 255, 255]);
    }

    #[test]
    fn test_single_hue_maps_are_reversed() {
        let red = Colormap::Red.eval(0.0);
        let expected = colorous::REDS.eval_continuous(1.0);
        assert_close(red, [expected.r, expected.g, expected.b]);
        let blue = Colormap::LightBlue.eval(1.0);
        let expected = colorous::GREEN_BLUE.eval_continuous(0.0);
        assert_close(blue, [expected.r, expected.g, expected.b]);
    }

    #[test]
    fn test_grey_is_monotonic() {
        let values: Vec<u8> = (0..=10)
            .map(|i| Colormap::Grey.eval(i as f64 / 10.0)[0])
            .collect();
        assert!(values.windows(2).all(|w| w[0] <= w[1]), "{values:?}");
    }

    #[test]
    fn test_coolwarm_needs_both() {
        assert!(Colormap::Coolwarm.check_sign(Sign::Both).is_ok());
        assert_eq!(
            Colormap::Coolwarm.check_sign(Sign::Positive),
            Err(ColormapError::NeedsBothSigns(Colormap::Coolwarm))
        );
        assert!(Colormap::Red.check_sign(Sign::Negative).is_ok());
    }

    #[test]
    fn test_diverging_level_colors() {
        let strongest_negative = level_color(Colormap::Coolwarm, 9, 10, true);
        let strongest_positive = level_color(Colormap::Coolwarm, 9, 10, false);
        assert_close(strongest_negative, [5, 48, 97]);
        assert_close(strongest_positive, [103, 0, 31]);
        assert!(strongest_negative[2] > strongest_negative[0]);
        assert!(strongest_positive[0] > strongest_positive[2]);
    }
}
