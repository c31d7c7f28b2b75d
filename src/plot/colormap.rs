//! Sequential colour scales for heatmaps

use crate::models::Variable;
use plotters::style::RGBColor;

/// Maps values in `[min, max]` onto a colour gradient
#[derive(Clone)]
pub struct ColorScale {
    min: f64,
    max: f64,
    gradient: colorous::Gradient,
}

impl std::fmt::Debug for ColorScale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColorScale")
            .field("min", &self.min)
            .field("max", &self.max)
            .finish_non_exhaustive()
    }
}

impl ColorScale {
    /// Scale over `[min, max]`, widened when the range is degenerate
    #[must_use]
    pub fn new(min: f64, max: f64, gradient: colorous::Gradient) -> Self {
        let (min, max) = if max - min < f64::EPSILON {
            (min - 0.5, min + 0.5)
        } else {
            (min, max)
        };
        Self { min, max, gradient }
    }

    /// Scale with the gradient usually used for `variable`
    #[must_use]
    pub fn for_variable(variable: Variable, min: f64, max: f64) -> Self {
        let gradient = match variable {
            Variable::RelativeHumidity | Variable::SpecificHumidity | Variable::DewPoint => colorous::YELLOW_GREEN_BLUE,
            Variable::Temperature | Variable::PotentialTemperature => colorous::TURBO,
            _ => colorous::VIRIDIS,
        };
        Self::new(min, max, gradient)
    }

    #[must_use]
    pub fn min(&self) -> f64 {
        self.min
    }

    #[must_use]
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Position of `value` on the scale, clamped to `[0, 1]`
    #[must_use]
    pub fn fraction(&self, value: f64) -> f64 {
        ((value - self.min) / (self.max - self.min)).clamp(0.0, 1.0)
    }

    #[must_use]
    pub fn color(&self, value: f64) -> RGBColor {
        let c = self.gradient.eval_continuous(self.fraction(value));
        RGBColor(c.r, c.g, c.b)
    }

    /// `steps` contiguous value bands covering the scale, for the colour bar
    #[must_use]
    pub fn bands(&self, steps: usize) -> Vec<(f64, f64)> {
        let step = (self.max - self.min) / steps.max(1) as f64;
        (0..steps.max(1))
            .map(|i| {
                let lower = self.min + step * i as f64;
                (lower, lower + step)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fraction_is_clamped() {
        let scale = ColorScale::new(0.0, 10.0, colorous::VIRIDIS);
        assert_eq!(scale.fraction(5.0), 0.5);
        assert_eq!(scale.fraction(-3.0), 0.0);
        assert_eq!(scale.fraction(42.0), 1.0);
    }

    #[test]
    fn test_degenerate_range_is_widened() {
        let scale = ColorScale::new(3.0, 3.0, colorous::VIRIDIS);
        assert_eq!((scale.min(), scale.max()), (2.5, 3.5));
        assert_eq!(scale.fraction(3.0), 0.5);
    }

    #[test]
    fn test_endpoints_differ_in_colour() {
        let scale = ColorScale::for_variable(Variable::Temperature, -20.0, 30.0);
        assert_ne!(scale.color(-20.0), scale.color(30.0));
        assert_eq!(scale.color(-50.0), scale.color(-20.0));
    }

    #[test]
    fn test_bands_cover_range() {
        let scale = ColorScale::new(0.0, 100.0, colorous::VIRIDIS);
        let bands = scale.bands(4);
        assert_eq!(bands.len(), 4);
        assert_eq!(bands[0], (0.0, 25.0));
        assert_eq!(bands[3], (75.0, 100.0));
    }
}
