//! Paint dynamics: how pointer input modulates brush properties while painting.

use super::Data;

/// A piecewise linear mapping of `[0, 1]` onto itself. No points is the identity.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Curve(Vec<[f64; 2]>);
impl Curve {
    /// Points are sorted by input. Coordinates are clamped to `[0, 1]`.
    #[must_use]
    pub fn new(points: impl IntoIterator<Item = [f64; 2]>) -> Self {
        let mut points: Vec<_> = points
            .into_iter()
            .map(|p| p.map(|c| c.clamp(0.0, 1.0)))
            .collect();
        points.sort_by(|a, b| a[0].total_cmp(&b[0]));
        Self(points)
    }
    #[must_use]
    pub fn map(&self, value: f64) -> f64 {
        let value = value.clamp(0.0, 1.0);
        let points = &self.0;
        let (Some(first), Some(last)) = (points.first(), points.last()) else {
            return value;
        };
        if value <= first[0] {
            return first[1];
        }
        if value >= last[0] {
            return last[1];
        }
        points
            .windows(2)
            .find(|w| value <= w[1][0])
            .map_or(value, |w| {
                let ([x0, y0], [x1, y1]) = (w[0], w[1]);
                if x1 - x0 <= f64::EPSILON {
                    y1
                } else {
                    y0 + (y1 - y0) * (value - x0) / (x1 - x0)
                }
            })
    }
}

/// One pointer sample, every input normalized to `[0, 1]` except tilt which is `[-1, 1]`.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct DynamicsInput {
    pub pressure: f64,
    pub velocity: f64,
    /// Stroke direction, as a fraction of a full turn.
    pub direction: f64,
    pub xtilt: f64,
    pub ytilt: f64,
    pub wheel: f64,
    /// Supplied by the caller, so results are reproducible.
    pub random: f64,
}

/// The inputs driving one brush property, each through its own curve. An input is used when
/// it has a curve.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DynamicsOutput {
    pub pressure: Option<Curve>,
    pub velocity: Option<Curve>,
    pub direction: Option<Curve>,
    pub tilt: Option<Curve>,
    pub wheel: Option<Curve>,
    pub random: Option<Curve>,
    pub fade: Option<Curve>,
}
impl DynamicsOutput {
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.inputs(&DynamicsInput::default(), 0.0).next().is_some()
    }
    fn inputs<'a>(
        &'a self,
        input: &DynamicsInput,
        fade_point: f64,
    ) -> impl Iterator<Item = f64> + 'a {
        let tilt = 1.0 - input.xtilt.hypot(input.ytilt);
        [
            (&self.pressure, input.pressure),
            (&self.velocity, 1.0 - input.velocity),
            (&self.direction, (input.direction + 0.5) % 1.0),
            (&self.tilt, tilt),
            (&self.wheel, input.wheel),
            (&self.random, input.random),
            (&self.fade, fade_point),
        ]
        .into_iter()
        .filter_map(|(curve, value)| curve.as_ref().map(|c| c.map(value)))
    }
    /// Mean of every used input through its curve, or 1 when none is used.
    #[must_use]
    pub fn linear_value(&self, input: &DynamicsInput, fade_point: f64) -> f64 {
        let (total, count) = self
            .inputs(input, fade_point)
            .fold((0.0, 0u32), |(total, count), v| (total + v, count + 1));
        if count == 0 {
            1.0
        } else {
            total / f64::from(count)
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Dynamics {
    name: String,
    pub opacity: DynamicsOutput,
    pub size: DynamicsOutput,
    pub angle: DynamicsOutput,
    pub color: DynamicsOutput,
    pub force: DynamicsOutput,
    pub hardness: DynamicsOutput,
    pub aspect_ratio: DynamicsOutput,
    pub spacing: DynamicsOutput,
    pub rate: DynamicsOutput,
    pub flow: DynamicsOutput,
    pub jitter: DynamicsOutput,
}
impl Default for Dynamics {
    fn default() -> Self {
        Self {
            name: "Nameless dynamics".to_owned(),
            opacity: DynamicsOutput::default(),
            size: DynamicsOutput::default(),
            angle: DynamicsOutput::default(),
            color: DynamicsOutput::default(),
            force: DynamicsOutput::default(),
            hardness: DynamicsOutput::default(),
            aspect_ratio: DynamicsOutput::default(),
            spacing: DynamicsOutput::default(),
            rate: DynamicsOutput::default(),
            flow: DynamicsOutput::default(),
            jitter: DynamicsOutput::default(),
        }
    }
}
impl Data for Dynamics {
    const FOLDER: &'static str = "dynamics";
    fn name(&self) -> &str {
        &self.name
    }
    fn set_name(&mut self, name: String) {
        self.name = name;
    }
    /// Pressure drives opacity, nothing else is dynamic.
    fn standard() -> Self {
        Self {
            name: "Standard dynamics".to_owned(),
            opacity: DynamicsOutput {
                pressure: Some(Curve::default()),
                ..DynamicsOutput::default()
            },
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn curve_interpolates() {
        let curve = Curve::new([[1.0, 0.0], [0.0, 1.0]]);
        assert_eq!(curve.map(0.25), 0.75);
        assert_eq!(Curve::default().map(0.3), 0.3);
        let step = Curve::new([[0.5, 0.2], [0.8, 0.2]]);
        assert_eq!(step.map(0.1), 0.2);
        assert_eq!(step.map(2.0), 0.2);
    }
    #[test]
    fn unused_output_is_one() {
        let output = DynamicsOutput::default();
        assert!(!output.is_enabled());
        assert_eq!(output.linear_value(&DynamicsInput::default(), 0.0), 1.0);
    }
    #[test]
    fn inputs_are_averaged() {
        let output = DynamicsOutput {
            pressure: Some(Curve::default()),
            velocity: Some(Curve::default()),
            ..DynamicsOutput::default()
        };
        let input = DynamicsInput {
            pressure: 0.5,
            velocity: 0.5,
            ..DynamicsInput::default()
        };
        // Velocity is inverted: slow strokes give more.
        assert_eq!(output.linear_value(&input, 0.0), 0.5);
        let input = DynamicsInput {
            pressure: 1.0,
            velocity: 0.5,
            ..DynamicsInput::default()
        };
        assert_eq!(output.linear_value(&input, 0.0), 0.75);
    }
    #[test]
    fn standard_uses_pressure() {
        let dynamics = Dynamics::standard();
        assert!(dynamics.opacity.is_enabled());
        assert!(!dynamics.size.is_enabled());
        let text = toml::to_string_pretty(&dynamics).unwrap();
        assert_eq!(toml::from_str::<Dynamics>(&text).unwrap(), dynamics);
    }
}
