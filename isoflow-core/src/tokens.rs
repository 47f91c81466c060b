/// Lenient parsers for the string tokens hosts hand to the core.
///
/// Unrecognised input never fails here: faces fall back to `top`, grid cells
/// to `mc`, unknown axis letters are dropped and unknown descriptor keys are
/// skipped. Hosts that want to reject bad input can use the strict
/// [`FromStr`] impls instead.
use std::str::FromStr;

use log::debug;
use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while1},
    character::complete::{alpha1, alphanumeric1, multispace0, one_of},
    combinator::{all_consuming, map, opt, value},
    number::complete::double,
    sequence::{pair, preceded, tuple},
    IResult,
};
use thiserror::Error;

use crate::anchor::{Anchor, AnchorPosition, Face};
use crate::geometry::Axis;
use crate::particles::{Flow, ParticleConfig};
use crate::route::AxisOrder;

/// Returned by the strict [`FromStr`] impls.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unrecognized {kind} token: {token:?}")]
pub struct UnknownToken {
    pub kind: &'static str,
    pub token: String,
}

impl FromStr for Face {
    type Err = UnknownToken;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Face::ALL
            .into_iter()
            .find(|face| face.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownToken {
                kind: "face",
                token: s.to_string(),
            })
    }
}

impl FromStr for AnchorPosition {
    type Err = UnknownToken;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AnchorPosition::ALL
            .into_iter()
            .find(|pos| pos.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownToken {
                kind: "anchor position",
                token: s.to_string(),
            })
    }
}

fn anchor_parts(input: &str) -> IResult<&str, (&str, Option<&str>)> {
    let (input, _) = multispace0(input)?;
    let (input, face) = alpha1(input)?;
    let (input, position) = opt(preceded(one_of("-:_ "), alphanumeric1))(input)?;
    let (input, _) = multispace0(input)?;
    Ok((input, (face, position)))
}

/// Parse `"<face>"`, `"<face>-<pos>"` or `"<face>:<pos>"`.
pub fn parse_anchor(token: &str) -> Anchor {
    let Ok((_, (face, position))) = all_consuming(anchor_parts)(token) else {
        debug!("anchor token {token:?} not understood, using top-mc");
        return Anchor::default();
    };
    let face = face.parse().unwrap_or_else(|_| {
        debug!("unknown face {face:?} in anchor {token:?}, using top");
        Face::Top
    });
    let position = match position {
        Some(pos) => pos.parse().unwrap_or_else(|_| {
            debug!("unknown anchor position {pos:?} in {token:?}, using mc");
            AnchorPosition::Mc
        }),
        None => AnchorPosition::Mc,
    };
    Anchor::new(face, position)
}

/// Parse an axis-order token such as `"xzy"`, `"z,x"`, `"auto"` or `"direct"`.
pub fn parse_axis_order(token: &str) -> AxisOrder {
    let trimmed = token.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("auto") {
        return AxisOrder::Auto;
    }
    if trimmed.eq_ignore_ascii_case("direct") {
        return AxisOrder::Direct;
    }

    let mut axes = Vec::with_capacity(3);
    for c in trimmed.chars() {
        let axis = match c.to_ascii_lowercase() {
            'x' => Axis::X,
            'y' => Axis::Y,
            'z' => Axis::Z,
            ',' | ' ' | '-' | '>' => continue,
            other => {
                debug!("dropping axis letter {other:?} from {token:?}");
                continue;
            }
        };
        if !axes.contains(&axis) {
            axes.push(axis);
        }
    }

    if axes.is_empty() {
        AxisOrder::Auto
    } else {
        AxisOrder::Axes(axes)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Unit {
    Bare,
    Seconds,
    Millis,
    PerSecond,
    Pixels,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum DescriptorValue<'a> {
    Quantity(f64, Unit),
    Word(&'a str),
    Flag,
}

fn unit(input: &str) -> IResult<&str, Unit> {
    alt((
        value(Unit::Millis, tag_no_case("ms")),
        value(Unit::PerSecond, tag_no_case("/s")),
        value(Unit::Seconds, tag_no_case("s")),
        value(Unit::Pixels, tag_no_case("px")),
    ))(input)
}

fn quantity(input: &str) -> IResult<&str, DescriptorValue<'_>> {
    map(pair(double, opt(unit)), |(n, u)| {
        DescriptorValue::Quantity(n, u.unwrap_or(Unit::Bare))
    })(input)
}

fn word(input: &str) -> IResult<&str, DescriptorValue<'_>> {
    map(alpha1, DescriptorValue::Word)(input)
}

fn key(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_')(input)
}

fn entry(input: &str) -> IResult<&str, (&str, DescriptorValue<'_>)> {
    map(
        tuple((key, opt(preceded(alt((tag(":"), tag("="))), alt((quantity, word)))))),
        |(k, v)| (k, v.unwrap_or(DescriptorValue::Flag)),
    )(input)
}

fn duration_secs(n: f64, unit: Unit) -> Option<f64> {
    match unit {
        Unit::Seconds | Unit::Bare => Some(n),
        Unit::Millis => Some(n / 1000.0),
        _ => None,
    }
}

fn flow_word(word: &str) -> Option<Flow> {
    match word.to_ascii_lowercase().as_str() {
        "forward" | "forwards" => Some(Flow::Forward),
        "backward" | "backwards" | "reverse" => Some(Flow::Backward),
        "both" | "bidirectional" => Some(Flow::Both),
        _ => None,
    }
}

/// Parse a compact particle descriptor like
/// `"speed:2s rate:4/s trail:5 size:3px flow:both"` over the defaults.
///
/// A `speed` given as a duration is the time one particle takes to traverse
/// the whole path; a bare number is progress units per second. `rate` takes
/// either a frequency (`4/s`) or an interval (`250ms`).
pub fn parse_particle_descriptor(descriptor: &str) -> ParticleConfig {
    let mut config = ParticleConfig::default();

    let entries = descriptor
        .split(|c: char| c.is_whitespace() || c == ';' || c == ',')
        .filter(|s| !s.is_empty());

    for raw in entries {
        let Ok((_, (name, val))) = all_consuming(entry)(raw) else {
            debug!("skipping unparseable particle descriptor entry {raw:?}");
            continue;
        };
        let name = name.to_ascii_lowercase();
        let applied = match (name.as_str(), val) {
            ("speed", DescriptorValue::Quantity(n, Unit::Bare | Unit::PerSecond)) if n > 0.0 => {
                config.speed = n;
                true
            }
            ("speed" | "duration" | "dur", DescriptorValue::Quantity(n, u)) => {
                match duration_secs(n, u) {
                    Some(secs) if secs > 0.0 => {
                        config.speed = 1.0 / secs;
                        true
                    }
                    _ => false,
                }
            }
            ("rate" | "frequency", DescriptorValue::Quantity(n, Unit::Bare | Unit::PerSecond))
                if n > 0.0 =>
            {
                config.emission_rate = n;
                true
            }
            ("rate" | "interval", DescriptorValue::Quantity(n, u)) => match duration_secs(n, u) {
                Some(secs) if secs > 0.0 => {
                    config.emission_rate = 1.0 / secs;
                    true
                }
                _ => false,
            },
            ("size", DescriptorValue::Quantity(n, Unit::Bare | Unit::Pixels)) if n > 0.0 => {
                config.size = n;
                true
            }
            ("trail", DescriptorValue::Quantity(n, Unit::Bare)) if n >= 0.0 => {
                config.trail.count = n.round() as usize;
                true
            }
            ("spacing" | "trail-spacing", DescriptorValue::Quantity(n, Unit::Bare | Unit::Pixels))
                if n > 0.0 =>
            {
                config.trail.spacing = n;
                true
            }
            ("flow" | "direction", DescriptorValue::Word(w)) => match flow_word(w) {
                Some(flow) => {
                    config.flow = flow;
                    true
                }
                None => false,
            },
            (flag, DescriptorValue::Flag) => match flow_word(flag) {
                Some(flow) => {
                    config.flow = flow;
                    true
                }
                None => false,
            },
            _ => false,
        };
        if !applied {
            debug!("ignoring particle descriptor entry {raw:?}");
        }
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchor_tokens() {
        assert_eq!(
            parse_anchor("right-tl"),
            Anchor::new(Face::Right, AnchorPosition::Tl)
        );
        assert_eq!(
            parse_anchor(" Front:BC "),
            Anchor::new(Face::Front, AnchorPosition::Bc)
        );
        assert_eq!(parse_anchor("left"), Anchor::center(Face::Left));
    }

    #[test]
    fn test_anchor_fallbacks() {
        assert_eq!(
            parse_anchor("sideways-br"),
            Anchor::new(Face::Top, AnchorPosition::Br)
        );
        assert_eq!(parse_anchor("bottom-qq"), Anchor::center(Face::Bottom));
        assert_eq!(parse_anchor(""), Anchor::center(Face::Top));
        assert_eq!(parse_anchor("!!"), Anchor::center(Face::Top));
    }

    #[test]
    fn test_strict_face_parse() {
        assert_eq!("BACK".parse::<Face>(), Ok(Face::Back));
        assert!("north".parse::<Face>().is_err());
    }

    #[test]
    fn test_axis_order_tokens() {
        assert_eq!(parse_axis_order("auto"), AxisOrder::Auto);
        assert_eq!(parse_axis_order(""), AxisOrder::Auto);
        assert_eq!(parse_axis_order("Direct"), AxisOrder::Direct);
        assert_eq!(
            parse_axis_order("zx"),
            AxisOrder::Axes(vec![Axis::Z, Axis::X])
        );
        assert_eq!(
            parse_axis_order("y, q, y, x"),
            AxisOrder::Axes(vec![Axis::Y, Axis::X])
        );
        assert_eq!(parse_axis_order("abc"), AxisOrder::Auto);
    }

    #[test]
    fn test_particle_descriptor() {
        let config = parse_particle_descriptor("speed:2s rate:4/s trail:5 size:3px flow:both");
        assert!((config.speed - 0.5).abs() < 1e-12);
        assert!((config.emission_rate - 4.0).abs() < 1e-12);
        assert_eq!(config.trail.count, 5);
        assert!((config.size - 3.0).abs() < 1e-12);
        assert_eq!(config.flow, Flow::Both);
    }

    #[test]
    fn test_particle_descriptor_units_and_flags() {
        let config = parse_particle_descriptor("speed=0.25; interval:250ms, reverse");
        assert!((config.speed - 0.25).abs() < 1e-12);
        assert!((config.emission_rate - 4.0).abs() < 1e-12);
        assert_eq!(config.flow, Flow::Backward);
    }

    #[test]
    fn test_particle_descriptor_skips_garbage() {
        let config = parse_particle_descriptor("colour:red speed:-3 ??? size:8");
        let defaults = ParticleConfig::default();
        assert_eq!(config.speed, defaults.speed);
        assert_eq!(config.size, 8.0);
    }
}
