//! Smooth cubic path construction.
//!
//! Each interior segment uses control points placed along the line joining
//! the neighbors of its endpoints, scaled by the smoothing factor. The
//! outgoing and incoming handles at a shared point are therefore collinear,
//! which keeps the curve tangent-continuous.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::{ChartConfig, PlotPoint};

/// Single SVG path command.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PathCommand {
    MoveTo(PlotPoint),
    LineTo(PlotPoint),
    CurveTo {
        start_control: PlotPoint,
        end_control: PlotPoint,
        to: PlotPoint,
    },
    Close,
}

impl fmt::Display for PathCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathCommand::MoveTo(p) => write!(f, "M {},{}", p.x, p.y),
            PathCommand::LineTo(p) => write!(f, "L {},{}", p.x, p.y),
            PathCommand::CurveTo {
                start_control,
                end_control,
                to,
            } => write!(
                f,
                "C {},{} {},{} {},{}",
                start_control.x, start_control.y, end_control.x, end_control.y, to.x, to.y
            ),
            PathCommand::Close => write!(f, "Z"),
        }
    }
}

/// Ordered list of path commands, rendered as SVG path data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Path {
    commands: Vec<PathCommand>,
}

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: PathCommand) {
        self.commands.push(command);
    }

    pub fn commands(&self) -> &[PathCommand] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Render as an SVG `d` attribute.
    pub fn to_svg(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, command) in self.commands.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", command)?;
        }
        Ok(())
    }
}

/// Control point for `current`, pointing along `previous -> next`.
///
/// Missing neighbors fall back to `current`. With `reverse` the handle
/// points backwards, as needed for the end handle of a segment.
pub fn control_point(
    current: PlotPoint,
    previous: Option<PlotPoint>,
    next: Option<PlotPoint>,
    reverse: bool,
    smoothing: f64,
) -> PlotPoint {
    let previous = previous.unwrap_or(current);
    let next = next.unwrap_or(current);

    let mut angle = (next.y - previous.y).atan2(next.x - previous.x);
    if reverse {
        angle += std::f64::consts::PI;
    }
    let length = previous.distance(&next) * smoothing;

    PlotPoint::new(
        current.x + angle.cos() * length,
        current.y + angle.sin() * length,
    )
}

/// Smooth path through `points`. Empty input gives an empty path.
pub fn smooth_path(points: &[PlotPoint], smoothing: f64) -> Path {
    let mut path = Path::new();
    let Some(first) = points.first() else {
        return path;
    };
    path.push(PathCommand::MoveTo(*first));

    let at = |i: isize| -> Option<PlotPoint> {
        usize::try_from(i).ok().and_then(|i| points.get(i).copied())
    };

    for i in 1..points.len() {
        let i = i as isize;
        let (Some(start), Some(end)) = (at(i - 1), at(i)) else {
            continue;
        };
        let start_control = control_point(start, at(i - 2), Some(end), false, smoothing);
        let end_control = control_point(end, Some(start), at(i + 1), true, smoothing);
        path.push(PathCommand::CurveTo {
            start_control,
            end_control,
            to: end,
        });
    }

    path
}

/// Close a line path down to the bottom edge for the gradient fill.
pub fn area_path(line: &Path, config: &ChartConfig) -> Path {
    if line.is_empty() {
        return Path::new();
    }

    let mut area = line.clone();
    area.push(PathCommand::LineTo(PlotPoint::new(
        config.width - config.padding,
        config.height,
    )));
    area.push(PathCommand::LineTo(PlotPoint::new(config.padding, config.height)));
    area.push(PathCommand::Close);
    area
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn close(a: PlotPoint, b: PlotPoint) -> bool {
        (a.x - b.x).abs() < 1e-6 && (a.y - b.y).abs() < 1e-6
    }

    #[test]
    fn test_control_point_diagonal() {
        let a = PlotPoint::new(0.0, 0.0);
        let b = PlotPoint::new(10.0, 10.0);

        let start = control_point(a, None, Some(b), false, 0.2);
        let end = control_point(b, Some(a), None, true, 0.2);

        assert!(close(start, PlotPoint::new(2.0, 2.0)));
        assert!(close(end, PlotPoint::new(8.0, 8.0)));
    }

    #[test]
    fn test_control_point_without_neighbors_is_current() {
        let p = PlotPoint::new(5.0, 7.0);
        assert!(close(control_point(p, None, None, false, 0.2), p));
    }

    #[test]
    fn test_single_point_path_is_move_only() {
        let path = smooth_path(&[PlotPoint::new(150.0, 142.5)], 0.2);
        assert_eq!(path.to_svg(), "M 150,142.5");
    }

    #[test]
    fn test_empty_path() {
        assert!(smooth_path(&[], 0.2).is_empty());
        assert!(area_path(&Path::new(), &ChartConfig::default()).is_empty());
    }

    #[test]
    fn test_segment_count_and_endpoints() {
        let points = vec![
            PlotPoint::new(15.0, 142.5),
            PlotPoint::new(150.0, 37.5),
            PlotPoint::new(285.0, 90.0),
        ];
        let path = smooth_path(&points, 0.2);

        assert_eq!(path.commands().len(), 3);
        assert_eq!(path.commands()[0], PathCommand::MoveTo(points[0]));
        match path.commands()[2] {
            PathCommand::CurveTo { to, .. } => assert_eq!(to, points[2]),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_area_closes_to_bottom() {
        let config = ChartConfig::default();
        let line = smooth_path(&[PlotPoint::new(150.0, 142.5)], config.smoothing);
        let area = area_path(&line, &config);

        assert_eq!(area.to_svg(), "M 150,142.5 L 285,180 L 15,180 Z");
    }

    #[test]
    fn test_command_display() {
        let command = PathCommand::CurveTo {
            start_control: PlotPoint::new(1.0, 2.0),
            end_control: PlotPoint::new(3.5, 4.0),
            to: PlotPoint::new(5.0, 6.0),
        };
        assert_eq!(command.to_string(), "C 1,2 3.5,4 5,6");
    }

    proptest! {
        #[test]
        fn prop_handles_collinear_at_interior_points(
            ys in proptest::collection::vec(0.0f64..180.0, 3..12)
        ) {
            let step = 270.0 / (ys.len() - 1) as f64;
            let points: Vec<PlotPoint> = ys
                .iter()
                .enumerate()
                .map(|(i, y)| PlotPoint::new(15.0 + i as f64 * step, *y))
                .collect();
            let path = smooth_path(&points, 0.2);
            let commands = path.commands();

            // Incoming and outgoing handles mirror each other around the shared point.
            for i in 1..points.len() - 1 {
                let incoming = match commands[i] {
                    PathCommand::CurveTo { end_control, .. } => end_control,
                    _ => unreachable!(),
                };
                let outgoing = match commands[i + 1] {
                    PathCommand::CurveTo { start_control, .. } => start_control,
                    _ => unreachable!(),
                };
                let mid = PlotPoint::new(
                    (incoming.x + outgoing.x) / 2.0,
                    (incoming.y + outgoing.y) / 2.0,
                );
                prop_assert!(close(mid, points[i]));
            }
        }
    }
}
