use crate::{
    error::Error,
    pose::{Keypoint, KeypointKind, Point},
};
use ndarray::{Array1, ArrayView2};

const LINE_WIDTH: u32 = 2;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const GREEN: Color = Color::rgb(0, 255, 0);
    pub const RED: Color = Color::rgb(255, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// A 2D drawing surface the skeleton overlay is rendered onto.
pub trait Canvas {
    type Frame;

    /// Reset the surface to show `frame` with nothing drawn over it.
    fn clear(&mut self, frame: &Self::Frame) -> Result<(), Error>;

    fn fill_circle(&mut self, center: Point, radius: u32, color: Color) -> Result<(), Error>;

    fn stroke_line(&mut self, a: Point, b: Point, color: Color, width: u32) -> Result<(), Error>;

    fn stroke_rect(&mut self, min: Point, max: Point, color: Color) -> Result<(), Error> {
        let top_right = Point::new(max.x, min.y);
        let bottom_left = Point::new(min.x, max.y);
        self.stroke_line(min, top_right, color, 1)?;
        self.stroke_line(top_right, max, color, 1)?;
        self.stroke_line(max, bottom_left, color, 1)?;
        self.stroke_line(bottom_left, min, color, 1)
    }

    /// Make the finished overlay visible, if the surface has a display.
    fn present(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

/// Midpoint of two landmarks of a `17 x 2` landmark array.
pub fn center_point(
    landmarks: ArrayView2<'_, f32>,
    left: KeypointKind,
    right: KeypointKind,
) -> Array1<f32> {
    &landmarks.row(left.idx()) * 0.5 + &landmarks.row(right.idx()) * 0.5
}

pub fn draw_point<C>(
    canvas: &mut C,
    point: Point,
    radius: u32,
    color: Color,
) -> Result<(), Error>
where
    C: Canvas + ?Sized,
{
    canvas.fill_circle(point, radius, color)
}

pub fn draw_segment<C>(
    canvas: &mut C,
    a: Point,
    b: Point,
    color: Color,
    scale: f32,
) -> Result<(), Error>
where
    C: Canvas + ?Sized,
{
    canvas.stroke_line(a * scale, b * scale, color, LINE_WIDTH)
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BoundingBox {
    pub min: Point,
    pub max: Point,
}

/// Smallest axis-aligned box around the keypoints scoring at least `min_confidence`.
pub fn bounding_box(keypoints: &[Keypoint], min_confidence: f32) -> Option<BoundingBox> {
    keypoints
        .iter()
        .filter(|keypoint| keypoint.score >= min_confidence)
        .map(|keypoint| keypoint.point)
        .fold(None, |bbox, point| {
            Some(match bbox {
                None => BoundingBox {
                    min: point,
                    max: point,
                },
                Some(BoundingBox { min, max }) => BoundingBox {
                    min: Point::new(min.x.min(point.x), min.y.min(point.y)),
                    max: Point::new(max.x.max(point.x), max.y.max(point.y)),
                },
            })
        })
}


#[cfg(test)]
mod tests {
    use super::*;

    mod center_point_tests {
        use super::*;
        use crate::pose::NUM_KEYPOINTS;
        use ndarray::Array2;

        #[test]
        fn hip_midpoint() {
            let mut landmarks = Array2::<f32>::zeros((NUM_KEYPOINTS, 2));
            landmarks[(KeypointKind::LeftHip.idx(), 0)] = 100.0;
            landmarks[(KeypointKind::LeftHip.idx(), 1)] = 200.0;
            landmarks[(KeypointKind::RightHip.idx(), 0)] = 140.0;
            landmarks[(KeypointKind::RightHip.idx(), 1)] = 200.0;
            let center = center_point(
                landmarks.view(),
                KeypointKind::LeftHip,
                KeypointKind::RightHip,
            );
            assert_eq!(center, ndarray::arr1(&[120.0, 200.0]));
        }

        #[test]
        fn same_part_is_identity() {
            let landmarks = Array2::from_shape_fn((NUM_KEYPOINTS, 2), |(i, j)| (i * 2 + j) as f32);
            let center = center_point(landmarks.view(), KeypointKind::Nose, KeypointKind::Nose);
            assert_eq!(center, ndarray::arr1(&[0.0, 1.0]));
        }
    }

    mod draw_tests {
        use crate::geometry::testing::{RecordingCanvas, Stroke};
        use super::*;

        #[test]
        fn segment_is_scaled() {
            let mut canvas = RecordingCanvas::default();
            draw_segment(
                &mut canvas,
                Point::new(1.0, 2.0),
                Point::new(3.0, 4.0),
                Color::GREEN,
                2.0,
            )
            .unwrap();
            assert_eq!(
                canvas.strokes,
                vec![Stroke::Line(
                    Point::new(2.0, 4.0),
                    Point::new(6.0, 8.0),
                    Color::GREEN,
                    LINE_WIDTH
                )]
            );
        }

        #[test]
        fn point_is_filled_circle() {
            let mut canvas = RecordingCanvas::default();
            draw_point(&mut canvas, Point::new(5.0, 6.0), 8, Color::WHITE).unwrap();
            assert_eq!(
                canvas.strokes,
                vec![Stroke::Circle(Point::new(5.0, 6.0), 8, Color::WHITE)]
            );
        }

        #[test]
        fn rect_is_four_lines() {
            let mut canvas = RecordingCanvas::default();
            canvas
                .stroke_rect(Point::new(0.0, 0.0), Point::new(1.0, 1.0), Color::RED)
                .unwrap();
            assert_eq!(canvas.lines().count(), 4);
        }
    }

    mod bounding_box_tests {
        use super::*;

        fn keypoint(x: f32, y: f32, score: f32) -> Keypoint {
            Keypoint {
                kind: KeypointKind::Nose,
                point: Point::new(x, y),
                score,
            }
        }

        #[test]
        fn ignores_low_confidence() {
            let keypoints = [
                keypoint(10.0, 20.0, 0.9),
                keypoint(-50.0, 500.0, 0.1),
                keypoint(30.0, 5.0, 0.5),
            ];
            assert_eq!(
                bounding_box(&keypoints, 0.4),
                Some(BoundingBox {
                    min: Point::new(10.0, 5.0),
                    max: Point::new(30.0, 20.0),
                })
            );
        }

        #[test]
        fn none_when_nothing_qualifies() {
            assert_eq!(bounding_box(&[keypoint(1.0, 1.0, 0.0)], 0.4), None);
        }
    }
}
