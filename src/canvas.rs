use crate::{
    error::Error,
    geometry::{Canvas, Color},
    pose::Point,
    reference::ReferenceSlot,
};
#[cfg(feature = "gui")]
use crossbeam::channel::Sender;
use opencv::{
    core::{Mat, Point2i, Rect, Scalar},
    imgproc::{self, FILLED, LINE_8, LINE_AA},
    prelude::*,
};
use tracing::trace;

fn scalar(color: Color) -> Scalar {
    // OpenCV wants BGR
    Scalar::from((
        f64::from(color.b),
        f64::from(color.g),
        f64::from(color.r),
    ))
}

fn pixel(point: Point) -> Point2i {
    Point2i::new(point.x.round() as i32, point.y.round() as i32)
}

#[cfg(feature = "gui")]
struct Window {
    name: String,
    keys: Sender<i32>,
}

/// Draws the skeleton overlay onto an owned copy of the latest frame.
pub struct MatCanvas {
    frame: Mat,
    reference: Option<ReferenceSlot>,
    #[cfg(feature = "gui")]
    window: Option<Window>,
}

impl Default for MatCanvas {
    fn default() -> Self {
        Self::new()
    }
}

impl MatCanvas {
    pub fn new() -> Self {
        Self {
            frame: Mat::default(),
            reference: None,
            #[cfg(feature = "gui")]
            window: None,
        }
    }

    /// Show every finished overlay in the window `name`, forwarding key presses to `keys`.
    #[cfg(feature = "gui")]
    pub fn with_window<S>(name: S, keys: Sender<i32>) -> Self
    where
        S: Into<String>,
    {
        Self {
            frame: Mat::default(),
            reference: None,
            window: Some(Window {
                name: name.into(),
                keys,
            }),
        }
    }

    /// Paste the picture in `slot`, if any, into the top right corner of every
    /// presented overlay.
    pub fn with_reference(mut self, slot: ReferenceSlot) -> Self {
        self.reference = Some(slot);
        self
    }

    pub fn frame(&self) -> &Mat {
        &self.frame
    }

    fn draw_reference(&mut self) -> Result<(), Error> {
        let slot = match self.reference.as_ref() {
            Some(slot) => slot,
            None => return Ok(()),
        };
        let image = slot.lock().map_err(|_| Error::LockReference)?;
        let image = match image.as_ref() {
            Some(image) => image,
            None => return Ok(()),
        };

        let (cols, rows) = (image.cols(), image.rows());
        if cols > self.frame.cols() || rows > self.frame.rows() {
            trace!(message = "reference image does not fit the frame", cols, rows);
            return Ok(());
        }
        // shares data with `frame`
        let mut corner = Mat::roi(&self.frame, Rect::new(self.frame.cols() - cols, 0, cols, rows))
            .map_err(Error::DrawReference)?;
        image.copy_to(&mut corner).map_err(Error::DrawReference)
    }
}

impl Canvas for MatCanvas {
    type Frame = Mat;

    fn clear(&mut self, frame: &Mat) -> Result<(), Error> {
        frame.copy_to(&mut self.frame).map_err(Error::CopyFrame)
    }

    fn fill_circle(&mut self, center: Point, radius: u32, color: Color) -> Result<(), Error> {
        imgproc::circle(
            &mut self.frame,
            pixel(center),
            radius as i32,
            scalar(color),
            FILLED,  // thickness
            LINE_AA, // line_type
            0,       // shift
        )
        .map_err(Error::DrawCircle)
    }

    fn stroke_line(&mut self, a: Point, b: Point, color: Color, width: u32) -> Result<(), Error> {
        imgproc::line(
            &mut self.frame,
            pixel(a),
            pixel(b),
            scalar(color),
            width as i32, // thickness
            LINE_AA,      // line_type
            0,            // shift
        )
        .map_err(Error::DrawLine)
    }

    fn stroke_rect(&mut self, min: Point, max: Point, color: Color) -> Result<(), Error> {
        let min = pixel(min);
        let max = pixel(max);
        imgproc::rectangle(
            &mut self.frame,
            Rect::new(min.x, min.y, max.x - min.x, max.y - min.y),
            scalar(color),
            1,      // thickness
            LINE_8, // line_type
            0,      // shift
        )
        .map_err(Error::DrawRectangle)
    }

    fn present(&mut self) -> Result<(), Error> {
        self.draw_reference()?;
        #[cfg(feature = "gui")]
        if let Some(window) = self.window.as_ref() {
            opencv::highgui::imshow(&window.name, &self.frame).map_err(Error::ImShow)?;
            let key = opencv::highgui::wait_key(1).map_err(Error::WaitKey)?;
            if key >= 0 {
                // the view may already be gone during shutdown
                let _ = window.keys.send(key);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::CV_8UC1;
    use std::sync::{Arc, Mutex};

    fn filled(rows: i32, cols: i32, value: f64) -> Mat {
        Mat::new_rows_cols_with_default(rows, cols, CV_8UC1, Scalar::all(value)).unwrap()
    }

    fn pixel_at(canvas: &MatCanvas, row: i32, col: i32) -> u8 {
        *canvas.frame().at_2d::<u8>(row, col).unwrap()
    }

    #[test]
    fn reference_is_pasted_top_right() {
        let slot: ReferenceSlot = Arc::new(Mutex::new(Some(filled(2, 2, 200.0))));
        let mut canvas = MatCanvas::new().with_reference(slot);
        canvas.clear(&filled(4, 4, 0.0)).unwrap();
        canvas.present().unwrap();

        assert_eq!(pixel_at(&canvas, 0, 3), 200);
        assert_eq!(pixel_at(&canvas, 1, 2), 200);
        assert_eq!(pixel_at(&canvas, 2, 3), 0);
        assert_eq!(pixel_at(&canvas, 0, 1), 0);
    }

    #[test]
    fn swapped_reference_shows_on_next_present() {
        let slot: ReferenceSlot = Arc::new(Mutex::new(None));
        let mut canvas = MatCanvas::new().with_reference(slot.clone());
        canvas.clear(&filled(4, 4, 0.0)).unwrap();
        canvas.present().unwrap();
        assert_eq!(pixel_at(&canvas, 0, 3), 0);

        *slot.lock().unwrap() = Some(filled(2, 2, 50.0));
        canvas.clear(&filled(4, 4, 0.0)).unwrap();
        canvas.present().unwrap();
        assert_eq!(pixel_at(&canvas, 0, 3), 50);
    }

    #[test]
    fn oversized_reference_is_skipped() {
        let slot: ReferenceSlot = Arc::new(Mutex::new(Some(filled(8, 8, 200.0))));
        let mut canvas = MatCanvas::new().with_reference(slot);
        canvas.clear(&filled(4, 4, 0.0)).unwrap();
        canvas.present().unwrap();
        assert_eq!(pixel_at(&canvas, 0, 3), 0);
    }
}
