use crate::render::{begin_paint, finish_paint, pixel_rgb, ColorState, Frame, Renderer};
use std::io::Write;

const UPPER_HALF: &str = "\u{2580}";

/// Two vertical pixels per cell: the top one as foreground, the bottom as background.
pub struct HalfBlockRenderer {
    colors: ColorState,
}

impl HalfBlockRenderer {
    pub fn new() -> Self {
        Self {
            colors: ColorState::default(),
        }
    }
}

impl Default for HalfBlockRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for HalfBlockRenderer {
    fn name(&self) -> &'static str {
        "half-block"
    }

    fn cell_size(&self) -> (usize, usize) {
        (1, 2)
    }

    fn render(&mut self, frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()> {
        let Some((cols, rows)) = begin_paint(frame, self.cell_size(), out)? else {
            return Ok(());
        };
        self.colors = ColorState::default();

        for row in 0..rows {
            for x in 0..cols {
                self.colors.fg(out, pixel_rgb(frame, x, row * 2))?;
                self.colors.bg(out, pixel_rgb(frame, x, row * 2 + 1))?;
                out.write_all(UPPER_HALF.as_bytes())?;
            }
            out.write_all(b"\r\n")?;
        }

        finish_paint(frame, cols, rows, out)
    }
}
