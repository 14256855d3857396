use crate::render::{begin_paint, finish_paint, luma, pixel_rgb, ColorState, Frame, Renderer};
use std::io::Write;

// Dark to bright.
const RAMP: &[u8] = b" .:-=+*#%@";

pub struct AsciiRenderer {
    colors: ColorState,
}

impl AsciiRenderer {
    pub fn new() -> Self {
        Self {
            colors: ColorState::default(),
        }
    }
}

impl Default for AsciiRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for AsciiRenderer {
    fn name(&self) -> &'static str {
        "ascii"
    }

    fn cell_size(&self) -> (usize, usize) {
        (1, 1)
    }

    fn render(&mut self, frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()> {
        let Some((cols, rows)) = begin_paint(frame, self.cell_size(), out)? else {
            return Ok(());
        };
        self.colors = ColorState::default();

        for y in 0..rows {
            for x in 0..cols {
                let rgb = pixel_rgb(frame, x, y);
                let glyph = RAMP[luma(rgb) as usize * (RAMP.len() - 1) / 255];
                self.colors.fg(out, rgb)?;
                out.write_all(&[glyph])?;
            }
            out.write_all(b"\r\n")?;
        }

        finish_paint(frame, cols, rows, out)
    }
}
