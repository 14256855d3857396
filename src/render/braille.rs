use crate::render::{begin_paint, finish_paint, luma, pixel_rgb, ColorState, Frame, Renderer};
use std::io::Write;

// Bit for each dot, row-major over the 2x4 cell.
const DOT_BITS: [u8; 8] = [0x01, 0x08, 0x02, 0x10, 0x04, 0x20, 0x40, 0x80];

/// 2x4 pixels per cell. Dots brighter than the cell's mid luma are lit.
pub struct BrailleRenderer {
    colors: ColorState,
}

impl BrailleRenderer {
    pub fn new() -> Self {
        Self {
            colors: ColorState::default(),
        }
    }
}

impl Default for BrailleRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default, Clone, Copy)]
struct ColorSum {
    r: u32,
    g: u32,
    b: u32,
    n: u32,
}

impl ColorSum {
    fn add(&mut self, c: (u8, u8, u8)) {
        self.r += c.0 as u32;
        self.g += c.1 as u32;
        self.b += c.2 as u32;
        self.n += 1;
    }

    fn mean(&self) -> Option<(u8, u8, u8)> {
        if self.n == 0 {
            return None;
        }
        Some((
            (self.r / self.n) as u8,
            (self.g / self.n) as u8,
            (self.b / self.n) as u8,
        ))
    }
}

impl Renderer for BrailleRenderer {
    fn name(&self) -> &'static str {
        "braille"
    }

    fn cell_size(&self) -> (usize, usize) {
        (2, 4)
    }

    fn render(&mut self, frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()> {
        let Some((cols, rows)) = begin_paint(frame, self.cell_size(), out)? else {
            return Ok(());
        };
        self.colors = ColorState::default();

        for row in 0..rows {
            for col in 0..cols {
                let mut rgb = [(0u8, 0u8, 0u8); 8];
                let mut lum = [0u8; 8];
                for (i, (c, l)) in rgb.iter_mut().zip(lum.iter_mut()).enumerate() {
                    *c = pixel_rgb(frame, col * 2 + i % 2, row * 4 + i / 2);
                    *l = luma(*c);
                }
                let lo = lum.iter().copied().min().unwrap_or(0);
                let hi = lum.iter().copied().max().unwrap_or(0);
                let mid = ((lo as u16 + hi as u16) / 2) as u8;

                let mut bits = 0u8;
                let mut lit = ColorSum::default();
                let mut unlit = ColorSum::default();
                for i in 0..8 {
                    if lum[i] > mid {
                        bits |= DOT_BITS[i];
                        lit.add(rgb[i]);
                    } else {
                        unlit.add(rgb[i]);
                    }
                }

                let back = unlit.mean().unwrap_or((0, 0, 0));
                let (fore, glyph) = match lit.mean() {
                    Some(c) => (c, char::from_u32(0x2800 + bits as u32).unwrap_or(' ')),
                    None => (back, ' '),
                };
                self.colors.fg(out, fore)?;
                self.colors.bg(out, back)?;
                write!(out, "{glyph}")?;
            }
            out.write_all(b"\r\n")?;
        }

        finish_paint(frame, cols, rows, out)
    }
}
