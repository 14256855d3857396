mod ascii;
mod braille;
mod halfblock;

pub use ascii::AsciiRenderer;
pub use braille::BrailleRenderer;
pub use halfblock::HalfBlockRenderer;

use crate::config::RendererMode;
use std::io::Write;

/// One canvas worth of pixels plus the text drawn around it.
pub struct Frame<'a> {
    pub term_cols: u16,
    pub term_rows: u16,
    pub visual_rows: u16,
    pub pixel_width: usize,
    pub pixel_height: usize,
    pub pixels_rgba: &'a [u8],
    /// Canvas pixels per cell pixel along each axis; blocks are averaged.
    pub supersample: usize,
    pub hud: &'a str,
    pub hud_rows: u16,
    pub overlay: Option<&'a str>,
    pub sync_updates: bool,
}

pub trait Renderer {
    fn name(&self) -> &'static str;
    /// Canvas pixels covered by one terminal cell, as (columns, rows).
    fn cell_size(&self) -> (usize, usize);
    fn render(&mut self, frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()>;
}

pub fn renderer_for(mode: RendererMode) -> Box<dyn Renderer> {
    match mode {
        RendererMode::HalfBlock => Box::new(HalfBlockRenderer::new()),
        RendererMode::Braille => Box::new(BrailleRenderer::new()),
        RendererMode::Ascii => Box::new(AsciiRenderer::new()),
    }
}

/// Validates the frame against the renderer's cell size and opens the paint.
///
/// Returns `None` (and writes nothing) when the frame cannot be painted.
pub(crate) fn begin_paint(
    frame: &Frame<'_>,
    cell: (usize, usize),
    out: &mut dyn Write,
) -> anyhow::Result<Option<(usize, usize)>> {
    let cols = frame.term_cols as usize;
    let rows = frame.visual_rows as usize;
    let (w, h) = (frame.pixel_width, frame.pixel_height);
    let k = frame.supersample.max(1);
    if cols == 0 || rows == 0 || w == 0 || h == 0 {
        return Ok(None);
    }
    if w != cols.saturating_mul(cell.0).saturating_mul(k)
        || h != rows.saturating_mul(cell.1).saturating_mul(k)
    {
        return Ok(None);
    }
    if frame.pixels_rgba.len() < w.saturating_mul(h).saturating_mul(4) {
        return Ok(None);
    }

    if frame.sync_updates {
        out.write_all(b"\x1b[?2026h")?;
    }
    // Home + reset, then DECAWM off so the last column never wraps.
    out.write_all(b"\x1b[H\x1b[0m\x1b[?7l")?;
    Ok(Some((cols, rows)))
}

/// Writes the HUD rows and the overlay, restores autowrap and flushes.
pub(crate) fn finish_paint(
    frame: &Frame<'_>,
    cols: usize,
    visual_rows: usize,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let mut lines = frame.hud.lines();
    for i in 0..(frame.hud_rows as usize) {
        write!(out, "\x1b[{};1H\x1b[0m\x1b[2K", visual_rows + i + 1)?;
        if let Some(line) = lines.next() {
            let clipped: String = line.chars().take(cols).collect();
            out.write_all(clipped.as_bytes())?;
        }
    }

    if let Some(text) = frame.overlay {
        draw_overlay_popup(out, frame.term_cols, frame.term_rows, text)?;
    }

    out.write_all(b"\x1b[0m\x1b[?7h")?;
    if frame.sync_updates {
        out.write_all(b"\x1b[?2026l")?;
    }
    out.flush()?;
    Ok(())
}

/// Colour of cell pixel `(x, y)`: the mean of its `k x k` canvas block.
#[inline]
pub(crate) fn pixel_rgb(frame: &Frame<'_>, x: usize, y: usize) -> (u8, u8, u8) {
    let k = frame.supersample.max(1);
    if k == 1 {
        let i = (y * frame.pixel_width + x) * 4;
        return (
            frame.pixels_rgba[i],
            frame.pixels_rgba[i + 1],
            frame.pixels_rgba[i + 2],
        );
    }

    let (mut r, mut g, mut b) = (0u32, 0u32, 0u32);
    for sy in y * k..(y + 1) * k {
        let row = sy * frame.pixel_width;
        for sx in x * k..(x + 1) * k {
            let i = (row + sx) * 4;
            r += frame.pixels_rgba[i] as u32;
            g += frame.pixels_rgba[i + 1] as u32;
            b += frame.pixels_rgba[i + 2] as u32;
        }
    }
    let n = (k * k) as u32;
    ((r / n) as u8, (g / n) as u8, (b / n) as u8)
}

/// Rec.709 luma with integer weights, 0..=255.
#[inline]
pub(crate) fn luma(rgb: (u8, u8, u8)) -> u8 {
    ((rgb.0 as u32 * 54 + rgb.1 as u32 * 183 + rgb.2 as u32 * 19) >> 8) as u8
}

/// Remembers the last SGR colours so runs of equal cells skip the escape.
#[derive(Default)]
pub(crate) struct ColorState {
    fg: Option<(u8, u8, u8)>,
    bg: Option<(u8, u8, u8)>,
}

impl ColorState {
    pub(crate) fn fg(&mut self, out: &mut dyn Write, c: (u8, u8, u8)) -> std::io::Result<()> {
        if self.fg != Some(c) {
            write!(out, "\x1b[38;2;{};{};{}m", c.0, c.1, c.2)?;
            self.fg = Some(c);
        }
        Ok(())
    }

    pub(crate) fn bg(&mut self, out: &mut dyn Write, c: (u8, u8, u8)) -> std::io::Result<()> {
        if self.bg != Some(c) {
            write!(out, "\x1b[48;2;{};{};{}m", c.0, c.1, c.2)?;
            self.bg = Some(c);
        }
        Ok(())
    }
}

/// Centered boxed text over a dark backdrop; the first line is the title.
pub fn draw_overlay_popup(
    out: &mut dyn Write,
    term_cols: u16,
    term_rows: u16,
    text: &str,
) -> anyhow::Result<()> {
    if text.trim().is_empty() {
        return Ok(());
    }
    let cols = term_cols as usize;
    let rows = term_rows as usize;
    if cols < 8 || rows < 4 {
        return Ok(());
    }

    let max_inner = cols.saturating_sub(6).max(1);
    let mut lines: Vec<String> = Vec::new();
    for raw in text.lines() {
        let chars: Vec<char> = raw.chars().collect();
        if chars.is_empty() {
            lines.push(String::new());
            continue;
        }
        for chunk in chars.chunks(max_inner) {
            lines.push(chunk.iter().collect());
        }
    }

    let widest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let box_w = (widest.clamp(1, max_inner) + 4).min(cols.saturating_sub(2));
    let inner = box_w.saturating_sub(4);
    let body_h = lines.len().min(rows.saturating_sub(3).max(1));
    let box_h = body_h + 2;

    let left = cols.saturating_sub(box_w) / 2 + 1;
    let top = rows.saturating_sub(box_h) / 2 + 1;
    let edge = "-".repeat(box_w.saturating_sub(2));

    out.write_all(b"\x1b[0m\x1b[38;2;226;232;240m\x1b[48;2;12;10;10m")?;
    write!(out, "\x1b[{};{}H+{}+", top, left, edge)?;
    for (i, line) in lines.iter().take(body_h).enumerate() {
        let row = top + 1 + i;
        write!(out, "\x1b[{};{}H| {:w$} |", row, left, "", w = inner)?;
        if i == 0 {
            write!(
                out,
                "\x1b[{};{}H\x1b[1m\x1b[38;2;120;240;160m{}\x1b[22m\x1b[38;2;226;232;240m",
                row,
                left + 2,
                line
            )?;
        } else {
            write!(out, "\x1b[{};{}H{}", row, left + 2, line)?;
        }
    }
    write!(out, "\x1b[{};{}H+{}+", top + box_h - 1, left, edge)?;
    out.write_all(b"\x1b[0m")?;
    Ok(())
}
