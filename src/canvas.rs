use crate::visualizer::{BarPaint, Surface};

/// Peak opacity of the glow halo right at the bar edge.
const GLOW_PEAK: f32 = 0.35;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

/// CSS-style HSL: hue in degrees, saturation and lightness in percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsl {
    pub h: f32,
    pub s: f32,
    pub l: f32,
}

impl Hsl {
    pub fn to_rgb(self) -> (u8, u8, u8) {
        hsl_to_rgb(self.h, self.s, self.l)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn is_empty(&self) -> bool {
        !(self.w > 0.0 && self.h > 0.0)
    }
}

pub fn hsl_to_rgb(h: f32, s: f32, l: f32) -> (u8, u8, u8) {
    let h = h.rem_euclid(360.0);
    let s = (s / 100.0).clamp(0.0, 1.0);
    let l = (l / 100.0).clamp(0.0, 1.0);

    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let hp = h / 60.0;
    let x = c * (1.0 - (hp.rem_euclid(2.0) - 1.0).abs());
    let (r1, g1, b1) = match hp as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = l - c / 2.0;
    let to_u8 = |v: f32| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    (to_u8(r1), to_u8(g1), to_u8(b1))
}

/// Opaque RGBA8 raster that the visualizer paints into.
pub struct PixelCanvas {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
    glow: bool,
    glow_scale: f32,
}

impl PixelCanvas {
    pub fn new(width: usize, height: usize) -> Self {
        let mut pixels = vec![0u8; width.saturating_mul(height).saturating_mul(4)];
        for px in pixels.chunks_exact_mut(4) {
            px[3] = 255;
        }
        Self {
            width,
            height,
            pixels,
            glow: true,
            glow_scale: 1.0,
        }
    }

    /// Glow radii are given in reference pixels; `scale` converts them to canvas pixels.
    pub fn with_glow_scale(mut self, scale: f32) -> Self {
        self.glow_scale = scale.max(0.0);
        self
    }

    pub fn set_glow(&mut self, enabled: bool) {
        self.glow = enabled;
    }

    pub fn glow(&self) -> bool {
        self.glow
    }

    pub fn width_px(&self) -> usize {
        self.width
    }

    pub fn height_px(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y * self.width + x) * 4;
        Some([
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ])
    }

    #[inline]
    fn blend(&mut self, x: usize, y: usize, rgb: (u8, u8, u8), alpha: f32) {
        if alpha <= 0.0 {
            return;
        }
        let a = alpha.min(1.0);
        let i = (y * self.width + x) * 4;
        let mix = |dst: u8, src: u8| (dst as f32 + (src as f32 - dst as f32) * a).round() as u8;
        self.pixels[i] = mix(self.pixels[i], rgb.0);
        self.pixels[i + 1] = mix(self.pixels[i + 1], rgb.1);
        self.pixels[i + 2] = mix(self.pixels[i + 2], rgb.2);
    }

    /// Fills `rect` using per-pixel coverage as alpha, so fractional edges blend.
    pub fn fill_rect(&mut self, rect: Rect, rgb: (u8, u8, u8)) {
        if rect.is_empty() {
            return;
        }
        let x0 = rect.x.max(0.0);
        let x1 = rect.right().min(self.width as f32);
        let y0 = rect.y.max(0.0);
        let y1 = rect.bottom().min(self.height as f32);
        if x1 <= x0 || y1 <= y0 {
            return;
        }

        for py in (y0.floor() as usize)..(y1.ceil() as usize) {
            let cov_y = (y1.min(py as f32 + 1.0) - y0.max(py as f32)).max(0.0);
            for px in (x0.floor() as usize)..(x1.ceil() as usize) {
                let cov_x = (x1.min(px as f32 + 1.0) - x0.max(px as f32)).max(0.0);
                self.blend(px, py, rgb, cov_x * cov_y);
            }
        }
    }

    /// Soft halo around `rect` fading to nothing at `radius` pixels.
    pub fn glow_rect(&mut self, rect: Rect, radius: f32, rgb: (u8, u8, u8)) {
        if rect.is_empty() || radius < 0.5 {
            return;
        }
        let gx0 = (rect.x - radius).floor().max(0.0) as usize;
        let gx1 = ((rect.right() + radius).ceil().max(0.0) as usize).min(self.width);
        let gy0 = (rect.y - radius).floor().max(0.0) as usize;
        let gy1 = ((rect.bottom() + radius).ceil().max(0.0) as usize).min(self.height);

        for py in gy0..gy1 {
            let cy = py as f32 + 0.5;
            let dy = (rect.y - cy).max(cy - rect.bottom()).max(0.0);
            for px in gx0..gx1 {
                let cx = px as f32 + 0.5;
                let dx = (rect.x - cx).max(cx - rect.right()).max(0.0);
                let d = (dx * dx + dy * dy).sqrt();
                if d >= radius {
                    continue;
                }
                let fall = 1.0 - d / radius;
                self.blend(px, py, rgb, GLOW_PEAK * fall * fall);
            }
        }
    }
}

impl Surface for PixelCanvas {
    fn width(&self) -> f32 {
        self.width as f32
    }

    fn height(&self) -> f32 {
        self.height as f32
    }

    fn composite_overlay(&mut self, color: Rgba) {
        let a = color.a.clamp(0.0, 1.0);
        if a <= 0.0 {
            return;
        }
        let mix = |dst: u8, src: u8| (dst as f32 + (src as f32 - dst as f32) * a).round() as u8;
        for px in self.pixels.chunks_exact_mut(4) {
            px[0] = mix(px[0], color.r);
            px[1] = mix(px[1], color.g);
            px[2] = mix(px[2], color.b);
        }
    }

    fn fill_bar(&mut self, paint: &BarPaint) {
        if self.glow {
            self.glow_rect(paint.rect, paint.glow_blur * self.glow_scale, paint.glow.to_rgb());
        }
        self.fill_rect(paint.rect, paint.fill.to_rgb());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hsl_primary_points() {
        assert_eq!(hsl_to_rgb(120.0, 100.0, 50.0), (0, 255, 0));
        assert_eq!(hsl_to_rgb(180.0, 100.0, 50.0), (0, 255, 255));
        assert_eq!(hsl_to_rgb(60.0, 100.0, 50.0), (255, 255, 0));
        assert_eq!(hsl_to_rgb(0.0, 0.0, 100.0), (255, 255, 255));
        assert_eq!(hsl_to_rgb(360.0, 100.0, 50.0), (255, 0, 0));
    }

    #[test]
    fn hsl_default_mood_bar() {
        assert_eq!(hsl_to_rgb(150.0, 85.0, 50.0), (19, 236, 128));
    }

    #[test]
    fn fill_rect_blends_partial_coverage() {
        let mut c = PixelCanvas::new(4, 1);
        c.fill_rect(
            Rect {
                x: 0.5,
                y: 0.0,
                w: 2.0,
                h: 1.0,
            },
            (200, 200, 200),
        );
        assert_eq!(c.pixel(0, 0), Some([100, 100, 100, 255]));
        assert_eq!(c.pixel(1, 0), Some([200, 200, 200, 255]));
        assert_eq!(c.pixel(2, 0), Some([100, 100, 100, 255]));
        assert_eq!(c.pixel(3, 0), Some([0, 0, 0, 255]));
    }

    #[test]
    fn empty_and_offscreen_rects_are_ignored() {
        let mut c = PixelCanvas::new(3, 3);
        let before = c.pixels().to_vec();
        c.fill_rect(
            Rect {
                x: 1.0,
                y: 1.0,
                w: -1.0,
                h: 2.0,
            },
            (255, 0, 0),
        );
        c.fill_rect(
            Rect {
                x: 10.0,
                y: 0.0,
                w: 2.0,
                h: 2.0,
            },
            (255, 0, 0),
        );
        assert_eq!(c.pixels(), &before[..]);
    }

    #[test]
    fn glow_fades_with_distance() {
        let mut c = PixelCanvas::new(20, 1);
        c.glow_rect(
            Rect {
                x: 0.0,
                y: 0.0,
                w: 1.0,
                h: 1.0,
            },
            8.0,
            (0, 200, 0),
        );
        let near = c.pixel(1, 0).map(|p| p[1]).unwrap_or(0);
        let far = c.pixel(6, 0).map(|p| p[1]).unwrap_or(0);
        assert!(near > far, "near {near} far {far}");
        assert_eq!(c.pixel(12, 0), Some([0, 0, 0, 255]));
    }
}
