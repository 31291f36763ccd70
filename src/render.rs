//! Card Rasterizer
//!
//! Paints a template with its field values into an RGBA buffer of the
//! fixed 643x383 card times `pixel_ratio`, whatever size the template
//! declares. Paint order is background colour, shapes in
//! declaration order, then fields, then the optional grid overlay.

use image::{imageops, imageops::FilterType, DynamicImage, Rgba, RgbaImage};
use std::path::PathBuf;
use thiserror::Error;

use crate::designer::GRID_SIZE;
use crate::font::{self, BitmapFont};
use crate::icons;
use crate::images;
use crate::store::{CardState, FieldValues};
use crate::templates::{
    BoundingBox, FieldKind, FieldSpec, ImageFit, Point, Shape, TemplateDesign, TextAlign, CANVAS_HEIGHT,
    CANVAS_WIDTH,
};

pub const DEFAULT_PIXEL_RATIO: u32 = 2;
pub const MAX_PIXEL_RATIO: u32 = 4;

const PLACEHOLDER_OPACITY: f64 = 0.45;
const GUIDE_COLOR: Rgba<u8> = Rgba([0xB9, 0xB9, 0xB9, 0xFF]);
const GRID_COLOR: Rgba<u8> = Rgba([0xE5, 0xE7, 0xEB, 0xFF]);
const ICON_BADGE_COLOR: Rgba<u8> = Rgba([0x37, 0x41, 0x51, 0xFF]);
const DEFAULT_LINE_HEIGHT: f64 = 1.2;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("Pixel ratio must be between 1 and 4, got {0}")]
    InvalidPixelRatio(u32),
}

/// Everything that ends up on the card.
#[derive(Debug, Clone, Copy)]
pub struct Scene<'a> {
    pub template: &'a TemplateDesign,
    pub values: Option<&'a FieldValues>,
    pub logo: Option<&'a str>,
    pub picture: Option<&'a str>,
}

impl<'a> Scene<'a> {
    /// The active card of the store.
    pub fn from_state(state: &'a CardState) -> Self {
        Self {
            template: &state.current_template,
            values: Some(&state.fields),
            logo: state.logo.as_deref(),
            picture: state.picture.as_deref(),
        }
    }

    /// A bare layout with no values, as the designer shows it.
    pub fn layout(template: &'a TemplateDesign) -> Self {
        Self { template, values: None, logo: None, picture: None }
    }

    fn value(&self, key: &str) -> &'a str {
        self.values
            .and_then(|v| v.get(key))
            .map(String::as_str)
            .unwrap_or("")
    }

    fn image_for(&self, field: &FieldSpec) -> Option<&'a str> {
        match field.key.as_str() {
            "logo" => self.logo,
            "picture" => self.picture,
            _ => None,
        }
        .or_else(|| {
            let v = self.value(&field.key);
            v.starts_with("data:").then_some(v)
        })
    }
}

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub pixel_ratio: u32,
    /// Draw placeholders for empty fields and image slots.
    pub show_placeholders: bool,
    /// Draw dashed guide shapes.
    pub show_guides: bool,
    pub show_grid: bool,
    /// Root for absolute asset paths referenced by image shapes.
    pub assets_dir: PathBuf,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            pixel_ratio: DEFAULT_PIXEL_RATIO,
            show_placeholders: false,
            show_guides: false,
            show_grid: false,
            assets_dir: PathBuf::from("public"),
        }
    }
}

impl RenderOptions {
    /// Interactive preview: placeholders and guides visible.
    pub fn preview() -> Self {
        Self { show_placeholders: true, show_guides: true, ..Self::default() }
    }
}

/// Parse `#rgb`, `#rrggbb`, `#rrggbbaa`, `rgb()/rgba()` and a few keywords.
pub fn parse_color(s: &str) -> Option<Rgba<u8>> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix('#') {
        let digit = |i: usize| u8::from_str_radix(hex.get(i..i + 1)?, 16).ok();
        let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        return match hex.len() {
            3 => Some(Rgba([digit(0)? * 17, digit(1)? * 17, digit(2)? * 17, 255])),
            6 => Some(Rgba([byte(0)?, byte(2)?, byte(4)?, 255])),
            8 => Some(Rgba([byte(0)?, byte(2)?, byte(4)?, byte(6)?])),
            _ => None,
        };
    }

    let lower = s.to_ascii_lowercase();
    if let Some(args) = lower
        .strip_prefix("rgba(")
        .or_else(|| lower.strip_prefix("rgb("))
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let parts: Vec<&str> = args.split(',').map(str::trim).collect();
        if parts.len() < 3 {
            return None;
        }
        let channel = |p: &str| p.parse::<f64>().ok().map(|v| v.clamp(0.0, 255.0).round() as u8);
        let alpha = match parts.get(3) {
            Some(a) => (a.parse::<f64>().ok()?.clamp(0.0, 1.0) * 255.0).round() as u8,
            None => 255,
        };
        return Some(Rgba([channel(parts[0])?, channel(parts[1])?, channel(parts[2])?, alpha]));
    }

    match lower.as_str() {
        "white" => Some(Rgba([255, 255, 255, 255])),
        "black" => Some(Rgba([0, 0, 0, 255])),
        "transparent" => Some(Rgba([0, 0, 0, 0])),
        _ => None,
    }
}

fn color_or_warn(s: &str) -> Option<Rgba<u8>> {
    let color = parse_color(s);
    if color.is_none() {
        tracing::warn!(color = s, "unrecognised colour; skipped");
    }
    color
}

/// Pixel buffer plus the canvas-to-pixel scale.
struct Canvas {
    img: RgbaImage,
    scale: f64,
}

impl Canvas {
    fn px(&self, v: f64) -> f64 {
        v * self.scale
    }

    /// Source-over blend of `color` with extra `coverage` in 0..=1.
    fn blend(&mut self, x: i64, y: i64, color: Rgba<u8>, coverage: f64) {
        if x < 0 || y < 0 || x >= self.img.width() as i64 || y >= self.img.height() as i64 {
            return;
        }
        let a = (color[3] as f64 / 255.0) * coverage.clamp(0.0, 1.0);
        if a <= 0.0 {
            return;
        }
        let dst = self.img.get_pixel_mut(x as u32, y as u32);
        let da = dst[3] as f64 / 255.0;
        let out_a = a + da * (1.0 - a);
        for c in 0..3 {
            let src = color[c] as f64;
            let d = dst[c] as f64;
            dst[c] = ((src * a + d * da * (1.0 - a)) / out_a).round() as u8;
        }
        dst[3] = (out_a * 255.0).round() as u8;
    }

    /// Pixel bounds `[x0, x1) x [y0, y1)` of a canvas-space box.
    fn pixel_span(&self, b: &BoundingBox) -> (i64, i64, i64, i64) {
        let w = self.img.width() as i64;
        let h = self.img.height() as i64;
        (
            (self.px(b.x).floor() as i64).clamp(0, w),
            (self.px(b.y).floor() as i64).clamp(0, h),
            (self.px(b.right()).ceil() as i64).clamp(0, w),
            (self.px(b.bottom()).ceil() as i64).clamp(0, h),
        )
    }

    /// Fill every pixel of `area` whose 2x2 sub-samples pass `inside`.
    fn fill_where<F>(&mut self, area: &BoundingBox, color: Rgba<u8>, inside: F)
    where
        F: Fn(f64, f64) -> bool,
    {
        const OFFSETS: [(f64, f64); 4] = [(0.25, 0.25), (0.75, 0.25), (0.25, 0.75), (0.75, 0.75)];
        let (x0, y0, x1, y1) = self.pixel_span(area);
        for py in y0..y1 {
            for px in x0..x1 {
                let hits = OFFSETS
                    .iter()
                    .filter(|(ox, oy)| {
                        inside((px as f64 + ox) / self.scale, (py as f64 + oy) / self.scale)
                    })
                    .count();
                if hits > 0 {
                    self.blend(px, py, color, hits as f64 / 4.0);
                }
            }
        }
    }

    fn fill_rect(&mut self, b: &BoundingBox, radius: f64, color: Rgba<u8>) {
        let b = *b;
        self.fill_where(&b, color, |x, y| in_rounded_rect(&b, radius, x, y));
    }

    fn fill_polygon(&mut self, points: &[Point], color: Rgba<u8>) {
        if points.len() < 3 {
            return;
        }
        let (min_x, max_x) = points.iter().fold((f64::MAX, f64::MIN), |(lo, hi), p| (lo.min(p.x), hi.max(p.x)));
        let (min_y, max_y) = points.iter().fold((f64::MAX, f64::MIN), |(lo, hi), p| (lo.min(p.y), hi.max(p.y)));
        let area = BoundingBox::new(min_x, min_y, max_x - min_x, max_y - min_y);
        self.fill_where(&area, color, |x, y| in_polygon_even_odd(points, x, y));
    }

    /// 2 px dashed outline following the box edges.
    fn stroke_dashed(&mut self, b: &BoundingBox, dash: &[f64], color: Rgba<u8>) {
        let on = dash.first().copied().unwrap_or(6.0).max(0.5);
        let off = dash.get(1).copied().unwrap_or(on).max(0.0);
        let period = on + off;
        let width = 2.0;

        let edges = [
            (Point::new(b.x, b.y), Point::new(b.right(), b.y)),
            (Point::new(b.right(), b.y), Point::new(b.right(), b.bottom())),
            (Point::new(b.right(), b.bottom()), Point::new(b.x, b.bottom())),
            (Point::new(b.x, b.bottom()), Point::new(b.x, b.y)),
        ];

        let mut travelled = 0.0;
        for (from, to) in edges {
            let len = ((to.x - from.x).powi(2) + (to.y - from.y).powi(2)).sqrt();
            let mut t = 0.0;
            while t < len {
                let phase = (travelled + t) % period;
                if phase < on {
                    let seg = (on - phase).min(len - t);
                    let (sx, sy) = (from.x + (to.x - from.x) * t / len, from.y + (to.y - from.y) * t / len);
                    let (ex, ey) = (
                        from.x + (to.x - from.x) * (t + seg) / len,
                        from.y + (to.y - from.y) * (t + seg) / len,
                    );
                    let rect = BoundingBox::new(
                        sx.min(ex) - width / 2.0,
                        sy.min(ey) - width / 2.0,
                        (ex - sx).abs() + width,
                        (ey - sy).abs() + width,
                    );
                    self.fill_where(&rect, color, |x, y| in_ring(b, width, x, y));
                    t += seg;
                } else {
                    t += period - phase;
                }
            }
            travelled += len;
        }
    }

    /// Paint `src` into `b` honouring `fit`, clipped to the rounded box.
    /// Only the source window behind the visible pixels is resampled.
    fn draw_image(&mut self, src: &DynamicImage, b: &BoundingBox, fit: ImageFit, radius: f64) {
        let (iw, ih) = (src.width() as f64, src.height() as f64);
        if iw == 0.0 || ih == 0.0 || b.w <= 0.0 || b.h <= 0.0 {
            return;
        }
        let s = match fit {
            ImageFit::Cover => (b.w / iw).max(b.h / ih),
            ImageFit::Contain => (b.w / iw).min(b.h / ih),
        };
        let dw = iw * s;
        let dh = ih * s;
        let ox = self.px(b.x + (b.w - dw) / 2.0);
        let oy = self.px(b.y + (b.h - dh) / 2.0);
        let (tw, th) = (self.px(dw), self.px(dh));
        if !(tw.is_finite() && th.is_finite() && tw > 0.0 && th > 0.0) {
            return;
        }

        let (x0, y0, x1, y1) = self.pixel_span(b);
        let vx0 = x0.max(ox.floor() as i64);
        let vy0 = y0.max(oy.floor() as i64);
        let vx1 = x1.min((ox + tw).ceil() as i64);
        let vy1 = y1.min((oy + th).ceil() as i64);
        if vx0 >= vx1 || vy0 >= vy1 {
            return;
        }

        // Source pixels per output pixel along each axis.
        let (kx, ky) = (iw / tw, ih / th);
        let sx0 = ((vx0 as f64 - ox) * kx).floor().clamp(0.0, iw - 1.0);
        let sy0 = ((vy0 as f64 - oy) * ky).floor().clamp(0.0, ih - 1.0);
        let sx1 = ((vx1 as f64 - ox) * kx).ceil().clamp(sx0 + 1.0, iw);
        let sy1 = ((vy1 as f64 - oy) * ky).ceil().clamp(sy0 + 1.0, ih);
        let window = imageops::crop_imm(
            src,
            sx0 as u32,
            sy0 as u32,
            (sx1 - sx0) as u32,
            (sy1 - sy0) as u32,
        )
        .to_image();

        // Output pixels covered by the cropped window, relative to its origin.
        let wx = (ox + sx0 / kx).round() as i64;
        let wy = (oy + sy0 / ky).round() as i64;
        let ww = ((sx1 - sx0) / kx).round().max(1.0);
        let wh = ((sy1 - sy0) / ky).round().max(1.0);
        // Extreme zoom leaves a window far larger than the visible span;
        // sample it nearest-neighbour instead of resampling it whole.
        let resampled = (ww <= 2.0 * (vx1 - vx0) as f64 + 2.0 && wh <= 2.0 * (vy1 - vy0) as f64 + 2.0)
            .then(|| imageops::resize(&window, ww as u32, wh as u32, FilterType::Triangle));

        for py in vy0..vy1 {
            for px in vx0..vx1 {
                let (cx, cy) = ((px as f64 + 0.5) / self.scale, (py as f64 + 0.5) / self.scale);
                if !in_rounded_rect(b, radius, cx, cy) {
                    continue;
                }
                let pixel = match &resampled {
                    Some(scaled) => {
                        let (sx, sy) = (px - wx, py - wy);
                        if sx < 0 || sy < 0 || sx >= scaled.width() as i64 || sy >= scaled.height() as i64 {
                            continue;
                        }
                        *scaled.get_pixel(sx as u32, sy as u32)
                    }
                    None => {
                        let sx = ((px as f64 + 0.5 - ox) * kx).floor();
                        let sy = ((py as f64 + 0.5 - oy) * ky).floor();
                        if sx < 0.0 || sy < 0.0 || sx >= iw || sy >= ih {
                            continue;
                        }
                        let lx = (sx - sx0).clamp(0.0, (window.width() - 1) as f64) as u32;
                        let ly = (sy - sy0).clamp(0.0, (window.height() - 1) as f64) as u32;
                        *window.get_pixel(lx, ly)
                    }
                };
                self.blend(px, py, pixel, 1.0);
            }
        }
    }

    fn draw_grid(&mut self) {
        let (w, h) = (self.img.width() as f64, self.img.height() as f64);
        let step = self.px(GRID_SIZE);
        if step < 1.0 {
            return;
        }
        let mut x = step;
        while x < w {
            for py in 0..self.img.height() as i64 {
                self.blend(x as i64, py, GRID_COLOR, 1.0);
            }
            x += step;
        }
        let mut y = step;
        while y < h {
            for px in 0..self.img.width() as i64 {
                self.blend(px, y as i64, GRID_COLOR, 1.0);
            }
            y += step;
        }
    }
}

fn in_ring(b: &BoundingBox, width: f64, x: f64, y: f64) -> bool {
    let outer = BoundingBox::new(b.x - width / 2.0, b.y - width / 2.0, b.w + width, b.h + width);
    let inner = BoundingBox::new(b.x + width / 2.0, b.y + width / 2.0, b.w - width, b.h - width);
    outer.contains(Point::new(x, y)) && !inner.contains(Point::new(x, y))
}

fn in_rounded_rect(b: &BoundingBox, radius: f64, x: f64, y: f64) -> bool {
    if !b.contains(Point::new(x, y)) {
        return false;
    }
    let r = radius.clamp(0.0, b.w.min(b.h) / 2.0);
    if r <= 0.0 {
        return true;
    }
    let cx = x.clamp(b.x + r, b.right() - r);
    let cy = y.clamp(b.y + r, b.bottom() - r);
    (x - cx).powi(2) + (y - cy).powi(2) <= r * r
}

fn in_polygon_even_odd(points: &[Point], x: f64, y: f64) -> bool {
    let mut inside = false;
    let mut j = points.len() - 1;
    for i in 0..points.len() {
        let (pi, pj) = (points[i], points[j]);
        if (pi.y > y) != (pj.y > y) && x < (pj.x - pi.x) * (y - pi.y) / (pj.y - pi.y) + pi.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Greedy word wrap of `text` to `max_width` canvas pixels.
fn wrap_lines(text: &str, font_size: f64, spacing: f64, max_width: f64) -> Vec<String> {
    let mut lines = vec![];
    for paragraph in text.split('\n') {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if line.is_empty() { word.to_string() } else { format!("{line} {word}") };
            if line.is_empty() || font::measure(&candidate, font_size, spacing) <= max_width {
                line = candidate;
            } else {
                lines.push(std::mem::take(&mut line));
                line = word.to_string();
            }
        }
        lines.push(line);
    }
    lines
}

struct Painter<'o> {
    canvas: Canvas,
    font: BitmapFont,
    options: &'o RenderOptions,
}

impl Painter<'_> {
    fn paint_shape(&mut self, shape: &Shape) {
        match shape {
            Shape::Rect { x, y, w, h, fill, radius } => {
                if let Some(color) = color_or_warn(fill) {
                    self.canvas.fill_rect(&BoundingBox::new(*x, *y, *w, *h), radius.unwrap_or(0.0), color);
                }
            }
            Shape::Polygon { points, fill } => {
                if let Some(color) = color_or_warn(fill) {
                    self.canvas.fill_polygon(points, color);
                }
            }
            Shape::Image { path, x, y, w, h, fit, radius } => {
                match images::load_asset(path, &self.options.assets_dir) {
                    Ok(img) => self.canvas.draw_image(
                        &img,
                        &BoundingBox::new(*x, *y, *w, *h),
                        fit.unwrap_or(ImageFit::Cover),
                        radius.unwrap_or(0.0),
                    ),
                    Err(e) => tracing::warn!(path = %path, error = %e, "image shape skipped"),
                }
            }
            Shape::DashedRect { x, y, w, h, stroke, dash, .. } => {
                if !self.options.show_guides {
                    return;
                }
                let color = parse_color(stroke).unwrap_or(GUIDE_COLOR);
                self.canvas.stroke_dashed(&BoundingBox::new(*x, *y, *w, *h), dash, color);
            }
        }
    }

    fn paint_field(&mut self, scene: &Scene<'_>, field: &FieldSpec) {
        if field.is_image_slot() {
            match scene.image_for(field).map(images::load_data_url) {
                Some(Ok(img)) => {
                    self.canvas.draw_image(&img, &field.bounds, ImageFit::Contain, 0.0);
                }
                Some(Err(e)) => tracing::warn!(key = %field.key, error = %e, "image field skipped"),
                None if self.options.show_placeholders => {
                    let label = field.label.clone().unwrap_or_else(|| field.key.clone());
                    self.paint_text(field, &label, PLACEHOLDER_OPACITY, Some(TextAlign::Center));
                }
                None => {}
            }
            return;
        }

        if field.kind == FieldKind::Icon {
            self.paint_icon(field);
            return;
        }

        let value = scene.value(&field.key);
        if !value.is_empty() {
            self.paint_text(field, value, 1.0, None);
        } else if self.options.show_placeholders {
            if let Some(placeholder) = field.placeholder.as_deref().filter(|p| !p.is_empty()) {
                self.paint_text(field, placeholder, PLACEHOLDER_OPACITY, None);
            }
        }
    }

    /// Circular badge carrying the icon's initial.
    fn paint_icon(&mut self, field: &FieldSpec) {
        let Some(icon) = field.icon_id.as_deref().and_then(icons::find) else {
            if let Some(id) = &field.icon_id {
                tracing::warn!(key = %field.key, icon = %id, "unknown icon; skipped");
            }
            return;
        };
        let b = field.bounds;
        let d = b.w.min(b.h);
        let badge = BoundingBox::new(b.x + (b.w - d) / 2.0, b.y + (b.h - d) / 2.0, d, d);
        let color = parse_color(&field.style.color).unwrap_or(ICON_BADGE_COLOR);
        self.canvas.fill_rect(&badge, d / 2.0, color);

        let initial: String = icon.name.chars().take(1).collect::<String>().to_uppercase();
        let size = d * 0.55;
        let x = badge.x + (d - font::measure(&initial, size, 0.0)) / 2.0;
        let y = badge.y + (d - font::cell_height(size)) / 2.0;
        let scale = self.canvas.scale;
        let canvas = &mut self.canvas;
        let white = Rgba([255, 255, 255, 255]);
        let clip = canvas.pixel_span(&badge);
        self.font.draw(&initial, x * scale, y * scale, size * scale, 0.0, true, clip, |px, py| {
            canvas.blend(px, py, white, 1.0);
        });
    }

    fn paint_text(&mut self, field: &FieldSpec, text: &str, opacity: f64, align: Option<TextAlign>) {
        let style = &field.style;
        let Some(mut color) = color_or_warn(&style.color) else {
            return;
        };
        let alpha = style.opacity.unwrap_or(1.0).clamp(0.0, 1.0) * opacity;
        color[3] = (color[3] as f64 * alpha).round() as u8;

        let text = if style.uppercase.unwrap_or(false) { text.to_uppercase() } else { text.to_string() };
        let size = style.font_size.max(1.0);
        let spacing = style.letter_spacing.unwrap_or(0.0);
        let b = field.bounds;

        let lines = if field.kind == FieldKind::Textarea {
            wrap_lines(&text, size, spacing, b.w)
        } else {
            vec![text.lines().next().unwrap_or("").to_string()]
        };
        let line_height = font::cell_height(size) * style.line_height.unwrap_or(DEFAULT_LINE_HEIGHT) / DEFAULT_LINE_HEIGHT;
        let block = line_height * lines.len() as f64;
        let top = b.y + (b.h - block) / 2.0;
        let align = align.or(style.align).unwrap_or(TextAlign::Left);
        let bold = style.is_bold();

        let scale = self.canvas.scale;
        let clip = self.canvas.pixel_span(&b);
        let canvas = &mut self.canvas;
        for (i, line) in lines.iter().enumerate() {
            let width = font::measure(line, size, spacing);
            let x = match align {
                TextAlign::Left => b.x,
                TextAlign::Center => b.x + (b.w - width) / 2.0,
                TextAlign::Right => b.right() - width,
            };
            let y = top + i as f64 * line_height;
            self.font.draw(line, x * scale, y * scale, size * scale, spacing * scale, bold, clip, |px, py| {
                canvas.blend(px, py, color, 1.0);
            });
        }
    }
}

/// Rasterize `scene` into an RGBA buffer.
pub fn render(scene: &Scene<'_>, options: &RenderOptions) -> Result<RgbaImage, RenderError> {
    if options.pixel_ratio == 0 || options.pixel_ratio > MAX_PIXEL_RATIO {
        return Err(RenderError::InvalidPixelRatio(options.pixel_ratio));
    }
    let template = scene.template;
    let scale = options.pixel_ratio as f64;
    let width = (CANVAS_WIDTH * scale).round() as u32;
    let height = (CANVAS_HEIGHT * scale).round() as u32;

    let background = template
        .background_color()
        .and_then(color_or_warn)
        .unwrap_or(Rgba([0, 0, 0, 0]));

    let mut painter = Painter {
        canvas: Canvas { img: RgbaImage::from_pixel(width, height, background), scale },
        font: BitmapFont::new(),
        options,
    };

    for shape in &template.shapes {
        painter.paint_shape(shape);
    }
    for field in &template.fields {
        painter.paint_field(scene, field);
    }
    if options.show_grid {
        painter.canvas.draw_grid();
    }

    tracing::debug!(template_id = %template.id, width, height, "card rendered");
    Ok(painter.canvas.img)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::{CanvasSize, TextStyle};
    use std::collections::BTreeMap;

    fn template(shapes: Vec<Shape>, fields: Vec<FieldSpec>) -> TemplateDesign {
        TemplateDesign {
            id: "t".into(),
            name: "T".into(),
            size: CanvasSize { width: 100.0, height: 50.0 },
            background: Some(crate::templates::Background { color: Some("#FFFFFF".into()) }),
            shapes,
            fields,
            defaults: BTreeMap::new(),
        }
    }

    fn text_field(key: &str) -> FieldSpec {
        FieldSpec {
            key: key.into(),
            label: None,
            bounds: BoundingBox::new(0.0, 0.0, 100.0, 50.0),
            style: TextStyle { font_size: 20.0, ..TextStyle::default() },
            placeholder: Some("Type here".into()),
            kind: FieldKind::Text,
            icon_id: None,
        }
    }

    fn ink(img: &RgbaImage) -> usize {
        img.pixels().filter(|p| p[0] < 128).count()
    }

    fn one_x() -> RenderOptions {
        RenderOptions { pixel_ratio: 1, ..RenderOptions::default() }
    }

    #[test]
    fn colours_parse() {
        assert_eq!(parse_color("#fff"), Some(Rgba([255, 255, 255, 255])));
        assert_eq!(parse_color("#1E293B"), Some(Rgba([0x1E, 0x29, 0x3B, 255])));
        assert_eq!(parse_color("rgba(0, 0, 0, 0.5)"), Some(Rgba([0, 0, 0, 128])));
        assert_eq!(parse_color("transparent"), Some(Rgba([0, 0, 0, 0])));
        assert_eq!(parse_color("#12"), None);
        assert_eq!(parse_color("chartreuse"), None);
    }

    #[test]
    fn output_is_the_card_scaled_by_pixel_ratio() {
        let t = template(vec![], vec![]);
        let img = render(&Scene::layout(&t), &RenderOptions::default()).unwrap();
        assert_eq!(img.dimensions(), (1286, 766));
        assert_eq!(render(&Scene::layout(&t), &one_x()).unwrap().dimensions(), (643, 383));
        assert_eq!(
            render(&Scene::layout(&t), &RenderOptions { pixel_ratio: 9, ..RenderOptions::default() }),
            Err(RenderError::InvalidPixelRatio(9))
        );
    }

    #[test]
    fn rect_and_polygon_fill() {
        let t = template(
            vec![
                Shape::Rect { x: 0.0, y: 0.0, w: 50.0, h: 50.0, fill: "#FF0000".into(), radius: None },
                Shape::Polygon {
                    points: vec![Point::new(50.0, 0.0), Point::new(100.0, 0.0), Point::new(100.0, 50.0)],
                    fill: "#0000FF".into(),
                },
            ],
            vec![],
        );
        let img = render(&Scene::layout(&t), &one_x()).unwrap();
        assert_eq!(*img.get_pixel(10, 10), Rgba([255, 0, 0, 255]));
        assert_eq!(*img.get_pixel(95, 5), Rgba([0, 0, 255, 255]));
        assert_eq!(*img.get_pixel(55, 45), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn rounded_corners_stay_clear() {
        let t = template(
            vec![Shape::Rect { x: 0.0, y: 0.0, w: 100.0, h: 50.0, fill: "#000000".into(), radius: Some(20.0) }],
            vec![],
        );
        let img = render(&Scene::layout(&t), &one_x()).unwrap();
        assert_eq!(*img.get_pixel(0, 0), Rgba([255, 255, 255, 255]));
        assert_eq!(*img.get_pixel(50, 25), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn guides_only_in_preview() {
        let t = template(
            vec![Shape::DashedRect {
                x: 10.0, y: 10.0, w: 60.0, h: 30.0,
                stroke: "#000000".into(), dash: vec![6.0, 6.0], radius: Some(4.0),
            }],
            vec![],
        );
        assert_eq!(ink(&render(&Scene::layout(&t), &one_x()).unwrap()), 0);
        let preview = RenderOptions { pixel_ratio: 1, ..RenderOptions::preview() };
        assert!(ink(&render(&Scene::layout(&t), &preview).unwrap()) > 0);
    }

    #[test]
    fn placeholders_only_in_preview() {
        let t = template(vec![], vec![text_field("email")]);
        assert_eq!(ink(&render(&Scene::layout(&t), &one_x()).unwrap()), 0);
        let preview = RenderOptions { pixel_ratio: 1, ..RenderOptions::preview() };
        let lit = render(&Scene::layout(&t), &preview).unwrap();
        assert!(lit.pixels().any(|p| p[0] < 255));
    }

    #[test]
    fn values_are_drawn() {
        let t = template(vec![], vec![text_field("email")]);
        let values: FieldValues = [("email".to_string(), "Hi".to_string())].into_iter().collect();
        let scene = Scene { template: &t, values: Some(&values), logo: None, picture: None };
        assert!(ink(&render(&scene, &one_x()).unwrap()) > 0);
    }

    #[test]
    fn text_is_clipped_to_its_box() {
        let mut field = text_field("email");
        field.bounds = BoundingBox::new(0.0, 0.0, 20.0, 50.0);
        let t = template(vec![], vec![field]);
        let values: FieldValues = [("email".to_string(), "WWWWWWWWWW".to_string())].into_iter().collect();
        let scene = Scene { template: &t, values: Some(&values), logo: None, picture: None };
        let img = render(&scene, &one_x()).unwrap();
        assert!(img.enumerate_pixels().filter(|(x, _, p)| *x >= 20 && p[0] < 128).count() == 0);
    }

    #[test]
    fn wrapping_breaks_on_words() {
        let lines = wrap_lines("one two three\nfour", 20.0, 0.0, 100.0);
        assert_eq!(lines, vec!["one two", "three", "four"]);
    }

    /// Writes a 4x2 image, red on the left half and blue on the right.
    fn split_asset(dir: &std::path::Path) {
        let img = RgbaImage::from_fn(4, 2, |x, _| {
            if x < 2 { Rgba([255, 0, 0, 255]) } else { Rgba([0, 0, 255, 255]) }
        });
        img.save(dir.join("split.png")).unwrap();
    }

    fn image_shape(x: f64, y: f64, w: f64, h: f64) -> Shape {
        Shape::Image { path: "/split.png".into(), x, y, w, h, fit: Some(ImageFit::Cover), radius: None }
    }

    #[test]
    fn image_shapes_are_scaled_into_their_box() {
        let dir = tempfile::tempdir().unwrap();
        split_asset(dir.path());
        let options = RenderOptions { assets_dir: dir.path().to_path_buf(), ..one_x() };

        let t = template(vec![image_shape(0.0, 0.0, 100.0, 50.0)], vec![]);
        let img = render(&Scene::layout(&t), &options).unwrap();
        assert_eq!(*img.get_pixel(10, 25), Rgba([255, 0, 0, 255]));
        assert_eq!(*img.get_pixel(90, 25), Rgba([0, 0, 255, 255]));
        assert_eq!(*img.get_pixel(150, 25), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn huge_image_shapes_only_resample_what_is_visible() {
        let dir = tempfile::tempdir().unwrap();
        split_asset(dir.path());
        let options = RenderOptions { assets_dir: dir.path().to_path_buf(), ..one_x() };

        let (cx, cy) = (CANVAS_WIDTH / 2.0, CANVAS_HEIGHT / 2.0);
        let t = template(vec![image_shape(cx - 5e5, cy - 5e5, 1e6, 1e6)], vec![]);
        let img = render(&Scene::layout(&t), &options).unwrap();
        assert_eq!(img.dimensions(), (643, 383));
        assert_eq!(*img.get_pixel(100, 100), Rgba([255, 0, 0, 255]));
        assert_eq!(*img.get_pixel(600, 300), Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn missing_image_assets_are_skipped() {
        let t = template(
            vec![Shape::Image {
                path: "/nope.png".into(), x: 0.0, y: 0.0, w: 10.0, h: 10.0, fit: None, radius: None,
            }],
            vec![],
        );
        assert!(render(&Scene::layout(&t), &one_x()).is_ok());
    }
}
