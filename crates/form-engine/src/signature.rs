//! Freehand signature capture on a fixed-resolution raster surface.
//!
//! Pointer positions arrive in display coordinates (the size the host lays
//! the surface out at) and are scaled to the backing resolution before any
//! ink is laid down, so a signature looks the same however it was displayed.

use std::io::Cursor;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, warn};

use crate::config::CanvasConfig;
use crate::error::SignatureError;
use crate::value::SignatureStore;

pub const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

const WHITE: [u8; 4] = [255, 255, 255, 255];
const INK: [u8; 4] = [0, 0, 0, 255];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Where the surface sits on screen and how large it is displayed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl DisplayRect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SignaturePad {
    field_key: String,
    width: u32,
    height: u32,
    stroke_width: f32,
    pixels: Vec<u8>,
    display: DisplayRect,
    pen: Option<Point>,
    has_ink: bool,
    read_only: bool,
}

impl SignaturePad {
    /// Opens a blank white surface for `field_key`, then draws `prior` onto it
    /// when one is given. An undecodable prior image leaves the surface blank.
    pub fn open(field_key: impl Into<String>, canvas: &CanvasConfig, prior: Option<&str>) -> Self {
        let mut pad = Self {
            field_key: field_key.into(),
            width: canvas.width,
            height: canvas.height,
            stroke_width: canvas.stroke_width,
            pixels: Vec::new(),
            display: DisplayRect::new(0.0, 0.0, canvas.width as f32, canvas.height as f32),
            pen: None,
            has_ink: false,
            read_only: false,
        };
        pad.fill_white();
        if let Some(payload) = prior {
            match pad.load(payload) {
                Ok(()) => pad.has_ink = true,
                Err(error) => {
                    warn!(field = %pad.field_key, %error, "discarding unreadable signature image");
                }
            }
        }
        debug!(field = %pad.field_key, width = pad.width, height = pad.height, "opened signature pad");
        pad
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
        self.pen = None;
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn field_key(&self) -> &str {
        &self.field_key
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// True until a stroke is drawn or a prior image is loaded.
    pub fn is_blank(&self) -> bool {
        !self.has_ink
    }

    pub fn is_drawing(&self) -> bool {
        self.pen.is_some()
    }

    /// Updates the on-screen placement used to scale pointer positions.
    pub fn set_display_rect(&mut self, display: DisplayRect) {
        self.display = display;
    }

    /// Maps a display-space pointer position to backing coordinates.
    pub fn to_backing(&self, client: Point) -> Point {
        let scale_x = scale(self.width, self.display.width);
        let scale_y = scale(self.height, self.display.height);
        Point::new(
            (client.x - self.display.left) * scale_x,
            (client.y - self.display.top) * scale_y,
        )
    }

    pub fn pointer_down(&mut self, client: Point) -> Result<(), SignatureError> {
        self.ensure_writable()?;
        self.pen = Some(self.to_backing(client));
        Ok(())
    }

    /// Extends the current stroke; ignored while the pointer is up.
    pub fn pointer_move(&mut self, client: Point) -> Result<(), SignatureError> {
        self.ensure_writable()?;
        let Some(from) = self.pen else {
            return Ok(());
        };
        let to = self.to_backing(client);
        self.stroke(from, to);
        self.pen = Some(to);
        Ok(())
    }

    /// Ends the current stroke. Ink already laid down stays.
    pub fn pointer_up(&mut self) {
        self.pen = None;
    }

    /// Draws one continuous stroke through `points` (display coordinates).
    pub fn draw(&mut self, points: &[Point]) -> Result<(), SignatureError> {
        let Some((first, rest)) = points.split_first() else {
            return Ok(());
        };
        self.pointer_down(*first)?;
        for point in rest {
            self.pointer_move(*point)?;
        }
        self.pointer_up();
        Ok(())
    }

    /// Resets to a blank white surface, discarding unsaved strokes.
    pub fn clear(&mut self) -> Result<(), SignatureError> {
        self.ensure_writable()?;
        self.fill_white();
        self.pen = None;
        self.has_ink = false;
        Ok(())
    }

    /// RGBA of one backing pixel.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = self.offset(x, y);
        let mut rgba = [0u8; 4];
        rgba.copy_from_slice(&self.pixels[offset..offset + 4]);
        Some(rgba)
    }

    /// Rasterizes the surface as a PNG data URL.
    pub fn encode(&self) -> Result<String, SignatureError> {
        let mut bytes = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut bytes, self.width, self.height);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header()?;
            writer.write_image_data(&self.pixels)?;
            writer.finish()?;
        }
        Ok(format!("{PNG_DATA_URL_PREFIX}{}", STANDARD.encode(bytes)))
    }

    /// Commits the surface to `store` under this pad's field key and closes it.
    pub fn save(self, store: &mut SignatureStore) -> Result<String, SignatureError> {
        self.ensure_writable()?;
        let payload = self.encode()?;
        store.insert(self.field_key.clone(), payload.clone());
        debug!(field = %self.field_key, bytes = payload.len(), "saved signature");
        Ok(payload)
    }

    fn ensure_writable(&self) -> Result<(), SignatureError> {
        if self.read_only {
            Err(SignatureError::ReadOnly)
        } else {
            Ok(())
        }
    }

    fn fill_white(&mut self) {
        self.pixels = WHITE.repeat((self.width * self.height) as usize);
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        ((y * self.width + x) * 4) as usize
    }

    fn stroke(&mut self, from: Point, to: Point) {
        let dx = to.x - from.x;
        let dy = to.y - from.y;
        let length = (dx * dx + dy * dy).sqrt();
        let steps = (length / 0.5).ceil().max(1.0) as u32;
        for step in 0..=steps {
            let t = step as f32 / steps as f32;
            self.stamp(Point::new(from.x + dx * t, from.y + dy * t));
        }
        self.has_ink = true;
    }

    /// Paints a round pen tip centred on `center`.
    fn stamp(&mut self, center: Point) {
        let radius = self.stroke_width / 2.0;
        let min_x = (center.x - radius).floor().max(0.0) as i64;
        let min_y = (center.y - radius).floor().max(0.0) as i64;
        let max_x = (center.x + radius).ceil().min(self.width as f32 - 1.0) as i64;
        let max_y = (center.y + radius).ceil().min(self.height as f32 - 1.0) as i64;
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let distance_x = x as f32 + 0.5 - center.x;
                let distance_y = y as f32 + 0.5 - center.y;
                if distance_x * distance_x + distance_y * distance_y <= radius * radius {
                    self.put(x, y, INK);
                }
            }
        }
        self.put(center.x.floor() as i64, center.y.floor() as i64, INK);
    }

    fn put(&mut self, x: i64, y: i64, rgba: [u8; 4]) {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return;
        }
        let offset = self.offset(x as u32, y as u32);
        self.pixels[offset..offset + 4].copy_from_slice(&rgba);
    }

    /// Composites a PNG data URL onto the surface at the origin, clipped.
    fn load(&mut self, payload: &str) -> Result<(), SignatureError> {
        let encoded = payload
            .strip_prefix(PNG_DATA_URL_PREFIX)
            .ok_or(SignatureError::InvalidDataUrl)?;
        let bytes = STANDARD.decode(encoded.trim())?;

        let mut decoder = png::Decoder::new(Cursor::new(bytes));
        decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
        let mut reader = decoder.read_info()?;
        let mut buffer = vec![0; reader.output_buffer_size()];
        let info = reader.next_frame(&mut buffer)?;
        if info.bit_depth != png::BitDepth::Eight {
            return Err(SignatureError::UnsupportedLayout);
        }
        let channels = match info.color_type {
            png::ColorType::Grayscale => 1,
            png::ColorType::GrayscaleAlpha => 2,
            png::ColorType::Rgb => 3,
            png::ColorType::Rgba => 4,
            png::ColorType::Indexed => return Err(SignatureError::UnsupportedLayout),
        };

        for y in 0..info.height.min(self.height) {
            let row = &buffer[y as usize * info.line_size..];
            for x in 0..info.width.min(self.width) {
                let source = &row[x as usize * channels..x as usize * channels + channels];
                let (rgb, alpha) = match channels {
                    1 => ([source[0]; 3], 255),
                    2 => ([source[0]; 3], source[1]),
                    3 => ([source[0], source[1], source[2]], 255),
                    _ => ([source[0], source[1], source[2]], source[3]),
                };
                let offset = self.offset(x, y);
                for channel in 0..3 {
                    let under = u32::from(self.pixels[offset + channel]);
                    let over = u32::from(rgb[channel]);
                    let alpha = u32::from(alpha);
                    self.pixels[offset + channel] = ((over * alpha + under * (255 - alpha)) / 255) as u8;
                }
                self.pixels[offset + 3] = 255;
            }
        }
        Ok(())
    }
}

fn scale(backing: u32, displayed: f32) -> f32 {
    if displayed > 0.0 {
        backing as f32 / displayed
    } else {
        1.0
    }
}
