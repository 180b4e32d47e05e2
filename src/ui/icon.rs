use iced::window;
use image::{ImageBuffer, Rgba, RgbaImage};

const SIZE: u32 = 64;
const BORDER: u32 = 4;
const FROM: [u8; 3] = [0x28, 0xa7, 0x45];
const TO: [u8; 3] = [0x20, 0xc9, 0x97];

fn lerp(a: u8, b: u8, t: f32) -> u8 {
    (a as f32 + (b as f32 - a as f32) * t).round() as u8
}

/// Green diagonal gradient with a dashed white frame, like the drop overlay
pub fn render_icon() -> RgbaImage {
    ImageBuffer::from_fn(SIZE, SIZE, |x, y| {
        let on_border = x < BORDER || y < BORDER || x >= SIZE - BORDER || y >= SIZE - BORDER;
        if on_border && ((x + y) / 8) % 2 == 0 {
            return Rgba([255, 255, 255, 255]);
        }
        let t = (x + y) as f32 / (2 * (SIZE - 1)) as f32;
        Rgba([
            lerp(FROM[0], TO[0], t),
            lerp(FROM[1], TO[1], t),
            lerp(FROM[2], TO[2], t),
            255,
        ])
    })
}

pub fn window_icon() -> Option<window::Icon> {
    let rgba = render_icon();
    let (width, height) = rgba.dimensions();
    window::icon::from_rgba(rgba.into_raw(), width, height).ok()
}
