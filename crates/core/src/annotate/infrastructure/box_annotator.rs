/// Bounding-box overlay renderer.
///
/// Draws a hollow rectangle per detection plus a caption ("person #3 87%")
/// on a filled background above the box. Text uses a builtin 5x7 bitmap
/// font so no font assets ship with the binary.
use crate::annotate::domain::frame_annotator::FrameAnnotator;
use crate::shared::detection::Detection;
use crate::shared::frame::Frame;

const GLYPH_WIDTH: i64 = 6;
const GLYPH_HEIGHT: i64 = 7;
const LABEL_PAD: i64 = 2;

const LABEL_TEXT: [u8; 3] = [255, 255, 255];
const LABEL_BACKGROUND: [u8; 3] = [0, 0, 0];

/// Box colors cycled by class id, so different classes in one frame are
/// visually distinct.
const PALETTE: [[u8; 3]; 8] = [
    [56, 200, 56],
    [255, 94, 77],
    [66, 135, 245],
    [255, 193, 7],
    [171, 71, 188],
    [0, 188, 212],
    [255, 138, 101],
    [139, 195, 74],
];

pub struct BoxAnnotator {
    thickness: i64,
}

impl BoxAnnotator {
    pub fn new() -> Self {
        Self { thickness: 2 }
    }
}

impl Default for BoxAnnotator {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameAnnotator for BoxAnnotator {
    fn annotate(&self, frame: &mut Frame, detections: &[Detection]) {
        for det in detections {
            let color = PALETTE[det.class_id % PALETTE.len()];
            let x1 = det.bbox.x1.round() as i64;
            let y1 = det.bbox.y1.round() as i64;
            let x2 = det.bbox.x2.round() as i64;
            let y2 = det.bbox.y2.round() as i64;

            draw_rectangle(frame, x1, y1, x2, y2, self.thickness, color);

            let caption = det.caption();
            let text_width = caption.chars().count() as i64 * GLYPH_WIDTH;
            let label_h = GLYPH_HEIGHT + 2 * LABEL_PAD;

            // Caption sits above the box, or inside its top edge when the
            // box touches the frame top.
            let label_y = if y1 - label_h >= 0 { y1 - label_h } else { y1 };
            fill_rect(
                frame,
                x1,
                label_y,
                x1 + text_width + 2 * LABEL_PAD,
                label_y + label_h,
                LABEL_BACKGROUND,
            );
            draw_text(
                frame,
                x1 + LABEL_PAD,
                label_y + LABEL_PAD,
                &caption,
                LABEL_TEXT,
            );
        }
    }
}

fn draw_rectangle(
    frame: &mut Frame,
    x1: i64,
    y1: i64,
    x2: i64,
    y2: i64,
    thickness: i64,
    color: [u8; 3],
) {
    for t in 0..thickness {
        for x in x1..=x2 {
            frame.set_pixel(x, y1 + t, color);
            frame.set_pixel(x, y2 - t, color);
        }
        for y in y1..=y2 {
            frame.set_pixel(x1 + t, y, color);
            frame.set_pixel(x2 - t, y, color);
        }
    }
}

fn fill_rect(frame: &mut Frame, x1: i64, y1: i64, x2: i64, y2: i64, color: [u8; 3]) {
    for y in y1..y2 {
        for x in x1..x2 {
            frame.set_pixel(x, y, color);
        }
    }
}

fn draw_text(frame: &mut Frame, mut x: i64, y: i64, text: &str, color: [u8; 3]) {
    for ch in text.chars().flat_map(|c| c.to_uppercase()) {
        if let Some(glyph) = glyph_bits(ch) {
            for (row, pattern) in glyph.iter().enumerate() {
                for col in 0..5 {
                    if (pattern >> (4 - col)) & 1 == 1 {
                        frame.set_pixel(x + col, y + row as i64, color);
                    }
                }
            }
        }
        x += GLYPH_WIDTH;
    }
}

#[rustfmt::skip]
fn glyph_bits(ch: char) -> Option<[u8; 7]> {
    match ch {
        'A' => Some([0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001]),
        'B' => Some([0b11110, 0b10001, 0b10001, 0b11110, 0b10001, 0b10001, 0b11110]),
        'C' => Some([0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110]),
        'D' => Some([0b11100, 0b10010, 0b10001, 0b10001, 0b10001, 0b10010, 0b11100]),
        'E' => Some([0b11111, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000, 0b11111]),
        'F' => Some([0b11111, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000, 0b10000]),
        'G' => Some([0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01111]),
        'H' => Some([0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001]),
        'I' => Some([0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110]),
        'J' => Some([0b00111, 0b00010, 0b00010, 0b00010, 0b00010, 0b10010, 0b01100]),
        'K' => Some([0b10001, 0b10010, 0b10100, 0b11000, 0b10100, 0b10010, 0b10001]),
        'L' => Some([0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111]),
        'M' => Some([0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001]),
        'N' => Some([0b10001, 0b11001, 0b10101, 0b10101, 0b10011, 0b10001, 0b10001]),
        'O' => Some([0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110]),
        'P' => Some([0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000]),
        'Q' => Some([0b01110, 0b10001, 0b10001, 0b10001, 0b10101, 0b10010, 0b01101]),
        'R' => Some([0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001]),
        'S' => Some([0b01111, 0b10000, 0b01110, 0b00001, 0b00001, 0b10001, 0b01110]),
        'T' => Some([0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100]),
        'U' => Some([0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110]),
        'V' => Some([0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01010, 0b00100]),
        'W' => Some([0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b10101, 0b01010]),
        'X' => Some([0b10001, 0b10001, 0b01010, 0b00100, 0b01010, 0b10001, 0b10001]),
        'Y' => Some([0b10001, 0b10001, 0b01010, 0b00100, 0b00100, 0b00100, 0b00100]),
        'Z' => Some([0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b11111]),
        '0' => Some([0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110]),
        '1' => Some([0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110]),
        '2' => Some([0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111]),
        '3' => Some([0b11110, 0b00001, 0b00001, 0b01110, 0b00001, 0b00001, 0b11110]),
        '4' => Some([0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010]),
        '5' => Some([0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110]),
        '6' => Some([0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110]),
        '7' => Some([0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000]),
        '8' => Some([0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110]),
        '9' => Some([0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100]),
        '%' => Some([0b10001, 0b10010, 0b00100, 0b01000, 0b10010, 0b10001, 0b00000]),
        '#' => Some([0b01010, 0b01010, 0b11111, 0b01010, 0b11111, 0b01010, 0b01010]),
        '-' => Some([0b00000, 0b00000, 0b00000, 0b11111, 0b00000, 0b00000, 0b00000]),
        '.' => Some([0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b00110, 0b00110]),
        ' ' => Some([0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b00000]),
        _ => None,
    }
}
