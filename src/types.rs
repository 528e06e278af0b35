use crate::layout::mm_to_pt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    Landscape,
    Portrait,
}

impl Orientation {
    pub fn from_config_value(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "l" | "landscape" => Some(Orientation::Landscape),
            "p" | "portrait" => Some(Orientation::Portrait),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width_mm: f64,
    pub height_mm: f64,
}

impl PageSize {
    // A4 in millimetres, the only page the generator produces.
    pub fn a4(orientation: Orientation) -> Self {
        match orientation {
            Orientation::Landscape => Self {
                width_mm: 297.0,
                height_mm: 210.0,
            },
            Orientation::Portrait => Self {
                width_mm: 210.0,
                height_mm: 297.0,
            },
        }
    }

    pub fn width_pt(&self) -> f64 {
        mm_to_pt(self.width_mm)
    }

    pub fn height_pt(&self) -> f64 {
        mm_to_pt(self.height_mm)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };

    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Parses `#RGB` or `#RRGGBB`. Anything else is `None`; callers fall
    /// back to black.
    pub fn from_hex(raw: &str) -> Option<Self> {
        let digits = raw.trim().strip_prefix('#')?;
        if !digits.chars().all(|ch| ch.is_ascii_hexdigit()) {
            return None;
        }
        let (r, g, b) = match digits.len() {
            3 => {
                let mut it = digits.chars();
                let r = it.next()?.to_digit(16)? as u8;
                let g = it.next()?.to_digit(16)? as u8;
                let b = it.next()?.to_digit(16)? as u8;
                (r * 17, g * 17, b * 17)
            }
            6 => {
                let r = u8::from_str_radix(&digits[0..2], 16).ok()?;
                let g = u8::from_str_radix(&digits[2..4], 16).ok()?;
                let b = u8::from_str_radix(&digits[4..6], 16).ok()?;
                (r, g, b)
            }
            _ => return None,
        };
        Some(Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
        })
    }
}
