use crate::types::{Color, PageSize};

/// Draw commands recorded by the renderer and replayed by a backend.
/// Coordinates are millimetres from the page's top-left corner; text anchors
/// at its baseline.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetFillColor(Color),
    SetFontSize(f64),
    DrawImage {
        x_mm: f64,
        y_mm: f64,
        width_mm: f64,
        height_mm: f64,
        source: String,
    },
    DrawText {
        x_mm: f64,
        baseline_mm: f64,
        text: String,
    },
}

#[derive(Debug, Clone)]
pub struct Page {
    pub commands: Vec<Command>,
}

impl Page {
    fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    pub page_size: PageSize,
    pub pages: Vec<Page>,
}

#[derive(Debug, Clone)]
struct GraphicsState {
    fill_color: Color,
    font_size: f64,
}

impl GraphicsState {
    fn new() -> Self {
        Self {
            fill_color: Color::BLACK,
            font_size: 12.0,
        }
    }
}

/// Records draw commands for one or more pages. State setters are deduped so
/// a backend never sees redundant color or font-size changes.
pub struct Canvas {
    page_size: PageSize,
    pages: Vec<Page>,
    current: Page,
    state: GraphicsState,
}

impl Canvas {
    pub fn new(page_size: PageSize) -> Self {
        Self {
            page_size,
            pages: Vec::new(),
            current: Page::new(),
            state: GraphicsState::new(),
        }
    }

    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    pub fn set_fill_color(&mut self, color: Color) {
        if self.state.fill_color == color {
            return;
        }
        self.state.fill_color = color;
        self.current.commands.push(Command::SetFillColor(color));
    }

    pub fn set_font_size(&mut self, size_pt: f64) {
        if self.state.font_size == size_pt {
            return;
        }
        self.state.font_size = size_pt;
        self.current.commands.push(Command::SetFontSize(size_pt));
    }

    pub fn draw_image(
        &mut self,
        x_mm: f64,
        y_mm: f64,
        width_mm: f64,
        height_mm: f64,
        source: impl Into<String>,
    ) {
        self.current.commands.push(Command::DrawImage {
            x_mm,
            y_mm,
            width_mm,
            height_mm,
            source: source.into(),
        });
    }

    pub fn draw_text(&mut self, x_mm: f64, baseline_mm: f64, text: impl Into<String>) {
        self.current.commands.push(Command::DrawText {
            x_mm,
            baseline_mm,
            text: text.into(),
        });
    }

    pub fn show_page(&mut self) {
        let finished = std::mem::replace(&mut self.current, Page::new());
        self.pages.push(finished);
        self.state = GraphicsState::new();
    }

    pub fn finish(mut self) -> Document {
        if !self.current.commands.is_empty() || self.pages.is_empty() {
            self.show_page();
        }
        Document {
            page_size: self.page_size,
            pages: self.pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Orientation;

    #[test]
    fn redundant_state_changes_are_dropped() {
        let mut canvas = Canvas::new(PageSize::a4(Orientation::Landscape));
        canvas.set_font_size(32.0);
        canvas.set_font_size(32.0);
        canvas.set_fill_color(Color::BLACK);
        canvas.draw_text(10.0, 100.0, "Ada");
        let document = canvas.finish();
        // BLACK is the initial state, so only the font size and the text
        // survive.
        assert_eq!(document.pages.len(), 1);
        assert_eq!(document.pages[0].commands.len(), 2);
    }

    #[test]
    fn finish_flushes_the_open_page() {
        let mut canvas = Canvas::new(PageSize::a4(Orientation::Portrait));
        canvas.draw_text(5.0, 50.0, "line");
        let document = canvas.finish();
        assert_eq!(document.pages.len(), 1);
        assert_eq!(document.page_size.width_mm, 210.0);
    }

    #[test]
    fn empty_canvas_still_yields_one_page() {
        let canvas = Canvas::new(PageSize::a4(Orientation::Landscape));
        let document = canvas.finish();
        assert_eq!(document.pages.len(), 1);
        assert!(document.pages[0].commands.is_empty());
    }
}
