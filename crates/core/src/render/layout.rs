//! Page geometry and the cursor-threaded canvas.
//!
//! All coordinates are in points with the origin at the top-left corner of the page and `y`
//! growing downwards. The PDF painter flips them to PDF user space.

use super::style::{Rgb, Theme};
use super::{Element, Page};

pub const PAGE_WIDTH: f32 = 595.28;
pub const PAGE_HEIGHT: f32 = 841.89;
pub const MARGIN: f32 = 50.0;
pub const CONTENT_LEFT: f32 = MARGIN;
pub const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;
pub const CONTENT_RIGHT: f32 = CONTENT_LEFT + CONTENT_WIDTH;

/// Inset of the decorative border drawn on every page.
pub const BORDER_INSET: f32 = 20.0;
pub const BORDER_WIDTH: f32 = 1.5;

/// Where the cursor starts on continuation pages.
pub const TOP_MARGIN: f32 = 50.0;
/// Content must end above this line; the footer lives below it.
pub const SAFE_BOTTOM: f32 = PAGE_HEIGHT - 80.0;

pub const SECTION_GAP: f32 = 15.0;

/// Vertical position threaded through the section renderers.
///
/// Each section takes the context by value and returns the context for the next section.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutContext {
    pub cursor: f32,
    pub page: usize,
}

impl LayoutContext {
    pub fn advance(self, by: f32) -> Self {
        Self {
            cursor: self.cursor + by,
            ..self
        }
    }

    pub fn fits(&self, height: f32) -> bool {
        self.cursor + height <= SAFE_BOTTOM
    }
}

/// Collects elements page by page.
pub struct Canvas {
    pages: Vec<Page>,
    border: Rgb,
}

impl Canvas {
    pub fn new(theme: &Theme) -> Self {
        let mut canvas = Self {
            pages: Vec::new(),
            border: theme.primary,
        };
        canvas.open_page();
        canvas
    }

    /// Context for the first page, before any section has been drawn.
    pub fn start(&self) -> LayoutContext {
        LayoutContext {
            cursor: BORDER_INSET,
            page: 0,
        }
    }

    pub fn push(&mut self, ctx: LayoutContext, element: Element) {
        if let Some(page) = self.pages.get_mut(ctx.page) {
            page.elements.push(element);
        }
    }

    /// Start a new page with its border and return a context at the top of it.
    pub fn new_page(&mut self) -> LayoutContext {
        self.open_page();
        LayoutContext {
            cursor: TOP_MARGIN,
            page: self.pages.len() - 1,
        }
    }

    /// Move to a new page unless `height` still fits below the cursor.
    pub fn ensure_space(&mut self, ctx: LayoutContext, height: f32) -> LayoutContext {
        if ctx.fits(height) {
            ctx
        } else {
            self.new_page()
        }
    }

    pub fn last_page(&self) -> usize {
        self.pages.len() - 1
    }

    pub fn into_pages(self) -> Vec<Page> {
        self.pages
    }

    fn open_page(&mut self) {
        let mut page = Page::default();
        page.elements.push(Element::Rect {
            x: BORDER_INSET,
            y: BORDER_INSET,
            w: PAGE_WIDTH - 2.0 * BORDER_INSET,
            h: PAGE_HEIGHT - 2.0 * BORDER_INSET,
            fill: None,
            stroke: Some((self.border, BORDER_WIDTH)),
        });
        self.pages.push(page);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn theme() -> Theme {
        Theme::from_primary(None)
    }

    #[test]
    fn test_new_pages_carry_a_border() {
        let mut canvas = Canvas::new(&theme());
        let ctx = canvas.new_page();

        assert_eq!(ctx, LayoutContext { cursor: TOP_MARGIN, page: 1 });
        let pages = canvas.into_pages();
        assert_eq!(pages.len(), 2);
        for page in &pages {
            assert!(matches!(
                page.elements.first(),
                Some(Element::Rect { fill: None, stroke: Some(_), .. })
            ));
        }
    }

    #[test]
    fn test_ensure_space_breaks_only_when_needed() {
        let mut canvas = Canvas::new(&theme());
        let near_top = LayoutContext { cursor: 100.0, page: 0 };
        assert_eq!(canvas.ensure_space(near_top, 200.0), near_top);

        let near_bottom = LayoutContext { cursor: SAFE_BOTTOM - 10.0, page: 0 };
        let moved = canvas.ensure_space(near_bottom, 50.0);
        assert_eq!(moved.page, 1);
        assert_eq!(moved.cursor, TOP_MARGIN);
    }
}
