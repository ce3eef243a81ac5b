//! Layout engine: placements, the column container and the cell painter
//!
//! Every component owns a [`Placement`] (live geometry, saved geometry,
//! preferred size, visibility). Containers subscribe to their children's
//! placements and lay them out again whenever one of them changes, so layout
//! is pushed by the children rather than polled on every frame.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::Line,
};

use crate::model::{PubSub, Subscriber};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayoutEvent {
    GeometryChanged,
    PreferredSizeChanged,
    VisibilityChanged,
}

pub struct Placement {
    geometry: Cell<Rect>,
    saved: Cell<Rect>,
    /// `None` on an axis means no preference: fill what is available
    preferred: Cell<(Option<u16>, Option<u16>)>,
    visible: Cell<bool>,
    pub events: PubSub<LayoutEvent>,
}

impl Placement {
    pub fn new() -> Self {
        Self {
            geometry: Cell::new(Rect::default()),
            saved: Cell::new(Rect::default()),
            preferred: Cell::new((None, None)),
            visible: Cell::new(true),
            events: PubSub::new(),
        }
    }

    pub fn with_height(height: u16) -> Self {
        let placement = Self::new();
        placement.preferred.set((None, Some(height)));
        placement
    }

    pub fn geometry(&self) -> Rect {
        self.geometry.get()
    }

    pub fn preferred_height(&self) -> Option<u16> {
        self.preferred.get().1
    }

    #[cfg(test)]
    pub fn preferred_width(&self) -> Option<u16> {
        self.preferred.get().0
    }

    pub fn is_visible(&self) -> bool {
        self.visible.get()
    }

    pub fn set_preferred_size(&self, width: Option<u16>, height: Option<u16>) {
        if self.preferred.replace((width, height)) != (width, height) {
            self.events.notify(&LayoutEvent::PreferredSizeChanged);
        }
    }

    pub fn set_geometry(&self, rect: Rect) {
        if !self.visible.get() {
            self.saved.set(rect);
            return;
        }
        if self.geometry.replace(rect) != rect {
            self.events.notify(&LayoutEvent::GeometryChanged);
        }
    }

    /// Position set by a container. Does not notify.
    pub fn place(&self, rect: Rect) {
        if self.visible.get() {
            self.geometry.set(rect);
        } else {
            self.saved.set(rect);
        }
    }

    pub fn show(&self) {
        if !self.visible.replace(true) {
            self.geometry.set(self.saved.get());
            self.events.notify(&LayoutEvent::VisibilityChanged);
        }
    }

    pub fn hide(&self) {
        if self.visible.replace(false) {
            self.saved.set(self.geometry.get());
            self.geometry.set(Rect::default());
            self.events.notify(&LayoutEvent::VisibilityChanged);
        }
    }

    pub fn set_visible(&self, visible: bool) {
        if visible {
            self.show();
        } else {
            self.hide();
        }
    }
}

impl Default for Placement {
    fn default() -> Self {
        Self::new()
    }
}

/// Something that occupies a rectangle of the screen
pub trait Component {
    fn placement(&self) -> &Placement;

    /// One line per row, at most `height` of them. Rows are clipped to `width` when painted.
    fn render(&self, width: u16, height: u16) -> Vec<Line<'static>>;

    /// Cursor position relative to the component, when it wants one shown
    fn cursor(&self) -> Option<(u16, u16)> {
        None
    }
}

/// Render `component` into `buf` unless it is hidden
pub fn draw(component: &dyn Component, buf: &mut Buffer) {
    let placement = component.placement();
    let area = placement.geometry().intersection(*buf.area());
    if !placement.is_visible() || area.is_empty() {
        return;
    }
    let lines = component.render(area.width, area.height);
    paint(buf, area, &lines);
}

/// Write styled lines into `buf` cell by cell, clipped to `area`. The rest of
/// each row is padded with the style of its last run; rows without a line
/// are blanked.
pub fn paint(buf: &mut Buffer, area: Rect, lines: &[Line<'_>]) {
    let right = area.x.saturating_add(area.width);
    for row in 0..area.height {
        let y = area.y + row;
        let mut x = area.x;
        let mut trailing = Style::default();

        if let Some(line) = lines.get(row as usize) {
            trailing = line.style;
            'spans: for span in &line.spans {
                let style = line.style.patch(span.style);
                trailing = style;
                for c in span.content.chars() {
                    if x >= right {
                        break 'spans;
                    }
                    if let Some(cell) = buf.cell_mut((x, y)) {
                        cell.set_char(c);
                        cell.set_style(style);
                    }
                    x += 1;
                }
            }
        }

        while x < right {
            if let Some(cell) = buf.cell_mut((x, y)) {
                cell.set_char(' ');
                cell.set_style(trailing);
            }
            x += 1;
        }
    }
}

/// Vertical container: a stack at the top, one main component, a stack at the bottom.
///
/// Top children are stacked downwards from the top edge, bottom children
/// upwards from the bottom edge (first child lowest), each `max(preferred, 1)`
/// rows high. The main component gets whatever is left.
pub struct Column {
    placement: Placement,
    top: Vec<Rc<dyn Component>>,
    main: RefCell<Rc<dyn Component>>,
    bottom: Vec<Rc<dyn Component>>,
    relayout: Rc<Relayout>,
}

/// Subscription the column registers with its children
struct Relayout(Weak<Column>);

impl Column {
    pub fn new(
        top: Vec<Rc<dyn Component>>,
        main: Rc<dyn Component>,
        bottom: Vec<Rc<dyn Component>>,
    ) -> Rc<Self> {
        let column = Rc::new_cyclic(|weak| Self {
            placement: Placement::new(),
            top,
            main: RefCell::new(main),
            bottom,
            relayout: Rc::new(Relayout(weak.clone())),
        });

        column.placement.events.subscribe(&column.relayout);
        for child in column.children() {
            child.placement().events.subscribe(&column.relayout);
        }
        column
    }

    fn children(&self) -> Vec<Rc<dyn Component>> {
        let mut children = self.top.clone();
        children.push(self.main.borrow().clone());
        children.extend(self.bottom.iter().cloned());
        children
    }

    /// Swap the main component
    pub fn set_main(&self, main: Rc<dyn Component>) {
        let old = self.main.replace(main.clone());
        old.placement().events.unsubscribe(&self.relayout);
        main.placement().events.subscribe(&self.relayout);
        self.fix();
    }

    pub fn resize(&self, area: Rect) {
        self.placement.set_geometry(area);
        self.fix();
    }

    /// Lay out every visible child inside the column's geometry
    pub fn fix(&self) {
        let area = self.placement.geometry();
        let bottom_edge = area.y.saturating_add(area.height);
        let mut top_y = area.y;
        let mut bottom_y = bottom_edge;

        for child in self.top.iter().filter(|c| c.placement().is_visible()) {
            let height = child_height(child.as_ref()).min(bottom_y - top_y);
            child
                .placement()
                .place(Rect::new(area.x, top_y, area.width, height));
            top_y += height;
        }

        for child in self.bottom.iter().filter(|c| c.placement().is_visible()) {
            let height = child_height(child.as_ref()).min(bottom_y - top_y);
            bottom_y -= height;
            child
                .placement()
                .place(Rect::new(area.x, bottom_y, area.width, height));
        }

        self.main
            .borrow()
            .placement()
            .place(Rect::new(area.x, top_y, area.width, bottom_y - top_y));
    }

    /// Draw every visible child; the main component first so stacks paint over it
    pub fn draw(&self, buf: &mut Buffer) {
        draw(&**self.main.borrow(), buf);
        for child in self.top.iter().chain(self.bottom.iter()) {
            draw(child.as_ref(), buf);
        }
    }

    /// Absolute position of the first child asking for a cursor
    pub fn cursor(&self) -> Option<(u16, u16)> {
        self.children().iter().find_map(|child| {
            let placement = child.placement();
            if !placement.is_visible() {
                return None;
            }
            let area = placement.geometry();
            child
                .cursor()
                .filter(|&(x, y)| x < area.width.max(1) && y < area.height)
                .map(|(x, y)| (area.x + x, area.y + y))
        })
    }
}

fn child_height(child: &dyn Component) -> u16 {
    child.placement().preferred_height().unwrap_or(1).max(1)
}

impl Component for Column {
    fn placement(&self) -> &Placement {
        &self.placement
    }

    fn render(&self, _width: u16, _height: u16) -> Vec<Line<'static>> {
        Vec::new()
    }
}

impl Subscriber<LayoutEvent> for Relayout {
    fn on_event(&self, _event: &LayoutEvent) {
        if let Some(column) = self.0.upgrade() {
            column.fix();
        }
    }
}
