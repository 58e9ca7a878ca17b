use std::borrow::Cow;

use crate::ui::style::TextStyle;

use super::{BoxConfig, Element, ElementId, ElementKind, Layout, LayoutError, LayoutState, Vector2};

const ROOT_SEED: &str = "__root__";

/// Declares the element tree of one frame.
///
/// Boxes are opened and closed in strict nesting order; text runs are leaves
/// of the currently open box. Reads of previous-frame state (hover, scroll
/// offsets) go through the borrowed [`LayoutState`].
pub struct LayoutBuilder<'a, 's> {
    state: &'s LayoutState,
    elements: Vec<Element<'a>>,
    open: Vec<usize>,
    error: Option<LayoutError>,
}

impl<'a, 's> LayoutBuilder<'a, 's> {
    pub fn new(state: &'s LayoutState) -> Self {
        Self {
            state,
            elements: Vec::new(),
            open: Vec::new(),
            error: None,
        }
    }

    pub const fn state(&self) -> &LayoutState {
        self.state
    }

    /// Id the next opened (unnamed) element will get.
    pub fn next_id(&self) -> ElementId {
        match self.open.last() {
            Some(&parent) => ElementId::child(
                self.elements[parent].id,
                self.elements[parent].children.len(),
            ),
            None => ElementId::named(ROOT_SEED),
        }
    }

    /// Id of the innermost open element.
    pub fn current_id(&self) -> Option<ElementId> {
        self.open.last().map(|&index| self.elements[index].id)
    }

    /// Whether the pointer was over `id` at the end of the previous frame.
    pub fn is_hovered(&self, id: ElementId) -> bool {
        self.state.is_hovered(id)
    }

    /// Whether the pointer is over the innermost open element.
    pub fn hovered(&self) -> bool {
        self.current_id().is_some_and(|id| self.state.is_hovered(id))
    }

    /// Scroll offset of the innermost open element.
    pub fn scroll_offset(&self) -> Vector2 {
        self.current_id()
            .map_or(Vector2::ZERO, |id| self.state.scroll_offset(id))
    }

    pub fn open(&mut self, config: BoxConfig) {
        let id = self.next_id();
        self.push_box(id, config);
    }

    pub fn open_named(&mut self, name: &str, config: BoxConfig) {
        self.push_box(ElementId::named(name), config);
    }

    pub fn close(&mut self) {
        if self.open.pop().is_none() {
            self.record(LayoutError::UnbalancedClose);
        }
    }

    /// Open a box, run `children`, close it.
    pub fn with_box(&mut self, config: BoxConfig, children: impl FnOnce(&mut Self)) {
        self.open(config);
        children(self);
        self.close();
    }

    pub fn with_named_box(
        &mut self,
        name: &str,
        config: BoxConfig,
        children: impl FnOnce(&mut Self),
    ) {
        self.open_named(name, config);
        children(self);
        self.close();
    }

    /// Declare a text run inside the innermost open box.
    pub fn text(&mut self, text: impl Into<Cow<'a, str>>, style: TextStyle) {
        let Some(&parent) = self.open.last() else {
            self.record(LayoutError::TextOutsideElement);
            return;
        };
        let id = ElementId::child(self.elements[parent].id, self.elements[parent].children.len());
        let index = self.elements.len();
        self.elements.push(Element {
            id,
            parent: Some(parent),
            children: Vec::new(),
            kind: ElementKind::Text {
                text: text.into(),
                style,
            },
        });
        self.elements[parent].children.push(index);
    }

    /// Finish the frame's declarations.
    ///
    /// # Errors
    ///
    /// Returns the first structural error recorded while declaring, an error
    /// for boxes left open, or a capacity error when the frame declared more
    /// elements than the state allows.
    pub fn finish(self) -> Result<Layout<'a>, LayoutError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        if !self.open.is_empty() {
            return Err(LayoutError::UnclosedElements {
                open: self.open.len(),
            });
        }
        let capacity = self.state.max_elements();
        if self.elements.len() > capacity {
            return Err(LayoutError::ElementCapacityExceeded { capacity });
        }
        Ok(Layout {
            elements: self.elements,
        })
    }

    fn push_box(&mut self, id: ElementId, mut config: BoxConfig) {
        if let Some(clip) = config.clip.as_mut() {
            clip.child_offset = self.state.scroll_offset(id);
        }
        let index = self.elements.len();
        let parent = self.open.last().copied();
        self.elements.push(Element {
            id,
            parent,
            children: Vec::new(),
            kind: ElementKind::Box(config),
        });
        match parent {
            Some(parent) => self.elements[parent].children.push(index),
            None if index != 0 => self.record(LayoutError::MultipleRoots),
            None => {}
        }
        self.open.push(index);
    }

    fn record(&mut self, err: LayoutError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }
}
