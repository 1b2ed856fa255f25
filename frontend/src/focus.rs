use web_sys::{Element, HtmlTextAreaElement};

use support_core::focus::CaretSurface;

/// The chat textarea as seen by the core's `FocusKeeper`.
///
/// Caret offsets are UTF-16 code units, like the DOM selection API.
pub struct TextareaSurface(pub HtmlTextAreaElement);

impl CaretSurface for TextareaSurface {
    fn has_focus(&self) -> bool {
        let element: &Element = self.0.as_ref();
        leptos::prelude::document()
            .active_element()
            .is_some_and(|active| &active == element)
    }

    fn caret(&self) -> Option<usize> {
        self.0
            .selection_start()
            .ok()
            .flatten()
            .map(|position| position as usize)
    }

    fn set_caret(&self, position: usize) {
        let position = position as u32;
        if let Err(err) = self.0.set_selection_range(position, position) {
            log::warn!("Could not restore caret: {err:?}");
        }
    }

    fn text_len(&self) -> usize {
        self.0.value().encode_utf16().count()
    }
}
