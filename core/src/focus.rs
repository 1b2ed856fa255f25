use std::cell::Cell;

/// A text input whose caret can be read and moved.
pub trait CaretSurface {
    fn has_focus(&self) -> bool;

    fn caret(&self) -> Option<usize>;

    fn set_caret(&self, position: usize);

    /// Length of the current value, in the same units as the caret.
    fn text_len(&self) -> usize;
}

/// Keeps the caret where the user left it across a background re-render.
///
/// [`capture`](Self::capture) before applying a polled update,
/// [`restore`](Self::restore) on the next frame. Only one caret position is
/// held per cycle and restore consumes it.
#[derive(Debug, Default)]
pub struct FocusKeeper {
    pending: Cell<Option<usize>>,
}

impl FocusKeeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capture<S: CaretSurface + ?Sized>(&self, surface: &S) -> bool {
        if self.pending.get().is_some() || !surface.has_focus() {
            return false;
        }
        match surface.caret() {
            Some(position) => {
                self.pending.set(Some(position));
                true
            }
            None => false,
        }
    }

    /// Does nothing if the user moved focus elsewhere in the meantime.
    pub fn restore<S: CaretSurface + ?Sized>(&self, surface: &S) -> bool {
        let Some(position) = self.pending.take() else {
            return false;
        };
        if !surface.has_focus() {
            return false;
        }
        let position = position.min(surface.text_len());
        if surface.caret() != Some(position) {
            surface.set_caret(position);
        }
        true
    }

    /// Drops a captured position without touching any input.
    pub fn discard(&self) {
        self.pending.take();
    }

    pub fn is_pending(&self) -> bool {
        self.pending.get().is_some()
    }
}
