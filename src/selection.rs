use crate::{
    catalog::MatchCatalog,
    model::Match,
};

/// Tracks which match is active and whether the bet form may be shown.
///
/// The coordinator stores any id it is given; refusing selection while
/// signed out is the UI's job. Visibility still requires a session, so a
/// programmatic selection never exposes the form.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectionCoordinator {
    selected: Option<String>,
    signed_in: bool,
}

impl SelectionCoordinator {
    pub fn new(signed_in: bool) -> Self {
        Self {
            selected: None,
            signed_in,
        }
    }

    /// Returns true when the selection actually changed.
    pub fn select(&mut self, match_id: impl Into<String>) -> bool {
        let match_id = match_id.into();
        if self.selected.as_deref() == Some(match_id.as_str()) {
            return false;
        }
        self.selected = Some(match_id);
        true
    }

    pub fn clear(&mut self) -> bool {
        self.selected.take().is_some()
    }

    /// Signing out drops the selection too. Returns true if it was dropped.
    pub fn set_signed_in(&mut self, signed_in: bool) -> bool {
        self.signed_in = signed_in;
        if !signed_in {
            return self.clear();
        }
        false
    }

    pub fn is_signed_in(&self) -> bool {
        self.signed_in
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selection_enabled(&self) -> bool {
        self.signed_in
    }

    pub fn is_form_visible(&self) -> bool {
        self.signed_in && self.selected.is_some()
    }

    /// The selected match, resolved against the current snapshot. The id
    /// survives refetches even if the match is briefly missing.
    pub fn active_match<'a>(&self, catalog: &'a MatchCatalog) -> Option<&'a Match> {
        self.selected.as_deref().and_then(|id| catalog.get(id))
    }
}
