//! Study cells: the ordered steps a group of subjects goes through in one
//! epoch of an arm

use super::element::{Element, NonTreatmentType, Treatment};
use super::DesignError;

/// One position of a cell: a single element or a set of concomitant
/// treatments given together
#[derive(Debug, Clone, PartialEq)]
pub enum CellItem {
    /// One element
    Single(Element),
    /// Treatments of equal duration given at once
    Concomitant(Vec<Treatment>),
}

impl CellItem {
    /// Elements of this position, treatments of a concomitant set included
    pub fn elements(&self) -> Vec<Element> {
        match self {
            CellItem::Single(element) => vec![element.clone()],
            CellItem::Concomitant(set) => set.iter().cloned().map(Element::Treatment).collect(),
        }
    }

    fn is(&self, kind: NonTreatmentType) -> bool {
        matches!(self, CellItem::Single(element) if element.is(kind))
    }

    fn is_non_treatment(&self) -> bool {
        matches!(self, CellItem::Single(Element::NonTreatment(_)))
    }
}

/// A named ordered sequence of elements
///
/// Screens, run-ins and follow-ups always stand alone in their cell.
#[derive(Debug, Clone, PartialEq)]
pub struct StudyCell {
    /// Name, unique within an arm
    pub name: String,
    items: Vec<CellItem>,
}

const SINGLETON_KINDS: [NonTreatmentType; 3] = [
    NonTreatmentType::Screen,
    NonTreatmentType::RunIn,
    NonTreatmentType::FollowUp,
];

impl StudyCell {
    /// Create an empty cell
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            items: Vec::new(),
        }
    }

    /// Build a cell from a sequence of elements appended in order
    pub fn with_elements(
        name: &str,
        elements: impl IntoIterator<Item = Element>,
    ) -> Result<Self, DesignError> {
        let mut cell = Self::new(name);
        for element in elements {
            cell.insert_element(element, None)?;
        }
        Ok(cell)
    }

    /// Positions of the cell in order
    pub fn items(&self) -> &[CellItem] {
        &self.items
    }

    /// Whether the cell holds no element
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Every element in order, concomitant sets flattened
    pub fn elements(&self) -> Vec<Element> {
        self.items.iter().flat_map(CellItem::elements).collect()
    }

    /// Whether any position is a period of the given kind
    pub fn contains(&self, kind: NonTreatmentType) -> bool {
        self.items.iter().any(|item| item.is(kind))
    }

    /// Whether any element is a treatment
    pub fn has_treatments(&self) -> bool {
        self.elements().iter().any(Element::is_treatment)
    }

    /// The first position of the cell
    pub fn first_item(&self) -> Option<&CellItem> {
        self.items.first()
    }

    /// The last position of the cell
    pub fn last_item(&self) -> Option<&CellItem> {
        self.items.last()
    }

    /// Whether the cell ends with a period of the given kind
    pub fn ends_with(&self, kind: NonTreatmentType) -> bool {
        self.last_item().is_some_and(|item| item.is(kind))
    }

    fn is_closed(&self) -> bool {
        SINGLETON_KINDS.iter().any(|&kind| self.contains(kind))
    }

    /// Insert an element at `index`, or append it when `index` is `None`
    pub fn insert_element(
        &mut self,
        element: Element,
        index: Option<usize>,
    ) -> Result<(), DesignError> {
        let index = index.unwrap_or(self.items.len());
        if index > self.items.len() {
            return Err(DesignError::CellRule(format!(
                "position {} is past the end of cell {}",
                index, self.name
            )));
        }
        if let Some(kind) = element.non_treatment_type() {
            if SINGLETON_KINDS.contains(&kind) && !self.is_empty() {
                return Err(DesignError::CellRule(format!(
                    "a {} must be the only element of its cell, {} is not empty",
                    kind, self.name
                )));
            }
        }
        if self.is_closed() {
            return Err(DesignError::CellRule(format!(
                "cell {} holds a screen, run-in or follow-up and accepts nothing else",
                self.name
            )));
        }
        if element.is(NonTreatmentType::Washout) {
            let before = index.checked_sub(1).and_then(|i| self.items.get(i));
            let after = self.items.get(index);
            if [before, after]
                .into_iter()
                .flatten()
                .any(|item| item.is(NonTreatmentType::Washout))
            {
                return Err(DesignError::CellRule(format!(
                    "a washout cannot sit next to another washout in cell {}",
                    self.name
                )));
            }
        }
        self.items.insert(index, CellItem::Single(element));
        Ok(())
    }

    /// Append a set of treatments given together
    ///
    /// The treatments must agree on their duration.
    pub fn insert_concomitant(&mut self, treatments: Vec<Treatment>) -> Result<(), DesignError> {
        if treatments.is_empty() {
            return Err(DesignError::CellRule(
                "a concomitant set needs at least one treatment".to_string(),
            ));
        }
        if self.is_closed() {
            return Err(DesignError::CellRule(format!(
                "cell {} holds a screen, run-in or follow-up and accepts nothing else",
                self.name
            )));
        }
        let first = treatments[0].duration();
        if treatments.iter().any(|t| t.duration() != first) {
            return Err(DesignError::CellRule(format!(
                "concomitant treatments in cell {} must share the same duration",
                self.name
            )));
        }
        self.items.push(CellItem::Concomitant(treatments));
        Ok(())
    }

    /// Whether the cell ends with a period other than a treatment
    pub(crate) fn ends_with_non_treatment(&self) -> bool {
        self.last_item().is_some_and(CellItem::is_non_treatment)
    }

    /// Whether the cell starts with a period of the given kind
    pub(crate) fn starts_with(&self, kind: NonTreatmentType) -> bool {
        self.first_item().is_some_and(|item| item.is(kind))
    }
}
