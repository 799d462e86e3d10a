//! Page surface abstraction
//!
//! The catalog page is reached only through [`PageSurface`]: it enumerates
//! title elements and receives annotations. Elements are identified by an
//! [`ElementToken`] that stays stable for the element's lifetime; a node
//! removed and re-added by the page gets a new token.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

/// Stable per-element identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementToken(Uuid);

impl ElementToken {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ElementToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ElementToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A title element as seen on the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageElement {
    pub token: ElementToken,
    /// Display text, e.g. `"Inception (2010)"`
    pub text: String,
}

impl PageElement {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            token: ElementToken::new(),
            text: text.into(),
        }
    }
}

/// Presentation applied to an element
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotation {
    /// Any provider intersects the target set
    pub available: bool,
    pub providers: Vec<String>,
    pub opacity: f32,
    pub fade: bool,
}

impl Annotation {
    /// Opacity the element should be rendered with
    pub fn effective_opacity(&self) -> f32 {
        if !self.available && self.fade {
            self.opacity
        } else {
            1.0
        }
    }
}

/// Change notifications from the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    /// Nodes appended to the page
    Added(Vec<PageElement>),
    /// The page navigated; every previous element is gone
    Navigated,
}

/// Access to the catalog page
pub trait PageSurface: Send + Sync {
    /// All title elements currently on the page
    fn candidates(&self) -> Vec<PageElement>;

    /// Apply (or replace) the presentation of one element
    fn annotate(&self, token: ElementToken, annotation: &Annotation);
}

/// In-memory page holding a list of elements and the annotations they received
///
/// Only the latest annotation per element is kept, with a count of how many
/// times the element was annotated.
#[derive(Default)]
pub struct SnapshotPage {
    elements: Mutex<Vec<PageElement>>,
    annotations: Mutex<HashMap<ElementToken, (Annotation, usize)>>,
}

impl SnapshotPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_titles<I, S>(titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let page = Self::new();
        for title in titles {
            page.append(title);
        }
        page
    }

    /// Append an element and return it (for mutation events)
    pub fn append(&self, text: impl Into<String>) -> PageElement {
        let element = PageElement::new(text);
        lock(&self.elements).push(element.clone());
        element
    }

    /// Latest annotation for an element
    pub fn annotation(&self, token: ElementToken) -> Option<Annotation> {
        lock(&self.annotations).get(&token).map(|(a, _)| a.clone())
    }

    /// How many times an element was annotated
    pub fn annotation_count(&self, token: ElementToken) -> usize {
        lock(&self.annotations).get(&token).map_or(0, |(_, n)| *n)
    }

    /// Latest annotation per element
    pub fn latest_annotations(&self) -> HashMap<ElementToken, Annotation> {
        lock(&self.annotations)
            .iter()
            .map(|(token, (a, _))| (*token, a.clone()))
            .collect()
    }
}

impl PageSurface for SnapshotPage {
    fn candidates(&self) -> Vec<PageElement> {
        lock(&self.elements).clone()
    }

    fn annotate(&self, token: ElementToken, annotation: &Annotation) {
        let mut annotations = lock(&self.annotations);
        let count = annotations.get(&token).map_or(0, |(_, n)| *n);
        annotations.insert(token, (annotation.clone(), count + 1));
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
