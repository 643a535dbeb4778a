//! In-memory browser for page-object tests.

use super::driver::{BrowserDriver, DriverError, DriverResult, Selector};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

type ClickHandler = Arc<dyn Fn(&FakeDriver) + Send + Sync>;

#[derive(Debug, Clone)]
struct FakeElement {
    text: String,
    displayed: bool,
    count: usize,
    value: String,
}

#[derive(Default)]
struct FakeState {
    url: String,
    elements: HashMap<String, FakeElement>,
    handlers: HashMap<String, ClickHandler>,
    actions: Vec<String>,
}

/// Scripted browser: elements are keyed by selector, clicks run handlers.
#[derive(Clone, Default)]
pub(crate) struct FakeDriver {
    state: Arc<Mutex<FakeState>>,
}

impl FakeDriver {
    pub(crate) fn new(url: &str) -> Self {
        let driver = Self::default();
        driver.set_url(url);
        driver
    }

    pub(crate) fn set_url(&self, url: &str) {
        self.state.lock().unwrap().url = url.to_string();
    }

    /// Add (or replace) a visible element with `text`
    pub(crate) fn put(&self, selector: &Selector, text: &str) {
        self.put_many(selector, text, 1);
    }

    pub(crate) fn put_many(&self, selector: &Selector, text: &str, count: usize) {
        self.state.lock().unwrap().elements.insert(
            selector.to_string(),
            FakeElement {
                text: text.to_string(),
                displayed: true,
                count,
                value: String::new(),
            },
        );
    }

    pub(crate) fn set_text(&self, selector: &Selector, text: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(element) = state.elements.get_mut(&selector.to_string()) {
            element.text = text.to_string();
        }
    }

    pub(crate) fn remove(&self, selector: &Selector) {
        self.state
            .lock()
            .unwrap()
            .elements
            .remove(&selector.to_string());
    }

    pub(crate) fn value(&self, selector: &Selector) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .elements
            .get(&selector.to_string())
            .map(|e| e.value.clone())
    }

    pub(crate) fn actions(&self) -> Vec<String> {
        self.state.lock().unwrap().actions.clone()
    }

    pub(crate) fn on_click(&self, selector: &Selector, handler: impl Fn(&Self) + Send + Sync + 'static) {
        self.state
            .lock()
            .unwrap()
            .handlers
            .insert(selector.to_string(), Arc::new(handler));
    }

    fn element(&self, selector: &Selector) -> Option<FakeElement> {
        self.state
            .lock()
            .unwrap()
            .elements
            .get(&selector.to_string())
            .cloned()
    }
}

#[async_trait]
impl BrowserDriver for FakeDriver {
    async fn goto(&self, url: &str) -> DriverResult<()> {
        let mut state = self.state.lock().unwrap();
        state.actions.push(format!("goto {url}"));
        state.url = url.to_string();
        Ok(())
    }

    async fn current_url(&self) -> DriverResult<String> {
        Ok(self.state.lock().unwrap().url.clone())
    }

    async fn click(&self, selector: &Selector) -> DriverResult<()> {
        let handler = {
            let mut state = self.state.lock().unwrap();
            if !state.elements.contains_key(&selector.to_string()) {
                return Err(DriverError::not_found(selector));
            }
            state.actions.push(format!("click {selector}"));
            state.handlers.get(&selector.to_string()).cloned()
        };
        if let Some(handler) = handler {
            handler(self);
        }
        Ok(())
    }

    async fn fill(&self, selector: &Selector, text: &str) -> DriverResult<()> {
        let mut state = self.state.lock().unwrap();
        state.actions.push(format!("fill {selector}"));
        let element = state
            .elements
            .get_mut(&selector.to_string())
            .ok_or_else(|| DriverError::not_found(selector))?;
        element.value = text.to_string();
        Ok(())
    }

    async fn text(&self, selector: &Selector) -> DriverResult<String> {
        self.element(selector)
            .map(|e| e.text)
            .ok_or_else(|| DriverError::not_found(selector))
    }

    async fn count(&self, selector: &Selector) -> DriverResult<usize> {
        Ok(self.element(selector).map_or(0, |e| e.count))
    }

    async fn is_displayed(&self, selector: &Selector) -> DriverResult<bool> {
        Ok(self.element(selector).is_some_and(|e| e.displayed))
    }
}
