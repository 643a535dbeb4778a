//! Product listing with the cart badge.

use super::driver::{BrowserDriver, DriverError, DriverResult, Selector};
use super::PageObject;
use crate::sequence::{Sequencer, StepResult};
use async_trait::async_trait;
use std::sync::Arc;

/// `/products`
#[derive(Clone)]
pub struct ProductListPage {
    driver: Arc<dyn BrowserDriver>,
    base_url: String,
    sequencer: Sequencer,
}

impl std::fmt::Debug for ProductListPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProductListPage")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ProductListPage {
    /// Page path
    pub const PATH: &'static str = "/products";

    /// Create the page object
    #[must_use]
    pub fn new(
        driver: Arc<dyn BrowserDriver>,
        base_url: impl Into<String>,
        sequencer: Sequencer,
    ) -> Self {
        Self {
            driver,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            sequencer,
        }
    }

    /// Cart item counter in the header
    #[must_use]
    pub fn cart_badge() -> Selector {
        Selector::test_id("cart-badge")
    }

    /// Add-to-cart button of one product card
    #[must_use]
    pub fn add_button(product_id: &str) -> Selector {
        Selector::css(format!(
            "[data-product-id={product_id:?}] [data-testid=\"add-to-cart\"]"
        ))
    }

    /// Navigate to the product listing
    pub async fn open(&self) -> DriverResult<()> {
        self.driver
            .goto(&format!("{}{}", self.base_url, Self::PATH))
            .await?;
        self.wait_until_current(self.sequencer.poller()).await
    }

    /// Current cart count. A hidden badge means an empty cart.
    pub async fn cart_count(&self) -> DriverResult<u32> {
        let badge = Self::cart_badge();
        if !self.driver.is_displayed(&badge).await? {
            return Ok(0);
        }
        let text = self.driver.text(&badge).await?;
        text.trim().parse().map_err(|_| DriverError::Protocol {
            error: "unexpected badge text".to_string(),
            message: format!("{badge} reads {text:?}"),
        })
    }

    /// Click add-to-cart once and require the badge to grow by exactly one
    pub async fn add_to_cart(&self, product_id: &str) -> StepResult<u32> {
        let button = Self::add_button(product_id);
        self.sequencer
            .act_then_increment(
                "add to cart",
                || self.cart_count(),
                || self.driver.click(&button),
                1,
            )
            .await
    }
}

#[async_trait]
impl PageObject for ProductListPage {
    fn url_pattern(&self) -> &str {
        Self::PATH
    }

    fn page_name(&self) -> &str {
        "product list"
    }

    fn driver(&self) -> &dyn BrowserDriver {
        self.driver.as_ref()
    }
}
