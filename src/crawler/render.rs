//! Scripted-page rendering capability
//!
//! Some pages only materialize their content client-side. When the
//! configuration allows unsafe execution, the inspector hands such pages to a
//! [`Renderer`] which runs the page scripts and returns the resulting DOM as
//! HTML. The crawl core never depends on a concrete script engine.

use async_trait::async_trait;
use thiserror::Error;

/// Errors produced while rendering a page
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Renderer unavailable: {0}")]
    Unavailable(String),

    #[error("Rendering {url} failed: {message}")]
    Failed { url: String, message: String },
}

/// Executes a page's scripts and serializes the resulting document
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Renders `html` as if it had been loaded from `source`
    async fn render(&self, html: &str, source: &str) -> Result<String, RenderError>;
}

#[cfg(feature = "headless")]
pub use headless::ChromeRenderer;

#[cfg(feature = "headless")]
mod headless {
    use super::{RenderError, Renderer};
    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser, BrowserConfig};
    use futures::StreamExt;
    use tokio::task::JoinHandle;

    /// Renderer backed by a headless Chromium instance
    pub struct ChromeRenderer {
        browser: Browser,
        handler: JoinHandle<()>,
    }

    impl ChromeRenderer {
        /// Launches a headless browser
        pub async fn launch() -> Result<Self, RenderError> {
            let config = BrowserConfig::builder()
                .build()
                .map_err(RenderError::Unavailable)?;
            let (browser, mut events) = Browser::launch(config)
                .await
                .map_err(|e| RenderError::Unavailable(e.to_string()))?;

            // The CDP connection only makes progress while its handler is polled
            let handler = tokio::spawn(async move {
                while let Some(event) = events.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            });

            Ok(Self { browser, handler })
        }
    }

    #[async_trait]
    impl Renderer for ChromeRenderer {
        async fn render(&self, html: &str, source: &str) -> Result<String, RenderError> {
            let failed = |e: chromiumoxide::error::CdpError| RenderError::Failed {
                url: source.to_string(),
                message: e.to_string(),
            };

            let page = self.browser.new_page("about:blank").await.map_err(failed)?;
            page.set_content(html).await.map_err(failed)?;
            let rendered = page.content().await.map_err(failed);

            if let Err(e) = page.close().await {
                tracing::debug!("Failed to close render page for {}: {}", source, e);
            }

            rendered
        }
    }

    impl Drop for ChromeRenderer {
        fn drop(&mut self) {
            self.handler.abort();
        }
    }
}
