use anyhow::Result;
use std::time::Duration;
use tokio::time::sleep;

/// Capability that opens one URL in a new view (browser tab, editor window, ...).
pub trait UrlOpener: Send + Sync {
    fn open(&self, url: &str) -> Result<()>;
}

/// Writes each URL on its own line to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutOpener;

impl UrlOpener for StdoutOpener {
    fn open(&self, url: &str) -> Result<()> {
        println!("{url}");
        Ok(())
    }
}

/// Hands URLs to an opener one at a time with a fixed spacing between them.
#[derive(Debug, Clone, Copy)]
pub struct Dispatcher {
    delay: Duration,
}

impl Dispatcher {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Opens `urls` in order and returns how many opened successfully.
    ///
    /// The delay separates consecutive items; there is none before the first.
    /// A failing open is logged and the remaining URLs are still dispatched.
    pub async fn dispatch(&self, urls: &[String], opener: &dyn UrlOpener) -> usize {
        let mut opened = 0;

        for (index, url) in urls.iter().enumerate() {
            if index > 0 {
                sleep(self.delay).await;
            }

            match opener.open(url) {
                Ok(()) => opened += 1,
                Err(err) => {
                    tracing::warn!(url = %url, error = %err, "failed to open dispatch URL");
                }
            }
        }

        tracing::debug!(opened, total = urls.len(), "dispatch finished");
        opened
    }
}
