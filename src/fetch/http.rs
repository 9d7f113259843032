//! Downloads the export over HTTPS with a blocking client.
//!
//! Transport errors and non-2xx statuses are retried `retries` times with a
//! fixed delay. The upstream portal builds the export on demand, so a slow
//! response is normal and the default timeout is generous.

use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;

use super::Source;
use crate::config::SourceConfig;
use crate::error::Result;

pub struct HttpSource {
    client: Client,
    url: String,
    retries: u32,
    retry_delay: Duration,
}

impl HttpSource {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(HttpSource {
            client,
            url: config.url.clone(),
            retries: config.retries,
            retry_delay: config.retry_delay,
        })
    }

    fn download(&self) -> Result<Vec<u8>> {
        let response = self.client.get(&self.url).send()?.error_for_status()?;
        Ok(response.bytes()?.to_vec())
    }
}

impl Source for HttpSource {
    fn describe(&self) -> String {
        self.url.clone()
    }

    fn fetch(&self) -> Result<Vec<u8>> {
        with_retries(self.retries, self.retry_delay, || self.download())
    }
}

fn with_retries<T>(retries: u32, delay: Duration, mut op: impl FnMut() -> Result<T>) -> Result<T> {
    let attempts = retries + 1;
    let mut attempt = 1;

    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts => {
                log::warn!("attempt {attempt}/{attempts} failed: {e}");
                thread::sleep(delay);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
