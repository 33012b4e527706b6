use anyhow::Result;
use reqwest::Client;

use crate::config::Config;

pub fn build_http_client(config: &Config) -> Result<Client> {
    Ok(Client::builder().timeout(config.http_timeout).build()?)
}
