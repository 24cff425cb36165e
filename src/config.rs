use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Base URL of the WordPress REST API, e.g. `https://example.com/wp-json/wp/v2`
    pub api_base: String,
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Minimum interval between resize-driven renders, in milliseconds
    #[serde(default = "default_resize_debounce_ms")]
    pub resize_debounce_ms: u64,
    /// Design width of the front page in pixels
    #[serde(default = "default_base_width")]
    pub base_width: f64,
    #[serde(default = "default_margin")]
    pub margin: f64,
    /// Viewport width assumed until the first resize event arrives
    #[serde(default = "default_base_width")]
    pub initial_viewport_width: f64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub masthead: Masthead,
    #[serde(default)]
    pub sections: Vec<SectionConfig>,
}

fn default_listen_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_resize_debounce_ms() -> u64 {
    500
}

fn default_base_width() -> f64 {
    1200.0
}

fn default_margin() -> f64 {
    0.96
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Fixed header and footer copy.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Masthead {
    pub title: String,
    pub tagline: String,
    pub city: String,
    pub edition_title: String,
    pub edition_blurb: String,
    pub footer: String,
}

impl Default for Masthead {
    fn default() -> Self {
        Self {
            title: "The Vanderbilt Hustler".to_string(),
            tagline: "All the Hustler That's Fit to Print".to_string(),
            city: "Nashville".to_string(),
            edition_title: "The Classic Edition".to_string(),
            edition_blurb: "This is The Vanderbilt Hustler reimagined in the style of a certain \
                well-known metropolitan newspaper. You're currently reading the 25 latest \
                stories from the website."
                .to_string(),
            footer: "The Vanderbilt Hustler: Classic Edition is built on unim.press.".to_string(),
        }
    }
}

/// An option of the section selector; `id` is the API category id.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SectionConfig {
    pub name: String,
    pub id: u64,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.base_width.is_nan() || self.base_width <= 0.0 {
            anyhow::bail!("base_width must be positive, got {}", self.base_width);
        }
        if self.margin.is_nan() || self.margin <= 0.0 || self.margin > 1.0 {
            anyhow::bail!("margin must be in (0, 1], got {}", self.margin);
        }
        Ok(())
    }
}
