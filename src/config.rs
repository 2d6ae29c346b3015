use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// PostgreSQL database connection URL. When absent the in-memory store is used.
    #[serde(default)]
    pub database_url: Option<String>,

    /// Redis connection URL. When absent external catalog responses are not cached.
    #[serde(default)]
    pub redis_url: Option<String>,

    /// The Movie Database API key
    #[serde(default)]
    pub tmdb_api_key: String,

    /// The Movie Database API base URL
    #[serde(default = "default_tmdb_api_url")]
    pub tmdb_api_url: String,

    /// Prefix prepended to TMDB poster paths
    #[serde(default = "default_tmdb_image_base_url")]
    pub tmdb_image_base_url: String,

    /// Language requested from TMDB; its prefix also picks the preferred trailer
    #[serde(default = "default_tmdb_language")]
    pub tmdb_language: String,

    /// Genre the catalog, search and recommendations are restricted to
    #[serde(default = "default_featured_genre")]
    pub featured_genre: String,

    /// Usernames granted staff rights when they register
    #[serde(default)]
    pub staff_usernames: Vec<String>,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_tmdb_api_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_tmdb_image_base_url() -> String {
    "https://image.tmdb.org/t/p/w500".to_string()
}

fn default_tmdb_language() -> String {
    "es-MX".to_string()
}

fn default_featured_genre() -> String {
    "Aventura".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            redis_url: None,
            tmdb_api_key: String::new(),
            tmdb_api_url: default_tmdb_api_url(),
            tmdb_image_base_url: default_tmdb_image_base_url(),
            tmdb_language: default_tmdb_language(),
            featured_genre: default_featured_genre(),
            staff_usernames: Vec::new(),
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    pub fn is_staff_username(&self, username: &str) -> bool {
        self.staff_usernames
            .iter()
            .any(|name| name.trim().eq_ignore_ascii_case(username))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
