#[derive(Clone, Debug)]
pub struct Settings {
    pub database_url: String,
    pub migrations_dir: String,
    pub log_queries: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            database_url: "sqlite::memory:".to_string(),
            migrations_dir: "migrations".to_string(),
            log_queries: false,
        }
    }
}
