use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub public_rps: u32,
    pub max_active_sessions: usize,
    pub default_time_budget_minutes: i64,
    pub resume_switch_probability: f64,
    pub max_thread_depth: usize,
    pub max_consecutive_resume: usize,
    pub avoid_repeat_resume_items: bool,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            openai_api_key: get_env("OPENAI_API_KEY")?,
            openai_base_url: get_env_or("OPENAI_BASE_URL", "https://api.openai.com/v1"),
            openai_model: get_env_or("OPENAI_MODEL", "gpt-4o-mini"),
            public_rps: get_env_parse("PUBLIC_RPS")?,
            max_active_sessions: get_env_parse_or("MAX_ACTIVE_SESSIONS", 256)?,
            default_time_budget_minutes: get_env_parse_or("DEFAULT_TIME_BUDGET_MINUTES", 10)?,
            resume_switch_probability: get_env_parse_or("RESUME_SWITCH_PROBABILITY", 0.3)?,
            max_thread_depth: get_env_parse_or("MAX_THREAD_DEPTH", 2)?,
            max_consecutive_resume: get_env_parse_or("MAX_CONSECUTIVE_RESUME", 2)?,
            avoid_repeat_resume_items: get_env_parse_or("AVOID_REPEAT_RESUME_ITEMS", true)?,
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn get_env_parse<T>(name: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = get_env(name)?;
    raw.parse()
        .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e)))
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
