use failure::Error;

use serde_derive::Deserialize;

use std::fs::File;
use std::io::Read;
use std::time::Duration;

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Remote {
  pub host: String,
  pub port: u16,
  pub listen_port: u16,
  pub timeout: f64,
}

impl Remote {
  pub fn timeout_duration(&self) -> Duration {
    Duration::from_millis((self.timeout * 1000.0) as u64)
  }
}

impl Default for Remote {
  fn default() -> Remote {
    Remote {
      host: "127.0.0.1".to_string(),
      port: 11000,
      listen_port: 11001,
      timeout: 3.0,
    }
  }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
  pub remote: Remote,
}

impl Default for Config {
  fn default() -> Config {
    Config {
      remote: Remote::default(),
    }
  }
}

impl Config {
  pub fn from_file<'a, T>(path: T) -> Result<Config, Error>
  where
    T: Into<&'a str>,
  {
    let mut content = String::new();
    let path_str = path.into();
    let mut file = File::open(path_str)?;
    file.read_to_string(&mut content)?;
    let config: Config = toml::from_str(&content)?;
    Ok(config)
  }

  pub fn from_str<'a, T>(content: T) -> Result<Config, Error>
  where
    T: Into<&'a str>,
  {
    let config: Config = toml::from_str(content.into())?;
    Ok(config)
  }
}
