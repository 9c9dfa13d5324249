use ha_bind::ha_mqtt::topics::DEFAULT_DISCOVERY_PREFIX;
use rumqttc::MqttOptions;
use serde::Deserialize;
use std::fs;
use std::time::Duration;

#[derive(Deserialize, Debug, Clone)]
pub struct Button {
    pub name: String,
    pub exec: String,
}

#[derive(Deserialize, Debug)]
pub struct Config {
    /// Device name as shown in Home Assistant; its slug is the device id.
    pub hostname: String,
    pub mqtt_url: String,
    pub mqtt_port: u16,
    pub username: String,
    pub password: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Period of the host diagnostics sensors.
    pub update_interval_ms: u64,
    #[serde(default = "default_discovery_prefix")]
    pub discovery_prefix: String,
    #[serde(default = "default_keepalive_secs")]
    pub keepalive_secs: u64,
    #[serde(default = "default_loop_interval_ms")]
    pub loop_interval_ms: u64,
    #[serde(default = "default_discovery_interval_secs")]
    pub discovery_interval_secs: u64,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub button: Option<Vec<Button>>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_discovery_prefix() -> String {
    DEFAULT_DISCOVERY_PREFIX.to_string()
}

fn default_keepalive_secs() -> u64 {
    60
}

fn default_loop_interval_ms() -> u64 {
    100
}

fn default_discovery_interval_secs() -> u64 {
    300
}

impl Config {
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = Self::get_config_path()?;
        Self::load_from_file(&config_path)
    }

    pub fn get_config_path() -> Result<String, Box<dyn std::error::Error>> {
        #[cfg(debug_assertions)]
        {
            // In debug mode, look for config.toml in the current directory
            Ok("config.toml".to_string())
        }

        #[cfg(not(debug_assertions))]
        {
            // In release mode, look for config.toml in $HOME/.config/ha-bind
            let home = std::env::var("HOME").map_err(|_| "HOME environment variable not set")?;
            let config_path = format!("{}/.config/ha-bind/config.toml", home);

            Ok(config_path)
        }
    }

    pub fn load_from_file(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Config = toml::from_str(contents)?;
        if config.hostname.trim().is_empty() {
            return Err("Configuration error: 'hostname' must not be empty".into());
        }
        if config.update_interval_ms == 0 || config.loop_interval_ms == 0 {
            return Err(
                "Configuration error: 'update_interval_ms' and 'loop_interval_ms' must be positive"
                    .into(),
            );
        }
        Ok(config)
    }

    /// Broker options for a client identified by `client_id`.
    ///
    /// Sessions are persistent so subscriptions survive a reconnect.
    pub fn mqtt_options(&self, client_id: &str) -> MqttOptions {
        let mut options = MqttOptions::new(client_id, &self.mqtt_url, self.mqtt_port);
        options.set_credentials(&self.username, &self.password);
        options.set_keep_alive(Duration::from_secs(self.keepalive_secs));
        options.set_clean_session(false);
        options
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }

    pub fn loop_interval(&self) -> Duration {
        Duration::from_millis(self.loop_interval_ms)
    }

    pub fn discovery_interval(&self) -> Duration {
        Duration::from_secs(self.discovery_interval_secs)
    }
}
