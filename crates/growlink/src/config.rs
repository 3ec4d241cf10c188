use std::path::Path;
use std::time::Duration;

use growlink_frame::ClassifierConfig;
use growlink_server::{ServerConfig, StaticStatus};
use growlink_transport::LinkConfig;
use serde::Deserialize;

use crate::exit::{io_error, CliError, CliResult, DATA_INVALID, USAGE};

/// Optional JSON config file. Every field overrides a library default.
///
/// ```json
/// {
///   "link": { "read_timeout": "250ms", "max_chunk": 1400, "init_commands": ["at+ipr=115200"] },
///   "classifier": { "max_console_line": 128 },
///   "server": { "page_title": "Growbox" },
///   "status": { "free_memory": 412 }
/// }
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub link: LinkSection,
    pub classifier: ClassifierSection,
    pub server: ServerSection,
    /// Snapshot served as page content when no controller is attached.
    pub status: StaticStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinkSection {
    pub read_timeout: Option<String>,
    pub write_timeout: Option<String>,
    pub rx_chunk: Option<usize>,
    pub max_chunk: Option<usize>,
    pub await_ack: Option<bool>,
    pub max_ack_line: Option<usize>,
    pub init_commands: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClassifierSection {
    pub max_console_line: Option<usize>,
    pub ready_banner: Option<String>,
    pub error_banner: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    pub redirect_location: Option<String>,
    pub page_title: Option<String>,
}

impl ConfigFile {
    /// Load `path`, or defaults when no path was given.
    pub fn load(path: Option<&Path>) -> CliResult<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .map_err(|err| io_error(&format!("read config {}", path.display()), err))?;
        Self::parse(&text)
            .map_err(|err| CliError::new(err.code, format!("{}: {}", path.display(), err)))
    }

    pub fn parse(text: &str) -> CliResult<Self> {
        serde_json::from_str(text)
            .map_err(|err| CliError::new(DATA_INVALID, format!("invalid config: {err}")))
    }

    pub fn link_config(&self) -> CliResult<LinkConfig> {
        let section = &self.link;
        let mut config = LinkConfig::default();
        if let Some(timeout) = &section.read_timeout {
            config.read_timeout = Some(parse_duration(timeout)?);
        }
        if let Some(timeout) = &section.write_timeout {
            config.write_timeout = Some(parse_duration(timeout)?);
        }
        if let Some(rx_chunk) = section.rx_chunk {
            config.rx_chunk = nonzero("link.rx_chunk", rx_chunk)?;
        }
        if let Some(max_chunk) = section.max_chunk {
            config.max_chunk = nonzero("link.max_chunk", max_chunk)?;
        }
        if let Some(await_ack) = section.await_ack {
            config.await_ack = await_ack;
        }
        if let Some(max_ack_line) = section.max_ack_line {
            config.max_ack_line = nonzero("link.max_ack_line", max_ack_line)?;
        }
        if let Some(commands) = &section.init_commands {
            config.init_commands = commands.clone();
        }
        Ok(config)
    }

    pub fn server_config(&self) -> ServerConfig {
        let mut config = ServerConfig::default();
        if let Some(location) = &self.server.redirect_location {
            config.redirect_location = location.clone();
        }
        if let Some(title) = &self.server.page_title {
            config.page_title = title.clone();
        }
        config.classifier = self.classifier_config();
        config
    }

    pub fn classifier_config(&self) -> ClassifierConfig {
        let section = &self.classifier;
        let mut config = ClassifierConfig::default();
        if let Some(max) = section.max_console_line {
            config.max_console_line = max;
        }
        if let Some(banner) = &section.ready_banner {
            config.ready_banner = banner.clone();
        }
        if let Some(banner) = &section.error_banner {
            config.error_banner = banner.clone();
        }
        config
    }
}

fn nonzero(field: &str, value: usize) -> CliResult<usize> {
    if value == 0 {
        return Err(CliError::new(USAGE, format!("{field} must be greater than zero")));
    }
    Ok(value)
}

/// Parse `5s`, `150ms` or a bare number of seconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn empty_file_keeps_defaults() {
        let file = ConfigFile::parse("{}").unwrap();
        let link = file.link_config().unwrap();

        assert_eq!(link.max_chunk, growlink_transport::DEFAULT_MAX_CHUNK);
        assert!(link.await_ack);
        assert_eq!(file.server_config().redirect_location, "/");
    }

    #[test]
    fn sections_override_defaults() {
        let file = ConfigFile::parse(
            r#"{
                "link": { "read_timeout": "40ms", "max_chunk": 256, "await_ack": false,
                          "init_commands": ["at+ipr=115200"] },
                "classifier": { "ready_banner": "Welcome to RAK411" },
                "server": { "page_title": "Tent 2" },
                "status": { "free_memory": 77 }
            }"#,
        )
        .unwrap();

        let link = file.link_config().unwrap();
        assert_eq!(link.read_timeout, Some(Duration::from_millis(40)));
        assert_eq!(link.max_chunk, 256);
        assert!(!link.await_ack);
        assert_eq!(link.init_commands, vec!["at+ipr=115200".to_string()]);

        let server = file.server_config();
        assert_eq!(server.page_title, "Tent 2");
        assert_eq!(server.classifier.ready_banner, "Welcome to RAK411");
        assert_eq!(file.status.free_memory, 77);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = ConfigFile::parse(r#"{ "link": { "baud": 9600 } }"#).unwrap_err();
        assert_eq!(err.code, DATA_INVALID);
    }

    #[test]
    fn zero_chunk_is_rejected() {
        let file = ConfigFile::parse(r#"{ "link": { "max_chunk": 0 } }"#).unwrap();
        assert_eq!(file.link_config().unwrap_err().code, USAGE);
    }
}
