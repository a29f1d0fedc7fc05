//! Bridge for legacy application config files.
//!
//! The file carries two sections:
//!
//! ```toml
//! [appSettings]
//! A = "1"
//! "Section:Sub" = "val"
//!
//! [[connectionStrings]]
//! name = "MainDb"
//! connectionString = "Data Source=.;Initial Catalog=Test"
//! providerName = "System.Data.SqlClient"
//! ```
//!
//! Settings keep their key, connection strings are exposed as `connectionStrings:{name}`.
//! Loading never fails on malformed content: if the document cannot be parsed, values are
//! extracted line by line and whatever cannot be read is skipped.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::{
    configuration::KEY_DELIMITER,
    errors::ConfigError,
    sources::{ConfigPairs, ConfigurationSource},
};

pub const APP_SETTINGS_SECTION: &str = "appSettings";
pub const CONNECTION_STRINGS_SECTION: &str = "connectionStrings";

/// Key under which a named connection string is exposed
pub fn connection_string_key(name: &str) -> String {
    format!("{CONNECTION_STRINGS_SECTION}{KEY_DELIMITER}{name}")
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConnectionStringEntry {
    #[serde(default)]
    name: String,
    #[serde(default)]
    connection_string: String,
    #[allow(dead_code)]
    provider_name: Option<String>,
}

/// Loads the legacy app config file at `path`. A missing file yields no values.
#[derive(Debug, Clone)]
pub struct AppConfigSource {
    path: PathBuf,
}

impl AppConfigSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        AppConfigSource { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigurationSource for AppConfigSource {
    fn name(&self) -> &str {
        "AppConfigSource"
    }

    fn load(&self) -> Result<ConfigPairs, ConfigError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => Ok(load_app_config(&raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("No app config at {}", self.path.display());
                Ok(Vec::new())
            }
            Err(source) => Err(ConfigError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

/// Reads settings and connection strings from the raw document
pub fn load_app_config(raw: &str) -> ConfigPairs {
    let document = match raw.parse::<toml::Table>() {
        Ok(document) => document,
        Err(e) => {
            tracing::warn!("App config is malformed, extracting values manually: {}", e);
            return extract_manually(raw);
        }
    };

    let mut pairs = ConfigPairs::new();
    if let Some(settings) = document.get(APP_SETTINGS_SECTION) {
        match settings {
            toml::Value::Table(settings) => flatten_settings("", settings, &mut pairs),
            _ => tracing::warn!("'{}' is not a table, ignoring it", APP_SETTINGS_SECTION),
        }
    }

    match document.get(CONNECTION_STRINGS_SECTION) {
        None => {}
        Some(toml::Value::Array(entries)) => {
            for entry in entries {
                match entry.clone().try_into::<ConnectionStringEntry>() {
                    Ok(entry) => push_connection_string(entry, &mut pairs),
                    Err(e) => tracing::warn!("Skipping malformed connection string: {}", e),
                }
            }
        }
        Some(_) => {
            tracing::warn!(
                "'{}' is not a list of entries, extracting connection strings manually",
                CONNECTION_STRINGS_SECTION
            );
            pairs.extend(
                extract_manually(raw)
                    .into_iter()
                    .filter(|(key, _)| key.starts_with(&connection_string_key(""))),
            );
        }
    }

    pairs
}

fn flatten_settings(prefix: &str, table: &toml::Table, pairs: &mut ConfigPairs) {
    for (key, value) in table {
        if key.is_empty() {
            continue;
        }
        let key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}{KEY_DELIMITER}{key}")
        };

        match value {
            toml::Value::String(text) => pairs.push((key, Some(text.clone()))),
            toml::Value::Table(nested) => flatten_settings(&key, nested, pairs),
            toml::Value::Array(_) => tracing::warn!("Skipping list setting '{}'", key),
            scalar => pairs.push((key, Some(scalar.to_string()))),
        }
    }
}

fn push_connection_string(entry: ConnectionStringEntry, pairs: &mut ConfigPairs) {
    if entry.name.is_empty() {
        return;
    }
    pairs.push((
        connection_string_key(&entry.name),
        Some(entry.connection_string),
    ));
}

enum Section {
    Settings(String),
    ConnectionString,
    Other,
}

/// Line based extraction for documents that do not parse
fn extract_manually(raw: &str) -> ConfigPairs {
    let mut pairs = ConfigPairs::new();
    let mut section = Section::Other;
    let mut pending: Option<ConnectionStringEntry> = None;

    for line in raw.lines().map(|line| strip_comment(line).trim()) {
        if line.is_empty() {
            continue;
        }

        if line.starts_with('[') {
            if let Some(entry) = pending.take() {
                push_connection_string(entry, &mut pairs);
            }
            section = parse_header(line);
            if let Section::ConnectionString = section {
                pending = Some(ConnectionStringEntry {
                    name: String::new(),
                    connection_string: String::new(),
                    provider_name: None,
                });
            }
            continue;
        }

        let Some((key, value)) = parse_assignment(line) else {
            continue;
        };
        match (&section, pending.as_mut()) {
            (Section::Settings(prefix), _) if !key.is_empty() => {
                let key = if prefix.is_empty() {
                    key
                } else {
                    format!("{prefix}{KEY_DELIMITER}{key}")
                };
                pairs.push((key, Some(value)));
            }
            (Section::ConnectionString, Some(entry)) => match key.as_str() {
                "name" => entry.name = value,
                "connectionString" => entry.connection_string = value,
                "providerName" => entry.provider_name = Some(value),
                _ => {}
            },
            _ => {}
        }
    }

    if let Some(entry) = pending.take() {
        push_connection_string(entry, &mut pairs);
    }
    pairs
}

fn parse_header(line: &str) -> Section {
    if line.starts_with("[[") {
        let name = line.trim_start_matches('[').trim_end_matches(']').trim();
        return match name == CONNECTION_STRINGS_SECTION {
            true => Section::ConnectionString,
            false => Section::Other,
        };
    }

    let name = line.trim_start_matches('[').trim_end_matches(']').trim();
    match name.split_once('.') {
        None if name == APP_SETTINGS_SECTION => Section::Settings(String::new()),
        Some((head, rest)) if head == APP_SETTINGS_SECTION => {
            Section::Settings(unquote(rest.trim()).replace('.', ":"))
        }
        _ => Section::Other,
    }
}

/// Cuts a `#` comment that is not inside a quoted string
fn strip_comment(line: &str) -> &str {
    let mut quote = None;
    let mut escaped = false;
    for (at, c) in line.char_indices() {
        match (quote, c) {
            (Some('"'), '\\') if !escaped => {
                escaped = true;
                continue;
            }
            (Some(open), _) if c == open && !escaped => quote = None,
            (None, '"' | '\'') => quote = Some(c),
            (None, '#') => return &line[..at],
            _ => {}
        }
        escaped = false;
    }
    line
}

fn parse_assignment(line: &str) -> Option<(String, String)> {
    let (key, value) = line.split_once('=')?;
    Some((unquote(key.trim()), unquote(value.trim())))
}

fn unquote(text: &str) -> String {
    for quote in ['"', '\''] {
        if let Some(inner) = text
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner.replace("\\\"", "\"");
        }
    }
    text.to_string()
}
