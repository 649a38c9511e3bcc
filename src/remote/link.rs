//! Command link parameters.

use crate::error::{Error, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use uuid::Uuid;

/// Number of lines the link file carries.
const ARGUMENTS_COUNT: usize = 3;

/// Encapsulates the parameters of a command link: the listening host and
/// port together with the shared secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLink {
    host: String,
    port: u16,
    secret: String,
}

impl CommandLink {
    /// Creates a new instance.
    ///
    /// The secret may not contain characters outside of the `0x20..=0x80`
    /// code point range; an empty secret triggers generating a random one.
    pub fn new(host: &str, port: u16, secret: &str) -> Result<Self> {
        Ok(Self {
            host: host.to_string(),
            port,
            secret: secret_from(secret)?,
        })
    }

    /// Parses the argument list in the form `HOST PORT SECRET`.
    pub fn from_args(args: &[String]) -> Result<Self> {
        if args.len() < ARGUMENTS_COUNT {
            return Err(Error::Config(
                "requiring host, port and secret for the command link".to_string(),
            ));
        }

        let port = args[1]
            .parse::<u16>()
            .map_err(|_| Error::Config(format!("invalid command link port: {}", args[1])))?;

        Self::new(&args[0], port, &args[2])
    }

    /// Loads the parameters from the given file.
    ///
    /// Returns `Ok(None)` when the file does not exist.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let lines: Vec<String> = text.lines().take(ARGUMENTS_COUNT).map(String::from).collect();
        Self::from_args(&lines).map(Some)
    }

    /// Saves the parameters to the given file.
    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, format!("{}\n{}\n{}\n", self.host, self.port, self.secret))?;
        Ok(())
    }

    /// Returns an instance with the same secret, but an updated address.
    pub fn with_address(&self, host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
            secret: self.secret.clone(),
        }
    }

    /// Returns the host.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns the secret.
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Returns the address in the `host:port` form suitable for socket
    /// operations.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn secret_from(secret: &str) -> Result<String> {
    if secret.is_empty() {
        return Ok(Uuid::new_v4().to_string());
    }

    if secret.chars().any(|c| !('\u{20}'..='\u{80}').contains(&c)) {
        return Err(Error::Config("secret contains forbidden characters".to_string()));
    }

    Ok(secret.to_string())
}
