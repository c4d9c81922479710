use std::fmt;

use serde::{Deserialize, Serialize};

/// Container healthcheck. Durations are whole seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Healthcheck {
    #[serde(deserialize_with = "deserialize_test")]
    pub test: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_period: Option<u64>,
}

impl Healthcheck {
    pub fn new(test: Vec<String>) -> Self {
        Self {
            test,
            interval: None,
            timeout: None,
            retries: None,
            start_period: None,
        }
    }

    /// `true` when the test explicitly disables the image's healthcheck.
    pub fn is_disabled(&self) -> bool {
        self.test.first().is_some_and(|t| t == "NONE")
    }

    /// The command line the runtime should run, without the `CMD`/`CMD-SHELL` marker.
    pub fn command_line(&self) -> Option<String> {
        match self.test.split_first() {
            None => None,
            Some((first, _)) if first == "NONE" => None,
            Some((first, rest)) if first == "CMD-SHELL" => Some(rest.join(" ")),
            Some((first, rest)) if first == "CMD" => Some(shell_words::join(rest)),
            Some(_) => Some(shell_words::join(&self.test)),
        }
    }
}

impl fmt::Display for Healthcheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Healthcheck(test={:?}", self.test)?;
        if let Some(v) = self.interval {
            write!(f, ", interval={v}")?;
        }
        if let Some(v) = self.timeout {
            write!(f, ", timeout={v}")?;
        }
        if let Some(v) = self.retries {
            write!(f, ", retries={v}")?;
        }
        if let Some(v) = self.start_period {
            write!(f, ", start_period={v}")?;
        }
        f.write_str(")")
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TestInput {
    Vector(Vec<String>),
    Shell(String),
}

fn deserialize_test<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let test = match TestInput::deserialize(deserializer)? {
        TestInput::Vector(v) => v,
        TestInput::Shell(s) => vec!["CMD-SHELL".to_string(), s],
    };
    if test.is_empty() {
        return Err(serde::de::Error::custom("healthcheck test must not be empty"));
    }
    Ok(test)
}
