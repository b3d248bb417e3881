use crate::commands::Tool;
use crate::prelude::*;
use anyhow::Context;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

const ENV_PREFIX: &str = "FFMPEG_WRAPPER_";

/// Where the tools live and how long a single run may take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conf {
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    /// No limit when unset.
    pub timeout_secs: Option<u64>,
}

impl Default for Conf {
    fn default() -> Self {
        Self {
            ffmpeg_path: Tool::Ffmpeg.name().to_string(),
            ffprobe_path: Tool::Ffprobe.name().to_string(),
            timeout_secs: None,
        }
    }
}

impl Conf {
    pub fn builder() -> ConfBuilder {
        ConfBuilder::default()
    }

    pub fn program(&self, tool: Tool) -> &str {
        match tool {
            Tool::Ffmpeg => &self.ffmpeg_path,
            Tool::Ffprobe => &self.ffprobe_path,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// One layer of settings; unset fields keep the value of earlier layers.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PartialConf {
    ffmpeg_path: Option<String>,
    ffprobe_path: Option<String>,
    timeout_secs: Option<u64>,
}

impl PartialConf {
    fn from_vars(vars: &[(String, String)]) -> anyhow::Result<Self> {
        let mut partial = Self::default();
        for (key, value) in vars {
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match name {
                "FFMPEG" => partial.ffmpeg_path = Some(value.clone()),
                "FFPROBE" => partial.ffprobe_path = Some(value.clone()),
                "TIMEOUT_SECS" => {
                    partial.timeout_secs = Some(
                        value
                            .trim()
                            .parse()
                            .with_context(|| format!("invalid {}: {:?}", key, value))?,
                    )
                }
                _ => trace!("ignoring unknown variable {}", key),
            }
        }
        Ok(partial)
    }

    fn apply(self, conf: &mut Conf) {
        if let Some(path) = self.ffmpeg_path {
            conf.ffmpeg_path = shellexpand::tilde(&path).into_owned();
        }
        if let Some(path) = self.ffprobe_path {
            conf.ffprobe_path = shellexpand::tilde(&path).into_owned();
        }
        if self.timeout_secs.is_some() {
            conf.timeout_secs = self.timeout_secs;
        }
    }
}

#[derive(Debug)]
enum Source {
    File { path: PathBuf, required: bool },
    Vars(Vec<(String, String)>),
}

/// Layers config sources; later sources override earlier ones.
#[derive(Debug, Default)]
pub struct ConfBuilder {
    sources: Vec<Source>,
}

impl ConfBuilder {
    /// A TOML file. `~` is expanded and a missing file is skipped.
    pub fn file(self, path: impl AsRef<str>) -> Self {
        self.push_file(path.as_ref(), false)
    }

    /// Like [`ConfBuilder::file`], but loading fails if the file is missing.
    pub fn required_file(self, path: impl AsRef<str>) -> Self {
        self.push_file(path.as_ref(), true)
    }

    fn push_file(mut self, path: &str, required: bool) -> Self {
        let path = PathBuf::from(shellexpand::tilde(path).into_owned());
        self.sources.push(Source::File { path, required });
        self
    }

    /// The process environment (`FFMPEG_WRAPPER_*`).
    pub fn env(self) -> Self {
        self.vars(std::env::vars())
    }

    pub fn vars(mut self, vars: impl IntoIterator<Item = (String, String)>) -> Self {
        let vars = vars
            .into_iter()
            .filter(|(key, _)| key.starts_with(ENV_PREFIX))
            .collect();
        self.sources.push(Source::Vars(vars));
        self
    }

    pub fn load(self) -> anyhow::Result<Conf> {
        let mut conf = Conf::default();
        for source in self.sources {
            let partial = match source {
                Source::File { path, required } => {
                    if !path.is_file() {
                        anyhow::ensure!(!required, "config file {:?} does not exist", path);
                        debug!("config file {:?} does not exist, skipping", path);
                        continue;
                    }
                    let text = std::fs::read_to_string(&path)
                        .with_context(|| format!("could not read {:?}", path))?;
                    toml::from_str::<PartialConf>(&text)
                        .with_context(|| format!("could not parse {:?}", path))?
                }
                Source::Vars(vars) => PartialConf::from_vars(&vars)?,
            };
            partial.apply(&mut conf);
        }
        debug!("loaded config: {:?}", conf);
        Ok(conf)
    }
}
