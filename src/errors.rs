use std::path::PathBuf;
use std::time::Duration;
use tokio::io;

#[derive(Debug, thiserror::Error)]
pub enum WrapperError {
    #[error("Could not load config")]
    LoadConfig(#[source] anyhow::Error),

    #[error("Could not convert path to string: {0:?}")]
    PathToString(PathBuf),

    #[error("Could not run {program}")]
    Process {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("{program} did not finish within {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    /// The tool ran but exited with a nonzero status. Output is kept verbatim.
    #[error("{program} failed with exit code {status}")]
    Execution {
        program: String,
        status: i32,
        stdout: String,
        stderr: String,
    },

    #[error("Could not parse the probed duration")]
    DurationParse(#[source] anyhow::Error),
    #[error("Could not parse the volumedetect output")]
    VolumeParse(#[source] anyhow::Error),
}

impl WrapperError {
    /// The tool succeeded but its output could not be interpreted.
    pub fn is_parse_failure(&self) -> bool {
        matches!(
            self,
            WrapperError::DurationParse(_) | WrapperError::VolumeParse(_)
        )
    }

    /// The tool itself reported failure through its exit status.
    pub fn is_execution_failure(&self) -> bool {
        matches!(self, WrapperError::Execution { .. })
    }
}
