use crate::errors::WrapperError;
pub(crate) use std::result::Result as StdResult;

pub type Result<T> = StdResult<T, WrapperError>;

pub(crate) use tracing::{debug, error, info, trace, warn};
