pub use std::{collections::HashMap, time::Duration};

pub use anyhow::Context;
pub use chrono::{
  Local, NaiveDate as Date, NaiveDateTime as DateTime, TimeDelta, Utc,
};
pub use dashmap::DashMap;
pub use tokio::time;
pub use tracing::{debug, error, info, warn};

pub use crate::error::{Error, Result};
pub(crate) use crate::{text, utils};
