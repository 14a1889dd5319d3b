mod error;
mod models;
mod mysql;
mod persister;

pub use error::{Error, Result};
pub use models::{ContainerGpuStats, ContainerLabel};
pub use mysql::{MySqlRecordPersister, connect};
pub use persister::RecordPersister;
