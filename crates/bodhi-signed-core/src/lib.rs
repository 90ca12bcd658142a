pub mod build;
pub mod config;
pub mod consumer;
pub mod error;
pub mod handler;
pub mod message;
pub mod release;
pub mod storage;

pub use build::{compose_nvr, Build, NewBuild};
pub use config::{Config, FailurePolicy};
pub use consumer::{ConsumeStats, Consumer};
pub use error::{Error, Result};
pub use handler::{MessageHandler, Outcome, SignedHandler, SkipReason};
pub use message::{Message, TagEvent};
pub use release::{NewRelease, Release};
pub use storage::{Session, Storage};
