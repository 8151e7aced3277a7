//! 核心层：组件错误类型与会话编排器

pub mod error;
pub mod orchestrator;

pub use error::{PlaceError, StoreError};
pub use orchestrator::{
    HealthReport, HealthStatus, SessionOrchestrator, TurnRequest, DEFAULT_TURN_TIMEOUT,
};
