//! Rider Assist - 自动驾驶乘客助手中间件
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **conversation**: 意图识别、情绪回退、回复分发、车辆指令规划
//! - **core**: 组件错误类型与会话编排器
//! - **gateway**: HTTP 接入层（feature `server`）
//! - **geo**: 距离、绕行、到达时间、路况与路线选择
//! - **observability**: 日志初始化
//! - **places**: 地点检索（Yelp / Mock）与带缓存的 PlaceService
//! - **session**: 会话、偏好、交互历史、反馈与偏好模式
//! - **store**: 上下文缓存（Redis / 进程内存）

pub mod config;
pub mod conversation;
pub mod core;
#[cfg(feature = "server")]
pub mod gateway;
pub mod geo;
pub mod observability;
pub mod places;
pub mod session;
pub mod store;

pub use crate::core::{SessionOrchestrator, TurnRequest};
