pub mod config;
pub mod ctx;
pub mod ops;

use ctx::LogCtx;

pub fn feed() -> LogCtx<ops::feed::Feed> { LogCtx::new(config::logs_are_json()) }
pub fn repos() -> LogCtx<ops::repos::Repos> { LogCtx::new(config::logs_are_json()) }
pub fn status() -> LogCtx<ops::status::Status> { LogCtx::new(config::logs_are_json()) }
