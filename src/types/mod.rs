//! 类型模块：定义工作项、单次尝试结果与重试决策等核心数据类型。
//!
//! # Types Module
//!
//! Core value types shared by the executor, retry policy, scheduler and
//! metrics aggregator.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`WorkItem`] | Opaque JSON payload plus a caller-assigned [`ItemId`] |
//! | [`Outcome`] | Classified result of a single network attempt |
//! | [`AttemptRecord`] | One attempt: item id, attempt number, outcome, wall-clock span |
//! | [`RetryDecision`] | What to do after an attempt: retry after a wait, or give up |
//! | [`ItemReport`] | Terminal record for one work item |

mod item;
mod outcome;

pub use item::{ItemId, WorkItem};
pub use outcome::{AttemptRecord, ItemReport, ItemStatus, Outcome, RetryDecision};
