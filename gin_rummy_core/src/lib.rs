//! # 金拉米 (Gin Rummy) 核心逻辑库
//!
//! 这个 `core` crate 包含了双人金拉米一局的全部规则：牌堆与发牌、
//! 抽牌/弃牌的回合状态机、牌组 (刻子、顺子) 识别、散牌计算以及计分，
//! 还有客户端-服务器通信消息的定义。
//! 它不做任何 I/O，也不检查是否轮到某位玩家 (由上层的传输层负责)，
//! 使其可以被任何上层应用复用。

mod card;
mod hand;
mod logic;
mod meld;
mod message;
mod scoring;
mod state;

pub use card::*;

pub use hand::*;

pub use meld::{can_knock, deadwood, is_gin, melded_cards, sorted_for_display, KNOCK_LIMIT, MIN_MELD_LEN};

pub use message::*;

pub use scoring::*;

pub use state::*;
