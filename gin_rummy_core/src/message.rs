use crate::card::Card;
use crate::scoring::Award;
use crate::state::{DrawSource, GameSnapshot, Seat, SEATS};
use serde::{Deserialize, Serialize};

// --- 客户端 -> 服务器 的消息 ---
// 玩家在牌桌上可以执行的动作。抽牌和弃牌需要轮到自己，敲牌和重开不需要。

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// 从牌堆或弃牌堆抽一张牌
    Draw { source: DrawSource },
    /// 弃掉手里的一张牌
    Discard { card: Card },
    /// 敲牌结束本局
    Knock,
    /// 清空累计分数并重新开始
    ResetGame,
}

// --- 服务器 -> 客户端 的消息 ---

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// 加入成功后私密地发给该玩家
    Joined {
        seat: Seat,
        hand: Vec<Card>,
        discard_top: Option<Card>,
    },

    /// 另一位玩家加入了牌桌
    PlayerJoined { name: String, seat: Seat },

    /// 一位玩家离开了牌桌
    PlayerLeft { name: String, seat: Seat },

    /// 每次动作之后的完整状态快照
    StateUpdate(GameSnapshot),

    /// 一局结束，随后服务器会自动开始下一局
    RoundOver {
        winner: Seat,
        award: Option<Award>,
        scores: [u32; SEATS],
    },

    /// 累计分数已清零
    GameReset,

    /// 只发给出错的那位玩家
    Error { message: String },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error { message: message.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{Rank, Suit};

    #[test]
    fn test_client_message_json_shape() {
        let msg = ClientMessage::Draw { source: DrawSource::Discard };
        assert_eq!(serde_json::to_string(&msg).unwrap(), r#"{"Draw":{"source":"discard"}}"#);
        assert_eq!(serde_json::to_string(&ClientMessage::Knock).unwrap(), r#""Knock""#);

        let text = r#"{"Discard":{"card":{"rank":"Ten","suit":"Heart"}}}"#;
        let parsed: ClientMessage = serde_json::from_str(text).unwrap();
        assert_eq!(parsed, ClientMessage::Discard { card: Card::new(Rank::Ten, Suit::Heart) });
    }

    #[test]
    fn test_unknown_client_message_is_an_error() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"Bet":{"amount":5}}"#).is_err());
    }
}
