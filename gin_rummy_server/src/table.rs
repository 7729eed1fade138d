use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex as P_Mutex;
use tokio::sync::{mpsc, watch, RwLock};
use uuid::Uuid;

use gin_rummy_core::{ClientMessage, GameSession, RoundResult, Seat, ServerMessage, SEATS};

pub type GameId = String;
pub type ConnectionId = Uuid;

pub const NOT_YOUR_TURN: &str = "Not your turn";
pub const CANNOT_KNOCK: &str = "Cannot knock yet";
pub const GAME_FULL: &str = "Game already has 2 players";
pub const TABLE_CLOSED: &str = "Game closed due to inactivity";

// 单张牌桌的状态
// 重要‼️：严格规定使用锁的顺序，避免死锁：
// players -> session
pub struct Table {
    pub session: P_Mutex<GameSession>,
    // 将连接映射到座位和发送通道
    pub players: RwLock<HashMap<ConnectionId, PlayerConnection>>,
    last_active: P_Mutex<Instant>,
    // 牌桌被移除后置为 true，所有连接随之断开
    closed: watch::Sender<bool>,
}

// 玩家的网络连接信息
pub struct PlayerConnection {
    pub name: String,
    pub seat: Seat,
    // 用于向该玩家的 WebSocket 任务发送消息的通道
    pub sender: mpsc::Sender<ServerMessage>,
}

/// 处理一个动作后要发出的消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// 只发给发起动作的玩家
    Reply(ServerMessage),
    /// 发给牌桌上所有玩家
    Broadcast(ServerMessage),
}

impl Table {
    pub fn new(session: GameSession) -> Self {
        Table {
            session: P_Mutex::new(session),
            players: RwLock::new(HashMap::new()),
            last_active: P_Mutex::new(Instant::now()),
            closed: watch::Sender::new(false),
        }
    }

    pub fn touch(&self) {
        *self.last_active.lock() = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_active.lock().elapsed()
    }

    pub fn close(&self) {
        self.closed.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    pub fn subscribe_closed(&self) -> watch::Receiver<bool> {
        self.closed.subscribe()
    }
}

/// 找到编号最小的空座位
pub fn free_seat<'a>(taken: impl IntoIterator<Item = &'a PlayerConnection>) -> Option<Seat> {
    let taken: Vec<Seat> = taken.into_iter().map(|p| p.seat).collect();
    (0..SEATS).find(|seat| !taken.contains(seat))
}

/// 处理某个座位发来的动作
///
/// 这里负责核心库不做的轮次检查：抽牌和弃牌必须轮到自己，敲牌需要散牌不超过上限。
/// 一局结束时依次广播结束时的快照、本局结果，然后自动开始新的一局并再广播一次快照。
pub fn handle_action(session: &mut GameSession, seat: Seat, msg: ClientMessage) -> Vec<Outbound> {
    let needs_turn = matches!(msg, ClientMessage::Draw { .. } | ClientMessage::Discard { .. });
    if needs_turn && session.round().turn() != seat {
        return vec![Outbound::Reply(ServerMessage::error(NOT_YOUR_TURN))];
    }

    let mut out = Vec::new();
    match msg {
        ClientMessage::Draw { source } => {
            session.draw(seat, source);
        }
        ClientMessage::Discard { card } => {
            if let Some(result) = session.discard(seat, card) {
                finish_round(session, result, &mut out);
                return out;
            }
        }
        ClientMessage::Knock => {
            if !session.can_knock(seat) {
                return vec![Outbound::Reply(ServerMessage::error(CANNOT_KNOCK))];
            }
            if let Some(result) = session.knock(seat) {
                finish_round(session, result, &mut out);
                return out;
            }
        }
        ClientMessage::ResetGame => {
            session.reset_game();
            out.push(Outbound::Broadcast(ServerMessage::StateUpdate(session.snapshot())));
            out.push(Outbound::Broadcast(ServerMessage::GameReset));
            return out;
        }
    }

    out.push(Outbound::Broadcast(ServerMessage::StateUpdate(session.snapshot())));
    out
}

fn finish_round(session: &mut GameSession, result: RoundResult, out: &mut Vec<Outbound>) {
    out.push(Outbound::Broadcast(ServerMessage::StateUpdate(session.snapshot())));
    out.push(Outbound::Broadcast(ServerMessage::RoundOver {
        winner: result.winner,
        award: result.award,
        scores: session.scores(),
    }));
    session.start_new_round();
    out.push(Outbound::Broadcast(ServerMessage::StateUpdate(session.snapshot())));
}
