mod table;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use clap::Parser;
use dashmap::DashMap;
use futures_util::{stream::StreamExt, SinkExt};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use gin_rummy_core::{ClientMessage, GameSession, Seat, ServerMessage};
use table::{
    free_seat, handle_action, ConnectionId, GameId, Outbound, PlayerConnection, Table, GAME_FULL,
    TABLE_CLOSED,
};

/// 金拉米 websocket 服务器
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// 监听地址
    #[arg(long, env = "GIN_RUMMY_BIND", default_value = "0.0.0.0:25917")]
    bind: SocketAddr,

    /// 牌桌空闲多少秒后被回收
    #[arg(long, default_value_t = 1800)]
    idle_timeout_secs: u64,

    /// 检查空闲牌桌的间隔 (秒)
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
    sweep_interval_secs: u64,

    /// 固定洗牌种子，每张新牌桌的发牌都可复现
    #[arg(long)]
    seed: Option<u64>,
}

// 服务器全局状态：按牌桌ID索引的牌桌表
// 第一位玩家加入时创建，最后一位玩家离开或空闲超时后移除
struct AppState {
    tables: DashMap<GameId, Arc<Table>>,
    idle_timeout: Duration,
    seed: Option<u64>,
}

impl AppState {
    fn new_session(&self) -> GameSession {
        match self.seed {
            Some(seed) => GameSession::with_seed(seed),
            None => GameSession::new(),
        }
    }
}

type SharedState = Arc<AppState>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let state = SharedState::new(AppState {
        tables: DashMap::new(),
        idle_timeout: Duration::from_secs(args.idle_timeout_secs),
        seed: args.seed,
    });

    tokio::spawn(sweep_idle_tables(state.clone(), Duration::from_secs(args.sweep_interval_secs)));

    let app = Router::new()
        .route("/ws/game/{game_id}/{player_name}", get(websocket_handler))
        .with_state(state);

    info!("服务器正在监听 {}", args.bind);
    let listener = tokio::net::TcpListener::bind(args.bind).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// 处理 WebSocket 连接请求
async fn websocket_handler(
    ws: WebSocketUpgrade,
    Path((game_id, player_name)): Path<(GameId, String)>,
    State(state): State<SharedState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, game_id, player_name))
}

/// 处理单个 WebSocket 连接的生命周期
async fn handle_socket(socket: WebSocket, state: SharedState, game_id: GameId, player_name: String) {
    let (mut sender, mut receiver) = socket.split();

    // 创建一个 MPSC 通道，用于从其他任务接收要发送的消息
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(32);

    // 启动一个新任务，专门负责将 MPSC 通道中的消息发送到 WebSocket
    // 所有发送端都被丢弃后关闭连接
    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let payload = match serde_json::to_string(&msg) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!("序列化消息失败: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(payload.into())).await.is_err() {
                // 发送失败，说明客户端已断开，退出任务
                break;
            }
        }
        let _ = sender.close().await;
    });

    let conn_id = Uuid::new_v4();
    let Some((table, seat)) = join_table(&state, &game_id, &player_name, conn_id, &tx).await else {
        info!("牌桌 {} 已满，拒绝玩家 {}", game_id, player_name);
        let _ = tx.send(ServerMessage::error(GAME_FULL)).await;
        drop(tx);
        let _ = writer.await;
        return;
    };
    info!("玩家 {} 以 {} 号座位加入了牌桌 {}", player_name, seat, game_id);

    let mut closed = table.subscribe_closed();

    // 主循环，处理从客户端接收到的消息
    loop {
        // 订阅之前就已关闭的情况 changed() 不会触发
        if table.is_closed() {
            break;
        }
        let msg = tokio::select! {
            _ = closed.changed() => {
                info!("牌桌 {} 已关闭，断开玩家 {}", game_id, player_name);
                break;
            }
            msg = receiver.next() => msg,
        };
        let Some(Ok(msg)) = msg else { break };
        let Message::Text(text) = msg else { continue };

        let client_msg = match serde_json::from_str::<ClientMessage>(&text) {
            Ok(client_msg) => client_msg,
            Err(e) => {
                warn!("解析消息失败: {}", e);
                continue;
            }
        };

        table.touch();
        // 整个动作 (修改 + 广播) 都在 players 写锁下完成，保证快照按顺序送达
        // 持锁期间不能 await 发送，只用 try_send
        let players = table.players.write().await;
        let outbound = handle_action(&mut table.session.lock(), seat, client_msg);
        for out in outbound {
            match out {
                Outbound::Reply(msg) => deliver(&player_name, &tx, msg),
                Outbound::Broadcast(msg) => broadcast(players.iter(), &msg, None),
            }
        }
        drop(players);
    }

    // 客户端断开连接，执行清理工作
    handle_disconnect(&state, &game_id, &table, conn_id).await;
    info!("客户端连接关闭");
}

/// 让玩家坐到牌桌的空座位上，牌桌不存在时创建
///
/// 成功后私密地发送 `Joined`，通知其他玩家，并广播一次状态快照。
/// 两个座位都已有人时返回 None。
async fn join_table(
    state: &SharedState,
    game_id: &GameId,
    player_name: &str,
    conn_id: ConnectionId,
    tx: &mpsc::Sender<ServerMessage>,
) -> Option<(Arc<Table>, Seat)> {
    loop {
        let table = state
            .tables
            .entry(game_id.clone())
            .or_insert_with(|| {
                info!("创建了新牌桌 {}", game_id);
                Arc::new(Table::new(state.new_session()))
            })
            .clone();

        let mut players = table.players.write().await;
        // 拿到锁之前牌桌可能刚被移除，重新取一次
        if table.is_closed() {
            continue;
        }
        let seat = free_seat(players.values())?;
        players.insert(conn_id, PlayerConnection {
            name: player_name.to_string(),
            seat,
            sender: tx.clone(),
        });
        table.touch();

        let (hand, discard_top, snapshot) = {
            let session = table.session.lock();
            (session.sorted_hand(seat), session.round().discard_top(), session.snapshot())
        };
        deliver(player_name, tx, ServerMessage::Joined { seat, hand, discard_top });
        let join_msg = ServerMessage::PlayerJoined { name: player_name.to_string(), seat };
        broadcast(players.iter(), &join_msg, Some(conn_id));
        broadcast(players.iter(), &ServerMessage::StateUpdate(snapshot), None);

        drop(players);
        return Some((table, seat));
    }
}

/// 玩家断开连接后的处理
async fn handle_disconnect(state: &SharedState, game_id: &GameId, table: &Arc<Table>, conn_id: ConnectionId) {
    let mut players = table.players.write().await;
    // 牌桌被回收时连接表已经清空
    let Some(conn) = players.remove(&conn_id) else {
        return;
    };
    info!("玩家 {} 从牌桌 {} 断开连接", conn.name, game_id);

    let left_msg = ServerMessage::PlayerLeft { name: conn.name, seat: conn.seat };
    broadcast(players.iter(), &left_msg, None);

    // 判断是否清空牌桌
    if players.is_empty() {
        table.close();
        state.tables.remove_if(game_id, |_, t| Arc::ptr_eq(t, table));
        info!("牌桌 {} 已空，已被移除", game_id);
    }
}

/// 定期回收空闲超时的牌桌
async fn sweep_idle_tables(state: SharedState, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    loop {
        ticker.tick().await;
        sweep_once(&state);
    }
}

/// 回收一次空闲牌桌，返回被移除的牌桌ID
///
/// 正被占用的牌桌跳过，留到下一轮，一张牌桌卡住不会拖住其他牌桌。
fn sweep_once(state: &AppState) -> Vec<GameId> {
    let idle: Vec<(GameId, Arc<Table>)> = state
        .tables
        .iter()
        .filter(|entry| entry.value().idle_for() >= state.idle_timeout)
        .map(|entry| (entry.key().clone(), entry.value().clone()))
        .collect();

    let mut removed = Vec::new();
    for (game_id, table) in idle {
        let Ok(mut players) = table.players.try_write() else {
            debug!("牌桌 {} 正忙，下次再回收", game_id);
            continue;
        };
        table.close();
        state.tables.remove_if(&game_id, |_, t| Arc::ptr_eq(t, &table));
        broadcast(players.iter(), &ServerMessage::error(TABLE_CLOSED), None);
        players.clear();
        info!("牌桌 {} 空闲超时，已被移除", game_id);
        removed.push(game_id);
    }
    removed
}

/// 不等待地把消息放进某个玩家的发送通道
///
/// 通道满了说明客户端读得太慢，丢弃这条消息；后面的快照总是完整的局面。
fn deliver(name: &str, sender: &mpsc::Sender<ServerMessage>, message: ServerMessage) {
    match sender.try_send(message) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => warn!("玩家 {} 的发送队列已满，丢弃一条消息", name),
        // 该玩家已断开，后续由其自己的 handle_socket 任务处理
        Err(TrySendError::Closed(_)) => warn!("向玩家 {} 发送消息失败（可能已断开）", name),
    }
}

/// 向牌桌上所有玩家广播消息
fn broadcast<'a>(
    players: impl Iterator<Item = (&'a ConnectionId, &'a PlayerConnection)>,
    message: &ServerMessage,
    exclude: Option<ConnectionId>,
) {
    for (conn_id, conn) in players {
        if Some(*conn_id) == exclude {
            continue;
        }
        deliver(&conn.name, &conn.sender, message.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_args() {
        let args = Args::parse_from(["gin_rummy_server"]);
        assert_eq!(args.bind, "0.0.0.0:25917".parse().unwrap());
        assert_eq!(args.idle_timeout_secs, 1800);
        assert_eq!(args.sweep_interval_secs, 60);
        assert_eq!(args.seed, None);
    }

    #[test]
    fn test_zero_sweep_interval_is_rejected() {
        assert!(Args::try_parse_from(["gin_rummy_server", "--sweep-interval-secs", "0"]).is_err());
    }

    #[tokio::test]
    async fn test_join_fills_two_seats_then_rejects() {
        let state = SharedState::new(AppState {
            tables: DashMap::new(),
            idle_timeout: Duration::from_secs(60),
            seed: Some(1),
        });
        let game_id: GameId = "table-1".to_string();
        let (tx, mut rx) = mpsc::channel(32);

        let (first, seat0) = join_table(&state, &game_id, "alice", Uuid::new_v4(), &tx).await.unwrap();
        let (_, seat1) = join_table(&state, &game_id, "bob", Uuid::new_v4(), &tx).await.unwrap();
        assert_eq!((seat0, seat1), (0, 1));
        assert!(join_table(&state, &game_id, "carol", Uuid::new_v4(), &tx).await.is_none());

        match rx.recv().await {
            Some(ServerMessage::Joined { seat, hand, .. }) => {
                assert_eq!(seat, 0);
                assert_eq!(hand.len(), 10);
            }
            other => panic!("expected joined, got {:?}", other),
        }
        assert_eq!(state.tables.len(), 1);
        assert_eq!(first.players.read().await.len(), 2);
    }

    #[tokio::test]
    async fn test_last_disconnect_removes_table() {
        let state = SharedState::new(AppState {
            tables: DashMap::new(),
            idle_timeout: Duration::from_secs(60),
            seed: None,
        });
        let game_id: GameId = "table-2".to_string();
        let (tx, _rx) = mpsc::channel(32);
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        let (table, _) = join_table(&state, &game_id, "alice", a, &tx).await.unwrap();
        join_table(&state, &game_id, "bob", b, &tx).await.unwrap();

        handle_disconnect(&state, &game_id, &table, a).await;
        assert!(state.tables.contains_key(&game_id));
        assert!(!table.is_closed());

        handle_disconnect(&state, &game_id, &table, b).await;
        assert!(!state.tables.contains_key(&game_id));
        assert!(table.is_closed());

        // 同一个ID再次加入会得到一张新的牌桌
        let (fresh, seat) = join_table(&state, &game_id, "carol", Uuid::new_v4(), &tx).await.unwrap();
        assert_eq!(seat, 0);
        assert!(!Arc::ptr_eq(&fresh, &table));
    }

    fn idle_state() -> SharedState {
        SharedState::new(AppState { tables: DashMap::new(), idle_timeout: Duration::ZERO, seed: Some(3) })
    }

    #[tokio::test]
    async fn test_broadcast_skips_full_channel() {
        let state = idle_state();
        let game_id: GameId = "slow".to_string();
        // 只有一个槽位、从不读取的客户端
        let (slow_tx, mut slow_rx) = mpsc::channel(1);
        let (fast_tx, mut fast_rx) = mpsc::channel(32);

        let (table, _) = join_table(&state, &game_id, "slow", Uuid::new_v4(), &slow_tx).await.unwrap();
        join_table(&state, &game_id, "fast", Uuid::new_v4(), &fast_tx).await.unwrap();
        assert_eq!(slow_tx.capacity(), 0);

        let players = table.players.write().await;
        broadcast(players.iter(), &ServerMessage::GameReset, None);
        drop(players);

        let mut fast_msgs = Vec::new();
        while let Ok(msg) = fast_rx.try_recv() {
            fast_msgs.push(msg);
        }
        assert_eq!(fast_msgs.last(), Some(&ServerMessage::GameReset));
        // 慢客户端只保留了第一条消息
        assert!(matches!(slow_rx.try_recv(), Ok(ServerMessage::Joined { seat: 0, .. })));
        assert!(slow_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_busy_table_does_not_block_sweep() {
        let state = idle_state();
        let (tx, _rx) = mpsc::channel(256);
        let busy_id: GameId = "busy".to_string();
        let (busy, _) = join_table(&state, &busy_id, "alice", Uuid::new_v4(), &tx).await.unwrap();
        for i in 0..20 {
            join_table(&state, &format!("idle-{}", i), "bob", Uuid::new_v4(), &tx).await.unwrap();
        }
        assert_eq!(state.tables.len(), 21);

        // 某个连接一直占着 busy 的 players 锁
        let guard = busy.players.write().await;
        let removed = sweep_once(&state);
        assert_eq!(removed.len(), 20);
        assert!(!removed.contains(&busy_id));
        let left: Vec<GameId> = state.tables.iter().map(|e| e.key().clone()).collect();
        assert_eq!(left, vec![busy_id.clone()]);
        assert!(!busy.is_closed());

        // 锁释放后下一轮把它也回收掉
        drop(guard);
        assert_eq!(sweep_once(&state), vec![busy_id]);
        assert!(state.tables.is_empty());
        assert!(busy.is_closed());
        assert!(busy.players.read().await.is_empty());
    }
}
