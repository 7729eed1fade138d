use anyhow::Context;
use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use url::Url;
use uuid::Uuid;

use gin_rummy_core::{Card, ClientMessage, DrawSource, GameSnapshot, Seat, ServerMessage};

/// 金拉米终端客户端
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// 服务器地址
    #[arg(long, default_value = "ws://127.0.0.1:25917")]
    url: String,

    /// 牌桌ID，不填则随机生成一个新牌桌
    #[arg(long)]
    game: Option<String>,

    /// 昵称
    #[arg(long, default_value = "player")]
    name: String,
}

/// 用户输入的一条命令
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Send(ClientMessage),
    Help,
    Exit,
}

const HELP: &str = "\
可用命令:
  draw deck                 - 从牌堆抽牌
  draw discard              - 从弃牌堆抽牌
  discard <牌>              - 弃牌，例如 discard 10♥ 或 discard th
  knock                     - 敲牌
  reset                     - 分数清零，重新开始
  help                      - 显示帮助
  exit                      - 退出";

fn parse_command(line: &str) -> Result<Command, String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    match parts.as_slice() {
        ["draw", "deck"] => Ok(Command::Send(ClientMessage::Draw { source: DrawSource::Deck })),
        ["draw", "discard"] => Ok(Command::Send(ClientMessage::Draw { source: DrawSource::Discard })),
        ["draw", ..] => Err("用法: draw deck|discard".to_string()),
        ["discard", card] => card
            .parse::<Card>()
            .map(|card| Command::Send(ClientMessage::Discard { card }))
            .map_err(|e| format!("无效的牌: {}", e)),
        ["discard", ..] => Err("用法: discard <牌>".to_string()),
        ["knock"] => Ok(Command::Send(ClientMessage::Knock)),
        ["reset"] => Ok(Command::Send(ClientMessage::ResetGame)),
        ["help"] => Ok(Command::Help),
        ["exit"] => Ok(Command::Exit),
        _ => Err(format!("未知命令: {}", line.trim())),
    }
}

fn join_cards(cards: &[Card]) -> String {
    cards.iter().map(Card::to_string).collect::<Vec<_>>().join(" ")
}

/// 把快照渲染成给某个座位看的文字
fn render_snapshot(snapshot: &GameSnapshot, seat: Seat) -> String {
    let turn = if snapshot.turn == seat { "轮到你了" } else { "等待对手" };
    let discard_top = snapshot.discard_top.map_or("(空)".to_string(), |c| c.to_string());
    format!(
        "手牌: {}\n牌组: {}\n弃牌堆顶: {}\n{} | 散牌 {} | 比分 {} : {}",
        join_cards(&snapshot.hands[seat]),
        join_cards(&snapshot.melds[seat]),
        discard_top,
        turn,
        snapshot.deadwood[seat],
        snapshot.scores[seat],
        snapshot.scores[1 - seat],
    )
}

fn render_message(msg: &ServerMessage, seat: Option<Seat>) -> String {
    match (msg, seat) {
        (ServerMessage::Joined { seat, hand, discard_top }, _) => format!(
            "你坐在 {} 号座位\n手牌: {}\n弃牌堆顶: {}",
            seat,
            join_cards(hand),
            discard_top.map_or("(空)".to_string(), |c| c.to_string()),
        ),
        (ServerMessage::StateUpdate(snapshot), Some(seat)) => render_snapshot(snapshot, seat),
        (ServerMessage::PlayerJoined { name, seat }, _) => format!("{} 坐到了 {} 号座位", name, seat),
        (ServerMessage::PlayerLeft { name, seat }, _) => format!("{} 离开了 {} 号座位", name, seat),
        (ServerMessage::RoundOver { winner, award, scores }, _) => format!(
            "本局结束，{} 号座位结束了本局 ({:?})，比分 {:?}",
            winner, award, scores
        ),
        (ServerMessage::GameReset, _) => "比分已清零".to_string(),
        (ServerMessage::Error { message }, _) => format!("错误: {}", message),
        (other, None) => format!("{:#?}", other),
    }
}

/// 拼出加入牌桌的地址，牌桌ID和昵称各占一个转义后的路径段
fn build_url(base: &str, game: &str, name: &str) -> anyhow::Result<Url> {
    let mut url = Url::parse(base).context("无效的服务器地址")?;
    url.path_segments_mut()
        .map_err(|_| anyhow::anyhow!("服务器地址不能带路径: {}", base))?
        .pop_if_empty()
        .extend(["ws", "game", game, name]);
    Ok(url)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let game = args.game.unwrap_or_else(|| Uuid::new_v4().simple().to_string());
    let url = build_url(&args.url, &game, &args.name)?;

    println!("正在连接到: {}", url);
    let (ws_stream, _) = connect_async(url.as_str()).await.context("无法连接")?;
    println!("连接成功! 牌桌ID: {}", game);

    let (mut write, mut read) = ws_stream.split();

    // 启动一个任务来处理从服务器接收的消息
    tokio::spawn(async move {
        let mut my_seat = None;
        while let Some(msg) = read.next().await {
            match msg {
                Ok(Message::Text(text)) => match serde_json::from_str::<ServerMessage>(&text) {
                    Ok(server_msg) => {
                        if let ServerMessage::Joined { seat, .. } = &server_msg {
                            my_seat = Some(*seat);
                        }
                        println!("\n<-- {}\n", render_message(&server_msg, my_seat));
                        print!("> "); // 重新显示输入提示符
                        let _ = std::io::stdout().flush();
                    }
                    Err(e) => eprintln!("解析服务器消息失败: {}", e),
                },
                Ok(Message::Close(_)) => {
                    println!("\n服务器关闭了连接");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    eprintln!("接收消息时出错: {}", e);
                    break;
                }
            }
        }
    });

    // 主任务处理用户输入
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    println!("--- 金拉米客户端 ---");
    println!("{}", HELP);

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = stdin.next_line().await? else { break };
        if line.trim().is_empty() {
            continue;
        }

        match parse_command(&line) {
            Ok(Command::Send(msg)) => {
                let payload = serde_json::to_string(&msg)?;
                write.send(Message::Text(payload.into())).await?;
            }
            Ok(Command::Help) => println!("{}", HELP),
            Ok(Command::Exit) => {
                println!("正在断开连接...");
                break;
            }
            Err(e) => println!("{}", e),
        }
    }

    let _ = write.close().await;
    Ok(())
}
