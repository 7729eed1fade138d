use crate::card::{Card, Deck};
use crate::hand::Hand;
use crate::meld;
use crate::scoring::Award;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

/// 座位号，只有 0 和 1 两个座位
pub type Seat = usize;
pub const SEATS: usize = 2;
/// 每位玩家发牌的张数
pub const HAND_SIZE: usize = 10;

pub fn opponent(seat: Seat) -> Seat {
    1 - seat
}

/// 抽牌来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawSource {
    Deck,    // 牌堆顶
    Discard, // 弃牌堆顶
}

/// 一局 (Round) 的完整状态，由服务端独占
///
/// 任何时刻 牌堆 + 两手牌 + 弃牌堆 恰好是 52 张不重复的牌。
#[derive(Debug, Clone)]
pub struct Round {
    pub(crate) deck: Deck,
    // 栈顶 (最后一个元素) 是最近弃的牌
    pub(crate) discard_pile: Vec<Card>,
    pub(crate) hands: [Hand; SEATS],
    pub(crate) turn: Seat,
    pub(crate) winner: Option<Seat>,
    // 最近一次计算的散牌数，只在重新计算后才可信
    pub(crate) deadwood: [usize; SEATS],
}

/// 一局所处的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundPhase {
    Active { turn: Seat },
    Over { winner: Seat },
}

/// 一局进入结束状态时的信息
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundEnd {
    pub winner: Seat,
    pub deadwood: [usize; SEATS],
}

/// 结束的一局连同计分结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundResult {
    pub winner: Seat,
    pub deadwood: [usize; SEATS],
    pub award: Option<Award>,
}

/// 一场游戏：跨局累计的分数加上当前这一局
///
/// 随机源通过泛型注入，测试时传入固定种子即可复现洗牌。
/// 本结构不是线程安全的，调用方需要串行化所有修改操作。
#[derive(Debug)]
pub struct GameSession<R = StdRng> {
    pub(crate) scores: [u32; SEATS],
    pub(crate) round: Round,
    pub(crate) rng: R,
}

/// 每次动作之后广播给所有参与者的状态快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub hands: [Vec<Card>; SEATS], // 牌组在前、散牌在后的排序手牌
    pub melds: [Vec<Card>; SEATS],
    pub discard_top: Option<Card>,
    pub turn: Seat,
    pub winner: Option<Seat>,
    pub deadwood: [usize; SEATS],
    pub scores: [u32; SEATS],
}

// --- Round 的只读方法 ---

impl Round {
    pub fn phase(&self) -> RoundPhase {
        match self.winner {
            Some(winner) => RoundPhase::Over { winner },
            None => RoundPhase::Active { turn: self.turn },
        }
    }

    pub fn is_over(&self) -> bool {
        self.winner.is_some()
    }

    pub fn turn(&self) -> Seat {
        self.turn
    }

    pub fn winner(&self) -> Option<Seat> {
        self.winner
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn discard_pile(&self) -> &[Card] {
        &self.discard_pile
    }

    pub fn discard_top(&self) -> Option<Card> {
        self.discard_pile.last().copied()
    }

    pub fn hand(&self, seat: Seat) -> Option<&Hand> {
        self.hands.get(seat)
    }

    /// 缓存的散牌数，见 `refresh_deadwood`
    pub fn cached_deadwood(&self) -> [usize; SEATS] {
        self.deadwood
    }

    pub fn can_knock(&self, seat: Seat) -> bool {
        self.hands.get(seat).is_some_and(|h| meld::can_knock(h.cards()))
    }

    /// 手牌排序：牌组在前、散牌在后
    pub fn sorted_hand(&self, seat: Seat) -> Vec<Card> {
        self.hands.get(seat).map(|h| meld::sorted_for_display(h.cards())).unwrap_or_default()
    }

    /// 手牌中被算作牌组的牌，按显示顺序排列
    pub fn melds(&self, seat: Seat) -> Vec<Card> {
        let Some(hand) = self.hands.get(seat) else {
            return Vec::new();
        };
        let mut melded: Vec<Card> = meld::melded_cards(hand.cards()).into_iter().collect();
        melded.sort();
        melded
    }

    pub fn deadwood_of(&self, seat: Seat) -> usize {
        self.hands.get(seat).map_or(0, |h| meld::deadwood(h.cards()))
    }
}

// --- GameSession 的只读方法 ---

impl<R> GameSession<R> {
    pub fn round(&self) -> &Round {
        &self.round
    }

    pub fn scores(&self) -> [u32; SEATS] {
        self.scores
    }

    pub fn can_knock(&self, seat: Seat) -> bool {
        self.round.can_knock(seat)
    }

    pub fn sorted_hand(&self, seat: Seat) -> Vec<Card> {
        self.round.sorted_hand(seat)
    }

    pub fn melds(&self, seat: Seat) -> Vec<Card> {
        self.round.melds(seat)
    }

    /// 生成状态快照，散牌数总是重新计算
    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            hands: [self.sorted_hand(0), self.sorted_hand(1)],
            melds: [self.melds(0), self.melds(1)],
            discard_top: self.round.discard_top(),
            turn: self.round.turn,
            winner: self.round.winner,
            deadwood: [self.round.deadwood_of(0), self.round.deadwood_of(1)],
            scores: self.scores,
        }
    }
}
