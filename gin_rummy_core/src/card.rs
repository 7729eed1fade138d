use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// --- 核心数据结构定义 ---

/// 花色 (Suit)
/// 变体顺序即枚举顺序 ♠ ♥ ♦ ♣，排序时作为次关键字
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub enum Suit {
    Spade,   // 黑桃 ♠
    Heart,   // 红心 ♥
    Diamond, // 方块 ♦
    Club,    // 梅花 ♣
}

/// 点数 (Rank)
/// 金拉米中 A 只能当最小的牌 (A-2-3 是顺子，Q-K-A 不是)
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub enum Rank {
    Ace,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
}

/// 单张扑克牌 (Card)
/// 字段顺序决定了派生的 `Ord`：先比点数，再比花色
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Spade, Suit::Heart, Suit::Diamond, Suit::Club];

    /// 花色在枚举顺序中的下标 (♠=0 ... ♣=3)
    pub fn index(self) -> usize {
        self as usize
    }
}

impl Rank {
    pub const ALL: [Rank; 13] = [
        Rank::Ace, Rank::Two, Rank::Three, Rank::Four, Rank::Five, Rank::Six, Rank::Seven,
        Rank::Eight, Rank::Nine, Rank::Ten, Rank::Jack, Rank::Queen, Rank::King,
    ];

    /// 点数的序数值，A=1 ... K=13
    pub fn value(self) -> u8 {
        self as u8 + 1
    }
}

impl Card {
    pub fn new(rank: Rank, suit: Suit) -> Card {
        Card { rank, suit }
    }
}

// --- 实现辅助功能 ---

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", match self {
            Suit::Spade => "♠",
            Suit::Heart => "♥",
            Suit::Diamond => "♦",
            Suit::Club => "♣",
        })
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", match self {
            Rank::Ace => "A",
            Rank::Two => "2",
            Rank::Three => "3",
            Rank::Four => "4",
            Rank::Five => "5",
            Rank::Six => "6",
            Rank::Seven => "7",
            Rank::Eight => "8",
            Rank::Nine => "9",
            Rank::Ten => "10",
            Rank::Jack => "J",
            Rank::Queen => "Q",
            Rank::King => "K",
        })
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.rank, self.suit)
    }
}

// --- 从文本解析 (终端输入用) ---

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseCardError {
    #[error("empty card text")]
    Empty,
    #[error("unknown rank `{0}`")]
    Rank(String),
    #[error("unknown suit `{0}`")]
    Suit(String),
}

impl FromStr for Suit {
    type Err = ParseCardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "♠" | "S" => Ok(Suit::Spade),
            "♥" | "H" => Ok(Suit::Heart),
            "♦" | "D" => Ok(Suit::Diamond),
            "♣" | "C" => Ok(Suit::Club),
            _ => Err(ParseCardError::Suit(s.to_string())),
        }
    }
}

impl FromStr for Rank {
    type Err = ParseCardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_ascii_uppercase();
        Rank::ALL
            .into_iter()
            .find(|r| r.to_string() == upper || (upper == "T" && *r == Rank::Ten))
            .ok_or_else(|| ParseCardError::Rank(s.to_string()))
    }
}

/// 格式为 点数+花色，例如 `10♥`、`QS`、`ah`
impl FromStr for Card {
    type Err = ParseCardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        // 花色总是最后一个字符 (可能是多字节的 ♠)
        let (split_at, _) = s.char_indices().last().ok_or(ParseCardError::Empty)?;
        let (rank, suit) = s.split_at(split_at);
        Ok(Card::new(rank.parse()?, suit.parse()?))
    }
}

// --- 牌堆 (Deck) ---

/// 一副牌，按栈使用：从末尾抽牌
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    /// 按固定顺序 (先花色再点数) 创建完整的 52 张牌
    pub fn new() -> Deck {
        let mut cards = Vec::with_capacity(52);
        for &suit in &Suit::ALL {
            for &rank in &Rank::ALL {
                cards.push(Card { rank, suit });
            }
        }
        Deck { cards }
    }

    pub fn shuffled<R: Rng + ?Sized>(rng: &mut R) -> Deck {
        let mut deck = Deck::new();
        deck.shuffle(rng);
        deck
    }

    /// Fisher-Yates 洗牌，52! 种排列等概率
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.cards.shuffle(rng);
    }

    /// 抽一张牌，牌堆为空时返回 None
    pub fn draw(&mut self) -> Option<Card> {
        self.cards.pop()
    }

    /// 连续抽 n 张牌，牌不够时有多少发多少
    pub fn deal(&mut self, n: usize) -> Vec<Card> {
        (0..n).map_while(|_| self.draw()).collect()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }
}

impl Default for Deck {
    fn default() -> Self {
        Deck::new()
    }
}

impl From<Vec<Card>> for Deck {
    fn from(cards: Vec<Card>) -> Self {
        Deck { cards }
    }
}

// --- 单元测试 ---
