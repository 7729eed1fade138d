use crate::card::{Card, Rank, Suit};
use std::collections::{HashMap, HashSet};

/// 组成一个牌组 (刻子或顺子) 所需的最少张数
pub const MIN_MELD_LEN: usize = 3;
/// 允许敲牌 (knock) 的最大散牌数
pub const KNOCK_LIMIT: usize = 10;

// --- 牌组识别 ---

/// 找出手牌中所有被算作牌组的牌
///
/// 这是一个贪心的分类，不会搜索使散牌最少的最优划分：
/// 1. 刻子：同点数的牌 >= 3 张时全部计入 (四张同点数则四张都计入)。
/// 2. 顺子：每种花色单独按点数升序排列，扫描极大连续段，长度 >= 3 的整段计入。
///    A 只能在最小端，K 之后不回绕。
/// 3. 结果是两者的并集，同一张牌可以同时属于刻子和顺子。
pub fn melded_cards(cards: &[Card]) -> HashSet<Card> {
    let mut melded = HashSet::new();

    let mut by_rank: HashMap<Rank, Vec<Card>> = HashMap::new();
    for card in cards {
        by_rank.entry(card.rank).or_default().push(*card);
    }
    for group in by_rank.into_values() {
        if group.len() >= MIN_MELD_LEN {
            melded.extend(group);
        }
    }

    for suit in Suit::ALL {
        let mut suited: Vec<Card> = cards.iter().filter(|c| c.suit == suit).copied().collect();
        suited.sort_by_key(|c| c.rank.value());

        let mut run: Vec<Card> = Vec::new();
        for card in suited {
            let extends = run.last().is_none_or(|last| card.rank.value() == last.rank.value() + 1);
            if !extends {
                if run.len() >= MIN_MELD_LEN {
                    melded.extend(run.iter().copied());
                }
                run.clear();
            }
            run.push(card);
        }
        // 别忘了最后一段
        if run.len() >= MIN_MELD_LEN {
            melded.extend(run);
        }
    }

    melded
}

/// 散牌数：不在任何牌组中的牌的 *张数* (不是点数之和)
pub fn deadwood(cards: &[Card]) -> usize {
    let melded = melded_cards(cards);
    cards.iter().filter(|c| !melded.contains(*c)).count()
}

pub fn can_knock(cards: &[Card]) -> bool {
    deadwood(cards) <= KNOCK_LIMIT
}

pub fn is_gin(cards: &[Card]) -> bool {
    deadwood(cards) == 0
}

/// 显示用的排序：牌组中的牌在前，散牌在后，两部分各自按 (点数, 花色) 升序
pub fn sorted_for_display(cards: &[Card]) -> Vec<Card> {
    let melded = melded_cards(cards);
    let (mut in_meld, mut loose): (Vec<Card>, Vec<Card>) =
        cards.iter().partition(|c| melded.contains(*c));
    in_meld.sort();
    loose.sort();
    in_meld.extend(loose);
    in_meld
}

// --- 单元测试 ---
