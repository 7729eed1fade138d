use crate::card::*;
use crate::hand::Hand;
use crate::meld::{self, KNOCK_LIMIT};
use crate::scoring::score_round;
use crate::state::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use tracing::debug;

// --- 一局的状态机 ---

impl Round {
    /// 洗牌并发牌，开始新的一局
    ///
    /// 两名玩家轮流各发 10 张，再翻一张作为弃牌堆的第一张，由 0 号座位先行动。
    pub fn deal<R: Rng + ?Sized>(rng: &mut R) -> Round {
        Round::deal_from(Deck::shuffled(rng))
    }

    /// 从给定的 (已洗好的) 牌堆发牌
    pub fn deal_from(mut deck: Deck) -> Round {
        let mut hands = [Hand::new(), Hand::new()];
        for _ in 0..HAND_SIZE {
            for hand in hands.iter_mut() {
                if let Some(card) = deck.draw() {
                    hand.add(card);
                }
            }
        }
        let discard_pile = deck.draw().into_iter().collect();

        Round { deck, discard_pile, hands, turn: 0, winner: None, deadwood: [0; SEATS] }
    }

    /// 用指定的手牌和弃牌堆摆出一个局面，轮到 0 号座位
    ///
    /// 其余的牌按固定顺序组成牌堆。有重复的牌时返回 None。
    pub fn from_hands(hands: [Vec<Card>; SEATS], discard_pile: Vec<Card>) -> Option<Round> {
        let mut used = HashSet::new();
        if !hands.iter().flatten().chain(&discard_pile).all(|c| used.insert(*c)) {
            return None;
        }
        let rest: Vec<Card> = Deck::new().cards().iter().filter(|c| !used.contains(*c)).copied().collect();
        let [hand0, hand1] = hands;
        Some(Round {
            deck: Deck::from(rest),
            discard_pile,
            hands: [Hand::from(hand0), Hand::from(hand1)],
            turn: 0,
            winner: None,
            deadwood: [0; SEATS],
        })
    }

    /// 玩家从牌堆或弃牌堆抽一张牌
    ///
    /// 本局已结束、座位无效或来源为空时什么都不做。
    /// 不检查是否轮到该玩家，也不改变行动权，轮次检查由调用方负责。
    pub fn draw(&mut self, seat: Seat, source: DrawSource) -> Option<Card> {
        if self.is_over() {
            debug!(seat, "本局已结束，忽略抽牌");
            return None;
        }
        let hand = self.hands.get_mut(seat)?;
        let card = match source {
            DrawSource::Deck => self.deck.draw(),
            DrawSource::Discard => self.discard_pile.pop(),
        };
        match card {
            Some(card) => hand.add(card),
            None => debug!(seat, ?source, "来源为空，忽略抽牌"),
        }
        card
    }

    /// 玩家弃一张牌
    ///
    /// 弃牌后若散牌为 0 则本局以金拉米结束并返回结束信息，否则行动权交给对手。
    /// 手里没有这张牌时拒绝，手牌保持不变。
    pub fn discard(&mut self, seat: Seat, card: Card) -> Option<RoundEnd> {
        if self.is_over() {
            debug!(seat, %card, "本局已结束，忽略弃牌");
            return None;
        }
        let hand = self.hands.get_mut(seat)?;
        if let Err(e) = hand.remove(card) {
            debug!(seat, error = %e, "弃牌被拒绝");
            return None;
        }
        self.discard_pile.push(card);

        if self.refresh_deadwood(seat) == Some(0) {
            Some(self.finish(seat))
        } else {
            self.turn = opponent(seat);
            None
        }
    }

    /// 玩家敲牌结束本局，散牌超过上限时什么都不做
    pub fn knock(&mut self, seat: Seat) -> Option<RoundEnd> {
        if self.is_over() {
            return None;
        }
        if self.refresh_deadwood(seat)? > KNOCK_LIMIT {
            debug!(seat, deadwood = self.deadwood[seat], "散牌太多，不能敲牌");
            return None;
        }
        Some(self.finish(seat))
    }

    /// 重新计算并缓存某个座位的散牌数，座位无效时返回 None
    pub(crate) fn refresh_deadwood(&mut self, seat: Seat) -> Option<usize> {
        let value = meld::deadwood(self.hands.get(seat)?.cards());
        self.deadwood[seat] = value;
        Some(value)
    }

    fn finish(&mut self, winner: Seat) -> RoundEnd {
        for seat in 0..SEATS {
            self.refresh_deadwood(seat);
        }
        self.winner = Some(winner);
        debug!(winner, deadwood = ?self.deadwood, "本局结束");
        RoundEnd { winner, deadwood: self.deadwood }
    }
}

// --- 一场游戏 ---

impl GameSession<StdRng> {
    /// 使用操作系统熵作为随机源
    pub fn new() -> Self {
        GameSession::with_rng(StdRng::from_os_rng())
    }

    /// 固定种子，洗牌结果可复现
    pub fn with_seed(seed: u64) -> Self {
        GameSession::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl Default for GameSession<StdRng> {
    fn default() -> Self {
        GameSession::new()
    }
}

impl<R: Rng> GameSession<R> {
    pub fn with_rng(mut rng: R) -> Self {
        let round = Round::deal(&mut rng);
        GameSession { scores: [0; SEATS], round, rng }
    }

    pub fn draw(&mut self, seat: Seat, source: DrawSource) -> Option<Card> {
        self.round.draw(seat, source)
    }

    pub fn discard(&mut self, seat: Seat, card: Card) -> Option<RoundResult> {
        let end = self.round.discard(seat, card)?;
        Some(self.settle(end))
    }

    pub fn knock(&mut self, seat: Seat) -> Option<RoundResult> {
        let end = self.round.knock(seat)?;
        Some(self.settle(end))
    }

    /// 换成一个摆好的局面，累计分数不变
    pub fn replace_round(&mut self, round: Round) {
        self.round = round;
    }

    /// 重新洗牌发牌，累计分数不变
    pub fn start_new_round(&mut self) {
        self.round = Round::deal(&mut self.rng);
    }

    /// 分数清零并开始新的一局
    pub fn reset_game(&mut self) {
        self.scores = [0; SEATS];
        self.start_new_round();
    }

    /// 每局只在进入结束状态时计分一次
    fn settle(&mut self, end: RoundEnd) -> RoundResult {
        let award = score_round(end.winner, end.deadwood);
        if let Some(award) = &award {
            award.apply(&mut self.scores);
        }
        debug!(?award, scores = ?self.scores, "本局计分完成");
        RoundResult { winner: end.winner, deadwood: end.deadwood, award }
    }
}

// --- 单元测试 ---
