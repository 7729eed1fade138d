use crate::card::Card;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HandError {
    #[error("card {0} is not in hand")]
    CardNotInHand(Card),
}

/// 玩家手牌
/// 无序集合，但保持插入顺序以便稳定遍历
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hand {
    cards: Vec<Card>,
}

impl Hand {
    pub fn new() -> Hand {
        Hand::default()
    }

    pub fn add(&mut self, card: Card) {
        self.cards.push(card);
    }

    /// 移除第一张匹配的牌，手里没有这张牌时返回错误
    pub fn remove(&mut self, card: Card) -> Result<(), HandError> {
        let pos = self
            .cards
            .iter()
            .position(|c| *c == card)
            .ok_or(HandError::CardNotInHand(card))?;
        self.cards.remove(pos);
        Ok(())
    }

    pub fn contains(&self, card: &Card) -> bool {
        self.cards.contains(card)
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

impl From<Vec<Card>> for Hand {
    fn from(cards: Vec<Card>) -> Self {
        Hand { cards }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{Rank, Suit};

    #[test]
    fn test_add_keeps_insertion_order() {
        let mut hand = Hand::new();
        hand.add(Card::new(Rank::King, Suit::Club));
        hand.add(Card::new(Rank::Ace, Suit::Spade));
        assert_eq!(hand.cards(), &[Card::new(Rank::King, Suit::Club), Card::new(Rank::Ace, Suit::Spade)]);
    }

    #[test]
    fn test_remove_missing_card_is_rejected() {
        let card = Card::new(Rank::Four, Suit::Heart);
        let mut hand = Hand::from(vec![Card::new(Rank::Five, Suit::Heart)]);
        assert_eq!(hand.remove(card), Err(HandError::CardNotInHand(card)));
        assert_eq!(hand.len(), 1);

        assert_eq!(hand.remove(Card::new(Rank::Five, Suit::Heart)), Ok(()));
        assert!(hand.is_empty());
    }
}
