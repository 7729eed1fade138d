use crate::meld::KNOCK_LIMIT;
use crate::state::{opponent, Seat};
use serde::{Deserialize, Serialize};

/// 金拉米 (gin) 与反杀 (undercut) 的奖励分
pub const GIN_BONUS: u32 = 25;
pub const UNDERCUT_BONUS: u32 = 25;

/// 本局的得分方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AwardKind {
    Gin,      // 散牌为 0
    Knock,    // 敲牌且散牌严格少于对手
    Undercut, // 敲牌但散牌不少于对手，分数归对手
}

/// 一局结束时的得分：哪个座位得多少分
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Award {
    pub seat: Seat,
    pub points: u32,
    pub kind: AwardKind,
}

impl Award {
    /// 把分数累加到总分上
    pub fn apply(&self, scores: &mut [u32; 2]) {
        scores[self.seat] += self.points;
    }
}

/// 一局结束时计分
///
/// `deadwood` 按座位索引，`winner` 是结束本局的玩家。
/// 赢家散牌超过敲牌上限时没有任何一方得分 (状态机不会走到这一步)。
pub fn score_round(winner: Seat, deadwood: [usize; 2]) -> Option<Award> {
    let loser = opponent(winner);
    let (mine, theirs) = (deadwood[winner] as u32, deadwood[loser] as u32);

    if mine == 0 {
        Some(Award { seat: winner, points: GIN_BONUS + theirs, kind: AwardKind::Gin })
    } else if deadwood[winner] <= KNOCK_LIMIT {
        if mine < theirs {
            Some(Award { seat: winner, points: theirs - mine, kind: AwardKind::Knock })
        } else {
            Some(Award { seat: loser, points: UNDERCUT_BONUS + mine, kind: AwardKind::Undercut })
        }
    } else {
        None
    }
}
