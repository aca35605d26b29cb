//! Fantasy lineup picker
//!
//! Depth-first branch and bound over the candidate list: each candidate is
//! either taken (when affordable) or skipped, and a branch is abandoned once
//! the remaining budget can no longer buy a player.

/// A player on offer in a fantasy game
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub name: String,
    /// Predicted points
    pub points: f64,
    /// Price in thousands
    pub cost: u32,
}

/// The best affordable lineup found
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// Indices into the candidate list, ascending
    pub picks: Vec<usize>,
    pub points: f64,
    pub cost: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct LineupPicker {
    pub size: usize,
    /// Total budget in thousands
    pub budget: u32,
    /// Remaining budget at or under which no further player is affordable
    pub min_cost: u32,
}

impl Default for LineupPicker {
    fn default() -> Self {
        LineupPicker {
            size: 5,
            budget: 1000,
            min_cost: 140,
        }
    }
}

struct Search<'a> {
    candidates: &'a [Candidate],
    picker: LineupPicker,
    current: Vec<usize>,
    best: Option<Selection>,
}

impl Search<'_> {
    fn go(&mut self, next: usize, points: f64, money_left: u32) {
        if self.current.len() == self.picker.size {
            if self.best.as_ref().map_or(true, |b| points > b.points) {
                self.best = Some(Selection {
                    picks: self.current.clone(),
                    points,
                    cost: self.picker.budget - money_left,
                });
            }
            return;
        }
        if money_left <= self.picker.min_cost || next == self.candidates.len() {
            return;
        }

        let candidate = &self.candidates[next];
        if candidate.cost <= money_left {
            self.current.push(next);
            self.go(next + 1, points + candidate.points, money_left - candidate.cost);
            self.current.pop();
        }
        self.go(next + 1, points, money_left);
    }
}

impl LineupPicker {
    /// Highest-scoring set of exactly `size` candidates within budget,
    /// or `None` when no such set exists
    pub fn pick(&self, candidates: &[Candidate]) -> Option<Selection> {
        let mut search = Search {
            candidates,
            picker: *self,
            current: Vec::with_capacity(self.size),
            best: None,
        };
        search.go(0, 0.0, self.budget);
        if let Some(best) = &search.best {
            log::debug!(
                "Best lineup: {} points for {}k out of {} candidates",
                best.points,
                best.cost,
                candidates.len()
            );
        }
        search.best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str, points: f64, cost: u32) -> Candidate {
        Candidate {
            name: name.to_string(),
            points,
            cost,
        }
    }

    #[test]
    fn test_picks_best_under_budget() {
        let candidates = vec![
            candidate("zywoo", 30.0, 250),
            candidate("donk", 28.0, 240),
            candidate("m0nesy", 25.0, 230),
            candidate("ropz", 18.0, 180),
            candidate("broky", 15.0, 170),
            candidate("apex", 10.0, 150),
            candidate("karrigan", 8.0, 150),
        ];
        let best = LineupPicker::default().pick(&candidates).unwrap();
        assert_eq!(best.picks.len(), 5);
        assert!(best.cost <= 1000);
        // The three stars plus the two cheapest cost 1020, so one star is dropped
        assert_eq!(best.picks, vec![0, 1, 3, 4, 5]);
        assert_eq!(best.points, 101.0);
        assert_eq!(best.cost, 990);
    }

    #[test]
    fn test_no_affordable_lineup() {
        let candidates: Vec<Candidate> = (0..5).map(|i| candidate(&i.to_string(), 1.0, 300)).collect();
        assert!(LineupPicker::default().pick(&candidates).is_none());
        assert!(LineupPicker::default().pick(&candidates[..3]).is_none());
    }

    #[test]
    fn test_budget_floor_prunes() {
        let picker = LineupPicker {
            size: 2,
            budget: 300,
            min_cost: 140,
        };
        // After buying the 200 player only 100 is left, which is under the floor
        let candidates = vec![candidate("a", 10.0, 200), candidate("b", 1.0, 50), candidate("c", 2.0, 150)];
        let best = picker.pick(&candidates).unwrap();
        assert_eq!(best.picks, vec![1, 2]);
    }
}
