// SPDX-License-Identifier: Apache-2.0
//! Source: an ordered collection of Stacks acting as a composite draw pool.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::ident::TokenId;
use crate::world::stack::Stack;

/// An ordered composite of [`Stack`]s. Draws are dispatched to the head
/// stack, falling through to the next stack when the head empties.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Source {
    stacks: VecDeque<Stack>,
}

/// Summary statistics returned by [`Source::inspect`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceInspection {
    /// Number of stacks currently in the source.
    pub stack_count: usize,
    /// Total tokens across all stacks.
    pub total_cards: usize,
}

impl Source {
    /// Creates a source from an initial ordered set of stacks.
    pub fn new(stacks: Vec<Stack>) -> Self {
        Self {
            stacks: stacks.into(),
        }
    }

    /// Appends a stack to the back of the source.
    pub fn add_stack(&mut self, stack: Stack) {
        self.stacks.push_back(stack);
    }

    /// Removes and returns the stack at `index`.
    pub fn remove_stack(&mut self, index: usize) -> Option<Stack> {
        self.stacks.remove(index)
    }

    /// Draws a single token from the head stack, falling through to
    /// subsequent stacks as each empties. Returns `None` if every stack is
    /// exhausted.
    pub fn draw(&mut self) -> Option<TokenId> {
        while let Some(front) = self.stacks.front_mut() {
            let drawn = front.draw(1);
            if let Some(token) = drawn.into_iter().next() {
                return Some(token);
            }
            self.stacks.pop_front();
        }
        None
    }

    /// Shuffles every stack in the source independently. When a seed is
    /// given, each stack is shuffled with a distinct derived seed so stacks
    /// don't end up with identical permutations.
    pub fn shuffle(&mut self, seed: Option<u64>) {
        for (i, stack) in self.stacks.iter_mut().enumerate() {
            stack.shuffle(seed.map(|s| s.wrapping_add(i as u64)));
        }
    }

    /// Burns up to `count` tokens from the head stack (with fallthrough).
    pub fn burn(&mut self, count: usize) -> Vec<TokenId> {
        let mut burned = Vec::with_capacity(count);
        for _ in 0..count {
            match self.draw() {
                Some(t) => burned.push(t),
                None => break,
            }
        }
        burned
    }

    /// Resets every stack to its original order.
    pub fn reset(&mut self) {
        for stack in &mut self.stacks {
            stack.reset();
        }
    }

    /// Summary statistics over the whole source.
    pub fn inspect(&self) -> SourceInspection {
        SourceInspection {
            stack_count: self.stacks.len(),
            total_cards: self.stacks.iter().map(Stack::len).sum(),
        }
    }

    /// Read-only view of the underlying stacks, head-first.
    pub fn stacks(&self) -> impl Iterator<Item = &Stack> {
        self.stacks.iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn toks(n: u64) -> Vec<TokenId> {
        (0..n).map(TokenId).collect()
    }

    #[test]
    fn draw_falls_through_to_next_stack() {
        let mut source = Source::new(vec![Stack::new(toks(1)), Stack::new(vec![TokenId(10)])]);
        assert_eq!(source.draw(), Some(TokenId(0)));
        assert_eq!(source.draw(), Some(TokenId(10)));
        assert_eq!(source.draw(), None);
    }

    #[test]
    fn inspect_reports_totals() {
        let source = Source::new(vec![Stack::new(toks(3)), Stack::new(toks(2))]);
        let summary = source.inspect();
        assert_eq!(summary.stack_count, 2);
        assert_eq!(summary.total_cards, 5);
    }
}
