use std::slice;
use tracing::warn;

use super::item::{LineItem, RateMode};
use crate::api::Participant;

/// Flatten participant chains into billable line items.
///
/// Each chain is walked depth-first through `given_to`. Participants that
/// pass work on are recorded as intermediaries; participants with nobody
/// below them become line items, carrying the intermediaries nearest first.
pub fn flatten(groups: &[Vec<Participant>]) -> Vec<LineItem> {
    LineItems::new(groups).collect()
}

/// Lazy depth-first walk over participant chains.
///
/// Cloning the iterator yields an independent walk from the same point.
#[derive(Clone)]
pub struct LineItems<'a> {
    groups: slice::Iter<'a, Vec<Participant>>,
    stack: Vec<Frame<'a>>,
    thru: Vec<String>,
    ancestors: Vec<Option<&'a str>>,
}

#[derive(Clone)]
struct Frame<'a> {
    siblings: slice::Iter<'a, Participant>,
    nested: bool,
}

impl<'a> LineItems<'a> {
    pub fn new(groups: &'a [Vec<Participant>]) -> Self {
        Self {
            groups: groups.iter(),
            stack: Vec::new(),
            thru: Vec::new(),
            ancestors: Vec::new(),
        }
    }

    fn is_ancestor(&self, id: &str) -> bool {
        self.ancestors.iter().flatten().any(|a| *a == id)
    }
}

impl Iterator for LineItems<'_> {
    type Item = LineItem;

    fn next(&mut self) -> Option<LineItem> {
        loop {
            let Some(frame) = self.stack.last_mut() else {
                let group = self.groups.next()?;
                self.stack.push(Frame {
                    siblings: group.iter(),
                    nested: false,
                });
                continue;
            };

            let Some(node) = frame.siblings.next() else {
                if let Some(done) = self.stack.pop() {
                    if done.nested {
                        self.thru.pop();
                        self.ancestors.pop();
                    }
                }
                continue;
            };

            if let Some(id) = node.id.as_deref() {
                if self.is_ancestor(id) {
                    warn!(id, name = %node.name, "skipping cyclic given_to reference");
                    continue;
                }
            }

            if node.given_to.is_empty() {
                return Some(leaf_item(node, &self.thru));
            }

            self.thru.push(node.describe());
            self.ancestors.push(node.id.as_deref());
            self.stack.push(Frame {
                siblings: node.given_to.iter(),
                nested: true,
            });
        }
    }
}

fn leaf_item(node: &Participant, thru: &[String]) -> LineItem {
    let (rate_mode, rate_amount, currency) = match &node.project {
        Some(project) => (
            project.rate_mode,
            project.rate_amount,
            project.currency.clone(),
        ),
        None => (RateMode::Unspecified, 0.0, String::new()),
    };

    LineItem {
        id: node.id.clone(),
        name: node.name.clone(),
        location: node.address.clone(),
        thru: thru.iter().rev().cloned().collect(),
        rate_mode,
        duration: 0.0,
        rate_amount,
        currency,
        description: String::new(),
    }
}
