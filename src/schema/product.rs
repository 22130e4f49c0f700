use crate::foundation::value::{Descriptor, Value};

/// Odometer-order Cartesian product over named value domains.
///
/// Yields `(index, descriptor)` with `index` counting from 0 across the full product. An empty
/// axis list yields exactly one empty descriptor; any empty domain yields nothing.
#[derive(Clone, Debug)]
pub struct Combinations {
    axes: Vec<(String, Vec<Value>)>,
    cursor: Vec<usize>,
    next_index: usize,
    done: bool,
}

impl Combinations {
    /// Product over `axes`, the last axis varying fastest.
    pub fn new(axes: Vec<(String, Vec<Value>)>) -> Self {
        let done = axes.iter().any(|(_, vals)| vals.is_empty());
        Self {
            cursor: vec![0; axes.len()],
            axes,
            next_index: 0,
            done,
        }
    }

    /// Total number of combinations in the product.
    pub fn total(&self) -> usize {
        self.axes.iter().map(|(_, vals)| vals.len()).product()
    }

    fn advance(&mut self) {
        for i in (0..self.cursor.len()).rev() {
            if self.cursor[i] + 1 < self.axes[i].1.len() {
                self.cursor[i] += 1;
                return;
            }
            self.cursor[i] = 0;
        }
        self.done = true;
    }
}

impl Iterator for Combinations {
    type Item = (usize, Descriptor);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let desc: Descriptor = self
            .axes
            .iter()
            .zip(&self.cursor)
            .map(|((name, vals), &i)| (name.clone(), vals[i].clone()))
            .collect();
        let index = self.next_index;
        self.next_index += 1;
        self.advance();
        Some((index, desc))
    }
}
