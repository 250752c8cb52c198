//! Deterministic synthetic payment data.
//!
//! Produces files in the same shape as real batch/stream input
//! (`time, id1, id2, amount, message`) from a single seed, so tests and
//! benchmarks can build realistic graphs without shipping data files.
//! Same seed + same spec = byte-identical output.

use crate::types::PersonId;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;
use std::io::{self, Write};

pub const HEADER: &str = "time, id1, id2, amount, message";

const MESSAGES: &[&str] = &[
    "Rent",
    "Dinner",
    "Uber",
    "Coffee",
    "Groceries",
    "Tickets",
    "Pizza",
    "Utilities",
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticSpec {
    pub people: u32,
    pub transactions: u64,
    /// Probability a given line is malformed.
    pub malformed_rate: f64,
}

impl Default for SyntheticSpec {
    fn default() -> Self {
        Self {
            people: 1_000,
            transactions: 10_000,
            malformed_rate: 0.0,
        }
    }
}

pub struct PaymentGenerator {
    inner: Pcg64Mcg,
    spec: SyntheticSpec,
}

impl PaymentGenerator {
    pub fn new(seed: u64, spec: SyntheticSpec) -> Self {
        Self {
            inner: Pcg64Mcg::seed_from_u64(seed),
            spec,
        }
    }

    fn next_person(&mut self) -> PersonId {
        // people is u32 but ids are i32; clamp the population to fit.
        let population = self.spec.people.clamp(1, PersonId::MAX as u32) as PersonId;
        self.inner.gen_range(0..population)
    }

    /// One record line, without a trailing newline.
    pub fn next_line(&mut self, index: u64) -> String {
        let day = 1 + index / 86_400 % 28;
        let secs = index % 86_400;
        let time = format!(
            "2016-11-{day:02} {:02}:{:02}:{:02}",
            secs / 3600,
            secs / 60 % 60,
            secs % 60
        );

        if self.inner.gen_bool(self.spec.malformed_rate.clamp(0.0, 1.0)) {
            return match self.inner.gen_range(0..3) {
                0 => format!("{time}, {}", self.next_person()),
                1 => format!("{time}, not-an-id, {}, 1.00, Oops", self.next_person()),
                _ => String::new(),
            };
        }

        let payer = self.next_person();
        let payee = self.next_person();
        let cents: u32 = self.inner.gen_range(100..50_000);
        let message = MESSAGES[self.inner.gen_range(0..MESSAGES.len())];
        format!(
            "{time}, {payer}, {payee}, {}.{:02}, {message}",
            cents / 100,
            cents % 100
        )
    }

    /// Header plus `spec.transactions` records.
    pub fn lines(&mut self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.spec.transactions as usize + 1);
        lines.push(HEADER.to_string());
        for index in 0..self.spec.transactions {
            lines.push(self.next_line(index));
        }
        lines
    }

    pub fn write_to<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        writeln!(out, "{HEADER}")?;
        for index in 0..self.spec.transactions {
            writeln!(out, "{}", self.next_line(index))?;
        }
        Ok(())
    }
}
