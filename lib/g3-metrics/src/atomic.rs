/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::atomic::{AtomicU64, Ordering};

/// A f64 cell updated by compare-and-swap over its bit pattern.
#[derive(Debug, Default)]
pub struct AtomicF64 {
    bits: AtomicU64,
}

impl AtomicF64 {
    pub fn new(v: f64) -> Self {
        AtomicF64 {
            bits: AtomicU64::new(v.to_bits()),
        }
    }

    #[inline]
    pub fn load(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }

    #[inline]
    pub fn store(&self, v: f64) {
        self.bits.store(v.to_bits(), Ordering::Release);
    }

    /// Add `delta` and return the new value.
    pub fn add(&self, delta: f64) -> f64 {
        let mut old_bits = self.bits.load(Ordering::Acquire);
        loop {
            let new = f64::from_bits(old_bits) + delta;
            match self.bits.compare_exchange_weak(
                old_bits,
                new.to_bits(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return new,
                Err(cur) => old_bits = cur,
            }
        }
    }
}
