//! # Calculation Memory
//!
//! The step-by-step trail shown next to every audited result. Steps are
//! numbered from 1 in the order they are recorded; numbering is owned by
//! [`MemoryTrail`] so calculators cannot skip or repeat a step.

use serde::{Deserialize, Serialize};

/// One line of a calculation memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStep {
    /// 1-based position in the trail.
    pub step: u32,
    /// What this step computes.
    pub description: String,
    /// Human-readable formula with the operands filled in.
    pub formula: String,
    /// Formatted result (usually currency).
    pub result: String,
}

/// Ordered, sequentially numbered memory steps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryTrail(Vec<MemoryStep>);

impl MemoryTrail {
    /// Create an empty trail.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step, numbering it after the last one.
    pub fn record(
        &mut self,
        description: impl Into<String>,
        formula: impl Into<String>,
        result: impl Into<String>,
    ) -> &mut Self {
        let step = u32::try_from(self.0.len()).unwrap_or(u32::MAX).saturating_add(1);
        self.0.push(MemoryStep {
            step,
            description: description.into(),
            formula: formula.into(),
            result: result.into(),
        });
        self
    }

    /// The recorded steps.
    pub fn steps(&self) -> &[MemoryStep] {
        &self.0
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no step has been recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The final step, if any.
    pub fn last(&self) -> Option<&MemoryStep> {
        self.0.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_are_numbered_sequentially_from_one() {
        let mut trail = MemoryTrail::new();
        trail
            .record("ICMS origem", "R$ 1000.00 × 12.00%", "R$ 120.00")
            .record("Valor líquido", "R$ 1000.00 - R$ 120.00", "R$ 880.00");
        let numbers: Vec<u32> = trail.steps().iter().map(|s| s.step).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(trail.last().unwrap().result, "R$ 880.00");
    }

    #[test]
    fn serializes_as_array() {
        let mut trail = MemoryTrail::new();
        trail.record("a", "b", "c");
        let json = serde_json::to_value(&trail).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{"step": 1, "description": "a", "formula": "b", "result": "c"}])
        );
    }

    #[test]
    fn empty_trail() {
        let trail = MemoryTrail::new();
        assert!(trail.is_empty());
        assert_eq!(trail.len(), 0);
        assert!(trail.last().is_none());
    }
}
