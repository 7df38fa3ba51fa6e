// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use rand::RngCore;

use super::number::NumberGenerator;
use crate::expression::{Expression, Variables};
use crate::types::ConnResult;

/// Synaptic weight source: a plain number generator or a function of distance
#[derive(Debug, Clone, PartialEq)]
pub enum WeightGenerator {
    Number(NumberGenerator),
    /// Expression in `r`. With `soma_to_soma`, `r` is the soma separation
    /// instead of the distance between the two attachment points.
    Function {
        expression: Expression,
        soma_to_soma: bool,
    },
}

impl Default for WeightGenerator {
    fn default() -> Self {
        WeightGenerator::Number(NumberGenerator::fixed(1.0))
    }
}

impl From<NumberGenerator> for WeightGenerator {
    fn from(generator: NumberGenerator) -> Self {
        WeightGenerator::Number(generator)
    }
}

impl WeightGenerator {
    pub fn function(text: &str, soma_to_soma: bool) -> ConnResult<Self> {
        Ok(WeightGenerator::Function {
            expression: Expression::parse(text)?,
            soma_to_soma,
        })
    }

    pub fn is_fixed(&self) -> bool {
        match self {
            WeightGenerator::Number(generator) => generator.is_fixed(),
            WeightGenerator::Function { .. } => false,
        }
    }

    pub fn validate(&self) -> ConnResult<()> {
        match self {
            WeightGenerator::Number(generator) => generator.validate(),
            WeightGenerator::Function { .. } => Ok(()),
        }
    }

    /// Draw a weight for a connection of length `distance` between cells
    /// whose somas are `soma_distance` apart.
    pub fn next_weight<R: RngCore>(
        &self,
        rng: &mut R,
        distance: f32,
        soma_distance: f32,
    ) -> ConnResult<f32> {
        match self {
            WeightGenerator::Number(generator) => Ok(generator.next_number(rng)),
            WeightGenerator::Function {
                expression,
                soma_to_soma,
            } => {
                let r = if *soma_to_soma {
                    soma_distance
                } else {
                    distance
                };
                Ok(expression.evaluate(&Variables::radial(r), rng)? as f32)
            }
        }
    }
}

impl fmt::Display for WeightGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeightGenerator::Number(generator) => write!(f, "{}", generator),
            WeightGenerator::Function {
                expression,
                soma_to_soma: false,
            } => write!(f, "f(r) = {}", expression),
            WeightGenerator::Function {
                expression,
                soma_to_soma: true,
            } => write!(f, "f(r) = {} (soma to soma)", expression),
        }
    }
}
