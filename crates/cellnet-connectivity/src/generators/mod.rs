// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Number and weight generators.
*/

pub mod number;
pub mod weight;

pub use number::{Distribution, NumberGenerator};
pub use weight::WeightGenerator;
